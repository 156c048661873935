//! Error types for dependency injection

use crate::TypeKey;
use thiserror::Error;

/// Errors that can occur while registering, building or resolving
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiError {
    /// Service was not registered in the container
    #[error("An instance was not registered in the container of type {type_name}")]
    NotFound { type_name: &'static str },

    /// A constructor parameter has no registration
    #[error("Could not construct {service}: dependency of type {dependency} could not be found")]
    MissingDependency {
        service: &'static str,
        dependency: &'static str,
    },

    /// A type appeared twice in one resolution chain
    #[error("Circular dependency detected while resolving {type_name}: {chain}")]
    CircularDependency {
        type_name: &'static str,
        chain: String,
    },

    /// Two registrations share a type key
    #[error("Service already registered: {type_name}")]
    AlreadyRegistered { type_name: &'static str },

    /// Auto-wired type declares no constructors
    #[error("No constructor declared for {type_name}")]
    NoConstructor { type_name: &'static str },

    /// More than one constructor has the greatest parameter count
    #[error("Ambiguous constructors for {type_name}: more than one takes {arity} parameters")]
    AmbiguousConstructor {
        type_name: &'static str,
        arity: usize,
    },

    /// An instance does not hold the requested type
    #[error("Type mismatch: expected {expected}, found {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    /// Factory or constructor failed to create service
    #[error("Failed to create service {type_name}: {reason}")]
    CreationFailed {
        type_name: &'static str,
        reason: String,
    },
}

impl DiError {
    /// Create a NotFound error for a key
    #[inline]
    pub fn not_found(key: TypeKey) -> Self {
        Self::NotFound {
            type_name: key.name(),
        }
    }

    /// Create a MissingDependency error
    #[inline]
    pub fn missing_dependency(service: TypeKey, dependency: TypeKey) -> Self {
        Self::MissingDependency {
            service: service.name(),
            dependency: dependency.name(),
        }
    }

    /// Create a CircularDependency error from the chain that closed the cycle.
    ///
    /// `chain` is the resolution path up to (not including) the repeated key.
    pub fn circular(key: TypeKey, chain: &[TypeKey]) -> Self {
        let mut path: Vec<&str> = chain.iter().map(TypeKey::name).collect();
        path.push(key.name());
        Self::CircularDependency {
            type_name: key.name(),
            chain: path.join(" -> "),
        }
    }

    /// Create an AlreadyRegistered error
    #[inline]
    pub fn already_registered(key: TypeKey) -> Self {
        Self::AlreadyRegistered {
            type_name: key.name(),
        }
    }

    /// Create a TypeMismatch error
    #[inline]
    pub fn type_mismatch(expected: TypeKey, actual: TypeKey) -> Self {
        Self::TypeMismatch {
            expected: expected.name(),
            actual: actual.name(),
        }
    }

    /// Create a CreationFailed error
    #[inline]
    pub fn creation_failed<T: ?Sized + 'static>(reason: impl Into<String>) -> Self {
        Self::CreationFailed {
            type_name: std::any::type_name::<T>(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for DI operations
pub type Result<T> = std::result::Result<T, DiError>;

#[cfg(test)]
mod tests {
    use super::*;

    struct Service;
    struct Database;

    #[test]
    fn test_missing_dependency_names_both_types() {
        let err = DiError::missing_dependency(TypeKey::of::<Service>(), TypeKey::of::<Database>());
        let message = err.to_string();
        assert!(message.contains("Service"));
        assert!(message.contains("Database"));
    }

    #[test]
    fn test_circular_chain_format() {
        let a = TypeKey::of::<Service>();
        let b = TypeKey::of::<Database>();
        let err = DiError::circular(a, &[a, b]);

        match err {
            DiError::CircularDependency { chain, .. } => {
                assert_eq!(chain.matches(" -> ").count(), 2);
                assert!(chain.starts_with(a.name()));
                assert!(chain.ends_with(a.name()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_not_found_message() {
        let err = DiError::not_found(TypeKey::of::<Service>());
        assert!(err.to_string().starts_with("An instance was not registered"));
    }
}
