//! Provider traits for dependency injection
//!
//! These define what can be stored in a container and how long it lives.

/// Marker trait for types that can be registered and resolved.
///
/// Automatically implemented for every `Send + Sync + 'static` type,
/// including trait objects whose trait carries `Send + Sync` supertraits.
///
/// # Examples
///
/// ```rust
/// use construct::Injectable;
///
/// trait Clock: Send + Sync {}
///
/// fn assert_injectable<T: ?Sized + Injectable>() {}
///
/// assert_injectable::<String>();
/// assert_injectable::<dyn Clock>();
/// ```
pub trait Injectable: Send + Sync + 'static {}

impl<T: ?Sized + Send + Sync + 'static> Injectable for T {}

/// How long a constructed service lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Lifetime {
    /// Constructed once during `build()`, shared by every resolve
    Singleton,

    /// Constructed anew on every resolve (instance per dependency)
    #[default]
    Transient,
}

impl Lifetime {
    /// Name used in log fields
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Lifetime::Singleton => "singleton",
            Lifetime::Transient => "transient",
        }
    }
}

impl std::fmt::Display for Lifetime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_transient() {
        assert_eq!(Lifetime::default(), Lifetime::Transient);
    }

    #[test]
    fn test_display() {
        assert_eq!(Lifetime::Singleton.to_string(), "singleton");
        assert_eq!(Lifetime::Transient.to_string(), "transient");
    }
}
