//! Factory types for creating service instances
//!
//! Everything stored in the registry is type-erased: an [`Instance`] wraps the
//! `Arc<T>` of whatever type the registration is keyed under, and a
//! [`FactoryFn`] produces one on demand. [`AnyFactory`] is the enum the
//! registry actually stores, one variant per [`Lifetime`](crate::Lifetime).

use crate::{DiError, Injectable, Resolver, Result, TypeKey};
use std::any::Any;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::trace;

/// Type-erased construction function.
///
/// Receives the [`Resolver`] of the resolution in progress so nested
/// lookups share its cycle detection.
pub type FactoryFn = Arc<dyn Fn(&mut Resolver<'_>) -> Result<Instance> + Send + Sync>;

// =============================================================================
// Instance
// =============================================================================

/// A type-erased, shared service instance.
///
/// Holds an `Arc<T>` (where `T` may be a trait object) behind
/// `Arc<dyn Any>`, so cloning an `Instance` never clones the service and
/// singleton identity survives erasure.
///
/// # Examples
///
/// ```rust
/// use construct::{Instance, TypeKey};
/// use std::sync::Arc;
///
/// let instance = Instance::new(Arc::new(7u32));
/// assert_eq!(instance.type_key(), TypeKey::of::<u32>());
/// assert_eq!(*instance.downcast::<u32>().unwrap(), 7);
/// assert!(instance.downcast::<String>().is_none());
/// ```
#[derive(Clone)]
pub struct Instance {
    key: TypeKey,
    value: Arc<dyn Any + Send + Sync>,
}

impl Instance {
    /// Erase a shared service keyed under `T`.
    #[inline]
    pub fn new<T: ?Sized + Injectable>(service: Arc<T>) -> Self {
        Self {
            key: TypeKey::of::<T>(),
            value: Arc::new(service),
        }
    }

    /// Key of the type this instance holds.
    #[inline]
    pub fn type_key(&self) -> TypeKey {
        self.key
    }

    /// Recover the typed `Arc<T>`, or `None` if this holds another type.
    #[inline]
    pub fn downcast<T: ?Sized + Injectable>(&self) -> Option<Arc<T>> {
        self.value.downcast_ref::<Arc<T>>().cloned()
    }

    /// Like [`downcast`](Self::downcast), reporting a mismatch as an error.
    #[inline]
    pub fn try_downcast<T: ?Sized + Injectable>(&self) -> Result<Arc<T>> {
        self.downcast::<T>()
            .ok_or_else(|| DiError::type_mismatch(TypeKey::of::<T>(), self.key))
    }

    /// Check whether this holds `T`.
    #[inline]
    pub fn is<T: ?Sized + Injectable>(&self) -> bool {
        self.value.is::<Arc<T>>()
    }
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance").field("type", &self.key).finish()
    }
}

// =============================================================================
// Singleton Factory
// =============================================================================

/// Singleton factory - stores the instance created during `build()`
#[derive(Clone)]
pub(crate) struct SingletonFactory {
    instance: Instance,
}

impl SingletonFactory {
    #[inline]
    pub fn new(instance: Instance) -> Self {
        Self { instance }
    }

    /// Hand out the shared instance (clones the Arc only)
    #[inline]
    pub fn resolve(&self) -> Instance {
        self.instance.clone()
    }
}

// =============================================================================
// Transient Factory
// =============================================================================

/// Transient factory - runs the registration's factory on every resolve
#[derive(Clone)]
pub(crate) struct TransientFactory {
    factory: FactoryFn,
    #[cfg(feature = "logging")]
    type_name: &'static str,
}

impl TransientFactory {
    #[inline]
    pub fn new(key: TypeKey, factory: FactoryFn) -> Self {
        #[cfg(not(feature = "logging"))]
        let _ = key;

        Self {
            factory,
            #[cfg(feature = "logging")]
            type_name: key.name(),
        }
    }

    /// Create a new instance
    #[inline]
    pub fn create(&self, resolver: &mut Resolver<'_>) -> Result<Instance> {
        #[cfg(feature = "logging")]
        trace!(
            target: "construct",
            service = self.type_name,
            "Creating new transient instance"
        );

        (self.factory)(resolver)
    }
}

// =============================================================================
// AnyFactory
// =============================================================================

/// What the registry stores for each key.
///
/// Cheap to clone: the container clones the factory out of the map before
/// invoking it, so no map guard is held while user code runs.
#[derive(Clone)]
pub(crate) enum AnyFactory {
    /// Instance already created at build time
    Singleton(SingletonFactory),
    /// New instance each time
    Transient(TransientFactory),
}

impl AnyFactory {
    /// Create a singleton entry around a constructed instance
    #[inline]
    pub fn singleton(instance: Instance) -> Self {
        AnyFactory::Singleton(SingletonFactory::new(instance))
    }

    /// Create a transient entry
    #[inline]
    pub fn transient(key: TypeKey, factory: FactoryFn) -> Self {
        AnyFactory::Transient(TransientFactory::new(key, factory))
    }

    /// Resolve the service
    #[inline]
    pub fn resolve(&self, resolver: &mut Resolver<'_>) -> Result<Instance> {
        match self {
            AnyFactory::Singleton(f) => Ok(f.resolve()),
            AnyFactory::Transient(f) => f.create(resolver),
        }
    }

    /// Check if transient
    #[inline]
    pub fn is_transient(&self) -> bool {
        matches!(self, AnyFactory::Transient(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Container;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct TestService {
        id: u32,
    }

    trait Named: Send + Sync {
        fn name(&self) -> &str;
    }

    impl Named for TestService {
        fn name(&self) -> &str {
            "test"
        }
    }

    #[test]
    fn test_instance_keeps_identity() {
        let service = Arc::new(TestService { id: 1 });
        let instance = Instance::new(Arc::clone(&service));
        let copy = instance.clone();

        let a = instance.downcast::<TestService>().unwrap();
        let b = copy.downcast::<TestService>().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&a, &service));
    }

    #[test]
    fn test_instance_of_trait_object() {
        let service: Arc<dyn Named> = Arc::new(TestService { id: 2 });
        let instance = Instance::new(service);

        assert!(instance.is::<dyn Named>());
        assert!(!instance.is::<TestService>());
        assert_eq!(instance.downcast::<dyn Named>().unwrap().name(), "test");
    }

    #[test]
    fn test_try_downcast_mismatch() {
        let instance = Instance::new(Arc::new(TestService { id: 3 }));
        let err = instance.try_downcast::<String>().unwrap_err();
        assert!(matches!(err, DiError::TypeMismatch { .. }));
    }

    #[test]
    fn test_singleton_factory() {
        let container = Container::new();
        let mut resolver = container.resolver();
        let factory = AnyFactory::singleton(Instance::new(Arc::new(TestService { id: 42 })));

        let a = factory.resolve(&mut resolver).unwrap();
        let b = factory.resolve(&mut resolver).unwrap();
        let a = a.downcast::<TestService>().unwrap();
        let b = b.downcast::<TestService>().unwrap();

        assert_eq!(a.id, 42);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_transient_factory() {
        static COUNTER: AtomicU32 = AtomicU32::new(0);

        let container = Container::new();
        let mut resolver = container.resolver();
        let factory = AnyFactory::transient(
            TypeKey::of::<TestService>(),
            Arc::new(|_: &mut Resolver<'_>| {
                Ok(Instance::new(Arc::new(TestService {
                    id: COUNTER.fetch_add(1, Ordering::SeqCst),
                })))
            }),
        );

        let a = factory.resolve(&mut resolver).unwrap().downcast::<TestService>().unwrap();
        let b = factory.resolve(&mut resolver).unwrap().downcast::<TestService>().unwrap();

        assert_eq!(a.id, 0);
        assert_eq!(b.id, 1);
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_is_transient() {
        let singleton = AnyFactory::singleton(Instance::new(Arc::new(TestService { id: 1 })));
        let transient = AnyFactory::transient(
            TypeKey::of::<TestService>(),
            Arc::new(|_: &mut Resolver<'_>| Ok(Instance::new(Arc::new(TestService { id: 3 })))),
        );

        assert!(!singleton.is_transient());
        assert!(transient.is_transient());
    }
}
