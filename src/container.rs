//! The container: a frozen, queryable registry of type key → factory
//!
//! A [`Container`] is filled by [`ContainerBuilder::build`] and then only
//! read. Every lookup goes through a [`Resolver`], which carries the chain of
//! keys currently being constructed so that dependency cycles surface as
//! [`DiError::CircularDependency`] instead of exhausting the stack.

use crate::factory::{AnyFactory, Instance};
use crate::storage::ServiceStorage;
use crate::{ContainerBuilder, DiError, Injectable, Lifetime, Result, TypeKey};
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::{debug, trace, warn};

/// Dependency injection container.
///
/// Cloning is cheap and every clone shares the same registry. Resolution is
/// safe from any number of threads; containers never contend with one
/// another.
///
/// # Examples
///
/// ```rust
/// use construct::{Container, ContainerBuilder};
///
/// struct Clock { offset: i64 }
///
/// let mut builder = ContainerBuilder::new();
/// builder.register(|| Clock { offset: 2 }).single_instance();
/// let container = builder.build().unwrap();
///
/// let clock = container.resolve::<Clock>().unwrap();
/// assert_eq!(clock.offset, 2);
/// ```
#[derive(Clone)]
pub struct Container {
    storage: Arc<ServiceStorage>,
}

impl Container {
    /// Create a new, empty container.
    #[inline]
    pub fn new() -> Self {
        #[cfg(feature = "logging")]
        debug!(target: "construct", "Creating new container");

        Self {
            storage: Arc::new(ServiceStorage::new()),
        }
    }

    /// Create a container with pre-allocated capacity.
    ///
    /// Use this when you know approximately how many services will be registered.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        #[cfg(feature = "logging")]
        debug!(target: "construct", capacity, "Creating new container");

        Self {
            storage: Arc::new(ServiceStorage::with_capacity(capacity)),
        }
    }

    /// Start configuring a fresh container.
    #[inline]
    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::new()
    }

    /// Run application wiring against this container.
    ///
    /// Creates a builder bound to `self`, hands it and the container to
    /// `configuration`, and returns the builder for the caller to
    /// [`build`](ContainerBuilder::build).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use construct::Container;
    ///
    /// struct Settings { verbose: bool }
    ///
    /// let container = Container::new();
    /// container
    ///     .configure(|builder, _container| {
    ///         builder.register(|| Settings { verbose: true }).single_instance();
    ///     })
    ///     .build()
    ///     .unwrap();
    ///
    /// assert!(container.resolve::<Settings>().unwrap().verbose);
    /// ```
    pub fn configure<F>(&self, configuration: F) -> ContainerBuilder
    where
        F: FnOnce(&mut ContainerBuilder, &Container),
    {
        let mut builder = ContainerBuilder::for_container(self.clone());
        configuration(&mut builder, self);

        #[cfg(feature = "logging")]
        debug!(
            target: "construct",
            registrations = builder.len(),
            "Container configured"
        );

        builder
    }

    // =========================================================================
    // Resolution Methods
    // =========================================================================

    /// Resolve a service by type.
    ///
    /// Runs the registered factory (transient) or hands out the shared
    /// instance (singleton).
    ///
    /// # Errors
    ///
    /// [`DiError::NotFound`] if nothing is registered under `T`; any error
    /// raised while constructing it or its dependencies.
    #[inline]
    pub fn resolve<T: ?Sized + Injectable>(&self) -> Result<Arc<T>> {
        self.resolve_key(TypeKey::of::<T>())?.try_downcast::<T>()
    }

    /// Resolve by a runtime type key, returning the erased instance.
    pub fn resolve_key(&self, key: TypeKey) -> Result<Instance> {
        let mut resolver = self.resolver();
        match resolver.lookup(key)? {
            Some(instance) => Ok(instance),
            None => {
                #[cfg(feature = "logging")]
                debug!(
                    target: "construct",
                    service = key.name(),
                    "Service not found in container"
                );

                Err(DiError::not_found(key))
            }
        }
    }

    /// Try to resolve, returning None on any failure.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use construct::Container;
    ///
    /// struct OptionalService;
    ///
    /// let container = Container::new();
    /// assert!(container.try_resolve::<OptionalService>().is_none());
    /// ```
    #[inline]
    pub fn try_resolve<T: ?Sized + Injectable>(&self) -> Option<Arc<T>> {
        self.resolve::<T>().ok()
    }

    // =========================================================================
    // Query Methods
    // =========================================================================

    /// Check if a service is registered.
    #[inline]
    pub fn contains<T: ?Sized + Injectable>(&self) -> bool {
        self.contains_key(&TypeKey::of::<T>())
    }

    /// Check by type key.
    #[inline]
    pub fn contains_key(&self, key: &TypeKey) -> bool {
        self.storage.contains(key)
    }

    /// Lifetime of the registration for `T`, if registered.
    #[inline]
    pub fn lifetime_of<T: ?Sized + Injectable>(&self) -> Option<Lifetime> {
        self.lifetime_of_key(&TypeKey::of::<T>())
    }

    /// Lifetime by type key.
    #[inline]
    pub fn lifetime_of_key(&self, key: &TypeKey) -> Option<Lifetime> {
        self.storage.lifetime(key)
    }

    /// Number of registered services.
    #[inline]
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Check if nothing is registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// All registered type keys, in no particular order.
    pub fn registered_types(&self) -> Vec<TypeKey> {
        self.storage.keys()
    }

    // =========================================================================
    // Builder Hooks
    // =========================================================================

    /// Fresh resolver with an empty chain.
    #[inline]
    pub(crate) fn resolver(&self) -> Resolver<'_> {
        Resolver {
            container: self,
            chain: Vec::new(),
        }
    }

    /// Install a factory (build-time only).
    #[inline]
    pub(crate) fn add_registration(&self, key: TypeKey, factory: AnyFactory) -> Result<()> {
        self.storage.try_insert(key, factory)
    }

    /// Undo an `add_registration` from a failed build.
    #[inline]
    pub(crate) fn remove_registration(&self, key: &TypeKey) -> bool {
        self.storage.remove(key)
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("service_count", &self.len())
            .finish()
    }
}

// =============================================================================
// Resolver
// =============================================================================

/// One resolution in progress.
///
/// Factories registered with
/// [`register_with`](ContainerBuilder::register_with) receive the resolver
/// and use it to fetch their own dependencies; constructor injection uses it
/// the same way. The chain of keys under construction travels with it, so a
/// key that re-enters its own construction is reported as a cycle.
pub struct Resolver<'a> {
    container: &'a Container,
    chain: Vec<TypeKey>,
}

impl<'a> Resolver<'a> {
    /// Resolve a dependency by type.
    ///
    /// # Errors
    ///
    /// [`DiError::NotFound`] if `T` is not registered, otherwise whatever its
    /// construction raises.
    pub fn resolve<T: ?Sized + Injectable>(&mut self) -> Result<Arc<T>> {
        let key = TypeKey::of::<T>();
        match self.lookup(key)? {
            Some(instance) => instance.try_downcast::<T>(),
            None => Err(DiError::not_found(key)),
        }
    }

    /// Like [`resolve`](Self::resolve) but absent registrations give `Ok(None)`.
    ///
    /// Construction errors of a registered `T` still propagate.
    pub fn try_resolve<T: ?Sized + Injectable>(&mut self) -> Result<Option<Arc<T>>> {
        match self.lookup(TypeKey::of::<T>())? {
            Some(instance) => instance.try_downcast::<T>().map(Some),
            None => Ok(None),
        }
    }

    /// The container being resolved from.
    #[inline]
    pub fn container(&self) -> &'a Container {
        self.container
    }

    /// Keys currently under construction, outermost first.
    #[inline]
    pub fn chain(&self) -> &[TypeKey] {
        &self.chain
    }

    /// Non-throwing lookup: `Ok(None)` when `key` is not registered.
    ///
    /// A key already on the chain is a cycle even if it is not stored yet,
    /// as for a singleton being constructed during `build()`.
    pub(crate) fn lookup(&mut self, key: TypeKey) -> Result<Option<Instance>> {
        if self.chain.contains(&key) {
            return Err(self.cycle(key));
        }

        let Some(factory) = self.container.storage.get(&key) else {
            return Ok(None);
        };

        #[cfg(feature = "logging")]
        trace!(
            target: "construct",
            service = key.name(),
            depth = self.chain.len(),
            "Resolving service"
        );

        self.within(key, |resolver| factory.resolve(resolver)).map(Some)
    }

    /// Run `f` with `key` pushed onto the chain, failing if it is already there.
    pub(crate) fn within<R>(
        &mut self,
        key: TypeKey,
        f: impl FnOnce(&mut Self) -> Result<R>,
    ) -> Result<R> {
        if self.chain.contains(&key) {
            return Err(self.cycle(key));
        }

        self.chain.push(key);
        let result = f(self);
        self.chain.pop();
        result
    }

    fn cycle(&self, key: TypeKey) -> DiError {
        let err = DiError::circular(key, &self.chain);

        #[cfg(feature = "logging")]
        warn!(target: "construct", error = %err, "Dependency cycle detected");

        err
    }
}

impl std::fmt::Debug for Resolver<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("chain", &self.chain)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    struct TestService {
        value: String,
    }

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct English;

    impl Greeter for English {
        fn greet(&self) -> String {
            "hello".into()
        }
    }

    #[test]
    fn test_singleton() {
        let mut builder = ContainerBuilder::new();
        builder
            .register(|| TestService {
                value: "test".into(),
            })
            .single_instance();
        let container = builder.build().unwrap();

        let s1 = container.resolve::<TestService>().unwrap();
        let s2 = container.resolve::<TestService>().unwrap();

        assert_eq!(s1.value, "test");
        assert!(Arc::ptr_eq(&s1, &s2));
        assert_eq!(container.lifetime_of::<TestService>(), Some(Lifetime::Singleton));
        assert_eq!(
            container.lifetime_of_key(&TypeKey::of::<TestService>()),
            Some(Lifetime::Singleton)
        );
        assert_eq!(container.lifetime_of_key(&TypeKey::of::<String>()), None);
    }

    #[test]
    fn test_transient() {
        static COUNTER: AtomicU32 = AtomicU32::new(0);

        struct Counter(u32);

        let mut builder = ContainerBuilder::new();
        builder.register(|| Counter(COUNTER.fetch_add(1, Ordering::SeqCst)));
        let container = builder.build().unwrap();

        let c1 = container.resolve::<Counter>().unwrap();
        let c2 = container.resolve::<Counter>().unwrap();

        assert_ne!(c1.0, c2.0);
        assert!(!Arc::ptr_eq(&c1, &c2));
    }

    #[test]
    fn test_not_found() {
        let container = Container::new();
        let err = container.resolve::<TestService>().unwrap_err();

        assert_eq!(
            err,
            DiError::NotFound {
                type_name: std::any::type_name::<TestService>()
            }
        );
        assert!(container.try_resolve::<TestService>().is_none());
    }

    #[test]
    fn test_resolve_key() {
        let mut builder = ContainerBuilder::new();
        builder
            .register(|| English)
            .as_type::<dyn Greeter>(|english| english);
        let container = builder.build().unwrap();

        let instance = container.resolve_key(TypeKey::of::<dyn Greeter>()).unwrap();
        assert_eq!(instance.type_key(), TypeKey::of::<dyn Greeter>());
        assert_eq!(instance.downcast::<dyn Greeter>().unwrap().greet(), "hello");

        let err = container.resolve_key(TypeKey::of::<English>()).unwrap_err();
        assert!(matches!(err, DiError::NotFound { .. }));
    }

    #[test]
    fn test_configure_binds_builder() {
        let container = Container::new();
        let builder = container.configure(|builder, target| {
            assert!(target.is_empty());
            builder.register(|| TestService {
                value: "configured".into(),
            });
        });

        assert_eq!(builder.len(), 1);
        assert!(!container.contains::<TestService>());

        let built = builder.build().unwrap();
        assert!(container.contains::<TestService>());
        assert!(built.contains::<TestService>());
        assert_eq!(container.len(), 1);
    }

    #[test]
    fn test_resolver_reports_cycle() {
        let container = Container::new();
        let mut resolver = container.resolver();
        let key = TypeKey::of::<TestService>();

        let err = resolver
            .within(key, |inner| inner.within(key, |_| Ok(())))
            .unwrap_err();

        assert!(matches!(err, DiError::CircularDependency { .. }));
        assert!(resolver.chain().is_empty());
    }

    #[test]
    fn test_registered_types() {
        let mut builder = Container::builder();
        builder.register(|| English);
        builder.register(|| TestService { value: "x".into() });
        let container = builder.build().unwrap();

        let keys = container.registered_types();
        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&TypeKey::of::<English>()));
        assert!(keys.contains(&TypeKey::of::<TestService>()));
    }

    #[test]
    fn test_concurrent_resolve() {
        let mut builder = ContainerBuilder::with_capacity(1);
        builder
            .register(|| TestService {
                value: "shared".into(),
            })
            .single_instance();
        let container = builder.build().unwrap();
        let expected = container.resolve::<TestService>().unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let container = container.clone();
                std::thread::spawn(move || container.resolve::<TestService>().unwrap())
            })
            .collect();

        for handle in handles {
            let resolved = handle.join().unwrap();
            assert!(Arc::ptr_eq(&resolved, &expected));
        }
    }
}
