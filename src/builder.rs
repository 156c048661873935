//! Container builder
//!
//! Registrations are collected first and only installed into the container
//! by [`ContainerBuilder::build`], in registration order. Singletons are
//! constructed right there, so anything their construction does (or fails
//! with) happens inside `build()`, never on first resolve.

use crate::constructor::{Constructible, injecting_factory, select_constructor};
use crate::factory::{AnyFactory, FactoryFn, Instance};
use crate::registration::{Registration, RegistrationBuilder};
use crate::{Container, DiError, Injectable, Lifetime, Resolver, Result, TypeKey};
use ahash::RandomState;
use std::collections::HashSet;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::{debug, trace, warn};

/// Accumulates registrations and freezes them into a [`Container`].
///
/// # Examples
///
/// ```rust
/// use construct::{Constructible, Constructor, ContainerBuilder};
/// use std::sync::Arc;
///
/// struct Logger;
///
/// trait Greeter: Send + Sync {
///     fn greet(&self) -> String;
/// }
///
/// struct Service { logger: Arc<Logger> }
///
/// impl Greeter for Service {
///     fn greet(&self) -> String { "hi".into() }
/// }
///
/// impl Constructible for Service {
///     fn constructors() -> Vec<Constructor<Self>> {
///         vec![Constructor::new(|logger: Arc<Logger>| Service { logger })]
///     }
/// }
///
/// let mut builder = ContainerBuilder::new();
/// builder.register(|| Logger).single_instance();
/// builder.autowire::<Service>()?.as_type::<dyn Greeter>(|s| s);
///
/// let container = builder.build()?;
/// assert_eq!(container.resolve::<dyn Greeter>()?.greet(), "hi");
/// # Ok::<(), construct::DiError>(())
/// ```
pub struct ContainerBuilder {
    container: Container,
    registrations: Vec<Registration>,
}

impl ContainerBuilder {
    /// Builder for a fresh container.
    #[inline]
    pub fn new() -> Self {
        Self::for_container(Container::new())
    }

    /// Builder for a fresh container sized for `capacity` registrations.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            container: Container::with_capacity(capacity),
            registrations: Vec::with_capacity(capacity),
        }
    }

    /// Builder that installs into an existing container.
    #[inline]
    pub(crate) fn for_container(container: Container) -> Self {
        Self {
            container,
            registrations: Vec::new(),
        }
    }

    // =========================================================================
    // Registration Methods
    // =========================================================================

    /// Register a factory the caller fully controls.
    ///
    /// No auto-wiring: the closure supplies whatever the service needs.
    pub fn register<T, F>(&mut self, factory: F) -> RegistrationBuilder<'_, T>
    where
        T: Injectable,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let factory: FactoryFn =
            Arc::new(move |_: &mut Resolver<'_>| Ok(Instance::new(Arc::new(factory()))));
        self.push::<T>(factory)
    }

    /// Register a factory that resolves its own dependencies.
    ///
    /// The resolver shares cycle detection with the resolution that invoked
    /// the factory.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use construct::ContainerBuilder;
    ///
    /// struct Port(u16);
    /// struct Server { port: u16 }
    ///
    /// let mut builder = ContainerBuilder::new();
    /// builder.register(|| Port(8080));
    /// builder.register_with(|resolver| {
    ///     let port = resolver.resolve::<Port>()?;
    ///     Ok(Server { port: port.0 })
    /// });
    ///
    /// let container = builder.build().unwrap();
    /// assert_eq!(container.resolve::<Server>().unwrap().port, 8080);
    /// ```
    pub fn register_with<T, F>(&mut self, factory: F) -> RegistrationBuilder<'_, T>
    where
        T: Injectable,
        F: Fn(&mut Resolver<'_>) -> Result<T> + Send + Sync + 'static,
    {
        let factory: FactoryFn = Arc::new(move |resolver: &mut Resolver<'_>| {
            Ok(Instance::new(Arc::new(factory(resolver)?)))
        });
        self.push::<T>(factory)
    }

    /// Register an already constructed value as a singleton.
    pub fn register_instance<T: Injectable>(&mut self, instance: T) -> RegistrationBuilder<'_, T> {
        let shared = Arc::new(instance);
        let factory: FactoryFn =
            Arc::new(move |_: &mut Resolver<'_>| Ok(Instance::new(Arc::clone(&shared))));
        self.push::<T>(factory).single_instance()
    }

    /// Register `T` for constructor injection.
    ///
    /// Uses the constructor with the most parameters; its parameters are
    /// resolved from the container each time `T` is constructed.
    ///
    /// # Errors
    ///
    /// [`DiError::NoConstructor`] or [`DiError::AmbiguousConstructor`] when
    /// no single constructor has the greatest parameter count. Nothing is
    /// registered in that case.
    pub fn autowire<T: Constructible>(&mut self) -> Result<RegistrationBuilder<'_, T>> {
        let constructor = select_constructor::<T>()?;
        Ok(self.push::<T>(injecting_factory(constructor)))
    }

    fn push<T: Injectable>(&mut self, factory: FactoryFn) -> RegistrationBuilder<'_, T> {
        let key = TypeKey::of::<T>();

        #[cfg(feature = "logging")]
        trace!(
            target: "construct",
            service = key.name(),
            position = self.registrations.len(),
            "Adding registration"
        );

        let index = self.registrations.len();
        self.registrations.push(Registration::new(key, factory));
        RegistrationBuilder::new(&mut self.registrations[index])
    }

    // =========================================================================
    // Query Methods
    // =========================================================================

    /// Number of pending registrations.
    #[inline]
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Check if nothing has been registered yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// The container this builder installs into.
    #[inline]
    pub fn container(&self) -> &Container {
        &self.container
    }

    // =========================================================================
    // Build
    // =========================================================================

    /// Install every registration into the container, in order.
    ///
    /// Singletons are constructed now, once; transients are installed as-is
    /// and construct on each resolve. A singleton can therefore only depend
    /// on registrations made before it (or already in the container).
    ///
    /// # Errors
    ///
    /// - [`DiError::AlreadyRegistered`] if two registrations share a key or
    ///   a key is already in the container; checked before anything is
    ///   constructed.
    /// - Any error raised while constructing a singleton.
    ///
    /// On error every entry this call installed is removed again.
    pub fn build(self) -> Result<Container> {
        let Self {
            container,
            registrations,
        } = self;

        let mut keys: HashSet<TypeKey, RandomState> =
            HashSet::with_capacity_and_hasher(registrations.len(), RandomState::new());
        for registration in &registrations {
            if !keys.insert(registration.key) || container.contains_key(&registration.key) {
                return Err(DiError::already_registered(registration.key));
            }
        }

        #[cfg(feature = "logging")]
        debug!(
            target: "construct",
            registrations = registrations.len(),
            existing = container.len(),
            "Building container"
        );

        let mut installed = Vec::with_capacity(registrations.len());
        for registration in registrations {
            match install(&container, registration) {
                Ok(key) => installed.push(key),
                Err(err) => {
                    #[cfg(feature = "logging")]
                    warn!(
                        target: "construct",
                        error = %err,
                        rolled_back = installed.len(),
                        "Build failed, removing installed registrations"
                    );

                    for key in &installed {
                        container.remove_registration(key);
                    }
                    return Err(err);
                }
            }
        }

        #[cfg(feature = "logging")]
        debug!(
            target: "construct",
            installed = installed.len(),
            service_count = container.len(),
            "Container built"
        );

        Ok(container)
    }
}

/// Install one registration, constructing it first if it is a singleton.
fn install(container: &Container, registration: Registration) -> Result<TypeKey> {
    let Registration {
        key,
        implementation,
        factory,
        lifetime,
    } = registration;

    #[cfg(not(feature = "logging"))]
    let _ = implementation;

    let entry = match lifetime {
        Lifetime::Singleton => {
            let instance = container
                .resolver()
                .within(key, |resolver| factory(resolver))?;

            #[cfg(feature = "logging")]
            debug!(
                target: "construct",
                service = key.name(),
                implementation = implementation.name(),
                lifetime = lifetime.as_str(),
                "Singleton constructed"
            );

            AnyFactory::singleton(instance)
        }
        Lifetime::Transient => {
            #[cfg(feature = "logging")]
            debug!(
                target: "construct",
                service = key.name(),
                implementation = implementation.name(),
                lifetime = lifetime.as_str(),
                "Registering transient service"
            );

            AnyFactory::transient(key, factory)
        }
    };

    container.add_registration(key, entry)?;
    Ok(key)
}

impl Default for ContainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ContainerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerBuilder")
            .field("container", &self.container)
            .field("registrations", &self.registrations)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Constructor;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Config {
        name: &'static str,
    }

    struct Database;

    struct Repository {
        db: Arc<Database>,
    }

    impl Constructible for Repository {
        fn constructors() -> Vec<Constructor<Self>> {
            vec![Constructor::new(|db: Arc<Database>| Repository { db })]
        }
    }

    #[test]
    fn test_singleton_constructed_at_build() {
        static CREATED: AtomicU32 = AtomicU32::new(0);

        let mut builder = ContainerBuilder::new();
        builder
            .register(|| {
                CREATED.fetch_add(1, Ordering::SeqCst);
                Config { name: "app" }
            })
            .single_instance();

        assert_eq!(CREATED.load(Ordering::SeqCst), 0);
        let container = builder.build().unwrap();
        assert_eq!(CREATED.load(Ordering::SeqCst), 1);

        for _ in 0..5 {
            assert_eq!(container.resolve::<Config>().unwrap().name, "app");
        }
        assert_eq!(CREATED.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_transient_deferred_until_resolve() {
        static CREATED: AtomicU32 = AtomicU32::new(0);

        let mut builder = ContainerBuilder::new();
        builder.register(|| {
            CREATED.fetch_add(1, Ordering::SeqCst);
            Config { name: "t" }
        });
        let container = builder.build().unwrap();
        assert_eq!(CREATED.load(Ordering::SeqCst), 0);

        container.resolve::<Config>().unwrap();
        container.resolve::<Config>().unwrap();
        assert_eq!(CREATED.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_instance_per_dependency_reverses_singleton() {
        let mut builder = ContainerBuilder::new();
        builder
            .register(|| Config { name: "x" })
            .single_instance()
            .instance_per_dependency();
        let container = builder.build().unwrap();

        let a = container.resolve::<Config>().unwrap();
        let b = container.resolve::<Config>().unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(container.lifetime_of::<Config>(), Some(Lifetime::Transient));
    }

    #[test]
    fn test_register_instance_is_shared() {
        let mut builder = ContainerBuilder::new();
        builder.register_instance(Config { name: "given" });
        let container = builder.build().unwrap();

        let a = container.resolve::<Config>().unwrap();
        let b = container.resolve::<Config>().unwrap();
        assert_eq!(a.name, "given");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_duplicate_key_rejected_before_construction() {
        static CREATED: AtomicU32 = AtomicU32::new(0);

        let mut builder = ContainerBuilder::new();
        builder
            .register(|| {
                CREATED.fetch_add(1, Ordering::SeqCst);
                Config { name: "first" }
            })
            .single_instance();
        builder.register(|| Config { name: "second" });

        let container = builder.container().clone();
        let err = builder.build().unwrap_err();

        assert!(matches!(err, DiError::AlreadyRegistered { .. }));
        assert_eq!(CREATED.load(Ordering::SeqCst), 0);
        assert!(container.is_empty());
    }

    #[test]
    fn test_key_already_in_container() {
        let container = Container::new();
        container
            .configure(|builder, _| {
                builder.register(|| Database);
            })
            .build()
            .unwrap();

        let err = container
            .configure(|builder, _| {
                builder.register(|| Database);
            })
            .build()
            .unwrap_err();

        assert!(matches!(err, DiError::AlreadyRegistered { .. }));
        assert_eq!(container.len(), 1);
    }

    #[test]
    fn test_failed_singleton_rolls_back() {
        let mut builder = ContainerBuilder::new();
        builder.register(|| Config { name: "kept?" });
        builder.autowire::<Repository>().unwrap().single_instance();

        let container = builder.container().clone();
        let err = builder.build().unwrap_err();

        assert_eq!(
            err,
            DiError::MissingDependency {
                service: std::any::type_name::<Repository>(),
                dependency: std::any::type_name::<Database>(),
            }
        );
        assert!(container.is_empty());
    }

    #[test]
    fn test_singleton_sees_only_earlier_registrations() {
        let mut builder = ContainerBuilder::new();
        builder.autowire::<Repository>().unwrap().single_instance();
        builder.register(|| Database);
        assert!(builder.build().is_err());

        let mut builder = ContainerBuilder::new();
        builder.register(|| Database).single_instance();
        builder.autowire::<Repository>().unwrap().single_instance();
        let container = builder.build().unwrap();

        let repo = container.resolve::<Repository>().unwrap();
        let db = container.resolve::<Database>().unwrap();
        assert!(Arc::ptr_eq(&repo.db, &db));
    }

    #[test]
    fn test_register_with_detects_cycle() {
        #[derive(Debug)]
        struct Ping;
        #[derive(Debug)]
        struct Pong;

        let mut builder = ContainerBuilder::new();
        builder.register_with(|resolver| {
            resolver.resolve::<Pong>()?;
            Ok(Ping)
        });
        builder.register_with(|resolver| {
            resolver.resolve::<Ping>()?;
            Ok(Pong)
        });
        let container = builder.build().unwrap();

        match container.resolve::<Ping>().unwrap_err() {
            DiError::CircularDependency { type_name, chain } => {
                assert_eq!(type_name, std::any::type_name::<Ping>());
                assert_eq!(chain.split(" -> ").count(), 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_cycle_through_singleton_under_construction() {
        struct Front {
            _back: Arc<Back>,
        }
        struct Back {
            _front: Arc<Front>,
        }

        impl Constructible for Front {
            fn constructors() -> Vec<Constructor<Self>> {
                vec![Constructor::new(|back: Arc<Back>| Front { _back: back })]
            }
        }

        impl Constructible for Back {
            fn constructors() -> Vec<Constructor<Self>> {
                vec![Constructor::new(|front: Arc<Front>| Back { _front: front })]
            }
        }

        let mut builder = ContainerBuilder::new();
        builder.autowire::<Front>().unwrap();
        builder.autowire::<Back>().unwrap().single_instance();

        let container = builder.container().clone();
        match builder.build() {
            Err(DiError::CircularDependency { type_name, chain }) => {
                assert_eq!(type_name, std::any::type_name::<Back>());
                assert_eq!(chain.split(" -> ").count(), 3);
                assert!(chain.contains("Front"));
            }
            other => panic!("expected CircularDependency, got {:?}", other.map(|_| ())),
        }
        assert!(container.is_empty());
    }

    #[test]
    fn test_singleton_resolving_itself() {
        struct Selfish;

        let mut builder = ContainerBuilder::new();
        builder
            .register_with(|resolver| {
                resolver.resolve::<Selfish>()?;
                Ok(Selfish)
            })
            .single_instance();

        assert!(matches!(
            builder.build(),
            Err(DiError::CircularDependency { .. })
        ));
    }

    #[test]
    fn test_register_with_optional_dependency() {
        struct Cache;
        struct Service {
            cached: bool,
        }

        let mut builder = ContainerBuilder::new();
        builder.register_with(|resolver| {
            assert!(!resolver.container().contains::<Cache>());
            Ok(Service {
                cached: resolver.try_resolve::<Cache>()?.is_some(),
            })
        });
        let container = builder.build().unwrap();

        assert!(!container.resolve::<Service>().unwrap().cached);
    }

    #[test]
    fn test_len_tracks_pending() {
        let mut builder = ContainerBuilder::default();
        assert!(builder.is_empty());
        builder.register(|| Database);
        builder.autowire::<Repository>().unwrap();
        assert_eq!(builder.len(), 2);
    }
}
