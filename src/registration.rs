//! Pending registrations and their fluent configuration handle

use crate::factory::{FactoryFn, Instance};
use crate::{Injectable, Lifetime, Resolver, TypeKey};
use std::marker::PhantomData;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::trace;

/// A pending binding of a type key to a construction strategy.
///
/// Lives in the [`ContainerBuilder`](crate::ContainerBuilder) until `build()`
/// consumes it.
pub(crate) struct Registration {
    pub(crate) key: TypeKey,
    pub(crate) implementation: TypeKey,
    pub(crate) factory: FactoryFn,
    pub(crate) lifetime: Lifetime,
}

impl Registration {
    /// Transient registration keyed under the implementation type itself.
    pub(crate) fn new(implementation: TypeKey, factory: FactoryFn) -> Self {
        Self {
            key: implementation,
            implementation,
            factory,
            lifetime: Lifetime::default(),
        }
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("key", &self.key)
            .field("implementation", &self.implementation)
            .field("lifetime", &self.lifetime)
            .finish()
    }
}

/// Fluent handle for the registration just added to a builder.
///
/// `T` is the type the registration is currently keyed under; it changes
/// with [`as_type`](Self::as_type).
///
/// # Examples
///
/// ```rust
/// use construct::ContainerBuilder;
/// use std::sync::Arc;
///
/// trait Storage: Send + Sync {
///     fn kind(&self) -> &'static str;
/// }
///
/// struct MemoryStorage;
///
/// impl Storage for MemoryStorage {
///     fn kind(&self) -> &'static str { "memory" }
/// }
///
/// let mut builder = ContainerBuilder::new();
/// builder
///     .register(|| MemoryStorage)
///     .as_type::<dyn Storage>(|storage| storage)
///     .single_instance();
///
/// let container = builder.build().unwrap();
/// let storage: Arc<dyn Storage> = container.resolve::<dyn Storage>().unwrap();
/// assert_eq!(storage.kind(), "memory");
/// assert!(!container.contains::<MemoryStorage>());
/// ```
pub struct RegistrationBuilder<'a, T: ?Sized> {
    registration: &'a mut Registration,
    _service: PhantomData<fn() -> Arc<T>>,
}

impl<'a, T: ?Sized + Injectable> RegistrationBuilder<'a, T> {
    pub(crate) fn new(registration: &'a mut Registration) -> Self {
        Self {
            registration,
            _service: PhantomData,
        }
    }

    /// Store this registration under `U` instead of `T`.
    ///
    /// `cast` performs the upcast, usually just `|service| service` with the
    /// coercion to `Arc<U>` left to the compiler. The registration stops
    /// being resolvable as `T`.
    pub fn as_type<U: ?Sized + Injectable>(
        self,
        cast: impl Fn(Arc<T>) -> Arc<U> + Send + Sync + 'static,
    ) -> RegistrationBuilder<'a, U> {
        let inner = Arc::clone(&self.registration.factory);
        let factory: FactoryFn = Arc::new(move |resolver: &mut Resolver<'_>| {
            let service = inner(resolver)?.try_downcast::<T>()?;
            Ok(Instance::new(cast(service)))
        });

        #[cfg(feature = "logging")]
        trace!(
            target: "construct",
            implementation = self.registration.implementation.name(),
            from = self.registration.key.name(),
            to = std::any::type_name::<U>(),
            "Registration re-keyed"
        );

        self.registration.factory = factory;
        self.registration.key = TypeKey::of::<U>();
        RegistrationBuilder::new(self.registration)
    }

    /// Construct once during `build()` and share the instance.
    pub fn single_instance(self) -> Self {
        self.registration.lifetime = Lifetime::Singleton;
        self
    }

    /// Construct a new instance on every resolve (the default).
    pub fn instance_per_dependency(self) -> Self {
        self.registration.lifetime = Lifetime::Transient;
        self
    }

    /// Key the registration will be stored under.
    #[inline]
    pub fn key(&self) -> TypeKey {
        self.registration.key
    }

    /// Current lifetime.
    #[inline]
    pub fn lifetime(&self) -> Lifetime {
        self.registration.lifetime
    }
}

impl<T: ?Sized> std::fmt::Debug for RegistrationBuilder<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("RegistrationBuilder")
            .field(&self.registration)
            .finish()
    }
}
