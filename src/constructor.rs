//! Constructor injection
//!
//! Rust has no runtime reflection, so a type opts into auto-wiring by
//! describing its constructors through [`Constructible`]. Each
//! [`Constructor`] lists the [`TypeKey`] of every parameter and knows how to
//! build the value from resolved arguments.
//!
//! [`ContainerBuilder::autowire`](crate::ContainerBuilder::autowire) picks
//! the constructor with the most parameters (rejecting ties) and installs a
//! factory that, at construction time:
//!
//! 1. looks up every parameter through the resolver's non-throwing lookup,
//! 2. fails with [`DiError::MissingDependency`] at the first parameter that
//!    is not registered, before anything is constructed,
//! 3. otherwise calls the constructor with the arguments in declaration order.
//!
//! # Example
//!
//! ```rust
//! use construct::{Constructible, Constructor, ContainerBuilder};
//! use std::sync::Arc;
//!
//! struct Config { url: String }
//!
//! struct Database { url: String }
//!
//! impl Constructible for Database {
//!     fn constructors() -> Vec<Constructor<Self>> {
//!         vec![
//!             Constructor::new(|| Database { url: "memory://".into() }),
//!             Constructor::new(|config: Arc<Config>| Database { url: config.url.clone() }),
//!         ]
//!     }
//! }
//!
//! let mut builder = ContainerBuilder::new();
//! builder.register(|| Config { url: "postgres://localhost".into() });
//! builder.autowire::<Database>().unwrap();
//! let container = builder.build().unwrap();
//!
//! // The one-parameter constructor wins
//! assert_eq!(container.resolve::<Database>().unwrap().url, "postgres://localhost");
//! ```

use crate::factory::{FactoryFn, Instance};
use crate::{DiError, Injectable, Resolver, Result, TypeKey};
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// A type that describes how to construct itself from other services.
///
/// Implement by hand with [`Constructor::new`], or derive it with
/// `#[derive(Constructible)]` (feature `derive`).
pub trait Constructible: Injectable + Sized {
    /// Every constructor the type offers, in declaration order.
    fn constructors() -> Vec<Constructor<Self>>;
}

type InvokeFn<T> = Box<dyn Fn(&mut Arguments) -> Result<T> + Send + Sync>;

/// One way of constructing `T`: its parameter types and a function over them.
pub struct Constructor<T> {
    parameters: Vec<TypeKey>,
    invoke: InvokeFn<T>,
}

impl<T: Injectable> Constructor<T> {
    /// Describe a constructor from a closure taking `Arc<_>` parameters.
    ///
    /// Parameter types must be spelled out on the closure
    /// (`|db: Arc<Database>| ...`); up to twelve are supported.
    #[inline]
    pub fn new<Args, F>(constructor: F) -> Self
    where
        F: ConstructorFn<T, Args>,
    {
        Self {
            parameters: F::parameters(),
            invoke: Box::new(move |args: &mut Arguments| constructor.call(args)),
        }
    }

    /// Describe a constructor from an explicit parameter list.
    ///
    /// `invoke` must read the arguments with [`Arguments::next`] in the order
    /// given by `parameters`. Used by `#[derive(Constructible)]`.
    #[inline]
    pub fn from_parts<F>(parameters: Vec<TypeKey>, invoke: F) -> Self
    where
        F: Fn(&mut Arguments) -> Result<T> + Send + Sync + 'static,
    {
        Self {
            parameters,
            invoke: Box::new(invoke),
        }
    }

    /// Parameter types in declaration order.
    #[inline]
    pub fn parameters(&self) -> &[TypeKey] {
        &self.parameters
    }

    /// Number of parameters.
    #[inline]
    pub fn arity(&self) -> usize {
        self.parameters.len()
    }

    /// Resolve every parameter, then construct.
    ///
    /// Nothing is constructed unless all parameters resolve.
    pub(crate) fn construct(&self, resolver: &mut Resolver<'_>) -> Result<T> {
        let service = TypeKey::of::<T>();
        let mut values = Vec::with_capacity(self.parameters.len());

        for &parameter in &self.parameters {
            match resolver.lookup(parameter)? {
                Some(instance) => values.push(instance),
                None => {
                    #[cfg(feature = "logging")]
                    debug!(
                        target: "construct",
                        service = service.name(),
                        dependency = parameter.name(),
                        "Constructor dependency not registered"
                    );

                    return Err(DiError::missing_dependency(service, parameter));
                }
            }
        }

        #[cfg(feature = "logging")]
        trace!(
            target: "construct",
            service = service.name(),
            arguments = values.len(),
            "Invoking constructor"
        );

        let mut args = Arguments::new(service, values);
        (self.invoke)(&mut args)
    }
}

impl<T> std::fmt::Debug for Constructor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Constructor")
            .field("parameters", &self.parameters)
            .finish()
    }
}

// =============================================================================
// Arguments
// =============================================================================

/// Resolved constructor arguments, consumed front to back.
#[derive(Debug)]
pub struct Arguments {
    service: TypeKey,
    values: std::vec::IntoIter<Instance>,
}

impl Arguments {
    fn new(service: TypeKey, values: Vec<Instance>) -> Self {
        Self {
            service,
            values: values.into_iter(),
        }
    }

    /// Take the next argument as `Arc<P>`.
    ///
    /// # Errors
    ///
    /// [`DiError::CreationFailed`] when more arguments are read than the
    /// constructor declared, [`DiError::TypeMismatch`] when the argument is
    /// not a `P`.
    pub fn next<P: ?Sized + Injectable>(&mut self) -> Result<Arc<P>> {
        let instance = self.values.next().ok_or_else(|| DiError::CreationFailed {
            type_name: self.service.name(),
            reason: format!(
                "constructor read more arguments than it declared (wanted {})",
                std::any::type_name::<P>()
            ),
        })?;
        instance.try_downcast::<P>()
    }

    /// Arguments not yet taken.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.values.len()
    }
}

// =============================================================================
// ConstructorFn - closures usable as constructors
// =============================================================================

/// Closures `Fn(Arc<A>, Arc<B>, ...) -> T` usable with [`Constructor::new`].
///
/// `Args` is the tuple of parameter types, used only to tell the arities
/// apart.
pub trait ConstructorFn<T, Args>: Send + Sync + 'static {
    /// Parameter keys in declaration order.
    fn parameters() -> Vec<TypeKey>;

    /// Call with arguments taken from `args`.
    fn call(&self, args: &mut Arguments) -> Result<T>;
}

macro_rules! impl_constructor_fn {
    ($($P:ident),*) => {
        impl<T, F, $($P),*> ConstructorFn<T, ($(Arc<$P>,)*)> for F
        where
            F: Fn($(Arc<$P>),*) -> T + Send + Sync + 'static,
            $($P: ?Sized + Injectable,)*
        {
            #[inline]
            fn parameters() -> Vec<TypeKey> {
                vec![$(TypeKey::of::<$P>()),*]
            }

            #[inline]
            #[allow(non_snake_case, unused_variables)]
            fn call(&self, args: &mut Arguments) -> Result<T> {
                $(let $P = args.next::<$P>()?;)*
                Ok(self($($P),*))
            }
        }
    };
}

impl_constructor_fn!();
impl_constructor_fn!(A);
impl_constructor_fn!(A, B);
impl_constructor_fn!(A, B, C);
impl_constructor_fn!(A, B, C, D);
impl_constructor_fn!(A, B, C, D, E);
impl_constructor_fn!(A, B, C, D, E, G);
impl_constructor_fn!(A, B, C, D, E, G, H);
impl_constructor_fn!(A, B, C, D, E, G, H, I);
impl_constructor_fn!(A, B, C, D, E, G, H, I, J);
impl_constructor_fn!(A, B, C, D, E, G, H, I, J, K);
impl_constructor_fn!(A, B, C, D, E, G, H, I, J, K, L);
impl_constructor_fn!(A, B, C, D, E, G, H, I, J, K, L, M);

// =============================================================================
// Selection
// =============================================================================

/// Pick the constructor with the greatest parameter count.
///
/// Resolvability of the parameters is not considered.
///
/// # Errors
///
/// [`DiError::NoConstructor`] if `T` declares none,
/// [`DiError::AmbiguousConstructor`] if the maximum is shared.
pub fn select_constructor<T: Constructible>() -> Result<Constructor<T>> {
    let mut candidates = T::constructors();
    let type_name = std::any::type_name::<T>();

    let arity = candidates
        .iter()
        .map(Constructor::arity)
        .max()
        .ok_or(DiError::NoConstructor { type_name })?;

    let mut widest = candidates
        .iter()
        .enumerate()
        .filter(|(_, c)| c.arity() == arity)
        .map(|(index, _)| index);

    let index = match (widest.next(), widest.next()) {
        (Some(index), None) => index,
        _ => return Err(DiError::AmbiguousConstructor { type_name, arity }),
    };

    #[cfg(feature = "logging")]
    debug!(
        target: "construct",
        service = type_name,
        arity,
        candidates = candidates.len(),
        "Selected constructor"
    );

    Ok(candidates.swap_remove(index))
}

/// Factory that constructs `T` through `constructor` on every call.
pub(crate) fn injecting_factory<T: Constructible>(constructor: Constructor<T>) -> FactoryFn {
    Arc::new(move |resolver: &mut Resolver<'_>| {
        let service = constructor.construct(resolver)?;
        Ok(Instance::new(Arc::new(service)))
    })
}
