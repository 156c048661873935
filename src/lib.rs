//! # Construct - Constructor Injection Container for Rust
//!
//! A small inversion-of-control container: register how services are made,
//! `build()` the registry once at startup, then resolve services by type.
//!
//! ## Features
//!
//! - 🧩 **Constructor injection** - Services declare their constructors; the container supplies the arguments
//! - ♻️ **Two lifetimes** - Singletons are built once during `build()`, transients on every resolve
//! - 🎭 **Trait-object keys** - Expose a registration as `dyn Trait` with `as_type`
//! - 🔁 **Cycle detection** - Dependency cycles fail with the full chain instead of overflowing the stack
//! - 🔒 **Lock-free reads** - Uses `DashMap` for concurrent resolution
//! - 📊 **Observable** - Optional tracing integration with JSON or pretty output
//!
//! ## Quick Start
//!
//! ```rust
//! use construct::ContainerBuilder;
//!
//! struct Config {
//!     url: String,
//! }
//!
//! let mut builder = ContainerBuilder::new();
//! builder
//!     .register(|| Config { url: "postgres://localhost".into() })
//!     .single_instance();
//!
//! let container = builder.build().unwrap();
//!
//! // Resolve - returns Arc<T>
//! let config = container.resolve::<Config>().unwrap();
//! assert_eq!(config.url, "postgres://localhost");
//! ```
//!
//! ## Service Lifetimes
//!
//! ```rust
//! use construct::ContainerBuilder;
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicU64, Ordering};
//!
//! static COUNTER: AtomicU64 = AtomicU64::new(0);
//!
//! struct Clock;
//! struct RequestId(u64);
//!
//! let mut builder = ContainerBuilder::new();
//!
//! // Singleton - constructed during build(), shared everywhere
//! builder.register(|| Clock).single_instance();
//!
//! // Transient (the default) - new instance every time
//! builder.register(|| RequestId(COUNTER.fetch_add(1, Ordering::SeqCst)));
//!
//! let container = builder.build().unwrap();
//!
//! let a = container.resolve::<Clock>().unwrap();
//! let b = container.resolve::<Clock>().unwrap();
//! assert!(Arc::ptr_eq(&a, &b));
//!
//! let first = container.resolve::<RequestId>().unwrap();
//! let second = container.resolve::<RequestId>().unwrap();
//! assert_ne!(first.0, second.0);
//! ```
//!
//! ## Auto-wiring
//!
//! ```rust
//! use construct::{Constructible, Constructor, ContainerBuilder};
//! use std::sync::Arc;
//!
//! trait Greeter: Send + Sync {
//!     fn greet(&self) -> String;
//! }
//!
//! struct Logger;
//!
//! struct English {
//!     logger: Arc<Logger>,
//! }
//!
//! impl Greeter for English {
//!     fn greet(&self) -> String {
//!         "hello".into()
//!     }
//! }
//!
//! impl Constructible for English {
//!     fn constructors() -> Vec<Constructor<Self>> {
//!         vec![Constructor::new(|logger: Arc<Logger>| English { logger })]
//!     }
//! }
//!
//! let mut builder = ContainerBuilder::new();
//! builder.register(|| Logger).single_instance();
//! builder
//!     .autowire::<English>()
//!     .unwrap()
//!     .as_type::<dyn Greeter>(|english| english);
//!
//! let container = builder.build().unwrap();
//! let greeter = container.resolve::<dyn Greeter>().unwrap();
//! assert_eq!(greeter.greet(), "hello");
//! ```
//!
//! With the `derive` feature, `#[derive(Constructible)]` writes the
//! `Constructible` impl from fields marked `#[inject]`.
//!
//! ## Errors
//!
//! Every fallible operation returns [`DiError`]. Resolving an unregistered
//! type, a missing constructor dependency and a dependency cycle are all
//! reported as values; the container never panics on them.

// Lets `#[derive(Constructible)]` expand to `::construct::...` inside this crate.
extern crate self as construct;

mod builder;
mod constructor;
mod container;
mod error;
mod factory;
mod key;
#[cfg(feature = "logging")]
pub mod logging;
mod provider;
mod registration;
mod storage;

pub use builder::*;
pub use constructor::*;
pub use container::*;
pub use error::*;
pub use factory::*;
pub use key::*;
pub use provider::*;
pub use registration::*;

#[cfg(feature = "derive")]
pub use construct_derive::Constructible;

// Re-export tracing macros for convenience when logging feature is enabled
#[cfg(feature = "logging")]
pub use tracing::{debug, error, info, trace, warn};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        Constructible, Constructor, Container, ContainerBuilder, DiError, Injectable, Lifetime,
        Resolver, Result,
    };
    pub use std::sync::Arc;
}
