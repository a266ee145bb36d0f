//! Type keyed dependency resolution.
//!
//! Providers are plain functions. Their argument types are what they need,
//! their return type is what they produce. The DI consists of two parts:
//! 1. The [RegistryBuilder], where all providers are registered. Building
//!    validates the dependency graph: one provider per type, every dependency
//!    provided, no cycles.
//! 2. The [Registry], which lazily constructs instances and injects them into
//!    the fields of a [Destination]. Each type is constructed at most once per
//!    cache and every consumer receives a clone of the same instance.
//!
//! # Example
//!
//! ```
//! use provider_di::{Inject, RegistryBuilder};
//!
//! #[derive(Inject, Default)]
//! struct Deps {
//!     greeting: String,
//!     length: usize,
//! }
//!
//! let registry = RegistryBuilder::new()
//!     .provide(|| "hello".to_string())
//!     .provide(|greeting: String| greeting.len())
//!     .build()
//!     .unwrap();
//!
//! let mut deps = Deps::default();
//! registry.inject(&mut deps).unwrap();
//!
//! assert_eq!(deps.greeting, "hello");
//! assert_eq!(deps.length, 5);
//! ```
//!
//! # Groups
//!
//! Fields marked `#[di(group)]` are nested destinations and are filled field
//! by field with the same registry and cache. Fields marked `#[di(ignore)]`
//! are left untouched.

// Lets the derive macro refer to `::provider_di` from within this crate
extern crate self as provider_di;

pub mod builder;
pub mod config;
mod dependency_graph;
pub mod destination;
pub mod errors;
pub mod injector;
pub mod provider;
pub mod registry;
pub mod types;

pub use builder::{build, RegistryBuilder};
pub use config::{CachePolicy, RegistryConfig};
pub use destination::{Destination, Directive, FieldMut, FieldSpec};
pub use errors::{BuildError, DowncastError, InjectError, ShapeError};
pub use injector::{Injector, ResolutionCache};
pub use provider::{OutputInfo, ProviderDeclaration, ProviderFn, TryProviderFn};
pub use registry::{ProviderMetadata, Registry, Session};
pub use types::{DynError, Injectable, Instance, TypeInfo};

pub use provider_di_macros::Inject;
