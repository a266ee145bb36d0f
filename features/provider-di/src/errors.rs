use thiserror::Error;

use crate::types::{DynError, TypeInfo};

/// Errors while building a [Registry](crate::registry::Registry)
#[derive(Error, Debug, Clone)]
pub enum BuildError {
    /// A provider does not return a value, or a value and a failure indicator
    #[error("{index}th provider {provider} {reason}")]
    InvalidProviderShape {
        index: usize,
        provider: String,
        reason: ShapeError,
    },
    /// Two providers produce the same type
    #[error("{index}th provider {second} returns the same type {type_info} as provider {first}")]
    DuplicateProvider {
        index: usize,
        type_info: TypeInfo,
        first: String,
        second: String,
    },
    /// A provider needs a type nobody produces
    #[error("dependency {dependency} is not provided (required by {required_by})")]
    MissingDependency {
        dependency: TypeInfo,
        required_by: String,
    },
    /// Providers depend on each other
    #[error("cyclic dependency found between providers {first} and {second} through {chain:?}")]
    CyclicDependency {
        first: String,
        second: String,
        chain: Vec<String>,
    },
}

/// Why a provider declaration was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    #[error("has no output")]
    NoOutput,
    #[error("has {0} outputs. Provider must return a single value or a value and an error")]
    TooManyOutputs(usize),
    #[error("returns a failure indicator as its first output")]
    FailureFirst,
    #[error("has two outputs, but the second one is not an error")]
    SecondNotFailure,
}

/// Errors while injecting into a destination or resolving a type
#[derive(Error, Debug)]
pub enum InjectError {
    /// Nothing in the registry produces the requested type
    #[error("no provider found for type {0}")]
    NoProviderForType(TypeInfo),
    /// A destination field could not be resolved
    #[error("failed to resolve field {field}: {source}")]
    Field {
        field: &'static str,
        source: Box<InjectError>,
    },
    /// A nested destination could not be filled
    #[error("failed to resolve group {field}: {source}")]
    Group {
        field: &'static str,
        source: Box<InjectError>,
    },
    /// A dependency of the requested type could not be resolved
    #[error("failed to resolve dependency {dependency}: {source}")]
    Dependency {
        dependency: TypeInfo,
        source: Box<InjectError>,
    },
    /// The provider itself returned an error
    #[error("{provider} failed to resolve value: {source}")]
    ProviderFailed { provider: String, source: DynError },
    /// A `group` field is not a nested destination
    #[error("`group` can only be used on nested destination fields, got {field}")]
    InvalidGroupField { field: &'static str },
    /// The destination does not describe its fields consistently
    #[error("invalid destination: {reason}")]
    InvalidDestination { reason: String },
    /// A type reentered its own resolution
    #[error("cyclic resolution through {chain:?}")]
    CyclicResolution { chain: Vec<&'static str> },
    /// A provider called back into the registry that is running it
    ///
    /// The shared cache is held for the whole call. Providers that need to
    /// resolve on their own should declare the type as a dependency or use
    /// [Registry::session](crate::registry::Registry::session).
    #[error("registry was reentered from one of its own providers")]
    ReentrantResolution,
    #[error(transparent)]
    DowncastFailed(#[from] DowncastError),
}

impl InjectError {
    /// Follows the chain to the first provider that failed
    ///
    /// Returns the provider name and the error it returned.
    pub fn provider_failure(&self) -> Option<(&str, &DynError)> {
        match self {
            InjectError::ProviderFailed { provider, source } => Some((provider.as_str(), source)),
            InjectError::Field { source, .. }
            | InjectError::Group { source, .. }
            | InjectError::Dependency { source, .. } => source.provider_failure(),
            _ => None,
        }
    }

    /// The innermost error, skipping field, group and dependency context
    pub fn root_cause(&self) -> &InjectError {
        match self {
            InjectError::Field { source, .. }
            | InjectError::Group { source, .. }
            | InjectError::Dependency { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Failed to downcast, required: '{required}' actual: '{actual}'")]
pub struct DowncastError {
    pub required: &'static str,
    pub actual: &'static str,
}
