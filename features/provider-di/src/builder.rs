use std::{any::TypeId, collections::HashMap};

use crate::{
    config::{CachePolicy, RegistryConfig},
    dependency_graph::DependencyGraph,
    errors::{BuildError, ShapeError},
    provider::{OutputInfo, ProviderDeclaration, ProviderFn, TryProviderFn},
    registry::{ProviderMetadata, Registry},
    types::{Injectable, TypeInfo},
};

/// Collects provider declarations and validates them into a [Registry]
///
/// Building runs, in order:
/// 1. Shape check of every declaration
/// 2. Duplicate check, one provider per type
/// 3. Closure check, every dependency is provided
/// 4. Cycle check
///
/// Providers sharing a name, like two closures in the same function, are
/// told apart by a `#n` suffix on every repeat: `setup::{closure}`,
/// `setup::{closure}#2`.
#[derive(Default)]
pub struct RegistryBuilder {
    pub(crate) declarations: Vec<ProviderDeclaration>,
    pub(crate) config: RegistryConfig,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        RegistryBuilder {
            declarations: Vec::new(),
            config: RegistryConfig::default(),
        }
    }
}

impl RegistryBuilder {
    /// Registers an infallible provider function
    ///
    /// The return type is registered as is. A function returning
    /// `Result<T, E>` produces the `Result` itself and its errors are never
    /// reported as provider failures, use [RegistryBuilder::try_provide] for
    /// those.
    pub fn provide<Args, F: ProviderFn<Args>>(self, provider: F) -> Self {
        self.declare(ProviderDeclaration::from_fn(provider))
    }

    /// Registers a provider function returning a `Result`
    pub fn try_provide<Args, F: TryProviderFn<Args>>(self, provider: F) -> Self {
        self.declare(ProviderDeclaration::from_try_fn(provider))
    }

    /// Registers an already created value
    pub fn add_instance<T: Injectable>(self, instance: T) -> Self {
        self.declare(ProviderDeclaration::instance(instance))
    }

    pub fn declare(mut self, declaration: ProviderDeclaration) -> Self {
        self.declarations.push(declaration);
        self
    }

    pub fn cache_policy(mut self, cache_policy: CachePolicy) -> Self {
        self.config.cache_policy = cache_policy;
        self
    }

    pub fn config(mut self, config: RegistryConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<Registry, BuildError> {
        let RegistryBuilder {
            declarations,
            config,
        } = self;

        tracing::debug!("Building registry with {} providers", declarations.len());

        let providers = parse_providers(declarations)?;
        DependencyGraph::new(&providers).check()?;

        tracing::debug!("Registry built with {} providers", providers.len());
        Ok(Registry::new(providers, config))
    }
}

/// Builds a [Registry] with the default configuration
pub fn build(providers: Vec<ProviderDeclaration>) -> Result<Registry, BuildError> {
    RegistryBuilder {
        declarations: providers,
        config: RegistryConfig::default(),
    }
    .build()
}

fn parse_providers(
    declarations: Vec<ProviderDeclaration>,
) -> Result<Vec<ProviderMetadata>, BuildError> {
    let mut parsed: Vec<ProviderMetadata> = Vec::with_capacity(declarations.len());
    let mut produced: HashMap<TypeId, usize> = HashMap::with_capacity(declarations.len());
    let mut seen_names: HashMap<String, usize> = HashMap::new();

    for (index, declaration) in declarations.into_iter().enumerate() {
        let ProviderDeclaration {
            name,
            inputs,
            outputs,
            invoke,
        } = declaration;

        let seen = seen_names.entry(name.clone()).or_insert(0);
        *seen += 1;
        let name = match *seen {
            1 => name,
            n => format!("{name}#{n}"),
        };

        let produces = match check_shape(&outputs) {
            Ok(produces) => produces,
            Err(reason) => {
                return Err(BuildError::InvalidProviderShape {
                    index,
                    provider: name,
                    reason,
                })
            }
        };

        if let Some(&existing) = produced.get(&produces.type_id) {
            return Err(BuildError::DuplicateProvider {
                index,
                type_info: produces,
                first: parsed[existing].name.clone(),
                second: name,
            });
        }

        tracing::debug!("Registered provider {} for {}", name, produces.type_name);

        produced.insert(produces.type_id, parsed.len());
        parsed.push(ProviderMetadata {
            name,
            produces,
            dependencies: inputs,
            invoke,
        });
    }

    Ok(parsed)
}

/// Returns the produced type if the outputs are a value, optionally followed by a failure indicator
fn check_shape(outputs: &[OutputInfo]) -> Result<TypeInfo, ShapeError> {
    if outputs.len() > 2 {
        return Err(ShapeError::TooManyOutputs(outputs.len()));
    }

    match outputs {
        [] => Err(ShapeError::NoOutput),
        [OutputInfo::Value(produces)] | [OutputInfo::Value(produces), OutputInfo::Failure(_)] => {
            Ok(*produces)
        }
        [OutputInfo::Value(_), OutputInfo::Value(_)] => Err(ShapeError::SecondNotFailure),
        [OutputInfo::Failure(_), ..] => Err(ShapeError::FailureFirst),
        [_, _, _, ..] => Err(ShapeError::TooManyOutputs(outputs.len())),
    }
}
