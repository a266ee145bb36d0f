use std::{any::TypeId, collections::HashMap};

use crate::{
    destination::{Destination, Directive, FieldMut},
    errors::{DowncastError, InjectError},
    registry::{ProviderMetadata, Registry},
    types::{Injectable, Instance, TypeInfo},
};

/// Memo table of resolved instances
///
/// Only grows, a type is constructed at most once per cache.
#[derive(Default)]
pub struct ResolutionCache {
    resolved: HashMap<TypeId, Instance>,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, info: &TypeInfo) -> Option<&Instance> {
        self.resolved.get(&info.type_id)
    }

    pub fn contains(&self, info: &TypeInfo) -> bool {
        self.resolved.contains_key(&info.type_id)
    }

    pub fn len(&self) -> usize {
        self.resolved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty()
    }

    fn insert(&mut self, instance: Instance) {
        self.resolved.insert(instance.info.type_id, instance);
    }
}

impl std::fmt::Debug for ResolutionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set()
            .entries(self.resolved.values().map(|instance| instance.info.type_name))
            .finish()
    }
}

/// Resolves types of a [Registry] into a [ResolutionCache]
///
/// Dependencies are resolved depth first. A type's dependencies are always
/// constructed, and cached, before the type itself.
pub struct Injector<'a> {
    registry: &'a Registry,
    cache: &'a mut ResolutionCache,
    /// Types currently being constructed, outermost first
    resolving: Vec<TypeInfo>,
}

impl<'a> Injector<'a> {
    pub fn new(registry: &'a Registry, cache: &'a mut ResolutionCache) -> Self {
        Injector {
            registry,
            cache,
            resolving: Vec::new(),
        }
    }

    /// Fills every field of `destination`, in declaration order
    ///
    /// Stops at the first failing field. The destination may be partially
    /// filled in that case and should not be used.
    pub fn inject(&mut self, destination: &mut dyn Destination) -> Result<(), InjectError> {
        for (index, field) in destination.fields().into_iter().enumerate() {
            match field.directive {
                Directive::Ignore => {
                    tracing::trace!("Skipping ignored field {}", field.name);
                }
                Directive::Group => {
                    let Some(FieldMut::Group(group)) = destination.field_mut(index) else {
                        return Err(InjectError::InvalidGroupField { field: field.name });
                    };

                    self.inject(group).map_err(|error| InjectError::Group {
                        field: field.name,
                        source: Box::new(error),
                    })?;
                }
                Directive::Default => {
                    let (Some(type_info), Some(assign)) = (field.type_info, field.assign) else {
                        return Err(InjectError::InvalidDestination {
                            reason: format!("field {} does not declare its type", field.name),
                        });
                    };
                    let Some(FieldMut::Value(slot)) = destination.field_mut(index) else {
                        return Err(InjectError::InvalidDestination {
                            reason: format!("field {} is not assignable", field.name),
                        });
                    };

                    let instance = self.resolve(type_info).map_err(|error| InjectError::Field {
                        field: field.name,
                        source: Box::new(error),
                    })?;

                    assign(slot, &instance).map_err(|error| InjectError::Field {
                        field: field.name,
                        source: Box::new(error.into()),
                    })?;
                }
            }
        }

        Ok(())
    }

    /// Resolves a single type
    pub fn resolve(&mut self, info: TypeInfo) -> Result<Instance, InjectError> {
        if let Some(instance) = self.cache.get(&info) {
            tracing::trace!("Using cached instance of {}", info.type_name);
            return Ok(instance.clone());
        }

        let registry = self.registry;
        let Some(provider) = registry.get(&info) else {
            tracing::error!("Tried to resolve an unregistered type: {}", info.type_name);
            return Err(InjectError::NoProviderForType(info));
        };

        // Build time validation rejects cycles, this only guards hand-assembled graphs
        if self.resolving.contains(&info) {
            let mut chain: Vec<&'static str> =
                self.resolving.iter().map(|info| info.type_name).collect();
            chain.push(info.type_name);
            return Err(InjectError::CyclicResolution { chain });
        }

        self.resolving.push(info);
        let constructed = self.construct(provider);
        self.resolving.pop();

        let instance = constructed?;
        self.cache.insert(instance.clone());
        Ok(instance)
    }

    /// Resolves `T` and clones it out of the cache
    pub fn require<T: Injectable>(&mut self) -> Result<T, InjectError> {
        let instance = self.resolve(TypeInfo::of::<T>())?;
        Ok(instance.get::<T>()?)
    }

    fn construct(&mut self, provider: &ProviderMetadata) -> Result<Instance, InjectError> {
        let mut dependencies = Vec::with_capacity(provider.dependencies.len());
        for dependency in &provider.dependencies {
            let instance = self
                .resolve(*dependency)
                .map_err(|error| InjectError::Dependency {
                    dependency: *dependency,
                    source: Box::new(error),
                })?;
            dependencies.push(instance);
        }

        let instance = (provider.invoke)(&dependencies).map_err(|error| {
            tracing::warn!("Provider {} failed: {}", provider.name, error);
            InjectError::ProviderFailed {
                provider: provider.name.clone(),
                source: error,
            }
        })?;

        if instance.info.type_id != provider.produces.type_id {
            return Err(DowncastError {
                required: provider.produces.type_name,
                actual: instance.info.type_name,
            }
            .into());
        }

        tracing::debug!(
            "Constructed instance of {} using {}",
            provider.produces.type_name,
            provider.name
        );
        Ok(instance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::RegistryConfig, types::DynError};

    fn passthrough<T: Injectable>(dependency: TypeInfo, name: &str) -> ProviderMetadata {
        ProviderMetadata {
            name: name.to_string(),
            produces: TypeInfo::of::<T>(),
            dependencies: vec![dependency],
            invoke: Box::new(|_: &[Instance]| -> Result<Instance, DynError> {
                Err("cycle should be detected before invoking".into())
            }),
        }
    }

    #[test]
    fn cycles_in_unvalidated_graphs_are_caught() {
        let registry = Registry::new(
            vec![
                passthrough::<u8>(TypeInfo::of::<u16>(), "byte"),
                passthrough::<u16>(TypeInfo::of::<u8>(), "short"),
            ],
            RegistryConfig::default(),
        );
        let mut cache = ResolutionCache::new();

        let error = Injector::new(&registry, &mut cache)
            .require::<u8>()
            .unwrap_err();

        assert!(matches!(
            error.root_cause(),
            InjectError::CyclicResolution { chain } if chain == &vec!["u8", "u16", "u8"]
        ));
        assert!(cache.is_empty());
    }

    #[test]
    fn mismatched_provider_output_is_rejected() {
        let registry = Registry::new(
            vec![ProviderMetadata {
                name: "liar".to_string(),
                produces: TypeInfo::of::<u32>(),
                dependencies: vec![],
                invoke: Box::new(|_: &[Instance]| -> Result<Instance, DynError> {
                    Ok(Instance::new("not a number".to_string()))
                }),
            }],
            RegistryConfig::default(),
        );
        let mut cache = ResolutionCache::new();

        let error = Injector::new(&registry, &mut cache)
            .resolve(TypeInfo::of::<u32>())
            .unwrap_err();

        assert!(matches!(error, InjectError::DowncastFailed(_)));
        assert!(cache.is_empty());
    }
}
