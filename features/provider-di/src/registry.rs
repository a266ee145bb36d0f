use std::{
    any::TypeId,
    collections::HashMap,
    fmt::Debug,
    sync::{Mutex, PoisonError},
    thread::{self, ThreadId},
};

use crate::{
    config::{CachePolicy, RegistryConfig},
    destination::Destination,
    errors::InjectError,
    injector::{Injector, ResolutionCache},
    provider::InvokeFn,
    types::{Injectable, Instance, TypeInfo},
};

/// Validated provider, owned by the [Registry]
pub struct ProviderMetadata {
    pub(crate) name: String,
    pub(crate) produces: TypeInfo,
    pub(crate) dependencies: Vec<TypeInfo>,
    pub(crate) invoke: InvokeFn,
}

impl ProviderMetadata {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn produces(&self) -> TypeInfo {
        self.produces
    }

    /// Dependency types, in the order they are passed to the provider
    pub fn dependencies(&self) -> &[TypeInfo] {
        &self.dependencies
    }
}

impl Debug for ProviderMetadata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderMetadata")
            .field("name", &self.name)
            .field("produces", &self.produces)
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}

/// Immutable mapping from produced type to its provider
///
/// Every dependency is itself provided and the dependency graph is acyclic.
/// Instances are created lazily on `inject` or `require`.
///
/// With [CachePolicy::PerRegistry] the shared cache stays locked while
/// providers run. A provider calling back into the same registry gets
/// [InjectError::ReentrantResolution] instead of blocking on its own lock.
pub struct Registry {
    providers: Vec<ProviderMetadata>,
    index: HashMap<TypeId, usize>,
    config: RegistryConfig,
    /// Used with [CachePolicy::PerRegistry]
    shared_cache: Mutex<ResolutionCache>,
    /// Thread currently holding `shared_cache`
    cache_owner: Mutex<Option<ThreadId>>,
}

impl Registry {
    pub(crate) fn new(providers: Vec<ProviderMetadata>, config: RegistryConfig) -> Self {
        let index = providers
            .iter()
            .enumerate()
            .map(|(position, provider)| (provider.produces.type_id, position))
            .collect();

        Registry {
            providers,
            index,
            config,
            shared_cache: Mutex::new(ResolutionCache::new()),
            cache_owner: Mutex::new(None),
        }
    }

    pub fn get(&self, info: &TypeInfo) -> Option<&ProviderMetadata> {
        self.index
            .get(&info.type_id)
            .map(|position| &self.providers[*position])
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.index.contains_key(&TypeId::of::<T>())
    }

    /// All providers, in registration order
    pub fn providers(&self) -> impl Iterator<Item = &ProviderMetadata> {
        self.providers.iter()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn config(&self) -> RegistryConfig {
        self.config
    }

    /// Fills every field of `destination`
    ///
    /// Whether instances are shared with earlier calls depends on the
    /// configured [CachePolicy].
    pub fn inject(&self, destination: &mut dyn Destination) -> Result<(), InjectError> {
        self.with_injector(|injector| injector.inject(destination))
    }

    /// Resolves a single type
    pub fn require<T: Injectable>(&self) -> Result<T, InjectError> {
        self.with_injector(|injector| injector.require::<T>())
    }

    /// Starts a session with its own, empty cache
    pub fn session(&self) -> Session<'_> {
        Session {
            registry: self,
            cache: ResolutionCache::new(),
        }
    }

    fn with_injector<R>(
        &self,
        run: impl FnOnce(&mut Injector<'_>) -> Result<R, InjectError>,
    ) -> Result<R, InjectError> {
        match self.config.cache_policy {
            CachePolicy::PerRegistry => {
                let current = thread::current().id();
                if *self.owner() == Some(current) {
                    tracing::error!("Registry reentered from a provider on {:?}", current);
                    return Err(InjectError::ReentrantResolution);
                }

                // The cache only ever holds fully constructed instances, so a poisoned lock is still consistent
                let mut cache = self
                    .shared_cache
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                let _owner = OwnerGuard::claim(self, current);
                run(&mut Injector::new(self, &mut cache))
            }
            CachePolicy::PerCall => {
                let mut cache = ResolutionCache::new();
                run(&mut Injector::new(self, &mut cache))
            }
        }
    }

    fn owner(&self) -> std::sync::MutexGuard<'_, Option<ThreadId>> {
        self.cache_owner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Marks the current thread as holder of the shared cache until dropped
struct OwnerGuard<'r> {
    registry: &'r Registry,
}

impl<'r> OwnerGuard<'r> {
    fn claim(registry: &'r Registry, thread: ThreadId) -> Self {
        *registry.owner() = Some(thread);
        OwnerGuard { registry }
    }
}

impl Drop for OwnerGuard<'_> {
    fn drop(&mut self) {
        *self.registry.owner() = None;
    }
}

impl Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cache = self.shared_cache.try_lock().ok();
        let mut map = f.debug_struct("Registry");
        for provider in &self.providers {
            let state = match &cache {
                Some(cache) if cache.contains(&provider.produces) => "resolved",
                Some(_) => "pending",
                None => "busy",
            };
            map.field(provider.produces.type_name, &state);
        }
        map.finish()
    }
}

/// Injection session with an independent [ResolutionCache]
///
/// Instances resolved through one session are shared between all calls on
/// that session, but never with other sessions or the registry itself.
pub struct Session<'r> {
    registry: &'r Registry,
    cache: ResolutionCache,
}

impl Session<'_> {
    pub fn inject(&mut self, destination: &mut dyn Destination) -> Result<(), InjectError> {
        Injector::new(self.registry, &mut self.cache).inject(destination)
    }

    pub fn require<T: Injectable>(&mut self) -> Result<T, InjectError> {
        Injector::new(self.registry, &mut self.cache).require::<T>()
    }

    pub fn resolve(&mut self, info: TypeInfo) -> Result<Instance, InjectError> {
        Injector::new(self.registry, &mut self.cache).resolve(info)
    }

    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }
}
