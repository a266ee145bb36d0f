/// How long resolved instances live
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CachePolicy {
    /// One cache per registry, shared by every `inject` and `require` call.
    ///
    /// Each type is constructed at most once for the lifetime of the registry.
    #[default]
    PerRegistry,
    /// Every `inject` and `require` call starts with an empty cache
    PerCall,
}

/// Settings of a [Registry](crate::registry::Registry)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryConfig {
    pub cache_policy: CachePolicy,
}
