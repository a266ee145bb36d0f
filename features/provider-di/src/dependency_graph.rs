use std::{
    any::TypeId,
    collections::{HashMap, HashSet},
};

use crate::{errors::BuildError, registry::ProviderMetadata};

/// Dependency graph over parsed providers
///
/// Used to check that every dependency is provided and that no provider
/// transitively depends on itself.
pub(crate) struct DependencyGraph<'a> {
    providers: &'a [ProviderMetadata],
    map: HashMap<TypeId, &'a ProviderMetadata>,
}

impl<'a> DependencyGraph<'a> {
    pub fn new(providers: &'a [ProviderMetadata]) -> Self {
        let map = providers
            .iter()
            .map(|provider| (provider.produces.type_id, provider))
            .collect();

        Self { providers, map }
    }

    /// Validate the graph
    ///
    /// Returns the first issue, checking closure before cycles.
    pub fn check(&self) -> Result<(), BuildError> {
        self.check_closure()?;
        self.check_cycles()
    }

    /// Every dependency must be produced by some provider
    ///
    /// This only looks one hop ahead, every hop is checked on its own.
    fn check_closure(&self) -> Result<(), BuildError> {
        for provider in self.providers {
            for dependency in &provider.dependencies {
                if !self.map.contains_key(&dependency.type_id) {
                    return Err(BuildError::MissingDependency {
                        dependency: *dependency,
                        required_by: provider.name.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Depth first search, keeping the current dependency chain
    fn check_cycles(&self) -> Result<(), BuildError> {
        let mut checked = HashSet::new();
        for entry in self.providers {
            let mut dependency_chain = Vec::new();
            check_recurse(self, &mut checked, &mut dependency_chain, entry)?;
        }

        return Ok(());

        fn check_recurse<'a>(
            graph: &DependencyGraph<'a>,
            checked: &mut HashSet<TypeId>,
            dependency_chain: &mut Vec<&'a ProviderMetadata>,
            entry: &'a ProviderMetadata,
        ) -> Result<(), BuildError> {
            // Circular Dependency Check
            if let Some(start) = dependency_chain
                .iter()
                .position(|chained| chained.produces == entry.produces)
            {
                let cycle = &dependency_chain[start..];
                let first = cycle[0];
                // A provider consuming its own type is a cycle with itself
                let second = cycle.get(1).copied().unwrap_or(entry);

                let mut chain: Vec<String> =
                    cycle.iter().map(|provider| provider.name.clone()).collect();
                chain.push(entry.name.clone());

                return Err(BuildError::CyclicDependency {
                    first: first.name.clone(),
                    second: second.name.clone(),
                    chain,
                });
            }

            // Skip other checks if already checked
            if !checked.insert(entry.produces.type_id) {
                return Ok(());
            }

            dependency_chain.push(entry);

            for dependency in &entry.dependencies {
                // Missing dependencies were reported by the closure check
                let Some(&next_entry) = graph.map.get(&dependency.type_id) else {
                    continue;
                };

                check_recurse(graph, checked, dependency_chain, next_entry)?;
            }

            dependency_chain.pop();
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        errors::BuildError,
        registry::ProviderMetadata,
        types::{Instance, TypeInfo},
    };

    use super::DependencyGraph;

    struct A;
    struct B;
    struct C;
    struct D;

    fn provider(name: &str, produces: TypeInfo, dependencies: Vec<TypeInfo>) -> ProviderMetadata {
        ProviderMetadata {
            name: name.to_string(),
            produces,
            dependencies,
            invoke: Box::new(|_| Ok(Instance::new(()))),
        }
    }

    #[test]
    fn acyclic_graph_passes() {
        let providers = vec![
            provider("a", TypeInfo::of::<A>(), vec![TypeInfo::of::<B>(), TypeInfo::of::<C>()]),
            provider("b", TypeInfo::of::<B>(), vec![TypeInfo::of::<C>()]),
            provider("c", TypeInfo::of::<C>(), vec![]),
        ];

        assert!(DependencyGraph::new(&providers).check().is_ok());
    }

    #[test]
    fn missing_dependency_names_the_consumer() {
        let providers = vec![provider("a", TypeInfo::of::<A>(), vec![TypeInfo::of::<B>()])];

        match DependencyGraph::new(&providers).check() {
            Err(BuildError::MissingDependency {
                dependency,
                required_by,
            }) => {
                assert_eq!(dependency, TypeInfo::of::<B>());
                assert_eq!(required_by, "a");
            }
            other => panic!("expected missing dependency, got {other:?}"),
        }
    }

    #[test]
    fn two_cycle_names_both_providers() {
        let providers = vec![
            provider("a", TypeInfo::of::<A>(), vec![TypeInfo::of::<B>()]),
            provider("b", TypeInfo::of::<B>(), vec![TypeInfo::of::<A>()]),
        ];

        match DependencyGraph::new(&providers).check() {
            Err(BuildError::CyclicDependency {
                first,
                second,
                chain,
            }) => {
                assert_eq!(first, "a");
                assert_eq!(second, "b");
                assert_eq!(chain, vec!["a", "b", "a"]);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn longer_cycles_are_detected() {
        let providers = vec![
            provider("d", TypeInfo::of::<D>(), vec![TypeInfo::of::<A>()]),
            provider("a", TypeInfo::of::<A>(), vec![TypeInfo::of::<B>()]),
            provider("b", TypeInfo::of::<B>(), vec![TypeInfo::of::<C>()]),
            provider("c", TypeInfo::of::<C>(), vec![TypeInfo::of::<A>()]),
        ];

        match DependencyGraph::new(&providers).check() {
            Err(BuildError::CyclicDependency { first, chain, .. }) => {
                assert_eq!(first, "a");
                assert_eq!(chain, vec!["a", "b", "c", "a"]);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let providers = vec![provider("a", TypeInfo::of::<A>(), vec![TypeInfo::of::<A>()])];

        match DependencyGraph::new(&providers).check() {
            Err(BuildError::CyclicDependency {
                first,
                second,
                chain,
            }) => {
                assert_eq!(first, "a");
                assert_eq!(second, "a");
                assert_eq!(chain, vec!["a", "a"]);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn shared_dependencies_are_not_cycles() {
        // a -> b -> d, a -> c -> d
        let providers = vec![
            provider("a", TypeInfo::of::<A>(), vec![TypeInfo::of::<B>(), TypeInfo::of::<C>()]),
            provider("b", TypeInfo::of::<B>(), vec![TypeInfo::of::<D>()]),
            provider("c", TypeInfo::of::<C>(), vec![TypeInfo::of::<D>()]),
            provider("d", TypeInfo::of::<D>(), vec![]),
        ];

        assert!(DependencyGraph::new(&providers).check().is_ok());
    }
}
