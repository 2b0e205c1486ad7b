//! Flattening discovered candidates to one version per package id
//!
//! Every id discovered at several versions keeps only its newest version
//! (the first discovered wins when versions compare equal); the others are
//! removable and never followed. The kept set is then walked post-order from
//! the requested root so the result holds exactly the reachable packages,
//! dependencies before their dependents.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use tangle_core::error::TangleError;
use tangle_core::types::{Dependency, PackageId, PackageIdentity};
use tangle_registry::CandidatePackage;

use crate::remote::CandidateSet;
use crate::ResolverResult;

/// Reduces a candidate set to one candidate per id
#[derive(Debug, Clone, Copy, Default)]
pub struct VersionPruner;

struct Frame<'a> {
    candidate: &'a CandidatePackage,
    next: usize,
}

impl VersionPruner {
    /// Prune `candidates` to the packages reachable from `root`
    ///
    /// The result is in post-order: each candidate appears after everything
    /// it depends on, and the root comes last.
    pub fn prune(candidates: &CandidateSet, root: &PackageIdentity) -> ResolverResult<Vec<CandidatePackage>> {
        let root_candidate = candidates.get(root).ok_or_else(|| TangleError::PackageNotFound {
            identity: root.to_string(),
        })?;
        let removable = Self::removable(candidates, root);

        let mut result = Vec::new();
        let mut placed: HashSet<&PackageIdentity> = HashSet::new();
        let mut in_progress: HashSet<&PackageIdentity> = HashSet::new();
        let mut stack = vec![Frame {
            candidate: root_candidate,
            next: 0,
        }];
        in_progress.insert(&root_candidate.identity);

        while let Some(frame) = stack.last_mut() {
            let candidate = frame.candidate;
            if let Some(dependency) = candidate.dependencies.get(frame.next) {
                frame.next += 1;
                let target = Self::select(candidates, &removable, dependency)?;
                if placed.contains(&target.identity) || in_progress.contains(&target.identity) {
                    continue;
                }
                in_progress.insert(&target.identity);
                stack.push(Frame {
                    candidate: target,
                    next: 0,
                });
            } else {
                stack.pop();
                in_progress.remove(&candidate.identity);
                placed.insert(&candidate.identity);
                result.push(candidate.clone());
            }
        }

        debug!(
            "Pruned {} candidates to {} packages for {}",
            candidates.len(),
            result.len(),
            root
        );
        Ok(result)
    }

    /// Identities that lose to a newer version of the same id
    ///
    /// The root's id always keeps the root itself.
    pub fn removable(candidates: &CandidateSet, root: &PackageIdentity) -> HashSet<PackageIdentity> {
        let mut kept: HashMap<&PackageId, &PackageIdentity> = HashMap::new();
        for candidate in candidates.iter() {
            let identity = &candidate.identity;
            let entry = kept.entry(&identity.id).or_insert(identity);
            if identity.id == root.id {
                if identity == root {
                    *entry = identity;
                }
            } else if identity.version > entry.version {
                *entry = identity;
            }
        }

        candidates
            .iter()
            .map(|candidate| &candidate.identity)
            .filter(|identity| kept.get(&identity.id) != Some(identity))
            .cloned()
            .collect()
    }

    /// First kept candidate matching `dependency`
    fn select<'a>(
        candidates: &'a CandidateSet,
        removable: &HashSet<PackageIdentity>,
        dependency: &'a Dependency,
    ) -> ResolverResult<&'a CandidatePackage> {
        candidates
            .versions_of(&dependency.id)
            .filter(|candidate| !removable.contains(&candidate.identity))
            .find(|candidate| dependency.range.satisfies(&candidate.identity.version))
            .ok_or_else(|| TangleError::UnsatisfiedDependency {
                id: dependency.id.to_string(),
                range: dependency.range.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tangle_registry::RepositoryHandle;

    fn candidate(id: &str, version: &str, dependencies: &[(&str, &str)]) -> CandidatePackage {
        CandidatePackage {
            identity: PackageIdentity::parse(id, version).unwrap(),
            source: RepositoryHandle {
                index: 0,
                name: "test".to_string(),
            },
            dependencies: dependencies
                .iter()
                .map(|(id, range)| Dependency::parse(id, range).unwrap())
                .collect(),
        }
    }

    fn identity(id: &str, version: &str) -> PackageIdentity {
        PackageIdentity::parse(id, version).unwrap()
    }

    fn names(pruned: &[CandidatePackage]) -> Vec<String> {
        pruned.iter().map(|c| c.identity.to_string()).collect()
    }

    #[test]
    fn test_newest_wins() {
        let set: CandidateSet = vec![
            candidate("A", "1.0.0", &[("B", "[1.0.0, )")]),
            candidate("B", "1.0.0", &[]),
            candidate("B", "1.1.0", &[]),
        ]
        .into_iter()
        .collect();

        let pruned = VersionPruner::prune(&set, &identity("A", "1.0.0")).unwrap();
        assert_eq!(names(&pruned), vec!["B@1.1.0", "A@1.0.0"]);
    }

    #[test]
    fn test_shared_dependency_appears_once() {
        let set: CandidateSet = vec![
            candidate("A", "1.0.0", &[("B", "[1.0.0, )"), ("C", "[1.0.0, )")]),
            candidate("B", "1.0.0", &[]),
            candidate("C", "1.0.0", &[("B", "[1.0.0, )")]),
        ]
        .into_iter()
        .collect();

        let pruned = VersionPruner::prune(&set, &identity("A", "1.0.0")).unwrap();
        assert_eq!(names(&pruned), vec!["B@1.0.0", "C@1.0.0", "A@1.0.0"]);
    }

    #[test]
    fn test_unreachable_candidates_are_dropped() {
        // B@1.0.0 pulled in D, but B@2.0.0 wins and does not need it
        let set: CandidateSet = vec![
            candidate("A", "1.0.0", &[("B", "[1.0.0, )")]),
            candidate("B", "1.0.0", &[("D", "[1.0.0, )")]),
            candidate("D", "1.0.0", &[]),
            candidate("B", "2.0.0", &[]),
        ]
        .into_iter()
        .collect();

        let pruned = VersionPruner::prune(&set, &identity("A", "1.0.0")).unwrap();
        assert_eq!(names(&pruned), vec!["B@2.0.0", "A@1.0.0"]);
    }

    #[test]
    fn test_equal_versions_keep_first_discovered() {
        let mut first = candidate("B", "1.0.0", &[]);
        first.source.name = "first".to_string();
        let set: CandidateSet = vec![
            candidate("A", "1.0.0", &[("B", "1.0")]),
            first,
            // same identity with build metadata collapses into one entry
            candidate("B", "1.0.0+build.7", &[("Z", "1.0")]),
        ]
        .into_iter()
        .collect();
        assert_eq!(set.len(), 2);

        let pruned = VersionPruner::prune(&set, &identity("A", "1.0.0")).unwrap();
        assert_eq!(pruned[0].source.name, "first");
    }

    #[test]
    fn test_unsatisfiable_range() {
        // newest B no longer satisfies A's upper bound
        let set: CandidateSet = vec![
            candidate("A", "1.0.0", &[("B", "[1.0.0, 2.0.0)"), ("C", "1.0")]),
            candidate("B", "1.0.0", &[]),
            candidate("C", "1.0.0", &[("B", "[2.0.0, )")]),
            candidate("B", "2.0.0", &[]),
        ]
        .into_iter()
        .collect();

        match VersionPruner::prune(&set, &identity("A", "1.0.0")) {
            Err(TangleError::UnsatisfiedDependency { id, range }) => {
                assert_eq!(id, "B");
                assert_eq!(range, "[1.0.0, 2.0.0)");
            },
            other => panic!("Expected UnsatisfiedDependency, got {:?}", other),
        }
    }

    #[test]
    fn test_cycle_is_walked_once() {
        let set: CandidateSet = vec![
            candidate("A", "1.0.0", &[("B", "1.0")]),
            candidate("B", "1.0.0", &[("C", "1.0")]),
            candidate("C", "1.0.0", &[("A", "1.0"), ("B", "1.0")]),
        ]
        .into_iter()
        .collect();

        let pruned = VersionPruner::prune(&set, &identity("A", "1.0.0")).unwrap();
        assert_eq!(names(&pruned), vec!["C@1.0.0", "B@1.0.0", "A@1.0.0"]);
    }

    #[test]
    fn test_explicit_root_is_used() {
        // the first discovered candidate is not the requested root
        let set: CandidateSet = vec![
            candidate("Other", "1.0.0", &[("B", "1.0")]),
            candidate("A", "1.0.0", &[]),
            candidate("B", "1.0.0", &[]),
        ]
        .into_iter()
        .collect();

        let pruned = VersionPruner::prune(&set, &identity("A", "1.0.0")).unwrap();
        assert_eq!(names(&pruned), vec!["A@1.0.0"]);

        let missing = VersionPruner::prune(&set, &identity("A", "9.0.0"));
        assert!(matches!(missing, Err(TangleError::PackageNotFound { .. })));
    }

    #[test]
    fn test_root_beats_newer_version_of_itself() {
        let set: CandidateSet = vec![
            candidate("A", "1.0.0", &[("B", "1.0")]),
            candidate("B", "1.0.0", &[("A", "1.0")]),
            candidate("A", "2.0.0", &[]),
        ]
        .into_iter()
        .collect();

        let removable = VersionPruner::removable(&set, &identity("A", "1.0.0"));
        assert!(removable.contains(&identity("A", "2.0.0")));

        let pruned = VersionPruner::prune(&set, &identity("A", "1.0.0")).unwrap();
        assert_eq!(names(&pruned), vec!["B@1.0.0", "A@1.0.0"]);
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;
    use tangle_core::types::Version;
    use tangle_registry::RepositoryHandle;

    fn arbitrary_candidates() -> impl Strategy<Value = Vec<(usize, u64, Vec<usize>)>> {
        // (package index, minor version, dependency package indices)
        prop::collection::vec((1usize..5, 0u64..4, prop::collection::vec(0usize..5, 0..3)), 0..12)
    }

    fn build_set(raw: &[(usize, u64, Vec<usize>)]) -> CandidateSet {
        let root = CandidatePackage {
            identity: PackageIdentity::new("p0", Version::new(1, 0, 0)),
            source: RepositoryHandle {
                index: 0,
                name: "test".to_string(),
            },
            dependencies: (1..5)
                .map(|index| Dependency::parse(&format!("p{}", index), "[1.0.0, )").unwrap())
                .collect(),
        };
        let others = raw.iter().map(|(package, minor, dependencies)| CandidatePackage {
            identity: PackageIdentity::new(format!("p{}", package), Version::new(1, *minor, 0)),
            source: RepositoryHandle {
                index: 0,
                name: "test".to_string(),
            },
            dependencies: dependencies
                .iter()
                .filter(|dependency| **dependency != *package)
                .map(|dependency| Dependency::parse(&format!("p{}", dependency), "[1.0.0, )").unwrap())
                .collect(),
        });
        std::iter::once(root).chain(others).collect()
    }

    proptest! {
        #[test]
        fn one_version_per_id_and_newest_wins(raw in arbitrary_candidates()) {
            let set = build_set(&raw);
            let root = PackageIdentity::new("p0", Version::new(1, 0, 0));

            // the root declares every id, so each one must have been discovered
            let all_present = (1..5).all(|index| set.versions_of(&PackageId::new(format!("p{}", index))).next().is_some());
            let result = VersionPruner::prune(&set, &root);
            if !all_present {
                prop_assert!(result.is_err());
                return Ok(());
            }
            let pruned = result.unwrap();

            let ids: HashSet<&PackageId> = pruned.iter().map(|c| &c.identity.id).collect();
            prop_assert_eq!(ids.len(), pruned.len());

            for kept in &pruned {
                let newest = set.versions_of(&kept.identity.id).map(|c| &c.identity.version).max().unwrap();
                if kept.identity != root {
                    prop_assert_eq!(&kept.identity.version, newest);
                }
            }
            prop_assert_eq!(&pruned.last().unwrap().identity, &root);
        }
    }
}
