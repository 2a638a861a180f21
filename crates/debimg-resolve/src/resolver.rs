//! Transitive dependency closure resolution.
//!
//! Traversal is depth-first and pre-order: a package is fetched and
//! recorded, then each of its dependencies is descended into in
//! declaration order before the next sibling or root is processed. An
//! explicit worklist replaces recursion so deep graphs cannot exhaust
//! the call stack; popping dependencies pushed in reverse yields the
//! same visitation order as the recursive formulation.
//!
//! Packages are deduplicated by name only. The first fetch of a name
//! wins, and a name already in the closure is never fetched or
//! descended into again, which also makes cycles terminate.

use std::path::PathBuf;

use debimg_common::error::{DebimgError, Result};
use debimg_common::types::{DependencyClosure, PackageName, ResolvedPackage};

use crate::depends::parse_depends;
use crate::fetcher::PackageFetcher;

/// Computes dependency closures over a [`PackageFetcher`].
#[derive(Debug)]
pub struct DependencyResolver<F> {
    fetcher: F,
    work_dir: PathBuf,
}

impl<F: PackageFetcher> DependencyResolver<F> {
    /// Creates a resolver whose fetcher writes under `work_dir`.
    pub fn new(fetcher: F, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            fetcher,
            work_dir: work_dir.into(),
        }
    }

    /// Resolves the closure of `roots`, in discovery order.
    ///
    /// # Errors
    ///
    /// Returns `DebimgError::Fetch` as soon as any package cannot be fetched.
    pub fn resolve(&mut self, roots: &[PackageName]) -> Result<DependencyClosure> {
        let mut closure = DependencyClosure::new();
        for root in roots {
            self.descend(root, &mut closure)?;
        }
        tracing::info!(
            roots = roots.len(),
            packages = closure.len(),
            "dependency closure resolved"
        );
        Ok(closure)
    }

    /// Consumes the resolver and returns its fetcher.
    pub fn into_fetcher(self) -> F {
        self.fetcher
    }

    fn descend(&mut self, root: &PackageName, closure: &mut DependencyClosure) -> Result<()> {
        let mut pending = vec![root.clone()];

        while let Some(name) = pending.pop() {
            if closure.contains(name.as_str()) {
                tracing::debug!(package = %name, "already resolved, skipping");
                continue;
            }

            tracing::info!(package = %name, work_dir = %self.work_dir.display(), "fetching package");
            let fetched = self
                .fetcher
                .fetch(&name, &self.work_dir)
                .map_err(|e| match e {
                    DebimgError::Fetch { .. } => e,
                    other => DebimgError::fetch(&name, other),
                })?;

            let dependencies = parse_depends(&fetched.depends);
            if !dependencies.is_empty() {
                tracing::info!(
                    package = %name,
                    depends = ?dependencies.iter().map(PackageName::as_str).collect::<Vec<_>>(),
                    "descending into dependencies"
                );
            }
            pending.extend(dependencies.iter().rev().cloned());

            let _ = closure.insert(ResolvedPackage {
                name,
                version: fetched.version,
                architecture: fetched.architecture,
                root: fetched.root,
                dependencies,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::Path;

    use debimg_common::error::ErrorKind;

    use super::*;
    use crate::fetcher::FetchedPackage;

    /// In-memory repository mapping names to `Depends:` declarations.
    #[derive(Default)]
    struct FakeRepo {
        depends: HashMap<String, String>,
        fetched: Vec<String>,
    }

    impl FakeRepo {
        fn with(mut self, name: &str, depends: &str) -> Self {
            let _ = self.depends.insert(name.into(), depends.into());
            self
        }

        fn fetch_count(&self, name: &str) -> usize {
            self.fetched.iter().filter(|n| *n == name).count()
        }
    }

    impl PackageFetcher for FakeRepo {
        fn fetch(&mut self, name: &PackageName, work_dir: &Path) -> Result<FetchedPackage> {
            self.fetched.push(name.as_str().to_string());
            let depends = self
                .depends
                .get(name.as_str())
                .ok_or_else(|| DebimgError::fetch(name, "unable to locate package"))?;
            Ok(FetchedPackage {
                version: "1.0".into(),
                architecture: "amd64".into(),
                depends: depends.clone(),
                root: work_dir.join(name.as_str()),
            })
        }
    }

    fn roots(names: &[&str]) -> Vec<PackageName> {
        names.iter().copied().map(PackageName::from).collect()
    }

    fn order(closure: &DependencyClosure) -> Vec<&str> {
        closure.iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn package_without_dependencies_resolves_alone() {
        let repo = FakeRepo::default().with("busybox", "");
        let mut resolver = DependencyResolver::new(repo, "/work");
        let closure = resolver.resolve(&roots(&["busybox"])).expect("resolve");
        assert_eq!(closure.len(), 1);
        assert_eq!(
            closure.get("busybox").map(|p| p.root.clone()),
            Some(PathBuf::from("/work/busybox"))
        );
    }

    #[test]
    fn diamond_fetches_shared_dependency_once() {
        let repo = FakeRepo::default()
            .with("a", "b, c")
            .with("b", "d (>= 1.0)")
            .with("c", "d")
            .with("d", "");
        let mut resolver = DependencyResolver::new(repo, "/work");
        let closure = resolver.resolve(&roots(&["a"])).expect("resolve");

        assert_eq!(closure.len(), 4);
        assert_eq!(order(&closure), vec!["a", "b", "d", "c"]);
        assert_eq!(resolver.into_fetcher().fetch_count("d"), 1);
    }

    #[test]
    fn cycles_terminate() {
        let repo = FakeRepo::default()
            .with("a", "b")
            .with("b", "c")
            .with("c", "a");
        let mut resolver = DependencyResolver::new(repo, "/work");
        let closure = resolver.resolve(&roots(&["a"])).expect("resolve");

        assert_eq!(order(&closure), vec!["a", "b", "c"]);
        let repo = resolver.into_fetcher();
        assert_eq!(repo.fetched.len(), 3);
    }

    #[test]
    fn self_dependency_is_ignored() {
        let repo = FakeRepo::default().with("a", "a");
        let mut resolver = DependencyResolver::new(repo, "/work");
        let closure = resolver.resolve(&roots(&["a"])).expect("resolve");
        assert_eq!(closure.len(), 1);
    }

    #[test]
    fn repeated_and_shared_roots_are_idempotent() {
        let repo = FakeRepo::default()
            .with("curl", "libc6, zlib1g")
            .with("wget", "zlib1g, libc6")
            .with("libc6", "")
            .with("zlib1g", "libc6");
        let mut resolver = DependencyResolver::new(repo, "/work");
        let closure = resolver
            .resolve(&roots(&["curl", "wget", "curl"]))
            .expect("resolve");

        assert_eq!(order(&closure), vec!["curl", "libc6", "zlib1g", "wget"]);
        let repo = resolver.into_fetcher();
        for name in ["curl", "wget", "libc6", "zlib1g"] {
            assert_eq!(repo.fetch_count(name), 1, "{name}");
        }
    }

    #[test]
    fn dependencies_are_recorded_on_the_package() {
        let repo = FakeRepo::default()
            .with("a", "b (>= 2), c | d")
            .with("b", "")
            .with("c", "");
        let mut resolver = DependencyResolver::new(repo, "/work");
        let closure = resolver.resolve(&roots(&["a"])).expect("resolve");

        let a = closure.get("a").expect("a");
        assert_eq!(a.dependencies, roots(&["b", "c"]));
        assert!(!closure.contains("d"));
    }

    #[test]
    fn missing_dependency_fails_with_fetch_error() {
        let repo = FakeRepo::default().with("a", "b, missing");
        let mut resolver = DependencyResolver::new(repo.with("b", ""), "/work");
        let err = resolver.resolve(&roots(&["a"])).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Fetch);
        assert!(err.to_string().contains("missing"), "got: {err}");
    }

    #[test]
    fn non_fetch_errors_are_reported_as_fetch_errors() {
        struct Broken;
        impl PackageFetcher for Broken {
            fn fetch(&mut self, _name: &PackageName, work_dir: &Path) -> Result<FetchedPackage> {
                Err(DebimgError::Io {
                    path: work_dir.to_path_buf(),
                    source: std::io::Error::other("disk full"),
                })
            }
        }

        let mut resolver = DependencyResolver::new(Broken, "/work");
        let err = resolver.resolve(&roots(&["libc6"])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Fetch);
        assert!(err.to_string().contains("libc6"));
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn deep_chain_does_not_overflow_the_stack() {
        let mut repo = FakeRepo::default();
        let depth = 20_000;
        for i in 0..depth {
            let deps = if i + 1 < depth {
                format!("pkg{}", i + 1)
            } else {
                String::new()
            };
            repo = repo.with(&format!("pkg{i}"), &deps);
        }
        let mut resolver = DependencyResolver::new(repo, "/work");
        let closure = resolver.resolve(&roots(&["pkg0"])).expect("resolve");
        assert_eq!(closure.len(), depth);
    }

    #[test]
    fn resolver_accepts_borrowed_fetcher() {
        let mut repo = FakeRepo::default().with("a", "");
        {
            let mut resolver = DependencyResolver::new(&mut repo, "/work");
            let _ = resolver.resolve(&roots(&["a"])).expect("resolve");
        }
        assert_eq!(repo.fetch_count("a"), 1);
    }
}
