//! Locating and loading the assemblies a module depends on.
//!
//! A [`Resolver`] owns an ordered list of search directories and a [`FallbackResolver`] for the
//! platform framework. Requests are bare assembly names (`System.Runtime`, no extension) and are
//! compared case-insensitively. Every name resolved through a resolver is memoized for the rest
//! of its session, so repeated requests share one [`Arc<Module>`].
//!
//! Dependencies are loaded with the same resolver, which keeps a stack of the names currently
//! being loaded. Requesting one of them again is a cycle and fails with
//! [`ResolutionError::Cycle`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::{path::Path, sync::Arc};
//! use cilstrip::{ModuleCache, NoFallback, Resolver};
//!
//! let mut resolver = Resolver::for_input(
//!     Path::new("bin/App.dll"),
//!     &[],
//!     Arc::new(NoFallback),
//!     ModuleCache::default(),
//! );
//! let library = resolver.resolve("Library")?;
//! println!("{} has {} types", library.display_name(), library.types.len());
//! # Ok::<(), cilstrip::ResolutionError>(())
//! ```

use std::{
    collections::HashMap,
    env,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use dashmap::DashMap;

use crate::{
    error::ResolutionError,
    loader::{Loader, ReferencePolicy},
    module::{Module, ResolvedReference},
    observer::{Event, NullObserver, Observer},
};

/// Extensions tried for every search directory, in order
const CANDIDATE_EXTENSIONS: [&str; 2] = ["dll", "exe"];

static NULL_OBSERVER: NullObserver = NullObserver;

/// Process wide cache of modules supplied by the fallback, keyed by lowercase name
pub type ModuleCache = Arc<DashMap<String, Arc<Module>>>;

/// Last resort lookup for names that are in none of the search directories
pub trait FallbackResolver: Send + Sync {
    /// Find the file of the assembly `name`, if this fallback knows it
    fn locate(&self, name: &str) -> Option<PathBuf>;
}

/// A fallback that never locates anything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoFallback;

impl FallbackResolver for NoFallback {
    fn locate(&self, _name: &str) -> Option<PathBuf> {
        None
    }
}

/// Looks up assemblies in the framework directories installed on this machine
#[derive(Debug, Default, Clone)]
pub struct PlatformFallback {
    directories: Vec<PathBuf>,
}

impl PlatformFallback {
    /// Use exactly these directories, in priority order
    #[must_use]
    pub fn new(directories: Vec<PathBuf>) -> Self {
        PlatformFallback { directories }
    }

    /// Collect the existing framework directories of the current machine.
    ///
    /// Shared frameworks of the dotnet installations come first (`$DOTNET_ROOT`, then the
    /// default install roots), followed by the Mono 4.5 profile and the .NET Framework 4
    /// directories.
    #[must_use]
    pub fn discover() -> Self {
        let mut roots = Vec::new();
        if let Some(root) = env::var_os("DOTNET_ROOT") {
            roots.push(PathBuf::from(root));
        }
        if let Some(program_files) = env::var_os("ProgramFiles") {
            roots.push(PathBuf::from(program_files).join("dotnet"));
        }
        roots.extend(
            [
                "/usr/share/dotnet",
                "/usr/lib/dotnet",
                "/usr/local/share/dotnet",
                "/opt/dotnet",
            ]
            .iter()
            .map(PathBuf::from),
        );

        let mut directories = Vec::new();
        for root in &roots {
            for framework in [
                "Microsoft.NETCore.App",
                "Microsoft.AspNetCore.App",
                "Microsoft.WindowsDesktop.App",
            ] {
                if let Some(latest) = latest_version(&root.join("shared").join(framework)) {
                    directories.push(latest);
                }
            }
        }

        for mono in [
            "/usr/lib/mono/4.5",
            "/usr/local/lib/mono/4.5",
            "/Library/Frameworks/Mono.framework/Versions/Current/lib/mono/4.5",
        ] {
            let mono = PathBuf::from(mono);
            directories.push(mono.join("Facades"));
            directories.push(mono);
        }

        if let Some(windir) = env::var_os("WINDIR") {
            let framework = PathBuf::from(windir).join("Microsoft.NET");
            for bitness in ["Framework64", "Framework"] {
                let base = framework.join(bitness).join("v4.0.30319");
                directories.push(base.join("WPF"));
                directories.push(base);
            }
        }

        directories.retain(|directory| directory.is_dir());
        directories.dedup();
        PlatformFallback { directories }
    }

    /// The directories searched, highest priority first
    #[must_use]
    pub fn directories(&self) -> &[PathBuf] {
        &self.directories
    }
}

impl FallbackResolver for PlatformFallback {
    fn locate(&self, name: &str) -> Option<PathBuf> {
        self.directories
            .iter()
            .find_map(|directory| find_in(directory, name))
    }
}

/// The highest version sub directory of a shared framework directory
fn latest_version(framework: &Path) -> Option<PathBuf> {
    let entries = fs::read_dir(framework).ok()?;
    entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| {
            let name = entry.file_name().to_str()?.to_string();
            let version = parse_version(&name)?;
            Some((version, entry.path()))
        })
        .max_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, path)| path)
}

/// `8.0.11` or `9.0.0-rc.2.24473.5`, compared by the numeric release part
fn parse_version(name: &str) -> Option<Vec<u64>> {
    let release = name.split('-').next()?;
    release
        .split('.')
        .map(|part| part.parse::<u64>().ok())
        .collect()
}

fn find_in(directory: &Path, name: &str) -> Option<PathBuf> {
    CANDIDATE_EXTENSIONS
        .iter()
        .map(|extension| directory.join(format!("{name}.{extension}")))
        .find(|candidate| candidate.is_file())
}

/// Resolution state of one input file.
///
/// Holds the search directories, the session memo and the stack of names being loaded. Not
/// shared between files; only the [`ModuleCache`] is.
pub struct Resolver<'a> {
    search_paths: Vec<PathBuf>,
    fallback: Arc<dyn FallbackResolver>,
    cache: ModuleCache,
    policy: ReferencePolicy,
    observer: &'a dyn Observer,
    resolved: HashMap<String, ResolvedReference>,
    in_progress: Vec<String>,
}

impl<'a> Resolver<'a> {
    /// Create a resolver searching `search_paths` in order
    #[must_use]
    pub fn new(
        search_paths: Vec<PathBuf>,
        fallback: Arc<dyn FallbackResolver>,
        cache: ModuleCache,
    ) -> Self {
        Resolver {
            search_paths,
            fallback,
            cache,
            policy: ReferencePolicy::default(),
            observer: &NULL_OBSERVER,
            resolved: HashMap::new(),
            in_progress: Vec::new(),
        }
    }

    /// Create the resolver for one input file: `extra_dirs` in caller order, then the directory
    /// containing `input_path`
    #[must_use]
    pub fn for_input(
        input_path: &Path,
        extra_dirs: &[PathBuf],
        fallback: Arc<dyn FallbackResolver>,
        cache: ModuleCache,
    ) -> Self {
        let mut search_paths = extra_dirs.to_vec();
        let parent = match input_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        if !search_paths.contains(&parent) {
            search_paths.push(parent);
        }

        Self::new(search_paths, fallback, cache)
    }

    /// The policy applied to the references of dependencies loaded from the search directories
    #[must_use]
    pub fn reference_policy(mut self, policy: ReferencePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Report resolution progress to `observer`
    #[must_use]
    pub fn with_observer(mut self, observer: &'a dyn Observer) -> Self {
        self.observer = observer;
        self
    }

    /// The search directories, highest priority first
    #[must_use]
    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    pub(crate) fn policy(&self) -> ReferencePolicy {
        self.policy
    }

    pub(crate) fn observer(&self) -> &'a dyn Observer {
        self.observer
    }

    /// Resolve `name` to a loaded module.
    ///
    /// # Errors
    /// Returns [`ResolutionError::NotFound`] if neither a search directory nor the fallback has
    /// the assembly, [`ResolutionError::Cycle`] if `name` is already being loaded and
    /// [`ResolutionError::Load`] if the located file fails to load.
    pub fn resolve(&mut self, name: &str) -> Result<Arc<Module>, ResolutionError> {
        self.resolve_reference(name).map(|reference| reference.module)
    }

    /// As [`Resolver::resolve`], reporting where the module came from
    ///
    /// # Errors
    /// See [`Resolver::resolve`].
    pub fn resolve_reference(&mut self, name: &str) -> Result<ResolvedReference, ResolutionError> {
        let key = name.to_lowercase();
        if let Some(known) = self.resolved.get(&key) {
            return Ok(known.clone());
        }

        if self.in_progress.iter().any(|entry| entry.to_lowercase() == key) {
            let mut chain = self.in_progress.clone();
            chain.push(name.to_string());
            return Err(ResolutionError::Cycle { chain });
        }

        let located = self
            .search_paths
            .iter()
            .find_map(|directory| find_in(directory, name));

        let reference = match located {
            Some(path) => {
                let policy = self.policy;
                let module = self.load_dependency(name, &path, policy)?;
                ResolvedReference {
                    name: name.to_string(),
                    path: Some(path),
                    from_fallback: false,
                    module,
                }
            }
            None => self.resolve_fallback(name, &key)?,
        };

        self.resolved.insert(key, reference.clone());
        Ok(reference)
    }

    fn resolve_fallback(
        &mut self,
        name: &str,
        key: &str,
    ) -> Result<ResolvedReference, ResolutionError> {
        let cached = self.cache.get(key).map(|entry| Arc::clone(entry.value()));
        let module = match cached {
            Some(module) => module,
            None => {
                let Some(path) = self.fallback.locate(name) else {
                    return Err(ResolutionError::NotFound {
                        name: name.to_string(),
                    });
                };

                let module = self.load_dependency(name, &path, ReferencePolicy::Lenient)?;
                Arc::clone(
                    self.cache
                        .entry(key.to_string())
                        .or_insert(module)
                        .value(),
                )
            }
        };

        let path = module.path().map(Path::to_path_buf);
        if let Some(path) = &path {
            self.observer.notify(&Event::FallbackUsed { name, path });
        }

        Ok(ResolvedReference {
            name: name.to_string(),
            path,
            from_fallback: true,
            module,
        })
    }

    fn load_dependency(
        &mut self,
        name: &str,
        path: &Path,
        policy: ReferencePolicy,
    ) -> Result<Arc<Module>, ResolutionError> {
        let module = Loader::new(self)
            .policy(policy)
            .load_as(name, path)
            .map_err(|source| ResolutionError::Load {
                name: name.to_string(),
                path: path.to_path_buf(),
                source: Box::new(source),
            })?;

        Ok(Arc::new(module))
    }

    pub(crate) fn enter(&mut self, name: &str) {
        self.in_progress.push(name.to_string());
    }

    pub(crate) fn leave(&mut self) {
        self.in_progress.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::builder::AssemblyBuilder;

    fn write(dir: &Path, file: &str, builder: &AssemblyBuilder) -> PathBuf {
        let path = dir.join(file);
        fs::write(&path, builder.build()).unwrap();
        path
    }

    struct FixedFallback(PathBuf);

    impl FallbackResolver for FixedFallback {
        fn locate(&self, name: &str) -> Option<PathBuf> {
            find_in(&self.0, name)
        }
    }

    #[test]
    fn search_order() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        write(first.path(), "Lib.dll", &AssemblyBuilder::new("Lib").version(1, 0, 0, 0));
        write(second.path(), "Lib.dll", &AssemblyBuilder::new("Lib").version(2, 0, 0, 0));

        let mut resolver = Resolver::new(
            vec![first.path().to_path_buf(), second.path().to_path_buf()],
            Arc::new(NoFallback),
            ModuleCache::default(),
        );
        let module = resolver.resolve("Lib").unwrap();
        assert_eq!(module.assembly.as_ref().unwrap().version.major, 1);

        let mut resolver = Resolver::new(
            vec![second.path().to_path_buf(), first.path().to_path_buf()],
            Arc::new(NoFallback),
            ModuleCache::default(),
        );
        let module = resolver.resolve("Lib").unwrap();
        assert_eq!(module.assembly.as_ref().unwrap().version.major, 2);
    }

    #[test]
    fn memoized_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "Lib.dll", &AssemblyBuilder::new("Lib"));

        let mut resolver = Resolver::new(
            vec![dir.path().to_path_buf()],
            Arc::new(NoFallback),
            ModuleCache::default(),
        );
        let first = resolver.resolve("Lib").unwrap();
        let second = resolver.resolve("LIB").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn exe_candidate() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "Tool.exe", &AssemblyBuilder::new("Tool"));

        let mut resolver = Resolver::for_input(
            &dir.path().join("App.dll"),
            &[],
            Arc::new(NoFallback),
            ModuleCache::default(),
        );
        assert_eq!(resolver.search_paths(), &[dir.path().to_path_buf()]);
        assert!(resolver.resolve("Tool").is_ok());
    }

    #[test]
    fn not_found() {
        let dir = tempfile::tempdir().unwrap();
        let mut resolver = Resolver::new(
            vec![dir.path().to_path_buf()],
            Arc::new(NoFallback),
            ModuleCache::default(),
        );
        match resolver.resolve("Missing") {
            Err(ResolutionError::NotFound { name }) => assert_eq!(name, "Missing"),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn corrupt_dependency() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Broken.dll"), b"not a module").unwrap();

        let mut resolver = Resolver::new(
            vec![dir.path().to_path_buf()],
            Arc::new(NoFallback),
            ModuleCache::default(),
        );
        match resolver.resolve("Broken") {
            Err(ResolutionError::Load { name, path, .. }) => {
                assert_eq!(name, "Broken");
                assert_eq!(path, dir.path().join("Broken.dll"));
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn fallback_is_cached() {
        let platform = tempfile::tempdir().unwrap();
        let search = tempfile::tempdir().unwrap();
        write(platform.path(), "System.Runtime.dll", &AssemblyBuilder::new("System.Runtime"));

        let cache = ModuleCache::default();
        let fallback: Arc<dyn FallbackResolver> =
            Arc::new(FixedFallback(platform.path().to_path_buf()));

        let mut first = Resolver::new(
            vec![search.path().to_path_buf()],
            Arc::clone(&fallback),
            Arc::clone(&cache),
        );
        let reference = first.resolve_reference("System.Runtime").unwrap();
        assert!(reference.from_fallback);
        assert_eq!(
            reference.path.as_deref(),
            Some(platform.path().join("System.Runtime.dll").as_path())
        );
        assert!(cache.contains_key("system.runtime"));

        let mut second = Resolver::new(vec![search.path().to_path_buf()], fallback, cache);
        let again = second.resolve("system.runtime").unwrap();
        assert!(Arc::ptr_eq(&reference.module, &again));
    }

    #[test]
    fn platform_versions() {
        assert_eq!(parse_version("8.0.11"), Some(vec![8, 0, 11]));
        assert_eq!(parse_version("9.0.0-rc.2"), Some(vec![9, 0, 0]));
        assert_eq!(parse_version("latest"), None);

        let shared = tempfile::tempdir().unwrap();
        for version in ["6.0.36", "8.0.2", "8.0.11", "notes"] {
            fs::create_dir(shared.path().join(version)).unwrap();
        }
        assert_eq!(
            latest_version(shared.path()),
            Some(shared.path().join("8.0.11"))
        );

        let fallback = PlatformFallback::new(vec![shared.path().join("8.0.11")]);
        assert!(fallback.locate("System.Runtime").is_none());
    }
}
