//! Loading an input file into a [`Module`] with all of its required references.
//!
//! The whole file is read into memory and parsed up front: PE headers, metadata, the type graph
//! and every method body. Afterwards each required `AssemblyRef` is resolved through the
//! borrowed [`Resolver`]; what happens when one can't be found depends on the
//! [`ReferencePolicy`].

use std::{fs, path::Path};

use log::debug;

use crate::{
    error::LoadError,
    module::Module,
    observer::Event,
    resolver::Resolver,
};

/// What to do when a required reference cannot be resolved
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ReferencePolicy {
    /// Fail the load
    #[default]
    Strict,
    /// Report the failure and keep loading
    Lenient,
}

/// Loads modules and resolves their dependencies
pub struct Loader<'r, 'a> {
    resolver: &'r mut Resolver<'a>,
    policy: ReferencePolicy,
}

impl<'r, 'a> Loader<'r, 'a> {
    /// Create a loader resolving through `resolver`, with the resolver's policy
    pub fn new(resolver: &'r mut Resolver<'a>) -> Self {
        let policy = resolver.policy();
        Loader { resolver, policy }
    }

    /// Override the reference policy for this load
    #[must_use]
    pub fn policy(mut self, policy: ReferencePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Load the module at `path`.
    ///
    /// # Errors
    /// Returns [`LoadError::Io`] if the file can't be read, [`LoadError::Malformed`] if it is
    /// not a valid module and, under [`ReferencePolicy::Strict`],
    /// [`LoadError::UnresolvedReference`] for the first required reference that fails.
    pub fn load(self, path: &Path) -> Result<Module, LoadError> {
        let module = read_module(path)?;
        let name = module.display_name().to_string();
        self.finish(&name, module)
    }

    /// Load a dependency requested as `name`
    pub(crate) fn load_as(self, name: &str, path: &Path) -> Result<Module, LoadError> {
        let module = read_module(path)?;
        self.finish(name, module)
    }

    fn finish(self, name: &str, mut module: Module) -> Result<Module, LoadError> {
        let observer = self.resolver.observer();
        observer.notify(&Event::ModuleLoaded {
            name: module.display_name(),
            types: module.all_types().len(),
        });

        self.resolver.enter(name);
        let result = resolve_references(self.resolver, self.policy, &mut module);
        self.resolver.leave();
        result?;

        Ok(module)
    }
}

/// Load `path`, resolving its references through `resolver`.
///
/// # Errors
/// See [`Loader::load`].
pub fn load(path: &Path, resolver: &mut Resolver<'_>) -> Result<Module, LoadError> {
    Loader::new(resolver).load(path)
}

fn read_module(path: &Path) -> Result<Module, LoadError> {
    let data = fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut module = Module::from_mem(data).map_err(|source| LoadError::Malformed {
        path: path.to_path_buf(),
        source,
    })?;
    module.set_path(path);
    Ok(module)
}

fn resolve_references(
    resolver: &mut Resolver<'_>,
    policy: ReferencePolicy,
    module: &mut Module,
) -> Result<(), LoadError> {
    let own_name = module.display_name().to_lowercase();
    let required: Vec<_> = module
        .required_references()
        .filter(|reference| reference.name.to_lowercase() != own_name)
        .cloned()
        .collect();

    for reference in required {
        match resolver.resolve_reference(&reference.name) {
            Ok(resolved) => {
                resolver.observer().notify(&Event::ReferenceResolved {
                    name: &reference.name,
                    path: resolved.path.as_deref(),
                });

                for ty in &reference.types {
                    if !resolved.module.defines_type(&ty.namespace, &ty.name) {
                        debug!(
                            "{} does not define {}.{} referenced by {}",
                            reference.name,
                            ty.namespace,
                            ty.name,
                            module.display_name()
                        );
                    }
                }

                module.references.push(resolved);
            }
            Err(error) => match policy {
                ReferencePolicy::Strict => {
                    return Err(LoadError::UnresolvedReference {
                        name: reference.name,
                        source: error,
                    })
                }
                ReferencePolicy::Lenient => {
                    resolver.observer().notify(&Event::ReferenceUnresolved {
                        name: &reference.name,
                        error: &error,
                    });
                }
            },
        }
    }

    Ok(())
}
