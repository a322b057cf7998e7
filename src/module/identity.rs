//! Assembly identities, references and the dependencies loaded for them.

use std::{fmt, path::PathBuf, sync::Arc};

use crate::module::Module;

/// A four part assembly version
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssemblyVersion {
    /// Major version
    pub major: u16,
    /// Minor version
    pub minor: u16,
    /// Build number
    pub build: u16,
    /// Revision number
    pub revision: u16,
}

impl AssemblyVersion {
    /// Create a new version
    #[must_use]
    pub fn new(major: u16, minor: u16, build: u16, revision: u16) -> Self {
        AssemblyVersion {
            major,
            minor,
            build,
            revision,
        }
    }
}

impl fmt::Display for AssemblyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.build, self.revision
        )
    }
}

/// Identity of the assembly a module belongs to (its `Assembly` row)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyIdentity {
    /// Simple name
    pub name: String,
    /// Version
    pub version: AssemblyVersion,
    /// Culture, `None` for the neutral culture
    pub culture: Option<String>,
}

impl fmt::Display for AssemblyIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, Version={}, Culture={}",
            self.name,
            self.version,
            self.culture.as_deref().unwrap_or("neutral")
        )
    }
}

/// A type referenced from another assembly
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferencedType {
    /// Namespace of the outermost type
    pub namespace: String,
    /// Name of the outermost type
    pub name: String,
}

/// One `AssemblyRef` row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyReference {
    /// Row index
    pub rid: u32,
    /// Simple name of the referenced assembly
    pub name: String,
    /// Requested version
    pub version: AssemblyVersion,
    /// Types this module uses from the assembly. A reference with at least one type is
    /// required for loading.
    pub types: Vec<ReferencedType>,
}

impl AssemblyReference {
    /// True if some TypeRef resolves into this assembly
    #[must_use]
    pub fn is_required(&self) -> bool {
        !self.types.is_empty()
    }
}

/// A dependency that was located and loaded
#[derive(Debug, Clone)]
pub struct ResolvedReference {
    /// The requested name
    pub name: String,
    /// Where the dependency was loaded from
    pub path: Option<PathBuf>,
    /// True if the platform fallback supplied it
    pub from_fallback: bool,
    /// The loaded dependency
    pub module: Arc<Module>,
}
