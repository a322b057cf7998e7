//! The module graph: the in-memory model of one loaded assembly.
//!
//! A [`Module`] owns the image bytes, the decoded metadata and the object graph built from it:
//! a tree of [`TypeDef`]s with their members and method bodies, the embedded [`Resource`]s and
//! the references resolved by the [`crate::Loader`]. The stripper mutates bodies and resources in
//! place, the writer serializes the result against the original image.
//!
//! # Examples
//!
//! ```rust,no_run
//! use cilstrip::Module;
//!
//! let module = Module::from_file("tests/samples/Library.dll".as_ref())?;
//! for ty in module.all_types() {
//!     println!("{} ({} members)", ty.full_name, ty.members().count());
//! }
//! # Ok::<(), cilstrip::Error>(())
//! ```

pub mod attributes;
pub mod identity;
pub mod members;
pub mod resource;
pub mod typedef;

mod graph;

use std::{
    fmt,
    path::{Path, PathBuf},
};

use crate::{
    file::File,
    metadata::Metadata,
    Result,
};

pub use attributes::{
    EventAttributes, ManifestResourceAttributes, PropertyAttributes, TypeAttributes,
};
pub use identity::{
    AssemblyIdentity, AssemblyReference, AssemblyVersion, ReferencedType, ResolvedReference,
};
pub use members::{Event, HasOptionalBody, MemberKind, Method, Property};
pub use resource::{Resource, ResourceLocation};
pub use typedef::TypeDef;

/// One loaded assembly module
pub struct Module {
    /// Module name from the Module table, e.g. `Library.dll`
    pub name: String,
    /// Module version id
    pub mvid: uguid::Guid,
    /// The assembly manifest, `None` for netmodules
    pub assembly: Option<AssemblyIdentity>,
    /// Top-level types in table order, `<Module>` first
    pub types: Vec<TypeDef>,
    /// Manifest resources
    pub resources: Vec<Resource>,
    /// Dependencies loaded for this module
    pub references: Vec<ResolvedReference>,
    assembly_refs: Vec<AssemblyReference>,
    exported_types: Vec<ReferencedType>,
    loaded_resources: Vec<Resource>,
    path: Option<PathBuf>,
    metadata: Metadata,
    file: File,
}

impl Module {
    /// Parse a module from memory, without resolving its references.
    ///
    /// # Errors
    /// Returns an error if the image is not a valid .NET assembly.
    pub fn from_mem(data: Vec<u8>) -> Result<Module> {
        let file = File::from_mem(data)?;
        Self::from_parsed(file)
    }

    /// Read and parse a module from disk, without resolving its references.
    ///
    /// # Errors
    /// Returns an I/O error if the file can't be read, otherwise as [`Module::from_mem`].
    pub fn from_file(path: &Path) -> Result<Module> {
        let mut module = Self::from_parsed(File::from_file(path)?)?;
        module.path = Some(path.to_path_buf());
        Ok(module)
    }

    fn from_parsed(file: File) -> Result<Module> {
        let metadata = Metadata::read(&file)?;
        let graph = graph::build(&file, &metadata)?;

        Ok(Module {
            name: graph.name,
            mvid: graph.mvid,
            assembly: graph.assembly,
            types: graph.types,
            loaded_resources: graph.resources.clone(),
            resources: graph.resources,
            references: Vec::new(),
            assembly_refs: graph.assembly_refs,
            exported_types: graph.exported_types,
            path: None,
            metadata,
            file,
        })
    }

    pub(crate) fn set_path(&mut self, path: &Path) {
        self.path = Some(path.to_path_buf());
    }

    /// The file this module was loaded from
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The parsed PE image
    #[must_use]
    pub fn file(&self) -> &File {
        &self.file
    }

    /// The original image bytes
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.file.data()
    }

    /// The decoded metadata as read from the image
    #[must_use]
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// The resources as they were read from the image
    pub(crate) fn loaded_resources(&self) -> &[Resource] {
        &self.loaded_resources
    }

    /// The assembly name, or the module name without extension for netmodules
    #[must_use]
    pub fn display_name(&self) -> &str {
        match &self.assembly {
            Some(assembly) => &assembly.name,
            None => Path::new(&self.name)
                .file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or(&self.name),
        }
    }

    /// All `AssemblyRef` rows
    #[must_use]
    pub fn assembly_refs(&self) -> &[AssemblyReference] {
        &self.assembly_refs
    }

    /// The references that must be resolved to load this module
    pub fn required_references(&self) -> impl Iterator<Item = &AssemblyReference> {
        self.assembly_refs
            .iter()
            .filter(|reference| reference.is_required())
    }

    /// Types forwarded or exported through the ExportedType table
    #[must_use]
    pub fn exported_types(&self) -> &[ReferencedType] {
        &self.exported_types
    }

    /// True if this module defines or exports the top-level type `namespace.name`
    #[must_use]
    pub fn defines_type(&self, namespace: &str, name: &str) -> bool {
        self.types
            .iter()
            .any(|ty| ty.namespace == namespace && ty.name == name)
            || self
                .exported_types
                .iter()
                .any(|ty| ty.namespace == namespace && ty.name == name)
    }

    /// Every type of the module, nested types included, pre-order
    #[must_use]
    pub fn all_types(&self) -> Vec<&TypeDef> {
        let mut result = Vec::new();
        let mut stack: Vec<&TypeDef> = self.types.iter().rev().collect();
        while let Some(ty) = stack.pop() {
            result.push(ty);
            stack.extend(ty.nested.iter().rev());
        }
        result
    }

    /// Look up a type by its qualified name, e.g. `Namespace.Outer/Inner`
    #[must_use]
    pub fn find_type(&self, full_name: &str) -> Option<&TypeDef> {
        self.all_types()
            .into_iter()
            .find(|ty| ty.full_name == full_name)
    }

    /// Every method of every type, accessors included
    #[must_use]
    pub fn all_methods(&self) -> Vec<&Method> {
        self.all_types()
            .into_iter()
            .flat_map(TypeDef::all_methods)
            .collect()
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.name)
            .field("assembly", &self.assembly)
            .field("types", &self.types.len())
            .field("resources", &self.resources.len())
            .field("references", &self.references.len())
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}
