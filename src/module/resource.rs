//! Manifest resources.

use crate::{
    metadata::tables::TableId,
    module::attributes::ManifestResourceAttributes,
};

/// Where the data of a manifest resource lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceLocation {
    /// Inside the CLR resources directory of this image
    Embedded {
        /// Offset of the length prefix, relative to the resources directory
        offset: u32,
        /// Length of the payload, without the 4 byte prefix
        size: u32,
    },
    /// In another file or assembly, through the `Implementation` coded index
    Linked {
        /// `File`, `AssemblyRef` or `ExportedType`
        table: TableId,
        /// Row in `table`
        row: u32,
    },
}

/// One `ManifestResource` row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    /// Row index
    pub rid: u32,
    /// Resource name
    pub name: String,
    /// Visibility flags
    pub flags: ManifestResourceAttributes,
    /// Location of the data
    pub location: ResourceLocation,
}

impl Resource {
    /// True if the payload is stored in this image
    #[must_use]
    pub fn is_embedded(&self) -> bool {
        matches!(self.location, ResourceLocation::Embedded { .. })
    }
}
