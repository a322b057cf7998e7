//! Flag sets of the type, property, event and manifest resource rows.

use bitflags::bitflags;

/// Mask of the visibility bits of [`TypeAttributes`]
pub const TYPE_VISIBILITY_MASK: u32 = 0x0000_0007;

bitflags! {
    /// Flags of a TypeDef row, II.23.1.15
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TypeAttributes: u32 {
        /// Visible outside the assembly
        const PUBLIC = 0x0000_0001;
        /// Nested, public
        const NESTED_PUBLIC = 0x0000_0002;
        /// Nested, private
        const NESTED_PRIVATE = 0x0000_0003;
        /// Nested, family
        const NESTED_FAMILY = 0x0000_0004;
        /// Nested, assembly
        const NESTED_ASSEMBLY = 0x0000_0005;
        /// Nested, family and assembly
        const NESTED_FAM_AND_ASSEM = 0x0000_0006;
        /// Nested, family or assembly
        const NESTED_FAM_OR_ASSEM = 0x0000_0007;
        /// Sequential field layout
        const SEQUENTIAL_LAYOUT = 0x0000_0008;
        /// Explicit field layout
        const EXPLICIT_LAYOUT = 0x0000_0010;
        /// An interface
        const INTERFACE = 0x0000_0020;
        /// Cannot be instantiated
        const ABSTRACT = 0x0000_0080;
        /// Cannot be derived from
        const SEALED = 0x0000_0100;
        /// Name is special
        const SPECIAL_NAME = 0x0000_0400;
        /// Imported from COM
        const IMPORT = 0x0000_1000;
        /// Serializable
        const SERIALIZABLE = 0x0000_2000;
        /// Unicode string marshalling
        const UNICODE_CLASS = 0x0001_0000;
        /// Automatic string marshalling
        const AUTO_CLASS = 0x0002_0000;
        /// Static fields may be initialized lazily
        const BEFORE_FIELD_INIT = 0x0010_0000;
        /// The runtime checks the name encoding
        const RTSPECIAL_NAME = 0x0000_0800;
        /// Has security metadata
        const HAS_SECURITY = 0x0004_0000;
    }
}

impl TypeAttributes {
    /// True if the visibility bits describe a nested type
    #[must_use]
    pub fn is_nested(&self) -> bool {
        self.bits() & TYPE_VISIBILITY_MASK > 1
    }
}

bitflags! {
    /// Flags of a Property row, II.23.1.14
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PropertyAttributes: u16 {
        /// Name is special
        const SPECIAL_NAME = 0x0200;
        /// The runtime checks the name encoding
        const RTSPECIAL_NAME = 0x0400;
        /// Has a default value
        const HAS_DEFAULT = 0x1000;
    }
}

bitflags! {
    /// Flags of an Event row, II.23.1.4
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EventAttributes: u16 {
        /// Name is special
        const SPECIAL_NAME = 0x0200;
        /// The runtime checks the name encoding
        const RTSPECIAL_NAME = 0x0400;
    }
}

bitflags! {
    /// Flags of a ManifestResource row, II.23.1.9
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ManifestResourceAttributes: u32 {
        /// Exported from the assembly
        const PUBLIC = 0x0001;
        /// Private to the assembly
        const PRIVATE = 0x0002;
    }
}
