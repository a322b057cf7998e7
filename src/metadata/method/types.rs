//! Method flags and body header flags.

use bitflags::bitflags;

/// Mask of the code type in `MethodImplAttributes`
pub const METHOD_IMPL_CODE_TYPE_MASK: u16 = 0x0003;

/// Mask of the member access in `MethodAttributes`
pub const METHOD_ACCESS_MASK: u16 = 0x0007;

bitflags! {
    /// `MethodAttributes`, ECMA-335 II.23.1.10
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MethodAttributes: u16 {
        /// Accessible only by the parent type
        const PRIVATE = 0x0001;
        /// Accessible by sub-types only in this assembly
        const FAM_AND_ASSEM = 0x0002;
        /// Accessible by anyone in the assembly
        const ASSEM = 0x0003;
        /// Accessible only by type and sub-types
        const FAMILY = 0x0004;
        /// Accessible by sub-types anywhere, plus anyone in the assembly
        const FAM_OR_ASSEM = 0x0005;
        /// Accessible by anyone
        const PUBLIC = 0x0006;
        /// Managed native export
        const UNMANAGED_EXPORT = 0x0008;
        /// Defined on type, not per instance
        const STATIC = 0x0010;
        /// Method may not be overridden
        const FINAL = 0x0020;
        /// Method is virtual
        const VIRTUAL = 0x0040;
        /// Method hides by name and signature
        const HIDE_BY_SIG = 0x0080;
        /// Method always gets a new vtable slot
        const NEW_SLOT = 0x0100;
        /// Method can only be overridden if also accessible
        const STRICT = 0x0200;
        /// Method does not provide an implementation
        const ABSTRACT = 0x0400;
        /// Method is special
        const SPECIAL_NAME = 0x0800;
        /// CLI provides 'special' behavior, depending upon the name of the method
        const RTSPECIAL_NAME = 0x1000;
        /// Implementation is forwarded through PInvoke
        const PINVOKE_IMPL = 0x2000;
        /// Method has security associated with it
        const HAS_SECURITY = 0x4000;
        /// Method calls another method containing security code
        const REQUIRE_SEC_OBJECT = 0x8000;
    }
}

bitflags! {
    /// `MethodImplAttributes`, ECMA-335 II.23.1.11
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MethodImplAttributes: u16 {
        /// Method implementation is native
        const NATIVE = 0x0001;
        /// Method implementation is optimized IL
        const OPTIL = 0x0002;
        /// Method implementation is provided by the runtime
        const RUNTIME = 0x0003;
        /// Method implementation is unmanaged
        const UNMANAGED = 0x0004;
        /// Method may not be inlined
        const NO_INLINING = 0x0008;
        /// Method is defined, the body is provided elsewhere
        const FORWARD_REF = 0x0010;
        /// Method is single threaded through the body
        const SYNCHRONIZED = 0x0020;
        /// Method may not be optimized
        const NO_OPTIMIZATION = 0x0040;
        /// Method signature is exported exactly as declared
        const PRESERVE_SIG = 0x0080;
        /// Method is implemented inside the runtime
        const INTERNAL_CALL = 0x1000;
    }
}

impl MethodImplAttributes {
    /// True if the implementation is CIL, i.e. the method may carry an IL body
    #[must_use]
    pub fn is_il(&self) -> bool {
        self.bits() & METHOD_IMPL_CODE_TYPE_MASK == 0
    }
}

bitflags! {
    /// `MethodSemanticsAttributes`, ECMA-335 II.23.1.12
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MethodSemanticsAttributes: u16 {
        /// Setter for property
        const SETTER = 0x0001;
        /// Getter for property
        const GETTER = 0x0002;
        /// Other method for property or event
        const OTHER = 0x0004;
        /// AddOn method for event
        const ADD_ON = 0x0008;
        /// RemoveOn method for event
        const REMOVE_ON = 0x0010;
        /// Fire method for event
        const FIRE = 0x0020;
    }
}

bitflags! {
    /// Flags of the method body header, II.25.4
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MethodBodyFlags: u16 {
        /// Tiny method header format
        const TINY_FORMAT = 0x2;
        /// Fat method header format
        const FAT_FORMAT = 0x3;
        /// More data sections follow the code
        const MORE_SECTS = 0x8;
        /// Zero-initialize all locals
        const INIT_LOCALS = 0x10;
    }
}

bitflags! {
    /// Flags of an extra data section behind a method body, II.25.4.5
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SectionFlags: u8 {
        /// Section contains exception handling data
        const EHTABLE = 0x1;
        /// Reserved, shall be 0
        const OPT_ILTABLE = 0x2;
        /// Section uses the fat clause format
        const FAT_FORMAT = 0x40;
        /// Another section follows this one
        const MORE_SECTS = 0x80;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn impl_code_type() {
        assert!(MethodImplAttributes::from_bits_retain(0).is_il());
        assert!(MethodImplAttributes::NO_INLINING.is_il());
        assert!(!MethodImplAttributes::RUNTIME.is_il());
        assert!(!MethodImplAttributes::NATIVE.is_il());
    }
}
