//! Coded indices, ECMA-335 II.24.2.6.
//!
//! A coded index stores a row index together with a tag in its low bits that selects one of
//! several possible target tables.

use strum::{EnumCount, EnumIter};

use crate::{metadata::tables::TableId, Result};

/// All coded index kinds used by assembly metadata
#[derive(Debug, Hash, Eq, PartialEq, Clone, Copy, EnumIter, EnumCount)]
#[repr(usize)]
pub enum CodedIndexType {
    /// `TypeDef`, `TypeRef`, `TypeSpec`
    TypeDefOrRef,
    /// `Field`, `Param`, `Property`
    HasConstant,
    /// Everything a custom attribute can be attached to
    HasCustomAttribute,
    /// `Field`, `Param`
    HasFieldMarshal,
    /// `TypeDef`, `MethodDef`, `Assembly`
    HasDeclSecurity,
    /// `TypeDef`, `TypeRef`, `ModuleRef`, `MethodDef`, `TypeSpec`
    MemberRefParent,
    /// `Event`, `Property`
    HasSemantics,
    /// `MethodDef`, `MemberRef`
    MethodDefOrRef,
    /// `Field`, `MethodDef`
    MemberForwarded,
    /// `File`, `AssemblyRef`, `ExportedType`
    Implementation,
    /// Attribute constructors: `MethodDef` (tag 2) and `MemberRef` (tag 3)
    CustomAttributeType,
    /// `Module`, `ModuleRef`, `AssemblyRef`, `TypeRef`
    ResolutionScope,
    /// `TypeDef`, `MethodDef`
    TypeOrMethodDef,
}

impl CodedIndexType {
    /// The target tables, indexed by tag. `None` marks tags that are reserved.
    #[must_use]
    pub fn tables(&self) -> &'static [Option<TableId>] {
        match self {
            CodedIndexType::TypeDefOrRef => &[
                Some(TableId::TypeDef),
                Some(TableId::TypeRef),
                Some(TableId::TypeSpec),
            ],
            CodedIndexType::HasConstant => &[
                Some(TableId::Field),
                Some(TableId::Param),
                Some(TableId::Property),
            ],
            CodedIndexType::HasCustomAttribute => &[
                Some(TableId::MethodDef),
                Some(TableId::Field),
                Some(TableId::TypeRef),
                Some(TableId::TypeDef),
                Some(TableId::Param),
                Some(TableId::InterfaceImpl),
                Some(TableId::MemberRef),
                Some(TableId::Module),
                // Labeled 'Permission' in the standard, the table is DeclSecurity
                Some(TableId::DeclSecurity),
                Some(TableId::Property),
                Some(TableId::Event),
                Some(TableId::StandAloneSig),
                Some(TableId::ModuleRef),
                Some(TableId::TypeSpec),
                Some(TableId::Assembly),
                Some(TableId::AssemblyRef),
                Some(TableId::File),
                Some(TableId::ExportedType),
                Some(TableId::ManifestResource),
                Some(TableId::GenericParam),
                Some(TableId::GenericParamConstraint),
                Some(TableId::MethodSpec),
            ],
            CodedIndexType::HasFieldMarshal => &[Some(TableId::Field), Some(TableId::Param)],
            CodedIndexType::HasDeclSecurity => &[
                Some(TableId::TypeDef),
                Some(TableId::MethodDef),
                Some(TableId::Assembly),
            ],
            CodedIndexType::MemberRefParent => &[
                Some(TableId::TypeDef),
                Some(TableId::TypeRef),
                Some(TableId::ModuleRef),
                Some(TableId::MethodDef),
                Some(TableId::TypeSpec),
            ],
            CodedIndexType::HasSemantics => &[Some(TableId::Event), Some(TableId::Property)],
            CodedIndexType::MethodDefOrRef => {
                &[Some(TableId::MethodDef), Some(TableId::MemberRef)]
            }
            CodedIndexType::MemberForwarded => &[Some(TableId::Field), Some(TableId::MethodDef)],
            CodedIndexType::Implementation => &[
                Some(TableId::File),
                Some(TableId::AssemblyRef),
                Some(TableId::ExportedType),
            ],
            CodedIndexType::CustomAttributeType => &[
                None,
                None,
                Some(TableId::MethodDef),
                Some(TableId::MemberRef),
                None,
            ],
            CodedIndexType::ResolutionScope => &[
                Some(TableId::Module),
                Some(TableId::ModuleRef),
                Some(TableId::AssemblyRef),
                Some(TableId::TypeRef),
            ],
            CodedIndexType::TypeOrMethodDef => &[Some(TableId::TypeDef), Some(TableId::MethodDef)],
        }
    }

    /// Number of low bits holding the tag
    #[must_use]
    pub fn tag_bits(&self) -> u8 {
        let count = self.tables().len();
        // ceil(log2(count)), count is always >= 2
        (usize::BITS - (count - 1).leading_zeros()) as u8
    }

    /// Split a raw coded index into target table and row. Row 0 is the null reference.
    ///
    /// # Errors
    /// Returns a malformed error if the tag is out of range or reserved.
    pub fn decode(&self, value: u32) -> Result<(TableId, u32)> {
        let tag_bits = self.tag_bits();
        let tag = (value & ((1 << tag_bits) - 1)) as usize;

        match self.tables().get(tag) {
            Some(Some(table)) => Ok((*table, value >> tag_bits)),
            _ => Err(malformed_error!(
                "Invalid tag {} for coded index {:?} - {}",
                tag,
                self,
                value
            )),
        }
    }

    /// Build the raw coded index pointing at `row` of `table`.
    ///
    /// # Errors
    /// Returns a malformed error if `table` is not a target of this coded index.
    pub fn encode(&self, table: TableId, row: u32) -> Result<u32> {
        let Some(tag) = self
            .tables()
            .iter()
            .position(|target| *target == Some(table))
        else {
            return Err(malformed_error!(
                "Table {} is not a target of coded index {:?}",
                table,
                self
            ));
        };

        Ok((row << self.tag_bits()) | tag as u32)
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn tag_bits() {
        assert_eq!(CodedIndexType::TypeDefOrRef.tag_bits(), 2);
        assert_eq!(CodedIndexType::HasCustomAttribute.tag_bits(), 5);
        assert_eq!(CodedIndexType::HasSemantics.tag_bits(), 1);
        assert_eq!(CodedIndexType::MemberRefParent.tag_bits(), 3);
        assert_eq!(CodedIndexType::CustomAttributeType.tag_bits(), 3);
        assert_eq!(CodedIndexType::ResolutionScope.tag_bits(), 2);
    }

    #[test]
    fn decode_encode() {
        let value = CodedIndexType::HasCustomAttribute
            .encode(TableId::ManifestResource, 3)
            .unwrap();
        assert_eq!(value, (3 << 5) | 18);
        assert_eq!(
            CodedIndexType::HasCustomAttribute.decode(value).unwrap(),
            (TableId::ManifestResource, 3)
        );

        assert_eq!(
            CodedIndexType::CustomAttributeType.decode(0x1A).unwrap(),
            (TableId::MethodDef, 3)
        );
        assert!(CodedIndexType::CustomAttributeType.decode(0x19).is_err());
        assert!(CodedIndexType::HasSemantics
            .encode(TableId::TypeDef, 1)
            .is_err());
    }

    #[test]
    fn every_kind_has_targets() {
        for kind in CodedIndexType::iter() {
            assert!(kind.tables().iter().flatten().count() >= 2, "{kind:?}");
        }
    }
}
