//! Column layouts of all metadata tables, ECMA-335 II.22.

use crate::metadata::tables::{codedindex::CodedIndexType, tableid::TableId};

/// The kind of a single table column, which determines its width
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Column {
    /// A constant of 1, 2 or 4 bytes
    Fixed(u8),
    /// Index into the `#Strings` heap
    Str,
    /// Index into the `#GUID` heap
    Guid,
    /// Index into the `#Blob` heap
    Blob,
    /// Simple index into another table
    Index(TableId),
    /// Coded index into one of several tables
    Coded(CodedIndexType),
}

const U8: Column = Column::Fixed(1);
const U16: Column = Column::Fixed(2);
const U32: Column = Column::Fixed(4);

use Column::{Blob, Coded, Guid, Index, Str};
use CodedIndexType as C;
use TableId as T;

impl TableId {
    /// The columns of one row of this table, in on-disk order
    #[must_use]
    #[rustfmt::skip]
    pub fn columns(&self) -> &'static [Column] {
        match self {
            // Generation, Name, Mvid, EncId, EncBaseId
            T::Module => &[U16, Str, Guid, Guid, Guid],
            // ResolutionScope, TypeName, TypeNamespace
            T::TypeRef => &[Coded(C::ResolutionScope), Str, Str],
            // Flags, TypeName, TypeNamespace, Extends, FieldList, MethodList
            T::TypeDef => &[U32, Str, Str, Coded(C::TypeDefOrRef), Index(T::Field), Index(T::MethodDef)],
            T::FieldPtr => &[Index(T::Field)],
            // Flags, Name, Signature
            T::Field => &[U16, Str, Blob],
            T::MethodPtr => &[Index(T::MethodDef)],
            // RVA, ImplFlags, Flags, Name, Signature, ParamList
            T::MethodDef => &[U32, U16, U16, Str, Blob, Index(T::Param)],
            T::ParamPtr => &[Index(T::Param)],
            // Flags, Sequence, Name
            T::Param => &[U16, U16, Str],
            // Class, Interface
            T::InterfaceImpl => &[Index(T::TypeDef), Coded(C::TypeDefOrRef)],
            // Class, Name, Signature
            T::MemberRef => &[Coded(C::MemberRefParent), Str, Blob],
            // Type, Padding, Parent, Value
            T::Constant => &[U8, U8, Coded(C::HasConstant), Blob],
            // Parent, Type, Value
            T::CustomAttribute => &[Coded(C::HasCustomAttribute), Coded(C::CustomAttributeType), Blob],
            // Parent, NativeType
            T::FieldMarshal => &[Coded(C::HasFieldMarshal), Blob],
            // Action, Parent, PermissionSet
            T::DeclSecurity => &[U16, Coded(C::HasDeclSecurity), Blob],
            // PackingSize, ClassSize, Parent
            T::ClassLayout => &[U16, U32, Index(T::TypeDef)],
            // Offset, Field
            T::FieldLayout => &[U32, Index(T::Field)],
            T::StandAloneSig => &[Blob],
            // Parent, EventList
            T::EventMap => &[Index(T::TypeDef), Index(T::Event)],
            T::EventPtr => &[Index(T::Event)],
            // EventFlags, Name, EventType
            T::Event => &[U16, Str, Coded(C::TypeDefOrRef)],
            // Parent, PropertyList
            T::PropertyMap => &[Index(T::TypeDef), Index(T::Property)],
            T::PropertyPtr => &[Index(T::Property)],
            // Flags, Name, Type
            T::Property => &[U16, Str, Blob],
            // Semantics, Method, Association
            T::MethodSemantics => &[U16, Index(T::MethodDef), Coded(C::HasSemantics)],
            // Class, MethodBody, MethodDeclaration
            T::MethodImpl => &[Index(T::TypeDef), Coded(C::MethodDefOrRef), Coded(C::MethodDefOrRef)],
            T::ModuleRef => &[Str],
            T::TypeSpec => &[Blob],
            // MappingFlags, MemberForwarded, ImportName, ImportScope
            T::ImplMap => &[U16, Coded(C::MemberForwarded), Str, Index(T::ModuleRef)],
            // RVA, Field
            T::FieldRVA => &[U32, Index(T::Field)],
            // Token, FuncCode
            T::EncLog => &[U32, U32],
            T::EncMap => &[U32],
            // HashAlgId, Major, Minor, Build, Revision, Flags, PublicKey, Name, Culture
            T::Assembly => &[U32, U16, U16, U16, U16, U32, Blob, Str, Str],
            T::AssemblyProcessor => &[U32],
            // OSPlatformID, OSMajorVersion, OSMinorVersion
            T::AssemblyOS => &[U32, U32, U32],
            // Major, Minor, Build, Revision, Flags, PublicKeyOrToken, Name, Culture, HashValue
            T::AssemblyRef => &[U16, U16, U16, U16, U32, Blob, Str, Str, Blob],
            T::AssemblyRefProcessor => &[U32, Index(T::AssemblyRef)],
            T::AssemblyRefOS => &[U32, U32, U32, Index(T::AssemblyRef)],
            // Flags, Name, HashValue
            T::File => &[U32, Str, Blob],
            // Flags, TypeDefId, TypeName, TypeNamespace, Implementation
            T::ExportedType => &[U32, U32, Str, Str, Coded(C::Implementation)],
            // Offset, Flags, Name, Implementation
            T::ManifestResource => &[U32, U32, Str, Coded(C::Implementation)],
            // NestedClass, EnclosingClass
            T::NestedClass => &[Index(T::TypeDef), Index(T::TypeDef)],
            // Number, Flags, Owner, Name
            T::GenericParam => &[U16, U16, Coded(C::TypeOrMethodDef), Str],
            // Method, Instantiation
            T::MethodSpec => &[Coded(C::MethodDefOrRef), Blob],
            // Owner, Constraint
            T::GenericParamConstraint => &[Index(T::GenericParam), Coded(C::TypeDefOrRef)],
        }
    }
}
