//! Typed views on the rows of the tables the module graph is built from.

use crate::metadata::tables::{stream::TablesStream, tableid::TableId};

/// A typed view on one row of a specific table
pub trait RawRow: Sized {
    /// The table these rows come from
    const TABLE: TableId;

    /// Build the view from row `rid` and its column values
    fn from_row(rid: u32, row: &[u32]) -> Self;
}

impl TablesStream {
    /// Iterate all rows of `T::TABLE` as typed views
    pub fn iter<T: RawRow>(&self) -> impl Iterator<Item = T> + '_ {
        self.table(T::TABLE)
            .rows()
            .enumerate()
            .map(|(index, row)| T::from_row(index as u32 + 1, row))
    }

    /// Row `rid` of `T::TABLE` as a typed view
    #[must_use]
    pub fn get<T: RawRow>(&self, rid: u32) -> Option<T> {
        self.table(T::TABLE)
            .row(rid)
            .map(|row| T::from_row(rid, row))
    }
}

macro_rules! raw_row {
    ($(#[$meta:meta])* $name:ident, $table:expr, { $($(#[$fmeta:meta])* $field:ident = $column:expr),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq)]
        pub struct $name {
            /// 1-based row index
            pub rid: u32,
            $($(#[$fmeta])* pub $field: u32,)*
        }

        impl RawRow for $name {
            const TABLE: TableId = $table;

            fn from_row(rid: u32, row: &[u32]) -> Self {
                $name {
                    rid,
                    $($field: row[$column],)*
                }
            }
        }
    };
}

raw_row!(
    /// `Module` row
    ModuleRaw, TableId::Module, {
    /// `#Strings` index of the module name
    name = 1,
    /// `#GUID` index of the MVID
    mvid = 2,
});

raw_row!(
    /// `TypeRef` row
    TypeRefRaw, TableId::TypeRef, {
    /// `ResolutionScope` coded index
    resolution_scope = 0,
    /// `#Strings` index
    type_name = 1,
    /// `#Strings` index
    type_namespace = 2,
});

raw_row!(
    /// `TypeDef` row
    TypeDefRaw, TableId::TypeDef, {
    /// `TypeAttributes`
    flags = 0,
    /// `#Strings` index
    type_name = 1,
    /// `#Strings` index
    type_namespace = 2,
    /// `TypeDefOrRef` coded index of the base type
    extends = 3,
    /// First entry in `Field` (or `FieldPtr`)
    field_list = 4,
    /// First entry in `MethodDef` (or `MethodPtr`)
    method_list = 5,
});

raw_row!(
    /// `MethodDef` row
    MethodDefRaw, TableId::MethodDef, {
    /// RVA of the method body, 0 if there is none
    rva = 0,
    /// `MethodImplAttributes`
    impl_flags = 1,
    /// `MethodAttributes`
    flags = 2,
    /// `#Strings` index
    name = 3,
    /// `#Blob` index of the signature
    signature = 4,
    /// First entry in `Param` (or `ParamPtr`)
    param_list = 5,
});

raw_row!(
    /// `Param` row
    ParamRaw, TableId::Param, {
    /// `ParamAttributes`
    flags = 0,
    /// 0 for the return value, 1.. for parameters
    sequence = 1,
    /// `#Strings` index
    name = 2,
});

raw_row!(
    /// `EventMap` row
    EventMapRaw, TableId::EventMap, {
    /// Owning `TypeDef`
    parent = 0,
    /// First entry in `Event` (or `EventPtr`)
    event_list = 1,
});

raw_row!(
    /// `Event` row
    EventRaw, TableId::Event, {
    /// `EventAttributes`
    flags = 0,
    /// `#Strings` index
    name = 1,
    /// `TypeDefOrRef` coded index of the delegate type
    event_type = 2,
});

raw_row!(
    /// `PropertyMap` row
    PropertyMapRaw, TableId::PropertyMap, {
    /// Owning `TypeDef`
    parent = 0,
    /// First entry in `Property` (or `PropertyPtr`)
    property_list = 1,
});

raw_row!(
    /// `Property` row
    PropertyRaw, TableId::Property, {
    /// `PropertyAttributes`
    flags = 0,
    /// `#Strings` index
    name = 1,
    /// `#Blob` index of the signature
    signature = 2,
});

raw_row!(
    /// `MethodSemantics` row
    MethodSemanticsRaw, TableId::MethodSemantics, {
    /// `MethodSemanticsAttributes`
    semantics = 0,
    /// The accessor `MethodDef`
    method = 1,
    /// `HasSemantics` coded index of the property or event
    association = 2,
});

raw_row!(
    /// `Assembly` row
    AssemblyRaw, TableId::Assembly, {
    /// Major version
    major_version = 1,
    /// Minor version
    minor_version = 2,
    /// Build number
    build_number = 3,
    /// Revision number
    revision_number = 4,
    /// `AssemblyFlags`
    flags = 5,
    /// `#Strings` index
    name = 7,
    /// `#Strings` index
    culture = 8,
});

raw_row!(
    /// `AssemblyRef` row
    AssemblyRefRaw, TableId::AssemblyRef, {
    /// Major version
    major_version = 0,
    /// Minor version
    minor_version = 1,
    /// Build number
    build_number = 2,
    /// Revision number
    revision_number = 3,
    /// `AssemblyFlags`
    flags = 4,
    /// `#Strings` index
    name = 6,
    /// `#Strings` index
    culture = 7,
});

raw_row!(
    /// `ExportedType` row
    ExportedTypeRaw, TableId::ExportedType, {
    /// `TypeAttributes`
    flags = 0,
    /// `#Strings` index
    type_name = 2,
    /// `#Strings` index
    type_namespace = 3,
    /// `Implementation` coded index
    implementation = 4,
});

raw_row!(
    /// `ManifestResource` row
    ManifestResourceRaw, TableId::ManifestResource, {
    /// Offset into the resources directory, for embedded resources
    offset = 0,
    /// `ManifestResourceAttributes`
    flags = 1,
    /// `#Strings` index
    name = 2,
    /// `Implementation` coded index, 0 for embedded resources
    implementation = 3,
});

raw_row!(
    /// `NestedClass` row
    NestedClassRaw, TableId::NestedClass, {
    /// The nested `TypeDef`
    nested_class = 0,
    /// The enclosing `TypeDef`
    enclosing_class = 1,
});

raw_row!(
    /// `CustomAttribute` row
    CustomAttributeRaw, TableId::CustomAttribute, {
    /// `HasCustomAttribute` coded index of the owner
    parent = 0,
    /// `CustomAttributeType` coded index of the constructor
    constructor = 1,
    /// `#Blob` index of the value
    value = 2,
});

/// Rows of the indirection tables (`MethodPtr`, `ParamPtr`, `EventPtr`, `PropertyPtr`)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PtrRaw {
    /// 1-based row index
    pub rid: u32,
    /// The row the pointer resolves to
    pub target: u32,
}

impl PtrRaw {
    /// Resolve list entry `index` through the indirection table `ptr`, if it has rows
    #[must_use]
    pub fn resolve(tables: &TablesStream, ptr: TableId, index: u32) -> u32 {
        let table = tables.table(ptr);
        if table.is_empty() {
            return index;
        }

        table.row(index).map_or(0, |row| row[0])
    }
}
