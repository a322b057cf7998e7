//! The metadata tables stream.
//!
//! [`TablesStream`] decodes every table of an assembly into generic rows, driven by the column
//! layouts in [`TableId::columns`]. The typed row views in this module pick the columns the
//! module graph needs. Re-encoding goes through the same layouts, so a decoded stream that was
//! not modified encodes back to the identical bytes.

mod codedindex;
mod rows;
mod schema;
mod stream;
mod tableid;
mod tableinfo;

pub use codedindex::CodedIndexType;
pub use rows::{
    AssemblyRaw, AssemblyRefRaw, CustomAttributeRaw, EventMapRaw, EventRaw, ExportedTypeRaw,
    ManifestResourceRaw, MethodDefRaw, MethodSemanticsRaw, ModuleRaw, NestedClassRaw, ParamRaw,
    PropertyMapRaw, PropertyRaw, PtrRaw, RawRow, TypeDefRaw, TypeRefRaw,
};
pub use schema::Column;
pub use stream::{Table, TablesStream};
pub use tableid::{TableId, TABLE_SLOTS};
pub use tableinfo::{TableInfo, TableRowInfo, HEAP_LARGE_BLOB, HEAP_LARGE_GUID, HEAP_LARGE_STRINGS};
