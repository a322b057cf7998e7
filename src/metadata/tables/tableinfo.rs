use strum::IntoEnumIterator;

use crate::metadata::tables::{
    codedindex::CodedIndexType,
    schema::Column,
    tableid::{TableId, TABLE_SLOTS},
};

/// `HeapSizes` bit selecting 4-byte `#Strings` indices
pub const HEAP_LARGE_STRINGS: u8 = 0x01;
/// `HeapSizes` bit selecting 4-byte `#GUID` indices
pub const HEAP_LARGE_GUID: u8 = 0x02;
/// `HeapSizes` bit selecting 4-byte `#Blob` indices
pub const HEAP_LARGE_BLOB: u8 = 0x04;

/// Row count and index width of one table
#[derive(Clone, Copy, Default, PartialEq, Debug)]
pub struct TableRowInfo {
    /// Number of rows
    pub rows: u32,
    /// Bits needed to store the largest row index
    pub bits: u8,
    /// True if simple indices into this table are 4 bytes wide
    pub is_large: bool,
}

impl TableRowInfo {
    /// Compute the index width for a table with `rows` rows
    #[must_use]
    pub fn new(rows: u32) -> Self {
        let bits = if rows == 0 {
            1
        } else {
            (32 - rows.leading_zeros()) as u8
        };

        Self {
            rows,
            bits,
            is_large: rows > u32::from(u16::MAX),
        }
    }
}

/// Column widths of a tables stream, derived from the row counts and the heap size flags.
#[derive(Clone, Debug, PartialEq)]
pub struct TableInfo {
    rows: [TableRowInfo; TABLE_SLOTS],
    is_large_index_str: bool,
    is_large_index_guid: bool,
    is_large_index_blob: bool,
}

impl TableInfo {
    /// Create the width information for the given row counts (indexed by table id)
    #[must_use]
    pub fn new(row_counts: &[u32; TABLE_SLOTS], heap_sizes: u8) -> Self {
        let mut rows = [TableRowInfo::default(); TABLE_SLOTS];
        for (info, count) in rows.iter_mut().zip(row_counts) {
            *info = TableRowInfo::new(*count);
        }

        TableInfo {
            rows,
            is_large_index_str: heap_sizes & HEAP_LARGE_STRINGS != 0,
            is_large_index_guid: heap_sizes & HEAP_LARGE_GUID != 0,
            is_large_index_blob: heap_sizes & HEAP_LARGE_BLOB != 0,
        }
    }

    /// Row count of `id`
    #[must_use]
    pub fn rows(&self, id: TableId) -> u32 {
        self.rows[id as usize].rows
    }

    /// True if simple indices into `id` are 4 bytes wide
    #[must_use]
    pub fn is_large(&self, id: TableId) -> bool {
        self.rows[id as usize].is_large
    }

    /// True if a coded index of this kind needs 4 bytes
    #[must_use]
    pub fn is_large_coded(&self, kind: CodedIndexType) -> bool {
        let max_bits = kind
            .tables()
            .iter()
            .flatten()
            .map(|table| self.rows[*table as usize].bits)
            .max()
            .unwrap_or(1);

        max_bits + kind.tag_bits() > 16
    }

    /// Byte width of one column
    #[must_use]
    pub fn column_size(&self, column: Column) -> usize {
        let is_large = match column {
            Column::Fixed(size) => return size as usize,
            Column::Str => self.is_large_index_str,
            Column::Guid => self.is_large_index_guid,
            Column::Blob => self.is_large_index_blob,
            Column::Index(table) => self.is_large(table),
            Column::Coded(kind) => self.is_large_coded(kind),
        };

        if is_large {
            4
        } else {
            2
        }
    }

    /// Byte width of one row of `id`
    #[must_use]
    pub fn row_size(&self, id: TableId) -> usize {
        id.columns()
            .iter()
            .map(|column| self.column_size(*column))
            .sum()
    }

    /// Total size of all rows of all tables
    #[must_use]
    pub fn rows_size(&self) -> usize {
        TableId::iter()
            .map(|id| self.rows(id) as usize * self.row_size(id))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info_with(tables: &[(TableId, u32)], heap_sizes: u8) -> TableInfo {
        let mut counts = [0u32; TABLE_SLOTS];
        for (id, rows) in tables {
            counts[*id as usize] = *rows;
        }
        TableInfo::new(&counts, heap_sizes)
    }

    #[test]
    fn small_tables() {
        let info = info_with(&[(TableId::TypeDef, 10), (TableId::MethodDef, 20)], 0);

        // Flags u32, Name, Namespace, Extends, FieldList, MethodList
        assert_eq!(info.row_size(TableId::TypeDef), 4 + 2 + 2 + 2 + 2 + 2);
        // RVA u32, ImplFlags u16, Flags u16, Name, Signature, ParamList
        assert_eq!(info.row_size(TableId::MethodDef), 4 + 2 + 2 + 2 + 2 + 2);
        assert!(!info.is_large_coded(CodedIndexType::HasCustomAttribute));
    }

    #[test]
    fn large_heaps() {
        let info = info_with(&[], HEAP_LARGE_STRINGS | HEAP_LARGE_BLOB);
        assert_eq!(info.column_size(Column::Str), 4);
        assert_eq!(info.column_size(Column::Blob), 4);
        assert_eq!(info.column_size(Column::Guid), 2);
    }

    #[test]
    fn coded_index_threshold() {
        // 5 tag bits leave 11 bits, so 2047 rows still fit into 2 bytes
        let info = info_with(&[(TableId::MethodDef, 2047)], 0);
        assert!(!info.is_large_coded(CodedIndexType::HasCustomAttribute));

        let info = info_with(&[(TableId::MethodDef, 2048)], 0);
        assert!(info.is_large_coded(CodedIndexType::HasCustomAttribute));
        assert!(!info.is_large(TableId::MethodDef));

        let info = info_with(&[(TableId::MethodDef, 0x1_0000)], 0);
        assert!(info.is_large(TableId::MethodDef));
    }
}
