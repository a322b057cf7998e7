use strum::IntoEnumIterator;

use crate::{
    file::io::{push_le, read_le_at, read_le_at_dyn},
    metadata::tables::{
        schema::Column,
        tableid::{TableId, TABLE_SLOTS},
        tableinfo::TableInfo,
    },
    Result,
};

/// `HeapSizes` bit announcing an extra 4 bytes after the row counts
const HEAP_EXTRA_DATA: u8 = 0x40;

/// The decoded rows of one metadata table.
///
/// Rows are stored as a flat list of column values; every value is widened to `u32`, whatever
/// its on-disk width. Row indices are 1-based, like in tokens.
#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    id: TableId,
    columns: usize,
    cells: Vec<u32>,
}

impl Table {
    fn new(id: TableId, rows: usize) -> Self {
        let columns = id.columns().len();
        Table {
            id,
            columns,
            cells: Vec::with_capacity(rows * columns),
        }
    }

    /// The id of this table
    #[must_use]
    pub fn id(&self) -> TableId {
        self.id
    }

    /// Number of rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len() / self.columns
    }

    /// True if the table has no rows
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Row count as stored in the stream header
    #[must_use]
    pub fn row_count(&self) -> u32 {
        u32::try_from(self.len()).unwrap_or(u32::MAX)
    }

    /// The column values of row `rid` (1-based)
    #[must_use]
    pub fn row(&self, rid: u32) -> Option<&[u32]> {
        let start = (rid as usize).checked_sub(1)? * self.columns;
        self.cells.get(start..start + self.columns)
    }

    /// Mutable access to the column values of row `rid` (1-based)
    pub fn row_mut(&mut self, rid: u32) -> Option<&mut [u32]> {
        let start = (rid as usize).checked_sub(1)? * self.columns;
        self.cells.get_mut(start..start + self.columns)
    }

    /// Iterate all rows in table order
    pub fn rows(&self) -> impl Iterator<Item = &[u32]> {
        self.cells.chunks_exact(self.columns)
    }

    /// Append a row. Missing trailing columns are filled with 0.
    pub fn push(&mut self, values: &[u32]) {
        let mut row = values.to_vec();
        row.resize(self.columns, 0);
        self.cells.extend_from_slice(&row);
    }

    /// Keep only the rows for which `keep(rid, row)` returns true
    pub fn retain_rows<F>(&mut self, mut keep: F)
    where
        F: FnMut(u32, &[u32]) -> bool,
    {
        let mut kept = Vec::with_capacity(self.cells.len());
        for (index, row) in self.cells.chunks_exact(self.columns).enumerate() {
            if keep(index as u32 + 1, row) {
                kept.extend_from_slice(row);
            }
        }
        self.cells = kept;
    }

    /// Stable sort of the rows by `key`
    pub fn sort_rows_by_key<K, F>(&mut self, mut key: F)
    where
        K: Ord,
        F: FnMut(&[u32]) -> K,
    {
        let mut rows: Vec<&[u32]> = self.cells.chunks_exact(self.columns).collect();
        rows.sort_by_key(|row| key(row));
        let sorted = rows.concat();
        self.cells = sorted;
    }
}

/// The `#~` (or uncompressed `#-`) tables stream, ECMA-335 II.24.2.6.
///
/// All tables are decoded eagerly. [`TablesStream::encode`] produces the on-disk layout again,
/// recomputing the index widths from the current row counts.
#[derive(Clone, Debug, PartialEq)]
pub struct TablesStream {
    /// Reserved, always 0
    pub reserved: u32,
    /// Major version of the table schema
    pub major_version: u8,
    /// Minor version of the table schema
    pub minor_version: u8,
    /// Width flags for the heap indices
    pub heap_sizes: u8,
    /// Reserved, always 1
    pub reserved_2: u8,
    /// Bit vector of present tables
    pub valid: u64,
    /// Bit vector of sorted tables
    pub sorted: u64,
    /// The undocumented extra 4 bytes announced by `HeapSizes & 0x40`
    pub extra_data: Option<u32>,
    tables: Vec<Table>,
}

impl TablesStream {
    /// Decode a complete tables stream.
    ///
    /// # Errors
    /// Returns an error if the header is truncated, announces unknown tables, or the rows don't
    /// fit into `data`.
    pub fn read(data: &[u8]) -> Result<TablesStream> {
        if data.len() < 24 {
            return Err(out_of_bounds_error!());
        }

        let mut offset = 0;
        let reserved = read_le_at::<u32>(data, &mut offset)?;
        let major_version = read_le_at::<u8>(data, &mut offset)?;
        let minor_version = read_le_at::<u8>(data, &mut offset)?;
        let heap_sizes = read_le_at::<u8>(data, &mut offset)?;
        let reserved_2 = read_le_at::<u8>(data, &mut offset)?;
        let valid = read_le_at::<u64>(data, &mut offset)?;
        let sorted = read_le_at::<u64>(data, &mut offset)?;

        if valid >> TABLE_SLOTS != 0 {
            return Err(malformed_error!(
                "Tables stream announces unsupported tables - {:#018x}",
                valid
            ));
        }

        let mut row_counts = [0u32; TABLE_SLOTS];
        for id in TableId::iter() {
            if valid & (1 << id as u64) != 0 {
                row_counts[id as usize] = read_le_at::<u32>(data, &mut offset)?;
            }
        }

        let extra_data = if heap_sizes & HEAP_EXTRA_DATA != 0 {
            Some(read_le_at::<u32>(data, &mut offset)?)
        } else {
            None
        };

        let info = TableInfo::new(&row_counts, heap_sizes);
        if info.rows_size() > data.len() - offset {
            return Err(malformed_error!(
                "Table rows need {} bytes, only {} available",
                info.rows_size(),
                data.len() - offset
            ));
        }

        let mut tables = Vec::with_capacity(TABLE_SLOTS);
        for id in TableId::iter() {
            let count = row_counts[id as usize] as usize;
            let mut table = Table::new(id, count);
            for _ in 0..count {
                for column in id.columns() {
                    let value = match info.column_size(*column) {
                        1 => u32::from(read_le_at::<u8>(data, &mut offset)?),
                        2 => read_le_at_dyn(data, &mut offset, false)?,
                        _ => read_le_at_dyn(data, &mut offset, true)?,
                    };
                    table.cells.push(value);
                }
            }
            tables.push(table);
        }

        Ok(TablesStream {
            reserved,
            major_version,
            minor_version,
            heap_sizes,
            reserved_2,
            valid,
            sorted,
            extra_data,
            tables,
        })
    }

    /// The table with `id`; absent tables are empty
    #[must_use]
    pub fn table(&self, id: TableId) -> &Table {
        &self.tables[id as usize]
    }

    /// Mutable access to the table with `id`
    pub fn table_mut(&mut self, id: TableId) -> &mut Table {
        &mut self.tables[id as usize]
    }

    /// Row count of `id`
    #[must_use]
    pub fn rows(&self, id: TableId) -> u32 {
        self.table(id).row_count()
    }

    /// Current row counts, indexed by table id
    #[must_use]
    pub fn row_counts(&self) -> [u32; TABLE_SLOTS] {
        let mut counts = [0u32; TABLE_SLOTS];
        for (count, table) in counts.iter_mut().zip(&self.tables) {
            *count = table.row_count();
        }
        counts
    }

    /// Column widths for the current row counts
    #[must_use]
    pub fn info(&self) -> TableInfo {
        TableInfo::new(&self.row_counts(), self.heap_sizes)
    }

    /// The `valid` vector matching the current contents: exactly the non-empty tables.
    #[must_use]
    pub fn valid_mask(&self) -> u64 {
        self.tables
            .iter()
            .filter(|table| !table.is_empty())
            .fold(0, |mask, table| mask | (1 << table.id as u64))
    }

    /// Encode the header and all rows again.
    ///
    /// # Errors
    /// Returns a malformed error if a value does not fit into its recomputed column width.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let info = self.info();
        let valid = self.valid_mask();

        let mut out = Vec::with_capacity(24 + TABLE_SLOTS * 4 + info.rows_size());
        push_le(&mut out, self.reserved);
        push_le(&mut out, self.major_version);
        push_le(&mut out, self.minor_version);
        push_le(&mut out, self.heap_sizes);
        push_le(&mut out, self.reserved_2);
        push_le(&mut out, valid);
        push_le(&mut out, self.sorted);

        for table in self.tables.iter().filter(|table| !table.is_empty()) {
            push_le(&mut out, table.row_count());
        }

        if let Some(extra_data) = self.extra_data {
            push_le(&mut out, extra_data);
        }

        for table in &self.tables {
            let columns = table.id.columns();
            for row in table.rows() {
                for (column, value) in columns.iter().zip(row) {
                    encode_value(&mut out, info.column_size(*column), *column, *value)?;
                }
            }
        }

        Ok(out)
    }
}

fn encode_value(out: &mut Vec<u8>, size: usize, column: Column, value: u32) -> Result<()> {
    match size {
        1 => match u8::try_from(value) {
            Ok(small) => push_le(out, small),
            Err(_) => return Err(malformed_error!("{} does not fit {:?}", value, column)),
        },
        2 => match u16::try_from(value) {
            Ok(small) => push_le(out, small),
            Err(_) => return Err(malformed_error!("{} does not fit {:?}", value, column)),
        },
        _ => push_le(out, value),
    }

    Ok(())
}
