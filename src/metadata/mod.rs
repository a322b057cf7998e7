//! Metadata parsing and re-encoding for .NET assemblies.
//!
//! This module holds the ECMA-335 parsing layer the module graph is built on:
//!
//! - [`cor20header`] - the CLI header located through the PE data directories
//! - [`root`] - the metadata root and its stream directory
//! - [`streams`] - the `#Strings`, `#Blob` and `#GUID` heaps
//! - [`tables`] - the tables stream, decoded into generic rows and encoded back
//! - [`method`] - IL method bodies, exception clauses and instructions
//! - [`token`] - metadata tokens
//!
//! [`Metadata`] ties them together for one image: it locates every structure once and keeps
//! the file offsets the writer needs to patch the image in place.
//!
//! # Examples
//!
//! ```rust,no_run
//! use cilstrip::{metadata::{tables::TableId, Metadata}, File};
//!
//! let file = File::from_file("tests/samples/Library.dll".as_ref())?;
//! let metadata = Metadata::read(&file)?;
//! println!("runtime {}", metadata.root.version);
//! println!("{} methods", metadata.tables.rows(TableId::MethodDef));
//! # Ok::<(), cilstrip::Error>(())
//! ```

/// Implementation of the Header of CIL
pub mod cor20header;
/// Implementation of the IL method bodies
pub mod method;
/// Implementation of the root metadata structure
pub mod root;
/// Implementation of the metadata heaps and stream headers
pub mod streams;
/// Implementation of the .NET metadata tables
pub mod tables;
/// Commonly used metadata token type
pub mod token;

use crate::{
    file::File,
    metadata::{
        cor20header::{Cor20Header, COR20_HEADER_SIZE},
        root::Root,
        streams::{Blob, Guid, Strings},
        tables::TablesStream,
    },
    Result,
};

/// A byte range inside the image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamRange {
    /// Absolute file offset
    pub offset: usize,
    /// Size in bytes
    pub size: usize,
}

impl StreamRange {
    /// The slice of `data` covered by this range
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the range leaves `data`.
    pub fn slice<'a>(&self, data: &'a [u8]) -> Result<&'a [u8]> {
        match self.offset.checked_add(self.size) {
            Some(end) if end <= data.len() => Ok(&data[self.offset..end]),
            _ => Err(out_of_bounds_error!()),
        }
    }
}

/// The located and decoded metadata of one image
#[derive(Debug, Clone)]
pub struct Metadata {
    /// The CLI header
    pub cor20: Cor20Header,
    /// File offset of the CLI header
    pub cor20_offset: usize,
    /// The metadata root
    pub root: Root,
    /// File offset of the metadata root
    pub root_offset: usize,
    /// All metadata tables
    pub tables: TablesStream,
    /// Location of the tables stream
    pub tables_range: StreamRange,
    /// Location of the managed resources blob, if any
    pub resources_range: Option<StreamRange>,
    strings: Option<StreamRange>,
    blob: Option<StreamRange>,
    guid: Option<StreamRange>,
}

impl Metadata {
    /// Locate and decode the metadata of `file`.
    ///
    /// # Errors
    /// Returns an error if the CLI header, the metadata root or the tables stream is missing
    /// or damaged.
    pub fn read(file: &File) -> Result<Metadata> {
        let (clr_rva, clr_size) = file.clr()?;
        if (clr_size as usize) < COR20_HEADER_SIZE {
            return Err(malformed_error!("CLR header directory too small - {}", clr_size));
        }

        let cor20_offset = file.rva_to_offset(clr_rva as usize)?;
        let cor20 = Cor20Header::read(file.data_slice(cor20_offset, COR20_HEADER_SIZE)?)?;

        let root_offset = file.rva_to_offset(cor20.meta_data_rva as usize)?;
        let root_data = file.data_slice(root_offset, cor20.meta_data_size as usize)?;
        let root = Root::read(root_data)?;

        let range = |name: &str| {
            root.stream(name).map(|header| StreamRange {
                offset: root_offset + header.offset as usize,
                size: header.size as usize,
            })
        };

        let Some(tables_range) = range("#~").or_else(|| range("#-")) else {
            return Err(malformed_error!("Metadata has no tables stream"));
        };
        let tables = TablesStream::read(tables_range.slice(file.data())?)?;

        let resources_range = if cor20.resource_rva == 0 {
            None
        } else {
            Some(StreamRange {
                offset: file.rva_to_offset(cor20.resource_rva as usize)?,
                size: cor20.resource_size as usize,
            })
        };
        if let Some(resources) = resources_range {
            resources.slice(file.data())?;
        }

        Ok(Metadata {
            cor20,
            cor20_offset,
            tables_range,
            resources_range,
            strings: range("#Strings"),
            blob: range("#Blob"),
            guid: range("#GUID"),
            root,
            root_offset,
            tables,
        })
    }

    /// The `#Strings` heap of `data`, the image this metadata was read from
    ///
    /// # Errors
    /// Returns a malformed error if the image has no valid `#Strings` heap.
    pub fn strings<'a>(&self, data: &'a [u8]) -> Result<Strings<'a>> {
        match self.strings {
            Some(range) => Strings::from(range.slice(data)?),
            None => Err(malformed_error!("Metadata has no #Strings heap")),
        }
    }

    /// The `#Blob` heap of `data`
    ///
    /// # Errors
    /// Returns a malformed error if the image has no valid `#Blob` heap.
    pub fn blob<'a>(&self, data: &'a [u8]) -> Result<Blob<'a>> {
        match self.blob {
            Some(range) => Blob::from(range.slice(data)?),
            None => Err(malformed_error!("Metadata has no #Blob heap")),
        }
    }

    /// The `#GUID` heap of `data`, `None` if the image has none
    ///
    /// # Errors
    /// Returns an error if the heap exists but is damaged.
    pub fn guid<'a>(&self, data: &'a [u8]) -> Result<Option<Guid<'a>>> {
        match self.guid {
            Some(range) => Ok(Some(Guid::from(range.slice(data)?)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{metadata::tables::TableId, test::builder::AssemblyBuilder};

    #[test]
    fn locate_everything() {
        let image = AssemblyBuilder::new("Sample")
            .class("Sample", "Widget", |class| class.method("Run", true))
            .resource("Sample.Data.bin", b"payload")
            .build();
        let file = File::from_mem(image).unwrap();
        let metadata = Metadata::read(&file).unwrap();

        assert_eq!(metadata.cor20_offset, 0x200);
        assert_eq!(metadata.root.version, "v4.0.30319");
        assert_eq!(metadata.tables.rows(TableId::TypeDef), 2);
        assert_eq!(metadata.tables.rows(TableId::MethodDef), 1);
        assert_eq!(metadata.tables.rows(TableId::ManifestResource), 1);
        assert!(metadata.resources_range.is_some());

        let strings = metadata.strings(file.data()).unwrap();
        assert_eq!(strings.get(1).unwrap(), "Sample.dll");
        assert!(metadata.blob(file.data()).is_ok());
        assert!(metadata.guid(file.data()).unwrap().is_some());
    }

    #[test]
    fn range_bounds() {
        let range = StreamRange { offset: 2, size: 3 };
        assert_eq!(range.slice(&[0, 1, 2, 3, 4]).unwrap(), &[2, 3, 4]);
        assert!(range.slice(&[0, 1, 2, 3]).is_err());
    }
}
