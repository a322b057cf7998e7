//! In-memory PE image backing a loaded module.
//!
//! The whole input file is read into one owned buffer, which is then parsed by `goblin`. The
//! parsed PE borrows from that buffer, so both live together in a self-referencing [`File`].
//! Nothing is memory mapped: the buffer stays valid for the whole strip and write cycle.

pub mod io;
pub mod parser;

use std::path::Path;

use goblin::pe::{section_table::SectionTable, PE};
use ouroboros::self_referencing;

use crate::{
    Error::{Empty, GoblinErr},
    Result,
};

/// A complete PE image together with its parsed headers.
///
/// # Examples
///
/// ```rust,no_run
/// use cilstrip::File;
///
/// let file = File::from_file("tests/samples/Library.dll".as_ref())?;
/// let (clr_rva, clr_size) = file.clr()?;
/// let offset = file.rva_to_offset(clr_rva as usize)?;
/// println!("CLR header at file offset {offset:#x}, {clr_size} bytes");
/// # Ok::<(), cilstrip::Error>(())
/// ```
#[self_referencing]
pub struct File {
    data: Vec<u8>,
    #[borrows(data)]
    #[not_covariant]
    pe: PE<'this>,
}

impl File {
    /// Read a file from disk entirely into memory and parse it.
    ///
    /// # Errors
    /// Returns an I/O error if the file can't be read, or a parser error if it is not a PE
    /// image carrying a CLR runtime header.
    pub fn from_file(file: &Path) -> Result<File> {
        let data = std::fs::read(file)?;
        Self::from_mem(data)
    }

    /// Parse an image that already lives in memory.
    ///
    /// # Errors
    /// Returns [`crate::Error::Empty`] on empty input, [`crate::Error::GoblinErr`] if the PE
    /// headers are broken and a malformed error if the CLR runtime header is missing.
    pub fn from_mem(data: Vec<u8>) -> Result<File> {
        if data.is_empty() {
            return Err(Empty);
        }

        File::try_new(data, |data| match PE::parse(data) {
            Ok(pe) => match pe.header.optional_header {
                Some(optional_header) => {
                    if optional_header
                        .data_directories
                        .get_clr_runtime_header()
                        .is_none()
                    {
                        Err(malformed_error!(
                            "File does not have a CLR runtime header directory"
                        ))
                    } else {
                        Ok(pe)
                    }
                }
                None => Err(malformed_error!("File does not have an OptionalHeader")),
            },
            Err(error) => Err(GoblinErr(error)),
        })
    }

    /// Size of the image in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.data().len()
    }

    /// True for an empty image (cannot happen after a successful load)
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The raw bytes of the image
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.borrow_data()
    }

    /// Bounds checked sub-slice of the image.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the range leaves the image.
    pub fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        let data = self.data();
        match offset.checked_add(len) {
            Some(end) if end <= data.len() => Ok(&data[offset..end]),
            _ => Err(out_of_bounds_error!()),
        }
    }

    /// RVA and size of the CLR runtime header directory.
    ///
    /// # Errors
    /// Returns a malformed error if the directory is absent or empty.
    pub fn clr(&self) -> Result<(u32, u32)> {
        let directory = self.with_pe(|pe| {
            pe.header.optional_header.and_then(|optional_header| {
                optional_header
                    .data_directories
                    .get_clr_runtime_header()
                    .map(|clr_dir| (clr_dir.virtual_address, clr_dir.size))
            })
        });

        match directory {
            Some((rva, size)) if rva != 0 && size != 0 => Ok((rva, size)),
            _ => Err(malformed_error!("CLR runtime header directory is empty")),
        }
    }

    /// The section table of the image
    pub fn sections(&self) -> impl Iterator<Item = &SectionTable> {
        self.with_pe(|pe| pe.sections.iter())
    }

    /// Convert a relative virtual address into a file offset.
    ///
    /// # Errors
    /// Returns a malformed error if no section covers `rva`.
    pub fn rva_to_offset(&self, rva: usize) -> Result<usize> {
        let Ok(rva_u32) = u32::try_from(rva) else {
            return Err(malformed_error!("RVA too large to fit in u32: {}", rva));
        };

        for section in self.sections() {
            let span = section.virtual_size.max(section.size_of_raw_data);
            let Some(section_max) = section.virtual_address.checked_add(span) else {
                return Err(malformed_error!(
                    "Section malformed, causing integer overflow - {} + {}",
                    section.virtual_address,
                    span
                ));
            };

            if section.virtual_address <= rva_u32 && rva_u32 < section_max {
                return Ok((rva - section.virtual_address as usize)
                    + section.pointer_to_raw_data as usize);
            }
        }

        Err(malformed_error!(
            "RVA could not be converted to offset - {}",
            rva
        ))
    }
}
