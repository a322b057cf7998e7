//! Sequential cursor over a byte slice.

use crate::{
    file::io::{read_le_at, CilIO},
    Result,
};

/// A bounds-checked cursor used to decode method bodies, instructions and blobs.
///
/// # Examples
///
/// ```rust,ignore
/// let mut parser = Parser::new(&[0x02, 0x2A]);
/// assert_eq!(parser.read_le::<u8>()?, 0x02);
/// assert!(parser.has_more_data());
/// ```
pub struct Parser<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> Parser<'a> {
    /// Create a new parser starting at offset 0.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Parser { data, position: 0 }
    }

    /// Total length of the underlying data
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True if the underlying data is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// True while the cursor has not reached the end
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.position < self.data.len()
    }

    /// Bytes left after the cursor
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Current cursor position
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// Move the cursor to an absolute position. Seeking to the very end is allowed.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `pos` lies beyond the data.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(out_of_bounds_error!());
        }

        self.position = pos;
        Ok(())
    }

    /// Move the cursor forward by `step` bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if that would leave the data.
    pub fn advance_by(&mut self, step: usize) -> Result<()> {
        match self.position.checked_add(step) {
            Some(target) => self.seek(target),
            None => Err(out_of_bounds_error!()),
        }
    }

    /// Align the cursor to the next multiple of `alignment`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the padding runs past the end.
    pub fn align(&mut self, alignment: usize) -> Result<()> {
        let padding = (alignment - (self.position % alignment)) % alignment;
        self.advance_by(padding)
    }

    /// Read a little-endian `T` and advance past it.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if not enough data is left.
    pub fn read_le<T: CilIO>(&mut self) -> Result<T> {
        read_le_at::<T>(self.data, &mut self.position)
    }

    /// Read `length` raw bytes and advance past them.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if not enough data is left.
    pub fn read_bytes(&mut self, length: usize) -> Result<&'a [u8]> {
        let Some(end) = self.position.checked_add(length) else {
            return Err(out_of_bounds_error!());
        };
        if end > self.data.len() {
            return Err(out_of_bounds_error!());
        }

        let bytes = &self.data[self.position..end];
        self.position = end;
        Ok(bytes)
    }

    /// Read an ECMA-335 II.23.2 compressed unsigned integer.
    ///
    /// # Errors
    /// Returns an error on truncated data or an invalid leading byte.
    pub fn read_compressed_uint(&mut self) -> Result<u32> {
        let first_byte = self.read_le::<u8>()?;

        // 1-byte encoding: 0xxxxxxx
        if (first_byte & 0x80) == 0 {
            return Ok(u32::from(first_byte));
        }

        // 2-byte encoding: 10xxxxxx xxxxxxxx
        if (first_byte & 0xC0) == 0x80 {
            let second_byte = self.read_le::<u8>()?;
            return Ok(((u32::from(first_byte) & 0x3F) << 8) | u32::from(second_byte));
        }

        // 4-byte encoding: 110xxxxx xxxxxxxx xxxxxxxx xxxxxxxx
        if (first_byte & 0xE0) == 0xC0 {
            let b1 = u32::from(self.read_le::<u8>()?);
            let b2 = u32::from(self.read_le::<u8>()?);
            let b3 = u32::from(self.read_le::<u8>()?);
            return Ok(((u32::from(first_byte) & 0x1F) << 24) | (b1 << 16) | (b2 << 8) | b3);
        }

        Err(malformed_error!("Invalid compressed uint - {}", first_byte))
    }
}
