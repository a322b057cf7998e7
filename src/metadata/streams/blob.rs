use crate::{file::parser::Parser, Result};

/// The `#Blob` heap: length-prefixed byte sequences such as signatures.
pub struct Blob<'a> {
    data: &'a [u8],
}

impl<'a> Blob<'a> {
    /// Create a view over a `#Blob` heap.
    ///
    /// # Errors
    /// Returns a malformed error if the heap is empty or doesn't start with the empty blob.
    pub fn from(data: &'a [u8]) -> Result<Blob<'a>> {
        if data.is_empty() || data[0] != 0 {
            return Err(malformed_error!("Provided #Blob heap is empty"));
        }

        Ok(Blob { data })
    }

    /// Get the blob starting at `index`, without its length prefix.
    ///
    /// # Errors
    /// Returns an error if `index` or the encoded length run past the heap.
    pub fn get(&self, index: usize) -> Result<&'a [u8]> {
        if index >= self.data.len() {
            return Err(out_of_bounds_error!());
        }

        let mut parser = Parser::new(&self.data[index..]);
        let len = parser.read_compressed_uint()? as usize;
        parser.read_bytes(len)
    }
}
