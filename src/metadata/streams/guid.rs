use crate::Result;

/// The `#GUID` heap: a sequence of 16 byte GUIDs, indexed from 1.
pub struct Guid<'a> {
    data: &'a [u8],
}

impl<'a> Guid<'a> {
    /// Create a view over a `#GUID` heap.
    ///
    /// # Errors
    /// Returns a malformed error if the heap can't hold a single GUID.
    pub fn from(data: &'a [u8]) -> Result<Guid<'a>> {
        if data.len() < 16 {
            return Err(malformed_error!("Data for #Guid heap is too small"));
        }

        Ok(Guid { data })
    }

    /// Get the GUID with the 1-based `index`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] for index 0 or an index past the heap.
    pub fn get(&self, index: usize) -> Result<uguid::Guid> {
        if index < 1 || index * 16 > self.data.len() {
            return Err(out_of_bounds_error!());
        }

        let start = (index - 1) * 16;
        let mut buffer = [0u8; 16];
        buffer.copy_from_slice(&self.data[start..start + 16]);

        Ok(uguid::Guid::from_bytes(buffer))
    }
}
