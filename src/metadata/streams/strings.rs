use std::{ffi::CStr, str};

use crate::Result;

/// The `#Strings` heap: null-terminated UTF-8 identifiers, indexed by byte offset.
///
/// # Examples
///
/// ```rust
/// use cilstrip::metadata::streams::Strings;
///
/// let heap = Strings::from(b"\0<Module>\0Foo\0")?;
/// assert_eq!(heap.get(1)?, "<Module>");
/// assert_eq!(heap.get(10)?, "Foo");
/// # Ok::<(), cilstrip::Error>(())
/// ```
pub struct Strings<'a> {
    data: &'a [u8],
}

impl<'a> Strings<'a> {
    /// Create a view over a `#Strings` heap.
    ///
    /// # Errors
    /// Returns a malformed error if the heap is empty or doesn't start with the empty string.
    pub fn from(data: &'a [u8]) -> Result<Strings<'a>> {
        if data.is_empty() || data[0] != 0 {
            return Err(malformed_error!("Provided #String heap is empty"));
        }

        Ok(Strings { data })
    }

    /// Get the string starting at `index`.
    ///
    /// # Errors
    /// Returns an error if `index` is out of range or the string is unterminated or not UTF-8.
    pub fn get(&self, index: usize) -> Result<&'a str> {
        if index >= self.data.len() {
            return Err(out_of_bounds_error!());
        }

        match CStr::from_bytes_until_nul(&self.data[index..]) {
            Ok(result) => match result.to_str() {
                Ok(result) => Ok(result),
                Err(_) => Err(malformed_error!("Invalid string at index - {}", index)),
            },
            Err(_) => Err(malformed_error!("Invalid string at index - {}", index)),
        }
    }
}
