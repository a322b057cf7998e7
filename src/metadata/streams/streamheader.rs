use crate::{
    file::io::{read_le, read_le_at},
    Result,
};

/// Names of the streams a metadata root may announce
pub const VALID_STREAM_NAMES: [&str; 6] = ["#Strings", "#US", "#Blob", "#GUID", "#~", "#-"];

/// A stream header of the metadata root, II.24.2.2
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamHeader {
    /// Offset relative to the metadata root
    pub offset: u32,
    /// Size of the stream in bytes, a multiple of 4
    pub size: u32,
    /// Name of the stream, e.g. `#~`
    pub name: String,
}

impl StreamHeader {
    /// Parse one stream header.
    ///
    /// # Errors
    /// Returns an error on truncated data or a stream name that is unterminated, too long or
    /// unknown.
    pub fn from(data: &[u8]) -> Result<StreamHeader> {
        if data.len() < 9 {
            return Err(out_of_bounds_error!());
        }

        let offset = read_le::<u32>(data)?;
        let size = read_le_at::<u32>(data, &mut 4)?;

        let mut name = String::with_capacity(32);
        let mut terminated = false;
        for &byte in data[8..].iter().take(32) {
            if byte == 0 {
                terminated = true;
                break;
            }
            name.push(char::from(byte));
        }

        if !terminated {
            return Err(malformed_error!("Stream name is not terminated"));
        }

        if !VALID_STREAM_NAMES.contains(&name.as_str()) {
            return Err(malformed_error!("Invalid stream header name - {}", name));
        }

        Ok(StreamHeader { offset, size, name })
    }

    /// Bytes this header occupies in the root, including the padded name
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        8 + (((self.name.len() + 1) + 3) & !3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crafted() {
        #[rustfmt::skip]
        let header_bytes = [
            0x6C, 0x00, 0x00, 0x00,
            0x08, 0x02, 0x00, 0x00,
            0x23, 0x7E, 0x00, 0x00,
        ];

        let header = StreamHeader::from(&header_bytes).unwrap();
        assert_eq!(header.offset, 0x6C);
        assert_eq!(header.size, 0x208);
        assert_eq!(header.name, "#~");
        assert_eq!(header.encoded_len(), 12);
    }

    #[test]
    fn unknown_name() {
        let header_bytes = [0, 0, 0, 0, 0, 0, 0, 0, b'#', b'X', 0, 0];
        assert!(StreamHeader::from(&header_bytes).is_err());
    }
}
