//! The metadata root (ECMA-335 II.24.2.1) and its stream directory.

use crate::{
    file::io::{read_le, read_le_at},
    metadata::streams::StreamHeader,
    Result,
};

/// Magic signature of the metadata root, `BSJB`
pub const CIL_HEADER_MAGIC: u32 = 0x424A_5342;

/// The metadata root header
#[derive(Debug, Clone)]
pub struct Root {
    /// Magic signature, always [`CIL_HEADER_MAGIC`]
    pub signature: u32,
    /// Major version
    pub major_version: u16,
    /// Minor version
    pub minor_version: u16,
    /// Length of the padded version string
    pub length: u32,
    /// Runtime version string, e.g. `v4.0.30319`
    pub version: String,
    /// Reserved, always 0
    pub flags: u16,
    /// The stream headers, in on-disk order
    pub stream_headers: Vec<StreamHeader>,
}

impl Root {
    /// Parse the metadata root. `data` spans the complete metadata directory.
    ///
    /// # Errors
    /// Returns an error if the magic doesn't match, or if any stream header or stream range is
    /// invalid.
    pub fn read(data: &[u8]) -> Result<Root> {
        if data.len() < 20 {
            return Err(out_of_bounds_error!());
        }

        let signature = read_le::<u32>(data)?;
        if signature != CIL_HEADER_MAGIC {
            return Err(malformed_error!(
                "CIL_HEADER_MAGIC does not match - {}",
                signature
            ));
        }

        let major_version = read_le_at::<u16>(data, &mut 4)?;
        let minor_version = read_le_at::<u16>(data, &mut 6)?;

        let length = read_le_at::<u32>(data, &mut 12)?;
        let version_end = 16_usize
            .checked_add(length as usize)
            .filter(|end| end + 4 <= data.len())
            .ok_or_else(|| out_of_bounds_error!())?;

        let version: String = data[16..version_end]
            .iter()
            .take_while(|&&byte| byte != 0)
            .map(|&byte| char::from(byte))
            .collect();

        let mut offset = version_end;
        let flags = read_le_at::<u16>(data, &mut offset)?;
        let stream_count = read_le_at::<u16>(data, &mut offset)?;
        if stream_count == 0 || stream_count as usize * 9 > data.len() {
            return Err(malformed_error!("Invalid stream count - {}", stream_count));
        }

        let mut stream_headers: Vec<StreamHeader> = Vec::with_capacity(stream_count as usize);
        for _ in 0..stream_count {
            if offset > data.len() {
                return Err(out_of_bounds_error!());
            }

            let header = StreamHeader::from(&data[offset..])?;
            match u32::checked_add(header.offset, header.size) {
                Some(range) if range as usize <= data.len() => {}
                Some(_) => return Err(out_of_bounds_error!()),
                None => {
                    return Err(malformed_error!(
                        "Stream offset and size cause integer overflow - {} + {}",
                        header.offset,
                        header.size
                    ))
                }
            }

            if stream_headers.iter().any(|known| known.name == header.name) {
                return Err(malformed_error!("Duplicate stream - {}", header.name));
            }

            offset += header.encoded_len();
            stream_headers.push(header);
        }

        Ok(Root {
            signature,
            major_version,
            minor_version,
            length,
            version,
            flags,
            stream_headers,
        })
    }

    /// Look up a stream header by name
    #[must_use]
    pub fn stream(&self, name: &str) -> Option<&StreamHeader> {
        self.stream_headers.iter().find(|header| header.name == name)
    }
}
