//! The CLR 2.0 runtime header (ECMA-335 II.25.3.3).
//!
//! Located through the 15th PE data directory, it points to the metadata root, the managed
//! resources blob and the strong name signature.

use crate::{file::parser::Parser, Result};

/// Byte offset of the `Resources` directory inside the header
pub const COR20_RESOURCES_OFFSET: usize = 24;

/// Size of the header structure in bytes
pub const COR20_HEADER_SIZE: usize = 72;

/// The CLI header of a .NET image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cor20Header {
    /// Size of header in bytes
    pub cb: u32,
    /// Minimum major runtime version
    pub major_runtime_version: u16,
    /// Minor part of the runtime version
    pub minor_runtime_version: u16,
    /// RVA of the metadata root
    pub meta_data_rva: u32,
    /// Size of the metadata
    pub meta_data_size: u32,
    /// Runtime flags (`COMIMAGE_FLAGS_*`)
    pub flags: u32,
    /// Token of the entry point method, 0 for libraries
    pub entry_point_token: u32,
    /// RVA of the managed resources blob
    pub resource_rva: u32,
    /// Size of the managed resources blob
    pub resource_size: u32,
    /// RVA of the strong name signature
    pub strong_name_signature_rva: u32,
    /// Size of the strong name signature
    pub strong_name_signature_size: u32,
    /// RVA of the vtable fixups
    pub vtable_fixups_rva: u32,
    /// Size of the vtable fixups
    pub vtable_fixups_size: u32,
    /// RVA of the ReadyToRun / managed native header
    pub managed_native_header_rva: u32,
    /// Size of the managed native header
    pub managed_native_header_size: u32,
}

impl Cor20Header {
    /// Parse the header from the start of `data`.
    ///
    /// # Errors
    /// Returns an error on truncated data, a bad size field or an empty metadata directory.
    pub fn read(data: &[u8]) -> Result<Cor20Header> {
        if data.len() < COR20_HEADER_SIZE {
            return Err(out_of_bounds_error!());
        }

        let mut parser = Parser::new(data);

        let cb = parser.read_le::<u32>()?;
        if (cb as usize) < COR20_HEADER_SIZE {
            return Err(malformed_error!(
                "Invalid CLR header size: expected 72, got {}",
                cb
            ));
        }

        let major_runtime_version = parser.read_le::<u16>()?;
        let minor_runtime_version = parser.read_le::<u16>()?;

        let meta_data_rva = parser.read_le::<u32>()?;
        let meta_data_size = parser.read_le::<u32>()?;
        if meta_data_rva == 0 || meta_data_size == 0 {
            return Err(malformed_error!("Metadata directory cannot be empty"));
        }

        let flags = parser.read_le::<u32>()?;
        let entry_point_token = parser.read_le::<u32>()?;

        let resource_rva = parser.read_le::<u32>()?;
        let resource_size = parser.read_le::<u32>()?;
        if (resource_rva == 0) != (resource_size == 0) {
            return Err(malformed_error!("Resource values are invalid"));
        }

        let strong_name_signature_rva = parser.read_le::<u32>()?;
        let strong_name_signature_size = parser.read_le::<u32>()?;

        // Code manager table, reserved
        parser.advance_by(8)?;

        let vtable_fixups_rva = parser.read_le::<u32>()?;
        let vtable_fixups_size = parser.read_le::<u32>()?;

        // Export address table jumps, reserved
        parser.advance_by(8)?;

        let managed_native_header_rva = parser.read_le::<u32>()?;
        let managed_native_header_size = parser.read_le::<u32>()?;

        Ok(Cor20Header {
            cb,
            major_runtime_version,
            minor_runtime_version,
            meta_data_rva,
            meta_data_size,
            flags,
            entry_point_token,
            resource_rva,
            resource_size,
            strong_name_signature_rva,
            strong_name_signature_size,
            vtable_fixups_rva,
            vtable_fixups_size,
            managed_native_header_rva,
            managed_native_header_size,
        })
    }
}
