//! Little-endian primitive access on raw byte buffers.
//!
//! All metadata structures of a .NET image are stored little-endian. The helpers in here read
//! and write fixed size primitives at explicit offsets, advancing the offset, and return
//! [`crate::Error::OutOfBounds`] instead of panicking on short buffers.
//!
//! # Examples
//!
//! ```rust,ignore
//! use crate::file::io::{read_le_at, read_le_at_dyn};
//!
//! let data = [0x01, 0x00, 0x02, 0x00, 0x00, 0x00];
//! let mut offset = 0;
//! assert_eq!(read_le_at::<u16>(&data, &mut offset)?, 1);
//! assert_eq!(read_le_at_dyn(&data, &mut offset, true)?, 2);
//! ```

use crate::Result;

/// Conversion between a primitive and its little-endian byte representation.
pub trait CilIO: Sized + Copy {
    /// Byte array type for this numeric type
    type Bytes: AsRef<[u8]> + for<'a> TryFrom<&'a [u8]>;

    /// Read T from a byte buffer in little-endian
    fn from_le_bytes(bytes: Self::Bytes) -> Self;

    /// Write T to a byte buffer in little-endian
    fn to_le_bytes(self) -> Self::Bytes;
}

macro_rules! impl_cilio {
    ($($ty:ty),*) => {
        $(
            impl CilIO for $ty {
                type Bytes = [u8; std::mem::size_of::<$ty>()];

                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_le_bytes(bytes)
                }

                fn to_le_bytes(self) -> Self::Bytes {
                    <$ty>::to_le_bytes(self)
                }
            }
        )*
    };
}

impl_cilio!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

/// Reads a `T` from the start of `data`.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if `data` is too short.
pub fn read_le<T: CilIO>(data: &[u8]) -> Result<T> {
    let mut offset = 0_usize;
    read_le_at(data, &mut offset)
}

/// Reads a `T` at `offset` and advances the offset past it.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if `data` is too short.
pub fn read_le_at<T: CilIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let type_len = std::mem::size_of::<T>();
    let Some(end) = offset.checked_add(type_len) else {
        return Err(out_of_bounds_error!());
    };
    if end > data.len() {
        return Err(out_of_bounds_error!());
    }

    let Ok(read) = data[*offset..end].try_into() else {
        return Err(out_of_bounds_error!());
    };

    *offset = end;
    Ok(T::from_le_bytes(read))
}

/// Reads either a 2-byte or a 4-byte value, depending on `is_large`.
///
/// Metadata table columns that index into heaps or other tables use this variable width.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if `data` is too short.
pub fn read_le_at_dyn(data: &[u8], offset: &mut usize, is_large: bool) -> Result<u32> {
    let res = if is_large {
        read_le_at::<u32>(data, offset)?
    } else {
        u32::from(read_le_at::<u16>(data, offset)?)
    };

    Ok(res)
}

/// Writes `value` at `offset` and advances the offset past it.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if `data` is too short.
pub fn write_le_at<T: CilIO>(data: &mut [u8], offset: &mut usize, value: T) -> Result<()> {
    let bytes = value.to_le_bytes();
    let bytes = bytes.as_ref();
    let Some(end) = offset.checked_add(bytes.len()) else {
        return Err(out_of_bounds_error!());
    };
    if end > data.len() {
        return Err(out_of_bounds_error!());
    }

    data[*offset..end].copy_from_slice(bytes);
    *offset = end;
    Ok(())
}

/// Appends `value` in little-endian to `out`.
pub fn push_le<T: CilIO>(out: &mut Vec<u8>, value: T) {
    out.extend_from_slice(value.to_le_bytes().as_ref());
}
