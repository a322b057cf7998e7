//! Metadata heaps and stream headers, ECMA-335 II.24.2.
//!
//! The heaps are thin borrowing views over the image bytes. The tables stream lives in
//! [`crate::metadata::tables`].

mod blob;
mod guid;
mod streamheader;
mod strings;

pub use blob::Blob;
pub use guid::Guid;
pub use streamheader::{StreamHeader, VALID_STREAM_NAMES};
pub use strings::Strings;
