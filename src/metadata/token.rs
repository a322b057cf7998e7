//! Metadata tokens.
//!
//! A token packs the table id in its top byte and the 1-based row index in the lower 24 bits,
//! e.g. `0x06000001` is the first row of the `MethodDef` table.

use std::fmt;

use crate::metadata::tables::TableId;

/// A metadata token identifying one row in one metadata table.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Token(pub u32);

impl Token {
    /// Create a token from its raw value
    #[must_use]
    pub fn new(value: u32) -> Self {
        Token(value)
    }

    /// Create a token for `row` of `table`
    #[must_use]
    pub fn from_parts(table: TableId, row: u32) -> Self {
        Token(((table as u32) << 24) | (row & 0x00FF_FFFF))
    }

    /// The raw token value
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }

    /// The table id byte
    #[must_use]
    pub fn table(&self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// The 1-based row index
    #[must_use]
    pub fn row(&self) -> u32 {
        self.0 & 0x00FF_FFFF
    }

    /// True for the null token
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

impl From<u32> for Token {
    fn from(value: u32) -> Self {
        Token(value)
    }
}

impl From<Token> for u32 {
    fn from(token: Token) -> Self {
        token.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Token(0x{:08x}, table: 0x{:02x}, row: {})",
            self.0,
            self.table(),
            self.row()
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}
