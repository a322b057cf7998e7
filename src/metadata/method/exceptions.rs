use bitflags::bitflags;

bitflags! {
    /// Kind of an exception handling clause
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ExceptionHandlerFlags: u16 {
        /// A typed exception clause
        const EXCEPTION = 0x0000;
        /// An exception filter and handler clause
        const FILTER = 0x0001;
        /// A finally clause
        const FINALLY = 0x0002;
        /// Fault clause (finally that is called on exception only)
        const FAULT = 0x0004;
    }
}

/// One exception handling clause of a method body, II.25.4.6
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionHandler {
    /// Clause kind
    pub flags: ExceptionHandlerFlags,
    /// Offset in bytes of try block from start of method body
    pub try_offset: u32,
    /// Length in bytes of the try block
    pub try_length: u32,
    /// Location of the handler for this try block
    pub handler_offset: u32,
    /// Size of the handler code in bytes
    pub handler_length: u32,
    /// Class token for typed clauses, filter offset for filter clauses
    pub class_token_or_filter: u32,
}

impl ExceptionHandler {
    /// True if the clause can be stored in the small (12 byte) format
    #[must_use]
    pub fn fits_small(&self) -> bool {
        self.try_offset <= u32::from(u16::MAX)
            && self.try_length <= u32::from(u8::MAX)
            && self.handler_offset <= u32::from(u16::MAX)
            && self.handler_length <= u32::from(u8::MAX)
    }
}
