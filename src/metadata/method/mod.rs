//! IL method bodies: headers, exception handling clauses and the instruction stream.
//!
//! - [`MethodBody`] decodes a body from the image and re-encodes it after modification
//! - [`Instruction`] / [`Operand`] delimit the individual CIL instructions
//! - [`ExceptionHandler`] describes one protected region
//! - the `*Attributes` / `*Flags` bitflags cover the MethodDef columns and header bits

mod body;
mod exceptions;
mod instruction;
mod types;

pub use body::*;
pub use exceptions::*;
pub use instruction::*;
pub use types::*;
