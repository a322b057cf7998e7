//! CIL instruction decoding and encoding, ECMA-335 III.
//!
//! Instructions are decoded only as far as needed to delimit them: opcode plus raw operand.
//! Tokens stay unresolved. Encoding an instruction reproduces its original bytes.

use crate::{file::io::push_le, file::parser::Parser, metadata::token::Token, Result};

/// Prefix byte of the two-byte opcodes
pub const OPCODE_PREFIX: u8 = 0xFE;

/// Shape of the inline operand that follows an opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandType {
    /// No operand
    None,
    /// Signed byte (short branches, `ldc.i4.s`)
    Int8,
    /// Unsigned byte (short argument/local indices, `unaligned.`, `no.`)
    UInt8,
    /// Unsigned 16-bit argument or local index
    UInt16,
    /// Signed 32-bit integer or branch target
    Int32,
    /// Signed 64-bit integer
    Int64,
    /// 32-bit float
    Float32,
    /// 64-bit float
    Float64,
    /// Metadata token
    Token,
    /// Jump table of `switch`
    Switch,
}

/// A decoded inline operand
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// No operand
    None,
    /// Signed byte
    Int8(i8),
    /// Unsigned byte
    UInt8(u8),
    /// Unsigned 16-bit value
    UInt16(u16),
    /// Signed 32-bit value
    Int32(i32),
    /// Signed 64-bit value
    Int64(i64),
    /// 32-bit float
    Float32(f32),
    /// 64-bit float
    Float64(f64),
    /// Metadata token
    Token(Token),
    /// Branch offsets of a `switch`, relative to the next instruction
    Switch(Vec<i32>),
}

/// One CIL instruction
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// Offset of the instruction inside the code
    pub offset: u32,
    /// The opcode; two-byte opcodes are stored as `0xFExx`
    pub opcode: u16,
    /// The inline operand
    pub operand: Operand,
}

/// Look up the operand shape of `opcode`, `None` for undefined opcodes.
#[must_use]
pub fn operand_type(opcode: u16) -> Option<OperandType> {
    use OperandType as O;

    if opcode >> 8 == u16::from(OPCODE_PREFIX) {
        return match opcode & 0xFF {
            0x00..=0x05 | 0x0F | 0x11 | 0x13 | 0x14 | 0x17 | 0x18 | 0x1A | 0x1D | 0x1E => {
                Some(O::None)
            }
            0x06 | 0x07 | 0x15 | 0x16 | 0x1C => Some(O::Token),
            0x09..=0x0E => Some(O::UInt16),
            0x12 | 0x19 => Some(O::UInt8),
            _ => None,
        };
    }

    if opcode > 0xFF {
        return None;
    }

    match opcode as u8 {
        0x00..=0x0D | 0x14..=0x1E | 0x25 | 0x26 | 0x2A | 0x46..=0x6E | 0x76 | 0x7A => {
            Some(O::None)
        }
        0x82..=0x8B | 0x8E | 0x90..=0xA2 | 0xB3..=0xBA | 0xC3 | 0xD1..=0xDC | 0xDF | 0xE0 => {
            Some(O::None)
        }
        0x0E..=0x13 => Some(O::UInt8),
        0x1F | 0x2B..=0x37 | 0xDE => Some(O::Int8),
        0x20 | 0x38..=0x44 | 0xDD => Some(O::Int32),
        0x21 => Some(O::Int64),
        0x22 => Some(O::Float32),
        0x23 => Some(O::Float64),
        0x27..=0x29 | 0x6F..=0x75 | 0x79 | 0x7B..=0x81 | 0x8C | 0x8D | 0x8F => Some(O::Token),
        0xA3..=0xA5 | 0xC2 | 0xC6 | 0xD0 => Some(O::Token),
        0x45 => Some(O::Switch),
        _ => None,
    }
}

/// Decode the instruction at the current parser position.
///
/// # Errors
/// Returns a malformed error for undefined opcodes and an out of bounds error for truncated
/// operands.
pub fn decode_instruction(parser: &mut Parser, offset: u32) -> Result<Instruction> {
    let first = parser.read_le::<u8>()?;
    let opcode = if first == OPCODE_PREFIX {
        0xFE00 | u16::from(parser.read_le::<u8>()?)
    } else {
        u16::from(first)
    };

    let Some(kind) = operand_type(opcode) else {
        return Err(malformed_error!(
            "Invalid opcode {:#06x} at offset {:#x}",
            opcode,
            offset
        ));
    };

    let operand = match kind {
        OperandType::None => Operand::None,
        OperandType::Int8 => Operand::Int8(parser.read_le::<i8>()?),
        OperandType::UInt8 => Operand::UInt8(parser.read_le::<u8>()?),
        OperandType::UInt16 => Operand::UInt16(parser.read_le::<u16>()?),
        OperandType::Int32 => Operand::Int32(parser.read_le::<i32>()?),
        OperandType::Int64 => Operand::Int64(parser.read_le::<i64>()?),
        OperandType::Float32 => Operand::Float32(parser.read_le::<f32>()?),
        OperandType::Float64 => Operand::Float64(parser.read_le::<f64>()?),
        OperandType::Token => Operand::Token(Token::new(parser.read_le::<u32>()?)),
        OperandType::Switch => {
            let count = parser.read_le::<u32>()? as usize;
            if count.saturating_mul(4) > parser.remaining() {
                return Err(out_of_bounds_error!());
            }

            let mut targets = Vec::with_capacity(count);
            for _ in 0..count {
                targets.push(parser.read_le::<i32>()?);
            }
            Operand::Switch(targets)
        }
    };

    Ok(Instruction {
        offset,
        opcode,
        operand,
    })
}

/// Decode a complete code block into its instructions.
///
/// # Errors
/// Returns an error if any instruction is invalid or truncated.
pub fn decode_stream(code: &[u8]) -> Result<Vec<Instruction>> {
    let mut parser = Parser::new(code);
    let mut instructions = Vec::new();

    while parser.has_more_data() {
        let offset = u32::try_from(parser.pos())
            .map_err(|_| malformed_error!("Code block too large - {}", code.len()))?;
        instructions.push(decode_instruction(&mut parser, offset)?);
    }

    Ok(instructions)
}

impl Instruction {
    /// Encoded size in bytes
    #[must_use]
    pub fn size(&self) -> usize {
        let opcode = if self.opcode > 0xFF { 2 } else { 1 };
        let operand = match &self.operand {
            Operand::None => 0,
            Operand::Int8(_) | Operand::UInt8(_) => 1,
            Operand::UInt16(_) => 2,
            Operand::Int32(_) | Operand::Float32(_) | Operand::Token(_) => 4,
            Operand::Int64(_) | Operand::Float64(_) => 8,
            Operand::Switch(targets) => 4 + targets.len() * 4,
        };
        opcode + operand
    }

    /// Append the encoded instruction to `out`
    pub fn encode(&self, out: &mut Vec<u8>) {
        if self.opcode > 0xFF {
            out.push(OPCODE_PREFIX);
        }
        out.push((self.opcode & 0xFF) as u8);

        match &self.operand {
            Operand::None => {}
            Operand::Int8(value) => push_le(out, *value),
            Operand::UInt8(value) => push_le(out, *value),
            Operand::UInt16(value) => push_le(out, *value),
            Operand::Int32(value) => push_le(out, *value),
            Operand::Int64(value) => push_le(out, *value),
            Operand::Float32(value) => push_le(out, *value),
            Operand::Float64(value) => push_le(out, *value),
            Operand::Token(token) => push_le(out, token.value()),
            Operand::Switch(targets) => {
                push_le(out, targets.len() as u32);
                for target in targets {
                    push_le(out, *target);
                }
            }
        }
    }
}
