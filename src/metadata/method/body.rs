//! Decoding and re-encoding of CIL method bodies, ECMA-335 II.25.4.
//!
//! A body is a tiny (1 byte) or fat (12 byte) header, the code itself and, for fat bodies,
//! a chain of 4-byte aligned data sections holding the exception handling clauses. Besides its
//! decoded content every [`MethodBody`] remembers the on-disk range it was read from, so a
//! re-encoded body can be placed back at the same RVA.
//!
//! # Examples
//!
//! ```rust
//! use cilstrip::metadata::method::MethodBody;
//!
//! // tiny header, 3 bytes of code: ldc.i4.1; pop; ret
//! let image = [0x0E, 0x17, 0x26, 0x2A];
//! let mut body = MethodBody::read(&image, 0x2050, 0)?;
//! assert_eq!(body.instructions.len(), 3);
//!
//! body.truncate();
//! assert_eq!(body.encode()?, vec![0x02]);
//! # Ok::<(), cilstrip::Error>(())
//! ```

use crate::{
    file::{io::push_le, parser::Parser},
    metadata::method::{
        decode_stream, ExceptionHandler, ExceptionHandlerFlags, Instruction, MethodBodyFlags,
        SectionFlags,
    },
    Result,
};

/// Size of a fat method header in bytes
pub const FAT_HEADER_SIZE: usize = 12;

/// Largest code size a tiny header can describe
pub const TINY_MAX_CODE_SIZE: usize = 63;

/// Largest stack depth implied by a tiny header
pub const TINY_MAX_STACK: u16 = 8;

const SMALL_CLAUSE_SIZE: usize = 12;
const FAT_CLAUSE_SIZE: usize = 24;
const SECTION_HEADER_SIZE: usize = 4;

/// The two header layouts of a method body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFormat {
    /// One byte header, no locals, no sections, at most 63 bytes of code
    Tiny,
    /// Twelve byte header with stack size, locals and optional data sections
    Fat,
}

/// Where a body lived in the original image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyExtent {
    /// RVA of the header
    pub rva: u32,
    /// File offset of the header
    pub offset: usize,
    /// Header + code + data sections, in bytes
    pub size: usize,
}

/// A decoded method body
#[derive(Debug, Clone, PartialEq)]
pub struct MethodBody {
    /// Header layout the body was stored in
    pub format: BodyFormat,
    /// Maximum number of items on the operand stack
    pub max_stack: u16,
    /// `StandAloneSig` token of the local variables, 0 if there are none
    pub local_var_sig_token: u32,
    /// Zero-initialize locals
    pub init_locals: bool,
    /// Decoded instructions in code order
    pub instructions: Vec<Instruction>,
    /// Exception handling clauses
    pub exception_handlers: Vec<ExceptionHandler>,
    /// Clauses were stored in the fat section format
    pub eh_fat: bool,
    /// Data sections that don't carry exception clauses, kept as raw bytes
    pub extra_sections: Vec<Vec<u8>>,
    /// Header flag bits as found on disk, without the format and size bits
    pub header_flags: u16,
    /// Header size in bytes (1 for tiny bodies)
    pub header_size: usize,
    /// Original location
    pub extent: BodyExtent,
}

impl MethodBody {
    /// Decode the body whose header starts at file offset `offset` of `data`.
    ///
    /// `rva` is the RVA of that header; data sections are aligned relative to it.
    ///
    /// # Errors
    /// Returns an error if the header is neither tiny nor fat, the code contains an invalid
    /// instruction, or any part of the body leaves `data`.
    pub fn read(data: &[u8], rva: u32, offset: usize) -> Result<MethodBody> {
        if offset >= data.len() {
            return Err(out_of_bounds_error!());
        }

        let mut parser = Parser::new(&data[offset..]);
        let first_byte = parser.read_le::<u8>()?;

        match MethodBodyFlags::from_bits_truncate(u16::from(first_byte & 0b11)) {
            MethodBodyFlags::TINY_FORMAT => {
                let code = parser.read_bytes(usize::from(first_byte >> 2))?;
                let instructions = decode_stream(code)?;

                Ok(MethodBody {
                    format: BodyFormat::Tiny,
                    max_stack: TINY_MAX_STACK,
                    local_var_sig_token: 0,
                    init_locals: false,
                    instructions,
                    exception_handlers: Vec::new(),
                    eh_fat: false,
                    extra_sections: Vec::new(),
                    header_flags: 0,
                    header_size: 1,
                    extent: BodyExtent {
                        rva,
                        offset,
                        size: parser.pos(),
                    },
                })
            }
            MethodBodyFlags::FAT_FORMAT => {
                parser.seek(0)?;
                let flags_and_size = parser.read_le::<u16>()?;
                let header_size = usize::from(flags_and_size >> 12) * 4;
                if header_size < FAT_HEADER_SIZE {
                    return Err(malformed_error!(
                        "Fat method header too small - {}",
                        header_size
                    ));
                }

                let flags = MethodBodyFlags::from_bits_retain(flags_and_size & 0x0FFF);
                let max_stack = parser.read_le::<u16>()?;
                let code_size = parser.read_le::<u32>()? as usize;
                let local_var_sig_token = parser.read_le::<u32>()?;

                parser.seek(header_size)?;
                let code = parser.read_bytes(code_size)?;
                let instructions = decode_stream(code)?;

                let mut exception_handlers = Vec::new();
                let mut extra_sections = Vec::new();
                let mut eh_fat = false;

                if flags.contains(MethodBodyFlags::MORE_SECTS) {
                    loop {
                        let misalignment = (rva as usize + parser.pos()) % 4;
                        if misalignment != 0 {
                            parser.advance_by(4 - misalignment)?;
                        }

                        let section_start = parser.pos();
                        let kind = SectionFlags::from_bits_retain(parser.read_le::<u8>()?);
                        let section_size = if kind.contains(SectionFlags::FAT_FORMAT) {
                            let low = parser.read_le::<u16>()?;
                            let high = parser.read_le::<u8>()?;
                            (usize::from(high) << 16) | usize::from(low)
                        } else {
                            let size = parser.read_le::<u8>()?;
                            parser.advance_by(2)?;
                            usize::from(size)
                        };

                        if section_size < SECTION_HEADER_SIZE {
                            return Err(malformed_error!(
                                "Method data section too small - {}",
                                section_size
                            ));
                        }

                        let payload = parser.read_bytes(section_size - SECTION_HEADER_SIZE)?;
                        if kind.contains(SectionFlags::EHTABLE) {
                            eh_fat |= kind.contains(SectionFlags::FAT_FORMAT);
                            read_clauses(
                                payload,
                                kind.contains(SectionFlags::FAT_FORMAT),
                                &mut exception_handlers,
                            )?;
                        } else {
                            let raw = &data[offset + section_start..offset + parser.pos()];
                            extra_sections.push(raw.to_vec());
                        }

                        if !kind.contains(SectionFlags::MORE_SECTS) {
                            break;
                        }
                    }
                }

                let header_flags = (flags
                    - MethodBodyFlags::FAT_FORMAT
                    - MethodBodyFlags::MORE_SECTS
                    - MethodBodyFlags::INIT_LOCALS)
                    .bits();

                Ok(MethodBody {
                    format: BodyFormat::Fat,
                    max_stack,
                    local_var_sig_token,
                    init_locals: flags.contains(MethodBodyFlags::INIT_LOCALS),
                    instructions,
                    exception_handlers,
                    eh_fat,
                    extra_sections,
                    header_flags,
                    header_size,
                    extent: BodyExtent {
                        rva,
                        offset,
                        size: parser.pos(),
                    },
                })
            }
            _ => Err(malformed_error!(
                "Method header is neither fat nor tiny - {}",
                first_byte
            )),
        }
    }

    /// Remove all instructions and exception clauses, keeping the header information
    pub fn truncate(&mut self) {
        self.instructions.clear();
        self.exception_handlers.clear();
    }

    /// True if the body holds no instructions
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Number of decoded instructions
    #[must_use]
    pub fn instruction_count(&self) -> usize {
        self.instructions.len()
    }

    /// Size of the code in bytes
    #[must_use]
    pub fn code_size(&self) -> usize {
        self.instructions.iter().map(Instruction::size).sum()
    }

    /// Encode the body. A tiny body stays tiny as long as its content allows it, otherwise a fat
    /// header is produced.
    ///
    /// # Errors
    /// Returns a malformed error if the code or the exception table exceeds what the format can
    /// express.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut code = Vec::with_capacity(self.code_size());
        for instruction in &self.instructions {
            instruction.encode(&mut code);
        }

        let needs_sections = !self.exception_handlers.is_empty() || !self.extra_sections.is_empty();
        if self.format == BodyFormat::Tiny
            && code.len() <= TINY_MAX_CODE_SIZE
            && !needs_sections
        {
            let mut out = Vec::with_capacity(code.len() + 1);
            out.push(((code.len() as u8) << 2) | MethodBodyFlags::TINY_FORMAT.bits() as u8);
            out.extend_from_slice(&code);
            return Ok(out);
        }

        let Ok(code_size) = u32::try_from(code.len()) else {
            return Err(malformed_error!("Code too large - {}", code.len()));
        };

        let header_size = if self.format == BodyFormat::Fat {
            self.header_size
        } else {
            FAT_HEADER_SIZE
        };

        let mut flags = MethodBodyFlags::from_bits_retain(self.header_flags)
            | MethodBodyFlags::FAT_FORMAT;
        if needs_sections {
            flags |= MethodBodyFlags::MORE_SECTS;
        }
        if self.init_locals {
            flags |= MethodBodyFlags::INIT_LOCALS;
        }

        let mut out = Vec::with_capacity(header_size + code.len());
        push_le(&mut out, flags.bits() | (((header_size / 4) as u16) << 12));
        push_le(&mut out, self.max_stack);
        push_le(&mut out, code_size);
        push_le(&mut out, self.local_var_sig_token);
        out.resize(header_size, 0);
        out.extend_from_slice(&code);

        if !needs_sections {
            return Ok(out);
        }

        let mut sections: Vec<Vec<u8>> = Vec::new();
        if !self.exception_handlers.is_empty() {
            sections.push(self.encode_clauses()?);
        }
        sections.extend(self.extra_sections.iter().cloned());

        let last = sections.len() - 1;
        for (index, mut section) in sections.into_iter().enumerate() {
            if index == last {
                section[0] &= !SectionFlags::MORE_SECTS.bits();
            } else {
                section[0] |= SectionFlags::MORE_SECTS.bits();
            }

            let misalignment = (self.extent.rva as usize + out.len()) % 4;
            if misalignment != 0 {
                out.resize(out.len() + 4 - misalignment, 0);
            }
            out.extend_from_slice(&section);
        }

        Ok(out)
    }

    fn encode_clauses(&self) -> Result<Vec<u8>> {
        let small_size = SECTION_HEADER_SIZE + self.exception_handlers.len() * SMALL_CLAUSE_SIZE;
        let small = !self.eh_fat
            && small_size <= usize::from(u8::MAX)
            && self.exception_handlers.iter().all(ExceptionHandler::fits_small);

        let mut section = Vec::new();
        if small {
            section.push(SectionFlags::EHTABLE.bits());
            section.push(small_size as u8);
            push_le(&mut section, 0_u16);

            for clause in &self.exception_handlers {
                push_le(&mut section, clause.flags.bits());
                push_le(&mut section, clause.try_offset as u16);
                push_le(&mut section, clause.try_length as u8);
                push_le(&mut section, clause.handler_offset as u16);
                push_le(&mut section, clause.handler_length as u8);
                push_le(&mut section, clause.class_token_or_filter);
            }
        } else {
            let fat_size = SECTION_HEADER_SIZE + self.exception_handlers.len() * FAT_CLAUSE_SIZE;
            if fat_size > 0x00FF_FFFF {
                return Err(malformed_error!(
                    "Too many exception clauses - {}",
                    self.exception_handlers.len()
                ));
            }

            section.push((SectionFlags::EHTABLE | SectionFlags::FAT_FORMAT).bits());
            push_le(&mut section, (fat_size & 0xFFFF) as u16);
            push_le(&mut section, (fat_size >> 16) as u8);

            for clause in &self.exception_handlers {
                push_le(&mut section, u32::from(clause.flags.bits()));
                push_le(&mut section, clause.try_offset);
                push_le(&mut section, clause.try_length);
                push_le(&mut section, clause.handler_offset);
                push_le(&mut section, clause.handler_length);
                push_le(&mut section, clause.class_token_or_filter);
            }
        }

        Ok(section)
    }
}

fn read_clauses(payload: &[u8], fat: bool, clauses: &mut Vec<ExceptionHandler>) -> Result<()> {
    let clause_size = if fat { FAT_CLAUSE_SIZE } else { SMALL_CLAUSE_SIZE };
    let mut parser = Parser::new(payload);

    for _ in 0..payload.len() / clause_size {
        let clause = if fat {
            ExceptionHandler {
                #[allow(clippy::cast_possible_truncation)]
                flags: ExceptionHandlerFlags::from_bits_retain(parser.read_le::<u32>()? as u16),
                try_offset: parser.read_le::<u32>()?,
                try_length: parser.read_le::<u32>()?,
                handler_offset: parser.read_le::<u32>()?,
                handler_length: parser.read_le::<u32>()?,
                class_token_or_filter: parser.read_le::<u32>()?,
            }
        } else {
            ExceptionHandler {
                flags: ExceptionHandlerFlags::from_bits_retain(parser.read_le::<u16>()?),
                try_offset: u32::from(parser.read_le::<u16>()?),
                try_length: u32::from(parser.read_le::<u8>()?),
                handler_offset: u32::from(parser.read_le::<u16>()?),
                handler_length: u32::from(parser.read_le::<u8>()?),
                class_token_or_filter: parser.read_le::<u32>()?,
            }
        };
        clauses.push(clause);
    }

    Ok(())
}
