//! Disassembler.
use std::fmt::{self, Write as FmtWrite};

use crate::{bytecode::Opcode, constants::MEM_START};

pub struct Disassembler<'a> {
    bytecode: &'a [u8],
}

impl<'a> Disassembler<'a> {
    pub fn new(bytecode: &'a [u8]) -> Self {
        Self { bytecode }
    }

    /// Disassemble the whole program into a listing.
    pub fn listing(&self) -> Result<String, fmt::Error> {
        let mut s = String::new();
        for offset in (0..self.bytecode.len()).step_by(2) {
            self.disassemble(offset, &mut s)?;
        }

        Ok(s)
    }

    /// Write the instruction at the given byte offset into the program.
    ///
    /// A lone trailing byte is written as data. Offsets past the end
    /// write nothing.
    pub fn disassemble<W: FmtWrite>(&self, offset: usize, w: &mut W) -> fmt::Result {
        let address = MEM_START + offset;

        match self.bytecode.get(offset..offset + 2) {
            Some(&[a, b]) => {
                let op = Opcode::from_bytes([a, b]);
                writeln!(w, "{address:04X}: {op:04X}  {op}")
            }
            _ => match self.bytecode.get(offset) {
                Some(byte) => writeln!(w, "{address:04X}: {byte:02X}    DB {byte:#04X}"),
                None => Ok(()),
            },
        }
    }
}
