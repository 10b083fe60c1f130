//! Helpers for extracting data from opcodes.
//!
//! Instructions are two bytes, stored big-endian. Their behavior is selected
//! by the first nibble (the family), and further by some combination of the
//! remaining nibbles:
//!
//! - `nnn` 12-bit address `[_nnn]`
//! - `kk` 8-bit immediate value `[__kk]`
//! - `x` register index `[_x__]`
//! - `y` register index `[__y_]`
//! - `n` 4-bit selector or sprite height `[___n]`
use std::fmt;

use crate::constants::*;

/// A single 16-bit instruction word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Opcode(pub u16);

impl Opcode {
    /// Read the instruction at the given address.
    ///
    /// Addresses wrap around the 12-bit memory space.
    #[inline(always)]
    pub fn fetch(memory: &[u8; MEM_SIZE], address: usize) -> Self {
        let a = memory[address & MEM_MASK];
        let b = memory[(address + 1) & MEM_MASK];
        Self::from_bytes([a, b])
    }

    #[inline(always)]
    pub fn from_bytes(bytes: [u8; 2]) -> Self {
        Self(u16::from_be_bytes(bytes))
    }

    /// Opcode identity in the first 4-bit nibble.
    #[inline(always)]
    pub fn family(self) -> u8 {
        ((self.0 & 0xF000) >> 12) as u8
    }

    #[inline(always)]
    pub fn x(self) -> usize {
        ((self.0 & 0x0F00) >> 8) as usize
    }

    #[inline(always)]
    pub fn y(self) -> usize {
        ((self.0 & 0x00F0) >> 4) as usize
    }

    #[inline(always)]
    pub fn n(self) -> u8 {
        (self.0 & 0x000F) as u8
    }

    #[inline(always)]
    pub fn kk(self) -> u8 {
        (self.0 & 0x00FF) as u8
    }

    #[inline(always)]
    pub fn nnn(self) -> Address {
        self.0 & 0x0FFF
    }
}

impl From<u16> for Opcode {
    fn from(word: u16) -> Self {
        Self(word)
    }
}

impl fmt::UpperHex for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::UpperHex::fmt(&self.0, f)
    }
}

/// Conventional assembly mnemonic.
///
/// Words that don't decode are shown as a data word.
impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = *self;
        let (x, y, n, kk, nnn) = (op.x(), op.y(), op.n(), op.kk(), op.nnn());

        match (op.family(), n) {
            (0x0, _) if op.0 == 0x00E0 => write!(f, "CLS"),
            (0x0, _) if op.0 == 0x00EE => write!(f, "RET"),
            (0x1, _) => write!(f, "JP {nnn:#05X}"),
            (0x2, _) => write!(f, "CALL {nnn:#05X}"),
            (0x3, _) => write!(f, "SE V{x:X}, {kk:#04X}"),
            (0x4, _) => write!(f, "SNE V{x:X}, {kk:#04X}"),
            (0x5, 0x0) => write!(f, "SE V{x:X}, V{y:X}"),
            (0x6, _) => write!(f, "LD V{x:X}, {kk:#04X}"),
            (0x7, _) => write!(f, "ADD V{x:X}, {kk:#04X}"),
            (0x8, 0x0) => write!(f, "LD V{x:X}, V{y:X}"),
            (0x8, 0x1) => write!(f, "OR V{x:X}, V{y:X}"),
            (0x8, 0x2) => write!(f, "AND V{x:X}, V{y:X}"),
            (0x8, 0x3) => write!(f, "XOR V{x:X}, V{y:X}"),
            (0x8, 0x4) => write!(f, "ADD V{x:X}, V{y:X}"),
            (0x8, 0x5) => write!(f, "SUB V{x:X}, V{y:X}"),
            (0x8, 0x6) => write!(f, "SHR V{x:X}"),
            (0x8, 0x7) => write!(f, "SUBN V{x:X}, V{y:X}"),
            (0x8, 0xE) => write!(f, "SHL V{x:X}"),
            (0x9, 0x0) => write!(f, "SNE V{x:X}, V{y:X}"),
            (0xA, _) => write!(f, "LD I, {nnn:#05X}"),
            (0xB, _) => write!(f, "JP V0, {nnn:#05X}"),
            (0xC, _) => write!(f, "RND V{x:X}, {kk:#04X}"),
            (0xD, _) => write!(f, "DRW V{x:X}, V{y:X}, {n}"),
            (0xE, _) => match kk {
                0x9E => write!(f, "SKP V{x:X}"),
                0xA1 => write!(f, "SKNP V{x:X}"),
                _ => write!(f, "DW {:#06X}", op.0),
            },
            (0xF, _) => match kk {
                0x07 => write!(f, "LD V{x:X}, DT"),
                0x0A => write!(f, "LD V{x:X}, K"),
                0x15 => write!(f, "LD DT, V{x:X}"),
                0x18 => write!(f, "LD ST, V{x:X}"),
                0x1E => write!(f, "ADD I, V{x:X}"),
                0x29 => write!(f, "LD F, V{x:X}"),
                0x33 => write!(f, "LD B, V{x:X}"),
                0x55 => write!(f, "LD [I], V{x:X}"),
                0x65 => write!(f, "LD V{x:X}, [I]"),
                _ => write!(f, "DW {:#06X}", op.0),
            },
            _ => write!(f, "DW {:#06X}", op.0),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_operands() {
        let op = Opcode(0xABCD);
        assert_eq!(op.family(), 0xA);
        assert_eq!(op.x(), 0xB);
        assert_eq!(op.y(), 0xC);
        assert_eq!(op.n(), 0xD);
        assert_eq!(op.kk(), 0xCD);
        assert_eq!(op.nnn(), 0xBCD);
    }

    #[test]
    fn test_fetch_wraps() {
        let mut memory = [0; MEM_SIZE];
        memory[MEM_SIZE - 1] = 0x12;
        memory[0] = 0x34;
        assert_eq!(Opcode::fetch(&memory, MEM_SIZE - 1), Opcode(0x1234));
    }

    #[test]
    fn test_mnemonics() {
        assert_eq!(Opcode(0x00E0).to_string(), "CLS");
        assert_eq!(Opcode(0x00EE).to_string(), "RET");
        assert_eq!(Opcode(0x1234).to_string(), "JP 0x234");
        assert_eq!(Opcode(0x6A2F).to_string(), "LD VA, 0x2F");
        assert_eq!(Opcode(0x8124).to_string(), "ADD V1, V2");
        assert_eq!(Opcode(0xD015).to_string(), "DRW V0, V1, 5");
        assert_eq!(Opcode(0xF30A).to_string(), "LD V3, K");
        assert_eq!(Opcode(0x0123).to_string(), "DW 0x0123");
        assert_eq!(Opcode(0x5121).to_string(), "DW 0x5121");
    }
}
