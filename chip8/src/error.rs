//! Result and errors.
use std::fmt::{self, Display, Formatter};

use crate::constants::{Address, MAX_PROGRAM_SIZE};

pub type Chip8Result<T> = std::result::Result<T, Chip8Error>;

/// Fatal machine conditions.
///
/// None of these can be recovered from at the instruction level. When one
/// is returned the emulation must halt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chip8Error {
    /// Program is empty or can't fit in memory, or no program was loaded.
    InvalidProgram { size: usize },
    /// Subroutine call with a full call stack.
    StackOverflow,
    /// Subroutine return with an empty call stack.
    StackUnderflow,
    /// Instruction word that doesn't decode to any operation.
    UnknownOpcode { opcode: u16, address: Address },
}

impl Display for Chip8Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidProgram { size } => write!(
                f,
                "invalid program: size must be between 1 and {MAX_PROGRAM_SIZE} bytes, got {size}"
            ),
            Self::StackOverflow => write!(f, "call stack overflow"),
            Self::StackUnderflow => write!(f, "call stack underflow"),
            Self::UnknownOpcode { opcode, address } => {
                write!(f, "unknown opcode {opcode:04X} at {address:04X}")
            }
        }
    }
}

impl std::error::Error for Chip8Error {}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = Chip8Error::UnknownOpcode {
            opcode: 0x5121,
            address: 0x0204,
        };
        assert_eq!(err.to_string(), "unknown opcode 5121 at 0204");

        let err = Chip8Error::InvalidProgram { size: 0 };
        assert!(err.to_string().contains("got 0"));
    }
}
