//! Result and errors.
use std::fmt::{self, Display, Formatter};

use crate::constants::Address;

pub type Chip8Result<T> = std::result::Result<T, Chip8Error>;

#[derive(Debug)]
pub enum Chip8Error {
    /// VM fault during interpreter loop.
    Runtime(Fault),
    /// Attempt to load bytes that can't fit in memory.
    LargeProgram { offset: usize, len: usize },
    /// Fontset data has the wrong size.
    Font(usize),
    Io(std::io::Error),
    Fmt(fmt::Error),
}

impl Display for Chip8Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Runtime(fault) => write!(f, "runtime error: {}", fault),
            Self::LargeProgram { offset, len } => write!(
                f,
                "{len} bytes at offset 0x{offset:03X} do not fit in VM memory"
            ),
            Self::Font(len) => write!(
                f,
                "fontset data must be {} bytes, got {len}",
                crate::constants::FONTSET_DATA_LENGTH
            ),
            Self::Io(err) => write!(f, "{}", err),
            Self::Fmt(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for Chip8Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Runtime(fault) => Some(fault),
            Self::Io(err) => Some(err),
            Self::Fmt(err) => Some(err),
            _ => None,
        }
    }
}

impl From<Fault> for Chip8Error {
    fn from(fault: Fault) -> Self {
        Chip8Error::Runtime(fault)
    }
}

impl From<std::io::Error> for Chip8Error {
    fn from(err: std::io::Error) -> Self {
        Chip8Error::Io(err)
    }
}

impl From<fmt::Error> for Chip8Error {
    fn from(err: fmt::Error) -> Self {
        Chip8Error::Fmt(err)
    }
}

/// Fatal condition raised by an instruction.
///
/// The VM stops on any fault and keeps its state as it was when the
/// faulting instruction started, apart from the program counter which
/// already points past it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// The opcode matches no known instruction.
    Decode { opcode: u16, address: Address },
    /// Memory access past the end of RAM.
    Memory { address: usize, len: usize },
    /// Subroutine call with a full call stack.
    StackOverflow,
    /// Subroutine return with an empty call stack.
    StackUnderflow,
    /// Sprite pixel would be drawn outside the display.
    Sprite { x: usize, y: usize },
}

impl Display for Fault {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decode { opcode, address } => {
                write!(f, "unknown opcode {opcode:04X} at 0x{address:03X}")
            }
            Self::Memory { address, len } => {
                write!(f, "memory access of {len} bytes at 0x{address:04X} is out of bounds")
            }
            Self::StackOverflow => write!(f, "call stack overflow"),
            Self::StackUnderflow => write!(f, "call stack underflow"),
            Self::Sprite { x, y } => write!(f, "sprite at ({x}, {y}) leaves the display"),
        }
    }
}

impl std::error::Error for Fault {}
