//! Helpers for extracting data from opcodes.
use std::fmt;

use crate::constants::Address;

/// One fetched 16-bit instruction word.
///
/// ```text
/// F000 family
/// 0F00 x
/// 00F0 y
/// 000F n
/// 00FF nn
/// 0FFF nnn
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opcode(pub u16);

impl Opcode {
    /// Instructions are stored big-endian.
    #[inline(always)]
    pub fn from_bytes([a, b]: [u8; 2]) -> Self {
        Self(u16::from_be_bytes([a, b]))
    }

    /// Extract the opcode identity from the upper nibble.
    #[inline(always)]
    pub fn family(self) -> u8 {
        (self.0 >> 12) as u8
    }

    /// Extract operand VX.
    #[inline(always)]
    pub fn x(self) -> usize {
        ((self.0 >> 8) & 0xF) as usize
    }

    /// Extract operand VY.
    #[inline(always)]
    pub fn y(self) -> usize {
        ((self.0 >> 4) & 0xF) as usize
    }

    /// Extract operand N, the last nibble.
    #[inline(always)]
    pub fn n(self) -> u8 {
        (self.0 & 0xF) as u8
    }

    /// Extract operand NN, the low byte.
    #[inline(always)]
    pub fn nn(self) -> u8 {
        (self.0 & 0xFF) as u8
    }

    /// Extract operand NNN, the low 12 bits.
    #[inline(always)]
    pub fn nnn(self) -> Address {
        self.0 & 0xFFF
    }
}

impl From<u16> for Opcode {
    fn from(word: u16) -> Self {
        Self(word)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X}", self.0)
    }
}
