//! The register file.
//!
//! Eight independent 16-bit registers, r0 through r7, addressed in the
//! instruction stream by operand codes 32768..=32775.

use crate::cpu::operand::REGISTER_COUNT;
use serde::Serialize;

/// The register file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Registers {
    slots: [u16; REGISTER_COUNT],
}

impl Registers {
    /// Create a new register file with all values zeroed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset all registers to zero.
    pub fn reset(&mut self) {
        self.slots = [0; REGISTER_COUNT];
    }

    /// Read register `index`.
    ///
    /// # Panics
    /// Panics if index is out of range.
    #[inline]
    pub fn get(&self, index: usize) -> u16 {
        assert!(index < REGISTER_COUNT, "register {} out of range (0-{})", index, REGISTER_COUNT - 1);
        self.slots[index]
    }

    /// Write register `index`.
    ///
    /// # Panics
    /// Panics if index is out of range.
    #[inline]
    pub fn set(&mut self, index: usize, value: u16) {
        assert!(index < REGISTER_COUNT, "register {} out of range (0-{})", index, REGISTER_COUNT - 1);
        self.slots[index] = value;
    }

    pub fn as_slice(&self) -> &[u16] {
        &self.slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registers_independent() {
        let mut regs = Registers::new();
        for i in 0..REGISTER_COUNT {
            regs.set(i, i as u16 * 100);
        }
        for i in 0..REGISTER_COUNT {
            assert_eq!(regs.get(i), i as u16 * 100);
        }
    }

    #[test]
    fn test_reset() {
        let mut regs = Registers::new();
        regs.set(3, 17);
        regs.reset();
        assert_eq!(regs.as_slice(), &[0; REGISTER_COUNT]);
    }

    #[test]
    #[should_panic]
    fn test_out_of_range_panics() {
        Registers::new().get(REGISTER_COUNT);
    }
}
