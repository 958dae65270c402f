//! Operand classification.
//!
//! Every 16-bit operand code in the instruction stream is one of:
//! - a literal in 0..=32767, standing for itself
//! - a register reference in 32768..=32775, naming one of the 8 registers
//! - anything above that, which is malformed


/// First code that refers to a register. All arithmetic is modulo this value.
pub const MODULUS: u16 = 32768;

/// Number of general purpose registers.
pub const REGISTER_COUNT: usize = 8;

/// Mask of the 15 significant bits in the literal domain.
pub const VALUE_MASK: u16 = MODULUS - 1;

/// A classified operand code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    /// A literal value in 0..=32767.
    Literal(u16),
    /// A register slot 0..=7.
    Register(usize),
    /// A code of 32776 or more.
    Invalid(u16),
}

impl Operand {
    /// Classify a raw operand code.
    pub const fn classify(code: u16) -> Self {
        if code < MODULUS {
            Operand::Literal(code)
        } else if code < MODULUS + REGISTER_COUNT as u16 {
            Operand::Register((code - MODULUS) as usize)
        } else {
            Operand::Invalid(code)
        }
    }

    /// The operand code for register slot `index`.
    ///
    /// # Panics
    /// Panics if `index` is not a valid register slot.
    pub const fn register(index: usize) -> u16 {
        assert!(index < REGISTER_COUNT, "register index out of range");
        MODULUS + index as u16
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Operand::Literal(_))
    }

    pub fn is_register(&self) -> bool {
        matches!(self, Operand::Register(_))
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, Operand::Invalid(_))
    }
}

impl std::fmt::Display for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operand::Literal(value) => write!(f, "{}", value),
            Operand::Register(index) => write!(f, "r{}", index),
            Operand::Invalid(code) => write!(f, "<invalid {}>", code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_classify_boundaries() {
        assert_eq!(Operand::classify(0), Operand::Literal(0));
        assert_eq!(Operand::classify(32767), Operand::Literal(32767));
        assert_eq!(Operand::classify(32768), Operand::Register(0));
        assert_eq!(Operand::classify(32775), Operand::Register(7));
        assert_eq!(Operand::classify(32776), Operand::Invalid(32776));
        assert_eq!(Operand::classify(u16::MAX), Operand::Invalid(u16::MAX));
    }

    #[test]
    fn test_register_codes() {
        for i in 0..REGISTER_COUNT {
            assert_eq!(Operand::classify(Operand::register(i)), Operand::Register(i));
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(Operand::classify(42).to_string(), "42");
        assert_eq!(Operand::classify(32770).to_string(), "r2");
        assert_eq!(Operand::classify(40000).to_string(), "<invalid 40000>");
    }

    proptest! {
        #[test]
        fn literals_classify_as_literal(code in 0u16..32768) {
            prop_assert!(Operand::classify(code).is_literal());
        }

        #[test]
        fn register_codes_classify_as_register(code in 32768u16..32776) {
            prop_assert!(Operand::classify(code).is_register());
        }

        #[test]
        fn high_codes_classify_as_invalid(code in 32776u16..=u16::MAX) {
            prop_assert!(Operand::classify(code).is_invalid());
        }
    }
}
