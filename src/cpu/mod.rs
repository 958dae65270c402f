//! The virtual machine core.
//!
//! - 65536 sixteen-bit memory cells shared by code and data
//! - 8 registers, addressed by operand codes 32768..=32775
//! - an unbounded value stack
//! - a 22-opcode instruction set with 15-bit modular arithmetic

pub mod operand;
pub mod memory;
pub mod registers;
pub mod stack;
pub mod decode;
pub mod execute;

pub use operand::Operand;
pub use memory::Memory;
pub use registers::Registers;
pub use stack::Stack;
pub use decode::{Instruction, Opcode, DecodeError};
pub use execute::{Machine, MachineState, RunReport, Snapshot, VmError};
