//! # Synacor VM
//!
//! A virtual machine for the Synacor 16-bit instruction set.
//!
//! Programs are little-endian word images loaded at address 0 and run by a
//! fetch-decode-execute loop over 65536 memory cells, 8 registers and an
//! unbounded stack. Character I/O goes through a [`Console`].

pub mod cpu;
pub mod console;
pub mod loader;

// Re-export commonly used types
pub use cpu::{Machine, MachineState, RunReport, VmError, Memory, Registers, Stack, Instruction, Opcode, Operand};
pub use console::{Console, StdConsole, ScriptedConsole};
pub use loader::{load_image, load_bytes, LoadError};
