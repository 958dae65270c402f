//! Execution engine.
//!
//! Implements the fetch-decode-execute cycle and all instruction behaviors.
//! Any fault stops the machine: the offending instruction's remaining
//! effects are abandoned, a diagnostic goes to the console, and the run
//! ends through the normal loop exit.

use crate::console::Console;
use crate::cpu::{Memory, Registers, Stack};
use crate::cpu::decode::{self, DecodeError, Instruction, Opcode};
use crate::cpu::memory::MemoryError;
use crate::cpu::operand::{Operand, MODULUS, VALUE_MASK};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, warn};

/// Message passed to the console when HALT executes.
pub const HALT_NOTICE: &str = "machine halted";

/// Machine execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MachineState {
    /// Not started yet.
    Idle,
    /// Executing instructions.
    Running,
    /// Stopped by a HALT instruction.
    Halted,
    /// Stopped by a fault.
    Faulted,
}

/// Summary of one call to [`Machine::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// State the machine ended in.
    pub state: MachineState,
    /// Instructions completed during this run.
    pub cycles: u64,
    /// The fault that stopped the run, if any.
    pub fault: Option<VmError>,
}

/// A point-in-time view of the machine, without memory.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub pc: u16,
    pub state: MachineState,
    pub registers: Registers,
    pub stack: Stack,
    pub cycles: u64,
    pub fault: Option<String>,
}

/// The virtual machine.
#[derive(Clone)]
pub struct Machine {
    /// Main memory, holding both code and data.
    pub mem: Memory,
    /// General purpose registers r0-r7.
    pub regs: Registers,
    /// Value and return-address stack.
    pub stack: Stack,
    /// Address of the next instruction.
    pub pc: u16,
    /// Current execution state.
    pub state: MachineState,
    /// Instruction count across all runs.
    pub cycles: u64,
    fault: Option<VmError>,
}

impl Machine {
    /// Create a new machine with zeroed state.
    pub fn new() -> Self {
        Self {
            mem: Memory::new(),
            regs: Registers::new(),
            stack: Stack::new(),
            pc: 0,
            state: MachineState::Idle,
            cycles: 0,
            fault: None,
        }
    }

    /// Create a machine with `image` loaded at address 0.
    pub fn with_image(image: &[u16]) -> Result<Self, MemoryError> {
        let mut machine = Self::new();
        machine.mem.load_image(image)?;
        Ok(machine)
    }

    /// Reset everything, including memory.
    pub fn reset(&mut self) {
        self.mem.clear();
        self.regs.reset();
        self.stack.clear();
        self.pc = 0;
        self.state = MachineState::Idle;
        self.cycles = 0;
        self.fault = None;
    }

    /// Run from `start` until the machine halts or faults.
    pub fn run(&mut self, start: u16, console: &mut dyn Console) -> RunReport {
        self.run_inner(start, None, console)
    }

    /// Run from `start` for at most `max_cycles` instructions.
    ///
    /// If the limit is reached first, the machine is left `Running` and can
    /// be continued with [`Machine::step`].
    pub fn run_limited(&mut self, start: u16, max_cycles: u64, console: &mut dyn Console) -> RunReport {
        self.run_inner(start, Some(max_cycles), console)
    }

    fn run_inner(&mut self, start: u16, limit: Option<u64>, console: &mut dyn Console) -> RunReport {
        self.pc = start;
        self.state = MachineState::Running;
        self.fault = None;
        let start_cycles = self.cycles;
        debug!(start, "machine started");

        while self.state == MachineState::Running {
            if limit.is_some_and(|max| self.cycles - start_cycles >= max) {
                break;
            }
            if self.step(console).is_err() {
                break;
            }
        }

        let report = RunReport {
            state: self.state,
            cycles: self.cycles - start_cycles,
            fault: self.fault.clone(),
        };
        debug!(state = ?report.state, cycles = report.cycles, pc = self.pc, "machine stopped");
        report
    }

    /// Execute a single instruction.
    ///
    /// A fault stops the machine and is reported to the console before it
    /// is returned. The pc is left at the faulting instruction.
    pub fn step(&mut self, console: &mut dyn Console) -> Result<Instruction, VmError> {
        if self.state != MachineState::Running {
            return Err(VmError::NotRunning(self.state));
        }

        match self.try_step(console) {
            Ok(instr) => Ok(instr),
            Err(err) => {
                self.fail_stop(err.clone(), console);
                Err(err)
            }
        }
    }

    fn try_step(&mut self, console: &mut dyn Console) -> Result<Instruction, VmError> {
        let instr = decode::decode(&self.mem, self.pc)?;
        let next = self.pc.wrapping_add(instr.word_count());

        self.pc = self.execute(instr, next, console)?;
        self.cycles += 1;

        Ok(instr)
    }

    fn fail_stop(&mut self, err: VmError, console: &mut dyn Console) {
        self.state = MachineState::Faulted;
        error!(pc = self.pc, error = %err, "machine faulted");

        let message = format!("error at {}: {}", self.pc, err);
        if let Err(e) = console.diagnostic(&message) {
            warn!(error = %e, "could not report diagnostic");
        }
        self.fault = Some(err);
    }

    /// Execute a decoded instruction whose successor is at `next`.
    ///
    /// Returns the new program counter.
    fn execute(&mut self, instr: Instruction, next: u16, console: &mut dyn Console) -> Result<u16, VmError> {
        match instr {
            Instruction::Halt => {
                self.state = MachineState::Halted;
                console.notice(HALT_NOTICE)?;
            }

            Instruction::Set { dest, value } => {
                let value = self.read(value)?;
                self.write(dest, value)?;
            }

            // ==================== Stack ====================

            Instruction::Push { value } => {
                let value = self.read(value)?;
                self.stack.push(value);
            }

            Instruction::Pop { dest } => {
                let value = self.stack.top().ok_or(VmError::StackUnderflow(Opcode::Pop))?;
                self.write(dest, value)?;
                self.stack.pop();
            }

            // ==================== Comparison ====================

            Instruction::Eq { dest, lhs, rhs } => {
                let (lhs, rhs) = (self.read(lhs)?, self.read(rhs)?);
                self.write(dest, u16::from(lhs == rhs))?;
            }

            Instruction::Gt { dest, lhs, rhs } => {
                let (lhs, rhs) = (self.read(lhs)?, self.read(rhs)?);
                self.write(dest, u16::from(lhs > rhs))?;
            }

            // ==================== Control Flow ====================

            // The target is used raw, unlike JT/JF/CALL.
            Instruction::Jmp { target } => return Ok(target),

            Instruction::Jt { cond, target } => {
                let (cond, target) = (self.read(cond)?, self.read(target)?);
                if cond != 0 {
                    return Ok(target);
                }
            }

            Instruction::Jf { cond, target } => {
                let (cond, target) = (self.read(cond)?, self.read(target)?);
                if cond == 0 {
                    return Ok(target);
                }
            }

            Instruction::Call { target } => {
                let target = self.read(target)?;
                self.stack.push(next);
                return Ok(target);
            }

            Instruction::Ret => {
                return self.stack.pop().ok_or(VmError::StackUnderflow(Opcode::Ret));
            }

            // ==================== Arithmetic ====================

            Instruction::Add { dest, lhs, rhs } => {
                let (lhs, rhs) = (self.read(lhs)? as u32, self.read(rhs)? as u32);
                self.write(dest, ((lhs + rhs) % MODULUS as u32) as u16)?;
            }

            Instruction::Mult { dest, lhs, rhs } => {
                let (lhs, rhs) = (self.read(lhs)? as u32, self.read(rhs)? as u32);
                self.write(dest, ((lhs * rhs) % MODULUS as u32) as u16)?;
            }

            Instruction::Mod { dest, lhs, rhs } => {
                let (lhs, rhs) = (self.read(lhs)?, self.read(rhs)?);
                if rhs == 0 {
                    return Err(VmError::DivisionByZero);
                }
                self.write(dest, lhs % rhs)?;
            }

            // ==================== Bitwise ====================

            Instruction::And { dest, lhs, rhs } => {
                let (lhs, rhs) = (self.read(lhs)?, self.read(rhs)?);
                self.write(dest, lhs & rhs)?;
            }

            Instruction::Or { dest, lhs, rhs } => {
                let (lhs, rhs) = (self.read(lhs)?, self.read(rhs)?);
                self.write(dest, lhs | rhs)?;
            }

            Instruction::Not { dest, value } => {
                let value = self.read(value)?;
                self.write(dest, !value & VALUE_MASK)?;
            }

            // ==================== Memory ====================

            Instruction::Rmem { dest, addr } => {
                let addr = self.read(addr)?;
                self.write(dest, self.mem.read(addr))?;
            }

            Instruction::Wmem { addr, value } => {
                let (addr, value) = (self.read(addr)?, self.read(value)?);
                self.mem.write(addr, value);
            }

            // ==================== I/O ====================

            Instruction::Out { value } => {
                let value = self.read(value)?;
                console.write_char(value as u8)?;
            }

            Instruction::In { dest } => {
                let slot = self.destination(dest)?;
                let byte = console.read_char()?.ok_or(VmError::InputExhausted)?;
                self.regs.set(slot, byte as u16);
            }

            Instruction::Noop => {}
        }

        Ok(next)
    }

    /// Resolve an operand code to the value it denotes.
    pub fn read(&self, code: u16) -> Result<u16, VmError> {
        match Operand::classify(code) {
            Operand::Literal(value) => Ok(value),
            Operand::Register(index) => Ok(self.regs.get(index)),
            Operand::Invalid(code) => Err(VmError::MalformedOperand { code }),
        }
    }

    /// Store `value` in the register named by destination code `dest`.
    ///
    /// Nothing is modified unless `dest` names a register.
    pub fn write(&mut self, dest: u16, value: u16) -> Result<(), VmError> {
        let slot = self.destination(dest)?;
        self.regs.set(slot, value);
        Ok(())
    }

    fn destination(&self, dest: u16) -> Result<usize, VmError> {
        match Operand::classify(dest) {
            Operand::Register(index) => Ok(index),
            Operand::Literal(_) | Operand::Invalid(_) => Err(VmError::InvalidWriteTarget { code: dest }),
        }
    }

    /// The fault that stopped the most recent run, if any.
    pub fn fault(&self) -> Option<&VmError> {
        self.fault.as_ref()
    }

    /// Check if the machine halted cleanly.
    pub fn is_halted(&self) -> bool {
        self.state == MachineState::Halted
    }

    /// Check if the machine is running.
    pub fn is_running(&self) -> bool {
        self.state == MachineState::Running
    }

    /// Capture registers, stack and control state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            pc: self.pc,
            state: self.state,
            registers: self.regs.clone(),
            stack: self.stack.clone(),
            cycles: self.cycles,
            fault: self.fault.as_ref().map(|e| e.to_string()),
        }
    }
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Machine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Machine")
            .field("state", &self.state)
            .field("pc", &self.pc)
            .field("cycles", &self.cycles)
            .field("regs", &self.regs)
            .field("stack_depth", &self.stack.len())
            .finish()
    }
}

/// Errors that stop the machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VmError {
    #[error("machine not running: {0:?}")]
    NotRunning(MachineState),

    #[error("malformed operand: {code} is neither a literal nor a register")]
    MalformedOperand { code: u16 },

    #[error("invalid write target: {code} is not a register")]
    InvalidWriteTarget { code: u16 },

    #[error("stack underflow on {0}")]
    StackUnderflow(Opcode),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("division by zero")]
    DivisionByZero,

    #[error("input exhausted")]
    InputExhausted,

    #[error("console error: {0}")]
    Console(String),
}

impl From<std::io::Error> for VmError {
    fn from(e: std::io::Error) -> Self {
        VmError::Console(e.to_string())
    }
}
