//! Instruction decoder.
//!
//! An instruction is an opcode word followed by zero to three operand
//! words. Operands are kept as raw codes here; resolving them against the
//! register file is the executor's job, since some opcodes use a code as a
//! destination rather than a value.

use crate::cpu::Memory;
use crate::cpu::operand::Operand;
use thiserror::Error;

/// The 22 opcodes, numbered as they appear in the instruction stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Opcode {
    Halt = 0,
    Set = 1,
    Push = 2,
    Pop = 3,
    Eq = 4,
    Gt = 5,
    Jmp = 6,
    Jt = 7,
    Jf = 8,
    Add = 9,
    Mult = 10,
    Mod = 11,
    And = 12,
    Or = 13,
    Not = 14,
    Rmem = 15,
    Wmem = 16,
    Call = 17,
    Ret = 18,
    Out = 19,
    In = 20,
    Noop = 21,
}

impl Opcode {
    pub const ALL: [Opcode; 22] = [
        Opcode::Halt, Opcode::Set, Opcode::Push, Opcode::Pop, Opcode::Eq, Opcode::Gt,
        Opcode::Jmp, Opcode::Jt, Opcode::Jf, Opcode::Add, Opcode::Mult, Opcode::Mod,
        Opcode::And, Opcode::Or, Opcode::Not, Opcode::Rmem, Opcode::Wmem, Opcode::Call,
        Opcode::Ret, Opcode::Out, Opcode::In, Opcode::Noop,
    ];

    /// Number of operand words following the opcode.
    pub const fn arity(self) -> usize {
        match self {
            Opcode::Halt | Opcode::Ret | Opcode::Noop => 0,
            Opcode::Push | Opcode::Pop | Opcode::Jmp | Opcode::Call
            | Opcode::Out | Opcode::In => 1,
            Opcode::Set | Opcode::Jt | Opcode::Jf | Opcode::Not
            | Opcode::Rmem | Opcode::Wmem => 2,
            Opcode::Eq | Opcode::Gt | Opcode::Add | Opcode::Mult
            | Opcode::Mod | Opcode::And | Opcode::Or => 3,
        }
    }

    pub const fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Halt => "halt",
            Opcode::Set => "set",
            Opcode::Push => "push",
            Opcode::Pop => "pop",
            Opcode::Eq => "eq",
            Opcode::Gt => "gt",
            Opcode::Jmp => "jmp",
            Opcode::Jt => "jt",
            Opcode::Jf => "jf",
            Opcode::Add => "add",
            Opcode::Mult => "mult",
            Opcode::Mod => "mod",
            Opcode::And => "and",
            Opcode::Or => "or",
            Opcode::Not => "not",
            Opcode::Rmem => "rmem",
            Opcode::Wmem => "wmem",
            Opcode::Call => "call",
            Opcode::Ret => "ret",
            Opcode::Out => "out",
            Opcode::In => "in",
            Opcode::Noop => "noop",
        }
    }
}

impl TryFrom<u16> for Opcode {
    type Error = DecodeError;

    fn try_from(word: u16) -> Result<Self, Self::Error> {
        Opcode::ALL
            .get(word as usize)
            .copied()
            .ok_or(DecodeError::UnknownOpcode(word))
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// A decoded instruction with its raw operand codes.
///
/// Fields named `dest` are write destinations and are never resolved.
/// `Jmp::target` is also taken raw; every other operand is resolved
/// through the register file when executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// Stop execution.
    Halt,
    /// dest := value
    Set { dest: u16, value: u16 },
    /// Push value onto the stack.
    Push { value: u16 },
    /// dest := pop()
    Pop { dest: u16 },
    /// dest := 1 if lhs == rhs else 0
    Eq { dest: u16, lhs: u16, rhs: u16 },
    /// dest := 1 if lhs > rhs else 0
    Gt { dest: u16, lhs: u16, rhs: u16 },
    /// pc := target (raw code)
    Jmp { target: u16 },
    /// if cond != 0: pc := target
    Jt { cond: u16, target: u16 },
    /// if cond == 0: pc := target
    Jf { cond: u16, target: u16 },
    /// dest := (lhs + rhs) mod 32768
    Add { dest: u16, lhs: u16, rhs: u16 },
    /// dest := (lhs * rhs) mod 32768
    Mult { dest: u16, lhs: u16, rhs: u16 },
    /// dest := lhs % rhs
    Mod { dest: u16, lhs: u16, rhs: u16 },
    /// dest := lhs & rhs
    And { dest: u16, lhs: u16, rhs: u16 },
    /// dest := lhs | rhs
    Or { dest: u16, lhs: u16, rhs: u16 },
    /// dest := 15-bit complement of value
    Not { dest: u16, value: u16 },
    /// dest := memory[addr]
    Rmem { dest: u16, addr: u16 },
    /// memory[addr] := value
    Wmem { addr: u16, value: u16 },
    /// Push the return address, then pc := target.
    Call { target: u16 },
    /// pc := pop()
    Ret,
    /// Write one character.
    Out { value: u16 },
    /// Read one character into dest.
    In { dest: u16 },
    /// No operation.
    Noop,
}

impl Instruction {
    pub fn opcode(&self) -> Opcode {
        match self {
            Instruction::Halt => Opcode::Halt,
            Instruction::Set { .. } => Opcode::Set,
            Instruction::Push { .. } => Opcode::Push,
            Instruction::Pop { .. } => Opcode::Pop,
            Instruction::Eq { .. } => Opcode::Eq,
            Instruction::Gt { .. } => Opcode::Gt,
            Instruction::Jmp { .. } => Opcode::Jmp,
            Instruction::Jt { .. } => Opcode::Jt,
            Instruction::Jf { .. } => Opcode::Jf,
            Instruction::Add { .. } => Opcode::Add,
            Instruction::Mult { .. } => Opcode::Mult,
            Instruction::Mod { .. } => Opcode::Mod,
            Instruction::And { .. } => Opcode::And,
            Instruction::Or { .. } => Opcode::Or,
            Instruction::Not { .. } => Opcode::Not,
            Instruction::Rmem { .. } => Opcode::Rmem,
            Instruction::Wmem { .. } => Opcode::Wmem,
            Instruction::Call { .. } => Opcode::Call,
            Instruction::Ret => Opcode::Ret,
            Instruction::Out { .. } => Opcode::Out,
            Instruction::In { .. } => Opcode::In,
            Instruction::Noop => Opcode::Noop,
        }
    }

    /// Length in words, opcode included.
    pub fn word_count(&self) -> u16 {
        1 + self.opcode().arity() as u16
    }

    /// The raw operand codes in stream order.
    pub fn operands(&self) -> Vec<u16> {
        match *self {
            Instruction::Halt | Instruction::Ret | Instruction::Noop => vec![],
            Instruction::Push { value } | Instruction::Out { value } => vec![value],
            Instruction::Pop { dest } | Instruction::In { dest } => vec![dest],
            Instruction::Jmp { target } | Instruction::Call { target } => vec![target],
            Instruction::Set { dest, value } | Instruction::Not { dest, value } => vec![dest, value],
            Instruction::Jt { cond, target } | Instruction::Jf { cond, target } => vec![cond, target],
            Instruction::Rmem { dest, addr } => vec![dest, addr],
            Instruction::Wmem { addr, value } => vec![addr, value],
            Instruction::Eq { dest, lhs, rhs }
            | Instruction::Gt { dest, lhs, rhs }
            | Instruction::Add { dest, lhs, rhs }
            | Instruction::Mult { dest, lhs, rhs }
            | Instruction::Mod { dest, lhs, rhs }
            | Instruction::And { dest, lhs, rhs }
            | Instruction::Or { dest, lhs, rhs } => vec![dest, lhs, rhs],
        }
    }
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.opcode())?;
        for (i, code) in self.operands().into_iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            write!(f, "{}{}", sep, Operand::classify(code))?;
        }
        Ok(())
    }
}

/// Decode the instruction starting at `pc`.
///
/// Operand words are fetched from consecutive cells, wrapping at the end
/// of memory.
pub fn decode(mem: &Memory, pc: u16) -> Result<Instruction, DecodeError> {
    let opcode = Opcode::try_from(mem.read(pc))?;
    let arg = |n: u16| mem.read(pc.wrapping_add(n));

    let instruction = match opcode {
        Opcode::Halt => Instruction::Halt,
        Opcode::Set => Instruction::Set { dest: arg(1), value: arg(2) },
        Opcode::Push => Instruction::Push { value: arg(1) },
        Opcode::Pop => Instruction::Pop { dest: arg(1) },
        Opcode::Eq => Instruction::Eq { dest: arg(1), lhs: arg(2), rhs: arg(3) },
        Opcode::Gt => Instruction::Gt { dest: arg(1), lhs: arg(2), rhs: arg(3) },
        Opcode::Jmp => Instruction::Jmp { target: arg(1) },
        Opcode::Jt => Instruction::Jt { cond: arg(1), target: arg(2) },
        Opcode::Jf => Instruction::Jf { cond: arg(1), target: arg(2) },
        Opcode::Add => Instruction::Add { dest: arg(1), lhs: arg(2), rhs: arg(3) },
        Opcode::Mult => Instruction::Mult { dest: arg(1), lhs: arg(2), rhs: arg(3) },
        Opcode::Mod => Instruction::Mod { dest: arg(1), lhs: arg(2), rhs: arg(3) },
        Opcode::And => Instruction::And { dest: arg(1), lhs: arg(2), rhs: arg(3) },
        Opcode::Or => Instruction::Or { dest: arg(1), lhs: arg(2), rhs: arg(3) },
        Opcode::Not => Instruction::Not { dest: arg(1), value: arg(2) },
        Opcode::Rmem => Instruction::Rmem { dest: arg(1), addr: arg(2) },
        Opcode::Wmem => Instruction::Wmem { addr: arg(1), value: arg(2) },
        Opcode::Call => Instruction::Call { target: arg(1) },
        Opcode::Ret => Instruction::Ret,
        Opcode::Out => Instruction::Out { value: arg(1) },
        Opcode::In => Instruction::In { dest: arg(1) },
        Opcode::Noop => Instruction::Noop,
    };

    Ok(instruction)
}

/// Encode an instruction into its opcode and operand words.
pub fn encode(instr: &Instruction) -> Vec<u16> {
    let mut words = Vec::with_capacity(instr.word_count() as usize);
    words.push(instr.opcode() as u16);
    words.extend(instr.operands());
    words
}

/// Encode a sequence of instructions into one contiguous image.
pub fn assemble(program: &[Instruction]) -> Vec<u16> {
    program.iter().flat_map(encode).collect()
}

/// Errors that can occur during instruction decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unknown opcode {0}")]
    UnknownOpcode(u16),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_with(words: &[u16]) -> Memory {
        let mut mem = Memory::new();
        mem.load_image(words).unwrap();
        mem
    }

    #[test]
    fn test_opcode_numbering() {
        for (i, op) in Opcode::ALL.iter().enumerate() {
            assert_eq!(*op as u16, i as u16);
            assert_eq!(Opcode::try_from(i as u16), Ok(*op));
        }
        assert_eq!(Opcode::try_from(22), Err(DecodeError::UnknownOpcode(22)));
    }

    #[test]
    fn test_decode_hlt() {
        let mem = Memory::new();
        assert_eq!(decode(&mem, 0), Ok(Instruction::Halt));
    }

    #[test]
    fn test_decode_three_operands() {
        let mem = memory_with(&[9, 32768, 32769, 4]);
        let instr = decode(&mem, 0).unwrap();

        assert_eq!(instr, Instruction::Add { dest: 32768, lhs: 32769, rhs: 4 });
        assert_eq!(instr.word_count(), 4);
    }

    #[test]
    fn test_decode_at_offset() {
        let mem = memory_with(&[21, 19, 65]);
        assert_eq!(decode(&mem, 0), Ok(Instruction::Noop));
        assert_eq!(decode(&mem, 1), Ok(Instruction::Out { value: 65 }));
    }

    #[test]
    fn test_decode_wraps_at_end_of_memory() {
        let mut mem = Memory::new();
        mem.write(u16::MAX, Opcode::Push as u16);
        mem.write(0, 77);
        assert_eq!(decode(&mem, u16::MAX), Ok(Instruction::Push { value: 77 }));
    }

    #[test]
    fn test_decode_unknown_opcode() {
        let mem = memory_with(&[500]);
        assert_eq!(decode(&mem, 0), Err(DecodeError::UnknownOpcode(500)));
    }

    #[test]
    fn test_encode_matches_arity() {
        let program = [
            Instruction::Set { dest: 32768, value: 4 },
            Instruction::Out { value: 32768 },
            Instruction::Halt,
        ];
        assert_eq!(assemble(&program), vec![1, 32768, 4, 19, 32768, 0]);

        for instr in program {
            assert_eq!(encode(&instr).len(), instr.word_count() as usize);
        }
    }

    #[test]
    fn test_display() {
        let instr = Instruction::Add { dest: 32768, lhs: 32769, rhs: 4 };
        assert_eq!(instr.to_string(), "add r0, r1, 4");
        assert_eq!(Instruction::Ret.to_string(), "ret");
    }
}
