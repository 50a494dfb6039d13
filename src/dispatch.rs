//! Opcode table the machine dispatches through.

use crate::program::{Instruction, Program};

/// Decoded operation for one slot of the dispatch table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Increment,
    Decrement,
    MoveRight,
    MoveLeft,
    JumpIfZero,
    JumpUnlessZero,
    Output,
    Input,
    /// Terminal marker; reaching it stops the machine.
    Halt,
}

impl From<Instruction> for Opcode {
    fn from(instr: Instruction) -> Self {
        match instr {
            Instruction::Increment => Opcode::Increment,
            Instruction::Decrement => Opcode::Decrement,
            Instruction::MoveRight => Opcode::MoveRight,
            Instruction::MoveLeft => Opcode::MoveLeft,
            Instruction::LoopOpen => Opcode::JumpIfZero,
            Instruction::LoopClose => Opcode::JumpUnlessZero,
            Instruction::Output => Opcode::Output,
            Instruction::Input => Opcode::Input,
        }
    }
}

/// One opcode per program instruction followed by a single [`Opcode::Halt`].
///
/// Because the table is one slot longer than the program, the instruction
/// pointer can always be used as an index: stepping off the last instruction
/// lands on `Halt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchTable {
    ops: Vec<Opcode>,
}

impl DispatchTable {
    /// Decode every instruction of `program` and append the terminal `Halt`.
    pub fn build(program: &Program) -> Self {
        let mut ops: Vec<Opcode> = Vec::with_capacity(program.len() + 1);
        ops.extend(program.iter().map(Opcode::from));
        ops.push(Opcode::Halt);
        Self { ops }
    }

    /// Opcode at `ip`; anything past the terminal marker also halts.
    #[inline]
    pub fn fetch(&self, ip: usize) -> Opcode {
        self.ops.get(ip).copied().unwrap_or(Opcode::Halt)
    }

    /// Length including the terminal marker.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Always false; the terminal marker is present even for an empty program.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_terminal_marker() {
        let table = DispatchTable::build(&Program::load("+[-]."));
        assert_eq!(table.len(), 6);
        assert_eq!(table.fetch(0), Opcode::Increment);
        assert_eq!(table.fetch(1), Opcode::JumpIfZero);
        assert_eq!(table.fetch(3), Opcode::JumpUnlessZero);
        assert_eq!(table.fetch(5), Opcode::Halt);
    }

    #[test]
    fn empty_program_is_just_halt() {
        let table = DispatchTable::build(&Program::load("no code here"));
        assert_eq!(table.len(), 1);
        assert!(!table.is_empty());
        assert_eq!(table.fetch(0), Opcode::Halt);
    }

    #[test]
    fn fetch_past_end_halts() {
        let table = DispatchTable::build(&Program::load(","));
        assert_eq!(table.fetch(0), Opcode::Input);
        assert_eq!(table.fetch(42), Opcode::Halt);
    }
}
