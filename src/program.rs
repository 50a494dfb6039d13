//! Program loading: turn raw source text into a dense instruction sequence.

use std::fmt;

/// One of the eight significant symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Instruction {
    /// `+`
    Increment,
    /// `-`
    Decrement,
    /// `>`
    MoveRight,
    /// `<`
    MoveLeft,
    /// `[`
    LoopOpen,
    /// `]`
    LoopClose,
    /// `.`
    Output,
    /// `,`
    Input,
}

impl Instruction {
    /// Map a source character to its instruction, or `None` for anything that
    /// is not one of `+-><[].,`.
    pub fn from_char(c: char) -> Option<Self> {
        Some(match c {
            '+' => Instruction::Increment,
            '-' => Instruction::Decrement,
            '>' => Instruction::MoveRight,
            '<' => Instruction::MoveLeft,
            '[' => Instruction::LoopOpen,
            ']' => Instruction::LoopClose,
            '.' => Instruction::Output,
            ',' => Instruction::Input,
            _ => return None,
        })
    }

    /// Source character this instruction is written as.
    pub fn as_char(self) -> char {
        match self {
            Instruction::Increment => '+',
            Instruction::Decrement => '-',
            Instruction::MoveRight => '>',
            Instruction::MoveLeft => '<',
            Instruction::LoopOpen => '[',
            Instruction::LoopClose => ']',
            Instruction::Output => '.',
            Instruction::Input => ',',
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// A cleaned program.
///
/// Holds only the recognized instructions, in source order, together with the
/// character offset each one had in the original text. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    instructions: Vec<Instruction>,
    positions: Vec<usize>,
}

impl Program {
    /// Strip every non-instruction character from `source`.
    ///
    /// Never fails: comments, whitespace and empty input are all valid.
    pub fn load(source: &str) -> Self {
        let (instructions, positions): (Vec<Instruction>, Vec<usize>) = source
            .chars()
            .enumerate()
            .filter_map(|(pos, c)| Instruction::from_char(c).map(|i| (i, pos)))
            .unzip();

        let program = Self { instructions, positions };
        tracing::debug!(
            source_chars = source.chars().count(),
            instructions = program.len(),
            "program loaded"
        );
        program
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Instruction> {
        self.instructions.get(index).copied()
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Character offset in the original source of the instruction at `index`.
    pub fn source_position(&self, index: usize) -> Option<usize> {
        self.positions.get(index).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = Instruction> + '_ {
        self.instructions.iter().copied()
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for instr in &self.instructions {
            write!(f, "{instr}")?;
        }
        Ok(())
    }
}
