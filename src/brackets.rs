//! Loop matching.
//!
//! A single left-to-right pass pairs every `[` with its `]` so the machine can
//! enter or leave a loop with one table lookup.

use crate::error::SyntaxError;
use crate::program::{Instruction, Program};

/// Partner index for every bracket in a program.
///
/// `jumps[i]` is `Some(j)` when instruction `i` is a bracket whose partner is
/// at `j`, and `None` for every other instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JumpTable {
    jumps: Vec<Option<usize>>,
}

impl JumpTable {
    /// Match the brackets in `program`.
    pub fn build(program: &Program) -> Result<Self, SyntaxError> {
        let mut jumps: Vec<Option<usize>> = vec![None; program.len()];
        let mut stack: Vec<usize> = Vec::new();

        for (i, instr) in program.iter().enumerate() {
            match instr {
                Instruction::LoopOpen => stack.push(i),
                Instruction::LoopClose => {
                    let Some(open_index) = stack.pop() else {
                        return Err(SyntaxError::UnmatchedCloseBracket {
                            index: i,
                            position: program.source_position(i).unwrap_or(i),
                        });
                    };
                    jumps[open_index] = Some(i);
                    jumps[i] = Some(open_index);
                }
                _ => {}
            }
        }

        if let Some(unmatched_open) = stack.last().copied() {
            return Err(SyntaxError::UnmatchedOpenBracket {
                index: unmatched_open,
                position: program.source_position(unmatched_open).unwrap_or(unmatched_open),
                unclosed: stack.len(),
            });
        }

        let table = Self { jumps };
        tracing::debug!(pairs = table.pairs(), "jump table built");
        Ok(table)
    }

    /// Partner of the bracket at `index`.
    pub fn target(&self, index: usize) -> Option<usize> {
        self.jumps.get(index).copied().flatten()
    }

    /// Number of matched bracket pairs.
    pub fn pairs(&self) -> usize {
        self.jumps.iter().filter(|j| j.is_some()).count() / 2
    }

    pub fn len(&self) -> usize {
        self.jumps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jumps.is_empty()
    }
}
