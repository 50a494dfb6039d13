//! The execution engine.
//!
//! A [`Machine`] owns everything a run needs: the cleaned program, its jump
//! and dispatch tables, the tape, both pointers, the instruction counter and
//! the I/O adapters. Construction loads and validates the source, so a
//! machine that exists is always runnable.
//!
//! Behavior:
//! - Tape of `tape_size` cells (30,000 by default), initialized to 0.
//! - Cell arithmetic wraps modulo 256.
//! - Pointer movement past either end of the tape faults under
//!   [`PointerPolicy::Strict`] and wraps around under [`PointerPolicy::Wrap`].
//! - `,` reads through [`Input`]; end of input follows its [`EofPolicy`](crate::EofPolicy).
//! - `.` writes through [`Output`], flushing every byte.
//! - Loops jump in O(1) through the precomputed [`JumpTable`].
//!
//! ```
//! use bfvm::{Halt, Machine, Output, SharedBuffer};
//!
//! let out = SharedBuffer::new();
//! let mut machine = Machine::new("++++++++[>++++++++<-]>+.").expect("balanced program");
//! machine.set_output(Output::new(out.clone()));
//!
//! assert_eq!(machine.run().expect("no fault"), Halt::Completed);
//! assert_eq!(out.contents(), b"A");
//! ```

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use crate::brackets::JumpTable;
use crate::dispatch::{DispatchTable, Opcode};
use crate::error::{ConfigError, Error, RuntimeFault};
use crate::io::{EofPolicy, Input, Output};
use crate::program::Program;

pub const DEFAULT_TAPE_SIZE: usize = 30_000;

/// What happens when the data pointer would leave the tape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerPolicy {
    /// Raise [`RuntimeFault::PointerOutOfBounds`].
    #[default]
    Strict,
    /// Continue from the opposite end of the tape.
    Wrap,
}

/// Why a run stopped without faulting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Halt {
    /// The instruction pointer reached the end of the program.
    Completed,
    /// The cancellation flag was raised.
    Interrupted,
    /// The configured instruction budget ran out.
    StepLimit { limit: u64 },
}

/// Counters accumulated during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunStats {
    /// Instructions executed so far; the terminal marker is not counted.
    pub instructions: u64,
}

/// Controls for cooperative cancellation and step limiting.
#[derive(Debug, Clone, Default)]
pub struct StepControl {
    pub max_steps: Option<u64>,
    pub cancel_flag: Arc<AtomicBool>,
}

impl StepControl {
    pub fn new(max_steps: Option<u64>, cancel_flag: Arc<AtomicBool>) -> Self {
        Self { max_steps, cancel_flag }
    }
}

pub struct Machine {
    program: Program,
    jumps: JumpTable,
    dispatch: DispatchTable,
    memory: Vec<u8>,
    pointer: usize,
    ip: usize,
    stats: RunStats,
    pointer_policy: PointerPolicy,
    input: Input,
    output: Output,
}

impl Machine {
    /// Load `source` onto a 30,000-cell tape.
    ///
    /// Input comes from stdin with [`EofPolicy::Unchanged`] and output goes to
    /// stdout until replaced with [`Machine::set_input`] / [`Machine::set_output`].
    pub fn new(source: &str) -> Result<Self, Error> {
        Self::new_with_memory(source, DEFAULT_TAPE_SIZE)
    }

    /// Load `source` onto a tape of `memory_size` cells.
    pub fn new_with_memory(source: &str, memory_size: usize) -> Result<Self, Error> {
        Self::from_program(Program::load(source), memory_size)
    }

    /// Validate an already loaded program and build its tables.
    pub fn from_program(program: Program, memory_size: usize) -> Result<Self, Error> {
        if memory_size == 0 {
            return Err(ConfigError::ZeroTapeSize.into());
        }
        let jumps = JumpTable::build(&program)?;
        let dispatch = DispatchTable::build(&program);

        let mut memory = Vec::new();
        memory
            .try_reserve_exact(memory_size)
            .map_err(|_| ConfigError::TapeTooLarge(memory_size))?;
        memory.resize(memory_size, 0);

        Ok(Self {
            program,
            jumps,
            dispatch,
            memory,
            pointer: 0,
            ip: 0,
            stats: RunStats::default(),
            pointer_policy: PointerPolicy::default(),
            input: Input::stdin(EofPolicy::default()),
            output: Output::stdout(),
        })
    }

    pub fn set_input(&mut self, input: Input) {
        self.input = input;
    }

    pub fn set_output(&mut self, output: Output) {
        self.output = output;
    }

    pub fn set_pointer_policy(&mut self, policy: PointerPolicy) {
        self.pointer_policy = policy;
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn memory(&self) -> &[u8] {
        &self.memory
    }

    /// Current data pointer.
    pub fn pointer(&self) -> usize {
        self.pointer
    }

    /// Index of the next instruction to execute.
    pub fn ip(&self) -> usize {
        self.ip
    }

    pub fn stats(&self) -> RunStats {
        self.stats
    }

    /// Execute until the end of the program.
    pub fn run(&mut self) -> Result<Halt, RuntimeFault> {
        self.execute(None)
    }

    /// Execute with cooperative cancellation and an optional step limit.
    ///
    /// The flag is checked before every instruction, so a raised flag stops the
    /// machine after at most the instruction already in flight. A halted
    /// machine keeps its state; calling a run method again resumes at [`Machine::ip`].
    pub fn run_with_control(&mut self, step_control: &StepControl) -> Result<Halt, RuntimeFault> {
        self.execute(Some(step_control))
    }

    fn execute(&mut self, step_control: Option<&StepControl>) -> Result<Halt, RuntimeFault> {
        let cancel_flag = step_control.map(|ctrl| &*ctrl.cancel_flag);
        let max_steps = step_control.and_then(|ctrl| ctrl.max_steps);

        let halt = loop {
            if cancel_flag.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                break Halt::Interrupted;
            }

            let op = self.dispatch.fetch(self.ip);
            if op == Opcode::Halt {
                break Halt::Completed;
            }

            if let Some(limit) = max_steps {
                if self.stats.instructions >= limit {
                    break Halt::StepLimit { limit };
                }
            }

            tracing::trace!(
                ip = self.ip,
                ptr = self.pointer,
                cell = self.memory[self.pointer],
                op = ?op,
                "step"
            );
            self.step(op)?;

            self.stats.instructions += 1;
            self.ip += 1;
        };

        tracing::debug!(
            halt = ?halt,
            instructions = self.stats.instructions,
            ip = self.ip,
            ptr = self.pointer,
            "run finished"
        );
        Ok(halt)
    }

    /// Apply one opcode. Jumps only set `ip` to the partner bracket; the caller
    /// advances past it.
    #[inline]
    fn step(&mut self, op: Opcode) -> Result<(), RuntimeFault> {
        match op {
            Opcode::Increment => {
                self.memory[self.pointer] = self.memory[self.pointer].wrapping_add(1);
            }
            Opcode::Decrement => {
                self.memory[self.pointer] = self.memory[self.pointer].wrapping_sub(1);
            }
            Opcode::MoveRight => {
                if self.pointer + 1 < self.memory.len() {
                    self.pointer += 1;
                } else {
                    self.out_of_bounds('>')?;
                    self.pointer = 0;
                }
            }
            Opcode::MoveLeft => {
                if self.pointer > 0 {
                    self.pointer -= 1;
                } else {
                    self.out_of_bounds('<')?;
                    self.pointer = self.memory.len() - 1;
                }
            }
            Opcode::JumpIfZero => {
                if self.memory[self.pointer] == 0 {
                    self.ip = self.jump_target();
                }
            }
            Opcode::JumpUnlessZero => {
                if self.memory[self.pointer] != 0 {
                    self.ip = self.jump_target();
                }
            }
            Opcode::Output => {
                let byte = self.memory[self.pointer];
                self.output
                    .emit(byte)
                    .map_err(|source| RuntimeFault::Io { ip: self.ip, source })?;
            }
            Opcode::Input => {
                let current = self.memory[self.pointer];
                self.memory[self.pointer] = self
                    .input
                    .next_byte(current)
                    .map_err(|source| RuntimeFault::Io { ip: self.ip, source })?;
            }
            Opcode::Halt => {}
        }
        Ok(())
    }

    /// Fault under the strict policy; return normally when the pointer may wrap.
    fn out_of_bounds(&self, op: char) -> Result<(), RuntimeFault> {
        match self.pointer_policy {
            PointerPolicy::Strict => Err(RuntimeFault::PointerOutOfBounds {
                ip: self.ip,
                ptr: self.pointer,
                op,
            }),
            PointerPolicy::Wrap => Ok(()),
        }
    }

    // Every bracket has a partner once construction succeeded.
    fn jump_target(&self) -> usize {
        self.jumps.target(self.ip).unwrap_or(self.ip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyntaxError;
    use crate::io::SharedBuffer;
    use std::thread;
    use std::time::Duration;

    fn machine(code: &str, memory_size: usize) -> (Machine, SharedBuffer) {
        let out = SharedBuffer::new();
        let mut bf = Machine::new_with_memory(code, memory_size).expect("valid program");
        bf.set_output(Output::new(out.clone()));
        bf.set_input(Input::from_bytes(Vec::new(), EofPolicy::Zero));
        (bf, out)
    }

    #[test]
    fn comments_are_ignored() {
        let (mut bf, out) = machine("+a+ comment +.", 10);
        assert_eq!(bf.run().unwrap(), Halt::Completed);
        assert_eq!(out.contents(), vec![3]);
        assert_eq!(bf.stats().instructions, 4);
    }

    #[test]
    fn unmatched_open_bracket_fails_before_running() {
        let result = Machine::new_with_memory("[+", 10);
        assert!(matches!(
            result,
            Err(Error::Syntax(SyntaxError::UnmatchedOpenBracket { index: 0, .. }))
        ));
    }

    #[test]
    fn unmatched_close_bracket_fails_before_running() {
        let result = Machine::new_with_memory("+]", 10);
        assert!(matches!(
            result,
            Err(Error::Syntax(SyntaxError::UnmatchedCloseBracket { index: 1, .. }))
        ));
    }

    #[test]
    fn zero_tape_size_is_rejected() {
        assert!(matches!(
            Machine::new_with_memory("+", 0),
            Err(Error::Config(ConfigError::ZeroTapeSize))
        ));
    }

    #[test]
    fn oversized_tape_is_rejected_without_panicking() {
        assert!(matches!(
            Machine::new_with_memory("+", usize::MAX),
            Err(Error::Config(ConfigError::TapeTooLarge(usize::MAX)))
        ));
    }

    #[test]
    fn left_pointer_out_of_bounds_errors() {
        let (mut bf, _) = machine("<", 10);
        let result = bf.run();
        assert!(matches!(result, Err(RuntimeFault::PointerOutOfBounds { op: '<', ip: 0, ptr: 0 })));
    }

    #[test]
    fn right_pointer_out_of_bounds_errors() {
        // With 3 cells (0..=2), the 3rd '>' attempts to move beyond index 2.
        let memory_size = 3;
        let (mut bf, _) = machine(&">".repeat(memory_size), memory_size);
        let result = bf.run();
        assert!(matches!(result, Err(RuntimeFault::PointerOutOfBounds { op: '>', ip: 2, ptr: 2 })));
        assert_eq!(bf.stats().instructions, 2);
    }

    #[test]
    fn wrap_policy_wraps_both_ends() {
        let (mut bf, _) = machine("<+>>+", 3);
        bf.set_pointer_policy(PointerPolicy::Wrap);
        assert_eq!(bf.run().unwrap(), Halt::Completed);
        assert_eq!(bf.memory(), &[0, 1, 1]);
        assert_eq!(bf.pointer(), 1);
    }

    #[test]
    fn empty_loop_on_zero_cell_is_ok() {
        let (mut bf, _) = machine("[]", 10);
        assert_eq!(bf.run().unwrap(), Halt::Completed);
        assert_eq!(bf.stats().instructions, 1);
    }

    #[test]
    fn loop_counts_every_executed_bracket() {
        // '+' '+' then two passes through the body: '[' '-' ']' '-' ']'.
        let (mut bf, _) = machine("++[-]", 10);
        bf.run().unwrap();
        assert_eq!(bf.memory()[0], 0);
        assert_eq!(bf.stats().instructions, 2 + 1 + 2 * 2);
    }

    #[test]
    fn wrapping_subtraction() {
        let (mut bf, _) = machine("-", 1);
        bf.run().unwrap();
        assert_eq!(bf.memory()[0], 255);
    }

    #[test]
    fn wrapping_addition() {
        let (mut bf, _) = machine(&"+".repeat(256), 1);
        bf.run().unwrap();
        assert_eq!(bf.memory()[0], 0);
    }

    #[test]
    fn prints_capital_a() {
        let (mut bf, out) = machine("++++++++[>++++++++<-]>+.", DEFAULT_TAPE_SIZE);
        assert_eq!(bf.run().unwrap(), Halt::Completed);
        assert_eq!(out.contents(), vec![65]);
    }

    #[test]
    fn echoes_buffered_input() {
        let (mut bf, out) = machine(",.", 10);
        bf.set_input(Input::from_bytes(b"X".to_vec(), EofPolicy::Unchanged));
        bf.run().unwrap();
        assert_eq!(out.contents(), b"X");
    }

    #[test]
    fn exhausted_input_follows_policy() {
        for (policy, expected) in [(EofPolicy::Unchanged, 5u8), (EofPolicy::Zero, 0), (EofPolicy::Max, 255)] {
            let (mut bf, out) = machine("+++++,.", 10);
            bf.set_input(Input::from_bytes(Vec::new(), policy));
            bf.run().unwrap();
            assert_eq!(out.contents(), vec![expected], "policy {policy}");
        }
    }

    #[test]
    fn runs_are_deterministic() {
        let code = ",[.,]++++[>+++<-]>.";
        let run = || {
            let (mut bf, out) = machine(code, 16);
            bf.set_input(Input::from_bytes(b"hello".to_vec(), EofPolicy::Zero));
            bf.run().unwrap();
            (out.contents(), bf.stats())
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn step_limit_stops_after_exactly_n_instructions() {
        let (mut bf, _) = machine("+[]", 10);
        let ctrl = StepControl::new(Some(50), Arc::new(AtomicBool::new(false)));
        assert_eq!(bf.run_with_control(&ctrl).unwrap(), Halt::StepLimit { limit: 50 });
        assert_eq!(bf.stats().instructions, 50);
    }

    #[test]
    fn step_limit_equal_to_program_length_completes() {
        let (mut bf, _) = machine("+++", 10);
        let ctrl = StepControl::new(Some(3), Arc::default());
        assert_eq!(bf.run_with_control(&ctrl).unwrap(), Halt::Completed);
    }

    #[test]
    fn raised_flag_stops_before_first_step() {
        let (mut bf, out) = machine("+.", 10);
        let ctrl = StepControl::new(None, Arc::new(AtomicBool::new(true)));
        assert_eq!(bf.run_with_control(&ctrl).unwrap(), Halt::Interrupted);
        assert_eq!(bf.stats().instructions, 0);
        assert!(out.contents().is_empty());
    }

    #[test]
    fn interrupt_mid_run_keeps_partial_output() {
        // Print once, then spin forever.
        let (mut bf, out) = machine("+.[]", 10);
        let flag = Arc::new(AtomicBool::new(false));
        let ctrl = StepControl::new(None, flag.clone());

        let handle = thread::spawn(move || {
            let halt = bf.run_with_control(&ctrl);
            (halt.map_err(|e| e.to_string()), bf.stats())
        });
        thread::sleep(Duration::from_millis(50));
        flag.store(true, Ordering::Relaxed);

        let (halt, stats) = handle.join().expect("engine thread panicked");
        assert_eq!(halt, Ok(Halt::Interrupted));
        assert!(stats.instructions >= 3);
        assert_eq!(out.contents(), vec![1]);
    }

    #[test]
    fn interrupted_machine_resumes() {
        let (mut bf, out) = machine("+.+.", 10);
        let ctrl = StepControl::new(Some(2), Arc::default());
        assert_eq!(bf.run_with_control(&ctrl).unwrap(), Halt::StepLimit { limit: 2 });
        assert_eq!(bf.ip(), 2);
        assert_eq!(bf.run().unwrap(), Halt::Completed);
        assert_eq!(out.contents(), vec![1, 2]);
        assert_eq!(bf.stats().instructions, 4);
    }
}
