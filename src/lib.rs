//! A tape-machine interpreter for Brainfuck.
//!
//! The interpreter runs in four stages:
//! - [`Program::load`] strips everything but the eight instructions `+-><[].,`
//!   and remembers where each one sat in the source.
//! - [`JumpTable::build`] pairs every `[` with its `]` in one pass; unbalanced
//!   loops are rejected with a [`SyntaxError`] before anything runs.
//! - [`DispatchTable::build`] decodes the program into opcodes and appends a
//!   terminal `Halt`.
//! - [`Machine`] executes the opcodes against a zeroed byte tape (30,000
//!   cells by default), reading `,` from an [`Input`] and writing `.` to an
//!   [`Output`].
//!
//! Quick start:
//!
//! ```no_run
//! use bfvm::{EofPolicy, Input, Machine};
//!
//! // Classic "Hello World!"
//! let code = "++++++++++[>+++++++>++++++++++>+++>+<<<<-]>++.>+.+++++++..+++.>++.<<+++++++++++++++.>.+++.------.--------.>+.>.";
//! let mut bf = Machine::new(code).expect("program should load");
//! bf.set_input(Input::from_bytes(Vec::new(), EofPolicy::Zero));
//! bf.run().expect("program should run");
//! println!(); // ensure a trailing newline for readability
//! ```

pub mod brackets;
pub mod cli_util;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod io;
pub mod logging;
pub mod program;

pub use brackets::JumpTable;
pub use config::Settings;
pub use dispatch::{DispatchTable, Opcode};
pub use engine::{Halt, Machine, PointerPolicy, RunStats, StepControl, DEFAULT_TAPE_SIZE};
pub use error::{ConfigError, Error, LoadError, RuntimeFault, SyntaxError};
pub use io::{EofPolicy, Input, Output, SharedBuffer};
pub use program::{Instruction, Program};
