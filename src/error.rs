//! Error taxonomy for loading, validating and running a program.
//!
//! Load and syntax errors are produced before the machine touches the tape.
//! Runtime faults abort a run in progress. Interrupts and step limits are not
//! errors; they are reported through [`crate::engine::Halt`].

use std::path::PathBuf;

/// The source program could not be obtained.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// Neither a program file nor inline program text was supplied.
    #[error("no program given")]
    NoProgram,

    /// A program file and inline program text were both supplied.
    #[error("cannot use a program file together with -p")]
    Conflict,

    #[error("program not found: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read program {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Loops were not balanced.
///
/// `index` is the offset in the cleaned program, `position` the character
/// offset of the same bracket in the original source text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyntaxError {
    #[error("unmatched '[' at instruction {index} ({unclosed} unclosed)")]
    UnmatchedOpenBracket {
        index: usize,
        position: usize,
        unclosed: usize,
    },

    #[error("unmatched ']' at instruction {index}")]
    UnmatchedCloseBracket { index: usize, position: usize },
}

impl SyntaxError {
    /// Character offset of the offending bracket in the source text.
    pub fn position(&self) -> usize {
        match self {
            SyntaxError::UnmatchedOpenBracket { position, .. }
            | SyntaxError::UnmatchedCloseBracket { position, .. } => *position,
        }
    }
}

/// A fatal fault raised while the machine is running.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeFault {
    /// The data pointer attempted to move left of cell 0 or beyond the last cell.
    #[error("pointer out of bounds at instruction {ip} (ptr={ptr}, op='{op}')")]
    PointerOutOfBounds { ip: usize, ptr: usize, op: char },

    /// Reading input or writing output failed.
    #[error("I/O error at instruction {ip}: {source}")]
    Io {
        ip: usize,
        #[source]
        source: std::io::Error,
    },
}

impl RuntimeFault {
    /// Instruction index the fault was raised at.
    pub fn ip(&self) -> usize {
        match self {
            RuntimeFault::PointerOutOfBounds { ip, .. } | RuntimeFault::Io { ip, .. } => *ip,
        }
    }
}

/// Invalid runtime configuration value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid end-of-input policy '{0}' (expected 0, 1 or 2)")]
    InvalidEofPolicy(String),

    #[error("tape size must be at least 1 cell")]
    ZeroTapeSize,

    /// The tape could not be allocated.
    #[error("tape of {0} cells is too large to allocate")]
    TapeTooLarge(usize),
}

/// Any error the crate can produce.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    Runtime(#[from] RuntimeFault),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
