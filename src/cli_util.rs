use std::fmt::Write as _;
use std::io::{self, IsTerminal, Write};
use std::time::Duration;

use nu_ansi_term::Color;

use crate::engine::RunStats;
use crate::error::{Error, RuntimeFault, SyntaxError};
use crate::program::Program;

/// Pretty-print an [`Error`], with a caret under the offending instruction
/// for syntax errors and runtime faults.
///
/// `source` is the original program text and `program` its loaded form, used
/// to map instruction indices back to source positions.
pub fn print_error(program_name: &str, source: &str, program: Option<&Program>, err: &Error) {
    let prefix = |msg: &str| format!("{program_name}: {} {msg}", label("error:"));

    match err {
        Error::Syntax(syntax) => {
            let msg = match syntax {
                SyntaxError::UnmatchedOpenBracket { unclosed, .. } => {
                    format!("Parse error: unmatched bracket '[' ({unclosed} unclosed)")
                }
                SyntaxError::UnmatchedCloseBracket { .. } => {
                    "Parse error: unmatched bracket ']'".to_string()
                }
            };
            print_error_with_context(&prefix(&msg), source, syntax.position());
        }
        Error::Runtime(fault) => {
            let msg = match fault {
                RuntimeFault::PointerOutOfBounds { ptr, op, .. } => {
                    format!("Runtime error: pointer out of bounds (ptr={ptr}, op={op})")
                }
                RuntimeFault::Io { source, .. } => format!("I/O error: {source}"),
            };
            let pos = program
                .and_then(|p| p.source_position(fault.ip()))
                .unwrap_or(fault.ip());
            print_error_with_context(&prefix(&msg), source, pos);
        }
        Error::Load(_) | Error::Config(_) => {
            eprintln!("{}", prefix(&err.to_string()));
            let _ = io::stderr().flush();
        }
    }
}

fn label(text: &str) -> String {
    if io::stderr().is_terminal() {
        Color::Red.bold().paint(text).to_string()
    } else {
        text.to_string()
    }
}

/// Print a concise error with source position and a caret context window,
/// working with UTF-8 by slicing using char indices.
pub fn print_error_with_context(prefix: &str, code: &str, pos: usize) {
    eprintln!("{prefix} at position {pos}");
    eprint!("{}", context_window(code, pos));
    let _ = io::stderr().flush();
}

/// Two lines: a window of `code` around char `pos`, then a caret under it.
fn context_window(code: &str, pos: usize) -> String {
    // Show a short window around the position for context
    const WINDOW_CHARS: usize = 32;

    let total_chars = code.chars().count();
    let start_char = pos.saturating_sub(WINDOW_CHARS);
    let end_char = (pos + WINDOW_CHARS + 1).min(total_chars);

    let start_byte = char_to_byte_index(code, start_char);
    let end_byte = char_to_byte_index(code, end_char);
    // Newlines in the window would break the caret alignment
    let slice: String = code[start_byte..end_byte]
        .chars()
        .map(|c| if c == '\n' || c == '\r' || c == '\t' { ' ' } else { c })
        .collect();

    // Caret under the exact position
    let caret_offset_chars = pos.saturating_sub(start_char);
    format!("  {slice}\n  {}^\n", " ".repeat(caret_offset_chars))
}

/// Convert a char index into a byte index in the given UTF-8 string.
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(byte_idx, _)| byte_idx)
        .unwrap_or(s.len())
}

/// What to print once the machine has stopped.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportOptions {
    pub show_instructions: bool,
    pub show_timing: bool,
}

/// Post-run statistics block, starting with the newline that separates it
/// from program output.
pub fn format_report(
    stats: RunStats,
    elapsed: Duration,
    options: ReportOptions,
    memory_dump: Option<&[u8]>,
) -> String {
    let mut out = String::new();

    if options.show_instructions {
        let _ = write!(out, "\nNumber of instructions: {}", stats.instructions);
    }

    if options.show_timing {
        let secs = elapsed.as_secs_f64();
        let _ = write!(out, "\nTime: {secs} seconds");
        if secs > 0.0 {
            let _ = write!(out, "\nInstructions per second: {:.0}", stats.instructions as f64 / secs);
        } else {
            let _ = write!(out, "\nInstructions per second: n/a");
        }
    }

    if let Some(memory) = memory_dump {
        out.push('\n');
        for cell in memory {
            let _ = write!(out, "{cell:02X} ");
        }
    }

    out.push('\n');
    out
}
