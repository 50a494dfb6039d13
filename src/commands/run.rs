use clap::Args;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crate::cli_util::{format_report, print_error, ReportOptions};
use crate::config::{self, Overrides};
use crate::engine::{Halt, Machine, StepControl};
use crate::error::{Error, LoadError};
use crate::io::{EofPolicy, Input, Output};
use crate::program::Program;

#[derive(Args, Debug)]
#[command(disable_help_flag = true)]
pub struct RunArgs {
    /// Program source file
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Program source given inline instead of a file
    #[arg(short = 'p', value_name = "TEXT", allow_hyphen_values = true)]
    pub program: Option<String>,

    /// All input bytes given inline instead of reading stdin
    #[arg(short = 'i', value_name = "TEXT", allow_hyphen_values = true)]
    pub input: Option<String>,

    /// End-of-input policy: 0 = unchanged, 1 = zero, 2 = max byte
    #[arg(short = 'e', value_name = "0|1|2", allow_hyphen_values = true)]
    pub eof: Option<String>,

    /// Print the number of executed instructions after the run
    #[arg(short = 'n')]
    pub count: bool,

    /// Tape size in cells (fallback BFVM_TAPE_SIZE; default 30000)
    #[arg(short = 'm', value_name = "BYTES")]
    pub tape_size: Option<usize>,

    /// Print elapsed time and instructions per second after the run
    #[arg(short = 't')]
    pub timer: bool,

    /// Dump the final tape as hex after the run
    #[arg(short = 'd')]
    pub dump: bool,

    /// Maximum instructions before halting (fallback BFVM_MAX_STEPS; default unlimited)
    #[arg(long = "max-steps", value_name = "N")]
    pub max_steps: Option<u64>,

    /// Wrap the data pointer around the tape ends instead of faulting
    #[arg(long = "wrap")]
    pub wrap: bool,

    /// Show this help
    #[arg(short = 'h', long = "help", action = clap::ArgAction::SetTrue)]
    pub help: bool,
}

pub fn run(program: &str, args: RunArgs) -> i32 {
    if args.help {
        usage_and_exit(program, 0);
    }

    let RunArgs {
        file,
        program: inline_program,
        input,
        eof,
        count,
        tape_size,
        timer,
        dump,
        max_steps,
        wrap,
        ..
    } = args;

    let source = match load_source(file.as_deref(), inline_program) {
        Ok(s) => s,
        Err(e) => {
            print_error(program, "", None, &Error::from(e));
            return 1;
        }
    };

    let eof = match eof.as_deref().map(str::parse::<EofPolicy>).transpose() {
        Ok(policy) => policy,
        Err(e) => {
            print_error(program, &source, None, &Error::from(e));
            return 1;
        }
    };

    // Resolve settings: flags -> env -> config file -> defaults
    let cli = Overrides {
        eof,
        tape_size,
        max_steps,
        wrap: wrap.then_some(true),
    };
    let settings = match config::resolve(cli) {
        Ok(s) => s,
        Err(e) => {
            print_error(program, &source, None, &Error::from(e));
            return 1;
        }
    };

    // Loading and bracket matching happen before anything touches the tape
    let mut machine = match Machine::from_program(Program::load(&source), settings.tape_size) {
        Ok(m) => m,
        Err(e) => {
            print_error(program, &source, None, &e);
            return 1;
        }
    };

    machine.set_pointer_policy(settings.pointer_policy);
    machine.set_output(Output::stdout());
    machine.set_input(match input {
        Some(text) => Input::from_bytes(text.into_bytes(), settings.eof),
        None => Input::stdin(settings.eof),
    });

    // SIGINT (ctrl+c) only raises the flag; the machine stops on its next step
    let cancel = Arc::new(AtomicBool::new(false));
    let cancel_handler = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        cancel_handler.store(true, Ordering::Relaxed);
    }) {
        eprintln!("{program}: failed to set ctrl+c handler: {e}");
        let _ = io::stderr().flush();
        return 1;
    }

    let ctrl = StepControl::new(settings.max_steps, cancel);
    let started = Instant::now();
    let result = machine.run_with_control(&ctrl);
    let elapsed = started.elapsed();

    let halt = match result {
        Ok(halt) => halt,
        Err(fault) => {
            let _ = io::stdout().flush();
            print_error(program, &source, Some(machine.program()), &Error::from(fault));
            return 1;
        }
    };

    match halt {
        Halt::Completed => {}
        Halt::Interrupted => {
            eprintln!("Execution interrupted after {} instructions", machine.stats().instructions);
        }
        Halt::StepLimit { limit } => {
            eprintln!("Execution halted: step limit reached ({limit})");
        }
    }
    let _ = io::stderr().flush();

    let options = ReportOptions {
        show_instructions: count,
        show_timing: timer,
    };
    let report = format_report(
        machine.stats(),
        elapsed,
        options,
        dump.then(|| machine.memory()),
    );
    let mut stdout = io::stdout().lock();
    let _ = stdout.write_all(report.as_bytes());
    let _ = stdout.flush();
    0
}

/// Program text from `-p` or from the file at `file`, never both.
fn load_source(file: Option<&Path>, inline: Option<String>) -> Result<String, LoadError> {
    match (file, inline) {
        (Some(_), Some(_)) => Err(LoadError::Conflict),
        (None, Some(text)) => Ok(text),
        (None, None) => Err(LoadError::NoProgram),
        (Some(path), None) => {
            if !path.exists() {
                return Err(LoadError::NotFound { path: path.to_path_buf() });
            }
            // Only the eight instruction symbols matter, so invalid UTF-8 elsewhere is harmless
            let bytes = fs::read(path).map_err(|source| LoadError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            tracing::debug!(path = %path.display(), bytes = bytes.len(), "program file read");
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
    }
}

fn usage_and_exit(program: &str, code: i32) -> ! {
    eprintln!(
        r#"Usage:
  {0} [OPTIONS] <FILE>      # Run the program in FILE
  {0} [OPTIONS] -p <TEXT>   # Run the program given inline

Options:
  -p <TEXT>          Program source inline instead of a file
  -i <TEXT>          Input bytes inline instead of reading stdin
  -e <0|1|2>         Cell value when input runs out: 0 unchanged, 1 zero, 2 max byte
  -n                 Print the number of executed instructions
  -m <BYTES>         Tape size in cells (default 30000)
  -t                 Print elapsed time and instructions per second
  -d                 Dump the final tape as hex bytes
  --max-steps <N>    Halt after N instructions
  --wrap             Wrap the data pointer instead of faulting at the tape ends
  --help, -h         Show this help

Environment:
  BFVM_EOF, BFVM_TAPE_SIZE, BFVM_MAX_STEPS   Fallbacks for -e, -m and --max-steps
  BFVM_LOG                                   Log filter (e.g. "bfvm=debug")

Notes:
- Only the eight symbols + - > < [ ] . , are significant; everything else is a comment.
- Settings may also be placed in the [engine] section of bfvm.toml in your config directory.
- Ctrl+C stops the program; requested statistics are still printed.

Examples:
    {0} -n ./hello.bf
    {0} -p ",[.,]" -i "echo me" -e 1
"#,
        program
    );
    let _ = io::stderr().flush();
    std::process::exit(code);
}
