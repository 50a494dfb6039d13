use bfvm::commands::run::{self, RunArgs};
use clap::Parser;
use std::env;
use std::path::Path;

#[derive(Parser, Debug)]
#[command(name = "bfvm", disable_help_flag = true)]
struct Cli {
    #[command(flatten)]
    args: RunArgs,
}

fn main() {
    bfvm::logging::init();

    // Pull the program name for help and diagnostics
    let program = env::args()
        .next()
        .and_then(|arg0| Path::new(&arg0).file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| String::from("bfvm"));

    let cli = Cli::parse();
    let code = run::run(&program, cli.args);

    std::process::exit(code);
}
