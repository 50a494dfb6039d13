use bfvm::{EofPolicy, Input, Machine, StepControl};

fn main() {
    // Echo the input back; stops at end of input (cell set to 0)
    let code = ",[.,]";

    let mut bf = match Machine::new(code) {
        Ok(bf) => bf,
        Err(err) => {
            eprintln!("bfvm: {err}");
            std::process::exit(1);
        }
    };
    bf.set_input(Input::from_bytes(b"Hello World!".to_vec(), EofPolicy::Zero));

    // Guard against runaway programs with a step budget
    let ctrl = StepControl::new(Some(10_000), Default::default());
    match bf.run_with_control(&ctrl) {
        Ok(halt) => {
            println!();
            println!("{halt:?} after {} instructions", bf.stats().instructions);
        }
        Err(fault) => {
            eprintln!("bfvm: {fault}");
            std::process::exit(1);
        }
    }
}
