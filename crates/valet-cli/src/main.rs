use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout = io::stdout();
    let mut stderr = io::stderr();
    valet_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
