use std::io::{self, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    let result = ctilinkd::run_daemon();
    if let Err(error) = &result {
        let mut stderr = io::stderr().lock();
        if writeln!(stderr, "ctilinkd: {error}").is_err() {
            return ExitCode::FAILURE;
        }
    }
    ctilinkd::exit_code(&result)
}
