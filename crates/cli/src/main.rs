use std::process::ExitCode;

fn main() -> ExitCode {
    matreq_cli::run()
}
