use std::process::ExitCode;

fn main() -> ExitCode {
    shipcalc_cli::run()
}
