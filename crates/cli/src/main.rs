use std::process::ExitCode;

fn main() -> ExitCode {
    solquote_cli::run()
}
