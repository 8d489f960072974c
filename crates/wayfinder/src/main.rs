// The binary uses the library, not duplicate modules
use std::process::ExitCode;
use wayfinder::{Settings, run, setup_logging};

fn main() -> ExitCode {
    let settings = Settings::from_cli();
    setup_logging(settings.verbose);

    match run(&settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(%err, "Command failed");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
