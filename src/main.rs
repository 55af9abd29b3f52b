//! sitegit binary entry point.

use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match sitegit::cli::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            sitegit::cli::report(&err);
            ExitCode::from(sitegit::cli::exit_code(&err))
        }
    }
}
