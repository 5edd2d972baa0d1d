use std::process::ExitCode;

use ryot_influx_sync::cli::cli_main;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    match cli_main().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
