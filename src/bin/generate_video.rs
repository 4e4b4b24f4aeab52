use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use comfy_cloud_video::cli::{self, Cli};
use comfy_cloud_video::logging::{self, LoggingOptions};
use comfy_cloud_video::CloudError;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            // --help and --version are not failures
            return if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    logging::init(&LoggingOptions::from_env(cli.verbose, cli.log_filter.clone()));

    match cli::run(cli, cli::api_key_from_env()).await {
        Ok(result) => match serde_json::to_string(&result) {
            Ok(line) => {
                println!("{line}");
                ExitCode::SUCCESS
            }
            Err(err) => {
                eprintln!("Error: {err}");
                ExitCode::FAILURE
            }
        },
        Err(err) => {
            tracing::debug!(error = ?err, "generation failed");
            eprintln!("Error: {err}");
            if matches!(err, CloudError::MissingCredential | CloudError::MissingPrompt) {
                eprintln!("{}", Cli::command().render_usage());
            }
            ExitCode::FAILURE
        }
    }
}
