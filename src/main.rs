//! Relay binary entry point.

// std
use std::process::ExitCode;
// crates.io
use clap::Parser;
// self
use spotify_relay::{config::Cli, obs, server};

#[tokio::main]
async fn main() -> ExitCode {
	let cli = Cli::parse();

	if let Err(e) = obs::setup_tracing(&cli.log_level, cli.log_format) {
		eprintln!("{e}");

		return ExitCode::FAILURE;
	}

	let result = match cli.settings() {
		Ok(settings) => server::run(settings).await,
		Err(e) => Err(e.into()),
	};

	match result {
		Ok(()) => ExitCode::SUCCESS,
		Err(e) => {
			tracing::error!(error = %e, "Relay exited with an error.");

			ExitCode::FAILURE
		},
	}
}
