use std::error::Error;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use modelrun::cli::Cli;
use modelrun::error::Kind;

#[tokio::main]
async fn main() {
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_env("RUST_LOG").unwrap_or_else(|_| EnvFilter::new("info")))
		.init();

	let cli = Cli::parse();
	let debug = cli.debug;
	if let Err(err) = modelrun::run(cli).await {
		// EndianMismatch prints no stack; exits silently (spec.md §7).
		if err.kind() != Kind::EndianMismatch {
			if debug {
				tracing::error!("modelrun failed: {}", error_chain(&err));
			} else {
				tracing::error!(%err, "modelrun failed");
			}
		}
		std::process::exit(err.exit_code());
	}
}

/// Render an error and every `source()` behind it, one per line, for
/// `--debug` (spec.md §7: "every error is logged with its chain").
fn error_chain(err: &(dyn Error + 'static)) -> String {
	let mut out = err.to_string();
	let mut cause = err.source();
	while let Some(c) = cause {
		out.push_str("\ncaused by: ");
		out.push_str(&c.to_string());
		cause = c.source();
	}
	out
}
