use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use move_call_cli::cli::Cli;
use move_call_cli::commands;

#[tokio::main]
async fn main() -> Result<()> {
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("move_call_cli=info")))
		.with_writer(std::io::stderr)
		.with_target(false)
		.init();

	let cli = Cli::parse();
	commands::run(&cli).await
}
