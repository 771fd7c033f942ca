use clap::Parser;
use imoji_cli::cli::Cli;
use imoji_cli::config::CliConfig;
use imoji_cli::{commands, logging};
use tracing::error;

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	let result = async {
		let config = CliConfig::load(cli.config.as_deref())?
			.with_env_overrides(|key| std::env::var(key).ok())
			.with_api_url(cli.api_url);
		commands::dispatch(cli.command, &config).await
	}
	.await;

	if let Err(err) = result {
		error!(target = "imoji", error = %format!("{err:#}"), "command failed");
		std::process::exit(1);
	}
}
