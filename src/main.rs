//! Faultline CLI entry point.

use clap::Parser;

use faultline::cli::{dispatch, handle_error, Cli};
use faultline::infrastructure::config::ConfigLoader;
use faultline::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match ConfigLoader::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => handle_error(err, cli.json),
    };

    let _logger = match LoggerImpl::init(&LogConfig::from(&config.logging)) {
        Ok(logger) => Some(logger),
        Err(err) => {
            eprintln!("warning: logging disabled: {err}");
            None
        }
    };

    if let Err(err) = dispatch(cli.command, config, cli.json).await {
        handle_error(err, cli.json);
    }
}
