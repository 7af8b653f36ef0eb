//! Command-line interface.

pub mod commands;
pub mod output;
pub mod types;

pub use types::{Cli, Commands};

use crate::domain::models::Config;

/// Run the parsed command with the loaded configuration.
pub async fn dispatch(command: Commands, config: Config, json_mode: bool) -> anyhow::Result<()> {
    match command {
        Commands::FindLines(args) => commands::find_lines::execute(args, config, json_mode).await,
        Commands::Generate(args) => commands::generate::execute(args, config, json_mode).await,
        Commands::Run(args) => commands::run::execute(args, config, json_mode).await,
        Commands::Pytest(args) => commands::pytest::execute(args, config, json_mode).await,
    }
}

/// Print an error the way the chosen output mode expects, then exit.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let causes: Vec<String> = err.chain().skip(1).map(ToString::to_string).collect();
        let body = serde_json::json!({
            "error": err.to_string(),
            "causes": causes,
        });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("{} {err:#}", console::style("error:").red().bold());
    }
    std::process::exit(1);
}
