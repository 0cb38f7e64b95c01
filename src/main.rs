mod agent;
mod cli;
mod dispatcher;
mod error;
mod logging;
mod memory_log;
mod model;
mod monitor;
mod notice;
mod orchestrator;
#[cfg(test)]
mod testkit;
mod text_summary;
#[cfg(feature = "tui")]
mod tui;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let is_json = args.json;

    match cli::run(args).await {
        Ok(()) => Ok(()),
        Err(e) => {
            if is_json && e.downcast_ref::<cli::Reported>().is_some() {
                // The command already printed its JSON result.
                std::process::exit(1);
            } else if is_json {
                // Keep stdout machine-readable in JSON mode.
                println!("{}", serde_json::json!({ "error": format!("{e:#}") }));
                std::process::exit(1);
            } else {
                Err(e)
            }
        }
    }
}
