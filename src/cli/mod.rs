//! CLI module for medgate
//!
//! Provides commands:
//! - `serve`: Start the HTTP gateway (default)
//! - `models`: Show every configured model and whether it is available
//! - `ask`: Dispatch one prompt through the failover router
//! - `doctor`: Check credentials and probe each provider

use crate::server::{build_router, load_config, validate_config};
use anyhow::Context;
use clap::{Parser, Subcommand};
use medgate_llm::FailoverRouter;
use std::path::PathBuf;
use std::sync::Arc;

pub mod ask;
pub mod doctor;
pub mod models;

/// Multi-provider LLM failover gateway
#[derive(Parser, Debug)]
#[command(name = "medgate")]
#[command(about = "Multi-provider LLM failover gateway")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,
    /// List configured models with availability
    Models,
    /// Send one prompt through the failover router
    Ask {
        /// Prompt text
        prompt: String,
        /// Image URL or data URI; makes this a vision request
        #[arg(long)]
        vision_image: Option<String>,
        /// Model to try first
        #[arg(long)]
        model: Option<String>,
        /// System prompt
        #[arg(long)]
        system: Option<String>,
        /// Print the attempt log
        #[arg(long, short)]
        verbose: bool,
    },
    /// Check credentials and probe each provider
    Doctor,
    /// Write an annotated configuration file
    Config {
        /// Destination, stdout when absent
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

/// Load, validate and build the router from configuration
pub(crate) fn load_router() -> anyhow::Result<Arc<FailoverRouter>> {
    let config = load_config().context("Failed to load configuration")?;
    validate_config(&config)?;
    build_router(&config.llm)
}

/// Run the CLI command
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Some(Commands::Serve) | None => crate::server::run().await,
        Some(Commands::Models) => models::run().await,
        Some(Commands::Ask {
            prompt,
            vision_image,
            model,
            system,
            verbose,
        }) => {
            ask::run(ask::AskArgs {
                prompt,
                vision_image,
                model,
                system,
                verbose,
            })
            .await
        }
        Some(Commands::Doctor) => doctor::run().await,
        Some(Commands::Config { output }) => write_default_config(output),
    }
}

fn write_default_config(output: Option<PathBuf>) -> anyhow::Result<()> {
    let content = crate::server::DEFAULT_CONFIG;
    match output {
        Some(path) => {
            if path.exists() {
                anyhow::bail!("{} already exists", path.display());
            }
            std::fs::write(&path, content)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("✅ Wrote {}", path.display());
        }
        None => print!("{content}"),
    }
    Ok(())
}
