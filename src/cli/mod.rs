pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "kinder-api")]
#[command(about = "Kinder API - kindergarten management server")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP server with a seeded in-memory store (default)")]
    Serve {
        #[arg(long, help = "Port to bind, overrides configuration")]
        port: Option<u16>,
        #[arg(long, help = "Start with an empty store instead of the demo data")]
        no_seed: bool,
    },

    #[command(about = "Issue a bearer token for local testing")]
    Token {
        #[arg(long, help = "User id placed in the token subject")]
        user_id: i64,
        #[arg(long)]
        username: String,
        #[arg(long, help = "admin, principal, teacher or parent")]
        role: String,
    },

    #[command(about = "Inspect the effective configuration and rule sets")]
    Inspect {
        #[command(subcommand)]
        cmd: commands::inspect::InspectCommands,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        None => commands::serve::handle(None, false).await,
        Some(Commands::Serve { port, no_seed }) => commands::serve::handle(port, no_seed).await,
        Some(Commands::Token { user_id, username, role }) => {
            commands::token::handle(user_id, &username, &role, output_format)
        }
        Some(Commands::Inspect { cmd }) => commands::inspect::handle(cmd, output_format),
    }
}
