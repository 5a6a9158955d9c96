pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "trongate")]
#[command(about = "Trongate CLI - Inspect endpoint settings, filters and routing offline")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Render the SQL and parameters a filter would produce")]
    Explain(commands::explain::ExplainArgs),

    #[command(about = "Built-in endpoints and per-table settings documents")]
    Endpoints {
        #[command(subcommand)]
        cmd: commands::endpoints::EndpointCommands,
    },

    #[command(about = "Show which endpoint a method and path dispatch to")]
    Resolve(commands::resolve::ResolveArgs),

    #[command(about = "Remote server checks")]
    Server {
        #[command(subcommand)]
        cmd: commands::server::ServerCommands,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
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
        Commands::Explain(args) => commands::explain::handle(args, output_format),
        Commands::Endpoints { cmd } => commands::endpoints::handle(cmd, output_format).await,
        Commands::Resolve(args) => commands::resolve::handle(args, output_format),
        Commands::Server { cmd } => commands::server::handle(cmd, output_format).await,
    }
}
