//! Export the gateway OpenAPI document as JSON
//!
//! Usage:
//!   cargo run --bin export_openapi > openapi.json
//!   cargo run --bin export_openapi -- --output docs/openapi.json

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use utoipa::OpenApi;
use wallet_gateway::gateway::openapi::ApiDoc;

#[derive(Parser, Debug)]
#[command(name = "export_openapi", about = "Write the wallet gateway OpenAPI document")]
struct Cli {
    /// Write to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let json = ApiDoc::openapi()
        .to_pretty_json()
        .context("Failed to serialize OpenAPI document")?;

    match cli.output {
        Some(path) => {
            std::fs::write(&path, &json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("OpenAPI document written to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}
