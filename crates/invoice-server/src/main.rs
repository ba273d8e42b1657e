//! Invoice Server CLI
//!
//! Starts the HTTP server that extracts and stores uploaded invoices.

use invoice_server::{config::ServerConfig, init_tracing, start_server, ServerError};
use std::env;
use std::process;

#[tokio::main]
async fn main() {
    init_tracing();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run() -> Result<(), ServerError> {
    // Parse command-line arguments
    let args: Vec<String> = env::args().collect();

    let config = if args.len() > 2 && args[1] == "--config" {
        ServerConfig::from_file(&args[2])?
    } else if args.len() > 1 && args[1] == "--help" {
        print_help();
        process::exit(0);
    } else {
        ServerConfig::from_env()?
    };

    tracing::debug!(?config, "Loaded configuration");

    start_server(config).await?;

    Ok(())
}

fn print_help() {
    println!("Invoice Server - Extract and store uploaded invoices");
    println!();
    println!("USAGE:");
    println!("    invoice-server [--config <path-to-config.toml>]");
    println!();
    println!("OPTIONS:");
    println!("    --config <file>    Load configuration from TOML file");
    println!("    --help             Print this help message");
    println!();
    println!("Without --config, settings come from the environment (and .env):");
    println!("    GEMINI_API_KEY         API key for the extraction model (required)");
    println!("    GEMINI_MODEL           Model name (default: gemini-1.5-flash)");
    println!("    GEMINI_ENDPOINT        API base URL");
    println!("    GEMINI_TIMEOUT_SECS    Model request timeout (default: 60)");
    println!("    DB_BACKEND             postgres or sqlite (default: postgres)");
    println!("    DB_NAME, DB_USER, DB_PASSWORD, DB_HOST, DB_PORT");
    println!("                           PostgreSQL connection (port default: 5432)");
    println!("    DB_PATH                SQLite file (default: invoices.db)");
    println!("    BIND_ADDRESS           Listen address (default: 0.0.0.0)");
    println!("    BIND_PORT              Listen port (default: 8000)");
    println!("    MAX_UPLOAD_BYTES       Largest accepted upload (default: 20971520)");
    println!("    RUST_LOG               Log filter (default: info)");
    println!();
}
