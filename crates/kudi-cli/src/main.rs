//! kudi CLI - bank-alert reconciliation engine
//!
//! Usage:
//!   kudi init                        Initialize the store
//!   kudi request add TX-1 5000       Register a pending request
//!   kudi ingest alert.eml            Reconcile an inbound alert
//!   kudi attempts --result matched   Inspect the audit log

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db),
        Commands::Request { action } => {
            let db = commands::open_db(&cli.db)?;
            match action {
                RequestAction::Add {
                    reference,
                    amount,
                    payer,
                    account,
                    expires_minutes,
                } => commands::cmd_request_add(
                    &db,
                    &reference,
                    amount,
                    payer.as_deref(),
                    account.as_deref(),
                    expires_minutes,
                ),
                RequestAction::List { status, limit } => {
                    commands::cmd_request_list(&db, status.as_deref(), limit)
                }
                RequestAction::Expire => commands::cmd_request_expire(&db),
            }
        }
        Commands::Ingest { files } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_ingest(&db, &files)
        }
        Commands::Extract { file, json } => commands::cmd_extract(&file, json),
        Commands::Recheck { file } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_recheck(&db, &file)
        }
        Commands::Attempts { result, limit } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_attempts(&db, result.as_deref(), limit)
        }
        Commands::Status => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_status(&db)
        }
        Commands::Resolve {
            account,
            bank_code,
            api_key,
        } => commands::cmd_resolve(&account, bank_code.as_deref(), api_key.as_deref()).await,
    }
}
