//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI
//! arguments. The actual command implementations are in the `commands`
//! module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// kudi - reconcile bank alert emails against pending payment requests
#[derive(Parser)]
#[command(name = "kudi")]
#[command(about = "Bank-transfer email reconciliation engine", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "kudi.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Manage pending payment requests
    Request {
        #[command(subcommand)]
        action: RequestAction,
    },

    /// Run one or more .eml files through the reconciliation engine
    Ingest {
        /// .eml files to process
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Extract fields from an .eml file without touching the store
    Extract {
        /// .eml file to inspect
        file: PathBuf,

        /// Emit the extracted transaction as JSON
        #[arg(long)]
        json: bool,
    },

    /// Evaluate an .eml against every pending request without approving
    Recheck {
        /// .eml file to evaluate
        file: PathBuf,
    },

    /// List match attempts from the audit log
    Attempts {
        /// Filter by result: matched, unmatched, duplicate
        #[arg(long)]
        result: Option<String>,

        /// Maximum rows to show
        #[arg(long, default_value = "20")]
        limit: i64,
    },

    /// Show store status (pending requests, attempt totals)
    Status,

    /// Resolve an account number against the NUBAN service
    Resolve {
        /// 10-digit account number
        account: String,

        /// Bank code to narrow the lookup
        #[arg(long)]
        bank_code: Option<String>,

        /// Resolver API key (falls back to KUDI_NUBAN_KEY)
        #[arg(long)]
        api_key: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum RequestAction {
    /// Register a pending payment request
    Add {
        /// Host-side transaction reference
        reference: String,

        /// Expected amount in naira
        amount: f64,

        /// Expected payer name (enables fuzzy name matching)
        #[arg(long)]
        payer: Option<String>,

        /// Collection account number shown to the payer
        #[arg(long)]
        account: Option<String>,

        /// Minutes until the request expires
        #[arg(long)]
        expires_minutes: Option<i64>,
    },

    /// List requests
    List {
        /// Filter by status: pending, approved, rejected, expired
        #[arg(long)]
        status: Option<String>,

        /// Maximum rows to show
        #[arg(long, default_value = "20")]
        limit: i64,
    },

    /// Expire overdue pending requests
    Expire,
}
