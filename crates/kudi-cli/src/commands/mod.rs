//! Command implementations
//!
//! Each submodule implements the commands for one area of the CLI.
//! This module provides shared helpers (store opening, .eml reading).

mod attempts;
mod core;
mod ingest;
mod requests;
mod resolve;

pub use attempts::{cmd_attempts, cmd_status};
pub use core::cmd_init;
pub use ingest::{cmd_extract, cmd_ingest, cmd_recheck, read_eml};
pub use requests::{cmd_request_add, cmd_request_expire, cmd_request_list};
pub use resolve::cmd_resolve;

use std::path::Path;

use anyhow::{Context, Result};
use kudi_core::Database;

/// Open the store at the given path, creating it if needed
pub fn open_db(path: &Path) -> Result<Database> {
    let path_str = path
        .to_str()
        .context("database path is not valid UTF-8")?;
    Database::new(path_str).with_context(|| format!("failed to open store at {}", path_str))
}
