//! Store initialization

use std::path::Path;

use anyhow::Result;

use super::open_db;

pub fn cmd_init(db_path: &Path) -> Result<()> {
    let db = open_db(db_path)?;
    println!("Initialized store at {}", db.path());
    Ok(())
}
