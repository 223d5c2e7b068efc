//! External account-name resolution

use anyhow::{bail, Result};

use kudi_core::{AccountLookup, AccountLookupConfig};

/// Environment variable holding the resolver API key
const API_KEY_ENV: &str = "KUDI_NUBAN_KEY";

pub async fn cmd_resolve(
    account: &str,
    bank_code: Option<&str>,
    api_key: Option<&str>,
) -> Result<()> {
    if !AccountLookup::shape_valid(account) {
        bail!("{account} is not a valid NUBAN account number (need exactly 10 digits)");
    }

    let api_key = match api_key {
        Some(key) => key.to_string(),
        None => match std::env::var(API_KEY_ENV) {
            Ok(key) => key,
            Err(_) => bail!("no resolver API key; pass --api-key or set {API_KEY_ENV}"),
        },
    };

    let lookup = AccountLookup::new(AccountLookupConfig {
        api_key,
        ..AccountLookupConfig::default()
    })?;

    match lookup.resolve(account, bank_code).await {
        Some(resolved) => {
            println!("Account : {}", resolved.account_number);
            println!("Name    : {}", resolved.account_name);
            println!("Bank    : {}", resolved.bank_name.as_deref().unwrap_or("-"));
            println!("Code    : {}", resolved.bank_code.as_deref().unwrap_or("-"));
        }
        None => println!("Account could not be resolved"),
    }
    Ok(())
}
