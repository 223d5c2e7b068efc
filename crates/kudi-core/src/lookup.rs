//! External account-name resolution
//!
//! Optional enrichment against a NUBAN resolver service: given a 10-digit
//! account number (and optionally a bank code), fetch the registered account
//! name. Nothing on the matching path waits for this; resolution failures
//! are logged and swallowed, and the only timeout in the system lives here.

use std::time::Duration;

use serde_json::Value;
use tracing::{info, warn};

use crate::error::Result;

/// Resolver connection settings
#[derive(Debug, Clone)]
pub struct AccountLookupConfig {
    /// Service base URL
    pub base_url: String,
    /// Caller's API key, appended to the path
    pub api_key: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for AccountLookupConfig {
    fn default() -> Self {
        Self {
            base_url: "https://app.nuban.com.ng/api".to_string(),
            api_key: String::new(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// A successfully resolved account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAccount {
    pub account_number: String,
    pub account_name: String,
    pub bank_name: Option<String>,
    pub bank_code: Option<String>,
}

/// Async client for the account resolver
pub struct AccountLookup {
    client: reqwest::Client,
    config: AccountLookupConfig,
}

impl AccountLookup {
    pub fn new(config: AccountLookupConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client, config })
    }

    /// Local NUBAN shape check: exactly 10 digits once separators are gone
    pub fn shape_valid(account_number: &str) -> bool {
        normalize_account(account_number).len() == 10
    }

    /// Resolve the registered name for an account number.
    ///
    /// Returns None for malformed input, resolver errors, and timeouts -
    /// enrichment never fails the caller.
    pub async fn resolve(
        &self,
        account_number: &str,
        bank_code: Option<&str>,
    ) -> Option<ResolvedAccount> {
        let account = normalize_account(account_number);
        if account.len() != 10 {
            return None;
        }

        let url = format!("{}/{}", self.config.base_url, self.config.api_key);
        let mut query: Vec<(&str, &str)> = vec![("acc_no", &account)];
        if let Some(code) = bank_code {
            query.push(("bank_code", code));
        }

        let response = match self.client.get(&url).query(&query).send().await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(account = %account, error = %e, "account lookup request failed");
                return None;
            }
        };

        if !response.status().is_success() {
            warn!(account = %account, status = %response.status(), "account lookup rejected");
            return None;
        }

        let body: Value = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                warn!(account = %account, error = %e, "account lookup returned invalid JSON");
                return None;
            }
        };

        let resolved = parse_response(&account, &body);
        if let Some(r) = &resolved {
            info!(account = %account, name = %r.account_name, "account resolved");
        }
        resolved
    }
}

fn normalize_account(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Pull the account name out of the resolver's loosely-specified response
/// shapes ("account_name", "name", or "accountName").
fn parse_response(account: &str, body: &Value) -> Option<ResolvedAccount> {
    if body.get("error").and_then(Value::as_bool) == Some(true) {
        return None;
    }

    let field = |names: &[&str]| -> Option<String> {
        names
            .iter()
            .find_map(|n| body.get(*n).and_then(Value::as_str))
            .map(str::to_string)
            .filter(|s| !s.is_empty())
    };

    let account_name = field(&["account_name", "name", "accountName"])?;
    Some(ResolvedAccount {
        account_number: account.to_string(),
        account_name,
        bank_name: field(&["bank_name", "bankName", "bank"]),
        bank_code: field(&["bank_code", "bankCode", "code"]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn shape_check_requires_ten_digits() {
        assert!(AccountLookup::shape_valid("9008771210"));
        assert!(AccountLookup::shape_valid("900-877-1210"));
        assert!(AccountLookup::shape_valid(" 9008 7712 10 "));
        assert!(!AccountLookup::shape_valid("90087712"));
        assert!(!AccountLookup::shape_valid("90087712101"));
        assert!(!AccountLookup::shape_valid("no digits"));
    }

    #[test]
    fn parses_the_standard_response() {
        let body = json!({
            "account_name": "SOLOMON INNOCENT AMITHY",
            "bank_name": "Guaranty Trust Bank",
            "bank_code": "058"
        });
        let resolved = parse_response("9008771210", &body).unwrap();
        assert_eq!(resolved.account_name, "SOLOMON INNOCENT AMITHY");
        assert_eq!(resolved.bank_code.as_deref(), Some("058"));
    }

    #[test]
    fn parses_alternate_field_names() {
        let body = json!({ "accountName": "MARY JANE OKAFOR", "bank": "Kuda" });
        let resolved = parse_response("0123456789", &body).unwrap();
        assert_eq!(resolved.account_name, "MARY JANE OKAFOR");
        assert_eq!(resolved.bank_name.as_deref(), Some("Kuda"));
    }

    #[test]
    fn error_payloads_resolve_to_none() {
        let body = json!({ "error": true, "message": "account not found" });
        assert_eq!(parse_response("9008771210", &body), None);
    }

    #[test]
    fn empty_names_resolve_to_none() {
        let body = json!({ "account_name": "" });
        assert_eq!(parse_response("9008771210", &body), None);
    }

    /// Serve one canned HTTP response on a local port
    fn one_shot_server(body: &'static str) -> std::net::SocketAddr {
        use std::io::{Read, Write};
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut buf = [0u8; 2048];
                let _ = stream.read(&mut buf);
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body,
                );
                let _ = stream.write_all(response.as_bytes());
            }
        });
        addr
    }

    #[tokio::test]
    async fn resolve_round_trips_against_a_mock_resolver() {
        let addr = one_shot_server(
            r#"{"account_name":"SOLOMON INNOCENT AMITHY","bank_name":"Guaranty Trust Bank","bank_code":"058"}"#,
        );
        let lookup = AccountLookup::new(AccountLookupConfig {
            base_url: format!("http://{addr}"),
            api_key: "TESTKEY".to_string(),
            timeout: Duration::from_secs(5),
        })
        .unwrap();

        let resolved = lookup.resolve("900-877-1210", None).await.unwrap();
        assert_eq!(resolved.account_number, "9008771210");
        assert_eq!(resolved.account_name, "SOLOMON INNOCENT AMITHY");
        assert_eq!(resolved.bank_code.as_deref(), Some("058"));
    }

    #[tokio::test]
    async fn malformed_account_short_circuits_before_any_request() {
        let lookup = AccountLookup::new(AccountLookupConfig::default()).unwrap();
        assert!(lookup.resolve("12345", None).await.is_none());
    }
}
