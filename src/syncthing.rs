//! Poll the Syncthing REST completion endpoint for one folder.
//!
//! A folder counts as fully synced only when `completion` is 100 and
//! `needItems` is 0. Missing fields deserialize to `None` and never count
//! as complete.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Subset of the `/rest/db/completion` response we act on.
#[derive(Debug, Deserialize)]
pub struct CompletionStatus {
    pub completion: Option<f64>,
    #[serde(rename = "needItems")]
    pub need_items: Option<u64>,
}

impl CompletionStatus {
    /// Everything arrived: completion at 100 and nothing left to pull.
    pub fn is_complete(&self) -> bool {
        self.completion == Some(100.0) && self.need_items == Some(0)
    }
}

/// One GET with the API key header. An incomplete folder is `Ok(false)`;
/// HTTP status errors, transport failures, and non-JSON bodies are errors.
pub fn check_completion(url: &str, api_key: &str) -> Result<bool> {
    let agent = ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build();
    let status: CompletionStatus = agent
        .get(url)
        .set("X-API-Key", api_key)
        .call()
        .with_context(|| format!("completion request to {} failed", url))?
        .into_json()
        .context("completion response was not valid JSON")?;
    Ok(status.is_complete())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> CompletionStatus {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn complete_when_both_fields_hold() {
        assert!(parse(r#"{"completion": 100, "needItems": 0}"#).is_complete());
    }

    #[test]
    fn not_complete_below_100() {
        assert!(!parse(r#"{"completion": 99.37, "needItems": 0}"#).is_complete());
    }

    #[test]
    fn not_complete_with_pending_items() {
        assert!(!parse(r#"{"completion": 100, "needItems": 3}"#).is_complete());
    }

    #[test]
    fn not_complete_when_fields_missing() {
        assert!(!parse(r#"{}"#).is_complete());
        assert!(!parse(r#"{"completion": 100}"#).is_complete());
        assert!(!parse(r#"{"needItems": 0}"#).is_complete());
    }

    #[test]
    fn extra_fields_ignored() {
        let body = r#"{"completion": 100, "needItems": 0, "globalBytes": 12345, "needDeletes": 0}"#;
        assert!(parse(body).is_complete());
    }
}
