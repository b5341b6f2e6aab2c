//! Advertising account and credential value checks.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::CoreError;

static AD_ACCOUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^act_\d+$").expect("valid regex"));

/// Ad account IDs are `act_` followed by the numeric account ID.
pub fn validate_ad_account_id(id: &str) -> Result<(), CoreError> {
    if AD_ACCOUNT_RE.is_match(id) {
        Ok(())
    } else {
        Err(CoreError::Config(format!(
            "Invalid ad account id '{id}'. Expected format: act_<digits>"
        )))
    }
}

/// Template values copied from a sample `.env` (`your-...`, `act_your...`)
/// count as unset.
pub fn is_placeholder(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value.starts_with("your-") || value.starts_with("act_your")
}

/// Show only the edges of a secret, for diagnostics output.
pub fn mask_secret(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() > 25 {
        let head: String = chars[..15].iter().collect();
        let tail: String = chars[chars.len() - 10..].iter().collect();
        format!("{head}...{tail}")
    } else {
        "***".to_string()
    }
}
