use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

const COUNTRY_PREFIX: &str = "+82";

// 010/011/016/017/018/019 followed by 7 or 8 digits.
static MOBILE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^01[016789][0-9]{7,8}$").expect("mobile pattern is valid"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid mobile phone number format")]
pub struct InvalidFormat;

/// Removes whitespace and hyphens and rewrites a leading `+82` to `0`.
/// Does not validate.
pub fn canonicalize_phone(raw: &str) -> String {
    let stripped: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();
    match stripped.strip_prefix(COUNTRY_PREFIX) {
        Some(rest) => format!("0{}", rest),
        None => stripped,
    }
}

/// Canonicalizes `raw` and checks it against the domestic mobile pattern.
pub fn normalize_phone(raw: &str) -> Result<String, InvalidFormat> {
    let normalized = canonicalize_phone(raw);
    if MOBILE_PATTERN.is_match(&normalized) {
        Ok(normalized)
    } else {
        Err(InvalidFormat)
    }
}
