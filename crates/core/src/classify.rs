//! Indicator type classification.
//!
//! [`classify`] maps a raw string onto a [`DataType`] tag using a fixed
//! precedence chain: hash > ip > domain > url > mail. A string that fits
//! no category has no type. Classification is pure and total; malformed
//! input of any shape simply fails the category check.

use std::net::IpAddr;

use lazy_static::lazy_static;
use public_suffix::{EffectiveTLDProvider, DEFAULT_PROVIDER};
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::{Host, Url};

lazy_static! {
    static ref MAIL_PATTERN: Regex =
        Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").unwrap();
}

/// Indicator type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Md5,
    Sha1,
    Sha256,
    Sha512,
    Ip,
    Domain,
    Url,
    Mail,
}

impl DataType {
    /// All classifiable tags, in precedence order.
    pub const ALL: [DataType; 8] = [
        DataType::Md5,
        DataType::Sha1,
        DataType::Sha256,
        DataType::Sha512,
        DataType::Ip,
        DataType::Domain,
        DataType::Url,
        DataType::Mail,
    ];

    /// Whether this tag is one of the four hash widths.
    pub fn is_hash(&self) -> bool {
        matches!(
            self,
            DataType::Md5 | DataType::Sha1 | DataType::Sha256 | DataType::Sha512
        )
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataType::Md5 => write!(f, "md5"),
            DataType::Sha1 => write!(f, "sha1"),
            DataType::Sha256 => write!(f, "sha256"),
            DataType::Sha512 => write!(f, "sha512"),
            DataType::Ip => write!(f, "ip"),
            DataType::Domain => write!(f, "domain"),
            DataType::Url => write!(f, "url"),
            DataType::Mail => write!(f, "mail"),
        }
    }
}

/// Classify a raw indicator string.
///
/// Returns `None` when the value matches no category. Precedence is fixed:
/// a 32-char hex string is always `md5`, even if it would also parse as a
/// domain-like token.
pub fn classify(data: &str) -> Option<DataType> {
    if let Some(hash) = classify_hash(data) {
        return Some(hash);
    }
    if data.parse::<IpAddr>().is_ok() {
        return Some(DataType::Ip);
    }
    if is_domain(data) {
        return Some(DataType::Domain);
    }
    if is_url(data) {
        return Some(DataType::Url);
    }
    if MAIL_PATTERN.is_match(data) {
        return Some(DataType::Mail);
    }
    None
}

/// Exact-length hexadecimal strings are hashes.
fn classify_hash(data: &str) -> Option<DataType> {
    if !data.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match data.len() {
        32 => Some(DataType::Md5),
        40 => Some(DataType::Sha1),
        64 => Some(DataType::Sha256),
        128 => Some(DataType::Sha512),
        _ => None,
    }
}

/// A bare host name with a publicly-recognized registrable suffix.
///
/// The candidate is parsed as the host of a synthetic URL; anything that
/// changes under that parse (port, path, userinfo, IP host) is rejected.
fn is_domain(data: &str) -> bool {
    if data.is_empty() || data.contains(['/', '@', ':', '?', '#', ' ']) {
        return false;
    }
    let parsed = match Url::parse(&format!("http://{data}")) {
        Ok(u) => u,
        Err(_) => return false,
    };
    match parsed.host() {
        Some(Host::Domain(host)) => host.eq_ignore_ascii_case(data) && has_known_suffix(host),
        _ => false,
    }
}

/// A URL with a scheme, a domain host that passes the suffix check, and a path.
fn is_url(data: &str) -> bool {
    let parsed = match Url::parse(data) {
        Ok(u) => u,
        Err(_) => return false,
    };
    if parsed.cannot_be_a_base() {
        return false;
    }
    match parsed.host() {
        Some(Host::Domain(host)) => has_known_suffix(host),
        _ => false,
    }
}

fn has_known_suffix(host: &str) -> bool {
    DEFAULT_PROVIDER.effective_tld_plus_one(host).is_ok()
}
