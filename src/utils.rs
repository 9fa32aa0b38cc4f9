//! Utility functions

use std::time::Duration;
use url::{Host, Url};

/// Bytes per megabyte used for all size reporting
pub const BYTES_PER_MB: u64 = 1024 * 1024;

/// Check that a string is a well-formed http(s) URL
///
/// A string that already carries a scheme must parse with scheme `http` or
/// `https`; any host is accepted, so `http://converter:3000` passes.
/// Strings without a scheme get `http://` prepended before parsing, and then
/// the host must be an IP address, `localhost`, or a dotted domain name, so
/// `example.com/api` is accepted while `not-a-url` is not. Malformed input
/// returns `false`; this never panics.
///
/// # Examples
///
/// ```
/// use sheet_relay::utils::is_valid_url;
///
/// assert!(is_valid_url("http://example.com"));
/// assert!(is_valid_url("https://example.com/api"));
/// assert!(is_valid_url("http://converter:3000"));
/// assert!(!is_valid_url("ftp://example.com"));
/// assert!(!is_valid_url(""));
/// assert!(!is_valid_url("not-a-url"));
/// ```
pub fn is_valid_url(s: &str) -> bool {
    normalize_url(s).is_some()
}

/// Validate a URL and return it with the implied `http://` scheme added
///
/// Returns `None` for anything [`is_valid_url`] rejects.
///
/// ```
/// use sheet_relay::utils::normalize_url;
///
/// assert_eq!(
///     normalize_url("files.example.com/a.xlsx").as_deref(),
///     Some("http://files.example.com/a.xlsx")
/// );
/// assert_eq!(normalize_url(" https://intranet ").as_deref(), Some("https://intranet"));
/// ```
pub fn normalize_url(s: &str) -> Option<String> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    // `localhost:3000` parses as scheme "localhost"; only hierarchical URLs count
    if let Ok(parsed) = Url::parse(s)
        && !parsed.cannot_be_a_base()
    {
        return matches!(parsed.scheme(), "http" | "https").then(|| s.to_string());
    }

    if has_scheme_prefix(s) {
        return None;
    }

    let candidate = format!("http://{s}");
    let parsed = Url::parse(&candidate).ok()?;
    let host_ok = match parsed.host() {
        Some(Host::Domain(domain)) => domain == "localhost" || domain.contains('.'),
        Some(Host::Ipv4(_)) | Some(Host::Ipv6(_)) => true,
        None => false,
    };
    host_ok.then_some(candidate)
}

/// True when `s` starts with `scheme://`, judged by RFC 3986 scheme syntax
fn has_scheme_prefix(s: &str) -> bool {
    s.split_once("://").is_some_and(|(scheme, _)| {
        scheme.starts_with(|c: char| c.is_ascii_alphabetic())
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    })
}

/// Strip trailing slashes from a service base URL
pub fn trim_endpoint(endpoint: &str) -> &str {
    endpoint.trim().trim_end_matches('/')
}

/// Size in megabytes
pub fn size_in_mb(size_bytes: u64) -> f64 {
    size_bytes as f64 / BYTES_PER_MB as f64
}

/// Effective timeout for uploading a file of the given size
///
/// Large payloads get one extra minute per started 10 MB:
/// `max(configured, ceil(size_mb / 10) * 60s)`.
pub fn upload_timeout(configured: Duration, size_bytes: u64) -> Duration {
    let blocks = (size_in_mb(size_bytes) / 10.0).ceil() as u64;
    configured.max(Duration::from_secs(blocks * 60))
}
