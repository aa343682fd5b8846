//! Shared helpers for pattern-based page extraction.

use regex::Regex;
use url::Url;

/// Compiles a regex at static init; panics on invalid pattern.
pub(crate) fn compile_static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid static regex '{pattern}': {e}"))
}

/// Returns the first capture of `regex` in `html`, trimmed, or `None` when the
/// pattern does not match or the capture is blank.
#[must_use]
pub(crate) fn first_capture(html: &str, regex: &Regex) -> Option<String> {
    regex
        .captures(html)
        .and_then(|caps| caps.get(1).map(|m| m.as_str().trim().to_string()))
        .filter(|value| !value.is_empty())
}

/// Resolves a possibly relative URL string against `base`.
///
/// Absolute `http(s)://` values are returned unchanged.
#[must_use]
pub(crate) fn absolutize_url(value: &str, base: &str) -> Option<String> {
    if value.starts_with("http://") || value.starts_with("https://") {
        return Some(value.to_string());
    }
    let mut base = Url::parse(base).ok()?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(value.trim_start_matches('/'))
        .ok()
        .map(|url| url.to_string())
}
