//! Utility functions and helpers.

pub mod http;
pub mod log;
pub mod retry;

/// Collapse runs of whitespace into single spaces and trim the ends.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cookie header value from name/value pairs.
pub fn cookie_header<'a>(cookies: impl IntoIterator<Item = (&'a String, &'a String)>) -> String {
    cookies
        .into_iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("; ")
}
