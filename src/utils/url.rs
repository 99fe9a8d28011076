// src/utils/url.rs

//! URL manipulation utilities.

use url::Url;

/// Resolve a potentially relative URL against a base URL.
///
/// Falls back to the raw href when it cannot be joined.
///
/// # Examples
/// ```
/// use event_harvester::utils::url::resolve;
///
/// assert_eq!(
///     resolve("https://example.com/path/", "/zone/events/1/info"),
///     "https://example.com/zone/events/1/info"
/// );
/// ```
pub fn resolve(base: &str, href: &str) -> String {
    match Url::parse(base) {
        Ok(base) => resolve_url(&base, href),
        Err(_) => href.to_string(),
    }
}

/// Resolve an href against an already parsed base.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href.trim())
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Canonical participants-list URL for an event id.
pub fn participants_url(base: &Url, id: &str) -> String {
    resolve_url(base, &format!("/zone/events/{id}/participants_list"))
}
