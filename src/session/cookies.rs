//! Name-keyed cookie jar threaded through every request of a session.
//!
//! The identity provider and the directory live on different hosts, and the
//! handshake depends on every cookie set along the way being replayed on the
//! next hop. The jar therefore keys by cookie name only and sends everything
//! it holds, instead of applying per-domain matching.

use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, SystemTime};

use reqwest::Response;
use tracing::trace;

/// Accumulated cookies for one session.
///
/// Values are sensitive and redacted in `Debug` output.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CookieJar {
    entries: BTreeMap<String, String>,
}

impl CookieJar {
    /// Creates an empty jar.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value stored under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    /// Returns true if a cookie named `name` is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Stores or replaces a cookie.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(name.into(), value.into());
    }

    /// Removes a cookie, returning its previous value.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.entries.remove(name)
    }

    /// Drops every cookie.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of cookies held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when the jar holds no cookies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cookie names in sorted order. Safe to log.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Merges every `Set-Cookie` of `response` into the jar.
    ///
    /// Cookies already in the jar but absent from the response are kept.
    /// A cookie sent with `Max-Age=0` or an `Expires` in the past is removed.
    /// Returns the number of cookies set or removed.
    pub fn merge_response(&mut self, response: &Response) -> usize {
        let now = SystemTime::now();
        let mut changed = 0;
        for cookie in response.cookies() {
            let expired = cookie.max_age() == Some(Duration::ZERO)
                || cookie.expires().is_some_and(|expires| expires <= now);
            self.apply_set_cookie(cookie.name(), cookie.value(), expired);
            changed += 1;
        }
        changed
    }

    pub(crate) fn apply_set_cookie(&mut self, name: &str, value: &str, expired: bool) {
        if expired {
            trace!(cookie = name, "server expired cookie");
            self.entries.remove(name);
        } else {
            trace!(cookie = name, "server set cookie");
            self.entries.insert(name.to_string(), value.to_string());
        }
    }

    /// Renders the jar as a `Cookie` request header value.
    ///
    /// Returns `None` for an empty jar so no header is sent at all.
    #[must_use]
    pub fn header_value(&self) -> Option<String> {
        if self.entries.is_empty() {
            return None;
        }
        let pairs: Vec<String> = self
            .entries
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        Some(pairs.join("; "))
    }

    /// Returns true when the jar carries the session cookie and no longer
    /// carries the one-time ticket-granting cookie.
    #[must_use]
    pub fn is_authenticated(&self, session_cookie: &str, ticket_cookie: &str) -> bool {
        self.contains(session_cookie) && !self.contains(ticket_cookie)
    }
}

// Debug lists cookie names only.
impl fmt::Debug for CookieJar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieJar")
            .field("names", &self.entries.keys().collect::<Vec<_>>())
            .field("values", &"[REDACTED]")
            .finish()
    }
}
