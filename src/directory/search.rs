//! Authenticated directory search.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, instrument};

use crate::error::ScrapeError;
use crate::http::ScrapeClient;
use crate::session::AuthSession;
use crate::site::SiteProfile;
use crate::utils::compile_static_regex;

/// Default result page size; large enough to return the whole directory.
pub const DEFAULT_PAGE_SIZE: &str = "9999";

/// Query parameters every search sends, before the caller's filter is applied.
/// Empty values mean "no constraint".
const BASELINE_PAYLOAD: [(&str, &str); 9] = [
    ("name_last", ""),
    ("name_first", ""),
    ("house", ""),
    ("assigned_house", ""),
    ("year", ""),
    ("concentration", ""),
    ("num", DEFAULT_PAGE_SIZE),
    ("Search", "Search"),
    ("view", "photo"),
];

static RESULT_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r#"<div class="photo">\s*<a href="individual\?id=([a-fA-F0-9]+)"#)
});

/// Opaque record identifier (hex) scoped to the directory session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(String);

impl RecordId {
    /// Wraps an identifier string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as sent in query strings.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Search constraints keyed by query parameter name.
///
/// Keys the directory does not recognize are forwarded verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilter {
    params: BTreeMap<String, String>,
}

impl SearchFilter {
    /// An empty filter; matches the whole directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an arbitrary parameter.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Sets an arbitrary parameter in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.insert(key.into(), value.into());
    }

    /// Restricts to a residential house.
    #[must_use]
    pub fn house(self, house: impl Into<String>) -> Self {
        self.with("house", house)
    }

    /// Restricts to an assigned (incoming) house.
    #[must_use]
    pub fn assigned_house(self, house: impl Into<String>) -> Self {
        self.with("assigned_house", house)
    }

    /// Restricts to a class year.
    #[must_use]
    pub fn year(self, year: impl Into<String>) -> Self {
        self.with("year", year)
    }

    /// Restricts to a concentration.
    #[must_use]
    pub fn concentration(self, concentration: impl Into<String>) -> Self {
        self.with("concentration", concentration)
    }

    /// Restricts by first-name fragment.
    #[must_use]
    pub fn first_name(self, name: impl Into<String>) -> Self {
        self.with("name_first", name)
    }

    /// Restricts by last-name fragment.
    #[must_use]
    pub fn last_name(self, name: impl Into<String>) -> Self {
        self.with("name_last", name)
    }

    /// Returns true when no parameter is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Merges the filter over the baseline payload.
    ///
    /// Baseline keys keep their position; filter values win; keys outside the
    /// baseline are appended in key order.
    #[must_use]
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query: Vec<(String, String)> = BASELINE_PAYLOAD
            .iter()
            .map(|(key, default)| {
                let value = self
                    .params
                    .get(*key)
                    .cloned()
                    .unwrap_or_else(|| (*default).to_string());
                ((*key).to_string(), value)
            })
            .collect();

        query.extend(
            self.params
                .iter()
                .filter(|(key, _)| !BASELINE_PAYLOAD.iter().any(|(base, _)| *base == key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone())),
        );
        query
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SearchFilter {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut filter = Self::new();
        for (key, value) in iter {
            filter.insert(key, value);
        }
        filter
    }
}

/// Extracts result identifiers from a photo-view search page.
///
/// Order follows the page; repeated identifiers are dropped after their first
/// occurrence.
#[must_use]
pub fn extract_record_ids(html: &str) -> Vec<RecordId> {
    let mut seen = HashSet::new();
    RESULT_ID_RE
        .captures_iter(html)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .filter(|id| seen.insert(id.clone()))
        .map(RecordId)
        .collect()
}

/// Issues directory searches on behalf of an authenticated session.
#[derive(Debug, Clone, Copy)]
pub struct DirectorySearchClient<'a> {
    client: &'a ScrapeClient,
    site: &'a SiteProfile,
}

impl<'a> DirectorySearchClient<'a> {
    /// Creates a search client over a shared HTTP client and site profile.
    #[must_use]
    pub fn new(client: &'a ScrapeClient, site: &'a SiteProfile) -> Self {
        Self { client, site }
    }

    /// Runs a search and returns the matching record identifiers.
    ///
    /// # Errors
    ///
    /// - [`ScrapeError::NotAuthenticated`] before any request if the session
    ///   has not logged in
    /// - [`ScrapeError::RedirectLoop`] / [`ScrapeError::ProtocolShape`] from
    ///   redirect handling
    /// - [`ScrapeError::Fetch`] on network failure or an error status
    #[instrument(skip(self, session), fields(filter_keys = filter.params.len()))]
    pub async fn search(
        &self,
        session: &mut AuthSession,
        filter: &SearchFilter,
    ) -> Result<Vec<RecordId>, ScrapeError> {
        session.require_authenticated()?;

        let query = filter.to_query();
        let page = self
            .client
            .get(&self.site.search_url, &query, session.jar_mut())
            .await?
            .ensure_success()?;

        let ids = extract_record_ids(&page.body);
        if ids.is_empty() {
            debug!(url = %page.url, "search page contained no result entries");
        }
        info!(results = ids.len(), "directory search complete");
        Ok(ids)
    }
}
