//! Individual record pages: fetching and field extraction.
//!
//! Extraction is driven by [`FIELD_TABLE`]. When the directory changes its
//! markup, the table is the only place that needs to change.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::{debug, instrument};

use super::search::RecordId;
use crate::error::ScrapeError;
use crate::http::ScrapeClient;
use crate::session::AuthSession;
use crate::site::SiteProfile;
use crate::utils::{absolutize_url, compile_static_regex, first_capture};

/// Number of canonical record fields.
pub const FIELD_COUNT: usize = 9;

/// Canonical record keys, in default export order.
pub const CANONICAL_FIELDS: [&str; FIELD_COUNT] = [
    "name",
    "house",
    "year",
    "concentration",
    "assigned house",
    "dorm address",
    "mail address",
    "email",
    "photo",
];

/// Where a field's value comes from on the record page.
#[derive(Debug, Clone, Copy)]
pub enum FieldSource {
    /// A `<span class="field">LABEL:</span><span class="value">…</span>` pair.
    Labelled(&'static str),
    /// A free-standing pattern whose first capture group is the value.
    Pattern(&'static str),
}

/// Post-processing applied to a matched value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalize {
    /// Decode common HTML entities.
    Text,
    /// Resolve against the site origin into an absolute URL.
    SiteUrl,
}

/// One row of the extraction table.
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    /// Canonical record key.
    pub key: &'static str,
    /// Matcher for the value.
    pub source: FieldSource,
    /// Normalizer for the matched value.
    pub normalize: Normalize,
}

/// Field name → matcher → normalizer, one entry per canonical field.
pub const FIELD_TABLE: [FieldRule; FIELD_COUNT] = [
    labelled("name", "Name"),
    labelled("house", "House"),
    labelled("year", "Year"),
    labelled("concentration", "Concentration"),
    labelled("assigned house", "Assigned House"),
    labelled("dorm address", "Dorm Address"),
    labelled("mail address", "Mail Address"),
    FieldRule {
        key: "email",
        source: FieldSource::Pattern(r"mailto:([\w\-.+]+@[\w\-]+(?:\.[\w\-]+)+)"),
        normalize: Normalize::Text,
    },
    FieldRule {
        key: "photo",
        source: FieldSource::Pattern(r#"<img\s+alt="Image"\s+width="250"\s+src="([^"]+)""#),
        normalize: Normalize::SiteUrl,
    },
];

const fn labelled(key: &'static str, label: &'static str) -> FieldRule {
    FieldRule {
        key,
        source: FieldSource::Labelled(label),
        normalize: Normalize::Text,
    }
}

static COMPILED_RULES: LazyLock<Vec<(FieldRule, Regex)>> = LazyLock::new(|| {
    FIELD_TABLE
        .iter()
        .map(|rule| (*rule, compile_rule(rule.source)))
        .collect()
});

static LINE_BREAK_RE: LazyLock<Regex> = LazyLock::new(|| compile_static_regex(r"(?i)<br\s*/?>"));

fn compile_rule(source: FieldSource) -> Regex {
    match source {
        FieldSource::Labelled(label) => compile_static_regex(&format!(
            r#"<span class="field">\s*{}:\s*</span>\s*<span class="value">([^<]*)<"#,
            regex::escape(label)
        )),
        FieldSource::Pattern(pattern) => compile_static_regex(pattern),
    }
}

/// One person's extracted profile.
///
/// Every canonical key is always present; fields missing from the page are
/// `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    values: [Option<String>; FIELD_COUNT],
}

impl Record {
    /// A record with every field absent.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns the value for `key` (canonical lowercase name).
    ///
    /// Unknown keys and absent fields both return `None`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        field_index(key).and_then(|index| self.values[index].as_deref())
    }

    /// Sets a canonical field. Returns false for unknown keys.
    pub fn set(&mut self, key: &str, value: Option<String>) -> bool {
        match field_index(key) {
            Some(index) => {
                self.values[index] = value;
                true
            }
            None => false,
        }
    }

    /// Builder form of [`Record::set`]; unknown keys are ignored.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set(key, Some(value.into()));
        self
    }

    /// Iterates `(key, value)` over every canonical field in order.
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, Option<&str>)> {
        CANONICAL_FIELDS
            .iter()
            .zip(self.values.iter())
            .map(|(key, value)| (*key, value.as_deref()))
    }

    /// Number of fields that were found.
    #[must_use]
    pub fn present_count(&self) -> usize {
        self.values.iter().filter(|value| value.is_some()).count()
    }
}

fn field_index(key: &str) -> Option<usize> {
    CANONICAL_FIELDS.iter().position(|field| *field == key)
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(CANONICAL_FIELDS.len()))?;
        for (key, value) in self.fields() {
            map.serialize_entry(key, &value)?;
        }
        map.end()
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.get("name").unwrap_or("<unnamed>"))
    }
}

/// Extracts a [`Record`] from a record page body.
///
/// Line-break markup is removed first so values split across rendered lines
/// match as one token. Unmatched fields are left `None`.
#[must_use]
pub fn extract_record(html: &str, site_origin: &str) -> Record {
    let body = LINE_BREAK_RE.replace_all(html, "");
    let mut record = Record::empty();

    for (rule, regex) in COMPILED_RULES.iter() {
        let value = first_capture(&body, regex).and_then(|raw| match rule.normalize {
            Normalize::Text => Some(decode_entities(&raw)),
            Normalize::SiteUrl => absolutize_url(&raw, site_origin),
        });
        record.set(rule.key, value);
    }
    record
}

fn decode_entities(value: &str) -> String {
    if !value.contains('&') {
        return value.to_string();
    }
    value
        .replace("&#39;", "'")
        .replace("&#039;", "'")
        .replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

/// Fetches and extracts individual records for an authenticated session.
#[derive(Debug, Clone, Copy)]
pub struct RecordExtractor<'a> {
    client: &'a ScrapeClient,
    site: &'a SiteProfile,
}

impl<'a> RecordExtractor<'a> {
    /// Creates an extractor over a shared HTTP client and site profile.
    #[must_use]
    pub fn new(client: &'a ScrapeClient, site: &'a SiteProfile) -> Self {
        Self { client, site }
    }

    /// Fetches the record page for `id` and extracts its fields.
    ///
    /// Not retried here; callers decide whether a [`ScrapeError::Fetch`] is
    /// worth another attempt.
    ///
    /// # Errors
    ///
    /// - [`ScrapeError::NotAuthenticated`] if the session has not logged in
    /// - [`ScrapeError::Fetch`] on network failure, timeout, error status, or
    ///   a redirect chain that loops or lacks a `Location`
    #[instrument(skip(self, session, id), fields(id = %id))]
    pub async fn fetch(
        &self,
        session: &mut AuthSession,
        id: &RecordId,
    ) -> Result<Record, ScrapeError> {
        session.require_authenticated()?;

        let url = self.site.individual_url_for(id.as_str());
        let page = self
            .client
            .get(&url, &[], session.jar_mut())
            .await
            .map_err(|error| error.into_page_fetch(&url))?
            .ensure_success()?;

        let record = extract_record(&page.body, &self.site.site_origin);
        debug!(
            present = record.present_count(),
            total = CANONICAL_FIELDS.len(),
            "record extracted"
        );
        Ok(record)
    }
}
