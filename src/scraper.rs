//! One-object workflow: log in, search, export.
//!
//! # Example
//!
//! ```no_run
//! use facescrape_core::{Credentials, FaceScraper, SearchFilter};
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut scraper = FaceScraper::new(Credentials::new("12345678", "password"))?;
//! let outcome = scraper
//!     .scrape(&SearchFilter::new().house("Kirkland House"))
//!     .await?;
//! println!("{} records, {} failed", outcome.records.len(), outcome.failed.len());
//! scraper.export(Path::new("kirkland.csv"), None)?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use tracing::{debug, info, instrument, warn};

use crate::directory::{DirectorySearchClient, Record, RecordExtractor, RecordId, SearchFilter};
use crate::error::ScrapeError;
use crate::export::{ExportSpec, ResultExporter};
use crate::http::{ClientOptions, ScrapeClient};
use crate::session::{AuthSession, Credentials};
use crate::site::SiteProfile;

/// A record identifier whose fetch failed, with the reason.
#[derive(Debug)]
pub struct FailedRecord {
    /// The identifier that could not be fetched.
    pub id: RecordId,
    /// Why it failed.
    pub error: ScrapeError,
}

/// Result of a search: extracted records plus per-record failures.
#[derive(Debug, Default)]
pub struct SearchOutcome {
    /// Records in search-result order.
    pub records: Vec<Record>,
    /// Identifiers whose record fetch failed.
    pub failed: Vec<FailedRecord>,
}

impl SearchOutcome {
    /// Number of identifiers the search returned.
    #[must_use]
    pub fn total(&self) -> usize {
        self.records.len() + self.failed.len()
    }

    /// Returns true when every record was fetched.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Owns the HTTP client, site profile, session, and the last search's
/// records.
#[derive(Debug)]
pub struct FaceScraper {
    client: ScrapeClient,
    site: SiteProfile,
    session: AuthSession,
    last_read: Vec<Record>,
}

impl FaceScraper {
    /// Creates a scraper for the production site with default network options.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::ClientBuild`] if the HTTP client cannot be built.
    pub fn new(credentials: Credentials) -> Result<Self, ScrapeError> {
        Self::with_config(credentials, SiteProfile::default(), &ClientOptions::default())
    }

    /// Creates a scraper for an explicit site profile and network options.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::ClientBuild`] if the HTTP client cannot be built.
    pub fn with_config(
        credentials: Credentials,
        site: SiteProfile,
        options: &ClientOptions,
    ) -> Result<Self, ScrapeError> {
        let client = ScrapeClient::with_options(options)?;
        let session = AuthSession::new(credentials, &site);
        Ok(Self {
            client,
            site,
            session,
            last_read: Vec::new(),
        })
    }

    /// The underlying session.
    #[must_use]
    pub fn session(&self) -> &AuthSession {
        &self.session
    }

    /// The site profile in use.
    #[must_use]
    pub fn site(&self) -> &SiteProfile {
        &self.site
    }

    /// Records from the most recent search.
    #[must_use]
    pub fn last_read(&self) -> &[Record] {
        &self.last_read
    }

    /// Logs in, replacing any existing session.
    ///
    /// # Errors
    ///
    /// See [`AuthSession::login`].
    pub async fn login(&mut self) -> Result<(), ScrapeError> {
        self.session.login(&self.client, &self.site).await
    }

    /// Searches the directory and fetches every matching record.
    ///
    /// Requires a prior [`FaceScraper::login`]. Per-record fetch failures are
    /// collected in [`SearchOutcome::failed`], including redirect failures on a
    /// record page. Search-page and session errors abort.
    ///
    /// # Errors
    ///
    /// [`ScrapeError::NotAuthenticated`] before login, plus the search and
    /// structural errors of [`DirectorySearchClient::search`].
    pub async fn search(&mut self, filter: &SearchFilter) -> Result<SearchOutcome, ScrapeError> {
        self.search_with_progress(filter, |_, _| {}).await
    }

    /// Like [`FaceScraper::search`], calling `on_record(done, total)` after
    /// each record fetch.
    ///
    /// # Errors
    ///
    /// Same as [`FaceScraper::search`].
    #[instrument(skip(self, filter, on_record))]
    pub async fn search_with_progress<F>(
        &mut self,
        filter: &SearchFilter,
        mut on_record: F,
    ) -> Result<SearchOutcome, ScrapeError>
    where
        F: FnMut(usize, usize),
    {
        let ids = DirectorySearchClient::new(&self.client, &self.site)
            .search(&mut self.session, filter)
            .await?;

        let extractor = RecordExtractor::new(&self.client, &self.site);
        let total = ids.len();
        let mut outcome = SearchOutcome::default();

        for (index, id) in ids.into_iter().enumerate() {
            match extractor.fetch(&mut self.session, &id).await {
                Ok(record) => {
                    debug!(id = %id, record = %record, "record fetched");
                    outcome.records.push(record);
                }
                Err(error) if error.is_retryable() => {
                    warn!(id = %id, error = %error, "record fetch failed; continuing");
                    outcome.failed.push(FailedRecord { id, error });
                }
                Err(error) => return Err(error),
            }
            on_record(index + 1, total);
        }

        info!(
            records = outcome.records.len(),
            failed = outcome.failed.len(),
            "search finished"
        );
        self.last_read.clone_from(&outcome.records);
        Ok(outcome)
    }

    /// Logs in, then searches.
    ///
    /// # Errors
    ///
    /// Any error from [`FaceScraper::login`] or [`FaceScraper::search`].
    pub async fn scrape(&mut self, filter: &SearchFilter) -> Result<SearchOutcome, ScrapeError> {
        self.login().await?;
        self.search(filter).await
    }

    /// Writes the most recent search's records to `path` as CSV.
    ///
    /// `columns` of `None` selects the default nine columns.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Io`] when the file cannot be written.
    pub fn export(&self, path: &Path, columns: Option<ExportSpec>) -> Result<(), ScrapeError> {
        ResultExporter::new(columns).write_path(path, &self.last_read)
    }
}
