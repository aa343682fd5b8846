//! Facescrape Core Library
//!
//! Logs in to the college face book through the CAS single-sign-on gateway,
//! runs directory searches, extracts each result's profile fields, and
//! exports them as CSV.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`session`] - CAS login handshake, cookie jar, credentials
//! - [`http`] - HTTP client with bounded manual redirect following
//! - [`directory`] - Directory search and record page extraction
//! - [`export`] - CSV export with configurable columns
//! - [`scraper`] - `login` / `search` / `export` facade
//! - [`site`] - Endpoint and cookie-name profile
//! - [`error`] - Error taxonomy

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod directory;
pub mod error;
pub mod export;
pub mod http;
pub mod scraper;
pub mod session;
pub mod site;

mod user_agent;
mod utils;

// Re-export commonly used types
pub use directory::{
    CANONICAL_FIELDS, DirectorySearchClient, Record, RecordExtractor, RecordId, SearchFilter,
    extract_record, extract_record_ids,
};
pub use error::{ErrorKind, FetchCause, ScrapeError};
pub use export::{DEFAULT_COLUMNS, ExportSpec, ResultExporter};
pub use http::{ClientOptions, DEFAULT_MAX_REDIRECTS, Page, ScrapeClient};
pub use scraper::{FaceScraper, FailedRecord, SearchOutcome};
pub use session::{AuthSession, CookieJar, Credentials, LoginState, LoginToken, extract_login_token};
pub use site::SiteProfile;
