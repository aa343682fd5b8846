//! HTTP transport: client construction and redirect handling.

mod client;

pub use client::{
    CONNECT_TIMEOUT_SECS, ClientOptions, DEFAULT_MAX_REDIRECTS, Page, READ_TIMEOUT_SECS,
    ScrapeClient,
};
