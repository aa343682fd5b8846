//! HTTP client with manual, bounded redirect following.
//!
//! Automatic redirects are disabled on the underlying reqwest client: every
//! hop of a CAS handshake sets cookies that must land in the session's
//! [`CookieJar`] before the next hop is requested, and the jar is sent
//! explicitly on every request.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use reqwest::header::{COOKIE, LOCATION};
use reqwest::redirect::Policy;
use reqwest::{Client, ClientBuilder, Proxy, RequestBuilder, Response, StatusCode};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::error::ScrapeError;
use crate::session::CookieJar;
use crate::user_agent;

/// Default cap on redirects followed after a single request.
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// Default connect timeout.
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default total timeout per request.
pub const READ_TIMEOUT_SECS: u64 = 30;

/// Network policy for a [`ScrapeClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// TCP/TLS connect timeout.
    pub connect_timeout: Duration,
    /// Total timeout for one request, including the body.
    pub read_timeout: Duration,
    /// Redirects followed after one request before giving up.
    pub max_redirects: usize,
    /// User-Agent header value.
    pub user_agent: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            read_timeout: Duration::from_secs(READ_TIMEOUT_SECS),
            max_redirects: DEFAULT_MAX_REDIRECTS,
            user_agent: user_agent::default_user_agent(),
        }
    }
}

/// Final response of a request after its redirect chain.
#[derive(Debug, Clone)]
pub struct Page {
    /// URL of the last request in the chain.
    pub url: String,
    /// Status of the last response.
    pub status: u16,
    /// Decoded body of the last response.
    pub body: String,
    /// Number of redirects followed to reach it.
    pub hops: usize,
}

impl Page {
    /// Returns the page if its status is 2xx.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Fetch`] with the status otherwise.
    pub fn ensure_success(self) -> Result<Self, ScrapeError> {
        if (200..300).contains(&self.status) {
            Ok(self)
        } else {
            Err(ScrapeError::http_status(self.url, self.status))
        }
    }
}

/// HTTP client shared by the login handshake, search, and record fetches.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct ScrapeClient {
    client: Client,
    max_redirects: usize,
}

impl ScrapeClient {
    /// Creates a client with [`ClientOptions::default`].
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::ClientBuild`] when reqwest cannot build a client.
    pub fn new() -> Result<Self, ScrapeError> {
        Self::with_options(&ClientOptions::default())
    }

    /// Creates a client with explicit options.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::ClientBuild`] when reqwest cannot build a client.
    pub fn with_options(options: &ClientOptions) -> Result<Self, ScrapeError> {
        Ok(Self {
            client: build_http_client(options)?,
            max_redirects: options.max_redirects,
        })
    }

    /// Redirect cap applied to every request.
    #[must_use]
    pub fn max_redirects(&self) -> usize {
        self.max_redirects
    }

    /// Issues a GET with `query`, then follows redirects.
    ///
    /// Cookies from every response in the chain are merged into `jar`.
    ///
    /// # Errors
    ///
    /// [`ScrapeError::Fetch`] on transport failure,
    /// [`ScrapeError::RedirectLoop`] when the cap is exceeded,
    /// [`ScrapeError::ProtocolShape`] for a redirect without a usable `Location`.
    #[instrument(level = "debug", skip(self, query, jar), fields(url = %url))]
    pub async fn get(
        &self,
        url: &str,
        query: &[(String, String)],
        jar: &mut CookieJar,
    ) -> Result<Page, ScrapeError> {
        let request = with_cookies(self.client.get(url).query(query), jar);
        let response = send(request, url).await?;
        self.follow_redirects(url, response, jar).await
    }

    /// Submits a url-encoded form, then follows redirects.
    ///
    /// # Errors
    ///
    /// Same as [`ScrapeClient::get`].
    #[instrument(level = "debug", skip(self, form, jar), fields(url = %url))]
    pub async fn post_form(
        &self,
        url: &str,
        form: &[(&str, &str)],
        jar: &mut CookieJar,
    ) -> Result<Page, ScrapeError> {
        let request = with_cookies(self.client.post(url).form(form), jar);
        let response = send(request, url).await?;
        self.follow_redirects(url, response, jar).await
    }

    async fn follow_redirects(
        &self,
        start_url: &str,
        mut response: Response,
        jar: &mut CookieJar,
    ) -> Result<Page, ScrapeError> {
        let mut current = response.url().to_string();
        let mut hops = 0;

        loop {
            let merged = jar.merge_response(&response);
            let status = response.status();
            debug!(
                url = %current,
                status = status.as_u16(),
                cookies_merged = merged,
                hop = hops,
                "response received"
            );

            if !is_redirect(status) {
                let body = response
                    .text()
                    .await
                    .map_err(|source| ScrapeError::body(current.clone(), source))?;
                return Ok(Page {
                    url: current,
                    status: status.as_u16(),
                    body,
                    hops,
                });
            }

            if hops >= self.max_redirects {
                warn!(url = %start_url, hops, "redirect cap exceeded");
                return Err(ScrapeError::redirect_loop(start_url, self.max_redirects));
            }

            let next = redirect_target(&response, &current)?;
            hops += 1;
            let request = with_cookies(self.client.get(next.as_str()), jar);
            response = send(request, next.as_str()).await?;
            current = next;
        }
    }
}

fn is_redirect(status: StatusCode) -> bool {
    matches!(status.as_u16(), 301 | 302 | 303 | 307 | 308)
}

fn redirect_target(response: &Response, current: &str) -> Result<String, ScrapeError> {
    let location = response
        .headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            ScrapeError::protocol_shape(current, "redirect response without a Location header")
        })?;

    Url::parse(current)
        .and_then(|base| base.join(location))
        .map(|url| url.to_string())
        .map_err(|_| {
            ScrapeError::protocol_shape(current, format!("unusable redirect Location `{location}`"))
        })
}

fn with_cookies(request: RequestBuilder, jar: &CookieJar) -> RequestBuilder {
    match jar.header_value() {
        Some(header) => request.header(COOKIE, header),
        None => request,
    }
}

async fn send(request: RequestBuilder, url: &str) -> Result<Response, ScrapeError> {
    request
        .send()
        .await
        .map_err(|source| ScrapeError::network(url, source))
}

fn build_http_client(options: &ClientOptions) -> Result<Client, ScrapeError> {
    match try_build_client(options, false) {
        Ok(client) => Ok(client),
        Err(BuildClientFailure::Panic) => {
            // Some sandboxed environments panic when querying system proxy
            // settings; retry with env-only proxy discovery.
            warn!("HTTP client hit system proxy panic; using env-proxy fallback builder");
            match try_build_client(options, true) {
                Ok(client) => Ok(client),
                Err(BuildClientFailure::Build(source)) => Err(ScrapeError::ClientBuild { source }),
                Err(BuildClientFailure::Panic) => {
                    // Last resort: plain builder without any proxy lookup.
                    base_builder(options)
                        .no_proxy()
                        .build()
                        .map_err(|source| ScrapeError::ClientBuild { source })
                }
            }
        }
        Err(BuildClientFailure::Build(source)) => Err(ScrapeError::ClientBuild { source }),
    }
}

enum BuildClientFailure {
    Panic,
    Build(reqwest::Error),
}

fn try_build_client(
    options: &ClientOptions,
    disable_system_proxy_lookup: bool,
) -> Result<Client, BuildClientFailure> {
    catch_unwind(AssertUnwindSafe(|| {
        let mut builder = base_builder(options);
        if disable_system_proxy_lookup {
            builder = apply_env_proxy_fallback(builder.no_proxy());
        }
        builder.build().map_err(BuildClientFailure::Build)
    }))
    .map_err(|_| BuildClientFailure::Panic)?
}

fn base_builder(options: &ClientOptions) -> ClientBuilder {
    Client::builder()
        .connect_timeout(options.connect_timeout)
        .timeout(options.read_timeout)
        .user_agent(options.user_agent.clone())
        .redirect(Policy::none())
        .gzip(true)
}

fn apply_env_proxy_fallback(mut builder: ClientBuilder) -> ClientBuilder {
    if let Some(proxy) = find_first_proxy_var(&["HTTPS_PROXY", "https_proxy", "ALL_PROXY", "all_proxy"])
        && let Ok(resolved) = Proxy::https(&proxy)
    {
        builder = builder.proxy(resolved);
    }
    if let Some(proxy) = find_first_proxy_var(&["HTTP_PROXY", "http_proxy", "ALL_PROXY", "all_proxy"])
        && let Ok(resolved) = Proxy::http(&proxy)
    {
        builder = builder.proxy(resolved);
    }
    builder
}

fn find_first_proxy_var(names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| {
        std::env::var(name)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_match_constants() {
        let options = ClientOptions::default();
        assert_eq!(options.max_redirects, DEFAULT_MAX_REDIRECTS);
        assert_eq!(options.connect_timeout, Duration::from_secs(CONNECT_TIMEOUT_SECS));
        assert_eq!(options.read_timeout, Duration::from_secs(READ_TIMEOUT_SECS));
        assert!(options.user_agent.starts_with("facescrape/"));
    }

    #[test]
    fn test_redirect_statuses() {
        for code in [301, 302, 303, 307, 308] {
            assert!(is_redirect(StatusCode::from_u16(code).unwrap()), "{code}");
        }
        for code in [200, 204, 304, 400, 500] {
            assert!(!is_redirect(StatusCode::from_u16(code).unwrap()), "{code}");
        }
    }

    #[test]
    fn test_page_ensure_success_rejects_error_status() {
        let page = Page {
            url: "http://site.example/search".to_string(),
            status: 500,
            body: String::new(),
            hops: 0,
        };
        let err = page.ensure_success().unwrap_err();
        assert!(err.is_retryable());
        assert!(err.to_string().contains("HTTP 500"), "got: {err}");
    }

    #[test]
    fn test_client_builds_with_custom_options() {
        let options = ClientOptions {
            max_redirects: 3,
            ..ClientOptions::default()
        };
        let client = ScrapeClient::with_options(&options).unwrap();
        assert_eq!(client.max_redirects(), 3);
    }
}
