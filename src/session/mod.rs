//! CAS login handshake and the authenticated session it produces.
//!
//! [`AuthSession`] owns the credentials and the cookie jar. It is passed by
//! `&mut` into every directory operation, so two requests can never update
//! the same jar at once.

mod cookies;
mod credentials;
mod token;

pub use cookies::CookieJar;
pub use credentials::Credentials;
pub use token::{LoginToken, extract_login_token};

use tracing::{debug, info, instrument, warn};

use crate::error::ScrapeError;
use crate::http::ScrapeClient;
use crate::site::SiteProfile;

/// Progress of the login handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginState {
    /// No login attempted yet, or a new attempt is starting.
    Init,
    /// Login form fetched and its token extracted.
    FetchedForm,
    /// Credentials submitted.
    Submitted,
    /// Following the post-submission redirect chain.
    Redirecting,
    /// The jar holds a valid session.
    Authenticated,
    /// The last attempt ended without a session.
    Failed,
}

/// A login session: credentials, cookie jar, and handshake state.
#[derive(Debug)]
pub struct AuthSession {
    credentials: Credentials,
    jar: CookieJar,
    state: LoginState,
    session_cookie: String,
    ticket_cookie: String,
}

impl AuthSession {
    /// Creates an unauthenticated session for `credentials`.
    ///
    /// Cookie names are taken from `site` so the authentication check and the
    /// handshake agree on which cookies matter.
    #[must_use]
    pub fn new(credentials: Credentials, site: &SiteProfile) -> Self {
        Self {
            credentials,
            jar: CookieJar::new(),
            state: LoginState::Init,
            session_cookie: site.session_cookie.clone(),
            ticket_cookie: site.ticket_cookie.clone(),
        }
    }

    /// Current handshake state.
    #[must_use]
    pub fn state(&self) -> LoginState {
        self.state
    }

    /// The session's cookie jar.
    #[must_use]
    pub fn jar(&self) -> &CookieJar {
        &self.jar
    }

    pub(crate) fn jar_mut(&mut self) -> &mut CookieJar {
        &mut self.jar
    }

    /// The login identifier this session was built with.
    #[must_use]
    pub fn identifier(&self) -> &str {
        self.credentials.identifier()
    }

    /// Returns true when the last login succeeded and the jar still holds
    /// the session cookie without the ticket-granting cookie.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state == LoginState::Authenticated
            && self
                .jar
                .is_authenticated(&self.session_cookie, &self.ticket_cookie)
    }

    /// Fails with [`ScrapeError::NotAuthenticated`] unless authenticated.
    ///
    /// # Errors
    ///
    /// See above.
    pub fn require_authenticated(&self) -> Result<(), ScrapeError> {
        if self.is_authenticated() {
            Ok(())
        } else {
            Err(ScrapeError::NotAuthenticated)
        }
    }

    /// Runs the full CAS handshake, replacing any previous session state.
    ///
    /// Fetches the login form, submits the credentials with the form's
    /// single-use token, follows the redirect chain back to the directory,
    /// and validates the resulting jar.
    ///
    /// # Errors
    ///
    /// - [`ScrapeError::ProtocolShape`] when the form lacks its hidden tokens
    /// - [`ScrapeError::Authentication`] when no session cookie was granted
    /// - [`ScrapeError::RedirectLoop`] when the redirect chain is too long
    /// - [`ScrapeError::Fetch`] on network failure or an error status
    #[instrument(skip_all)]
    pub async fn login(
        &mut self,
        client: &ScrapeClient,
        site: &SiteProfile,
    ) -> Result<(), ScrapeError> {
        self.state = LoginState::Init;
        self.jar.clear();
        self.session_cookie.clone_from(&site.session_cookie);
        self.ticket_cookie.clone_from(&site.ticket_cookie);

        let result = self.run_handshake(client, site).await;
        if let Err(error) = &result {
            self.state = LoginState::Failed;
            warn!(error = %error, "login failed");
        }
        result
    }

    async fn run_handshake(
        &mut self,
        client: &ScrapeClient,
        site: &SiteProfile,
    ) -> Result<(), ScrapeError> {
        let form_page = client
            .get(&site.login_url, &[], &mut self.jar)
            .await?
            .ensure_success()?;
        let token = extract_login_token(&form_page.body, &form_page.url)?;
        self.state = LoginState::FetchedForm;
        debug!(cookies = self.jar.len(), "login form fetched");

        let form = login_form(&self.credentials, &token);
        self.state = LoginState::Submitted;
        let landing = client.post_form(&site.login_url, &form, &mut self.jar).await?;
        if landing.hops > 0 {
            self.state = LoginState::Redirecting;
        }
        debug!(
            hops = landing.hops,
            status = landing.status,
            cookies = ?self.jar.names().collect::<Vec<_>>(),
            "login redirect chain finished"
        );

        self.finish(landing.hops)
    }

    fn finish(&mut self, hops: usize) -> Result<(), ScrapeError> {
        if !self.jar.contains(&self.session_cookie) {
            let reason = if self.jar.contains(&self.ticket_cookie) {
                "identity provider issued a ticket but the directory granted no session"
            } else {
                "credentials rejected or additional verification required"
            };
            return Err(ScrapeError::authentication(reason));
        }

        // The ticket-granting cookie is single-use; an authenticated jar
        // must not carry it forward.
        self.jar.remove(&self.ticket_cookie);
        self.state = LoginState::Authenticated;
        info!(hops, cookies = self.jar.len(), "login succeeded");
        Ok(())
    }
}

fn login_form<'a>(credentials: &'a Credentials, token: &'a LoginToken) -> [(&'static str, &'a str); 8] {
    [
        ("compositeAuthenticationSourceType", "PIN"),
        ("username", credentials.identifier()),
        ("password", credentials.secret()),
        ("_eventId_submit", "Login"),
        ("lt", token.lt()),
        ("execution", token.execution()),
        ("casPageDisplayType", "DEFAULT"),
        ("nonMobileOptionOnMobile", ""),
    ]
}
