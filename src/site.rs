//! Endpoint and cookie-name profile for the identity provider and directory.

/// CAS login URL bound to the face book service ticket target.
pub const DEFAULT_LOGIN_URL: &str = "https://www.pin1.harvard.edu/cas/login?service=https%3A%2F%2Fwww.pin1.harvard.edu%2Fpin%2Fauthenticate%3F__authen_application%3DFAS_CS_FACEBOOK%26original_request%3D%2Fsearchform";

/// Directory search endpoint.
pub const DEFAULT_SEARCH_URL: &str = "http://facebook.college.harvard.edu//search";

/// Individual record endpoint; `{id}` is replaced by the record identifier.
pub const DEFAULT_INDIVIDUAL_URL: &str = "http://facebook.college.harvard.edu//individual?id={id}";

/// Origin used to absolutize relative photo paths.
pub const DEFAULT_SITE_ORIGIN: &str = "http://facebook.college.harvard.edu";

/// One-time ticket-granting cookie set by CAS mid-handshake.
pub const DEFAULT_TICKET_COOKIE: &str = "CASTGC";

/// Session cookie set by the directory once the service ticket is validated.
pub const DEFAULT_SESSION_COOKIE: &str = "PHPSESSID";

const ID_PLACEHOLDER: &str = "{id}";

/// Where the scraper talks to and which cookies carry protocol meaning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteProfile {
    /// CAS login form URL (GET) and submission target (POST).
    pub login_url: String,
    /// Directory search URL.
    pub search_url: String,
    /// Individual record URL template containing `{id}`.
    pub individual_url: String,
    /// Base origin for relative photo sources.
    pub site_origin: String,
    /// Name of the cookie that must be gone after login.
    pub ticket_cookie: String,
    /// Name of the cookie that must be present after login.
    pub session_cookie: String,
}

impl Default for SiteProfile {
    fn default() -> Self {
        Self {
            login_url: DEFAULT_LOGIN_URL.to_string(),
            search_url: DEFAULT_SEARCH_URL.to_string(),
            individual_url: DEFAULT_INDIVIDUAL_URL.to_string(),
            site_origin: DEFAULT_SITE_ORIGIN.to_string(),
            ticket_cookie: DEFAULT_TICKET_COOKIE.to_string(),
            session_cookie: DEFAULT_SESSION_COOKIE.to_string(),
        }
    }
}

impl SiteProfile {
    /// Builds a profile whose endpoints all live under `base_url`.
    ///
    /// Paths mirror the production layout (`/cas/login`, `/search`,
    /// `/individual?id={id}`). Used for fake providers in tests and staging.
    #[must_use]
    pub fn with_base_url(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            login_url: format!("{base}/cas/login?service={base}%2Fpin%2Fauthenticate"),
            search_url: format!("{base}/search"),
            individual_url: format!("{base}/individual?id={ID_PLACEHOLDER}"),
            site_origin: base.to_string(),
            ..Self::default()
        }
    }

    /// Returns the record page URL for `id`.
    ///
    /// A template without the placeholder gets the identifier appended.
    #[must_use]
    pub fn individual_url_for(&self, id: &str) -> String {
        if self.individual_url.contains(ID_PLACEHOLDER) {
            self.individual_url.replace(ID_PLACEHOLDER, id)
        } else {
            format!("{}{id}", self.individual_url)
        }
    }
}
