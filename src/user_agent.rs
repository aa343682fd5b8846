//! User-Agent string shared by every request the scraper makes.

/// Project URL for User-Agent identification.
const PROJECT_UA_URL: &str = "https://github.com/fierce/facescrape";

/// Default User-Agent identifying the tool and its version.
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("facescrape/{version} (+{PROJECT_UA_URL})")
}
