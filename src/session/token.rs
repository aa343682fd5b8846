//! Extraction of the single-use CAS login-form tokens.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::ScrapeError;
use crate::utils::compile_static_regex;

static LT_RE: LazyLock<Regex> = LazyLock::new(|| hidden_input_regex("lt"));
static EXECUTION_RE: LazyLock<Regex> = LazyLock::new(|| hidden_input_regex("execution"));

fn hidden_input_regex(name: &str) -> Regex {
    compile_static_regex(&format!(
        r#"(?i)<input\s+type\s*=\s*["']hidden["']\s+name\s*=\s*["']{name}["']\s+value\s*=\s*["']([^"']+)["']"#
    ))
}

/// The `lt` / `execution` pair a CAS login form embeds.
///
/// Valid only for the submission that immediately follows the form fetch.
/// Values are redacted in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct LoginToken {
    lt: String,
    execution: String,
}

impl LoginToken {
    /// Creates a token pair.
    #[must_use]
    pub fn new(lt: impl Into<String>, execution: impl Into<String>) -> Self {
        Self {
            lt: lt.into(),
            execution: execution.into(),
        }
    }

    /// The login ticket value.
    #[must_use]
    pub fn lt(&self) -> &str {
        &self.lt
    }

    /// The webflow execution key.
    #[must_use]
    pub fn execution(&self) -> &str {
        &self.execution
    }
}

impl fmt::Debug for LoginToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginToken")
            .field("lt", &"[REDACTED]")
            .field("execution", &"[REDACTED]")
            .finish()
    }
}

/// Pulls the [`LoginToken`] out of the login form at `url`.
///
/// # Errors
///
/// Returns [`ScrapeError::ProtocolShape`] when either hidden field is missing,
/// which means the identity provider changed its form.
pub fn extract_login_token(html: &str, url: &str) -> Result<LoginToken, ScrapeError> {
    let lt = capture_first(&LT_RE, html)
        .ok_or_else(|| ScrapeError::protocol_shape(url, "login form has no hidden `lt` field"))?;
    let execution = capture_first(&EXECUTION_RE, html).ok_or_else(|| {
        ScrapeError::protocol_shape(url, "login form has no hidden `execution` field")
    })?;
    Ok(LoginToken::new(lt, execution))
}

fn capture_first(regex: &Regex, html: &str) -> Option<String> {
    regex
        .captures(html)
        .and_then(|caps| caps.get(1).map(|m| m.as_str().to_string()))
}
