//! Application configuration loading for CLI defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use facescrape_core::{ClientOptions, SiteProfile};

/// File configuration (`key = value` lines, TOML-compatible subset).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    /// CAS login URL.
    pub login_url: Option<String>,
    /// Directory search URL.
    pub search_url: Option<String>,
    /// Record URL template containing `{id}`.
    pub individual_url: Option<String>,
    /// Origin for relative photo paths.
    pub site_origin: Option<String>,
    /// Session cookie name.
    pub session_cookie: Option<String>,
    /// Ticket-granting cookie name.
    pub ticket_cookie: Option<String>,
    /// Redirect cap per request (1..=50).
    pub max_redirects: Option<u64>,
    /// Connect timeout in seconds (1..=3600).
    pub connect_timeout_secs: Option<u64>,
    /// Total request timeout in seconds (1..=3600).
    pub read_timeout_secs: Option<u64>,
    /// Default verbosity mode.
    pub verbosity: Option<VerbositySetting>,
}

impl FileConfig {
    /// Validates config values against runtime and CLI constraints.
    pub fn validate(&self) -> Result<()> {
        if let Some(max_redirects) = self.max_redirects
            && !(1..=50).contains(&max_redirects)
        {
            bail!("Invalid config value for `max_redirects`: {max_redirects}. Expected range: 1..=50");
        }
        validate_timeout_secs("connect_timeout_secs", self.connect_timeout_secs)?;
        validate_timeout_secs("read_timeout_secs", self.read_timeout_secs)?;
        Ok(())
    }

    /// Applies endpoint and cookie overrides on top of `site`.
    #[must_use]
    pub fn apply_site(&self, mut site: SiteProfile) -> SiteProfile {
        let overrides = [
            (&self.login_url, &mut site.login_url),
            (&self.search_url, &mut site.search_url),
            (&self.individual_url, &mut site.individual_url),
            (&self.site_origin, &mut site.site_origin),
            (&self.session_cookie, &mut site.session_cookie),
            (&self.ticket_cookie, &mut site.ticket_cookie),
        ];
        for (value, target) in overrides {
            if let Some(value) = value {
                target.clone_from(value);
            }
        }
        site
    }

    /// Applies timeout and redirect overrides on top of `options`.
    #[must_use]
    pub fn apply_client(&self, mut options: ClientOptions) -> ClientOptions {
        if let Some(secs) = self.connect_timeout_secs {
            options.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.read_timeout_secs {
            options.read_timeout = Duration::from_secs(secs);
        }
        if let Some(max_redirects) = self.max_redirects
            && let Ok(max_redirects) = usize::try_from(max_redirects)
        {
            options.max_redirects = max_redirects;
        }
        options
    }
}

fn validate_timeout_secs(field: &str, value: Option<u64>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=3600).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..=3600");
    }
    Ok(())
}

/// Supported config verbosity labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbositySetting {
    Default,
    Verbose,
    Quiet,
    Debug,
}

impl VerbositySetting {
    /// Log filter directive for this verbosity.
    #[must_use]
    pub fn filter_directive(self) -> &'static str {
        match self {
            Self::Default => "info",
            Self::Verbose | Self::Debug => "debug",
            Self::Quiet => "error",
        }
    }
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/facescrape/config.toml`
/// 2. `$HOME/.config/facescrape/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("facescrape")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("facescrape")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads config from `explicit` when given (must exist), else from the
/// default path if present.
pub fn load_config(explicit: Option<&Path>) -> Result<Option<FileConfig>> {
    if let Some(path) = explicit {
        return load_file_config(path).map(Some);
    }

    let Some(path) = resolve_default_config_path() else {
        return Ok(None);
    };
    if !path.exists() {
        return Ok(None);
    }
    load_file_config(&path).map(Some)
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    let config = parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))?;
    config
        .validate()
        .with_context(|| format!("Invalid config file '{}'", path.display()))?;
    Ok(config)
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line_number = line_index + 1;
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!("Invalid config syntax on line {line_number}: expected key = value");
        };

        let key = raw_key.trim();
        let value = raw_value.trim();

        match key {
            "login_url" | "search_url" | "individual_url" | "site_origin" | "session_cookie"
            | "ticket_cookie" => {
                let parsed = parse_string_literal(value).with_context(|| {
                    format!("Invalid `{key}` value on line {line_number}")
                })?;
                let slot = match key {
                    "login_url" => &mut cfg.login_url,
                    "search_url" => &mut cfg.search_url,
                    "individual_url" => &mut cfg.individual_url,
                    "site_origin" => &mut cfg.site_origin,
                    "session_cookie" => &mut cfg.session_cookie,
                    _ => &mut cfg.ticket_cookie,
                };
                *slot = Some(parsed);
            }
            "max_redirects" | "connect_timeout_secs" | "read_timeout_secs" => {
                let parsed = parse_integer_u64(value).with_context(|| {
                    format!("Invalid `{key}` value on line {line_number}")
                })?;
                let slot = match key {
                    "max_redirects" => &mut cfg.max_redirects,
                    "connect_timeout_secs" => &mut cfg.connect_timeout_secs,
                    _ => &mut cfg.read_timeout_secs,
                };
                *slot = Some(parsed);
            }
            "verbosity" => {
                let parsed = parse_string_literal(value).with_context(|| {
                    format!("Invalid `verbosity` value on line {line_number}")
                })?;
                cfg.verbosity = Some(parse_verbosity(&parsed).with_context(|| {
                    format!("Invalid `verbosity` value '{parsed}' on line {line_number}")
                })?);
            }
            _ => bail!("Unknown config key `{key}` on line {line_number}"),
        }
    }
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_quotes = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            '#' if !in_quotes => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(value: &str) -> Result<String> {
    let Some(inner) = value
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    else {
        bail!("expected a double-quoted string");
    };
    Ok(inner.to_string())
}

fn parse_integer_u64(value: &str) -> Result<u64> {
    value
        .parse::<u64>()
        .with_context(|| format!("expected a non-negative integer, got `{value}`"))
}

fn parse_verbosity(value: &str) -> Result<VerbositySetting> {
    match value.to_ascii_lowercase().as_str() {
        "default" => Ok(VerbositySetting::Default),
        "verbose" => Ok(VerbositySetting::Verbose),
        "quiet" => Ok(VerbositySetting::Quiet),
        "debug" => Ok(VerbositySetting::Debug),
        _ => bail!("expected one of: default, verbose, quiet, debug"),
    }
}
