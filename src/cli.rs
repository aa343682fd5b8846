//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

/// Log in through CAS, search the college face book, and export records.
///
/// The password is read from the environment variable named by
/// `--password-env`, or from the first line of stdin.
#[derive(Parser, Debug)]
#[command(name = "facescrape")]
#[command(author, version, about)]
pub struct Args {
    /// Login identifier (HUID)
    #[arg(short = 'u', long)]
    pub username: String,

    /// Environment variable holding the password
    #[arg(long, default_value = "FACESCRAPE_PASSWORD")]
    pub password_env: String,

    /// Restrict to a house (e.g. "Kirkland House")
    #[arg(long)]
    pub house: Option<String>,

    /// Restrict to an assigned house
    #[arg(long)]
    pub assigned_house: Option<String>,

    /// Restrict to a class year
    #[arg(long)]
    pub year: Option<String>,

    /// Restrict to a concentration
    #[arg(long)]
    pub concentration: Option<String>,

    /// Restrict by first-name fragment
    #[arg(long)]
    pub first_name: Option<String>,

    /// Restrict by last-name fragment
    #[arg(long)]
    pub last_name: Option<String>,

    /// Extra search parameter forwarded verbatim (repeatable)
    #[arg(long = "filter", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub filters: Vec<(String, String)>,

    /// CSV output path
    #[arg(short, long, default_value = "facescrape.csv")]
    pub output: PathBuf,

    /// Comma-separated export columns (default: all nine)
    #[arg(long)]
    pub columns: Option<String>,

    /// Print records as JSON to stdout instead of writing CSV
    #[arg(long)]
    pub json: bool,

    /// Maximum redirects followed per request (1-50)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=50))]
    pub max_redirects: Option<u8>,

    /// Config file path (default: $XDG_CONFIG_HOME/facescrape/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{raw}`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in `{raw}`"));
    }
    Ok((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_minimal_args_parse_with_defaults() {
        let args = Args::try_parse_from(["facescrape", "-u", "12345678"]).unwrap();
        assert_eq!(args.username, "12345678");
        assert_eq!(args.password_env, "FACESCRAPE_PASSWORD");
        assert_eq!(args.output, PathBuf::from("facescrape.csv"));
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
        assert!(!args.json);
        assert!(args.filters.is_empty());
        assert_eq!(args.max_redirects, None);
    }

    #[test]
    fn test_cli_username_is_required() {
        let err = Args::try_parse_from(["facescrape"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_cli_search_filters() {
        let args = Args::try_parse_from([
            "facescrape",
            "-u",
            "1",
            "--house",
            "Kirkland House",
            "--year",
            "2016",
            "--filter",
            "dorm=Weld",
            "--filter",
            "num=50",
        ])
        .unwrap();
        assert_eq!(args.house.as_deref(), Some("Kirkland House"));
        assert_eq!(args.year.as_deref(), Some("2016"));
        assert_eq!(
            args.filters,
            vec![
                ("dorm".to_string(), "Weld".to_string()),
                ("num".to_string(), "50".to_string())
            ]
        );
    }

    #[test]
    fn test_cli_filter_without_equals_rejected() {
        let err = Args::try_parse_from(["facescrape", "-u", "1", "--filter", "house"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let args = Args::try_parse_from(["facescrape", "-u", "1", "-vv"]).unwrap();
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_cli_max_redirects_range() {
        let args = Args::try_parse_from(["facescrape", "-u", "1", "--max-redirects", "5"]).unwrap();
        assert_eq!(args.max_redirects, Some(5));

        let err = Args::try_parse_from(["facescrape", "-u", "1", "--max-redirects", "0"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let err = Args::try_parse_from(["facescrape", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }
}
