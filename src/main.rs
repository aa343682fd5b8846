//! CLI entry point for the facescrape tool.

use std::io::{self, BufRead, IsTerminal};

use anyhow::{Context, Result, bail};
use clap::Parser;
use facescrape_core::{
    ClientOptions, Credentials, ExportSpec, FaceScraper, SearchFilter, SiteProfile,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

mod cli;
mod config;

use cli::Args;
use config::FileConfig;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();
    let file_config = config::load_config(args.config.as_deref())?.unwrap_or_default();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > config verbosity > info
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => file_config
                .verbosity
                .map_or("info", config::VerbositySetting::filter_directive),
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    debug!(
        house = ?args.house,
        year = ?args.year,
        output = %args.output.display(),
        "CLI arguments parsed"
    );
    info!("facescrape starting");

    let password = read_password(&args.password_env)?;
    let credentials = Credentials::new(args.username.clone(), password);

    let site = file_config.apply_site(SiteProfile::default());
    let options = client_options(&file_config, &args);
    let search_filter = build_filter(&args);
    if search_filter.is_empty() {
        info!("no search filter given; fetching the whole directory");
    }

    let mut scraper = FaceScraper::with_config(credentials, site, &options)
        .context("failed to initialize HTTP client")?;

    scraper.login().await.context("login failed")?;

    let progress = if args.quiet || !io::stderr().is_terminal() {
        ProgressBar::hidden()
    } else {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner} [{bar:40}] {pos}/{len} records ({eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        bar
    };

    let outcome = scraper
        .search_with_progress(&search_filter, |done, total| {
            progress.set_length(total as u64);
            progress.set_position(done as u64);
        })
        .await
        .context("directory search failed")?;
    progress.finish_and_clear();

    for failed in &outcome.failed {
        warn!(id = %failed.id, error = %failed.error, "record skipped");
    }

    if args.json {
        let stdout = io::stdout();
        serde_json::to_writer_pretty(stdout.lock(), &outcome.records)
            .context("failed to write JSON output")?;
        println!();
    } else {
        let columns = args.columns.as_deref().map(ExportSpec::parse_list);
        if columns.as_ref().is_some_and(ExportSpec::is_empty) {
            bail!("--columns must name at least one column");
        }
        scraper
            .export(&args.output, columns)
            .with_context(|| format!("failed to export to '{}'", args.output.display()))?;
        info!(path = %args.output.display(), "CSV written");
    }

    info!(
        records = outcome.records.len(),
        failed = outcome.failed.len(),
        total = outcome.total(),
        "scrape complete"
    );

    Ok(())
}

fn read_password(env_name: &str) -> Result<String> {
    if let Ok(value) = std::env::var(env_name)
        && !value.is_empty()
    {
        return Ok(value);
    }

    if io::stdin().is_terminal() {
        bail!("no password: set {env_name} or pipe the password on stdin");
    }

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read password from stdin")?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        bail!("empty password on stdin");
    }
    Ok(password)
}

fn client_options(file_config: &FileConfig, args: &Args) -> ClientOptions {
    let mut options = file_config.apply_client(ClientOptions::default());
    if let Some(max_redirects) = args.max_redirects {
        options.max_redirects = usize::from(max_redirects);
    }
    options
}

fn build_filter(args: &Args) -> SearchFilter {
    let mut filter = SearchFilter::new();
    if let Some(house) = &args.house {
        filter = filter.house(house);
    }
    if let Some(house) = &args.assigned_house {
        filter = filter.assigned_house(house);
    }
    if let Some(year) = &args.year {
        filter = filter.year(year);
    }
    if let Some(concentration) = &args.concentration {
        filter = filter.concentration(concentration);
    }
    if let Some(name) = &args.first_name {
        filter = filter.first_name(name);
    }
    if let Some(name) = &args.last_name {
        filter = filter.last_name(name);
    }
    for (key, value) in &args.filters {
        filter.insert(key.clone(), value.clone());
    }
    filter
}
