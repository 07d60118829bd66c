//! Proxy admin console - proxy-console demo
//!
//! Assembles one admin page out of proxy-console units and prints the
//! resulting HTML document:
//! 1. The page root (`PageContext`) owns the cookie store, bus and asset loader
//! 2. Each unit is mounted through a `UnitHost`: assets, template, data, render
//! 3. Loaded styles and scripts land in the document head exactly once
//!
//! Assets come from copies bundled into the binary, or from a running proxy
//! when `--base-url` is given.
//!
//! # Usage
//!
//! ```sh
//! # Dashboard with the bundled snapshot
//! cargo run -p admin-console
//!
//! # Cookie page with a couple of control cookies set
//! cargo run -p admin-console -- cookies --set mitm-debug=true --set mitm-rating=0.5
//!
//! # API data page served by a running proxy
//! cargo run -p admin-console -- api-data --base-url http://localhost:8080/
//! ```

mod bundled;
mod pages;

use std::path::{Path, PathBuf};
use std::rc::Rc;

use clap::Parser;
use proxy_console::prelude::*;
use proxy_console::StoreError;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::bundled::BundledFetcher;
use crate::pages::{Page, RequestInfo};

/// Render the proxy admin pages with proxy-console units
#[derive(Parser, Debug)]
#[command(name = "admin-console")]
#[command(about = "Assemble the proxy admin pages from proxy-console units")]
struct Args {
    /// Page to assemble
    #[arg(value_enum, default_value_t = Page::Dashboard)]
    page: Page,

    /// Fetch assets and data from this origin instead of the bundled copies
    #[arg(long)]
    base_url: Option<String>,

    /// Initial cookie jar, in `document.cookie` form
    #[arg(long, default_value = "")]
    cookies: String,

    /// Set a control cookie before rendering (repeatable)
    #[arg(long = "set", value_name = "NAME=VALUE")]
    set: Vec<String>,

    /// Console configuration (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Cookie definitions table (JSON) replacing the built-in one
    #[arg(long)]
    definitions: Option<PathBuf>,

    /// Host shown on the dashboard's request card
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Write the document here instead of stdout
    #[arg(long, short)]
    out: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
enum AppError {
    #[error("could not read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid JSON in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid --set '{0}': expected NAME=VALUE")]
    Assignment(String),
    #[error("cannot set {key}: {source}")]
    Rejected {
        key: String,
        source: ValidationError,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Unit(#[from] UnitError),
    #[error("could not write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(error) = run(args).await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), AppError> {
    let config = match &args.config {
        Some(path) => ConsoleConfig::from_json(&read(path)?).map_err(|source| AppError::Parse {
            path: path.clone(),
            source,
        })?,
        None => ConsoleConfig::default(),
    };

    let fetcher: Rc<dyn Fetcher> = match &args.base_url {
        Some(base) => {
            info!(base, "Fetching from proxy");
            Rc::new(HttpFetcher::new(base)?)
        }
        None => Rc::new(BundledFetcher),
    };

    let mut page = PageContext::new(
        config,
        Rc::new(MemoryJar::from_cookie_string(&args.cookies)),
        fetcher,
    );
    if let Some(path) = &args.definitions {
        let table = DefinitionTable::from_json(&read(path)?).map_err(|source| AppError::Parse {
            path: path.clone(),
            source,
        })?;
        page = page.with_definitions(table);
    }

    for assignment in &args.set {
        apply(&page, assignment)?;
    }

    let request = RequestInfo {
        host: args.host.clone(),
        path: args.page.path().to_string(),
    };
    let html = pages::render(args.page, &page, &request).await?;

    match &args.out {
        Some(path) => std::fs::write(path, html).map_err(|source| AppError::Write {
            path: path.clone(),
            source,
        })?,
        None => print!("{html}"),
    }
    Ok(())
}

fn read(path: &Path) -> Result<String, AppError> {
    std::fs::read_to_string(path).map_err(|source| AppError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Validate `NAME=VALUE` against the definitions and write it
fn apply(page: &PageContext, assignment: &str) -> Result<(), AppError> {
    let (key, value) = assignment
        .split_once('=')
        .ok_or_else(|| AppError::Assignment(assignment.to_string()))?;
    let submission =
        validate_submission(page.definitions(), Some(key.trim()), value).map_err(|source| {
            AppError::Rejected {
                key: key.trim().to_string(),
                source,
            }
        })?;
    page.store().set(&submission.key, &submission.value)?;
    debug!(key = %submission.key, value = %submission.value, "Cookie set");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> PageContext {
        PageContext::new(
            ConsoleConfig::default(),
            Rc::new(MemoryJar::new()),
            Rc::new(BundledFetcher),
        )
    }

    #[test]
    fn test_apply_writes_canonical_value() {
        let page = page();
        apply(&page, "mitm-rating=.5").unwrap();
        assert_eq!(page.store().get("mitm-rating").as_deref(), Some("0.5"));
    }

    #[test]
    fn test_apply_rejects_without_writing() {
        let page = page();
        assert!(matches!(apply(&page, "mitm-rating"), Err(AppError::Assignment(_))));
        assert!(matches!(
            apply(&page, "mitm-rating=5"),
            Err(AppError::Rejected {
                source: ValidationError::OutOfRange { .. },
                ..
            })
        ));
        assert!(page.store().list("mitm-").is_empty());
    }

    #[test]
    fn test_cli_parses_repeated_sets() {
        let args = Args::parse_from([
            "admin-console",
            "cookies",
            "--set",
            "mitm-debug=true",
            "--set",
            "mitm-show=x",
        ]);
        assert_eq!(args.page, Page::Cookies);
        assert_eq!(args.set.len(), 2);
        assert!(args.base_url.is_none());
    }
}
