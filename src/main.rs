//! CLI entry point for preview-fetch.

use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use preview_fetch::config::{FetchOptions, load_default_file_config, load_file_config};
use preview_fetch::{
    BoundedFetcher, CanonicalResolver, FetchRequest, PageMetadata, pretty_size, uri,
};
use reqwest::header::HeaderMap;
use serde::Serialize;
use tracing::{debug, info, warn};

mod cli;

use cli::{Args, Command, FetchArgs};

/// JSON shape printed by `preview --json`.
#[derive(Debug, Serialize)]
struct PreviewOutput<'a> {
    url: &'a str,
    followed_canonical: bool,
    #[serde(flatten)]
    metadata: &'a PageMetadata,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    init_tracing(args.verbose, args.quiet);
    debug!(?args, "CLI arguments parsed");

    let Args {
        config,
        fetch,
        command,
        ..
    } = args;

    match command {
        Command::Encode { uri } => println!("{}", uri::encode(&uri)),
        Command::Decode { text } => println!("{}", uri::decode(&text)),
        Command::Preview { url, json } => {
            let fetcher = network_fetcher(config.as_deref(), &fetch)?;
            run_preview(fetcher, &url, json).await?;
        }
        Command::Fetch {
            url,
            max_redirects,
            headers,
        } => {
            let fetcher = network_fetcher(config.as_deref(), &fetch)?;
            let mut request = FetchRequest::new(url.as_str())
                .with_headers(headers.into_iter().collect::<HeaderMap>());
            if let Some(limit) = max_redirects {
                request = request.with_redirect_limit(limit);
            }
            run_fetch(&fetcher, request).await?;
        }
        Command::Size { url } => {
            let fetcher = network_fetcher(config.as_deref(), &fetch)?;
            run_size(&fetcher, &url).await?;
        }
    }
    Ok(())
}

/// Priority: `RUST_LOG` env var > quiet flag > verbose flag > default (info).
/// Logs go to stderr; stdout carries command output.
fn init_tracing(verbose: u8, quiet: bool) {
    let default_level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "info",
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
}

/// Defaults, then the config file, then CLI flags.
fn build_options(config: Option<&Path>, fetch: &FetchArgs) -> Result<FetchOptions> {
    let file_config = if let Some(path) = config {
        Some(load_file_config(path)?)
    } else {
        let loaded = load_default_file_config()?;
        if let Some(path) = &loaded.path {
            debug!(path = %path.display(), found = loaded.config.is_some(), "default config file");
        }
        loaded.config
    };

    let mut options = FetchOptions::default();
    if let Some(file_config) = &file_config {
        options = options.with_file_config(file_config);
    }
    Ok(fetch.apply(options))
}

/// Only network commands read the config file.
fn network_fetcher(config: Option<&Path>, fetch: &FetchArgs) -> Result<BoundedFetcher> {
    let options = build_options(config, fetch)?;
    debug!(?options, "fetch options resolved");
    BoundedFetcher::new(options).context("Failed to build HTTP client")
}

async fn run_preview(fetcher: BoundedFetcher, url: &str, json: bool) -> Result<()> {
    let resolver = CanonicalResolver::new(Arc::new(fetcher));
    let page = resolver
        .fetch_page(url)
        .await
        .with_context(|| format!("Cannot preview '{url}'"))?;
    if page.body.is_none() {
        warn!(url, "page could not be fetched; metadata will be empty");
    }
    let metadata = page.document().metadata(&page.url);

    if json {
        let output = PreviewOutput {
            url: page.url.as_str(),
            followed_canonical: page.followed_canonical,
            metadata: &metadata,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("url: {}", page.url);
    for (label, value) in [
        ("title", &metadata.title),
        ("description", &metadata.description),
        ("image", &metadata.image),
        ("site", &metadata.site_name),
        ("canonical", &metadata.canonical_url),
    ] {
        if let Some(value) = value {
            println!("{label}: {value}");
        }
    }
    Ok(())
}

async fn run_fetch(fetcher: &BoundedFetcher, request: FetchRequest) -> Result<()> {
    let location = request.location().to_string();
    let body = fetcher
        .fetch_request(request)
        .await
        .with_context(|| format!("Failed to fetch '{location}'"))?;
    info!(bytes = body.len(), size = %pretty_size(body.len() as u64), "writing body to stdout");

    let mut stdout = io::stdout().lock();
    stdout.write_all(&body)?;
    stdout.flush()?;
    Ok(())
}

async fn run_size(fetcher: &BoundedFetcher, url: &str) -> Result<()> {
    let size = fetcher
        .content_length(url)
        .await
        .with_context(|| format!("Failed to query size of '{url}'"))?;
    match size {
        Some(bytes) => println!("{}", pretty_size(bytes)),
        None => println!("unknown"),
    }
    Ok(())
}
