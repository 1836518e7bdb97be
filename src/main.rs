use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use url::Url;

use sdprobe::config::Config;
use sdprobe::crawl::{CrawlOptions, Walker};
use sdprobe::feed::AuthorRule;

#[derive(Parser, Debug)]
#[command(name = "sdprobe", about = "Conformance checker for SDShare syndication servers")]
struct Args {
    /// Base URI of the server under test (overrides SDSHARE_SERVER and the
    /// config file)
    server: Option<String>,

    /// Path to the config file
    #[arg(long, value_name = "FILE", default_value = "sdprobe.toml")]
    config: PathBuf,

    /// Reading of the author rule for feeds with no entries
    #[arg(long, value_enum)]
    author_rule: Option<AuthorRule>,

    /// Keep crawling past structural violations instead of pruning the branch
    #[arg(long)]
    keep_going: bool,

    /// Upper bound on pages followed along one 'next' chain
    #[arg(long, value_name = "N")]
    max_pages: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,
}

/// Exit codes: 0 clean, 1 violations found, 2 setup failure.
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let config = match Config::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    };

    // Precedence: CLI argument, then SDSHARE_SERVER, then the config file
    let server = args
        .server
        .or_else(|| std::env::var("SDSHARE_SERVER").ok())
        .or(config.server);
    let Some(server) = server else {
        eprintln!("Error: no server given.");
        eprintln!();
        eprintln!("Pass the base URI as an argument:");
        eprintln!("  sdprobe http://example.org/sdshare");
        eprintln!();
        eprintln!("or set SDSHARE_SERVER, or set `server` in sdprobe.toml.");
        std::process::exit(2);
    };
    let server = match Url::parse(&server) {
        Ok(url) => url,
        Err(e) => {
            eprintln!("Error: invalid server URI '{}': {}", server, e);
            std::process::exit(2);
        }
    };

    let timeout = Duration::from_secs(args.timeout.unwrap_or(config.timeout_secs));
    let options = CrawlOptions {
        author_rule: args.author_rule.unwrap_or(config.author_rule),
        keep_going: args.keep_going || config.keep_going,
        max_pages: args.max_pages.unwrap_or(config.max_pages),
        timeout,
    };

    let client = match reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("sdprobe/", env!("CARGO_PKG_VERSION")))
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Error: failed to build HTTP client: {}", e);
            std::process::exit(2);
        }
    };

    let report = Walker::new(client, options).run(&server).await;

    for warning in &report.warnings {
        println!("warning: {}", warning);
    }
    if report.is_clean() {
        println!("OK: {} conforms ({} warnings)", server, report.warnings.len());
        Ok(())
    } else {
        for violation in &report.violations {
            println!("{}", violation);
        }
        println!("{} violations found", report.violations.len());
        std::process::exit(1);
    }
}
