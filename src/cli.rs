use crate::{
    config::{self, SiteUrls},
    fetch,
    scrape::ScrapeOpts,
};
use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel, log::LevelFilter};
use std::{io, path::PathBuf, time::Duration};
use tracing_subscriber::filter::LevelFilter as TFilter;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Default, ValueEnum)]
pub enum LogFormat {
    Normal,
    #[default]
    Compact,
    Pretty,
    Json,
}

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None, propagate_version = true)]
pub struct Cli {
    /// Log level verbosity, -v shows progress
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Which log formatter to use
    // env will pick up the value if the field name is given as the key in uppercase
    #[arg(short = 'f', long, env, default_value_t, value_enum, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Scrape restaurants and menus into a JSON file
    Scrape(ScrapeArgs),
    /// Load a scraped JSON file into the database
    Load(LoadArgs),
}

#[derive(Debug, Clone, Args)]
pub struct ScrapeArgs {
    /// Read pages from the cache when present, and cache fetched pages
    #[arg(long)]
    pub use_cache: bool,

    /// Only fetch the listing pages, skip detail pages and menus
    #[arg(long)]
    pub listings_only: bool,

    /// Maximum number of listing pages to fetch
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub pages: Option<u32>,

    /// Delay between requests, in seconds
    #[arg(long, default_value = "1.5", value_parser = parse_delay)]
    pub delay: Duration,

    /// Output file
    #[arg(short, long, default_value = config::OUTPUT_FILE)]
    pub output: PathBuf,

    /// Site to scrape
    #[arg(long, env, default_value = config::BASE_URL)]
    pub base_url: String,

    /// Where to keep raw pages when --use-cache is given
    #[arg(long, default_value = config::CACHE_DIR)]
    pub cache_dir: PathBuf,

    /// Per request timeout, e.g. "30s" or "1m"
    #[arg(long, default_value = "30s")]
    pub timeout: humantime::Duration,
}

#[derive(Debug, Clone, Args)]
pub struct LoadArgs {
    /// Transform and print sample rows without writing to the database
    #[arg(long)]
    pub dry_run: bool,

    /// Input file, as written by the scrape command
    #[arg(short, long, default_value = config::OUTPUT_FILE)]
    pub input: PathBuf,

    /// File to read the database URL and key from
    #[arg(long, default_value = config::ENV_FILE)]
    pub env_file: PathBuf,

    /// Number of rows per upsert request
    #[arg(long, default_value_t = config::UPSERT_BATCH_SIZE)]
    pub batch_size: usize,
}

/// Seconds as a float, e.g. "1.5"
fn parse_delay(s: &str) -> Result<Duration, String> {
    let secs: f64 = s.trim().parse().map_err(|e| format!("{e}"))?;
    Duration::try_from_secs_f64(secs).map_err(|_| format!("invalid delay: {s}"))
}

impl ScrapeArgs {
    pub fn scrape_opts(&self) -> ScrapeOpts {
        ScrapeOpts {
            urls: SiteUrls::new(&self.base_url),
            fetch: fetch::Opts {
                request_delay: self.delay,
                request_timeout: self.timeout.into(),
                ..Default::default()
            },
            cache_dir: self.use_cache.then(|| self.cache_dir.clone()),
            max_pages: self.pages,
            listings_only: self.listings_only,
        }
    }
}

impl Cli {
    // this thin wrapper makes it possible to do the parsing without importing clap::Parser at the
    // call site
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Maps clap_verbosity_flag::LevelFilter values to tracing_subscriber::filter::LevelFilter
    /// values
    fn tracing_level_filter(&self) -> TFilter {
        match self.verbosity.log_level_filter() {
            LevelFilter::Off => TFilter::OFF,
            LevelFilter::Error => TFilter::ERROR,
            LevelFilter::Warn => TFilter::WARN,
            LevelFilter::Info => TFilter::INFO,
            LevelFilter::Debug => TFilter::DEBUG,
            LevelFilter::Trace => TFilter::TRACE,
        }
    }

    /// Logs always go to stderr, stdout is reserved for command output
    pub fn init_logger(&self) -> Result<()> {
        let layer = match self.log_format {
            LogFormat::Json => fmt::layer().json().with_writer(io::stderr).boxed(),
            LogFormat::Pretty => fmt::layer().pretty().with_writer(io::stderr).boxed(),
            LogFormat::Compact => fmt::layer()
                .without_time()
                .compact()
                .with_writer(io::stderr)
                .boxed(),
            LogFormat::Normal => fmt::layer().with_writer(io::stderr).boxed(),
        };
        tracing_subscriber::registry()
            .with(
                EnvFilter::builder()
                    .with_default_directive(self.tracing_level_filter().into())
                    .from_env()?,
            )
            .with(layer)
            .init();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("rwscrape").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn scrape_defaults() {
        let cli = parse(&["scrape"]);
        assert_eq!(TFilter::WARN, cli.tracing_level_filter());
        let Commands::Scrape(args) = cli.command else {
            panic!("expected scrape");
        };
        assert!(!args.use_cache);
        assert_eq!(Duration::from_millis(1500), args.delay);
        assert_eq!(PathBuf::from(config::OUTPUT_FILE), args.output);

        let opts = args.scrape_opts();
        assert!(opts.cache_dir.is_none());
        assert_eq!(None, opts.max_pages);
        assert_eq!(Duration::from_secs(30), opts.fetch.request_timeout);
        assert_eq!(config::MAX_RETRIES, opts.fetch.max_retries);
    }

    #[test]
    fn scrape_flags() {
        let cli = parse(&[
            "scrape",
            "-v",
            "--use-cache",
            "--listings-only",
            "--pages",
            "2",
            "--delay",
            "0.25",
            "-o",
            "out/r.json",
            "--base-url",
            "http://localhost:8080/",
            "--timeout",
            "5s",
        ]);
        assert_eq!(TFilter::INFO, cli.tracing_level_filter());
        let Commands::Scrape(args) = cli.command else {
            panic!("expected scrape");
        };
        let opts = args.scrape_opts();
        assert_eq!(Some(PathBuf::from(config::CACHE_DIR)), opts.cache_dir);
        assert!(opts.listings_only);
        assert_eq!(Some(2), opts.max_pages);
        assert_eq!(Duration::from_millis(250), opts.fetch.request_delay);
        assert_eq!(Duration::from_secs(5), opts.fetch.request_timeout);
        assert_eq!("http://localhost:8080", opts.urls.base());
        assert_eq!(PathBuf::from("out/r.json"), args.output);
    }

    #[test]
    fn invalid_scrape_values() {
        for args in [
            ["scrape", "--delay", "-1"],
            ["scrape", "--delay", "soon"],
            ["scrape", "--pages", "0"],
        ] {
            assert!(Cli::try_parse_from(std::iter::once("rwscrape").chain(args)).is_err());
        }
    }

    #[test]
    fn load_args() {
        let cli = parse(&["-q", "load", "--dry-run", "-i", "in.json", "--batch-size", "10"]);
        assert_eq!(TFilter::ERROR, cli.tracing_level_filter());
        let Commands::Load(args) = cli.command else {
            panic!("expected load");
        };
        assert!(args.dry_run);
        assert_eq!(PathBuf::from("in.json"), args.input);
        assert_eq!(PathBuf::from(config::ENV_FILE), args.env_file);
        assert_eq!(10, args.batch_size);
    }
}
