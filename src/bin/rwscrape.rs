use anyhow::{Context, Result};
use rwscrape::{
    cli::{Cli, Commands, LoadArgs, ScrapeArgs},
    loader::{self, LoaderConfig, RestStore},
    output::JsonWriter,
    scrape::Scraper,
};
use tracing::info;

const DRY_RUN_SAMPLE: usize = 3;

// Everything is sequential and rate limited, a single thread is all we need
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();
    cli.init_logger()?;

    match cli.command {
        Commands::Scrape(args) => scrape(args).await,
        Commands::Load(args) => load(args).await,
    }
}

async fn scrape(args: ScrapeArgs) -> Result<()> {
    let restaurants = Scraper::new(args.scrape_opts()).run().await?;
    let path = JsonWriter::new(&args.output).write(&restaurants)?;
    info!(count = restaurants.len(), path = %path.display(), "Wrote restaurants");

    println!("{}", path.display());
    Ok(())
}

async fn load(args: LoadArgs) -> Result<()> {
    info!(input = %args.input.display(), "Loading restaurant data...");
    let rows = loader::transform_all(loader::load_restaurants(&args.input)?);
    info!(rows = rows.len(), "Transformed restaurants");

    if args.dry_run {
        println!(
            "\n--- Dry run: showing first {} of {} rows ---\n",
            DRY_RUN_SAMPLE.min(rows.len()),
            rows.len()
        );
        for row in rows.iter().take(DRY_RUN_SAMPLE) {
            println!("{}", serde_json::to_string_pretty(row)?);
        }
        println!("\n--- {} total rows would be upserted ---", rows.len());
        return Ok(());
    }

    // fail on missing credentials before touching the network
    let cfg = LoaderConfig::from_env(&args.env_file)?;
    let store = RestStore::new(&cfg)?;
    info!(url = %cfg.url, "Upserting restaurants...");
    let count = loader::upsert_restaurants(&store, &rows, args.batch_size)
        .await
        .context("Failed to upsert restaurants")?;
    info!(count, "Done");
    Ok(())
}
