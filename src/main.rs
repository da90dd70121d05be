use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use env_logger::Env;

use pagesift::{OutputFormat, ScrapeConfig, TargetSchema, run_scrape, write_result};

/// Distill rendered pages into compact summaries and extract records.
#[derive(Debug, Parser)]
#[command(name = "pagesift", version, about)]
struct Args {
    /// Target schema file (JSON)
    #[arg(short, long, conflicts_with = "url")]
    schema: Option<PathBuf>,

    /// Bare URL to scrape without a schema (summary/fallback tiers only)
    #[arg(short, long)]
    url: Option<String>,

    /// Result file
    #[arg(short, long, default_value = "./output/result.json")]
    output: PathBuf,

    /// Output format: json, jsonl or csv
    #[arg(short, long, default_value = "json")]
    format: String,

    /// Override the schema's page budget
    #[arg(long)]
    max_pages: Option<usize>,

    /// Override the schema's record budget
    #[arg(long)]
    max_items: Option<usize>,

    /// Follow discovered same-site links from each page
    #[arg(long)]
    follow_links: bool,

    /// Run with a visible browser window
    #[arg(long)]
    headed: bool,

    /// Allow image/media/font loads (blocked by default)
    #[arg(long)]
    load_media: bool,

    /// Write per-step debug artifacts under this directory
    #[arg(long)]
    debug_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut schema = match (&args.schema, &args.url) {
        (Some(path), _) => TargetSchema::from_file(path)?,
        (None, Some(url)) => TargetSchema::for_url(url.clone()),
        (None, None) => bail!("provide --schema <file> or --url <url>"),
    };
    if let Some(max_pages) = args.max_pages {
        schema.max_pages = max_pages;
    }
    if let Some(max_items) = args.max_items {
        schema.max_items = max_items;
    }
    if args.follow_links {
        schema.follow_links = true;
    }
    schema.validate()?;

    let format: OutputFormat = args
        .format
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;
    let output_dir = args
        .output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), PathBuf::from);

    let config = ScrapeConfig::builder()
        .output_dir(output_dir)
        .format(format)
        .headless(!args.headed)
        .block_media(!args.load_media)
        .debug_dir(args.debug_dir.clone())
        .build();

    let result = run_scrape(&config, &schema).await?;
    write_result(&result, &args.output, config.format())
        .with_context(|| format!("failed to write {}", args.output.display()))?;

    println!(
        "{} records from {} pages in {:.1}s -> {}",
        result.metadata.item_count,
        result.metadata.page_count,
        result.metadata.duration_ms as f64 / 1000.0,
        args.output.display()
    );
    if !result.metadata.errors.is_empty() {
        println!("{} errors recorded during the run", result.metadata.errors.len());
    }
    Ok(())
}
