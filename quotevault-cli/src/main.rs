//! quotevault CLI: inspect and fill the local bar cache.
//!
//! Commands:
//! - `list` lists cached securities
//! - `status` reports the committed range per security
//! - `show` prints a (optionally summarized) window of bars
//! - `returns` prints period returns over a window
//! - `retrieve` serves a window from cache, importing from a CSV directory on a miss
//! - `common` aligns two securities on shared timestamps
//! - `remove` deletes a security from the cache

use anyhow::{bail, Context, Result};
use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use quotevault_core::data::FetchResult;
use quotevault_core::domain::{end_of_day, format_timestamp, parse_timestamp};
use quotevault_core::{
    find_common, CsvSource, DataSource, MetaCache, Origin, Retriever, SecurityId, Series,
    StoreConfig, Timestamp,
};

#[derive(Parser)]
#[command(name = "quotevault", about = "Local cache of daily security bars")]
struct Cli {
    /// Store config file (TOML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Cache root directory. Overrides the config file.
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Log at debug level.
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List securities in the cache.
    List,
    /// Report the committed range of each security (all when none given).
    Status { ids: Vec<String> },
    /// Print the cached bars of a security.
    Show {
        id: String,

        /// Window start (YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS).
        #[arg(long)]
        start: Option<String>,

        /// Window end, inclusive. A bare date covers the whole day.
        #[arg(long)]
        end: Option<String>,

        /// Replace close with adjusted close.
        #[arg(long, default_value_t = false)]
        adjusted: bool,

        /// Collapse every N bars into one.
        #[arg(long, conflicts_with = "monthly")]
        every: Option<usize>,

        /// Collapse bars by calendar month.
        #[arg(long, default_value_t = false)]
        monthly: bool,

        /// Print JSON instead of a table.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Print close-to-close returns of a security.
    Returns {
        id: String,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
    },
    /// Retrieve a window, importing from a CSV directory on a cache miss.
    Retrieve {
        id: String,

        /// Directory of `<SYMBOL>.csv` files used as the remote source.
        #[arg(long)]
        source_dir: PathBuf,

        #[arg(long)]
        start: String,

        #[arg(long)]
        end: String,

        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Align two securities on their shared timestamps.
    Common {
        left: String,
        right: String,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
    },
    /// Delete a security's data file and sidecar.
    Remove { id: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config, cli.root)?;
    let cache = MetaCache::from_config(&config);

    match cli.command {
        Commands::List => run_list(&cache),
        Commands::Status { ids } => run_status(&cache, &ids),
        Commands::Show {
            id,
            start,
            end,
            adjusted,
            every,
            monthly,
            json,
        } => run_show(&cache, &id, start, end, adjusted, every, monthly, json),
        Commands::Returns { id, start, end } => run_returns(&cache, &id, start, end),
        Commands::Retrieve {
            id,
            source_dir,
            start,
            end,
            json,
        } => run_retrieve(cache, &id, source_dir, &start, &end, json),
        Commands::Common {
            left,
            right,
            start,
            end,
        } => run_common(&cache, &left, &right, start, end),
        Commands::Remove { id } => run_remove(&cache, &id),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<PathBuf>, root: Option<PathBuf>) -> Result<StoreConfig> {
    let mut config = match path {
        Some(path) => StoreConfig::from_file(&path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => StoreConfig::default(),
    };
    if let Some(root) = root {
        config.root = root;
    }
    Ok(config)
}

fn parse_id(raw: &str) -> Result<SecurityId> {
    SecurityId::new(raw).with_context(|| format!("bad security id '{raw}'"))
}

/// Parses a window bound. A date-only end bound is widened to the end of that day.
fn parse_bound(raw: &str, is_end: bool) -> Result<Timestamp> {
    let ts = parse_timestamp(raw).with_context(|| format!("invalid date '{raw}'"))?;
    let date_only = !raw.contains('T') && !raw.trim().contains(' ');
    Ok(if is_end && date_only { end_of_day(ts) } else { ts })
}

fn load_window(
    cache: &MetaCache,
    id: &SecurityId,
    start: Option<String>,
    end: Option<String>,
) -> Result<FetchResult> {
    let result = match (start, end) {
        (None, None) => cache.get(id),
        (start, end) => {
            let start = match start {
                Some(s) => parse_bound(&s, false)?,
                None => NaiveDateTime::MIN,
            };
            let end = match end {
                Some(e) => parse_bound(&e, true)?,
                None => NaiveDateTime::MAX,
            };
            if end < start {
                bail!("--end is before --start");
            }
            cache.get_range(id, start, end)
        }
    };
    result.with_context(|| format!("reading {id}"))
}

fn run_list(cache: &MetaCache) -> Result<()> {
    let ids = cache
        .list_securities()
        .with_context(|| format!("listing {}", cache.root().display()))?;
    if ids.is_empty() {
        println!("Cache is empty: {}", cache.root().display());
        return Ok(());
    }
    for id in ids {
        println!("{id}");
    }
    Ok(())
}

fn run_status(cache: &MetaCache, ids: &[String]) -> Result<()> {
    let ids = if ids.is_empty() {
        cache.list_securities()?
    } else {
        ids.iter().map(|s| parse_id(s)).collect::<Result<Vec<_>>>()?
    };

    println!("Cache: {}", cache.root().display());
    println!("{:<10} {:<20} {:<20} Name", "Security", "Start", "End");
    println!("{}", "-".repeat(64));
    for id in &ids {
        match cache.committed_range(id) {
            Ok(Some(range)) => println!(
                "{:<10} {:<20} {:<20} {}",
                id.as_str(),
                format_timestamp(&range.start),
                format_timestamp(&range.end),
                range.info.name.as_deref().unwrap_or("")
            ),
            Ok(None) => println!("{:<10} (not cached)", id.as_str()),
            Err(e) => println!("{:<10} (unreadable: {e})", id.as_str()),
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_show(
    cache: &MetaCache,
    id: &str,
    start: Option<String>,
    end: Option<String>,
    adjusted: bool,
    every: Option<usize>,
    monthly: bool,
    json: bool,
) -> Result<()> {
    let id = parse_id(id)?;
    let mut series = load_window(cache, &id, start, end)?.series;

    if adjusted {
        series.use_adjusted();
    }
    if monthly {
        series = series.summarize_monthly();
    } else if let Some(n) = every {
        if n == 0 {
            bail!("--every must be at least 1");
        }
        series = series.summarize(n);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&series)?);
    } else {
        print_bars(&series);
    }
    Ok(())
}

fn print_bars(series: &Series) {
    if series.is_empty() {
        println!("(no bars)");
        return;
    }
    println!(
        "{:<20} {:>10} {:>10} {:>10} {:>10} {:>14} {:>10}",
        "Time", "Open", "High", "Low", "Close", "Volume", "AdjClose"
    );
    for bar in series {
        println!(
            "{:<20} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>14.0} {:>10.2}",
            format_timestamp(&bar.trade_time),
            bar.open,
            bar.max,
            bar.min,
            bar.close,
            bar.volume,
            bar.adjusted_close
        );
    }
}

fn run_returns(
    cache: &MetaCache,
    id: &str,
    start: Option<String>,
    end: Option<String>,
) -> Result<()> {
    let id = parse_id(id)?;
    let series = load_window(cache, &id, start, end)?.series;
    let returns = series.returns();
    if returns.is_empty() {
        println!("(fewer than two bars)");
        return Ok(());
    }

    for (bar, r) in series.iter().skip(1).zip(&returns) {
        println!("{:<20} {:>10.4}%", format_timestamp(&bar.trade_time), r * 100.0);
    }
    let total = returns.iter().fold(1.0, |acc, r| acc * (1.0 + r)) - 1.0;
    println!("{}", "-".repeat(32));
    println!("{:<20} {:>10.4}%", "Compounded", total * 100.0);
    Ok(())
}

fn run_retrieve(
    cache: MetaCache,
    id: &str,
    source_dir: PathBuf,
    start: &str,
    end: &str,
    json: bool,
) -> Result<()> {
    let id = parse_id(id)?;
    let start = parse_bound(start, false)?;
    let end = parse_bound(end, true)?;
    if end < start {
        bail!("--end is before --start");
    }

    let retriever = Retriever::new(cache, CsvSource::new(source_dir));
    let retrieved = retriever
        .retrieve_detailed(&id, start, end)
        .with_context(|| format!("retrieving {id}"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&retrieved.series)?);
        return Ok(());
    }

    let origin = match retrieved.origin {
        Origin::Cache => "cache",
        Origin::Remote => "csv import",
    };
    println!(
        "{id}: {} bars from {origin} for {} .. {}",
        retrieved.series.len(),
        format_timestamp(&start),
        format_timestamp(&end)
    );
    if let Some(name) = &retrieved.info.name {
        println!("Name: {name}");
    }
    Ok(())
}

fn run_common(
    cache: &MetaCache,
    left: &str,
    right: &str,
    start: Option<String>,
    end: Option<String>,
) -> Result<()> {
    let left_id = parse_id(left)?;
    let right_id = parse_id(right)?;
    let a = load_window(cache, &left_id, start.clone(), end.clone())?.series;
    let b = load_window(cache, &right_id, start, end)?.series;

    let (a, b) = find_common(&a, &b).with_context(|| format!("aligning {left_id} with {right_id}"))?;
    let (first, last) = match (a.first(), a.last()) {
        (Some(first), Some(last)) => (first.trade_time, last.trade_time),
        _ => bail!("no common bars"),
    };

    println!(
        "{left_id} / {right_id}: {} common bars, {} .. {}",
        a.len(),
        format_timestamp(&first),
        format_timestamp(&last)
    );
    println!(
        "{:<20} {:>12} {:>12}",
        "Time",
        left_id.as_str(),
        right_id.as_str()
    );
    for (x, y) in a.iter().zip(&b) {
        println!(
            "{:<20} {:>12.2} {:>12.2}",
            format_timestamp(&x.trade_time),
            x.close,
            y.close
        );
    }
    Ok(())
}

fn run_remove(cache: &MetaCache, id: &str) -> Result<()> {
    let id = parse_id(id)?;
    if !cache.has(&id) {
        println!("{id} is not cached");
        return Ok(());
    }
    cache.remove(&id).with_context(|| format!("removing {id}"))?;
    println!("Removed {id}");
    Ok(())
}
