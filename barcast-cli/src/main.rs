//! Barcast CLI — evaluate requests, import histories, manage the store.
//!
//! Commands:
//! - `eval` — evaluate a request JSON file against the store (batch or streaming)
//! - `import` — load a CSV history into the Parquet store
//! - `synth` — generate a seeded synthetic history
//! - `store status` — report stored instruments, date ranges, sizes
//! - `cache status` / `cache clear` — inspect or remove cached response streams

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use barcast_core::request::EvalRequest;
use barcast_engine::store::ParquetStore;
use barcast_engine::stream_cache::StreamCache;
use barcast_engine::{Engine, EngineConfig};

#[derive(Parser)]
#[command(
    name = "barcast",
    about = "Barcast CLI — indicator condition evaluation over daily histories"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a request JSON file against the store.
    Eval {
        /// Path to the request JSON (idnectums, conditions, dates).
        #[arg(long)]
        request: PathBuf,

        /// Execution mode: batch, stream, parallel, cached.
        #[arg(long, default_value = "stream")]
        mode: String,

        /// Store directory. Defaults to ./data.
        #[arg(long, default_value = "data")]
        store_dir: PathBuf,

        /// Optional engine config TOML.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Write output here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Load a CSV history (date,open,high,low,close,volume) into the store.
    Import {
        /// Instrument id to import under.
        #[arg(long)]
        id: i64,

        /// CSV file to import.
        #[arg(long)]
        file: PathBuf,

        /// Store directory. Defaults to ./data.
        #[arg(long, default_value = "data")]
        store_dir: PathBuf,
    },
    /// Generate a seeded synthetic history.
    Synth {
        /// Instrument id to write.
        #[arg(long)]
        id: i64,

        /// Number of daily bars.
        #[arg(long, default_value_t = 2520)]
        days: usize,

        /// First bar date (YYYY-MM-DD). Defaults to 10 years ago.
        #[arg(long)]
        start: Option<String>,

        /// Random walk seed.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Store directory. Defaults to ./data.
        #[arg(long, default_value = "data")]
        store_dir: PathBuf,
    },
    /// Store management commands.
    Store {
        #[command(subcommand)]
        action: StoreAction,
    },
    /// Stream cache management commands.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum StoreAction {
    /// Report stored instruments, date ranges, row counts, and sizes.
    Status {
        /// Store directory. Defaults to ./data.
        #[arg(long, default_value = "data")]
        store_dir: PathBuf,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Report cached response streams and their sizes.
    Status {
        /// Stream cache directory. Defaults to ./cache.
        #[arg(long, default_value = "cache")]
        cache_dir: PathBuf,
    },
    /// Remove cached response stream files.
    Clear {
        /// Stream cache directory. Defaults to ./cache.
        #[arg(long, default_value = "cache")]
        cache_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Eval {
            request,
            mode,
            store_dir,
            config,
            output,
        } => run_eval(&request, &mode, store_dir, config, output),
        Commands::Import {
            id,
            file,
            store_dir,
        } => run_import(id, &file, store_dir),
        Commands::Synth {
            id,
            days,
            start,
            seed,
            store_dir,
        } => run_synth(id, days, start, seed, store_dir),
        Commands::Store { action } => match action {
            StoreAction::Status { store_dir } => run_store_status(&store_dir),
        },
        Commands::Cache { action } => match action {
            CacheAction::Status { cache_dir } => run_cache_status(&cache_dir),
            CacheAction::Clear { cache_dir } => run_cache_clear(cache_dir),
        },
    }
}

fn run_eval(
    request_path: &Path,
    mode: &str,
    store_dir: PathBuf,
    config_path: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<()> {
    let content = std::fs::read_to_string(request_path)
        .with_context(|| format!("reading request {}", request_path.display()))?;
    let request: EvalRequest = serde_json::from_str(&content)?;

    let config = match config_path {
        Some(path) => EngineConfig::from_file(&path)?,
        None => EngineConfig::default(),
    };

    let store = Arc::new(ParquetStore::new(store_dir));
    let engine = Engine::new(store, config);

    match output {
        Some(path) => {
            let file = File::create(&path)
                .with_context(|| format!("creating output file {}", path.display()))?;
            let mut sink = BufWriter::new(file);
            dispatch_eval(&engine, &request, mode, &mut sink)?;
            println!("Wrote {}", path.display());
        }
        None => {
            let stdout = io::stdout();
            let mut sink = stdout.lock();
            dispatch_eval(&engine, &request, mode, &mut sink)?;
        }
    }

    Ok(())
}

fn dispatch_eval(
    engine: &Engine,
    request: &EvalRequest,
    mode: &str,
    sink: &mut dyn Write,
) -> Result<()> {
    match mode {
        "batch" => {
            let results = engine.evaluate(request)?;
            serde_json::to_writer(&mut *sink, &*results)?;
            sink.write_all(b"\n")?;
            sink.flush()?;
        }
        "stream" => engine.stream(request, sink)?,
        "parallel" => engine.stream_parallel(request, sink)?,
        "cached" => engine.stream_cached(request, sink)?,
        other => bail!("unknown mode '{other}' (expected batch, stream, parallel, cached)"),
    }
    Ok(())
}

fn run_import(id: i64, file: &Path, store_dir: PathBuf) -> Result<()> {
    let store = ParquetStore::new(store_dir);
    let rows = store.import_csv(id, file)?;

    println!("Imported {rows} row(s) for instrument {id}");
    if let Some(meta) = store.meta(id) {
        println!("Range: {} to {}", meta.start_date, meta.end_date);
    }
    Ok(())
}

fn run_synth(
    id: i64,
    days: usize,
    start: Option<String>,
    seed: u64,
    store_dir: PathBuf,
) -> Result<()> {
    let start_date = start
        .as_deref()
        .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()?
        .unwrap_or_else(|| chrono::Local::now().date_naive() - chrono::Duration::days(365 * 10));

    let store = ParquetStore::new(store_dir);
    let written = store.generate_synthetic(id, start_date, days, seed)?;

    println!("Generated {written} bar(s) for instrument {id} starting {start_date} (seed {seed})");
    Ok(())
}

fn run_store_status(store_dir: &Path) -> Result<()> {
    if !store_dir.exists() {
        println!("Store directory does not exist: {}", store_dir.display());
        return Ok(());
    }

    let store = ParquetStore::new(store_dir);
    let ids = store.instruments();

    let mut total_size = 0u64;
    let mut rows: Vec<(i64, String, String, String, u64)> = Vec::new();
    for id in &ids {
        let dir = store_dir.join(format!("instrument={id}"));
        let size = dir_size(&dir);
        total_size += size;
        match store.meta(*id) {
            Some(meta) => rows.push((
                *id,
                format!("{} to {}", meta.start_date, meta.end_date),
                meta.row_count.to_string(),
                meta.source,
                size,
            )),
            None => rows.push((*id, "?".to_string(), "?".to_string(), "?".to_string(), size)),
        }
    }

    println!("Store: {}", store_dir.display());
    println!("Instruments: {}", ids.len());
    println!("Total size: {}", format_size(total_size));
    println!();
    println!(
        "{:<10} {:<25} {:<8} {:<10} {:>10}",
        "Id", "Date Range", "Rows", "Source", "Size"
    );
    println!("{}", "-".repeat(67));
    for (id, range, bars, source, size) in &rows {
        println!(
            "{:<10} {:<25} {:<8} {:<10} {:>10}",
            id,
            range,
            bars,
            source,
            format_size(*size)
        );
    }

    Ok(())
}

fn run_cache_status(cache_dir: &Path) -> Result<()> {
    if !cache_dir.exists() {
        println!("Cache directory does not exist: {}", cache_dir.display());
        return Ok(());
    }

    let mut streams: Vec<(String, u64)> = Vec::new();
    for entry in std::fs::read_dir(cache_dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("json") {
            let name = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("?")
                .to_string();
            streams.push((name, entry.metadata()?.len()));
        }
    }
    streams.sort();

    let total: u64 = streams.iter().map(|(_, size)| size).sum();
    println!("Cache: {}", cache_dir.display());
    println!("Streams: {}", streams.len());
    println!("Total size: {}", format_size(total));
    if !streams.is_empty() {
        println!();
        for (fingerprint, size) in &streams {
            println!("{fingerprint}  {}", format_size(*size));
        }
    }
    Ok(())
}

fn run_cache_clear(cache_dir: PathBuf) -> Result<()> {
    if !cache_dir.exists() {
        println!("Cache directory does not exist: {}", cache_dir.display());
        return Ok(());
    }

    let removed = StreamCache::new(cache_dir).clear()?;
    println!("Removed {removed} cached stream(s).");
    Ok(())
}

fn dir_size(path: &Path) -> u64 {
    let mut size = 0u64;
    if let Ok(entries) = std::fs::read_dir(path) {
        for entry in entries.flatten() {
            if let Ok(meta) = entry.metadata() {
                size += meta.len();
            }
        }
    }
    size
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
