use anyhow::{Context, Result};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::unbounded_channel;

use phototriage::cache::ResultCache;
use phototriage::config::Config;
use phototriage::engine::{AnalysisUpdate, BatchAnalysisEngine, BatchOutcome, EngineSettings};
use phototriage::library::DirectoryLibrary;
use phototriage::logging;
use phototriage::scorer::{QualityScorer, RemoteScorer};
use phototriage::session::TriageSession;
use phototriage::storage::SqliteStore;

#[derive(Debug, Default)]
struct Args {
    config_path: Option<PathBuf>,
    library: Option<PathBuf>,
    batches: Option<usize>,
    all: bool,
    delete_bad: bool,
    stats: bool,
    clear_cache: bool,
    health: bool,
}

fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    let mut parsed = Args::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("phototriage {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--config" | "-c" => {
                parsed.config_path = Some(PathBuf::from(value_for(&args, i, "--config")));
                i += 1;
            }
            "--library" | "-l" => {
                parsed.library = Some(PathBuf::from(value_for(&args, i, "--library")));
                i += 1;
            }
            "--batches" | "-n" => {
                let value = value_for(&args, i, "--batches");
                match value.parse::<usize>() {
                    Ok(n) if n > 0 => parsed.batches = Some(n),
                    _ => {
                        eprintln!("Error: --batches expects a positive number, got '{}'", value);
                        std::process::exit(1);
                    }
                }
                i += 1;
            }
            "--all" => parsed.all = true,
            "--delete-bad" => parsed.delete_bad = true,
            "--stats" => parsed.stats = true,
            "--clear-cache" => parsed.clear_cache = true,
            "--health" => parsed.health = true,
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    parsed
}

fn value_for<'a>(args: &'a [String], i: usize, flag: &str) -> &'a str {
    match args.get(i + 1) {
        Some(value) => value,
        None => {
            eprintln!("Error: {} requires an argument", flag);
            std::process::exit(1);
        }
    }
}

fn print_help() {
    println!(
        r#"phototriage - score a photo library for quality and weed out bad shots

USAGE:
    phototriage [OPTIONS]

OPTIONS:
    --config, -c PATH    Path to config file
    --library, -l DIR    Photo directory (overrides library.path)
    --batches, -n N      Analyze N batches (default 1)
    --all                Analyze every photo in the library
    --delete-bad         Delete photos scored bad after analysis (failures are kept)
    --stats              Show result cache statistics and exit
    --clear-cache        Drop all cached results and exit
    --health             Check the scoring service and exit
    --version, -V        Show version
    --help, -h           Show this help message

ENVIRONMENT:
    PHOTOTRIAGE_CONFIG   Path to config file (overrides default location)
    PHOTOTRIAGE_LOG      Log level (trace, debug, info, warn, error)

Config file location: $XDG_CONFIG_HOME/phototriage/config.toml"#
    );
}

fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}

fn print_update(update: AnalysisUpdate) {
    match update {
        AnalysisUpdate::Progress(progress) => {
            eprint!(
                "\r  {:>3}% ({}/{})",
                progress.percent(),
                progress.current,
                progress.total
            );
            let _ = std::io::stderr().flush();
        }
        AnalysisUpdate::Status(message) => println!("{}", message),
        AnalysisUpdate::BatchComplete {
            photos,
            batch_number,
            total_batches,
        } => {
            let good = photos.iter().filter(|p| p.is_good()).count();
            eprintln!();
            println!(
                "Batch {}/{} done: {} good, {} bad",
                batch_number,
                total_batches,
                good,
                photos.len() - good
            );
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = parse_args();

    // Initialize logging (uses journald on Linux, file fallback otherwise)
    let _ = logging::init(Some(Config::config_dir().join("logs")));

    let mut config = match &args.config_path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(library) = args.library.clone() {
        config.library.path = library;
    }

    let store = SqliteStore::open(&config.cache.db_path).with_context(|| {
        format!("Failed to open result cache {}", config.cache.db_path.display())
    })?;
    let cache = Arc::new(ResultCache::from_config(Arc::new(store), &config.cache));

    if args.clear_cache {
        let cleared = cache.len();
        cache.clear();
        println!("Cleared {} cached results", cleared);
        return Ok(());
    }

    if args.stats {
        let stats = cache.stats();
        println!("Cached results: {}", stats.total_entries);
        println!("  valid:   {}", stats.valid_entries);
        println!("  expired: {}", stats.expired_entries);
        println!("  memory:  ~{}", format_size(stats.approx_memory_bytes as u64));
        return Ok(());
    }

    let scorer = Arc::new(RemoteScorer::new(&config.scorer));

    if args.health {
        let probe = scorer.clone();
        let healthy = tokio::task::spawn_blocking(move || probe.is_healthy()).await?;
        if healthy {
            println!("Scoring service at {} is healthy", scorer.endpoint());
            return Ok(());
        }
        anyhow::bail!("Scoring service at {} is not reachable", scorer.endpoint());
    }

    let library = DirectoryLibrary::from_config(&config).with_context(|| {
        format!("Failed to open photo library {}", config.library.path.display())
    })?;

    let cancel = Arc::new(AtomicBool::new(false));
    let engine = BatchAnalysisEngine::new(scorer, cache)
        .with_settings(EngineSettings::from(&config.analysis))
        .with_cancel_flag(cancel.clone());
    let mut session = TriageSession::new(Arc::new(library), engine);

    let loaded = session.load_initial(config.analysis.initial_load)?;
    println!(
        "Loaded {} of {} photos from {}",
        loaded,
        session.collection().total_asset_count(),
        config.library.path.display()
    );

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, stopping after the current photo");
            cancel.store(true, Ordering::SeqCst);
        }
    });

    let max_batches = if args.all {
        usize::MAX
    } else {
        args.batches.unwrap_or(1)
    };

    // The engine blocks on HTTP, so it runs off the runtime and reports back
    // over the channel. The worker hands the session back when it is done.
    let (tx, mut rx) = unbounded_channel::<AnalysisUpdate>();
    let worker = tokio::task::spawn_blocking(move || {
        let mut observer = tx;
        let mut completed = 0;
        while completed < max_batches {
            let outcome = if completed == 0 {
                session.analyze_next_batch(&mut observer)
            } else {
                session.continue_to_next_batch(&mut observer)
            };
            match outcome {
                BatchOutcome::Completed(_) => completed += 1,
                _ => break,
            }
        }
        (session, completed)
    });

    while let Some(update) = rx.recv().await {
        print_update(update);
    }
    let (mut session, completed) = worker.await?;

    let bad = session.bad_photos();
    println!(
        "\n{} batch(es) analyzed: {} good, {} bad, {} still unanalyzed",
        completed,
        session.good_photos().len(),
        bad.len(),
        session.collection().unanalyzed_count()
    );
    for photo in &bad {
        println!(
            "  {:>5.2}  {:>9}  {}",
            photo.quality_score.unwrap_or(0.0),
            format_size(photo.file_size_bytes),
            photo.path.display()
        );
    }
    println!(
        "Bad photos use {}",
        format_size(session.collection().total_bad_size())
    );

    if args.delete_bad {
        let selected = session.select_all_bad_scored();
        let failed = session.failed_count();
        if failed > 0 {
            println!("Keeping {} photo(s) that could not be scored", failed);
        }
        if selected == 0 {
            println!("Nothing to delete");
            return Ok(());
        }
        let size = session.selected_size();
        let deleted = session.delete_selected()?;
        println!(
            "Deleted {} of {} bad photos ({})",
            deleted.len(),
            selected,
            format_size(size)
        );
    }

    Ok(())
}
