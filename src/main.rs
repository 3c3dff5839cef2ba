//! repolens - live git repository discovery and monitoring.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use repolens::config::{ConfigLoader, MonitorConfig};
use repolens::fetch::FetchActivityFlag;
use repolens::fs::{NotifyDetectorFactory, NotifyObserverFactory};
use repolens::git::GitDirReader;
use repolens::monitor::{MonitorEvent, RepositoryMonitor};
use repolens::ports::{RepositoryReader, StaticPathProvider};
use repolens::repository::RepositorySnapshot;
use repolens::store::FileRepositoryStore;

#[derive(Parser)]
#[command(
    name = "repolens",
    about = "Live git repository discovery and monitoring",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Config file path (defaults to .repolens.toml, then the user config dir).
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the configured roots once and print what was found.
    Scan {
        /// Roots to scan, overriding the configured ones.
        roots: Vec<PathBuf>,
        /// Print snapshots as JSON lines.
        #[arg(long)]
        json: bool,
    },
    /// Scan, then keep watching and stream change events until interrupted.
    Watch {
        /// Roots to watch, overriding the configured ones.
        roots: Vec<PathBuf>,
        /// Print events as JSON lines.
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

fn load_config(path: Option<PathBuf>) -> MonitorConfig {
    let loader = path.map_or_else(ConfigLoader::new, ConfigLoader::with_path);
    match loader.load() {
        Ok(config) => config,
        Err(error) => {
            eprintln!("{error}");
            std::process::exit(1);
        }
    }
}

fn store_path(config: &MonitorConfig) -> PathBuf {
    config
        .store_path
        .clone()
        .or_else(FileRepositoryStore::default_path)
        .unwrap_or_else(|| PathBuf::from(".repolens-store.json"))
}

fn build_monitor(config: &MonitorConfig, roots: Vec<PathBuf>) -> RepositoryMonitor {
    let roots = if roots.is_empty() {
        config.roots.clone()
    } else {
        roots
    };
    let reader: Arc<dyn RepositoryReader> = Arc::new(GitDirReader::new());

    RepositoryMonitor::new(
        Arc::new(StaticPathProvider::new(roots)),
        Arc::clone(&reader),
        Arc::new(NotifyDetectorFactory::new(reader)),
        Arc::new(NotifyObserverFactory),
        Arc::new(FileRepositoryStore::new(store_path(config))),
        Arc::new(FetchActivityFlag::new()),
        config.timings(),
    )
}

fn print_snapshot(snapshot: &RepositorySnapshot, json: bool) {
    if json {
        if let Ok(line) = serde_json::to_string(snapshot) {
            println!("{line}");
        }
    } else {
        println!(
            "{}  {} [{}]",
            snapshot.path.display(),
            snapshot.name.green(),
            snapshot.current_branch.cyan()
        );
    }
}

fn print_event(event: &MonitorEvent, json: bool) {
    match event {
        MonitorEvent::ChangeDetected(snapshot) => {
            if json {
                if let Ok(line) = serde_json::to_string(snapshot) {
                    println!("{line}");
                }
            } else {
                println!(
                    "{} {} [{}]",
                    "+".green().bold(),
                    snapshot.path.display(),
                    snapshot.current_branch.cyan()
                );
            }
        }
        MonitorEvent::DeletionDetected(path) => {
            if json {
                println!("{{\"deleted\":{}}}", serde_json::json!(path));
            } else {
                println!("{} {}", "-".red().bold(), path.display());
            }
        }
        MonitorEvent::ScanStateChanged(scanning) => {
            if !json {
                let state = if *scanning { "scanning" } else { "idle" };
                println!("{} {}", "*".yellow(), state.dimmed());
            }
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config);

    match cli.command {
        Commands::Scan { roots, json } => {
            let monitor = build_monitor(&config, roots);
            monitor.scan_for_repositories().await;

            for snapshot in monitor.repositories() {
                print_snapshot(&snapshot, json);
            }
        }
        Commands::Watch { roots, json } => {
            let monitor = build_monitor(&config, roots);
            let mut events = monitor.subscribe();

            monitor.observe();
            let scanner = monitor.clone();
            tokio::spawn(async move {
                scanner.scan_for_repositories().await;
            });

            loop {
                tokio::select! {
                    event = events.recv() => match event {
                        Ok(event) => print_event(&event, json),
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                            tracing::warn!(missed, "Event stream lagged");
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    },
                    _ = tokio::signal::ctrl_c() => {
                        tracing::info!("Shutting down");
                        break;
                    }
                }
            }

            monitor.stop();
        }
    }
}
