use clap::{Parser, Subcommand};
use datefold::{config, organize::Organizer, output, scan};
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn version_string() -> &'static str {
    if env!("DATEFOLD_RELEASE") == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("DATEFOLD_GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup, called exactly once
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "datefold")]
#[command(about = "Sort photos into date folders without clobbering or losing duplicates")]
#[command(long_about = "\
Sort photos into date folders without clobbering or losing duplicates

Every file under INPUT is copied (never moved) into OUTPUT, into a folder
named after its EXIF capture date. Files without a date keep their input
layout under 'no date information/'.

  photos/                          sorted/
  ├── trip/IMG_1.jpg  (2020:05:01)  ├── 2020/05/01/
  ├── trip/IMG_1 copy.jpg (same)    │   ├── IMG_1.jpg
  ├── other/IMG_1.jpg (different)   │   ├── IMG_1-0.jpg
  └── trip/notes.txt                │   └── duplicates-<hash>/<hash>.jpg
                                    └── no date information/trip/notes.txt

Placement rules (nothing is ever overwritten):
  Same content already in the folder  → duplicates-<hash>/<hash>.<ext>
  Same name, different content        → <name>-0, <name>-1, ...
  Otherwise                           → kept as-is

Date resolution (first available wins):
  EXIF DateTimeOriginal → EXIF DateTime → undated

Run 'datefold gen-config' to generate a documented datefold.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Config file (default: datefold.toml in the input directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log placement decisions to stderr (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

/// Input and output roots; both must already exist.
#[derive(clap::Args, Clone)]
struct Roots {
    /// Directory of photos to sort
    input: PathBuf,
    /// Directory to sort them into
    output: PathBuf,
}

#[derive(Subcommand)]
enum Command {
    /// Copy files from INPUT into date folders under OUTPUT
    Sort {
        #[command(flatten)]
        roots: Roots,
        /// Write a JSON report of every placement and failure
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Show where each file would go, without copying anything
    Check(Roots),
    /// Print a stock datefold.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Sort { roots, report } => {
            let config = load_config(cli.config.as_deref(), &roots.input)?;
            init_thread_pool(&config.processing);

            println!("==> Scanning {}", roots.input.display());
            let scan = scan::scan(&roots.input, &roots.output, &config)?;
            for line in output::format_skipped(&scan.skipped, &scan.input) {
                println!("{}", line);
            }
            let input_root = scan.input.clone();
            let output_root = scan.output.clone();
            let requests = scan.into_requests();

            println!(
                "==> Sorting {} files into {}",
                requests.len(),
                output_root.display()
            );
            let mut organizer = Organizer::from_config(&config);
            organizer.prefetch(&requests);

            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_event(&event, &input_root, &output_root) {
                        println!("{}", line);
                    }
                }
            });
            let run = organizer.run(requests, Some(tx));
            printer.join().map_err(|_| "output thread panicked")?;

            println!();
            output::print_report(&run, &organizer.fingerprints().stats());

            if let Some(path) = report {
                let json = serde_json::to_string_pretty(&run)?;
                std::fs::write(&path, json)?;
                println!("Report: {}", path.display());
            }
        }
        Command::Check(roots) => {
            let config = load_config(cli.config.as_deref(), &roots.input)?;
            println!("==> Checking {}", roots.input.display());
            let scan = scan::scan(&roots.input, &roots.output, &config)?;
            output::print_scan_output(&scan);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Route `tracing` output to stderr.
///
/// `--verbose` turns on debug logging; otherwise `RUST_LOG` decides, with
/// warnings (per-file failures) shown by default.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Explicit `--config` wins; otherwise look in the input root.
fn load_config(explicit: Option<&Path>, input: &Path) -> Result<config::SortConfig, config::ConfigError> {
    match explicit {
        Some(path) => config::load_config_file(path),
        None => config::load_config(input),
    }
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores: config can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
