mod config;
mod output;
mod persist;
mod scan;

use clap::Parser;
use std::io::{self, BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};
use tierpick_core::{
    AnchorPolicy, EngineState, RankingEngine, RankingMetric, Selection, Side,
};

use crate::config::{TierpickConfig, DEFAULT_STATE_FILE};

pub fn bail(msg: impl std::fmt::Display) -> ! {
    eprintln!("Error: {msg}");
    std::process::exit(1);
}

#[derive(Parser)]
#[command(name = "tierpick", version, about = "Sort images into tiers by voting on pairs")]
struct Cli {
    /// More logging (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Create a default config file at ~/.config/tierpick/config.toml (or under $XDG_CONFIG_HOME)
    Init,
    /// Vote on image pairs from a folder
    Vote(VoteArgs),
    /// Show rankings, tier distribution and bounds
    Stats(StatsArgs),
    /// Export rankings to CSV
    Export(ExportArgs),
}

#[derive(Parser)]
struct CommonArgs {
    /// State file (default: .tierpick.json, next to the images for `vote`)
    #[arg(long)]
    state: Option<PathBuf>,

    /// Path to config file (default: ~/.config/tierpick/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Parser)]
struct VoteArgs {
    /// Folder holding the images (not searched recursively)
    #[arg(long)]
    dir: PathBuf,

    /// Fixed RNG seed for reproducible pairs
    #[arg(long)]
    seed: Option<u64>,

    /// How pairs are drawn from a crowded tier: "split-halves" or "extremes"
    #[arg(long)]
    anchor_policy: Option<String>,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Parser)]
struct StatsArgs {
    /// Output JSON instead of tables
    #[arg(long)]
    json: bool,

    /// Sort key: tier, votes, win_rate, stability, recency, confidence
    #[arg(long, default_value = "tier")]
    by: String,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Parser)]
struct ExportArgs {
    /// Output CSV path
    #[arg(long)]
    csv: PathBuf,

    /// Sort key for the exported rows
    #[arg(long, default_value = "tier")]
    by: String,

    #[command(flatten)]
    common: CommonArgs,
}

/// What the voter typed at the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Choice {
    Vote(Side),
    Skip,
    Quit,
}

fn parse_choice(input: &str) -> Option<Choice> {
    match input.trim().to_ascii_lowercase().as_str() {
        "1" | "l" => Some(Choice::Vote(Side::Left)),
        "2" | "r" => Some(Choice::Vote(Side::Right)),
        "s" => Some(Choice::Skip),
        "q" => Some(Choice::Quit),
        _ => None,
    }
}

fn parse_metric(value: &str) -> RankingMetric {
    RankingMetric::parse(value).unwrap_or_else(|| {
        bail(format!(
            "Unknown metric \"{value}\". Use tier, votes, win_rate, stability, recency or confidence."
        ))
    })
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Init => {
            let path = config::config_path().unwrap_or_else(|e| bail(e));
            config::write_default_config(&path).unwrap_or_else(|e| bail(e));
            println!("Created config at {}", path.display());
            println!("Edit it to tune tier spread, bounds and selection weights.");
        }
        Commands::Vote(args) => run_vote(args),
        Commands::Stats(args) => run_stats(args),
        Commands::Export(args) => run_export(args),
    }
}

fn load_cli_config(common: &CommonArgs) -> TierpickConfig {
    let path = match &common.config {
        Some(path) => path.clone(),
        None => config::config_path().unwrap_or_else(|e| bail(e)),
    };
    config::load_config(&path).unwrap_or_else(|e| bail(e))
}

/// `--state` if given, else the configured (or default) file name under `base`.
fn state_path(common: &CommonArgs, cfg: &TierpickConfig, base: &Path) -> PathBuf {
    common.state.clone().unwrap_or_else(|| {
        base.join(cfg.state_file.as_deref().unwrap_or(DEFAULT_STATE_FILE))
    })
}

/// Builds an engine from saved state, letting config-file settings override
/// the ones the state was saved with.
fn open_engine(
    state: Option<EngineState>,
    cfg: &TierpickConfig,
    anchor_policy: Option<AnchorPolicy>,
) -> RankingEngine {
    let mut state = state.unwrap_or_default();
    if let Some(algorithm) = &cfg.algorithm {
        state.config = algorithm.clone();
    }
    if let Some(left) = &cfg.left_weights {
        state.left_weights = Some(left.clone());
    }
    if let Some(right) = &cfg.right_weights {
        state.right_weights = Some(right.clone());
    }
    if let Some(policy) = anchor_policy {
        state.config.anchor_policy = policy;
    }
    RankingEngine::from_state(state).unwrap_or_else(|e| bail(e))
}

fn read_state(path: &Path) -> Option<EngineState> {
    persist::load_state(path)
        .unwrap_or_else(|e| bail(format!("Failed to read state at {}: {e}", path.display())))
}

fn read_existing_state(path: &Path) -> EngineState {
    read_state(path).unwrap_or_else(|| {
        bail(format!("No state file at {}. Run `tierpick vote` first.", path.display()))
    })
}

fn run_vote(args: VoteArgs) {
    let cfg = load_cli_config(&args.common);
    let images = scan::scan_images(&args.dir)
        .unwrap_or_else(|e| bail(format!("Failed to scan {}: {e}", args.dir.display())));
    if images.len() < 2 {
        bail(format!(
            "Need at least 2 images in {} to compare, found {}",
            args.dir.display(),
            images.len()
        ));
    }

    let path = state_path(&args.common, &cfg, &args.dir);
    let anchor_policy = args.anchor_policy.as_deref().map(|value| {
        AnchorPolicy::parse(value).unwrap_or_else(|| {
            bail(format!("Unknown anchor policy \"{value}\". Use \"split-halves\" or \"extremes\"."))
        })
    });
    let mut engine = open_engine(read_state(&path), &cfg, anchor_policy);
    if let Some(seed) = args.seed.or(cfg.seed) {
        engine.reseed(seed);
    }

    let added = engine.seed_items(images.iter());
    let missing = engine.len().saturating_sub(images.len());
    if missing > 0 {
        log::warn!(
            "{missing} items in the state file are no longer in {} and will not be shown",
            args.dir.display()
        );
    }
    eprintln!(
        "{} images ({added} new), {} votes so far. Keys: 1/l left wins, 2/r right wins, s skip, q quit.",
        images.len(),
        engine.round_index()
    );

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    'rounds: loop {
        let pair = match engine.select_pair_among(&images).unwrap_or_else(|e| bail(e)) {
            Selection::Pair(pair) => pair,
            Selection::NotEnoughItems { available } => {
                bail(format!("Only {available} items available, need 2"))
            }
        };

        println!("\nRound {}: {}", engine.round_index() + 1, pair.reason);
        println!("  [1] {}", args.dir.join(&pair.left).display());
        println!("  [2] {}", args.dir.join(&pair.right).display());

        let choice = loop {
            print!("> ");
            let _ = io::stdout().flush();
            let line = match lines.next() {
                Some(Ok(line)) => line,
                Some(Err(e)) => bail(format!("Failed to read from stdin: {e}")),
                None => break Choice::Quit,
            };
            match parse_choice(&line) {
                Some(choice) => break choice,
                None => println!("Type 1 or l (left), 2 or r (right), s to skip, q to quit."),
            }
        };

        let side = match choice {
            Choice::Vote(side) => side,
            Choice::Skip => continue 'rounds,
            Choice::Quit => break 'rounds,
        };

        let outcome = engine.record_choice(&pair, side).unwrap_or_else(|e| bail(e));
        let (winner, loser) = (pair.id(side), pair.id(side.other()));
        println!(
            "  {winner}: {:+} -> {:+}{}   {loser}: {:+} -> {:+}{}",
            outcome.winner.from,
            outcome.winner.to,
            if outcome.winner.blocked { " (at bound)" } else { "" },
            outcome.loser.from,
            outcome.loser.to,
            if outcome.loser.blocked { " (at bound)" } else { "" },
        );

        persist::save_state(&path, &engine.to_state())
            .unwrap_or_else(|e| bail(format!("Failed to save state to {}: {e}", path.display())));
    }

    output::print_summary(&engine.summary());
    println!("State saved to {}", path.display());
}

fn run_stats(args: StatsArgs) {
    let cfg = load_cli_config(&args.common);
    let metric = parse_metric(&args.by);
    let path = state_path(&args.common, &cfg, Path::new("."));
    let engine = open_engine(Some(read_existing_state(&path)), &cfg, None);

    let rankings = engine.rankings(metric);
    let summary = engine.summary();
    let distribution = engine.distribution().unwrap_or_else(|e| bail(e));
    let bounds = engine.bounds_report();

    if args.json {
        output::print_json(&rankings, metric, &summary, &distribution, &bounds)
            .unwrap_or_else(|e| bail(format!("Failed to encode JSON: {e}")));
    } else {
        output::print_table(&rankings, metric);
        output::print_summary(&summary);
        output::print_distribution(&distribution);
        output::print_bounds(&bounds);
    }
}

fn run_export(args: ExportArgs) {
    let cfg = load_cli_config(&args.common);
    let metric = parse_metric(&args.by);
    let path = state_path(&args.common, &cfg, Path::new("."));
    let engine = open_engine(Some(read_existing_state(&path)), &cfg, None);
    let rankings = engine.rankings(metric);

    let file = std::fs::File::create(&args.csv)
        .unwrap_or_else(|e| bail(format!("Failed to create {}: {e}", args.csv.display())));
    let mut out = BufWriter::new(file);
    output::write_csv(&mut out, &rankings)
        .and_then(|()| out.flush())
        .unwrap_or_else(|e| bail(format!("Failed to write {}: {e}", args.csv.display())));
    println!("Exported {} items to {}", rankings.len(), args.csv.display());
}
