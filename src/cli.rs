//! CLI interface for Holomem
//!
//! Provides command-line access to the memory engine:
//! - Running a line-oriented memory script against a simulated clock
//! - A built-in fan-effect demonstration
//!
//! The binary is a stand-in host: it owns the simulated clock, schedules
//! each pending completion by advancing the clock, and reports what landed
//! in the output buffer.

use crate::chunk::Bindings;
use crate::store::{Completion, DeclarativeMemory, GramMode, MemoryConfig, RequestOptions};
use crate::timing::SimClock;
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "holomem")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Holographic declarative memory engine")]
#[command(
    long_about = "Holomem - a vector-symbolic associative memory\n\n\
    Chunks (slot:value records or ordered value lists) are encoded into\n\
    holographic vectors and retrieved by similarity rather than exact key\n\
    lookup. Retrieval takes simulated time as a function of similarity, can\n\
    fail below threshold, and forgets under noise and decay.\n\n\
    Examples:\n\
      holomem run -s memory.hdm -v\n\
      holomem fan --latency 0.63"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Execute a line-oriented memory script against a simulated clock
    #[command(
        long_about = "Execute a memory script\n\n\
        Each line of the script is one directive:\n\
          add <chunk>          store a chunk\n\
          request <chunk>      retrieve the value for the single `?`\n\
          request-new <chunk>  as request, skipping recently recalled values\n\
          resonance <chunk>    judge familiarity of a complete chunk\n\
          probe <chunk>        print the activation without retrieving\n\
          wait <seconds>       advance simulated time\n\
          clear                forget all accumulated traces\n\
        Blank lines and lines starting with `#` are ignored."
    )]
    Run {
        /// Script file to execute
        #[arg(short, long, value_name = "FILE")]
        script: PathBuf,

        /// JSON file with store parameters; omitted fields take defaults,
        /// and the individual parameter flags below are ignored
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Vector dimensionality
        #[arg(long, default_value_t = 512)]
        dim: usize,

        /// Latency factor F in F*e^(-activation)
        #[arg(long, default_value_t = 0.05)]
        latency: f64,

        /// Minimum activation for successful retrieval
        #[arg(long, default_value_t = 0.1)]
        threshold: f64,

        /// Time-scaled noise injected into stored vectors
        #[arg(long, default_value_t = 0.0)]
        noise: f64,

        /// Retention factor per add (1 = no decay)
        #[arg(long, default_value_t = 1.0)]
        forgetting: f64,

        /// Seed for reproducible vectors
        #[arg(long)]
        seed: Option<u64>,

        /// Use the unconstrained open-gram fold instead of windowed n-grams
        #[arg(long)]
        unconstrained: bool,

        /// Enable verbose diagnostics
        #[arg(short, long)]
        verbose: bool,
    },

    /// Run the built-in fan-effect demonstration
    #[command(
        long_about = "Fan-effect demonstration\n\n\
        Stores a study set of person-location facts plus background noise\n\
        facts, then probes each studied pair (and a few foils). Reaction\n\
        times grow with the number of facts sharing a cue - the fan effect."
    )]
    Fan {
        /// Vector dimensionality
        #[arg(long, default_value_t = 512)]
        dim: usize,

        /// Latency factor
        #[arg(long, default_value_t = 0.63)]
        latency: f64,

        /// Background facts per item
        #[arg(long, default_value_t = 10)]
        background: usize,

        /// Seed for reproducible vectors
        #[arg(long)]
        seed: Option<u64>,

        /// Enable verbose diagnostics
        #[arg(short, long)]
        verbose: bool,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            script,
            config,
            dim,
            latency,
            threshold,
            noise,
            forgetting,
            seed,
            unconstrained,
            verbose,
        } => {
            init_tracing(verbose);
            let config = match config {
                Some(path) => {
                    let text = fs::read_to_string(&path).with_context(|| {
                        format!("cannot read config {}", path.display())
                    })?;
                    serde_json::from_str(&text)
                        .with_context(|| format!("bad config {}", path.display()))?
                }
                None => MemoryConfig {
                    dim,
                    latency,
                    threshold,
                    noise,
                    forgetting,
                    seed,
                    gram_mode: if unconstrained {
                        GramMode::Unconstrained
                    } else {
                        GramMode::Windowed
                    },
                    ..MemoryConfig::default()
                },
            };
            run_script(&script, config)
        }

        Commands::Fan {
            dim,
            latency,
            background,
            seed,
            verbose,
        } => {
            init_tracing(verbose);
            let config = MemoryConfig {
                dim,
                latency,
                seed,
                ..MemoryConfig::default()
            };
            run_fan(config, background)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "holomem=debug" } else { "holomem=info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn run_script(path: &Path, config: MemoryConfig) -> Result<()> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("cannot read script {}", path.display()))?;

    let clock = SimClock::new();
    let mut memory = DeclarativeMemory::new(config, Box::new(clock.clone()));

    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (directive, rest) = match line.split_once(char::is_whitespace) {
            Some((d, r)) => (d, r.trim()),
            None => (line, ""),
        };
        let fail = |what: &str| format!("line {}: {} `{}`", lineno + 1, what, line);

        match directive {
            "add" => {
                memory.add(rest).with_context(|| fail("bad add"))?;
            }
            "request" | "request-new" => {
                let options = RequestOptions {
                    require_new: directive == "request-new",
                    bindings: Bindings::new(),
                };
                let handle = memory
                    .request_with(rest, &options)
                    .with_context(|| fail("bad request"))?;
                let rt = handle.delay();
                clock.advance(rt);
                report(&memory.on_timer(handle), rt);
            }
            "resonance" => {
                let handle = memory
                    .resonance(rest)
                    .with_context(|| fail("bad resonance"))?;
                let rt = handle.delay();
                clock.advance(rt);
                report(&memory.on_timer(handle), rt);
            }
            "probe" => {
                let activation = memory
                    .get_activation(rest)
                    .with_context(|| fail("bad probe"))?;
                println!("probe {rest} -> activation {activation:.4}");
            }
            "wait" => {
                let secs: f64 = rest.parse().with_context(|| fail("bad wait"))?;
                clock.advance(secs);
            }
            "clear" => memory.clear(),
            _ => bail!(fail("unknown directive")),
        }
    }

    Ok(())
}

fn report(completion: &Completion, rt: f64) {
    match completion {
        Completion::Recalled(retrieved) => println!(
            "recalled {} (activation {:.4}, rt {:.3}s)",
            retrieved.chunk, retrieved.activation, rt
        ),
        Completion::Failed => println!("failed (rt {rt:.3}s)"),
        Completion::Superseded => println!("superseded"),
    }
}

fn run_fan(config: MemoryConfig, background: usize) -> Result<()> {
    let clock = SimClock::new();
    let mut memory = DeclarativeMemory::new(config, Box::new(clock.clone()));

    let people = [
        "hippie", "captain", "debutante", "fireman", "giant", "earl", "lawyer",
    ];
    let places = [
        "park", "church", "bank", "cave", "beach", "castle", "dungeon", "forest", "store",
    ];

    // Background knowledge: each person and place is already associated
    // with `background` unrelated items.
    for person in &people {
        for x in 1..=background {
            memory.add(format!("{person} in bg{x} no").as_str())?;
        }
    }
    for place in &places {
        for x in 1..=background {
            memory.add(format!("neg{x} in {place} no").as_str())?;
        }
    }

    // Experimental study set.
    let study = [
        ("hippie", "park"),
        ("hippie", "church"),
        ("hippie", "bank"),
        ("captain", "park"),
        ("captain", "cave"),
        ("debutante", "bank"),
        ("fireman", "park"),
        ("giant", "beach"),
        ("giant", "castle"),
        ("giant", "dungeon"),
        ("earl", "castle"),
        ("earl", "forest"),
        ("lawyer", "store"),
    ];
    for (person, place) in &study {
        memory.add(format!("{person} in {place} yes").as_str())?;
    }

    let foils = [("hippie", "cave"), ("lawyer", "park"), ("giant", "store")];

    println!("probe                     answer  rt");
    for (person, place) in study.iter().chain(foils.iter()) {
        let handle = memory.request(format!("{person} in {place} ?").as_str())?;
        let rt = handle.delay();
        clock.advance(rt);
        let answer = match memory.on_timer(handle) {
            Completion::Recalled(retrieved) => retrieved
                .chunk
                .elements()
                .last()
                .map(|e| e.value.to_string())
                .unwrap_or_default(),
            Completion::Failed => "(no recall)".to_string(),
            Completion::Superseded => "(superseded)".to_string(),
        };
        println!("{person:>9} in {place:<10} {answer:<7} {rt:.3}s");
    }

    Ok(())
}
