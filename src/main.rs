use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use xpost::{init_tracing_once, CrosspostNetwork, GraphStore, MemoryStore, Neo4jStore, RunMode, StoreConfig};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Backend {
    Neo4j,
    Memory,
}

#[derive(Parser)]
#[command(name = "xpost", about = "Reddit crosspost network analysis")]
struct Cli {
    /// Input JSON file (array of post records)
    #[arg(long, default_value = "input.json")]
    input: PathBuf,

    /// Directory for output files
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Graph store backend
    #[arg(long, value_enum, default_value = "neo4j")]
    store: Backend,

    /// Neo4j URI (falls back to NEO4J_URI)
    #[arg(long)]
    neo4j_uri: Option<String>,

    /// Neo4j username (falls back to NEO4J_USER)
    #[arg(long)]
    neo4j_user: Option<String>,

    /// Neo4j password (falls back to NEO4J_PASSWORD; required)
    #[arg(long)]
    neo4j_password: Option<String>,

    /// Skip data import and use the existing database
    #[arg(long)]
    skip_import: bool,

    /// Only run analysis on the existing database
    #[arg(long, conflicts_with = "skip_import")]
    analysis_only: bool,

    /// Synthesize sample crossposts when the input has none
    #[arg(long)]
    demo_mode: bool,

    /// Entries in the summary's top source/destination lists
    #[arg(long, default_value_t = 10)]
    top_n: usize,

    /// Hide progress bars and spinners
    #[arg(long)]
    no_progress: bool,
}

fn main() -> Result<()> {
    init_tracing_once();
    let cli = Cli::parse();

    let mode = if cli.analysis_only {
        RunMode::AnalysisOnly
    } else if cli.skip_import {
        RunMode::SkipImport
    } else {
        RunMode::Full
    };

    // connect before touching the input so a bad store fails the run early
    let mut store: Box<dyn GraphStore> = match cli.store {
        Backend::Neo4j => {
            let cfg = StoreConfig::resolve(cli.neo4j_uri, cli.neo4j_user, cli.neo4j_password)?;
            Box::new(Neo4jStore::connect(&cfg).context("graph store unavailable")?)
        }
        Backend::Memory => {
            if mode != RunMode::Full {
                anyhow::bail!("the memory store starts empty; --skip-import/--analysis-only need --store neo4j");
            }
            Box::new(MemoryStore::new())
        }
    };

    let outcome = CrosspostNetwork::new()
        .input(&cli.input)
        .output_dir(&cli.output_dir)
        .mode(mode)
        .demo_mode(cli.demo_mode)
        .top_n(cli.top_n)
        .progress(!cli.no_progress)
        .run(store.as_mut())?;

    if !outcome.written.is_empty() {
        println!("\nOutputs:");
        for p in &outcome.written {
            println!("- {}", p.display());
        }
    }
    Ok(())
}
