//! typedprop command line
//!
//! Loads type descriptors from TOML sidecar files, instantiates one entity
//! from JSON input, and renders it.
//!
//! # Usage
//!
//! ```bash
//! # Annotated tree, three levels deep
//! typedprop dump --schema types.toml --type Person --max-depth 3 person.json
//!
//! # Flat JSON, failing on cycles
//! typedprop flat --schema types.toml --type Person --strict person.json
//!
//! # Warm a cache snapshot for every entity type
//! typedprop cache-export --schema types.toml --output cache.json
//! ```

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use typedprop_core::CoreConfig;

#[derive(Parser, Debug)]
#[command(name = "typedprop")]
#[command(author, version, about = "Typed-property marshaling tools", long_about = None)]
struct Cli {
    /// Core config file (created with defaults if missing)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by commands that build an entity from input
#[derive(clap::Args, Debug)]
struct EntityArgs {
    /// TOML sidecar files declaring the types (repeatable)
    #[arg(short, long = "schema", required = true)]
    schemas: Vec<PathBuf>,

    /// Entity type to instantiate
    #[arg(short = 't', long = "type")]
    type_name: String,

    /// Cache snapshot to import before instantiating
    #[arg(long)]
    warm: Option<PathBuf>,

    /// JSON input file, or `-` for stdin
    input: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render an entity as an annotated text tree
    Dump {
        #[command(flatten)]
        entity: EntityArgs,

        /// Override the configured depth limit
        #[arg(long)]
        max_depth: Option<usize>,
    },
    /// Render an entity as flat JSON
    Flat {
        #[command(flatten)]
        entity: EntityArgs,

        /// Fail on cycles instead of emitting null
        #[arg(long)]
        strict: bool,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },
    /// Warm the metadata cache and write a snapshot
    CacheExport {
        /// TOML sidecar files declaring the types (repeatable)
        #[arg(short, long = "schema", required = true)]
        schemas: Vec<PathBuf>,

        /// Types to warm (default: every entity type)
        #[arg(short = 't', long = "type")]
        types: Vec<String>,

        /// Snapshot destination (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => CoreConfig::load(path)?,
        None => CoreConfig::default(),
    };

    // Initialize tracing subscriber
    let default_level = if config.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(default_level.into()))
        .with_writer(std::io::stderr)
        .try_init();

    match cli.command {
        Commands::Dump { entity, max_depth } => {
            let lines = commands::dump(&config, &entity, max_depth)?;
            for line in lines {
                println!("{}", line);
            }
        }
        Commands::Flat {
            entity,
            strict,
            pretty,
        } => {
            println!("{}", commands::flat(&config, &entity, strict, pretty)?);
        }
        Commands::CacheExport {
            schemas,
            types,
            output,
        } => {
            let blob = commands::cache_export(&config, &schemas, &types)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, &blob)?;
                    tracing::info!("Wrote cache snapshot to {:?}", path);
                }
                None => println!("{}", String::from_utf8_lossy(&blob)),
            }
        }
    }

    Ok(())
}
