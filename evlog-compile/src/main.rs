mod compile;
use compile::{find_units, Unit};

mod config;
use config::{project_root_of, EvlogConfig};

mod source;

use clap::Parser;
use evlog::asm;
use std::path::PathBuf;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

/// Compiles event declarations and log statements into EVM bytecode.
#[derive(Debug, Parser)]
#[command(name = "evlog-compile", version)]
struct Args {
    /// Source units to compile; defaults to every unit under the configured
    /// source directories.
    inputs: Vec<PathBuf>,

    /// Configuration file used instead of the closest evlog.toml.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output directory, overriding the configured one.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Print the disassembly of every compiled function.
    #[arg(long)]
    disassemble: bool,

    /// Log debug output.
    #[arg(long, short)]
    verbose: bool,
}

fn main() -> eyre::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let tracing_sub = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(tracing_sub)?;

    let (config, project_root) = match &args.config {
        Some(path) => (EvlogConfig::load_from_path(path)?, project_root_of(path)?),
        None => EvlogConfig::load()?,
    };
    let out = args
        .out
        .clone()
        .unwrap_or_else(|| config.get_out_path(&project_root));
    let options = config.compile_options();

    let units = if args.inputs.is_empty() {
        find_units(&config, &project_root)
    } else {
        args.inputs.iter().cloned().map(Unit::new).collect()
    };

    let mut failed = 0;
    for unit in &units {
        info!("Compiling unit: {}", unit.name);

        match unit.build(&options, &out) {
            Ok(artifacts) => {
                info!(
                    "{}: {} events, {} functions",
                    unit.name,
                    artifacts.events.len(),
                    artifacts.functions.len()
                );
                if args.disassemble {
                    for function in &artifacts.functions {
                        println!(
                            "{}.{}:\n{}\n",
                            unit.name,
                            function.name,
                            asm::disassemble(&function.code)
                        );
                    }
                }
            }
            Err(e) => {
                error!("{}: {}", unit.path.display(), e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        eyre::bail!("{failed} of {} units failed to compile", units.len());
    }

    info!("Artifacts written to {}", out.display());
    Ok(())
}
