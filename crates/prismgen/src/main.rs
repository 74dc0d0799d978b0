mod frontend;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use file_format::Config;

use crate::frontend::FrontEnd;

/// Hybrid prismatic/tetrahedral volume mesh generator for viscous CFD.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Wall surface mesh (watertight triangulation)
    wall: PathBuf,
    /// Configuration file (key = value lines)
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();

    let cfg = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("reading configuration {}", path.display()))?,
        None => Config::default(),
    };

    let workdir = std::env::current_dir().context("resolving working directory")?;
    let frontend = FrontEnd::new(cfg, workdir)?;
    frontend.run(&args.wall)
}
