mod commands;

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;

use crate::config::ConfigLoader;
use crate::store;

static TRACING: OnceCell<()> = OnceCell::new();

#[derive(Debug, Parser)]
#[command(
    name = "devdiary",
    version,
    about = "A developer diary in the terminal"
)]
pub struct Cli {
    /// Path to the config file or its directory.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the diary database.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Profile to read and write entries under; overrides the config.
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Log filter, e.g. `info` or `devdiary=debug`. Logs go to stderr.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Open the interactive browser (the default).
    Tui,
    /// Record a new entry.
    New(commands::NewArgs),
    /// Show the latest entries grouped by recency.
    List(commands::ListArgs),
    /// Search entries by substring.
    Search(commands::SearchArgs),
    /// Print one entry in full.
    Show(commands::ShowArgs),
    /// Delete an entry.
    Delete(commands::DeleteArgs),
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level)?;

    // Path flags override the environment, which overrides XDG defaults.
    if let Some(path) = &cli.config {
        env::set_var("DEVDIARY_CONFIG", path);
    }
    if let Some(path) = &cli.data_dir {
        env::set_var("DEVDIARY_DATA", path);
    }

    let loader = ConfigLoader::discover()?;
    let config = loader.load_or_init()?;
    let profile = cli
        .profile
        .clone()
        .unwrap_or_else(|| config.profile.clone());
    let store = store::init(loader.paths(), &profile)?;

    match cli.command.unwrap_or(Commands::Tui) {
        Commands::Tui => commands::run_tui(Arc::new(config), store),
        Commands::New(args) => commands::run_new(&store, args),
        Commands::List(args) => commands::run_list(&config, &store, args),
        Commands::Search(args) => commands::run_search(&store, args),
        Commands::Show(args) => commands::run_show(&store, args),
        Commands::Delete(args) => commands::run_delete(&store, args),
    }
}

fn init_tracing(level: &str) -> Result<()> {
    TRACING.get_or_try_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(level))
            .or_else(|_| EnvFilter::try_new("info"))
            .context("building log filter")?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
        Ok::<(), anyhow::Error>(())
    })?;
    Ok(())
}
