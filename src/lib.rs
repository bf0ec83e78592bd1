//! rfacelog library root.
//! Exposes the CLI parser, the high-level run() function and the recognition core.

pub mod cli;
pub mod config;
pub mod core;
pub mod db;
pub mod errors;
pub mod logging;
pub mod models;
pub mod ui;
pub mod utils;

use clap::Parser;
use cli::parser::{Cli, Commands};
use config::Config;
use errors::AppResult;

/// Central command dispatcher
pub fn dispatch(cli: &Cli, cfg: &Config) -> AppResult<()> {
    use cli::commands;

    match &cli.command {
        Commands::Init => commands::init::handle(cli),
        Commands::Config { .. } => commands::config::handle(&cli.command, cfg),
        Commands::Person { .. } => commands::person::handle(&cli.command, cfg),
        Commands::Cache { .. } => commands::cache::handle(&cli.command, cfg),
        Commands::Recognize { .. } | Commands::RecognizeGroup { .. } => {
            commands::recognize::handle(&cli.command, cfg)
        }
        Commands::Correct { .. } => commands::correct::handle(&cli.command, cfg),
        Commands::Policy { .. } => commands::policy::handle(&cli.command, cfg),
        Commands::Events { .. } => commands::events::handle(&cli.command, cfg),
        Commands::Daily { .. } => commands::daily::handle(&cli.command, cfg),
        Commands::Db { .. } => commands::db::handle(&cli.command, cfg),
        Commands::Log { .. } => commands::log::handle(&cli.command, cfg),
    }
}

/// Entry point used by main.rs
pub fn run() -> AppResult<()> {
    let cli = Cli::parse();

    // test mode never reads the user's config file
    let mut cfg = if cli.test {
        Config::default()
    } else {
        Config::load()?
    };

    if let Some(custom_db) = &cli.db {
        cfg.database = custom_db.clone();
    }

    logging::init(&cfg.log_level);
    dispatch(&cli, &cfg)
}
