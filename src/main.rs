mod app;
mod cli;
mod config;
mod db;
mod models;
mod notifications;
mod parsers;
mod prayer_times;
mod utils;
mod widget;

use anyhow::{Context, Result};
use clap::Parser;

use cli::args::{Cli, Commands};
use cli::handlers;
use config::AppConfig;
use db::Store;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = AppConfig::load().context("Loading config")?;

    // Every process (daemon, background task, widget reader) opens the same database
    AppConfig::ensure_data_dir()?;
    let db_path = AppConfig::db_path()?;
    let store = Store::open(&db_path).with_context(|| format!("Opening database at {:?}", db_path))?;

    match cli.command {
        Commands::Times => handlers::handle_times(&config).await?,
        Commands::Refresh => handlers::handle_refresh(&store, &config).await?,
        Commands::Daemon => handlers::handle_daemon(&store, &config).await?,
        Commands::BackgroundRefresh => {
            let code = handlers::handle_background_refresh(&store, &config).await;
            if code != 0 {
                std::process::exit(code);
            }
        }
        Commands::Calendar(args) => handlers::handle_calendar(&store, &config, &args).await?,
        Commands::Widget => handlers::handle_widget(&store)?,
        Commands::Alarms => handlers::handle_alarms(&store)?,
        Commands::Notify { prayer, state, reminder } => handlers::handle_notify(config, prayer, state, reminder)?,
    }

    Ok(())
}
