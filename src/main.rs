use std::{env, sync::Arc};

use colored::Colorize;
use log::{error, info, warn};
use neonpub_collab::{
    ArcedDatabase, ArcedVideoSearch, BankError, Collab, DatabaseError, DisabledSearch,
    FixtureSearch, MemoryDatabase, PgDatabase, QuizBank, SearchError, YoutubeSearch,
};
use neonpub_core::{Config, ConfigError};
use neonpub_server::StartError;
use thiserror::Error;

mod logging;

#[derive(Debug, Error)]
enum NeonpubError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Could not initialize database: {0}")]
    Database(#[from] DatabaseError),

    #[error("Could not load the quiz bank: {0}")]
    Bank(#[from] BankError),

    #[error("Could not set up video search: {0}")]
    Search(#[from] SearchError),

    #[error("Could not run the server: {0}")]
    Server(#[from] StartError),
}

impl NeonpubError {
    fn hint(&self) -> String {
        match self {
            NeonpubError::Config(_) => "Check the NEONPUB_* environment variables, every one of them must hold a valid value.".to_string(),
            NeonpubError::Database(_) => "This is a database error. Make sure DATABASE_URL points to a running PostgreSQL instance, or unset it to keep everything in memory.".to_string(),
            NeonpubError::Bank(_) => "Make sure NEONPUB_QUIZ_BANK points to a valid RON file, or unset it to use the built-in questions.".to_string(),
            NeonpubError::Search(_) => "Check YOUTUBE_API_KEY or NEONPUB_SEARCH_FIXTURES, or unset both to disable video search.".to_string(),
            NeonpubError::Server(_) => "Make sure the port is free, or pick another one with NEONPUB_SERVER_PORT.".to_string(),
        }
    }
}

async fn database(config: &Config) -> Result<ArcedDatabase, NeonpubError> {
    match env::var("DATABASE_URL") {
        Ok(url) => {
            info!("Connecting to database...");
            let database = PgDatabase::new(&url, config.downstream_timeout).await?;

            Ok(Arc::new(database))
        }
        Err(_) => {
            warn!("DATABASE_URL is not set, nothing will survive a restart");
            Ok(Arc::new(MemoryDatabase::new()))
        }
    }
}

fn search(config: &Config) -> Result<ArcedVideoSearch, NeonpubError> {
    if let Ok(api_key) = env::var("YOUTUBE_API_KEY") {
        info!("Video search uses YouTube");
        return Ok(Arc::new(YoutubeSearch::new(api_key, config.downstream_timeout)?));
    }

    if let Ok(path) = env::var("NEONPUB_SEARCH_FIXTURES") {
        info!("Video search uses fixtures from {}", path);
        return Ok(Arc::new(FixtureSearch::load(path)?));
    }

    info!("Video search is disabled");
    Ok(Arc::new(DisabledSearch))
}

fn bank() -> Result<QuizBank, NeonpubError> {
    let bank = match env::var("NEONPUB_QUIZ_BANK") {
        Ok(path) => QuizBank::load(path)?,
        Err(_) => QuizBank::builtin(),
    };

    info!(
        "Loaded quiz bank {} with {} categories",
        bank.version,
        bank.categories.len()
    );

    Ok(bank)
}

async fn run() -> Result<(), NeonpubError> {
    let config = Config::from_env()?;
    let database = database(&config).await?;
    let search = search(&config)?;
    let bank = bank()?;

    let collab = Collab::new(config, database, bank, search);

    info!("Initialized successfully.");
    neonpub_server::run_server(Arc::new(collab)).await?;

    Ok(())
}

#[tokio::main]
async fn main() {
    logging::init_logger();

    if let Err(error) = run().await {
        error!("{} Read the error below to troubleshoot the issue. If you think this might be a bug, please report it by making a GitHub issue.", "neonpub failed to start!".bold().red());
        error!("{}", error);
        error!(
            "{}",
            format!("Hint: {}", error.hint()).dimmed().italic()
        );
    }
}
