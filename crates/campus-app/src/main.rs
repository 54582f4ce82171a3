//! Campus Guide binary - composition root.
//!
//! 1. Load `.env`, configuration file, environment and CLI overrides
//! 2. Validate (refuses to start without a usable session secret)
//! 3. Open the SQLite database and optionally load the knowledge directory
//! 4. Build the agent (knowledge search, web search, chat model, history)
//! 5. Serve the HTTP API

mod cli;

use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use campus_agent::{
    AgentSettings, ChatModel, GoogleSearch, KnowledgeSource, OpenAiChat, PromptBuilder,
    UniversityAgent, WebSearch,
};
use campus_api::{start_server, AppState};
use campus_core::config::CampusConfig;
use campus_storage::{
    Database, DocumentLoader, HistoryRepository, KnowledgeRepository, KnowledgeSearch,
};

use crate::cli::CliArgs;

/// Missing file means defaults; a file that exists but does not parse is fatal.
fn load_config(path: &Path) -> Result<CampusConfig, campus_core::CampusError> {
    if path.exists() {
        CampusConfig::load(path)
    } else {
        Ok(CampusConfig::default())
    }
}

fn build_agent(
    config: &CampusConfig,
    db: &Arc<Database>,
) -> Result<UniversityAgent, campus_agent::AgentError> {
    let knowledge: Arc<dyn KnowledgeSource> = Arc::new(KnowledgeSearch::new(Arc::clone(db)));
    let model: Arc<dyn ChatModel> = Arc::new(OpenAiChat::from_config(&config.model)?);
    let web: Option<Arc<dyn WebSearch>> = match GoogleSearch::from_config(&config.web_search)? {
        Some(search) => Some(Arc::new(search)),
        None => {
            tracing::info!("Web search disabled");
            None
        }
    };

    Ok(UniversityAgent::new(
        knowledge,
        web,
        model,
        HistoryRepository::new(Arc::clone(db)),
        PromptBuilder::from_config(&config.agent)?,
        AgentSettings::from_config(config),
    ))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dotenv = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config_path = args.resolve_config_path();
    let loaded = load_config(&config_path);

    let level = args
        .log_level
        .clone()
        .or_else(|| loaded.as_ref().ok().map(|c| c.server.log_level.clone()))
        .unwrap_or_else(|| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level)))
        .init();

    tracing::info!("Starting Campus Guide v{}", env!("CARGO_PKG_VERSION"));
    match dotenv {
        Ok(path) => tracing::info!(path = %path.display(), "Loaded .env"),
        Err(e) if e.not_found() => tracing::debug!("No .env file"),
        Err(e) => tracing::warn!(error = %e, "Failed to read .env"),
    }

    let mut config = match loaded {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(path = %config_path.display(), error = %e, "Invalid configuration file");
            return Err(e.into());
        }
    };
    config.apply_env();
    args.apply_overrides(&mut config);
    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "Refusing to start");
        return Err(e.into());
    }

    // Storage.
    let db_path = config.database.path();
    let db = Arc::new(Database::new(&db_path)?);
    tracing::info!(path = %db_path.display(), "SQLite database opened");

    let knowledge = KnowledgeRepository::new(Arc::clone(&db));
    if args.load_knowledge {
        let loader = DocumentLoader::from_config(&config.knowledge);
        tracing::info!(dir = %loader.data_dir().display(), upsert = args.upsert, "Loading knowledge base");
        loader.load_into(&knowledge, args.upsert)?;
    }
    match knowledge.count() {
        Ok(0) => tracing::warn!("Knowledge base is empty; run with --load-knowledge"),
        Ok(n) => tracing::info!(chunks = n, "Knowledge base ready"),
        Err(e) => tracing::warn!(error = %e, "Could not count knowledge chunks"),
    }

    // Agent.
    let agent = build_agent(&config, &db)?;
    tracing::info!(model = %config.model.id, name = %config.agent.name, "Agent ready");

    // API server.
    let server = config.server.clone();
    let state = AppState::new(config, Arc::new(agent), db)?;
    start_server(&server, state).await?;

    Ok(())
}
