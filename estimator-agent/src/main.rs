//! estimator: effort estimation from a project description.
//!
//! ## Usage
//!
//! ```bash
//! # Estimate a project and write the JSON response
//! estimator run --name "Wedding Planner" \
//!     --description "Mobile app for couples with an admin panel" --output wedmap.json
//!
//! # Load historical templates into the knowledge base
//! ESTIMATOR_DATABASE_URL=sqlite://estimates.db estimator import templates/*.json
//!
//! # Inspect the knowledge base and configuration
//! estimator stats
//! estimator config
//! ```

use clap::{Parser, Subcommand};
use colored::Colorize;
use estimator_agent::{
    EstimationPipeline, EstimatorConfig, EstimatorOutput, MandatoryEpicCatalog, Result,
};
use estimator_core::{Llm, ProjectRequirement};
use estimator_model::{OpenAIClient, OpenAIConfig};
use estimator_rag::{
    EmbeddingProvider, HashingEmbeddingProvider, InMemoryKnowledgeBase, KnowledgeBase,
    OpenAIEmbeddingProvider, SqliteKnowledgeBase, TemplateDocument, import_template,
};
use estimator_telemetry::init_telemetry;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Estimate software projects as epics, tasks and per-platform hours
#[derive(Parser, Debug)]
#[command(name = "estimator")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Only print errors and the final JSON
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Estimate one project
    Run {
        /// Project name
        #[arg(long)]
        name: String,
        /// Free-text project description
        #[arg(long)]
        description: String,
        /// Additional context appended to the description
        #[arg(long)]
        context: Option<String>,
        /// Write the response JSON here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Show knowledge-base statistics
    Stats,
    /// Import template documents into the knowledge base
    Import {
        /// Template JSON files
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Validate and print the configuration
    Config,
}

async fn open_knowledge_base(config: &EstimatorConfig) -> Result<Arc<dyn KnowledgeBase>> {
    match &config.database_url {
        Some(url) => {
            let store = SqliteKnowledgeBase::new(url).await?;
            store.migrate().await?;
            info!(database = %url, "Opened SQLite knowledge base");
            Ok(Arc::new(store))
        }
        None => {
            warn!("ESTIMATOR_DATABASE_URL is not set; using an empty in-memory knowledge base");
            Ok(Arc::new(InMemoryKnowledgeBase::new()))
        }
    }
}

fn embedder(config: &EstimatorConfig) -> Arc<dyn EmbeddingProvider> {
    match &config.api_key {
        Some(key) => {
            let provider =
                OpenAIEmbeddingProvider::new(key.clone(), config.embedding_model.clone());
            match &config.base_url {
                Some(base_url) => Arc::new(provider.with_base_url(base_url.clone())),
                None => Arc::new(provider),
            }
        }
        None => {
            warn!("OPENAI_API_KEY is not set; using offline hashing embeddings");
            Arc::new(HashingEmbeddingProvider::new(HashingEmbeddingProvider::DEFAULT_DIMENSIONS))
        }
    }
}

fn model(config: &EstimatorConfig) -> Result<Arc<dyn Llm>> {
    let mut openai = OpenAIConfig::new(config.require_api_key()?, config.model.clone())
        .with_max_tokens(config.generation_max_tokens);
    if let Some(base_url) = &config.base_url {
        openai = openai.with_base_url(base_url.clone());
    }
    Ok(Arc::new(OpenAIClient::new(openai)?))
}

async fn run_estimation(
    config: &EstimatorConfig,
    output: &EstimatorOutput,
    requirement: ProjectRequirement,
    destination: Option<&Path>,
) -> Result<()> {
    let llm = model(config)?;
    let knowledge_base = open_knowledge_base(config).await?;
    let mandatory = Arc::new(MandatoryEpicCatalog::load(config.mandatory_epics_path.as_deref())?);
    let pipeline =
        EstimationPipeline::from_config(config, llm, knowledge_base, embedder(config), mandatory);

    // Keep stdout clean when it carries the JSON.
    let quiet = EstimatorOutput::new(true);
    let output = if destination.is_none() { &quiet } else { output };
    output.phase("Estimating");
    output.status(&format!("Project: {}", requirement.project_name));
    let response = pipeline.estimate(requirement).await?;
    output.estimation_summary(&response);

    let json = serde_json::to_string_pretty(&response)?;
    match destination {
        Some(path) => {
            std::fs::write(path, json).map_err(|e| {
                std::io::Error::new(e.kind(), format!("failed to write {}: {}", path.display(), e))
            })?;
            output.success(&format!("Estimation saved: {}", path.display()));
        }
        None => println!("{}", json),
    }
    Ok(())
}

async fn import_files(
    config: &EstimatorConfig,
    output: &EstimatorOutput,
    files: &[PathBuf],
) -> Result<()> {
    let knowledge_base = open_knowledge_base(config).await?;
    let embedder = embedder(config);

    output.phase("Importing templates");
    for path in files {
        let text = std::fs::read_to_string(path).map_err(|e| {
            std::io::Error::new(e.kind(), format!("failed to read {}: {}", path.display(), e))
        })?;
        let fallback = path.file_stem().and_then(|s| s.to_str()).unwrap_or("template");
        let document = TemplateDocument::from_json(&text, fallback)?;
        let summary = import_template(knowledge_base.as_ref(), embedder.as_ref(), &document).await?;
        output.imported(&summary);
    }

    if config.database_url.is_none() {
        output.warn("Templates were imported into an in-memory store and are gone on exit");
    }
    Ok(())
}

async fn show_stats(config: &EstimatorConfig, output: &EstimatorOutput) -> Result<()> {
    let knowledge_base = open_knowledge_base(config).await?;
    let stats = knowledge_base.stats().await?;
    output.stats(knowledge_base.backend(), &stats);
    Ok(())
}

#[tokio::main]
async fn main() {
    // Logged once telemetry is up; a missing .env is fine.
    let env_file = dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = match EstimatorConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {}", "Configuration Error".red().bold(), e);
            eprintln!();
            eprintln!("Set variables in the environment or a {} file, for example:", ".env".cyan());
            eprintln!("  OPENAI_API_KEY=your-api-key");
            eprintln!("  ESTIMATOR_DATABASE_URL=sqlite://estimates.db");
            std::process::exit(1);
        }
    };

    if let Err(e) = init_telemetry("estimator", &config.log_settings()) {
        eprintln!("{}: {}", "Telemetry Warning".yellow(), e);
    }
    match env_file {
        Some(path) => debug!(path = %path.display(), "Loaded configuration from .env"),
        None => debug!("No .env file found; using the process environment"),
    }

    let output = EstimatorOutput::new(cli.quiet);
    let result = match cli.command {
        Commands::Run { name, description, context, output: destination } => {
            let mut requirement = ProjectRequirement::new(name, description);
            if let Some(context) = context {
                requirement = requirement.with_context(context);
            }
            run_estimation(&config, &output, requirement, destination.as_deref()).await
        }
        Commands::Stats => show_stats(&config, &output).await,
        Commands::Import { files } => import_files(&config, &output, &files).await,
        Commands::Config => {
            output.config(&config);
            output.success("Configuration is valid!");
            Ok(())
        }
    };

    if let Err(e) = result {
        output.error(&e.to_string());
        std::process::exit(1);
    }
}
