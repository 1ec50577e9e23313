//! Terminal output for the `estimator` binary.
//!
//! Progress lines go to stdout unless quiet; errors always go to stderr.

use crate::models::{EstimationResponse, EstimatorConfig};
use colored::Colorize;
use estimator_rag::{ImportSummary, KnowledgeBaseStats};

#[derive(Debug, Clone, Default)]
pub struct EstimatorOutput {
    quiet: bool,
}

impl EstimatorOutput {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    /// Print a phase header.
    pub fn phase(&self, name: &str) {
        if !self.quiet {
            println!("\n{} {}", "▶".bright_cyan(), name.bright_white().bold());
        }
    }

    pub fn status(&self, message: &str) {
        if !self.quiet {
            println!("  {} {}", "•".bright_black(), message);
        }
    }

    pub fn phase_complete(&self, message: &str) {
        if !self.quiet {
            println!("  {} {}", "✓".bright_green(), message.green());
        }
    }

    pub fn list_item(&self, message: &str) {
        if !self.quiet {
            println!("    {} {}", "─".bright_black(), message);
        }
    }

    pub fn warn(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", "⚠".bright_yellow(), message.yellow());
        }
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", "✗ Error:".bright_red().bold(), message);
    }

    pub fn success(&self, message: &str) {
        println!("{} {}", "✓".bright_green(), message.green());
    }

    /// Summary table of a finished estimation.
    pub fn estimation_summary(&self, response: &EstimationResponse) {
        if self.quiet {
            return;
        }
        println!();
        println!("{}", "═".repeat(60).bright_black());
        println!("{} {}", "Estimation:".bright_white().bold(), response.project_name.cyan());
        println!("{}", "═".repeat(60).bright_black());
        println!("  Complexity:      {}", response.complexity);
        let platforms: Vec<&str> = response.target_platforms.iter().map(|p| p.as_str()).collect();
        println!("  Platforms:       {}", platforms.join(", "));
        println!(
            "  Epics:           {} ({} mandatory, {} custom)",
            response.epics.len(),
            response.mandatory_epics_count,
            response.custom_epics_count
        );
        println!("  Total hours:     {}", response.total_hours.to_string().bright_white().bold());
        for (platform, hours) in &response.total_hours_by_platform {
            println!("    {:<14} {}", platform.as_str(), hours);
        }

        let status = if response.validation_passed { "passed".green() } else { "failed".red() };
        println!("  Validation:      {} ({} retries)", status, response.retry_count);

        if !response.warnings.is_empty() {
            println!("\n  {}", "Warnings:".yellow());
            for warning in &response.warnings {
                println!("    {} {}", "⚠".bright_yellow(), warning);
            }
        }
        println!("{}", "═".repeat(60).bright_black());
    }

    pub fn stats(&self, backend: &str, stats: &KnowledgeBaseStats) {
        println!("{} {}", "Knowledge base:".bright_white().bold(), backend.cyan());
        println!("  Templates: {}", stats.total_templates);
        println!("  Epics:     {}", stats.total_epics);
        println!("  Records:   {}", stats.total_records);
        for template in &stats.templates {
            println!("    {} {}", "─".bright_black(), template);
        }
    }

    pub fn imported(&self, summary: &ImportSummary) {
        self.phase_complete(&format!(
            "{}: {} epics, {} records",
            summary.estimation_name, summary.epics, summary.records
        ));
    }

    /// Effective configuration, without the API key.
    pub fn config(&self, config: &EstimatorConfig) {
        let key = if config.api_key.is_some() { "set".green() } else { "not set".yellow() };
        let mandatory = config
            .mandatory_epics_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "built-in".to_string());
        let database = config.database_url.clone().unwrap_or_else(|| "in-memory".to_string());

        println!("{}", "Configuration:".bright_white().bold());
        println!("  OPENAI_API_KEY:     {}", key);
        println!("  Model:              {}", config.model);
        println!("  Embedding model:    {}", config.embedding_model);
        let base_url = config.base_url.as_deref().unwrap_or(estimator_model::OPENAI_API_BASE);
        println!("  Base URL:           {}", base_url);
        println!("  Temperature:        {} (json {})", config.temperature, config.json_temperature);
        println!(
            "  Max tokens:         {} analysis, {} generation",
            config.analysis_max_tokens, config.generation_max_tokens
        );
        println!(
            "  Retrieval:          top {} (fallback {}), threshold {}",
            config.similarity_top_k, config.fallback_top_k, config.similarity_threshold
        );
        println!("  Attempts:           {}", config.max_generation_attempts);
        println!("  Hour range:         {}-{}", config.min_total_hours, config.max_total_hours);
        println!("  Mandatory epics:    {}", mandatory);
        println!("  Database:           {}", database);
        println!("  Logging:            {} ({:?})", config.log_level, config.log_format);
    }
}
