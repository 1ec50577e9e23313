//! Template retrieval: the mandatory set plus historical epics similar to the
//! analyzed requirement.

use crate::mandatory::MandatoryEpicCatalog;
use crate::merge::NameIndex;
use estimator_core::{AnalyzedRequirement, Epic, Platform};
use estimator_rag::{EmbeddingProvider, KnowledgeBase};
use estimator_telemetry::{metrics, retrieval_span};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{Instrument, debug, info, instrument, warn};

pub const STAGE: &str = "retriever";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrievalSettings {
    pub top_k: usize,
    pub threshold: f32,
    pub fallback_top_k: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { top_k: 5, threshold: 0.4, fallback_top_k: 25 }
    }
}

/// Query text for one epic category.
pub fn category_query(domain: &str, epic_name: &str, features: &[String]) -> String {
    format!("Domain: {}. Epic: {}. Features: {}", domain, epic_name, features.join(", "))
}

/// Query text used when the analysis produced no categories.
pub fn fallback_query(analysis: &AnalyzedRequirement) -> String {
    format!(
        "Project domain: {}. Features: {}. Initial epics: {}",
        analysis.domain,
        analysis.features.join(", "),
        analysis.initial_epics.join(", ")
    )
}

/// Drop efforts outside `targets`, then tasks left without hours.
pub fn restrict_to_targets(epic: &mut Epic, targets: &BTreeSet<Platform>) {
    for task in &mut epic.tasks {
        task.efforts.retain(|platform, _| targets.contains(platform));
    }
    epic.tasks.retain(|task| !task.efforts.is_empty());
}

/// Restrict a retrieved epic to `targets`; `None` if no task survives.
pub fn filter_to_targets(mut epic: Epic, targets: &BTreeSet<Platform>) -> Option<Epic> {
    restrict_to_targets(&mut epic, targets);
    if epic.tasks.is_empty() { None } else { Some(epic) }
}

pub struct TemplateRetriever {
    knowledge_base: Arc<dyn KnowledgeBase>,
    embedder: Arc<dyn EmbeddingProvider>,
    mandatory: Arc<MandatoryEpicCatalog>,
    settings: RetrievalSettings,
}

impl TemplateRetriever {
    pub fn new(
        knowledge_base: Arc<dyn KnowledgeBase>,
        embedder: Arc<dyn EmbeddingProvider>,
        mandatory: Arc<MandatoryEpicCatalog>,
    ) -> Self {
        Self { knowledge_base, embedder, mandatory, settings: RetrievalSettings::default() }
    }

    pub fn with_settings(mut self, settings: RetrievalSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Mandatory epics followed by the retrieved ones, all restricted to the
    /// target platforms. Mandatory epics keep their names and order even when
    /// no task survives.
    ///
    /// Retrieval problems never fail the stage: a query whose embedding or
    /// search fails is logged and contributes nothing.
    #[instrument(skip_all, fields(stage = STAGE, categories = analysis.epic_categories.len()))]
    pub async fn retrieve(&self, analysis: &AnalyzedRequirement) -> Vec<Epic> {
        let mut epics = self.mandatory.for_targets(&analysis.platforms);
        let mut names = NameIndex::from_epics(epics.iter());
        info!(mandatory = epics.len(), "Loaded mandatory epics");

        let queries: Vec<(String, usize)> = if analysis.epic_categories.is_empty() {
            warn!("No epic categories; using one combined query");
            vec![(fallback_query(analysis), self.settings.fallback_top_k)]
        } else {
            analysis
                .epic_categories
                .iter()
                .filter(|(name, _)| {
                    let mandatory = self.mandatory.contains(name);
                    if mandatory {
                        debug!(category = %name, "Skipping category covered by a mandatory epic");
                    }
                    !mandatory
                })
                .map(|(name, features)| {
                    (category_query(&analysis.domain, name, features), self.settings.top_k)
                })
                .collect()
        };

        let mut retrieved = 0usize;
        for (query, top_k) in queries {
            for epic in self.search(&query, top_k).await {
                if names.contains(&epic.name) {
                    debug!(epic = %epic.name, "Skipping duplicate epic");
                    continue;
                }
                let source = epic.source_template.clone();
                match filter_to_targets(epic, &analysis.platforms) {
                    Some(epic) => {
                        debug!(
                            epic = %epic.name,
                            source = %source,
                            tasks = epic.tasks.len(),
                            "Retrieved epic"
                        );
                        names.insert(&epic.name);
                        retrieved += 1;
                        epics.push(epic);
                    }
                    None => debug!(source = %source, "Dropping epic with no target-platform tasks"),
                }
            }
        }

        info!(mandatory = self.mandatory.len(), retrieved = retrieved, "Retrieval complete");
        epics
    }

    async fn search(&self, query: &str, top_k: usize) -> Vec<Epic> {
        let embedding = match self.embedder.embed(query).await {
            Ok(embedding) => embedding,
            Err(e) => {
                warn!(error = %e, query = query, "Embedding failed; skipping query");
                return Vec::new();
            }
        };

        let span = retrieval_span(self.knowledge_base.backend(), top_k);
        match self
            .knowledge_base
            .search_epics(&embedding, top_k, self.settings.threshold)
            .instrument(span)
            .await
        {
            Ok(hits) => {
                metrics().record_retrieved(hits.len());
                debug!(query = query, hits = hits.len(), "Similarity search");
                hits.into_iter().map(|hit| hit.epic).collect()
            }
            Err(e) => {
                warn!(
                    error = %e,
                    backend = self.knowledge_base.backend(),
                    "Knowledge base search failed; skipping query"
                );
                Vec::new()
            }
        }
    }
}
