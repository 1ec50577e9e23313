//! Loading historical template documents into a knowledge base.
//!
//! A template document looks like:
//!
//! ```json
//! {
//!   "template_name": "Food Delivery",
//!   "domain": "food",
//!   "epics": { "Authentication": { "Login": { "Flutter": 8, "API": 6 } } }
//! }
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::knowledge_base::KnowledgeBase;
use crate::record::KnowledgeRecord;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateDocument {
    #[serde(default)]
    pub template_name: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
    /// epic name -> task name -> platform label -> hours
    #[serde(default)]
    pub epics: BTreeMap<String, BTreeMap<String, BTreeMap<String, f64>>>,
}

impl TemplateDocument {
    /// Parse a document. `fallback_name` (usually the file stem) names
    /// templates that carry no `template_name`.
    pub fn from_json(text: &str, fallback_name: &str) -> Result<Self> {
        let mut document: TemplateDocument = serde_json::from_str(text)?;
        if document.template_name.as_deref().is_none_or(|n| n.trim().is_empty()) {
            document.template_name = Some(fallback_name.to_string());
        }
        Ok(document)
    }

    pub fn name(&self) -> &str {
        self.template_name.as_deref().unwrap_or("unnamed")
    }

    pub fn domain(&self) -> &str {
        self.domain.as_deref().unwrap_or("general")
    }

    /// Name the rows of this template are stored under.
    pub fn estimation_name(&self) -> String {
        format!("Template: {}", self.name())
    }

    /// Flatten into rows. Epic ids count from 1 in epic-name order;
    /// `epic_embeddings` holds one embedding per epic in that same order.
    pub fn to_records(
        &self,
        estimation_id: i64,
        epic_embeddings: &[Vec<f32>],
    ) -> Result<Vec<KnowledgeRecord>> {
        if epic_embeddings.len() != self.epics.len() {
            return Err(RagError::InvalidRecord(format!(
                "{} embeddings for {} epics in '{}'",
                epic_embeddings.len(),
                self.epics.len(),
                self.name()
            )));
        }

        let estimation_name = self.estimation_name();
        let created_at = Utc::now();
        let mut records = Vec::new();

        let epics = self.epics.iter().zip(epic_embeddings).enumerate();
        for (index, ((epic_name, tasks), embedding)) in epics {
            for (task_name, platforms) in tasks {
                for (platform, hours) in platforms {
                    if !hours.is_finite() || *hours < 0.0 {
                        return Err(RagError::InvalidRecord(format!(
                            "'{}' / '{}' / '{}' has invalid hours {}",
                            epic_name, task_name, platform, hours
                        )));
                    }
                    records.push(KnowledgeRecord {
                        estimation_id,
                        estimation_name: estimation_name.clone(),
                        epic_id: index as i64 + 1,
                        epic_name: epic_name.clone(),
                        task_name: task_name.clone(),
                        platform: platform.clone(),
                        estimated_hour: *hours,
                        content_text: KnowledgeRecord::content_text_for(
                            epic_name, task_name, platform,
                        ),
                        embedding: embedding.clone(),
                        created_at,
                    });
                }
            }
        }
        Ok(records)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub estimation_name: String,
    pub epics: usize,
    pub records: usize,
}

/// Embed each epic name of `document` and store its rows, replacing any
/// earlier import of the same template.
pub async fn import_template(
    knowledge_base: &dyn KnowledgeBase,
    embedder: &dyn EmbeddingProvider,
    document: &TemplateDocument,
) -> Result<ImportSummary> {
    let epic_names: Vec<&str> = document.epics.keys().map(String::as_str).collect();
    let embeddings = embedder.embed_batch(&epic_names).await?;
    let replaced = knowledge_base.delete_template(&document.estimation_name()).await?;
    let estimation_id = knowledge_base.next_estimation_id().await?;
    let records = document.to_records(estimation_id, &embeddings)?;
    knowledge_base.upsert(&records).await?;

    info!(
        template = document.name(),
        domain = document.domain(),
        epics = epic_names.len(),
        records = records.len(),
        replaced,
        backend = knowledge_base.backend(),
        "Imported template"
    );

    Ok(ImportSummary {
        estimation_name: document.estimation_name(),
        epics: epic_names.len(),
        records: records.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"{
        "domain": "food",
        "epics": {
            "Ordering": {"Cart": {"Flutter": 12, "API": 8}},
            "Authentication": {"Login": {"Flutter": 8}, "Logout": {"Web Service": 2.5}}
        }
    }"#;

    #[test]
    fn missing_name_falls_back_to_file_stem() {
        let doc = TemplateDocument::from_json(DOC, "food_delivery").unwrap();
        assert_eq!(doc.name(), "food_delivery");
        assert_eq!(doc.estimation_name(), "Template: food_delivery");
        assert_eq!(doc.domain(), "food");
    }

    #[test]
    fn flattens_into_rows() {
        let doc = TemplateDocument::from_json(DOC, "food").unwrap();
        let records = doc.to_records(7, &[vec![1.0], vec![2.0]]).unwrap();
        assert_eq!(records.len(), 4);

        let logout = records.iter().find(|r| r.task_name == "Logout").unwrap();
        assert_eq!(logout.epic_id, 1);
        assert_eq!(logout.epic_name, "Authentication");
        assert_eq!(logout.platform, "Web Service");
        assert_eq!(logout.estimated_hour, 2.5);
        assert_eq!(
            logout.content_text,
            "Epic: Authentication. Task: Logout. Platform: Web Service"
        );
        assert_eq!(logout.embedding, vec![1.0]);
        assert_eq!(logout.estimation_id, 7);

        let cart = records.iter().find(|r| r.task_name == "Cart").unwrap();
        assert_eq!(cart.epic_id, 2);
        assert_eq!(cart.embedding, vec![2.0]);
    }

    #[test]
    fn rejects_negative_hours() {
        let doc =
            TemplateDocument::from_json(r#"{"epics": {"E": {"T": {"API": -1}}}}"#, "x").unwrap();
        assert!(matches!(doc.to_records(1, &[vec![1.0]]), Err(RagError::InvalidRecord(_))));
    }

    #[test]
    fn rejects_embedding_count_mismatch() {
        let doc = TemplateDocument::from_json(DOC, "food").unwrap();
        assert!(doc.to_records(1, &[vec![1.0]]).is_err());
    }
}
