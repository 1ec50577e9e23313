//! In-process knowledge base.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::Result;
use crate::knowledge_base::{KnowledgeBase, rank_groups};
use crate::record::{EpicGroup, KnowledgeBaseStats, KnowledgeRecord, ScoredEpic, assemble_epic};

/// Rows kept in insertion order; an upsert replaces a row in place, so the
/// first row of an epic stays first.
#[derive(Default)]
pub struct InMemoryKnowledgeBase {
    records: RwLock<Vec<KnowledgeRecord>>,
}

impl InMemoryKnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl KnowledgeBase for InMemoryKnowledgeBase {
    fn backend(&self) -> &str {
        "memory"
    }

    async fn upsert(&self, records: &[KnowledgeRecord]) -> Result<()> {
        let mut stored = self.records.write().await;
        for record in records {
            match stored.iter_mut().find(|existing| existing.same_key(record)) {
                Some(existing) => *existing = record.clone(),
                None => stored.push(record.clone()),
            }
        }
        debug!(count = records.len(), "upserted records into memory knowledge base");
        Ok(())
    }

    async fn search_epics(
        &self,
        query: &[f32],
        top_k: usize,
        threshold: f32,
    ) -> Result<Vec<ScoredEpic>> {
        let stored = self.records.read().await;

        let mut seen = BTreeSet::new();
        let mut groups = Vec::new();
        for record in stored.iter() {
            if seen.insert((record.estimation_name.clone(), record.epic_id)) {
                let group = EpicGroup {
                    estimation_name: record.estimation_name.clone(),
                    epic_id: record.epic_id,
                    epic_name: record.epic_name.clone(),
                };
                groups.push((group, record.embedding.clone()));
            }
        }

        let ranked = rank_groups(query, groups, top_k, threshold);
        let results = ranked
            .into_iter()
            .map(|(group, similarity)| {
                let mut rows: Vec<&KnowledgeRecord> = stored
                    .iter()
                    .filter(|r| {
                        r.estimation_name == group.estimation_name && r.epic_id == group.epic_id
                    })
                    .collect();
                rows.sort_by(|a, b| (&a.task_name, &a.platform).cmp(&(&b.task_name, &b.platform)));
                let entries = rows
                    .into_iter()
                    .map(|r| (r.task_name.as_str(), r.platform.as_str(), r.estimated_hour));
                let epic = assemble_epic(&group, entries);
                ScoredEpic { epic, similarity }
            })
            .collect::<Vec<_>>();

        debug!(found = results.len(), top_k, threshold, "searched memory knowledge base");
        Ok(results)
    }

    async fn stats(&self) -> Result<KnowledgeBaseStats> {
        let stored = self.records.read().await;
        let epics: BTreeSet<(&str, i64)> =
            stored.iter().map(|r| (r.estimation_name.as_str(), r.epic_id)).collect();
        let templates: BTreeMap<&str, ()> =
            stored.iter().map(|r| (r.estimation_name.as_str(), ())).collect();

        Ok(KnowledgeBaseStats {
            total_records: stored.len() as u64,
            total_epics: epics.len() as u64,
            total_templates: templates.len() as u64,
            templates: templates.keys().map(|t| t.to_string()).collect(),
        })
    }

    async fn delete_template(&self, estimation_name: &str) -> Result<u64> {
        let mut stored = self.records.write().await;
        let before = stored.len();
        stored.retain(|r| r.estimation_name != estimation_name);
        Ok((before - stored.len()) as u64)
    }

    async fn next_estimation_id(&self) -> Result<i64> {
        let stored = self.records.read().await;
        Ok(stored.iter().map(|r| r.estimation_id).max().unwrap_or(0) + 1)
    }
}
