use async_trait::async_trait;

use crate::error::Result;
use crate::record::{EpicGroup, KnowledgeBaseStats, KnowledgeRecord, ScoredEpic};
use crate::similarity::cosine_similarity;

/// Store of historical estimation rows with epic-level similarity search.
#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    /// Short backend label used in logs and errors.
    fn backend(&self) -> &str;

    /// Insert rows, replacing any row with the same
    /// `(estimation_name, epic_id, task_name, platform)`.
    async fn upsert(&self, records: &[KnowledgeRecord]) -> Result<()>;

    /// Up to `top_k` epics whose embedding scores at least `threshold`
    /// against `query`, most similar first.
    async fn search_epics(
        &self,
        query: &[f32],
        top_k: usize,
        threshold: f32,
    ) -> Result<Vec<ScoredEpic>>;

    async fn stats(&self) -> Result<KnowledgeBaseStats>;

    /// Remove every row of a template. Returns the number of rows removed.
    async fn delete_template(&self, estimation_name: &str) -> Result<u64>;

    /// Identifier to give the next imported template.
    async fn next_estimation_id(&self) -> Result<i64>;
}

/// Score each epic group, keep those at or above `threshold`, best first,
/// at most `top_k`. Ties keep their input order.
pub(crate) fn rank_groups(
    query: &[f32],
    groups: Vec<(EpicGroup, Vec<f32>)>,
    top_k: usize,
    threshold: f32,
) -> Vec<(EpicGroup, f32)> {
    let mut scored: Vec<(EpicGroup, f32)> = groups
        .into_iter()
        .map(|(group, embedding)| {
            let similarity = cosine_similarity(query, &embedding);
            (group, similarity)
        })
        .filter(|(_, similarity)| *similarity >= threshold)
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(top_k);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(id: i64) -> EpicGroup {
        EpicGroup {
            estimation_name: "Template: T".to_string(),
            epic_id: id,
            epic_name: format!("E{}", id),
        }
    }

    #[test]
    fn ranks_filters_and_truncates() {
        let groups = vec![
            (group(1), vec![1.0, 0.0]),
            (group(2), vec![0.0, 1.0]),
            (group(3), vec![0.9, 0.1]),
            (group(4), vec![0.6, 0.4]),
        ];
        let ranked = rank_groups(&[1.0, 0.0], groups, 2, 0.4);
        let ids: Vec<_> = ranked.iter().map(|(g, _)| g.epic_id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert!(ranked[0].1 >= ranked[1].1);
    }

    #[test]
    fn nothing_above_threshold_is_empty() {
        let ranked = rank_groups(&[1.0, 0.0], vec![(group(1), vec![0.0, 1.0])], 5, 0.4);
        assert!(ranked.is_empty());
    }
}
