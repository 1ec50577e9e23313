//! Stored rows and the epics rebuilt from them.

use chrono::{DateTime, Utc};
use estimator_core::{Efforts, Epic, EstimationMethod, Platform, Task};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One historical hour figure: a task of an epic of a template, on one
/// platform. `embedding` is the embedding of the epic name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeRecord {
    pub estimation_id: i64,
    pub estimation_name: String,
    pub epic_id: i64,
    pub epic_name: String,
    pub task_name: String,
    /// Raw platform label as imported; aliases are resolved when read.
    pub platform: String,
    pub estimated_hour: f64,
    pub content_text: String,
    pub embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
}

impl KnowledgeRecord {
    /// `(estimation_name, epic_id, task_name, platform)` is unique per store.
    pub fn same_key(&self, other: &KnowledgeRecord) -> bool {
        self.estimation_name == other.estimation_name
            && self.epic_id == other.epic_id
            && self.task_name == other.task_name
            && self.platform == other.platform
    }

    pub fn content_text_for(epic_name: &str, task_name: &str, platform: &str) -> String {
        format!("Epic: {}. Task: {}. Platform: {}", epic_name, task_name, platform)
    }
}

/// A retrieved epic with the similarity that selected it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredEpic {
    pub epic: Epic,
    pub similarity: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KnowledgeBaseStats {
    pub total_records: u64,
    pub total_epics: u64,
    pub total_templates: u64,
    pub templates: Vec<String>,
}

/// Identity of one stored epic: all rows sharing `(estimation_name, epic_id)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct EpicGroup {
    pub estimation_name: String,
    pub epic_id: i64,
    pub epic_name: String,
}

/// Rebuild a retrieved epic from its rows.
///
/// Rows are grouped into tasks by task name, in task-name order. Platform
/// aliases are rewritten; rows with unknown platforms are dropped.
pub(crate) fn assemble_epic<'a>(
    group: &EpicGroup,
    rows: impl IntoIterator<Item = (&'a str, &'a str, f64)>,
) -> Epic {
    let mut tasks: BTreeMap<String, Efforts> = BTreeMap::new();
    for (task_name, platform_label, hours) in rows {
        let efforts = tasks.entry(task_name.to_string()).or_default();
        match Platform::normalize(platform_label) {
            Some(platform) => {
                efforts.insert(platform, hours.max(0.0).round() as u32);
            }
            None => {
                tracing::debug!(
                    platform = platform_label,
                    task = task_name,
                    "Skipping unknown platform"
                );
            }
        }
    }

    let mut epic = Epic::new(group.epic_name.clone(), format!("From {}", group.estimation_name))
        .with_source(group.estimation_name.clone());
    epic.tasks = tasks
        .into_iter()
        .map(|(description, efforts)| Task::new(description, efforts, EstimationMethod::Historical))
        .collect();
    epic
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group() -> EpicGroup {
        EpicGroup {
            estimation_name: "Template: Food Delivery".to_string(),
            epic_id: 1,
            epic_name: "Authentication".to_string(),
        }
    }

    #[test]
    fn groups_rows_into_tasks_and_maps_aliases() {
        let rows = vec![
            ("Login", "Flutter", 8.0),
            ("Login", "Web Service", 6.5),
            ("Forgot Password", "Designer", 4.0),
            ("Forgot Password", "Smartwatch", 3.0),
        ];
        let epic = assemble_epic(&group(), rows);

        assert_eq!(epic.name, "Authentication");
        assert_eq!(epic.description, "From Template: Food Delivery");
        assert_eq!(epic.source_template, "Template: Food Delivery");
        assert!(!epic.is_mandatory);

        let names: Vec<_> = epic.tasks.iter().map(|t| t.description.as_str()).collect();
        assert_eq!(names, vec!["Forgot Password", "Login"]);

        let forgot = &epic.tasks[0];
        assert_eq!(forgot.efforts.get(&Platform::Cms), Some(&4));
        assert_eq!(forgot.efforts.len(), 1);

        let login = &epic.tasks[1];
        assert_eq!(login.efforts.get(&Platform::Flutter), Some(&8));
        assert_eq!(login.efforts.get(&Platform::Api), Some(&7));
        assert!(epic.tasks.iter().all(|t| t.source == EstimationMethod::Historical));
    }

    #[test]
    fn fractional_hours_round_to_nearest() {
        let rows = vec![
            ("Checkout", "Flutter", 7.6),
            ("Checkout", "API", 7.4),
            ("Checkout", "CMS", -2.0),
            ("Refund", "Flutter", 0.4),
        ];
        let epic = assemble_epic(&group(), rows);

        let checkout = &epic.tasks[0];
        assert_eq!(checkout.efforts.get(&Platform::Flutter), Some(&8));
        assert_eq!(checkout.efforts.get(&Platform::Api), Some(&7));
        assert_eq!(checkout.efforts.get(&Platform::Cms), Some(&0));
        assert_eq!(epic.tasks[1].efforts.get(&Platform::Flutter), Some(&0));
    }

    #[test]
    fn content_text_format() {
        assert_eq!(
            KnowledgeRecord::content_text_for("Chat", "Send message", "API"),
            "Epic: Chat. Task: Send message. Platform: API"
        );
    }
}
