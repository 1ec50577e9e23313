//! Reading estimation documents in either of the two supported layouts.
//!
//! List layout, as written by the estimator:
//!
//! ```json
//! {"epics": [{"name": "Authentication", "user_types": ["Admin"],
//!             "tasks": [{"description": "Login", "efforts": {"Flutter": 8}}]}]}
//! ```
//!
//! Map layout, as used by historical templates:
//!
//! ```json
//! {"epics": {"Authentication": {"Login": {"Flutter": 8}}}}
//! ```

use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::path::Path;

use crate::error::{EvalError, Result};

/// What the comparison needs to know about one epic.
#[derive(Debug, Clone, PartialEq)]
pub struct EpicSummary {
    pub name: String,
    pub task_count: usize,
    pub user_types: Vec<String>,
    pub is_mandatory: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EstimationDocument {
    pub epics: Vec<EpicSummary>,
    pub platforms: BTreeSet<String>,
    pub user_roles: BTreeSet<String>,
    pub total_hours: f64,
}

impl EstimationDocument {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| EvalError::Io { path: path.to_path_buf(), source })?;
        let value: Value = serde_json::from_str(&text)
            .map_err(|source| EvalError::InvalidJson { path: path.to_path_buf(), source })?;
        Ok(Self::from_value(&value))
    }

    /// Anything that is not one of the two layouts contributes nothing.
    pub fn from_value(value: &Value) -> Self {
        match value.get("epics") {
            Some(Value::Array(epics)) => Self::from_list(epics),
            Some(Value::Object(epics)) => Self::from_map(epics),
            _ => Self::default(),
        }
    }

    fn from_list(epics: &[Value]) -> Self {
        let mut document = Self::default();

        for epic in epics.iter().filter_map(Value::as_object) {
            let name = epic
                .get("name")
                .or_else(|| epic.get("epic_name"))
                .and_then(Value::as_str)
                .unwrap_or("Unknown")
                .to_string();
            let user_types = string_list(epic.get("user_types"));
            document.user_roles.extend(user_types.iter().cloned());

            let tasks = epic.get("tasks").and_then(Value::as_array);
            let task_count = tasks.map_or(0, Vec::len);
            for task in tasks.into_iter().flatten().filter_map(Value::as_object) {
                document.user_roles.extend(string_list(task.get("user_types")));
                if let Some(efforts) = task.get("efforts").and_then(Value::as_object) {
                    document.add_efforts(efforts);
                }
            }

            document.epics.push(EpicSummary {
                name,
                task_count,
                user_types,
                is_mandatory: epic.get("is_mandatory").and_then(Value::as_bool).unwrap_or(false),
            });
        }
        document
    }

    fn from_map(epics: &Map<String, Value>) -> Self {
        let mut document = Self::default();

        for (name, tasks) in epics {
            let tasks = tasks.as_object();
            for efforts in tasks.into_iter().flat_map(|t| t.values()).filter_map(Value::as_object) {
                document.add_efforts(efforts);
            }
            document.epics.push(EpicSummary {
                name: name.clone(),
                task_count: tasks.map_or(0, Map::len),
                user_types: Vec::new(),
                is_mandatory: false,
            });
        }
        document
    }

    // Non-numeric hour values are ignored.
    fn add_efforts(&mut self, efforts: &Map<String, Value>) {
        for (platform, hours) in efforts {
            self.platforms.insert(platform.clone());
            if let Some(hours) = hours.as_f64() {
                self.total_hours += hours;
            }
        }
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_list_layout() {
        let doc = EstimationDocument::from_value(&json!({
            "epics": [
                {
                    "name": "Authentication",
                    "is_mandatory": true,
                    "user_types": ["Admin"],
                    "tasks": [
                        {"description": "Login", "efforts": {"Flutter": 8, "API": 4.5}},
                        {
                            "description": "Logout",
                            "efforts": {"Flutter": "n/a"},
                            "user_types": ["Driver"]
                        }
                    ]
                },
                {"epic_name": "Chat", "tasks": []},
                "not an epic"
            ]
        }));

        assert_eq!(doc.epics.len(), 2);
        assert_eq!(doc.epics[0].task_count, 2);
        assert!(doc.epics[0].is_mandatory);
        assert_eq!(doc.epics[1].name, "Chat");
        assert_eq!(doc.total_hours, 12.5);
        assert_eq!(doc.platforms, BTreeSet::from(["API".to_string(), "Flutter".to_string()]));
        assert_eq!(doc.user_roles, BTreeSet::from(["Admin".to_string(), "Driver".to_string()]));
    }

    #[test]
    fn reads_map_layout() {
        let doc = EstimationDocument::from_value(&json!({
            "epics": {
                "Authentication": {
                    "Login": {"Flutter": 8, "Web Service": 6},
                    "Logout": {"Flutter": 2}
                },
                "Broken": 3
            }
        }));

        assert_eq!(doc.epics.len(), 2);
        let auth = doc.epics.iter().find(|e| e.name == "Authentication").unwrap();
        assert_eq!(auth.task_count, 2);
        let broken = doc.epics.iter().find(|e| e.name == "Broken").unwrap();
        assert_eq!(broken.task_count, 0);
        assert_eq!(doc.total_hours, 16.0);
        assert!(doc.platforms.contains("Web Service"));
        assert!(doc.user_roles.is_empty());
    }

    #[test]
    fn unknown_layout_is_empty() {
        assert_eq!(
            EstimationDocument::from_value(&json!({"foo": 1})),
            EstimationDocument::default()
        );
        assert_eq!(EstimationDocument::from_value(&json!([1, 2])), EstimationDocument::default());
    }
}
