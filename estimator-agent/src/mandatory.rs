//! The fixed set of epics every estimate carries.
//!
//! The catalog is trusted configuration: it is loaded verbatim, and a file
//! naming an unknown platform or a non-integer hour value fails to load.
//! Estimates see it through [`MandatoryEpicCatalog::for_targets`].

use crate::agents::retriever::restrict_to_targets;
use estimator_core::{
    Efforts, Epic, EstimationMethod, EstimatorError, MANDATORY_SOURCE, Platform, Result, Task,
    name_key,
};
use serde::Deserialize;
use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use tracing::{debug, info};

const DEFAULT_CATALOG: &str = include_str!("../data/mandatory_epics.json");

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogFile {
    mandatory_epics: Vec<CatalogEpic>,
}

#[derive(Debug, Deserialize)]
struct CatalogEpic {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    tasks: Vec<CatalogTask>,
}

#[derive(Debug, Deserialize)]
struct CatalogTask {
    description: String,
    efforts: Efforts,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MandatoryEpicCatalog {
    epics: Vec<Epic>,
}

impl MandatoryEpicCatalog {
    /// The catalog compiled into the binary.
    pub fn builtin() -> Result<Self> {
        Self::from_json(DEFAULT_CATALOG)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            EstimatorError::config(format!(
                "failed to read mandatory epics '{}': {}",
                path.display(),
                e
            ))
        })?;
        let catalog = Self::from_json(&text)?;
        info!(path = %path.display(), epics = catalog.len(), "Loaded mandatory epics");
        Ok(catalog)
    }

    /// Load the file at `path`, or the built-in catalog when none is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_path(path),
            None => Self::builtin(),
        }
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let file: CatalogFile = serde_json::from_str(text).map_err(|e| {
            EstimatorError::config(format!("invalid mandatory epics catalog: {}", e))
        })?;

        let mut seen = HashSet::new();
        let mut epics = Vec::with_capacity(file.mandatory_epics.len());
        for raw in file.mandatory_epics {
            if raw.name.trim().is_empty() {
                return Err(EstimatorError::config("mandatory epic with an empty name"));
            }
            if !seen.insert(name_key(&raw.name)) {
                return Err(EstimatorError::config(format!(
                    "mandatory epic '{}' is listed twice",
                    raw.name
                )));
            }

            let mut epic =
                Epic::new(raw.name, raw.description).mandatory().with_source(MANDATORY_SOURCE);
            for task in raw.tasks {
                let task = Task::new(task.description, task.efforts, EstimationMethod::Historical);
                epic.tasks.push(task);
            }
            debug!(epic = %epic.name, tasks = epic.tasks.len(), "Mandatory epic");
            epics.push(epic);
        }

        Ok(Self { epics })
    }

    pub fn epics(&self) -> &[Epic] {
        &self.epics
    }

    /// The catalog restricted to `targets`: off-target hours are dropped and
    /// so are tasks left with none. Every epic is kept, in catalog order.
    pub fn for_targets(&self, targets: &BTreeSet<Platform>) -> Vec<Epic> {
        self.epics
            .iter()
            .cloned()
            .map(|mut epic| {
                restrict_to_targets(&mut epic, targets);
                if epic.tasks.is_empty() {
                    debug!(epic = %epic.name, "Mandatory epic has no target-platform tasks");
                }
                epic
            })
            .collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.epics.iter().map(|e| e.name.as_str()).collect()
    }

    /// Case-insensitive exact-name membership.
    pub fn contains(&self, name: &str) -> bool {
        let key = name_key(name);
        self.epics.iter().any(|e| e.name_key() == key)
    }

    pub fn len(&self) -> usize {
        self.epics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.epics.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog() {
        let catalog = MandatoryEpicCatalog::builtin().unwrap();
        assert_eq!(
            catalog.names(),
            vec![
                "Authentication",
                "Project Configuration",
                "Deployment",
                "Database Design",
                "Elastic Search",
                "Notification",
                "My Profile",
                "Profile Setup"
            ]
        );
        for epic in catalog.epics() {
            assert!(epic.is_mandatory);
            assert_eq!(epic.source_template, MANDATORY_SOURCE);
            assert!(!epic.tasks.is_empty(), "{} has no tasks", epic.name);
        }
        assert!(catalog.contains("my profile"));
        assert!(!catalog.contains("Payments"));
    }

    #[test]
    fn test_loaded_verbatim() {
        let catalog = MandatoryEpicCatalog::from_json(
            r#"{"mandatory_epics": [{"name": "Deployment", "description": "Ship it",
                "tasks": [{"description": "CI", "efforts": {"API": 6, "CMS": 4}}]}]}"#,
        )
        .unwrap();
        let epic = &catalog.epics()[0];
        assert_eq!(epic.description, "Ship it");
        assert_eq!(epic.tasks[0].efforts[&Platform::Api], 6);
        assert_eq!(epic.tasks[0].efforts[&Platform::Cms], 4);
    }

    #[test]
    fn test_for_targets_keeps_every_epic() {
        let catalog = MandatoryEpicCatalog::from_json(
            r#"{"mandatory_epics": [
                {"name": "Deployment", "tasks": [
                    {"description": "CI", "efforts": {"API": 6, "CMS": 4}},
                    {"description": "Store release", "efforts": {"Flutter": 8}}
                ]},
                {"name": "Admin Roles", "tasks": [
                    {"description": "Role editor", "efforts": {"CMS": 6}}
                ]}
            ]}"#,
        )
        .unwrap();
        let targets: BTreeSet<Platform> = [Platform::Flutter, Platform::Api].into_iter().collect();

        let epics = catalog.for_targets(&targets);
        let names: Vec<&str> = epics.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Deployment", "Admin Roles"]);
        assert_eq!(epics[0].tasks.len(), 2);
        let api_only: Efforts = [(Platform::Api, 6)].into_iter().collect();
        assert_eq!(epics[0].tasks[0].efforts, api_only);
        assert_eq!(epics[0].tasks[1].efforts[&Platform::Flutter], 8);
        assert!(epics[1].is_mandatory);
        assert!(epics[1].tasks.is_empty());
        let on_target = |task: &Task| task.efforts.keys().all(|p| targets.contains(p));
        assert!(epics.iter().flat_map(|e| &e.tasks).all(on_target));
    }

    #[test]
    fn test_unknown_platform_is_error() {
        let err = MandatoryEpicCatalog::from_json(
            r#"{"mandatory_epics": [{"name": "Deployment",
                "tasks": [{"description": "CI", "efforts": {"Desktop": 6}}]}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, EstimatorError::Config(_)));
    }

    #[test]
    fn test_duplicate_name_is_error() {
        let err = MandatoryEpicCatalog::from_json(
            r#"{"mandatory_epics": [{"name": "Deployment"}, {"name": "deployment"}]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("listed twice"));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = MandatoryEpicCatalog::from_path(Path::new("/no/such/catalog.json")).unwrap_err();
        assert!(matches!(err, EstimatorError::Config(_)));
    }
}
