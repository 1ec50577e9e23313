//! The five comparison dimensions plus the per-user-type breakdown.

use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::sync::OnceLock;

use crate::document::{EpicSummary, EstimationDocument};
use crate::scoring::{fuzzy_ratio, names_equal};

pub const DEFAULT_THRESHOLD: f64 = 0.75;

/// Hours within this many percent of actual count as accurate.
const ACCURATE_HOURS_PERCENT: f64 = 10.0;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 { 0.0 } else { round2(part as f64 / whole as f64 * 100.0) }
}

/// Traffic-light bucket for a coverage percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CoverageStatus {
    Good,
    Moderate,
    Poor,
}

impl CoverageStatus {
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage >= 80.0 {
            Self::Good
        } else if percentage >= 50.0 {
            Self::Moderate
        } else {
            Self::Poor
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Good => "✅",
            Self::Moderate => "⚠️",
            Self::Poor => "❌",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HoursStatus {
    Accurate,
    Overestimated,
    Underestimated,
}

impl fmt::Display for HoursStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Accurate => "ACCURATE",
            Self::Overestimated => "OVERESTIMATED",
            Self::Underestimated => "UNDERESTIMATED",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoursComparison {
    pub actual_hours: f64,
    pub predicted_hours: f64,
    pub difference: f64,
    pub difference_percentage: f64,
    pub status: HoursStatus,
}

impl HoursComparison {
    /// Display band: accurate (<10%), moderate (<20%), else needs improvement.
    pub fn band(&self) -> CoverageStatus {
        let off = self.difference_percentage.abs();
        if off < 10.0 {
            CoverageStatus::Good
        } else if off < 20.0 {
            CoverageStatus::Moderate
        } else {
            CoverageStatus::Poor
        }
    }
}

pub fn compare_hours(actual_hours: f64, predicted_hours: f64) -> HoursComparison {
    let difference = predicted_hours - actual_hours;
    let difference_percentage =
        if actual_hours > 0.0 { round2(difference / actual_hours * 100.0) } else { 0.0 };

    let within_band =
        actual_hours > 0.0 && difference_percentage.abs() <= ACCURATE_HOURS_PERCENT;
    let status = if difference == 0.0 || within_band {
        HoursStatus::Accurate
    } else if difference > 0.0 {
        HoursStatus::Overestimated
    } else {
        HoursStatus::Underestimated
    };

    HoursComparison { actual_hours, predicted_hours, difference, difference_percentage, status }
}

/// Coverage of one set of labels (platforms, user roles) by another.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SetCoverage {
    pub total_actual: usize,
    pub total_predicted: usize,
    pub matched: Vec<String>,
    pub missing: Vec<String>,
    pub extra: Vec<String>,
    pub coverage_percentage: f64,
}

pub fn compare_sets(actual: &BTreeSet<String>, predicted: &BTreeSet<String>) -> SetCoverage {
    let matched: Vec<String> = actual.intersection(predicted).cloned().collect();
    SetCoverage {
        total_actual: actual.len(),
        total_predicted: predicted.len(),
        coverage_percentage: percentage(matched.len(), actual.len()),
        matched,
        missing: actual.difference(predicted).cloned().collect(),
        extra: predicted.difference(actual).cloned().collect(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchType {
    Exact,
    Fuzzy,
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Exact => "EXACT",
            Self::Fuzzy => "FUZZY",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EpicMatch {
    pub actual: EpicSummary,
    pub predicted: EpicSummary,
    pub similarity: f64,
    pub match_type: MatchType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EpicCoverage {
    pub total_actual: usize,
    pub total_predicted: usize,
    pub matches: Vec<EpicMatch>,
    pub missing: Vec<EpicSummary>,
    pub extra: Vec<EpicSummary>,
    pub coverage_percentage: f64,
}

impl EpicCoverage {
    pub fn exact_count(&self) -> usize {
        self.matches.iter().filter(|m| m.match_type == MatchType::Exact).count()
    }

    pub fn fuzzy_count(&self) -> usize {
        self.matches.iter().filter(|m| m.match_type == MatchType::Fuzzy).count()
    }
}

/// Pair actual epics with predicted ones.
///
/// Phase one takes case-insensitive exact name matches. Phase two gives each
/// still-unmatched actual epic the best-scoring unused predicted epic at or
/// above `threshold`; on a tie the earlier predicted epic wins. Whatever is
/// left is missing (actual) or extra (predicted). Each predicted epic is used
/// at most once.
pub fn match_epics(
    actual: &[EpicSummary],
    predicted: &[EpicSummary],
    threshold: f64,
) -> EpicCoverage {
    let mut used_predicted: HashSet<usize> = HashSet::new();
    let mut matched_actual: HashSet<usize> = HashSet::new();
    let mut matches = Vec::new();

    for (ai, actual_epic) in actual.iter().enumerate() {
        let found = predicted.iter().enumerate().find(|(pi, p)| {
            !used_predicted.contains(pi) && names_equal(&actual_epic.name, &p.name)
        });
        if let Some((pi, predicted_epic)) = found {
            used_predicted.insert(pi);
            matched_actual.insert(ai);
            matches.push(EpicMatch {
                actual: actual_epic.clone(),
                predicted: predicted_epic.clone(),
                similarity: 1.0,
                match_type: MatchType::Exact,
            });
        }
    }

    for (ai, actual_epic) in actual.iter().enumerate() {
        if matched_actual.contains(&ai) {
            continue;
        }
        let mut best: Option<(usize, f64)> = None;
        for (pi, predicted_epic) in predicted.iter().enumerate() {
            if used_predicted.contains(&pi) {
                continue;
            }
            let score = fuzzy_ratio(&actual_epic.name, &predicted_epic.name);
            if score >= threshold && best.is_none_or(|(_, best_score)| score > best_score) {
                best = Some((pi, score));
            }
        }
        if let Some((pi, score)) = best {
            used_predicted.insert(pi);
            matched_actual.insert(ai);
            matches.push(EpicMatch {
                actual: actual_epic.clone(),
                predicted: predicted[pi].clone(),
                similarity: score,
                match_type: MatchType::Fuzzy,
            });
        }
    }

    EpicCoverage {
        total_actual: actual.len(),
        total_predicted: predicted.len(),
        coverage_percentage: percentage(matches.len(), actual.len()),
        missing: actual
            .iter()
            .enumerate()
            .filter(|(ai, _)| !matched_actual.contains(ai))
            .map(|(_, e)| e.clone())
            .collect(),
        extra: predicted
            .iter()
            .enumerate()
            .filter(|(pi, _)| !used_predicted.contains(pi))
            .map(|(_, e)| e.clone())
            .collect(),
        matches,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Granularity {
    LessGranular,
    MoreGranular,
    Similar,
}

impl Granularity {
    pub fn classify(actual_tasks: usize, predicted_tasks: usize) -> Self {
        let actual = actual_tasks as f64;
        let predicted = predicted_tasks as f64;
        if predicted < actual * 0.7 {
            Self::LessGranular
        } else if predicted > actual * 1.3 {
            Self::MoreGranular
        } else {
            Self::Similar
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Similar => "📊",
            Self::LessGranular => "📉",
            Self::MoreGranular => "📈",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::LessGranular => "LESS_GRANULAR",
            Self::MoreGranular => "MORE_GRANULAR",
            Self::Similar => "SIMILAR",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpicTaskDetail {
    pub epic_name: String,
    pub actual_task_count: usize,
    pub predicted_task_count: usize,
    pub coverage_percentage: f64,
    pub granularity: Granularity,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskCoverage {
    pub avg_actual_tasks: f64,
    pub avg_predicted_tasks: f64,
    pub granularity_difference_percentage: f64,
    pub overall_task_coverage: f64,
    pub epic_task_details: Vec<EpicTaskDetail>,
}

fn average_tasks(epics: &[EpicSummary]) -> f64 {
    if epics.is_empty() {
        return 0.0;
    }
    epics.iter().map(|e| e.task_count).sum::<usize>() as f64 / epics.len() as f64
}

pub fn compare_tasks(
    actual: &[EpicSummary],
    predicted: &[EpicSummary],
    matches: &[EpicMatch],
) -> TaskCoverage {
    let avg_actual = average_tasks(actual);
    let avg_predicted = average_tasks(predicted);

    let details: Vec<EpicTaskDetail> = matches
        .iter()
        .map(|m| {
            let a = m.actual.task_count;
            let p = m.predicted.task_count;
            let coverage = match (a, p) {
                (0, 0) => 100.0,
                (0, _) => 0.0,
                _ => p.min(a) as f64 / a as f64 * 100.0,
            };
            EpicTaskDetail {
                epic_name: m.actual.name.clone(),
                actual_task_count: a,
                predicted_task_count: p,
                coverage_percentage: round2(coverage),
                granularity: Granularity::classify(a, p),
            }
        })
        .collect();

    let overall = if details.is_empty() {
        0.0
    } else {
        details.iter().map(|d| d.coverage_percentage).sum::<f64>() / details.len() as f64
    };
    let granularity_diff =
        if avg_actual > 0.0 { (avg_predicted - avg_actual) / avg_actual * 100.0 } else { 0.0 };

    TaskCoverage {
        avg_actual_tasks: round2(avg_actual),
        avg_predicted_tasks: round2(avg_predicted),
        granularity_difference_percentage: round2(granularity_diff),
        overall_task_coverage: round2(overall),
        epic_task_details: details,
    }
}

static USER_TYPE_SUFFIX: OnceLock<Regex> = OnceLock::new();

fn user_type_suffix() -> &'static Regex {
    USER_TYPE_SUFFIX
        .get_or_init(|| Regex::new(r"\s+-\s+([A-Za-z/&\s]+)$").expect("Invalid regex pattern"))
}

/// User type named by an epic-name suffix such as `"Uploads - Photographer"`;
/// `&` is written as `/`. Epics without a suffix are `"Generic"`.
pub fn extract_user_type(epic_name: &str) -> String {
    user_type_suffix()
        .captures(epic_name)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().replace('&', "/").trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "Generic".to_string())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserTypeCoverage {
    pub total_actual: usize,
    pub total_predicted: usize,
    pub matched: usize,
    pub missing: Vec<String>,
    pub extra: Vec<String>,
    pub coverage_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserTypeBreakdown {
    pub by_user_type: BTreeMap<String, UserTypeCoverage>,
    pub overall_coverage: f64,
}

/// Epic coverage within each user type. An actual epic is covered by any
/// predicted epic of the same type scoring at least `threshold`.
pub fn compare_by_user_type(
    actual: &[EpicSummary],
    predicted: &[EpicSummary],
    threshold: f64,
) -> UserTypeBreakdown {
    let mut actual_by_type: BTreeMap<String, Vec<&str>> = BTreeMap::new();
    for epic in actual {
        actual_by_type.entry(extract_user_type(&epic.name)).or_default().push(&epic.name);
    }
    let mut predicted_by_type: BTreeMap<String, Vec<&str>> = BTreeMap::new();
    for epic in predicted {
        predicted_by_type.entry(extract_user_type(&epic.name)).or_default().push(&epic.name);
    }

    let user_types: BTreeSet<&String> =
        actual_by_type.keys().chain(predicted_by_type.keys()).collect();
    let mut by_user_type = BTreeMap::new();
    let (mut total_actual_all, mut total_matched_all) = (0usize, 0usize);

    for user_type in user_types {
        let actual_names = actual_by_type.get(user_type).map(Vec::as_slice).unwrap_or_default();
        let predicted_names =
            predicted_by_type.get(user_type).map(Vec::as_slice).unwrap_or_default();
        let missing: Vec<String> = actual_names
            .iter()
            .copied()
            .filter(|a| !predicted_names.iter().any(|p| fuzzy_ratio(a, p) >= threshold))
            .map(str::to_string)
            .collect();
        let extra: Vec<String> = predicted_names
            .iter()
            .copied()
            .filter(|p| !actual_names.iter().any(|a| fuzzy_ratio(a, p) >= threshold))
            .map(str::to_string)
            .collect();
        let matched = actual_names.len() - missing.len();

        total_actual_all += actual_names.len();
        total_matched_all += matched;
        by_user_type.insert(
            user_type.clone(),
            UserTypeCoverage {
                total_actual: actual_names.len(),
                total_predicted: predicted_names.len(),
                matched,
                missing,
                extra,
                coverage_percentage: percentage(matched, actual_names.len()),
            },
        );
    }

    UserTypeBreakdown {
        by_user_type,
        overall_coverage: percentage(total_matched_all, total_actual_all),
    }
}

/// Every dimension of one actual-versus-predicted comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub threshold: f64,
    pub hours: HoursComparison,
    pub platforms: SetCoverage,
    pub user_roles: SetCoverage,
    pub epics: EpicCoverage,
    pub tasks: TaskCoverage,
    pub by_user_type: UserTypeBreakdown,
}

impl Comparison {
    pub fn run(
        actual: &EstimationDocument,
        predicted: &EstimationDocument,
        threshold: f64,
    ) -> Self {
        let epics = match_epics(&actual.epics, &predicted.epics, threshold);
        let tasks = compare_tasks(&actual.epics, &predicted.epics, &epics.matches);
        Self {
            threshold,
            hours: compare_hours(actual.total_hours, predicted.total_hours),
            platforms: compare_sets(&actual.platforms, &predicted.platforms),
            user_roles: compare_sets(&actual.user_roles, &predicted.user_roles),
            by_user_type: compare_by_user_type(&actual.epics, &predicted.epics, threshold),
            epics,
            tasks,
        }
    }

    /// Named coverage percentages in display order.
    pub fn dimensions(&self) -> [(&'static str, f64); 4] {
        [
            ("Platforms", self.platforms.coverage_percentage),
            ("User Roles", self.user_roles.coverage_percentage),
            ("Epics", self.epics.coverage_percentage),
            ("Tasks", self.tasks.overall_task_coverage),
        ]
    }

    /// Mean of the four coverage dimensions.
    pub fn overall_score(&self) -> f64 {
        self.dimensions().iter().map(|(_, v)| v).sum::<f64>() / 4.0
    }

    /// Highest and lowest coverage dimensions. Ties resolve to the earlier
    /// dimension for best and the later one for worst.
    pub fn best_and_worst(&self) -> ((&'static str, f64), (&'static str, f64)) {
        let dims = self.dimensions();
        let mut best = dims[0];
        let mut worst = dims[0];
        for dim in dims {
            if dim.1 > best.1 {
                best = dim;
            }
            if dim.1 <= worst.1 {
                worst = dim;
            }
        }
        (best, worst)
    }
}
