use estimator_eval::{
    Comparison, EstimationDocument, HoursStatus, MatchType, fuzzy_ratio, match_epics,
    render_markdown,
};
use serde_json::json;

fn actual() -> EstimationDocument {
    EstimationDocument::from_value(&json!({
        "epics": {
            "Authentication": {"Login": {"Flutter": 8, "API": 6}, "Logout": {"Flutter": 2}},
            "Payment": {"Checkout": {"Flutter": 10, "API": 4}}
        }
    }))
}

fn predicted() -> EstimationDocument {
    EstimationDocument::from_value(&json!({
        "epics": [
            {
                "name": "Authentication",
                "is_mandatory": true,
                "tasks": [
                    {"description": "Login", "efforts": {"Flutter": 8, "API": 6}},
                    {"description": "Logout", "efforts": {"Flutter": 2}}
                ]
            },
            {
                "name": "Paiment",
                "tasks": [{"description": "Checkout", "efforts": {"Flutter": 12, "API": 7}}]
            }
        ]
    }))
}

#[test]
fn misspelled_epic_is_matched_fuzzily() {
    let comparison = Comparison::run(&actual(), &predicted(), 0.75);

    let epics = &comparison.epics;
    assert_eq!(epics.exact_count(), 1);
    assert_eq!(epics.fuzzy_count(), 1);
    assert_eq!(epics.coverage_percentage, 100.0);
    let fuzzy = epics.matches.iter().find(|m| m.match_type == MatchType::Fuzzy).unwrap();
    assert_eq!(fuzzy.actual.name, "Payment");
    assert_eq!(fuzzy.predicted.name, "Paiment");
    assert!((fuzzy.similarity - 0.857).abs() < 0.001);

    let hours = &comparison.hours;
    assert_eq!(hours.actual_hours, 30.0);
    assert_eq!(hours.predicted_hours, 35.0);
    assert_eq!(hours.difference, 5.0);
    assert_eq!(hours.difference_percentage, 16.67);
    assert_eq!(hours.status, HoursStatus::Overestimated);

    assert_eq!(comparison.platforms.coverage_percentage, 100.0);
    assert_eq!(comparison.tasks.overall_task_coverage, 100.0);
}

#[test]
fn stricter_threshold_leaves_misspelling_unmatched() {
    let comparison = Comparison::run(&actual(), &predicted(), 0.9);
    assert_eq!(comparison.epics.matches.len(), 1);
    assert_eq!(comparison.epics.missing[0].name, "Payment");
    assert_eq!(comparison.epics.extra[0].name, "Paiment");
    assert_eq!(comparison.epics.coverage_percentage, 50.0);
}

#[test]
fn identical_documents_fully_cover_each_other() {
    let doc = predicted();
    let comparison = Comparison::run(&doc, &doc, 0.75);
    assert_eq!(comparison.epics.exact_count(), doc.epics.len());
    assert_eq!(comparison.hours.status, HoursStatus::Accurate);
    assert_eq!(comparison.tasks.overall_task_coverage, 100.0);
}

#[test]
fn epic_coverage_stays_in_range() {
    let actual = actual();
    for predicted in [predicted(), EstimationDocument::default(), actual.clone()] {
        let coverage = match_epics(&actual.epics, &predicted.epics, 0.75).coverage_percentage;
        assert!((0.0..=100.0).contains(&coverage));
    }
    assert_eq!(fuzzy_ratio("Payment", "Paiment"), fuzzy_ratio("Paiment", "Payment"));
}

#[test]
fn report_contains_every_section() {
    let comparison = Comparison::run(&actual(), &predicted(), 0.75);
    let report = render_markdown(&comparison, chrono::Local::now());

    for heading in [
        "# Estimation Comparison Report",
        "## 1. Total Hours Comparison",
        "## 2. Platform Coverage",
        "## 3. User Role Coverage",
        "## 4. Epic Coverage",
        "## 5. Task Coverage & Granularity",
        "## Epic Coverage by User Type",
        "## Overall Summary",
        "### Key Findings",
    ] {
        assert!(report.contains(heading), "missing {heading}");
    }
    assert!(report.contains("**Fuzzy Match Threshold:** 0.75"));
    assert!(report.contains("| Difference | +5 (+16.67%) |"));
    assert!(report.contains("OVERESTIMATED"));
    assert!(report.contains("| Payment | Paiment | FUZZY | 0.86 |"));
    assert!(report.contains("Hours estimation is moderately accurate"));
}
