//! Prompt text for the two model-backed stages.

use estimator_core::{AnalyzedRequirement, Epic, Platform};
use std::fmt::Write;

/// System instruction for requirement analysis.
pub const ANALYSIS_INSTRUCTION: &str = r#"You are an expert software requirements analyst. Read the project description and return a structured analysis as JSON.

## What to extract

1. Domain: the business domain in a few words (e.g. "food delivery", "telemedicine").
2. Features: every distinct functional feature, including the ones users would expect even if not stated
   (search, filters, favourites, reviews, history, exports). Use snake_case identifiers.
3. Tech stack: technologies mentioned or clearly implied.
4. Platforms: choose ONLY from "Flutter", "Web App", "API", "CMS".
   - "Flutter": mobile apps for end users (Android/iOS).
   - "Web App": browser frontend for end users.
   - "CMS": admin or staff dashboard. An admin web dashboard is CMS, never Web App.
   - "API": backend, always included when any frontend exists.
   Examples:
   - "Mobile app for customers, web dashboard for admin" -> ["Flutter", "API", "CMS"]
   - "iOS and Android app" -> ["Flutter", "API"]
   - "Web application for users, admin panel" -> ["Web App", "API", "CMS"]
   - "Mobile and web app for users" -> ["Flutter", "Web App", "API"]
5. Complexity: "simple", "medium" or "complex".
6. Initial epics: one epic per feature, in title case. Add a " - UserType" suffix when the
   feature belongs to one user type (e.g. "Dashboard - Admin", "Profile - Buyer").
7. Epic categories: map each initial epic to the single feature it covers.
8. User types: roles explicitly mentioned or clearly required by the domain
   (e.g. Customer, Restaurant, Delivery Partner, Admin). Leave empty for a single generic user.
9. Special requirements: needs with architectural impact (real-time, compliance, payments,
   geospatial, media processing, machine learning, critical third-party integrations).

## Output

Return only a JSON object of this shape:
{
  "domain": "domain_name",
  "features": ["feature1", "feature2"],
  "tech_stack": ["tech1"],
  "platforms": ["Flutter", "API", "CMS"],
  "complexity": "medium",
  "initial_epics": ["Feature One", "Feature Two - Admin"],
  "epic_categories": {"Feature One": ["feature1"], "Feature Two - Admin": ["feature2"]},
  "user_types": ["Customer", "Admin"],
  "special_requirements": ["requirement1"]
}
"#;

fn join_platforms<'a>(platforms: impl IntoIterator<Item = &'a Platform>) -> String {
    platforms.into_iter().map(Platform::as_str).collect::<Vec<_>>().join(", ")
}

fn join_or_none<S: AsRef<str>>(items: impl IntoIterator<Item = S>) -> String {
    let joined = items.into_iter().map(|s| s.as_ref().to_string()).collect::<Vec<_>>().join(", ");
    if joined.is_empty() { "None".to_string() } else { joined }
}

/// Compact listing of epics and their tasks for a prompt.
pub fn format_epics(epics: &[Epic]) -> String {
    let mut out = String::new();
    for epic in epics {
        let _ = writeln!(out, "\n**{}** ({} tasks):", epic.name, epic.tasks.len());
        for task in &epic.tasks {
            let efforts = task
                .efforts
                .iter()
                .map(|(p, h)| format!("{}: {}h", p, h))
                .collect::<Vec<_>>()
                .join(", ");
            let _ = writeln!(out, "  - {} -> {}", task.description, efforts);
        }
    }
    out
}

/// System instruction for the adapt-and-generate call.
pub fn generation_instruction(analysis: &AnalyzedRequirement) -> String {
    format!(
        r#"You are an expert software estimator specialising in {domain} applications.

Your task has two parts:
1. ADAPT the retrieved historical epics to this project.
   - Keep every epic name EXACTLY as given. Do not rename epics.
   - Keep every task description EXACTLY as given. Do not rewrite, merge or remove tasks.
   - Only change the platforms and hours of each task, and only ADD tasks the project needs.
2. GENERATE new epics for features no existing epic covers.

Target platforms: {platforms}
Examples may use other platforms. Learn their task patterns and effort ranges, then express
efforts ONLY for the target platforms (e.g. "Web App: 12h" with a Flutter target becomes
"Flutter: 12h"). Never output a platform outside the target list.

Epic naming: generic epics used by every user type keep a plain name ("Payment Integration").
Epics for one user type get a " - UserType" suffix ("Dashboard - Admin"); several user types
are joined with "/" ("Messaging - Buyer/Seller").
User types in this project: {user_types}

Each epic should have 3-8 high-level tasks. Per-task effort guidelines: simple screens 4-8h,
standard features 8-16h, complex features 16-32h per platform. CMS work is usually lighter
than the equivalent app screen; API work for data-heavy features is usually heavier.

Return valid JSON only."#,
        domain = analysis.domain,
        platforms = join_platforms(&analysis.platforms),
        user_types = join_or_none(&analysis.user_types),
    )
}

/// User prompt for the adapt-and-generate call.
pub fn generation_prompt(
    analysis: &AnalyzedRequirement,
    mandatory_names: &[&str],
    retrieved: &[Epic],
    target_new_epics: (usize, usize),
) -> String {
    let platforms = join_platforms(&analysis.platforms);
    let (min_new, max_new) = target_new_epics;
    let special = join_or_none(&analysis.special_requirements);

    format!(
        r#"## Project
- Domain: {domain}
- Complexity: {complexity}
- Target platforms: {platforms}
- User types: {user_types}
- Features: {features}
- Special requirements: {special}

## Already covered (do NOT return these)
{mandatory}

## Retrieved epics to adapt ({retrieved_count})
{retrieved_listing}

## Instructions
1. Return every retrieved epic in "modified_epics" with its name and task descriptions unchanged,
   efforts re-targeted to: {platforms}. Append new tasks only if this project needs them.
2. Return {min_new}-{max_new} NEW epics in "custom_epics" covering every feature not already covered.
   Do not reuse any name listed above.
3. Efforts are whole hours per platform, using only: {platforms}.

## Output
{{
  "modified_epics": [
    {{"name": "Retrieved Epic Name", "description": "...", "tasks": [
      {{"description": "Original task description", "efforts": {{"Flutter": 12, "API": 8}}}}
    ]}}
  ],
  "custom_epics": [
    {{"name": "New Epic - UserType", "description": "...", "tasks": [
      {{"description": "Task description", "efforts": {{"Flutter": 10, "API": 6}}, "reasoning": "optional"}}
    ]}}
  ]
}}"#,
        domain = analysis.domain,
        complexity = analysis.complexity,
        platforms = platforms,
        user_types = join_or_none(&analysis.user_types),
        features = join_or_none(&analysis.features),
        special = special,
        mandatory = join_or_none(mandatory_names),
        retrieved_count = retrieved.len(),
        retrieved_listing =
            if retrieved.is_empty() { "None".to_string() } else { format_epics(retrieved) },
        min_new = min_new,
        max_new = max_new,
    )
}
