use std::collections::HashSet;

use uuid::Uuid;

use crate::models::{Artifact, CoverageSummary, StageResult};

/// Summarise what a run actually produced.
///
/// Counts come from the payloads themselves, so a successful stage with no
/// records counts the same as a degraded one.
pub fn compute_coverage(document_id: Uuid, results: &[StageResult]) -> CoverageSummary {
    let mut summary = CoverageSummary {
        document_id,
        functional_requirements_count: 0,
        user_stories_count: 0,
        test_cases_count: 0,
        test_data_count: 0,
        story_coverage_percentage: 0.0,
        degraded_stages: Vec::new(),
        generated_at: chrono::Local::now().naive_local(),
    };

    let mut story_ids: Vec<&str> = Vec::new();
    let mut referenced: HashSet<&str> = HashSet::new();

    for result in results {
        if !result.status.is_success() {
            summary.degraded_stages.push(result.stage);
        }
        match &result.payload {
            Artifact::Analysis(a) => {
                summary.functional_requirements_count = a.functional_requirements.len();
            }
            Artifact::UserStories(c) => {
                summary.user_stories_count = c.len();
                story_ids = c.user_stories.iter().map(|s| s.id.as_str()).collect();
            }
            Artifact::TestCases(c) => {
                summary.test_cases_count = c.len();
                referenced = c
                    .test_cases
                    .iter()
                    .filter_map(|tc| tc.user_story_id.as_deref())
                    .collect();
            }
            Artifact::TestData(c) => summary.test_data_count = c.len(),
        }
    }

    if !story_ids.is_empty() {
        let covered = story_ids.iter().filter(|id| referenced.contains(*id)).count();
        summary.story_coverage_percentage =
            ((covered as f64 / story_ids.len() as f64) * 1000.0).round() / 10.0;
    }
    summary.degraded_stages.sort();
    summary.degraded_stages.dedup();

    summary
}
