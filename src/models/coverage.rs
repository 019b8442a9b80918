use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::StageName;

/// Per-document record counts after a run. Recomputed on every run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageSummary {
    pub document_id: Uuid,
    pub functional_requirements_count: usize,
    pub user_stories_count: usize,
    pub test_cases_count: usize,
    pub test_data_count: usize,
    /// Share of user stories referenced by at least one test case, 0..=100.
    pub story_coverage_percentage: f64,
    /// Stages whose payload came back degraded or failed.
    pub degraded_stages: Vec<StageName>,
    pub generated_at: NaiveDateTime,
}
