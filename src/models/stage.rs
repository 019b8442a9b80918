use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::analysis::RequirementsAnalysis;
use super::enums::StageName;
use super::test_case::TestCaseCollection;
use super::test_data::TestDataCollection;
use super::user_story::UserStoryCollection;

/// How a stage ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StageStatus {
    /// A structured payload was recovered from the response.
    Success,
    /// The response could not be parsed; payload is empty, raw text kept.
    Degraded,
    /// The backend call itself failed; payload is empty.
    InvocationFailed { transient: bool, message: String },
}

impl StageStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Degraded => "degraded",
            Self::InvocationFailed { .. } => "invocation_failed",
        }
    }
}

/// Structured payload of one stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Artifact {
    Analysis(RequirementsAnalysis),
    UserStories(UserStoryCollection),
    TestCases(TestCaseCollection),
    TestData(TestDataCollection),
}

impl Artifact {
    /// The payload a stage carries when nothing usable was produced.
    pub fn empty(stage: StageName) -> Self {
        match stage {
            StageName::Analysis => Self::Analysis(RequirementsAnalysis::default()),
            StageName::UserStories => Self::UserStories(UserStoryCollection::default()),
            StageName::TestCases => Self::TestCases(TestCaseCollection::default()),
            StageName::TestData => Self::TestData(TestDataCollection::default()),
        }
    }

    /// Decode a stored payload; the stage decides the shape.
    pub fn from_stage(stage: StageName, value: Value) -> Result<Self, serde_json::Error> {
        Ok(match stage {
            StageName::Analysis => Self::Analysis(serde_json::from_value(value)?),
            StageName::UserStories => Self::UserStories(serde_json::from_value(value)?),
            StageName::TestCases => Self::TestCases(serde_json::from_value(value)?),
            StageName::TestData => Self::TestData(serde_json::from_value(value)?),
        })
    }

    pub fn stage(&self) -> StageName {
        match self {
            Self::Analysis(_) => StageName::Analysis,
            Self::UserStories(_) => StageName::UserStories,
            Self::TestCases(_) => StageName::TestCases,
            Self::TestData(_) => StageName::TestData,
        }
    }

    /// Usable records carried by the payload. For the analysis this is the
    /// number of functional requirements.
    pub fn record_count(&self) -> usize {
        match self {
            Self::Analysis(a) => a.functional_requirements.len(),
            Self::UserStories(c) => c.len(),
            Self::TestCases(c) => c.len(),
            Self::TestData(c) => c.len(),
        }
    }

    pub fn as_user_stories(&self) -> Option<&UserStoryCollection> {
        match self {
            Self::UserStories(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_test_cases(&self) -> Option<&TestCaseCollection> {
        match self {
            Self::TestCases(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_test_data(&self) -> Option<&TestDataCollection> {
        match self {
            Self::TestData(c) => Some(c),
            _ => None,
        }
    }
}

/// Outcome of one stage for one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawStageResult")]
pub struct StageResult {
    pub stage: StageName,
    pub document_id: Uuid,
    pub status: StageStatus,
    pub payload: Artifact,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
    pub timestamp: NaiveDateTime,
}

impl StageResult {
    pub fn success(document_id: Uuid, payload: Artifact, raw_text: String) -> Self {
        Self {
            stage: payload.stage(),
            document_id,
            status: StageStatus::Success,
            payload,
            raw_text: Some(raw_text),
            timestamp: now(),
        }
    }

    /// Raw text is preserved verbatim.
    pub fn degraded(document_id: Uuid, stage: StageName, raw_text: String) -> Self {
        Self {
            stage,
            document_id,
            status: StageStatus::Degraded,
            payload: Artifact::empty(stage),
            raw_text: Some(raw_text),
            timestamp: now(),
        }
    }

    pub fn invocation_failed(
        document_id: Uuid,
        stage: StageName,
        transient: bool,
        message: String,
    ) -> Self {
        Self {
            stage,
            document_id,
            status: StageStatus::InvocationFailed { transient, message },
            payload: Artifact::empty(stage),
            raw_text: None,
            timestamp: now(),
        }
    }

    /// Text forwarded to the next stage, if this stage produced anything.
    ///
    /// Successful payloads are forwarded as JSON, degraded ones as their raw
    /// text; a failed invocation forwards nothing.
    pub fn forward_context(&self) -> Option<String> {
        match &self.status {
            StageStatus::Success => serde_json::to_string_pretty(&self.payload).ok(),
            StageStatus::Degraded => self
                .raw_text
                .as_ref()
                .filter(|t| !t.trim().is_empty())
                .cloned(),
            StageStatus::InvocationFailed { .. } => None,
        }
    }
}

fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

#[derive(Deserialize)]
struct RawStageResult {
    stage: StageName,
    document_id: Uuid,
    status: StageStatus,
    payload: Value,
    #[serde(default)]
    raw_text: Option<String>,
    timestamp: NaiveDateTime,
}

impl TryFrom<RawStageResult> for StageResult {
    type Error = serde_json::Error;

    fn try_from(raw: RawStageResult) -> Result<Self, Self::Error> {
        Ok(Self {
            payload: Artifact::from_stage(raw.stage, raw.payload)?,
            stage: raw.stage,
            document_id: raw.document_id,
            status: raw.status,
            raw_text: raw.raw_text,
            timestamp: raw.timestamp,
        })
    }
}
