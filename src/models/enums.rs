use serde::{Deserialize, Serialize};

use crate::db::DatabaseError;

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(StageName {
    Analysis => "analysis",
    UserStories => "user_stories",
    TestCases => "test_cases",
    TestData => "test_data",
});

str_enum!(ArtifactKind {
    Analysis => "analysis",
    UserStories => "user_stories",
    TestCases => "test_cases",
    TestData => "test_data",
    Coverage => "coverage",
    TabularExport => "tabular_export",
});

impl StageName {
    /// Stages in execution order.
    pub const ALL: [StageName; 4] = [
        StageName::Analysis,
        StageName::UserStories,
        StageName::TestCases,
        StageName::TestData,
    ];

    /// 1-based position in the chain.
    pub fn ordinal(&self) -> usize {
        match self {
            Self::Analysis => 1,
            Self::UserStories => 2,
            Self::TestCases => 3,
            Self::TestData => 4,
        }
    }

    /// Stages that run before this one, nearest first.
    pub fn predecessors(&self) -> Vec<StageName> {
        let idx = self.ordinal() - 1;
        Self::ALL[..idx].iter().rev().copied().collect()
    }

    pub fn artifact_kind(&self) -> ArtifactKind {
        match self {
            Self::Analysis => ArtifactKind::Analysis,
            Self::UserStories => ArtifactKind::UserStories,
            Self::TestCases => ArtifactKind::TestCases,
            Self::TestData => ArtifactKind::TestData,
        }
    }

    /// Human-facing agent title, used in prompts and logs.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Analysis => "Requirements Analyst",
            Self::UserStories => "User Story Creator",
            Self::TestCases => "Test Case Generator",
            Self::TestData => "Test Data Generator",
        }
    }
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 6] = [
        ArtifactKind::Analysis,
        ArtifactKind::UserStories,
        ArtifactKind::TestCases,
        ArtifactKind::TestData,
        ArtifactKind::Coverage,
        ArtifactKind::TabularExport,
    ];

    /// The stage that produces this artifact, if it is a stage artifact.
    pub fn stage(&self) -> Option<StageName> {
        match self {
            Self::Analysis => Some(StageName::Analysis),
            Self::UserStories => Some(StageName::UserStories),
            Self::TestCases => Some(StageName::TestCases),
            Self::TestData => Some(StageName::TestData),
            Self::Coverage | Self::TabularExport => None,
        }
    }
}

/// Story / test priority. Anything the model emits that is not one of the
/// three known levels is kept as `Unknown` rather than guessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "serde_json::Value")]
pub enum Priority {
    High,
    Medium,
    Low,
    #[default]
    Unknown,
}

impl Priority {
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "high" | "h" | "p1" | "critical" => Self::High,
            "medium" | "med" | "m" | "p2" | "normal" => Self::Medium,
            "low" | "l" | "p3" => Self::Low,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
            Self::Unknown => "Unknown",
        }
    }
}

impl From<serde_json::Value> for Priority {
    fn from(value: serde_json::Value) -> Self {
        value
            .as_str()
            .map(Priority::parse_lenient)
            .unwrap_or_default()
    }
}

/// Test case classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "serde_json::Value")]
pub enum TestType {
    Functional,
    #[serde(rename = "Non-functional")]
    NonFunctional,
    #[default]
    Unknown,
}

impl TestType {
    pub fn parse_lenient(raw: &str) -> Self {
        let folded: String = raw
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        match folded.as_str() {
            "functional" => Self::Functional,
            "nonfunctional" | "nfr" => Self::NonFunctional,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Functional => "Functional",
            Self::NonFunctional => "Non-functional",
            Self::Unknown => "Unknown",
        }
    }
}

impl From<serde_json::Value> for TestType {
    fn from(value: serde_json::Value) -> Self {
        value
            .as_str()
            .map(TestType::parse_lenient)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn stage_names_match_artifact_keys() {
        for stage in StageName::ALL {
            assert_eq!(stage.as_str(), stage.artifact_kind().as_str());
            assert_eq!(stage.artifact_kind().stage(), Some(stage));
        }
        assert_eq!(ArtifactKind::Coverage.stage(), None);
    }

    #[test]
    fn stage_round_trips_through_str() {
        assert_eq!(StageName::from_str("user_stories").unwrap(), StageName::UserStories);
        assert!(StageName::from_str("selenium").is_err());
        assert_eq!(
            serde_json::to_string(&ArtifactKind::TabularExport).unwrap(),
            "\"tabular_export\""
        );
    }

    #[test]
    fn predecessors_nearest_first() {
        let prev = StageName::TestCases.predecessors();
        assert_eq!(prev, vec![StageName::UserStories, StageName::Analysis]);
        assert!(StageName::Analysis.predecessors().is_empty());
    }

    #[test]
    fn priority_is_lenient_and_explicit_about_unknown() {
        assert_eq!(Priority::parse_lenient(" HIGH "), Priority::High);
        assert_eq!(Priority::parse_lenient("medium"), Priority::Medium);
        assert_eq!(Priority::parse_lenient("whenever"), Priority::Unknown);
        let p: Priority = serde_json::from_str("42").unwrap();
        assert_eq!(p, Priority::Unknown);
        assert_eq!(serde_json::to_string(&Priority::Low).unwrap(), "\"Low\"");
    }

    #[test]
    fn test_type_folds_spelling_variants() {
        assert_eq!(TestType::parse_lenient("Non-functional"), TestType::NonFunctional);
        assert_eq!(TestType::parse_lenient("non_functional"), TestType::NonFunctional);
        assert_eq!(TestType::parse_lenient("functional"), TestType::Functional);
        assert_eq!(TestType::parse_lenient("exploratory"), TestType::Unknown);
        assert_eq!(
            serde_json::to_string(&TestType::NonFunctional).unwrap(),
            "\"Non-functional\""
        );
    }
}
