use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::enums::{Priority, TestType};
use super::lenient::{list_field, normalize_ids, object_items, optional_string_field, string_field};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestCase {
    pub id: String,
    pub title: String,
    pub description: String,
    pub preconditions: Vec<String>,
    pub steps: Vec<String>,
    pub expected_result: String,
    pub priority: Priority,
    #[serde(rename = "type")]
    pub test_type: TestType,
    /// Soft reference; not checked against the story collection.
    pub user_story_id: Option<String>,
}

impl TestCase {
    pub fn from_json_object(obj: &Map<String, Value>) -> Self {
        Self {
            id: string_field(obj, &["id", "test_case_id"]),
            title: string_field(obj, &["title", "test_case_name", "name"]),
            description: string_field(obj, &["description"]),
            preconditions: list_field(obj, &["preconditions", "precondition"]),
            steps: list_field(obj, &["steps", "test_steps"]),
            expected_result: list_field(obj, &["expected_result", "expected_results"]).join("\n"),
            priority: obj
                .get("priority")
                .and_then(Value::as_str)
                .map(Priority::parse_lenient)
                .unwrap_or_default(),
            test_type: obj
                .get("type")
                .or_else(|| obj.get("test_type"))
                .and_then(Value::as_str)
                .map(TestType::parse_lenient)
                .unwrap_or_default(),
            user_story_id: optional_string_field(obj, &["user_story_id", "story_id"]),
        }
    }
}

/// Output of the test case stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestCaseCollection {
    pub test_cases: Vec<TestCase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl TestCaseCollection {
    pub fn from_json_object(obj: &Map<String, Value>) -> Self {
        let mut test_cases: Vec<TestCase> = object_items(obj, "test_cases")
            .into_iter()
            .map(TestCase::from_json_object)
            .collect();
        normalize_ids(&mut test_cases, "TC", |tc| &mut tc.id);

        Self {
            test_cases,
            summary: optional_string_field(obj, &["summary"]),
        }
    }

    pub fn len(&self) -> usize {
        self.test_cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.test_cases.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_aliases() {
        let value = json!({
            "test_cases": [{
                "id": "TC-001",
                "test_case_name": "Valid login",
                "test_steps": ["Open page", "Submit form"],
                "expected_results": "Dashboard shown",
                "preconditions": {"user": "registered"},
                "type": "Non-Functional",
                "priority": "LOW",
                "user_story_id": "US-001"
            }]
        });
        let coll = TestCaseCollection::from_json_object(value.as_object().unwrap());
        let tc = &coll.test_cases[0];
        assert_eq!(tc.title, "Valid login");
        assert_eq!(tc.steps, vec!["Open page", "Submit form"]);
        assert_eq!(tc.expected_result, "Dashboard shown");
        assert_eq!(tc.preconditions, vec!["user: registered"]);
        assert_eq!(tc.test_type, TestType::NonFunctional);
        assert_eq!(tc.priority, Priority::Low);
        assert_eq!(tc.user_story_id.as_deref(), Some("US-001"));
    }

    #[test]
    fn missing_classification_is_unknown() {
        let value = json!({"test_cases": [{"title": "Untyped"}, {"id": 5}]});
        let coll = TestCaseCollection::from_json_object(value.as_object().unwrap());
        assert_eq!(coll.test_cases[0].id, "TC-001");
        assert_eq!(coll.test_cases[0].test_type, TestType::Unknown);
        assert_eq!(coll.test_cases[0].priority, Priority::Unknown);
        assert_eq!(coll.test_cases[1].id, "5");
        assert_eq!(coll.test_cases[1].user_story_id, None);
    }

    #[test]
    fn test_type_serializes_as_type() {
        let tc = TestCase {
            test_type: TestType::Functional,
            ..Default::default()
        };
        let v = serde_json::to_value(&tc).unwrap();
        assert_eq!(v["type"], "Functional");
    }
}
