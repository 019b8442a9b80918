use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::enums::Priority;
use super::lenient::{list_field, normalize_ids, object_items, optional_string_field, string_field};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserStory {
    pub id: String,
    pub title: String,
    pub narrative: String,
    pub acceptance_criteria: Vec<String>,
    pub priority: Priority,
}

impl UserStory {
    pub fn from_json_object(obj: &Map<String, Value>) -> Self {
        Self {
            id: string_field(obj, &["id", "story_id", "user_story_id"]),
            title: string_field(obj, &["title", "name"]),
            narrative: string_field(obj, &["narrative", "user_story", "story", "description"]),
            acceptance_criteria: list_field(obj, &["acceptance_criteria", "criteria"]),
            priority: obj
                .get("priority")
                .and_then(Value::as_str)
                .map(Priority::parse_lenient)
                .unwrap_or_default(),
        }
    }
}

/// Output of the user story stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserStoryCollection {
    pub user_stories: Vec<UserStory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl UserStoryCollection {
    pub fn from_json_object(obj: &Map<String, Value>) -> Self {
        let mut user_stories: Vec<UserStory> = object_items(obj, "user_stories")
            .into_iter()
            .map(UserStory::from_json_object)
            .collect();
        normalize_ids(&mut user_stories, "US", |s| &mut s.id);

        Self {
            user_stories,
            summary: optional_string_field(obj, &["summary"]),
        }
    }

    pub fn len(&self) -> usize {
        self.user_stories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.user_stories.is_empty()
    }
}
