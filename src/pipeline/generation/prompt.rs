use crate::models::{SourceDocument, StageName};

/// Text passed forward from an earlier stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorContext {
    pub stage: StageName,
    pub text: String,
}

/// System prompt for a stage. Every prompt names the agent title so a
/// response can be traced back to the stage that asked for it.
pub fn system_prompt(stage: StageName) -> String {
    let task = match stage {
        StageName::Analysis => {
            "Analyse the requirements document and extract what a test team needs to know."
        }
        StageName::UserStories => {
            "Write user stories with clear acceptance criteria for the requirements provided."
        }
        StageName::TestCases => {
            "Design test cases covering the user stories and requirements provided."
        }
        StageName::TestData => {
            "Produce concrete test data sets for the test cases provided, one record per data set."
        }
    };
    format!(
        "You are a {title} in a software testing team. {task}\n\
         Respond with a single JSON object only, no commentary, matching this shape:\n{shape}",
        title = stage.title(),
        shape = response_shape(stage),
    )
}

fn response_shape(stage: StageName) -> &'static str {
    match stage {
        StageName::Analysis => {
            r#"{"summary": "...", "functional_requirements": ["..."], "key_features": ["..."], "business_objectives": ["..."], "non_functional_requirements": ["..."], "dependencies": ["..."], "constraints": ["..."]}"#
        }
        StageName::UserStories => {
            r#"{"user_stories": [{"id": "US-001", "title": "...", "user_story": "As a ... I want ... so that ...", "acceptance_criteria": ["..."], "priority": "High|Medium|Low"}], "summary": "..."}"#
        }
        StageName::TestCases => {
            r#"{"test_cases": [{"id": "TC-001", "title": "...", "description": "...", "preconditions": ["..."], "test_steps": ["..."], "expected_result": "...", "priority": "High|Medium|Low", "type": "Functional|Non-functional", "user_story_id": "US-001"}], "summary": "..."}"#
        }
        StageName::TestData => {
            r#"{"test_data": [{"id": "TD-001", "test_case_id": "TC-001", "data_set_name": "...", "description": "...", "<field name>": "<value>"}], "summary": "..."}"#
        }
    }
}

/// Build the user prompt: the source text, then the nearest earlier output.
pub fn build_stage_prompt(
    stage: StageName,
    document: &SourceDocument,
    prior: Option<&PriorContext>,
) -> String {
    let mut prompt = format!(
        "=== SOURCE DOCUMENT: {} ===\n{}\n",
        document.file_name,
        document.content.trim_end()
    );

    if let Some(prior) = prior {
        prompt.push_str(&format!(
            "\n=== {} OUTPUT ({}) ===\n{}\n",
            prior.stage.title().to_uppercase(),
            prior.stage.as_str(),
            prior.text.trim_end()
        ));
    }

    prompt.push_str(&format!("\nTask: act as the {} and answer in JSON.", stage.title()));
    prompt
}

/// Which stage a system prompt was built for.
pub fn stage_for_system_prompt(system: &str) -> Option<StageName> {
    StageName::ALL
        .into_iter()
        .find(|s| system.contains(&format!("You are a {} ", s.title())))
}
