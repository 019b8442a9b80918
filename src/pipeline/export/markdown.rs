use crate::models::UserStoryCollection;

/// Readable rendering of the user story collection.
pub fn render_user_stories(document_name: &str, stories: &UserStoryCollection) -> String {
    let mut out = format!("# User Stories: {document_name}\n");

    if let Some(summary) = stories.summary.as_deref().filter(|s| !s.trim().is_empty()) {
        out.push_str(&format!("\n{}\n", summary.trim()));
    }

    if stories.is_empty() {
        out.push_str("\n_No user stories were generated._\n");
        return out;
    }

    for story in &stories.user_stories {
        out.push_str(&format!("\n## {}: {}\n\n", story.id, story.title));
        out.push_str(&format!("**Priority:** {}\n\n", story.priority.as_str()));
        if !story.narrative.is_empty() {
            out.push_str(&format!("{}\n\n", story.narrative));
        }
        if !story.acceptance_criteria.is_empty() {
            out.push_str("**Acceptance Criteria:**\n\n");
            for criterion in &story.acceptance_criteria {
                out.push_str(&format!("- {criterion}\n"));
            }
        }
    }

    out
}
