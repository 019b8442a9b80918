use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::lenient::{list_field, string_field};

/// Output of the analysis stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequirementsAnalysis {
    pub summary: String,
    pub functional_requirements: Vec<String>,
    pub key_features: Vec<String>,
    pub business_objectives: Vec<String>,
    pub non_functional_requirements: Vec<String>,
    pub dependencies: Vec<String>,
    pub constraints: Vec<String>,
}

impl RequirementsAnalysis {
    pub fn from_json_object(obj: &Map<String, Value>) -> Self {
        Self {
            summary: string_field(obj, &["summary", "analysis", "overview"]),
            functional_requirements: list_field(obj, &["functional_requirements"]),
            key_features: list_field(obj, &["key_features", "features"]),
            business_objectives: list_field(obj, &["business_objectives", "objectives"]),
            non_functional_requirements: list_field(obj, &["non_functional_requirements"]),
            dependencies: list_field(obj, &["dependencies"]),
            constraints: list_field(obj, &["constraints"]),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.summary.trim().is_empty() && self.list_fields().iter().all(|(_, l)| l.is_empty())
    }

    /// Named list fields in declaration order.
    pub fn list_fields(&self) -> [(&'static str, &Vec<String>); 6] {
        [
            ("functional_requirements", &self.functional_requirements),
            ("key_features", &self.key_features),
            ("business_objectives", &self.business_objectives),
            ("non_functional_requirements", &self.non_functional_requirements),
            ("dependencies", &self.dependencies),
            ("constraints", &self.constraints),
        ]
    }

    /// Recover an analysis from prose laid out as `Key: value` lines.
    ///
    /// Recognises `Summary: ...` and list headings (`Functional requirements:`)
    /// followed by `-`, `*` or numbered bullets. Returns `None` if no known
    /// heading is found.
    pub fn from_key_value_lines(raw: &str) -> Option<Self> {
        let mut analysis = Self::default();
        let mut current: Option<Section> = None;
        let mut matched = false;

        for line in raw.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            if let Some(item) = strip_bullet(trimmed) {
                if let Some(section) = current {
                    if section == Section::Summary {
                        append_sentence(&mut analysis.summary, item);
                    } else {
                        analysis.list_mut(section).push(item.to_string());
                    }
                    continue;
                }
            }

            if let Some((key, value)) = trimmed.split_once(':') {
                if let Some(section) = Section::from_heading(key) {
                    matched = true;
                    current = Some(section);
                    let value = value.trim();
                    if !value.is_empty() {
                        match section {
                            Section::Summary => append_sentence(&mut analysis.summary, value),
                            _ => analysis.list_mut(section).extend(
                                value
                                    .split(';')
                                    .map(str::trim)
                                    .filter(|s| !s.is_empty())
                                    .map(String::from),
                            ),
                        }
                    }
                    continue;
                }
            }

            if current == Some(Section::Summary) {
                append_sentence(&mut analysis.summary, trimmed);
            }
        }

        matched.then_some(analysis)
    }

    fn list_mut(&mut self, section: Section) -> &mut Vec<String> {
        match section {
            Section::Functional => &mut self.functional_requirements,
            Section::Features => &mut self.key_features,
            Section::Objectives => &mut self.business_objectives,
            Section::NonFunctional => &mut self.non_functional_requirements,
            Section::Dependencies => &mut self.dependencies,
            Section::Constraints => &mut self.constraints,
            // Summary is handled by the caller
            Section::Summary => &mut self.key_features,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Summary,
    Functional,
    Features,
    Objectives,
    NonFunctional,
    Dependencies,
    Constraints,
}

impl Section {
    fn from_heading(key: &str) -> Option<Self> {
        let folded: String = key
            .trim()
            .trim_start_matches(|c: char| c == '#' || c == '*' || c.is_ascii_digit() || c == '.')
            .trim_end_matches('*')
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .collect();
        match folded.as_str() {
            "summary" | "overview" => Some(Self::Summary),
            "functionalrequirements" => Some(Self::Functional),
            "keyfeatures" | "features" => Some(Self::Features),
            "businessobjectives" | "objectives" => Some(Self::Objectives),
            "nonfunctionalrequirements" => Some(Self::NonFunctional),
            "dependencies" => Some(Self::Dependencies),
            "constraints" => Some(Self::Constraints),
            _ => None,
        }
    }
}

fn strip_bullet(line: &str) -> Option<&str> {
    if let Some(rest) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
        return Some(rest.trim());
    }
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(rest) = rest.strip_prefix(". ").or_else(|| rest.strip_prefix(") ")) {
            return Some(rest.trim());
        }
    }
    None
}

fn append_sentence(target: &mut String, text: &str) {
    if !target.is_empty() {
        target.push(' ');
    }
    target.push_str(text);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_object_with_missing_lists() {
        let value = json!({
            "summary": "Online store",
            "functional_requirements": ["Browse catalog", "Checkout"],
            "dependencies": "Payment gateway"
        });
        let analysis = RequirementsAnalysis::from_json_object(value.as_object().unwrap());
        assert_eq!(analysis.summary, "Online store");
        assert_eq!(analysis.functional_requirements.len(), 2);
        assert_eq!(analysis.dependencies, vec!["Payment gateway"]);
        assert!(analysis.constraints.is_empty());
        assert!(!analysis.is_empty());
    }

    #[test]
    fn key_value_scan_reads_headings_and_bullets() {
        let raw = "Summary: A storefront for books.\n\
                   It ships worldwide.\n\
                   Functional requirements:\n\
                   - Search by title\n\
                   2. Pay by card\n\
                   Constraints: GDPR; budget";
        let analysis = RequirementsAnalysis::from_key_value_lines(raw).unwrap();
        assert_eq!(analysis.summary, "A storefront for books. It ships worldwide.");
        assert_eq!(analysis.functional_requirements, vec!["Search by title", "Pay by card"]);
        assert_eq!(analysis.constraints, vec!["GDPR", "budget"]);
    }

    #[test]
    fn key_value_scan_rejects_plain_prose() {
        assert!(RequirementsAnalysis::from_key_value_lines("I cannot access the document.").is_none());
        assert!(RequirementsAnalysis::from_key_value_lines("Note: nothing here").is_none());
    }

    #[test]
    fn markdown_headings_are_recognised() {
        let raw = "## Key Features:\n* Wishlist\n**Dependencies**: Stripe";
        let analysis = RequirementsAnalysis::from_key_value_lines(raw).unwrap();
        assert_eq!(analysis.key_features, vec!["Wishlist"]);
        assert_eq!(analysis.dependencies, vec!["Stripe"]);
    }
}
