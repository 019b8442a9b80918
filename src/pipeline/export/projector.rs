//! Flat table projection of test cases and test data.
//!
//! Test data records carry whatever fields the model chose, in one of two
//! layouts (see [`DomainFields`]). The projector merges the field names of
//! every record into one sorted schema, so the header depends only on the
//! set of names present and never on record order.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::models::{DomainFields, TestCase, TestCaseCollection, TestDataCollection, TestDataRecord};

pub const TEST_CASES_TABLE: &str = "Test Cases";
pub const TEST_DATA_TABLE: &str = "Test Data";

pub const TEST_CASE_HEADERS: [&str; 9] = [
    "Test Case ID",
    "Test Case Name",
    "Description",
    "Preconditions",
    "Test Steps",
    "Expected Result",
    "Priority",
    "Test Type",
    "User Story ID",
];

pub const TEST_DATA_RESERVED_HEADERS: [&str; 4] =
    ["Test Data ID", "Test Case ID", "Data Set Name", "Description"];

/// Single column used when no record has named domain fields.
pub const FALLBACK_COLUMN: &str = "Test Data Values";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Both export tables for one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabularExport {
    pub document_id: Uuid,
    pub test_cases: Table,
    pub test_data: Table,
}

impl TabularExport {
    pub fn tables(&self) -> [&Table; 2] {
        [&self.test_cases, &self.test_data]
    }
}

pub fn build_tabular_export(
    document_id: Uuid,
    test_cases: &TestCaseCollection,
    test_data: &TestDataCollection,
) -> TabularExport {
    TabularExport {
        document_id,
        test_cases: project_test_cases(&test_cases.test_cases),
        test_data: project_test_data(&test_data.test_data),
    }
}

pub fn project_test_cases(cases: &[TestCase]) -> Table {
    let rows = cases
        .iter()
        .map(|tc| {
            let steps = tc
                .steps
                .iter()
                .enumerate()
                .map(|(i, step)| format!("{}. {step}", i + 1))
                .collect::<Vec<_>>()
                .join("\n");
            vec![
                tc.id.clone(),
                tc.title.clone(),
                tc.description.clone(),
                tc.preconditions.join("\n"),
                steps,
                tc.expected_result.clone(),
                tc.priority.as_str().to_string(),
                tc.test_type.as_str().to_string(),
                tc.user_story_id.clone().unwrap_or_default(),
            ]
        })
        .collect();

    Table {
        name: TEST_CASES_TABLE.to_string(),
        headers: TEST_CASE_HEADERS.iter().map(|h| h.to_string()).collect(),
        rows,
    }
}

pub fn project_test_data(records: &[TestDataRecord]) -> Table {
    let schema: BTreeSet<&str> = records
        .iter()
        .filter_map(|r| r.fields.named())
        .flat_map(|fields| fields.keys().map(String::as_str))
        .collect();

    let mut headers: Vec<String> = TEST_DATA_RESERVED_HEADERS.iter().map(|h| h.to_string()).collect();
    if schema.is_empty() {
        headers.push(FALLBACK_COLUMN.to_string());
    } else {
        headers.extend(schema.iter().map(|name| name.to_string()));
    }

    let rows = records
        .iter()
        .map(|record| {
            let mut row = vec![
                record.id.clone(),
                record.test_case_id.clone().unwrap_or_default(),
                record.label.clone(),
                record.description.clone(),
            ];
            if schema.is_empty() {
                row.push(fallback_text(&record.fields));
            } else {
                row.extend(
                    schema
                        .iter()
                        .map(|name| record.fields.get(name).map(cell_text).unwrap_or_default()),
                );
            }
            row
        })
        .collect();

    Table {
        name: TEST_DATA_TABLE.to_string(),
        headers,
        rows,
    }
}

/// Scalars are stringified; maps and lists become compact JSON.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}

fn fallback_text(fields: &DomainFields) -> String {
    match fields {
        DomainFields::Unstructured(Value::Array(items)) => {
            items.iter().map(cell_text).collect::<Vec<_>>().join("\n")
        }
        DomainFields::Unstructured(value) => cell_text(value),
        DomainFields::Flat(_) | DomainFields::Nested(_) | DomainFields::Empty => String::new(),
    }
}
