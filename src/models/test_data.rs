use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::lenient::{normalize_ids, object_items, optional_string_field, string_field};

/// Top-level keys that are record metadata, never domain fields.
pub const RESERVED_FIELDS: [&str; 8] = [
    "id",
    "test_data_id",
    "test_case_id",
    "data_set_name",
    "name",
    "description",
    "data",
    "data_values",
];

/// Sub-fields that hold domain values in the nested layout, in lookup order.
const NESTED_KEYS: [&str; 2] = ["data_values", "data"];

pub fn is_reserved(key: &str) -> bool {
    RESERVED_FIELDS.contains(&key)
}

/// An empty sub-field gives way to the next one in lookup order.
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::String(s) => s.trim().is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Domain values of one test data record, classified once at ingestion.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum DomainFields {
    /// Domain fields sit next to the metadata at the top level.
    Flat(Map<String, Value>),
    /// Domain fields live inside the `data_values` / `data` map.
    Nested(Map<String, Value>),
    /// The data sub-field holds a list or scalar with no field names.
    Unstructured(Value),
    #[default]
    Empty,
}

impl DomainFields {
    /// Flat wins if any top-level key is outside the reserved set; otherwise
    /// the first present data sub-field decides.
    pub fn classify(obj: &Map<String, Value>) -> Self {
        let flat: Map<String, Value> = obj
            .iter()
            .filter(|(k, _)| !is_reserved(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if !flat.is_empty() {
            return Self::Flat(flat);
        }

        match NESTED_KEYS.iter().find_map(|k| obj.get(*k).filter(|v| !is_blank(v))) {
            Some(Value::Object(map)) => Self::Nested(map.clone()),
            Some(other) => Self::Unstructured(other.clone()),
            None => Self::Empty,
        }
    }

    /// Named fields, whichever layout carried them.
    pub fn named(&self) -> Option<&Map<String, Value>> {
        match self {
            Self::Flat(map) | Self::Nested(map) => Some(map),
            Self::Unstructured(_) | Self::Empty => None,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.named().and_then(|m| m.get(name))
    }
}

/// One generated test data set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestDataRecord {
    pub id: String,
    /// Soft reference to a test case id.
    pub test_case_id: Option<String>,
    pub label: String,
    pub description: String,
    pub fields: DomainFields,
}

impl TestDataRecord {
    pub fn from_json_object(obj: &Map<String, Value>) -> Self {
        Self {
            id: string_field(obj, &["id", "test_data_id"]),
            test_case_id: optional_string_field(obj, &["test_case_id"]),
            label: string_field(obj, &["data_set_name", "name"]),
            description: string_field(obj, &["description"]),
            fields: DomainFields::classify(obj),
        }
    }
}

impl Serialize for TestDataRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("id", &self.id)?;
        map.serialize_entry("test_case_id", &self.test_case_id)?;
        map.serialize_entry("data_set_name", &self.label)?;
        map.serialize_entry("description", &self.description)?;
        match &self.fields {
            DomainFields::Flat(fields) => {
                for (k, v) in fields {
                    map.serialize_entry(k, v)?;
                }
            }
            DomainFields::Nested(fields) => map.serialize_entry("data", fields)?,
            DomainFields::Unstructured(value) => map.serialize_entry("data", value)?,
            DomainFields::Empty => {}
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for TestDataRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        value
            .as_object()
            .map(TestDataRecord::from_json_object)
            .ok_or_else(|| de::Error::custom("test data record must be an object"))
    }
}

/// Output of the test data stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestDataCollection {
    pub test_data: Vec<TestDataRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl TestDataCollection {
    pub fn from_json_object(obj: &Map<String, Value>) -> Self {
        let mut test_data: Vec<TestDataRecord> = object_items(obj, "test_data")
            .into_iter()
            .map(TestDataRecord::from_json_object)
            .collect();
        normalize_ids(&mut test_data, "TD", |r| &mut r.id);

        Self {
            test_data,
            summary: optional_string_field(obj, &["summary"]),
        }
    }

    pub fn len(&self) -> usize {
        self.test_data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.test_data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn top_level_domain_key_means_flat() {
        let fields = DomainFields::classify(&obj(json!({
            "id": "TD-001", "Price": 10, "data": {"Ignored": 1}
        })));
        assert!(matches!(fields, DomainFields::Flat(_)));
        assert_eq!(fields.get("Price"), Some(&json!(10)));
        assert_eq!(fields.get("Ignored"), None);
    }

    #[test]
    fn data_values_preferred_over_data() {
        let fields = DomainFields::classify(&obj(json!({
            "id": "TD-001", "data_values": {"Qty": 2}, "data": {"Price": 1}
        })));
        assert_eq!(fields, DomainFields::Nested(obj(json!({"Qty": 2}))));
    }

    #[test]
    fn empty_data_values_falls_through_to_data() {
        let fields = DomainFields::classify(&obj(json!({
            "id": "TD-001", "data_values": {}, "data": {"Price": 1}
        })));
        assert_eq!(fields, DomainFields::Nested(obj(json!({"Price": 1}))));

        let fields = DomainFields::classify(&obj(json!({
            "id": "TD-002", "data_values": [], "data": {"Qty": 3}
        })));
        assert_eq!(fields.get("Qty"), Some(&json!(3)));

        let both_empty = DomainFields::classify(&obj(json!({"id": "TD-003", "data_values": {}, "data": {}})));
        assert_eq!(both_empty, DomainFields::Empty);
    }

    #[test]
    fn non_map_data_is_unstructured() {
        let fields = DomainFields::classify(&obj(json!({"id": "TD-001", "data": ["a", "b"]})));
        assert_eq!(fields, DomainFields::Unstructured(json!(["a", "b"])));
        let empty = DomainFields::classify(&obj(json!({"id": "TD-001", "name": "x"})));
        assert_eq!(empty, DomainFields::Empty);
    }

    #[test]
    fn record_reads_reserved_aliases() {
        let record = TestDataRecord::from_json_object(&obj(json!({
            "test_data_id": "TD-9", "test_case_id": "TC-1", "name": "Boundary", "Email": "a@b.c"
        })));
        assert_eq!(record.id, "TD-9");
        assert_eq!(record.test_case_id.as_deref(), Some("TC-1"));
        assert_eq!(record.label, "Boundary");
        assert!(matches!(record.fields, DomainFields::Flat(_)));
    }

    #[test]
    fn serialization_keeps_layout_on_reload() {
        let flat = TestDataRecord::from_json_object(&obj(json!({"id": "TD-1", "Price": 5})));
        let nested = TestDataRecord::from_json_object(&obj(json!({"id": "TD-2", "data": {"Price": 6}})));

        let flat_v = serde_json::to_value(&flat).unwrap();
        assert_eq!(flat_v["Price"], 5);
        let nested_v = serde_json::to_value(&nested).unwrap();
        assert_eq!(nested_v["data"]["Price"], 6);

        let reloaded: TestDataRecord = serde_json::from_value(nested_v).unwrap();
        assert_eq!(reloaded, nested);
        let reloaded: TestDataRecord = serde_json::from_value(flat_v).unwrap();
        assert_eq!(reloaded, flat);
    }

    #[test]
    fn collection_synthesizes_ids() {
        let coll = TestDataCollection::from_json_object(&obj(json!({
            "test_data": [{"Price": 1}, {"id": "TD-001", "Price": 2}, 7]
        })));
        assert_eq!(coll.len(), 2);
        assert_eq!(coll.test_data[0].id, "TD-001");
        assert_eq!(coll.test_data[1].id, "TD-001-2");
    }
}
