//! Forgiving accessors for model-generated JSON.
//!
//! Generated records drift: ids arrive as numbers, lists arrive as a single
//! string, the same field shows up under two names. These helpers read what
//! is there and never fail.

use std::collections::HashSet;

use serde_json::{Map, Value};

/// Stringify a scalar. `null` is absent; objects and arrays become compact JSON.
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(_) | Value::Object(_) => serde_json::to_string(value).ok(),
    }
}

/// First non-empty value among `keys`, stringified.
pub fn string_field(obj: &Map<String, Value>, keys: &[&str]) -> String {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .filter_map(scalar_to_string)
        .find(|s| !s.trim().is_empty())
        .unwrap_or_default()
}

/// Optional variant of [`string_field`].
pub fn optional_string_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    let s = string_field(obj, keys);
    (!s.is_empty()).then_some(s)
}

/// Read a list of strings.
///
/// Arrays yield one entry per non-null item, a bare string yields a single
/// entry, a map yields `key: value` lines.
pub fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        None | Some(Value::Null) => vec![],
        Some(Value::Array(items)) => items.iter().filter_map(scalar_to_string).collect(),
        Some(Value::String(s)) if s.trim().is_empty() => vec![],
        Some(Value::Object(map)) => map
            .iter()
            .map(|(k, v)| format!("{k}: {}", scalar_to_string(v).unwrap_or_default()))
            .collect(),
        Some(other) => scalar_to_string(other).into_iter().collect(),
    }
}

/// First present list among `keys`.
pub fn list_field(obj: &Map<String, Value>, keys: &[&str]) -> Vec<String> {
    keys.iter()
        .find_map(|k| obj.get(*k).filter(|v| !v.is_null()))
        .map(|v| string_list(Some(v)))
        .unwrap_or_default()
}

/// Object items of an array field; non-object items are skipped.
pub fn object_items<'a>(obj: &'a Map<String, Value>, key: &str) -> Vec<&'a Map<String, Value>> {
    match obj.get(key) {
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_object).collect(),
        _ => vec![],
    }
}

/// Give every record a unique id within its collection.
///
/// Missing ids become `{prefix}-{position:03}`; repeated ids get a `-2`, `-3`
/// suffix in order of appearance.
pub fn normalize_ids<T, F>(items: &mut [T], prefix: &str, mut id_of: F)
where
    F: FnMut(&mut T) -> &mut String,
{
    let mut seen: HashSet<String> = HashSet::with_capacity(items.len());
    for (idx, item) in items.iter_mut().enumerate() {
        let id = id_of(item);
        if id.trim().is_empty() {
            *id = format!("{prefix}-{:03}", idx + 1);
        } else {
            *id = id.trim().to_string();
        }

        if seen.contains(id.as_str()) {
            let base = id.clone();
            let mut n = 2;
            while seen.contains(&format!("{base}-{n}")) {
                n += 1;
            }
            tracing::debug!(id = %base, suffix = n, "Duplicate record id disambiguated");
            *id = format!("{base}-{n}");
        }
        seen.insert(id.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalars_stringify_directly() {
        assert_eq!(scalar_to_string(&json!("x")).as_deref(), Some("x"));
        assert_eq!(scalar_to_string(&json!(99.99)).as_deref(), Some("99.99"));
        assert_eq!(scalar_to_string(&json!(true)).as_deref(), Some("true"));
        assert_eq!(scalar_to_string(&json!(null)), None);
        assert_eq!(
            scalar_to_string(&json!({"b": 1, "a": [2]})).as_deref(),
            Some(r#"{"a":[2],"b":1}"#)
        );
    }

    #[test]
    fn string_list_accepts_shapes() {
        assert_eq!(string_list(Some(&json!(["a", null, 3]))), vec!["a", "3"]);
        assert_eq!(string_list(Some(&json!("only one"))), vec!["only one"]);
        assert_eq!(string_list(Some(&json!({"user": "logged in"}))), vec!["user: logged in"]);
        assert!(string_list(Some(&json!(""))).is_empty());
        assert!(string_list(None).is_empty());
    }

    #[test]
    fn string_field_prefers_first_non_empty_key() {
        let obj = json!({"test_case_name": "", "title": "Login", "id": 7});
        let obj = obj.as_object().unwrap();
        assert_eq!(string_field(obj, &["test_case_name", "title"]), "Login");
        assert_eq!(string_field(obj, &["id"]), "7");
        assert_eq!(optional_string_field(obj, &["missing"]), None);
    }

    #[test]
    fn normalize_fills_and_disambiguates() {
        let mut ids = vec![
            String::new(),
            "US-001".to_string(),
            " US-009 ".to_string(),
            "US-001".to_string(),
        ];
        normalize_ids(&mut ids, "US", |s| s);
        assert_eq!(ids, vec!["US-001", "US-001-2", "US-009", "US-001-3"]);
    }
}
