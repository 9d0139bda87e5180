//! Data-driven test cases.
//!
//! A test-data file has three optional sections:
//!
//! ```json
//! {
//!   "common": {"timeout": 10},
//!   "environments": {"default": {"base_url": "https://example.com"}},
//!   "test_cases": {"valid_login": {"username": "alice", "password": "secret"}}
//! }
//! ```
//!
//! Records are layered `common` → environment → case, later layers winning
//! on key collisions.

mod loader;
mod store;

pub use loader::{TestDataLoader, DEFAULT_DATA_DIR, TEST_ENV};
pub use store::DataStore;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A flat key/value record
pub type Record = Map<String, Value>;

/// One parsed test-data file
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TestData {
    /// Shared key/value pairs
    #[serde(default)]
    pub common: Record,
    /// Environment name to overrides
    #[serde(default)]
    pub environments: BTreeMap<String, Record>,
    /// Cases in file order
    #[serde(default, deserialize_with = "ordered_cases")]
    pub test_cases: Vec<(String, Record)>,
}

impl TestData {
    /// Raw record of a case
    #[must_use]
    pub fn case(&self, name: &str) -> Option<&Record> {
        self.test_cases
            .iter()
            .find(|(case, _)| case == name)
            .map(|(_, record)| record)
    }

    /// Whether a case exists
    #[must_use]
    pub fn has_case(&self, name: &str) -> bool {
        self.case(name).is_some()
    }

    /// Case names in file order
    #[must_use]
    pub fn case_names(&self) -> Vec<&str> {
        self.test_cases.iter().map(|(name, _)| name.as_str()).collect()
    }
}

fn ordered_cases<'de, D>(deserializer: D) -> Result<Vec<(String, Record)>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Record>::deserialize(deserializer)?.unwrap_or_default();
    raw.into_iter()
        .map(|(name, value)| match value {
            Value::Object(record) => Ok((name, record)),
            other => Err(de::Error::custom(format!(
                "test case `{name}` must be an object, found {}",
                json_type(&other)
            ))),
        })
        .collect()
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// A resolved test case: its name and its layered record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestCase {
    /// Originating case name
    pub name: String,
    /// Layered data
    pub data: Record,
}

impl TestCase {
    /// Value of a key
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// String value of a key, empty when missing or not a string
    #[must_use]
    pub fn str(&self, key: &str) -> &str {
        self.data.get(key).and_then(Value::as_str).unwrap_or("")
    }

    /// Whether the key is present
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }
}

/// Read a key as `case["username"]`.
///
/// # Panics
///
/// Panics when the key is missing; use [`TestCase::get`] or
/// [`TestCase::str`] when the key is optional.
impl std::ops::Index<&str> for TestCase {
    type Output = Value;

    fn index(&self, key: &str) -> &Value {
        match self.data.get(key) {
            Some(value) => value,
            None => panic!("test case `{}` has no key `{key}`", self.name),
        }
    }
}

/// Shallow merge: keys of `overlay` replace keys of `base`.
#[must_use]
pub fn merge_records(base: &Record, overlay: &Record) -> Record {
    let mut merged = base.clone();
    merged.extend(overlay.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    mod document_tests {
        use super::*;

        #[test]
        fn test_sections_default_to_empty() {
            let data: TestData = serde_json::from_str("{}").unwrap();
            assert!(data.common.is_empty());
            assert!(data.environments.is_empty());
            assert!(data.test_cases.is_empty());
        }

        #[test]
        fn test_case_order_follows_file() {
            let data: TestData = serde_json::from_str(
                r#"{"test_cases": {"zeta": {}, "alpha": {}, "mid": {}}}"#,
            )
            .unwrap();
            assert_eq!(data.case_names(), vec!["zeta", "alpha", "mid"]);
        }

        #[test]
        fn test_non_object_case_rejected() {
            let err = serde_json::from_str::<TestData>(r#"{"test_cases": {"bad": 3}}"#)
                .unwrap_err();
            assert!(err.to_string().contains("test case `bad` must be an object"));
        }

        #[test]
        fn test_null_cases_section() {
            let data: TestData = serde_json::from_str(r#"{"test_cases": null}"#).unwrap();
            assert!(data.test_cases.is_empty());
        }
    }

    mod test_case_tests {
        use super::*;

        #[test]
        fn test_accessors() {
            let case = TestCase {
                name: "valid_login".to_string(),
                data: record(json!({"username": "alice", "retries": 2})),
            };
            assert_eq!(case.str("username"), "alice");
            assert_eq!(case.str("retries"), "");
            assert_eq!(case["retries"], 2);
            assert!(case.contains("username"));
            assert!(case.get("missing").is_none());
        }

        #[test]
        #[should_panic(expected = "test case `valid_login` has no key `password`")]
        fn test_index_missing_key_panics_with_case_name() {
            let case = TestCase {
                name: "valid_login".to_string(),
                data: record(json!({"username": "alice"})),
            };
            let _ = &case["password"];
        }
    }

    mod merge_tests {
        use super::*;

        #[test]
        fn test_overlay_wins() {
            let merged = merge_records(
                &record(json!({"a": 1, "b": 2})),
                &record(json!({"b": 3, "c": 4})),
            );
            assert_eq!(Value::Object(merged), json!({"a": 1, "b": 3, "c": 4}));
        }

        proptest! {
            #[test]
            fn prop_merge_keeps_all_keys_and_overlay_values(
                base in prop::collection::btree_map("[a-e]", 0i64..100, 0..5),
                overlay in prop::collection::btree_map("[a-e]", 100i64..200, 0..5),
            ) {
                let to_record = |m: &std::collections::BTreeMap<String, i64>| -> Record {
                    m.iter().map(|(k, v)| (k.clone(), json!(v))).collect()
                };
                let merged = merge_records(&to_record(&base), &to_record(&overlay));
                for (k, v) in &overlay {
                    prop_assert_eq!(&merged[k], &json!(v));
                }
                for (k, v) in &base {
                    if !overlay.contains_key(k) {
                        prop_assert_eq!(&merged[k], &json!(v));
                    }
                }
                prop_assert!(merged.len() <= base.len() + overlay.len());
            }
        }
    }
}
