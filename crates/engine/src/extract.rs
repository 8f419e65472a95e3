use std::collections::{BTreeMap, HashMap};

use serde_json::Value;

/// Project an attribute map onto the configured attribute names.
///
/// Only string-valued entries are kept; names missing from the map are
/// simply absent in the projection, never null-filled. The `BTreeMap`
/// result is canonically ordered, so two projections are comparable with
/// plain equality.
pub fn project<'a>(
    attributes: &'a HashMap<String, Value>,
    names: &[String],
) -> BTreeMap<&'a str, &'a str> {
    let mut projection = BTreeMap::new();
    for (key, value) in attributes {
        if names.iter().any(|n| n == key) {
            if let Some(s) = value.as_str() {
                projection.insert(key.as_str(), s);
            }
        }
    }
    projection
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attrs(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn restricts_to_configured_names() {
        let a = attrs(&[
            ("uid", json!("jdoe")),
            ("firstname", json!("Jane")),
            ("department", json!("Sales")),
        ]);
        let p = project(&a, &["uid".into(), "firstname".into()]);
        assert_eq!(p.len(), 2);
        assert_eq!(p.get("uid"), Some(&"jdoe"));
        assert!(!p.contains_key("department"));
    }

    #[test]
    fn missing_names_are_absent_not_null() {
        let a = attrs(&[("uid", json!("jdoe"))]);
        let p = project(&a, &["uid".into(), "lastname".into()]);
        assert_eq!(p.len(), 1);
        assert!(!p.contains_key("lastname"));
    }

    #[test]
    fn non_string_values_are_skipped() {
        let a = attrs(&[("uid", json!(42)), ("firstname", json!("Jane"))]);
        let p = project(&a, &["uid".into(), "firstname".into()]);
        assert_eq!(p.len(), 1);
        assert_eq!(p.get("firstname"), Some(&"Jane"));
    }

    #[test]
    fn equal_projections_compare_equal_regardless_of_insertion_order() {
        let a = attrs(&[("uid", json!("x")), ("firstname", json!("Jane"))]);
        let b = attrs(&[("firstname", json!("Jane")), ("uid", json!("x"))]);
        let names = vec!["uid".to_string(), "firstname".to_string()];
        assert_eq!(project(&a, &names), project(&b, &names));
    }
}
