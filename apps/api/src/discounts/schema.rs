//! Key-structure check between a template skeleton and a model response.
//!
//! Values may be filled in or null; keys may not be dropped or renamed.

use serde_json::Value;

/// What to do when a response loses template keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPolicy {
    Strict,
    WarnOnly,
}

/// Returns the JSON paths of every template key the response lacks.
///
/// Arrays are compared element by element at the same index. Scalar template
/// leaves accept any response value.
pub fn missing_keys(template: &Value, response: &Value) -> Vec<String> {
    let mut missing = Vec::new();
    walk(template, response, "$", &mut missing);
    missing
}

fn walk(template: &Value, response: &Value, path: &str, missing: &mut Vec<String>) {
    match (template, response) {
        (Value::Object(expected), Value::Object(actual)) => {
            for (key, expected_value) in expected {
                let child = format!("{path}.{key}");
                match actual.get(key) {
                    Some(actual_value) => walk(expected_value, actual_value, &child, missing),
                    None => missing.push(child),
                }
            }
        }
        (Value::Array(expected), Value::Array(actual)) => {
            for (index, expected_value) in expected.iter().enumerate() {
                let child = format!("{path}[{index}]");
                match actual.get(index) {
                    Some(actual_value) => walk(expected_value, actual_value, &child, missing),
                    None => missing.push(child),
                }
            }
        }
        (Value::Object(expected), _) if !expected.is_empty() => {
            missing.push(format!("{path} (expected object)"));
        }
        (Value::Array(expected), _) if !expected.is_empty() => {
            missing.push(format!("{path} (expected array)"));
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filled_values_pass() {
        let template = json!({"A": {"Weight Range": "All", "Current UPS": ""}});
        let response = json!({"A": {"Weight Range": "All", "Current UPS": "61.00%"}});
        assert!(missing_keys(&template, &response).is_empty());
    }

    #[test]
    fn test_null_values_pass() {
        let template = json!({"A": {"Current UPS": ""}});
        let response = json!({"A": {"Current UPS": null}});
        assert!(missing_keys(&template, &response).is_empty());
    }

    #[test]
    fn test_extra_keys_are_allowed() {
        let template = json!({"A": {"Current UPS": ""}});
        let response = json!({"A": {"Current UPS": "5%", "Note": "x"}, "B": 1});
        assert!(missing_keys(&template, &response).is_empty());
    }

    #[test]
    fn test_dropped_and_renamed_keys_are_reported() {
        let template =
            json!({"A": {"Letter": {"Current UPS": ""}, "Package": {"Current UPS": ""}}});
        let response = json!({"A": {"Letter": {"current_ups": "5%"}}});
        let missing = missing_keys(&template, &response);
        assert_eq!(
            missing,
            vec!["$.A.Letter.Current UPS".to_string(), "$.A.Package".to_string()]
        );
    }

    #[test]
    fn test_object_replaced_by_scalar_is_reported() {
        let template = json!({"A": {"Current UPS": ""}});
        let response = json!({"A": null});
        assert_eq!(missing_keys(&template, &response), vec!["$.A (expected object)"]);
    }

    #[test]
    fn test_arrays_compare_by_index() {
        let template = json!([
            {"ACCESSORIAL_CHARGE": "DAS Comm", "CURRENT_UPS": ""},
            {"ACCESSORIAL_CHARGE": "DAS Resi", "CURRENT_UPS": ""}
        ]);
        let response = json!([{"ACCESSORIAL_CHARGE": "DAS Comm", "CURRENT_UPS": "50%"}]);
        assert_eq!(missing_keys(&template, &response), vec!["$[1]"]);

        let wrong_shape = json!({"ACCESSORIAL_CHARGE": "DAS Comm"});
        assert_eq!(
            missing_keys(&template, &wrong_shape),
            vec!["$ (expected array)"]
        );
    }
}
