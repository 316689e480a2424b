//! Human-readable diffs for audit entries

use serde_json::Value;

/// Fields that change on every edit and would only add noise
const IGNORED_FIELDS: &[&str] = &["updated_at"];

/// Summarize the differences between two JSON values
///
/// Nested objects (such as slicer profiles) are reported with dotted paths.
/// Returns `None` when nothing relevant changed.
pub fn generate_diff(before: &Value, after: &Value) -> Option<String> {
    let mut changes = Vec::new();
    collect_changes(before, after, "", &mut changes);

    if changes.is_empty() {
        None
    } else {
        Some(changes.join(", "))
    }
}

fn collect_changes(before: &Value, after: &Value, prefix: &str, changes: &mut Vec<String>) {
    let path = |key: &str| {
        if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", prefix, key)
        }
    };

    match (before, after) {
        (Value::Object(before_obj), Value::Object(after_obj)) => {
            for (key, before_val) in before_obj {
                if prefix.is_empty() && IGNORED_FIELDS.contains(&key.as_str()) {
                    continue;
                }
                match after_obj.get(key) {
                    Some(after_val) if before_val != after_val => {
                        if before_val.is_object() && after_val.is_object() {
                            collect_changes(before_val, after_val, &path(key), changes);
                        } else {
                            changes.push(format!(
                                "{}: {} -> {}",
                                path(key),
                                format_value(before_val),
                                format_value(after_val)
                            ));
                        }
                    }
                    Some(_) => {}
                    None => changes.push(format!(
                        "{}: {} -> (removed)",
                        path(key),
                        format_value(before_val)
                    )),
                }
            }

            for (key, after_val) in after_obj {
                if !before_obj.contains_key(key) {
                    changes.push(format!("{}: (added) -> {}", path(key), format_value(after_val)));
                }
            }
        }
        _ if before != after => {
            let label = if prefix.is_empty() {
                String::new()
            } else {
                format!("{}: ", prefix)
            };
            changes.push(format!(
                "{}{} -> {}",
                label,
                format_value(before),
                format_value(after)
            ));
        }
        _ => {}
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => {
            if s.chars().count() > 50 {
                let head: String = s.chars().take(47).collect();
                format!("\"{}...\"", head)
            } else {
                format!("\"{}\"", s)
            }
        }
        Value::Array(arr) => format!("[{} items]", arr.len()),
        Value::Object(obj) => format!("{{{} fields}}", obj.len()),
    }
}
