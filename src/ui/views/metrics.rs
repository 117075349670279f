//! Server-shaped metric pages (AI performance, subscriptions).
//!
//! These payloads are shown as the server sends them, one `path: value` per leaf.

use serde_json::Value;

/// Flatten a JSON document into `path: value` lines, object keys in sorted order.
pub fn flatten(value: &Value) -> Vec<(String, String)> {
  let mut lines = Vec::new();
  walk(value, String::new(), &mut lines);
  lines
}

fn walk(value: &Value, path: String, lines: &mut Vec<(String, String)>) {
  match value {
    Value::Object(map) if !map.is_empty() => {
      for (key, child) in map {
        let child_path = if path.is_empty() {
          key.clone()
        } else {
          format!("{}.{}", path, key)
        };
        walk(child, child_path, lines);
      }
    }
    Value::Array(items) if !items.is_empty() => {
      for (i, child) in items.iter().enumerate() {
        walk(child, format!("{}[{}]", path, i), lines);
      }
    }
    leaf => {
      let text = match leaf {
        Value::String(s) => s.clone(),
        Value::Null => "N/A".to_string(),
        other => other.to_string(),
      };
      lines.push((path, text));
    }
  }
}

pub fn render_metrics(value: &Value) -> String {
  let lines = flatten(value);
  if let [(path, v)] = lines.as_slice() {
    if path.is_empty() {
      return format!("{}\n", v);
    }
  }

  let width = lines.iter().map(|(p, _)| p.len()).max().unwrap_or(0);
  lines
    .into_iter()
    .map(|(path, value)| format!("{:<width$} {}\n", format!("{}:", path), value, width = width + 1))
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_flatten_nested() {
    let value = json!({
      "summary": {"accuracy": 0.92, "model": "gpt"},
      "daily": [{"day": "Mon", "calls": 10}],
      "note": null
    });

    let lines = flatten(&value);
    assert!(lines.contains(&("summary.accuracy".to_string(), "0.92".to_string())));
    assert!(lines.contains(&("summary.model".to_string(), "gpt".to_string())));
    assert!(lines.contains(&("daily[0].calls".to_string(), "10".to_string())));
    assert!(lines.contains(&("note".to_string(), "N/A".to_string())));
  }

  #[test]
  fn test_empty_containers_are_leaves() {
    let lines = flatten(&json!({"plans": [], "extra": {}}));
    assert!(lines.contains(&("plans".to_string(), "[]".to_string())));
    assert!(lines.contains(&("extra".to_string(), "{}".to_string())));
  }

  #[test]
  fn test_render_scalar() {
    assert_eq!(render_metrics(&json!("ok")), "ok\n");
  }

  #[test]
  fn test_render_aligns_paths() {
    let text = render_metrics(&json!({"a": 1, "longer": 2}));
    assert!(text.contains("a:      1"));
    assert!(text.contains("longer: 2"));
  }
}
