use std::fmt::Write;

use serde_json::Value;

use crate::api::types::PointAdjustment;
use crate::ui::format::truncate;

pub fn render_point_adjustments(adjustments: &[PointAdjustment]) -> String {
  if adjustments.is_empty() {
    return "No point adjustments.\n".to_string();
  }

  let mut out = String::new();
  for adjustment in adjustments {
    let fields: Vec<String> = adjustment
      .fields
      .iter()
      .map(|(key, value)| format!("{}={}", key, display_value(value)))
      .collect();
    let _ = writeln!(out, "{:>6}  {}", adjustment.id, truncate(&fields.join("  "), 100));
  }
  out
}

fn display_value(value: &Value) -> String {
  match value {
    Value::String(s) => s.clone(),
    other => other.to_string(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_empty_list() {
    assert_eq!(render_point_adjustments(&[]), "No point adjustments.\n");
  }

  #[test]
  fn test_rows_show_id_and_fields() {
    let adjustment: PointAdjustment =
      serde_json::from_value(json!({"id": 4, "reason": "bonus", "points": 50})).unwrap();
    let text = render_point_adjustments(&[adjustment]);
    assert!(text.contains("     4  "));
    assert!(text.contains("reason=bonus"));
    assert!(text.contains("points=50"));
  }
}
