use std::fmt::Write;

use crate::api::types::WeeklyReport;

/// Render the weekly report: headline numbers, then one row per day.
pub fn render_dashboard(report: &WeeklyReport) -> String {
  let summary = &report.summary;
  let mut out = String::new();

  let _ = writeln!(out, "Total users:          {}", summary.total_users);
  let _ = writeln!(out, "AI performance:       {:.1}%", summary.ai_performance);
  let _ = writeln!(out, "Total subscriptions:  {}", summary.total_subscriptions);

  if report.weekly.is_empty() {
    let _ = writeln!(out, "\nNo activity recorded this week.");
    return out;
  }

  let _ = writeln!(out, "\n{:<12} {:>12} {:>17}", "DATE", "ACTIVE USERS", "NEW REGISTRATIONS");
  for point in &report.weekly {
    let _ = writeln!(
      out,
      "{:<12} {:>12} {:>17}",
      point.date, point.active_users, point.new_registrations
    );
  }

  out
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::types::{ReportSummary, WeeklyPoint};

  #[test]
  fn test_renders_summary_and_rows() {
    let report = WeeklyReport {
      summary: ReportSummary {
        total_users: 1200,
        ai_performance: 87.25,
        total_subscriptions: 310,
      },
      weekly: vec![WeeklyPoint {
        date: "2024-01-15".to_string(),
        active_users: 400,
        new_registrations: 12,
      }],
    };

    let text = render_dashboard(&report);
    assert!(text.contains("Total users:          1200"));
    assert!(text.contains("87.2%") || text.contains("87.3%"));
    assert!(text.contains("2024-01-15"));
    assert!(text.contains("DATE"));
  }

  #[test]
  fn test_empty_week() {
    let report = WeeklyReport {
      summary: ReportSummary::default(),
      weekly: Vec::new(),
    };
    let text = render_dashboard(&report);
    assert!(text.contains("No activity recorded"));
    assert!(!text.contains("DATE"));
  }
}
