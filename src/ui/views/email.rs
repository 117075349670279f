use chrono::{DateTime, FixedOffset};
use std::fmt::Write;

const DATE_FORMAT: &str = "%b %-d, %Y %H:%M";

/// Campaign status: last send, auto-send flag and, when on, the next send.
pub fn render_email(
  last_sent: DateTime<FixedOffset>,
  auto_send: bool,
  next_send: DateTime<FixedOffset>,
) -> String {
  let mut out = String::new();
  let _ = writeln!(out, "Last sent:  {}", last_sent.format(DATE_FORMAT));
  if auto_send {
    let _ = writeln!(out, "Auto-send:  on (next {})", next_send.format(DATE_FORMAT));
  } else {
    let _ = writeln!(out, "Auto-send:  off");
  }
  out.push_str("Send now with `adminctl email --send`; toggle with `adminctl email --auto-send <true|false>`.\n");
  out
}
