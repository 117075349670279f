//! Weekly email campaign state, kept in the same key-value store as the
//! session: when the campaign last went out and whether the Monday 09:00
//! send is switched on.

use chrono::{DateTime, Datelike, Days, FixedOffset, NaiveDate, NaiveTime};
use color_eyre::Result;
use std::future::Future;
use std::sync::Arc;
use tracing::{info, warn};

use crate::cache::{Clock, KeyValueStore};

const LAST_SENT_KEY: &str = "lastWeeklyEmail";
const AUTO_SEND_KEY: &str = "weeklyEmailAuto";
const SEND_HOUR: u32 = 9;

pub struct CampaignState<S: KeyValueStore + ?Sized> {
  storage: Arc<S>,
}

impl<S: KeyValueStore + ?Sized> CampaignState<S> {
  pub fn new(storage: Arc<S>) -> Self {
    Self { storage }
  }

  /// When the campaign was last triggered, in `now`'s offset. Falls back to
  /// the most recent Monday 09:00 when nothing readable is stored.
  pub fn last_sent(&self, now: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    match self.storage.get(LAST_SENT_KEY) {
      Ok(Some(raw)) => match DateTime::parse_from_rfc3339(raw.trim()) {
        Ok(at) => return at.with_timezone(now.offset()),
        Err(e) => warn!(value = %raw, error = %e, "ignoring unreadable last send time"),
      },
      Ok(None) => {}
      Err(e) => warn!(error = %e, "campaign state unreadable"),
    }
    last_monday(now)
  }

  pub fn record_sent(&self, at: DateTime<FixedOffset>) -> Result<()> {
    self.storage.set(LAST_SENT_KEY, &at.to_rfc3339())?;
    Ok(())
  }

  /// Only the literal `true` switches it on.
  pub fn auto_send(&self) -> bool {
    matches!(self.storage.get(AUTO_SEND_KEY), Ok(Some(v)) if v == "true")
  }

  pub fn set_auto_send(&self, enabled: bool) -> Result<()> {
    self.storage.set(AUTO_SEND_KEY, &enabled.to_string())?;
    info!(enabled, "weekly email auto-send updated");
    Ok(())
  }

  /// Await `send` and stamp the send time only if it succeeded. A failed
  /// write is logged; the send itself already happened.
  pub async fn trigger<T, F>(&self, clock: &dyn Clock, send: F) -> Result<T>
  where
    F: Future<Output = Result<T>>,
  {
    let response = send.await?;
    let at = clock.now();
    match self.record_sent(at) {
      Ok(()) => info!(at = %at.to_rfc3339(), "weekly email send recorded"),
      Err(e) => warn!(error = %e, "weekly email sent but not recorded"),
    }
    Ok(response)
  }
}

/// Monday 09:00 of `now`'s week. Before 09:00 on a Monday this is later today.
pub fn last_monday(now: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
  let days_back = u64::from(now.weekday().num_days_from_monday());
  let date = now.date_naive() - Days::new(days_back);
  at_send_hour(date, now)
}

/// The first Monday 09:00 strictly after `now`.
pub fn next_monday(now: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
  let days_ahead = u64::from((7 - now.weekday().num_days_from_monday()) % 7);
  let candidate = at_send_hour(now.date_naive() + Days::new(days_ahead), now);
  if candidate > now {
    candidate
  } else {
    at_send_hour(now.date_naive() + Days::new(days_ahead + 7), now)
  }
}

fn at_send_hour(date: NaiveDate, now: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
  let time = NaiveTime::from_hms_opt(SEND_HOUR, 0, 0).unwrap_or(NaiveTime::MIN);
  date
    .and_time(time)
    .and_local_timezone(*now.offset())
    .single()
    .unwrap_or(now)
}
