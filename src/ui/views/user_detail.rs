use std::fmt::Write;

use crate::api::types::UserProfile;
use crate::ui::format::{format_date, initials, or_na};
use crate::ui::views::users::status_label;

pub fn render_user_detail(profile: &UserProfile) -> String {
  let user = &profile.user;
  let xp = &profile.xp;
  let ranking = &profile.ranking;
  let meta = &profile.meta;
  let mut out = String::new();

  let _ = writeln!(out, "[{}] {}", initials(user.name.as_deref()), or_na(user.name.as_deref()));
  let _ = writeln!(out, "Email:        {}", or_na(user.email.as_deref()));
  let _ = writeln!(
    out,
    "Status:       {}",
    status_label(user.is_blocked.unwrap_or(false))
  );
  let _ = writeln!(out, "Last active:  {}", format_date(user.last_active_at.as_deref()));

  let _ = writeln!(out, "\nXP");
  let _ = writeln!(out, "  Total:      {}", or_na(xp.total));
  let _ = writeln!(out, "  Level:      {}", or_na(xp.level));
  let _ = writeln!(
    out,
    "  Title:      {}",
    xp.title.as_deref().filter(|t| !t.is_empty()).unwrap_or("Newcomer")
  );

  let rank = match (ranking.global_rank, ranking.total_users) {
    (Some(rank), Some(total)) => format!("#{} of {}", rank, total),
    (Some(rank), None) => format!("#{}", rank),
    _ => "N/A".to_string(),
  };
  let _ = writeln!(out, "\nRank:         {}", rank);
  let _ = writeln!(out, "Certificates: {}", or_na(profile.certificates));

  let _ = writeln!(out, "\nXP breakdown");
  let _ = writeln!(out, "  Solo:       {}", or_na(meta.solo_xp));
  let _ = writeln!(out, "  Team:       {}", or_na(meta.team_xp));
  let _ = writeln!(out, "  Challenge:  {}", or_na(meta.challenge_xp));
  let _ = writeln!(out, "  Bonus:      {}", or_na(meta.bonus_xp));

  out
}
