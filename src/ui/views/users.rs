use clap::ValueEnum;
use std::fmt::Write;

use crate::api::types::User;
use crate::ui::format::{format_date, truncate};

/// Which users the list shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum UserFilter {
  #[default]
  All,
  Active,
  Suspended,
}

impl UserFilter {
  fn admits(&self, user: &User) -> bool {
    match self {
      UserFilter::All => true,
      UserFilter::Active => !user.is_blocked,
      UserFilter::Suspended => user.is_blocked,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserCounts {
  pub total: usize,
  pub active: usize,
  pub suspended: usize,
}

/// Counts over the whole list, independent of search and filter.
pub fn count_users(users: &[User]) -> UserCounts {
  let suspended = users.iter().filter(|u| u.is_blocked).count();
  UserCounts {
    total: users.len(),
    active: users.len() - suspended,
    suspended,
  }
}

/// Users matching the filter whose name or email contains `search`, ignoring case.
pub fn filter_users<'a>(users: &'a [User], search: &str, filter: UserFilter) -> Vec<&'a User> {
  let needle = search.trim().to_lowercase();
  users
    .iter()
    .filter(|u| {
      needle.is_empty()
        || u.name.to_lowercase().contains(&needle)
        || u.email.to_lowercase().contains(&needle)
    })
    .filter(|u| filter.admits(u))
    .collect()
}

pub fn status_label(is_blocked: bool) -> &'static str {
  if is_blocked {
    "Suspended"
  } else {
    "Active"
  }
}

pub fn render_users(users: &[User], search: &str, filter: UserFilter) -> String {
  let counts = count_users(users);
  let shown = filter_users(users, search, filter);
  let mut out = String::new();

  let _ = writeln!(
    out,
    "Total: {}  Active: {}  Suspended: {}",
    counts.total, counts.active, counts.suspended
  );

  if shown.is_empty() {
    let _ = writeln!(out, "\nNo users found.");
    return out;
  }

  let _ = writeln!(
    out,
    "\n{:>6}  {:<24} {:<32} {:<10} {}",
    "ID", "NAME", "EMAIL", "STATUS", "LAST ACTIVE"
  );
  for user in shown {
    let _ = writeln!(
      out,
      "{:>6}  {:<24} {:<32} {:<10} {}",
      user.id,
      truncate(&user.name, 24),
      truncate(&user.email, 32),
      status_label(user.is_blocked),
      format_date(user.last_active_at.as_deref())
    );
  }

  out
}

#[cfg(test)]
mod tests {
  use super::*;

  fn user(id: u64, name: &str, email: &str, is_blocked: bool) -> User {
    User {
      id,
      name: name.to_string(),
      email: email.to_string(),
      is_blocked,
      last_active_at: None,
    }
  }

  fn sample() -> Vec<User> {
    vec![
      user(1, "Ada Lovelace", "ada@example.com", false),
      user(2, "Grace Hopper", "grace@navy.mil", true),
      user(3, "Alan Turing", "alan@example.com", false),
    ]
  }

  #[test]
  fn test_counts_ignore_search() {
    let counts = count_users(&sample());
    assert_eq!(
      counts,
      UserCounts {
        total: 3,
        active: 2,
        suspended: 1
      }
    );
  }

  #[test]
  fn test_search_matches_name_or_email_case_insensitive() {
    let users = sample();
    let ids = |found: Vec<&User>| found.iter().map(|u| u.id).collect::<Vec<_>>();

    assert_eq!(ids(filter_users(&users, "ADA", UserFilter::All)), vec![1]);
    assert_eq!(ids(filter_users(&users, "navy", UserFilter::All)), vec![2]);
    assert_eq!(ids(filter_users(&users, "example", UserFilter::All)), vec![1, 3]);
  }

  #[test]
  fn test_filter_by_status() {
    let users = sample();
    assert_eq!(filter_users(&users, "", UserFilter::Active).len(), 2);
    assert_eq!(filter_users(&users, "", UserFilter::Suspended)[0].id, 2);
    assert!(filter_users(&users, "ada", UserFilter::Suspended).is_empty());
  }

  #[test]
  fn test_render_empty_result() {
    let text = render_users(&sample(), "nobody", UserFilter::All);
    assert!(text.contains("Total: 3"));
    assert!(text.contains("No users found."));
  }

  #[test]
  fn test_render_rows() {
    let text = render_users(&sample(), "", UserFilter::All);
    assert!(text.contains("Grace Hopper"));
    assert!(text.contains("Suspended"));
  }
}
