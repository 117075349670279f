//! Route table: dashboard paths, the pages they mount, and suggestions for typos.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
  Dashboard,
  Users,
  UserDetail(u64),
  AiPerformance,
  Subscriptions,
  SixPoints,
  Email,
  Login,
}

impl Page {
  /// Pages that require an authorized admin session.
  pub fn is_protected(&self) -> bool {
    !matches!(self, Page::Login)
  }

  pub fn title(&self) -> String {
    match self {
      Page::Dashboard => "Dashboard".to_string(),
      Page::Users => "User Management".to_string(),
      Page::UserDetail(id) => format!("User {}", id),
      Page::AiPerformance => "AI Performance".to_string(),
      Page::Subscriptions => "Subscriptions".to_string(),
      Page::SixPoints => "Six Points".to_string(),
      Page::Email => "Email".to_string(),
      Page::Login => "Login".to_string(),
    }
  }
}

#[derive(Debug, Clone)]
pub struct Route {
  pub path: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
}

/// All available routes. `/` is the dashboard; login lives at `/login`.
pub const ROUTES: &[Route] = &[
  Route {
    path: "/",
    aliases: &["dashboard", "home", "index"],
    description: "Weekly summary and activity",
  },
  Route {
    path: "/users",
    aliases: &["u", "user"],
    description: "Manage and monitor all users",
  },
  Route {
    path: "/users/:id",
    aliases: &["user-detail"],
    description: "Profile of one user",
  },
  Route {
    path: "/ai-performance",
    aliases: &["ai", "performance"],
    description: "Weekly AI performance metrics",
  },
  Route {
    path: "/subscriptions",
    aliases: &["subs", "billing"],
    description: "Subscription dashboard",
  },
  Route {
    path: "/six-points",
    aliases: &["points", "point-adjustment"],
    description: "Point adjustments",
  },
  Route {
    path: "/email",
    aliases: &["mail"],
    description: "Weekly email campaign",
  },
  Route {
    path: "/login",
    aliases: &["signin"],
    description: "Sign in as an admin",
  },
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotFound {
  pub path: String,
  pub suggestions: Vec<&'static str>,
}

impl std::fmt::Display for NotFound {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "no page at {}", self.path)?;
    if !self.suggestions.is_empty() {
      write!(f, " (did you mean {}?)", self.suggestions.join(", "))?;
    }
    Ok(())
  }
}

impl std::error::Error for NotFound {}

/// Resolve a path (or alias) to the page it mounts.
pub fn resolve(input: &str) -> Result<Page, NotFound> {
  let normalized = normalize(input);
  let segments: Vec<&str> = normalized
    .trim_start_matches('/')
    .split('/')
    .filter(|s| !s.is_empty())
    .collect();

  let page = match segments.as_slice() {
    [] => Some(Page::Dashboard),
    ["users", id] | ["user-detail", id] => id.parse().ok().map(Page::UserDetail),
    [name] => page_for_path(&format!("/{}", name)).or_else(|| page_for_alias(name)),
    _ => None,
  };

  page.ok_or_else(|| NotFound {
    path: input.to_string(),
    suggestions: get_suggestions(normalized.trim_start_matches('/'))
      .into_iter()
      .map(|r| r.path)
      .collect(),
  })
}

fn normalize(input: &str) -> String {
  let trimmed = input.trim().to_lowercase();
  let trimmed = trimmed.trim_end_matches('/');
  if trimmed.is_empty() {
    "/".to_string()
  } else {
    trimmed.to_string()
  }
}

fn page_for_path(path: &str) -> Option<Page> {
  match path {
    "/" => Some(Page::Dashboard),
    "/users" => Some(Page::Users),
    "/ai-performance" => Some(Page::AiPerformance),
    "/subscriptions" => Some(Page::Subscriptions),
    "/six-points" => Some(Page::SixPoints),
    "/email" => Some(Page::Email),
    "/login" => Some(Page::Login),
    _ => None,
  }
}

fn page_for_alias(alias: &str) -> Option<Page> {
  ROUTES
    .iter()
    .find(|r| r.aliases.contains(&alias) && !r.path.contains(':'))
    .and_then(|r| page_for_path(r.path))
}

/// Get route suggestions for a given input
pub fn get_suggestions(input: &str) -> Vec<&'static Route> {
  let input_lower = input.to_lowercase();

  if input_lower.is_empty() {
    return ROUTES.iter().collect();
  }

  let mut matches: Vec<(&Route, u32)> = Vec::new();

  for route in ROUTES {
    let name = route.path.trim_start_matches('/');

    // Exact match on name
    if name == input_lower {
      matches.push((route, 0)); // Highest priority
      continue;
    }

    // Exact match on alias
    if route.aliases.contains(&input_lower.as_str()) {
      matches.push((route, 1));
      continue;
    }

    // Prefix match on name
    if !name.is_empty() && name.starts_with(&input_lower) {
      matches.push((route, 2));
      continue;
    }

    // Prefix match on alias
    if route.aliases.iter().any(|a| a.starts_with(&input_lower)) {
      matches.push((route, 3));
      continue;
    }

    // Fuzzy match (contains)
    if name.contains(&input_lower) {
      matches.push((route, 4));
      continue;
    }

    // Fuzzy match on alias
    if route.aliases.iter().any(|a| a.contains(&input_lower)) {
      matches.push((route, 5));
    }
  }

  // Sort by priority
  matches.sort_by_key(|(_, priority)| *priority);

  matches.into_iter().map(|(route, _)| route).collect()
}
