use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::api::types::LoginResponse;
use crate::api::{AdminClient, ApiError, CachedAdminClient, ResourceKey};
use crate::cache::{
  CacheLayer, CacheResult, Clock, KeyValueStore, NoopStorage, SqliteStorage, SystemClock,
};
use crate::campaign::{next_monday, CampaignState};
use crate::config::Config;
use crate::event::{Event, EventHandler};
use crate::query::Query;
use crate::routes::{self, Page};
use crate::session::{decode_claims, Claims, CredentialStore, GuardDecision, SessionGuard};
use crate::ui::format::source_line;
use crate::ui::views::dashboard::render_dashboard;
use crate::ui::views::email::render_email;
use crate::ui::views::metrics::render_metrics;
use crate::ui::views::points::render_point_adjustments;
use crate::ui::views::user_detail::render_user_detail;
use crate::ui::views::users::{render_users, UserFilter};

const TICK_RATE: Duration = Duration::from_millis(50);

/// How a page is mounted.
#[derive(Debug, Clone, Default)]
pub struct PageOptions {
  /// Users page search text
  pub search: String,
  /// Users page status filter
  pub filter: UserFilter,
  /// Drop the page's cached entries before fetching
  pub refresh: bool,
  /// Re-fetch on this interval until Ctrl-C
  pub watch: Option<Duration>,
}

/// Point adjustment operations on the six-points page.
#[derive(Debug, Clone)]
pub enum PointsAction {
  Create { data: String },
  Update { id: u64, data: String },
  Delete { id: u64 },
}

/// Main application state
pub struct App {
  config: Config,
  /// Shared store for the session and, when enabled, the cache
  store: Arc<dyn KeyValueStore>,
  cache: CacheLayer<dyn KeyValueStore>,
  clock: Arc<dyn Clock>,
}

impl App {
  pub fn new(config: Config) -> Self {
    let store: Arc<dyn KeyValueStore> = match config.cache.store_path() {
      Some(path) => match SqliteStorage::open(&path) {
        Ok(storage) => Arc::new(storage),
        Err(e) => {
          warn!(path = %path.display(), error = %e, "store unavailable, continuing without one");
          Arc::new(NoopStorage)
        }
      },
      None => {
        warn!("no data directory, continuing without a store");
        Arc::new(NoopStorage)
      }
    };

    let cache_store: Arc<dyn KeyValueStore> = if config.cache.enabled {
      store.clone()
    } else {
      Arc::new(NoopStorage)
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let cache = CacheLayer::new(cache_store)
      .with_clock(clock.clone())
      .with_fetch_timeout(Duration::from_secs(config.api.timeout_secs));

    Self {
      config,
      store,
      cache,
      clock,
    }
  }

  fn credentials(&self) -> CredentialStore<dyn KeyValueStore> {
    CredentialStore::new(self.store.clone())
  }

  fn campaign(&self) -> CampaignState<dyn KeyValueStore> {
    CampaignState::new(self.store.clone())
  }

  /// Run the session guard; refuse unless an admin session is stored.
  fn authorize(&self) -> Result<Claims> {
    match SessionGuard::new(self.store.clone()).check(Utc::now()) {
      GuardDecision::Authorized(claims) => {
        debug!(subject = %claims.subject_id, "session authorized");
        Ok(claims)
      }
      GuardDecision::Unauthorized(reason) => {
        info!(?reason, "session refused");
        if reason.redirects_to_login() {
          Err(eyre!(
            "{}. Sign in with `adminctl login --email <email>`.",
            reason.message()
          ))
        } else {
          Err(eyre!("{}", reason.message()))
        }
      }
    }
  }

  /// Client carrying the stored token, reading through the cache.
  fn client(&self) -> Result<CachedAdminClient> {
    let inner = AdminClient::new(self.config.require_api()?, self.credentials().token())?;
    Ok(CachedAdminClient::new(
      inner,
      self.cache.clone(),
      self.config.cache.clone(),
    ))
  }

  /// Resolve a path and mount its page.
  pub async fn open_path(&self, path: &str, options: &PageOptions) -> Result<()> {
    let page = routes::resolve(path)?;
    self.open(page, options).await
  }

  /// Mount a page: guard, fetch, render.
  pub async fn open(&self, page: Page, options: &PageOptions) -> Result<()> {
    if page.is_protected() {
      self.authorize()?;
    }

    if options.refresh {
      for key in page_resources(page) {
        debug!(resource = %key.description(), "refresh requested");
        self.cache.invalidate(&key.storage_key());
      }
    }

    let title = page.title();
    match page {
      Page::Dashboard => {
        let query = cached_query(self.client()?, |c| async move { c.get_weekly_report().await });
        self.mount(&title, query, options, render_dashboard).await
      }
      Page::Users => {
        let query = cached_query(self.client()?, |c| async move { c.get_users().await });
        let (search, filter) = (options.search.clone(), options.filter);
        self
          .mount(&title, query, options, move |users: &Vec<_>| {
            render_users(users, &search, filter)
          })
          .await
      }
      Page::UserDetail(user_id) => {
        let query = cached_query(self.client()?, move |c| async move {
          c.get_user_profile(user_id).await
        });
        self.mount(&title, query, options, render_user_detail).await
      }
      Page::AiPerformance => {
        let query = cached_query(self.client()?, |c| async move { c.get_ai_performance().await });
        self.mount(&title, query, options, render_metrics).await
      }
      Page::Subscriptions => {
        let query = cached_query(self.client()?, |c| async move {
          c.get_subscription_dashboard().await
        });
        self.mount(&title, query, options, render_metrics).await
      }
      Page::SixPoints => {
        let query = cached_query(self.client()?, |c| async move {
          c.get_point_adjustments().await
        });
        self
          .mount(&title, query, options, |list: &Vec<_>| {
            render_point_adjustments(list)
          })
          .await
      }
      Page::Email => {
        println!("== {} ==", title);
        print!("{}", self.email_status());
        Ok(())
      }
      Page::Login => {
        println!("== {} ==", title);
        match SessionGuard::new(self.store.clone()).check(Utc::now()) {
          GuardDecision::Authorized(claims) => println!("Signed in as {}.", display_name(&claims)),
          GuardDecision::Unauthorized(_) => {
            println!("Sign in with `adminctl login --email <email>`.")
          }
        }
        Ok(())
      }
    }
  }

  /// Drive one query to completion on the tick loop and print the page.
  ///
  /// Ctrl-C before the first result drops the query, discarding whatever
  /// arrives later.
  async fn mount<T, R>(
    &self,
    title: &str,
    mut query: Query<CacheResult<T>>,
    options: &PageOptions,
    render: R,
  ) -> Result<()>
  where
    T: Send + 'static,
    R: Fn(&T) -> String,
  {
    let mut events = EventHandler::new(TICK_RATE);
    let mut next_refresh: Option<Instant> = None;
    let mut rendered = false;

    query.fetch();

    loop {
      match events.next().await {
        Some(Event::Tick) => {}
        Some(Event::Interrupt) | None => {
          if query.is_loading() {
            info!(page = title, "page closed, discarding pending fetch");
          }
          return if rendered {
            Ok(())
          } else {
            Err(eyre!("interrupted before {} loaded", title))
          };
        }
      }

      if query.poll() {
        let state = query.state();
        if let Some(result) = state.data() {
          println!("== {} ==", title);
          print!("{}", render(&result.data));
          println!(
            "-- {}",
            source_line(result.source, result.stored_at, self.clock.now())
          );
          debug!(page = title, cache_hit = result.is_cache_hit(), "page rendered");
          rendered = true;
        } else if let Some(error) = state.error() {
          if options.watch.is_none() {
            return Err(eyre!("Failed to load {}: {}", title, error));
          }
          eprintln!("Failed to load {}: {}", title, error);
        }

        match options.watch {
          Some(interval) => next_refresh = Some(Instant::now() + interval),
          None => return Ok(()),
        }
      }

      if next_refresh.is_some_and(|at| Instant::now() >= at) {
        next_refresh = None;
        query.refresh();
      }
    }
  }

  /// Sign in. An existing admin session is kept as is.
  pub async fn login(&self, email: &str, password: &str) -> Result<String> {
    if let GuardDecision::Authorized(claims) = SessionGuard::new(self.store.clone()).check(Utc::now()) {
      return Ok(format!("Already signed in as {}.", display_name(&claims)));
    }

    let api = AdminClient::new(self.config.require_api()?, None)?;
    let response: LoginResponse = match api.login(email, password).await {
      Ok(response) => response,
      Err(ApiError::Unauthorized) => {
        info!(email, "login rejected");
        return Err(eyre!("Email or password is incorrect"));
      }
      Err(e) => return Err(e.into()),
    };

    let claims = decode_claims(&response.access_token)
      .map_err(|e| eyre!("Login returned an unreadable token: {}", e))?;
    if !claims.is_admin() {
      info!(email, role = %claims.role, "non-admin login refused");
      return Err(eyre!("Access denied: {} is not an admin account", email));
    }

    self
      .credentials()
      .save(&response.access_token, &response.user.to_string())?;
    info!(subject = %claims.subject_id, "admin signed in");

    Ok(format!("Signed in as {}.", display_name(&claims)))
  }

  pub fn logout(&self) -> String {
    self.credentials().clear();
    info!("signed out");
    "Signed out.".to_string()
  }

  pub fn whoami(&self) -> Result<String> {
    let claims = self.authorize()?;
    let expires = claims
      .expiry()
      .map_or_else(|| "unknown".to_string(), |at| at.to_rfc3339());
    let issued = claims
      .iat
      .and_then(|iat| DateTime::from_timestamp(iat, 0))
      .map_or_else(|| "N/A".to_string(), |at| at.to_rfc3339());

    let mut out = format!(
      "Subject: {}\nEmail:   {}\nRole:    {}\nIssued:  {}\nExpires: {}",
      claims.subject_id,
      claims.email.as_deref().unwrap_or("N/A"),
      claims.role,
      issued,
      expires
    );
    if let Some(user) = self.credentials().user() {
      out.push_str(&format!("\nProfile: {}", user));
    }
    Ok(out)
  }

  pub async fn toggle_block(&self, user_id: u64) -> Result<String> {
    self.authorize()?;
    let response = self.client()?.toggle_block_user(user_id).await?;
    Ok(response_message(&response, &format!("Toggled block status of user {}.", user_id)))
  }

  pub async fn delete_user(&self, user_id: u64) -> Result<String> {
    self.authorize()?;
    let response = self.client()?.delete_user(user_id).await?;
    Ok(response_message(&response, &format!("Deleted user {}.", user_id)))
  }

  pub async fn points(&self, action: PointsAction) -> Result<String> {
    self.authorize()?;
    let client = self.client()?;

    let response = match action {
      PointsAction::Create { data } => client.create_point_adjustment(&parse_body(&data)?).await?,
      PointsAction::Update { id, data } => {
        client
          .update_point_adjustment(id, &parse_body(&data)?)
          .await?
      }
      PointsAction::Delete { id } => client.delete_point_adjustment(id).await?,
    };

    Ok(response_message(&response, "Point adjustments updated."))
  }

  fn email_status(&self) -> String {
    let now = self.clock.now();
    let campaign = self.campaign();
    render_email(campaign.last_sent(now), campaign.auto_send(), next_monday(now))
  }

  pub async fn send_weekly_email(&self) -> Result<String> {
    self.authorize()?;
    let client = self.client()?;
    let response = self
      .campaign()
      .trigger(self.clock.as_ref(), client.trigger_weekly_email())
      .await?;
    Ok(response_message(&response, "Weekly email campaign triggered."))
  }

  pub fn set_email_auto_send(&self, enabled: bool) -> Result<String> {
    self.authorize()?;
    self.campaign().set_auto_send(enabled)?;
    Ok(self.email_status())
  }

  /// Drop every fixed-key cache entry. Per-user profiles expire on their own
  /// or with `--refresh`.
  pub fn clear_cache(&self) -> String {
    let keys = [
      ResourceKey::Users,
      ResourceKey::WeeklyReport,
      ResourceKey::AiPerformance,
      ResourceKey::SubscriptionDashboard,
      ResourceKey::PointAdjustments,
    ];
    for key in &keys {
      self.cache.invalidate(&key.storage_key());
    }

    let names: Vec<String> = keys.iter().map(ResourceKey::description).collect();
    format!("Cleared cached {}.", names.join(", "))
  }

  pub fn list_routes(&self) -> String {
    routes::ROUTES
      .iter()
      .map(|r| {
        format!(
          "{:<18} {:<30} ({})\n",
          r.path,
          r.description,
          r.aliases.join(", ")
        )
      })
      .collect()
  }
}

/// Wrap a cached read as a page query, flattening the error chain to text.
fn cached_query<T, F, Fut>(client: CachedAdminClient, read: F) -> Query<CacheResult<T>>
where
  T: Send + 'static,
  F: Fn(CachedAdminClient) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<CacheResult<T>>> + Send + 'static,
{
  Query::new(move || {
    let pending = read(client.clone());
    async move { pending.await.map_err(|e| format!("{:#}", e)) }
  })
}

/// Cached entries a page reads.
fn page_resources(page: Page) -> Vec<ResourceKey> {
  match page {
    Page::Dashboard => vec![ResourceKey::WeeklyReport],
    Page::Users => vec![ResourceKey::Users],
    Page::UserDetail(user_id) => vec![ResourceKey::UserProfile { user_id }],
    Page::AiPerformance => vec![ResourceKey::AiPerformance],
    Page::Subscriptions => vec![ResourceKey::SubscriptionDashboard],
    Page::SixPoints => vec![ResourceKey::PointAdjustments],
    Page::Email | Page::Login => Vec::new(),
  }
}

fn display_name(claims: &Claims) -> String {
  match &claims.email {
    Some(email) => format!("{} ({})", email, claims.subject_id),
    None => claims.subject_id.clone(),
  }
}

/// The server's `message` field if it sent one.
fn response_message(response: &Value, fallback: &str) -> String {
  response
    .get("message")
    .and_then(Value::as_str)
    .filter(|m| !m.is_empty())
    .unwrap_or(fallback)
    .to_string()
}

fn parse_body(data: &str) -> Result<Value> {
  let body: Value =
    serde_json::from_str(data).map_err(|e| eyre!("--data is not valid JSON: {}", e))?;
  if !body.is_object() {
    return Err(eyre!("--data must be a JSON object"));
  }
  Ok(body)
}
