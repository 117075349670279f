//! Per-page fetch lifecycle.
//!
//! A `Query<T>` owns the fetch for one resource on one page mount and tracks
//! its `FetchState`:
//!
//! ```text
//! Idle -> Loading -> Ready(T) | Failed(error)
//!            ^              |
//!            +-- refresh() -+
//! ```
//!
//! There is no automatic retry. Dropping a query (or refreshing while loading)
//! does not cancel the in-flight fetch; its result is simply discarded.
//!
//! # Example
//!
//! ```ignore
//! let mut query = Query::new(move || {
//!   let client = client.clone();
//!   async move { client.get_users().await.map_err(|e| format!("{:#}", e)) }
//! });
//!
//! query.fetch();
//!
//! // In event loop tick
//! if query.poll() {
//!   // State changed, render
//! }
//! ```

use futures::future::{BoxFuture, FutureExt};
use std::future::Future;
use tokio::sync::mpsc;

/// The state of a query
#[derive(Debug, Clone)]
pub enum FetchState<T> {
  /// Query has not been started
  Idle,
  /// Query is currently fetching data
  Loading,
  /// Query completed successfully
  Ready(T),
  /// Query failed with an error
  Failed(String),
}

impl<T> FetchState<T> {
  pub fn is_loading(&self) -> bool {
    matches!(self, FetchState::Loading)
  }

  pub fn data(&self) -> Option<&T> {
    match self {
      FetchState::Ready(data) => Some(data),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<&str> {
    match self {
      FetchState::Failed(e) => Some(e),
      _ => None,
    }
  }
}

type FetcherFn<T> = Box<dyn Fn() -> BoxFuture<'static, Result<T, String>> + Send + Sync>;

/// Async query for data fetching with state management.
pub struct Query<T> {
  state: FetchState<T>,
  fetcher: FetcherFn<T>,
  receiver: Option<mpsc::UnboundedReceiver<Result<T, String>>>,
}

impl<T: Send + 'static> Query<T> {
  /// Create a new query with the given fetcher function.
  ///
  /// The fetcher is called each time a fetch actually starts.
  pub fn new<F, Fut>(fetcher: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, String>> + Send + 'static,
  {
    Self {
      state: FetchState::Idle,
      fetcher: Box::new(move || fetcher().boxed()),
      receiver: None,
    }
  }

  /// Get the current state of the query.
  pub fn state(&self) -> &FetchState<T> {
    &self.state
  }

  /// Check if the query is currently loading.
  pub fn is_loading(&self) -> bool {
    self.state.is_loading()
  }

  /// Start the first fetch (mount).
  ///
  /// No-op unless idle: a loading query keeps loading, and a settled query
  /// only leaves its state through `refresh()`.
  pub fn fetch(&mut self) {
    if matches!(self.state, FetchState::Idle) {
      self.start_fetch();
    }
  }

  /// Explicit refresh. Any pending result is discarded.
  pub fn refresh(&mut self) {
    self.receiver = None;
    self.start_fetch();
  }

  /// Poll for results from a pending fetch.
  ///
  /// Returns `true` if the state changed (data arrived or error occurred).
  /// Call this in your event loop tick handler.
  pub fn poll(&mut self) -> bool {
    let receiver = match &mut self.receiver {
      Some(rx) => rx,
      None => return false,
    };

    // Try to receive without blocking
    match receiver.try_recv() {
      Ok(Ok(data)) => {
        self.state = FetchState::Ready(data);
        self.receiver = None;
        true
      }
      Ok(Err(error)) => {
        self.state = FetchState::Failed(error);
        self.receiver = None;
        true
      }
      Err(mpsc::error::TryRecvError::Empty) => false,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        // Sender dropped without sending - the fetch task panicked
        self.state = FetchState::Failed("fetch task ended without a result".to_string());
        self.receiver = None;
        true
      }
    }
  }

  /// Internal: start the fetch operation
  fn start_fetch(&mut self) {
    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);
    self.state = FetchState::Loading;

    let future = (self.fetcher)();
    tokio::spawn(async move {
      let result = future.await;
      // Ignore send errors - receiver may have been dropped
      let _ = tx.send(result);
    });
  }
}

// Query is not Clone because the fetcher is boxed and receiver is owned.

impl<T: std::fmt::Debug> std::fmt::Debug for Query<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("state", &self.state)
      .finish_non_exhaustive()
  }
}
