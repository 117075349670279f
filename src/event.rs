use std::time::Duration;
use tokio::sync::mpsc;

/// Events that drive a page mount
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
  /// Periodic tick for polling pending queries
  Tick,
  /// Ctrl-C: the page is being torn down
  Interrupt,
}

/// Event handler that produces events from a tick timer and Ctrl-C
pub struct EventHandler {
  rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
  /// Create a new event handler with the given tick rate
  pub fn new(tick_rate: Duration) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();

    // Spawn tick timer
    let tick_tx = tx.clone();
    tokio::spawn(async move {
      let mut interval = tokio::time::interval(tick_rate);
      loop {
        interval.tick().await;
        if tick_tx.send(Event::Tick).is_err() {
          break;
        }
      }
    });

    // Spawn interrupt listener
    tokio::spawn(async move {
      if tokio::signal::ctrl_c().await.is_ok() {
        let _ = tx.send(Event::Interrupt);
      }
    });

    Self { rx }
  }

  /// Receive the next event
  pub async fn next(&mut self) -> Option<Event> {
    self.rx.recv().await
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_ticks_arrive() {
    let mut events = EventHandler::new(Duration::from_millis(5));
    assert_eq!(events.next().await, Some(Event::Tick));
    assert_eq!(events.next().await, Some(Event::Tick));
  }
}
