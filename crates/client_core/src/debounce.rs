use std::time::Duration;

use tokio::{sync::mpsc, time::timeout};

/// Sending half handed to whatever produces raw input (keystrokes).
#[derive(Clone)]
pub struct DebounceInput<T> {
    tx: mpsc::UnboundedSender<T>,
}

impl<T> DebounceInput<T> {
    /// Returns `false` once the consuming side is gone.
    pub fn push(&self, value: T) -> bool {
        self.tx.send(value).is_ok()
    }
}

/// Coalesces bursts of values: [`Debouncer::next`] yields the last value of a
/// burst once no new value arrived for `window`.
pub struct Debouncer<T> {
    rx: mpsc::UnboundedReceiver<T>,
    window: Duration,
}

pub fn debounced<T>(window: Duration) -> (DebounceInput<T>, Debouncer<T>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (DebounceInput { tx }, Debouncer { rx, window })
}

impl<T> Debouncer<T> {
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Waits for the next settled value. A burst still pending when the input
    /// side closes is flushed; after that `None` is returned.
    pub async fn next(&mut self) -> Option<T> {
        let mut latest = self.rx.recv().await?;
        loop {
            match timeout(self.window, self.rx.recv()).await {
                Ok(Some(value)) => latest = value,
                Ok(None) | Err(_) => return Some(latest),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn burst_collapses_to_last_value() {
        let (input, mut debouncer) = debounced(Duration::from_millis(300));
        for term in ["a", "al", "ali", "alic", "alice"] {
            assert!(input.push(term.to_string()));
        }
        assert_eq!(debouncer.next().await.as_deref(), Some("alice"));
    }

    #[tokio::test(start_paused = true)]
    async fn separated_inputs_settle_individually() {
        let (input, mut debouncer) = debounced(Duration::from_millis(300));
        let producer = tokio::spawn(async move {
            input.push(1);
            tokio::time::sleep(Duration::from_millis(500)).await;
            input.push(2);
        });

        assert_eq!(debouncer.next().await, Some(1));
        assert_eq!(debouncer.next().await, Some(2));
        producer.await.expect("producer");
        assert_eq!(debouncer.next().await, None);
    }
}
