// Request pacing for provider rate limits

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Token bucket with a capacity of one request.
///
/// A token refills every `interval`. Callers that arrive early wait for the
/// next token, so request starts are always at least `interval` apart no
/// matter how many requests are in flight.
pub struct RequestPacer {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RequestPacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: Mutex::new(None),
        }
    }

    /// Wait until the next request may be issued
    pub async fn acquire(&self) {
        // Held across the sleep so waiters are released one at a time
        let mut next_slot = self.next_slot.lock().await;
        if let Some(at) = *next_slot {
            tokio::time::sleep_until(at).await;
        }
        *next_slot = Some(Instant::now() + self.interval);
    }
}
