use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Sliding-window limiter keyed by client address.
#[derive(Debug, Clone)]
pub struct ClientRateLimiter {
    inner: Arc<Mutex<HashMap<String, VecDeque<Instant>>>>,
    window: Duration,
    max_requests: usize,
}

impl ClientRateLimiter {
    pub fn new(window: Duration, max_requests: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            window,
            max_requests,
        }
    }

    pub fn allow(&self, key: &str) -> bool {
        self.allow_at(key, Instant::now())
    }

    fn allow_at(&self, key: &str, now: Instant) -> bool {
        let mut guard = self.inner.lock();
        if guard.len() > 4_096 {
            let window = self.window;
            guard.retain(|_, queue| {
                queue
                    .back()
                    .is_some_and(|last| now.saturating_duration_since(*last) <= window)
            });
        }

        let queue = guard.entry(key.to_string()).or_default();
        while let Some(front) = queue.front() {
            if now.saturating_duration_since(*front) > self.window {
                queue.pop_front();
            } else {
                break;
            }
        }

        if queue.len() >= self.max_requests {
            return false;
        }

        queue.push_back(now);
        true
    }
}
