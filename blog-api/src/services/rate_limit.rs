use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// Entries beyond this trigger a sweep of expired windows.
const SWEEP_THRESHOLD: usize = 10_000;

struct Window {
    started: Instant,
    count: u64,
}

/// Fixed-window request counter keyed by an arbitrary string (client IP,
/// `"{ip}:{email}"`). Process-local; each replica counts on its own.
pub struct FixedWindowLimiter {
    window: Duration,
    max: u64,
    hits: DashMap<String, Window>,
}

impl FixedWindowLimiter {
    pub fn new(window: Duration, max: u64) -> Self {
        Self {
            window,
            max,
            hits: DashMap::new(),
        }
    }

    /// Count a hit for `key`. Returns `false` once the window's budget is spent.
    pub fn hit(&self, key: &str) -> bool {
        self.hit_at(key, Instant::now())
    }

    fn hit_at(&self, key: &str, now: Instant) -> bool {
        if self.hits.len() > SWEEP_THRESHOLD {
            self.sweep(now);
        }

        let mut entry = self.hits.entry(key.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });
        if now.duration_since(entry.started) >= self.window {
            entry.started = now;
            entry.count = 0;
        }
        entry.count += 1;
        entry.count <= self.max
    }

    fn sweep(&self, now: Instant) {
        let window = self.window;
        self.hits.retain(|_, w| now.duration_since(w.started) < window);
    }
}

/// Minimum spacing between two OTP sends to the same address.
pub struct OtpCooldown {
    period: Duration,
    last_sent: DashMap<String, Instant>,
}

impl OtpCooldown {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            last_sent: DashMap::new(),
        }
    }

    /// Record a send for `email` unless one happened within the period.
    /// On refusal returns the seconds left to wait (at least 1).
    pub fn check_and_mark(&self, email: &str) -> Result<(), u64> {
        self.check_and_mark_at(email, Instant::now())
    }

    fn check_and_mark_at(&self, email: &str, now: Instant) -> Result<(), u64> {
        if self.last_sent.len() > SWEEP_THRESHOLD {
            let period = self.period;
            self.last_sent.retain(|_, at| now.duration_since(*at) < period);
        }

        match self.last_sent.entry(email.to_string()) {
            Entry::Occupied(mut sent) => {
                let elapsed = now.duration_since(*sent.get());
                if elapsed < self.period {
                    let remaining = (self.period - elapsed).as_secs_f64().ceil() as u64;
                    return Err(remaining.max(1));
                }
                sent.insert(now);
            }
            Entry::Vacant(slot) => {
                slot.insert(now);
            }
        }
        Ok(())
    }
}
