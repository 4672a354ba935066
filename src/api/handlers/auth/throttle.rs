//! In-process brute-force throttling for login attempts.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThrottleDecision {
    Allowed,
    Limited,
}

/// Per-IP failed-attempt throttle.
///
/// This guards one process only; multi-instance deployments would need a
/// shared store and are out of scope.
pub trait LoginThrottle: Send + Sync {
    fn check(&self, ip: Option<&str>) -> ThrottleDecision;
    fn record_failure(&self, ip: Option<&str>);
    /// Remaining seconds until the caller may retry, for the 429 hint.
    fn retry_after_seconds(&self, ip: Option<&str>) -> u64;
}

struct WindowEntry {
    failures: u32,
    window_ends_at: Instant,
}

/// Fixed-window counter: each failure bumps the count and pushes the window
/// end out to now+window; once the window elapses the entry is dropped and
/// counting restarts from zero. Bursts straddling a window boundary may
/// exceed the nominal rate.
pub struct FixedWindowThrottle {
    max_attempts: u32,
    window: Duration,
    entries: Mutex<HashMap<String, WindowEntry>>,
}

impl FixedWindowThrottle {
    #[must_use]
    pub fn new(max_attempts: u32, window: Duration) -> Self {
        Self {
            max_attempts,
            window,
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl LoginThrottle for FixedWindowThrottle {
    fn check(&self, ip: Option<&str>) -> ThrottleDecision {
        let Some(ip) = ip else {
            return ThrottleDecision::Allowed;
        };
        let Ok(mut entries) = self.entries.lock() else {
            // A poisoned map means a panic elsewhere; fail open so logins
            // still reach credential validation.
            return ThrottleDecision::Allowed;
        };
        let now = Instant::now();
        match entries.get(ip) {
            Some(entry) if entry.window_ends_at > now => {
                if entry.failures >= self.max_attempts {
                    ThrottleDecision::Limited
                } else {
                    ThrottleDecision::Allowed
                }
            }
            Some(_) => {
                entries.remove(ip);
                ThrottleDecision::Allowed
            }
            None => ThrottleDecision::Allowed,
        }
    }

    fn record_failure(&self, ip: Option<&str>) {
        let Some(ip) = ip else {
            return;
        };
        let Ok(mut entries) = self.entries.lock() else {
            return;
        };
        let now = Instant::now();
        // Sweep stale entries on mutation so the map never outlives the
        // window by more than one call.
        entries.retain(|_, entry| entry.window_ends_at > now);
        let entry = entries.entry(ip.to_string()).or_insert(WindowEntry {
            failures: 0,
            window_ends_at: now,
        });
        entry.failures = entry.failures.saturating_add(1);
        entry.window_ends_at = now + self.window;
    }

    fn retry_after_seconds(&self, ip: Option<&str>) -> u64 {
        let Some(ip) = ip else {
            return 0;
        };
        let Ok(entries) = self.entries.lock() else {
            return 0;
        };
        entries
            .get(ip)
            .map(|entry| {
                entry
                    .window_ends_at
                    .saturating_duration_since(Instant::now())
                    .as_secs()
            })
            .unwrap_or(0)
    }
}

/// Throttle that allows everything; used in tests.
#[derive(Clone, Debug)]
pub struct NoopThrottle;

impl LoginThrottle for NoopThrottle {
    fn check(&self, _ip: Option<&str>) -> ThrottleDecision {
        ThrottleDecision::Allowed
    }

    fn record_failure(&self, _ip: Option<&str>) {}

    fn retry_after_seconds(&self, _ip: Option<&str>) -> u64 {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IP: Option<&str> = Some("10.0.0.1");

    #[test]
    fn allows_until_max_attempts() {
        let throttle = FixedWindowThrottle::new(5, Duration::from_secs(60));
        for _ in 0..4 {
            throttle.record_failure(IP);
        }
        assert_eq!(throttle.check(IP), ThrottleDecision::Allowed);

        throttle.record_failure(IP);
        assert_eq!(throttle.check(IP), ThrottleDecision::Limited);
    }

    #[test]
    fn sixth_attempt_blocked_after_five_failures() {
        let throttle = FixedWindowThrottle::new(5, Duration::from_secs(60));
        for _ in 0..5 {
            throttle.record_failure(IP);
        }
        // Blocked regardless of whether the credentials would now be correct.
        assert_eq!(throttle.check(IP), ThrottleDecision::Limited);
        assert!(throttle.retry_after_seconds(IP) > 0);
    }

    #[test]
    fn window_expiry_drops_the_entry() {
        let throttle = FixedWindowThrottle::new(2, Duration::from_millis(30));
        throttle.record_failure(IP);
        throttle.record_failure(IP);
        assert_eq!(throttle.check(IP), ThrottleDecision::Limited);

        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(throttle.check(IP), ThrottleDecision::Allowed);
        // Counting restarts from zero after the window.
        throttle.record_failure(IP);
        assert_eq!(throttle.check(IP), ThrottleDecision::Allowed);
    }

    #[test]
    fn failure_resets_window_end() {
        let throttle = FixedWindowThrottle::new(2, Duration::from_millis(50));
        throttle.record_failure(IP);
        std::thread::sleep(Duration::from_millis(30));
        // Second failure pushes the window out; the entry is still live
        // after the first failure's window would have ended.
        throttle.record_failure(IP);
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(throttle.check(IP), ThrottleDecision::Limited);
    }

    #[test]
    fn sweeps_stale_entries_on_mutation() {
        let throttle = FixedWindowThrottle::new(1, Duration::from_millis(10));
        throttle.record_failure(Some("10.0.0.2"));
        std::thread::sleep(Duration::from_millis(20));
        throttle.record_failure(IP);
        let entries = throttle.entries.lock().expect("lock");
        assert!(!entries.contains_key("10.0.0.2"));
        assert!(entries.contains_key("10.0.0.1"));
    }

    #[test]
    fn unknown_ip_is_allowed() {
        let throttle = FixedWindowThrottle::new(1, Duration::from_secs(60));
        assert_eq!(throttle.check(None), ThrottleDecision::Allowed);
        assert_eq!(throttle.retry_after_seconds(None), 0);
    }

    #[test]
    fn noop_throttle_allows() {
        let throttle = NoopThrottle;
        throttle.record_failure(IP);
        assert_eq!(throttle.check(IP), ThrottleDecision::Allowed);
    }
}
