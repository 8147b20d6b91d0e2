use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Sliding window in-memory rate limiter (pod local). Keys are the
/// authenticated subject, since every limited endpoint requires a token.
#[derive(Clone)]
pub struct InMemoryRateLimiter {
    store: Arc<DashMap<String, VecDeque<Instant>>>,
    pub enabled: bool,
}

impl InMemoryRateLimiter {
    pub fn new(enabled: bool) -> Self {
        Self {
            store: Arc::new(DashMap::new()),
            enabled,
        }
    }

    /// Returns true if allowed, false if limited.
    pub fn check(&self, key: &str, limit: usize, window: Duration) -> bool {
        if !self.enabled {
            return true;
        }
        let now = Instant::now();
        let mut entry = self.store.entry(key.to_string()).or_default();
        while let Some(front) = entry.front() {
            if now.duration_since(*front) >= window {
                entry.pop_front();
            } else {
                break;
            }
        }
        if entry.len() < limit {
            entry.push_back(now);
            true
        } else {
            false
        }
    }
}

/// Per-action limits derived from env.
#[derive(Clone, Debug)]
pub struct RateLimitConfig {
    pub complaint_limit: usize,
    pub complaint_window: Duration,
    pub recyclable_limit: usize,
    pub recyclable_window: Duration,
    pub image_limit: usize,
    pub image_window: Duration,
}

impl RateLimitConfig {
    pub fn from_env() -> Self {
        fn usize_env(name: &str, default: usize) -> usize {
            std::env::var(name)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default)
        }
        fn dur_env(name: &str, default: u64) -> Duration {
            Duration::from_secs(
                std::env::var(name)
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(default),
            )
        }
        Self {
            complaint_limit: usize_env("RL_COMPLAINT_LIMIT", 5),
            complaint_window: dur_env("RL_COMPLAINT_WINDOW", 3600),
            recyclable_limit: usize_env("RL_RECYCLABLE_LIMIT", 5),
            recyclable_window: dur_env("RL_RECYCLABLE_WINDOW", 3600),
            image_limit: usize_env("RL_IMAGE_LIMIT", 10),
            image_window: dur_env("RL_IMAGE_WINDOW", 3600),
        }
    }
}

/// High level guard used by handlers.
#[derive(Clone)]
pub struct RateLimiterFacade {
    pub limiter: InMemoryRateLimiter,
    pub cfg: RateLimitConfig,
}

impl RateLimiterFacade {
    pub fn new(limiter: InMemoryRateLimiter, cfg: RateLimitConfig) -> Self {
        Self { limiter, cfg }
    }

    pub fn allow_complaint(&self, subject: &str) -> bool {
        self.limiter.check(
            &format!("complaint:{subject}"),
            self.cfg.complaint_limit,
            self.cfg.complaint_window,
        )
    }

    pub fn allow_recyclable(&self, subject: &str) -> bool {
        self.limiter.check(
            &format!("recyclable:{subject}"),
            self.cfg.recyclable_limit,
            self.cfg.recyclable_window,
        )
    }

    pub fn allow_image(&self, subject: &str) -> bool {
        self.limiter.check(
            &format!("image:{subject}"),
            self.cfg.image_limit,
            self.cfg.image_window,
        )
    }
}
