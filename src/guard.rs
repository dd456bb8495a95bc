use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use sqlx::SqlitePool;

use crate::ip::{self, SenderToken};
use crate::AppResult;

const MAX_PER_WINDOW: usize = 5;
const WINDOW: Duration = Duration::from_secs(60);
const MAX_TEXT_CHARS: usize = 500;
const SWEEP_THRESHOLD: usize = 1024;

const SPAM_WORDS: &[&str] = &["viagra", "casino", "lottery", "winner"];

/// Verdict on an inbound anonymous submission.
#[derive(Debug, PartialEq)]
pub enum Admission {
    /// Persist the message with this token and (trimmed) text.
    Accept { token: SenderToken, text: String },
    RateLimited,
    Blocked,
    RejectedContent(String),
}

/// Composes the sliding-window rate limiter, the blocklist, and the content
/// filter into a single admission decision, evaluated in that order.
#[derive(Clone)]
pub struct AbuseGuard {
    limiter: RateLimiter,
}

impl AbuseGuard {
    pub fn new() -> Self {
        Self {
            limiter: RateLimiter::new(MAX_PER_WINDOW, WINDOW),
        }
    }

    pub async fn admit(
        &self,
        db_pool: &SqlitePool,
        raw_addr: &str,
        text: &str,
    ) -> AppResult<Admission> {
        let token = ip::tokenize(raw_addr);

        if !self.limiter.check(&token) {
            tracing::warn!(token = &token.as_str()[..8], "rate limited");
            return Ok(Admission::RateLimited);
        }

        if ip::is_blocked(db_pool, &token).await? {
            tracing::warn!(token = &token.as_str()[..8], "blocked sender");
            return Ok(Admission::Blocked);
        }

        match validate_text(text) {
            Ok(trimmed) => Ok(Admission::Accept { token, text: trimmed }),
            Err(reason) => Ok(Admission::RejectedContent(reason)),
        }
    }
}

impl Default for AbuseGuard {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_text(text: &str) -> Result<String, String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err("Message cannot be empty.".to_owned());
    }
    if trimmed.chars().count() > MAX_TEXT_CHARS {
        return Err("Message is too long (max 500 characters).".to_owned());
    }
    let lowered = trimmed.to_lowercase();
    if SPAM_WORDS.iter().any(|word| lowered.contains(word)) {
        return Err("Your message contains prohibited content.".to_owned());
    }
    Ok(trimmed.to_owned())
}

/// Sliding-window limiter keyed by sender token only; a sender hitting many
/// recipients still shares one window. Every attempt is recorded, accepted
/// or not, matching how request-counting limiters behave.
#[derive(Clone)]
pub struct RateLimiter {
    max: usize,
    window: Duration,
    hits: Arc<Mutex<HashMap<SenderToken, VecDeque<Instant>>>>,
}

impl RateLimiter {
    pub fn new(max: usize, window: Duration) -> Self {
        Self {
            max,
            window,
            hits: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn check(&self, token: &SenderToken) -> bool {
        self.check_at(token, Instant::now())
    }

    // Prune, record, and count under one lock acquisition so two concurrent
    // submissions from the same token cannot both slip under the limit.
    pub fn check_at(&self, token: &SenderToken, now: Instant) -> bool {
        let mut hits = self.hits.lock().unwrap();

        // Tokens come from attacker-controlled addresses, so the map cannot
        // be allowed to keep an entry per idle token forever. Once it grows
        // past the threshold, drop every token whose newest attempt has
        // aged out of the window.
        if hits.len() >= SWEEP_THRESHOLD {
            hits.retain(|_, window| {
                window
                    .back()
                    .is_some_and(|newest| now.duration_since(*newest) < self.window)
            });
        }

        let window = hits.entry(token.clone()).or_default();
        while let Some(oldest) = window.front() {
            if now.duration_since(*oldest) >= self.window {
                window.pop_front();
            } else {
                break;
            }
        }
        window.push_back(now);
        window.len() <= self.max
    }

    #[cfg(test)]
    fn tracked_tokens(&self) -> usize {
        self.hits.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[test]
    fn sixth_attempt_in_window_is_limited() {
        let limiter = RateLimiter::new(5, Duration::from_secs(60));
        let token = ip::tokenize("203.0.113.1");
        let start = Instant::now();

        for i in 0..5 {
            assert!(limiter.check_at(&token, start + Duration::from_secs(i)));
        }
        assert!(!limiter.check_at(&token, start + Duration::from_secs(5)));
    }

    #[test]
    fn window_slides() {
        let limiter = RateLimiter::new(5, Duration::from_secs(60));
        let token = ip::tokenize("203.0.113.2");
        let start = Instant::now();

        for _ in 0..5 {
            assert!(limiter.check_at(&token, start));
        }
        assert!(!limiter.check_at(&token, start + Duration::from_secs(30)));
        // the five opening attempts have aged out by now
        assert!(limiter.check_at(&token, start + Duration::from_secs(61)));
    }

    #[test]
    fn idle_tokens_are_evicted() {
        let limiter = RateLimiter::new(5, Duration::from_secs(60));
        let start = Instant::now();

        for i in 0..2 * SWEEP_THRESHOLD {
            limiter.check_at(&ip::tokenize(&format!("10.1.{}.{}", i / 256, i % 256)), start);
        }
        assert_eq!(limiter.tracked_tokens(), 2 * SWEEP_THRESHOLD);

        // two windows later, one fresh sender sweeps out every stale entry
        let fresh = ip::tokenize("10.99.0.1");
        assert!(limiter.check_at(&fresh, start + Duration::from_secs(121)));
        assert_eq!(limiter.tracked_tokens(), 1);
    }

    #[test]
    fn active_tokens_survive_a_sweep() {
        let limiter = RateLimiter::new(5, Duration::from_secs(60));
        let start = Instant::now();
        let active = ip::tokenize("10.2.0.1");

        for i in 0..2 * SWEEP_THRESHOLD {
            limiter.check_at(&ip::tokenize(&format!("10.3.{}.{}", i / 256, i % 256)), start);
        }
        for _ in 0..5 {
            assert!(limiter.check_at(&active, start + Duration::from_secs(30)));
        }

        // a fresh sender a minute later sweeps out the stale bulk but keeps
        // the token whose attempts are still inside the window
        limiter.check_at(&ip::tokenize("10.99.0.2"), start + Duration::from_secs(61));
        assert_eq!(limiter.tracked_tokens(), 2);
        assert!(!limiter.check_at(&active, start + Duration::from_secs(61)));
    }

    #[test]
    fn tokens_are_limited_independently() {
        let limiter = RateLimiter::new(5, Duration::from_secs(60));
        let start = Instant::now();
        let a = ip::tokenize("203.0.113.3");
        let b = ip::tokenize("203.0.113.4");

        for _ in 0..5 {
            assert!(limiter.check_at(&a, start));
        }
        assert!(!limiter.check_at(&a, start));
        assert!(limiter.check_at(&b, start));
    }

    #[test]
    fn spam_words_are_rejected_case_insensitively() {
        assert!(validate_text("totally legit ViAgRa offer").is_err());
        assert!(validate_text("you are a WINNER today").is_err());
        assert!(validate_text("hello there, how are you?").is_ok());
    }

    #[test]
    fn text_bounds() {
        assert!(validate_text("   ").is_err());
        assert!(validate_text(&"x".repeat(501)).is_err());
        assert_eq!(validate_text("  hi  ").unwrap(), "hi");
        assert!(validate_text(&"x".repeat(500)).is_ok());
    }

    #[tokio::test]
    async fn admission_order_and_outcomes() {
        let pool = db::connect_in_memory().await.unwrap();
        let guard = AbuseGuard::new();

        let verdict = guard.admit(&pool, "198.51.100.1", "  hello  ").await.unwrap();
        match verdict {
            Admission::Accept { token, text } => {
                assert_eq!(token, ip::tokenize("198.51.100.1"));
                assert_eq!(text, "hello");
            }
            other => panic!("expected accept, got {other:?}"),
        }

        let token = ip::tokenize("198.51.100.2");
        ip::block(&pool, &token, "spam").await.unwrap();
        assert_eq!(
            guard.admit(&pool, "198.51.100.2", "hello").await.unwrap(),
            Admission::Blocked
        );

        assert!(matches!(
            guard.admit(&pool, "198.51.100.3", "free casino chips").await.unwrap(),
            Admission::RejectedContent(_)
        ));
    }

    #[tokio::test]
    async fn blocked_sender_is_rate_limited_first() {
        let pool = db::connect_in_memory().await.unwrap();
        let guard = AbuseGuard::new();
        let token = ip::tokenize("198.51.100.9");
        ip::block(&pool, &token, "spam").await.unwrap();

        for _ in 0..5 {
            assert_eq!(
                guard.admit(&pool, "198.51.100.9", "hi").await.unwrap(),
                Admission::Blocked
            );
        }
        assert_eq!(
            guard.admit(&pool, "198.51.100.9", "hi").await.unwrap(),
            Admission::RateLimited
        );
    }
}
