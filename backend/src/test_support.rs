//! Test utilities for the backend crate.
//!
//! This module provides shared helpers for both unit tests (in `src/`) and
//! integration tests (in `tests/`). It is only compiled when running tests or
//! with the `test-support` feature.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeDelta, TimeZone, Utc};
use mockable::Clock;

use crate::domain::ports::{EmailMessage, Notifier, NotifierError};

/// Clock frozen at a settable instant.
pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    /// Freeze the clock at `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    /// Freeze the clock at a fixed instant in 2026.
    pub fn fixed() -> Self {
        Self::new(
            Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0)
                .single()
                .unwrap_or_else(Utc::now),
        )
    }

    /// Move time forward by `seconds`.
    pub fn advance_seconds(&self, seconds: i64) {
        *self.lock_clock() += TimeDelta::seconds(seconds);
    }

    fn lock_clock(&self) -> MutexGuard<'_, DateTime<Utc>> {
        match self.0.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("clock mutex"),
        }
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.lock_clock()
    }
}

/// Notifier that keeps every message, or fails every send when `failing`.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, EmailMessage)>>,
    failing: bool,
}

impl RecordingNotifier {
    /// Notifier whose every send fails with `Unavailable`.
    pub fn failing() -> Self {
        Self {
            sent: Mutex::default(),
            failing: true,
        }
    }

    /// Recipients and messages accepted so far.
    pub fn sent(&self) -> Vec<(String, EmailMessage)> {
        self.lock_sent().clone()
    }

    /// The `link` field of the most recent message for `template`.
    pub fn last_link(&self, template: &str) -> Option<String> {
        self.lock_sent()
            .iter()
            .rev()
            .find(|(_, message)| message.template == template)
            .and_then(|(_, message)| message.fields.get("link").cloned())
    }

    /// Final path segment of [`RecordingNotifier::last_link`].
    pub fn last_token(&self, template: &str) -> Option<String> {
        self.last_link(template)
            .and_then(|link| link.rsplit('/').next().map(str::to_owned))
    }

    fn lock_sent(&self) -> MutexGuard<'_, Vec<(String, EmailMessage)>> {
        match self.sent.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("notifier mutex"),
        }
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_email(&self, to: &str, message: &EmailMessage) -> Result<(), NotifierError> {
        if self.failing {
            return Err(NotifierError::unavailable("smtp relay offline"));
        }
        self.lock_sent().push((to.to_owned(), message.clone()));
        Ok(())
    }
}
