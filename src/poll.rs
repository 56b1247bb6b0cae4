// src/poll.rs
//! Publication and voting windows for a question.
//!
//! Every check takes `now` explicitly so callers decide the clock.

use chrono::{DateTime, TimeDelta, Utc};

use crate::models::Question;

/// A question is visible once its publish time has been reached.
pub fn is_published(question: &Question, now: DateTime<Utc>) -> bool {
    now >= question.publish_at
}

/// True when the question was published within the last day, both ends inclusive.
pub fn was_published_recently(question: &Question, now: DateTime<Utc>) -> bool {
    now - TimeDelta::days(1) <= question.publish_at && question.publish_at <= now
}

/// Voting is open on `[publish_at, end_at)`, or from `publish_at` onward
/// when the question never closes.
pub fn can_vote(question: &Question, now: DateTime<Utc>) -> bool {
    match question.end_at {
        Some(end_at) => question.publish_at <= now && now < end_at,
        None => is_published(question, now),
    }
}

pub fn window_is_valid(publish_at: DateTime<Utc>, end_at: Option<DateTime<Utc>>) -> bool {
    end_at.map_or(true, |end_at| end_at >= publish_at)
}
