// src/models.rs
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Longest question or choice text accepted.
pub const MAX_TEXT_LEN: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Question {
    pub id: i64,
    pub text: String,
    pub publish_at: DateTime<Utc>,
    pub end_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Choice {
    pub id: i64,
    pub question_id: i64,
    pub text: String,
}

/// A user's single vote on a question. `question_id` mirrors the choice's
/// question so the store can key uniqueness on `(user_id, question_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Vote {
    pub id: Uuid,
    pub user_id: UserId,
    pub question_id: i64,
    pub choice_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Opaque handle for an authenticated user, as issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Returns `None` for blank handles.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewQuestion {
    pub text: String,
    pub publish_at: DateTime<Utc>,
    #[serde(default)]
    pub end_at: Option<DateTime<Utc>>,
    /// Choice texts created together with the question.
    #[serde(default)]
    pub choices: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewChoice {
    pub text: String,
}

/// Submitted vote form. `choice` stays a string so a garbled value is
/// reported the same way as a missing one.
#[derive(Debug, Default, Deserialize)]
pub struct VoteForm {
    pub choice: Option<String>,
}

impl VoteForm {
    pub fn choice_id(&self) -> Option<i64> {
        self.choice.as_deref()?.trim().parse().ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct ChoiceTally {
    pub id: i64,
    pub text: String,
    pub votes: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    Recorded,
    Updated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    NothingToRemove,
}

/// Feedback carried on a redirect as the `notice` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Notice {
    Recorded,
    Updated,
    VoteRemoved,
    NothingToRemove,
}

impl Notice {
    pub fn code(self) -> &'static str {
        match self {
            Notice::Recorded => "recorded",
            Notice::Updated => "updated",
            Notice::VoteRemoved => "vote_removed",
            Notice::NothingToRemove => "nothing_to_remove",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Notice::Recorded => "Your vote was recorded.",
            Notice::Updated => "Your vote was updated.",
            Notice::VoteRemoved => "Your vote was removed.",
            Notice::NothingToRemove => "You have no vote to remove.",
        }
    }
}

impl From<VoteOutcome> for Notice {
    fn from(outcome: VoteOutcome) -> Self {
        match outcome {
            VoteOutcome::Recorded => Notice::Recorded,
            VoteOutcome::Updated => Notice::Updated,
        }
    }
}

impl From<RemoveOutcome> for Notice {
    fn from(outcome: RemoveOutcome) -> Self {
        match outcome {
            RemoveOutcome::Removed => Notice::VoteRemoved,
            RemoveOutcome::NothingToRemove => Notice::NothingToRemove,
        }
    }
}
