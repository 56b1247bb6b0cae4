// src/store.rs
//! Storage seam between the voting service and a concrete database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{Choice, ChoiceTally, Question, UserId, Vote, VoteOutcome};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A write violated a store-level constraint.
    #[error("constraint violated: {0}")]
    Conflict(String),
}

/// Question, choice and vote persistence.
///
/// Implementations must make [`PollStore::upsert_vote`] atomic per
/// `(user, question)` so concurrent submissions never leave two rows.
#[async_trait]
pub trait PollStore: Send + Sync {
    /// Questions with `publish_at <= now`, newest first.
    async fn published_questions(&self, now: DateTime<Utc>, limit: i64) -> StoreResult<Vec<Question>>;

    async fn question(&self, id: i64) -> StoreResult<Option<Question>>;

    /// Creates the question together with its initial choices. Either all
    /// rows are written or none are.
    async fn insert_question(
        &self,
        text: &str,
        publish_at: DateTime<Utc>,
        end_at: Option<DateTime<Utc>>,
        choices: &[&str],
    ) -> StoreResult<(Question, Vec<Choice>)>;

    /// Deletes the question with its choices and votes. Returns false if absent.
    async fn delete_question(&self, id: i64) -> StoreResult<bool>;

    /// Choices of a question, ordered by id.
    async fn choices(&self, question_id: i64) -> StoreResult<Vec<Choice>>;

    /// Looks up a choice only within the given question.
    async fn choice(&self, question_id: i64, choice_id: i64) -> StoreResult<Option<Choice>>;

    async fn insert_choice(&self, question_id: i64, text: &str) -> StoreResult<Choice>;

    async fn vote(&self, question_id: i64, user: &UserId) -> StoreResult<Option<Vote>>;

    /// Creates the user's vote or re-points the existing one at `choice_id`.
    async fn upsert_vote(
        &self,
        user: &UserId,
        question_id: i64,
        choice_id: i64,
        now: DateTime<Utc>,
    ) -> StoreResult<VoteOutcome>;

    /// Returns false when the user had no vote on the question.
    async fn delete_vote(&self, question_id: i64, user: &UserId) -> StoreResult<bool>;

    /// Live vote counts per choice, ordered by choice id.
    async fn tallies(&self, question_id: i64) -> StoreResult<Vec<ChoiceTally>>;
}
