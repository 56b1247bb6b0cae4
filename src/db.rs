// src/db.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use tracing::info;
use uuid::Uuid;

use crate::config::Config;
use crate::models::{Choice, ChoiceTally, Question, UserId, Vote, VoteOutcome};
use crate::store::{PollStore, StoreError, StoreResult};

pub async fn create_pool(config: &Config) -> Result<Pool<Postgres>, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
}

pub async fn migrate(pool: &Pool<Postgres>) -> StoreResult<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Database migrations applied");
    Ok(())
}

/// Postgres-backed store. The `votes_user_question` unique constraint keeps
/// a user to a single vote row per question.
#[derive(Clone)]
pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn constraint_error(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_foreign_key_violation() || db.is_unique_violation() || db.is_check_violation() {
            return StoreError::Conflict(db.message().to_string());
        }
    }
    StoreError::Database(e)
}

#[async_trait]
impl PollStore for PgStore {
    async fn published_questions(&self, now: DateTime<Utc>, limit: i64) -> StoreResult<Vec<Question>> {
        let questions = sqlx::query_as::<_, Question>(
            "SELECT id, text, publish_at, end_at FROM questions
             WHERE publish_at <= $1
             ORDER BY publish_at DESC, id DESC
             LIMIT $2",
        )
        .bind(now)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(questions)
    }

    async fn question(&self, id: i64) -> StoreResult<Option<Question>> {
        let question = sqlx::query_as::<_, Question>(
            "SELECT id, text, publish_at, end_at FROM questions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(question)
    }

    async fn insert_question(
        &self,
        text: &str,
        publish_at: DateTime<Utc>,
        end_at: Option<DateTime<Utc>>,
        choices: &[&str],
    ) -> StoreResult<(Question, Vec<Choice>)> {
        // Dropping the transaction without commit rolls everything back.
        let mut tx = self.pool.begin().await?;

        let question = sqlx::query_as::<_, Question>(
            "INSERT INTO questions (text, publish_at, end_at) VALUES ($1, $2, $3)
             RETURNING id, text, publish_at, end_at",
        )
        .bind(text)
        .bind(publish_at)
        .bind(end_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(constraint_error)?;

        let mut inserted = Vec::with_capacity(choices.len());
        for choice_text in choices {
            let choice = sqlx::query_as::<_, Choice>(
                "INSERT INTO choices (question_id, text) VALUES ($1, $2)
                 RETURNING id, question_id, text",
            )
            .bind(question.id)
            .bind(*choice_text)
            .fetch_one(&mut *tx)
            .await
            .map_err(constraint_error)?;
            inserted.push(choice);
        }

        tx.commit().await?;
        Ok((question, inserted))
    }

    async fn delete_question(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM questions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn choices(&self, question_id: i64) -> StoreResult<Vec<Choice>> {
        let choices = sqlx::query_as::<_, Choice>(
            "SELECT id, question_id, text FROM choices WHERE question_id = $1 ORDER BY id",
        )
        .bind(question_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(choices)
    }

    async fn choice(&self, question_id: i64, choice_id: i64) -> StoreResult<Option<Choice>> {
        let choice = sqlx::query_as::<_, Choice>(
            "SELECT id, question_id, text FROM choices WHERE id = $1 AND question_id = $2",
        )
        .bind(choice_id)
        .bind(question_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(choice)
    }

    async fn insert_choice(&self, question_id: i64, text: &str) -> StoreResult<Choice> {
        sqlx::query_as::<_, Choice>(
            "INSERT INTO choices (question_id, text) VALUES ($1, $2)
             RETURNING id, question_id, text",
        )
        .bind(question_id)
        .bind(text)
        .fetch_one(&self.pool)
        .await
        .map_err(constraint_error)
    }

    async fn vote(&self, question_id: i64, user: &UserId) -> StoreResult<Option<Vote>> {
        let vote = sqlx::query_as::<_, Vote>(
            "SELECT id, user_id, question_id, choice_id, created_at, updated_at FROM votes
             WHERE question_id = $1 AND user_id = $2",
        )
        .bind(question_id)
        .bind(user.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(vote)
    }

    async fn upsert_vote(
        &self,
        user: &UserId,
        question_id: i64,
        choice_id: i64,
        now: DateTime<Utc>,
    ) -> StoreResult<VoteOutcome> {
        // xmax is zero only for rows this statement inserted.
        let inserted = sqlx::query_scalar::<_, bool>(
            r#"
            INSERT INTO votes (id, user_id, question_id, choice_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            ON CONFLICT (user_id, question_id) DO UPDATE
            SET choice_id = EXCLUDED.choice_id, updated_at = EXCLUDED.updated_at
            RETURNING (xmax = 0) AS inserted
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user.as_str())
        .bind(question_id)
        .bind(choice_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(constraint_error)?;

        Ok(if inserted {
            VoteOutcome::Recorded
        } else {
            VoteOutcome::Updated
        })
    }

    async fn delete_vote(&self, question_id: i64, user: &UserId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM votes WHERE question_id = $1 AND user_id = $2")
            .bind(question_id)
            .bind(user.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn tallies(&self, question_id: i64) -> StoreResult<Vec<ChoiceTally>> {
        let tallies = sqlx::query_as::<_, ChoiceTally>(
            "SELECT c.id, c.text, COUNT(v.id) AS votes
             FROM choices c
             LEFT JOIN votes v ON v.choice_id = c.id
             WHERE c.question_id = $1
             GROUP BY c.id, c.text
             ORDER BY c.id",
        )
        .bind(question_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(tallies)
    }
}
