// src/services.rs
//! Voting rules on top of a [`PollStore`].

use chrono::{DateTime, Utc};
use tracing::info;

use crate::models::{
    Choice, ChoiceTally, NewChoice, NewQuestion, Question, RemoveOutcome, UserId, Vote,
    VoteOutcome, MAX_TEXT_LEN,
};
use crate::poll::{can_vote, is_published, window_is_valid};
use crate::store::{PollStore, StoreError};

/// How many questions the index lists.
pub const INDEX_LIMIT: i64 = 5;

#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("question not found")]
    NotFound,

    #[error("voting is closed for this question")]
    VotingClosed,

    #[error("you didn't select a choice")]
    InvalidChoice,

    #[error("end time must not be earlier than publish time")]
    InvalidWindow,

    #[error("text must be between 1 and 200 characters")]
    InvalidText,

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type PollResult<T> = Result<T, PollError>;

pub async fn published_questions(store: &dyn PollStore, now: DateTime<Utc>) -> PollResult<Vec<Question>> {
    Ok(store.published_questions(now, INDEX_LIMIT).await?)
}

/// Looks up a question that is visible at `now`; unpublished ones are `NotFound`.
pub async fn published_question(store: &dyn PollStore, id: i64, now: DateTime<Utc>) -> PollResult<Question> {
    match store.question(id).await? {
        Some(question) if is_published(&question, now) => Ok(question),
        _ => Err(PollError::NotFound),
    }
}

pub async fn choices(store: &dyn PollStore, question: &Question) -> PollResult<Vec<Choice>> {
    Ok(store.choices(question.id).await?)
}

/// The caller's current vote. Anonymous callers never have one.
pub async fn vote_for_user(
    store: &dyn PollStore,
    question_id: i64,
    user: Option<&UserId>,
) -> PollResult<Option<Vote>> {
    match user {
        Some(user) => Ok(store.vote(question_id, user).await?),
        None => Ok(None),
    }
}

/// Records `user`'s vote for `choice_id`, replacing any earlier vote on the
/// same question.
pub async fn cast_vote(
    store: &dyn PollStore,
    question_id: i64,
    user: &UserId,
    choice_id: Option<i64>,
    now: DateTime<Utc>,
) -> PollResult<VoteOutcome> {
    let question = store.question(question_id).await?.ok_or(PollError::NotFound)?;
    if !can_vote(&question, now) {
        return Err(PollError::VotingClosed);
    }

    let choice_id = choice_id.ok_or(PollError::InvalidChoice)?;
    let choice = store
        .choice(question.id, choice_id)
        .await?
        .ok_or(PollError::InvalidChoice)?;

    let outcome = match store.upsert_vote(user, question.id, choice.id, now).await {
        Ok(outcome) => outcome,
        // The choice vanished between lookup and write.
        Err(StoreError::Conflict(_)) => return Err(PollError::InvalidChoice),
        Err(e) => return Err(e.into()),
    };

    info!(question = question.id, choice = choice.id, user = %user, ?outcome, "Vote cast");
    Ok(outcome)
}

/// Retracts the user's vote if there is one. Allowed whether or not voting is open.
pub async fn remove_vote(store: &dyn PollStore, question_id: i64, user: &UserId) -> PollResult<RemoveOutcome> {
    let question = store.question(question_id).await?.ok_or(PollError::NotFound)?;

    if store.delete_vote(question.id, user).await? {
        info!(question = question.id, user = %user, "Vote removed");
        Ok(RemoveOutcome::Removed)
    } else {
        Ok(RemoveOutcome::NothingToRemove)
    }
}

pub async fn results(store: &dyn PollStore, question: &Question) -> PollResult<Vec<ChoiceTally>> {
    Ok(store.tallies(question.id).await?)
}

pub async fn create_question(store: &dyn PollStore, new: NewQuestion) -> PollResult<(Question, Vec<Choice>)> {
    let text = validate_text(&new.text)?;
    if !window_is_valid(new.publish_at, new.end_at) {
        return Err(PollError::InvalidWindow);
    }
    let choice_texts = new
        .choices
        .iter()
        .map(|choice| validate_text(choice))
        .collect::<PollResult<Vec<_>>>()?;

    let (question, choices) = store
        .insert_question(text, new.publish_at, new.end_at, &choice_texts)
        .await?;

    info!(question = question.id, choices = choices.len(), "Question created");
    Ok((question, choices))
}

pub async fn add_choice(store: &dyn PollStore, question_id: i64, new: NewChoice) -> PollResult<Choice> {
    let text = validate_text(&new.text)?;
    let question = store.question(question_id).await?.ok_or(PollError::NotFound)?;
    let choice = store.insert_choice(question.id, text).await?;
    info!(question = question.id, choice = choice.id, "Choice added");
    Ok(choice)
}

pub async fn delete_question(store: &dyn PollStore, id: i64) -> PollResult<()> {
    if store.delete_question(id).await? {
        info!(question = id, "Question deleted");
        Ok(())
    } else {
        Err(PollError::NotFound)
    }
}

fn validate_text(text: &str) -> PollResult<&str> {
    let text = text.trim();
    if text.is_empty() || text.chars().count() > MAX_TEXT_LEN {
        return Err(PollError::InvalidText);
    }
    Ok(text)
}
