// src/memory.rs
//! In-process [`PollStore`] used by tests and local runs without Postgres.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{Choice, ChoiceTally, Question, UserId, Vote, VoteOutcome};
use crate::store::{PollStore, StoreError, StoreResult};

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    questions: BTreeMap<i64, Question>,
    choices: BTreeMap<i64, Choice>,
    votes: Vec<Vote>,
    next_question_id: i64,
    next_choice_id: i64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of vote rows for a question, across all users.
    pub fn vote_rows(&self, question_id: i64) -> usize {
        self.lock()
            .votes
            .iter()
            .filter(|vote| vote.question_id == question_id)
            .count()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl PollStore for MemoryStore {
    async fn published_questions(&self, now: DateTime<Utc>, limit: i64) -> StoreResult<Vec<Question>> {
        let state = self.lock();
        let mut questions: Vec<Question> = state
            .questions
            .values()
            .filter(|q| q.publish_at <= now)
            .cloned()
            .collect();
        questions.sort_by(|a, b| b.publish_at.cmp(&a.publish_at).then(b.id.cmp(&a.id)));
        questions.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(questions)
    }

    async fn question(&self, id: i64) -> StoreResult<Option<Question>> {
        Ok(self.lock().questions.get(&id).cloned())
    }

    async fn insert_question(
        &self,
        text: &str,
        publish_at: DateTime<Utc>,
        end_at: Option<DateTime<Utc>>,
        choices: &[&str],
    ) -> StoreResult<(Question, Vec<Choice>)> {
        let mut state = self.lock();
        state.next_question_id += 1;
        let question = Question {
            id: state.next_question_id,
            text: text.to_string(),
            publish_at,
            end_at,
        };
        state.questions.insert(question.id, question.clone());

        let mut inserted = Vec::with_capacity(choices.len());
        for choice_text in choices {
            state.next_choice_id += 1;
            let choice = Choice {
                id: state.next_choice_id,
                question_id: question.id,
                text: choice_text.to_string(),
            };
            state.choices.insert(choice.id, choice.clone());
            inserted.push(choice);
        }
        Ok((question, inserted))
    }

    async fn delete_question(&self, id: i64) -> StoreResult<bool> {
        let mut state = self.lock();
        if state.questions.remove(&id).is_none() {
            return Ok(false);
        }
        state.choices.retain(|_, choice| choice.question_id != id);
        state.votes.retain(|vote| vote.question_id != id);
        Ok(true)
    }

    async fn choices(&self, question_id: i64) -> StoreResult<Vec<Choice>> {
        Ok(self
            .lock()
            .choices
            .values()
            .filter(|choice| choice.question_id == question_id)
            .cloned()
            .collect())
    }

    async fn choice(&self, question_id: i64, choice_id: i64) -> StoreResult<Option<Choice>> {
        Ok(self
            .lock()
            .choices
            .get(&choice_id)
            .filter(|choice| choice.question_id == question_id)
            .cloned())
    }

    async fn insert_choice(&self, question_id: i64, text: &str) -> StoreResult<Choice> {
        let mut state = self.lock();
        if !state.questions.contains_key(&question_id) {
            return Err(StoreError::Conflict(format!(
                "question {question_id} does not exist"
            )));
        }
        state.next_choice_id += 1;
        let choice = Choice {
            id: state.next_choice_id,
            question_id,
            text: text.to_string(),
        };
        state.choices.insert(choice.id, choice.clone());
        Ok(choice)
    }

    async fn vote(&self, question_id: i64, user: &UserId) -> StoreResult<Option<Vote>> {
        Ok(self
            .lock()
            .votes
            .iter()
            .find(|vote| vote.question_id == question_id && &vote.user_id == user)
            .cloned())
    }

    async fn upsert_vote(
        &self,
        user: &UserId,
        question_id: i64,
        choice_id: i64,
        now: DateTime<Utc>,
    ) -> StoreResult<VoteOutcome> {
        let mut state = self.lock();
        let belongs = state
            .choices
            .get(&choice_id)
            .is_some_and(|choice| choice.question_id == question_id);
        if !belongs {
            return Err(StoreError::Conflict(format!(
                "choice {choice_id} is not part of question {question_id}"
            )));
        }

        // Lookup and write happen under the same lock.
        if let Some(existing) = state
            .votes
            .iter_mut()
            .find(|vote| vote.question_id == question_id && &vote.user_id == user)
        {
            existing.choice_id = choice_id;
            existing.updated_at = now;
            return Ok(VoteOutcome::Updated);
        }

        state.votes.push(Vote {
            id: Uuid::new_v4(),
            user_id: user.clone(),
            question_id,
            choice_id,
            created_at: now,
            updated_at: now,
        });
        Ok(VoteOutcome::Recorded)
    }

    async fn delete_vote(&self, question_id: i64, user: &UserId) -> StoreResult<bool> {
        let mut state = self.lock();
        let before = state.votes.len();
        state
            .votes
            .retain(|vote| !(vote.question_id == question_id && &vote.user_id == user));
        Ok(state.votes.len() != before)
    }

    async fn tallies(&self, question_id: i64) -> StoreResult<Vec<ChoiceTally>> {
        let state = self.lock();
        Ok(state
            .choices
            .values()
            .filter(|choice| choice.question_id == question_id)
            .map(|choice| ChoiceTally {
                id: choice.id,
                text: choice.text.clone(),
                votes: state
                    .votes
                    .iter()
                    .filter(|vote| vote.choice_id == choice.id)
                    .count() as i64,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn user(name: &str) -> UserId {
        UserId::new(name).unwrap()
    }

    #[tokio::test]
    async fn published_questions_are_newest_first_and_limited() {
        let store = MemoryStore::new();
        let now = Utc::now();
        for days in [-30, -5, -1, 3] {
            store
                .insert_question(&format!("q{days}"), now + TimeDelta::days(days), None, &[])
                .await
                .unwrap();
        }

        let listed = store.published_questions(now, 2).await.unwrap();
        let texts: Vec<_> = listed.iter().map(|q| q.text.as_str()).collect();
        assert_eq!(texts, ["q-1", "q-5"]);
    }

    #[tokio::test]
    async fn question_is_created_with_its_choices() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let (q, choices) = store
            .insert_question("colour", now, None, &["red", "blue"])
            .await
            .unwrap();

        assert_eq!(choices.len(), 2);
        assert!(choices.iter().all(|c| c.question_id == q.id));
        assert_eq!(store.choices(q.id).await.unwrap(), choices);
    }

    #[tokio::test]
    async fn choice_lookup_is_scoped_to_question() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let a = store.insert_question("a", now, None, &[]).await.unwrap().0;
        let b = store.insert_question("b", now, None, &[]).await.unwrap().0;
        let choice = store.insert_choice(a.id, "yes").await.unwrap();

        assert!(store.choice(a.id, choice.id).await.unwrap().is_some());
        assert!(store.choice(b.id, choice.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn upsert_refuses_foreign_choice() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let a = store.insert_question("a", now, None, &[]).await.unwrap().0;
        let b = store.insert_question("b", now, None, &[]).await.unwrap().0;
        let foreign = store.insert_choice(b.id, "no").await.unwrap();

        let result = store.upsert_vote(&user("alice"), a.id, foreign.id, now).await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
        assert_eq!(store.vote_rows(a.id), 0);
    }

    #[tokio::test]
    async fn deleting_question_cascades() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let q = store.insert_question("a", now, None, &[]).await.unwrap().0;
        let c = store.insert_choice(q.id, "yes").await.unwrap();
        store.upsert_vote(&user("alice"), q.id, c.id, now).await.unwrap();

        assert!(store.delete_question(q.id).await.unwrap());
        assert!(store.choices(q.id).await.unwrap().is_empty());
        assert_eq!(store.vote_rows(q.id), 0);
        assert!(!store.delete_question(q.id).await.unwrap());
    }
}
