// src/handlers.rs
use axum::{
    extract::{rejection::FormRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::{AdminGate, AuthUser, MaybeUser};
use crate::error::AppError;
use crate::models::{NewChoice, NewQuestion, Notice, Question, UserId, VoteForm};
use crate::poll::{can_vote, was_published_recently};
use crate::services::{self, PollError};
use crate::state::SharedState;

#[derive(Debug, Default, Deserialize)]
pub struct NoticeQuery {
    pub notice: Option<Notice>,
}

fn question_json(question: &Question, now: DateTime<Utc>) -> Value {
    json!({
        "id": question.id,
        "text": question.text,
        "publish_at": question.publish_at,
        "end_at": question.end_at,
        "was_published_recently": was_published_recently(question, now),
        "can_vote": can_vote(question, now),
    })
}

/// Detail document: the question, its choices and the caller's current pick.
async fn detail_view(
    state: &SharedState,
    question: &Question,
    user: Option<&UserId>,
    error_message: Option<&str>,
    notice: Option<Notice>,
    now: DateTime<Utc>,
) -> Result<Value, AppError> {
    let store = state.store.as_ref();
    let choices = services::choices(store, question).await?;
    let selected = services::vote_for_user(store, question.id, user).await?;

    Ok(json!({
        "question": question_json(question, now),
        "choices": choices,
        "selected_choice": selected.map(|vote| vote.choice_id),
        "error_message": error_message,
        "message": notice.map(Notice::message),
    }))
}

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Latest published questions, newest first.
pub async fn index(State(state): State<SharedState>) -> Result<Json<Value>, AppError> {
    let now = Utc::now();
    let questions = services::published_questions(state.store.as_ref(), now).await?;
    let message = questions.is_empty().then_some("No polls are available.");
    let questions: Vec<Value> = questions.iter().map(|q| question_json(q, now)).collect();

    Ok(Json(json!({
        "latest_question_list": questions,
        "message": message,
    })))
}

pub async fn detail(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    MaybeUser(user): MaybeUser,
    Query(query): Query<NoticeQuery>,
) -> Result<Json<Value>, AppError> {
    let now = Utc::now();
    let question = services::published_question(state.store.as_ref(), id, now).await?;
    let view = detail_view(&state, &question, user.as_ref(), None, query.notice, now).await?;
    Ok(Json(view))
}

pub async fn results(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Query(query): Query<NoticeQuery>,
) -> Result<Json<Value>, AppError> {
    let now = Utc::now();
    let store = state.store.as_ref();
    let question = services::published_question(store, id, now).await?;
    let tallies = services::results(store, &question).await?;
    let total: i64 = tallies.iter().map(|tally| tally.votes).sum();

    Ok(Json(json!({
        "question": question_json(&question, now),
        "choices": tallies,
        "total_votes": total,
        "message": query.notice.map(Notice::message),
    })))
}

/// Casts or changes the caller's vote. Success redirects to the results;
/// a bad choice or a closed poll re-renders the detail with an error.
pub async fn vote(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    AuthUser(user): AuthUser,
    form: Result<Form<VoteForm>, FormRejection>,
) -> Result<Response, AppError> {
    let now = Utc::now();
    let choice_id = form.ok().and_then(|Form(form)| form.choice_id());

    match services::cast_vote(state.store.as_ref(), id, &user, choice_id, now).await {
        Ok(outcome) => {
            let notice = Notice::from(outcome);
            Ok(Redirect::to(&format!("/polls/{id}/results?notice={}", notice.code())).into_response())
        }
        Err(e @ (PollError::InvalidChoice | PollError::VotingClosed)) => {
            let (status, message) = match e {
                PollError::VotingClosed => (StatusCode::FORBIDDEN, "Voting is disabled."),
                _ => (StatusCode::BAD_REQUEST, "You didn't select a choice."),
            };
            // Unpublished questions stay hidden even on a failed vote.
            let question = services::published_question(state.store.as_ref(), id, now).await?;
            let view = detail_view(&state, &question, Some(&user), Some(message), None, now).await?;
            Ok((status, Json(view)).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn remove_vote(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    AuthUser(user): AuthUser,
) -> Result<Redirect, AppError> {
    let outcome = services::remove_vote(state.store.as_ref(), id, &user).await?;
    let notice = Notice::from(outcome);
    Ok(Redirect::to(&format!("/polls/{id}?notice={}", notice.code())))
}

pub async fn create_question(
    State(state): State<SharedState>,
    _admin: AdminGate,
    Json(new): Json<NewQuestion>,
) -> Result<impl IntoResponse, AppError> {
    let (question, choices) = services::create_question(state.store.as_ref(), new).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "question": question, "choices": choices })),
    ))
}

pub async fn add_choice(
    State(state): State<SharedState>,
    _admin: AdminGate,
    Path(id): Path<i64>,
    Json(new): Json<NewChoice>,
) -> Result<impl IntoResponse, AppError> {
    let choice = services::add_choice(state.store.as_ref(), id, new).await?;
    Ok((StatusCode::CREATED, Json(choice)))
}

pub async fn delete_question(
    State(state): State<SharedState>,
    _admin: AdminGate,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    services::delete_question(state.store.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
