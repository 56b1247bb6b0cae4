// src/routes.rs
use std::time::Duration;

use axum::{
    routing::{delete, get, post},
    Router,
};
use http::{header::CONTENT_TYPE, Method};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers;
use crate::state::SharedState;

pub fn create_routes(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/polls", get(handlers::index))
        .route("/polls/{id}", get(handlers::detail))
        .route("/polls/{id}/results", get(handlers::results))
        .route("/polls/{id}/vote", post(handlers::vote))
        .route("/polls/{id}/vote/remove", post(handlers::remove_vote))
        .route("/admin/questions", post(handlers::create_question))
        .route("/admin/questions/{id}", delete(handlers::delete_question))
        .route("/admin/questions/{id}/choices", post(handlers::add_choice))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
