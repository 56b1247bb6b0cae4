// src/auth.rs
//! Identity comes from an upstream provider that puts the user handle in a
//! request header. This module only reads it; it never authenticates.

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
    response::Redirect,
};

use crate::{error::AppError, models::UserId, state::SharedState};

pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// An authenticated caller. Anonymous requests are redirected to login.
pub struct AuthUser(pub UserId);

/// The caller's identity when there is one.
pub struct MaybeUser(pub Option<UserId>);

/// Passes only requests carrying the configured admin token.
pub struct AdminGate;

fn user_from_headers(headers: &HeaderMap, header: &str) -> Option<UserId> {
    let value = headers.get(header)?.to_str().ok()?;
    UserId::new(value)
}

impl FromRequestParts<SharedState> for AuthUser {
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, state: &SharedState) -> Result<Self, Self::Rejection> {
        match user_from_headers(&parts.headers, &state.config.auth_user_header) {
            Some(user) => Ok(AuthUser(user)),
            None => Err(Redirect::to(&format!(
                "{}?next={}",
                state.config.login_url,
                parts.uri.path()
            ))),
        }
    }
}

impl FromRequestParts<SharedState> for MaybeUser {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &SharedState) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(user_from_headers(
            &parts.headers,
            &state.config.auth_user_header,
        )))
    }
}

impl FromRequestParts<SharedState> for AdminGate {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &SharedState) -> Result<Self, Self::Rejection> {
        let expected = state.config.admin_token.as_deref().ok_or(AppError::AdminOnly)?;
        let presented = parts
            .headers
            .get(ADMIN_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok());

        if presented.is_some_and(|presented| constant_time_eq(presented, expected)) {
            Ok(AdminGate)
        } else {
            Err(AppError::AdminOnly)
        }
    }
}

/// Compares without short-circuiting on the first differing byte.
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut diff = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        diff |= x ^ y;
    }
    diff == 0
}
