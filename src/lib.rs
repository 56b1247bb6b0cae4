//! Polls: publish questions, collect one vote per user, show results.
//!
//! The voting rules live in [`poll`] (publication and voting windows) and
//! [`services`] (casting, changing and retracting votes). Storage sits behind
//! [`store::PollStore`], implemented for Postgres in [`db`] and in memory in
//! [`memory`].

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod memory;
pub mod models;
pub mod poll;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
