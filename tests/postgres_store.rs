//! Runs against a live database: `DATABASE_URL=... cargo test -- --ignored`.

use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use sqlx::postgres::PgPoolOptions;

use polls::{
    db::{self, PgStore},
    models::{NewQuestion, RemoveOutcome, UserId, VoteOutcome},
    services,
    store::{PollStore, StoreError},
};

async fn store() -> PgStore {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPoolOptions::new().max_connections(5).connect(&url).await.unwrap();
    db::migrate(&pool).await.unwrap();
    PgStore::new(pool)
}

#[tokio::test]
#[ignore = "needs DATABASE_URL"]
async fn vote_lifecycle_keeps_one_row_per_user() {
    let store = store().await;
    let now = Utc::now();
    let (q, choices) = services::create_question(
        &store,
        NewQuestion {
            text: "Postgres lifecycle".into(),
            publish_at: now - TimeDelta::days(1),
            end_at: None,
            choices: vec!["A".into(), "B".into()],
        },
    )
    .await
    .unwrap();
    let user = UserId::new(format!("pg-{}", uuid::Uuid::new_v4())).unwrap();

    let first = services::cast_vote(&store, q.id, &user, Some(choices[0].id), now).await.unwrap();
    let second = services::cast_vote(&store, q.id, &user, Some(choices[1].id), now).await.unwrap();
    assert_eq!(first, VoteOutcome::Recorded);
    assert_eq!(second, VoteOutcome::Updated);

    let tallies = store.tallies(q.id).await.unwrap();
    assert_eq!(tallies.iter().map(|t| t.votes).collect::<Vec<_>>(), [0, 1]);

    assert_eq!(
        services::remove_vote(&store, q.id, &user).await.unwrap(),
        RemoveOutcome::Removed
    );
    assert!(store.vote(q.id, &user).await.unwrap().is_none());

    services::delete_question(&store, q.id).await.unwrap();
}

#[tokio::test]
#[ignore = "needs DATABASE_URL"]
async fn concurrent_casts_never_duplicate() {
    let store = Arc::new(store().await);
    let now = Utc::now();
    let (q, choices) = services::create_question(
        store.as_ref(),
        NewQuestion {
            text: "Postgres race".into(),
            publish_at: now - TimeDelta::days(1),
            end_at: None,
            choices: vec!["A".into(), "B".into()],
        },
    )
    .await
    .unwrap();
    let user = UserId::new(format!("pg-{}", uuid::Uuid::new_v4())).unwrap();

    let question_id = q.id;
    let mut handles = Vec::new();
    for i in 0..8 {
        let store = store.clone();
        let user = user.clone();
        let choice = choices[i % 2].id;
        handles.push(tokio::spawn(async move {
            store.upsert_vote(&user, question_id, choice, Utc::now()).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let total: i64 = store.tallies(q.id).await.unwrap().iter().map(|t| t.votes).sum();
    assert_eq!(total, 1);

    services::delete_question(store.as_ref(), q.id).await.unwrap();
}

#[tokio::test]
#[ignore = "needs DATABASE_URL"]
async fn foreign_choice_violates_constraint() {
    let store = store().await;
    let now = Utc::now();
    let new = |text: &str| NewQuestion {
        text: text.into(),
        publish_at: now,
        end_at: None,
        choices: vec!["only".into()],
    };
    let (a, _) = services::create_question(&store, new("a")).await.unwrap();
    let (b, b_choices) = services::create_question(&store, new("b")).await.unwrap();
    let user = UserId::new("pg-foreign").unwrap();

    let result = store.upsert_vote(&user, a.id, b_choices[0].id, now).await;
    assert!(matches!(result, Err(StoreError::Conflict(_))));

    services::delete_question(&store, a.id).await.unwrap();
    services::delete_question(&store, b.id).await.unwrap();
}

#[tokio::test]
#[ignore = "needs DATABASE_URL"]
async fn failed_choice_insert_leaves_no_question_behind() {
    let store = store().await;
    let now = Utc::now();
    let text = format!("pg-atomic-{}", uuid::Uuid::new_v4());
    let too_long = "x".repeat(201);

    let result = store
        .insert_question(&text, now - TimeDelta::days(1), None, &["fine", too_long.as_str()])
        .await;
    assert!(result.is_err());

    let listed = store.published_questions(now, i64::MAX).await.unwrap();
    assert!(listed.iter().all(|q| q.text != text));
}
