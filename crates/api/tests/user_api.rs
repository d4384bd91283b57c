//! Integration tests for user registration, grants, history, and the
//! submission gates that reject before any provider call.

mod common;

use axum::http::StatusCode;
use common::{expect_json, get, post_json};
use serde_json::json;
use sqlx::PgPool;

use melodia_db::models::job::{JobArtifacts, NewJob};
use melodia_db::repositories::{JobRepo, UserRepo};

#[sqlx::test(migrations = "../db/migrations")]
async fn signup_grants_free_credits_through_ledger(pool: PgPool) {
    let app = common::build_test_app(pool.clone());

    let response = post_json(
        app.clone(),
        "/api/v1/users",
        json!({ "display_name": "newbie" }),
    )
    .await;
    let json = expect_json(response, StatusCode::OK).await;
    let user_id = json["data"]["id"].as_i64().expect("user id");
    assert_eq!(json["data"]["free_credits"], 2);
    assert_eq!(json["data"]["paid_credits"], 0);

    let response = get(app, &format!("/api/v1/users/{user_id}/ledger")).await;
    let json = expect_json(response, StatusCode::OK).await;
    let entries = json["data"].as_array().expect("entries");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["source"], "signup_bonus");
    assert_eq!(entries[0]["delta"], 2);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn referral_rewards_the_referrer(pool: PgPool) {
    let referrer = UserRepo::create(&pool, Some("veteran"), 0, None)
        .await
        .expect("create referrer");
    let app = common::build_test_app(pool.clone());

    let response = post_json(
        app,
        "/api/v1/users",
        json!({ "display_name": "friend", "referred_by": referrer.id }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let referrer = UserRepo::find_by_id(&pool, referrer.id)
        .await
        .expect("query")
        .expect("exists");
    assert_eq!(referrer.free_credits, 1);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn grant_credits_and_read_balance(pool: PgPool) {
    let user = UserRepo::create(&pool, Some("buyer"), 0, None)
        .await
        .expect("create user");
    let app = common::build_test_app(pool.clone());

    let response = post_json(
        app.clone(),
        &format!("/api/v1/users/{}/grants", user.id),
        json!({
            "pool": "paid",
            "amount": 10,
            "source": "purchase",
            "description": "starter pack"
        }),
    )
    .await;
    let json = expect_json(response, StatusCode::OK).await;
    assert_eq!(json["data"]["paid_credits"], 10);

    let response = get(app, &format!("/api/v1/users/{}", user.id)).await;
    let json = expect_json(response, StatusCode::OK).await;
    assert_eq!(json["data"]["paid_credits"], 10);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn grant_rejects_debit_sources(pool: PgPool) {
    let user = UserRepo::create(&pool, Some("buyer"), 0, None)
        .await
        .expect("create user");
    let app = common::build_test_app(pool.clone());

    let response = post_json(
        app,
        &format!("/api/v1/users/{}/grants", user.id),
        json!({
            "pool": "paid",
            "amount": 1,
            "source": "generation_debit",
            "description": "sneaky"
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn unknown_user_returns_404(pool: PgPool) {
    let app = common::build_test_app(pool);

    let response = get(app, "/api/v1/users/999999").await;
    let json = expect_json(response, StatusCode::NOT_FOUND).await;
    assert_eq!(json["code"], "NOT_FOUND");
}

// ---- submission gates (rejected before any provider call) ----

#[sqlx::test(migrations = "../db/migrations")]
async fn broke_user_cannot_submit(pool: PgPool) {
    let user = UserRepo::create(&pool, Some("broke"), 0, None)
        .await
        .expect("create user");
    let app = common::build_test_app(pool);

    let response = post_json(
        app,
        "/api/v1/generations",
        json!({
            "user_id": user.id,
            "prompt": "a song about rain",
            "mode": "description"
        }),
    )
    .await;
    let json = expect_json(response, StatusCode::PAYMENT_REQUIRED).await;
    assert_eq!(json["code"], "INSUFFICIENT_CREDITS");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn blocked_user_cannot_submit(pool: PgPool) {
    let user = UserRepo::create(&pool, Some("banned"), 5, None)
        .await
        .expect("create user");
    for _ in 0..3 {
        UserRepo::increment_violations(&pool, user.id)
            .await
            .expect("violation");
    }
    let app = common::build_test_app(pool);

    let response = post_json(
        app,
        "/api/v1/generations",
        json!({
            "user_id": user.id,
            "prompt": "a song about rain",
            "mode": "description"
        }),
    )
    .await;
    let json = expect_json(response, StatusCode::FORBIDDEN).await;
    assert_eq!(json["code"], "USER_BLOCKED");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn empty_prompt_is_rejected(pool: PgPool) {
    let user = UserRepo::create(&pool, Some("quiet"), 2, None)
        .await
        .expect("create user");
    let app = common::build_test_app(pool);

    let response = post_json(
        app,
        "/api/v1/generations",
        json!({
            "user_id": user.id,
            "prompt": "   ",
            "mode": "description"
        }),
    )
    .await;
    let json = expect_json(response, StatusCode::BAD_REQUEST).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn daily_limit_rejects_submission(pool: PgPool) {
    let user = UserRepo::create(&pool, Some("prolific"), 50, None)
        .await
        .expect("create user");
    // Fill today's quota (test config caps at 10 per user per day).
    for n in 0..10 {
        let job = JobRepo::create(
            &pool,
            user.id,
            &NewJob {
                prompt: format!("song {n}"),
                style: "pop".into(),
                voice_gender: None,
                mode: "description".into(),
                is_free_tier: true,
            },
        )
        .await
        .expect("create job");
        JobRepo::mark_submitted(&pool, job.id, &format!("task-quota-{n}"))
            .await
            .expect("submit");
    }
    let app = common::build_test_app(pool);

    let response = post_json(
        app,
        "/api/v1/generations",
        json!({
            "user_id": user.id,
            "prompt": "one more",
            "mode": "description"
        }),
    )
    .await;
    let json = expect_json(response, StatusCode::TOO_MANY_REQUESTS).await;
    assert_eq!(json["code"], "RATE_LIMITED");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn user_history_lists_recent_jobs(pool: PgPool) {
    let user = UserRepo::create(&pool, Some("regular"), 5, None)
        .await
        .expect("create user");
    for n in 0..3 {
        let job = JobRepo::create(
            &pool,
            user.id,
            &NewJob {
                prompt: format!("song {n}"),
                style: "pop".into(),
                voice_gender: None,
                mode: "description".into(),
                is_free_tier: true,
            },
        )
        .await
        .expect("create job");
        JobRepo::mark_submitted(&pool, job.id, &format!("task-hist-{n}"))
            .await
            .expect("submit");
        let mut conn = pool.acquire().await.expect("acquire");
        JobRepo::claim_complete(&mut conn, job.id, &JobArtifacts::default(), 0)
            .await
            .expect("complete");
    }
    let app = common::build_test_app(pool);

    let response = get(app, &format!("/api/v1/users/{}/generations?limit=2", user.id)).await;
    let json = expect_json(response, StatusCode::OK).await;
    assert_eq!(json["data"].as_array().expect("jobs").len(), 2);
}
