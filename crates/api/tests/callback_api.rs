//! Integration tests for the provider callback endpoints: acknowledgement
//! policy, the idempotent completion claim, and debit behaviour end to end.

mod common;

use axum::http::StatusCode;
use common::{body_json, post_json};
use serde_json::json;
use sqlx::PgPool;

use melodia_core::policy::CreditPool;
use melodia_db::models::job::NewJob;
use melodia_db::models::status::{JobStatus, LedgerSource};
use melodia_db::repositories::{JobRepo, LedgerRepo, UserRepo, VideoTaskRepo};

async fn seed_submitted_job(pool: &PgPool, free_credits: i32, task_id: &str) -> (i64, i64) {
    let user = UserRepo::create(pool, Some("tester"), free_credits, None)
        .await
        .expect("create user");
    let job = JobRepo::create(
        pool,
        user.id,
        &NewJob {
            prompt: "a song about rain".into(),
            style: "pop".into(),
            voice_gender: None,
            mode: "description".into(),
            is_free_tier: true,
        },
    )
    .await
    .expect("create job");
    assert!(JobRepo::mark_submitted(pool, job.id, task_id)
        .await
        .expect("mark submitted"));
    (user.id, job.id)
}

fn success_callback(task_id: &str) -> serde_json::Value {
    json!({
        "code": 200,
        "msg": "success",
        "data": {
            "taskId": task_id,
            "callbackType": "complete",
            "data": [
                {
                    "id": "song-1",
                    "audioUrl": "https://cdn.example/a.mp3",
                    "imageUrl": "https://cdn.example/a.jpg",
                    "title": "Rainy Day"
                }
            ]
        }
    })
}

#[sqlx::test(migrations = "../db/migrations")]
async fn success_callback_completes_and_debits_once(pool: PgPool) {
    let (user_id, job_id) = seed_submitted_job(&pool, 2, "task-cb-1").await;
    let app = common::build_test_app(pool.clone());

    let response = post_json(app.clone(), "/callback/suno", success_callback("task-cb-1")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");

    let job = JobRepo::find_by_id(&pool, job_id)
        .await
        .expect("query")
        .expect("exists");
    assert_eq!(job.status, JobStatus::Complete);
    assert_eq!(job.audio_urls, vec!["https://cdn.example/a.mp3"]);
    assert_eq!(job.credits_spent, 0, "free tier records zero spent");

    let user = UserRepo::find_by_id(&pool, user_id)
        .await
        .expect("query")
        .expect("exists");
    assert_eq!(user.free_credits, 1);

    // The provider retries; the duplicate is acknowledged without effect.
    let response = post_json(app, "/callback/suno", success_callback("task-cb-1")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let entries = LedgerRepo::entries(&pool, user_id).await.expect("entries");
    let debits: Vec<_> = entries
        .iter()
        .filter(|e| e.source == LedgerSource::GenerationDebit)
        .collect();
    assert_eq!(debits.len(), 1, "retried callback must not debit again");
    assert_eq!(debits[0].delta, -1);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn error_callback_fails_job_without_charge(pool: PgPool) {
    let (user_id, job_id) = seed_submitted_job(&pool, 2, "task-cb-2").await;
    let app = common::build_test_app(pool.clone());

    let payload = json!({
        "code": 400,
        "msg": "generation failed: content policy violation",
        "data": { "taskId": "task-cb-2" }
    });
    let response = post_json(app, "/callback/suno", payload).await;
    assert_eq!(response.status(), StatusCode::OK);

    let job = JobRepo::find_by_id(&pool, job_id)
        .await
        .expect("query")
        .expect("exists");
    assert_eq!(job.status, JobStatus::Error);
    assert_eq!(job.error_message.as_deref(), Some("content_policy"));

    let user = UserRepo::find_by_id(&pool, user_id)
        .await
        .expect("query")
        .expect("exists");
    assert_eq!(user.free_credits, 2, "failures are never charged");
    assert_eq!(user.content_violations, 1);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn intermediate_callback_is_acknowledged_without_mutation(pool: PgPool) {
    let (_, job_id) = seed_submitted_job(&pool, 2, "task-cb-3").await;
    let app = common::build_test_app(pool.clone());

    let payload = json!({
        "code": 200,
        "msg": "lyrics generated",
        "data": { "taskId": "task-cb-3", "callbackType": "text" }
    });
    let response = post_json(app, "/callback/suno", payload).await;
    assert_eq!(response.status(), StatusCode::OK);

    let job = JobRepo::find_by_id(&pool, job_id)
        .await
        .expect("query")
        .expect("exists");
    assert_eq!(job.status, JobStatus::Submitted, "partial signals never mutate");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn callback_without_task_id_is_acknowledged(pool: PgPool) {
    let app = common::build_test_app(pool);

    let response = post_json(app, "/callback/suno", json!({ "code": 200, "data": {} })).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn callback_for_unknown_task_is_acknowledged(pool: PgPool) {
    let app = common::build_test_app(pool);

    let response = post_json(app, "/callback/suno", success_callback("never-submitted")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn video_callback_resolves_pending_task_once(pool: PgPool) {
    let (_, job_id) = seed_submitted_job(&pool, 2, "task-cb-4").await;
    VideoTaskRepo::create(&pool, "video-1", job_id, 0, "Rainy Day")
        .await
        .expect("create video task");
    let app = common::build_test_app(pool.clone());

    let payload = json!({
        "code": 200,
        "msg": "success",
        "data": { "taskId": "video-1", "videoUrl": "https://cdn.example/a.mp4" }
    });
    let response = post_json(app.clone(), "/callback/video", payload.clone()).await;
    assert_eq!(response.status(), StatusCode::OK);

    let task = VideoTaskRepo::find_by_task_id(&pool, "video-1")
        .await
        .expect("query")
        .expect("exists");
    assert_eq!(task.video_url.as_deref(), Some("https://cdn.example/a.mp4"));

    // A retried resolution is a no-op.
    let response = post_json(app, "/callback/video", payload).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn video_callback_for_unknown_task_is_acknowledged(pool: PgPool) {
    let app = common::build_test_app(pool);

    let payload = json!({
        "code": 200,
        "data": { "taskId": "video-unknown", "videoUrl": "https://cdn.example/x.mp4" }
    });
    let response = post_json(app, "/callback/video", payload).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn paid_tier_job_debits_paid_pool(pool: PgPool) {
    let user = UserRepo::create(&pool, Some("payer"), 0, None)
        .await
        .expect("create user");
    {
        let mut conn = pool.acquire().await.expect("acquire");
        LedgerRepo::credit(
            &mut conn,
            user.id,
            CreditPool::Paid,
            3,
            LedgerSource::Purchase,
            "purchase",
        )
        .await
        .expect("grant");
    }
    let job = JobRepo::create(
        &pool,
        user.id,
        &NewJob {
            prompt: "an anthem".into(),
            style: "rock".into(),
            voice_gender: Some("male".into()),
            mode: "lyrics".into(),
            is_free_tier: false,
        },
    )
    .await
    .expect("create job");
    assert!(JobRepo::mark_submitted(&pool, job.id, "task-cb-5")
        .await
        .expect("mark submitted"));

    let app = common::build_test_app(pool.clone());
    let response = post_json(app, "/callback/suno", success_callback("task-cb-5")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let job = JobRepo::find_by_id(&pool, job.id)
        .await
        .expect("query")
        .expect("exists");
    assert_eq!(job.status, JobStatus::Complete);
    assert_eq!(job.credits_spent, 1);

    let user = UserRepo::find_by_id(&pool, user.id)
        .await
        .expect("query")
        .expect("exists");
    assert_eq!(user.paid_credits, 2);
}
