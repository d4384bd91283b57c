//! User account endpoints: signup, history, and the credit ledger.

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use melodia_core::policy::{CreditPool, GENERATION_COST};
use melodia_core::types::DbId;
use melodia_core::CoreError;
use melodia_db::models::job::Job;
use melodia_db::models::ledger::CreditLedgerEntry;
use melodia_db::models::status::LedgerSource;
use melodia_db::models::user::User;
use melodia_db::repositories::{JobRepo, LedgerRepo, UserRepo};

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for POST /users.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub display_name: Option<String>,
    pub referred_by: Option<DbId>,
}

/// POST /users -- register an account.
///
/// The signup bonus and the referrer's reward both go through the ledger so
/// balances stay reconcilable.
async fn create_user(
    State(state): State<AppState>,
    Json(body): Json<CreateUserRequest>,
) -> AppResult<Json<DataResponse<User>>> {
    let user = UserRepo::create(
        &state.pool,
        body.display_name.as_deref(),
        0,
        body.referred_by,
    )
    .await?;

    let signup_credits = state.config.pipeline.free_credits_on_signup;
    let mut conn = state.pool.acquire().await?;
    if signup_credits > 0 {
        LedgerRepo::credit(
            &mut conn,
            user.id,
            CreditPool::Free,
            signup_credits,
            LedgerSource::SignupBonus,
            "signup bonus",
        )
        .await?;
    }
    if let Some(referrer_id) = body.referred_by {
        LedgerRepo::credit(
            &mut conn,
            referrer_id,
            CreditPool::Free,
            GENERATION_COST,
            LedgerSource::Referral,
            &format!("referral of user {}", user.id),
        )
        .await?;
    }
    drop(conn);

    tracing::info!(user_id = user.id, referred_by = ?body.referred_by, "User registered");
    let user = UserRepo::find_by_id(&state.pool, user.id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "user",
            id: user.id,
        })?;
    Ok(Json(DataResponse { data: user }))
}

/// GET /users/{id} -- account with its current balances.
async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<User>>> {
    let user = UserRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(CoreError::NotFound { entity: "user", id })?;
    Ok(Json(DataResponse { data: user }))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    10
}

/// GET /users/{id}/generations -- recent jobs, newest first.
async fn list_user_generations(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Query(query): Query<HistoryQuery>,
) -> AppResult<Json<DataResponse<Vec<Job>>>> {
    let jobs = JobRepo::list_recent_by_user(&state.pool, id, query.limit.clamp(1, 50)).await?;
    Ok(Json(DataResponse { data: jobs }))
}

/// GET /users/{id}/ledger -- full credit ledger, newest first.
async fn list_user_ledger(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<CreditLedgerEntry>>>> {
    let entries = LedgerRepo::entries(&state.pool, id).await?;
    Ok(Json(DataResponse { data: entries }))
}

/// Request body for POST /users/{id}/grants.
#[derive(Debug, Deserialize)]
pub struct GrantRequest {
    pub pool: CreditPool,
    pub amount: i32,
    /// `purchase` or `admin_grant`.
    pub source: LedgerSource,
    pub description: String,
}

/// POST /users/{id}/grants -- credit a user's balance (purchase effect or
/// an operator grant).
async fn grant_credits(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(body): Json<GrantRequest>,
) -> AppResult<Json<DataResponse<User>>> {
    if body.amount <= 0 {
        return Err(CoreError::Validation("grant amount must be positive".into()).into());
    }
    if !matches!(
        body.source,
        LedgerSource::Purchase | LedgerSource::AdminGrant
    ) {
        return Err(
            CoreError::Validation("grants must be purchase or admin_grant".into()).into(),
        );
    }

    // Existence check first so an unknown id is a 404, not a silent credit.
    UserRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(CoreError::NotFound { entity: "user", id })?;

    let mut conn = state.pool.acquire().await?;
    LedgerRepo::credit(
        &mut conn,
        id,
        body.pool,
        body.amount,
        body.source,
        &body.description,
    )
    .await?;
    drop(conn);

    let user = UserRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(CoreError::NotFound { entity: "user", id })?;
    Ok(Json(DataResponse { data: user }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", post(create_user))
        .route("/users/{id}", get(get_user))
        .route("/users/{id}/generations", get(list_user_generations))
        .route("/users/{id}/ledger", get(list_user_ledger))
        .route("/users/{id}/grants", post(grant_credits))
}
