pub mod callback;
pub mod generation;
pub mod health;
pub mod user;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /generations                      submit (POST)
/// /generations/{id}                 get
/// /generations/{id}/download        charge a full-quality download (POST)
///
/// /users                            register (POST)
/// /users/{id}                       get with balances
/// /users/{id}/generations           recent history
/// /users/{id}/ledger                credit ledger
/// /users/{id}/grants                purchase / operator grant (POST)
/// ```
///
/// The provider callbacks (`/callback/suno`, `/callback/video`) and
/// `/health` mount at the root, outside this tree.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(generation::router())
        .merge(user::router())
}
