//! Account JSON endpoints

use axum::{
    Router, middleware,
    extract::State,
    response::Json,
    routing::get,
};

use crate::AppState;
use crate::auth::{CurrentUser, require_auth};
use crate::data::AccountRecord;
use crate::error::AppError;

/// Create the JSON API router.
///
/// Gating is configuration: `routes.public_user_listing` opens the user
/// listing to unauthenticated callers, and `routes.account_endpoint`
/// controls whether the own-account endpoint exists at all. Both switches
/// exist because deployed revisions disagreed.
pub fn users_router(state: AppState) -> Router<AppState> {
    let mut router = Router::new();

    if state.config.routes.public_user_listing {
        router = router.route("/api/v1/users", get(list_users));
    } else {
        router = router.merge(
            Router::new()
                .route("/api/v1/users", get(list_users))
                .route_layer(middleware::from_fn_with_state(
                    state.clone(),
                    require_auth,
                )),
        );
    }

    if state.config.routes.account_endpoint {
        router = router.merge(
            Router::new()
                .route("/api/v1/account", get(own_account))
                .route_layer(middleware::from_fn_with_state(state, require_auth)),
        );
    }

    router
}

/// GET /api/v1/users
///
/// Every account record in the store, with the store id attached.
async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<AccountRecord>>, AppError> {
    let accounts = state.accounts.list_accounts().await?;
    Ok(Json(accounts))
}

/// GET /api/v1/account
///
/// The caller's own account record, resolved by the session principal's
/// email. A principal whose record is missing gets a 404, not a 401.
async fn own_account(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
) -> Result<Json<AccountRecord>, AppError> {
    let account = state
        .accounts
        .find_by_email(&session.principal.email)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(Json(account))
}
