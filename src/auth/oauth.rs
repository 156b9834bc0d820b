//! Identity provider OAuth flow
//!
//! Implements the OAuth 2.0 authorization code flow against the
//! configured identity provider, and the session endpoints that hang off
//! it (failure page, authenticated probe, logout).

use axum::{
    Router, middleware,
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect},
    routing::get,
};
use axum_extra::extract::{
    CookieJar,
    cookie::{Cookie, SameSite},
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{Duration, Utc};
use rand::RngCore;
use serde::Deserialize;

use super::middleware::{CurrentUser, SESSION_COOKIE, require_auth};
use super::session::{Principal, Session, create_session_token};
use crate::AppState;
use crate::data::{EntityId, SessionRecord};
use crate::error::AppError;

/// Name of the CSRF state cookie set before the consent redirect
const OAUTH_STATE_COOKIE: &str = "oauth_state";

/// Create authentication router
///
/// Routes:
/// - GET /api/v1/auth/provider - Redirect to provider consent screen
/// - GET /api/v1/auth/provider/callback - OAuth callback
/// - GET /api/v1/auth/failure - Login error page
/// - GET /api/v1/protected - Authenticated probe, redirects home
/// - GET /api/v1/logout - End session
pub fn auth_router(state: AppState) -> Router<AppState> {
    let gated = Router::new()
        .route("/api/v1/protected", get(protected))
        .route("/api/v1/logout", get(logout))
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    Router::new()
        .route("/api/v1/auth/provider", get(begin_auth))
        .route("/api/v1/auth/provider/callback", get(complete_auth))
        .route("/api/v1/auth/failure", get(auth_failure))
        .merge(gated)
}

// =============================================================================
// Consent redirect
// =============================================================================

/// GET /api/v1/auth/provider
///
/// Redirects the caller to the provider's consent screen.
///
/// # Steps
/// 1. Generate CSRF state token
/// 2. Store state in cookie
/// 3. Redirect with client_id, redirect_uri, scopes "email profile", state
async fn begin_auth(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let csrf_state = generate_csrf_state();

    let mut authorize_url = url::Url::parse(&state.config.auth.provider.auth_url)
        .map_err(|e| AppError::Config(format!("invalid auth_url: {e}")))?;
    authorize_url
        .query_pairs_mut()
        .append_pair("client_id", &state.config.auth.provider.client_id)
        .append_pair("redirect_uri", &state.config.oauth_redirect_uri())
        .append_pair("response_type", "code")
        .append_pair("scope", "email profile")
        .append_pair("state", &csrf_state);

    let state_cookie = Cookie::build((OAUTH_STATE_COOKIE, csrf_state))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.should_use_secure_cookies())
        .build();

    Ok((jar.add(state_cookie), Redirect::to(authorize_url.as_str())))
}

// =============================================================================
// Callback
// =============================================================================

/// Query parameters from the provider callback
#[derive(Debug, Deserialize)]
struct CallbackQuery {
    /// Authorization code
    code: String,
    /// CSRF state token
    state: String,
}

/// Provider token response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// GET /api/v1/auth/provider/callback
///
/// Handles the OAuth callback. The session becomes authenticated only
/// after provisioning succeeds; a failed exchange or a failed
/// provisioning run redirects to the failure page instead of stalling.
///
/// # Steps
/// 1. Verify CSRF state
/// 2. Exchange code for access token
/// 3. Fetch identity claims from the provider
/// 4. Run account provisioning
/// 5. Create session row and signed cookie
/// 6. Redirect to the authenticated probe
async fn complete_auth(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    verify_csrf_state(&query.state, &jar)?;

    let principal = match exchange_and_provision(&state, &query.code).await {
        Ok(principal) => principal,
        Err(error) => {
            tracing::warn!(error = %error, "Login attempt failed");
            let jar = jar.remove(Cookie::build((OAUTH_STATE_COOKIE, "")).path("/").build());
            return Ok((jar, Redirect::to("/api/v1/auth/failure")));
        }
    };

    // Provisioning succeeded: the session may now be marked authenticated.
    let now = Utc::now();
    let session = Session {
        id: EntityId::new().0,
        principal,
        created_at: now,
        expires_at: now + Duration::seconds(state.config.auth.session_max_age),
    };

    state
        .db
        .insert_session(&SessionRecord {
            id: session.id.clone(),
            email: session.principal.email.clone(),
            created_at: session.created_at,
            expires_at: session.expires_at,
        })
        .await?;

    if let Err(error) = state.db.purge_expired_sessions(now).await {
        tracing::warn!(error = %error, "Failed to purge expired sessions");
    }

    let token = create_session_token(&session, &state.config.auth.session_secret)?;
    let session_cookie = Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.should_use_secure_cookies())
        .build();

    tracing::info!(
        email = %session.principal.email,
        session_id = %session.id,
        "Session authenticated"
    );

    let jar = jar
        .remove(Cookie::build((OAUTH_STATE_COOKIE, "")).path("/").build())
        .add(session_cookie);

    Ok((jar, Redirect::to("/api/v1/protected")))
}

/// Run the provider exchange and provisioning, yielding the principal.
///
/// Sequential awaited calls; the first failure wins and is surfaced to
/// the caller as the reason the login attempt died.
async fn exchange_and_provision(state: &AppState, code: &str) -> Result<Principal, AppError> {
    let token = exchange_code(state, code).await?;
    let principal = fetch_claims(state, &token.access_token).await?;
    state.provisioning.provision(&principal).await?;
    Ok(principal)
}

/// Exchange the authorization code for an access token
async fn exchange_code(state: &AppState, code: &str) -> Result<TokenResponse, AppError> {
    let provider = &state.config.auth.provider;
    let response = state
        .http_client
        .post(&provider.token_url)
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", provider.client_id.as_str()),
            ("client_secret", provider.client_secret.as_str()),
            ("redirect_uri", state.config.oauth_redirect_uri().as_str()),
        ])
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(AppError::Provider(format!(
            "token exchange returned {}",
            response.status()
        )));
    }

    Ok(response.json::<TokenResponse>().await?)
}

/// Fetch identity claims with the access token
async fn fetch_claims(state: &AppState, access_token: &str) -> Result<Principal, AppError> {
    let response = state
        .http_client
        .get(&state.config.auth.provider.userinfo_url)
        .bearer_auth(access_token)
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(AppError::Provider(format!(
            "userinfo returned {}",
            response.status()
        )));
    }

    Ok(response.json::<Principal>().await?)
}

// =============================================================================
// Failure page
// =============================================================================

/// GET /api/v1/auth/failure
///
/// Renders a login-error page.
async fn auth_failure() -> impl IntoResponse {
    Html(
        r#"<!DOCTYPE html>
<html>
<head><title>Sign-in failed - Portico</title></head>
<body>
    <h1>Sign-in failed</h1>
    <p>We could not complete your sign-in. Please try again.</p>
    <a href="/api/v1/auth/provider">Try again</a>
    <a href="/home">Back to home</a>
</body>
</html>
"#,
    )
}

// =============================================================================
// Authenticated probe and logout
// =============================================================================

/// GET /api/v1/protected
///
/// Reached only through the auth gate; sends the signed-in caller home.
async fn protected() -> impl IntoResponse {
    Redirect::to("/home")
}

/// GET /api/v1/logout
///
/// Deletes the server-side session row, clears cookies, redirects home.
/// Deleting an already-deleted row is a no-op, so replaying the logout is
/// harmless.
async fn logout(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    state.db.delete_session(&session.id).await?;

    tracing::info!(
        email = %session.principal.email,
        session_id = %session.id,
        "Session ended"
    );

    let jar = jar
        .remove(Cookie::build((SESSION_COOKIE, "")).path("/").build())
        .remove(Cookie::build((OAUTH_STATE_COOKIE, "")).path("/").build());

    Ok((jar, Redirect::to("/home")))
}

// =============================================================================
// Helpers
// =============================================================================

/// Generate a random CSRF state token
fn generate_csrf_state() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Verify CSRF state from cookie matches callback state
fn verify_csrf_state(state: &str, jar: &CookieJar) -> Result<(), AppError> {
    let cookie_state = jar
        .get(OAUTH_STATE_COOKIE)
        .map(|cookie| cookie.value().to_owned())
        .ok_or(AppError::Unauthorized)?;

    if cookie_state != state {
        return Err(AppError::Unauthorized);
    }

    Ok(())
}
