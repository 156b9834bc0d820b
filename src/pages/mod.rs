//! View routes
//!
//! Server-rendered pages: home, user directory, public profiles. All of
//! them are computable without authentication; a signed-in viewer gets
//! personalized navigation chrome. Markup is built with `format!` and
//! every dynamic value is escaped.

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::AppState;
use crate::auth::MaybeUser;
use crate::data::AccountRecord;
use crate::error::AppError;

/// Create the view router
///
/// Routes:
/// - GET / - Redirect to /home
/// - GET /home - Home page
/// - GET /profile/:username - Public profile page
/// - GET /users - User directory
pub fn pages_router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/home", get(home))
        .route("/profile/:username", get(profile))
        .route("/users", get(users_directory))
}

/// The signed-in viewer's account, when there is one.
///
/// A live session whose account record is missing renders like a signed-
/// out viewer rather than failing the page.
async fn resolve_viewer(
    state: &AppState,
    user: &MaybeUser,
) -> Result<Option<AccountRecord>, AppError> {
    match &user.0 {
        Some(session) => state.accounts.find_by_email(&session.principal.email).await,
        None => Ok(None),
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// GET /
async fn index() -> impl IntoResponse {
    Redirect::to("/home")
}

/// GET /home
async fn home(State(state): State<AppState>, user: MaybeUser) -> Result<Response, AppError> {
    let viewer = resolve_viewer(&state, &user).await?;
    Ok(Html(render_home(viewer.as_ref())).into_response())
}

/// GET /profile/:username
///
/// Resolves a second account by the path's username; an unknown username
/// is a not-found page, not an authentication failure.
async fn profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
    user: MaybeUser,
) -> Result<Response, AppError> {
    let viewer = resolve_viewer(&state, &user).await?;

    let Some(account) = state.accounts.find_by_username(&username).await? else {
        return Ok((StatusCode::NOT_FOUND, Html(render_not_found(&username))).into_response());
    };

    Ok(Html(render_profile(viewer.as_ref(), &account)).into_response())
}

/// GET /users
async fn users_directory(
    State(state): State<AppState>,
    user: MaybeUser,
) -> Result<Response, AppError> {
    let viewer = resolve_viewer(&state, &user).await?;
    let accounts = state.accounts.list_accounts().await?;
    Ok(Html(render_users(viewer.as_ref(), &accounts)).into_response())
}

// =============================================================================
// Rendering
// =============================================================================

/// Shared page shell: head, navigation chrome, body
fn render_page(viewer: Option<&AccountRecord>, title: &str, body: &str) -> String {
    let nav = match viewer {
        Some(account) => format!(
            r#"<img class="nav-thumb" src="{thumb}" alt="">
            <span class="nav-name">{name}</span>
            <a href="/api/v1/logout">Sign out</a>"#,
            thumb = encode_double_quoted_attribute(&account.thumb_url),
            name = encode_text(&account.display_name),
        ),
        None => r#"<a href="/api/v1/auth/provider">Sign in</a>"#.to_string(),
    };

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>{title} - Portico</title>
    <link rel="stylesheet" href="/resources/style.css">
</head>
<body>
    <nav>
        <a href="/home">Home</a>
        <a href="/users">People</a>
        {nav}
    </nav>
    {body}
</body>
</html>
"#,
        title = encode_text(title),
    )
}

fn render_home(viewer: Option<&AccountRecord>) -> String {
    let body = match viewer {
        Some(account) => format!(
            r#"<h1>Welcome back, {name}</h1>
    <p><a href="/profile/{username}">Your profile</a></p>"#,
            name = encode_text(&account.display_name),
            username = urlencoding::encode(&account.username),
        ),
        None => r#"<h1>Welcome to Portico</h1>
    <p>Sign in to join the directory.</p>"#
            .to_string(),
    };

    render_page(viewer, "Home", &body)
}

fn render_profile(viewer: Option<&AccountRecord>, account: &AccountRecord) -> String {
    let body = format!(
        r#"<article class="profile">
        <img class="profile-thumb" src="{thumb}" alt="">
        <h1>{display_name}</h1>
        <p class="profile-username">@{username}</p>
        <p class="profile-description">{description}</p>
    </article>"#,
        thumb = encode_double_quoted_attribute(&account.thumb_url),
        display_name = encode_text(&account.display_name),
        username = encode_text(&account.username),
        description = encode_text(&account.description),
    );

    render_page(viewer, &account.display_name, &body)
}

fn render_users(viewer: Option<&AccountRecord>, accounts: &[AccountRecord]) -> String {
    let mut cards = String::new();
    for account in accounts {
        cards.push_str(&format!(
            r#"<li class="user-card">
            <img class="user-thumb" src="{thumb}" alt="">
            <a href="/profile/{link}">{display_name}</a>
            <span class="user-username">@{username}</span>
            <p>{description}</p>
        </li>
"#,
            thumb = encode_double_quoted_attribute(&account.thumb_url),
            link = urlencoding::encode(&account.username),
            display_name = encode_text(&account.display_name),
            username = encode_text(&account.username),
            description = encode_text(&account.description),
        ));
    }

    let body = format!(
        r#"<h1>People</h1>
    <ul class="user-list">
{cards}    </ul>"#
    );

    render_page(viewer, "People", &body)
}

fn render_not_found(username: &str) -> String {
    let body = format!(
        r#"<h1>No such profile</h1>
    <p>Nobody here is called {username}.</p>
    <a href="/users">Browse the directory</a>"#,
        username = encode_text(username),
    );

    render_page(None, "Not found", &body)
}
