//! Common test utilities for E2E tests

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use axum::extract::Query;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use portico::{AppState, config};
use tempfile::TempDir;
use tokio::net::TcpListener;

// =============================================================================
// Stub identity provider
// =============================================================================

#[derive(Default)]
struct StubState {
    /// Authorization code -> userinfo claims
    claims_by_code: Mutex<HashMap<String, serde_json::Value>>,
    /// Directory: email -> uid
    directory: Mutex<HashMap<String, String>>,
    directory_creates: AtomicUsize,
    fail_directory: AtomicBool,
}

/// In-process identity provider covering both halves of the real thing:
/// the OAuth endpoints (token, userinfo) and the directory API the
/// provisioning service calls.
pub struct StubProvider {
    pub base_url: String,
    state: Arc<StubState>,
}

impl StubProvider {
    pub async fn spawn() -> Self {
        let state = Arc::new(StubState::default());

        let token_state = state.clone();
        let userinfo_state = state.clone();
        let lookup_state = state.clone();
        let create_state = state.clone();

        let app = axum::Router::new()
            .route(
                "/token",
                axum::routing::post(move |body: String| {
                    let state = token_state.clone();
                    async move {
                        let code = body
                            .split('&')
                            .find_map(|pair| pair.strip_prefix("code="))
                            .unwrap_or_default()
                            .to_string();
                        if !state.claims_by_code.lock().unwrap().contains_key(&code) {
                            return (
                                StatusCode::BAD_REQUEST,
                                axum::Json(serde_json::json!({"error": "invalid_grant"})),
                            )
                                .into_response();
                        }
                        axum::Json(serde_json::json!({
                            "access_token": format!("token-{code}"),
                            "token_type": "Bearer",
                        }))
                        .into_response()
                    }
                }),
            )
            .route(
                "/userinfo",
                get(move |headers: axum::http::HeaderMap| {
                    let state = userinfo_state.clone();
                    async move {
                        let token = headers
                            .get("authorization")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.strip_prefix("Bearer "))
                            .unwrap_or_default();
                        let code = token.strip_prefix("token-").unwrap_or_default();
                        match state.claims_by_code.lock().unwrap().get(code) {
                            Some(claims) => axum::Json(claims.clone()).into_response(),
                            None => StatusCode::UNAUTHORIZED.into_response(),
                        }
                    }
                }),
            )
            .route(
                "/users",
                get(move |Query(params): Query<HashMap<String, String>>| {
                    let state = lookup_state.clone();
                    async move {
                        if state.fail_directory.load(Ordering::SeqCst) {
                            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
                        }
                        let email = params.get("email").cloned().unwrap_or_default();
                        let directory = state.directory.lock().unwrap();
                        match directory.get(&email) {
                            Some(uid) => axum::Json(
                                serde_json::json!({"uid": uid, "email": email}),
                            )
                            .into_response(),
                            None => StatusCode::NOT_FOUND.into_response(),
                        }
                    }
                })
                .post(move |axum::Json(body): axum::Json<serde_json::Value>| {
                    let state = create_state.clone();
                    async move {
                        if state.fail_directory.load(Ordering::SeqCst) {
                            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
                        }
                        state.directory_creates.fetch_add(1, Ordering::SeqCst);
                        let email = body["email"].as_str().unwrap_or_default().to_string();
                        let uid = format!("uid-{email}");
                        state
                            .directory
                            .lock()
                            .unwrap()
                            .insert(email.clone(), uid.clone());
                        axum::Json(serde_json::json!({"uid": uid, "email": email}))
                            .into_response()
                    }
                }),
            );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    /// Register claims for an authorization code. The `language` key
    /// matches the provider's wire name for the locale claim.
    pub fn register_user(&self, code: &str, email: &str, given_name: &str) {
        self.state.claims_by_code.lock().unwrap().insert(
            code.to_string(),
            serde_json::json!({
                "email": email,
                "given_name": given_name,
                "picture": format!("https://cdn.example.com/{given_name}.png"),
                "language": "en",
            }),
        );
    }

    /// Pre-seed a directory user without an account record
    pub fn seed_directory_user(&self, email: &str) {
        self.state
            .directory
            .lock()
            .unwrap()
            .insert(email.to_string(), format!("uid-{email}"));
    }

    pub fn directory_creates(&self) -> usize {
        self.state.directory_creates.load(Ordering::SeqCst)
    }

    pub fn directory_user_count(&self) -> usize {
        self.state.directory.lock().unwrap().len()
    }

    pub fn set_directory_failing(&self, failing: bool) {
        self.state.fail_directory.store(failing, Ordering::SeqCst);
    }
}

// =============================================================================
// Test server
// =============================================================================

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub provider: StubProvider,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server instance with default route gating
    pub async fn new() -> Self {
        Self::with_routes(config::RoutesConfig::default()).await
    }

    /// Create a test server with explicit route gating configuration
    pub async fn with_routes(routes: config::RoutesConfig) -> Self {
        // Create temporary directory for test database
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        // Stub identity provider
        let provider = StubProvider::spawn().await;

        // Create test configuration
        let config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
                domain: "localhost".to_string(),
                protocol: "http".to_string(),
                resources_dir: temp_dir.path().join("resources"),
            },
            database: config::DatabaseConfig {
                path: db_path.clone(),
            },
            auth: config::AuthConfig {
                session_secret: "test-secret-key-32-bytes-long!!!".to_string(),
                session_max_age: 604800,
                provider: config::ProviderConfig {
                    client_id: "test-client-id".to_string(),
                    client_secret: "test-client-secret".to_string(),
                    auth_url: format!("{}/auth", provider.base_url),
                    token_url: format!("{}/token", provider.base_url),
                    userinfo_url: format!("{}/userinfo", provider.base_url),
                    directory_url: provider.base_url.clone(),
                    directory_token: "test-service-token".to_string(),
                },
            },
            routes,
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };

        std::fs::create_dir_all(&config.server.resources_dir).unwrap();
        std::fs::write(
            config.server.resources_dir.join("style.css"),
            "body { margin: 0; }\n",
        )
        .unwrap();

        // Initialize app state
        let state = AppState::new(config.clone()).await.unwrap();

        // Create HTTP client that never follows redirects; the tests
        // assert on Location headers directly.
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        // Build router
        let app = portico::build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait a bit for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Self {
            addr: addr_str,
            state,
            provider,
            _temp_dir: temp_dir,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Drive the full login flow for a code registered on the stub
    /// provider. Returns the `session=<token>` cookie pair.
    pub async fn login(&self, code: &str) -> String {
        // 1. Begin auth: capture the CSRF state cookie and redirect
        let begin = self
            .client
            .get(self.url("/api/v1/auth/provider"))
            .send()
            .await
            .expect("begin auth request succeeds");
        assert!(begin.status().is_redirection(), "begin auth must redirect");

        let state_cookie =
            cookie_pair(&begin, "oauth_state").expect("oauth_state cookie must be set");
        let location = begin
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok())
            .expect("location header");
        let state_param = url::Url::parse(location)
            .expect("redirect target parses")
            .query_pairs()
            .find_map(|(k, v)| (k == "state").then(|| v.into_owned()))
            .expect("state parameter present");

        // 2. Callback with the code and the matching state
        let callback = self
            .client
            .get(self.url(&format!(
                "/api/v1/auth/provider/callback?code={code}&state={state_param}"
            )))
            .header("Cookie", &state_cookie)
            .send()
            .await
            .expect("callback request succeeds");
        assert!(
            callback.status().is_redirection(),
            "callback must redirect, got {}",
            callback.status()
        );
        assert_eq!(
            callback
                .headers()
                .get("location")
                .and_then(|v| v.to_str().ok()),
            Some("/api/v1/protected"),
            "successful login must land on the authenticated probe"
        );

        cookie_pair(&callback, "session").expect("session cookie must be set")
    }
}

/// Extract a `name=value` pair from a response's Set-Cookie headers.
pub fn cookie_pair(response: &reqwest::Response, name: &str) -> Option<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .find(|pair| {
            pair.starts_with(&format!("{name}=")) && !pair.ends_with(&format!("{name}="))
        })
        .map(ToString::to_string)
}
