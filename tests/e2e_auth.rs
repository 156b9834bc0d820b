//! E2E tests for the OAuth flow, session gate, and logout

mod common;

use common::{TestServer, cookie_pair};

#[tokio::test]
async fn begin_auth_sets_csrf_cookie_and_redirects_to_consent() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/api/v1/auth/provider"))
        .send()
        .await
        .expect("request succeeds");

    assert!(response.status().is_redirection());
    let location = response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .expect("location header");
    assert!(location.starts_with(&format!("{}/auth?", server.provider.base_url)));
    assert!(location.contains("client_id=test-client-id"));
    assert!(location.contains("response_type=code"));
    assert!(location.contains("scope=email+profile"));
    assert!(location.contains("state="));

    assert!(cookie_pair(&response, "oauth_state").is_some());
}

#[tokio::test]
async fn callback_rejects_missing_csrf_cookie() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/api/v1/auth/provider/callback?code=dummy&state=dummy"))
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn callback_rejects_mismatched_state() {
    let server = TestServer::new().await;
    server.provider.register_user("code-alice", "a@x.com", "Alice");

    let response = server
        .client
        .get(server.url("/api/v1/auth/provider/callback?code=code-alice&state=forged"))
        .header("Cookie", "oauth_state=genuine")
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn failed_exchange_redirects_to_failure_page() {
    let server = TestServer::new().await;
    // No user registered: the stub token endpoint rejects the code.

    let response = server
        .client
        .get(server.url("/api/v1/auth/provider/callback?code=unknown&state=s1"))
        .header("Cookie", "oauth_state=s1")
        .send()
        .await
        .expect("request succeeds");

    assert!(response.status().is_redirection());
    assert_eq!(
        response
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok()),
        Some("/api/v1/auth/failure")
    );
    assert!(
        cookie_pair(&response, "session").is_none(),
        "failed login must not issue a session cookie"
    );

    let failure = server
        .client
        .get(server.url("/api/v1/auth/failure"))
        .send()
        .await
        .expect("request succeeds");
    assert_eq!(failure.status(), 200);
    assert!(failure.text().await.unwrap().contains("Sign-in failed"));
}

#[tokio::test]
async fn gated_endpoints_reject_unauthenticated_requests_with_empty_body() {
    let server = TestServer::new().await;

    for path in [
        "/api/v1/protected",
        "/api/v1/logout",
        "/api/v1/users",
        "/api/v1/account",
    ] {
        let response = server
            .client
            .get(server.url(path))
            .send()
            .await
            .expect("request succeeds");

        assert_eq!(response.status(), 401, "{path} must be gated");
        let body = response.text().await.unwrap();
        assert!(body.is_empty(), "{path} must reject with an empty body");
    }
}

#[tokio::test]
async fn garbage_session_cookie_does_not_authenticate() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/api/v1/protected"))
        .header("Cookie", "session=not-a-real-token")
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn login_reaches_protected_and_lands_home() {
    let server = TestServer::new().await;
    server.provider.register_user("code-alice", "a@x.com", "Alice");

    let session_cookie = server.login("code-alice").await;

    let response = server
        .client
        .get(server.url("/api/v1/protected"))
        .header("Cookie", &session_cookie)
        .send()
        .await
        .expect("request succeeds");

    assert!(response.status().is_redirection());
    assert_eq!(
        response
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok()),
        Some("/home")
    );
}

#[tokio::test]
async fn logout_revokes_session_even_when_cookie_is_replayed() {
    let server = TestServer::new().await;
    server.provider.register_user("code-alice", "a@x.com", "Alice");

    let session_cookie = server.login("code-alice").await;

    let logout = server
        .client
        .get(server.url("/api/v1/logout"))
        .header("Cookie", &session_cookie)
        .send()
        .await
        .expect("request succeeds");
    assert!(logout.status().is_redirection());
    assert_eq!(
        logout
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok()),
        Some("/home")
    );

    // The old cookie still carries a validly signed token; the revoked
    // session row must defeat it anyway.
    let replay = server
        .client
        .get(server.url("/api/v1/protected"))
        .header("Cookie", &session_cookie)
        .send()
        .await
        .expect("request succeeds");
    assert_eq!(replay.status(), 401);
}
