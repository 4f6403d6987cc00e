mod support;

use shelfmark_sync::error::SyncError;
use support::*;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Token cache ──

#[tokio::test]
async fn cached_valid_token_makes_no_network_call() {
    let server = MockServer::start().await;
    // Any request at all would be a failure
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let auth = auth_with(&server.uri(), settings_with_valid_token());
    let token = auth.get_valid_token().await.unwrap();
    assert_eq!(token, "at-cached");
}

#[tokio::test]
async fn token_inside_refresh_margin_is_not_reused() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_grant_body()))
        .expect(1)
        .mount(&server)
        .await;

    let settings = settings_with_account();
    use shelfmark_sync::sources::SettingsStore;
    settings.set("sync.access_token", "at-stale");
    settings.set("sync.refresh_token", "rt-stale");
    // Expires in ~30s, inside the 60s margin
    let soon = chrono::Utc::now() + chrono::Duration::seconds(30);
    settings.set("sync.token_expires_at", &soon.to_rfc3339());

    let auth = auth_with(&server.uri(), settings);
    let token = auth.get_valid_token().await.unwrap();
    assert_eq!(token, "at-new");
}

// ── Login ──

#[tokio::test]
async fn login_posts_form_encoded_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/login"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("username=reader"))
        .and(body_string_contains("password=hunter2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_grant_body()))
        .expect(1)
        .mount(&server)
        .await;

    let auth = auth_with(&server.uri(), settings_with_account());
    let token = auth.get_valid_token().await.unwrap();
    assert_eq!(token, "at-new");
}

#[tokio::test]
async fn login_persists_tokens_for_next_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_grant_body()))
        .mount(&server)
        .await;

    let settings = settings_with_account();
    let auth = auth_with(&server.uri(), settings.clone());
    auth.get_valid_token().await.unwrap();

    use shelfmark_sync::sources::SettingsStore;
    assert_eq!(settings.get("sync.access_token").as_deref(), Some("at-new"));
    assert_eq!(settings.get("sync.refresh_token").as_deref(), Some("rt-new"));
    assert!(settings.get("sync.token_expires_at").is_some());
}

#[tokio::test]
async fn second_call_reuses_token_from_login() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_grant_body()))
        .expect(1)
        .mount(&server)
        .await;

    let auth = auth_with(&server.uri(), settings_with_account());
    auth.get_valid_token().await.unwrap();
    let token = auth.get_valid_token().await.unwrap();
    assert_eq!(token, "at-new");
}

#[tokio::test]
async fn rejected_login_reports_status_code() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/login"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let auth = auth_with(&server.uri(), settings_with_account());
    let err = auth.get_valid_token().await.unwrap_err();
    assert!(matches!(err, SyncError::AuthFailed(_)));
    assert!(err.to_string().contains("login failed: 401"));
    assert!(err.is_auth());
}

#[tokio::test]
async fn missing_credentials_fail_without_any_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let auth = auth_with(
        &server.uri(),
        std::sync::Arc::new(shelfmark_sync::sources::InMemorySettings::new()),
    );
    let err = auth.get_valid_token().await.unwrap_err();
    assert!(matches!(err, SyncError::NotConfigured));
}

// ── Refresh ──

#[tokio::test]
async fn expired_token_refreshes_without_login() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh"))
        .and(body_string_contains("rt-cached"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_grant_body()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/login"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let settings = settings_with_valid_token();
    use shelfmark_sync::sources::SettingsStore;
    settings.set("sync.token_expires_at", "2020-01-01T00:00:00+00:00");

    let auth = auth_with(&server.uri(), settings);
    let token = auth.get_valid_token().await.unwrap();
    assert_eq!(token, "at-new");
}

#[tokio::test]
async fn rejected_refresh_clears_tokens_and_falls_back_to_login() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "at-from-login",
            "refresh_token": "rt-from-login",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    let settings = settings_with_valid_token();
    use shelfmark_sync::sources::SettingsStore;
    settings.set("sync.token_expires_at", "2020-01-01T00:00:00+00:00");

    let auth = auth_with(&server.uri(), settings.clone());
    let token = auth.get_valid_token().await.unwrap();
    assert_eq!(token, "at-from-login");
    assert_eq!(
        settings.get("sync.refresh_token").as_deref(),
        Some("rt-from-login")
    );
}

#[tokio::test]
async fn refresh_rejection_with_failing_login_leaves_no_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/login"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let settings = settings_with_valid_token();
    use shelfmark_sync::sources::SettingsStore;
    settings.set("sync.token_expires_at", "2020-01-01T00:00:00+00:00");

    let auth = auth_with(&server.uri(), settings.clone());
    let err = auth.get_valid_token().await.unwrap_err();
    assert!(err.is_auth());

    // Refresh rejection cleared both tokens; the failed login stored nothing.
    assert_eq!(settings.get("sync.access_token"), None);
    assert_eq!(settings.get("sync.refresh_token"), None);
    assert_eq!(settings.get("sync.token_expires_at"), None);
}

#[tokio::test]
async fn explicit_refresh_without_token_fails() {
    let server = MockServer::start().await;
    let auth = auth_with(&server.uri(), settings_with_account());
    let err = auth.refresh().await.unwrap_err();
    assert!(matches!(err, SyncError::AuthFailed(_)));
}

// ── Account changes ──

#[tokio::test]
async fn set_account_drops_tokens_from_previous_account() {
    let server = MockServer::start().await;
    let settings = settings_with_valid_token();
    let auth = auth_with(&server.uri(), settings.clone());

    auth.set_account("other", "secret", None).await;

    use shelfmark_sync::sources::SettingsStore;
    assert_eq!(settings.get("sync.access_token"), None);
    assert_eq!(settings.get("sync.username").as_deref(), Some("other"));
    let creds = auth.credentials().await;
    assert!(creds.access_token.is_none());
    assert!(creds.token_expires_at.is_none());
}
