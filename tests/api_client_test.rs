mod common;

use common::{
    CONNECTION_ID, CUSTOMER_ID, FakeTransport, FixedCipher, SID, provider, stored_auth,
    stored_customer, test_config,
};
use ekiwi::api::{ApiClient, HttpMethod};
use ekiwi::cipher::md5_hex;
use ekiwi::persistence::{
    AUTH_SESSION_KEY, CUSTOMER_SESSION_KEY, FileSessionStore, MemorySessionStore, SessionStore,
};
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

fn client(transport: Arc<FakeTransport>, store: Arc<dyn SessionStore>) -> ApiClient {
    ApiClient::new(
        &test_config(),
        transport,
        store,
        Arc::new(FixedCipher::default()),
    )
    .unwrap()
}

fn with_custom_routes() -> FakeTransport {
    FakeTransport::new(|req| match common::path(req) {
        "/custom/" => json!({"data": {"x": 1}}),
        "/expired/" => json!({"error": {"code": 401, "title": "Unauthorized", "detail": "login"}}),
        "/forbidden/" => json!({"error": {"code": "403", "title": "Forbidden", "detail": ""}}),
        _ => provider(req),
    })
}

#[tokio::test]
async fn request_returns_data_field() {
    let transport = Arc::new(with_custom_routes());
    let api = client(transport.clone(), Arc::new(MemorySessionStore::new()));

    let data = api.get("/custom/").await.unwrap();
    assert_eq!(data, json!({"x": 1}));

    // bootstrap, login, then the call itself
    assert_eq!(transport.count("/at/"), 1);
    assert_eq!(transport.count("/login/"), 1);
    assert_eq!(transport.count("/custom/"), 1);
}

#[tokio::test]
async fn authenticated_request_carries_all_headers() {
    let transport = Arc::new(with_custom_routes());
    let api = client(transport.clone(), Arc::new(MemorySessionStore::new()));
    api.get("/custom/").await.unwrap();

    let req = transport.last("/custom/").unwrap();
    assert_eq!(req.url, "https://api.test/custom/");
    assert_eq!(req.header("x-client"), Some("ek-app"));
    assert_eq!(req.header("x-apiversion"), Some("1_1"));
    assert_eq!(
        req.header("x-requested-with"),
        Some("nz.co.electrickiwi.mobile.app")
    );
    assert!(req.header("user-agent").is_some());
    assert_eq!(req.header("x-sid"), Some(SID));
    let token = req.header("x-token").unwrap();
    assert!(token.starts_with("CIPH") && token.ends_with("ERTEXT"));
}

#[tokio::test]
async fn login_is_signed_and_sends_password_digest() {
    let transport = Arc::new(FakeTransport::provider());
    let api = client(transport.clone(), Arc::new(MemorySessionStore::new()));

    let customer = api.customer().await.unwrap();
    assert_eq!(customer.customer_id, CUSTOMER_ID);
    assert_eq!(customer.connection_id, CONNECTION_ID);
    assert_eq!(customer.session_id, SID);

    let login = transport.last("/login/").unwrap();
    assert_eq!(login.method, HttpMethod::Post);
    assert!(login.header("x-token").is_some());
    assert!(login.header("x-sid").is_none());
    assert_eq!(
        login.body,
        Some(json!({"email": "someone@example.com", "password": md5_hex("password")}))
    );
}

#[tokio::test]
async fn login_required_invalidates_both_sessions() {
    let transport = Arc::new(with_custom_routes());
    let api = client(transport.clone(), Arc::new(MemorySessionStore::new()));

    let err = api.get("/expired/").await.unwrap_err();
    let remote = err.remote().unwrap();
    assert_eq!(remote.code, 401);
    assert!(remote.login_required);
    assert!(err.is_login_required());

    assert!(api.auth_manager().peek().await.is_none());
    assert!(api.customer_manager().peek().await.is_none());

    // Next call starts over; the client never retried on its own
    assert_eq!(transport.count("/expired/"), 1);
    api.get("/custom/").await.unwrap();
    assert_eq!(transport.count("/at/"), 2);
    assert_eq!(transport.count("/login/"), 2);
}

#[tokio::test]
async fn other_remote_errors_keep_sessions() {
    let transport = Arc::new(with_custom_routes());
    let api = client(transport.clone(), Arc::new(MemorySessionStore::new()));

    let err = api.get("/forbidden/").await.unwrap_err();
    assert_eq!(err.remote().unwrap().code, 403);
    assert!(!err.is_login_required());
    assert!(api.customer_manager().peek().await.is_some());
}

#[tokio::test]
async fn stored_sessions_skip_bootstrap_and_login() {
    let transport = Arc::new(with_custom_routes());
    let store = Arc::new(
        MemorySessionStore::new()
            .with_record(AUTH_SESSION_KEY, stored_auth())
            .with_record(CUSTOMER_SESSION_KEY, stored_customer()),
    );
    let api = client(transport.clone(), store);

    api.get("/custom/").await.unwrap();
    assert_eq!(transport.count("/at/"), 0);
    assert_eq!(transport.count("/login/"), 0);
}

#[tokio::test]
async fn login_with_missing_customer_index_fails() {
    let mut config = test_config();
    config.account.customer_index = 3;
    let transport = Arc::new(FakeTransport::provider());
    let api = ApiClient::new(
        &config,
        transport,
        Arc::new(MemorySessionStore::new()),
        Arc::new(FixedCipher::default()),
    )
    .unwrap();

    let err = api.customer().await.unwrap_err();
    assert!(matches!(err, ekiwi::EkiwiError::Api { .. }));
    assert!(api.customer_manager().peek().await.is_none());
}

#[tokio::test]
async fn sessions_survive_restart_through_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sessions.json");

    let transport = Arc::new(with_custom_routes());
    let api = client(transport.clone(), Arc::new(FileSessionStore::new(&path)));
    api.get("/custom/").await.unwrap();
    drop(api);

    // A second client over the same file reuses both records
    let transport = Arc::new(with_custom_routes());
    let api = client(transport.clone(), Arc::new(FileSessionStore::new(&path)));
    api.get("/custom/").await.unwrap();
    assert_eq!(transport.count("/at/"), 0);
    assert_eq!(transport.count("/login/"), 0);
}

#[tokio::test]
async fn missing_credentials_fail_before_login() {
    let mut config = test_config();
    config.account.password.clear();
    let transport = Arc::new(FakeTransport::provider());
    let api = ApiClient::new(
        &config,
        transport.clone(),
        Arc::new(MemorySessionStore::new()),
        Arc::new(FixedCipher::default()),
    )
    .unwrap();

    let err = api.customer().await.unwrap_err();
    assert!(matches!(err, ekiwi::EkiwiError::Config { .. }));
    assert_eq!(transport.count("/login/"), 0);
}

#[tokio::test]
async fn login_rejected_clears_stored_auth_session() {
    let logins = AtomicUsize::new(0);
    let transport = Arc::new(FakeTransport::new(move |req| {
        if common::path(req) == "/login/" && logins.fetch_add(1, Ordering::SeqCst) == 0 {
            return json!({"error": {"code": 401, "title": "Unauthorized", "detail": "token"}});
        }
        provider(req)
    }));
    let store = Arc::new(MemorySessionStore::new().with_record(AUTH_SESSION_KEY, stored_auth()));
    let api = client(transport.clone(), store.clone());

    let err = api.get("/custom/").await.unwrap_err();
    assert!(err.is_login_required());
    assert!(api.auth_manager().peek().await.is_none());
    assert_eq!(store.load(AUTH_SESSION_KEY).unwrap(), None);
    assert_eq!(transport.count("/at/"), 0);

    // The rejected auth session is replaced by a fresh bootstrap
    api.get("/custom/").await.unwrap();
    assert_eq!(transport.count("/at/"), 1);
    assert_eq!(transport.count("/login/"), 2);
}

#[tokio::test]
async fn customer_lookup_login_rejection_clears_sessions() {
    let transport = Arc::new(FakeTransport::new(|req| {
        if common::path(req) == "/login/" {
            return json!({"error": {"code": 401, "title": "Unauthorized", "detail": "token"}});
        }
        provider(req)
    }));
    let api = client(transport.clone(), Arc::new(MemorySessionStore::new()));

    assert!(api.customer().await.unwrap_err().is_login_required());
    assert!(api.auth_manager().peek().await.is_none());
}

#[tokio::test]
async fn restart_after_login_required_starts_over() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sessions.json");

    let transport = Arc::new(with_custom_routes());
    let store = Arc::new(FileSessionStore::new(&path));
    let api = client(transport, store.clone());
    api.get("/custom/").await.unwrap();
    assert!(api.get("/expired/").await.is_err());
    assert_eq!(store.load(AUTH_SESSION_KEY).unwrap(), None);
    assert_eq!(store.load(CUSTOMER_SESSION_KEY).unwrap(), None);
    drop(api);

    let transport = Arc::new(with_custom_routes());
    let api = client(transport.clone(), Arc::new(FileSessionStore::new(&path)));
    api.get("/custom/").await.unwrap();
    assert_eq!(transport.count("/at/"), 1);
    assert_eq!(transport.count("/login/"), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_callers_share_one_login() {
    let transport = Arc::new(FakeTransport::provider().with_delay(Duration::from_millis(50)));
    let api = Arc::new(client(transport.clone(), Arc::new(MemorySessionStore::new())));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let api = api.clone();
            tokio::spawn(async move { api.customer().await })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap().session_id, SID);
    }

    assert_eq!(transport.count("/at/"), 1);
    assert_eq!(transport.count("/login/"), 1);
}
