// Path: crates/account/tests/bearer_rotation.rs

//! Session bearer rotation and device-id reuse against a mock issuer.

use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use veil_account::client::{AccountClient, HEADER_NEXT_TOKEN, HEADER_NEXT_TOKEN_LEGACY};
use veil_api::issuer::IssuerStatus;
use veil_api::storage::RecordStore;
use veil_storage::MemoryStore;
use veil_types::account::AuthTokenRecord;
use veil_types::codec;
use veil_types::config::AccountConfig;
use veil_types::keys::ACCOUNT_AUTH_TOKEN_KEY;

struct MockIssuer {
    bearer_counter: AtomicU64,
    device_counter: AtomicU64,
    current_bearer: Mutex<Option<String>>,
    observed_bearers: Mutex<Vec<String>>,
    observed_devices: Mutex<Vec<Option<String>>>,
    reject_known_device: AtomicBool,
    use_legacy_header: AtomicBool,
}

impl MockIssuer {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            bearer_counter: AtomicU64::new(1),
            device_counter: AtomicU64::new(1),
            current_bearer: Mutex::new(None),
            observed_bearers: Mutex::new(Vec::new()),
            observed_devices: Mutex::new(Vec::new()),
            reject_known_device: AtomicBool::new(false),
            use_legacy_header: AtomicBool::new(false),
        })
    }

    fn rotate(&self) -> (HeaderName, HeaderValue) {
        let next = format!("B{}", self.bearer_counter.fetch_add(1, Ordering::SeqCst));
        *self.current_bearer.lock().unwrap() = Some(next.clone());
        let name = if self.use_legacy_header.load(Ordering::SeqCst) {
            HeaderName::from_static("next_token_17")
        } else {
            HeaderName::from_static("next-token-17")
        };
        (name, HeaderValue::from_str(&next).unwrap())
    }
}

async fn authenticate(
    State(issuer): State<Arc<MockIssuer>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let device = headers
        .get("Device-17")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    issuer.observed_devices.lock().unwrap().push(device.clone());

    if headers.get("authorization").is_none() {
        return (StatusCode::UNAUTHORIZED, HeaderMap::new(), Vec::new());
    }
    if device.is_some() && issuer.reject_known_device.load(Ordering::SeqCst) {
        return (StatusCode::GONE, HeaderMap::new(), Vec::new());
    }

    let device_id = device.unwrap_or_else(|| {
        format!("D{}", issuer.device_counter.fetch_add(1, Ordering::SeqCst))
    });
    let (name, value) = issuer.rotate();
    let mut response_headers = HeaderMap::new();
    response_headers.insert(name, value);

    let body = serde_json::json!({
        "username": "u",
        "device_id": device_id,
        "subscription": { "active": true },
        "plan": { "name": "plus", "relay_access": true },
    });
    (
        StatusCode::OK,
        response_headers,
        serde_json::to_vec(&body).unwrap(),
    )
}

async fn profile(State(issuer): State<Arc<MockIssuer>>, headers: HeaderMap) -> impl IntoResponse {
    let bearer = headers
        .get("Token-17")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    issuer.observed_bearers.lock().unwrap().push(bearer.clone());

    let expected = issuer.current_bearer.lock().unwrap().clone();
    if expected.as_deref() != Some(bearer.as_str()) {
        return (StatusCode::UNAUTHORIZED, HeaderMap::new(), Vec::new());
    }

    let (name, value) = issuer.rotate();
    let mut response_headers = HeaderMap::new();
    response_headers.insert(name, value);

    let body = serde_json::json!({
        "username": "u",
        "subscription": { "active": true },
        "plan": { "name": "plus", "relay_access": true },
    });
    (
        StatusCode::OK,
        response_headers,
        serde_json::to_vec(&body).unwrap(),
    )
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn spawn_issuer(issuer: Arc<MockIssuer>) -> String {
    let app = Router::new()
        .route("/api/v1/authenticate", post(authenticate))
        .route("/api/v1/user/profile", get(profile))
        .route("/api/v1/health", get(health))
        .with_state(issuer);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn client_for(base_url: String, store: Arc<MemoryStore>) -> AccountClient {
    let config = AccountConfig {
        base_url,
        ..Default::default()
    };
    AccountClient::new(&config, store, Arc::new(IssuerStatus::new())).unwrap()
}

async fn persisted_bearer(store: &MemoryStore) -> String {
    let record = store.get(ACCOUNT_AUTH_TOKEN_KEY).await.unwrap().unwrap();
    let auth: AuthTokenRecord = codec::from_bytes_canonical(&record.payload).unwrap();
    auth.token.as_str().to_string()
}

#[tokio::test]
async fn bearer_rotates_on_every_authenticated_call() {
    let issuer = MockIssuer::new();
    let base_url = spawn_issuer(issuer.clone()).await;
    let store = Arc::new(MemoryStore::new());
    let client = client_for(base_url, store.clone());

    client.login("u", "pw").await.unwrap();
    assert_eq!(persisted_bearer(&store).await, "B1");

    // The profile call carries B1 and persists the rotated B2.
    client.update_profile().await.unwrap();
    assert_eq!(persisted_bearer(&store).await, "B2");

    // The follow-up call uses B2 on the wire.
    client.update_profile().await.unwrap();
    let observed = issuer.observed_bearers.lock().unwrap().clone();
    assert_eq!(observed, vec!["B1".to_string(), "B2".to_string()]);
    assert_eq!(persisted_bearer(&store).await, "B3");
}

#[tokio::test]
async fn legacy_next_token_header_is_honored() {
    let issuer = MockIssuer::new();
    let base_url = spawn_issuer(issuer.clone()).await;
    let store = Arc::new(MemoryStore::new());
    let client = client_for(base_url, store.clone());

    client.login("u", "pw").await.unwrap();
    issuer.use_legacy_header.store(true, Ordering::SeqCst);

    client.update_profile().await.unwrap();
    assert_eq!(persisted_bearer(&store).await, "B2");

    // Sanity: the two header names differ.
    assert_ne!(HEADER_NEXT_TOKEN, HEADER_NEXT_TOKEN_LEGACY);
}

#[tokio::test]
async fn logout_modes_tear_down_increasing_state() {
    use veil_account::client::LogoutMode;
    use veil_types::account::{UserRecord, UserState};
    use veil_types::keys::ACCOUNT_USER_KEY;

    let issuer = MockIssuer::new();
    let base_url = spawn_issuer(issuer.clone()).await;
    let store = Arc::new(MemoryStore::new());
    let client = client_for(base_url, store.clone());
    client.login("u", "pw").await.unwrap();

    // Shallow: state flips, bearer survives.
    client.logout(LogoutMode::Shallow).await.unwrap();
    let user = client.user().await.unwrap().unwrap();
    assert_eq!(user.state, UserState::LoggedOut);
    assert!(store.get(ACCOUNT_AUTH_TOKEN_KEY).await.unwrap().is_some());

    // Regular: bearer deleted, username and device retained.
    client.login("u", "pw").await.unwrap();
    client.logout(LogoutMode::Regular).await.unwrap();
    let record = store.get(ACCOUNT_USER_KEY).await.unwrap().unwrap();
    let user: UserRecord = codec::from_bytes_canonical(&record.payload).unwrap();
    assert_eq!(user.username, "u");
    assert!(user.device_id.is_some());
    assert!(user.subscription.is_none());
    assert!(store.get(ACCOUNT_AUTH_TOKEN_KEY).await.unwrap().is_none());

    // Purge: everything gone.
    client.login("u", "pw").await.unwrap();
    client
        .logout(LogoutMode::Purge {
            zones: vec!["pblind1".to_string()],
        })
        .await
        .unwrap();
    assert!(store.get(ACCOUNT_USER_KEY).await.unwrap().is_none());
    assert!(store.get(ACCOUNT_AUTH_TOKEN_KEY).await.unwrap().is_none());
    assert!(client.user().await.unwrap().is_none());
}

#[tokio::test]
async fn login_reuses_device_and_retries_without_it() {
    let issuer = MockIssuer::new();
    let base_url = spawn_issuer(issuer.clone()).await;
    let store = Arc::new(MemoryStore::new());
    let client = client_for(base_url, store.clone());

    // First login: no device id yet, the issuer assigns D1.
    let user = client.login("u", "pw").await.unwrap();
    assert_eq!(user.device_id.as_deref(), Some("D1"));

    // Second login: the stored device id is offered.
    let user = client.login("u", "pw").await.unwrap();
    assert_eq!(user.device_id.as_deref(), Some("D1"));

    // Third login: the issuer no longer recognizes the device; the client
    // retries once without it and receives a fresh identity.
    issuer.reject_known_device.store(true, Ordering::SeqCst);
    let user = client.login("u", "pw").await.unwrap();
    assert_eq!(user.device_id.as_deref(), Some("D2"));

    let observed = issuer.observed_devices.lock().unwrap().clone();
    assert_eq!(
        observed,
        vec![
            None,
            Some("D1".to_string()),
            Some("D1".to_string()),
            None,
        ]
    );
}
