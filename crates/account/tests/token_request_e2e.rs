// Path: crates/account/tests/token_request_e2e.rs

//! The two-phase token-request RPC end to end: a client registry is
//! filled through the MsgPack routes of a mock issuer that drives the
//! issuer halves of the same protocol code.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use rand::rngs::OsRng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use veil_access::handlers::{BlindConfig, BlindHandler, HashConfig, HashHandler};
use veil_access::{protocol, Registry};
use veil_account::client::AccountClient;
use veil_api::handler::TokenHandler;
use veil_api::issuer::IssuerStatus;
use veil_crypto::digests::DigestAlg;
use veil_crypto::pblind::{NistP256, SigningKey};
use veil_storage::MemoryStore;
use veil_types::config::AccountConfig;
use veil_types::protocol::{SetupRequest, TokenRequest};

const BATCH: usize = 5;

struct MockIssuer {
    registry: Registry,
    bearer_counter: AtomicU64,
}

impl MockIssuer {
    fn rotate(&self) -> (HeaderName, HeaderValue) {
        let next = format!("B{}", self.bearer_counter.fetch_add(1, Ordering::SeqCst));
        (
            HeaderName::from_static("next-token-17"),
            HeaderValue::from_str(&next).unwrap(),
        )
    }
}

fn issuer_registry(key: &SigningKey<NistP256>, preimages: Vec<Vec<u8>>) -> Registry {
    let registry = Registry::new();
    registry
        .register_blind(
            BlindHandler::new(BlindConfig {
                batch_size: BATCH,
                ..BlindConfig::issuer("pblind1", key.clone())
            })
            .unwrap(),
        )
        .unwrap();
    registry
        .register_hash(HashHandler::new(HashConfig::with_preimages(
            "alpha2",
            DigestAlg::Blake2b256,
            preimages,
        )))
        .unwrap();
    registry
}

fn client_registry(key: &SigningKey<NistP256>, digests: Vec<Vec<u8>>) -> Arc<Registry> {
    let registry = Arc::new(Registry::new());
    registry
        .register_blind(
            BlindHandler::new(BlindConfig {
                batch_size: BATCH,
                ..BlindConfig::client("pblind1", key.verifying_key())
            })
            .unwrap(),
        )
        .unwrap();
    registry
        .register_hash(HashHandler::new(HashConfig::verify_only(
            "alpha2",
            DigestAlg::Blake2b256,
            digests,
        )))
        .unwrap();
    registry
}

async fn authenticate(State(issuer): State<Arc<MockIssuer>>) -> impl IntoResponse {
    let (name, value) = issuer.rotate();
    let mut headers = HeaderMap::new();
    headers.insert(name, value);
    let body = serde_json::json!({
        "username": "u",
        "device_id": "D1",
        "subscription": { "active": true },
        "plan": { "name": "plus", "relay_access": true },
    });
    (StatusCode::OK, headers, serde_json::to_vec(&body).unwrap())
}

async fn token_setup(
    State(issuer): State<Arc<MockIssuer>>,
    body: Bytes,
) -> impl IntoResponse {
    let request: SetupRequest = rmp_serde::from_slice(&body).unwrap();
    let response = protocol::handle_setup_request(&issuer.registry, &request).unwrap();
    let (name, value) = issuer.rotate();
    let mut headers = HeaderMap::new();
    headers.insert(name, value);
    (
        StatusCode::OK,
        headers,
        rmp_serde::to_vec_named(&response).unwrap(),
    )
}

async fn token_issue(
    State(issuer): State<Arc<MockIssuer>>,
    body: Bytes,
) -> impl IntoResponse {
    let request: TokenRequest = rmp_serde::from_slice(&body).unwrap();
    let issued = protocol::issue_tokens(&issuer.registry, &request).unwrap();
    let (name, value) = issuer.rotate();
    let mut headers = HeaderMap::new();
    headers.insert(name, value);
    (
        StatusCode::OK,
        headers,
        rmp_serde::to_vec_named(&issued).unwrap(),
    )
}

async fn health() -> StatusCode {
    StatusCode::OK
}

#[tokio::test]
async fn token_request_fills_client_zones_over_http() {
    let key = SigningKey::<NistP256>::random(&mut OsRng);
    let preimages = vec![b"pre-a".to_vec(), b"pre-b".to_vec()];
    let digests = preimages
        .iter()
        .map(|p| DigestAlg::Blake2b256.digest(p))
        .collect();

    let issuer = Arc::new(MockIssuer {
        registry: issuer_registry(&key, preimages),
        bearer_counter: AtomicU64::new(1),
    });
    let app = Router::new()
        .route("/api/v1/authenticate", post(authenticate))
        .route("/api/v1/token/request/setup", post(token_setup))
        .route("/api/v1/token/request/issue", post(token_issue))
        .route("/api/v1/health", get(health))
        .with_state(issuer.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let config = AccountConfig {
        base_url: format!("http://{addr}"),
        ..Default::default()
    };
    let client = AccountClient::new(
        &config,
        Arc::new(MemoryStore::new()),
        Arc::new(IssuerStatus::new()),
    )
    .unwrap();
    client.login("u", "pw").await.unwrap();

    let registry = client_registry(&key, digests);
    client.request_tokens(&registry).await.unwrap();

    // Both zones were filled through the wire.
    assert_eq!(registry.get("pblind1").unwrap().amount(), BATCH);
    assert_eq!(registry.get("alpha2").unwrap().amount(), 2);

    // A second pass has nothing to do: the inventories are full.
    client.request_tokens(&registry).await.unwrap();
    assert_eq!(registry.get("pblind1").unwrap().amount(), BATCH);
    assert_eq!(registry.get("alpha2").unwrap().amount(), 2);

    // Every minted blind token verifies on the issuer side.
    let client_handler = registry.get("pblind1").unwrap();
    let issuer_handler = issuer.registry.get("pblind1").unwrap();
    for _ in 0..BATCH {
        let token = client_handler.get_token().unwrap();
        issuer_handler.verify(&token).unwrap();
    }
}
