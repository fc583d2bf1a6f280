// Path: crates/account/src/client.rs

//! The account server client.
//!
//! Five routes against a configured base URL: authenticate, user profile,
//! token-request setup, token-request issue, and health. Authenticated
//! routes carry the device id and the last-observed session bearer in
//! request headers; every successful response rotates the bearer, which is
//! persisted before the response body is surfaced to the caller.
//!
//! The cached user record and the cached bearer live behind one mutex, so
//! authenticated calls serialize and bearer rotation is atomic with
//! respect to the call that produced it.

use crate::wire::WireFormat;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, ACCEPT, CONTENT_TYPE};
use reqwest::Method;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::{Mutex, MutexGuard};
use veil_access::{protocol, Registry};
use veil_api::issuer::{HealthChecker, IssuerStatus};
use veil_api::storage::{Record, RecordStore};
use veil_types::account::{
    AuthTokenRecord, PlanView, SessionBearer, SubscriptionView, UserRecord, UserState,
};
use veil_types::codec;
use veil_types::config::AccountConfig;
use veil_types::error::AccountError;
use veil_types::keys::{token_storage_key, ACCOUNT_AUTH_TOKEN_KEY, ACCOUNT_USER_KEY};
use veil_types::protocol::{IssuedTokens, SetupResponse};

/// Request header carrying the device id.
pub const HEADER_DEVICE: &str = "Device-17";
/// Request header carrying the session bearer.
pub const HEADER_TOKEN: &str = "Token-17";
/// Response header carrying the rotated bearer.
pub const HEADER_NEXT_TOKEN: &str = "Next-Token-17";
/// Legacy variant of [`HEADER_NEXT_TOKEN`] still emitted by old servers.
pub const HEADER_NEXT_TOKEN_LEGACY: &str = "Next_token_17";

const ROUTE_AUTHENTICATE: &str = "/api/v1/authenticate";
const ROUTE_PROFILE: &str = "/api/v1/user/profile";
const ROUTE_TOKEN_SETUP: &str = "/api/v1/token/request/setup";
const ROUTE_TOKEN_ISSUE: &str = "/api/v1/token/request/issue";
const ROUTE_HEALTH: &str = "/api/v1/health";

const STATUS_INVALID_AUTH: u16 = 401;
const STATUS_INVALID_DEVICE: u16 = 410;
const STATUS_DEVICE_INACTIVE: u16 = 423;
const STATUS_DEVICE_LIMIT: u16 = 429;

/// The profile payload of the authenticate and profile routes.
#[derive(serde::Deserialize, Debug)]
pub struct ProfileResponse {
    /// The account username.
    pub username: String,
    /// The device id the issuer assigned this session.
    #[serde(default)]
    pub device_id: Option<String>,
    /// Whether the issuer suspended the account.
    #[serde(default)]
    pub suspended: bool,
    /// The subscription view.
    #[serde(default)]
    pub subscription: Option<SubscriptionView>,
    /// The plan view.
    #[serde(default)]
    pub plan: Option<PlanView>,
}

/// How much state a logout tears down.
pub enum LogoutMode {
    /// Keep username, device, bearer, and inventory; mark logged out.
    Shallow,
    /// Keep username and device; drop the bearer and the cached
    /// subscription state.
    Regular,
    /// Delete the user, the bearer, and the named zone inventories.
    Purge {
        /// Zones whose persisted inventories are deleted.
        zones: Vec<String>,
    },
}

#[derive(Default)]
struct SessionCache {
    user: Option<UserRecord>,
    auth: Option<AuthTokenRecord>,
}

/// The account server client.
pub struct AccountClient {
    http: reqwest::Client,
    base_url: String,
    store: Arc<dyn RecordStore>,
    status: Arc<IssuerStatus>,
    session: Mutex<SessionCache>,
    enable_after_login: bool,
}

impl AccountClient {
    /// Builds the client from its configuration.
    pub fn new(
        config: &AccountConfig,
        store: Arc<dyn RecordStore>,
        status: Arc<IssuerStatus>,
    ) -> Result<Self, AccountError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AccountError::Connection(e.to_string()))?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            store,
            status,
            session: Mutex::new(SessionCache::default()),
            enable_after_login: config.enable_after_login,
        })
    }

    /// The shared issuer status.
    pub fn status(&self) -> &Arc<IssuerStatus> {
        &self.status
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ---- session cache ----------------------------------------------------

    async fn user_locked(
        &self,
        session: &mut MutexGuard<'_, SessionCache>,
    ) -> Result<Option<UserRecord>, AccountError> {
        if session.user.is_none() {
            if let Some(record) = self.store.get(ACCOUNT_USER_KEY).await? {
                let user = codec::from_bytes_canonical(&record.payload)
                    .map_err(AccountError::Unknown)?;
                session.user = Some(user);
            }
        }
        Ok(session.user.clone())
    }

    async fn put_user_locked(
        &self,
        session: &mut MutexGuard<'_, SessionCache>,
        user: UserRecord,
    ) -> Result<(), AccountError> {
        let payload = codec::to_bytes_canonical(&user).map_err(AccountError::Unknown)?;
        self.store.put(ACCOUNT_USER_KEY, Record::new(payload)).await?;
        session.user = Some(user);
        Ok(())
    }

    async fn auth_locked(
        &self,
        session: &mut MutexGuard<'_, SessionCache>,
    ) -> Result<Option<AuthTokenRecord>, AccountError> {
        if session.auth.is_none() {
            if let Some(record) = self.store.get(ACCOUNT_AUTH_TOKEN_KEY).await? {
                let auth = codec::from_bytes_canonical(&record.payload)
                    .map_err(AccountError::Unknown)?;
                session.auth = Some(auth);
            }
        }
        Ok(session.auth.clone())
    }

    async fn put_auth_locked(
        &self,
        session: &mut MutexGuard<'_, SessionCache>,
        auth: AuthTokenRecord,
    ) -> Result<(), AccountError> {
        let payload = codec::to_bytes_canonical(&auth).map_err(AccountError::Unknown)?;
        self.store
            .put(ACCOUNT_AUTH_TOKEN_KEY, Record::new(payload).secret())
            .await?;
        session.auth = Some(auth);
        Ok(())
    }

    /// The cached user record, read through to the store.
    pub async fn user(&self) -> Result<Option<UserRecord>, AccountError> {
        let mut session = self.session.lock().await;
        self.user_locked(&mut session).await
    }

    // ---- status mapping ---------------------------------------------------

    async fn map_error_status(
        &self,
        status: u16,
        session: &mut MutexGuard<'_, SessionCache>,
    ) -> AccountError {
        let (error, message) = match status {
            STATUS_INVALID_AUTH | STATUS_INVALID_DEVICE => (
                AccountError::InvalidCredentials,
                "Login failed, please log in again.",
            ),
            STATUS_DEVICE_LIMIT => (
                AccountError::DeviceLimitReached,
                "This account has reached its device limit.",
            ),
            STATUS_DEVICE_INACTIVE => (
                AccountError::DeviceIsLocked,
                "This device has been locked.",
            ),
            other => {
                self.status.set_failing(true);
                return AccountError::Unknown(format!("unexpected status {other}"));
            }
        };

        // Credential-class problems disable the cached subscription and
        // surface a message with the Login/Logout actions.
        match self.user_locked(session).await {
            Ok(Some(mut user)) => {
                user.disable_subscription(message);
                if let Err(e) = self.put_user_locked(session, user).await {
                    tracing::warn!(error = %e, "failed to update user view");
                }
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "failed to load user for view update"),
        }
        error
    }

    fn next_bearer(headers: &HeaderMap) -> Option<String> {
        headers
            .get(HEADER_NEXT_TOKEN)
            .or_else(|| headers.get(HEADER_NEXT_TOKEN_LEGACY))
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string())
    }

    async fn rotate_bearer_locked(
        &self,
        session: &mut MutexGuard<'_, SessionCache>,
        next: Option<String>,
        require_next: bool,
    ) -> Result<(), AccountError> {
        let Some(next) = next else {
            if require_next {
                return Err(AccountError::Rotation("response carried no next token".into()));
            }
            tracing::debug!("response carried no next token");
            return Ok(());
        };
        let Some(mut auth) = self.auth_locked(session).await? else {
            return Err(AccountError::NotLoggedIn);
        };
        auth.token = SessionBearer::new(next);
        match self.put_auth_locked(session, auth).await {
            Ok(()) => Ok(()),
            Err(e) if require_next => Err(AccountError::Rotation(e.to_string())),
            Err(e) => {
                tracing::warn!(error = %e, "failed to persist rotated bearer");
                Ok(())
            }
        }
    }

    // ---- core authenticated request ---------------------------------------

    async fn send_authenticated(
        &self,
        method: Method,
        path: &str,
        body: Option<(Vec<u8>, WireFormat)>,
        accept: WireFormat,
        require_next: bool,
    ) -> Result<Vec<u8>, AccountError> {
        let mut session = self.session.lock().await;
        let auth = self
            .auth_locked(&mut session)
            .await?
            .ok_or(AccountError::NotLoggedIn)?;

        let mut request = self
            .http
            .request(method, self.url(path))
            .header(HEADER_TOKEN, auth.token.as_str())
            .header(HEADER_DEVICE, &auth.device_id)
            .header(ACCEPT, accept.content_type());
        if let Some((bytes, format)) = body {
            request = request
                .header(CONTENT_TYPE, format.content_type())
                .body(bytes);
        }

        let response = request.send().await.map_err(|e| {
            self.status.set_failing(true);
            AccountError::Connection(e.to_string())
        })?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            return Err(self.map_error_status(status, &mut session).await);
        }

        let next = Self::next_bearer(response.headers());
        self.rotate_bearer_locked(&mut session, next, require_next)
            .await?;
        self.status.set_failing(false);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AccountError::Connection(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    // ---- routes -----------------------------------------------------------

    /// Logs in with HTTP Basic credentials.
    ///
    /// Re-uses the prior device id when the username matches, so the
    /// device identity survives re-login; retries once without the device
    /// id when the issuer reports it invalid. Persists the user record and
    /// the initial bearer before returning.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<UserRecord, AccountError> {
        let mut session = self.session.lock().await;

        let prior_device = self
            .user_locked(&mut session)
            .await
            .ok()
            .flatten()
            .filter(|user| user.username == username)
            .and_then(|user| user.device_id);

        let mut response = self
            .authenticate_raw(username, password, prior_device.as_deref())
            .await?;
        if response.status().as_u16() == STATUS_INVALID_DEVICE && prior_device.is_some() {
            tracing::info!("issuer rejected the stored device id, retrying without it");
            response = self.authenticate_raw(username, password, None).await?;
        }

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            return Err(self.map_error_status(status, &mut session).await);
        }

        let next = Self::next_bearer(response.headers())
            .ok_or_else(|| AccountError::Rotation("login response carried no token".into()))?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| AccountError::Connection(e.to_string()))?;
        let profile: ProfileResponse = WireFormat::Json.decode(&bytes)?;

        let device_id = profile
            .device_id
            .clone()
            .or(prior_device)
            .ok_or_else(|| AccountError::Unknown("issuer assigned no device id".into()))?;

        self.put_auth_locked(
            &mut session,
            AuthTokenRecord {
                device_id: device_id.clone(),
                token: SessionBearer::new(next),
            },
        )
        .await?;

        let mut user = UserRecord {
            username: profile.username.clone(),
            device_id: Some(device_id),
            state: if profile.suspended {
                UserState::Suspended
            } else {
                UserState::LoggedIn
            },
            subscription: profile.subscription,
            plan: profile.plan,
            logged_in_at: Some(now_secs()),
            ..Default::default()
        };
        user.view.show_logout = true;
        self.put_user_locked(&mut session, user.clone()).await?;
        self.status.set_failing(false);

        if self.enable_after_login && user.may_use_relay() {
            tracing::info!(username = %user.username, "login complete, relay use permitted");
        }
        Ok(user)
    }

    async fn authenticate_raw(
        &self,
        username: &str,
        password: &str,
        device_id: Option<&str>,
    ) -> Result<reqwest::Response, AccountError> {
        let mut request = self
            .http
            .post(self.url(ROUTE_AUTHENTICATE))
            .basic_auth(username, Some(password))
            .header(ACCEPT, WireFormat::Json.content_type());
        if let Some(device_id) = device_id {
            request = request.header(HEADER_DEVICE, device_id);
        }
        request.send().await.map_err(|e| {
            self.status.set_failing(true);
            AccountError::Connection(e.to_string())
        })
    }

    /// Refreshes the cached user profile from the issuer.
    pub async fn update_profile(&self) -> Result<UserRecord, AccountError> {
        let bytes = self
            .send_authenticated(Method::GET, ROUTE_PROFILE, None, WireFormat::Json, true)
            .await?;
        let profile: ProfileResponse = WireFormat::Json.decode(&bytes)?;

        let mut session = self.session.lock().await;
        let mut user = self
            .user_locked(&mut session)
            .await?
            .ok_or(AccountError::NotLoggedIn)?;
        user.state = if profile.suspended {
            UserState::Suspended
        } else {
            user.state
        };
        user.subscription = profile.subscription;
        user.plan = profile.plan;
        self.put_user_locked(&mut session, user.clone()).await?;
        Ok(user)
    }

    /// Runs the two-phase token-request RPC and feeds the results to the
    /// zone handlers.
    pub async fn request_tokens(&self, registry: &Registry) -> Result<(), AccountError> {
        let (setup_request, setup_required) = protocol::create_setup_request(registry);

        let setup_response: Option<SetupResponse> = if setup_required {
            let body = WireFormat::MsgPack.encode(&setup_request)?;
            let bytes = self
                .send_authenticated(
                    Method::POST,
                    ROUTE_TOKEN_SETUP,
                    Some((body, WireFormat::MsgPack)),
                    WireFormat::MsgPack,
                    false,
                )
                .await?;
            Some(WireFormat::MsgPack.decode(&bytes)?)
        } else {
            None
        };

        let (token_request, request_required) =
            protocol::create_token_request(registry, setup_response.as_ref())?;
        if !request_required {
            tracing::debug!("no zone wants tokens, skipping issue phase");
            return Ok(());
        }

        let body = WireFormat::MsgPack.encode(&token_request)?;
        let bytes = self
            .send_authenticated(
                Method::POST,
                ROUTE_TOKEN_ISSUE,
                Some((body, WireFormat::MsgPack)),
                WireFormat::MsgPack,
                false,
            )
            .await?;
        let issued: IssuedTokens = WireFormat::MsgPack.decode(&bytes)?;
        protocol::process_issued_tokens(registry, &issued)?;
        Ok(())
    }

    /// Checks the issuer health route and records the outcome.
    pub async fn health(&self) -> bool {
        let ok = match self.http.get(self.url(ROUTE_HEALTH)).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(error = %e, "health check failed");
                false
            }
        };
        self.status.record_health(ok);
        ok
    }

    /// Logs out, tearing down as much state as `mode` asks for.
    pub async fn logout(&self, mode: LogoutMode) -> Result<(), AccountError> {
        let mut session = self.session.lock().await;
        match mode {
            LogoutMode::Shallow => {
                if let Some(mut user) = self.user_locked(&mut session).await? {
                    user.state = UserState::LoggedOut;
                    user.view.show_login = true;
                    user.view.show_logout = false;
                    self.put_user_locked(&mut session, user).await?;
                }
            }
            LogoutMode::Regular => {
                if let Some(user) = self.user_locked(&mut session).await? {
                    let reset = UserRecord {
                        username: user.username,
                        device_id: user.device_id,
                        state: UserState::LoggedOut,
                        view: veil_types::account::UserView {
                            show_login: true,
                            ..Default::default()
                        },
                        ..Default::default()
                    };
                    self.put_user_locked(&mut session, reset).await?;
                }
                self.store.delete(ACCOUNT_AUTH_TOKEN_KEY).await?;
                session.auth = None;
            }
            LogoutMode::Purge { zones } => {
                self.store.delete(ACCOUNT_USER_KEY).await?;
                self.store.delete(ACCOUNT_AUTH_TOKEN_KEY).await?;
                for zone in &zones {
                    self.store.delete(&token_storage_key(zone)).await?;
                }
                session.user = None;
                session.auth = None;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl HealthChecker for AccountClient {
    async fn check_health(&self) -> bool {
        self.health().await
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
