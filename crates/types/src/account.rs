// Path: crates/types/src/account.rs

//! Cached user, session, and subscription records.
//!
//! These are the records the account client keeps in the local store:
//! the [`UserRecord`] mirrors the issuer's view of the logged-in user, and
//! the [`AuthTokenRecord`] carries the rotated session bearer. The bearer
//! is session-identifying material and is therefore held in a dedicated
//! type with redacted `Debug` output that zeroes its memory on drop. The
//! device id is not sensitive and may be logged.

use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// The login state of the cached user record.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum UserState {
    /// No login has ever been observed.
    #[default]
    None,
    /// The user is logged in.
    LoggedIn,
    /// The user logged out; username and device may be retained.
    LoggedOut,
    /// The issuer suspended the account.
    Suspended,
}

/// The issuer's view of the user's subscription.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug, Default)]
pub struct SubscriptionView {
    /// Whether the subscription currently grants access.
    pub active: bool,
    /// Unix seconds at which the subscription ends, if bounded.
    pub ends_at: Option<u64>,
    /// Unix seconds of the next billing event, if any.
    pub next_billing_at: Option<u64>,
}

/// The issuer's view of the user's plan.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug, Default)]
pub struct PlanView {
    /// Human-readable plan name.
    pub name: String,
    /// Whether the plan permits use of the relay network.
    pub relay_access: bool,
}

/// What the configuration UI should currently show for the account.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug, Default)]
pub struct UserView {
    /// A message to surface to the user, empty when all is well.
    pub message: String,
    /// Whether a Login action should be offered.
    pub show_login: bool,
    /// Whether a Logout action should be offered.
    pub show_logout: bool,
}

/// The cached user record, persisted under
/// [`crate::keys::ACCOUNT_USER_KEY`].
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug, Default)]
pub struct UserRecord {
    /// The account username.
    pub username: String,
    /// The device id assigned by the issuer, if one was ever issued.
    pub device_id: Option<String>,
    /// The login state.
    pub state: UserState,
    /// The subscription view, absent when the issuer reported none.
    pub subscription: Option<SubscriptionView>,
    /// The plan view, absent when the issuer reported none.
    pub plan: Option<PlanView>,
    /// What the UI should show.
    pub view: UserView,
    /// Unix seconds of the last user-facing notification, if any.
    pub last_notified_at: Option<u64>,
    /// Unix seconds of the last successful login, if any.
    pub logged_in_at: Option<u64>,
}

impl UserRecord {
    /// Whether this record represents a logged-in user.
    pub fn is_logged_in(&self) -> bool {
        self.state == UserState::LoggedIn
    }

    /// Whether the user's plan currently permits relay use.
    pub fn may_use_relay(&self) -> bool {
        self.is_logged_in()
            && self.plan.as_ref().is_some_and(|p| p.relay_access)
            && self.subscription.as_ref().is_some_and(|s| s.active)
    }

    /// Clears the subscription and puts a message plus the Login/Logout
    /// actions into the user view. Used when the issuer reports a
    /// credential-class problem.
    pub fn disable_subscription(&mut self, message: impl Into<String>) {
        if let Some(sub) = self.subscription.as_mut() {
            sub.active = false;
        }
        self.view = UserView {
            message: message.into(),
            show_login: true,
            show_logout: true,
        };
    }
}

/// The rotated session bearer. Redacted in `Debug`, zeroed on drop.
///
/// This is the short-lived header token identifying the device session at
/// the issuer. It is unrelated to the anonymous access tokens handled by
/// the zone handlers.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct SessionBearer(String);

impl SessionBearer {
    /// Wraps a bearer string.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the bearer for use in a request header.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionBearer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionBearer(<redacted>)")
    }
}

/// The session bearer record, persisted under
/// [`crate::keys::ACCOUNT_AUTH_TOKEN_KEY`], marked secret and crown-jewel.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug)]
pub struct AuthTokenRecord {
    /// The device id the bearer belongs to.
    pub device_id: String,
    /// The most recently observed next-bearer value.
    pub token: SessionBearer,
}
