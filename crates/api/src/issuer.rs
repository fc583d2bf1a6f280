// Path: crates/api/src/issuer.rs

//! The shared issuer status latch and the health-check interface.
//!
//! [`IssuerStatus`] is the one-bit failing latch plus the short-lived
//! health-check cache, shared between the account client (which writes it
//! on every authenticated call) and the access façade (which reads it to
//! gate fallback zones). Both sides touch it through atomics only.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// How long a health-check result stays fresh.
pub const HEALTH_CACHE_TTL: Duration = Duration::from_secs(30);

const HEALTH_UNKNOWN: u8 = 0;
const HEALTH_OK: u8 = 1;
const HEALTH_FAILED: u8 = 2;

/// Performs the issuer health check. Implemented by the account client.
#[async_trait]
pub trait HealthChecker: Send + Sync {
    /// Returns whether the issuer answered its health route.
    async fn check_health(&self) -> bool;
}

/// Process-wide issuer status: the failing latch and the health cache.
#[derive(Debug, Default)]
pub struct IssuerStatus {
    failing: AtomicBool,
    health: AtomicU8,
    health_checked_at_ms: AtomicU64,
}

impl IssuerStatus {
    /// Creates a fresh status: not failing, health unknown.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the issuer-failing latch is set.
    pub fn is_failing(&self) -> bool {
        self.failing.load(Ordering::Acquire)
    }

    /// Sets or clears the failing latch. A state change invalidates the
    /// health cache so the next health query observes the transition.
    pub fn set_failing(&self, failing: bool) {
        let prev = self.failing.swap(failing, Ordering::AcqRel);
        if prev != failing {
            self.invalidate_health();
        }
    }

    /// Records a health-check outcome and refreshes the cache timestamp.
    pub fn record_health(&self, ok: bool) {
        self.health.store(
            if ok { HEALTH_OK } else { HEALTH_FAILED },
            Ordering::Release,
        );
        self.health_checked_at_ms
            .store(now_ms(), Ordering::Release);
        if ok {
            self.failing.store(false, Ordering::Release);
        }
    }

    /// Returns the cached health result, or `None` when the cache is
    /// empty or older than [`HEALTH_CACHE_TTL`].
    pub fn cached_health(&self) -> Option<bool> {
        let checked = self.health_checked_at_ms.load(Ordering::Acquire);
        if checked == 0 {
            return None;
        }
        let age = now_ms().saturating_sub(checked);
        if age > HEALTH_CACHE_TTL.as_millis() as u64 {
            return None;
        }
        match self.health.load(Ordering::Acquire) {
            HEALTH_OK => Some(true),
            HEALTH_FAILED => Some(false),
            _ => None,
        }
    }

    /// Drops the cached health result.
    pub fn invalidate_health(&self) {
        self.health.store(HEALTH_UNKNOWN, Ordering::Release);
        self.health_checked_at_ms.store(0, Ordering::Release);
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
