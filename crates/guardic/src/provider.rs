//!
//! Collaborator seams consulted during rule evaluation.
//!
//! The inspector holds these as opaque handles: hosts plug in role-based,
//! token-based, or custom providers without the core changing. Permission,
//! role, and rate-limit capabilities are guard-phase only; the boundary
//! phase never awaits a collaborator.
//!

use crate::types::Principal;
use async_trait::async_trait;

///
/// AuthProvider
///

#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Whether the caller holds the named permission. Guard phase only.
    ///
    /// `Err` carries the denial reason surfaced to the host.
    async fn has_permission(&self, caller: Principal, permission: &str) -> Result<(), String>;

    /// Whether the caller holds the named role. Guard phase only.
    async fn has_role(&self, caller: Principal, role: &str) -> bool;

    /// Cheap identity check, callable in either phase.
    fn is_authenticated(&self, caller: Principal) -> bool {
        caller != Principal::anonymous()
    }
}

///
/// RateLimitDecision
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RateLimitDecision {
    Allowed,
    Denied(String),
}

///
/// RateLimiter
///
/// `check` should be side-effect-light; hosts call `record` after a
/// successful admission if their accounting needs it.
///

#[async_trait]
pub trait RateLimiter: Send + Sync {
    async fn check(&self, caller: Principal, method_name: &str) -> RateLimitDecision;

    async fn record(&self, caller: Principal, method_name: &str);
}

///
/// TelemetrySink
/// Fire-and-forget event recorder; absent by default.
///

pub trait TelemetrySink: Send + Sync {
    fn record_rejection(&self, method_name: &str, caller: Principal, reason: &str);

    fn record_admission(&self, method_name: &str, caller: Principal);
}
