//! Guard-phase behavior: collaborator-backed rules, phase isolation, and
//! audit telemetry.

use async_trait::async_trait;
use futures::executor::block_on;
use guardic::{
    prelude::*,
    types::TC,
};
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

const fn p(id: u8) -> Principal {
    Principal::from_slice(&[id; 29])
}

enum Msg {
    Write(String),
    Ping,
}

fn extract_write(msg: &Msg) -> Option<&String> {
    match msg {
        Msg::Write(text) => Some(text),
        _ => None,
    }
}

fn extract_ping(msg: &Msg) -> Option<&()> {
    match msg {
        Msg::Ping => Some(&()),
        _ => None,
    }
}

///
/// CountingAuth
/// Grants `write` to p(1) and the `admin` role to p(2), treats p(9) as
/// unauthenticated, counting every collaborator call so phase isolation
/// is observable.
///

#[derive(Default)]
struct CountingAuth {
    permission_calls: AtomicUsize,
    role_calls: AtomicUsize,
    identity_calls: AtomicUsize,
}

#[async_trait]
impl AuthProvider for CountingAuth {
    async fn has_permission(&self, caller: Principal, permission: &str) -> Result<(), String> {
        self.permission_calls.fetch_add(1, Ordering::SeqCst);

        if permission == "write" && caller == p(1) {
            Ok(())
        } else {
            Err(format!("permission '{permission}' not granted"))
        }
    }

    async fn has_role(&self, caller: Principal, role: &str) -> bool {
        self.role_calls.fetch_add(1, Ordering::SeqCst);
        role == "admin" && caller == p(2)
    }

    fn is_authenticated(&self, caller: Principal) -> bool {
        self.identity_calls.fetch_add(1, Ordering::SeqCst);
        caller != Principal::anonymous() && caller != p(9)
    }
}

struct BudgetLimiter {
    allowed: bool,
}

#[async_trait]
impl RateLimiter for BudgetLimiter {
    async fn check(&self, _caller: Principal, method_name: &str) -> RateLimitDecision {
        if self.allowed {
            RateLimitDecision::Allowed
        } else {
            RateLimitDecision::Denied(format!("budget exhausted for '{method_name}'"))
        }
    }

    async fn record(&self, _caller: Principal, _method_name: &str) {}
}

#[derive(Default)]
struct CountingSink {
    rejections: AtomicUsize,
    admissions: AtomicUsize,
}

impl TelemetrySink for CountingSink {
    fn record_rejection(&self, _method_name: &str, _caller: Principal, _reason: &str) {
        self.rejections.fetch_add(1, Ordering::SeqCst);
    }

    fn record_admission(&self, _method_name: &str, _caller: Principal) {
        self.admissions.fetch_add(1, Ordering::SeqCst);
    }
}

fn write_info(rules: Vec<Rule<String>>) -> MethodGuardInfo<Msg, String> {
    MethodGuardInfo::new("write", false, rules, extract_write)
}

#[test]
fn identity_gate_routes_through_the_auth_provider() {
    let auth = Arc::new(CountingAuth::default());

    let inspector: Inspector<Msg> =
        Inspector::new(InspectorConfig::default()).with_auth_provider(Arc::clone(&auth) as Arc<dyn AuthProvider>);

    let msg = Msg::Ping;

    // the provider treats p(9) as unauthenticated even though it is not anonymous
    let revoked = InspectionRequest::boundary("ping", p(9), &[], &msg, false);
    let err = inspector.inspect_check(&revoked).unwrap_err();
    assert_eq!(err.to_string(), "auth: caller is not authenticated");

    let valid = InspectionRequest::boundary("ping", p(1), &[], &msg, false);
    assert!(inspector.inspect_check(&valid).is_ok());

    assert_eq!(auth.identity_calls.load(Ordering::SeqCst), 2);

    // only the boundary-safe capability was consulted
    assert_eq!(auth.permission_calls.load(Ordering::SeqCst), 0);
    assert_eq!(auth.role_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn permission_rule_is_phase_forbidden_at_the_boundary() {
    let auth = Arc::new(CountingAuth::default());

    let mut inspector: Inspector<Msg> =
        Inspector::new(InspectorConfig::default()).with_auth_provider(Arc::clone(&auth) as Arc<dyn AuthProvider>);
    inspector
        .register_boundary(write_info(vec![Rule::require_permission("write")]))
        .unwrap();

    let msg = Msg::Write("data".to_string());
    let req = InspectionRequest::boundary("write", p(1), &[], &msg, false);

    let err = inspector.inspect_check(&req).unwrap_err();
    assert!(err.to_string().starts_with("phase-forbidden:"), "got: {err}");

    // the provider was never consulted
    assert_eq!(auth.permission_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn permission_rule_consults_the_provider_in_guard_phase() {
    let auth = Arc::new(CountingAuth::default());

    let mut inspector: Inspector<Msg> =
        Inspector::new(InspectorConfig::default()).with_auth_provider(Arc::clone(&auth) as Arc<dyn AuthProvider>);
    inspector
        .register_guard(write_info(vec![Rule::require_permission("write")]))
        .unwrap();

    let msg = Msg::Write("data".to_string());

    let granted = InspectionRequest::guard("write", p(1), &[], &msg, false);
    assert!(block_on(inspector.guard_check(&granted)).is_ok());

    let denied = InspectionRequest::guard("write", p(3), &[], &msg, false);
    let err = block_on(inspector.guard_check(&denied)).unwrap_err();
    assert_eq!(err.to_string(), "auth: permission 'write' not granted");

    assert_eq!(auth.permission_calls.load(Ordering::SeqCst), 2);
}

#[test]
fn role_rule_flows() {
    let auth = Arc::new(CountingAuth::default());

    let mut inspector: Inspector<Msg> =
        Inspector::new(InspectorConfig::default()).with_auth_provider(Arc::clone(&auth) as Arc<dyn AuthProvider>);
    inspector
        .register_guard(write_info(vec![Rule::require_role("admin")]))
        .unwrap();

    let msg = Msg::Write("data".to_string());

    let admin = InspectionRequest::guard("write", p(2), &[], &msg, false);
    assert!(block_on(inspector.guard_check(&admin)).is_ok());

    let peon = InspectionRequest::guard("write", p(1), &[], &msg, false);
    let err = block_on(inspector.guard_check(&peon)).unwrap_err();
    assert!(err.to_string().starts_with("auth:"), "got: {err}");

    assert_eq!(auth.role_calls.load(Ordering::SeqCst), 2);
}

#[test]
fn permission_rule_without_provider_fails_closed() {
    let mut inspector: Inspector<Msg> = Inspector::new(InspectorConfig::default());
    inspector
        .register_guard(write_info(vec![Rule::require_permission("write")]))
        .unwrap();

    let msg = Msg::Write("data".to_string());
    let req = InspectionRequest::guard("write", p(1), &[], &msg, false);

    let err = block_on(inspector.guard_check(&req)).unwrap_err();
    assert_eq!(err.to_string(), "auth: no auth provider configured");
}

#[test]
fn rate_limit_rule_passes_without_a_limiter() {
    let mut inspector: Inspector<Msg> = Inspector::new(InspectorConfig::default());
    inspector
        .register_guard(write_info(vec![Rule::RateLimit]))
        .unwrap();

    let msg = Msg::Write("data".to_string());
    let req = InspectionRequest::guard("write", p(1), &[], &msg, false);
    assert!(block_on(inspector.guard_check(&req)).is_ok());
}

#[test]
fn rate_limit_rule_surfaces_the_limiter_denial() {
    let mut inspector: Inspector<Msg> = Inspector::new(InspectorConfig::default())
        .with_rate_limiter(Arc::new(BudgetLimiter { allowed: false }));
    inspector
        .register_guard(write_info(vec![Rule::RateLimit]))
        .unwrap();

    let msg = Msg::Write("data".to_string());
    let req = InspectionRequest::guard("write", p(1), &[], &msg, false);

    let err = block_on(inspector.guard_check(&req)).unwrap_err();
    assert_eq!(err.to_string(), "rate-limit: budget exhausted for 'write'");
}

#[test]
fn block_ingress_is_asymmetric_across_phases() {
    let mut inspector: Inspector<Msg> = Inspector::new(InspectorConfig::default());
    inspector
        .register_both(|| {
            MethodGuardInfo::new("ping", false, vec![Rule::<()>::BlockIngress], extract_ping)
        })
        .unwrap();

    let msg = Msg::Ping;

    let boundary = InspectionRequest::boundary("ping", p(1), &[], &msg, false);
    let err = inspector.inspect_check(&boundary).unwrap_err();
    assert!(err.to_string().starts_with("blocked:"), "got: {err}");

    let guard = InspectionRequest::guard("ping", p(1), &[], &msg, false);
    assert!(block_on(inspector.guard_check(&guard)).is_ok());
}

#[test]
fn dynamic_auth_runs_in_both_phases() {
    let mut inspector: Inspector<Msg> = Inspector::new(InspectorConfig {
        allow_anonymous: Some(true),
        ..Default::default()
    });
    inspector
        .register_both(|| {
            MethodGuardInfo::new(
                "ping",
                false,
                vec![Rule::dynamic_auth(|args| {
                    if args.caller == Principal::anonymous() {
                        Err("anonymous caller not permitted".to_string())
                    } else {
                        Ok(())
                    }
                })],
                extract_ping,
            )
        })
        .unwrap();

    let msg = Msg::Ping;

    let anon = InspectionRequest::boundary("ping", Principal::anonymous(), &[], &msg, false);
    let err = inspector.inspect_check(&anon).unwrap_err();
    assert!(err.to_string().starts_with("auth:"), "got: {err}");

    let authed = InspectionRequest::guard("ping", p(1), &[], &msg, false);
    assert!(block_on(inspector.guard_check(&authed)).is_ok());
}

#[test]
fn audit_log_reports_to_the_telemetry_sink() {
    let sink = Arc::new(CountingSink::default());

    let mut inspector: Inspector<Msg> = Inspector::new(InspectorConfig {
        audit_log: true,
        ..Default::default()
    })
    .with_telemetry(Arc::clone(&sink) as Arc<dyn TelemetrySink>);
    inspector
        .register_guard(write_info(vec![Rule::text_size(
            |text: &String| text.as_str(),
            None,
            Some(4),
        )]))
        .unwrap();

    let msg = Msg::Write("too long for four".to_string());
    let req = InspectionRequest::guard("write", p(1), &[], &msg, false);
    assert!(block_on(inspector.guard_check(&req)).is_err());
    assert_eq!(sink.rejections.load(Ordering::SeqCst), 1);

    let msg = Msg::Write("ok".to_string());
    let req = InspectionRequest::guard("write", p(1), &[], &msg, false);
    assert!(block_on(inspector.guard_check(&req)).is_ok());
    assert_eq!(sink.admissions.load(Ordering::SeqCst), 1);
}

#[test]
fn custom_checks_see_cycles_and_deadline() {
    let mut inspector: Inspector<Msg> = Inspector::new(InspectorConfig::default());
    inspector
        .register_guard(write_info(vec![Rule::custom_check(|args| {
            let cycles = args.cycles.as_ref().map_or(0, Cycles::to_u128);
            if cycles < TC {
                return Err("at least 1T cycles must be attached".to_string());
            }
            if args.deadline.is_none() {
                return Err("a deadline is required".to_string());
            }
            Ok(())
        })]))
        .unwrap();

    let msg = Msg::Write("data".to_string());

    let bare = InspectionRequest::guard("write", p(1), &[], &msg, false);
    let err = block_on(inspector.guard_check(&bare)).unwrap_err();
    assert_eq!(err.to_string(), "custom: at least 1T cycles must be attached");

    let funded = InspectionRequest::guard("write", p(1), &[], &msg, false)
        .with_cycles(Cycles::new(2 * TC))
        .with_deadline(1_700_000_000);
    assert!(block_on(inspector.guard_check(&funded)).is_ok());
}
