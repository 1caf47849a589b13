//!
//! The inspector core: two-phase entry points, per-method rule registries,
//! and configuration resolution.
//!
//! `inspect_check` serves the ingress boundary and is strictly synchronous;
//! `guard_check` serves in-method guards and may await collaborators. Both
//! evaluate the method's rule list in declaration order with single-error
//! short-circuit, after the implicit ceilings resolved from configuration.
//!
//! An `Inspector` is a plain value: construct it at canister init, populate
//! the registries, then consult it on every inbound message. Registries are
//! rebuilt on upgrade by re-running registration.
//!

mod method;

pub use method::{ExtractorFn, MethodGuardInfo};

use crate::{
    Error,
    config::InspectorConfig,
    log,
    log::Topic,
    provider::{AuthProvider, RateLimiter, TelemetrySink},
    rule::{
        RuleError,
        eval::{EvalEnv, RequestContext},
    },
    types::{Cycles, Principal},
};
use derive_more::Display;
use method::ErasedMethodGuard;
use std::{collections::BTreeMap, sync::Arc};
use thiserror::Error as ThisError;

///
/// InspectError
///

#[derive(Debug, ThisError)]
pub enum InspectError {
    #[error("method '{method}' declares {count} rules, exceeding the limit of {limit}")]
    TooManyRules {
        method: String,
        count: usize,
        limit: usize,
    },
}

///
/// Phase
/// Which registry a method's rules are installed into.
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum Phase {
    #[display("boundary")]
    Boundary,
    #[display("guard")]
    Guard,
}

///
/// InspectionRequest
///
/// The single uniform record crossing the core boundary. The host supplies
/// both the raw argument bytes (for size ceilings) and the decoded typed
/// message (for rule evaluation); the core never parses the wire format.
///

pub struct InspectionRequest<'a, T> {
    pub method_name: &'a str,
    pub caller: Principal,
    pub arg_bytes: &'a [u8],
    pub typed_msg: &'a T,
    pub is_query: bool,
    pub is_inspect: bool,
    pub cycles: Option<Cycles>,
    pub deadline: Option<u64>,
}

impl<'a, T> InspectionRequest<'a, T> {
    /// Build a boundary (ingress inspection) request.
    #[must_use]
    pub const fn boundary(
        method_name: &'a str,
        caller: Principal,
        arg_bytes: &'a [u8],
        typed_msg: &'a T,
        is_query: bool,
    ) -> Self {
        Self {
            method_name,
            caller,
            arg_bytes,
            typed_msg,
            is_query,
            is_inspect: true,
            cycles: None,
            deadline: None,
        }
    }

    /// Build a guard (in-execution) request.
    #[must_use]
    pub const fn guard(
        method_name: &'a str,
        caller: Principal,
        arg_bytes: &'a [u8],
        typed_msg: &'a T,
        is_query: bool,
    ) -> Self {
        Self {
            method_name,
            caller,
            arg_bytes,
            typed_msg,
            is_query,
            is_inspect: false,
            cycles: None,
            deadline: None,
        }
    }

    #[must_use]
    pub fn with_cycles(mut self, cycles: Cycles) -> Self {
        self.cycles = Some(cycles);
        self
    }

    #[must_use]
    pub const fn with_deadline(mut self, deadline: u64) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Raw byte length of the argument blob. O(1), side-effect free.
    #[must_use]
    pub const fn arg_size(&self) -> usize {
        self.arg_bytes.len()
    }

    pub(crate) fn context(&self) -> RequestContext<'a> {
        RequestContext {
            caller: self.caller,
            method_name: self.method_name,
            arg_size: self.arg_bytes.len(),
            is_query: self.is_query,
            is_inspect: self.is_inspect,
            cycles: self.cycles.clone(),
            deadline: self.deadline,
        }
    }
}

/// Cheap upper-bound hook: the raw argument length, before any typed work.
#[must_use]
pub const fn inspect_only_arg_size<T>(req: &InspectionRequest<'_, T>) -> usize {
    req.arg_bytes.len()
}

///
/// Inspector
///

pub struct Inspector<T> {
    config: InspectorConfig,
    boundary: BTreeMap<String, Box<dyn ErasedMethodGuard<T>>>,
    guard: BTreeMap<String, Box<dyn ErasedMethodGuard<T>>>,
    auth: Option<Arc<dyn AuthProvider>>,
    rate_limit: Option<Arc<dyn RateLimiter>>,
    telemetry: Option<Arc<dyn TelemetrySink>>,
}

impl<T> Inspector<T> {
    #[must_use]
    pub const fn new(config: InspectorConfig) -> Self {
        Self {
            config,
            boundary: BTreeMap::new(),
            guard: BTreeMap::new(),
            auth: None,
            rate_limit: None,
            telemetry: None,
        }
    }

    #[must_use]
    pub fn with_auth_provider(mut self, provider: Arc<dyn AuthProvider>) -> Self {
        self.auth = Some(provider);
        self
    }

    #[must_use]
    pub fn with_rate_limiter(mut self, limiter: Arc<dyn RateLimiter>) -> Self {
        self.rate_limit = Some(limiter);
        self
    }

    #[must_use]
    pub fn with_telemetry(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = Some(sink);
        self
    }

    #[must_use]
    pub const fn config(&self) -> &InspectorConfig {
        &self.config
    }

    // ---------------------------------------------------------------------
    // Registration
    // ---------------------------------------------------------------------

    /// Install rules for one method into the boundary registry.
    pub fn register_boundary<M: 'static>(
        &mut self,
        info: MethodGuardInfo<T, M>,
    ) -> Result<(), Error>
    where
        T: 'static,
    {
        self.register(Phase::Boundary, info)
    }

    /// Install rules for one method into the guard registry.
    pub fn register_guard<M: 'static>(&mut self, info: MethodGuardInfo<T, M>) -> Result<(), Error>
    where
        T: 'static,
    {
        self.register(Phase::Guard, info)
    }

    /// Install the same registration into both registries.
    ///
    /// Phase-restricted rules still fail loudly when evaluated in a phase
    /// they cannot run in; registering everywhere does not exempt them.
    pub fn register_both<M: 'static, F>(&mut self, make: F) -> Result<(), Error>
    where
        T: 'static,
        F: Fn() -> MethodGuardInfo<T, M>,
    {
        self.register(Phase::Boundary, make())?;
        self.register(Phase::Guard, make())
    }

    /// Install rules for one method into the given phase's registry.
    ///
    /// Refuses rule lists longer than the configured per-method limit.
    /// Re-registering a `(phase, method)` pair replaces the earlier entry.
    pub fn register<M: 'static>(
        &mut self,
        phase: Phase,
        info: MethodGuardInfo<T, M>,
    ) -> Result<(), Error>
    where
        T: 'static,
    {
        let limit = self.config.max_rules_per_method;
        if info.rule_count() > limit {
            return Err(InspectError::TooManyRules {
                method: info.method_name().to_string(),
                count: info.rule_count(),
                limit,
            }
            .into());
        }

        let name = info.method_name().to_string();
        let table = match phase {
            Phase::Boundary => &mut self.boundary,
            Phase::Guard => &mut self.guard,
        };

        // last write wins
        if table.insert(name.clone(), Box::new(info)).is_some() {
            log!(Topic::Registry, Warn, "replaced {phase} rules for method '{name}'");
        }

        Ok(())
    }

    // ---------------------------------------------------------------------
    // Entry points
    // ---------------------------------------------------------------------

    /// Boundary entry point, called from `canister_inspect_message`.
    ///
    /// Strictly synchronous: no rule evaluated here ever awaits. Methods
    /// without a boundary registration get the implicit ceilings only.
    pub fn inspect_check(&self, req: &InspectionRequest<'_, T>) -> Result<(), Error> {
        if !req.is_inspect {
            log!(
                Topic::Inspect,
                Warn,
                "inspect_check invoked with a guard request for '{}'",
                req.method_name,
            );
            return self.finish(
                req,
                Err(RuleError::PhaseForbidden(
                    "inspect_check requires an ingress inspection request".to_string(),
                )),
            );
        }

        let entry = self.boundary.get(req.method_name);
        // the registration's method kind is authoritative for defaults
        let is_query = entry.map_or(req.is_query, |e| e.is_query());

        let result = self.check_implicit(req, is_query).and_then(|()| {
            entry.map_or(Ok(()), |entry| entry.check_boundary(req, &self.eval_env()))
        });

        self.finish(req, result)
    }

    /// Guard entry point, called from inside method execution.
    pub async fn guard_check(&self, req: &InspectionRequest<'_, T>) -> Result<(), Error> {
        if req.is_inspect {
            log!(
                Topic::Inspect,
                Warn,
                "guard_check invoked with an ingress request for '{}'",
                req.method_name,
            );
            return self.finish(
                req,
                Err(RuleError::PhaseForbidden(
                    "guard_check cannot run during ingress inspection".to_string(),
                )),
            );
        }

        let entry = self.guard.get(req.method_name);
        let is_query = entry.map_or(req.is_query, |e| e.is_query());

        let result = match self.check_implicit(req, is_query) {
            Err(err) => Err(err),
            Ok(()) => match entry {
                None => Ok(()),
                Some(entry) => {
                    let env = self.eval_env();
                    entry.check_guard(req, &env).await
                }
            },
        };

        self.finish(req, result)
    }

    // ---------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------

    // Implicit ceilings resolved from configuration run before any
    // registered rule, cheapest first: the raw argument size in O(1), then
    // the identity gate. The gate routes through the auth provider's
    // `is_authenticated` when one is attached (boundary-safe, no await).
    fn check_implicit(&self, req: &InspectionRequest<'_, T>, is_query: bool) -> Result<(), RuleError> {
        if let Some(max) = self.config.resolved_max_arg_size(is_query) {
            let size = req.arg_bytes.len() as u64;
            if size > max {
                return Err(RuleError::Size(format!(
                    "argument size {size} exceeds maximum {max} bytes"
                )));
            }
        }

        if !self.config.resolved_allow_anonymous(is_query) {
            let authenticated = self.auth.as_deref().map_or(
                req.caller != Principal::anonymous(),
                |provider| provider.is_authenticated(req.caller),
            );

            if !authenticated {
                return Err(RuleError::Auth("caller is not authenticated".to_string()));
            }
        }

        Ok(())
    }

    fn eval_env(&self) -> EvalEnv<'_> {
        EvalEnv {
            auth: self.auth.as_deref(),
            rate_limit: self.rate_limit.as_deref(),
            limits: self.config.limits(),
        }
    }

    // Telemetry, audit logging, and development-mode decoration of the
    // rejection reason. Nothing is persisted on error.
    fn finish(
        &self,
        req: &InspectionRequest<'_, T>,
        result: Result<(), RuleError>,
    ) -> Result<(), Error> {
        match result {
            Ok(()) => {
                if self.config.audit_log {
                    if let Some(sink) = &self.telemetry {
                        sink.record_admission(req.method_name, req.caller);
                    }
                }
                Ok(())
            }
            Err(err) => {
                let mut reason = err.to_string();
                if self.config.development_mode {
                    reason.push_str(&format!(
                        " (method '{}', caller '{}')",
                        req.method_name, req.caller
                    ));
                }

                if self.config.audit_log {
                    if let Some(sink) = &self.telemetry {
                        sink.record_rejection(req.method_name, req.caller, &reason);
                    }
                    log!(
                        Topic::Audit,
                        Warn,
                        "rejected '{}' for caller {}: {reason}",
                        req.method_name,
                        req.caller,
                    );
                }

                Err(Error::RuleError(reason))
            }
        }
    }
}

///
/// TESTS
///
