//!
//! Rule predicate evaluation.
//!
//! The synchronous path serves ingress inspection and every phase-agnostic
//! rule; the async path additionally consults collaborators and only ever
//! runs in the guard phase. Phase policing lives here: a guard-only rule
//! evaluated while `is_inspect` is set fails with `phase-forbidden` instead
//! of blocking.
//!

use crate::{
    candy::validate::{self, ValidationContext, ValidationLimits},
    provider::{AuthProvider, RateLimitDecision, RateLimiter},
    rule::{CustomCheckArgs, DynamicAuthArgs, Rule, RuleError},
    types::{Cycles, Principal},
};
use num_traits::cast::ToPrimitive;

///
/// RequestContext
/// The payload-free slice of an inspection request shared by every rule.
///

#[derive(Clone)]
pub struct RequestContext<'a> {
    pub caller: Principal,
    pub method_name: &'a str,
    pub arg_size: usize,
    pub is_query: bool,
    pub is_inspect: bool,
    pub cycles: Option<Cycles>,
    pub deadline: Option<u64>,
}

///
/// EvalEnv
/// Collaborator handles and structural ceilings resolved by the inspector.
///

pub struct EvalEnv<'a> {
    pub auth: Option<&'a dyn AuthProvider>,
    pub rate_limit: Option<&'a dyn RateLimiter>,
    pub limits: ValidationLimits,
}

/// Evaluate a rule without suspending.
///
/// Guard-only rules (permission, role, rate limit) fail with
/// `phase-forbidden` here; [`check_guard`] intercepts them first when
/// running in the guard phase.
pub fn check_sync<M>(
    rule: &Rule<M>,
    payload: &M,
    rcx: &RequestContext<'_>,
    env: &EvalEnv<'_>,
) -> Result<(), RuleError> {
    match rule {
        Rule::TextSize { accessor, min, max } => {
            let text = accessor(payload);
            check_len(text.chars().count() as u64, *min, *max, "text length")
        }

        Rule::BlobSize { accessor, min, max } => {
            let blob = accessor(payload);
            check_len(blob.len() as u64, *min, *max, "blob length")
        }

        Rule::NatValue { accessor, min, max } => {
            let value = accessor(payload);
            match value.0.to_u128() {
                Some(v) => check_nat_bounds(v, *min, *max),
                // too large for u128: any configured maximum is exceeded
                None => max.map_or(Ok(()), |max| {
                    Err(RuleError::Range(format!("value exceeds maximum {max}")))
                }),
            }
        }

        Rule::IntValue { accessor, min, max } => {
            let value = accessor(payload);
            match value.0.to_i128() {
                Some(v) => check_int_bounds(v, *min, *max),
                None => {
                    let negative = value.0.to_f64().is_some_and(|f| f < 0.0);
                    if negative {
                        min.map_or(Ok(()), |min| {
                            Err(RuleError::Range(format!("value below minimum {min}")))
                        })
                    } else {
                        max.map_or(Ok(()), |max| {
                            Err(RuleError::Range(format!("value exceeds maximum {max}")))
                        })
                    }
                }
            }
        }

        Rule::RequireAuth => {
            if rcx.caller == Principal::anonymous() {
                Err(RuleError::Auth("anonymous caller not permitted".to_string()))
            } else {
                Ok(())
            }
        }

        Rule::BlockIngress => {
            if rcx.is_inspect {
                Err(RuleError::Blocked(
                    "ingress calls are blocked for this method".to_string(),
                ))
            } else {
                Ok(())
            }
        }

        Rule::BlockAll => Err(RuleError::Blocked(
            "all calls are blocked for this method".to_string(),
        )),

        Rule::RequirePermission(_) | Rule::RequireRole(_) | Rule::RateLimit => {
            Err(RuleError::PhaseForbidden(format!(
                "{} cannot run during ingress inspection",
                rule.kind()
            )))
        }

        Rule::CustomCheck(predicate) => {
            let args = CustomCheckArgs {
                caller: rcx.caller,
                method_name: rcx.method_name,
                payload,
                arg_size: rcx.arg_size,
                is_query: rcx.is_query,
                is_inspect: rcx.is_inspect,
                cycles: rcx.cycles.clone(),
                deadline: rcx.deadline,
            };

            predicate(&args).map_err(RuleError::Custom)
        }

        Rule::DynamicAuth(predicate) => {
            let args = DynamicAuthArgs {
                caller: rcx.caller,
                method_name: rcx.method_name,
                is_query: rcx.is_query,
                is_inspect: rcx.is_inspect,
                cycles: rcx.cycles.clone(),
                deadline: rcx.deadline,
            };

            predicate(&args).map_err(RuleError::Auth)
        }

        Rule::Candy { accessor, check } => {
            let value = accessor(payload);
            let mut cx = ValidationContext::new(rcx.caller, rcx.method_name, env.limits);

            validate::check_value(value, check, &mut cx)?;
            Ok(())
        }
    }
}

/// Evaluate a rule in the guard phase, awaiting collaborators where the
/// rule calls for them. Everything else takes the synchronous path.
pub async fn check_guard<M>(
    rule: &Rule<M>,
    payload: &M,
    rcx: &RequestContext<'_>,
    env: &EvalEnv<'_>,
) -> Result<(), RuleError> {
    match rule {
        Rule::RequirePermission(permission) => match env.auth {
            None => Err(RuleError::Auth("no auth provider configured".to_string())),
            Some(auth) => auth
                .has_permission(rcx.caller, permission)
                .await
                .map_err(RuleError::Auth),
        },

        Rule::RequireRole(role) => match env.auth {
            None => Err(RuleError::Auth("no auth provider configured".to_string())),
            Some(auth) => {
                if auth.has_role(rcx.caller, role).await {
                    Ok(())
                } else {
                    Err(RuleError::Auth(format!(
                        "caller '{}' does not have role '{role}'",
                        rcx.caller
                    )))
                }
            }
        },

        Rule::RateLimit => match env.rate_limit {
            None => Ok(()),
            Some(limiter) => match limiter.check(rcx.caller, rcx.method_name).await {
                RateLimitDecision::Allowed => Ok(()),
                RateLimitDecision::Denied(info) => Err(RuleError::RateLimit(info)),
            },
        },

        other => check_sync(other, payload, rcx, env),
    }
}

// -----------------------------------------------------------------------------
// Bound helpers (all bounds inclusive)
// -----------------------------------------------------------------------------

fn check_len(n: u64, min: Option<u64>, max: Option<u64>, what: &str) -> Result<(), RuleError> {
    if let Some(min) = min {
        if n < min {
            return Err(RuleError::Size(format!("{what} {n} below minimum {min}")));
        }
    }

    if let Some(max) = max {
        if n > max {
            return Err(RuleError::Size(format!("{what} {n} exceeds maximum {max}")));
        }
    }

    Ok(())
}

fn check_nat_bounds(v: u128, min: Option<u128>, max: Option<u128>) -> Result<(), RuleError> {
    if let Some(min) = min {
        if v < min {
            return Err(RuleError::Range(format!("value {v} below minimum {min}")));
        }
    }

    if let Some(max) = max {
        if v > max {
            return Err(RuleError::Range(format!("value {v} exceeds maximum {max}")));
        }
    }

    Ok(())
}

fn check_int_bounds(v: i128, min: Option<i128>, max: Option<i128>) -> Result<(), RuleError> {
    if let Some(min) = min {
        if v < min {
            return Err(RuleError::Range(format!("value {v} below minimum {min}")));
        }
    }

    if let Some(max) = max {
        if v > max {
            return Err(RuleError::Range(format!("value {v} exceeds maximum {max}")));
        }
    }

    Ok(())
}

///
/// TESTS
///
