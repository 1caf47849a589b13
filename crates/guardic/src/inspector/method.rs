//!
//! Per-method guard info and its type-erased registry form.
//!
//! A `MethodGuardInfo<T, M>` is typed over the host's message union `T` and
//! the method's payload `M`. Registration wraps it into a
//! `Box<dyn ErasedMethodGuard<T>>`, so the registry holds one homogeneous
//! entry type and `M` cannot leak past the call site that declared it.
//!

use crate::{
    inspector::InspectionRequest,
    rule::{
        Rule, RuleError,
        eval::{self, EvalEnv},
    },
};
use std::{future::Future, pin::Pin};

pub(crate) type GuardFuture<'a> = Pin<Box<dyn Future<Output = Result<(), RuleError>> + 'a>>;

/// Projects the host's typed-message union into one method's payload.
///
/// Returns `None` when the union variant does not belong to this method;
/// the inspector turns that into a dispatch error before any rule runs.
pub type ExtractorFn<T, M> = Box<dyn for<'a> Fn(&'a T) -> Option<&'a M> + Send + Sync>;

///
/// MethodGuardInfo
///

pub struct MethodGuardInfo<T, M> {
    method_name: String,
    is_query: bool,
    rules: Vec<Rule<M>>,
    extractor: ExtractorFn<T, M>,
}

impl<T, M> MethodGuardInfo<T, M> {
    #[must_use]
    pub fn new<F>(
        method_name: impl Into<String>,
        is_query: bool,
        rules: Vec<Rule<M>>,
        extractor: F,
    ) -> Self
    where
        F: for<'a> Fn(&'a T) -> Option<&'a M> + Send + Sync + 'static,
    {
        Self {
            method_name: method_name.into(),
            is_query,
            rules,
            extractor: Box::new(extractor),
        }
    }

    #[must_use]
    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    #[must_use]
    pub const fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

///
/// ErasedMethodGuard
///
/// The registry entry: a boundary check that never suspends, and a guard
/// check that may await collaborators. Nothing typed over `M` escapes.
///

pub(crate) trait ErasedMethodGuard<T>: Send + Sync {
    fn is_query(&self) -> bool;

    fn check_boundary(
        &self,
        req: &InspectionRequest<'_, T>,
        env: &EvalEnv<'_>,
    ) -> Result<(), RuleError>;

    fn check_guard<'a>(
        &'a self,
        req: &'a InspectionRequest<'a, T>,
        env: &'a EvalEnv<'a>,
    ) -> GuardFuture<'a>;
}

impl<T, M> ErasedMethodGuard<T> for MethodGuardInfo<T, M> {
    fn is_query(&self) -> bool {
        self.is_query
    }

    fn check_boundary(
        &self,
        req: &InspectionRequest<'_, T>,
        env: &EvalEnv<'_>,
    ) -> Result<(), RuleError> {
        let payload = (self.extractor)(req.typed_msg)
            .ok_or_else(|| RuleError::Dispatch("method/message mismatch".to_string()))?;
        let rcx = req.context();

        // caller-level rules first, then payload rules, declaration order
        // preserved within each pass
        for rule in self.rules.iter().filter(|r| r.is_barrier()) {
            eval::check_sync(rule, payload, &rcx, env)?;
        }
        for rule in self.rules.iter().filter(|r| !r.is_barrier()) {
            eval::check_sync(rule, payload, &rcx, env)?;
        }

        Ok(())
    }

    fn check_guard<'a>(
        &'a self,
        req: &'a InspectionRequest<'a, T>,
        env: &'a EvalEnv<'a>,
    ) -> GuardFuture<'a> {
        Box::pin(async move {
            let payload = (self.extractor)(req.typed_msg)
                .ok_or_else(|| RuleError::Dispatch("method/message mismatch".to_string()))?;
            let rcx = req.context();

            for rule in self.rules.iter().filter(|r| r.is_barrier()) {
                eval::check_guard(rule, payload, &rcx, env).await?;
            }
            for rule in self.rules.iter().filter(|r| !r.is_barrier()) {
                eval::check_guard(rule, payload, &rcx, env).await?;
            }

            Ok(())
        })
    }
}
