//! Guardic: request admission and validation for Internet Computer canisters.
//!
//! Declare an ordered rule list per method over its typed argument, then
//! consult the inspector from `canister_inspect_message` (boundary phase,
//! synchronous) or from inside method execution (guard phase, async-capable).
pub mod candy;
pub mod cdk;
pub mod config;
pub mod inspector;
pub mod log;
pub mod provider;
pub mod rule;
pub mod types;
pub mod utils;

pub use thiserror::Error as ThisError;

///
/// Prelude
///

pub mod prelude {
    pub use crate::{
        Error as GuardicError,
        candy::{CandyCheck, CandyProperty, CandyTag, CandyValue, PathStep, PatternKind},
        cdk::api::{canister_self, msg_caller},
        config::{InspectorConfig, MethodDefaults},
        inspector::{
            InspectionRequest, Inspector, MethodGuardInfo, Phase, inspect_only_arg_size,
        },
        log,
        provider::{AuthProvider, RateLimitDecision, RateLimiter, TelemetrySink},
        rule::Rule,
        types::{Cycles, Int, Nat, Principal},
    };
}

use crate::cdk::candid::CandidType;
use serde::Deserialize;

///
/// Crate Version
///

pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

///
/// Error
///
/// top level error should handle all sub-errors, but not expose the child candid types
///

#[derive(CandidType, Debug, Deserialize, ThisError)]
pub enum Error {
    #[error("{0}")]
    CustomError(String),

    #[error("{0}")]
    CandyError(String),

    #[error("{0}")]
    ConfigError(String),

    #[error("{0}")]
    InspectError(String),

    #[error("{0}")]
    RuleError(String),
}

macro_rules! from_to_string {
    ($from:ty, $variant:ident) => {
        impl From<$from> for Error {
            fn from(e: $from) -> Self {
                Error::$variant(e.to_string())
            }
        }
    };
}

impl Error {
    #[must_use]
    pub fn custom<S: Into<String>>(s: S) -> Self {
        Self::CustomError(s.into())
    }
}

from_to_string!(candy::CandyError, CandyError);
from_to_string!(config::ConfigError, ConfigError);
from_to_string!(inspector::InspectError, InspectError);
from_to_string!(rule::RuleError, RuleError);
