//!
//! Validation rules over a method's typed argument.
//!
//! Each rule carries an *accessor*: a pure projection from the method
//! payload `M` to the slice of data the rule inspects. Accessors are what
//! let rule lists for differently-typed methods live in one registry after
//! erasure: the rules stay typed over `M`, the registry does not.
//!

pub mod eval;

use crate::{
    candy::{CandyCheck, CandyError, CandyTag, CandyValue, PathStep, PatternKind},
    types::{Cycles, Int, Nat, Principal},
};
use thiserror::Error as ThisError;

///
/// RuleError
///
/// The closed error taxonomy surfaced to hosts. The `Display` prefix is the
/// error kind; hosts match on it to decide logging and rejection mapping.
///

#[derive(Debug, ThisError)]
#[remain::sorted]
pub enum RuleError {
    #[error("auth: {0}")]
    Auth(String),

    #[error("blocked: {0}")]
    Blocked(String),

    #[error(transparent)]
    Candy(#[from] CandyError),

    #[error("custom: {0}")]
    Custom(String),

    #[error("dispatch: {0}")]
    Dispatch(String),

    #[error("phase-forbidden: {0}")]
    PhaseForbidden(String),

    #[error("range: {0}")]
    Range(String),

    #[error("rate-limit: {0}")]
    RateLimit(String),

    #[error("size: {0}")]
    Size(String),
}

//
// accessor callables
//

pub type TextAccessor<M> = Box<dyn for<'a> Fn(&'a M) -> &'a str + Send + Sync>;
pub type BlobAccessor<M> = Box<dyn for<'a> Fn(&'a M) -> &'a [u8] + Send + Sync>;
pub type NatAccessor<M> = Box<dyn Fn(&M) -> Nat + Send + Sync>;
pub type IntAccessor<M> = Box<dyn Fn(&M) -> Int + Send + Sync>;
pub type CandyAccessor<M> = Box<dyn for<'a> Fn(&'a M) -> &'a CandyValue + Send + Sync>;

pub type CustomCheckFn<M> =
    Box<dyn for<'a> Fn(&CustomCheckArgs<'a, M>) -> Result<(), String> + Send + Sync>;
pub type DynamicAuthFn = Box<dyn for<'a> Fn(&DynamicAuthArgs<'a>) -> Result<(), String> + Send + Sync>;

///
/// CustomCheckArgs
/// Full request context plus the projected payload, handed to custom
/// predicates. The predicate's `Err` reason is surfaced verbatim.
///

pub struct CustomCheckArgs<'a, M> {
    pub caller: Principal,
    pub method_name: &'a str,
    pub payload: &'a M,
    pub arg_size: usize,
    pub is_query: bool,
    pub is_inspect: bool,
    pub cycles: Option<Cycles>,
    pub deadline: Option<u64>,
}

///
/// DynamicAuthArgs
/// Identity and call context only, with no payload, which is what makes these
/// predicates safe to run during ingress inspection.
///

pub struct DynamicAuthArgs<'a> {
    pub caller: Principal,
    pub method_name: &'a str,
    pub is_query: bool,
    pub is_inspect: bool,
    pub cycles: Option<Cycles>,
    pub deadline: Option<u64>,
}

///
/// Rule
/// One validation rule over a method payload `M`. All bounds are inclusive.
///

pub enum Rule<M> {
    BlobSize {
        accessor: BlobAccessor<M>,
        min: Option<u64>,
        max: Option<u64>,
    },
    BlockAll,
    BlockIngress,
    Candy {
        accessor: CandyAccessor<M>,
        check: CandyCheck,
    },
    CustomCheck(CustomCheckFn<M>),
    DynamicAuth(DynamicAuthFn),
    IntValue {
        accessor: IntAccessor<M>,
        min: Option<i128>,
        max: Option<i128>,
    },
    NatValue {
        accessor: NatAccessor<M>,
        min: Option<u128>,
        max: Option<u128>,
    },
    RateLimit,
    RequireAuth,
    RequirePermission(String),
    RequireRole(String),
    TextSize {
        accessor: TextAccessor<M>,
        min: Option<u64>,
        max: Option<u64>,
    },
}

impl<M> Rule<M> {
    pub fn text_size<F>(accessor: F, min: Option<u64>, max: Option<u64>) -> Self
    where
        F: for<'a> Fn(&'a M) -> &'a str + Send + Sync + 'static,
    {
        Self::TextSize {
            accessor: Box::new(accessor),
            min,
            max,
        }
    }

    pub fn blob_size<F>(accessor: F, min: Option<u64>, max: Option<u64>) -> Self
    where
        F: for<'a> Fn(&'a M) -> &'a [u8] + Send + Sync + 'static,
    {
        Self::BlobSize {
            accessor: Box::new(accessor),
            min,
            max,
        }
    }

    pub fn nat_value<F>(accessor: F, min: Option<u128>, max: Option<u128>) -> Self
    where
        F: Fn(&M) -> Nat + Send + Sync + 'static,
    {
        Self::NatValue {
            accessor: Box::new(accessor),
            min,
            max,
        }
    }

    pub fn int_value<F>(accessor: F, min: Option<i128>, max: Option<i128>) -> Self
    where
        F: Fn(&M) -> Int + Send + Sync + 'static,
    {
        Self::IntValue {
            accessor: Box::new(accessor),
            min,
            max,
        }
    }

    pub fn custom_check<F>(predicate: F) -> Self
    where
        F: for<'a> Fn(&CustomCheckArgs<'a, M>) -> Result<(), String> + Send + Sync + 'static,
    {
        Self::CustomCheck(Box::new(predicate))
    }

    pub fn dynamic_auth<F>(predicate: F) -> Self
    where
        F: for<'a> Fn(&DynamicAuthArgs<'a>) -> Result<(), String> + Send + Sync + 'static,
    {
        Self::DynamicAuth(Box::new(predicate))
    }

    pub fn require_permission(permission: impl Into<String>) -> Self {
        Self::RequirePermission(permission.into())
    }

    pub fn require_role(role: impl Into<String>) -> Self {
        Self::RequireRole(role.into())
    }

    /// Structural check on a candy projection of the payload.
    pub fn candy<F>(accessor: F, check: CandyCheck) -> Self
    where
        F: for<'a> Fn(&'a M) -> &'a CandyValue + Send + Sync + 'static,
    {
        Self::Candy {
            accessor: Box::new(accessor),
            check,
        }
    }

    pub fn candy_type<F>(accessor: F, tag: CandyTag) -> Self
    where
        F: for<'a> Fn(&'a M) -> &'a CandyValue + Send + Sync + 'static,
    {
        Self::candy(accessor, CandyCheck::Type(tag))
    }

    pub fn candy_size<F>(accessor: F, min: Option<u64>, max: Option<u64>) -> Self
    where
        F: for<'a> Fn(&'a M) -> &'a CandyValue + Send + Sync + 'static,
    {
        Self::candy(accessor, CandyCheck::Size { min, max })
    }

    pub fn candy_depth<F>(accessor: F, max: usize) -> Self
    where
        F: for<'a> Fn(&'a M) -> &'a CandyValue + Send + Sync + 'static,
    {
        Self::candy(accessor, CandyCheck::Depth { max })
    }

    pub fn candy_pattern<F>(accessor: F, kind: PatternKind) -> Self
    where
        F: for<'a> Fn(&'a M) -> &'a CandyValue + Send + Sync + 'static,
    {
        Self::candy(accessor, CandyCheck::Pattern(kind))
    }

    pub fn candy_range<F>(accessor: F, min: Option<i128>, max: Option<i128>) -> Self
    where
        F: for<'a> Fn(&'a M) -> &'a CandyValue + Send + Sync + 'static,
    {
        Self::candy(accessor, CandyCheck::Range { min, max })
    }

    pub fn property_exists<F>(accessor: F, name: impl Into<String>) -> Self
    where
        F: for<'a> Fn(&'a M) -> &'a CandyValue + Send + Sync + 'static,
    {
        Self::candy(accessor, CandyCheck::PropertyExists(name.into()))
    }

    pub fn property_type<F>(accessor: F, name: impl Into<String>, tag: CandyTag) -> Self
    where
        F: for<'a> Fn(&'a M) -> &'a CandyValue + Send + Sync + 'static,
    {
        Self::candy(
            accessor,
            CandyCheck::PropertyType {
                name: name.into(),
                tag,
            },
        )
    }

    pub fn property_size<F>(
        accessor: F,
        name: impl Into<String>,
        min: Option<u64>,
        max: Option<u64>,
    ) -> Self
    where
        F: for<'a> Fn(&'a M) -> &'a CandyValue + Send + Sync + 'static,
    {
        Self::candy(
            accessor,
            CandyCheck::PropertySize {
                name: name.into(),
                min,
                max,
            },
        )
    }

    pub fn array_length<F>(accessor: F, min: Option<u64>, max: Option<u64>) -> Self
    where
        F: for<'a> Fn(&'a M) -> &'a CandyValue + Send + Sync + 'static,
    {
        Self::candy(accessor, CandyCheck::ArrayLength { min, max })
    }

    pub fn array_item_type<F>(accessor: F, tag: CandyTag) -> Self
    where
        F: for<'a> Fn(&'a M) -> &'a CandyValue + Send + Sync + 'static,
    {
        Self::candy(accessor, CandyCheck::ArrayItemType(tag))
    }

    pub fn map_key_exists<F>(accessor: F, key: impl Into<String>) -> Self
    where
        F: for<'a> Fn(&'a M) -> &'a CandyValue + Send + Sync + 'static,
    {
        Self::candy(accessor, CandyCheck::MapKeyExists(key.into()))
    }

    pub fn map_size<F>(accessor: F, min: Option<u64>, max: Option<u64>) -> Self
    where
        F: for<'a> Fn(&'a M) -> &'a CandyValue + Send + Sync + 'static,
    {
        Self::candy(accessor, CandyCheck::MapSize { min, max })
    }

    pub fn value_map_key_exists<F>(accessor: F, key: CandyValue) -> Self
    where
        F: for<'a> Fn(&'a M) -> &'a CandyValue + Send + Sync + 'static,
    {
        Self::candy(accessor, CandyCheck::ValueMapKeyExists(key))
    }

    pub fn value_map_size<F>(accessor: F, min: Option<u64>, max: Option<u64>) -> Self
    where
        F: for<'a> Fn(&'a M) -> &'a CandyValue + Send + Sync + 'static,
    {
        Self::candy(accessor, CandyCheck::ValueMapSize { min, max })
    }

    pub fn nested<F>(accessor: F, path: Vec<PathStep>, checks: Vec<CandyCheck>) -> Self
    where
        F: for<'a> Fn(&'a M) -> &'a CandyValue + Send + Sync + 'static,
    {
        Self::candy(accessor, CandyCheck::Nested { path, checks })
    }

    /// Stable rule name used in logs and phase errors.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::BlobSize { .. } => "blob_size",
            Self::BlockAll => "block_all",
            Self::BlockIngress => "block_ingress",
            Self::Candy { .. } => "candy",
            Self::CustomCheck(_) => "custom_check",
            Self::DynamicAuth(_) => "dynamic_auth",
            Self::IntValue { .. } => "int_value",
            Self::NatValue { .. } => "nat_value",
            Self::RateLimit => "rate_limit",
            Self::RequireAuth => "require_auth",
            Self::RequirePermission(_) => "require_permission",
            Self::RequireRole(_) => "require_role",
            Self::TextSize { .. } => "text_size",
        }
    }

    /// Caller-level rules run before any rule that touches the payload, so
    /// payload-examining rules never execute for a rejected caller.
    #[must_use]
    pub const fn is_barrier(&self) -> bool {
        matches!(self, Self::BlockAll | Self::BlockIngress | Self::RequireAuth)
    }
}
