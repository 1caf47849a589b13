//!
//! Depth- and size-bounded structural validation over candy values.
//!
//! Every walk runs under a [`ValidationContext`] carrying hard ceilings, so
//! a hostile payload is rejected after visiting at most the nodes above the
//! depth cap. Error messages name the rule, the path, and the offending
//! value's type, never its content.
//!

use crate::{
    candy::{COST_NUMERIC, COST_PER_CHAR, COST_PER_ENTRY, COST_UNIT, CandyTag, CandyValue,
        PatternKind},
    log,
    log::Topic,
    types::Principal,
};
use candid::CandidType;
use num_traits::cast::ToPrimitive;
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

pub const DEFAULT_MAX_DEPTH: usize = 16;
pub const DEFAULT_MAX_SIZE: u64 = 1024 * 1024; // 1 MiB estimated

///
/// CandyError
/// Structural check failures. The `Display` prefix is the error kind
/// surfaced to hosts.
///

#[derive(Debug, ThisError)]
#[remain::sorted]
pub enum CandyError {
    #[error("depth: {0}")]
    Depth(String),

    #[error("range: {0}")]
    Range(String),

    #[error("size: {0}")]
    Size(String),

    #[error("structure: {0}")]
    Structure(String),

    #[error("type: {0}")]
    Type(String),
}

///
/// ValidationLimits
/// Hard ceilings applied to every structural walk, independent of the
/// bounds a specific check asks for.
///

#[derive(Clone, Copy, Debug)]
pub struct ValidationLimits {
    pub max_depth: usize,
    pub max_size: u64,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_size: DEFAULT_MAX_SIZE,
        }
    }
}

///
/// PathStep
/// One step of a nested-validation path: a property/key name, an array
/// index, or a candy key for value maps.
///

#[derive(CandidType, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PathStep {
    Index(usize),
    Key(CandyValue),
    Name(String),
}

///
/// CandyCheck
/// Structural checks applied to a candy subtree. All bounds are inclusive.
///

#[derive(Clone, Debug)]
#[remain::sorted]
pub enum CandyCheck {
    ArrayItemType(CandyTag),
    ArrayLength {
        min: Option<u64>,
        max: Option<u64>,
    },
    Depth {
        max: usize,
    },
    MapKeyExists(String),
    MapSize {
        min: Option<u64>,
        max: Option<u64>,
    },
    Nested {
        path: Vec<PathStep>,
        checks: Vec<CandyCheck>,
    },
    Pattern(PatternKind),
    PropertyExists(String),
    PropertySize {
        name: String,
        min: Option<u64>,
        max: Option<u64>,
    },
    PropertyType {
        name: String,
        tag: CandyTag,
    },
    Range {
        min: Option<i128>,
        max: Option<i128>,
    },
    Size {
        min: Option<u64>,
        max: Option<u64>,
    },
    Type(CandyTag),
    ValueMapKeyExists(CandyValue),
    ValueMapSize {
        min: Option<u64>,
        max: Option<u64>,
    },
}

///
/// ValidationContext
/// Per-walk state: the caller and method under inspection, the configured
/// ceilings, and the current path and depth.
///

pub struct ValidationContext<'a> {
    caller: Principal,
    method_name: &'a str,
    limits: ValidationLimits,
    path: Vec<String>,
    depth: usize,
}

impl<'a> ValidationContext<'a> {
    #[must_use]
    pub const fn new(caller: Principal, method_name: &'a str, limits: ValidationLimits) -> Self {
        Self {
            caller,
            method_name,
            limits,
            path: Vec::new(),
            depth: 0,
        }
    }

    fn path_string(&self) -> String {
        let mut out = String::from("$");
        for seg in &self.path {
            out.push_str(seg);
        }
        out
    }

    // Descend one composite level, enforcing the hard depth ceiling.
    fn enter(&mut self, segment: String) -> Result<(), CandyError> {
        if self.depth + 1 > self.limits.max_depth {
            return Err(CandyError::Depth(format!(
                "maximum depth {} exceeded at {}",
                self.limits.max_depth,
                self.path_string()
            )));
        }

        self.depth += 1;
        self.path.push(segment);

        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
        self.path.pop();
    }
}

/// Apply a structural check to a candy value under the context's ceilings.
///
/// First failure aborts the walk.
pub fn check_value(
    value: &CandyValue,
    check: &CandyCheck,
    cx: &mut ValidationContext<'_>,
) -> Result<(), CandyError> {
    let result = apply(value, check, cx);

    if let Err(err) = &result {
        log!(
            Topic::Candy,
            Debug,
            "check failed on '{}' for caller {}: {err}",
            cx.method_name,
            cx.caller,
        );
    }

    result
}

fn apply(
    value: &CandyValue,
    check: &CandyCheck,
    cx: &mut ValidationContext<'_>,
) -> Result<(), CandyError> {
    match check {
        CandyCheck::Type(expected) => check_tag(value, *expected, cx),

        CandyCheck::Size { min, max } => {
            let size = size_metric(value, cx)?;
            check_bounds(size, *min, *max, "size", cx)
        }

        CandyCheck::Depth { max } => check_depth(value, *max, 0, cx),

        CandyCheck::Pattern(kind) => match value {
            CandyValue::Text(s) => {
                if kind.matches(s) {
                    Ok(())
                } else {
                    Err(CandyError::Structure(format!(
                        "{} does not match pattern '{kind}' at {}",
                        value.summary(),
                        cx.path_string()
                    )))
                }
            }
            other => check_tag(other, CandyTag::Text, cx),
        },

        CandyCheck::Range { min, max } => check_range(value, *min, *max, cx),

        CandyCheck::PropertyExists(name) => {
            check_tag(value, CandyTag::Class, cx)?;
            resolve_property(value, name, cx).map(|_| ())
        }

        CandyCheck::PropertyType { name, tag } => {
            check_tag(value, CandyTag::Class, cx)?;
            let prop = resolve_property(value, name, cx)?;

            cx.enter(format!(".{name}"))?;
            let result = check_tag(prop, *tag, cx);
            cx.leave();
            result
        }

        CandyCheck::PropertySize { name, min, max } => {
            check_tag(value, CandyTag::Class, cx)?;
            let prop = resolve_property(value, name, cx)?;

            cx.enter(format!(".{name}"))?;
            let result = size_metric(prop, cx)
                .and_then(|size| check_bounds(size, *min, *max, "size", cx));
            cx.leave();
            result
        }

        CandyCheck::ArrayLength { min, max } => match value {
            CandyValue::Array(items) => {
                check_bounds(items.len() as u64, *min, *max, "length", cx)
            }
            other => check_tag(other, CandyTag::Array, cx),
        },

        CandyCheck::ArrayItemType(expected) => match value {
            CandyValue::Array(items) => {
                cx.enter(String::new())?;

                let mut result = Ok(());
                for (i, item) in items.iter().enumerate() {
                    if let Some(seg) = cx.path.last_mut() {
                        *seg = format!("[{i}]");
                    }
                    result = check_tag(item, *expected, cx);
                    if result.is_err() {
                        break;
                    }
                }

                cx.leave();
                result
            }
            other => check_tag(other, CandyTag::Array, cx),
        },

        CandyCheck::MapKeyExists(key) => match value {
            CandyValue::Map(_) => {
                if value.map_key_exists(key) {
                    Ok(())
                } else {
                    Err(CandyError::Structure(format!(
                        "missing key '{key}' at {}",
                        cx.path_string()
                    )))
                }
            }
            other => check_tag(other, CandyTag::Map, cx),
        },

        CandyCheck::MapSize { min, max } => match value {
            CandyValue::Map(entries) => {
                check_bounds(entries.len() as u64, *min, *max, "size", cx)
            }
            other => check_tag(other, CandyTag::Map, cx),
        },

        CandyCheck::ValueMapKeyExists(key) => match value {
            CandyValue::ValueMap(_) => {
                if value.value_map_get(key).is_some() {
                    Ok(())
                } else {
                    Err(CandyError::Structure(format!(
                        "missing key {} at {}",
                        key.summary(),
                        cx.path_string()
                    )))
                }
            }
            other => check_tag(other, CandyTag::ValueMap, cx),
        },

        CandyCheck::ValueMapSize { min, max } => match value {
            CandyValue::ValueMap(entries) => {
                check_bounds(entries.len() as u64, *min, *max, "size", cx)
            }
            other => check_tag(other, CandyTag::ValueMap, cx),
        },

        CandyCheck::Nested { path, checks } => apply_nested(value, path, checks, cx),
    }
}

// -----------------------------------------------------------------------------
// Walk helpers
// -----------------------------------------------------------------------------

fn check_tag(
    value: &CandyValue,
    expected: CandyTag,
    cx: &ValidationContext<'_>,
) -> Result<(), CandyError> {
    if value.tag() == expected {
        Ok(())
    } else {
        Err(CandyError::Type(format!(
            "expected {expected}, found {} at {}",
            value.summary(),
            cx.path_string()
        )))
    }
}

fn check_bounds(
    n: u64,
    min: Option<u64>,
    max: Option<u64>,
    what: &str,
    cx: &ValidationContext<'_>,
) -> Result<(), CandyError> {
    if let Some(min) = min {
        if n < min {
            return Err(CandyError::Size(format!(
                "{what} {n} below minimum {min} at {}",
                cx.path_string()
            )));
        }
    }

    if let Some(max) = max {
        if n > max {
            return Err(CandyError::Size(format!(
                "{what} {n} exceeds maximum {max} at {}",
                cx.path_string()
            )));
        }
    }

    Ok(())
}

// Size metric for bound checks: character count for text, byte count for
// blobs, element count for arrays and maps, estimated footprint otherwise.
fn size_metric(value: &CandyValue, cx: &ValidationContext<'_>) -> Result<u64, CandyError> {
    match value {
        CandyValue::Text(s) => Ok(s.chars().count() as u64),
        CandyValue::Blob(b) => Ok(b.len() as u64),
        CandyValue::Array(items) => Ok(items.len() as u64),
        CandyValue::Map(entries) => Ok(entries.len() as u64),
        CandyValue::ValueMap(entries) => Ok(entries.len() as u64),
        other => bounded_estimate(other, cx),
    }
}

// Accumulating size estimator with early abort on the hard ceiling. The
// descent is also depth-capped so a pathological tree cannot force a full
// traversal.
fn bounded_estimate(value: &CandyValue, cx: &ValidationContext<'_>) -> Result<u64, CandyError> {
    let mut acc: u64 = 0;
    estimate_into(value, 0, &mut acc, cx)?;
    Ok(acc)
}

fn estimate_into(
    value: &CandyValue,
    rel_depth: usize,
    acc: &mut u64,
    cx: &ValidationContext<'_>,
) -> Result<(), CandyError> {
    if value.is_composite() && cx.depth + rel_depth + 1 > cx.limits.max_depth {
        return Err(CandyError::Depth(format!(
            "maximum depth {} exceeded at {}",
            cx.limits.max_depth,
            cx.path_string()
        )));
    }

    match value {
        CandyValue::Bool(_) | CandyValue::Null => *acc += COST_UNIT,
        CandyValue::Float(_) | CandyValue::Int(_) | CandyValue::Nat(_) => *acc += COST_NUMERIC,
        CandyValue::Text(s) => *acc += COST_PER_CHAR * s.chars().count() as u64,
        CandyValue::Blob(b) => *acc += b.len() as u64,
        CandyValue::Opt(inner) => {
            *acc += COST_UNIT;
            if let Some(inner) = inner {
                estimate_into(inner, rel_depth + 1, acc, cx)?;
            }
        }
        CandyValue::Array(items) => {
            for item in items {
                *acc += COST_PER_ENTRY;
                estimate_into(item, rel_depth + 1, acc, cx)?;
            }
        }
        CandyValue::Map(entries) => {
            for (key, item) in entries {
                *acc += COST_PER_ENTRY + COST_PER_CHAR * key.chars().count() as u64;
                estimate_into(item, rel_depth + 1, acc, cx)?;
            }
        }
        CandyValue::ValueMap(entries) => {
            for (key, item) in entries {
                *acc += COST_PER_ENTRY;
                estimate_into(key, rel_depth + 1, acc, cx)?;
                estimate_into(item, rel_depth + 1, acc, cx)?;
            }
        }
        CandyValue::Class(props) => {
            for prop in props {
                *acc += COST_PER_ENTRY + COST_PER_CHAR * prop.name.chars().count() as u64
                    + COST_UNIT;
                estimate_into(&prop.value, rel_depth + 1, acc, cx)?;
            }
        }
    }

    if *acc > cx.limits.max_size {
        return Err(CandyError::Size(format!(
            "estimated size exceeds maximum {} bytes at {}",
            cx.limits.max_size,
            cx.path_string()
        )));
    }

    Ok(())
}

// Depth walk with fail-fast: only nodes above the allowed depth are ever
// visited, so a 2N-deep tree costs O(nodes above the cap), not O(N).
fn check_depth(
    value: &CandyValue,
    max: usize,
    rel_depth: usize,
    cx: &ValidationContext<'_>,
) -> Result<(), CandyError> {
    if !value.is_composite() {
        return Ok(());
    }

    let allowed = max.min(cx.limits.max_depth.saturating_sub(cx.depth));
    if rel_depth + 1 > allowed {
        return Err(CandyError::Depth(format!(
            "maximum depth {} exceeded at {}",
            max.min(cx.limits.max_depth),
            cx.path_string()
        )));
    }

    match value {
        CandyValue::Array(items) => {
            for item in items {
                check_depth(item, max, rel_depth + 1, cx)?;
            }
        }
        CandyValue::Class(props) => {
            for prop in props {
                check_depth(&prop.value, max, rel_depth + 1, cx)?;
            }
        }
        CandyValue::Map(entries) => {
            for (_, item) in entries {
                check_depth(item, max, rel_depth + 1, cx)?;
            }
        }
        CandyValue::ValueMap(entries) => {
            for (key, item) in entries {
                check_depth(key, max, rel_depth + 1, cx)?;
                check_depth(item, max, rel_depth + 1, cx)?;
            }
        }
        CandyValue::Opt(inner) => {
            if let Some(inner) = inner {
                check_depth(inner, max, rel_depth + 1, cx)?;
            }
        }
        _ => {}
    }

    Ok(())
}

fn check_range(
    value: &CandyValue,
    min: Option<i128>,
    max: Option<i128>,
    cx: &ValidationContext<'_>,
) -> Result<(), CandyError> {
    let below = |cx: &ValidationContext<'_>, min: i128| {
        CandyError::Range(format!(
            "value below minimum {min} at {}",
            cx.path_string()
        ))
    };
    let above = |cx: &ValidationContext<'_>, max: i128| {
        CandyError::Range(format!(
            "value exceeds maximum {max} at {}",
            cx.path_string()
        ))
    };

    match value {
        CandyValue::Nat(n) => match n.0.to_i128() {
            Some(v) => {
                if let Some(min) = min {
                    if v < min {
                        return Err(below(cx, min));
                    }
                }
                if let Some(max) = max {
                    if v > max {
                        return Err(above(cx, max));
                    }
                }
                Ok(())
            }
            // too large for i128: any configured maximum is exceeded
            None => max.map_or(Ok(()), |max| Err(above(cx, max))),
        },

        CandyValue::Int(i) => match i.0.to_i128() {
            Some(v) => {
                if let Some(min) = min {
                    if v < min {
                        return Err(below(cx, min));
                    }
                }
                if let Some(max) = max {
                    if v > max {
                        return Err(above(cx, max));
                    }
                }
                Ok(())
            }
            None => {
                // out of i128 range on one side; use the sign to pick it
                let negative = i.0.to_f64().is_some_and(|f| f < 0.0);
                if negative {
                    min.map_or(Ok(()), |min| Err(below(cx, min)))
                } else {
                    max.map_or(Ok(()), |max| Err(above(cx, max)))
                }
            }
        },

        #[allow(clippy::cast_precision_loss)]
        CandyValue::Float(f) => {
            if let Some(min) = min {
                if *f < min as f64 {
                    return Err(below(cx, min));
                }
            }
            if let Some(max) = max {
                if *f > max as f64 {
                    return Err(above(cx, max));
                }
            }
            Ok(())
        }

        other => Err(CandyError::Range(format!(
            "type mismatch: expected numeric, found {} at {}",
            other.summary(),
            cx.path_string()
        ))),
    }
}

fn resolve_property<'v>(
    value: &'v CandyValue,
    name: &str,
    cx: &ValidationContext<'_>,
) -> Result<&'v CandyValue, CandyError> {
    value
        .get_property(name)
        .map(|p| &p.value)
        .ok_or_else(|| {
            CandyError::Structure(format!(
                "missing property '{name}' at {}",
                cx.path_string()
            ))
        })
}

fn apply_nested(
    value: &CandyValue,
    path: &[PathStep],
    checks: &[CandyCheck],
    cx: &mut ValidationContext<'_>,
) -> Result<(), CandyError> {
    let Some((step, rest)) = path.split_first() else {
        for check in checks {
            apply(value, check, cx)?;
        }
        return Ok(());
    };

    let (segment, child) = match (value, step) {
        (CandyValue::Class(_), PathStep::Name(name)) => {
            (format!(".{name}"), resolve_property(value, name, cx)?)
        }
        (CandyValue::Map(_), PathStep::Name(name)) => {
            let child = value.map_get(name).ok_or_else(|| {
                CandyError::Structure(format!(
                    "missing key '{name}' at {}",
                    cx.path_string()
                ))
            })?;
            (format!(".{name}"), child)
        }
        (CandyValue::Array(items), PathStep::Index(i)) => {
            let child = items.get(*i).ok_or_else(|| {
                CandyError::Structure(format!(
                    "index {i} out of bounds at {}",
                    cx.path_string()
                ))
            })?;
            (format!("[{i}]"), child)
        }
        (CandyValue::ValueMap(_), PathStep::Key(key)) => {
            let child = value.value_map_get(key).ok_or_else(|| {
                CandyError::Structure(format!(
                    "missing key {} at {}",
                    key.summary(),
                    cx.path_string()
                ))
            })?;
            (format!("[{}]", key.summary()), child)
        }
        (other, step) => {
            return Err(CandyError::Structure(format!(
                "cannot traverse {} with {step:?} at {}",
                other.summary(),
                cx.path_string()
            )));
        }
    };

    cx.enter(segment)?;
    let result = apply_nested(child, rest, checks, cx);
    cx.leave();

    result
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candy::CandyProperty;

    fn cx(limits: ValidationLimits) -> ValidationContext<'static> {
        ValidationContext::new(Principal::anonymous(), "test_method", limits)
    }

    fn nested_classes(depth: usize) -> CandyValue {
        let mut value = CandyValue::from("leaf");
        for _ in 0..depth {
            value = CandyValue::Class(vec![CandyProperty::new("inner", value)]);
        }
        value
    }

    #[test]
    fn type_check_reports_found_tag() {
        let mut cx = cx(ValidationLimits::default());
        let err = check_value(
            &CandyValue::from("hello"),
            &CandyCheck::Type(CandyTag::Nat),
            &mut cx,
        )
        .unwrap_err();

        assert!(err.to_string().starts_with("type: expected nat"));
        assert!(!err.to_string().contains("hello"));
    }

    #[test]
    fn depth_check_fails_fast() {
        let deep = nested_classes(20);

        let mut cx = cx(ValidationLimits {
            max_depth: 10,
            ..Default::default()
        });
        let err = check_value(&deep, &CandyCheck::Depth { max: 10 }, &mut cx).unwrap_err();
        assert!(err.to_string().starts_with("depth:"), "got: {err}");

        // a permissive rule bound is still cut off by the hard ceiling
        let mut cx2 = ValidationContext::new(
            Principal::anonymous(),
            "test_method",
            ValidationLimits {
                max_depth: 10,
                ..Default::default()
            },
        );
        let err2 = check_value(&deep, &CandyCheck::Depth { max: 100 }, &mut cx2).unwrap_err();
        assert!(err2.to_string().starts_with("depth:"));
    }

    #[test]
    fn depth_within_bounds_passes() {
        let shallow = nested_classes(3);
        let mut cx = cx(ValidationLimits::default());
        assert!(check_value(&shallow, &CandyCheck::Depth { max: 5 }, &mut cx).is_ok());
    }

    #[test]
    fn size_estimator_aborts_on_ceiling() {
        let big = CandyValue::Array(vec![CandyValue::from("aaaaaaaaaa"); 100]);

        let mut cx = cx(ValidationLimits {
            max_size: 64,
            ..Default::default()
        });
        let err = check_value(
            &big,
            &CandyCheck::Size {
                min: None,
                max: None,
            },
            &mut cx,
        )
        .unwrap_err();

        assert!(err.to_string().starts_with("size:"), "got: {err}");
    }

    #[test]
    fn size_metric_per_shape() {
        let mut cx = cx(ValidationLimits::default());

        // text counts characters
        assert!(check_value(
            &CandyValue::from("hello"),
            &CandyCheck::Size {
                min: Some(5),
                max: Some(5),
            },
            &mut cx,
        )
        .is_ok());

        // arrays count elements
        let arr = CandyValue::Array(vec![CandyValue::Null; 3]);
        assert!(check_value(
            &arr,
            &CandyCheck::Size {
                min: Some(3),
                max: Some(3),
            },
            &mut cx,
        )
        .is_ok());

        // classes use the byte estimate
        let class = CandyValue::Class(vec![CandyProperty::new("id", CandyValue::from(1u64))]);
        let expected = 4 + 2 * 4 + 1 + 8;
        assert!(check_value(
            &class,
            &CandyCheck::Size {
                min: Some(expected),
                max: Some(expected),
            },
            &mut cx,
        )
        .is_ok());
    }

    #[test]
    fn range_checks_numeric_leaves() {
        let mut cx = cx(ValidationLimits::default());

        let ok = CandyCheck::Range {
            min: Some(0),
            max: Some(100),
        };
        assert!(check_value(&CandyValue::from(50u64), &ok, &mut cx).is_ok());
        assert!(check_value(&CandyValue::from(-3i64), &ok, &mut cx).is_err());
        assert!(check_value(&CandyValue::Float(100.0), &ok, &mut cx).is_ok());
        assert!(check_value(&CandyValue::Float(100.5), &ok, &mut cx).is_err());

        let err = check_value(&CandyValue::from("nan"), &ok, &mut cx).unwrap_err();
        assert!(err.to_string().starts_with("range: type mismatch"));
    }

    #[test]
    fn property_checks() {
        let class = CandyValue::Class(vec![
            CandyProperty::new("name", CandyValue::from("abc")),
            CandyProperty::new("count", CandyValue::from(2u64)),
        ]);
        let mut cx = cx(ValidationLimits::default());

        assert!(check_value(
            &class,
            &CandyCheck::PropertyExists("name".to_string()),
            &mut cx,
        )
        .is_ok());

        let err = check_value(
            &class,
            &CandyCheck::PropertyExists("missing".to_string()),
            &mut cx,
        )
        .unwrap_err();
        assert!(err.to_string().starts_with("structure: missing property"));

        assert!(check_value(
            &class,
            &CandyCheck::PropertyType {
                name: "count".to_string(),
                tag: CandyTag::Nat,
            },
            &mut cx,
        )
        .is_ok());

        assert!(check_value(
            &class,
            &CandyCheck::PropertySize {
                name: "name".to_string(),
                min: Some(1),
                max: Some(3),
            },
            &mut cx,
        )
        .is_ok());
    }

    #[test]
    fn array_checks() {
        let arr = CandyValue::Array(vec![CandyValue::from(1u64), CandyValue::from(2u64)]);
        let mut cx = cx(ValidationLimits::default());

        assert!(check_value(
            &arr,
            &CandyCheck::ArrayLength {
                min: Some(1),
                max: Some(4),
            },
            &mut cx,
        )
        .is_ok());

        assert!(check_value(&arr, &CandyCheck::ArrayItemType(CandyTag::Nat), &mut cx).is_ok());

        let mixed = CandyValue::Array(vec![CandyValue::from(1u64), CandyValue::from("x")]);
        let err = check_value(&mixed, &CandyCheck::ArrayItemType(CandyTag::Nat), &mut cx)
            .unwrap_err();
        assert!(err.to_string().contains("[1]"), "got: {err}");
    }

    #[test]
    fn nested_path_resolution() {
        let value = CandyValue::Class(vec![CandyProperty::new(
            "metadata",
            CandyValue::Map(vec![(
                "items".to_string(),
                CandyValue::Array(vec![
                    CandyValue::from("first"),
                    CandyValue::from("second"),
                ]),
            )]),
        )]);

        let check = CandyCheck::Nested {
            path: vec![
                PathStep::Name("metadata".to_string()),
                PathStep::Name("items".to_string()),
                PathStep::Index(1),
            ],
            checks: vec![CandyCheck::Type(CandyTag::Text)],
        };

        let mut cx = cx(ValidationLimits::default());
        assert!(check_value(&value, &check, &mut cx).is_ok());

        let bad = CandyCheck::Nested {
            path: vec![
                PathStep::Name("metadata".to_string()),
                PathStep::Name("items".to_string()),
                PathStep::Index(7),
            ],
            checks: vec![],
        };
        let err = check_value(&value, &bad, &mut cx).unwrap_err();
        assert_eq!(
            err.to_string(),
            "structure: index 7 out of bounds at $.metadata.items"
        );
    }

    #[test]
    fn nested_checks_short_circuit_in_order() {
        let value = CandyValue::Class(vec![CandyProperty::new("n", CandyValue::from(5u64))]);

        let check = CandyCheck::Nested {
            path: vec![PathStep::Name("n".to_string())],
            checks: vec![
                CandyCheck::Type(CandyTag::Text), // fails first
                CandyCheck::Range {
                    min: Some(10),
                    max: None,
                }, // would also fail
            ],
        };

        let mut cx = cx(ValidationLimits::default());
        let err = check_value(&value, &check, &mut cx).unwrap_err();
        assert!(err.to_string().starts_with("type:"), "got: {err}");
    }
}
