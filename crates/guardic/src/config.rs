//!
//! Inspector configuration.
//!
//! A plain data record, loadable from TOML, resolved per `(method, phase)`
//! at evaluation time: explicit rule list first, then method-kind defaults
//! (query vs update), then the global defaults. Collaborator handles are
//! not part of the record; they attach on the `Inspector` builder.
//!

use crate::{
    Error,
    candy::validate::{DEFAULT_MAX_DEPTH, DEFAULT_MAX_SIZE, ValidationLimits},
    log,
    log::Topic,
};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("toml parse error: {0}")]
    ParseError(String),
}

mod defaults {
    use super::{DEFAULT_MAX_DEPTH, DEFAULT_MAX_SIZE};

    pub const fn max_rules_per_method() -> usize {
        64
    }

    pub const fn max_candy_depth() -> usize {
        DEFAULT_MAX_DEPTH
    }

    pub const fn max_candy_size() -> u64 {
        DEFAULT_MAX_SIZE
    }
}

///
/// MethodDefaults
/// Per-kind implicit ceilings for query or update methods.
///

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MethodDefaults {
    #[serde(default)]
    pub allow_anonymous: Option<bool>,

    #[serde(default)]
    pub max_arg_size: Option<u64>,
}

///
/// InspectorConfig
///

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InspectorConfig {
    /// Whether anonymous callers pass the implicit identity gate.
    /// Unset resolves to `false`.
    #[serde(default)]
    pub allow_anonymous: Option<bool>,

    /// Implicit upper bound on raw argument bytes, checked in O(1) before
    /// any typed work.
    #[serde(default)]
    pub default_max_arg_size: Option<u64>,

    #[serde(default)]
    pub query_defaults: Option<MethodDefaults>,

    #[serde(default)]
    pub update_defaults: Option<MethodDefaults>,

    /// More verbose rejection reasons (method and caller context). Never
    /// payload content.
    #[serde(default)]
    pub development_mode: bool,

    /// Report every rejection to the telemetry sink.
    #[serde(default)]
    pub audit_log: bool,

    #[serde(default = "defaults::max_rules_per_method")]
    pub max_rules_per_method: usize,

    #[serde(default = "defaults::max_candy_depth")]
    pub max_candy_depth: usize,

    #[serde(default = "defaults::max_candy_size")]
    pub max_candy_size: u64,
}

impl Default for InspectorConfig {
    fn default() -> Self {
        Self {
            allow_anonymous: None,
            default_max_arg_size: None,
            query_defaults: None,
            update_defaults: None,
            development_mode: false,
            audit_log: false,
            max_rules_per_method: defaults::max_rules_per_method(),
            max_candy_depth: defaults::max_candy_depth(),
            max_candy_size: defaults::max_candy_size(),
        }
    }
}

impl InspectorConfig {
    /// Parse and validate a TOML configuration.
    pub fn from_toml(s: &str) -> Result<Self, Error> {
        let config: Self =
            toml::from_str(s).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;

        log!(
            Topic::Config,
            Info,
            "configuration loaded (max_rules_per_method {}, max_candy_depth {})",
            config.max_rules_per_method,
            config.max_candy_depth,
        );

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_rules_per_method == 0 {
            return Err(ConfigError::Invalid(
                "max_rules_per_method must be positive".to_string(),
            ));
        }
        if self.max_candy_depth == 0 {
            return Err(ConfigError::Invalid(
                "max_candy_depth must be positive".to_string(),
            ));
        }
        if self.max_candy_size == 0 {
            return Err(ConfigError::Invalid(
                "max_candy_size must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// Resolve the anonymous-caller gate for a method kind. Secure by
    /// default: unset everywhere means anonymous callers are rejected.
    #[must_use]
    pub fn resolved_allow_anonymous(&self, is_query: bool) -> bool {
        self.kind_defaults(is_query)
            .and_then(|d| d.allow_anonymous)
            .or(self.allow_anonymous)
            .unwrap_or(false)
    }

    /// Resolve the implicit argument-size ceiling for a method kind.
    #[must_use]
    pub fn resolved_max_arg_size(&self, is_query: bool) -> Option<u64> {
        self.kind_defaults(is_query)
            .and_then(|d| d.max_arg_size)
            .or(self.default_max_arg_size)
    }

    pub(crate) const fn limits(&self) -> ValidationLimits {
        ValidationLimits {
            max_depth: self.max_candy_depth,
            max_size: self.max_candy_size,
        }
    }

    const fn kind_defaults(&self, is_query: bool) -> Option<&MethodDefaults> {
        if is_query {
            self.query_defaults.as_ref()
        } else {
            self.update_defaults.as_ref()
        }
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_toml() {
        let config = InspectorConfig::from_toml("").unwrap();

        assert_eq!(config.allow_anonymous, None);
        assert_eq!(config.max_rules_per_method, 64);
        assert_eq!(config.max_candy_depth, DEFAULT_MAX_DEPTH);
        assert!(!config.development_mode);
    }

    #[test]
    fn parses_full_toml() {
        let toml = r#"
            allow_anonymous = true
            default_max_arg_size = 2048
            development_mode = true
            audit_log = true
            max_rules_per_method = 16

            [query_defaults]
            allow_anonymous = true
            max_arg_size = 512

            [update_defaults]
            allow_anonymous = false
        "#;

        let config = InspectorConfig::from_toml(toml).unwrap();
        assert_eq!(config.default_max_arg_size, Some(2048));
        assert_eq!(config.max_rules_per_method, 16);
        assert_eq!(
            config.query_defaults.as_ref().unwrap().max_arg_size,
            Some(512)
        );
    }

    #[test]
    fn rejects_unknown_fields() {
        assert!(InspectorConfig::from_toml("no_such_field = 1").is_err());
    }

    #[test]
    fn rejects_zero_limits() {
        assert!(InspectorConfig::from_toml("max_rules_per_method = 0").is_err());
        assert!(InspectorConfig::from_toml("max_candy_depth = 0").is_err());
        assert!(InspectorConfig::from_toml("max_candy_size = 0").is_err());
    }

    #[test]
    fn anonymous_gate_is_secure_by_default() {
        let config = InspectorConfig::default();
        assert!(!config.resolved_allow_anonymous(true));
        assert!(!config.resolved_allow_anonymous(false));
    }

    #[test]
    fn method_kind_defaults_override_globals() {
        let config = InspectorConfig {
            allow_anonymous: Some(false),
            default_max_arg_size: Some(1024),
            query_defaults: Some(MethodDefaults {
                allow_anonymous: Some(true),
                max_arg_size: Some(256),
            }),
            ..Default::default()
        };

        // query methods pick up the kind defaults
        assert!(config.resolved_allow_anonymous(true));
        assert_eq!(config.resolved_max_arg_size(true), Some(256));

        // update methods fall through to the globals
        assert!(!config.resolved_allow_anonymous(false));
        assert_eq!(config.resolved_max_arg_size(false), Some(1024));
    }
}
