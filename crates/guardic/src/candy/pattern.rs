//!
//! Fixed text pattern predicates for structural checks.
//!
//! These are deliberately small closed-form checks, not a regex engine.
//! Anything richer belongs in a custom check on the method itself.
//!

use candid::CandidType;
use derive_more::Display;
use serde::{Deserialize, Serialize};

///
/// PatternKind
///

#[derive(
    CandidType, Clone, Copy, Debug, Display, Eq, PartialEq, Serialize, Deserialize,
)]
#[remain::sorted]
pub enum PatternKind {
    #[display("alphanumeric")]
    Alphanumeric,
    #[display("email")]
    Email,
    #[display("hex")]
    Hex,
    #[display("identifier")]
    Identifier,
    #[display("url")]
    Url,
}

impl PatternKind {
    #[must_use]
    pub fn matches(self, s: &str) -> bool {
        match self {
            Self::Alphanumeric => is_alphanumeric(s),
            Self::Email => is_email(s),
            Self::Hex => is_hex(s),
            Self::Identifier => is_identifier(s),
            Self::Url => is_url(s),
        }
    }
}

fn is_alphanumeric(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric())
}

fn is_hex(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_hexdigit())
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();

    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }

    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

// One '@', non-empty local part, dotted non-empty domain labels.
fn is_email(s: &str) -> bool {
    if s.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };

    if local.is_empty() || domain.contains('@') {
        return false;
    }

    domain.contains('.') && domain.split('.').all(|label| !label.is_empty())
}

// http(s) scheme with a non-empty host.
fn is_url(s: &str) -> bool {
    let rest = s
        .strip_prefix("https://")
        .or_else(|| s.strip_prefix("http://"));

    match rest {
        Some(rest) => {
            let host = rest.split('/').next().unwrap_or_default();
            !host.is_empty() && !host.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

///
/// TESTS
///
