//!
//! Shared type wrappers and aliases used across the inspection layers.
//!
//! These helpers centralize candid-friendly types so consumers can
//! `use guardic::types::*` without reaching into submodules.
//!

mod cycles;

pub use cycles::*;

//
// common types
//

pub use crate::cdk::candid::{Int, Nat, Principal};
pub use serde_bytes::ByteBuf;
