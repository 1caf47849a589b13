///
/// IMPORT IC CRATES
///
pub use ic_cdk::*;

pub mod api {
    pub use ic_cdk::api::*;
}

pub mod candid {
    pub use ::candid::*;
}
