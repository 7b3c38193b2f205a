//! CLI command implementations.

pub mod compare;
pub mod extract;
pub mod fingerprint;
pub mod stamp;
