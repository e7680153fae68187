//! CLI command implementations.

pub mod identity;
pub mod inspect;
pub mod sign;
pub mod verify;
