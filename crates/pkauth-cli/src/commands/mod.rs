//! CLI command implementations.

pub(crate) mod actions;
pub(crate) mod authorizations;
