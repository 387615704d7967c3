//! pkauth Core - Foundation types for the pkauth authorization database.
//!
//! This crate provides:
//! - The error kinds shared by every pkauth crate
//! - Action identifiers, scopes, polarities and resolution outcomes
//! - Identity resolution (uid to login name and back)
//! - The action catalog: the externally supplied list of known actions

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod catalog;
pub mod error;
pub mod identity;
pub mod types;

pub use catalog::{
    ActionCatalog, ActionDescription, ImplicitAuthorization, StaticActionCatalog,
    TomlActionCatalog,
};
pub use error::{AuthError, AuthResult};
pub use identity::{Identity, IdentityResolver, StaticIdentityResolver, SystemIdentityResolver};
pub use types::{ActionId, Polarity, Resolution, Scope};
