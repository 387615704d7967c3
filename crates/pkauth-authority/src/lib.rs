//! pkauth Authority - resolve, grant, revoke and block authorizations.
//!
//! [`Authority`] ties together the three collaborators of the authorization
//! database:
//!
//! - a [`PolicyStore`] holding the durable records,
//! - an [`IdentityResolver`] mapping uids to login names,
//! - an [`ActionCatalog`] describing the known actions.
//!
//! Authorization decisions are a pure function of the store's current
//! snapshot; the catalog is only used for listing and describing actions.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use pkauth_authority::Authority;
//! use pkauth_core::{Resolution, Scope, StaticActionCatalog, StaticIdentityResolver};
//! use pkauth_store::MemoryPolicyStore;
//!
//! let users = Arc::new(StaticIdentityResolver::new().with_user(1000, "alice"));
//! let authority = Authority::new(
//!     Arc::new(MemoryPolicyStore::new(users.clone())),
//!     users,
//!     Arc::new(StaticActionCatalog::empty()),
//! );
//!
//! authority.grant(1000, "org.example.action", Scope::Always, None).unwrap();
//! assert_eq!(
//!     authority.resolve(1000, "org.example.action").unwrap(),
//!     Resolution::Allowed
//! );
//! ```
//!
//! [`PolicyStore`]: pkauth_store::PolicyStore
//! [`IdentityResolver`]: pkauth_core::IdentityResolver
//! [`ActionCatalog`]: pkauth_core::ActionCatalog

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod engine;
mod query;

pub use engine::Authority;
pub use query::{AuthorizationType, AuthorizationView};
