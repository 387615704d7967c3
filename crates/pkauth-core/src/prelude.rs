//! Prelude module - commonly used types for convenient import.
//!
//! Use `use pkauth_core::prelude::*;` to import all essential types.

// Errors
pub use crate::{AuthError, AuthResult};

// Policy vocabulary
pub use crate::{ActionId, Polarity, Resolution, Scope};

// Collaborators
pub use crate::{ActionCatalog, ActionDescription, Identity, IdentityResolver};
