//! pkauth Store - durable, keyed-section storage for authorization records.
//!
//! The policy file holds one section per `(identity, polarity)` pair:
//!
//! ```text
//! [user:alice:allow]
//! Action=org.freedesktop.hal.storage.mount-removable:org.example.action
//! Identity=unix-user:alice
//! ResultAny=yes
//! ResultInactive=yes
//! ResultActive=yes
//! ```
//!
//! Every mutation is a full load → mutate → persist cycle over the whole
//! file. [`PolicyStore::update`] runs that cycle either under an exclusive
//! advisory lock or with a revision check at write time, depending on the
//! store's [`ConcurrencyControl`]. Writes go to a temporary file in the same
//! directory which is then renamed over the target, so readers never see a
//! partial file.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use pkauth_core::{ActionId, Identity, Polarity, StaticIdentityResolver};
//! use pkauth_store::{MemoryPolicyStore, PolicyStore};
//!
//! let users = Arc::new(StaticIdentityResolver::new().with_user(1000, "alice"));
//! let store = MemoryPolicyStore::new(users);
//! let alice = Identity::new(1000, "alice");
//! let action = ActionId::new("org.example.action").unwrap();
//!
//! store
//!     .update(&mut |snap| Ok(snap.add_action(&alice, Polarity::Allow, &action)))
//!     .unwrap();
//! assert!(store.load().unwrap().record("alice", Polarity::Allow).is_some());
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod keyfile;
pub mod record;
pub mod snapshot;

mod file;
mod lock;
mod memory;

use serde::{Deserialize, Serialize};

use pkauth_core::AuthResult;

pub use file::FilePolicyStore;
pub use keyfile::{KeyFile, KeyFileError, Section};
pub use memory::MemoryPolicyStore;
pub use record::AuthorizationRecord;
pub use snapshot::{Revision, Snapshot};

/// A snapshot mutation. Returns whether the snapshot changed; an unchanged
/// snapshot is not written back. An error aborts the cycle without writing.
pub type Mutation<'a> = dyn FnMut(&mut Snapshot) -> AuthResult<bool> + 'a;

/// How concurrent load → mutate → persist cycles are kept from losing
/// each other's updates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConcurrencyControl {
    /// Hold an exclusive advisory lock across the whole cycle.
    #[default]
    Lock,
    /// Check the revision at write time and fail with a conflict if the
    /// resource changed since it was loaded.
    Optimistic,
}

/// Durable storage for authorization records.
pub trait PolicyStore: Send + Sync {
    /// Read the current snapshot. A missing resource is an empty snapshot.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnreadable` if the resource exists but cannot be read
    /// or parsed.
    fn load(&self) -> AuthResult<Snapshot>;

    /// Replace the resource with `snapshot`, provided nothing else has
    /// written it since `snapshot` was loaded.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` if the resource's revision no longer matches the
    /// snapshot's, or `StoreUnwritable` if the write fails.
    fn persist(&self, snapshot: &Snapshot) -> AuthResult<()>;

    /// Replace the resource with `snapshot` without checking its revision.
    ///
    /// Last writer wins: a change persisted by someone else between this
    /// snapshot's load and this call is silently discarded.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnwritable` if the write fails.
    fn persist_unchecked(&self, snapshot: &Snapshot) -> AuthResult<()>;

    /// Run one transactional load → mutate → persist cycle.
    ///
    /// # Errors
    ///
    /// Propagates errors from loading, from `mutate`, and from persisting.
    /// Under [`ConcurrencyControl::Optimistic`] a concurrent writer surfaces
    /// as `Conflict`.
    fn update(&self, mutate: &mut Mutation<'_>) -> AuthResult<()>;

    /// Short name of the backend, for logs.
    fn backend(&self) -> &'static str;
}
