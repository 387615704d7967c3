//! Shared test harness for integration tests.

use std::path::PathBuf;
use std::sync::Arc;

use pkauth_authority::Authority;
use pkauth_core::{ActionDescription, ActionId, StaticActionCatalog, StaticIdentityResolver};
use pkauth_store::{ConcurrencyControl, FilePolicyStore};
use tempfile::TempDir;

/// Action id used throughout the scenarios.
pub const ACTION: &str = "org.example.action";

/// A policy file in a fresh temporary directory plus a fixed user table.
///
/// The tempdir is cleaned up when the harness is dropped.
#[allow(dead_code)]
pub struct PolicyHarness {
    /// Path of the policy file (not created until the first write).
    pub path: PathBuf,
    /// Users 1000 (`alice`) and 1001 (`bob`).
    pub users: Arc<StaticIdentityResolver>,
    _dir: TempDir,
}

#[allow(dead_code)]
impl PolicyHarness {
    /// Build a harness with an empty directory.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create tempdir");
        Self {
            path: dir.path().join("50-pkauth.pkla"),
            users: Arc::new(
                StaticIdentityResolver::new()
                    .with_user(1000, "alice")
                    .with_user(1001, "bob"),
            ),
            _dir: dir,
        }
    }

    /// A file store over the harness path.
    pub fn store(&self, concurrency: ConcurrencyControl) -> FilePolicyStore {
        FilePolicyStore::new(&self.path, self.users.clone()).with_concurrency(concurrency)
    }

    /// An authority over a file store with the given concurrency control.
    pub fn authority(&self, concurrency: ConcurrencyControl) -> Authority {
        let catalog = StaticActionCatalog::new(vec![
            ActionDescription::new(ActionId::new(ACTION).expect("valid action id"))
                .with_description("Example action"),
        ]);
        Authority::new(
            Arc::new(self.store(concurrency)),
            self.users.clone(),
            Arc::new(catalog),
        )
    }

    /// Raw policy file contents, or an empty string if it was never written.
    pub fn contents(&self) -> String {
        std::fs::read_to_string(&self.path).unwrap_or_default()
    }
}
