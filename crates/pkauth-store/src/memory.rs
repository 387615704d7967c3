//! In-memory policy store.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use pkauth_core::{AuthError, AuthResult, IdentityResolver};

use crate::snapshot::{Revision, Snapshot};
use crate::{Mutation, PolicyStore};

const MEMORY_PATH: &str = "<memory>";

/// Policy store holding the encoded policy text in memory.
///
/// Behaves like [`FilePolicyStore`](crate::FilePolicyStore) (same encoding,
/// same revision checks) without touching the filesystem. Updates are
/// serialized by an internal mutex.
pub struct MemoryPolicyStore {
    content: Mutex<Option<String>>,
    identities: Arc<dyn IdentityResolver>,
}

impl MemoryPolicyStore {
    /// Empty store.
    #[must_use]
    pub fn new(identities: Arc<dyn IdentityResolver>) -> Self {
        Self {
            content: Mutex::new(None),
            identities,
        }
    }

    /// Store seeded with existing policy text.
    #[must_use]
    pub fn with_content(identities: Arc<dyn IdentityResolver>, content: impl Into<String>) -> Self {
        Self {
            content: Mutex::new(Some(content.into())),
            identities,
        }
    }

    /// The current encoded policy text, if anything has been written.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnreadable` if the internal lock is poisoned.
    pub fn content(&self) -> AuthResult<Option<String>> {
        Ok(self.lock_read()?.clone())
    }

    fn path() -> &'static Path {
        Path::new(MEMORY_PATH)
    }

    fn lock_read(&self) -> AuthResult<MutexGuard<'_, Option<String>>> {
        self.content
            .lock()
            .map_err(|e| AuthError::unreadable(PathBuf::from(MEMORY_PATH), e.to_string()))
    }

    fn lock_write(&self) -> AuthResult<MutexGuard<'_, Option<String>>> {
        self.content
            .lock()
            .map_err(|e| AuthError::unwritable(PathBuf::from(MEMORY_PATH), e.to_string()))
    }

    fn decode(&self, content: Option<&String>) -> AuthResult<Snapshot> {
        Snapshot::decode(
            content.map(String::as_bytes),
            self.identities.as_ref(),
            Self::path(),
        )
    }
}

impl PolicyStore for MemoryPolicyStore {
    fn load(&self) -> AuthResult<Snapshot> {
        let guard = self.lock_read()?;
        self.decode(guard.as_ref())
    }

    fn persist(&self, snapshot: &Snapshot) -> AuthResult<()> {
        let mut guard = self.lock_write()?;
        let current = guard.as_deref().map(|c| Revision::of(c.as_bytes()));
        if current != snapshot.revision() {
            return Err(AuthError::Conflict {
                path: PathBuf::from(MEMORY_PATH),
            });
        }
        *guard = Some(snapshot.encode());
        Ok(())
    }

    fn persist_unchecked(&self, snapshot: &Snapshot) -> AuthResult<()> {
        *self.lock_write()? = Some(snapshot.encode());
        Ok(())
    }

    fn update(&self, mutate: &mut Mutation<'_>) -> AuthResult<()> {
        let mut guard = self.lock_write()?;
        let mut snapshot = self.decode(guard.as_ref())?;
        if mutate(&mut snapshot)? {
            *guard = Some(snapshot.encode());
        }
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
