//! File-backed policy store.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use pkauth_core::{AuthError, AuthResult, IdentityResolver};
use tracing::debug;

use crate::lock::{self, LockMode};
use crate::snapshot::{Revision, Snapshot};
use crate::{ConcurrencyControl, Mutation, PolicyStore};

/// Header written at the top of every policy file.
const HEADER: &str = "# Managed by pkauth. Sections outside the user: namespace are preserved.\n";

/// Policy store over a single keyed-section file.
pub struct FilePolicyStore {
    path: PathBuf,
    identities: Arc<dyn IdentityResolver>,
    concurrency: ConcurrencyControl,
}

impl FilePolicyStore {
    /// Store over the file at `path`, using advisory locking.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, identities: Arc<dyn IdentityResolver>) -> Self {
        Self {
            path: path.into(),
            identities,
            concurrency: ConcurrencyControl::default(),
        }
    }

    /// Select how concurrent mutations are coordinated.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: ConcurrencyControl) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// The backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The configured concurrency control.
    #[must_use]
    pub fn concurrency(&self) -> ConcurrencyControl {
        self.concurrency
    }

    /// Read the raw file. `None` if it does not exist.
    ///
    /// Reads and handles `NotFound` rather than checking `exists()` first.
    fn read_raw(&self) -> AuthResult<Option<Vec<u8>>> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AuthError::unreadable(
                &self.path,
                format!("failed to read policy file: {e}"),
            )),
        }
    }

    /// Read and decode without taking a lock (caller holds one).
    fn load_inner(&self) -> AuthResult<Snapshot> {
        let raw = self.read_raw()?;
        let snapshot = Snapshot::decode(raw.as_deref(), self.identities.as_ref(), &self.path)?;
        debug!(
            path = %self.path.display(),
            records = snapshot.records().count(),
            revision = ?snapshot.revision(),
            "Loaded policy snapshot"
        );
        Ok(snapshot)
    }

    /// Current revision of the file (caller holds the exclusive lock).
    fn current_revision(&self) -> AuthResult<Option<Revision>> {
        Ok(self.read_raw()?.as_deref().map(Revision::of))
    }

    /// Write `snapshot` atomically (caller holds the exclusive lock).
    ///
    /// Writes to a temp file in the same directory (same filesystem), syncs
    /// it, then renames it over the target.
    fn save_inner(&self, snapshot: &Snapshot) -> AuthResult<()> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent).map_err(|e| {
            AuthError::unwritable(&self.path, format!("failed to create parent directory: {e}"))
        })?;

        let content = format!("{HEADER}\n{}", snapshot.encode());

        let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(|e| {
            AuthError::unwritable(
                &self.path,
                format!("failed to create temp file for atomic write: {e}"),
            )
        })?;
        tmp.write_all(content.as_bytes()).map_err(|e| {
            AuthError::unwritable(&self.path, format!("failed to write temp policy file: {e}"))
        })?;
        tmp.as_file().sync_all().map_err(|e| {
            AuthError::unwritable(
                &self.path,
                format!("failed to sync temp policy file to disk: {e}"),
            )
        })?;
        preserve_permissions(&self.path, tmp.as_file());
        tmp.persist(&self.path).map_err(|e| {
            AuthError::unwritable(
                &self.path,
                format!("failed to atomically replace policy file: {e}"),
            )
        })?;

        debug!(
            path = %self.path.display(),
            records = snapshot.records().count(),
            "Saved policy snapshot"
        );
        Ok(())
    }

    fn check_revision(&self, snapshot: &Snapshot) -> AuthResult<()> {
        let current = self.current_revision()?;
        if current != snapshot.revision() {
            debug!(
                path = %self.path.display(),
                loaded = ?snapshot.revision(),
                current = ?current,
                "Policy file changed since load"
            );
            return Err(AuthError::Conflict {
                path: self.path.clone(),
            });
        }
        Ok(())
    }
}

/// Carry the old file's mode over to its replacement. Temp files are created
/// `0600`, which would otherwise tighten a world-readable policy file.
#[cfg(unix)]
fn preserve_permissions(target: &Path, tmp: &std::fs::File) {
    if let Ok(meta) = std::fs::metadata(target)
        && let Err(e) = tmp.set_permissions(meta.permissions())
    {
        debug!(path = %target.display(), error = %e, "Could not copy policy file permissions");
    }
}

#[cfg(not(unix))]
fn preserve_permissions(_target: &Path, _tmp: &std::fs::File) {}

impl PolicyStore for FilePolicyStore {
    fn load(&self) -> AuthResult<Snapshot> {
        let _lock_guard = lock::acquire(&self.path, LockMode::Shared)?;
        self.load_inner()
    }

    fn persist(&self, snapshot: &Snapshot) -> AuthResult<()> {
        let _lock_guard = lock::acquire(&self.path, LockMode::Exclusive)?;
        self.check_revision(snapshot)?;
        self.save_inner(snapshot)
    }

    fn persist_unchecked(&self, snapshot: &Snapshot) -> AuthResult<()> {
        let _lock_guard = lock::acquire(&self.path, LockMode::Exclusive)?;
        self.save_inner(snapshot)
    }

    fn update(&self, mutate: &mut Mutation<'_>) -> AuthResult<()> {
        match self.concurrency {
            ConcurrencyControl::Lock => {
                // Hold the exclusive lock across both load and save.
                let _lock_guard = lock::acquire(&self.path, LockMode::Exclusive)?;
                let mut snapshot = self.load_inner()?;
                if mutate(&mut snapshot)? {
                    self.save_inner(&snapshot)?;
                }
                Ok(())
            },
            ConcurrencyControl::Optimistic => {
                let mut snapshot = self.load()?;
                if mutate(&mut snapshot)? {
                    self.persist(&snapshot)?;
                }
                Ok(())
            },
        }
    }

    fn backend(&self) -> &'static str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkauth_core::{ActionId, Identity, Polarity, StaticIdentityResolver};

    fn users() -> Arc<dyn IdentityResolver> {
        Arc::new(
            StaticIdentityResolver::new()
                .with_user(1000, "alice")
                .with_user(1001, "bob"),
        )
    }

    fn id(s: &str) -> ActionId {
        ActionId::new(s).unwrap()
    }

    fn grant(snap: &mut Snapshot, uid: u32, name: &str, action: &str) -> bool {
        snap.add_action(&Identity::new(uid, name), Polarity::Allow, &id(action))
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilePolicyStore::new(dir.path().join("policy.pkla"), users());
        let snap = store.load().unwrap();
        assert!(snap.is_empty());
        assert!(snap.revision().is_none());
    }

    #[test]
    fn test_update_creates_file_and_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("50-local.d").join("policy.pkla");
        let store = FilePolicyStore::new(&path, users());

        store
            .update(&mut |snap| Ok(grant(snap, 1000, "alice", "org.example.a")))
            .unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("# Managed by pkauth"));
        assert!(text.contains("[user:alice:allow]\nAction=org.example.a\n"));

        let snap = store.load().unwrap();
        assert_eq!(
            snap.record("alice", Polarity::Allow).unwrap().action_ids(),
            &[id("org.example.a")]
        );
    }

    #[test]
    fn test_corrupt_file_is_unreadable_and_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy.pkla");
        std::fs::write(&path, "garbage without sections\n").unwrap();
        let store = FilePolicyStore::new(&path, users());

        assert!(matches!(
            store.load(),
            Err(AuthError::StoreUnreadable { .. })
        ));
        let err = store
            .update(&mut |snap| Ok(grant(snap, 1000, "alice", "org.example.a")))
            .unwrap_err();
        assert!(matches!(err, AuthError::StoreUnreadable { .. }));
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "garbage without sections\n"
        );
    }

    #[test]
    fn test_failed_mutation_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy.pkla");
        let store = FilePolicyStore::new(&path, users());

        let err = store
            .update(&mut |snap| {
                grant(snap, 1000, "alice", "org.example.a");
                Err(AuthError::InvalidArgument("rejected".into()))
            })
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidArgument(_)));
        assert!(!path.exists());
    }

    #[test]
    fn test_unchanged_mutation_skips_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy.pkla");
        let store = FilePolicyStore::new(&path, users());

        store.update(&mut |_| Ok(false)).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_persist_detects_concurrent_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy.pkla");
        let store = FilePolicyStore::new(&path, users());

        let mut first = store.load().unwrap();
        let mut second = store.load().unwrap();

        grant(&mut first, 1000, "alice", "org.example.a");
        store.persist(&first).unwrap();

        grant(&mut second, 1001, "bob", "org.example.b");
        let err = store.persist(&second).unwrap_err();
        assert!(matches!(err, AuthError::Conflict { .. }));
        assert!(err.is_retryable());

        // The first writer's change survived.
        let snap = store.load().unwrap();
        assert!(snap.record("alice", Polarity::Allow).is_some());
        assert!(snap.record("bob", Polarity::Allow).is_none());
    }

    #[test]
    fn test_persist_unchecked_is_last_writer_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy.pkla");
        let store = FilePolicyStore::new(&path, users());

        let mut first = store.load().unwrap();
        let mut second = store.load().unwrap();
        grant(&mut first, 1000, "alice", "org.example.a");
        grant(&mut second, 1001, "bob", "org.example.b");
        store.persist_unchecked(&first).unwrap();
        store.persist_unchecked(&second).unwrap();

        let snap = store.load().unwrap();
        assert!(snap.record("alice", Polarity::Allow).is_none());
        assert!(snap.record("bob", Polarity::Allow).is_some());
    }

    #[test]
    fn test_optimistic_update_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy.pkla");
        let store = FilePolicyStore::new(&path, users())
            .with_concurrency(ConcurrencyControl::Optimistic);

        store
            .update(&mut |snap| Ok(grant(snap, 1000, "alice", "org.example.a")))
            .unwrap();
        store
            .update(&mut |snap| Ok(grant(snap, 1000, "alice", "org.example.b")))
            .unwrap();

        let snap = store.load().unwrap();
        assert_eq!(
            snap.record("alice", Polarity::Allow).unwrap().action_ids().len(),
            2
        );
    }

    #[test]
    fn test_passthrough_sections_survive_updates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy.pkla");
        std::fs::write(
            &path,
            "[Removable media]\nIdentity=unix-group:plugdev\nResultActive=yes\n\n\
             [user:ghost:deny]\nAction=org.example.x\n",
        )
        .unwrap();
        let store = FilePolicyStore::new(&path, users());

        store
            .update(&mut |snap| Ok(grant(snap, 1000, "alice", "org.example.a")))
            .unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("[Removable media]\nIdentity=unix-group:plugdev\n"));
        assert!(text.contains("[user:ghost:deny]\nAction=org.example.x\n"));
        assert!(text.contains("[user:alice:allow]\n"));
    }

    #[test]
    fn test_parent_that_is_a_file_is_unwritable() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("50-local.d");
        std::fs::write(&blocker, "not a directory\n").unwrap();
        let store = FilePolicyStore::new(blocker.join("policy.pkla"), users());

        let err = store
            .update(&mut |snap| Ok(grant(snap, 1000, "alice", "org.example.a")))
            .unwrap_err();
        assert!(matches!(err, AuthError::StoreUnwritable { .. }));
        assert!(!err.is_retryable());
        assert_eq!(std::fs::read_to_string(&blocker).unwrap(), "not a directory\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_read_only_directory_is_unwritable_and_file_untouched() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy.pkla");
        let store = FilePolicyStore::new(&path, users())
            .with_concurrency(ConcurrencyControl::Optimistic);
        store
            .update(&mut |snap| Ok(grant(snap, 1000, "alice", "org.example.a")))
            .unwrap();
        let before = std::fs::read(&path).unwrap();

        std::fs::set_permissions(dir.path(), std::fs::Permissions::from_mode(0o555)).unwrap();
        // Permission bits do not bind a privileged user.
        if tempfile::NamedTempFile::new_in(dir.path()).is_ok() {
            std::fs::set_permissions(dir.path(), std::fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        for concurrency in [ConcurrencyControl::Lock, ConcurrencyControl::Optimistic] {
            let store = FilePolicyStore::new(&path, users()).with_concurrency(concurrency);
            let err = store
                .update(&mut |snap| Ok(grant(snap, 1001, "bob", "org.example.b")))
                .unwrap_err();
            assert!(matches!(err, AuthError::StoreUnwritable { .. }), "{concurrency:?}: {err}");
        }

        std::fs::set_permissions(dir.path(), std::fs::Permissions::from_mode(0o755)).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[cfg(unix)]
    #[test]
    fn test_replacement_keeps_file_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy.pkla");
        std::fs::write(&path, "").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let store = FilePolicyStore::new(&path, users());
        store
            .update(&mut |snap| Ok(grant(snap, 1000, "alice", "org.example.a")))
            .unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }
}
