//! Advisory locking on a `.lk` sibling of the policy file.

use std::fs::File;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use pkauth_core::{AuthError, AuthResult};

/// Whether to acquire a shared (read) or exclusive (write) lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LockMode {
    Shared,
    Exclusive,
}

/// Path of the lock file guarding `policy_path`.
pub(crate) fn lock_path(policy_path: &Path) -> PathBuf {
    let mut name = policy_path
        .file_name()
        .map(std::ffi::OsStr::to_os_string)
        .unwrap_or_default();
    name.push(".lk");
    policy_path.with_file_name(name)
}

/// Acquire an advisory lock for `policy_path`.
///
/// Returns `Some(file)` holding the lock (dropped = released), or `None` in
/// shared mode when no lock file exists: nobody has written yet, so there is
/// no writer to coordinate with. Exclusive mode creates the lock file and its
/// parent directories.
pub(crate) fn acquire(policy_path: &Path, mode: LockMode) -> AuthResult<Option<File>> {
    let lock_path = lock_path(policy_path);

    match mode {
        LockMode::Shared => match std::fs::OpenOptions::new().read(true).open(&lock_path) {
            Ok(lock_file) => {
                lock_file.lock_shared().map_err(|e| {
                    AuthError::unreadable(
                        policy_path,
                        format!("failed to acquire shared file lock: {e}"),
                    )
                })?;
                Ok(Some(lock_file))
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AuthError::unreadable(
                policy_path,
                format!("failed to open lock file: {e}"),
            )),
        },
        LockMode::Exclusive => {
            if let Some(parent) = lock_path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    AuthError::unwritable(
                        policy_path,
                        format!("failed to create lock file directory: {e}"),
                    )
                })?;
            }

            let lock_file = std::fs::OpenOptions::new()
                .create(true)
                .truncate(false)
                .write(true)
                .read(true)
                .open(&lock_path)
                .map_err(|e| {
                    AuthError::unwritable(policy_path, format!("failed to open lock file: {e}"))
                })?;

            lock_file.lock_exclusive().map_err(|e| {
                AuthError::unwritable(
                    policy_path,
                    format!("failed to acquire exclusive file lock: {e}"),
                )
            })?;

            Ok(Some(lock_file))
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_path_is_sibling() {
        assert_eq!(
            lock_path(Path::new("/etc/polkit-1/50-pkauth.pkla")),
            PathBuf::from("/etc/polkit-1/50-pkauth.pkla.lk")
        );
    }

    #[test]
    fn test_shared_without_lock_file_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let guard = acquire(&dir.path().join("policy.pkla"), LockMode::Shared).unwrap();
        assert!(guard.is_none());
    }

    #[test]
    fn test_exclusive_creates_lock_file() {
        let dir = tempfile::tempdir().unwrap();
        let policy = dir.path().join("nested").join("policy.pkla");
        let guard = acquire(&policy, LockMode::Exclusive).unwrap();
        assert!(guard.is_some());
        assert!(lock_path(&policy).exists());
        drop(guard);

        // Once a writer has been here, readers lock too.
        assert!(acquire(&policy, LockMode::Shared).unwrap().is_some());
    }
}
