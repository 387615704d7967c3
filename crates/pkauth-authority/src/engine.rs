//! Authorization engine: resolution and the mutating operations.

use std::sync::Arc;

use pkauth_core::prelude::*;
use pkauth_store::PolicyStore;
use tracing::{debug, info};

/// Entry point to the authorization database.
///
/// Every operation reads a fresh snapshot from the store. Mutations run as a
/// single [`PolicyStore::update`] cycle and validate their arguments before
/// the store is touched.
pub struct Authority {
    pub(crate) store: Arc<dyn PolicyStore>,
    pub(crate) identities: Arc<dyn IdentityResolver>,
    pub(crate) catalog: Arc<dyn ActionCatalog>,
}

impl Authority {
    /// Create an authority over the given collaborators.
    #[must_use]
    pub fn new(
        store: Arc<dyn PolicyStore>,
        identities: Arc<dyn IdentityResolver>,
        catalog: Arc<dyn ActionCatalog>,
    ) -> Self {
        Self {
            store,
            identities,
            catalog,
        }
    }

    /// The underlying policy store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn PolicyStore> {
        &self.store
    }

    /// Effective authorization of `uid` for `action_id`.
    ///
    /// A deny record naming the action wins over an allow record naming it.
    /// An unknown uid or an id that could never be stored resolves to
    /// [`Resolution::Unspecified`].
    ///
    /// # Errors
    ///
    /// Returns `StoreUnreadable` if the policy store cannot be loaded.
    pub fn resolve(&self, uid: u32, action_id: &str) -> AuthResult<Resolution> {
        let Ok(action_id) = ActionId::new(action_id) else {
            return Ok(Resolution::Unspecified);
        };
        let snapshot = self.store.load()?;

        let mut allowed = false;
        for record in snapshot.records_for_uid(uid) {
            if !record.contains(&action_id) {
                continue;
            }
            match record.polarity {
                Polarity::Deny => return Ok(Resolution::Blocked),
                Polarity::Allow => allowed = true,
            }
        }

        Ok(if allowed {
            Resolution::Allowed
        } else {
            Resolution::Unspecified
        })
    }

    /// Authorize `uid` for `action_id`.
    ///
    /// `OneShot` and `Process` scopes must name the process they apply to.
    /// The policy file has no notion of process or session lifetime, so every
    /// stored grant behaves as [`Scope::Always`]. Granting an action that is
    /// already granted is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a missing pid or a malformed action id,
    /// `UnknownIdentity` if `uid` does not resolve, and store errors from
    /// the update cycle.
    pub fn grant(
        &self,
        uid: u32,
        action_id: &str,
        scope: Scope,
        pid: Option<u32>,
    ) -> AuthResult<()> {
        if scope.requires_pid() && pid.is_none_or(|p| p == 0) {
            return Err(AuthError::InvalidArgument(format!(
                "scope {scope} requires a process id"
            )));
        }
        let action_id = ActionId::new(action_id)?;
        let identity = self.identities.resolve(uid)?;

        let mut added = false;
        self.store.update(&mut |snapshot| {
            added = snapshot.add_action(&identity, Polarity::Allow, &action_id);
            Ok(added)
        })?;

        if added {
            info!(uid, user = %identity.name, action_id = %action_id, %scope, ?pid, "Granted authorization");
        } else {
            debug!(uid, action_id = %action_id, "Authorization already granted");
        }
        Ok(())
    }

    /// Remove every authorization (positive and negative) held by `uid`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownIdentity` if `uid` does not resolve, and store errors
    /// from the update cycle.
    pub fn revoke_all(&self, uid: u32) -> AuthResult<()> {
        let identity = self.identities.resolve(uid)?;

        let mut removed = false;
        self.store.update(&mut |snapshot| {
            removed = snapshot.remove_identity(&identity.name);
            Ok(removed)
        })?;

        if removed {
            info!(uid, user = %identity.name, "Revoked all authorizations");
        }
        Ok(())
    }

    /// Remove `action_id` from both the allow and deny records of `uid`.
    ///
    /// A record left without actions is deleted.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a malformed action id, `UnknownIdentity`
    /// if `uid` does not resolve, and store errors from the update cycle.
    pub fn revoke(&self, uid: u32, action_id: &str) -> AuthResult<()> {
        let action_id = ActionId::new(action_id)?;
        let identity = self.identities.resolve(uid)?;

        let mut removed = false;
        self.store.update(&mut |snapshot| {
            removed = snapshot.remove_action(&identity.name, &action_id);
            Ok(removed)
        })?;

        if removed {
            info!(uid, user = %identity.name, action_id = %action_id, "Revoked authorization");
        }
        Ok(())
    }

    /// Record a negative authorization for `uid` on `action_id`.
    ///
    /// Blocks take precedence over grants for the same action, so this is
    /// how a user who would otherwise be implicitly authorized is shut out.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a malformed action id, `UnknownIdentity`
    /// if `uid` does not resolve, and store errors from the update cycle.
    pub fn block(&self, uid: u32, action_id: &str) -> AuthResult<()> {
        let action_id = ActionId::new(action_id)?;
        let identity = self.identities.resolve(uid)?;

        let mut added = false;
        self.store.update(&mut |snapshot| {
            added = snapshot.add_action(&identity, Polarity::Deny, &action_id);
            Ok(added)
        })?;

        if added {
            info!(uid, user = %identity.name, action_id = %action_id, "Blocked authorization");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkauth_core::{StaticActionCatalog, StaticIdentityResolver};
    use pkauth_store::{ConcurrencyControl, FilePolicyStore, MemoryPolicyStore};

    const ACTION: &str = "org.example.action";

    fn users() -> Arc<StaticIdentityResolver> {
        Arc::new(
            StaticIdentityResolver::new()
                .with_user(1000, "alice")
                .with_user(1001, "bob"),
        )
    }

    fn authority() -> Authority {
        let users = users();
        Authority::new(
            Arc::new(MemoryPolicyStore::new(users.clone())),
            users,
            Arc::new(StaticActionCatalog::empty()),
        )
    }

    fn file_authority(path: &std::path::Path) -> Authority {
        let users = users();
        Authority::new(
            Arc::new(FilePolicyStore::new(path, users.clone())),
            users,
            Arc::new(StaticActionCatalog::empty()),
        )
    }

    #[test]
    fn test_fresh_store_is_unspecified() {
        let authority = authority();
        assert_eq!(authority.resolve(1000, ACTION).unwrap(), Resolution::Unspecified);
    }

    #[test]
    fn test_grant_then_resolve() {
        let authority = authority();
        authority.grant(1000, ACTION, Scope::Always, None).unwrap();
        assert_eq!(authority.resolve(1000, ACTION).unwrap(), Resolution::Allowed);
        assert_eq!(authority.resolve(1001, ACTION).unwrap(), Resolution::Unspecified);
        assert_eq!(
            authority.resolve(1000, "org.example.other").unwrap(),
            Resolution::Unspecified
        );
    }

    #[test]
    fn test_grant_requires_pid_for_process_scopes() {
        let authority = authority();
        for scope in [Scope::OneShot, Scope::Process] {
            let err = authority.grant(1000, ACTION, scope, None).unwrap_err();
            assert!(matches!(err, AuthError::InvalidArgument(_)));
            let err = authority.grant(1000, ACTION, scope, Some(0)).unwrap_err();
            assert!(matches!(err, AuthError::InvalidArgument(_)));
        }
        assert_eq!(authority.resolve(1000, ACTION).unwrap(), Resolution::Unspecified);

        authority.grant(1000, ACTION, Scope::OneShot, Some(4321)).unwrap();
        authority.grant(1000, ACTION, Scope::Session, None).unwrap();
        assert_eq!(authority.resolve(1000, ACTION).unwrap(), Resolution::Allowed);
    }

    #[test]
    fn test_pid_checked_before_identity() {
        let authority = authority();
        let err = authority.grant(9999, ACTION, Scope::Process, None).unwrap_err();
        assert!(matches!(err, AuthError::InvalidArgument(_)));
    }

    #[test]
    fn test_unknown_identity() {
        let authority = authority();
        for result in [
            authority.grant(9999, ACTION, Scope::Always, None),
            authority.block(9999, ACTION),
            authority.revoke(9999, ACTION),
            authority.revoke_all(9999),
        ] {
            assert!(matches!(result, Err(AuthError::UnknownIdentity { uid: 9999 })));
        }
    }

    #[test]
    fn test_malformed_action_id() {
        let authority = authority();
        assert!(matches!(
            authority.grant(1000, "bad:id", Scope::Always, None),
            Err(AuthError::InvalidArgument(_))
        ));
        assert!(matches!(
            authority.block(1000, ""),
            Err(AuthError::InvalidArgument(_))
        ));
        assert_eq!(authority.resolve(1000, "bad:id").unwrap(), Resolution::Unspecified);
    }

    #[test]
    fn test_block_wins_in_either_order() {
        let authority = authority();
        authority.grant(1000, ACTION, Scope::Always, None).unwrap();
        authority.block(1000, ACTION).unwrap();
        assert_eq!(authority.resolve(1000, ACTION).unwrap(), Resolution::Blocked);

        authority.block(1001, ACTION).unwrap();
        authority.grant(1001, ACTION, Scope::Always, None).unwrap();
        assert_eq!(authority.resolve(1001, ACTION).unwrap(), Resolution::Blocked);
    }

    #[test]
    fn test_block_creates_deny_record_with_no_results() {
        let authority = authority();
        authority.block(1000, ACTION).unwrap();

        let snapshot = authority.store().load().unwrap();
        let deny = snapshot.record("alice", Polarity::Deny).unwrap();
        assert!(!deny.result_any && !deny.result_inactive && !deny.result_active);
        assert!(snapshot.record("alice", Polarity::Allow).is_none());
        assert_eq!(authority.resolve(1000, ACTION).unwrap(), Resolution::Blocked);
    }

    #[test]
    fn test_grant_is_idempotent() {
        let authority = authority();
        authority.grant(1000, ACTION, Scope::Always, None).unwrap();
        let once = authority.store().load().unwrap();
        authority.grant(1000, ACTION, Scope::Always, None).unwrap();
        let twice = authority.store().load().unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_grant_then_revoke_restores_empty_store() {
        let authority = authority();
        authority.grant(1000, ACTION, Scope::Always, None).unwrap();
        authority.revoke(1000, ACTION).unwrap();

        let snapshot = authority.store().load().unwrap();
        assert_eq!(snapshot.records().count(), 0);
        assert_eq!(authority.resolve(1000, ACTION).unwrap(), Resolution::Unspecified);
    }

    #[test]
    fn test_revoke_prunes_only_emptied_records() {
        let authority = authority();
        authority.grant(1000, ACTION, Scope::Always, None).unwrap();
        authority.grant(1000, "org.example.kept", Scope::Always, None).unwrap();
        authority.block(1000, ACTION).unwrap();

        authority.revoke(1000, ACTION).unwrap();

        let snapshot = authority.store().load().unwrap();
        assert!(snapshot.record("alice", Polarity::Deny).is_none());
        let allow = snapshot.record("alice", Polarity::Allow).unwrap();
        assert_eq!(allow.action_ids().len(), 1);
        assert_eq!(allow.action_ids()[0].as_str(), "org.example.kept");
    }

    #[test]
    fn test_revoke_all_removes_both_records() {
        let authority = authority();
        authority.grant(1000, ACTION, Scope::Always, None).unwrap();
        authority.block(1000, "org.example.other").unwrap();
        authority.grant(1001, ACTION, Scope::Always, None).unwrap();

        authority.revoke_all(1000).unwrap();
        authority.revoke_all(1000).unwrap();

        let snapshot = authority.store().load().unwrap();
        assert_eq!(snapshot.records_for_uid(1000).count(), 0);
        assert_eq!(snapshot.records_for_uid(1001).count(), 1);
    }

    #[test]
    fn test_at_most_one_record_per_polarity() {
        let authority = authority();
        for action in ["org.example.a", "org.example.b", "org.example.c"] {
            authority.grant(1000, action, Scope::Always, None).unwrap();
            authority.block(1000, action).unwrap();
        }
        authority.revoke(1000, "org.example.b").unwrap();

        let snapshot = authority.store().load().unwrap();
        for polarity in [Polarity::Allow, Polarity::Deny] {
            assert_eq!(
                snapshot
                    .records_for_uid(1000)
                    .filter(|r| r.polarity == polarity)
                    .count(),
                1
            );
        }
    }

    #[test]
    fn test_file_backed_optimistic_engine() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy.pkla");
        let users = users();
        let authority = Authority::new(
            Arc::new(
                FilePolicyStore::new(&path, users.clone())
                    .with_concurrency(ConcurrencyControl::Optimistic),
            ),
            users,
            Arc::new(StaticActionCatalog::empty()),
        );

        authority.grant(1000, ACTION, Scope::Always, None).unwrap();
        authority.block(1001, ACTION).unwrap();
        assert_eq!(authority.resolve(1000, ACTION).unwrap(), Resolution::Allowed);
        assert_eq!(authority.resolve(1001, ACTION).unwrap(), Resolution::Blocked);
    }

    #[test]
    fn test_file_written_in_expected_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy.pkla");
        let authority = file_authority(&path);

        authority.grant(1000, "org.example.a", Scope::Always, None).unwrap();
        authority.grant(1000, "org.example.b", Scope::Always, None).unwrap();
        authority.block(1000, "org.example.c").unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains(
            "[user:alice:allow]\n\
             Action=org.example.a:org.example.b\n\
             Identity=unix-user:alice\n\
             ResultAny=yes\n\
             ResultInactive=yes\n\
             ResultActive=yes\n"
        ));
        assert!(text.contains(
            "[user:alice:deny]\n\
             Action=org.example.c\n\
             Identity=unix-user:alice\n\
             ResultAny=no\n\
             ResultInactive=no\n\
             ResultActive=no\n"
        ));
    }

    #[test]
    fn test_corrupt_store_fails_mutation_and_query() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy.pkla");
        std::fs::write(&path, "[user:alice:allow]\nResultAny=sometimes\nAction=a.b\n").unwrap();
        let authority = file_authority(&path);

        assert!(matches!(
            authority.resolve(1000, "a.b"),
            Err(AuthError::StoreUnreadable { .. })
        ));
        assert!(matches!(
            authority.grant(1000, "a.c", Scope::Always, None),
            Err(AuthError::StoreUnreadable { .. })
        ));
    }
}
