//! Read-only views over the stored authorizations and the action catalog.

use serde::Serialize;
use tracing::debug;

use pkauth_core::{ActionDescription, ActionId, AuthResult, Scope};

use crate::Authority;

/// Kind of subject an authorization applies to. Only uid-based
/// authorizations are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorizationType {
    /// Authorization held by a unix user.
    Uid,
}

/// One stored authorization, as reported to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorizationView {
    /// Action the authorization covers.
    pub action_id: ActionId,
    /// User holding it.
    pub uid: u32,
    /// Always [`Scope::Always`]: file-backed grants have no expiry.
    pub scope: Scope,
    /// Subject kind.
    #[serde(rename = "type")]
    pub kind: AuthorizationType,
    /// `true` for a block, derived from the record's `ResultAny`.
    pub negative: bool,
}

impl Authority {
    /// Every stored authorization whose login still resolves to a uid.
    ///
    /// Records for logins that no longer exist are skipped. Views follow
    /// file order, then action order within each record.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnreadable` if the policy store cannot be loaded.
    pub fn list_all_authorizations(&self) -> AuthResult<Vec<AuthorizationView>> {
        let snapshot = self.store.load()?;
        let views: Vec<_> = snapshot
            .records()
            .flat_map(|record| {
                let negative = !record.result_any;
                let uid = record.identity.uid;
                record.action_ids().iter().map(move |action_id| AuthorizationView {
                    action_id: action_id.clone(),
                    uid,
                    scope: Scope::Always,
                    kind: AuthorizationType::Uid,
                    negative,
                })
            })
            .collect();
        debug!(count = views.len(), backend = self.store.backend(), "Listed authorizations");
        Ok(views)
    }

    /// Stored authorizations held by `uid`.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnreadable` if the policy store cannot be loaded.
    pub fn list_for_uid(&self, uid: u32) -> AuthResult<Vec<AuthorizationView>> {
        let mut views = self.list_all_authorizations()?;
        views.retain(|view| view.uid == uid);
        Ok(views)
    }

    /// All authorizations, or only those of `uid` when given.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnreadable` if the policy store cannot be loaded.
    pub fn list_authorizations(&self, uid: Option<u32>) -> AuthResult<Vec<AuthorizationView>> {
        match uid {
            Some(uid) => self.list_for_uid(uid),
            None => self.list_all_authorizations(),
        }
    }

    /// Ids of every action the catalog knows.
    ///
    /// # Errors
    ///
    /// Returns `Catalog` if the catalog cannot be read.
    pub fn list_actions(&self) -> AuthResult<Vec<ActionId>> {
        self.catalog.list_actions()
    }

    /// Catalog metadata for `action_id`, or `None` if it is not registered.
    ///
    /// # Errors
    ///
    /// Returns `Catalog` if the catalog cannot be read.
    pub fn describe_action(&self, action_id: &str) -> AuthResult<Option<ActionDescription>> {
        self.catalog.describe(action_id)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use pkauth_core::{StaticActionCatalog, StaticIdentityResolver};
    use pkauth_store::MemoryPolicyStore;

    fn users() -> Arc<StaticIdentityResolver> {
        Arc::new(
            StaticIdentityResolver::new()
                .with_user(1000, "alice")
                .with_user(1001, "bob"),
        )
    }

    fn authority_with(store: MemoryPolicyStore, users: Arc<StaticIdentityResolver>) -> Authority {
        let catalog = StaticActionCatalog::new(vec![
            ActionDescription::new(ActionId::new("org.example.mount").unwrap())
                .with_description("Mount a device")
                .with_vendor("Example"),
            ActionDescription::new(ActionId::new("org.example.reboot").unwrap()),
        ]);
        Authority::new(Arc::new(store), users, Arc::new(catalog))
    }

    fn authority() -> Authority {
        let users = users();
        authority_with(MemoryPolicyStore::new(users.clone()), users)
    }

    #[test]
    fn test_empty_store_lists_nothing() {
        let authority = authority();
        assert!(authority.list_all_authorizations().unwrap().is_empty());
        assert!(authority.list_for_uid(1000).unwrap().is_empty());
    }

    #[test]
    fn test_views_report_polarity_and_scope() {
        let authority = authority();
        authority.grant(1000, "org.example.mount", Scope::Session, None).unwrap();
        authority.block(1000, "org.example.reboot").unwrap();

        let views = authority.list_for_uid(1000).unwrap();
        assert_eq!(views.len(), 2);
        let mount = views.iter().find(|v| v.action_id.as_str() == "org.example.mount").unwrap();
        assert!(!mount.negative);
        assert_eq!(mount.scope, Scope::Always);
        assert_eq!(mount.kind, AuthorizationType::Uid);
        let reboot = views.iter().find(|v| v.action_id.as_str() == "org.example.reboot").unwrap();
        assert!(reboot.negative);
    }

    #[test]
    fn test_list_for_uid_filters() {
        let authority = authority();
        authority.grant(1000, "org.example.mount", Scope::Always, None).unwrap();
        authority.grant(1001, "org.example.mount", Scope::Always, None).unwrap();
        authority.grant(1001, "org.example.reboot", Scope::Always, None).unwrap();

        assert_eq!(authority.list_all_authorizations().unwrap().len(), 3);
        assert_eq!(authority.list_for_uid(1001).unwrap().len(), 2);
        assert_eq!(authority.list_authorizations(Some(1000)).unwrap().len(), 1);
        assert_eq!(authority.list_authorizations(None).unwrap().len(), 3);
        assert!(authority.list_for_uid(4242).unwrap().is_empty());
    }

    #[test]
    fn test_records_for_vanished_logins_are_skipped() {
        let users = users();
        let store = MemoryPolicyStore::with_content(
            users.clone(),
            "[user:ghost:allow]\n\
             Action=org.example.mount\n\
             Identity=unix-user:ghost\n\
             ResultAny=yes\n\
             ResultInactive=yes\n\
             ResultActive=yes\n\
             \n\
             [user:alice:allow]\n\
             Action=org.example.mount\n\
             Identity=unix-user:alice\n\
             ResultAny=yes\n\
             ResultInactive=yes\n\
             ResultActive=yes\n",
        );
        let authority = authority_with(store, users);

        let views = authority.list_all_authorizations().unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].uid, 1000);
    }

    #[test]
    fn test_view_serializes_with_type_field() {
        let view = AuthorizationView {
            action_id: ActionId::new("org.example.mount").unwrap(),
            uid: 1000,
            scope: Scope::Always,
            kind: AuthorizationType::Uid,
            negative: false,
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["action_id"], "org.example.mount");
        assert_eq!(json["uid"], 1000);
        assert_eq!(json["scope"], "always");
        assert_eq!(json["type"], "uid");
        assert_eq!(json["negative"], false);
    }

    #[test]
    fn test_catalog_delegation() {
        let authority = authority();
        let ids = authority.list_actions().unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0].as_str(), "org.example.mount");

        let mount = authority.describe_action("org.example.mount").unwrap().unwrap();
        assert_eq!(mount.description.as_deref(), Some("Mount a device"));
        assert_eq!(mount.vendor.as_deref(), Some("Example"));
        assert!(authority.describe_action("org.example.missing").unwrap().is_none());
    }
}
