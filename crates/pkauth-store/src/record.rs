//! Authorization records and their section form.

use pkauth_core::{ActionId, Identity, Polarity};

use crate::keyfile::Section;

/// Section-key namespace owned by the authorization database.
pub const USER_PREFIX: &str = "user:";

pub(crate) const KEY_ACTION: &str = "Action";
pub(crate) const KEY_IDENTITY: &str = "Identity";
pub(crate) const KEY_RESULT_ANY: &str = "ResultAny";
pub(crate) const KEY_RESULT_INACTIVE: &str = "ResultInactive";
pub(crate) const KEY_RESULT_ACTIVE: &str = "ResultActive";

/// The durable unit of policy: every action one identity is allowed (or
/// denied), under shared result conditions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRecord {
    /// Who the record applies to.
    pub identity: Identity,
    /// Grant or block.
    pub polarity: Polarity,
    /// Actions covered, duplicate-free, in file order.
    action_ids: Vec<ActionId>,
    /// Outcome for any client.
    pub result_any: bool,
    /// Outcome for clients in an inactive session.
    pub result_inactive: bool,
    /// Outcome for clients in an active session.
    pub result_active: bool,
    /// Keys in the section this database does not interpret.
    pub(crate) extra: Vec<(String, String)>,
}

impl AuthorizationRecord {
    /// Empty record with the defaults for `polarity`: all results `yes` for
    /// allow, all `no` for deny.
    #[must_use]
    pub fn new(identity: Identity, polarity: Polarity) -> Self {
        let result = polarity.default_result();
        Self {
            identity,
            polarity,
            action_ids: Vec::new(),
            result_any: result,
            result_inactive: result,
            result_active: result,
            extra: Vec::new(),
        }
    }

    /// Section key, e.g. `user:alice:allow`.
    #[must_use]
    pub fn section_name(&self) -> String {
        section_name(&self.identity.name, self.polarity)
    }

    /// Actions covered by this record.
    #[must_use]
    pub fn action_ids(&self) -> &[ActionId] {
        &self.action_ids
    }

    /// Whether the record covers `action_id`.
    #[must_use]
    pub fn contains(&self, action_id: &ActionId) -> bool {
        self.action_ids.contains(action_id)
    }

    /// Add `action_id`. Returns `false` if it was already present.
    pub fn insert(&mut self, action_id: ActionId) -> bool {
        if self.contains(&action_id) {
            return false;
        }
        self.action_ids.push(action_id);
        true
    }

    /// Remove `action_id`. Returns `false` if it was not present.
    pub fn remove(&mut self, action_id: &ActionId) -> bool {
        let before = self.action_ids.len();
        self.action_ids.retain(|a| a != action_id);
        self.action_ids.len() < before
    }

    /// Whether the record covers no actions and should not exist.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.action_ids.is_empty()
    }

    /// Render as a keyed section.
    #[must_use]
    pub fn to_section(&self) -> Section {
        let actions = self
            .action_ids
            .iter()
            .map(ActionId::as_str)
            .collect::<Vec<_>>()
            .join(":");

        let mut section = Section::new(self.section_name())
            .with(KEY_ACTION, actions)
            .with(KEY_IDENTITY, self.identity.unix_user())
            .with(KEY_RESULT_ANY, yes_no(self.result_any))
            .with(KEY_RESULT_INACTIVE, yes_no(self.result_inactive))
            .with(KEY_RESULT_ACTIVE, yes_no(self.result_active));
        for (key, value) in &self.extra {
            section.set(key.clone(), value.clone());
        }
        section
    }

    pub(crate) fn with_actions(mut self, action_ids: Vec<ActionId>) -> Self {
        for id in action_ids {
            self.insert(id);
        }
        self
    }
}

/// Section key for `name` and `polarity`.
#[must_use]
pub fn section_name(name: &str, polarity: Polarity) -> String {
    format!("{USER_PREFIX}{name}:{}", polarity.suffix())
}

/// Split a section key into login name and polarity.
///
/// Returns `None` for sections outside the `user:` namespace, with an empty
/// login, or without an `:allow` / `:deny` suffix.
#[must_use]
pub fn parse_section_name(name: &str) -> Option<(&str, Polarity)> {
    let rest = name.strip_prefix(USER_PREFIX)?;
    let (login, suffix) = rest.split_once(':')?;
    if login.is_empty() {
        return None;
    }
    Some((login, Polarity::from_suffix(suffix)?))
}

pub(crate) fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

pub(crate) fn parse_yes_no(value: &str) -> Option<bool> {
    if value.eq_ignore_ascii_case("yes") {
        Some(true)
    } else if value.eq_ignore_ascii_case("no") {
        Some(false)
    } else {
        None
    }
}
