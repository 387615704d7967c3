//! In-memory materialization of the policy file.
//!
//! A [`Snapshot`] is decoded fresh on every read. It owns the `user:`
//! sections it could resolve, carries every other section through untouched,
//! and remembers the [`Revision`] of the bytes it was decoded from so a
//! later write can detect concurrent modification.

use std::fmt;
use std::path::Path;

use pkauth_core::{ActionId, AuthError, AuthResult, Identity, IdentityResolver, Polarity};
use tracing::{debug, warn};

use crate::keyfile::{KeyFile, Section};
use crate::record::{
    AuthorizationRecord, KEY_ACTION, KEY_IDENTITY, KEY_RESULT_ACTIVE, KEY_RESULT_ANY,
    KEY_RESULT_INACTIVE, parse_section_name, parse_yes_no,
};

/// Fingerprint of the exact bytes a snapshot was decoded from.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Revision([u8; 32]);

impl Revision {
    /// Fingerprint `bytes`.
    #[must_use]
    pub fn of(bytes: &[u8]) -> Self {
        Self(*blake3::hash(bytes).as_bytes())
    }
}

impl fmt::Debug for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Revision({self})")
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0[..6] {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Entry {
    Record(AuthorizationRecord),
    Passthrough(Section),
}

/// Every record in the policy file at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    entries: Vec<Entry>,
    revision: Option<Revision>,
}

impl Snapshot {
    /// Snapshot of a resource that does not exist yet.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Decode the contents of the policy file.
    ///
    /// `bytes` is `None` when the resource does not exist, which yields an
    /// empty snapshot. Sections naming a login that no longer resolves are
    /// kept as pass-through and never surface as errors.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::StoreUnreadable`] if the content is not valid
    /// UTF-8, is not a well-formed keyed-section file, or a `user:` section
    /// holds an invalid action id or result value.
    pub fn decode(
        bytes: Option<&[u8]>,
        identities: &dyn IdentityResolver,
        path: &Path,
    ) -> AuthResult<Self> {
        let Some(bytes) = bytes else {
            return Ok(Self::empty());
        };
        let revision = Some(Revision::of(bytes));

        let text = std::str::from_utf8(bytes)
            .map_err(|e| AuthError::unreadable(path, format!("not valid UTF-8: {e}")))?;
        let file = KeyFile::parse(text).map_err(|e| AuthError::unreadable(path, e.to_string()))?;

        let mut entries = Vec::with_capacity(file.sections().len());
        for section in file.into_sections() {
            let Some((login, polarity)) = parse_section_name(section.name()) else {
                entries.push(Entry::Passthrough(section));
                continue;
            };
            let Some(uid) = identities.uid_for_name(login) else {
                warn!(
                    path = %path.display(),
                    section = section.name(),
                    "Skipping policy section for unknown user"
                );
                entries.push(Entry::Passthrough(section));
                continue;
            };

            let record = decode_record(&section, Identity::new(uid, login), polarity, path)?;
            if record.is_empty() {
                debug!(section = section.name(), "Dropping policy section with no actions");
                continue;
            }
            entries.push(Entry::Record(record));
        }

        Ok(Self { entries, revision })
    }

    /// Render the snapshot as policy file text.
    ///
    /// Records without actions are omitted.
    #[must_use]
    pub fn encode(&self) -> String {
        self.entries
            .iter()
            .filter_map(|entry| match entry {
                Entry::Record(r) if r.is_empty() => None,
                Entry::Record(r) => Some(r.to_section()),
                Entry::Passthrough(s) => Some(s.clone()),
            })
            .collect::<KeyFile>()
            .to_string()
    }

    /// Revision of the bytes this snapshot was decoded from, or `None` if
    /// the resource did not exist.
    #[must_use]
    pub fn revision(&self) -> Option<Revision> {
        self.revision
    }

    /// All records, in file order.
    pub fn records(&self) -> impl Iterator<Item = &AuthorizationRecord> {
        self.entries.iter().filter_map(|entry| match entry {
            Entry::Record(r) => Some(r),
            Entry::Passthrough(_) => None,
        })
    }

    /// Sections this database does not own.
    pub fn passthrough(&self) -> impl Iterator<Item = &Section> {
        self.entries.iter().filter_map(|entry| match entry {
            Entry::Passthrough(s) => Some(s),
            Entry::Record(_) => None,
        })
    }

    /// The record for login `name` with `polarity`, if any.
    #[must_use]
    pub fn record(&self, name: &str, polarity: Polarity) -> Option<&AuthorizationRecord> {
        self.records()
            .find(|r| r.identity.name == name && r.polarity == polarity)
    }

    /// Records belonging to `uid`.
    pub fn records_for_uid(&self, uid: u32) -> impl Iterator<Item = &AuthorizationRecord> {
        self.records().filter(move |r| r.identity.uid == uid)
    }

    fn record_mut(&mut self, name: &str, polarity: Polarity) -> Option<&mut AuthorizationRecord> {
        self.entries.iter_mut().find_map(|entry| match entry {
            Entry::Record(r) if r.identity.name == name && r.polarity == polarity => Some(r),
            _ => None,
        })
    }

    /// Add `action_id` to the `polarity` record of `identity`, creating the
    /// record with its polarity's defaults if needed.
    ///
    /// Returns `false` if the action was already present.
    pub fn add_action(
        &mut self,
        identity: &Identity,
        polarity: Polarity,
        action_id: &ActionId,
    ) -> bool {
        if let Some(record) = self.record_mut(&identity.name, polarity) {
            return record.insert(action_id.clone());
        }

        // A section for this login may be sitting in pass-through because
        // the user did not resolve when the snapshot was decoded.
        let section = crate::record::section_name(&identity.name, polarity);
        self.entries
            .retain(|e| !matches!(e, Entry::Passthrough(s) if s.name() == section));

        let mut record = AuthorizationRecord::new(identity.clone(), polarity);
        record.insert(action_id.clone());
        self.entries.push(Entry::Record(record));
        true
    }

    /// Remove `action_id` from both records of login `name`, deleting a
    /// record whose action set becomes empty.
    ///
    /// Returns `true` if anything changed.
    pub fn remove_action(&mut self, name: &str, action_id: &ActionId) -> bool {
        let mut changed = false;
        for entry in &mut self.entries {
            if let Entry::Record(r) = entry
                && r.identity.name == name
            {
                changed |= r.remove(action_id);
            }
        }
        self.prune();
        changed
    }

    /// Delete both records of login `name`.
    ///
    /// Returns `true` if anything was deleted.
    pub fn remove_identity(&mut self, name: &str) -> bool {
        let before = self.entries.len();
        self.entries
            .retain(|e| !matches!(e, Entry::Record(r) if r.identity.name == name));
        self.entries.len() < before
    }

    /// Drop records that no longer cover any action.
    pub fn prune(&mut self) {
        self.entries
            .retain(|e| !matches!(e, Entry::Record(r) if r.is_empty()));
    }

    /// Whether the snapshot holds no records and no pass-through sections.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn decode_record(
    section: &Section,
    identity: Identity,
    polarity: Polarity,
    path: &Path,
) -> AuthResult<AuthorizationRecord> {
    let mut record = AuthorizationRecord::new(identity, polarity);

    let actions = section
        .get(KEY_ACTION)
        .unwrap_or_default()
        .split(':')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            ActionId::new(s).map_err(|e| {
                AuthError::unreadable(path, format!("section [{}]: {e}", section.name()))
            })
        })
        .collect::<AuthResult<Vec<_>>>()?;
    record = record.with_actions(actions);

    for (key, slot) in [
        (KEY_RESULT_ANY, &mut record.result_any),
        (KEY_RESULT_INACTIVE, &mut record.result_inactive),
        (KEY_RESULT_ACTIVE, &mut record.result_active),
    ] {
        if let Some(value) = section.get(key) {
            *slot = parse_yes_no(value).ok_or_else(|| {
                AuthError::unreadable(
                    path,
                    format!(
                        "section [{}]: {key} must be yes or no, found {value:?}",
                        section.name()
                    ),
                )
            })?;
        }
    }

    record.extra = section
        .entries()
        .filter(|(k, _)| {
            ![
                KEY_ACTION,
                KEY_IDENTITY,
                KEY_RESULT_ANY,
                KEY_RESULT_INACTIVE,
                KEY_RESULT_ACTIVE,
            ]
            .contains(k)
        })
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    Ok(record)
}
