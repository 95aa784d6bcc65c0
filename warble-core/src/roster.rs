// ABOUTME: Guild member directory, populated from join events and message authors.
// ABOUTME: Resolves command argument tokens (display name or <@id> mention) to members.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::events::{Member, MemberId};

/// Cloneable handle over the known-member table. Session-scoped: state is
/// memory-resident and rebuilt from events after a restart.
#[derive(Clone, Default)]
pub struct Roster {
    members: Arc<Mutex<HashMap<MemberId, Member>>>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> std::sync::MutexGuard<'_, HashMap<MemberId, Member>> {
        self.members.lock().expect("roster poisoned")
    }

    /// Record (or refresh) a member seen in any event.
    pub fn observe(&self, member: &Member) {
        self.table().insert(member.id.clone(), member.clone());
    }

    pub fn get(&self, id: &MemberId) -> Option<Member> {
        self.table().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.table().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table().is_empty()
    }

    /// Resolve an argument token to a member.
    ///
    /// Accepts mention syntax (`<@id>` or `<@!id>`), which resolves by id,
    /// or a display name match (case-insensitive). Identity is always the
    /// id; names are only a lookup convenience.
    pub fn resolve(&self, token: &str) -> Option<Member> {
        let table = self.table();

        if let Some(id) = token
            .strip_prefix("<@!")
            .or_else(|| token.strip_prefix("<@"))
            .and_then(|rest| rest.strip_suffix('>'))
        {
            return table.get(&MemberId::new(id)).cloned();
        }

        table
            .values()
            .find(|m| m.name.eq_ignore_ascii_case(token))
            .cloned()
    }
}
