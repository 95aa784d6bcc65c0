// ABOUTME: Voice-presence state machine for monitored channels.
// ABOUTME: Tracks which members are inside each monitored channel, driven by voice transitions.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::events::{ChannelId, Member, MemberId};
use crate::metrics;

/// Observation emitted for a state-changing voice transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenceChange {
    Entered {
        member: MemberId,
        channel: ChannelId,
    },
    Left {
        member: MemberId,
        channel: ChannelId,
    },
    Moved {
        member: MemberId,
        from: ChannelId,
        to: ChannelId,
    },
}

impl PresenceChange {
    pub fn kind(&self) -> &'static str {
        match self {
            PresenceChange::Entered { .. } => "entered",
            PresenceChange::Left { .. } => "left",
            PresenceChange::Moved { .. } => "moved",
        }
    }
}

struct State {
    /// Channels whose membership we track, compared by id
    monitored: HashSet<ChannelId>,
    /// Current occupants per monitored channel
    occupancy: HashMap<ChannelId, HashSet<MemberId>>,
}

/// Cloneable handle over the presence state. Mutated only by the dispatcher
/// in response to voice-state events; command handlers read snapshots.
#[derive(Clone)]
pub struct PresenceTracker {
    state: Arc<Mutex<State>>,
}

impl PresenceTracker {
    pub fn new(monitored: impl IntoIterator<Item = ChannelId>) -> Self {
        let monitored: HashSet<ChannelId> = monitored.into_iter().collect();
        let occupancy = monitored
            .iter()
            .map(|c| (c.clone(), HashSet::new()))
            .collect();
        Self {
            state: Arc::new(Mutex::new(State {
                monitored,
                occupancy,
            })),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().expect("presence state poisoned")
    }

    pub fn is_monitored(&self, channel: &ChannelId) -> bool {
        self.lock().monitored.contains(channel)
    }

    /// The monitored channel ids, sorted for stable output.
    pub fn monitored_channels(&self) -> Vec<ChannelId> {
        let mut channels: Vec<ChannelId> = self.lock().monitored.iter().cloned().collect();
        channels.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        channels
    }

    /// Apply a voice transition. Returns the observation if monitored state
    /// changed, None otherwise. Replaying a transition is harmless (set
    /// semantics); removing an untracked member is a no-op.
    pub fn apply(
        &self,
        member: &Member,
        before: Option<&ChannelId>,
        after: Option<&ChannelId>,
    ) -> Option<PresenceChange> {
        if before == after {
            return None;
        }

        let mut state = self.lock();
        let from = before.filter(|c| state.monitored.contains(*c)).cloned();
        let to = after.filter(|c| state.monitored.contains(*c)).cloned();

        // A member is present in at most one monitored channel: clear any
        // prior occupancy before inserting (also covers missed transitions).
        if from.is_some() || to.is_some() {
            for occupants in state.occupancy.values_mut() {
                occupants.remove(&member.id);
            }
        }
        if let Some(channel) = &to {
            state
                .occupancy
                .entry(channel.clone())
                .or_default()
                .insert(member.id.clone());
        }
        drop(state);

        let change = match (from, to) {
            (None, Some(channel)) => PresenceChange::Entered {
                member: member.id.clone(),
                channel,
            },
            (Some(channel), None) => PresenceChange::Left {
                member: member.id.clone(),
                channel,
            },
            (Some(from), Some(to)) => PresenceChange::Moved {
                member: member.id.clone(),
                from,
                to,
            },
            (None, None) => return None,
        };
        metrics::record_presence(change.kind());
        Some(change)
    }

    /// Snapshot of the members currently in `channel`. Taken under the lock,
    /// so callers never observe a half-applied transition.
    pub fn members_in(&self, channel: &ChannelId) -> HashSet<MemberId> {
        self.lock()
            .occupancy
            .get(channel)
            .cloned()
            .unwrap_or_default()
    }
}
