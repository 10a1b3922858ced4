//! Presence roster: participants currently known to be connected.
//!
//! Entries keep the order in which their participant id was first joined;
//! typing updates never move an entry. Remote typing flags carry the
//! instant of their last refresh so they can expire if the matching
//! `typing(false)` is lost.

use std::time::Duration;

use tokio::time::Instant;

use super::model::Participant;

#[derive(Debug, Clone)]
struct Entry {
    participant: Participant,
    typing_refreshed_at: Option<Instant>,
}

#[derive(Debug, Default)]
pub struct PresenceRoster {
    entries: Vec<Entry>,
}

impl PresenceRoster {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, participant_id: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.participant.participant_id == participant_id)
    }

    /// Insert or overwrite a participant. Idempotent per `participant_id`.
    pub fn apply_join(&mut self, participant: Participant) {
        let typing_refreshed_at = None;
        let participant = Participant {
            is_typing: false,
            ..participant
        };
        match self.position(&participant.participant_id) {
            Some(index) => {
                self.entries[index] = Entry {
                    participant,
                    typing_refreshed_at,
                };
            }
            None => self.entries.push(Entry {
                participant,
                typing_refreshed_at,
            }),
        }
    }

    /// Remove a participant. Unknown ids are ignored.
    pub fn apply_leave(&mut self, participant_id: &str) -> Option<Participant> {
        self.position(participant_id)
            .map(|index| self.entries.remove(index).participant)
    }

    /// Update the typing flag of a known participant.
    ///
    /// Returns `false` (and changes nothing) for unknown ids.
    pub fn apply_typing(&mut self, participant_id: &str, is_typing: bool, now: Instant) -> bool {
        let Some(index) = self.position(participant_id) else {
            return false;
        };
        let entry = &mut self.entries[index];
        entry.participant.is_typing = is_typing;
        entry.typing_refreshed_at = is_typing.then_some(now);
        true
    }

    /// Replace the whole roster with the one acknowledged by the server.
    pub fn reset(&mut self, participants: impl IntoIterator<Item = Participant>) {
        self.entries.clear();
        for participant in participants {
            self.apply_join(participant);
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Clear typing flags not refreshed within `ttl`. Returns `true` if any changed.
    pub fn expire_typing(&mut self, now: Instant, ttl: Duration) -> bool {
        let mut changed = false;
        for entry in &mut self.entries {
            if let Some(refreshed_at) = entry.typing_refreshed_at
                && refreshed_at + ttl <= now
            {
                entry.participant.is_typing = false;
                entry.typing_refreshed_at = None;
                changed = true;
            }
        }
        changed
    }

    /// Earliest instant at which a typing flag expires
    pub fn next_typing_expiry(&self, ttl: Duration) -> Option<Instant> {
        self.entries
            .iter()
            .filter_map(|entry| entry.typing_refreshed_at)
            .min()
            .map(|refreshed_at| refreshed_at + ttl)
    }

    pub fn get(&self, participant_id: &str) -> Option<&Participant> {
        self.position(participant_id)
            .map(|index| &self.entries[index].participant)
    }

    pub fn snapshot(&self) -> Vec<Participant> {
        self.entries
            .iter()
            .map(|entry| entry.participant.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
