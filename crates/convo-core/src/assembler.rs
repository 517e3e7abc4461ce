//! Turn assembly — folds push events into the ordered turn list.
//!
//! The remote side may redeliver an increment after a transport hiccup, so
//! every rule here is written to be idempotent per turn id: applying the
//! same event twice leaves the list as if it arrived once. Turns are only
//! ever appended and mutated in place; their order is fixed at first
//! observation.

use convo_types::event::StreamEvent;
use convo_types::turn::Turn;
use std::collections::HashMap;

pub struct MessageAssembler {
    /// Highest applied fragment sequence number per turn id.
    applied_seq: HashMap<String, u64>,
    /// Last applied fragment text per turn id, for duplicate detection when
    /// the wire carries no sequence numbers.
    last_fragment: HashMap<String, String>,
}

impl MessageAssembler {
    pub fn new() -> Self {
        Self {
            applied_seq: HashMap::new(),
            last_fragment: HashMap::new(),
        }
    }

    /// Fold one push event into the turn list. Returns true if the list
    /// changed in a way the presentation layer can observe.
    pub fn apply(&mut self, turns: &mut Vec<Turn>, event: &StreamEvent) -> bool {
        match event {
            StreamEvent::Progress | StreamEvent::Failure { .. } => false,
            StreamEvent::Fragment { turn_id, text, seq } => {
                self.apply_fragment(turns, turn_id.as_deref(), text, *seq)
            }
            StreamEvent::Structured { turn_id, payload } => {
                let (idx, _) = self.target_turn(turns, turn_id.as_deref());
                turns[idx].structured_payload = Some(payload.clone());
                true
            }
            StreamEvent::Completion { turn_id, .. } => {
                self.apply_completion(turns, turn_id.as_deref())
            }
        }
    }

    fn apply_fragment(
        &mut self,
        turns: &mut Vec<Turn>,
        turn_id: Option<&str>,
        text: &str,
        seq: Option<u64>,
    ) -> bool {
        let (idx, created) = self.target_turn(turns, turn_id);
        let turn = &mut turns[idx];
        if turn.complete {
            // Content freezes at completion; anything after is a straggler.
            log::warn!("discarding fragment for frozen turn {}", turn.id);
            return created;
        }

        let key = turn.id.clone();
        match seq {
            Some(n) => {
                if self.applied_seq.get(&key).is_some_and(|applied| *applied >= n) {
                    log::debug!("duplicate fragment seq {} for turn {}, skipping", n, key);
                    return created;
                }
                self.applied_seq.insert(key, n);
            }
            None => {
                if self.last_fragment.get(&key).is_some_and(|last| last == text) {
                    log::debug!("duplicate fragment for turn {}, skipping", key);
                    return created;
                }
                self.last_fragment.insert(key, text.to_string());
            }
        }

        turn.append(text);
        created || !text.is_empty()
    }

    fn apply_completion(&mut self, turns: &mut Vec<Turn>, turn_id: Option<&str>) -> bool {
        let idx = match turn_id {
            Some(id) => turns
                .iter()
                .position(|t| t.id == id)
                .or_else(|| last_open_assistant(turns)),
            None => last_open_assistant(turns),
        };
        let Some(idx) = idx else {
            // Completion for a turn that never produced content. Legal: the
            // operation still finished; there is just nothing to freeze.
            return false;
        };

        let turn = &mut turns[idx];
        if turn.complete {
            return false;
        }
        turn.complete = true;

        // Rewrite the client-assigned id with the server's canonical one, in
        // place, so presentation keys stay stable.
        if let Some(id) = turn_id {
            if turn.id != id {
                self.applied_seq.remove(&turn.id);
                self.last_fragment.remove(&turn.id);
                turn.id = id.to_string();
            }
        }
        true
    }

    /// Index of the turn this event applies to, creating an open assistant
    /// turn at the end of the list when the id is unseen (or when an
    /// id-less event arrives with nothing open).
    fn target_turn(&mut self, turns: &mut Vec<Turn>, turn_id: Option<&str>) -> (usize, bool) {
        match turn_id {
            Some(id) => {
                if let Some(idx) = turns.iter().position(|t| t.id == id) {
                    (idx, false)
                } else {
                    turns.push(Turn::assistant_open(id));
                    (turns.len() - 1, true)
                }
            }
            None => {
                if let Some(idx) = last_open_assistant(turns) {
                    (idx, false)
                } else {
                    turns.push(Turn::assistant_open(uuid::Uuid::new_v4().to_string()));
                    (turns.len() - 1, true)
                }
            }
        }
    }
}

impl Default for MessageAssembler {
    fn default() -> Self {
        Self::new()
    }
}

fn last_open_assistant(turns: &[Turn]) -> Option<usize> {
    turns.iter().rposition(|t| t.is_open())
}
