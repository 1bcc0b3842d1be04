//! World - owner of every participant in an encounter

use crate::combat::UnitAi;
use crate::participant::CombatParticipant;
use crate::types::ParticipantId;
use std::collections::BTreeMap;

/// Participants keyed by id. Cross-participant references are ids only.
#[derive(Debug, Default)]
pub struct World {
    participants: BTreeMap<ParticipantId, CombatParticipant>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a participant, replacing any previous one with the same id
    pub fn spawn(&mut self, participant: CombatParticipant) -> ParticipantId {
        let id = participant.id;
        self.participants.insert(id, participant);
        id
    }

    pub fn get(&self, id: ParticipantId) -> Option<&CombatParticipant> {
        self.participants.get(&id)
    }

    pub fn get_mut(&mut self, id: ParticipantId) -> Option<&mut CombatParticipant> {
        self.participants.get_mut(&id)
    }

    pub fn contains(&self, id: ParticipantId) -> bool {
        self.participants.contains_key(&id)
    }

    pub fn ids(&self) -> Vec<ParticipantId> {
        self.participants.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CombatParticipant> {
        self.participants.values()
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Alive and placed in the world
    pub fn is_active(&self, id: ParticipantId) -> bool {
        self.get(id).is_some_and(|p| p.is_alive() && p.in_world)
    }

    /// Owner of `id`, or `id` itself
    pub fn owner_or_self(&self, id: ParticipantId) -> ParticipantId {
        self.get(id).map(|p| p.owner_or_self()).unwrap_or(id)
    }

    /// Run `f` against a participant's AI, if it has one.
    ///
    /// The AI is detached while `f` runs so the hook cannot alias its owner.
    pub fn with_ai<R>(&mut self, id: ParticipantId, f: impl FnOnce(&mut dyn UnitAi) -> R) -> Option<R> {
        let mut ai = self.get_mut(id)?.ai.take()?;
        let result = f(ai.as_mut());
        if let Some(p) = self.get_mut(id) {
            p.ai = Some(ai);
        }
        Some(result)
    }
}
