//! Extension points called by the engine
//!
//! Every method has a no-op default so implementors only override the
//! events they care about.

use crate::types::{DamageEffectType, ParticipantId, ProcFlags, SchoolMask};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Per-participant AI callbacks
pub trait UnitAi: Debug {
    /// May change the damage about to be taken
    fn damage_taken(&mut self, _attacker: Option<ParticipantId>, _damage: &mut u32) {}

    /// May change the damage about to be dealt
    fn damage_dealt(&mut self, _victim: ParticipantId, _damage: &mut u32, _effect: DamageEffectType) {}

    fn killed_unit(&mut self, _victim: ParticipantId) {}

    fn just_died(&mut self, _killer: Option<ParticipantId>) {}

    fn attack_start(&mut self, _target: ParticipantId) {}

    fn enter_combat(&mut self, _enemy: ParticipantId) {}

    fn enter_evade_mode(&mut self) {}

    /// Our owner was hit by `attacker`
    fn owner_attacked_by(&mut self, _attacker: ParticipantId) {}

    /// Player left combat
    fn combat_exit(&mut self) {}
}

/// A triggered event handed to scripts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProcEvent {
    pub actor: Option<ParticipantId>,
    pub target: ParticipantId,
    pub actor_flags: ProcFlags,
    pub target_flags: ProcFlags,
    pub damage: u32,
    pub school_mask: SchoolMask,
}

/// Global scripting hooks
pub trait CombatScript: Debug {
    /// Any damage event, before it is committed
    fn on_damage(&mut self, _attacker: Option<ParticipantId>, _victim: ParticipantId, _damage: &mut u32) {}

    /// Melee damage before armor and the hit table
    fn modify_melee_damage(&mut self, _attacker: ParticipantId, _victim: ParticipantId, _damage: &mut u32) {}

    fn on_proc(&mut self, _event: &ProcEvent) {}

    fn on_kill(&mut self, _killer: Option<ParticipantId>, _victim: ParticipantId) {}
}

/// Loot and experience allocation on kill
pub trait KillRewarder: Debug {
    fn reward(&mut self, recipient: ParticipantId, victim: ParticipantId);
}
