//! Structured combat log events and the sinks that receive them

use crate::damage::HitInfo;
use crate::outcome::HitOutcome;
use crate::types::{ParticipantId, SchoolMask, WeaponAttackType};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// One observable combat event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CombatLogEntry {
    AttackStart {
        attacker: ParticipantId,
        victim: ParticipantId,
    },
    AttackStop {
        attacker: ParticipantId,
        victim: ParticipantId,
    },
    MeleeSwing {
        attacker: ParticipantId,
        victim: ParticipantId,
        attack_type: WeaponAttackType,
        outcome: HitOutcome,
        hit_info: HitInfo,
        school_mask: SchoolMask,
        damage: u32,
        absorbed: u32,
        resisted: u32,
        blocked: u32,
    },
    SpellDamage {
        caster: Option<ParticipantId>,
        victim: ParticipantId,
        spell_id: u32,
        school_mask: SchoolMask,
        damage: u32,
        absorbed: u32,
        resisted: u32,
        critical: bool,
        periodic: bool,
    },
    SplitDamage {
        source: ParticipantId,
        target: ParticipantId,
        spell_id: u32,
        damage: u32,
        absorbed: u32,
    },
    DamageShield {
        source: ParticipantId,
        target: ParticipantId,
        spell_id: u32,
        damage: u32,
    },
    Kill {
        killer: Option<ParticipantId>,
        victim: ParticipantId,
    },
    DuelComplete {
        winner: Option<ParticipantId>,
        loser: ParticipantId,
        interrupted: bool,
    },
    EnterCombat {
        participant: ParticipantId,
    },
    LeaveCombat {
        participant: ParticipantId,
    },
    Evade {
        participant: ParticipantId,
    },
}

impl CombatLogEntry {
    /// Render as a single JSON line
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Receiver of combat log events
pub trait CombatLogSink: Debug {
    fn record(&mut self, entry: &CombatLogEntry);
}

/// In-memory log buffer
#[derive(Debug, Clone, Default)]
pub struct CombatLog {
    entries: Vec<CombatLogEntry>,
}

impl CombatLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[CombatLogEntry] {
        &self.entries
    }

    pub fn drain(&mut self) -> Vec<CombatLogEntry> {
        std::mem::take(&mut self.entries)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CombatLogSink for CombatLog {
    fn record(&mut self, entry: &CombatLogEntry) {
        self.entries.push(entry.clone());
    }
}
