//! Active modifier effects and the provider interface the engine reads them through
//!
//! Buff storage itself lives outside the engine. Participants expose their
//! effects through [`EffectProvider`], which always hands out snapshots so a
//! caller can remove or change effects while walking the list.

mod aggregator;

pub use aggregator::{
    has_effect, max_modifier, sum_flat_modifiers, sum_flat_modifiers_for_spell,
    sum_percent_modifiers, sum_percent_modifiers_for_spell,
};

use crate::types::{ParticipantId, SchoolMask};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Handle of one effect instance on one participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EffectId(pub u32);

/// What an effect modifies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    // Damage done / taken
    ModDamageDone,
    ModDamagePercentDone,
    ModDamageTaken,
    ModDamagePercentTaken,
    /// Percent bonus to critical damage
    ModCritDamageBonus,

    // Hit table
    ModHitChance,
    ModCritPercent,
    ModDodgePercent,
    ModParryPercent,
    ModBlockPercent,
    ModExpertise,
    /// On the victim: changes the attacker's chance to hit it
    ModAttackerMeleeHitChance,
    /// On the victim: changes the attacker's chance to crit it
    ModAttackerMeleeCritChance,
    /// Hits land regardless of facing
    IgnoreHitDirection,

    // Armor and resistance
    ModArmorPct,
    /// On the victim: percent of armor bypassed by the effect's caster
    BypassArmorForCaster,
    /// On the attacker: flat change to target resistance, negative reduces
    ModTargetResistance,
    /// On the attacker: percent of target armor or resisted damage ignored
    ModIgnoreTargetResist,
    ModArmorPenetrationPct,

    // Absorption
    SchoolAbsorb,
    ManaShield,
    /// On the attacker: percent of damage that shields cannot absorb
    ModTargetAbsorbSchool,
    SplitDamagePct,
    ShareDamagePct,
    SchoolImmunity,

    // Threat and rage
    ModThreat,
    ModRageFromDamageDealt,

    /// Deals flat damage back to melee attackers
    DamageShield,
}

bitflags! {
    /// Conditions that break an effect when its holder takes damage
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct InterruptFlags: u8 {
        /// Any damage, including fully absorbed hits
        const TAKE_DAMAGE   = 1 << 0;
        /// Non-periodic damage only
        const DIRECT_DAMAGE = 1 << 1;
        /// The holder starts a melee attack
        const MELEE_ATTACK  = 1 << 2;
    }
}

/// Why an effect was removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoveReason {
    Expired,
    /// Absorb capacity used up
    Depleted,
    Interrupted,
    Death,
    Cancelled,
}

/// One active effect instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    pub id: EffectId,
    pub spell_id: u32,
    pub kind: EffectKind,
    /// Flat value, percent, or remaining absorb capacity depending on kind
    pub amount: i32,
    /// Schools the effect applies to; empty means all
    pub school_mask: SchoolMask,
    pub caster: Option<ParticipantId>,
    /// Monotonic application stamp, assigned by the holder
    pub apply_order: u64,
    /// Absorb effects with a lower priority are consumed first
    pub absorb_priority: u8,
    /// Mana drained per point absorbed (mana shields)
    pub mana_per_damage: f32,
    pub interrupt_flags: InterruptFlags,
    /// Spell ids the effect is restricted to; empty means all
    pub affected_spells: Vec<u32>,
}

impl Effect {
    pub fn new(spell_id: u32, kind: EffectKind, amount: i32) -> Self {
        Effect {
            id: EffectId(0),
            spell_id,
            kind,
            amount,
            school_mask: SchoolMask::empty(),
            caster: None,
            apply_order: 0,
            absorb_priority: 0,
            mana_per_damage: 0.0,
            interrupt_flags: InterruptFlags::empty(),
            affected_spells: Vec::new(),
        }
    }

    pub fn with_schools(mut self, school_mask: SchoolMask) -> Self {
        self.school_mask = school_mask;
        self
    }

    pub fn with_caster(mut self, caster: ParticipantId) -> Self {
        self.caster = Some(caster);
        self
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.absorb_priority = priority;
        self
    }

    pub fn with_mana_per_damage(mut self, ratio: f32) -> Self {
        self.mana_per_damage = ratio;
        self
    }

    pub fn with_interrupt_flags(mut self, flags: InterruptFlags) -> Self {
        self.interrupt_flags = flags;
        self
    }

    pub fn with_affected_spells(mut self, spells: Vec<u32>) -> Self {
        self.affected_spells = spells;
        self
    }

    /// Whether this effect covers any of the given schools
    pub fn matches_schools(&self, schools: SchoolMask) -> bool {
        self.school_mask.is_empty() || self.school_mask.intersects(schools)
    }

    pub fn affects_spell(&self, spell_id: Option<u32>) -> bool {
        match spell_id {
            _ if self.affected_spells.is_empty() => true,
            Some(id) => self.affected_spells.contains(&id),
            None => false,
        }
    }
}

/// Read and mutate access to a participant's active effects
pub trait EffectProvider {
    /// Snapshot of all active effects of a kind, in application order
    fn active_effects(&self, kind: EffectKind) -> Vec<Effect>;

    fn effect_amount(&self, id: EffectId) -> Option<i32>;

    fn change_effect_amount(&mut self, id: EffectId, amount: i32);

    fn remove_effect(&mut self, id: EffectId, reason: RemoveReason) -> Option<Effect>;
}

/// Owned effect collection used by participants
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EffectSet {
    effects: Vec<Effect>,
    next_id: u32,
    next_order: u64,
}

impl EffectSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an effect, stamping its id and application order
    pub fn add(&mut self, mut effect: Effect) -> EffectId {
        self.next_id += 1;
        self.next_order += 1;
        effect.id = EffectId(self.next_id);
        effect.apply_order = self.next_order;
        let id = effect.id;
        self.effects.push(effect);
        id
    }

    pub fn get(&self, id: EffectId) -> Option<&Effect> {
        self.effects.iter().find(|e| e.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Effect> {
        self.effects.iter()
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Remove every effect whose interrupt flags intersect `flags`.
    /// Effects from `except_spell` survive.
    pub fn remove_by_interrupt(
        &mut self,
        flags: InterruptFlags,
        except_spell: Option<u32>,
    ) -> Vec<Effect> {
        let (removed, kept): (Vec<_>, Vec<_>) = self.effects.drain(..).partition(|e| {
            e.interrupt_flags.intersects(flags) && Some(e.spell_id) != except_spell
        });
        self.effects = kept;
        for effect in &removed {
            tracing::debug!(spell = effect.spell_id, "effect interrupted by damage");
        }
        removed
    }

    pub fn clear(&mut self) {
        self.effects.clear();
    }
}

impl EffectProvider for EffectSet {
    fn active_effects(&self, kind: EffectKind) -> Vec<Effect> {
        self.effects
            .iter()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect()
    }

    fn effect_amount(&self, id: EffectId) -> Option<i32> {
        self.get(id).map(|e| e.amount)
    }

    fn change_effect_amount(&mut self, id: EffectId, amount: i32) {
        if let Some(effect) = self.effects.iter_mut().find(|e| e.id == id) {
            effect.amount = amount;
        }
    }

    fn remove_effect(&mut self, id: EffectId, reason: RemoveReason) -> Option<Effect> {
        let index = self.effects.iter().position(|e| e.id == id)?;
        let effect = self.effects.remove(index);
        tracing::debug!(spell = effect.spell_id, ?reason, "effect removed");
        Some(effect)
    }
}
