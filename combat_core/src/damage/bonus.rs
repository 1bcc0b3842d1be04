//! Damage done and damage taken modifiers

use crate::effect::{sum_flat_modifiers_for_spell, sum_percent_modifiers_for_spell, EffectKind};
use crate::participant::CombatParticipant;
use crate::types::SchoolMask;

/// Apply the dealer's flat then percent damage-done modifiers
pub fn damage_bonus_done(
    attacker: &CombatParticipant,
    damage: u32,
    schools: SchoolMask,
    spell_id: Option<u32>,
) -> u32 {
    let flat = sum_flat_modifiers_for_spell(&attacker.effects, EffectKind::ModDamageDone, schools, spell_id);
    let pct = sum_percent_modifiers_for_spell(
        &attacker.effects,
        EffectKind::ModDamagePercentDone,
        schools,
        spell_id,
    );
    scale(damage, flat, pct)
}

/// Apply the receiver's flat then percent damage-taken modifiers
pub fn damage_bonus_taken(
    victim: &CombatParticipant,
    damage: u32,
    schools: SchoolMask,
    spell_id: Option<u32>,
) -> u32 {
    let flat = sum_flat_modifiers_for_spell(&victim.effects, EffectKind::ModDamageTaken, schools, spell_id);
    let pct = sum_percent_modifiers_for_spell(
        &victim.effects,
        EffectKind::ModDamagePercentTaken,
        schools,
        spell_id,
    );
    scale(damage, flat, pct)
}

fn scale(damage: u32, flat: i32, pct: f32) -> u32 {
    let total = (i64::from(damage) + i64::from(flat)).max(0) as f32 * pct.max(0.0);
    total.round() as u32
}
