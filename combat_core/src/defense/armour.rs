//! Armor - Physical damage reduction
//!
//! `ratio = armor / (armor + K)`, capped, where K grows with the attacker's
//! level and grows faster past the high level threshold.

use crate::config::{ArmorConstants, CombatConstants};
use crate::effect::{
    sum_flat_modifiers, sum_flat_modifiers_for_spell, sum_percent_modifiers, EffectKind,
};
use crate::participant::CombatParticipant;
use crate::types::{SchoolMask, SpellAttributes, SpellInfo};

fn level_constant(level: u8, constants: &ArmorConstants) -> f32 {
    let l = f32::from(level);
    let mut k = constants.base_constant + constants.per_level * l;
    if level > constants.high_level_threshold {
        let extra = f32::from(level - constants.high_level_threshold);
        k += constants.high_level_factor * constants.per_level * extra;
    }
    k
}

/// Fraction of physical damage removed by `armor` against an attacker of `attacker_level`
pub fn armor_mitigation_ratio(armor: f32, attacker_level: u8, constants: &ArmorConstants) -> f32 {
    if armor <= 0.0 {
        return 0.0;
    }
    let ratio = armor / (armor + level_constant(attacker_level, constants));
    ratio.clamp(0.0, constants.max_mitigation)
}

/// Apply a mitigation ratio; positive damage never drops below 1
pub fn apply_armor_mitigation(damage: u32, ratio: f32) -> u32 {
    if damage == 0 {
        return 0;
    }
    let reduced = (damage as f32 * (1.0 - ratio.clamp(0.0, 1.0))).round();
    (reduced as u32).max(1)
}

/// Physical damage after the victim's effective armor
///
/// Effective armor starts from the victim's armor and is adjusted in order
/// by its armor percent modifiers, armor bypass granted to this attacker,
/// the attacker's flat target-resistance and percent ignore modifiers, and
/// finally player armor penetration.
pub fn calc_armor_reduced_damage(
    attacker: &CombatParticipant,
    victim: &CombatParticipant,
    damage: u32,
    spell: Option<&SpellInfo>,
    constants: &CombatConstants,
) -> u32 {
    if damage == 0 {
        return 0;
    }
    if spell.is_some_and(|s| s.has_attribute(SpellAttributes::IGNORE_ARMOR)) {
        return damage;
    }

    let normal = SchoolMask::NORMAL;
    let mut armor = victim.armor as f32;

    armor *= sum_percent_modifiers(&victim.effects, EffectKind::ModArmorPct, normal, |_| true);

    let bypass = sum_flat_modifiers(&victim.effects, EffectKind::BypassArmorForCaster, normal, |e| {
        e.caster == Some(attacker.id)
    })
    .clamp(0, 100);
    armor -= armor * bypass as f32 / 100.0;

    armor += sum_flat_modifiers(&attacker.effects, EffectKind::ModTargetResistance, normal, |_| true)
        as f32;

    let ignore = sum_flat_modifiers_for_spell(
        &attacker.effects,
        EffectKind::ModIgnoreTargetResist,
        normal,
        spell.map(|s| s.id),
    )
    .clamp(0, 100);
    armor -= armor * ignore as f32 / 100.0;

    if attacker.is_player() && armor > 0.0 {
        let pen_pct = attacker.ratings.armor_penetration_pct
            + sum_flat_modifiers(&attacker.effects, EffectKind::ModArmorPenetrationPct, normal, |_| true)
                as f32;
        if pen_pct > 0.0 {
            let pool = level_constant(victim.level, &constants.armor);
            let max_pen = ((armor + pool) / 3.0).min(armor);
            let pen = max_pen * pen_pct.min(100.0) / 100.0;
            armor -= pen.min(max_pen);
        }
    }

    let armor = armor.max(0.0);
    let ratio = armor_mitigation_ratio(armor, attacker.level, &constants.armor);
    let reduced = apply_armor_mitigation(damage, ratio);

    tracing::debug!(damage, armor, ratio, reduced, "armor reduction");
    reduced
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::{Effect, EffectProvider, RemoveReason};
    use crate::types::{ParticipantId, UnitKind};
    use proptest::prelude::*;

    fn pair(level: u8, armor: i32) -> (CombatParticipant, CombatParticipant) {
        let attacker = CombatParticipant::new(ParticipantId(1), "Rogue", UnitKind::Player, level);
        let victim = CombatParticipant::new(ParticipantId(2), "Ogre", UnitKind::Creature, level)
            .with_armor(armor);
        (attacker, victim)
    }

    #[test]
    fn test_no_armor() {
        let c = ArmorConstants::default();
        assert!((armor_mitigation_ratio(0.0, 60, &c) - 0.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_ratio_at_level_60() {
        let c = ArmorConstants::default();
        // K = 400 + 85 * 60 + 4.5 * 85 * 1 = 5882.5
        let ratio = armor_mitigation_ratio(5882.5, 60, &c);
        assert!((ratio - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_ratio_is_capped() {
        let c = ArmorConstants::default();
        let ratio = armor_mitigation_ratio(1_000_000.0, 10, &c);
        assert!((ratio - 0.85).abs() < f32::EPSILON);
    }

    #[test]
    fn test_forty_percent_mitigation() {
        assert_eq!(apply_armor_mitigation(100, 0.40), 60);
    }

    #[test]
    fn test_floor_of_one() {
        assert_eq!(apply_armor_mitigation(1, 0.85), 1);
        assert_eq!(apply_armor_mitigation(0, 0.5), 0);
    }

    #[test]
    fn test_bypass_only_for_matching_caster() {
        let (attacker, mut victim) = pair(10, 1250);
        let constants = CombatConstants::default();
        let plain = calc_armor_reduced_damage(&attacker, &victim, 100, None, &constants);

        victim.effects.add(
            Effect::new(1, EffectKind::BypassArmorForCaster, 100).with_caster(ParticipantId(99)),
        );
        assert_eq!(calc_armor_reduced_damage(&attacker, &victim, 100, None, &constants), plain);

        victim.effects.add(
            Effect::new(2, EffectKind::BypassArmorForCaster, 100).with_caster(attacker.id),
        );
        assert_eq!(calc_armor_reduced_damage(&attacker, &victim, 100, None, &constants), 100);
    }

    #[test]
    fn test_armor_percent_modifier_before_bypass() {
        let (attacker, mut victim) = pair(10, 1250);
        let constants = CombatConstants::default();
        // K = 400 + 85 * 10 = 1250
        assert_eq!(calc_armor_reduced_damage(&attacker, &victim, 100, None, &constants), 50);

        let sunder = victim.effects.add(Effect::new(7386, EffectKind::ModArmorPct, -50));
        // 625 / (625 + 1250)
        assert_eq!(calc_armor_reduced_damage(&attacker, &victim, 100, None, &constants), 67);

        victim.effects.remove_effect(sunder, RemoveReason::Expired);
        victim.effects.add(Effect::new(8091, EffectKind::ModArmorPct, 100));
        // 2500 / (2500 + 1250)
        assert_eq!(calc_armor_reduced_damage(&attacker, &victim, 100, None, &constants), 33);

        // Bypass halves the already doubled armor
        victim.effects.add(Effect::new(1, EffectKind::BypassArmorForCaster, 50).with_caster(attacker.id));
        assert_eq!(calc_armor_reduced_damage(&attacker, &victim, 100, None, &constants), 50);
    }

    #[test]
    fn test_negative_armor_clamped() {
        let (mut attacker, victim) = pair(10, 100);
        attacker.effects.add(Effect::new(1, EffectKind::ModTargetResistance, -5000));
        let constants = CombatConstants::default();
        assert_eq!(calc_armor_reduced_damage(&attacker, &victim, 100, None, &constants), 100);
    }

    #[test]
    fn test_armor_penetration_reduces_mitigation() {
        let (mut attacker, victim) = pair(60, 6000);
        let constants = CombatConstants::default();
        let without = calc_armor_reduced_damage(&attacker, &victim, 1000, None, &constants);

        attacker.ratings.armor_penetration_pct = 50.0;
        let with = calc_armor_reduced_damage(&attacker, &victim, 1000, None, &constants);
        assert!(with > without);
    }

    #[test]
    fn test_ignore_armor_spell() {
        let (attacker, victim) = pair(60, 6000);
        let spell = SpellInfo::new(1, SchoolMask::NORMAL).with_attributes(SpellAttributes::IGNORE_ARMOR);
        let constants = CombatConstants::default();
        assert_eq!(calc_armor_reduced_damage(&attacker, &victim, 500, Some(&spell), &constants), 500);
    }

    proptest! {
        #[test]
        fn prop_armor_never_fully_negates(
            damage in 1u32..1_000_000,
            armor in 0i32..500_000,
            level in 1u8..=83
        ) {
            let (attacker, victim) = pair(level, armor);
            let reduced = calc_armor_reduced_damage(&attacker, &victim, damage, None, &CombatConstants::default());
            prop_assert!(reduced >= 1);
            prop_assert!(reduced <= damage);
        }
    }
}
