//! Resistance - Partial resists of magic damage
//!
//! Resistance is turned into an average resist ratio, the ratio into a
//! probability distribution over 11 buckets (0%, 10%, ... 100% resisted),
//! and one uniform sample picks the bucket.
//!
//! The bucket coefficients are balance data and must not be "simplified".

use super::armour::calc_armor_reduced_damage;
use crate::config::CombatConstants;
use crate::effect::{sum_flat_modifiers, sum_flat_modifiers_for_spell, EffectKind};
use crate::participant::CombatParticipant;
use crate::types::{SchoolMask, SpellAttributes, SpellInfo};

pub const RESIST_BUCKETS: usize = 11;

/// Average fraction of `schools` damage the victim resists
pub fn resist_chance(
    attacker: &CombatParticipant,
    victim: &CombatParticipant,
    schools: SchoolMask,
    constants: &CombatConstants,
) -> f32 {
    let rc = &constants.resist;

    // The weakest school of a multi-school hit counts
    let mut resistance = schools
        .schools()
        .map(|s| victim.resistance(s))
        .min()
        .unwrap_or(0) as f32;

    resistance +=
        sum_flat_modifiers(&attacker.effects, EffectKind::ModTargetResistance, schools, |_| true)
            as f32;
    if attacker.is_player() {
        resistance -= attacker.ratings.spell_penetration as f32;
    }
    let resistance = resistance.max(0.0);

    let level_gap = f32::from(victim.level) - f32::from(attacker.level);
    let resistance = resistance + (level_gap * rc.level_diff_bonus).max(0.0);

    // The level constant belongs to the defender
    let level_constant = if victim.level == rc.boss_level {
        rc.boss_constant
    } else {
        f32::from(victim.level) * rc.per_level
    };

    let denominator = resistance + level_constant;
    if denominator <= 0.0 {
        return 0.0;
    }
    resistance / denominator
}

/// Probability of each resisted tenth for an average resist ratio
pub fn resist_distribution(average: f32) -> [f32; RESIST_BUCKETS] {
    let mut p = [0.0f32; RESIST_BUCKETS];
    if average <= 0.1 {
        p[0] = 1.0 - 7.5 * average;
        p[1] = 5.0 * average;
        p[2] = 2.5 * average;
    } else {
        for (i, slot) in p.iter_mut().enumerate() {
            *slot = (0.5 - 2.5 * (0.1 * i as f32 - average).abs()).max(0.0);
        }
    }
    p
}

/// Bucket hit by a uniform `roll` in `[0, 1)`, never past 100%
pub fn resist_bucket(distribution: &[f32; RESIST_BUCKETS], roll: f32) -> u32 {
    let mut sum = 0.0;
    for (bucket, p) in distribution.iter().enumerate() {
        sum += p;
        if roll < sum {
            return bucket as u32;
        }
    }
    (RESIST_BUCKETS - 1) as u32
}

/// Damage resisted out of `damage` for a uniform `roll` in `[0, 1)`
pub fn calc_resisted_damage(
    attacker: &CombatParticipant,
    victim: &CombatParticipant,
    damage: u32,
    schools: SchoolMask,
    spell: Option<&SpellInfo>,
    roll: f32,
    constants: &CombatConstants,
) -> u32 {
    if damage == 0 {
        return 0;
    }

    let average = resist_chance(attacker, victim, schools, constants);
    let bucket = resist_bucket(&resist_distribution(average), roll);
    let mut resisted = (u64::from(damage) * u64::from(bucket) / 10) as u32;
    if resisted == 0 {
        return 0;
    }

    let ignored = sum_flat_modifiers_for_spell(
        &attacker.effects,
        EffectKind::ModIgnoreTargetResist,
        schools,
        spell.map(|s| s.id),
    )
    .clamp(0, 100) as u64;
    resisted = (u64::from(resisted) * (100 - ignored) / 100) as u32;

    if spell.is_some_and(|s| s.has_attribute(SpellAttributes::SCHOOLMASK_NORMAL_WITH_MAGIC)) {
        let after_armor = calc_armor_reduced_damage(attacker, victim, damage, spell, constants);
        let armor_reduction = damage.saturating_sub(after_armor);
        resisted = resisted.min(armor_reduction);
    }

    tracing::debug!(damage, average, bucket, resisted, "resist roll");
    resisted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ParticipantId, SpellSchool, UnitKind};

    fn pair(attacker_level: u8, victim_level: u8, fire: i32) -> (CombatParticipant, CombatParticipant) {
        let attacker = CombatParticipant::new(ParticipantId(1), "Mage", UnitKind::Player, attacker_level);
        let mut victim = CombatParticipant::new(ParticipantId(2), "Imp", UnitKind::Creature, victim_level);
        victim.resistances[SpellSchool::Fire.index()] = fire;
        (attacker, victim)
    }

    #[test]
    fn test_low_ratio_distribution() {
        let p = resist_distribution(0.1);
        assert!((p[0] - 0.25).abs() < 1e-6);
        assert!((p[1] - 0.5).abs() < 1e-6);
        assert!((p[2] - 0.25).abs() < 1e-6);
        assert!(p[3..].iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_zero_ratio_never_resists() {
        let p = resist_distribution(0.0);
        assert!((p[0] - 1.0).abs() < f32::EPSILON);
        assert_eq!(resist_bucket(&p, 0.999), 0);
    }

    #[test]
    fn test_high_ratio_distribution_is_triangular() {
        let p = resist_distribution(0.5);
        assert!((p[5] - 0.5).abs() < 1e-6);
        assert!((p[4] - 0.25).abs() < 1e-6);
        assert!((p[6] - 0.25).abs() < 1e-6);
        assert!(p[3].abs() < 1e-6);
        let total: f32 = p.iter().sum();
        assert!((total - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_bucket_clamped_to_full_resist() {
        let p = [0.0f32; RESIST_BUCKETS];
        assert_eq!(resist_bucket(&p, 0.5), 10);
    }

    #[test]
    fn test_resist_chance_uses_weakest_school() {
        let (attacker, mut victim) = pair(60, 60, 300);
        victim.resistances[SpellSchool::Frost.index()] = 0;
        let constants = CombatConstants::default();

        let fire = resist_chance(&attacker, &victim, SchoolMask::FIRE, &constants);
        // 300 / (300 + 60 * 5)
        assert!((fire - 0.5).abs() < 1e-6);

        let both = resist_chance(&attacker, &victim, SchoolMask::FIRE | SchoolMask::FROST, &constants);
        assert!(both.abs() < f32::EPSILON);
    }

    #[test]
    fn test_level_difference_adds_resistance() {
        let (attacker, victim) = pair(60, 63, 0);
        let constants = CombatConstants::default();
        // 15 / (15 + 63 * 5)
        let chance = resist_chance(&attacker, &victim, SchoolMask::FIRE, &constants);
        assert!((chance - 15.0 / 330.0).abs() < 1e-6);
    }

    #[test]
    fn test_boss_constant_follows_victim_level() {
        let (attacker, victim) = pair(80, 83, 0);
        let chance = resist_chance(&attacker, &victim, SchoolMask::FIRE, &CombatConstants::default());
        // 15 / (15 + 510)
        assert!((chance - 15.0 / 525.0).abs() < 1e-6);

        let (attacker, victim) = pair(83, 80, 400);
        let chance = resist_chance(&attacker, &victim, SchoolMask::FIRE, &CombatConstants::default());
        assert!((chance - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_boss_level_constant() {
        let (attacker, victim) = pair(83, 83, 510);
        let chance = resist_chance(&attacker, &victim, SchoolMask::FIRE, &CombatConstants::default());
        assert!((chance - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_spell_penetration() {
        let (mut attacker, victim) = pair(60, 60, 100);
        attacker.ratings.spell_penetration = 150;
        let chance = resist_chance(&attacker, &victim, SchoolMask::FIRE, &CombatConstants::default());
        assert!(chance.abs() < f32::EPSILON);
    }

    #[test]
    fn test_resisted_damage_for_roll() {
        let (attacker, victim) = pair(60, 60, 300);
        let constants = CombatConstants::default();
        // average 0.5: cumulative 0.25 at bucket 4, 0.75 at bucket 5
        let resisted = calc_resisted_damage(&attacker, &victim, 1000, SchoolMask::FIRE, None, 0.5, &constants);
        assert_eq!(resisted, 500);
    }

    #[test]
    fn test_ignore_resist_modifier() {
        let (mut attacker, victim) = pair(60, 60, 300);
        attacker
            .effects
            .add(crate::effect::Effect::new(1, EffectKind::ModIgnoreTargetResist, 50));
        let resisted = calc_resisted_damage(
            &attacker,
            &victim,
            1000,
            SchoolMask::FIRE,
            None,
            0.5,
            &CombatConstants::default(),
        );
        assert_eq!(resisted, 250);
    }

    #[test]
    fn test_hybrid_spell_resist_capped_by_armor() {
        let (attacker, victim) = pair(60, 60, 300);
        let victim = victim.with_armor(1000);
        let constants = CombatConstants::default();
        let smite = SpellInfo::new(1, SchoolMask::NORMAL | SchoolMask::FIRE)
            .with_attributes(SpellAttributes::SCHOOLMASK_NORMAL_WITH_MAGIC);

        let after_armor = calc_armor_reduced_damage(&attacker, &victim, 1000, Some(&smite), &constants);
        let armor_reduction = 1000 - after_armor;
        assert!(armor_reduction > 0 && armor_reduction < 500);

        let capped = calc_resisted_damage(&attacker, &victim, 1000, SchoolMask::FIRE, Some(&smite), 0.5, &constants);
        assert_eq!(capped, armor_reduction);

        // Without the attribute the full bucket applies
        let plain = SpellInfo::new(2, SchoolMask::FIRE);
        let full = calc_resisted_damage(&attacker, &victim, 1000, SchoolMask::FIRE, Some(&plain), 0.5, &constants);
        assert_eq!(full, 500);
    }
}
