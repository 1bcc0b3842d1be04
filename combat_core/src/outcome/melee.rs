//! Melee hit table built from attacker and victim stats

use super::{roll_outcome_from_chances, HitOutcome, OutcomeChances};
use crate::config::CombatConstants;
use crate::effect::{has_effect, sum_flat_modifiers, EffectKind};
use crate::participant::CombatParticipant;
use crate::types::{SchoolMask, WeaponAttackType};
use rand::Rng;
use std::f32::consts::PI;

/// Compute every ladder step for `attacker` swinging at `victim`
pub fn melee_outcome_chances(
    attacker: &CombatParticipant,
    victim: &CombatParticipant,
    attack_type: WeaponAttackType,
    constants: &CombatConstants,
) -> OutcomeChances {
    let oc = &constants.outcome;
    let per_level = oc.skill_per_level;
    let any_school = SchoolMask::all();

    let attacker_skill = attacker.weapon_skill(per_level) as i32;
    let attacker_max_skill = attacker.max_skill_for_level(per_level) as i32;
    let victim_defense = victim.defense_skill(per_level) as i32;
    let victim_max_skill = victim.max_skill_for_level(per_level) as i32;
    let skill_diff = attacker_skill - victim_defense;
    // 0.04% per point of weapon skill over the victim's level cap
    let skill_bonus = 4 * (attacker_skill - victim_max_skill);

    // Miss
    let mut miss = oc.base_miss;
    if attack_type != WeaponAttackType::RangedAttack && attacker.has_offhand_weapon() {
        miss += oc.dual_wield_penalty;
    }
    let skill_factor = if skill_diff < -10 { 0.2 } else { 0.1 };
    miss -= skill_diff as f32 * skill_factor;
    miss -= attacker.ratings.hit_pct;
    miss -= sum_flat_modifiers(&attacker.effects, EffectKind::ModHitChance, any_school, |_| true) as f32;
    miss -= sum_flat_modifiers(
        &victim.effects,
        EffectKind::ModAttackerMeleeHitChance,
        any_school,
        |_| true,
    ) as f32;
    let miss = miss.clamp(0.0, oc.max_miss);

    // Dodge, parry and block need the victim to see the attack coming
    let facing = victim.position.has_in_arc(PI, &attacker.position)
        || has_effect(&victim.effects, EffectKind::IgnoreHitDirection, any_school);
    let can_defend = facing && !victim.is_controlled() && !victim.is_casting();
    let is_ranged = attack_type == WeaponAttackType::RangedAttack;
    let expertise_bp = attacker.ratings.expertise as i32 * 25;

    let dodge = if can_defend && !is_ranged && victim.traits.can_dodge {
        let pct = victim.ratings.dodge_pct
            + sum_flat_modifiers(&victim.effects, EffectKind::ModDodgePercent, any_school, |_| true)
                as f32;
        (pct * 100.0) as i32 - skill_bonus - expertise_bp
    } else {
        0
    };

    let parry = if can_defend && !is_ranged && victim.traits.can_parry {
        let pct = victim.ratings.parry_pct
            + sum_flat_modifiers(&victim.effects, EffectKind::ModParryPercent, any_school, |_| true)
                as f32;
        (pct * 100.0) as i32 - skill_bonus - expertise_bp
    } else {
        0
    };

    let glancing = if !is_ranged
        && attacker.traits.can_glance
        && !victim.is_player_controlled()
        && victim.level >= attacker.level.saturating_add(oc.glancing_min_level_gap)
    {
        let skill = attacker_skill.min(attacker_max_skill);
        ((10 + victim_defense - skill) * 100).min(oc.glancing_cap)
    } else {
        0
    };

    let block = if can_defend && victim.traits.can_block {
        let pct = victim.ratings.block_pct
            + sum_flat_modifiers(&victim.effects, EffectKind::ModBlockPercent, any_school, |_| true)
                as f32;
        (pct * 100.0) as i32 - skill_bonus
    } else {
        0
    };

    let crit_pct = attacker.ratings.crit_pct
        + sum_flat_modifiers(&attacker.effects, EffectKind::ModCritPercent, any_school, |_| true)
            as f32
        + sum_flat_modifiers(
            &victim.effects,
            EffectKind::ModAttackerMeleeCritChance,
            any_school,
            |_| true,
        ) as f32;
    let crit = (crit_pct * 100.0) as i32 + 4 * skill_diff;

    let crushing = if attacker.traits.can_crush
        && !attacker.is_player_controlled()
        && attacker.level >= victim.level.saturating_add(oc.crushing_min_level_gap)
    {
        let deficit = attacker_skill - victim_defense.max(victim_max_skill);
        if deficit >= oc.crushing_min_skill_gap {
            // 2% per point past the threshold, starting at 15%
            deficit * 200 - 1500
        } else {
            0
        }
    } else {
        0
    };

    OutcomeChances {
        miss: (miss * 100.0) as i32,
        dodge: dodge.max(0),
        parry: parry.max(0),
        glancing: glancing.max(0),
        block: block.max(0),
        crit: crit.max(0),
        crushing: crushing.max(0),
    }
}

/// Resolve a swing for a known roll in `[0, 9999]`
///
/// An evading victim always yields Evade. Miss is checked next; a sitting
/// victim of a player-controlled attacker with any crit chance is then
/// critically hit without walking the rest of the ladder.
pub fn melee_outcome_for_roll(
    attacker: &CombatParticipant,
    victim: &CombatParticipant,
    attack_type: WeaponAttackType,
    constants: &CombatConstants,
    roll: i32,
) -> HitOutcome {
    if victim.is_evading() {
        return HitOutcome::Evade;
    }

    let chances = melee_outcome_chances(attacker, victim, attack_type, constants);
    if roll < chances.miss {
        return HitOutcome::Miss;
    }

    if !victim.is_standing() && attacker.is_player_controlled() && chances.crit > 0 {
        return HitOutcome::Crit;
    }

    let outcome = roll_outcome_from_chances(&chances, roll);
    tracing::debug!(
        attacker = %attacker.id,
        victim = %victim.id,
        roll,
        ?outcome,
        "melee outcome"
    );
    outcome
}

/// Roll a melee outcome using the thread RNG
pub fn roll_melee_outcome(
    attacker: &CombatParticipant,
    victim: &CombatParticipant,
    attack_type: WeaponAttackType,
    constants: &CombatConstants,
) -> HitOutcome {
    let mut rng = rand::thread_rng();
    roll_melee_outcome_with_rng(attacker, victim, attack_type, constants, &mut rng)
}

/// Roll a melee outcome with a provided RNG (for deterministic testing)
pub fn roll_melee_outcome_with_rng<R: Rng + ?Sized>(
    attacker: &CombatParticipant,
    victim: &CombatParticipant,
    attack_type: WeaponAttackType,
    constants: &CombatConstants,
    rng: &mut R,
) -> HitOutcome {
    let roll = rng.gen_range(0..10_000);
    melee_outcome_for_roll(attacker, victim, attack_type, constants, roll)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::Effect;
    use crate::participant::{CombatRatings, WeaponProfile};
    use crate::types::{ParticipantId, Position, UnitKind, UnitState};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn player(level: u8) -> CombatParticipant {
        CombatParticipant::new(ParticipantId(1), "Hero", UnitKind::Player, level)
            .with_position(Position::new(0.0, 0.0, 0.0))
    }

    fn creature(level: u8) -> CombatParticipant {
        // Facing the player at the origin
        CombatParticipant::new(ParticipantId(2), "Boar", UnitKind::Creature, level)
            .with_position(Position::new(2.0, 0.0, PI))
    }

    #[test]
    fn test_equal_level_base_chances() {
        let attacker = player(10).with_ratings(CombatRatings {
            crit_pct: 20.0,
            ..Default::default()
        });
        let mut victim = creature(10).with_ratings(CombatRatings {
            dodge_pct: 5.0,
            ..Default::default()
        });
        victim.traits.can_parry = false;
        victim.traits.can_block = false;

        let c = melee_outcome_chances(&attacker, &victim, WeaponAttackType::BaseAttack, &CombatConstants::default());
        assert_eq!(c.miss, 500);
        assert_eq!(c.dodge, 500);
        assert_eq!(c.parry, 0);
        assert_eq!(c.glancing, 0);
        assert_eq!(c.block, 0);
        assert_eq!(c.crit, 2000);
        assert_eq!(c.crushing, 0);
    }

    #[test]
    fn test_dual_wield_penalty() {
        let attacker = player(10).with_weapon(WeaponAttackType::OffAttack, WeaponProfile::new(3, 6, 1500));
        let victim = creature(10);
        let c = melee_outcome_chances(&attacker, &victim, WeaponAttackType::BaseAttack, &CombatConstants::default());
        assert_eq!(c.miss, 2400);
    }

    #[test]
    fn test_no_dodge_from_behind() {
        let attacker = player(10);
        let mut victim = creature(10).with_ratings(CombatRatings {
            dodge_pct: 10.0,
            parry_pct: 10.0,
            block_pct: 10.0,
            ..Default::default()
        });
        // Victim turned away
        victim.position.orientation = 0.0;

        let c = melee_outcome_chances(&attacker, &victim, WeaponAttackType::BaseAttack, &CombatConstants::default());
        assert_eq!(c.dodge, 0);
        assert_eq!(c.parry, 0);
        assert_eq!(c.block, 0);

        victim.effects.add(Effect::new(1, EffectKind::IgnoreHitDirection, 0));
        let c = melee_outcome_chances(&attacker, &victim, WeaponAttackType::BaseAttack, &CombatConstants::default());
        assert_eq!(c.dodge, 1000);
    }

    #[test]
    fn test_stunned_victim_cannot_dodge() {
        let attacker = player(10);
        let mut victim = creature(10).with_ratings(CombatRatings {
            dodge_pct: 10.0,
            ..Default::default()
        });
        victim.state.insert(UnitState::STUNNED);

        let c = melee_outcome_chances(&attacker, &victim, WeaponAttackType::BaseAttack, &CombatConstants::default());
        assert_eq!(c.dodge, 0);
    }

    #[test]
    fn test_glancing_against_higher_level() {
        let attacker = player(60);
        let victim = creature(63);
        let c = melee_outcome_chances(&attacker, &victim, WeaponAttackType::BaseAttack, &CombatConstants::default());
        // (10 + 315 - 300) * 100, capped at 40%
        assert_eq!(c.glancing, 2500);

        let victim = creature(70);
        let c = melee_outcome_chances(&attacker, &victim, WeaponAttackType::BaseAttack, &CombatConstants::default());
        assert_eq!(c.glancing, 4000);

        let c = melee_outcome_chances(&attacker, &victim, WeaponAttackType::RangedAttack, &CombatConstants::default());
        assert_eq!(c.glancing, 0);
    }

    #[test]
    fn test_crushing_from_higher_level_creature() {
        let mut attacker = creature(64);
        attacker.position = Position::new(2.0, 0.0, PI);
        let victim = player(60).with_position(Position::new(0.0, 0.0, 0.0));

        let c = melee_outcome_chances(&attacker, &victim, WeaponAttackType::BaseAttack, &CombatConstants::default());
        // 20 skill points over defense: 20 * 200 - 1500
        assert_eq!(c.crushing, 2500);

        let attacker = creature(62);
        let c = melee_outcome_chances(&attacker, &victim, WeaponAttackType::BaseAttack, &CombatConstants::default());
        assert_eq!(c.crushing, 0);
    }

    #[test]
    fn test_evading_victim_always_evades() {
        let attacker = player(10);
        let mut victim = creature(10);
        victim.state.insert(UnitState::EVADE);

        for roll in [0, 4999, 9999] {
            assert_eq!(
                melee_outcome_for_roll(&attacker, &victim, WeaponAttackType::BaseAttack, &CombatConstants::default(), roll),
                HitOutcome::Evade
            );
        }
    }

    #[test]
    fn test_sitting_victim_is_crit_after_miss_check() {
        let attacker = player(10).with_ratings(CombatRatings {
            crit_pct: 5.0,
            ..Default::default()
        });
        let mut victim = creature(10);
        victim.state.insert(UnitState::SITTING);
        let constants = CombatConstants::default();

        assert_eq!(
            melee_outcome_for_roll(&attacker, &victim, WeaponAttackType::BaseAttack, &constants, 100),
            HitOutcome::Miss
        );
        assert_eq!(
            melee_outcome_for_roll(&attacker, &victim, WeaponAttackType::BaseAttack, &constants, 9999),
            HitOutcome::Crit
        );
    }

    #[test]
    fn test_seeded_rolls_are_deterministic() {
        let attacker = player(10);
        let victim = creature(10);
        let constants = CombatConstants::default();

        let run = |seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            (0..20)
                .map(|_| roll_melee_outcome_with_rng(&attacker, &victim, WeaponAttackType::BaseAttack, &constants, &mut rng))
                .collect::<Vec<_>>()
        };
        assert_eq!(run(7), run(7));
    }
}
