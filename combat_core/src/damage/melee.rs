//! Melee damage calculation - weapon roll to mitigated ledger

use super::bonus::{damage_bonus_done, damage_bonus_taken};
use super::ledger::{CleanDamage, DamageLedger, HitInfo};
use crate::combat::{CombatContext, World};
use crate::defense::{calc_absorb_resist, calc_armor_reduced_damage};
use crate::effect::{has_effect, sum_percent_modifiers, EffectKind};
use crate::outcome::{melee_outcome_for_roll, HitOutcome};
use crate::participant::WeaponProfile;
use crate::types::{DamageEffectType, ParticipantId, ProcFlags, SchoolMask, WeaponAttackType};

/// Everything one resolved swing produced
#[derive(Debug, Clone)]
pub struct MeleeDamageInfo {
    pub attacker: ParticipantId,
    pub victim: ParticipantId,
    pub attack_type: WeaponAttackType,
    pub outcome: HitOutcome,
    pub ledger: DamageLedger,
    pub clean: CleanDamage,
    pub proc_attacker: ProcFlags,
    pub proc_victim: ProcFlags,
}

impl MeleeDamageInfo {
    /// Damage left for the victim to take
    pub fn damage(&self) -> u32 {
        self.ledger.remaining()
    }
}

fn swing_proc_flags(attack_type: WeaponAttackType) -> (ProcFlags, ProcFlags) {
    match attack_type {
        WeaponAttackType::BaseAttack => (
            ProcFlags::DONE_MELEE_AUTO_ATTACK | ProcFlags::DONE_MAINHAND_ATTACK,
            ProcFlags::TAKEN_MELEE_AUTO_ATTACK,
        ),
        WeaponAttackType::OffAttack => (
            ProcFlags::DONE_MELEE_AUTO_ATTACK | ProcFlags::DONE_OFFHAND_ATTACK,
            ProcFlags::TAKEN_MELEE_AUTO_ATTACK,
        ),
        WeaponAttackType::RangedAttack => (
            ProcFlags::DONE_RANGED_AUTO_ATTACK,
            ProcFlags::TAKEN_RANGED_AUTO_ATTACK,
        ),
    }
}

/// Resolve one weapon swing of `attacker` against `victim`
///
/// Returns `None` when either participant is missing. The returned ledger
/// has already been through armor, the hit table, block and
/// [`calc_absorb_resist`]; nothing has been applied yet.
pub fn calculate_melee_damage(
    world: &mut World,
    ctx: &mut CombatContext,
    attacker: ParticipantId,
    victim: ParticipantId,
    attack_type: WeaponAttackType,
) -> Option<MeleeDamageInfo> {
    let a = world.get(attacker)?;
    let v = world.get(victim)?;

    let weapon = a.weapon(attack_type).copied().unwrap_or_else(WeaponProfile::unarmed);
    let schools = if weapon.school_mask.is_empty() {
        SchoolMask::NORMAL
    } else {
        weapon.school_mask
    };
    let (mut proc_attacker, mut proc_victim) = swing_proc_flags(attack_type);

    let mut hit_info = HitInfo::NORMAL_SWING;
    if attack_type == WeaponAttackType::OffAttack {
        hit_info |= HitInfo::OFFHAND;
    }

    // Step 1: Weapon roll and damage modifiers
    let rolled = ctx.urand(weapon.min_damage, weapon.max_damage);
    let mut damage = damage_bonus_done(a, rolled, schools, None);
    damage = damage_bonus_taken(v, damage, schools, None);
    for script in ctx.scripts.iter_mut() {
        script.modify_melee_damage(attacker, victim, &mut damage);
    }

    // Step 2: Immunity short-circuits everything
    if has_effect(&v.effects, EffectKind::SchoolImmunity, schools) {
        let ledger = DamageLedger::new(Some(attacker), victim, 0, schools, DamageEffectType::Direct)
            .with_attack_type(attack_type)
            .with_hit_info(hit_info | HitInfo::IMMUNE);
        tracing::debug!(attacker = %attacker, victim = %victim, "melee swing immune");
        return Some(MeleeDamageInfo {
            attacker,
            victim,
            attack_type,
            outcome: HitOutcome::Normal,
            ledger,
            clean: CleanDamage::new(0, 0, attack_type, HitOutcome::Normal),
            proc_attacker,
            proc_victim,
        });
    }

    // Step 3: Armor
    let mut mitigated = 0;
    if schools.contains(SchoolMask::NORMAL) {
        let reduced = calc_armor_reduced_damage(a, v, damage, None, &ctx.constants);
        mitigated = damage - reduced;
        damage = reduced;
    }

    // Step 4: Hit table
    let roll = ctx.roll_basis_points();
    let outcome = melee_outcome_for_roll(a, v, attack_type, &ctx.constants, roll);

    let oc = &ctx.constants.outcome;
    match outcome {
        HitOutcome::Evade => {
            hit_info |= HitInfo::EVADE;
            damage = 0;
        }
        HitOutcome::Miss => {
            hit_info = (hit_info - HitInfo::NORMAL_SWING) | HitInfo::MISS;
            damage = 0;
        }
        HitOutcome::Dodge => {
            hit_info |= HitInfo::DODGE;
            damage = 0;
        }
        HitOutcome::Parry => {
            hit_info |= HitInfo::PARRY;
            damage = 0;
        }
        HitOutcome::Crit => {
            hit_info |= HitInfo::CRITICAL_HIT;
            let bonus = sum_percent_modifiers(&a.effects, EffectKind::ModCritDamageBonus, schools, |_| true);
            damage = (damage as f32 * oc.crit_multiplier * bonus).round() as u32;
        }
        HitOutcome::Glancing => {
            hit_info |= HitInfo::GLANCING;
            let gap = v.level.saturating_sub(a.level).min(oc.glancing_max_gap);
            let factor = (1.0 - oc.glancing_reduction_per_level * f32::from(gap)).max(0.0);
            damage = (damage as f32 * factor).round() as u32;
        }
        HitOutcome::Crushing => {
            hit_info |= HitInfo::CRUSHING;
            damage = (damage as f32 * oc.crushing_multiplier).round() as u32;
        }
        HitOutcome::Block | HitOutcome::Normal => {}
    }
    if !outcome.is_hit() {
        mitigated = 0;
    }
    let block_value = v.ratings.block_value;

    // Step 5: Block, absorb and resist on the ledger
    let mut ledger = DamageLedger::new(Some(attacker), victim, damage, schools, DamageEffectType::Direct)
        .with_attack_type(attack_type)
        .with_hit_info(hit_info);
    if outcome == HitOutcome::Block {
        mitigated += ledger.block(block_value);
    }
    calc_absorb_resist(world, ctx, &mut ledger);

    if ledger.remaining() > 0 {
        proc_victim |= ProcFlags::TAKEN_DAMAGE;
    } else if !outcome.is_hit() {
        proc_attacker = ProcFlags::empty();
        proc_victim = ProcFlags::empty();
    }

    tracing::debug!(
        attacker = %attacker,
        victim = %victim,
        ?attack_type,
        ?outcome,
        rolled,
        damage = ledger.remaining(),
        "melee damage calculated"
    );

    Some(MeleeDamageInfo {
        attacker,
        victim,
        attack_type,
        outcome,
        clean: CleanDamage::new(mitigated, ledger.absorbed(), attack_type, outcome),
        ledger,
        proc_attacker,
        proc_victim,
    })
}
