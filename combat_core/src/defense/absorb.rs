//! Absorb - Resist roll, shields and damage split on a ledger in place
//!
//! Steps run in a fixed order, each on what the previous one left:
//! resist, absorb-ignore slice, school shields, mana shields, split.

use super::resistance::calc_resisted_damage;
use crate::combat::{deal_damage, CombatContext, CombatLogEntry, DamageEvent, World};
use crate::damage::{DamageLedger, HitInfo};
use crate::effect::{max_modifier, EffectKind, EffectProvider, RemoveReason};
use crate::types::{ParticipantId, PowerType, SchoolMask, SpellAttributes, UnitKind};

fn is_resistable(ledger: &DamageLedger, victim_kind: UnitKind) -> bool {
    let hybrid = ledger
        .spell
        .is_some_and(|s| s.has_attribute(SpellAttributes::SCHOOLMASK_NORMAL_WITH_MAGIC));
    if ledger.school_mask.contains(SchoolMask::NORMAL) && !hybrid {
        return false;
    }
    if ledger
        .spell
        .is_some_and(|s| s.attributes.intersects(SpellAttributes::UNRESISTABLE | SpellAttributes::BINARY))
    {
        return false;
    }
    if ledger.school_mask == SchoolMask::HOLY && victim_kind != UnitKind::Creature {
        return false;
    }
    ledger.school_mask.has_magic()
}

/// Run resist, absorption and split on `ledger`
///
/// Does nothing for a dead or missing victim, or when nothing remains.
pub fn calc_absorb_resist(world: &mut World, ctx: &mut CombatContext, ledger: &mut DamageLedger) {
    let victim = ledger.victim;
    let victim_kind = match world.get(victim) {
        Some(v) if v.is_alive() => v.kind,
        _ => return,
    };
    if ledger.remaining() == 0 {
        return;
    }
    let schools = ledger.school_mask;

    if is_resistable(ledger, victim_kind) {
        if let Some(attacker_id) = ledger.attacker {
            let roll = ctx.rand_norm();
            if let (Some(a), Some(v)) = (world.get(attacker_id), world.get(victim)) {
                let resisted = calc_resisted_damage(
                    a,
                    v,
                    ledger.remaining(),
                    schools,
                    ledger.spell.as_ref(),
                    roll,
                    &ctx.constants,
                );
                ledger.resist(resisted);
            }
        }
    }

    // Slice of the damage that shields never see
    let ignore_pct = ledger
        .attacker
        .and_then(|id| world.get(id))
        .map(|a| max_modifier(&a.effects, EffectKind::ModTargetAbsorbSchool, schools, |_| true))
        .unwrap_or(0)
        .clamp(0, 100);
    let hidden = (u64::from(ledger.remaining()) * ignore_pct as u64 / 100) as u32;
    let mut visible = ledger.remaining() - hidden;

    visible = absorb_with_shields(world, ledger, visible);
    absorb_with_mana_shields(world, ledger, visible);

    if ledger.allow_split {
        split_damage(world, ctx, ledger);
    }

    tracing::debug!(
        victim = %victim,
        original = ledger.original(),
        remaining = ledger.remaining(),
        absorbed = ledger.absorbed(),
        resisted = ledger.resisted(),
        "absorb and resist"
    );
}

fn absorb_with_shields(world: &mut World, ledger: &mut DamageLedger, mut visible: u32) -> u32 {
    let victim = ledger.victim;
    let Some(v) = world.get_mut(victim) else {
        return visible;
    };

    let mut shields = v.effects.active_effects(EffectKind::SchoolAbsorb);
    shields.retain(|e| e.matches_schools(ledger.school_mask));
    shields.sort_by_key(|e| (e.absorb_priority, e.apply_order));

    for shield in shields {
        if visible == 0 {
            break;
        }
        let capacity = shield.amount.max(0) as u32;
        let moved = ledger.absorb(capacity.min(visible));
        visible -= moved;

        let left = capacity - moved;
        if left == 0 {
            v.effects.remove_effect(shield.id, RemoveReason::Depleted);
        } else {
            v.effects.change_effect_amount(shield.id, left as i32);
        }
    }
    visible
}

/// Shields paid for with mana; a short pool absorbs proportionally less
fn absorb_with_mana_shields(world: &mut World, ledger: &mut DamageLedger, mut visible: u32) -> u32 {
    let Some(v) = world.get_mut(ledger.victim) else {
        return visible;
    };

    let mut shields = v.effects.active_effects(EffectKind::ManaShield);
    shields.retain(|e| e.matches_schools(ledger.school_mask));
    shields.sort_by_key(|e| (e.absorb_priority, e.apply_order));

    for shield in shields {
        if visible == 0 {
            break;
        }
        let capacity = shield.amount.max(0) as u32;
        let mut take = capacity.min(visible);
        let ratio = if shield.mana_per_damage > 0.0 {
            shield.mana_per_damage
        } else {
            1.0
        };

        let requested = (take as f32 * ratio) as i32;
        let drained = -v.modify_power(PowerType::Mana, -requested);
        if requested > 0 && drained < requested {
            take = (u64::from(take) * drained as u64 / requested as u64) as u32;
        }

        let moved = ledger.absorb(take);
        visible -= moved;
        let left = capacity - moved;
        if left == 0 {
            v.effects.remove_effect(shield.id, RemoveReason::Depleted);
        } else {
            v.effects.change_effect_amount(shield.id, left as i32);
        }
    }
    visible
}

/// Move part of the remaining damage to the casters of split effects
fn split_damage(world: &mut World, ctx: &mut CombatContext, ledger: &mut DamageLedger) {
    let victim = ledger.victim;
    let splits = match world.get(victim) {
        Some(v) => v.effects.active_effects(EffectKind::SplitDamagePct),
        None => return,
    };

    for split in splits {
        if ledger.remaining() == 0 {
            break;
        }
        if !split.matches_schools(ledger.school_mask) {
            continue;
        }
        let Some(caster) = split.caster else {
            continue;
        };
        if caster == victim || !world.is_active(caster) {
            continue;
        }

        let pct = split.amount.clamp(0, 100) as u64;
        let amount = (u64::from(ledger.remaining()) * pct / 100) as u32;
        let moved = ledger.absorb(amount);
        if moved == 0 {
            continue;
        }

        let mut redirected = split_ledger(ledger, caster, moved);
        calc_absorb_resist(world, ctx, &mut redirected);

        ctx.emit(CombatLogEntry::SplitDamage {
            source: victim,
            target: caster,
            spell_id: split.spell_id,
            damage: redirected.remaining(),
            absorbed: redirected.absorbed(),
        });

        let mut event = DamageEvent::new(
            ledger.attacker,
            caster,
            redirected.remaining(),
            ledger.effect_type,
            ledger.school_mask,
        );
        event.spell = ledger.spell;
        deal_damage(world, ctx, event);
    }
}

fn split_ledger(source: &DamageLedger, target: ParticipantId, amount: u32) -> DamageLedger {
    let mut ledger = DamageLedger::new(
        source.attacker,
        target,
        amount,
        source.school_mask,
        source.effect_type,
    )
    .with_attack_type(source.attack_type)
    .with_hit_info(HitInfo::SPLIT);
    ledger.spell = source.spell;
    ledger.allow_split = false;
    ledger
}
