//! Swing driver and world tick

use super::apply::{deal_damage, DamageEvent};
use super::context::CombatContext;
use super::hooks::ProcEvent;
use super::log::CombatLogEntry;
use super::state::{attack, clear_in_combat, combat_start, enter_evade_mode, finish_evade};
use super::threat::top_threat_target;
use super::world::World;
use crate::damage::{calculate_melee_damage, MeleeDamageInfo};
use crate::effect::{EffectKind, EffectProvider, InterruptFlags};
use crate::outcome::HitOutcome;
use crate::participant::CastKind;
use crate::types::{DamageEffectType, ParticipantId, SchoolMask, SpellInfo, UnitFlags, UnitState, WeaponAttackType};

/// Minimum gap between a main hand and an off hand swing
const OFFHAND_DELAY_MS: u32 = 200;

/// Perform one weapon swing of `attacker` against `victim`
///
/// Returns `None` if the swing was not allowed or was replaced by a queued
/// next-swing ability.
pub fn attacker_state_update(
    world: &mut World,
    ctx: &mut CombatContext,
    attacker: ParticipantId,
    victim: ParticipantId,
    attack_type: WeaponAttackType,
) -> Option<MeleeDamageInfo> {
    if attacker == victim {
        return None;
    }
    let a = world.get(attacker)?;
    let v = world.get(victim)?;
    if !a.is_alive() || !a.in_world || !v.is_alive() || !v.in_world || v.is_game_master() {
        return None;
    }
    if a.is_controlled() || a.flags.contains(UnitFlags::PACIFIED) {
        return None;
    }
    if attack_type == WeaponAttackType::OffAttack && !a.has_offhand_weapon() {
        return None;
    }

    let queued = match a.current_spell {
        Some(spell) if spell.kind == CastKind::Melee && attack_type == WeaponAttackType::BaseAttack => Some(spell.spell_id),
        _ => None,
    };
    if let Some(spell_id) = queued {
        if let Some(a) = world.get_mut(attacker) {
            a.current_spell = None;
        }
        tracing::debug!(attacker = %attacker, spell = spell_id, "swing replaced by queued ability");
        return None;
    }

    if let Some(a) = world.get_mut(attacker) {
        a.effects.remove_by_interrupt(InterruptFlags::MELEE_ATTACK, None);
    }
    combat_start(world, ctx, attacker, victim);

    let info = calculate_melee_damage(world, ctx, attacker, victim, attack_type)?;
    ctx.emit(CombatLogEntry::MeleeSwing {
        attacker,
        victim,
        attack_type,
        outcome: info.outcome,
        hit_info: info.ledger.hit_info,
        school_mask: info.ledger.school_mask,
        damage: info.damage(),
        absorbed: info.ledger.absorbed(),
        resisted: info.ledger.resisted(),
        blocked: info.ledger.blocked(),
    });

    if info.outcome == HitOutcome::Parry {
        apply_parry_haste(world, ctx, victim);
    }

    let event = DamageEvent::new(
        Some(attacker),
        victim,
        info.damage(),
        DamageEffectType::Direct,
        info.ledger.school_mask,
    )
    .with_clean(info.clean);
    let dealt = deal_damage(world, ctx, event);

    if info.outcome.is_hit() && attack_type.is_melee() {
        reflect_damage_shields(world, ctx, victim, attacker);
    }

    ctx.fire_proc(ProcEvent {
        actor: Some(attacker),
        target: victim,
        actor_flags: info.proc_attacker,
        target_flags: info.proc_victim,
        damage: dealt,
        school_mask: info.ledger.school_mask,
    });
    Some(info)
}

/// A parry hurries the parrying unit's next main hand swing
pub fn apply_parry_haste(world: &mut World, ctx: &CombatContext, id: ParticipantId) {
    let haste_pct = ctx.constants.combat.parry_haste_pct;
    let floor_pct = ctx.constants.combat.parry_haste_floor_pct;
    let Some(p) = world.get_mut(id) else {
        return;
    };

    let attack_time = p.attack_time(WeaponAttackType::BaseAttack);
    let floor = attack_time * floor_pct / 100;
    let reduction = attack_time * haste_pct / 100;
    let timer = &mut p.attack_timers[WeaponAttackType::BaseAttack.index()];
    if *timer > floor {
        *timer = if *timer > floor + reduction {
            *timer - reduction
        } else {
            floor
        };
    }
}

/// Damage shields on `holder` hit back at `attacker`
fn reflect_damage_shields(
    world: &mut World,
    ctx: &mut CombatContext,
    holder: ParticipantId,
    attacker: ParticipantId,
) {
    let shields = match world.get(holder) {
        Some(h) => h.effects.active_effects(EffectKind::DamageShield),
        None => return,
    };
    for shield in shields {
        if !world.is_active(attacker) {
            break;
        }
        let damage = shield.amount.max(0) as u32;
        if damage == 0 {
            continue;
        }
        let schools = if shield.school_mask.is_empty() {
            SchoolMask::NATURE
        } else {
            shield.school_mask
        };
        ctx.emit(CombatLogEntry::DamageShield {
            source: holder,
            target: attacker,
            spell_id: shield.spell_id,
            damage,
        });
        let event = DamageEvent::new(Some(holder), attacker, damage, DamageEffectType::SpellDirect, schools)
            .with_spell(SpellInfo::new(shield.spell_id, schools));
        deal_damage(world, ctx, event);
    }
}

/// Advance the encounter by `diff_ms`
pub fn update_world(world: &mut World, ctx: &mut CombatContext, diff_ms: u32) {
    ctx.now += u64::from(diff_ms);
    for id in world.ids() {
        update_participant(world, ctx, id, diff_ms);
    }
}

fn update_participant(world: &mut World, ctx: &mut CombatContext, id: ParticipantId, diff_ms: u32) {
    finish_evade(world, id, ctx.now);
    if !world.is_active(id) {
        return;
    }

    update_combat_timer(world, ctx, id, diff_ms);
    update_creature_target(world, ctx, id);
    update_cast(world, id, diff_ms);
    update_swings(world, ctx, id, diff_ms);
}

/// Player-controlled units leave combat once nothing holds them on a
/// threat table and the PvP timer has run out
fn update_combat_timer(world: &mut World, ctx: &mut CombatContext, id: ParticipantId, diff_ms: u32) {
    let Some(p) = world.get_mut(id) else {
        return;
    };
    if !p.is_in_combat() || !p.is_player_controlled() || !p.hostile_refs.is_empty() {
        return;
    }
    if p.state.contains(UnitState::MELEE_ATTACKING) {
        return;
    }
    if p.combat_timer <= u64::from(diff_ms) {
        clear_in_combat(world, ctx, id);
    } else {
        p.combat_timer -= u64::from(diff_ms);
    }
}

/// Creatures follow their threat table and evade when it runs dry
fn update_creature_target(world: &mut World, ctx: &mut CombatContext, id: ParticipantId) {
    let Some(p) = world.get(id) else {
        return;
    };
    if p.is_player_controlled() || !p.traits.tracks_threat || !p.is_in_combat() || p.is_evading() {
        return;
    }
    let current = p.attacking;
    let attacked = !p.attackers.is_empty();

    match top_threat_target(world, id) {
        Some(top) if current != Some(top) => {
            tracing::debug!(creature = %id, target = %top, "switching to top threat target");
            attack(world, ctx, id, top, true);
        }
        Some(_) => {}
        None if !attacked => enter_evade_mode(world, ctx, id),
        None => {}
    }
}

fn update_cast(world: &mut World, id: ParticipantId, diff_ms: u32) {
    let Some(p) = world.get_mut(id) else {
        return;
    };
    let Some(mut cast) = p.current_spell else {
        return;
    };
    if cast.kind == CastKind::Melee {
        return;
    }
    cast.remaining_ms = cast.remaining_ms.saturating_sub(diff_ms);
    if cast.remaining_ms == 0 {
        tracing::debug!(participant = %id, spell = cast.spell_id, "cast finished");
        p.current_spell = None;
    } else {
        p.current_spell = Some(cast);
    }
}

fn update_swings(world: &mut World, ctx: &mut CombatContext, id: ParticipantId, diff_ms: u32) {
    let melee_range = ctx.constants.combat.melee_range;
    let Some(p) = world.get_mut(id) else {
        return;
    };
    for timer in p.attack_timers.iter_mut() {
        *timer = timer.saturating_sub(diff_ms);
    }
    if !p.state.contains(UnitState::MELEE_ATTACKING) || p.is_casting() {
        return;
    }
    let Some(target) = p.attacking else {
        return;
    };

    let in_range = match (world.get(id), world.get(target)) {
        (Some(p), Some(t)) => p.distance_to(t) <= melee_range,
        _ => false,
    };
    if !in_range {
        return;
    }

    let ready = |world: &World, slot: WeaponAttackType| {
        world
            .get(id)
            .is_some_and(|p| p.attack_timers[slot.index()] == 0)
    };

    if ready(world, WeaponAttackType::BaseAttack) {
        attacker_state_update(world, ctx, id, target, WeaponAttackType::BaseAttack);
        if let Some(p) = world.get_mut(id) {
            p.reset_attack_timer(WeaponAttackType::BaseAttack);
            let off = &mut p.attack_timers[WeaponAttackType::OffAttack.index()];
            if *off < OFFHAND_DELAY_MS {
                *off = OFFHAND_DELAY_MS;
            }
        }
    }

    let has_offhand = world.get(id).is_some_and(|p| p.has_offhand_weapon());
    if has_offhand && ready(world, WeaponAttackType::OffAttack) {
        attacker_state_update(world, ctx, id, target, WeaponAttackType::OffAttack);
        if let Some(p) = world.get_mut(id) {
            p.reset_attack_timer(WeaponAttackType::OffAttack);
        }
    }
}
