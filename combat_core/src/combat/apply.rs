//! Damage application - the last stage of every damage event
//!
//! [`deal_damage`] takes an already mitigated amount and commits it: hooks,
//! aura interrupts, shared damage, rage, duel protection, loot tracking,
//! threat, durability, spell pushback and finally health or [`kill`].

use super::context::CombatContext;
use super::hooks::ProcEvent;
use super::log::CombatLogEntry;
use super::state::combat_stop;
use super::threat::{add_threat, clear_hostile_references, clear_threat_table};
use super::world::World;
use crate::config::RageConstants;
use crate::damage::CleanDamage;
use crate::effect::{sum_percent_modifiers, EffectKind, EffectProvider, InterruptFlags};
use crate::outcome::HitOutcome;
use crate::participant::{CastInterrupt, CastKind, CombatParticipant, DeathState};
use crate::types::{
    DamageEffectType, DynamicFlags, ParticipantId, PowerType, ProcFlags, SchoolMask,
    SpellAttributes, SpellInfo, UnitKind, WeaponAttackType,
};

/// One committed damage event
#[derive(Debug, Clone, Copy)]
pub struct DamageEvent {
    pub attacker: Option<ParticipantId>,
    pub victim: ParticipantId,
    pub damage: u32,
    /// Weapon hit details, present for melee and ranged swings
    pub clean: Option<CleanDamage>,
    pub effect_type: DamageEffectType,
    pub school_mask: SchoolMask,
    pub spell: Option<SpellInfo>,
    pub durability_loss: bool,
}

impl DamageEvent {
    pub fn new(
        attacker: Option<ParticipantId>,
        victim: ParticipantId,
        damage: u32,
        effect_type: DamageEffectType,
        school_mask: SchoolMask,
    ) -> Self {
        DamageEvent {
            attacker,
            victim,
            damage,
            clean: None,
            effect_type,
            school_mask,
            spell: None,
            durability_loss: true,
        }
    }

    pub fn with_clean(mut self, clean: CleanDamage) -> Self {
        self.clean = Some(clean);
        self
    }

    pub fn with_spell(mut self, spell: SpellInfo) -> Self {
        self.spell = Some(spell);
        self
    }

    pub fn with_durability_loss(mut self, durability_loss: bool) -> Self {
        self.durability_loss = durability_loss;
        self
    }
}

/// Level-dependent damage-to-rage conversion
pub fn rage_conversion(level: u8) -> f32 {
    let l = f32::from(level);
    0.0091107836 * l * l + 3.225598133 * l + 4.2652911
}

/// Grant rage for dealing (`attacker = true`) or taking damage
///
/// Returns the rage actually added, in tenths.
pub fn reward_rage(
    unit: &mut CombatParticipant,
    damage: u32,
    weapon_speed_factor: f32,
    attacker: bool,
    constants: &RageConstants,
) -> i32 {
    if unit.power_type != PowerType::Rage {
        return 0;
    }
    let conversion = rage_conversion(unit.level);
    let mut rage = if attacker {
        let base = (damage as f32 / conversion * 7.5 + weapon_speed_factor) / 2.0;
        base * sum_percent_modifiers(&unit.effects, EffectKind::ModRageFromDamageDealt, SchoolMask::all(), |_| true)
    } else {
        damage as f32 / conversion * 2.5
    };
    rage *= constants.income_rate;

    let room = constants.max_rage.saturating_sub(unit.power(PowerType::Rage)) as f32;
    let added = (rage * 10.0).min(room).max(0.0) as i32;
    unit.modify_power(PowerType::Rage, added)
}

/// Swing speed part of the attacker rage reward
fn weapon_speed_factor(unit: &CombatParticipant, clean: &CleanDamage, constants: &RageConstants) -> f32 {
    let mut factor = unit.attack_time(clean.attack_type) as f32 / 1000.0 * constants.hit_factor;
    if clean.outcome == HitOutcome::Crit {
        factor *= 2.0;
    }
    if clean.attack_type == WeaponAttackType::OffAttack {
        factor /= 2.0;
    }
    factor
}

/// Commit `event`; returns the damage applied
///
/// GM and inactive victims take nothing and trigger nothing, and neither
/// does anyone hit by an attacker that has left the world. A zero amount
/// still breaks damage-interruptible auras when something was absorbed, but
/// never touches health.
pub fn deal_damage(world: &mut World, ctx: &mut CombatContext, event: DamageEvent) -> u32 {
    let DamageEvent {
        attacker,
        victim,
        mut damage,
        clean,
        effect_type,
        school_mask,
        spell,
        durability_loss,
    } = event;

    match world.get(victim) {
        Some(v) if v.is_alive() && v.in_world && !v.is_game_master() => {}
        _ => return 0,
    }
    if attacker.and_then(|a| world.get(a)).is_some_and(|a| !a.in_world) {
        return 0;
    }

    world.with_ai(victim, |ai| ai.damage_taken(attacker, &mut damage));
    if let Some(a) = attacker {
        world.with_ai(a, |ai| ai.damage_dealt(victim, &mut damage, effect_type));
    }
    for script in ctx.scripts.iter_mut() {
        script.on_damage(attacker, victim, &mut damage);
    }

    if let Some(a) = attacker.filter(|a| *a != victim) {
        let minions = world.get(victim).map(|v| v.minions.clone()).unwrap_or_default();
        for minion in minions {
            world.with_ai(minion, |ai| ai.owner_attacked_by(a));
        }
    }

    let absorbed = clean.map(|c| c.absorbed).unwrap_or(0);
    let keeps_auras = spell.is_some_and(|s| s.has_attribute(SpellAttributes::DAMAGE_DOESNT_BREAK_AURAS));
    if effect_type != DamageEffectType::NoDamage && (damage > 0 || absorbed > 0) && !keeps_auras {
        let mut flags = InterruptFlags::TAKE_DAMAGE;
        if effect_type != DamageEffectType::Dot {
            flags |= InterruptFlags::DIRECT_DAMAGE;
        }
        if let Some(v) = world.get_mut(victim) {
            v.effects.remove_by_interrupt(flags, spell.map(|s| s.id));
        }
    }

    if damage > 0 && effect_type != DamageEffectType::NoDamage {
        share_damage(world, ctx, attacker, victim, damage, school_mask, spell);
    }

    if let (Some(a), Some(clean)) = (attacker, clean) {
        if effect_type == DamageEffectType::Direct && a != victim {
            let rage = &ctx.constants.rage;
            if let Some(unit) = world.get_mut(a) {
                if unit.is_player() {
                    let factor = weapon_speed_factor(unit, &clean, rage);
                    reward_rage(unit, damage + clean.absorbed, factor, true, rage);
                }
            }
        }
    }

    if damage == 0 {
        if absorbed > 0 {
            let rage = &ctx.constants.rage;
            if let Some(v) = world.get_mut(victim).filter(|v| v.is_player()) {
                reward_rage(v, absorbed, 0.0, false, rage);
            }
        }
        return 0;
    }

    let duel = lethal_duel_override(world, attacker, victim, &mut damage);

    record_statistics(world, attacker, victim, damage);
    track_loot(world, attacker, victim, damage);

    let health = world.get(victim).map(|v| v.health()).unwrap_or(0);
    if health <= damage {
        tracing::debug!(victim = %victim, damage, health, "lethal damage");
        kill(world, ctx, attacker, victim, durability_loss);
        return damage;
    }

    if let Some(v) = world.get_mut(victim) {
        v.modify_health(-i64::from(damage));
    }

    if let Some(a) = attacker {
        let tracks_threat = world.get(victim).is_some_and(|v| v.traits.tracks_threat);
        if tracks_threat {
            add_threat(world, victim, a, damage as f32, school_mask, spell.as_ref());
        }
    }
    let rage = &ctx.constants.rage;
    if let Some(v) = world.get_mut(victim).filter(|v| v.is_player()) {
        reward_rage(v, damage + absorbed, 0.0, false, rage);
    }

    if effect_type != DamageEffectType::Dot && effect_type != DamageEffectType::NoDamage {
        if durability_loss {
            roll_durability_loss(world, ctx, attacker, victim);
        }
        let no_pushback = spell.is_some_and(|s| s.has_attribute(SpellAttributes::NO_PUSHBACK_ON_DAMAGE));
        if !no_pushback {
            apply_spell_pushback(world, ctx, victim);
        }
    }

    if let Some((winner, loser)) = duel {
        complete_duel(world, ctx, Some(winner), loser, false);
    }

    damage
}

/// Fan damage out to the casters of damage sharing effects.
/// The victim's own damage is unchanged.
fn share_damage(
    world: &mut World,
    ctx: &mut CombatContext,
    attacker: Option<ParticipantId>,
    victim: ParticipantId,
    damage: u32,
    school_mask: SchoolMask,
    spell: Option<SpellInfo>,
) {
    let shares = match world.get(victim) {
        Some(v) => v.effects.active_effects(EffectKind::ShareDamagePct),
        None => return,
    };
    for share in shares {
        let Some(caster) = share.caster else {
            continue;
        };
        if caster == victim || !world.is_active(caster) || !share.matches_schools(school_mask) {
            continue;
        }
        let shared = (u64::from(damage) * share.amount.clamp(0, 100) as u64 / 100) as u32;
        if shared == 0 {
            continue;
        }
        let mut event = DamageEvent::new(attacker, caster, shared, DamageEffectType::NoDamage, school_mask)
            .with_durability_loss(false);
        event.spell = spell;
        deal_damage(world, ctx, event);
    }
}

/// Clamp lethal damage from a duel opponent so the loser keeps 1 health.
/// Returns `(winner, loser)` when the duel ends.
fn lethal_duel_override(
    world: &World,
    attacker: Option<ParticipantId>,
    victim: ParticipantId,
    damage: &mut u32,
) -> Option<(ParticipantId, ParticipantId)> {
    let attacker = attacker?;
    let v = world.get(victim)?;
    if *damage < v.health() {
        return None;
    }

    // A duel fought in vehicles is decided on the vehicle
    let duelist = if v.traits.is_vehicle {
        let owner = v.owner?;
        world.get(owner).filter(|o| o.duel.is_some_and(|d| d.mounted))?
    } else {
        v
    };
    let duel = duelist.duel?;
    let attacker_owner = world.owner_or_self(attacker);
    if duel.opponent != attacker_owner {
        return None;
    }

    *damage = v.health() - 1;
    tracing::debug!(winner = %attacker_owner, loser = %duelist.id, "duel decided");
    Some((attacker_owner, duelist.id))
}

fn record_statistics(world: &mut World, attacker: Option<ParticipantId>, victim: ParticipantId, damage: u32) {
    if let Some(a) = attacker.and_then(|a| world.get_mut(a)) {
        a.stats.damage_done += u64::from(damage);
        a.stats.highest_hit_dealt = a.stats.highest_hit_dealt.max(damage);
    }
    if let Some(v) = world.get_mut(victim) {
        v.stats.damage_taken += u64::from(damage);
        v.stats.highest_hit_received = v.stats.highest_hit_received.max(damage);
    }
}

/// Tap the creature and count player damage toward its reward requirement
fn track_loot(world: &mut World, attacker: Option<ParticipantId>, victim: ParticipantId, damage: u32) {
    let Some(a) = attacker else {
        return;
    };
    let tapper = world.owner_or_self(a);
    if !world.get(a).is_some_and(|p| p.is_player_controlled()) {
        return;
    }
    let Some(v) = world.get_mut(victim) else {
        return;
    };
    if v.kind != UnitKind::Creature {
        return;
    }
    if v.loot.recipient.is_none() {
        v.loot.recipient = Some(tapper);
        v.dynamic_flags.insert(DynamicFlags::TAPPED);
    }
    let counted = damage.min(v.health());
    v.loot.player_damage_req = v.loot.player_damage_req.saturating_sub(counted);
}

fn roll_durability_loss(
    world: &mut World,
    ctx: &mut CombatContext,
    attacker: Option<ParticipantId>,
    victim: ParticipantId,
) {
    let damage_chance = ctx.constants.durability.damage_loss_chance;
    let weapon_chance = ctx.constants.durability.weapon_loss_chance;

    if world.get(victim).is_some_and(|v| v.traits.has_durability) && ctx.roll_chance(damage_chance) {
        if let Some(v) = world.get_mut(victim) {
            v.durability = (v.durability - 1.0).max(0.0);
            v.stats.durability_hits += 1;
        }
    }
    if let Some(a) = attacker {
        if world.get(a).is_some_and(|p| p.traits.has_durability) && ctx.roll_chance(weapon_chance) {
            if let Some(p) = world.get_mut(a) {
                p.durability = (p.durability - 1.0).max(0.0);
                p.stats.durability_hits += 1;
            }
        }
    }
}

/// Abort, delay or shorten the spell a player is casting after taking damage
pub fn apply_spell_pushback(world: &mut World, ctx: &CombatContext, victim: ParticipantId) {
    let pushback = &ctx.constants.pushback;
    let Some(v) = world.get_mut(victim) else {
        return;
    };
    if !v.is_player() {
        return;
    }
    let Some(mut cast) = v.current_spell else {
        return;
    };

    match cast.kind {
        CastKind::Generic => {
            if cast.interrupt.contains(CastInterrupt::ABORT_ON_DAMAGE) {
                tracing::debug!(victim = %victim, spell = cast.spell_id, "cast aborted by damage");
                v.current_spell = None;
            } else if cast.interrupt.contains(CastInterrupt::PUSH_BACK) && cast.delays < pushback.max_delays {
                cast.delays += 1;
                cast.remaining_ms = (cast.remaining_ms + pushback.delay_ms).min(cast.duration_ms);
                v.current_spell = Some(cast);
            }
        }
        CastKind::Channeled => {
            if cast.interrupt.contains(CastInterrupt::CHANNEL_DELAY) {
                let lost = cast.duration_ms * pushback.channel_reduction_pct / 100;
                cast.remaining_ms = cast.remaining_ms.saturating_sub(lost);
                v.current_spell = if cast.remaining_ms == 0 { None } else { Some(cast) };
            }
        }
        CastKind::Melee => {}
    }
}

/// End a duel: clear the link on both sides and log the result
///
/// A decided duel also stops combat for both duelists.
pub fn complete_duel(
    world: &mut World,
    ctx: &mut CombatContext,
    winner: Option<ParticipantId>,
    loser: ParticipantId,
    interrupted: bool,
) {
    let Some(opponent) = world.get_mut(loser).and_then(|l| l.duel.take()).map(|d| d.opponent) else {
        return;
    };
    if let Some(o) = world.get_mut(opponent) {
        o.duel = None;
    }

    if !interrupted {
        combat_stop(world, ctx, loser, true);
        combat_stop(world, ctx, opponent, true);
    }
    ctx.emit(CombatLogEntry::DuelComplete {
        winner,
        loser,
        interrupted,
    });
}

/// Kill `victim`; a victim that is already dead is left alone
pub fn kill(
    world: &mut World,
    ctx: &mut CombatContext,
    attacker: Option<ParticipantId>,
    victim: ParticipantId,
    durability_loss: bool,
) {
    let Some(v) = world.get(victim) else {
        return;
    };
    if !v.is_alive() {
        return;
    }

    let reward_allowed = v.is_player_controlled() || v.loot.player_damage_req == 0;
    let recipient = v.loot.recipient.or(attacker.map(|a| world.owner_or_self(a)));
    let victim_pc = v.is_player_controlled();
    let in_duel = v.duel.is_some();

    if reward_allowed {
        if let (Some(recipient), Some(rewards)) = (recipient, ctx.rewards.as_mut()) {
            rewards.reward(recipient, victim);
        }
    }

    ctx.fire_proc(ProcEvent {
        actor: attacker,
        target: victim,
        actor_flags: ProcFlags::KILL,
        target_flags: ProcFlags::KILLED | ProcFlags::DEATH,
        damage: 0,
        school_mask: SchoolMask::empty(),
    });

    if let Some(a) = attacker.and_then(|a| world.get_mut(a)) {
        a.stats.killing_blows += 1;
    }
    ctx.emit(CombatLogEntry::Kill {
        killer: attacker,
        victim,
    });

    if let Some(v) = world.get_mut(victim) {
        v.set_health(0);
        v.death_state = DeathState::Dead;
        v.stats.deaths += 1;
        v.current_spell = None;
    }
    combat_stop(world, ctx, victim, true);
    clear_threat_table(world, victim);
    clear_hostile_references(world, victim);

    let death_loss = ctx.constants.durability.death_loss_pct;
    if let Some(v) = world.get_mut(victim) {
        v.effects.clear();
        if reward_allowed && !victim_pc {
            v.dynamic_flags.insert(DynamicFlags::LOOTABLE);
        }
        if durability_loss && v.traits.has_durability {
            v.durability = (v.durability - death_loss).max(0.0);
        }
    }

    world.with_ai(victim, |ai| ai.just_died(attacker));
    if let Some(a) = attacker {
        world.with_ai(a, |ai| ai.killed_unit(victim));
    }
    for script in ctx.scripts.iter_mut() {
        script.on_kill(attacker, victim);
    }

    if in_duel {
        complete_duel(world, ctx, None, victim, true);
    }
    tracing::debug!(victim = %victim, killer = ?attacker, reward_allowed, "participant killed");
}
