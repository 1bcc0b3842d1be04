//! Combat state controller
//!
//! Attack targets, attacker sets, combat flags and the per-participant
//! [`CombatPhase`] machine:
//!
//! ```text
//! OutOfCombat -> Engaging -> InCombat -> (Evading | Disengaging) -> OutOfCombat
//! ```

use super::context::CombatContext;
use super::log::CombatLogEntry;
use super::threat::{clear_hostile_references, clear_threat_table, engage};
use super::world::World;
use crate::participant::{CastKind, CombatPhase};
use crate::types::{
    DynamicFlags, ParticipantId, UnitFlags, UnitKind, UnitState, WeaponAttackType,
};

/// Drop a pending next-swing ability
pub fn interrupt_melee_spell(world: &mut World, id: ParticipantId) {
    if let Some(p) = world.get_mut(id) {
        if matches!(p.current_spell, Some(s) if s.kind == CastKind::Melee) {
            p.current_spell = None;
        }
    }
}

/// Cancel a cast or channel in progress
pub fn interrupt_non_melee_spells(world: &mut World, id: ParticipantId) {
    if let Some(p) = world.get_mut(id) {
        if p.is_casting() {
            tracing::debug!(participant = %id, "cast interrupted");
            p.current_spell = None;
        }
    }
}

/// Start attacking `victim`; returns false when the attack is not allowed
pub fn attack(
    world: &mut World,
    ctx: &mut CombatContext,
    attacker: ParticipantId,
    victim: ParticipantId,
    melee: bool,
) -> bool {
    if attacker == victim {
        return false;
    }
    let (Some(a), Some(v)) = (world.get(attacker), world.get(victim)) else {
        return false;
    };
    if !a.is_alive() || !v.is_alive() || !a.in_world || !v.in_world {
        return false;
    }
    if a.kind == UnitKind::Player && a.state.contains(UnitState::MOUNTED) {
        return false;
    }
    if melee && a.flags.intersects(UnitFlags::PACIFIED | UnitFlags::DISABLE_ATTACK) {
        return false;
    }
    if v.is_game_master() || v.is_evading() {
        return false;
    }

    let previous = a.attacking;
    let melee_started = a.state.contains(UnitState::MELEE_ATTACKING);
    let victim_owner = v.owner;

    // Same target: only a switch between melee and ranged counts
    if previous == Some(victim) {
        if melee == melee_started {
            return false;
        }
        if let Some(a) = world.get_mut(attacker) {
            a.state.set(UnitState::MELEE_ATTACKING, melee);
        }
        engage(world, attacker, victim);
        return true;
    }

    if let Some(old) = previous {
        if let Some(o) = world.get_mut(old) {
            o.attackers.remove(&attacker);
        }
        interrupt_melee_spell(world, attacker);
    }

    if let Some(a) = world.get_mut(attacker) {
        a.attacking = Some(victim);
        a.state.set(UnitState::MELEE_ATTACKING, melee);
        if a.phase == CombatPhase::OutOfCombat || a.phase == CombatPhase::Disengaging {
            a.phase = CombatPhase::Engaging;
        }
        if a.has_offhand_weapon() {
            a.reset_attack_timer(WeaponAttackType::OffAttack);
        }
    }
    if let Some(v) = world.get_mut(victim) {
        v.attackers.insert(attacker);
    }

    engage(world, attacker, victim);
    if let Some(owner) = victim_owner {
        engage(world, attacker, owner);
    }

    world.with_ai(attacker, |ai| ai.attack_start(victim));
    ctx.emit(CombatLogEntry::AttackStart { attacker, victim });
    tracing::debug!(attacker = %attacker, victim = %victim, "attack started");
    true
}

/// Stop attacking the current target; returns false when there was none
pub fn attack_stop(world: &mut World, ctx: &mut CombatContext, attacker: ParticipantId) -> bool {
    let Some(a) = world.get_mut(attacker) else {
        return false;
    };
    let Some(victim) = a.attacking.take() else {
        return false;
    };
    a.state.remove(UnitState::MELEE_ATTACKING);
    a.called_assistance = false;
    if a.is_in_combat() && a.phase != CombatPhase::Evading {
        a.phase = CombatPhase::Disengaging;
    } else if a.phase == CombatPhase::Engaging {
        a.phase = CombatPhase::OutOfCombat;
    }

    if let Some(v) = world.get_mut(victim) {
        v.attackers.remove(&attacker);
    }
    interrupt_melee_spell(world, attacker);

    ctx.emit(CombatLogEntry::AttackStop { attacker, victim });
    true
}

/// Stop everyone attacking `victim`
///
/// Entries whose attacker no longer targets `victim` are removed directly so
/// the attacker set always ends up empty.
pub fn remove_all_attackers(world: &mut World, ctx: &mut CombatContext, victim: ParticipantId) {
    loop {
        let Some(attacker) = world.get(victim).and_then(|v| v.attackers.first().copied()) else {
            return;
        };

        let targets_victim = world
            .get(attacker)
            .is_some_and(|a| a.attacking == Some(victim));
        if !targets_victim || !attack_stop(world, ctx, attacker) {
            tracing::warn!(
                victim = %victim,
                attacker = %attacker,
                "stale attacker entry without matching engagement, removing"
            );
        }
        if let Some(v) = world.get_mut(victim) {
            v.attackers.remove(&attacker);
        }
    }
}

/// Both sides of a hostile action enter combat with each other
pub fn combat_start(
    world: &mut World,
    ctx: &mut CombatContext,
    attacker: ParticipantId,
    victim: ParticipantId,
) {
    let Some(v) = world.get(victim) else {
        return;
    };
    if !v.is_in_combat() && !v.is_player_controlled() && v.attacking.is_none() {
        attack(world, ctx, victim, attacker, true);
    }

    set_in_combat_with(world, ctx, attacker, victim);
    set_in_combat_with(world, ctx, victim, attacker);
}

/// Enter combat with `enemy`, choosing the PvP timer when the enemy side is
/// flagged for PvP or is our duel opponent
pub fn set_in_combat_with(
    world: &mut World,
    ctx: &mut CombatContext,
    me: ParticipantId,
    enemy: ParticipantId,
) {
    let enemy_owner = world.owner_or_self(enemy);
    let my_owner = world.owner_or_self(me);
    let pvp = match world.get(enemy_owner) {
        Some(o) if o.flags.contains(UnitFlags::PVP) => true,
        Some(o) if o.is_player() => o.duel.is_some_and(|d| d.opponent == my_owner),
        _ => false,
    };
    set_in_combat_state(world, ctx, me, pvp, enemy);
}

pub fn set_in_combat_state(
    world: &mut World,
    ctx: &mut CombatContext,
    id: ParticipantId,
    pvp: bool,
    enemy: ParticipantId,
) {
    let pvp_timer = ctx.constants.combat.pvp_timer_ms;
    let Some(p) = world.get_mut(id) else {
        return;
    };
    if !p.is_alive() {
        return;
    }
    if pvp {
        p.combat_timer = pvp_timer;
    }
    if p.is_evading() {
        return;
    }
    if p.is_in_combat() {
        if p.phase != CombatPhase::InCombat {
            p.phase = CombatPhase::InCombat;
        }
        return;
    }

    p.flags.insert(UnitFlags::IN_COMBAT);
    p.phase = CombatPhase::InCombat;
    if p.traits.is_pet {
        p.flags.insert(UnitFlags::PET_IN_COMBAT);
    }
    if !p.is_player_controlled() {
        p.flags.remove(UnitFlags::IMMUNE_TO_PC);
    }
    let minions = p.minions.clone();

    world.with_ai(id, |ai| ai.enter_combat(enemy));
    ctx.emit(CombatLogEntry::EnterCombat { participant: id });

    for minion in minions {
        set_in_combat_state(world, ctx, minion, pvp, enemy);
    }
}

/// Leave combat: reset timers and restore flags
pub fn clear_in_combat(world: &mut World, ctx: &mut CombatContext, id: ParticipantId) {
    let owner_speed = world
        .get(id)
        .and_then(|p| p.owner)
        .and_then(|o| world.get(o))
        .map(|o| o.speed_rate);

    let Some(p) = world.get_mut(id) else {
        return;
    };
    let was_in_combat = p.is_in_combat();
    p.combat_timer = 0;
    p.flags.remove(UnitFlags::IN_COMBAT | UnitFlags::PET_IN_COMBAT);
    if p.phase != CombatPhase::Evading {
        p.phase = CombatPhase::OutOfCombat;
    }

    if !p.is_player_controlled() && p.dynamic_flags.contains(DynamicFlags::TAPPED) {
        p.dynamic_flags = p.base_dynamic_flags;
    }
    if p.traits.is_pet {
        if let Some(speed) = owner_speed {
            if speed > p.speed_rate {
                p.speed_rate = speed;
            }
        }
    }
    let is_player = p.is_player();

    if is_player {
        world.with_ai(id, |ai| ai.combat_exit());
    }
    if was_in_combat {
        ctx.emit(CombatLogEntry::LeaveCombat { participant: id });
    }
}

/// Stop attacking, drop all attackers and leave combat
pub fn combat_stop(world: &mut World, ctx: &mut CombatContext, id: ParticipantId, include_cast: bool) {
    if include_cast {
        interrupt_non_melee_spells(world, id);
    }
    attack_stop(world, ctx, id);
    remove_all_attackers(world, ctx, id);
    clear_in_combat(world, ctx, id);
}

/// Drop combat and walk home; only units that evade do anything
pub fn enter_evade_mode(world: &mut World, ctx: &mut CombatContext, id: ParticipantId) {
    let evade_for = ctx.constants.combat.evade_duration_ms;
    let now = ctx.now;
    match world.get(id) {
        Some(p) if p.traits.evades && p.is_alive() && !p.is_evading() => {}
        _ => return,
    }

    clear_threat_table(world, id);
    clear_hostile_references(world, id);
    combat_stop(world, ctx, id, true);

    if let Some(p) = world.get_mut(id) {
        p.state.insert(UnitState::EVADE);
        p.phase = CombatPhase::Evading;
        p.evade_until = Some(now + evade_for);
        let max = p.max_health;
        p.set_health(max);
        p.loot = Default::default();
        p.loot.player_damage_req = max / 2;
    }
    world.with_ai(id, |ai| ai.enter_evade_mode());
    ctx.emit(CombatLogEntry::Evade { participant: id });
    tracing::debug!(participant = %id, "entered evade mode");
}

/// Finish an evade whose timer has run out
pub fn finish_evade(world: &mut World, id: ParticipantId, now: u64) {
    if let Some(p) = world.get_mut(id) {
        if p.evade_until.is_some_and(|t| now >= t) {
            p.evade_until = None;
            p.state.remove(UnitState::EVADE);
            p.phase = CombatPhase::OutOfCombat;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CombatConstants;
    use crate::participant::{CastingSpell, CombatParticipant, DuelInfo};

    fn setup() -> (World, CombatContext, ParticipantId, ParticipantId) {
        let mut world = World::new();
        let hero = world.spawn(CombatParticipant::new(ParticipantId(1), "Hero", UnitKind::Player, 10));
        let wolf = world.spawn(CombatParticipant::new(ParticipantId(2), "Wolf", UnitKind::Creature, 10));
        (world, CombatContext::new(CombatConstants::default(), 9), hero, wolf)
    }

    #[test]
    fn test_attack_self_rejected() {
        let (mut world, mut ctx, hero, _) = setup();
        assert!(!attack(&mut world, &mut ctx, hero, hero, true));
    }

    #[test]
    fn test_attack_links_and_engages() {
        let (mut world, mut ctx, hero, wolf) = setup();
        assert!(attack(&mut world, &mut ctx, hero, wolf, true));

        let h = world.get(hero).unwrap();
        assert_eq!(h.attacking, Some(wolf));
        assert_eq!(h.phase, CombatPhase::Engaging);
        assert!(h.state.contains(UnitState::MELEE_ATTACKING));
        assert!(world.get(wolf).unwrap().attackers.contains(&hero));
        // Zero-threat engagement on the creature's table
        assert_eq!(world.get(wolf).unwrap().threat.get(hero), Some(0.0));

        // Repeating the same melee attack is not a new attack
        assert!(!attack(&mut world, &mut ctx, hero, wolf, true));
    }

    #[test]
    fn test_same_target_melee_toggle() {
        let (mut world, mut ctx, hero, wolf) = setup();
        assert!(attack(&mut world, &mut ctx, hero, wolf, true));
        clear_threat_table(&mut world, wolf);

        // Dropping to ranged on the same target stops auto-attack and re-engages
        assert!(attack(&mut world, &mut ctx, hero, wolf, false));
        let h = world.get(hero).unwrap();
        assert_eq!(h.attacking, Some(wolf));
        assert!(!h.state.contains(UnitState::MELEE_ATTACKING));
        assert_eq!(world.get(wolf).unwrap().threat.get(hero), Some(0.0));

        assert!(!attack(&mut world, &mut ctx, hero, wolf, false));
        assert!(attack(&mut world, &mut ctx, hero, wolf, true));
        assert!(world.get(hero).unwrap().state.contains(UnitState::MELEE_ATTACKING));
        assert_eq!(world.get(wolf).unwrap().attackers.len(), 1);
    }

    #[test]
    fn test_attack_rejects_gm_and_pacified() {
        let (mut world, mut ctx, hero, wolf) = setup();
        world.get_mut(wolf).unwrap().flags.insert(UnitFlags::GAME_MASTER);
        assert!(!attack(&mut world, &mut ctx, hero, wolf, true));

        world.get_mut(wolf).unwrap().flags.remove(UnitFlags::GAME_MASTER);
        world.get_mut(hero).unwrap().flags.insert(UnitFlags::PACIFIED);
        assert!(!attack(&mut world, &mut ctx, hero, wolf, true));
        assert!(attack(&mut world, &mut ctx, hero, wolf, false));
    }

    #[test]
    fn test_mounted_player_cannot_attack() {
        let (mut world, mut ctx, hero, wolf) = setup();
        world.get_mut(hero).unwrap().state.insert(UnitState::MOUNTED);
        assert!(!attack(&mut world, &mut ctx, hero, wolf, true));
    }

    #[test]
    fn test_target_switch_interrupts_melee_spell() {
        let (mut world, mut ctx, hero, wolf) = setup();
        let boar = world.spawn(CombatParticipant::new(ParticipantId(3), "Boar", UnitKind::Creature, 10));
        attack(&mut world, &mut ctx, hero, wolf, true);
        world.get_mut(hero).unwrap().current_spell = Some(CastingSpell::new(78, CastKind::Melee, 0));

        assert!(attack(&mut world, &mut ctx, hero, boar, true));
        assert!(world.get(hero).unwrap().current_spell.is_none());
        assert!(!world.get(wolf).unwrap().attackers.contains(&hero));
    }

    #[test]
    fn test_attack_stop() {
        let (mut world, mut ctx, hero, wolf) = setup();
        assert!(!attack_stop(&mut world, &mut ctx, hero));
        attack(&mut world, &mut ctx, hero, wolf, true);
        assert!(attack_stop(&mut world, &mut ctx, hero));
        assert!(world.get(hero).unwrap().attacking.is_none());
        assert!(world.get(wolf).unwrap().attackers.is_empty());
    }

    #[test]
    fn test_remove_all_attackers_repairs_stale_entries() {
        let (mut world, mut ctx, hero, wolf) = setup();
        attack(&mut world, &mut ctx, hero, wolf, true);
        // Stale entry: id 9 never attacked
        world.get_mut(wolf).unwrap().attackers.insert(ParticipantId(9));

        remove_all_attackers(&mut world, &mut ctx, wolf);
        assert!(world.get(wolf).unwrap().attackers.is_empty());
        assert!(world.get(hero).unwrap().attacking.is_none());
    }

    #[test]
    fn test_combat_start_makes_creature_fight_back() {
        let (mut world, mut ctx, hero, wolf) = setup();
        attack(&mut world, &mut ctx, hero, wolf, true);
        combat_start(&mut world, &mut ctx, hero, wolf);

        let w = world.get(wolf).unwrap();
        assert!(w.is_in_combat());
        assert_eq!(w.attacking, Some(hero));
        assert_eq!(w.phase, CombatPhase::InCombat);
        assert!(world.get(hero).unwrap().is_in_combat());
        // PvE contact sets no decay timer
        assert_eq!(world.get(hero).unwrap().combat_timer, 0);
    }

    #[test]
    fn test_duel_contact_uses_pvp_timer() {
        let mut world = World::new();
        let a = world.spawn(CombatParticipant::new(ParticipantId(1), "A", UnitKind::Player, 10));
        let b = world.spawn(CombatParticipant::new(ParticipantId(2), "B", UnitKind::Player, 10));
        world.get_mut(a).unwrap().duel = Some(DuelInfo { opponent: b, mounted: false });
        world.get_mut(b).unwrap().duel = Some(DuelInfo { opponent: a, mounted: false });
        let mut ctx = CombatContext::new(CombatConstants::default(), 1);

        combat_start(&mut world, &mut ctx, a, b);
        assert_eq!(world.get(a).unwrap().combat_timer, 5500);
        assert_eq!(world.get(b).unwrap().combat_timer, 5500);
    }

    #[test]
    fn test_minions_enter_combat() {
        let (mut world, mut ctx, hero, wolf) = setup();
        let mut pet = CombatParticipant::new(ParticipantId(5), "Cat", UnitKind::Pet, 10);
        pet.owner = Some(hero);
        let pet = world.spawn(pet);
        world.get_mut(hero).unwrap().minions.push(pet);

        set_in_combat_state(&mut world, &mut ctx, hero, false, wolf);
        let p = world.get(pet).unwrap();
        assert!(p.is_in_combat());
        assert!(p.flags.contains(UnitFlags::PET_IN_COMBAT));
    }

    #[test]
    fn test_clear_in_combat_restores_flags_and_speed() {
        let (mut world, mut ctx, hero, wolf) = setup();
        {
            let w = world.get_mut(wolf).unwrap();
            w.flags.insert(UnitFlags::IN_COMBAT);
            w.dynamic_flags = DynamicFlags::TAPPED;
            w.base_dynamic_flags = DynamicFlags::empty();
        }
        clear_in_combat(&mut world, &mut ctx, wolf);
        let w = world.get(wolf).unwrap();
        assert!(!w.is_in_combat());
        assert!(w.dynamic_flags.is_empty());
        assert_eq!(w.phase, CombatPhase::OutOfCombat);

        let mut pet = CombatParticipant::new(ParticipantId(6), "Cat", UnitKind::Pet, 10);
        pet.owner = Some(hero);
        pet.speed_rate = 0.8;
        let pet = world.spawn(pet);
        world.get_mut(hero).unwrap().speed_rate = 1.3;
        clear_in_combat(&mut world, &mut ctx, pet);
        assert!((world.get(pet).unwrap().speed_rate - 1.3).abs() < f32::EPSILON);
    }

    #[test]
    fn test_evade_mode() {
        let (mut world, mut ctx, hero, wolf) = setup();
        attack(&mut world, &mut ctx, hero, wolf, true);
        combat_start(&mut world, &mut ctx, hero, wolf);
        world.get_mut(wolf).unwrap().modify_health(-50);

        enter_evade_mode(&mut world, &mut ctx, wolf);
        let w = world.get(wolf).unwrap();
        assert!(w.is_evading());
        assert_eq!(w.phase, CombatPhase::Evading);
        assert_eq!(w.health(), w.max_health);
        assert!(w.threat.is_empty());
        assert!(w.attackers.is_empty());
        assert!(!world.get(hero).unwrap().is_engaged());

        finish_evade(&mut world, wolf, ctx.now + 10_000);
        assert!(!world.get(wolf).unwrap().is_evading());
    }
}
