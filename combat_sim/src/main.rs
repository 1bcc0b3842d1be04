//! Scripted encounter driver
//!
//! Runs a warrior and a mage against an ogre until someone dies and prints
//! the combat log as JSON lines. Pass a seed as the first argument to replay
//! an encounter.

use combat_core::combat::{attack, deal_damage, update_world, CombatContext, DamageEvent, World};
use combat_core::config::{load_constants, CombatConstants};
use combat_core::damage::deal_spell_damage;
use combat_core::effect::{Effect, EffectKind};
use combat_core::participant::{CombatParticipant, CombatRatings, WeaponProfile};
use combat_core::types::{
    DamageEffectType, ParticipantId, Position, SchoolMask, SpellInfo, UnitKind, WeaponAttackType,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::Path;

const CONSTANTS_PATH: &str = "combat_sim/config/constants.toml";
const TICK_MS: u32 = 100;
const MAX_TICKS: u32 = 1200;
const FIREBALL: u32 = 133;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let constants = match load_constants(Path::new(CONSTANTS_PATH)) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(path = CONSTANTS_PATH, error = %e, "using default combat constants");
            CombatConstants::default()
        }
    };

    let seed = std::env::args()
        .nth(1)
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or_else(rand::random);
    tracing::info!(seed, "starting encounter");

    let mut ctx = CombatContext::with_rng(constants, Box::new(ChaCha8Rng::seed_from_u64(seed)));
    let mut world = World::new();
    let (warrior, mage, ogre) = spawn_party(&mut world);

    attack(&mut world, &mut ctx, warrior, ogre, true);
    // Opening pull from range
    let fireball = SpellInfo::new(FIREBALL, SchoolMask::FIRE);
    deal_spell_damage(&mut world, &mut ctx, mage, ogre, &fireball, 180, false);

    let mut ticks = 0;
    while ticks < MAX_TICKS && alive(&world, ogre) && (alive(&world, warrior) || alive(&world, mage)) {
        update_world(&mut world, &mut ctx, TICK_MS);
        ticks += 1;

        // Mage casts every three seconds while standing
        if ticks % 30 == 0 && alive(&world, mage) && alive(&world, ogre) {
            deal_spell_damage(&mut world, &mut ctx, mage, ogre, &fireball, 150, false);
        }
        // Burning ground under the ogre
        if ticks % 20 == 0 && alive(&world, ogre) {
            let tick = DamageEvent::new(Some(mage), ogre, 12, DamageEffectType::Dot, SchoolMask::FIRE);
            deal_damage(&mut world, &mut ctx, tick);
        }
    }

    for entry in ctx.log.drain() {
        match entry.to_json() {
            Ok(line) => println!("{line}"),
            Err(e) => tracing::error!(error = %e, "failed to encode log entry"),
        }
    }

    for p in world.iter() {
        tracing::info!(
            name = %p.name,
            health = p.health(),
            max_health = p.max_health,
            damage_done = p.stats.damage_done,
            damage_taken = p.stats.damage_taken,
            "final state"
        );
    }
    tracing::info!(elapsed_ms = ctx.now, "encounter finished");
}

fn spawn_party(world: &mut World) -> (ParticipantId, ParticipantId, ParticipantId) {
    let mut warrior = CombatParticipant::new(ParticipantId(1), "Warrior", UnitKind::Player, 60)
        .with_armor(3200)
        .with_weapon(WeaponAttackType::BaseAttack, WeaponProfile::new(140, 210, 2600))
        .with_weapon(WeaponAttackType::OffAttack, WeaponProfile::new(70, 110, 1800))
        .with_ratings(CombatRatings {
            crit_pct: 18.0,
            hit_pct: 6.0,
            dodge_pct: 9.0,
            parry_pct: 7.0,
            block_pct: 5.0,
            block_value: 45,
            ..Default::default()
        });
    warrior
        .effects
        .add(Effect::new(17, EffectKind::SchoolAbsorb, 400).with_schools(SchoolMask::all()));

    let mage = CombatParticipant::new(ParticipantId(2), "Mage", UnitKind::Player, 60)
        .with_position(Position::new(-20.0, 0.0, 0.0))
        .with_ratings(CombatRatings {
            spell_crit_pct: 25.0,
            ..Default::default()
        });

    let ogre = CombatParticipant::new(ParticipantId(3), "Ogre Mauler", UnitKind::Creature, 62)
        .with_health(12_000)
        .with_armor(3600)
        .with_weapon(WeaponAttackType::BaseAttack, WeaponProfile::new(380, 520, 2400))
        .with_position(Position::new(2.0, 0.0, std::f32::consts::PI))
        .with_ratings(CombatRatings {
            dodge_pct: 5.0,
            parry_pct: 5.0,
            ..Default::default()
        });

    (world.spawn(warrior), world.spawn(mage), world.spawn(ogre))
}

fn alive(world: &World, id: ParticipantId) -> bool {
    world.get(id).is_some_and(|p| p.is_alive())
}
