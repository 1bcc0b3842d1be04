//! combat_core - Damage resolution engine for game server combat
//!
//! This library provides:
//! - Melee outcome rolls: miss, dodge, parry, glancing, block, crit and crushing
//! - Damage calculation: weapon rolls, armor, resistances, absorbs and splits
//! - Damage application: threat, rage, spell pushback, duels and kills
//! - Combat state: attack start/stop, combat timers and evade mode
//! - Diminishing returns for crowd control durations

pub mod combat;
pub mod config;
pub mod damage;
pub mod defense;
pub mod effect;
pub mod outcome;
pub mod participant;
pub mod prelude;
pub mod types;

// Re-export core types for convenience
pub use combat::{
    attack, attack_stop, attacker_state_update, deal_damage, kill, update_world, CombatContext,
    CombatLogEntry, DamageEvent, World,
};
pub use config::{load_constants, CombatConstants, ConfigError};
pub use damage::{calculate_melee_damage, deal_spell_damage, CleanDamage, DamageLedger, HitInfo, MeleeDamageInfo};
pub use defense::{calc_absorb_resist, calc_armor_reduced_damage, calc_resisted_damage};
pub use effect::{Effect, EffectKind, EffectProvider, EffectSet};
pub use outcome::{roll_melee_outcome, HitOutcome};
pub use participant::{CombatParticipant, CombatTraits, WeaponProfile};
pub use types::{
    DamageEffectType, ParticipantId, SchoolMask, SpellInfo, SpellSchool, UnitKind, WeaponAttackType,
};
