//! Combat resolution - attack state, damage application and the world tick
//!
//! All participants live in a [`World`] and refer to each other by id.
//! Every operation takes the world and a [`CombatContext`] explicitly; the
//! context carries the constants, the random source, extension hooks and
//! the combat log.

mod apply;
mod context;
mod diminishing;
mod hooks;
mod log;
mod state;
mod threat;
mod update;
mod world;

pub use apply::{
    apply_spell_pushback, complete_duel, deal_damage, kill, rage_conversion, reward_rage, DamageEvent,
};
pub use context::CombatContext;
pub use diminishing::{
    apply_diminishing, apply_diminishing_to_duration, DiminishingGroup, DiminishingReturn,
    DiminishingTable, DiminishingType,
};
pub use hooks::{CombatScript, KillRewarder, ProcEvent, UnitAi};
pub use log::{CombatLog, CombatLogEntry, CombatLogSink};
pub use state::{
    attack, attack_stop, clear_in_combat, combat_start, combat_stop, enter_evade_mode, finish_evade,
    interrupt_melee_spell, interrupt_non_melee_spells, remove_all_attackers, set_in_combat_state,
    set_in_combat_with,
};
pub use threat::{
    add_threat, clear_hostile_references, clear_threat_table, engage, is_valid_threat_target,
    top_threat_target, ThreatEntry, ThreatTable,
};
pub use update::{apply_parry_haste, attacker_state_update, update_world};
pub use world::World;
