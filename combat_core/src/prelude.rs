//! Prelude module for convenient imports
//!
//! ```rust
//! use combat_core::prelude::*;
//! ```

// Core types
pub use crate::participant::{CastKind, CastingSpell, CombatParticipant, CombatRatings, WeaponProfile};
pub use crate::types::{
    DamageEffectType, ParticipantId, Position, PowerType, SchoolMask, SpellAttributes, SpellInfo,
    SpellSchool, UnitFlags, UnitKind, UnitState, WeaponAttackType,
};

// Effects
pub use crate::effect::{Effect, EffectKind, EffectProvider, EffectSet, InterruptFlags};

// Damage system
pub use crate::damage::{calculate_melee_damage, deal_spell_damage, DamageLedger, HitInfo};
pub use crate::outcome::HitOutcome;

// Combat
pub use crate::combat::{
    attack, attack_stop, attacker_state_update, combat_stop, deal_damage, kill, update_world,
    CombatContext, CombatLogEntry, DamageEvent, World,
};

// Config
pub use crate::config::{load_constants, CombatConstants};
