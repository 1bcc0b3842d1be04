//! Combat participants
//!
//! A [`CombatParticipant`] is everything the engine needs to know about one
//! unit. Behavioral differences between players, creatures, pets and
//! vehicles are resolved once at spawn into [`CombatTraits`] and read as
//! plain data afterwards.

mod traits;

pub use traits::CombatTraits;

use crate::combat::{DiminishingTable, ThreatTable, UnitAi};
use crate::effect::EffectSet;
use crate::types::{
    DynamicFlags, ParticipantId, Position, PowerType, SchoolMask, SpellSchool, UnitFlags,
    UnitKind, UnitState, WeaponAttackType,
};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Per-participant combat state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatPhase {
    #[default]
    OutOfCombat,
    /// Attack issued, no combat exchange yet
    Engaging,
    InCombat,
    /// Returning home after losing all targets
    Evading,
    /// Stopped attacking, waiting for the combat timer
    Disengaging,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeathState {
    #[default]
    Alive,
    Dead,
}

/// Hit table inputs, as percentages unless stated otherwise
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CombatRatings {
    pub crit_pct: f32,
    pub spell_crit_pct: f32,
    pub hit_pct: f32,
    pub dodge_pct: f32,
    pub parry_pct: f32,
    pub block_pct: f32,
    /// Flat damage stopped by a block
    pub block_value: u32,
    /// Defense skill on top of the level baseline
    pub defense_bonus: u32,
    /// Weapon skill on top of the level baseline
    pub weapon_skill_bonus: u32,
    /// Each point removes 0.25% dodge and parry
    pub expertise: u32,
    pub armor_penetration_pct: f32,
    pub spell_penetration: i32,
}

/// Damage range and speed of one weapon slot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeaponProfile {
    pub min_damage: u32,
    pub max_damage: u32,
    /// Milliseconds between swings
    pub attack_time: u32,
    pub school_mask: SchoolMask,
}

impl WeaponProfile {
    pub fn new(min_damage: u32, max_damage: u32, attack_time: u32) -> Self {
        WeaponProfile {
            min_damage,
            max_damage: max_damage.max(min_damage),
            attack_time,
            school_mask: SchoolMask::NORMAL,
        }
    }

    pub fn unarmed() -> Self {
        WeaponProfile::new(1, 2, 2000)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuelInfo {
    pub opponent: ParticipantId,
    /// Fought from mounts or vehicles
    pub mounted: bool,
}

/// Creature loot tracking
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LootRights {
    pub recipient: Option<ParticipantId>,
    /// Player-caused damage still required before the kill is rewarded
    pub player_damage_req: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreatRedirect {
    pub target: ParticipantId,
    pub pct: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CastKind {
    Generic,
    Channeled,
    /// Next-swing ability, consumed by the following melee attack
    Melee,
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct CastInterrupt: u8 {
        const ABORT_ON_DAMAGE = 1 << 0;
        const PUSH_BACK       = 1 << 1;
        const CHANNEL_DELAY   = 1 << 2;
    }
}

/// Spell currently being cast or channelled
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CastingSpell {
    pub spell_id: u32,
    pub kind: CastKind,
    pub interrupt: CastInterrupt,
    /// Cast or channel time left
    pub remaining_ms: u32,
    pub duration_ms: u32,
    pub delays: u8,
}

impl CastingSpell {
    pub fn new(spell_id: u32, kind: CastKind, duration_ms: u32) -> Self {
        CastingSpell {
            spell_id,
            kind,
            interrupt: CastInterrupt::empty(),
            remaining_ms: duration_ms,
            duration_ms,
            delays: 0,
        }
    }

    pub fn with_interrupt(mut self, interrupt: CastInterrupt) -> Self {
        self.interrupt = interrupt;
        self
    }
}

/// Running totals kept for statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatStatistics {
    pub damage_done: u64,
    pub damage_taken: u64,
    pub highest_hit_dealt: u32,
    pub highest_hit_received: u32,
    pub killing_blows: u32,
    pub deaths: u32,
    pub durability_hits: u32,
}

#[derive(Debug)]
pub struct CombatParticipant {
    pub id: ParticipantId,
    pub name: String,
    pub kind: UnitKind,
    pub traits: CombatTraits,
    pub level: u8,

    health: u32,
    pub max_health: u32,
    powers: [u32; PowerType::COUNT],
    pub max_powers: [u32; PowerType::COUNT],
    pub power_type: PowerType,

    pub armor: i32,
    pub resistances: [i32; SpellSchool::COUNT],
    pub ratings: CombatRatings,
    pub weapons: [Option<WeaponProfile>; WeaponAttackType::COUNT],
    /// Milliseconds until each slot may swing again
    pub attack_timers: [u32; WeaponAttackType::COUNT],

    pub effects: EffectSet,
    pub state: UnitState,
    pub flags: UnitFlags,
    pub dynamic_flags: DynamicFlags,
    /// Dynamic flags restored when a tapped creature leaves combat
    pub base_dynamic_flags: DynamicFlags,
    pub position: Position,
    pub speed_rate: f32,
    pub in_world: bool,
    pub death_state: DeathState,

    pub phase: CombatPhase,
    /// PvP combat decay, milliseconds left
    pub combat_timer: u64,
    /// World time at which an evade completes
    pub evade_until: Option<u64>,
    pub attacking: Option<ParticipantId>,
    pub attackers: BTreeSet<ParticipantId>,
    pub threat: ThreatTable,
    /// Participants whose threat tables contain us
    pub hostile_refs: BTreeSet<ParticipantId>,
    pub threat_redirect: Option<ThreatRedirect>,
    /// AI has already called for help this engagement
    pub called_assistance: bool,

    pub duel: Option<DuelInfo>,
    pub owner: Option<ParticipantId>,
    pub minions: Vec<ParticipantId>,
    pub loot: LootRights,
    pub diminishing: DiminishingTable,
    pub current_spell: Option<CastingSpell>,
    pub ai: Option<Box<dyn UnitAi>>,
    pub stats: CombatStatistics,
    /// Equipment condition, percent
    pub durability: f32,
}

impl CombatParticipant {
    pub fn new(id: ParticipantId, name: impl Into<String>, kind: UnitKind, level: u8) -> Self {
        let traits = CombatTraits::for_kind(kind);
        let power_type = if kind == UnitKind::Player {
            PowerType::Rage
        } else {
            PowerType::Mana
        };
        let max_health = 100 + u32::from(level) * 50;

        CombatParticipant {
            id,
            name: name.into(),
            kind,
            traits,
            level,
            health: max_health,
            max_health,
            powers: [0; PowerType::COUNT],
            max_powers: [0, 1000, 100],
            power_type,
            armor: 0,
            resistances: [0; SpellSchool::COUNT],
            ratings: CombatRatings::default(),
            weapons: [Some(WeaponProfile::unarmed()), None, None],
            attack_timers: [0; WeaponAttackType::COUNT],
            effects: EffectSet::new(),
            state: UnitState::empty(),
            flags: UnitFlags::empty(),
            dynamic_flags: DynamicFlags::empty(),
            base_dynamic_flags: DynamicFlags::empty(),
            position: Position::default(),
            speed_rate: 1.0,
            in_world: true,
            death_state: DeathState::Alive,
            phase: CombatPhase::OutOfCombat,
            combat_timer: 0,
            evade_until: None,
            attacking: None,
            attackers: BTreeSet::new(),
            threat: ThreatTable::new(id),
            hostile_refs: BTreeSet::new(),
            threat_redirect: None,
            called_assistance: false,
            duel: None,
            owner: None,
            minions: Vec::new(),
            loot: LootRights {
                recipient: None,
                player_damage_req: max_health / 2,
            },
            diminishing: DiminishingTable::default(),
            current_spell: None,
            ai: None,
            stats: CombatStatistics::default(),
            durability: 100.0,
        }
    }

    pub fn with_health(mut self, health: u32) -> Self {
        self.max_health = health;
        self.health = health;
        self.loot.player_damage_req = health / 2;
        self
    }

    pub fn with_armor(mut self, armor: i32) -> Self {
        self.armor = armor;
        self
    }

    pub fn with_weapon(mut self, attack_type: WeaponAttackType, weapon: WeaponProfile) -> Self {
        self.weapons[attack_type.index()] = Some(weapon);
        self
    }

    pub fn with_ratings(mut self, ratings: CombatRatings) -> Self {
        self.ratings = ratings;
        self
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    pub fn with_ai(mut self, ai: Box<dyn UnitAi>) -> Self {
        self.ai = Some(ai);
        self
    }

    pub fn with_power(mut self, power: PowerType, max: u32, current: u32) -> Self {
        self.power_type = power;
        self.max_powers[power.index()] = max;
        self.powers[power.index()] = current.min(max);
        self
    }

    // === Health ===

    pub fn health(&self) -> u32 {
        self.health
    }

    pub fn is_alive(&self) -> bool {
        self.death_state == DeathState::Alive && self.health > 0
    }

    pub fn set_health(&mut self, health: u32) {
        self.health = health.min(self.max_health);
    }

    /// Apply a health delta clamped to `[0, max_health]`; returns the applied delta
    pub fn modify_health(&mut self, delta: i64) -> i64 {
        let before = i64::from(self.health);
        let after = (before + delta).clamp(0, i64::from(self.max_health));
        self.health = after as u32;
        after - before
    }

    // === Powers ===

    pub fn power(&self, power: PowerType) -> u32 {
        self.powers[power.index()]
    }

    pub fn max_power(&self, power: PowerType) -> u32 {
        self.max_powers[power.index()]
    }

    /// Apply a power delta clamped to the pool; returns the applied delta
    pub fn modify_power(&mut self, power: PowerType, delta: i32) -> i32 {
        let index = power.index();
        let before = i64::from(self.powers[index]);
        let after = (before + i64::from(delta)).clamp(0, i64::from(self.max_powers[index]));
        self.powers[index] = after as u32;
        (after - before) as i32
    }

    // === Stats ===

    pub fn resistance(&self, school: SpellSchool) -> i32 {
        if school == SpellSchool::Normal {
            self.armor
        } else {
            self.resistances[school.index()]
        }
    }

    pub fn weapon(&self, attack_type: WeaponAttackType) -> Option<&WeaponProfile> {
        self.weapons[attack_type.index()].as_ref()
    }

    pub fn attack_time(&self, attack_type: WeaponAttackType) -> u32 {
        self.weapon(attack_type)
            .map(|w| w.attack_time)
            .unwrap_or(2000)
    }

    pub fn has_offhand_weapon(&self) -> bool {
        self.weapons[WeaponAttackType::OffAttack.index()].is_some()
    }

    pub fn reset_attack_timer(&mut self, attack_type: WeaponAttackType) {
        self.attack_timers[attack_type.index()] = self.attack_time(attack_type);
    }

    pub fn weapon_skill(&self, skill_per_level: u32) -> u32 {
        u32::from(self.level) * skill_per_level + self.ratings.weapon_skill_bonus
    }

    pub fn defense_skill(&self, skill_per_level: u32) -> u32 {
        u32::from(self.level) * skill_per_level + self.ratings.defense_bonus
    }

    pub fn max_skill_for_level(&self, skill_per_level: u32) -> u32 {
        u32::from(self.level) * skill_per_level
    }

    // === State ===

    pub fn is_game_master(&self) -> bool {
        self.flags.contains(UnitFlags::GAME_MASTER)
    }

    pub fn is_in_combat(&self) -> bool {
        self.flags.contains(UnitFlags::IN_COMBAT)
    }

    pub fn is_evading(&self) -> bool {
        self.state.contains(UnitState::EVADE)
    }

    pub fn is_standing(&self) -> bool {
        !self.state.contains(UnitState::SITTING)
    }

    pub fn is_controlled(&self) -> bool {
        self.state.intersects(UnitState::CONTROLLED)
    }

    pub fn is_player(&self) -> bool {
        self.kind == UnitKind::Player
    }

    pub fn is_player_controlled(&self) -> bool {
        self.traits.player_controlled
    }

    /// Preparing a cast or channelling
    pub fn is_casting(&self) -> bool {
        matches!(
            self.current_spell,
            Some(CastingSpell {
                kind: CastKind::Generic | CastKind::Channeled,
                ..
            })
        )
    }

    /// Has a threat table entry or sits on someone else's
    pub fn is_engaged(&self) -> bool {
        !self.threat.is_empty() || !self.hostile_refs.is_empty()
    }

    pub fn owner_or_self(&self) -> ParticipantId {
        self.owner.unwrap_or(self.id)
    }

    pub fn distance_to(&self, other: &CombatParticipant) -> f32 {
        let dx = self.position.x - other.position.x;
        let dy = self.position.y - other.position.y;
        (dx * dx + dy * dy).sqrt()
    }
}
