//! Core types shared across the combat engine

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable handle for a combat participant inside a [`World`](crate::combat::World)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ParticipantId(pub u32);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A single spell school
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpellSchool {
    Normal,
    Holy,
    Fire,
    Nature,
    Frost,
    Shadow,
    Arcane,
}

impl SpellSchool {
    pub const COUNT: usize = 7;

    /// Get all schools in index order
    pub fn all() -> &'static [SpellSchool] {
        &[
            SpellSchool::Normal,
            SpellSchool::Holy,
            SpellSchool::Fire,
            SpellSchool::Nature,
            SpellSchool::Frost,
            SpellSchool::Shadow,
            SpellSchool::Arcane,
        ]
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Map a raw school index to a school.
    ///
    /// # Panics
    /// Panics on an index with no school; that is a missing table entry.
    pub fn from_index(index: usize) -> SpellSchool {
        match index {
            0 => SpellSchool::Normal,
            1 => SpellSchool::Holy,
            2 => SpellSchool::Fire,
            3 => SpellSchool::Nature,
            4 => SpellSchool::Frost,
            5 => SpellSchool::Shadow,
            6 => SpellSchool::Arcane,
            _ => panic!("unmapped spell school index {index}"),
        }
    }

    pub fn mask(self) -> SchoolMask {
        SchoolMask::from_bits_truncate(1 << self.index())
    }
}

bitflags! {
    /// Set of spell schools carried by a damage event or an effect filter
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct SchoolMask: u8 {
        const NORMAL = 1 << 0;
        const HOLY   = 1 << 1;
        const FIRE   = 1 << 2;
        const NATURE = 1 << 3;
        const FROST  = 1 << 4;
        const SHADOW = 1 << 5;
        const ARCANE = 1 << 6;

        const MAGIC = Self::HOLY.bits() | Self::FIRE.bits() | Self::NATURE.bits()
            | Self::FROST.bits() | Self::SHADOW.bits() | Self::ARCANE.bits();
    }
}

impl SchoolMask {
    /// Lowest school present in the mask (Normal when empty)
    pub fn first_school(self) -> SpellSchool {
        SpellSchool::all()
            .iter()
            .copied()
            .find(|s| self.contains(s.mask()))
            .unwrap_or(SpellSchool::Normal)
    }

    pub fn schools(self) -> impl Iterator<Item = SpellSchool> {
        SpellSchool::all()
            .iter()
            .copied()
            .filter(move |s| self.contains(s.mask()))
    }

    pub fn has_magic(self) -> bool {
        self.intersects(SchoolMask::MAGIC)
    }
}

/// Which weapon slot an attack uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponAttackType {
    BaseAttack,
    OffAttack,
    RangedAttack,
}

impl WeaponAttackType {
    pub const COUNT: usize = 3;

    pub fn index(self) -> usize {
        self as usize
    }

    /// # Panics
    /// Panics on an index with no attack type.
    pub fn from_index(index: usize) -> WeaponAttackType {
        match index {
            0 => WeaponAttackType::BaseAttack,
            1 => WeaponAttackType::OffAttack,
            2 => WeaponAttackType::RangedAttack,
            _ => panic!("unmapped weapon attack type index {index}"),
        }
    }

    pub fn is_melee(self) -> bool {
        !matches!(self, WeaponAttackType::RangedAttack)
    }
}

/// How a damage event was delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageEffectType {
    /// Weapon swing
    Direct,
    SpellDirect,
    /// Periodic tick
    Dot,
    /// Bookkeeping transfer (shared damage); never mitigated again
    NoDamage,
}

/// Resource pools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerType {
    Mana,
    Rage,
    Energy,
}

impl PowerType {
    pub const COUNT: usize = 3;

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Broad participant variant, resolved once into [`CombatTraits`](crate::participant::CombatTraits)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    Player,
    Creature,
    Pet,
    Vehicle,
}

bitflags! {
    /// Transient runtime state of a participant
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct UnitState: u32 {
        const STUNNED         = 1 << 0;
        const CONFUSED        = 1 << 1;
        const FLEEING         = 1 << 2;
        const CHARMED         = 1 << 3;
        const EVADE           = 1 << 4;
        const MELEE_ATTACKING = 1 << 5;
        const IN_FLIGHT       = 1 << 6;
        const SITTING         = 1 << 7;
        const MOUNTED         = 1 << 8;

        const CONTROLLED = Self::STUNNED.bits() | Self::CONFUSED.bits()
            | Self::FLEEING.bits() | Self::CHARMED.bits();
    }
}

bitflags! {
    /// Persistent flags set by content or by combat bookkeeping
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct UnitFlags: u32 {
        const PACIFIED       = 1 << 0;
        const DISABLE_ATTACK = 1 << 1;
        const GAME_MASTER    = 1 << 2;
        const IN_COMBAT      = 1 << 3;
        const PET_IN_COMBAT  = 1 << 4;
        const IMMUNE_TO_PC   = 1 << 5;
        const PVP            = 1 << 6;
    }
}

bitflags! {
    /// Client-visible flags restored when combat ends
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct DynamicFlags: u8 {
        const LOOTABLE = 1 << 0;
        const TAPPED   = 1 << 1;
    }
}

bitflags! {
    /// Spell attributes the damage engine cares about
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct SpellAttributes: u32 {
        /// Never partially resisted
        const UNRESISTABLE = 1 << 0;
        /// Hits fully or not at all
        const BINARY = 1 << 1;
        /// Physical and magic school at once; the weaker of resist and armor counts
        const SCHOOLMASK_NORMAL_WITH_MAGIC = 1 << 2;
        const NO_PUSHBACK_ON_DAMAGE = 1 << 3;
        const DAMAGE_DOESNT_BREAK_AURAS = 1 << 4;
        const IGNORE_ARMOR = 1 << 5;
        const TREAT_AS_PERIODIC = 1 << 6;
    }
}

bitflags! {
    /// Events that trigger secondary effects
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct ProcFlags: u32 {
        const KILLED                  = 1 << 0;
        const KILL                    = 1 << 1;
        const DONE_MELEE_AUTO_ATTACK  = 1 << 2;
        const TAKEN_MELEE_AUTO_ATTACK = 1 << 3;
        const DONE_RANGED_AUTO_ATTACK = 1 << 4;
        const TAKEN_RANGED_AUTO_ATTACK = 1 << 5;
        const DONE_SPELL_MAGIC_DMG    = 1 << 6;
        const TAKEN_SPELL_MAGIC_DMG   = 1 << 7;
        const TAKEN_DAMAGE            = 1 << 8;
        const DONE_MAINHAND_ATTACK    = 1 << 9;
        const DONE_OFFHAND_ATTACK     = 1 << 10;
        const DEATH                   = 1 << 11;
    }
}

/// Minimal spell description consumed by the damage engine
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpellInfo {
    pub id: u32,
    pub school_mask: SchoolMask,
    pub attributes: SpellAttributes,
}

impl SpellInfo {
    pub fn new(id: u32, school_mask: SchoolMask) -> Self {
        SpellInfo {
            id,
            school_mask,
            attributes: SpellAttributes::empty(),
        }
    }

    pub fn with_attributes(mut self, attributes: SpellAttributes) -> Self {
        self.attributes |= attributes;
        self
    }

    pub fn has_attribute(&self, attribute: SpellAttributes) -> bool {
        self.attributes.contains(attribute)
    }
}

/// Planar position with facing, used only for arc checks
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    /// Facing in radians
    pub orientation: f32,
}

impl Position {
    pub fn new(x: f32, y: f32, orientation: f32) -> Self {
        Position { x, y, orientation }
    }

    /// Whether `other` lies within `arc` radians centred on our facing
    pub fn has_in_arc(&self, arc: f32, other: &Position) -> bool {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        if dx.abs() < f32::EPSILON && dy.abs() < f32::EPSILON {
            return true;
        }

        let tau = std::f32::consts::TAU;
        let angle = dy.atan2(dx).rem_euclid(tau);
        let mut delta = (angle - self.orientation.rem_euclid(tau)).rem_euclid(tau);
        if delta > std::f32::consts::PI {
            delta -= tau;
        }

        let half = arc / 2.0;
        delta >= -half && delta <= half
    }
}
