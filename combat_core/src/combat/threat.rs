//! Threat tables and hostile references
//!
//! A participant that tracks threat owns a [`ThreatTable`] of the units it
//! hates. Every unit listed there carries the table owner in its
//! `hostile_refs`, so either side can tear the link down.

use super::world::World;
use crate::effect::{sum_percent_modifiers, EffectKind};
use crate::types::{ParticipantId, SchoolMask, SpellInfo};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThreatEntry {
    /// Table owner
    pub owner: ParticipantId,
    pub target: ParticipantId,
    pub threat: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatTable {
    owner: ParticipantId,
    entries: Vec<ThreatEntry>,
}

impl ThreatTable {
    pub fn new(owner: ParticipantId) -> Self {
        ThreatTable {
            owner,
            entries: Vec::new(),
        }
    }

    /// Add threat against `target`, creating the entry if needed.
    /// Threat never goes below zero.
    pub fn add(&mut self, target: ParticipantId, amount: f32) {
        match self.entries.iter_mut().find(|e| e.target == target) {
            Some(entry) => entry.threat = (entry.threat + amount).max(0.0),
            None => self.entries.push(ThreatEntry {
                owner: self.owner,
                target,
                threat: amount.max(0.0),
            }),
        }
    }

    pub fn get(&self, target: ParticipantId) -> Option<f32> {
        self.entries
            .iter()
            .find(|e| e.target == target)
            .map(|e| e.threat)
    }

    pub fn contains(&self, target: ParticipantId) -> bool {
        self.entries.iter().any(|e| e.target == target)
    }

    pub fn remove(&mut self, target: ParticipantId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.target != target);
        self.entries.len() != before
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Highest threat; the earliest entry wins ties
    pub fn top(&self) -> Option<ParticipantId> {
        self.entries
            .iter()
            .fold(None::<&ThreatEntry>, |best, e| match best {
                Some(b) if b.threat >= e.threat => Some(b),
                _ => Some(e),
            })
            .map(|e| e.target)
    }

    pub fn targets(&self) -> Vec<ParticipantId> {
        self.entries.iter().map(|e| e.target).collect()
    }

    pub fn entries(&self) -> &[ThreatEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `target` may be placed on `owner`'s threat table
pub fn is_valid_threat_target(world: &World, owner: ParticipantId, target: ParticipantId) -> bool {
    if owner == target {
        return false;
    }
    let (Some(o), Some(t)) = (world.get(owner), world.get(target)) else {
        return false;
    };
    o.traits.tracks_threat
        && o.is_alive()
        && t.is_alive()
        && o.in_world
        && t.in_world
        && !t.is_game_master()
        && !o.is_evading()
}

fn link(world: &mut World, owner: ParticipantId, target: ParticipantId, amount: f32) {
    if let Some(o) = world.get_mut(owner) {
        o.threat.add(target, amount);
    }
    if let Some(t) = world.get_mut(target) {
        t.hostile_refs.insert(owner);
    }
}

/// Add threat caused by `target` to `owner`'s table
///
/// The amount is scaled by the target's threat modifiers for the first school
/// of the event, and part of positive threat may be redirected elsewhere.
pub fn add_threat(
    world: &mut World,
    owner: ParticipantId,
    target: ParticipantId,
    amount: f32,
    schools: SchoolMask,
    spell: Option<&SpellInfo>,
) {
    if !is_valid_threat_target(world, owner, target) {
        return;
    }
    let Some(t) = world.get(target) else {
        return;
    };

    let school = schools.first_school().mask();
    let mut threat = amount
        * sum_percent_modifiers(&t.effects, EffectKind::ModThreat, school, |e| {
            e.affects_spell(spell.map(|s| s.id))
        });

    if threat > 0.0 {
        if let Some(redirect) = t.threat_redirect {
            let moved = threat * redirect.pct.min(100) as f32 / 100.0;
            if is_valid_threat_target(world, owner, redirect.target) {
                threat -= moved;
                link(world, owner, redirect.target, moved);
            }
        }
    }

    tracing::debug!(owner = %owner, target = %target, threat, "threat added");
    link(world, owner, target, threat);
}

/// Put each side on the other's table with zero threat, where tables exist
pub fn engage(world: &mut World, a: ParticipantId, b: ParticipantId) {
    if is_valid_threat_target(world, a, b) {
        link(world, a, b, 0.0);
    }
    if is_valid_threat_target(world, b, a) {
        link(world, b, a, 0.0);
    }
}

/// Empty `owner`'s table and drop the back references
pub fn clear_threat_table(world: &mut World, owner: ParticipantId) {
    let targets = match world.get_mut(owner) {
        Some(o) => {
            let targets = o.threat.targets();
            o.threat.clear();
            targets
        }
        None => return,
    };
    for target in targets {
        if let Some(t) = world.get_mut(target) {
            t.hostile_refs.remove(&owner);
        }
    }
}

/// Remove `target` from every table it appears on
pub fn clear_hostile_references(world: &mut World, target: ParticipantId) {
    let owners: Vec<_> = match world.get_mut(target) {
        Some(t) => std::mem::take(&mut t.hostile_refs).into_iter().collect(),
        None => return,
    };
    for owner in owners {
        if let Some(o) = world.get_mut(owner) {
            o.threat.remove(target);
        }
    }
}

pub fn top_threat_target(world: &World, owner: ParticipantId) -> Option<ParticipantId> {
    world.get(owner)?.threat.top()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::Effect;
    use crate::participant::{CombatParticipant, ThreatRedirect};
    use crate::types::{UnitFlags, UnitKind};

    fn setup() -> (World, ParticipantId, ParticipantId, ParticipantId) {
        let mut world = World::new();
        let boss = world.spawn(CombatParticipant::new(ParticipantId(1), "Boss", UnitKind::Creature, 63));
        let tank = world.spawn(CombatParticipant::new(ParticipantId(2), "Tank", UnitKind::Player, 60));
        let healer = world.spawn(CombatParticipant::new(ParticipantId(3), "Healer", UnitKind::Player, 60));
        (world, boss, tank, healer)
    }

    #[test]
    fn test_table_top_and_ties() {
        let mut table = ThreatTable::new(ParticipantId(1));
        table.add(ParticipantId(2), 100.0);
        table.add(ParticipantId(3), 100.0);
        assert_eq!(table.top(), Some(ParticipantId(2)));
        table.add(ParticipantId(3), 1.0);
        assert_eq!(table.top(), Some(ParticipantId(3)));
        table.add(ParticipantId(3), -500.0);
        assert_eq!(table.get(ParticipantId(3)), Some(0.0));
    }

    #[test]
    fn test_add_threat_links_both_sides() {
        let (mut world, boss, tank, _) = setup();
        add_threat(&mut world, boss, tank, 50.0, SchoolMask::NORMAL, None);

        assert_eq!(world.get(boss).unwrap().threat.get(tank), Some(50.0));
        assert!(world.get(tank).unwrap().hostile_refs.contains(&boss));
    }

    #[test]
    fn test_players_keep_no_table() {
        let (mut world, boss, tank, _) = setup();
        add_threat(&mut world, tank, boss, 50.0, SchoolMask::NORMAL, None);
        assert!(world.get(tank).unwrap().threat.is_empty());
    }

    #[test]
    fn test_threat_modifier_and_gm() {
        let (mut world, boss, tank, healer) = setup();
        world
            .get_mut(tank)
            .unwrap()
            .effects
            .add(Effect::new(71, EffectKind::ModThreat, 30));
        add_threat(&mut world, boss, tank, 100.0, SchoolMask::NORMAL, None);
        assert!((world.get(boss).unwrap().threat.get(tank).unwrap() - 130.0).abs() < 1e-3);

        world.get_mut(healer).unwrap().flags.insert(UnitFlags::GAME_MASTER);
        add_threat(&mut world, boss, healer, 100.0, SchoolMask::NORMAL, None);
        assert!(!world.get(boss).unwrap().threat.contains(healer));
    }

    #[test]
    fn test_redirect_moves_share() {
        let (mut world, boss, tank, healer) = setup();
        world.get_mut(healer).unwrap().threat_redirect = Some(ThreatRedirect { target: tank, pct: 40 });
        add_threat(&mut world, boss, healer, 100.0, SchoolMask::HOLY, None);

        let table = &world.get(boss).unwrap().threat;
        assert!((table.get(healer).unwrap() - 60.0).abs() < 1e-3);
        assert!((table.get(tank).unwrap() - 40.0).abs() < 1e-3);
    }

    #[test]
    fn test_engage_and_clear() {
        let (mut world, boss, tank, _) = setup();
        engage(&mut world, tank, boss);
        assert_eq!(world.get(boss).unwrap().threat.get(tank), Some(0.0));
        assert!(world.get(tank).unwrap().is_engaged());

        clear_hostile_references(&mut world, tank);
        assert!(world.get(boss).unwrap().threat.is_empty());
        assert!(world.get(tank).unwrap().hostile_refs.is_empty());

        engage(&mut world, tank, boss);
        clear_threat_table(&mut world, boss);
        assert!(!world.get(tank).unwrap().is_engaged());
    }
}
