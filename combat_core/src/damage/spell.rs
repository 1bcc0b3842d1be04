//! Spell damage - direct and periodic spell hits through the same pipeline

use super::bonus::{damage_bonus_done, damage_bonus_taken};
use super::ledger::{CleanDamage, DamageLedger, HitInfo};
use crate::combat::{combat_start, deal_damage, CombatContext, CombatLogEntry, DamageEvent, ProcEvent, World};
use crate::defense::{calc_absorb_resist, calc_armor_reduced_damage};
use crate::effect::{has_effect, sum_flat_modifiers_for_spell, sum_percent_modifiers, EffectKind};
use crate::outcome::HitOutcome;
use crate::types::{
    DamageEffectType, ParticipantId, ProcFlags, SchoolMask, SpellAttributes, SpellInfo, WeaponAttackType,
};

/// Hit `victim` with `base` damage from `spell`; returns the damage applied
///
/// Periodic ticks never crit and do not break direct-damage auras.
pub fn deal_spell_damage(
    world: &mut World,
    ctx: &mut CombatContext,
    caster: ParticipantId,
    victim: ParticipantId,
    spell: &SpellInfo,
    base: u32,
    periodic: bool,
) -> u32 {
    let (Some(c), Some(v)) = (world.get(caster), world.get(victim)) else {
        return 0;
    };
    if !v.is_alive() || !v.in_world || !c.in_world {
        return 0;
    }

    let schools = spell.school_mask;
    let periodic = periodic || spell.has_attribute(SpellAttributes::TREAT_AS_PERIODIC);
    let effect_type = if periodic {
        DamageEffectType::Dot
    } else {
        DamageEffectType::SpellDirect
    };

    if has_effect(&v.effects, EffectKind::SchoolImmunity, schools) {
        tracing::debug!(caster = %caster, victim = %victim, spell = spell.id, "spell immune");
        return 0;
    }

    let mut damage = damage_bonus_done(c, base, schools, Some(spell.id));
    damage = damage_bonus_taken(v, damage, schools, Some(spell.id));

    if schools.contains(SchoolMask::NORMAL) {
        damage = calc_armor_reduced_damage(c, v, damage, Some(spell), &ctx.constants);
    }

    let mut critical = false;
    if !periodic {
        let chance = c.ratings.spell_crit_pct
            + sum_flat_modifiers_for_spell(&c.effects, EffectKind::ModCritPercent, schools, Some(spell.id)) as f32;
        if ctx.roll_chance(chance) {
            critical = true;
            let bonus = sum_percent_modifiers(&c.effects, EffectKind::ModCritDamageBonus, schools, |e| {
                e.affects_spell(Some(spell.id))
            });
            damage = (damage as f32 * ctx.constants.outcome.spell_crit_multiplier * bonus).round() as u32;
        }
    }

    let mut ledger = DamageLedger::new(Some(caster), victim, damage, schools, effect_type).with_spell(*spell);
    if critical {
        ledger.hit_info |= HitInfo::CRITICAL_HIT;
    }

    if caster != victim {
        combat_start(world, ctx, caster, victim);
    }
    calc_absorb_resist(world, ctx, &mut ledger);

    ctx.emit(CombatLogEntry::SpellDamage {
        caster: Some(caster),
        victim,
        spell_id: spell.id,
        school_mask: schools,
        damage: ledger.remaining(),
        absorbed: ledger.absorbed(),
        resisted: ledger.resisted(),
        critical,
        periodic,
    });
    if schools.has_magic() {
        ctx.fire_proc(ProcEvent {
            actor: Some(caster),
            target: victim,
            actor_flags: ProcFlags::DONE_SPELL_MAGIC_DMG,
            target_flags: ProcFlags::TAKEN_SPELL_MAGIC_DMG | ProcFlags::TAKEN_DAMAGE,
            damage: ledger.remaining(),
            school_mask: schools,
        });
    }

    // Absorbed damage still counts as a hit for aura interrupts and rage
    let clean = CleanDamage::new(0, ledger.absorbed(), WeaponAttackType::BaseAttack, HitOutcome::Normal);
    let event = DamageEvent::new(Some(caster), victim, ledger.remaining(), effect_type, schools)
        .with_clean(clean)
        .with_spell(*spell)
        .with_durability_loss(!periodic);
    deal_damage(world, ctx, event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CombatConstants;
    use crate::effect::{Effect, InterruptFlags};
    use crate::participant::CombatParticipant;
    use crate::types::UnitKind;

    fn setup() -> (World, CombatContext, ParticipantId, ParticipantId) {
        let mut world = World::new();
        let mage = world.spawn(CombatParticipant::new(ParticipantId(1), "Mage", UnitKind::Player, 20));
        let kobold = world.spawn(
            CombatParticipant::new(ParticipantId(2), "Kobold", UnitKind::Creature, 20).with_health(1000),
        );
        (world, CombatContext::new(CombatConstants::default(), 8), mage, kobold)
    }

    #[test]
    fn test_unresisted_spell_hits_for_base() {
        let (mut world, mut ctx, mage, kobold) = setup();
        let bolt = SpellInfo::new(133, SchoolMask::FIRE);

        assert_eq!(deal_spell_damage(&mut world, &mut ctx, mage, kobold, &bolt, 100, false), 100);
        assert_eq!(world.get(kobold).unwrap().health(), 900);
        assert!(world.get(kobold).unwrap().is_in_combat());
        assert!(matches!(
            ctx.log.entries().last(),
            Some(CombatLogEntry::SpellDamage { damage: 100, periodic: false, .. })
        ));
    }

    #[test]
    fn test_guaranteed_crit() {
        let (mut world, mut ctx, mage, kobold) = setup();
        world.get_mut(mage).unwrap().ratings.spell_crit_pct = 100.0;
        let bolt = SpellInfo::new(116, SchoolMask::FROST);

        assert_eq!(deal_spell_damage(&mut world, &mut ctx, mage, kobold, &bolt, 100, false), 150);
    }

    #[test]
    fn test_periodic_never_crits() {
        let (mut world, mut ctx, mage, kobold) = setup();
        world.get_mut(mage).unwrap().ratings.spell_crit_pct = 100.0;
        let corruption = SpellInfo::new(172, SchoolMask::SHADOW);

        assert_eq!(deal_spell_damage(&mut world, &mut ctx, mage, kobold, &corruption, 40, true), 40);
    }

    #[test]
    fn test_spell_modifiers_and_absorb() {
        let (mut world, mut ctx, mage, kobold) = setup();
        world
            .get_mut(mage)
            .unwrap()
            .effects
            .add(Effect::new(11, EffectKind::ModDamagePercentDone, 20).with_schools(SchoolMask::FIRE));
        world
            .get_mut(kobold)
            .unwrap()
            .effects
            .add(Effect::new(543, EffectKind::SchoolAbsorb, 50).with_schools(SchoolMask::FIRE));
        let bolt = SpellInfo::new(133, SchoolMask::FIRE);

        assert_eq!(deal_spell_damage(&mut world, &mut ctx, mage, kobold, &bolt, 100, false), 70);
    }

    #[test]
    fn test_immune_victim() {
        let (mut world, mut ctx, mage, kobold) = setup();
        world
            .get_mut(kobold)
            .unwrap()
            .effects
            .add(Effect::new(642, EffectKind::SchoolImmunity, 0));
        let bolt = SpellInfo::new(133, SchoolMask::FIRE);
        assert_eq!(deal_spell_damage(&mut world, &mut ctx, mage, kobold, &bolt, 100, false), 0);
        assert_eq!(world.get(kobold).unwrap().health(), 1000);
    }

    #[test]
    fn test_fully_absorbed_spell_breaks_damage_auras() {
        let (mut world, mut ctx, mage, kobold) = setup();
        let k = world.get_mut(kobold).unwrap();
        k.effects
            .add(Effect::new(543, EffectKind::SchoolAbsorb, 500).with_schools(SchoolMask::FIRE));
        k.effects.add(
            Effect::new(118, EffectKind::ModDamagePercentTaken, 0)
                .with_interrupt_flags(InterruptFlags::TAKE_DAMAGE),
        );
        let bolt = SpellInfo::new(133, SchoolMask::FIRE);

        assert_eq!(deal_spell_damage(&mut world, &mut ctx, mage, kobold, &bolt, 100, false), 0);
        let k = world.get(kobold).unwrap();
        assert_eq!(k.health(), 1000);
        assert!(k.effects.iter().all(|e| e.spell_id != 118));
        assert!(k.effects.iter().any(|e| e.spell_id == 543 && e.amount == 400));
    }
}
