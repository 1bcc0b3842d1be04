//! Reduce matching effects to a single modifier value

use super::{Effect, EffectKind, EffectProvider};
use crate::types::SchoolMask;

/// Sum the amounts of every `kind` effect matching `schools` and `pred`.
/// Returns 0 when nothing matches.
pub fn sum_flat_modifiers<P, F>(provider: &P, kind: EffectKind, schools: SchoolMask, pred: F) -> i32
where
    P: EffectProvider + ?Sized,
    F: Fn(&Effect) -> bool,
{
    provider
        .active_effects(kind)
        .iter()
        .filter(|e| e.matches_schools(schools) && pred(e))
        .map(|e| e.amount)
        .sum()
}

/// Multiply every matching percent delta into a factor starting at 1.0
pub fn sum_percent_modifiers<P, F>(
    provider: &P,
    kind: EffectKind,
    schools: SchoolMask,
    pred: F,
) -> f32
where
    P: EffectProvider + ?Sized,
    F: Fn(&Effect) -> bool,
{
    provider
        .active_effects(kind)
        .iter()
        .filter(|e| e.matches_schools(schools) && pred(e))
        .fold(1.0, |acc, e| acc * (100.0 + e.amount as f32) / 100.0)
}

pub fn sum_flat_modifiers_for_spell<P: EffectProvider + ?Sized>(
    provider: &P,
    kind: EffectKind,
    schools: SchoolMask,
    spell_id: Option<u32>,
) -> i32 {
    sum_flat_modifiers(provider, kind, schools, |e| e.affects_spell(spell_id))
}

pub fn sum_percent_modifiers_for_spell<P: EffectProvider + ?Sized>(
    provider: &P,
    kind: EffectKind,
    schools: SchoolMask,
    spell_id: Option<u32>,
) -> f32 {
    sum_percent_modifiers(provider, kind, schools, |e| e.affects_spell(spell_id))
}

/// Largest matching amount, or 0
pub fn max_modifier<P, F>(provider: &P, kind: EffectKind, schools: SchoolMask, pred: F) -> i32
where
    P: EffectProvider + ?Sized,
    F: Fn(&Effect) -> bool,
{
    provider
        .active_effects(kind)
        .iter()
        .filter(|e| e.matches_schools(schools) && pred(e))
        .map(|e| e.amount)
        .max()
        .unwrap_or(0)
}

pub fn has_effect<P: EffectProvider + ?Sized>(
    provider: &P,
    kind: EffectKind,
    schools: SchoolMask,
) -> bool {
    provider
        .active_effects(kind)
        .iter()
        .any(|e| e.matches_schools(schools))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::EffectSet;
    use crate::types::ParticipantId;

    #[test]
    fn test_empty_set_identity() {
        let set = EffectSet::new();
        let flat = sum_flat_modifiers(&set, EffectKind::ModDamageDone, SchoolMask::NORMAL, |_| true);
        let pct =
            sum_percent_modifiers(&set, EffectKind::ModDamagePercentDone, SchoolMask::NORMAL, |_| true);

        assert_eq!(flat, 0);
        assert!((pct - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_percent_stacks_multiplicatively() {
        let mut set = EffectSet::new();
        set.add(Effect::new(1, EffectKind::ModDamagePercentDone, 10));
        set.add(Effect::new(2, EffectKind::ModDamagePercentDone, 20));

        let pct =
            sum_percent_modifiers(&set, EffectKind::ModDamagePercentDone, SchoolMask::NORMAL, |_| true);
        // 1.1 * 1.2
        assert!((pct - 1.32).abs() < 1e-5);
    }

    #[test]
    fn test_flat_respects_school_filter() {
        let mut set = EffectSet::new();
        set.add(Effect::new(1, EffectKind::ModDamageDone, 15).with_schools(SchoolMask::FIRE));
        set.add(Effect::new(2, EffectKind::ModDamageDone, 5));

        assert_eq!(
            sum_flat_modifiers(&set, EffectKind::ModDamageDone, SchoolMask::FIRE, |_| true),
            20
        );
        assert_eq!(
            sum_flat_modifiers(&set, EffectKind::ModDamageDone, SchoolMask::FROST, |_| true),
            5
        );
    }

    #[test]
    fn test_predicate_filters_by_caster() {
        let mut set = EffectSet::new();
        set.add(
            Effect::new(1, EffectKind::BypassArmorForCaster, 30).with_caster(ParticipantId(7)),
        );
        set.add(
            Effect::new(2, EffectKind::BypassArmorForCaster, 50).with_caster(ParticipantId(8)),
        );

        let from_seven = sum_flat_modifiers(
            &set,
            EffectKind::BypassArmorForCaster,
            SchoolMask::NORMAL,
            |e| e.caster == Some(ParticipantId(7)),
        );
        assert_eq!(from_seven, 30);
    }

    #[test]
    fn test_spell_restricted_modifier() {
        let mut set = EffectSet::new();
        set.add(Effect::new(1, EffectKind::ModDamageDone, 40).with_affected_spells(vec![133]));

        assert_eq!(
            sum_flat_modifiers_for_spell(&set, EffectKind::ModDamageDone, SchoolMask::FIRE, Some(133)),
            40
        );
        assert_eq!(
            sum_flat_modifiers_for_spell(&set, EffectKind::ModDamageDone, SchoolMask::FIRE, None),
            0
        );
    }

    #[test]
    fn test_max_modifier() {
        let mut set = EffectSet::new();
        set.add(Effect::new(1, EffectKind::ModTargetAbsorbSchool, 10));
        set.add(Effect::new(2, EffectKind::ModTargetAbsorbSchool, 25));

        assert_eq!(
            max_modifier(&set, EffectKind::ModTargetAbsorbSchool, SchoolMask::SHADOW, |_| true),
            25
        );
        assert!(has_effect(&set, EffectKind::ModTargetAbsorbSchool, SchoolMask::SHADOW));
    }
}
