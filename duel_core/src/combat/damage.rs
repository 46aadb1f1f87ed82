//! Damage and accuracy math
//!
//! The draw order here is a contract: defender miss, skill accuracy,
//! crit chance, crit multiplier, power, attack, defence, damage
//! re-randomization, status power factor. Hook handlers downstream react
//! to hit/crit flags and to the damage value, so reordering draws changes
//! observable behavior even though individual draws are random.

use rand::Rng;

use super::result::{format_dodge_line, format_hit_line, DamageOutcome};
use crate::rng::{accuracy_fails, chance, roll_scaled};
use crate::skill::Skill;
use crate::unit::UnitInstance;

/// Mitigation constant K in `K / (K + defence)`.
pub const MITIGATION_CONSTANT: f64 = 50.0;

/// Attack boosted by an active damage-bonus status.
pub(crate) fn effective_attack(unit: &UnitInstance) -> f64 {
    unit.attack + unit.damage_status.map_or(0.0, |s| s.magnitude)
}

/// Defence boosted by an active armor status.
pub(crate) fn effective_defence(unit: &UnitInstance) -> f64 {
    unit.defence + unit.armor_status.map_or(0.0, |s| s.magnitude)
}

/// Power-rate factor from an active weak (on the attacker) or strong
/// status; 1 when neither is present.
pub(crate) fn power_factor(unit: &UnitInstance) -> f64 {
    if let Some(weak) = unit.weak_status {
        weak.magnitude
    } else if let Some(strong) = unit.strong_status {
        strong.magnitude
    } else {
        1.0
    }
}

/// Resolve one damaging action. Does not apply the damage to the
/// defender (the caller does, after hook handlers had their say), but
/// life steal is applied to the attacker here.
pub fn calculate_damage(
    attacker: &mut UnitInstance,
    defender: &UnitInstance,
    skill: &Skill,
    is_passive: bool,
    rng: &mut impl Rng,
) -> DamageOutcome {
    if skill.power == 0.0 {
        return DamageOutcome::zero("no damage");
    }

    // Hit check: defender evasion first, then skill accuracy. Two
    // independent draws, short-circuited like the formula reads.
    let miss_rate = roll_scaled(defender.miss_rate, defender.random_rate, rng);
    if chance(miss_rate, rng) || accuracy_fails(skill.accuracy, rng) {
        return DamageOutcome::missed(format_dodge_line(defender, is_passive));
    }

    // Crit check: attacker's randomized rate or the skill's own rate.
    let critical_rate = roll_scaled(attacker.critical_rate, attacker.random_rate, rng);
    let critical_value = roll_scaled(attacker.critical_hurt_rate, attacker.random_rate, rng);
    let critical_hit = chance(critical_rate, rng) || chance(skill.critical_rate, rng);

    let power_part = roll_scaled(skill.power, attacker.random_rate, rng);
    let attack_part = roll_scaled(effective_attack(attacker), attacker.random_rate, rng);
    let attack_total = power_part + attack_part;

    let defence_part = roll_scaled(effective_defence(defender), defender.random_rate, rng);

    // Proportional mitigation; negative defence is treated as zero.
    let safe_defence = defence_part.max(0.0);
    let mitigation = MITIGATION_CONSTANT / (MITIGATION_CONSTANT + safe_defence);

    let mut damage = attack_total * mitigation;
    damage = damage.max(0.0);
    damage = roll_scaled(damage, attacker.random_rate, rng);
    damage *= roll_scaled(power_factor(attacker), attacker.random_rate, rng);
    if critical_hit {
        damage *= critical_value;
    }

    let mut healed = 0.0;
    if skill.suck_blood_rate > 0.0 {
        healed = damage * skill.suck_blood_rate;
        attacker.hp = (attacker.hp + healed).min(attacker.hp_count);
    }

    let description = format_hit_line(attacker, defender, damage, critical_hit, healed, is_passive);
    DamageOutcome {
        damage,
        is_missed: false,
        critical_hit,
        healed,
        description,
    }
}
