//! Passive trigger evaluation

use rand::Rng;

use crate::skill::{Comparator, StatCondition, TriggerCondition};
use crate::unit::UnitInstance;

fn compare(cmp: Comparator, value: f64, threshold: f64) -> bool {
    match cmp {
        Comparator::Ge => value >= threshold,
        Comparator::Lt => value < threshold,
    }
}

fn stat_condition_holds(cmp: Comparator, cond: &StatCondition, unit: &UnitInstance) -> bool {
    let checks = [
        (cond.health, unit.hp),
        (cond.health_rate, unit.hp_ratio()),
        (cond.attack, unit.attack),
        (
            cond.attack_rate,
            if unit.attack_default != 0.0 {
                unit.attack / unit.attack_default
            } else {
                0.0
            },
        ),
        (cond.defence, unit.defence),
        (
            cond.defence_rate,
            if unit.defence_default != 0.0 {
                unit.defence / unit.defence_default
            } else {
                0.0
            },
        ),
    ];
    checks
        .iter()
        .all(|(threshold, value)| threshold.map_or(true, |t| compare(cmp, *value, t)))
}

/// Evaluate a passive's trigger. A passive without a condition never
/// fires; all present sub-checks must pass.
pub fn check_condition(
    condition: Option<&TriggerCondition>,
    unit: &UnitInstance,
    enemy: &UnitInstance,
    round: u32,
    rng: &mut impl Rng,
) -> bool {
    let cond = match condition {
        Some(c) => c,
        None => return false,
    };
    let cmp = cond.comparator;

    if let Some(self_cond) = &cond.self_condition {
        if !stat_condition_holds(cmp, self_cond, unit) {
            return false;
        }
    }
    if let Some(enemy_cond) = &cond.enemy_condition {
        if !stat_condition_holds(cmp, enemy_cond, enemy) {
            return false;
        }
    }
    if let Some(min_round) = cond.round {
        if !compare(cmp, round as f64, min_round as f64) {
            return false;
        }
    }
    if let Some(interval) = cond.interval {
        if interval > 1 && round % interval != 1 {
            return false;
        }
    }
    if let Some(dice) = cond.dice {
        let draw = rng.gen::<f64>();
        let hit = match cmp {
            Comparator::Lt => draw < dice,
            Comparator::Ge => draw >= dice,
        };
        if !hit {
            return false;
        }
    }
    true
}
