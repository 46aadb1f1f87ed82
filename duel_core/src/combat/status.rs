//! Status infliction and the end-of-round tick
//!
//! Weak lands on the defender and cancels against an existing
//! empowerment; strong, armor, and damage bonus land on the attacker.
//! A status nominally lasting N rounds is stored with N + 1 so it
//! survives the tick of the round it was applied in.

use rand::Rng;

use crate::logs::CombatLogs;
use crate::rng::{accuracy_fails, chance};
use crate::skill::{Skill, StatusKind};
use crate::unit::{StatusSlot, UnitInstance};

/// Outcome of applying a skill's status list.
#[derive(Debug, Clone, Default)]
pub struct StatusOutcome {
    /// True when the defender dodged a weak application outright.
    pub is_missed: bool,
    pub lines: Vec<String>,
}

fn status_label(kind: StatusKind) -> &'static str {
    match kind {
        StatusKind::Weak => "weakness",
        StatusKind::Strong => "empowerment",
        StatusKind::Armor => "armor",
        StatusKind::Damage => "damage bonus",
    }
}

fn install_line(unit: &UnitInstance, kind: StatusKind, rounds: i32) -> String {
    format!(
        "{}'s {} gained {} for {} rounds",
        unit.owner,
        unit.name,
        status_label(kind),
        rounds
    )
}

/// Subtract a freshly drawn status against the opposing slot already on
/// the target. Returns the rounds left to install, or zero when fully
/// cancelled.
fn cancel_against(opposite: &mut Option<StatusSlot>, new_rounds: i32) -> i32 {
    match opposite {
        Some(slot) if slot.rounds >= new_rounds => {
            slot.rounds -= new_rounds;
            if slot.rounds <= 0 {
                *opposite = None;
            }
            0
        }
        Some(slot) => {
            let remainder = new_rounds - slot.rounds;
            *opposite = None;
            remainder
        }
        None => new_rounds,
    }
}

/// Apply a skill's status list. One accuracy draw gates the whole list;
/// a weak entry additionally rolls the defender's evasion and aborts the
/// rest of the list on a dodge.
pub fn apply_status(
    attacker: &mut UnitInstance,
    defender: &mut UnitInstance,
    skill: &Skill,
    rng: &mut impl Rng,
) -> StatusOutcome {
    let mut outcome = StatusOutcome::default();
    if skill.put_status.is_empty() {
        return outcome;
    }
    if accuracy_fails(skill.accuracy, rng) {
        outcome.lines.push(format!(
            "{}'s {} failed to take effect",
            attacker.owner, skill.name
        ));
        return outcome;
    }

    for status in &skill.put_status {
        let stored_rounds = status.rounds + 1;
        match status.kind {
            StatusKind::Weak => {
                // One raw draw against the evasion rate, unscaled by the
                // defender's random range.
                if chance(defender.miss_rate, rng) {
                    outcome.is_missed = true;
                    outcome.lines.push(format!(
                        "{}'s {} dodged the weakness",
                        defender.owner, defender.name
                    ));
                    return outcome;
                }
                let rounds = cancel_against(&mut defender.strong_status, stored_rounds);
                if rounds == 0 {
                    outcome.lines.push(format!(
                        "{}'s {} shrugged off the weakness",
                        defender.owner, defender.name
                    ));
                } else {
                    defender.weak_status = Some(StatusSlot {
                        rounds,
                        magnitude: status.rate,
                    });
                    outcome
                        .lines
                        .push(install_line(defender, StatusKind::Weak, status.rounds));
                }
            }
            StatusKind::Strong => {
                let rounds = cancel_against(&mut attacker.weak_status, stored_rounds);
                if rounds == 0 {
                    outcome.lines.push(format!(
                        "{}'s {} broke free of the weakness",
                        attacker.owner, attacker.name
                    ));
                } else {
                    attacker.strong_status = Some(StatusSlot {
                        rounds,
                        magnitude: status.rate,
                    });
                    outcome
                        .lines
                        .push(install_line(attacker, StatusKind::Strong, status.rounds));
                }
            }
            StatusKind::Armor => {
                attacker.armor_status = Some(StatusSlot {
                    rounds: stored_rounds,
                    magnitude: status.value,
                });
                outcome
                    .lines
                    .push(install_line(attacker, StatusKind::Armor, status.rounds));
            }
            StatusKind::Damage => {
                attacker.damage_status = Some(StatusSlot {
                    rounds: stored_rounds,
                    magnitude: status.value,
                });
                outcome
                    .lines
                    .push(install_line(attacker, StatusKind::Damage, status.rounds));
            }
        }
    }
    outcome
}

fn tick_slot(
    slot: &mut Option<StatusSlot>,
    kind: StatusKind,
    owner: &str,
    name: &str,
    logs: &mut CombatLogs,
) {
    if let Some(status) = slot {
        status.rounds -= 1;
        if status.rounds <= 0 {
            *slot = None;
            logs.log(format!(
                "{}'s {} shook off {}",
                owner,
                name,
                status_label(kind)
            ));
        }
    }
}

/// End-of-round tick for every unit: stun and status slots count down,
/// expirations are announced in the main log.
pub fn reduce_round(units: &mut [&mut UnitInstance], logs: &mut CombatLogs) {
    for unit in units.iter_mut() {
        if unit.stop_round > 0 {
            unit.stop_round -= 1;
            if unit.stop_round == 0 {
                logs.log(format!("{}'s {} recovered from the stun", unit.owner, unit.name));
            }
        }
        let owner = unit.owner.clone();
        let name = unit.name.clone();
        tick_slot(&mut unit.weak_status, StatusKind::Weak, &owner, &name, logs);
        tick_slot(&mut unit.strong_status, StatusKind::Strong, &owner, &name, logs);
        tick_slot(&mut unit.armor_status, StatusKind::Armor, &owner, &name, logs);
        tick_slot(&mut unit.damage_status, StatusKind::Damage, &owner, &name, logs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::tests::test_unit;
    use crate::skill::StatusApply;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn status_skill(statuses: Vec<StatusApply>) -> Skill {
        Skill {
            id: 4,
            name: "Hex".to_string(),
            description: String::new(),
            power: 0.0,
            suck_blood_rate: 0.0,
            put_status: statuses,
            change_value: vec![],
            accuracy: 1.0,
            critical_rate: 0.0,
            hidden: false,
        }
    }

    #[test]
    fn weak_lands_on_defender_with_extra_round() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut attacker = test_unit("Mage", "player");
        let mut defender = test_unit("Warrior", "rival");
        let skill = status_skill(vec![StatusApply {
            kind: StatusKind::Weak,
            rounds: 2,
            rate: 0.7,
            value: 0.0,
        }]);
        let outcome = apply_status(&mut attacker, &mut defender, &skill, &mut rng);
        assert!(!outcome.is_missed);
        let weak = defender.weak_status.unwrap();
        assert_eq!(weak.rounds, 3);
        assert_eq!(weak.magnitude, 0.7);
    }

    #[test]
    fn strong_cancels_existing_weak_round_for_round() {
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let mut attacker = test_unit("Mage", "player");
        let mut defender = test_unit("Warrior", "rival");
        attacker.weak_status = Some(StatusSlot {
            rounds: 5,
            magnitude: 0.7,
        });
        let skill = status_skill(vec![StatusApply {
            kind: StatusKind::Strong,
            rounds: 1,
            rate: 1.3,
            value: 0.0,
        }]);
        apply_status(&mut attacker, &mut defender, &skill, &mut rng);
        // 5 existing rounds minus 2 stored: weak survives shortened, no
        // empowerment installed.
        assert_eq!(attacker.weak_status.unwrap().rounds, 3);
        assert!(attacker.strong_status.is_none());
    }

    #[test]
    fn strong_overflow_installs_remainder() {
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let mut attacker = test_unit("Mage", "player");
        let mut defender = test_unit("Warrior", "rival");
        attacker.weak_status = Some(StatusSlot {
            rounds: 2,
            magnitude: 0.7,
        });
        let skill = status_skill(vec![StatusApply {
            kind: StatusKind::Strong,
            rounds: 4,
            rate: 1.3,
            value: 0.0,
        }]);
        apply_status(&mut attacker, &mut defender, &skill, &mut rng);
        assert!(attacker.weak_status.is_none());
        assert_eq!(attacker.strong_status.unwrap().rounds, 3);
    }

    #[test]
    fn armor_and_damage_land_on_attacker() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut attacker = test_unit("Mage", "player");
        let mut defender = test_unit("Warrior", "rival");
        let skill = status_skill(vec![
            StatusApply {
                kind: StatusKind::Armor,
                rounds: 3,
                rate: 0.0,
                value: 15.0,
            },
            StatusApply {
                kind: StatusKind::Damage,
                rounds: 3,
                rate: 0.0,
                value: 10.0,
            },
        ]);
        apply_status(&mut attacker, &mut defender, &skill, &mut rng);
        assert_eq!(attacker.armor_status.unwrap().magnitude, 15.0);
        assert_eq!(attacker.damage_status.unwrap().magnitude, 10.0);
        assert!(defender.armor_status.is_none());
    }

    #[test]
    fn dodged_weak_aborts_rest_of_list() {
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let mut attacker = test_unit("Mage", "player");
        let mut defender = test_unit("Warrior", "rival");
        defender.miss_rate = 1.0;
        let skill = status_skill(vec![
            StatusApply {
                kind: StatusKind::Weak,
                rounds: 2,
                rate: 0.7,
                value: 0.0,
            },
            StatusApply {
                kind: StatusKind::Armor,
                rounds: 2,
                rate: 0.0,
                value: 15.0,
            },
        ]);
        let outcome = apply_status(&mut attacker, &mut defender, &skill, &mut rng);
        assert!(outcome.is_missed);
        assert!(defender.weak_status.is_none());
        assert!(attacker.armor_status.is_none());
    }

    #[test]
    fn weak_dodge_ignores_the_random_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let mut attacker = test_unit("Mage", "player");
        let mut defender = test_unit("Warrior", "rival");
        defender.miss_rate = 1.0;
        defender.random_rate = crate::unit::RandomRange { low: 0.0, high: 0.0 };
        let skill = status_skill(vec![StatusApply {
            kind: StatusKind::Weak,
            rounds: 2,
            rate: 0.7,
            value: 0.0,
        }]);
        // A zeroed range must not zero the dodge chance.
        let outcome = apply_status(&mut attacker, &mut defender, &skill, &mut rng);
        assert!(outcome.is_missed);
        assert!(defender.weak_status.is_none());
    }

    #[test]
    fn reduce_round_expires_statuses_and_stun() {
        let mut logs = CombatLogs::new();
        let mut unit = test_unit("Warrior", "player");
        unit.stop_round = 1;
        unit.weak_status = Some(StatusSlot {
            rounds: 1,
            magnitude: 0.7,
        });
        unit.armor_status = Some(StatusSlot {
            rounds: 2,
            magnitude: 15.0,
        });
        reduce_round(&mut [&mut unit], &mut logs);
        assert_eq!(unit.stop_round, 0);
        assert!(unit.weak_status.is_none());
        assert_eq!(unit.armor_status.unwrap().rounds, 1);
        assert_eq!(logs.entries.len(), 2);
    }
}
