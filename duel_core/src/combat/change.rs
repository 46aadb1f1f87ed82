//! Attribute deltas carried by skills and passives
//!
//! Self entries add to the acting unit; opponent entries subtract and
//! are gated by the opponent's evasion. Every entry rolls the skill's
//! accuracy independently, so a long change list can partially land.

use rand::Rng;

use crate::rng::{accuracy_fails, chance, roll_scaled};
use crate::skill::Skill;
use crate::types::AttributeKey;
use crate::unit::{attribute_limits, clamp_attribute, UnitInstance};

fn limit_line(unit: &UnitInstance, attr: AttributeKey, upper: bool) -> String {
    format!(
        "{}'s {} {} reached the {} limit",
        unit.owner,
        unit.name,
        attr.label(),
        if upper { "upper" } else { "lower" }
    )
}

fn delta_line(unit: &UnitInstance, attr: AttributeKey, delta: f64) -> String {
    let verb = if delta >= 0.0 { "rose" } else { "fell" };
    format!(
        "{}'s {} {} {} by {:.2}",
        unit.owner,
        unit.name,
        attr.label(),
        verb,
        delta.abs()
    )
}

/// Apply a skill's change list; returns the log lines produced.
pub fn apply_change_value(
    attacker: &mut UnitInstance,
    defender: &mut UnitInstance,
    skill: &Skill,
    rng: &mut impl Rng,
) -> Vec<String> {
    let mut lines = Vec::new();

    for entry in &skill.change_value {
        if accuracy_fails(skill.accuracy, rng) {
            lines.push(format!(
                "{}'s {} failed to take effect",
                attacker.owner, skill.name
            ));
            continue;
        }
        if !entry.on_self {
            let miss = roll_scaled(defender.miss_rate, defender.random_rate, rng);
            if chance(miss, rng) {
                lines.push(format!(
                    "{}'s {} resisted the {}",
                    defender.owner, defender.name, skill.name
                ));
                continue;
            }
        }

        // Stun is integer rounds, additive both ways, no clamp table.
        if entry.attr == AttributeKey::StopRound {
            let rounds = entry.value as i32;
            let target = if entry.on_self {
                &mut *attacker
            } else {
                &mut *defender
            };
            target.stop_round += rounds;
            lines.push(format!(
                "{}'s {} was stunned for {} rounds",
                target.owner, target.name, rounds
            ));
            continue;
        }

        let amount = if entry.attr.is_rate() {
            entry.rate
        } else {
            entry.value
        };
        let delta = if entry.on_self { amount } else { -amount };
        let target = if entry.on_self {
            &mut *attacker
        } else {
            &mut *defender
        };
        let current = match target.attr(entry.attr) {
            Some(v) => v,
            None => continue,
        };
        let mut next = current + delta;

        match entry.attr {
            AttributeKey::Hp => {
                if next > target.hp_count {
                    next = target.hp_count;
                    lines.push(limit_line(target, AttributeKey::Hp, true));
                }
                if next < 0.0 {
                    next = 0.0;
                    lines.push(limit_line(target, AttributeKey::Hp, false));
                }
                target.hp = next;
            }
            AttributeKey::HpCount => {
                let clamped = clamp_attribute(AttributeKey::HpCount, next);
                if clamped > next {
                    lines.push(limit_line(target, AttributeKey::HpCount, false));
                }
                target.hp_count = clamped;
                // A shrunken maximum re-caps current hp without a log line.
                target.hp = target.hp.min(target.hp_count);
            }
            attr => {
                let clamped = clamp_attribute(attr, next);
                if clamped != next {
                    let (_, max) = attribute_limits(attr);
                    lines.push(limit_line(target, attr, Some(clamped) == max));
                }
                target.set_attr(attr, clamped);
            }
        }
        lines.push(delta_line(target, entry.attr, delta));
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::tests::test_unit;
    use crate::skill::ChangeValue;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn change_skill(changes: Vec<ChangeValue>) -> Skill {
        Skill {
            id: 6,
            name: "Rally".to_string(),
            description: String::new(),
            power: 0.0,
            suck_blood_rate: 0.0,
            put_status: vec![],
            change_value: changes,
            accuracy: 1.0,
            critical_rate: 0.0,
            hidden: false,
        }
    }

    #[test]
    fn self_entry_adds_and_clamps() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let mut attacker = test_unit("Mage", "player");
        let mut defender = test_unit("Warrior", "rival");
        attacker.attack = 95.0;
        let skill = change_skill(vec![ChangeValue {
            on_self: true,
            attr: AttributeKey::Attack,
            value: 20.0,
            rate: 0.0,
        }]);
        let lines = apply_change_value(&mut attacker, &mut defender, &skill, &mut rng);
        assert_eq!(attacker.attack, 100.0);
        assert!(lines.iter().any(|l| l.contains("upper limit")));
    }

    #[test]
    fn opponent_entry_subtracts() {
        let mut rng = ChaCha8Rng::seed_from_u64(10);
        let mut attacker = test_unit("Mage", "player");
        let mut defender = test_unit("Warrior", "rival");
        let skill = change_skill(vec![ChangeValue {
            on_self: false,
            attr: AttributeKey::Defence,
            value: 12.0,
            rate: 0.0,
        }]);
        apply_change_value(&mut attacker, &mut defender, &skill, &mut rng);
        assert_eq!(defender.defence, 18.0);
    }

    #[test]
    fn evasive_opponent_resists_entry() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut attacker = test_unit("Mage", "player");
        let mut defender = test_unit("Warrior", "rival");
        defender.miss_rate = 1.0;
        let skill = change_skill(vec![ChangeValue {
            on_self: false,
            attr: AttributeKey::Attack,
            value: 10.0,
            rate: 0.0,
        }]);
        let lines = apply_change_value(&mut attacker, &mut defender, &skill, &mut rng);
        assert_eq!(defender.attack, 30.0);
        assert!(lines.iter().any(|l| l.contains("resisted")));
    }

    #[test]
    fn rate_attr_reads_rate_field() {
        let mut rng = ChaCha8Rng::seed_from_u64(12);
        let mut attacker = test_unit("Mage", "player");
        let mut defender = test_unit("Warrior", "rival");
        let skill = change_skill(vec![ChangeValue {
            on_self: true,
            attr: AttributeKey::CriticalRate,
            value: 0.0,
            rate: 0.25,
        }]);
        apply_change_value(&mut attacker, &mut defender, &skill, &mut rng);
        assert!((attacker.critical_rate - 0.25).abs() < 1e-9);
    }

    #[test]
    fn hp_loss_stops_at_zero_with_limit_line() {
        let mut rng = ChaCha8Rng::seed_from_u64(13);
        let mut attacker = test_unit("Mage", "player");
        let mut defender = test_unit("Warrior", "rival");
        defender.hp = 40.0;
        let skill = change_skill(vec![ChangeValue {
            on_self: false,
            attr: AttributeKey::Hp,
            value: 100.0,
            rate: 0.0,
        }]);
        let lines = apply_change_value(&mut attacker, &mut defender, &skill, &mut rng);
        assert_eq!(defender.hp, 0.0);
        assert!(lines.iter().any(|l| l.contains("lower limit")));
    }

    #[test]
    fn shrinking_max_hp_recaps_current_hp() {
        let mut rng = ChaCha8Rng::seed_from_u64(14);
        let mut attacker = test_unit("Mage", "player");
        let mut defender = test_unit("Warrior", "rival");
        let skill = change_skill(vec![ChangeValue {
            on_self: true,
            attr: AttributeKey::HpCount,
            value: 200.0,
            rate: 0.0,
        }]);
        attacker.hp = 300.0;
        attacker.hp_count = 300.0;
        // Negative delta: model a drawback entry by subtracting via value.
        let drain = change_skill(vec![ChangeValue {
            on_self: true,
            attr: AttributeKey::HpCount,
            value: -150.0,
            rate: 0.0,
        }]);
        apply_change_value(&mut attacker, &mut defender, &drain, &mut rng);
        assert_eq!(attacker.hp_count, 150.0);
        assert_eq!(attacker.hp, 150.0);
        // And growth leaves hp untouched.
        apply_change_value(&mut attacker, &mut defender, &skill, &mut rng);
        assert_eq!(attacker.hp_count, 350.0);
        assert_eq!(attacker.hp, 150.0);
    }

    #[test]
    fn stun_entry_adds_stop_rounds() {
        let mut rng = ChaCha8Rng::seed_from_u64(15);
        let mut attacker = test_unit("Mage", "player");
        let mut defender = test_unit("Warrior", "rival");
        let skill = change_skill(vec![ChangeValue {
            on_self: false,
            attr: AttributeKey::StopRound,
            value: 2.0,
            rate: 0.0,
        }]);
        apply_change_value(&mut attacker, &mut defender, &skill, &mut rng);
        assert_eq!(defender.stop_round, 2);
    }
}
