//! Resolution engine: damage, statuses, attribute deltas, passives,
//! round ticks, and turn order.

mod change;
mod damage;
mod passive;
mod resolve;
mod result;
mod status;

pub use change::apply_change_value;
pub use damage::{calculate_damage, MITIGATION_CONSTANT};
pub use passive::check_condition;
pub use resolve::{execute_skill, execute_strength, ActionEnv};
pub use result::DamageOutcome;
pub use status::{apply_status, reduce_round, StatusOutcome};

use rand::Rng;

use crate::types::Side;
use crate::unit::UnitInstance;

/// Higher speed acts first; an exact tie is broken by a coin flip.
pub fn decide_order(player: &UnitInstance, enemy: &UnitInstance, rng: &mut impl Rng) -> Side {
    if player.speed > enemy.speed {
        Side::Player
    } else if player.speed < enemy.speed {
        Side::Enemy
    } else if rng.gen::<f64>() < 0.5 {
        Side::Player
    } else {
        Side::Enemy
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::unit::{RandomRange, UnitInstance, UnitTemplate};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    pub(crate) fn test_unit(name: &str, owner: &str) -> UnitInstance {
        let template = UnitTemplate {
            id: 1,
            name: name.to_string(),
            description: String::new(),
            hp_count: 300.0,
            attack: 30.0,
            attack_default: None,
            defence: 30.0,
            defence_default: None,
            speed: 3.0,
            miss_rate: 0.0,
            critical_rate: 0.0,
            critical_hurt_rate: 1.5,
            heal_per_round: 0.0,
            skill_list: vec![],
            strengths: vec![],
            random_rate: RandomRange { low: 1.0, high: 1.0 },
            point_attrs: vec![],
        };
        UnitInstance::from_template(&template, owner)
    }

    #[test]
    fn faster_unit_acts_first() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut player = test_unit("Rogue", "player");
        let mut enemy = test_unit("Mage", "rival");
        player.speed = 7.0;
        enemy.speed = 4.0;
        assert_eq!(decide_order(&player, &enemy, &mut rng), Side::Player);
        enemy.speed = 9.0;
        assert_eq!(decide_order(&player, &enemy, &mut rng), Side::Enemy);
    }

    #[test]
    fn speed_tie_uses_both_outcomes() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let player = test_unit("Rogue", "player");
        let enemy = test_unit("Mage", "rival");
        let mut seen_player = false;
        let mut seen_enemy = false;
        for _ in 0..64 {
            match decide_order(&player, &enemy, &mut rng) {
                Side::Player => seen_player = true,
                Side::Enemy => seen_enemy = true,
            }
        }
        assert!(seen_player && seen_enemy);
    }
}
