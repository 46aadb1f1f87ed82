//! Run-to-run progression: earned points and attribute allocation
//!
//! Points are earned per kill on a curve that front-loads the early
//! kills, scaled by difficulty. The earned pool is global; allocations
//! are spent one point at a time per unit and attribute against a rule
//! table, and applied to that unit's instance before equipment.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{AttributeKey, Difficulty, UnitId};
use crate::unit::UnitInstance;

/// Lifetime earnings cap.
pub const POINT_CAP: u32 = 300;
/// Points spendable on any single attribute of one unit.
pub const MAX_POINTS_PER_ATTR: u32 = 10;

/// Attributes open to investment when a unit names no list of its own.
pub const DEFAULT_POINT_ATTRS: [AttributeKey; 4] = [
    AttributeKey::HpCount,
    AttributeKey::Attack,
    AttributeKey::Defence,
    AttributeKey::Speed,
];

/// Per-point increment for one attribute.
#[derive(Debug, Clone, Copy)]
pub struct PointRule {
    pub attr: AttributeKey,
    pub step: f64,
}

const POINT_RULES: [PointRule; 8] = [
    PointRule {
        attr: AttributeKey::HpCount,
        step: 30.0,
    },
    PointRule {
        attr: AttributeKey::Attack,
        step: 3.0,
    },
    PointRule {
        attr: AttributeKey::Defence,
        step: 2.0,
    },
    PointRule {
        attr: AttributeKey::Speed,
        step: 0.5,
    },
    PointRule {
        attr: AttributeKey::HealPerRound,
        step: 1.0,
    },
    PointRule {
        attr: AttributeKey::CriticalRate,
        step: 0.02,
    },
    PointRule {
        attr: AttributeKey::MissRate,
        step: 0.015,
    },
    PointRule {
        attr: AttributeKey::CriticalHurtRate,
        step: 0.08,
    },
];

pub fn point_rules() -> &'static [PointRule] {
    &POINT_RULES
}

pub fn rule_for(attr: AttributeKey) -> Option<&'static PointRule> {
    POINT_RULES.iter().find(|r| r.attr == attr)
}

/// Per-kill point multiplier: steep early, flattening after the fourth
/// kill, decaying gently deep into a chain.
pub fn kill_curve(kills: u32) -> f64 {
    let k = kills.max(1) as f64;
    if kills <= 4 {
        1.0 + 0.06 * (k - 1.0)
    } else if kills <= 10 {
        1.54 + 0.02 * (k - 4.0)
    } else {
        1.94 * 0.985f64.powf(k - 10.0)
    }
}

/// Points granted for the `kills`-th kill of a run.
pub fn point_gain(kills: u32, difficulty: Difficulty, mode_multiplier: f64) -> u32 {
    let tier = difficulty.point_tier() as f64;
    let raw = (0.8 + 0.2 * tier) * mode_multiplier * kill_curve(kills);
    raw.round() as u32
}

/// Persistent progression state. One shared point pool, one allocation
/// map per unit id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgressionData {
    /// Lifetime points earned, capped at `POINT_CAP`.
    pub total_earned: u32,
    #[serde(default)]
    pub allocated: BTreeMap<UnitId, BTreeMap<AttributeKey, u32>>,
}

impl ProgressionData {
    pub fn points_in(&self, unit: UnitId, attr: AttributeKey) -> u32 {
        self.allocated
            .get(&unit)
            .and_then(|attrs| attrs.get(&attr))
            .copied()
            .unwrap_or(0)
    }

    /// Points spent across every unit.
    pub fn spent(&self) -> u32 {
        self.allocated
            .values()
            .flat_map(|attrs| attrs.values())
            .sum()
    }

    pub fn available(&self) -> u32 {
        self.total_earned.saturating_sub(self.spent())
    }

    /// Record earnings; returns how much actually counted under the cap.
    pub fn earn(&mut self, amount: u32) -> u32 {
        let counted = amount.min(POINT_CAP - self.total_earned.min(POINT_CAP));
        self.total_earned += counted;
        counted
    }

    /// Repair loaded data: unknown attributes dropped, per-attribute and
    /// lifetime caps restored, empty unit maps removed.
    pub fn normalize(&mut self) {
        self.total_earned = self.total_earned.min(POINT_CAP);
        for attrs in self.allocated.values_mut() {
            attrs.retain(|attr, points| {
                *points = (*points).min(MAX_POINTS_PER_ATTR);
                *points > 0 && rule_for(*attr).is_some()
            });
        }
        self.allocated.retain(|_, attrs| !attrs.is_empty());
        // Never let spends exceed earnings after external edits.
        while self.spent() > self.total_earned {
            let unit = match self.allocated.keys().next_back() {
                Some(unit) => *unit,
                None => break,
            };
            let attr = self
                .allocated
                .get(&unit)
                .and_then(|attrs| attrs.keys().next_back().copied());
            match attr {
                Some(attr) => {
                    let _ = self.deallocate(unit, attr);
                }
                None => {
                    self.allocated.remove(&unit);
                }
            }
        }
    }

    pub fn allocate(&mut self, unit: UnitId, attr: AttributeKey) -> Result<(), String> {
        let rule = rule_for(attr).ok_or_else(|| format!("{} cannot take points", attr.label()))?;
        if self.available() == 0 {
            return Err("no points available".to_string());
        }
        let entry = self
            .allocated
            .entry(unit)
            .or_default()
            .entry(rule.attr)
            .or_insert(0);
        if *entry >= MAX_POINTS_PER_ATTR {
            return Err(format!("{} is fully invested", attr.label()));
        }
        *entry += 1;
        Ok(())
    }

    pub fn deallocate(&mut self, unit: UnitId, attr: AttributeKey) -> Result<(), String> {
        let attrs = self
            .allocated
            .get_mut(&unit)
            .ok_or_else(|| format!("no points in {}", attr.label()))?;
        match attrs.get_mut(&attr) {
            Some(points) if *points > 0 => {
                *points -= 1;
                if *points == 0 {
                    attrs.remove(&attr);
                }
                if attrs.is_empty() {
                    self.allocated.remove(&unit);
                }
                Ok(())
            }
            _ => Err(format!("no points in {}", attr.label())),
        }
    }

    /// Refund every allocation of one unit.
    pub fn reset_allocations(&mut self, unit: UnitId) {
        self.allocated.remove(&unit);
    }

    /// Fold a unit's allocation into its freshly built instance. Max
    /// health gains raise current health with them.
    pub fn apply_to_unit(&self, unit: &mut UnitInstance) {
        let attrs = match self.allocated.get(&unit.id) {
            Some(attrs) => attrs,
            None => return,
        };
        for (&attr, &points) in attrs {
            let rule = match rule_for(attr) {
                Some(rule) => rule,
                None => continue,
            };
            if let Some(current) = unit.attr(attr) {
                let before_max = unit.hp_count;
                unit.set_attr(attr, current + rule.step * points as f64);
                unit.clamp_attr(attr);
                if attr == AttributeKey::HpCount {
                    unit.hp = (unit.hp + (unit.hp_count - before_max)).min(unit.hp_count);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::tests::test_unit;

    const WARRIOR: UnitId = 1;

    #[test]
    fn curve_front_loads_early_kills() {
        assert!((kill_curve(1) - 1.0).abs() < 1e-9);
        assert!((kill_curve(4) - 1.18).abs() < 1e-9);
        assert!(kill_curve(5) > kill_curve(4));
        assert!(kill_curve(30) < kill_curve(11));
    }

    #[test]
    fn gain_scales_with_difficulty_tier() {
        let normal = point_gain(1, Difficulty::Normal, 1.0);
        let inferno = point_gain(1, Difficulty::Inferno, 1.0);
        assert_eq!(normal, 1);
        assert_eq!(inferno, 2);
        assert!(point_gain(1, Difficulty::Inferno, 1.5) >= inferno);
    }

    #[test]
    fn earnings_stop_at_the_cap() {
        let mut data = ProgressionData::default();
        assert_eq!(data.earn(250), 250);
        assert_eq!(data.earn(100), 50);
        assert_eq!(data.total_earned, POINT_CAP);
    }

    #[test]
    fn allocation_respects_per_attr_cap() {
        let mut data = ProgressionData {
            total_earned: 40,
            ..Default::default()
        };
        for _ in 0..MAX_POINTS_PER_ATTR {
            data.allocate(WARRIOR, AttributeKey::Attack).unwrap();
        }
        assert!(data.allocate(WARRIOR, AttributeKey::Attack).is_err());
        assert_eq!(data.available(), 30);
    }

    #[test]
    fn units_spend_from_one_shared_pool() {
        let mut data = ProgressionData {
            total_earned: 3,
            ..Default::default()
        };
        data.allocate(WARRIOR, AttributeKey::Attack).unwrap();
        data.allocate(7, AttributeKey::Attack).unwrap();
        data.allocate(7, AttributeKey::Defence).unwrap();
        assert!(data.allocate(WARRIOR, AttributeKey::Defence).is_err());
        assert_eq!(data.points_in(WARRIOR, AttributeKey::Attack), 1);
        assert_eq!(data.points_in(7, AttributeKey::Attack), 1);
        // Each unit keeps its own ledger: the warrior's cap is untouched
        // by the other unit's spending.
        assert_eq!(data.points_in(WARRIOR, AttributeKey::Defence), 0);
    }

    #[test]
    fn cannot_spend_points_that_do_not_exist() {
        let mut data = ProgressionData::default();
        assert!(data.allocate(WARRIOR, AttributeKey::Attack).is_err());
    }

    #[test]
    fn deallocate_refunds_a_point() {
        let mut data = ProgressionData {
            total_earned: 5,
            ..Default::default()
        };
        data.allocate(WARRIOR, AttributeKey::Defence).unwrap();
        assert_eq!(data.available(), 4);
        data.deallocate(WARRIOR, AttributeKey::Defence).unwrap();
        assert_eq!(data.available(), 5);
        assert!(data.deallocate(WARRIOR, AttributeKey::Defence).is_err());
    }

    #[test]
    fn reset_clears_one_unit_only() {
        let mut data = ProgressionData {
            total_earned: 10,
            ..Default::default()
        };
        data.allocate(WARRIOR, AttributeKey::Attack).unwrap();
        data.allocate(7, AttributeKey::Speed).unwrap();
        data.reset_allocations(WARRIOR);
        assert_eq!(data.points_in(WARRIOR, AttributeKey::Attack), 0);
        assert_eq!(data.points_in(7, AttributeKey::Speed), 1);
    }

    #[test]
    fn normalize_repairs_overspent_data() {
        let mut data = ProgressionData {
            total_earned: 500,
            ..Default::default()
        };
        data.allocated
            .entry(WARRIOR)
            .or_default()
            .insert(AttributeKey::Attack, 99);
        data.normalize();
        assert_eq!(data.total_earned, POINT_CAP);
        assert_eq!(data.points_in(WARRIOR, AttributeKey::Attack), MAX_POINTS_PER_ATTR);
    }

    #[test]
    fn apply_raises_stats_and_current_health() {
        let mut data = ProgressionData {
            total_earned: 20,
            ..Default::default()
        };
        for _ in 0..3 {
            data.allocate(WARRIOR, AttributeKey::HpCount).unwrap();
        }
        data.allocate(WARRIOR, AttributeKey::Attack).unwrap();
        let mut unit = test_unit("Warrior", "player");
        data.apply_to_unit(&mut unit);
        assert_eq!(unit.hp_count, 390.0);
        assert_eq!(unit.hp, 390.0);
        assert_eq!(unit.attack, 33.0);
    }

    #[test]
    fn apply_only_reads_the_matching_unit() {
        let mut data = ProgressionData {
            total_earned: 5,
            ..Default::default()
        };
        data.allocate(7, AttributeKey::Attack).unwrap();
        let mut unit = test_unit("Warrior", "player");
        data.apply_to_unit(&mut unit);
        assert_eq!(unit.attack, 30.0);
    }
}
