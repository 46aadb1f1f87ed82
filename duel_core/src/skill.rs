//! Skill and passive ("strength") definitions
//!
//! Loaded from the TOML content tables; accuracy defaults to 1 and
//! critical rate to 0 when a table omits them.

use serde::{Deserialize, Serialize};

use crate::types::{AttributeKey, SkillId, StrengthId, PASSIVE_SKILL_ID};

fn default_accuracy() -> f64 {
    1.0
}

/// The four transient status kinds a skill can inflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    Weak,
    Strong,
    Armor,
    Damage,
}

/// One status entry in a skill's inflict list. Weak/strong read `rate`,
/// armor/damage read `value`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusApply {
    pub kind: StatusKind,
    pub rounds: i32,
    #[serde(default)]
    pub rate: f64,
    #[serde(default)]
    pub value: f64,
}

/// One attribute delta in a skill's change list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeValue {
    /// True: applies to the acting unit (added). False: applies to the
    /// opponent (subtracted, gated by the opponent's miss rate).
    #[serde(rename = "self")]
    pub on_self: bool,
    pub attr: AttributeKey,
    #[serde(default)]
    pub value: f64,
    #[serde(default)]
    pub rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Skill {
    pub id: SkillId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Zero power means the skill deals no damage.
    #[serde(default)]
    pub power: f64,
    /// Fraction of final damage restored to the attacker.
    #[serde(default)]
    pub suck_blood_rate: f64,
    #[serde(default)]
    pub put_status: Vec<StatusApply>,
    #[serde(default)]
    pub change_value: Vec<ChangeValue>,
    #[serde(default = "default_accuracy")]
    pub accuracy: f64,
    #[serde(default)]
    pub critical_rate: f64,
    /// Hidden skills are excluded from the player's selectable list when
    /// visible skills remain.
    #[serde(default)]
    pub hidden: bool,
}

/// Comparator shared by all threshold sub-checks of a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparator {
    #[default]
    Ge,
    Lt,
}

/// Threshold checks against one unit's stats. Rate variants compare the
/// current value against the unit's default baseline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatCondition {
    pub health: Option<f64>,
    pub health_rate: Option<f64>,
    pub attack: Option<f64>,
    pub attack_rate: Option<f64>,
    pub defence: Option<f64>,
    pub defence_rate: Option<f64>,
}

/// Trigger condition for a passive. All present sub-checks must pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriggerCondition {
    #[serde(default)]
    pub comparator: Comparator,
    pub self_condition: Option<StatCondition>,
    pub enemy_condition: Option<StatCondition>,
    /// Minimum round number.
    pub round: Option<u32>,
    /// Fires on rounds congruent to 1 mod interval; 1 means every round.
    pub interval: Option<u32>,
    /// Probability gate.
    pub dice: Option<f64>,
}

/// A unit-owned passive: a conditionally self-triggering mini-skill.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Strength {
    pub id: StrengthId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub power: f64,
    #[serde(default)]
    pub status: Vec<StatusApply>,
    #[serde(default)]
    pub change_value: Vec<ChangeValue>,
    #[serde(default = "default_accuracy")]
    pub accuracy: f64,
    pub condition: Option<TriggerCondition>,
}

impl Strength {
    /// Synthesize a throwaway skill record so a triggered passive can run
    /// through the normal damage/status/change pipeline.
    pub fn as_skill(&self) -> Skill {
        Skill {
            id: PASSIVE_SKILL_ID,
            name: self.name.clone(),
            description: String::new(),
            power: self.power,
            suck_blood_rate: 0.0,
            put_status: self.status.clone(),
            change_value: self.change_value.clone(),
            accuracy: self.accuracy,
            critical_rate: 0.0,
            hidden: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skill_defaults_from_toml() {
        let skill: Skill = toml::from_str(
            r#"
id = 7
name = "Precise Strike"
power = 15
"#,
        )
        .unwrap();
        assert_eq!(skill.accuracy, 1.0);
        assert_eq!(skill.critical_rate, 0.0);
        assert!(skill.put_status.is_empty());
        assert!(!skill.hidden);
    }

    #[test]
    fn change_value_self_field_round_trips() {
        let skill: Skill = toml::from_str(
            r#"
id = 2
name = "Healing Light"
power = 0

[[change_value]]
self = true
attr = "hp"
value = 35
"#,
        )
        .unwrap();
        assert!(skill.change_value[0].on_self);
        assert_eq!(skill.change_value[0].attr, crate::types::AttributeKey::Hp);
    }

    #[test]
    fn strength_as_skill_uses_sentinel_id() {
        let strength = Strength {
            id: 9,
            name: "Berserk".to_string(),
            description: String::new(),
            power: 20.0,
            status: vec![],
            change_value: vec![],
            accuracy: 0.9,
            condition: None,
        };
        let skill = strength.as_skill();
        assert_eq!(skill.id, PASSIVE_SKILL_ID);
        assert_eq!(skill.power, 20.0);
        assert_eq!(skill.critical_rate, 0.0);
    }
}
