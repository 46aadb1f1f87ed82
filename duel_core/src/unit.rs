//! Unit templates, instances, and the clamped attribute model

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::rng::roll_scaled;
use crate::types::{AttributeKey, SkillId, StrengthId, UnitId};

/// Interval the per-unit randomization pass draws multipliers from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RandomRange {
    pub low: f64,
    pub high: f64,
}

impl Default for RandomRange {
    fn default() -> Self {
        RandomRange { low: 1.0, high: 1.0 }
    }
}

/// One transient status slot: remaining rounds plus a magnitude.
///
/// Weak/strong store a power rate in `magnitude`; armor and damage-bonus
/// store a flat value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatusSlot {
    pub rounds: i32,
    pub magnitude: f64,
}

/// Static unit definition loaded from the content tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitTemplate {
    pub id: UnitId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub hp_count: f64,
    pub attack: f64,
    #[serde(default)]
    pub attack_default: Option<f64>,
    pub defence: f64,
    #[serde(default)]
    pub defence_default: Option<f64>,
    pub speed: f64,
    pub miss_rate: f64,
    pub critical_rate: f64,
    pub critical_hurt_rate: f64,
    #[serde(default)]
    pub heal_per_round: f64,
    #[serde(default)]
    pub skill_list: Vec<SkillId>,
    #[serde(default)]
    pub strengths: Vec<StrengthId>,
    #[serde(default)]
    pub random_rate: RandomRange,
    /// Attributes this unit may spend progression points on.
    #[serde(default)]
    pub point_attrs: Vec<AttributeKey>,
}

/// Mutable combat instance cloned from a template at fight start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitInstance {
    pub id: UnitId,
    pub name: String,
    pub owner: String,
    pub hp: f64,
    pub hp_count: f64,
    pub attack: f64,
    pub attack_default: f64,
    pub defence: f64,
    pub defence_default: f64,
    pub speed: f64,
    pub miss_rate: f64,
    pub critical_rate: f64,
    pub critical_hurt_rate: f64,
    pub heal_per_round: f64,
    pub skill_list: Vec<SkillId>,
    pub strengths: Vec<StrengthId>,
    pub random_rate: RandomRange,
    pub stop_round: i32,
    pub weak_status: Option<StatusSlot>,
    pub strong_status: Option<StatusSlot>,
    pub armor_status: Option<StatusSlot>,
    pub damage_status: Option<StatusSlot>,
}

/// Bounds for a clamped attribute: `(min, max)`, either side optional.
pub fn attribute_limits(key: AttributeKey) -> (Option<f64>, Option<f64>) {
    match key {
        AttributeKey::Hp => (Some(0.0), None),
        AttributeKey::HpCount => (Some(30.0), None),
        AttributeKey::Defence => (Some(-100.0), Some(100.0)),
        AttributeKey::Attack => (Some(1.0), Some(100.0)),
        AttributeKey::Speed => (Some(0.0), Some(10.0)),
        AttributeKey::CriticalRate => (Some(0.0), Some(1.0)),
        AttributeKey::MissRate => (Some(0.0), Some(0.6)),
        AttributeKey::CriticalHurtRate => (Some(1.0), None),
        AttributeKey::HealPerRound => (Some(0.0), Some(10.0)),
        AttributeKey::StopRound => (None, None),
    }
}

/// Clamp a value into an attribute's documented bounds.
pub fn clamp_attribute(key: AttributeKey, value: f64) -> f64 {
    let (min, max) = attribute_limits(key);
    let mut v = value;
    if let Some(min) = min {
        v = v.max(min);
    }
    if let Some(max) = max {
        v = v.min(max);
    }
    v
}

impl UnitInstance {
    /// Explicit typed clone from a template: fresh status slots, full hp.
    pub fn from_template(template: &UnitTemplate, owner: &str) -> Self {
        UnitInstance {
            id: template.id,
            name: template.name.clone(),
            owner: owner.to_string(),
            hp: template.hp_count,
            hp_count: template.hp_count,
            attack: template.attack,
            attack_default: template.attack_default.unwrap_or(template.attack),
            defence: template.defence,
            defence_default: template.defence_default.unwrap_or(template.defence),
            speed: template.speed,
            miss_rate: template.miss_rate,
            critical_rate: template.critical_rate,
            critical_hurt_rate: template.critical_hurt_rate,
            heal_per_round: template.heal_per_round,
            skill_list: template.skill_list.clone(),
            strengths: template.strengths.clone(),
            random_rate: template.random_rate,
            stop_round: 0,
            weak_status: None,
            strong_status: None,
            armor_status: None,
            damage_status: None,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0.0
    }

    pub fn hp_ratio(&self) -> f64 {
        if self.hp_count > 0.0 {
            self.hp / self.hp_count
        } else {
            0.0
        }
    }

    /// Run-to-run variance pass: each listed attribute is scaled by an
    /// independent draw from the unit's random range, then hp is reset to
    /// the randomized maximum.
    pub fn apply_random_mode(&mut self, rng: &mut impl Rng) {
        let range = self.random_rate;
        self.hp_count = roll_scaled(self.hp_count, range, rng);
        self.hp = self.hp_count;
        self.attack = roll_scaled(self.attack, range, rng);
        self.defence = roll_scaled(self.defence, range, rng);
        self.speed = roll_scaled(self.speed, range, rng);
        self.critical_rate = roll_scaled(self.critical_rate, range, rng);
        self.critical_hurt_rate = roll_scaled(self.critical_hurt_rate, range, rng);
        self.miss_rate = roll_scaled(self.miss_rate, range, rng);
    }

    /// Heal by `amount`, capped at max hp. Returns the amount actually
    /// restored.
    pub fn heal(&mut self, amount: f64) -> f64 {
        let before = self.hp;
        self.hp = (self.hp + amount.max(0.0)).min(self.hp_count);
        self.hp - before
    }

    /// Numeric attribute access by key. `StopRound` is excluded: it is
    /// integer-valued and bypasses the clamp table.
    pub fn attr(&self, key: AttributeKey) -> Option<f64> {
        match key {
            AttributeKey::Hp => Some(self.hp),
            AttributeKey::HpCount => Some(self.hp_count),
            AttributeKey::Attack => Some(self.attack),
            AttributeKey::Defence => Some(self.defence),
            AttributeKey::Speed => Some(self.speed),
            AttributeKey::MissRate => Some(self.miss_rate),
            AttributeKey::CriticalRate => Some(self.critical_rate),
            AttributeKey::CriticalHurtRate => Some(self.critical_hurt_rate),
            AttributeKey::HealPerRound => Some(self.heal_per_round),
            AttributeKey::StopRound => None,
        }
    }

    pub fn set_attr(&mut self, key: AttributeKey, value: f64) {
        match key {
            AttributeKey::Hp => self.hp = value,
            AttributeKey::HpCount => self.hp_count = value,
            AttributeKey::Attack => self.attack = value,
            AttributeKey::Defence => self.defence = value,
            AttributeKey::Speed => self.speed = value,
            AttributeKey::MissRate => self.miss_rate = value,
            AttributeKey::CriticalRate => self.critical_rate = value,
            AttributeKey::CriticalHurtRate => self.critical_hurt_rate = value,
            AttributeKey::HealPerRound => self.heal_per_round = value,
            AttributeKey::StopRound => {}
        }
    }

    /// Re-clamp one attribute into its bounds table entry.
    pub fn clamp_attr(&mut self, key: AttributeKey) {
        if let Some(value) = self.attr(key) {
            self.set_attr(key, clamp_attribute(key, value));
        }
    }

    /// True when any beneficial status (strong, armor, damage bonus) is
    /// currently active.
    pub fn has_positive_status(&self) -> bool {
        self.strong_status.is_some() || self.armor_status.is_some() || self.damage_status.is_some()
    }
}
