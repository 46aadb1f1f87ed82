//! Core identifiers and shared enums

use serde::{Deserialize, Serialize};

pub type UnitId = u32;
/// Skill ids are signed so synthesized passive actions can use a sentinel.
pub type SkillId = i32;
pub type StrengthId = u32;
pub type BlessingId = String;

/// Sentinel skill id used when a passive is run through the skill pipeline.
pub const PASSIVE_SKILL_ID: SkillId = -1;

/// Which side of the duel a unit fights on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Player,
    Enemy,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Player => Side::Enemy,
            Side::Enemy => Side::Player,
        }
    }
}

/// Quality tier for blessings and equipment. `S` is reserved for the
/// fixed mid-draft heal option and never appears in generated pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quality {
    S,
    A,
    B,
    C,
}

/// Attribute keys addressable by skills, equipment, and progression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKey {
    Hp,
    HpCount,
    Attack,
    Defence,
    Speed,
    MissRate,
    CriticalRate,
    CriticalHurtRate,
    HealPerRound,
    StopRound,
}

impl AttributeKey {
    /// Rate-typed attributes carry their magnitude in the `rate` field of
    /// a change entry and use smaller per-tier equipment values.
    pub fn is_rate(self) -> bool {
        matches!(self, AttributeKey::MissRate | AttributeKey::CriticalRate)
    }

    pub fn label(self) -> &'static str {
        match self {
            AttributeKey::Hp => "health",
            AttributeKey::HpCount => "max health",
            AttributeKey::Attack => "attack",
            AttributeKey::Defence => "defence",
            AttributeKey::Speed => "speed",
            AttributeKey::MissRate => "evasion",
            AttributeKey::CriticalRate => "crit chance",
            AttributeKey::CriticalHurtRate => "crit damage",
            AttributeKey::HealPerRound => "regeneration",
            AttributeKey::StopRound => "stun",
        }
    }
}

/// Difficulty tiers selectable before or during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Normal,
    Hard,
    Extreme,
    Expert,
    Inferno,
}

impl Difficulty {
    pub fn all() -> &'static [Difficulty] {
        &[
            Difficulty::Normal,
            Difficulty::Hard,
            Difficulty::Extreme,
            Difficulty::Expert,
            Difficulty::Inferno,
        ]
    }

    pub fn label(self) -> &'static str {
        match self {
            Difficulty::Normal => "Normal",
            Difficulty::Hard => "Hard",
            Difficulty::Extreme => "Extreme",
            Difficulty::Expert => "Expert",
            Difficulty::Inferno => "Inferno",
        }
    }

    /// Tier index feeding the progression point formula.
    pub fn point_tier(self) -> u32 {
        match self {
            Difficulty::Normal => 1,
            Difficulty::Hard => 2,
            Difficulty::Extreme => 3,
            Difficulty::Expert => 4,
            Difficulty::Inferno => 5,
        }
    }
}
