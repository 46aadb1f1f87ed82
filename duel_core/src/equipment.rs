//! Equipment generation and application
//!
//! An equipment piece is one affix at a quality tier, applied additively
//! or multiplicatively per its modifier mode. Flat affixes move whole
//! points; rate affixes move fractions and tolerate percent-style table
//! values by normalizing anything above 1.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::types::{AttributeKey, Quality};
use crate::unit::UnitInstance;

/// Equipment the player can wear at once.
pub const MAX_EQUIPMENT_SLOTS: usize = 2;

/// Content-defined affix: which attribute a piece improves and the item
/// name it generates under.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffixDef {
    pub attr: AttributeKey,
    pub name: String,
}

/// How a modifier combines with the attribute it targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierMode {
    #[default]
    Add,
    Mul,
}

/// One generated piece.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Equipment {
    pub name: String,
    pub quality: Quality,
    pub attr: AttributeKey,
    #[serde(default)]
    pub mode: ModifierMode,
    pub value: f64,
}

/// Affix magnitude by quality; rate attributes use the small scale.
pub fn affix_value(quality: Quality, attr: AttributeKey) -> f64 {
    if attr.is_rate() {
        match quality {
            Quality::S | Quality::A => 0.08,
            Quality::B => 0.05,
            Quality::C => 0.03,
        }
    } else {
        match quality {
            Quality::S | Quality::A => 12.0,
            Quality::B => 8.0,
            Quality::C => 5.0,
        }
    }
}

/// Quality roll for generated equipment: C common, A rare.
pub fn roll_equipment_quality(rng: &mut impl Rng) -> Quality {
    let draw = rng.gen_range(0..100u32);
    if draw < 10 {
        Quality::A
    } else if draw < 40 {
        Quality::B
    } else {
        Quality::C
    }
}

fn quality_prefix(quality: Quality) -> &'static str {
    match quality {
        Quality::S => "Mythic",
        Quality::A => "Exquisite",
        Quality::B => "Fine",
        Quality::C => "Plain",
    }
}

/// Generate a piece at the given quality from a random affix.
pub fn generate_equipment(
    affixes: &[AffixDef],
    quality: Quality,
    rng: &mut impl Rng,
) -> Option<Equipment> {
    if affixes.is_empty() {
        return None;
    }
    let affix = &affixes[rng.gen_range(0..affixes.len())];
    Some(Equipment {
        name: format!("{} {}", quality_prefix(quality), affix.name),
        quality,
        attr: affix.attr,
        mode: ModifierMode::Add,
        value: affix_value(quality, affix.attr),
    })
}

/// Add one piece's affix to a unit. Rate values above 1 are read as
/// percentages; everything lands inside the attribute's clamp bounds.
pub fn apply_equipment(unit: &mut UnitInstance, piece: &Equipment) {
    let mut value = piece.value;
    if piece.attr.is_rate() && value.abs() > 1.0 {
        value /= 100.0;
    }
    if let Some(current) = unit.attr(piece.attr) {
        let before = unit.hp_count;
        let next = match piece.mode {
            ModifierMode::Add => current + value,
            ModifierMode::Mul => current * value,
        };
        unit.set_attr(piece.attr, next);
        unit.clamp_attr(piece.attr);
        // Extra maximum health is granted as current health too.
        if piece.attr == AttributeKey::HpCount {
            unit.hp = (unit.hp + (unit.hp_count - before)).clamp(0.0, unit.hp_count);
        }
    }
}

/// Apply a full loadout to a freshly built unit.
pub fn apply_equipments(unit: &mut UnitInstance, pieces: &[Equipment]) {
    for piece in pieces {
        apply_equipment(unit, piece);
    }
}
