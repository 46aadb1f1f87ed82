//! Drafting: the pre-run shop and mid-run blessing offers
//!
//! The pre-draft deals six slots (four blessings, two equipment pieces)
//! against a difficulty-scaled point budget; blessings are drawn with
//! replacement from the still-available pool, so a repeatable blessing
//! can show up twice. Mid-run drafts offer three weighted blessings plus
//! a fixed heal; their quality weights drift toward the high tiers as
//! the run opens more of them.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::blessing::{BlessingDef, OwnedBlessing};
use crate::equipment::{generate_equipment, roll_equipment_quality, AffixDef, Equipment};
use crate::types::{Difficulty, Quality};

pub const PRE_DRAFT_SLOTS: usize = 6;
pub const PRE_DRAFT_BLESSING_SLOTS: usize = 4;
pub const REFRESH_COST: u32 = 1;
/// Rounds between periodic mid-run drafts.
pub const MID_DRAFT_INTERVAL: u32 = 10;
/// Blessings dealt per mid-run draft, before the fixed heal.
pub const MID_DRAFT_BLESSINGS: usize = 3;
/// Enemy number from which a half-health enemy opens a draft.
pub const HALF_HP_DRAFT_FROM_ENEMY: u32 = 5;
/// Fraction of max health restored by the fixed mid-draft heal.
pub const MID_DRAFT_HEAL_FRACTION: f64 = 0.6;
/// Openings over which mid-draft quality weights reach their terminal
/// distribution.
const WEIGHT_DRIFT_OPENINGS: u32 = 8;

const BASE_WEIGHTS: [(Quality, f64); 3] =
    [(Quality::A, 10.0), (Quality::B, 30.0), (Quality::C, 60.0)];
const TERMINAL_WEIGHTS: [(Quality, f64); 3] =
    [(Quality::A, 45.0), (Quality::B, 35.0), (Quality::C, 20.0)];

/// Point budget for the pre-draft by difficulty.
pub fn draft_budget(difficulty: Difficulty) -> u32 {
    match difficulty {
        Difficulty::Normal => 6,
        Difficulty::Hard => 9,
        Difficulty::Extreme => 12,
        Difficulty::Expert => 15,
        Difficulty::Inferno => 18,
    }
}

/// Pre-draft price of a candidate by quality.
pub fn quality_cost(quality: Quality) -> u32 {
    match quality {
        Quality::S | Quality::A => 6,
        Quality::B => 4,
        Quality::C => 2,
    }
}

/// One offer the player can take during a draft.
#[derive(Debug, Clone)]
pub enum DraftCandidate {
    Blessing(BlessingDef),
    Equipment(Equipment),
    /// Restores a fraction of max health; the fixed mid-draft option.
    Heal { fraction: f64 },
}

impl DraftCandidate {
    pub fn name(&self) -> String {
        match self {
            DraftCandidate::Blessing(def) => def.name.clone(),
            DraftCandidate::Equipment(piece) => piece.name.clone(),
            DraftCandidate::Heal { .. } => "Mend".to_string(),
        }
    }

    pub fn quality(&self) -> Quality {
        match self {
            DraftCandidate::Blessing(def) => def.quality,
            DraftCandidate::Equipment(piece) => piece.quality,
            DraftCandidate::Heal { .. } => Quality::S,
        }
    }

    pub fn cost(&self) -> u32 {
        quality_cost(self.quality())
    }
}

/// A pre-draft slot. Selection is a toggle: nothing is bought until the
/// draft is confirmed, and selected slots survive refreshes.
#[derive(Debug, Clone)]
pub struct DraftSlot {
    pub candidate: DraftCandidate,
    pub selected: bool,
}

impl DraftSlot {
    fn new(candidate: DraftCandidate) -> Self {
        DraftSlot {
            candidate,
            selected: false,
        }
    }
}

/// Mid-draft quality weights after `openings` drafts: a linear walk from
/// the base distribution to the terminal one.
pub fn mid_draft_quality_weights(openings: u32) -> [(Quality, f64); 3] {
    let t = openings.min(WEIGHT_DRIFT_OPENINGS) as f64 / WEIGHT_DRIFT_OPENINGS as f64;
    let mut weights = BASE_WEIGHTS;
    for (slot, terminal) in weights.iter_mut().zip(TERMINAL_WEIGHTS.iter()) {
        slot.1 += (terminal.1 - slot.1) * t;
    }
    weights
}

fn pick_weighted_quality(weights: &[(Quality, f64); 3], rng: &mut impl Rng) -> Quality {
    let total: f64 = weights.iter().map(|(_, w)| w).sum();
    let mut draw = rng.gen::<f64>() * total;
    for (quality, weight) in weights {
        if draw < *weight {
            return *quality;
        }
        draw -= weight;
    }
    Quality::C
}

fn at_stack_limit(def: &BlessingDef, owned: &[OwnedBlessing]) -> bool {
    owned
        .iter()
        .find(|b| b.def.id == def.id)
        .map_or(false, |b| b.stack() >= def.stack_limit())
}

/// Draw one blessing at the rolled quality, falling back through the
/// lower tiers when a pool is exhausted. Draws are with replacement
/// across a deal; only blessings already at their stack limit are
/// filtered out.
fn pick_blessing(
    pool: &[BlessingDef],
    owned: &[OwnedBlessing],
    quality: Quality,
    rng: &mut impl Rng,
) -> Option<BlessingDef> {
    let mut order = vec![quality];
    for fallback in [Quality::C, Quality::B, Quality::A] {
        if fallback != quality {
            order.push(fallback);
        }
    }
    for tier in order {
        let eligible: Vec<&BlessingDef> = pool
            .iter()
            .filter(|def| def.quality == tier)
            .filter(|def| !at_stack_limit(def, owned))
            .collect();
        if let Some(def) = eligible.choose(rng) {
            return Some((*def).clone());
        }
    }
    None
}

fn deal_blessing(
    pool: &[BlessingDef],
    owned: &[OwnedBlessing],
    weights: &[(Quality, f64); 3],
    rng: &mut impl Rng,
) -> Option<BlessingDef> {
    let quality = pick_weighted_quality(weights, rng);
    pick_blessing(pool, owned, quality, rng)
}

/// Deal the six pre-draft slots: four blessings drawn with replacement,
/// two equipment pieces, shuffled together.
pub fn build_pre_draft(
    blessings: &[BlessingDef],
    affixes: &[AffixDef],
    owned: &[OwnedBlessing],
    rng: &mut impl Rng,
) -> Vec<DraftSlot> {
    let mut slots = Vec::with_capacity(PRE_DRAFT_SLOTS);
    for _ in 0..PRE_DRAFT_BLESSING_SLOTS {
        if let Some(def) = deal_blessing(blessings, owned, &BASE_WEIGHTS, rng) {
            slots.push(DraftSlot::new(DraftCandidate::Blessing(def)));
        }
    }
    for _ in 0..PRE_DRAFT_SLOTS - PRE_DRAFT_BLESSING_SLOTS {
        let quality = roll_equipment_quality(rng);
        if let Some(piece) = generate_equipment(affixes, quality, rng) {
            slots.push(DraftSlot::new(DraftCandidate::Equipment(piece)));
        }
    }
    slots.shuffle(rng);
    slots
}

/// Refresh the pre-draft: every unselected slot is regenerated with a
/// candidate of the same kind; selected slots ride through untouched.
pub fn refresh_pre_draft(
    slots: &mut [DraftSlot],
    blessings: &[BlessingDef],
    affixes: &[AffixDef],
    owned: &[OwnedBlessing],
    rng: &mut impl Rng,
) {
    for slot in slots.iter_mut() {
        if slot.selected {
            continue;
        }
        match &slot.candidate {
            DraftCandidate::Blessing(_) => {
                if let Some(def) = deal_blessing(blessings, owned, &BASE_WEIGHTS, rng) {
                    slot.candidate = DraftCandidate::Blessing(def);
                }
            }
            DraftCandidate::Equipment(_) => {
                let quality = roll_equipment_quality(rng);
                if let Some(piece) = generate_equipment(affixes, quality, rng) {
                    slot.candidate = DraftCandidate::Equipment(piece);
                }
            }
            DraftCandidate::Heal { .. } => {}
        }
    }
}

/// Deal a mid-run draft: three weighted blessings plus the fixed heal as
/// an always-available fourth option.
pub fn build_mid_draft(
    blessings: &[BlessingDef],
    owned: &[OwnedBlessing],
    openings: u32,
    rng: &mut impl Rng,
) -> Vec<DraftCandidate> {
    let weights = mid_draft_quality_weights(openings);
    let mut candidates = Vec::with_capacity(MID_DRAFT_BLESSINGS + 1);
    for _ in 0..MID_DRAFT_BLESSINGS {
        if let Some(def) = deal_blessing(blessings, owned, &weights, rng) {
            candidates.push(DraftCandidate::Blessing(def));
        }
    }
    candidates.push(DraftCandidate::Heal {
        fraction: MID_DRAFT_HEAL_FRACTION,
    });
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blessing::EffectSpec;
    use crate::types::AttributeKey;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn blessing(id: &str, quality: Quality) -> BlessingDef {
        BlessingDef {
            id: id.to_string(),
            name: id.to_string(),
            description: String::new(),
            quality,
            repeatable: true,
            max_stack: 3,
            effect: EffectSpec::DamageBoost { rate: 0.1 },
        }
    }

    fn pool() -> Vec<BlessingDef> {
        vec![
            blessing("a1", Quality::A),
            blessing("a2", Quality::A),
            blessing("b1", Quality::B),
            blessing("b2", Quality::B),
            blessing("c1", Quality::C),
            blessing("c2", Quality::C),
            blessing("c3", Quality::C),
            blessing("c4", Quality::C),
        ]
    }

    fn affixes() -> Vec<AffixDef> {
        vec![AffixDef {
            attr: AttributeKey::Attack,
            name: "Blade".to_string(),
        }]
    }

    #[test]
    fn budget_scales_with_difficulty() {
        assert_eq!(draft_budget(Difficulty::Normal), 6);
        assert_eq!(draft_budget(Difficulty::Hard), 9);
        assert_eq!(draft_budget(Difficulty::Extreme), 12);
        assert_eq!(draft_budget(Difficulty::Expert), 15);
        assert_eq!(draft_budget(Difficulty::Inferno), 18);
    }

    #[test]
    fn pre_draft_deals_four_blessings_and_two_pieces() {
        let mut rng = ChaCha8Rng::seed_from_u64(80);
        let slots = build_pre_draft(&pool(), &affixes(), &[], &mut rng);
        assert_eq!(slots.len(), PRE_DRAFT_SLOTS);
        let blessings = slots
            .iter()
            .filter(|s| matches!(s.candidate, DraftCandidate::Blessing(_)))
            .count();
        assert_eq!(blessings, PRE_DRAFT_BLESSING_SLOTS);
    }

    #[test]
    fn pre_draft_can_repeat_a_blessing() {
        let mut rng = ChaCha8Rng::seed_from_u64(84);
        // A one-entry pool forces every blessing slot onto the same id.
        let single = vec![blessing("c1", Quality::C)];
        let slots = build_pre_draft(&single, &affixes(), &[], &mut rng);
        let copies = slots
            .iter()
            .filter(|s| matches!(&s.candidate, DraftCandidate::Blessing(def) if def.id == "c1"))
            .count();
        assert_eq!(copies, PRE_DRAFT_BLESSING_SLOTS);
    }

    #[test]
    fn refresh_keeps_selected_slots_and_kinds() {
        let mut rng = ChaCha8Rng::seed_from_u64(81);
        let mut slots = build_pre_draft(&pool(), &affixes(), &[], &mut rng);
        slots[0].selected = true;
        let before: Vec<String> = slots.iter().map(|s| s.candidate.name()).collect();
        let kinds: Vec<bool> = slots
            .iter()
            .map(|s| matches!(s.candidate, DraftCandidate::Blessing(_)))
            .collect();
        refresh_pre_draft(&mut slots, &pool(), &affixes(), &[], &mut rng);
        assert_eq!(slots[0].candidate.name(), before[0]);
        for (slot, was_blessing) in slots.iter().zip(kinds) {
            assert_eq!(
                matches!(slot.candidate, DraftCandidate::Blessing(_)),
                was_blessing
            );
        }
    }

    #[test]
    fn weight_drift_hits_documented_endpoints() {
        let start = mid_draft_quality_weights(0);
        assert_eq!(start[0].1, 10.0);
        assert_eq!(start[1].1, 30.0);
        assert_eq!(start[2].1, 60.0);
        let end = mid_draft_quality_weights(8);
        assert_eq!(end[0].1, 45.0);
        assert_eq!(end[1].1, 35.0);
        assert_eq!(end[2].1, 20.0);
        // Past the drift window the weights stay put.
        assert_eq!(mid_draft_quality_weights(20), end);
    }

    #[test]
    fn mid_draft_offers_three_blessings_plus_the_heal() {
        let mut rng = ChaCha8Rng::seed_from_u64(82);
        let candidates = build_mid_draft(&pool(), &[], 0, &mut rng);
        assert_eq!(candidates.len(), MID_DRAFT_BLESSINGS + 1);
        let blessings = candidates
            .iter()
            .filter(|c| matches!(c, DraftCandidate::Blessing(_)))
            .count();
        assert_eq!(blessings, MID_DRAFT_BLESSINGS);
        assert!(candidates
            .iter()
            .any(|c| matches!(c, DraftCandidate::Heal { fraction } if *fraction == MID_DRAFT_HEAL_FRACTION)));
    }

    #[test]
    fn exhausted_tier_falls_back_to_another() {
        let mut rng = ChaCha8Rng::seed_from_u64(83);
        // Pool with no C blessings at all: a C roll must fall back.
        let pool = vec![blessing("a1", Quality::A), blessing("b1", Quality::B)];
        for _ in 0..32 {
            let picked = pick_blessing(&pool, &[], Quality::C, &mut rng);
            assert!(picked.is_some());
        }
    }
}
