//! Randomization helpers shared by the resolution engine and drafts
//!
//! Every random call site takes `&mut impl Rng` so tests can inject a
//! seeded or constant generator. Draw order inside the engine is part of
//! the contract; these helpers each consume exactly one draw.

use rand::Rng;

use crate::unit::RandomRange;

/// Scale a value by one uniform draw from the given range.
///
/// Uses `draw * (high - low) + low` rather than `gen_range` so a
/// degenerate range (`low == high`) stays exact instead of panicking.
pub fn roll_scaled(value: f64, range: RandomRange, rng: &mut impl Rng) -> f64 {
    value * (rng.gen::<f64>() * (range.high - range.low) + range.low)
}

/// One probability draw: true when the draw lands at or below `p`.
pub fn chance(p: f64, rng: &mut impl Rng) -> bool {
    rng.gen::<f64>() <= p
}

/// Accuracy draw: true when the draw lands at or above `accuracy`,
/// i.e. the action fails its accuracy check.
pub fn accuracy_fails(accuracy: f64, rng: &mut impl Rng) -> bool {
    rng.gen::<f64>() >= accuracy
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn degenerate_range_is_exact() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let range = RandomRange { low: 1.0, high: 1.0 };
        for _ in 0..16 {
            assert_eq!(roll_scaled(45.0, range, &mut rng), 45.0);
        }
    }

    #[test]
    fn roll_stays_inside_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let range = RandomRange { low: 0.8, high: 1.2 };
        for _ in 0..256 {
            let v = roll_scaled(100.0, range, &mut rng);
            assert!((80.0..120.0).contains(&v), "out of range: {v}");
        }
    }

    #[test]
    fn full_accuracy_never_fails() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..256 {
            assert!(!accuracy_fails(1.0, &mut rng));
        }
    }
}
