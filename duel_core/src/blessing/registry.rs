//! Effect specs and the handler factory
//!
//! Content tables describe a blessing's behavior as a tagged `effect`
//! table; unknown kinds deserialize to `Unknown` so an out-of-date
//! binary degrades to an inert blessing instead of a load error.

use serde::{Deserialize, Serialize};

use super::effects;
use crate::hooks::BlessingHook;
use crate::types::{AttributeKey, SkillId, StrengthId};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EffectSpec {
    /// Outgoing damage multiplied by `1 + rate * stack`.
    DamageBoost { rate: f64 },
    /// Flat heal at the end of every round.
    RoundHeal { amount: f64 },
    /// Flat bonus damage on critical hits, capped by a fraction of the
    /// player's attack.
    CritBonus { value: f64, attack_cap: f64 },
    /// Permanent attack gain per kill, capped over the whole run.
    KillAttackGain { amount: f64, cap: f64 },
    /// Heal a fraction of missing health on each kill.
    KillHeal { fraction: f64 },
    /// Direct damage to the enemy every `interval` rounds.
    PeriodicStrike { interval: u32, power: f64 },
    /// Heal when the chosen skill deals no damage.
    ZeroPowerHeal { amount: f64 },
    /// End-of-round heal while any beneficial status is active.
    StatusHeal { amount: f64 },
    /// Chance to add a fraction of the target's current health as bonus
    /// damage.
    ExecuteBonus { chance: f64, fraction: f64 },
    /// Adds a skill to the player's list for the rest of the run.
    GrantSkill { skill: SkillId },
    /// Adds a passive to the player's list for the rest of the run.
    GrantStrength { strength: StrengthId },
    /// Standing per-stack bonus to one attribute, optionally capped.
    StandingStat {
        attr: AttributeKey,
        value: f64,
        #[serde(default)]
        cap: f64,
    },
    /// Widens the player's randomization interval on both ends.
    WidenRange { amount: f64 },
    /// Damage swing favoring whichever side has the lower health ratio.
    HpRatioDamage { boost: f64 },
    /// Chance for critical hits to stun the target for a round.
    CritStun { chance: f64 },
    /// Spend current health to add bonus damage.
    Sacrifice { cost_rate: f64, gain_rate: f64 },
    /// Chance each round to shift points from the higher of
    /// attack/defence to the lower.
    Rebalance { chance: f64, points: f64 },
    #[serde(other)]
    Unknown,
}

/// Build the hook handler for one effect spec.
pub fn build_effect(spec: &EffectSpec) -> Box<dyn BlessingHook> {
    match *spec {
        EffectSpec::DamageBoost { rate } => Box::new(effects::DamageBoost { rate }),
        EffectSpec::RoundHeal { amount } => Box::new(effects::RoundHeal { amount }),
        EffectSpec::CritBonus { value, attack_cap } => {
            Box::new(effects::CritBonus { value, attack_cap })
        }
        EffectSpec::KillAttackGain { amount, cap } => Box::new(effects::KillAttackGain {
            amount,
            cap,
            gained: 0.0,
        }),
        EffectSpec::KillHeal { fraction } => Box::new(effects::KillHeal { fraction }),
        EffectSpec::PeriodicStrike { interval, power } => {
            Box::new(effects::PeriodicStrike { interval, power })
        }
        EffectSpec::ZeroPowerHeal { amount } => Box::new(effects::ZeroPowerHeal { amount }),
        EffectSpec::StatusHeal { amount } => Box::new(effects::StatusHeal { amount }),
        EffectSpec::ExecuteBonus { chance, fraction } => {
            Box::new(effects::ExecuteBonus { chance, fraction })
        }
        EffectSpec::GrantSkill { skill } => Box::new(effects::GrantSkill { skill }),
        EffectSpec::GrantStrength { strength } => Box::new(effects::GrantStrength { strength }),
        EffectSpec::StandingStat { attr, value, cap } => {
            Box::new(effects::StandingStat::new(attr, value, cap))
        }
        EffectSpec::WidenRange { amount } => Box::new(effects::WidenRange {
            amount,
            applied: 0.0,
        }),
        EffectSpec::HpRatioDamage { boost } => Box::new(effects::HpRatioDamage { boost }),
        EffectSpec::CritStun { chance } => Box::new(effects::CritStun { chance }),
        EffectSpec::Sacrifice {
            cost_rate,
            gain_rate,
        } => Box::new(effects::Sacrifice {
            cost_rate,
            gain_rate,
        }),
        EffectSpec::Rebalance { chance, points } => {
            Box::new(effects::Rebalance { chance, points })
        }
        EffectSpec::Unknown => Box::new(effects::Inert),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effect_spec_parses_from_toml() {
        let spec: EffectSpec = toml::from_str(
            r#"
kind = "standing_stat"
attr = "defence"
value = 3
cap = 12
"#,
        )
        .unwrap();
        assert!(matches!(
            spec,
            EffectSpec::StandingStat {
                attr: AttributeKey::Defence,
                ..
            }
        ));
    }

    #[test]
    fn unrecognized_kind_degrades_to_unknown() {
        let spec: EffectSpec = toml::from_str(r#"kind = "from_the_future""#).unwrap();
        assert!(matches!(spec, EffectSpec::Unknown));
    }
}
