//! Damage resolution output and log line formatting

use crate::unit::UnitInstance;

/// Outcome of one `calculate_damage` call. `damage` has not been applied
/// to the defender yet; hook handlers may still adjust it.
#[derive(Debug, Clone)]
pub struct DamageOutcome {
    pub damage: f64,
    pub is_missed: bool,
    pub critical_hit: bool,
    /// Life restored to the attacker by life steal.
    pub healed: f64,
    pub description: String,
}

impl DamageOutcome {
    pub fn zero(description: impl Into<String>) -> Self {
        DamageOutcome {
            damage: 0.0,
            is_missed: false,
            critical_hit: false,
            healed: 0.0,
            description: description.into(),
        }
    }

    pub fn missed(description: impl Into<String>) -> Self {
        DamageOutcome {
            damage: 0.0,
            is_missed: true,
            critical_hit: false,
            healed: 0.0,
            description: description.into(),
        }
    }
}

pub(crate) fn format_dodge_line(defender: &UnitInstance, is_passive: bool) -> String {
    format!(
        "{}'s {} dodged the {}attack",
        defender.owner,
        defender.name,
        if is_passive { "passive " } else { "" }
    )
}

pub(crate) fn format_hit_line(
    attacker: &UnitInstance,
    defender: &UnitInstance,
    damage: f64,
    critical_hit: bool,
    healed: f64,
    is_passive: bool,
) -> String {
    if is_passive {
        format!(
            "{}'s {} passive dealt {} damage to {}'s {}",
            attacker.owner,
            attacker.name,
            damage.floor(),
            defender.owner,
            defender.name
        )
    } else {
        let mut line = format!(
            "{}'s {} dealt {} damage to {}'s {}",
            attacker.owner,
            attacker.name,
            damage.floor(),
            defender.owner,
            defender.name
        );
        if critical_hit {
            line.push_str(" (critical)");
        }
        if healed > 0.0 {
            line.push_str(&format!(" (drained {})", healed.floor()));
        }
        line
    }
}
