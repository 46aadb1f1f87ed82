//! Action resolution: one skill or passive run end to end
//!
//! The pipeline is damage, then statuses, then attribute deltas, with
//! hook emissions woven in at fixed points. A dodged attack skips the
//! status and delta phases entirely.

use rand::RngCore;

use super::damage::calculate_damage;
use super::result::{format_hit_line, DamageOutcome};
use super::{apply_change_value, apply_status, check_condition};
use crate::hooks::{HookBus, HookCtx, HookEvent};
use crate::logs::{CombatLogs, EffectSignal};
use crate::skill::{Skill, Strength};
use crate::types::Side;
use crate::unit::UnitInstance;

/// Per-action environment threaded through the resolution pipeline.
pub struct ActionEnv<'a> {
    pub round: u32,
    pub actor_side: Side,
    pub bus: &'a mut HookBus,
    pub logs: &'a mut CombatLogs,
    pub rng: &'a mut dyn RngCore,
}

fn emit_hook(
    env: &mut ActionEnv<'_>,
    event: HookEvent,
    attacker: &mut UnitInstance,
    defender: &mut UnitInstance,
    skill: Option<&Skill>,
    damage: f64,
    critical_hit: bool,
    from_passive: bool,
) -> f64 {
    let mut ctx = HookCtx {
        round: env.round,
        actor_side: env.actor_side,
        actor: attacker,
        target: defender,
        skill,
        damage,
        critical_hit,
        from_passive,
        logs: &mut *env.logs,
        rng: &mut *env.rng,
    };
    env.bus.emit(event, &mut ctx);
    ctx.damage
}

fn run_pipeline(
    attacker: &mut UnitInstance,
    defender: &mut UnitInstance,
    skill: &Skill,
    from_passive: bool,
    env: &mut ActionEnv<'_>,
) -> DamageOutcome {
    let mut outcome = DamageOutcome::zero(String::new());

    if skill.power > 0.0 {
        let raw = calculate_damage(attacker, defender, skill, from_passive, &mut env.rng);
        if raw.is_missed {
            env.logs.log(raw.description.clone());
            env.logs.signal(EffectSignal::Miss);
            return raw;
        }
        let adjusted = emit_hook(
            env,
            HookEvent::BeforeDamage,
            attacker,
            defender,
            Some(skill),
            raw.damage,
            raw.critical_hit,
            from_passive,
        );
        let applied = adjusted.max(0.0);
        defender.hp = (defender.hp - applied).max(0.0);
        let line = format_hit_line(attacker, defender, applied, raw.critical_hit, raw.healed, from_passive);
        env.logs.log(line.clone());
        if applied > 0.0 {
            env.logs.signal(EffectSignal::Hit {
                damage: applied,
                critical: raw.critical_hit,
            });
        }
        emit_hook(
            env,
            HookEvent::AfterDamage,
            attacker,
            defender,
            Some(skill),
            applied,
            raw.critical_hit,
            from_passive,
        );
        if raw.critical_hit {
            emit_hook(
                env,
                HookEvent::Crit,
                attacker,
                defender,
                Some(skill),
                applied,
                true,
                from_passive,
            );
        }
        outcome = DamageOutcome {
            damage: applied,
            is_missed: false,
            critical_hit: raw.critical_hit,
            healed: raw.healed,
            description: line,
        };
    }

    let status = apply_status(attacker, defender, skill, &mut env.rng);
    let status_applied = !status.lines.is_empty() && !status.is_missed;
    for line in &status.lines {
        env.logs.log(line.clone());
    }
    if status.is_missed {
        env.logs.signal(EffectSignal::Miss);
        return outcome;
    }
    if status_applied {
        env.logs.signal(EffectSignal::Status);
    }

    let change_lines = apply_change_value(attacker, defender, skill, &mut env.rng);
    if !change_lines.is_empty() {
        env.logs.signal(EffectSignal::Status);
    }
    for line in change_lines {
        env.logs.log(line);
    }

    outcome
}

/// Resolve one chosen skill for the acting unit, then per-round
/// regeneration and the actor's passives.
pub fn execute_skill(
    attacker: &mut UnitInstance,
    defender: &mut UnitInstance,
    skill: &Skill,
    strengths: &[Strength],
    env: &mut ActionEnv<'_>,
) -> DamageOutcome {
    env.logs.log(format!(
        "{}'s {} used {}",
        attacker.owner, attacker.name, skill.name
    ));
    let outcome = run_pipeline(attacker, defender, skill, false, env);

    if attacker.heal_per_round > 0.0 {
        let restored = attacker.heal(attacker.heal_per_round);
        if restored > 0.0 {
            env.logs.log(format!(
                "{}'s {} regenerated {:.0} health",
                attacker.owner, attacker.name, restored
            ));
        }
    }

    for strength in strengths {
        execute_strength(attacker, defender, strength, env);
    }

    outcome
}

/// Evaluate and, if triggered, resolve one passive. Returns whether it
/// fired.
pub fn execute_strength(
    attacker: &mut UnitInstance,
    defender: &mut UnitInstance,
    strength: &Strength,
    env: &mut ActionEnv<'_>,
) -> bool {
    if !check_condition(
        strength.condition.as_ref(),
        attacker,
        defender,
        env.round,
        &mut env.rng,
    ) {
        return false;
    }
    env.logs.log(format!(
        "{}'s {} triggered {}",
        attacker.owner, attacker.name, strength.name
    ));
    let skill = strength.as_skill();
    run_pipeline(attacker, defender, &skill, true, env);
    true
}
