//! Hook handler implementations for the blessing effects
//!
//! Handlers act on the player side: offensive ones check that the player
//! is acting, defensive ones that the player is the target. Standing
//! bonuses track what they already applied so stack changes and battle
//! restarts adjust by the difference instead of stacking drift.

use rand::Rng;

use crate::hooks::{BlessingHook, HookCtx};
use crate::types::{AttributeKey, SkillId, StrengthId};

pub(crate) struct DamageBoost {
    pub rate: f64,
}

impl BlessingHook for DamageBoost {
    fn on_before_damage(&mut self, ctx: &mut HookCtx<'_>, stack: u32) {
        if ctx.player_is_acting() {
            ctx.damage *= 1.0 + self.rate * stack as f64;
        }
    }
}

pub(crate) struct RoundHeal {
    pub amount: f64,
}

impl BlessingHook for RoundHeal {
    fn on_round_end(&mut self, ctx: &mut HookCtx<'_>, stack: u32) {
        let amount = self.amount * stack as f64;
        let player = ctx.player_mut();
        let restored = player.heal(amount);
        if restored > 0.0 {
            let line = format!("{} recovered {:.0} health", player.name, restored);
            ctx.logs.side_log(line);
        }
    }
}

pub(crate) struct CritBonus {
    pub value: f64,
    pub attack_cap: f64,
}

impl BlessingHook for CritBonus {
    fn on_before_damage(&mut self, ctx: &mut HookCtx<'_>, stack: u32) {
        if ctx.player_is_acting() && ctx.critical_hit {
            let cap = ctx.actor.attack * self.attack_cap;
            ctx.damage += (self.value * stack as f64).min(cap);
        }
    }
}

pub(crate) struct KillAttackGain {
    pub amount: f64,
    pub cap: f64,
    pub gained: f64,
}

impl BlessingHook for KillAttackGain {
    fn on_kill(&mut self, ctx: &mut HookCtx<'_>, stack: u32) {
        let gain = (self.amount * stack as f64).min(self.cap - self.gained);
        if gain <= 0.0 {
            return;
        }
        self.gained += gain;
        let player = ctx.player_mut();
        player.attack += gain;
        player.clamp_attr(AttributeKey::Attack);
        let line = format!("{} gained {:.0} attack from the kill", player.name, gain);
        ctx.logs.side_log(line);
    }
}

pub(crate) struct KillHeal {
    pub fraction: f64,
}

impl BlessingHook for KillHeal {
    fn on_kill(&mut self, ctx: &mut HookCtx<'_>, stack: u32) {
        let fraction = self.fraction * stack as f64;
        let player = ctx.player_mut();
        let missing = player.hp_count - player.hp;
        let restored = player.heal(missing * fraction);
        if restored > 0.0 {
            let line = format!("{} recovered {:.0} health from the kill", player.name, restored);
            ctx.logs.side_log(line);
        }
    }
}

pub(crate) struct PeriodicStrike {
    pub interval: u32,
    pub power: f64,
}

impl BlessingHook for PeriodicStrike {
    fn on_round_start(&mut self, ctx: &mut HookCtx<'_>, stack: u32) {
        if self.interval == 0 || ctx.round % self.interval != 0 {
            return;
        }
        let damage = self.power * stack as f64;
        let enemy = ctx.enemy_mut();
        enemy.hp = (enemy.hp - damage).max(0.0);
        let line = format!("{}'s {} was seared for {:.0} damage", enemy.owner, enemy.name, damage);
        ctx.logs.log(line);
    }
}

pub(crate) struct ZeroPowerHeal {
    pub amount: f64,
}

impl BlessingHook for ZeroPowerHeal {
    fn on_before_action(&mut self, ctx: &mut HookCtx<'_>, stack: u32) {
        if !ctx.player_is_acting() {
            return;
        }
        if !ctx.skill.map_or(false, |s| s.power == 0.0) {
            return;
        }
        let amount = self.amount * stack as f64;
        let player = ctx.player_mut();
        let restored = player.heal(amount);
        if restored > 0.0 {
            let line = format!("{} recovered {:.0} health while casting", player.name, restored);
            ctx.logs.side_log(line);
        }
    }
}

pub(crate) struct StatusHeal {
    pub amount: f64,
}

impl BlessingHook for StatusHeal {
    fn on_round_end(&mut self, ctx: &mut HookCtx<'_>, stack: u32) {
        let amount = self.amount * stack as f64;
        let player = ctx.player_mut();
        if !player.has_positive_status() {
            return;
        }
        let restored = player.heal(amount);
        if restored > 0.0 {
            let line = format!("{} drew {:.0} health from the lingering boon", player.name, restored);
            ctx.logs.side_log(line);
        }
    }
}

pub(crate) struct ExecuteBonus {
    pub chance: f64,
    pub fraction: f64,
}

impl BlessingHook for ExecuteBonus {
    fn on_before_damage(&mut self, ctx: &mut HookCtx<'_>, stack: u32) {
        if !ctx.player_is_acting() || ctx.from_passive {
            return;
        }
        if ctx.rng.gen::<f64>() >= self.chance {
            return;
        }
        let bonus = ctx.target.hp * self.fraction * stack as f64;
        ctx.damage += bonus;
        let line = format!("The strike bit deeper for {:.0} bonus damage", bonus);
        ctx.logs.side_log(line);
    }
}

pub(crate) struct GrantSkill {
    pub skill: SkillId,
}

impl GrantSkill {
    fn grant(&self, ctx: &mut HookCtx<'_>) {
        let skill = self.skill;
        let player = ctx.player_mut();
        if !player.skill_list.contains(&skill) {
            player.skill_list.push(skill);
        }
    }
}

impl BlessingHook for GrantSkill {
    fn on_install(&mut self, ctx: &mut HookCtx<'_>, _stack: u32) {
        self.grant(ctx);
    }

    // Battles rebuild the player instance, so the grant re-applies.
    fn on_battle_start(&mut self, ctx: &mut HookCtx<'_>, _stack: u32) {
        self.grant(ctx);
    }
}

pub(crate) struct GrantStrength {
    pub strength: StrengthId,
}

impl GrantStrength {
    fn grant(&self, ctx: &mut HookCtx<'_>) {
        let strength = self.strength;
        let player = ctx.player_mut();
        if !player.strengths.contains(&strength) {
            player.strengths.push(strength);
        }
    }
}

impl BlessingHook for GrantStrength {
    fn on_install(&mut self, ctx: &mut HookCtx<'_>, _stack: u32) {
        self.grant(ctx);
    }

    fn on_battle_start(&mut self, ctx: &mut HookCtx<'_>, _stack: u32) {
        self.grant(ctx);
    }
}

pub(crate) struct StandingStat {
    attr: AttributeKey,
    value: f64,
    cap: f64,
    applied: f64,
}

impl StandingStat {
    pub(crate) fn new(attr: AttributeKey, value: f64, cap: f64) -> Self {
        StandingStat {
            attr,
            value,
            cap,
            applied: 0.0,
        }
    }

    fn sync(&mut self, ctx: &mut HookCtx<'_>, stack: u32) {
        let mut desired = self.value * stack as f64;
        if self.cap > 0.0 {
            desired = desired.clamp(-self.cap, self.cap);
        }
        let delta = desired - self.applied;
        if delta == 0.0 {
            return;
        }
        let attr = self.attr;
        let player = ctx.player_mut();
        if let Some(current) = player.attr(attr) {
            player.set_attr(attr, current + delta);
            player.clamp_attr(attr);
        }
        self.applied = desired;
    }
}

impl BlessingHook for StandingStat {
    fn on_install(&mut self, ctx: &mut HookCtx<'_>, stack: u32) {
        self.sync(ctx, stack);
    }

    fn on_stack_change(&mut self, ctx: &mut HookCtx<'_>, stack: u32) {
        self.sync(ctx, stack);
    }

    fn on_battle_start(&mut self, ctx: &mut HookCtx<'_>, stack: u32) {
        // Fresh instance carries none of the bonus yet.
        self.applied = 0.0;
        self.sync(ctx, stack);
    }
}

pub(crate) struct WidenRange {
    pub amount: f64,
    pub applied: f64,
}

impl WidenRange {
    fn sync(&mut self, ctx: &mut HookCtx<'_>, stack: u32) {
        let desired = self.amount * stack as f64;
        let delta = desired - self.applied;
        if delta == 0.0 {
            return;
        }
        let player = ctx.player_mut();
        player.random_rate.high += delta;
        player.random_rate.low = (player.random_rate.low - delta).max(0.1);
        self.applied = desired;
    }
}

impl BlessingHook for WidenRange {
    fn on_install(&mut self, ctx: &mut HookCtx<'_>, stack: u32) {
        self.sync(ctx, stack);
    }

    fn on_stack_change(&mut self, ctx: &mut HookCtx<'_>, stack: u32) {
        self.sync(ctx, stack);
    }

    fn on_battle_start(&mut self, ctx: &mut HookCtx<'_>, stack: u32) {
        self.applied = 0.0;
        self.sync(ctx, stack);
    }
}

pub(crate) struct HpRatioDamage {
    pub boost: f64,
}

impl BlessingHook for HpRatioDamage {
    fn on_before_damage(&mut self, ctx: &mut HookCtx<'_>, stack: u32) {
        let swing = self.boost * stack as f64;
        let actor_ratio = ctx.actor.hp_ratio();
        let target_ratio = ctx.target.hp_ratio();
        if ctx.player_is_acting() && actor_ratio < target_ratio {
            ctx.damage *= 1.0 + swing;
        } else if !ctx.player_is_acting() && target_ratio < actor_ratio {
            ctx.damage *= (1.0 - swing).max(0.0);
        }
    }
}

pub(crate) struct CritStun {
    pub chance: f64,
}

impl BlessingHook for CritStun {
    fn on_crit(&mut self, ctx: &mut HookCtx<'_>, stack: u32) {
        if !ctx.player_is_acting() {
            return;
        }
        let chance = (self.chance * stack as f64).min(1.0);
        if ctx.rng.gen::<f64>() >= chance {
            return;
        }
        ctx.target.stop_round += 1;
        let line = format!(
            "{}'s {} was staggered by the critical blow",
            ctx.target.owner, ctx.target.name
        );
        ctx.logs.log(line);
    }
}

pub(crate) struct Sacrifice {
    pub cost_rate: f64,
    pub gain_rate: f64,
}

impl BlessingHook for Sacrifice {
    fn on_before_damage(&mut self, ctx: &mut HookCtx<'_>, stack: u32) {
        if !ctx.player_is_acting() || ctx.from_passive {
            return;
        }
        let cost = ctx.actor.hp * self.cost_rate;
        if ctx.actor.hp - cost <= 1.0 {
            return;
        }
        ctx.actor.hp -= cost;
        ctx.damage += cost * self.gain_rate * stack as f64;
    }
}

pub(crate) struct Rebalance {
    pub chance: f64,
    pub points: f64,
}

impl BlessingHook for Rebalance {
    fn on_round_start(&mut self, ctx: &mut HookCtx<'_>, _stack: u32) {
        if ctx.rng.gen::<f64>() >= self.chance {
            return;
        }
        let points = self.points;
        let player = ctx.player_mut();
        if player.attack > player.defence {
            player.attack -= points;
            player.defence += points;
        } else {
            player.defence -= points;
            player.attack += points;
        }
        player.clamp_attr(AttributeKey::Attack);
        player.clamp_attr(AttributeKey::Defence);
        let line = format!("{}'s strength shifted in the balance", player.name);
        ctx.logs.side_log(line);
    }
}

/// Placeholder for effect kinds this build does not know.
pub(crate) struct Inert;

impl BlessingHook for Inert {
    fn on_install(&mut self, ctx: &mut HookCtx<'_>, _stack: u32) {
        ctx.logs.side_log("The blessing lies dormant".to_string());
    }
}
