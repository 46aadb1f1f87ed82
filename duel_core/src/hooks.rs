//! Blessing hook bus
//!
//! Blessings subscribe trait objects to a small set of battle events and
//! are invoked in registration order, which keeps runs replayable under a
//! seeded rng. Handlers receive a mutable context over both units, the
//! in-flight damage value, the logs, and the rng.

use std::cell::RefCell;
use std::rc::Rc;

use rand::RngCore;

use crate::blessing::BlessingRuntime;
use crate::logs::CombatLogs;
use crate::skill::Skill;
use crate::types::{BlessingId, Side};
use crate::unit::UnitInstance;

/// Battle events the bus dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookEvent {
    BattleStart,
    RoundStart,
    BeforeAction,
    BeforeDamage,
    AfterDamage,
    Crit,
    Kill,
    RoundEnd,
}

/// Mutable view handed to every handler invocation.
///
/// `actor`/`target` are the units of the action being resolved; for
/// round-scoped events the player acts and the enemy is the target.
/// `damage` is read-write during `BeforeDamage` and applied afterwards.
pub struct HookCtx<'a> {
    pub round: u32,
    pub actor_side: Side,
    pub actor: &'a mut UnitInstance,
    pub target: &'a mut UnitInstance,
    pub skill: Option<&'a Skill>,
    pub damage: f64,
    pub critical_hit: bool,
    pub from_passive: bool,
    pub logs: &'a mut CombatLogs,
    pub rng: &'a mut dyn RngCore,
}

impl HookCtx<'_> {
    /// The player-side unit regardless of who is acting.
    pub fn player_mut(&mut self) -> &mut UnitInstance {
        match self.actor_side {
            Side::Player => &mut *self.actor,
            Side::Enemy => &mut *self.target,
        }
    }

    /// The enemy-side unit regardless of who is acting.
    pub fn enemy_mut(&mut self) -> &mut UnitInstance {
        match self.actor_side {
            Side::Player => &mut *self.target,
            Side::Enemy => &mut *self.actor,
        }
    }

    pub fn player_is_acting(&self) -> bool {
        self.actor_side == Side::Player
    }
}

/// Behavior of one installed blessing. Every method has a no-op default;
/// implementations override only the events they care about. `stack` is
/// the blessing's current stack count.
pub trait BlessingHook {
    fn on_install(&mut self, _ctx: &mut HookCtx<'_>, _stack: u32) {}
    fn on_stack_change(&mut self, _ctx: &mut HookCtx<'_>, _stack: u32) {}
    fn on_battle_start(&mut self, _ctx: &mut HookCtx<'_>, _stack: u32) {}
    fn on_round_start(&mut self, _ctx: &mut HookCtx<'_>, _stack: u32) {}
    fn on_before_action(&mut self, _ctx: &mut HookCtx<'_>, _stack: u32) {}
    fn on_before_damage(&mut self, _ctx: &mut HookCtx<'_>, _stack: u32) {}
    fn on_after_damage(&mut self, _ctx: &mut HookCtx<'_>, _stack: u32) {}
    fn on_crit(&mut self, _ctx: &mut HookCtx<'_>, _stack: u32) {}
    fn on_kill(&mut self, _ctx: &mut HookCtx<'_>, _stack: u32) {}
    fn on_round_end(&mut self, _ctx: &mut HookCtx<'_>, _stack: u32) {}
}

struct BusEntry {
    blessing_id: BlessingId,
    runtime: Rc<RefCell<BlessingRuntime>>,
    hook: Box<dyn BlessingHook>,
}

/// Ordered registry of blessing handlers.
#[derive(Default)]
pub struct HookBus {
    entries: Vec<BusEntry>,
}

impl HookBus {
    pub fn new() -> Self {
        HookBus::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Subscribe a blessing's handler and fire its install callback.
    pub fn register(
        &mut self,
        blessing_id: BlessingId,
        runtime: Rc<RefCell<BlessingRuntime>>,
        mut hook: Box<dyn BlessingHook>,
        ctx: &mut HookCtx<'_>,
    ) {
        let stack = runtime.borrow().stack;
        hook.on_install(ctx, stack);
        self.entries.push(BusEntry {
            blessing_id,
            runtime,
            hook,
        });
    }

    /// Dispatch one event to every handler, in registration order.
    pub fn emit(&mut self, event: HookEvent, ctx: &mut HookCtx<'_>) {
        for entry in &mut self.entries {
            let stack = entry.runtime.borrow().stack;
            match event {
                HookEvent::BattleStart => entry.hook.on_battle_start(ctx, stack),
                HookEvent::RoundStart => entry.hook.on_round_start(ctx, stack),
                HookEvent::BeforeAction => entry.hook.on_before_action(ctx, stack),
                HookEvent::BeforeDamage => entry.hook.on_before_damage(ctx, stack),
                HookEvent::AfterDamage => entry.hook.on_after_damage(ctx, stack),
                HookEvent::Crit => entry.hook.on_crit(ctx, stack),
                HookEvent::Kill => entry.hook.on_kill(ctx, stack),
                HookEvent::RoundEnd => entry.hook.on_round_end(ctx, stack),
            }
        }
    }

    /// Tell one blessing its stack count changed.
    pub fn notify_stack_change(&mut self, blessing_id: &str, ctx: &mut HookCtx<'_>) {
        for entry in &mut self.entries {
            if entry.blessing_id == blessing_id {
                let stack = entry.runtime.borrow().stack;
                entry.hook.on_stack_change(ctx, stack);
            }
        }
    }

    /// Drop every subscription; used when a run ends or resets.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::tests::test_unit;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    struct RecordingHook {
        tag: &'static str,
        order: Rc<RefCell<Vec<&'static str>>>,
    }

    impl BlessingHook for RecordingHook {
        fn on_round_start(&mut self, _ctx: &mut HookCtx<'_>, _stack: u32) {
            self.order.borrow_mut().push(self.tag);
        }
    }

    struct DamageDoubler;

    impl BlessingHook for DamageDoubler {
        fn on_before_damage(&mut self, ctx: &mut HookCtx<'_>, stack: u32) {
            ctx.damage *= 1.0 + stack as f64;
        }
    }

    fn with_ctx<R>(f: impl FnOnce(&mut HookCtx<'_>) -> R) -> R {
        let mut player = test_unit("Warrior", "player");
        let mut enemy = test_unit("Mage", "rival");
        let mut logs = CombatLogs::new();
        let mut rng = ChaCha8Rng::seed_from_u64(30);
        let mut ctx = HookCtx {
            round: 1,
            actor_side: Side::Player,
            actor: &mut player,
            target: &mut enemy,
            skill: None,
            damage: 10.0,
            critical_hit: false,
            from_passive: false,
            logs: &mut logs,
            rng: &mut rng,
        };
        f(&mut ctx)
    }

    fn runtime(stack: u32) -> Rc<RefCell<BlessingRuntime>> {
        Rc::new(RefCell::new(BlessingRuntime { stack, cooldown: 0 }))
    }

    #[test]
    fn handlers_fire_in_registration_order() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let mut bus = HookBus::new();
        with_ctx(|ctx| {
            for tag in ["first", "second", "third"] {
                bus.register(
                    tag.to_string(),
                    runtime(1),
                    Box::new(RecordingHook {
                        tag,
                        order: Rc::clone(&order),
                    }),
                    ctx,
                );
            }
            bus.emit(HookEvent::RoundStart, ctx);
        });
        assert_eq!(*order.borrow(), vec!["first", "second", "third"]);
    }

    #[test]
    fn before_damage_handler_sees_current_stack() {
        let mut bus = HookBus::new();
        let rt = runtime(1);
        let damage = with_ctx(|ctx| {
            bus.register("double".to_string(), Rc::clone(&rt), Box::new(DamageDoubler), ctx);
            rt.borrow_mut().stack = 3;
            bus.emit(HookEvent::BeforeDamage, ctx);
            ctx.damage
        });
        assert_eq!(damage, 40.0);
    }

    #[test]
    fn clear_drops_all_subscriptions() {
        let mut bus = HookBus::new();
        with_ctx(|ctx| {
            bus.register("double".to_string(), runtime(1), Box::new(DamageDoubler), ctx);
        });
        assert_eq!(bus.len(), 1);
        bus.clear();
        assert!(bus.is_empty());
    }

    #[test]
    fn side_accessors_resolve_through_acting_side() {
        with_ctx(|ctx| {
            assert_eq!(ctx.player_mut().owner, "player");
            assert_eq!(ctx.enemy_mut().owner, "rival");
            assert!(ctx.player_is_acting());
        });
    }
}
