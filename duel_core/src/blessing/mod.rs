//! Blessing definitions, ownership, and installation
//!
//! A blessing is a draftable run-scoped modifier. Its definition comes
//! from the content tables; its behavior is a hook handler built by the
//! registry; its mutable stack count lives in a `BlessingRuntime` shared
//! between the owned list and the hook bus.

mod effects;
mod registry;

pub use registry::{build_effect, EffectSpec};

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::hooks::{HookBus, HookCtx};
use crate::types::{BlessingId, Quality};

fn default_max_stack() -> u32 {
    3
}

/// Static blessing definition from the content tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlessingDef {
    pub id: BlessingId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub quality: Quality,
    /// False means the blessing can be taken once and never stacks.
    #[serde(default)]
    pub repeatable: bool,
    #[serde(default = "default_max_stack")]
    pub max_stack: u32,
    pub effect: EffectSpec,
}

impl BlessingDef {
    pub fn stack_limit(&self) -> u32 {
        if self.repeatable {
            self.max_stack.max(1)
        } else {
            1
        }
    }
}

/// Mutable per-run state of one owned blessing, shared with the bus.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlessingRuntime {
    pub stack: u32,
    pub cooldown: u32,
}

/// One blessing the player holds, paired with its live runtime.
#[derive(Clone)]
pub struct OwnedBlessing {
    pub def: BlessingDef,
    pub runtime: Rc<RefCell<BlessingRuntime>>,
}

impl OwnedBlessing {
    pub fn stack(&self) -> u32 {
        self.runtime.borrow().stack
    }
}

/// Install a blessing or raise its stack. New blessings get a handler
/// from the registry and a bus subscription; repeats bump the shared
/// stack and notify the existing handler.
pub fn install_blessing(
    owned: &mut Vec<OwnedBlessing>,
    bus: &mut HookBus,
    def: &BlessingDef,
    ctx: &mut HookCtx<'_>,
) -> Result<(), String> {
    if let Some(existing) = owned.iter().find(|b| b.def.id == def.id) {
        let stack = existing.stack();
        if stack >= def.stack_limit() {
            return Err(format!("{} is already at max stacks", def.name));
        }
        existing.runtime.borrow_mut().stack = stack + 1;
        ctx.logs
            .side_log(format!("{} rose to {} stacks", def.name, stack + 1));
        bus.notify_stack_change(&def.id, ctx);
        return Ok(());
    }

    let runtime = Rc::new(RefCell::new(BlessingRuntime {
        stack: 1,
        cooldown: 0,
    }));
    let hook = build_effect(&def.effect);
    ctx.logs.side_log(format!("Gained blessing: {}", def.name));
    bus.register(def.id.clone(), Rc::clone(&runtime), hook, ctx);
    owned.push(OwnedBlessing {
        def: def.clone(),
        runtime,
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::tests::test_unit;
    use crate::logs::CombatLogs;
    use crate::types::Side;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn def(id: &str, repeatable: bool, max_stack: u32) -> BlessingDef {
        BlessingDef {
            id: id.to_string(),
            name: "Keen Edge".to_string(),
            description: String::new(),
            quality: Quality::B,
            repeatable,
            max_stack,
            effect: EffectSpec::DamageBoost { rate: 0.12 },
        }
    }

    fn install(owned: &mut Vec<OwnedBlessing>, bus: &mut HookBus, d: &BlessingDef) -> Result<(), String> {
        let mut player = test_unit("Warrior", "player");
        let mut enemy = test_unit("Mage", "rival");
        let mut logs = CombatLogs::new();
        let mut rng = ChaCha8Rng::seed_from_u64(50);
        let mut ctx = HookCtx {
            round: 1,
            actor_side: Side::Player,
            actor: &mut player,
            target: &mut enemy,
            skill: None,
            damage: 0.0,
            critical_hit: false,
            from_passive: false,
            logs: &mut logs,
            rng: &mut rng,
        };
        install_blessing(owned, bus, d, &mut ctx)
    }

    #[test]
    fn repeat_install_raises_stack_to_limit() {
        let mut owned = Vec::new();
        let mut bus = HookBus::new();
        let d = def("keen_edge", true, 2);
        assert!(install(&mut owned, &mut bus, &d).is_ok());
        assert!(install(&mut owned, &mut bus, &d).is_ok());
        assert_eq!(owned[0].stack(), 2);
        assert!(install(&mut owned, &mut bus, &d).is_err());
        assert_eq!(owned.len(), 1);
        assert_eq!(bus.len(), 1);
    }

    #[test]
    fn non_repeatable_blessing_caps_at_one_stack() {
        let mut owned = Vec::new();
        let mut bus = HookBus::new();
        let d = def("keen_edge", false, 5);
        assert_eq!(d.stack_limit(), 1);
        assert!(install(&mut owned, &mut bus, &d).is_ok());
        assert!(install(&mut owned, &mut bus, &d).is_err());
    }

    #[test]
    fn unknown_effect_from_toml_still_installs() {
        let d: BlessingDef = toml::from_str(
            r#"
id = "mystery"
name = "Mystery"
quality = "C"

[effect]
kind = "not_a_real_effect"
"#,
        )
        .unwrap();
        assert!(matches!(d.effect, EffectSpec::Unknown));
        let mut owned = Vec::new();
        let mut bus = HookBus::new();
        assert!(install(&mut owned, &mut bus, &d).is_ok());
        assert_eq!(owned[0].stack(), 1);
    }
}
