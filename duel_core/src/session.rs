//! Battle session: run lifecycle, turn loop, drafts, and progression
//!
//! The session is the headless engine a frontend drives: it owns the
//! units, the hook bus, the rng, the logs, and every rule about what the
//! player may do when. All rejections come back as `Err(String)` so a
//! presentation layer can surface them verbatim.

use log::{debug, info, warn};
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};

use crate::blessing::{install_blessing, OwnedBlessing};
use crate::combat::{decide_order, execute_skill, reduce_round, ActionEnv};
use crate::content::ContentTables;
use crate::draft::{
    build_mid_draft, build_pre_draft, draft_budget, refresh_pre_draft, DraftCandidate, DraftSlot,
    HALF_HP_DRAFT_FROM_ENEMY, MID_DRAFT_INTERVAL, REFRESH_COST,
};
use crate::equipment::{apply_equipments, Equipment, MAX_EQUIPMENT_SLOTS};
use crate::hooks::{HookBus, HookCtx, HookEvent};
use crate::logs::{CombatLogs, EffectSignal};
use crate::persist::{PersistError, ProgressionStore};
use crate::progression::{point_gain, ProgressionData, DEFAULT_POINT_ATTRS};
use crate::skill::{Skill, Strength};
use crate::types::{AttributeKey, Difficulty, Side, SkillId, StrengthId, UnitId};
use crate::unit::UnitInstance;

/// Rounds per log segment; older segments are dropped.
const LOG_SEGMENT_ROUNDS: u32 = 100;
/// Chance a critical produces a flavor float text, rolled per side.
const CRIT_TEXT_CHANCE: f64 = 0.75;
/// Floated over the unit that took the critical.
const CRIT_PAIN_TEXTS: [&str; 4] = [
    "A telling blow!",
    "Right through the guard!",
    "The crowd winces.",
    "Clean and cruel.",
];
/// Floated over the unit that landed it.
const CRIT_TAUNT_TEXTS: [&str; 4] = [
    "Too slow!",
    "Is that all?",
    "Stay standing.",
    "Again!",
];
/// Passives granted to enemies on the higher difficulties.
const BONUS_STRENGTHS: [StrengthId; 2] = [6, 2];
/// Per-kill stat growth for chained spawns.
const CHAIN_GROWTH_PER_KILL: f64 = 0.05;
const CHAIN_GROWTH_CAP: f64 = 0.15;
const CHAIN_HEAL_PER_KILL: f64 = 1.0;
const CHAIN_CRIT_HURT_PER_KILL: f64 = 0.1;

/// Suggested animation delays, milliseconds. Data only; the engine
/// never sleeps.
#[derive(Debug, Clone, Copy)]
pub struct Pacing {
    pub player_act_ms: u64,
    pub enemy_act_ms: u64,
    pub round_gap_ms: u64,
}

pub const PACING: Pacing = Pacing {
    player_act_ms: 800,
    enemy_act_ms: 800,
    round_gap_ms: 1000,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Select,
    PreDraft,
    Battle,
    Victory,
    Defeat,
}

/// Flavor text a frontend floats over a unit.
#[derive(Debug, Clone)]
pub struct FloatText {
    pub text: String,
    pub side: Side,
    pub token: u64,
}

struct DifficultyConfig {
    hp: f64,
    attack: f64,
    defence: f64,
    heal_bonus: f64,
    miss_bonus: f64,
    crit_bonus: f64,
    extra_strengths: usize,
}

fn difficulty_config(difficulty: Difficulty) -> DifficultyConfig {
    match difficulty {
        Difficulty::Normal => DifficultyConfig {
            hp: 1.0,
            attack: 1.0,
            defence: 1.0,
            heal_bonus: 0.0,
            miss_bonus: 0.0,
            crit_bonus: 0.0,
            extra_strengths: 0,
        },
        Difficulty::Hard => DifficultyConfig {
            hp: 1.15,
            attack: 1.15,
            defence: 1.0,
            heal_bonus: 3.0,
            miss_bonus: 0.015,
            crit_bonus: 0.025,
            extra_strengths: 0,
        },
        Difficulty::Extreme => DifficultyConfig {
            hp: 1.3,
            attack: 1.3,
            defence: 1.05,
            heal_bonus: 6.0,
            miss_bonus: 0.03,
            crit_bonus: 0.05,
            extra_strengths: 0,
        },
        Difficulty::Expert => DifficultyConfig {
            hp: 1.5,
            attack: 1.5,
            defence: 1.1,
            heal_bonus: 9.0,
            miss_bonus: 0.045,
            crit_bonus: 0.075,
            extra_strengths: 1,
        },
        Difficulty::Inferno => DifficultyConfig {
            hp: 1.75,
            attack: 1.75,
            defence: 1.15,
            heal_bonus: 12.0,
            miss_bonus: 0.06,
            crit_bonus: 0.1,
            extra_strengths: 1,
        },
    }
}

/// Pre-draft shop state. Selections are pending until the draft is
/// confirmed at battle start; nothing is owned before that.
pub struct PreDraft {
    pub slots: Vec<DraftSlot>,
    pub budget: u32,
}

impl PreDraft {
    /// Combined price of the currently selected slots.
    pub fn selected_cost(&self) -> u32 {
        self.slots
            .iter()
            .filter(|s| s.selected)
            .map(|s| s.candidate.cost())
            .sum()
    }

    pub fn remaining(&self) -> u32 {
        self.budget.saturating_sub(self.selected_cost())
    }
}

pub struct BattleSession {
    tables: ContentTables,
    store: Box<dyn ProgressionStore>,
    rng: Box<dyn RngCore>,
    progression: ProgressionData,
    phase: Phase,
    difficulty: Difficulty,
    chain_mode: bool,
    randomize: bool,
    selected_unit: UnitId,
    player: Option<UnitInstance>,
    enemy: Option<UnitInstance>,
    enemy_id: UnitId,
    /// 1-based count of the opponent currently in the circle.
    enemy_index: u32,
    /// Chained kills so far; drives spawn growth.
    chain_growth: u32,
    kills: u32,
    owned: Vec<OwnedBlessing>,
    bus: HookBus,
    equipment: Vec<Equipment>,
    logs: CombatLogs,
    round: u32,
    busy: bool,
    pre_draft: Option<PreDraft>,
    mid_draft: Option<Vec<DraftCandidate>>,
    draft_openings: u32,
    half_hp_draft_used: bool,
    session_token: u64,
    float_texts: Vec<FloatText>,
    float_token: u64,
}

fn emit_event(
    bus: &mut HookBus,
    event: HookEvent,
    round: u32,
    player: &mut UnitInstance,
    enemy: &mut UnitInstance,
    logs: &mut CombatLogs,
    rng: &mut dyn RngCore,
) {
    let mut ctx = HookCtx {
        round,
        actor_side: Side::Player,
        actor: player,
        target: enemy,
        skill: None,
        damage: 0.0,
        critical_hit: false,
        from_passive: false,
        logs,
        rng,
    };
    bus.emit(event, &mut ctx);
}

impl BattleSession {
    pub fn new(
        tables: ContentTables,
        store: Box<dyn ProgressionStore>,
        rng: Box<dyn RngCore>,
    ) -> Result<Self, PersistError> {
        let progression = store.load()?;
        let selected_unit = tables.player_id;
        Ok(BattleSession {
            tables,
            store,
            rng,
            progression,
            phase: Phase::Select,
            difficulty: Difficulty::Normal,
            chain_mode: false,
            randomize: false,
            selected_unit,
            player: None,
            enemy: None,
            enemy_id: 0,
            enemy_index: 1,
            chain_growth: 0,
            kills: 0,
            owned: Vec::new(),
            bus: HookBus::new(),
            equipment: Vec::new(),
            logs: CombatLogs::new(),
            round: 1,
            busy: false,
            pre_draft: None,
            mid_draft: None,
            draft_openings: 0,
            half_hp_draft_used: false,
            session_token: 0,
            float_texts: Vec::new(),
            float_token: 0,
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn kills(&self) -> u32 {
        self.kills
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn chain_mode(&self) -> bool {
        self.chain_mode
    }

    pub fn randomize(&self) -> bool {
        self.randomize
    }

    pub fn selected_unit(&self) -> UnitId {
        self.selected_unit
    }

    pub fn session_token(&self) -> u64 {
        self.session_token
    }

    pub fn logs(&self) -> &CombatLogs {
        &self.logs
    }

    pub fn player(&self) -> Option<&UnitInstance> {
        self.player.as_ref()
    }

    pub fn enemy(&self) -> Option<&UnitInstance> {
        self.enemy.as_ref()
    }

    pub fn owned_blessings(&self) -> &[OwnedBlessing] {
        &self.owned
    }

    pub fn equipment(&self) -> &[Equipment] {
        &self.equipment
    }

    pub fn progression(&self) -> &ProgressionData {
        &self.progression
    }

    pub fn pre_draft(&self) -> Option<&PreDraft> {
        self.pre_draft.as_ref()
    }

    pub fn mid_draft(&self) -> Option<&[DraftCandidate]> {
        self.mid_draft.as_deref()
    }

    pub fn pacing(&self) -> Pacing {
        PACING
    }

    /// Animation tokens produced since the last drain.
    pub fn drain_signals(&mut self) -> Vec<EffectSignal> {
        std::mem::take(&mut self.logs.signals)
    }

    pub fn take_float_texts(&mut self) -> Vec<FloatText> {
        std::mem::take(&mut self.float_texts)
    }

    /// Player's currently selectable skills.
    pub fn selectable_skills(&self) -> Vec<&Skill> {
        let ids = match &self.player {
            Some(player) => &player.skill_list,
            None => return Vec::new(),
        };
        let all = self.tables.skills_of(ids);
        let visible: Vec<&Skill> = all.iter().copied().filter(|s| !s.hidden).collect();
        if visible.is_empty() {
            all
        } else {
            visible
        }
    }

    // ----- run setup -----------------------------------------------------

    pub fn set_difficulty(&mut self, difficulty: Difficulty) -> Result<(), String> {
        self.difficulty = difficulty;
        self.logs
            .side_log(format!("Difficulty set to {}", difficulty.label()));
        // A live enemy is rebuilt under the new multipliers at the same
        // health ratio.
        if self.phase == Phase::Battle {
            if let Some(old) = &self.enemy {
                let ratio = old.hp_ratio();
                let mut rebuilt = self.build_enemy(self.enemy_id)?;
                rebuilt.hp = rebuilt.hp_count * ratio;
                self.enemy = Some(rebuilt);
            }
        }
        Ok(())
    }

    pub fn toggle_chain_mode(&mut self) -> Result<(), String> {
        if self.phase == Phase::Battle {
            return Err("cannot change modes mid-battle".to_string());
        }
        self.chain_mode = !self.chain_mode;
        self.logs.side_log(format!(
            "Chain mode {}",
            if self.chain_mode { "on" } else { "off" }
        ));
        Ok(())
    }

    pub fn toggle_randomize(&mut self) -> Result<(), String> {
        if self.phase == Phase::Battle {
            return Err("cannot change modes mid-battle".to_string());
        }
        self.randomize = !self.randomize;
        self.logs.side_log(format!(
            "Attribute randomization {}",
            if self.randomize { "on" } else { "off" }
        ));
        Ok(())
    }

    fn mode_multiplier(&self) -> f64 {
        let mut mul = 1.0;
        if self.chain_mode {
            mul += 0.2;
        }
        if self.randomize {
            mul += 0.1;
        }
        mul
    }

    fn build_player(&mut self) -> Result<UnitInstance, String> {
        let template = self
            .tables
            .unit(self.selected_unit)
            .ok_or("selected unit missing from content")?;
        let mut player = UnitInstance::from_template(template, "player");
        if self.randomize {
            player.apply_random_mode(&mut self.rng);
        }
        // Allocation first, equipment on top of the allocated stats.
        self.progression.apply_to_unit(&mut player);
        apply_equipments(&mut player, &self.equipment);
        Ok(player)
    }

    /// Draw the next opponent: any unit but the player's pick.
    fn pick_enemy_id(&mut self) -> Result<UnitId, String> {
        let pool: Vec<UnitId> = self
            .tables
            .units
            .iter()
            .map(|u| u.id)
            .filter(|&id| id != self.selected_unit)
            .collect();
        pool.choose(&mut self.rng)
            .copied()
            .ok_or_else(|| "no opponent available".to_string())
    }

    fn build_enemy(&mut self, id: UnitId) -> Result<UnitInstance, String> {
        let template = self
            .tables
            .unit(id)
            .ok_or_else(|| format!("enemy unit {id} missing from content"))?;
        let mut enemy = UnitInstance::from_template(template, "rival");
        if self.randomize {
            enemy.apply_random_mode(&mut self.rng);
        }
        let config = difficulty_config(self.difficulty);
        enemy.hp_count *= config.hp;
        enemy.attack *= config.attack;
        enemy.defence *= config.defence;
        enemy.heal_per_round += config.heal_bonus;
        enemy.miss_rate += config.miss_bonus;
        enemy.critical_rate += config.crit_bonus;
        for id in BONUS_STRENGTHS.iter().take(config.extra_strengths) {
            if !enemy.strengths.contains(id) {
                enemy.strengths.push(*id);
            }
        }
        // Every chained spawn grows with the kill count, from the first.
        if self.chain_growth > 0 {
            let level = self.chain_growth as f64;
            let growth = 1.0 + (CHAIN_GROWTH_PER_KILL * level).min(CHAIN_GROWTH_CAP);
            enemy.hp_count *= growth;
            enemy.attack *= growth;
            enemy.defence *= growth;
            enemy.heal_per_round += CHAIN_HEAL_PER_KILL * level;
            enemy.critical_hurt_rate += CHAIN_CRIT_HURT_PER_KILL * level;
        }
        for key in [
            AttributeKey::Attack,
            AttributeKey::Defence,
            AttributeKey::MissRate,
            AttributeKey::CriticalRate,
            AttributeKey::HealPerRound,
        ] {
            enemy.clamp_attr(key);
        }
        enemy.hp = enemy.hp_count;
        Ok(enemy)
    }

    /// Open the pre-draft shop for a new run as the chosen unit.
    pub fn start_run(&mut self, unit_id: UnitId) -> Result<(), String> {
        match self.phase {
            Phase::Select | Phase::Victory | Phase::Defeat => {}
            _ => return Err("a run is already underway".to_string()),
        }
        if self.tables.unit(unit_id).is_none() {
            return Err(format!("unit {unit_id} is not in the roster"));
        }
        self.reset_run_state();
        self.selected_unit = unit_id;
        // Provisional units so blessing installs have something to act
        // on; the real instances are rebuilt at battle start.
        self.player = Some(self.build_player()?);
        self.enemy_id = self.pick_enemy_id()?;
        self.enemy = Some(self.build_enemy(self.enemy_id)?);
        let slots = build_pre_draft(
            &self.tables.blessings,
            &self.tables.affixes,
            &self.owned,
            &mut self.rng,
        );
        self.pre_draft = Some(PreDraft {
            slots,
            budget: draft_budget(self.difficulty),
        });
        self.phase = Phase::PreDraft;
        Ok(())
    }

    fn with_hook_ctx<R>(
        &mut self,
        f: impl FnOnce(&mut HookBus, &mut Vec<OwnedBlessing>, &mut HookCtx<'_>) -> R,
    ) -> Result<R, String> {
        let player = self.player.as_mut().ok_or("no active run")?;
        let enemy = self.enemy.as_mut().ok_or("no active run")?;
        let mut ctx = HookCtx {
            round: self.round,
            actor_side: Side::Player,
            actor: player,
            target: enemy,
            skill: None,
            damage: 0.0,
            critical_hit: false,
            from_passive: false,
            logs: &mut self.logs,
            rng: &mut *self.rng,
        };
        Ok(f(&mut self.bus, &mut self.owned, &mut ctx))
    }

    /// Select or deselect one pre-draft slot. Nothing is bought here;
    /// the purchase lands when the draft is confirmed.
    pub fn toggle_pre_draft_slot(&mut self, index: usize) -> Result<(), String> {
        let draft = self.pre_draft.as_ref().ok_or("no draft open")?;
        let slot = draft.slots.get(index).ok_or("no such slot")?;
        if slot.selected {
            if let Some(draft) = self.pre_draft.as_mut() {
                draft.slots[index].selected = false;
            }
            return Ok(());
        }
        if slot.candidate.cost() > draft.remaining() {
            return Err("not enough draft points".to_string());
        }
        match &slot.candidate {
            DraftCandidate::Equipment(_) => {
                let pending = draft
                    .slots
                    .iter()
                    .filter(|s| s.selected && matches!(s.candidate, DraftCandidate::Equipment(_)))
                    .count();
                if self.equipment.len() + pending + 1 > MAX_EQUIPMENT_SLOTS {
                    return Err("equipment slots are full".to_string());
                }
            }
            DraftCandidate::Blessing(def) => {
                let pending = draft
                    .slots
                    .iter()
                    .filter(|s| {
                        s.selected
                            && matches!(&s.candidate, DraftCandidate::Blessing(d) if d.id == def.id)
                    })
                    .count() as u32;
                let owned_stack = self
                    .owned
                    .iter()
                    .find(|b| b.def.id == def.id)
                    .map_or(0, |b| b.stack());
                if owned_stack + pending + 1 > def.stack_limit() {
                    return Err(format!("{} is already at max stacks", def.name));
                }
            }
            DraftCandidate::Heal { .. } => {}
        }
        if let Some(draft) = self.pre_draft.as_mut() {
            draft.slots[index].selected = true;
        }
        Ok(())
    }

    /// Reroll every unselected slot for one point.
    pub fn refresh_pre_draft(&mut self) -> Result<(), String> {
        let draft = self.pre_draft.as_mut().ok_or("no draft open")?;
        if draft.remaining() < REFRESH_COST {
            return Err("not enough draft points".to_string());
        }
        draft.budget -= REFRESH_COST;
        refresh_pre_draft(
            &mut draft.slots,
            &self.tables.blessings,
            &self.tables.affixes,
            &self.owned,
            &mut self.rng,
        );
        Ok(())
    }

    /// Confirm the draft and start fighting. The selection is validated
    /// as a whole; a rejection leaves the shop untouched.
    pub fn start_battle(&mut self) -> Result<(), String> {
        if self.phase != Phase::PreDraft {
            return Err("no run is being prepared".to_string());
        }
        let draft = self.pre_draft.as_ref().ok_or("no draft open")?;
        if draft.selected_cost() > draft.budget {
            return Err("selection exceeds the draft budget".to_string());
        }
        let picked: Vec<DraftCandidate> = draft
            .slots
            .iter()
            .filter(|s| s.selected)
            .map(|s| s.candidate.clone())
            .collect();
        let equipment_count = picked
            .iter()
            .filter(|c| matches!(c, DraftCandidate::Equipment(_)))
            .count();
        if self.equipment.len() + equipment_count > MAX_EQUIPMENT_SLOTS {
            return Err("equipment slots are full".to_string());
        }
        for candidate in &picked {
            if let DraftCandidate::Blessing(def) = candidate {
                let copies = picked
                    .iter()
                    .filter(|c| {
                        matches!(c, DraftCandidate::Blessing(d) if d.id == def.id)
                    })
                    .count() as u32;
                let owned_stack = self
                    .owned
                    .iter()
                    .find(|b| b.def.id == def.id)
                    .map_or(0, |b| b.stack());
                if owned_stack + copies > def.stack_limit() {
                    return Err(format!("{} is over its stack limit", def.name));
                }
            }
        }
        for candidate in picked {
            match candidate {
                DraftCandidate::Blessing(def) => {
                    let result = self
                        .with_hook_ctx(|bus, owned, ctx| install_blessing(owned, bus, &def, ctx))?;
                    if let Err(err) = result {
                        self.logs.side_log(err);
                    }
                }
                DraftCandidate::Equipment(piece) => {
                    self.logs.side_log(format!("Equipped {}", piece.name));
                    self.equipment.push(piece);
                }
                DraftCandidate::Heal { .. } => {}
            }
        }
        self.pre_draft = None;
        self.player = Some(self.build_player()?);
        self.enemy = Some(self.build_enemy(self.enemy_id)?);
        self.round = 1;
        self.logs.clear_entries();
        self.logs.set_round(1);
        self.logs.log_round_header();
        self.phase = Phase::Battle;
        let round = self.round;
        let (player, enemy) = match (&mut self.player, &mut self.enemy) {
            (Some(p), Some(e)) => (p, e),
            _ => return Err("no active run".to_string()),
        };
        emit_event(
            &mut self.bus,
            HookEvent::BattleStart,
            round,
            player,
            enemy,
            &mut self.logs,
            &mut *self.rng,
        );
        let name = self.enemy.as_ref().map(|e| e.name.clone()).unwrap_or_default();
        info!(
            "battle started: difficulty={} chain={} randomize={}",
            self.difficulty.label(),
            self.chain_mode,
            self.randomize
        );
        self.logs.log(format!("{name} steps into the circle"));
        Ok(())
    }

    // ----- the turn loop -------------------------------------------------

    /// Resolve one full round around the player's chosen skill.
    pub fn choose_skill(&mut self, skill_id: SkillId) -> Result<(), String> {
        if self.phase != Phase::Battle {
            return Err("no battle in progress".to_string());
        }
        if self.busy {
            return Err("the round is still resolving".to_string());
        }
        if self.mid_draft.is_some() {
            return Err("choose a draft option first".to_string());
        }
        let chosen = self
            .selectable_skills()
            .iter()
            .find(|s| s.id == skill_id)
            .copied()
            .cloned()
            .ok_or("that skill is not available")?;

        self.busy = true;
        let result = self.run_round(chosen);
        self.busy = false;
        result
    }

    fn run_round(&mut self, chosen: Skill) -> Result<(), String> {
        let player_strengths = self
            .tables
            .strengths_of(self.player.as_ref().map_or(&[][..], |p| p.strengths.as_slice()));
        let enemy_strengths = self
            .tables
            .strengths_of(self.enemy.as_ref().map_or(&[][..], |e| e.strengths.as_slice()));
        let enemy_skills: Vec<Skill> = self
            .tables
            .skills_of(self.enemy.as_ref().map_or(&[][..], |e| e.skill_list.as_slice()))
            .into_iter()
            .filter(|s| !s.hidden)
            .cloned()
            .collect();

        let round = self.round;
        self.logs.set_round(round);

        let mut enemy_died = false;
        let mut player_died = false;
        let mut half_hp_draft = false;
        {
            let player = self.player.as_mut().ok_or("no active run")?;
            let enemy = self.enemy.as_mut().ok_or("no active run")?;
            emit_event(
                &mut self.bus,
                HookEvent::RoundStart,
                round,
                player,
                enemy,
                &mut self.logs,
                &mut *self.rng,
            );

            let first = decide_order(player, enemy, &mut self.rng);
            for side in [first, first.opposite()] {
                let (attacker, defender, skill, strengths): (
                    &mut UnitInstance,
                    &mut UnitInstance,
                    &Skill,
                    &[Strength],
                ) = match side {
                    Side::Player => (&mut *player, &mut *enemy, &chosen, &player_strengths),
                    Side::Enemy => {
                        let skill = enemy_skills
                            .choose(&mut self.rng)
                            .ok_or("enemy has no usable skill")?;
                        (&mut *enemy, &mut *player, skill, &enemy_strengths)
                    }
                };
                if attacker.stop_round > 0 {
                    self.logs.log(format!(
                        "{}'s {} is stunned and loses the turn",
                        attacker.owner, attacker.name
                    ));
                    continue;
                }
                {
                    let mut ctx = HookCtx {
                        round,
                        actor_side: side,
                        actor: attacker,
                        target: defender,
                        skill: Some(skill),
                        damage: 0.0,
                        critical_hit: false,
                        from_passive: false,
                        logs: &mut self.logs,
                        rng: &mut *self.rng,
                    };
                    self.bus.emit(HookEvent::BeforeAction, &mut ctx);
                }
                let mut env = ActionEnv {
                    round,
                    actor_side: side,
                    bus: &mut self.bus,
                    logs: &mut self.logs,
                    rng: &mut *self.rng,
                };
                let outcome = execute_skill(attacker, defender, skill, strengths, &mut env);
                if outcome.critical_hit {
                    if self.rng.gen::<f64>() <= CRIT_TEXT_CHANCE {
                        if let Some(text) = CRIT_PAIN_TEXTS.choose(&mut self.rng) {
                            self.float_token += 1;
                            self.float_texts.push(FloatText {
                                text: (*text).to_string(),
                                side: side.opposite(),
                                token: self.float_token,
                            });
                        }
                    }
                    if self.rng.gen::<f64>() <= CRIT_TEXT_CHANCE {
                        if let Some(text) = CRIT_TAUNT_TEXTS.choose(&mut self.rng) {
                            self.float_token += 1;
                            self.float_texts.push(FloatText {
                                text: (*text).to_string(),
                                side,
                                token: self.float_token,
                            });
                        }
                    }
                }
                if !enemy.is_alive() {
                    enemy_died = true;
                    break;
                }
                if !player.is_alive() {
                    player_died = true;
                    break;
                }
                // A battered late-chain opponent pauses the fight with an
                // offer; the rest of the turn order is skipped.
                if side == Side::Player
                    && self.enemy_index >= HALF_HP_DRAFT_FROM_ENEMY
                    && !self.half_hp_draft_used
                    && enemy.hp_ratio() <= 0.5
                {
                    half_hp_draft = true;
                    break;
                }
            }
        }

        if enemy_died {
            self.handle_kill()?;
        }
        if player_died {
            self.handle_defeat();
            return Ok(());
        }
        if half_hp_draft {
            self.half_hp_draft_used = true;
            self.open_mid_draft();
        }
        if self.phase == Phase::Battle {
            self.finalize_round()?;
        }
        Ok(())
    }

    fn handle_kill(&mut self) -> Result<(), String> {
        {
            let player = self.player.as_mut().ok_or("no active run")?;
            let enemy = self.enemy.as_mut().ok_or("no active run")?;
            self.logs
                .log(format!("{}'s {} falls", enemy.owner, enemy.name));
            emit_event(
                &mut self.bus,
                HookEvent::Kill,
                self.round,
                player,
                enemy,
                &mut self.logs,
                &mut *self.rng,
            );
        }
        self.kills += 1;
        let gain = point_gain(self.kills, self.difficulty, self.mode_multiplier());
        let counted = self.progression.earn(gain);
        debug!("kill {} on round {}: {gain} points earned", self.kills, self.round);
        if counted > 0 {
            self.logs
                .side_log(format!("Earned {counted} progression points"));
        }
        if let Err(err) = self.store.save(&self.progression) {
            warn!("progression save failed: {err}");
            self.logs.side_log(format!("Progress not saved: {err}"));
        }

        if self.chain_mode {
            self.chain_growth += 1;
            self.enemy_index += 1;
            self.half_hp_draft_used = false;
            self.enemy_id = self.pick_enemy_id()?;
            let spawned = self.build_enemy(self.enemy_id)?;
            self.logs
                .log(format!("{} steps into the circle", spawned.name));
            self.enemy = Some(spawned);
            // Each chained kill is rewarded with a fresh offer.
            self.open_mid_draft();
        } else {
            self.phase = Phase::Victory;
            self.logs.log("The circle stands empty. The run is won.");
        }
        Ok(())
    }

    fn handle_defeat(&mut self) {
        self.phase = Phase::Defeat;
        info!("run ended in defeat on round {} after {} kills", self.round, self.kills);
        self.logs.log("The run ends here.");
    }

    fn finalize_round(&mut self) -> Result<(), String> {
        {
            let player = self.player.as_mut().ok_or("no active run")?;
            let enemy = self.enemy.as_mut().ok_or("no active run")?;
            emit_event(
                &mut self.bus,
                HookEvent::RoundEnd,
                self.round,
                player,
                enemy,
                &mut self.logs,
                &mut *self.rng,
            );
            reduce_round(&mut [player, enemy], &mut self.logs);
        }
        self.round += 1;
        // Long fights keep a bounded log: a fresh segment every hundred
        // rounds.
        if (self.round - 1) % LOG_SEGMENT_ROUNDS == 0 {
            self.logs.clear_entries();
        }
        self.logs.set_round(self.round);
        self.logs.log_round_header();

        if self.phase != Phase::Battle {
            return Ok(());
        }
        // The periodic offer opens going into every tenth round.
        if self.round % MID_DRAFT_INTERVAL == 0 {
            self.open_mid_draft();
        }
        Ok(())
    }

    fn open_mid_draft(&mut self) {
        if self.mid_draft.is_some() {
            return;
        }
        let candidates = build_mid_draft(
            &self.tables.blessings,
            &self.owned,
            self.draft_openings,
            &mut self.rng,
        );
        self.draft_openings += 1;
        self.logs.side_log("A blessing is offered".to_string());
        self.mid_draft = Some(candidates);
    }

    /// Take one option from the open mid-run draft.
    pub fn choose_mid_draft(&mut self, index: usize) -> Result<(), String> {
        let candidates = self.mid_draft.as_ref().ok_or("no draft open")?;
        let candidate = candidates.get(index).ok_or("no such option")?.clone();
        match candidate {
            DraftCandidate::Blessing(def) => {
                let result =
                    self.with_hook_ctx(|bus, owned, ctx| install_blessing(owned, bus, &def, ctx))?;
                result?;
            }
            DraftCandidate::Heal { fraction } => {
                let player = self.player.as_mut().ok_or("no active run")?;
                let restored = player.heal(player.hp_count * fraction);
                self.logs.side_log(format!(
                    "{} mends for {:.0} health",
                    player.name, restored
                ));
            }
            DraftCandidate::Equipment(_) => {
                return Err("equipment is not offered mid-run".to_string());
            }
        }
        self.mid_draft = None;
        Ok(())
    }

    // ----- progression ---------------------------------------------------

    pub fn allocate_point(&mut self, unit_id: UnitId, attr: AttributeKey) -> Result<(), String> {
        if self.phase == Phase::Battle {
            return Err("cannot retrain mid-battle".to_string());
        }
        // A unit's template names which attributes accept points; units
        // without a list take the default four.
        let template = self
            .tables
            .unit(unit_id)
            .ok_or_else(|| format!("unit {unit_id} is not in the roster"))?;
        let allowed = if template.point_attrs.is_empty() {
            DEFAULT_POINT_ATTRS.contains(&attr)
        } else {
            template.point_attrs.contains(&attr)
        };
        if !allowed {
            return Err(format!("{} cannot take points", attr.label()));
        }
        self.progression.allocate(unit_id, attr)?;
        self.save_progression();
        Ok(())
    }

    pub fn deallocate_point(&mut self, unit_id: UnitId, attr: AttributeKey) -> Result<(), String> {
        if self.phase == Phase::Battle {
            return Err("cannot retrain mid-battle".to_string());
        }
        self.progression.deallocate(unit_id, attr)?;
        self.save_progression();
        Ok(())
    }

    /// Refund every point spent on one unit.
    pub fn reset_points(&mut self, unit_id: UnitId) -> Result<(), String> {
        if self.phase == Phase::Battle {
            return Err("cannot retrain mid-battle".to_string());
        }
        self.progression.reset_allocations(unit_id);
        self.save_progression();
        Ok(())
    }

    fn save_progression(&mut self) {
        if let Err(err) = self.store.save(&self.progression) {
            warn!("progression save failed: {err}");
            self.logs.side_log(format!("Progress not saved: {err}"));
        }
    }

    // ----- reset ---------------------------------------------------------

    fn reset_run_state(&mut self) {
        self.bus.clear();
        self.owned.clear();
        self.equipment.clear();
        self.player = None;
        self.enemy = None;
        self.enemy_index = 1;
        self.chain_growth = 0;
        self.kills = 0;
        self.round = 1;
        self.logs = CombatLogs::new();
        self.pre_draft = None;
        self.mid_draft = None;
        self.draft_openings = 0;
        self.half_hp_draft_used = false;
        self.float_texts.clear();
        self.busy = false;
        self.session_token += 1;
    }

    /// Abandon the run and return to the select screen. Progression is
    /// kept, run state is not.
    pub fn back_to_select(&mut self) {
        self.reset_run_state();
        self.phase = Phase::Select;
    }
}
