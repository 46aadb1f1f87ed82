//! Headless driver: auto-plays one run and prints the battle log.
//!
//! Usage: duel_cli [seed] [difficulty]

use std::env;
use std::process::ExitCode;

use log::info;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use duel_core::persist::JsonFileStore;
use duel_core::session::BattleSession;
use duel_core::{ContentTables, Difficulty, Phase};

const MAX_ROUNDS: u32 = 400;

fn parse_difficulty(arg: &str) -> Option<Difficulty> {
    Difficulty::all()
        .iter()
        .copied()
        .find(|d| d.label().eq_ignore_ascii_case(arg))
}

fn run() -> Result<(), String> {
    let mut args = env::args().skip(1);
    let seed: u64 = match args.next() {
        Some(arg) => arg.parse().map_err(|_| format!("bad seed: {arg}"))?,
        None => rand::random(),
    };
    let difficulty = match args.next() {
        Some(arg) => parse_difficulty(&arg).ok_or_else(|| format!("bad difficulty: {arg}"))?,
        None => Difficulty::Normal,
    };
    info!("seed {seed}, difficulty {}", difficulty.label());

    let tables = ContentTables::bundled().map_err(|e| e.to_string())?;
    let player_id = tables.player_id;
    let store = JsonFileStore::new("duel_progress.json");
    let rng = ChaCha8Rng::seed_from_u64(seed);
    let mut session = BattleSession::new(tables, Box::new(store), Box::new(rng))
        .map_err(|e| e.to_string())?;
    let mut pick_rng = ChaCha8Rng::seed_from_u64(seed ^ 0x9e3779b97f4a7c15);

    session.set_difficulty(difficulty)?;
    session.start_run(player_id)?;

    // Select greedily while the points last, rerolling when nothing on
    // offer is affordable, then confirm.
    loop {
        let affordable: Vec<usize> = session
            .pre_draft()
            .map(|draft| {
                draft
                    .slots
                    .iter()
                    .enumerate()
                    .filter(|(_, s)| !s.selected && s.candidate.cost() <= draft.remaining())
                    .map(|(i, _)| i)
                    .collect()
            })
            .unwrap_or_default();
        match affordable.first() {
            Some(&index) => {
                if session.toggle_pre_draft_slot(index).is_err() {
                    break;
                }
            }
            None => {
                if session.refresh_pre_draft().is_err() {
                    break;
                }
            }
        }
    }
    session.start_battle()?;

    while session.phase() == Phase::Battle && session.round() < MAX_ROUNDS {
        if session.mid_draft().is_some() {
            let options = session.mid_draft().map(|o| o.len()).unwrap_or(0);
            // Prefer a blessing, fall back to the heal.
            let pick = if options > 1 { 0 } else { options.saturating_sub(1) };
            session.choose_mid_draft(pick)?;
            continue;
        }
        let skill = {
            let skills = session.selectable_skills();
            skills
                .choose(&mut pick_rng)
                .map(|s| s.id)
                .ok_or("no skill to use")?
        };
        session.choose_skill(skill)?;
    }

    for entry in &session.logs().entries {
        println!("{}", entry.text);
    }
    println!();
    match session.phase() {
        Phase::Victory => println!("Victory after {} kills in {} rounds.", session.kills(), session.round()),
        Phase::Defeat => println!("Defeat after {} kills in {} rounds.", session.kills(), session.round()),
        _ => println!("Stopped at round {}.", session.round()),
    }
    println!(
        "Progression: {} points earned, {} unspent.",
        session.progression().total_earned,
        session.progression().available()
    );
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
