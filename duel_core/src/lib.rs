//! Core engine for a roguelite dueling run: deterministic combat
//! resolution, a blessing hook bus, equipment and drafting, and
//! cross-run progression.
//!
//! The crate is headless. A frontend owns a [`session::BattleSession`],
//! feeds it player choices, and renders its logs, signals, and unit
//! state; all randomness flows through the rng the session is built
//! with, so a seeded run replays exactly.

pub mod blessing;
pub mod combat;
pub mod content;
pub mod draft;
pub mod equipment;
pub mod hooks;
pub mod logs;
pub mod persist;
pub mod progression;
pub mod rng;
pub mod session;
pub mod skill;
pub mod types;
pub mod unit;

pub use content::{ContentError, ContentTables};
pub use session::{BattleSession, Phase};
pub use types::{AttributeKey, Difficulty, Quality, Side};
