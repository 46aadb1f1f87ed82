//! Battle log, side log, and discrete effect signals
//!
//! The battle log is domain data: an append-only list of entries the
//! presentation layer renders verbatim. The side log is a short bounded
//! feed for settings changes and blessing chatter. Effect signals are
//! drained by the session after each action and converted into monotonic
//! animation tokens.

use serde::{Deserialize, Serialize};

/// Side log keeps only the most recent entries.
pub const MAX_SIDE_LOGS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    Text,
    Round,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub text: String,
    pub kind: LogKind,
    pub round: u32,
}

/// Discrete signal emitted while resolving an action. All signals refer
/// to the defender of the action that produced them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EffectSignal {
    Hit { damage: f64, critical: bool },
    Status,
    Miss,
}

/// Log sinks handed to the resolution engine and hook handlers.
#[derive(Debug, Default)]
pub struct CombatLogs {
    round: u32,
    pub entries: Vec<LogEntry>,
    pub side: Vec<String>,
    pub signals: Vec<EffectSignal>,
}

impl CombatLogs {
    pub fn new() -> Self {
        CombatLogs {
            round: 1,
            entries: Vec::new(),
            side: Vec::new(),
            signals: Vec::new(),
        }
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn set_round(&mut self, round: u32) {
        self.round = round;
    }

    /// Append a main-log line tagged with the current round.
    pub fn log(&mut self, text: impl Into<String>) {
        self.entries.push(LogEntry {
            text: text.into(),
            kind: LogKind::Text,
            round: self.round,
        });
    }

    /// Append the round header entry.
    pub fn log_round_header(&mut self) {
        self.entries.push(LogEntry {
            text: format!("Round {}", self.round),
            kind: LogKind::Round,
            round: self.round,
        });
    }

    /// Append a side-log line, evicting the oldest past the cap.
    pub fn side_log(&mut self, text: impl Into<String>) {
        self.side.insert(0, text.into());
        if self.side.len() > MAX_SIDE_LOGS {
            self.side.pop();
        }
    }

    pub fn signal(&mut self, signal: EffectSignal) {
        self.signals.push(signal);
    }

    /// Drop every main-log entry; used at segment boundaries.
    pub fn clear_entries(&mut self) {
        self.entries.clear();
    }
}
