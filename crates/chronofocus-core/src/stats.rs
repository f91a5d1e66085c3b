//! Player progression records.
//!
//! These are the durable records the engine reads and writes: cumulative
//! user statistics, the outcome of the last resolved session, and the
//! bounded recent-session history.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionResult {
    /// Monster HP reached zero before time ran out.
    Victory,
    /// Time ran out with the monster still standing.
    Defeat,
    /// User quit early. Always zero reward.
    Abandoned,
}

/// Cumulative, long-lived user statistics.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct UserStats {
    /// Monster id -> defeat count.
    #[serde(default)]
    pub monsters_defeated: HashMap<String, u32>,
    #[serde(default)]
    pub total_pomodoros: u32,
    /// Lifetime XP. Never decreases.
    #[serde(default)]
    pub current_xp: u64,
    #[serde(default)]
    pub current_streak: u32,
    /// Last calendar date a streak increment was granted. Guards against
    /// double-counting multiple victories in one day.
    #[serde(default)]
    pub last_active_date: Option<NaiveDate>,
}

/// One itemized XP bonus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct XpBonus {
    pub kind: BonusKind,
    pub amount: u64,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BonusKind {
    NoDistractions,
    SecondSession,
    StreakBonus,
    FocusCrit,
}

/// Itemized XP award for a victorious session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct XpBreakdown {
    pub base_xp: u64,
    pub bonuses: Vec<XpBonus>,
    pub final_xp: u64,
}

/// Immutable record of how the last session ended, derived exactly once
/// at resolution and kept until the consumer clears it (or the next
/// session starts).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionOutcome {
    pub result: SessionResult,
    pub xp_earned: u64,
    pub xp_breakdown: Option<XpBreakdown>,
    /// XP before/after this session, for progress animation.
    pub previous_xp: u64,
    pub current_xp: u64,
    pub pomodoro_completed: bool,
    pub total_pomodoros: u32,
    pub current_streak: u32,
    /// Set on victory only.
    pub monster_defeated_name: Option<String>,
}

/// One entry of the bounded recent-session history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionHistoryEntry {
    pub success: bool,
    pub date: DateTime<Utc>,
}
