//! The mutable battle session record.
//!
//! A session never counts its own ticks: elapsed time is always re-derived
//! from `start_epoch_ms`, and `damage_applied_secs` marks how much of that
//! elapsed time has already been turned into damage. That makes a tick
//! after an arbitrary host suspension land on the same state as one tick
//! per second would have.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::Monster;

/// Log line appended when the user aborts the session.
pub const EARLY_END_REASON: &str = "Session ended early by user.";

/// One battle log entry.
///
/// `count` is the total HP restored for healing entries and 0 for plain
/// entries; repeated healing with the same reason coalesces into the last
/// entry instead of flooding the log. Rendering to a display string
/// happens only at the boundary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogEntry {
    pub reason: String,
    #[serde(default)]
    pub count: u32,
}

impl LogEntry {
    pub fn render(&self) -> String {
        if self.count > 0 {
            format!("{} +{} HP.", self.reason, self.count)
        } else {
            self.reason.clone()
        }
    }
}

/// One-time milestone awards, each transitioning false -> true exactly
/// once per session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct MilestoneFlags {
    #[serde(default)]
    pub started: bool,
    #[serde(default)]
    pub halfway: bool,
}

/// The active battle session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub monster_id: String,
    pub monster_name: String,
    pub monster_icon: String,
    /// Creation instant, milliseconds since the Unix epoch. Immutable.
    pub start_epoch_ms: u64,
    /// Session length in seconds. Immutable; defaults to the monster's HP.
    pub duration_secs: u64,
    pub current_hp: u32,
    pub max_hp: u32,
    pub battle_log: Vec<LogEntry>,
    #[serde(default)]
    pub milestones: MilestoneFlags,
    pub is_active: bool,
    /// Seconds of elapsed time already converted into damage.
    #[serde(default)]
    pub damage_applied_secs: u64,
    /// Epoch second of the last site-triggered heal (3 s rate limiter).
    #[serde(default)]
    pub last_heal_epoch_s: Option<u64>,
    /// Last observed tab id, for edge-triggered tab-switch healing.
    #[serde(default)]
    pub last_tab: Option<u64>,
}

impl Session {
    pub fn new(monster: &Monster, duration_override: Option<u64>, now_ms: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            monster_id: monster.id.clone(),
            monster_name: monster.name.clone(),
            monster_icon: monster.icon.clone(),
            start_epoch_ms: now_ms,
            duration_secs: duration_override.unwrap_or(u64::from(monster.hp)),
            current_hp: monster.hp,
            max_hp: monster.hp,
            battle_log: vec![LogEntry {
                reason: format!("Session started against {}!", monster.name),
                count: 0,
            }],
            milestones: MilestoneFlags::default(),
            is_active: true,
            damage_applied_secs: 0,
            last_heal_epoch_s: None,
            last_tab: None,
        }
    }

    /// Whole seconds elapsed since the session started.
    pub fn elapsed_secs(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.start_epoch_ms) / 1000
    }

    /// Seconds left on the clock. Negative once the duration has passed.
    pub fn remaining_secs(&self, now_ms: u64) -> i64 {
        self.duration_secs as i64 - self.elapsed_secs(now_ms) as i64
    }

    /// Append a plain log line.
    pub fn push_log(&mut self, reason: impl Into<String>) {
        self.battle_log.push(LogEntry {
            reason: reason.into(),
            count: 0,
        });
    }

    /// Record `amount` HP of healing under `reason`, coalescing into the
    /// last entry when the reason repeats.
    pub fn record_heal(&mut self, reason: &str, amount: u32) {
        match self.battle_log.last_mut() {
            Some(last) if last.count > 0 && last.reason == reason => last.count += amount,
            _ => self.battle_log.push(LogEntry {
                reason: reason.to_string(),
                count: amount,
            }),
        }
    }

    /// Whether any healing was recorded (the no-distractions check).
    pub fn had_distractions(&self) -> bool {
        self.battle_log.iter().any(|entry| entry.count > 0)
    }

    /// Whether the user ended this session early.
    pub fn ended_early(&self) -> bool {
        self.battle_log
            .iter()
            .any(|entry| entry.reason == EARLY_END_REASON)
    }

    pub fn apply_damage(&mut self, secs: u64) {
        let damage = u32::try_from(secs).unwrap_or(u32::MAX);
        self.current_hp = self.current_hp.saturating_sub(damage);
    }

    /// Heal up to `amount`, capped at `max_hp`.
    pub fn heal(&mut self, amount: u32) {
        self.current_hp = (self.current_hp + amount).min(self.max_hp);
    }

    pub fn snapshot(&self, now_ms: u64) -> BattleSnapshot {
        BattleSnapshot {
            session_id: self.id,
            monster_id: self.monster_id.clone(),
            monster_name: self.monster_name.clone(),
            monster_icon: self.monster_icon.clone(),
            current_hp: self.current_hp,
            max_hp: self.max_hp,
            elapsed_secs: self.elapsed_secs(now_ms),
            remaining_secs: self.remaining_secs(now_ms).max(0) as u64,
            battle_log: self.battle_log.iter().map(LogEntry::render).collect(),
            milestones: self.milestones,
            is_active: self.is_active,
        }
    }
}

/// Read-only view of a session handed to consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleSnapshot {
    pub session_id: Uuid,
    pub monster_id: String,
    pub monster_name: String,
    pub monster_icon: String,
    pub current_hp: u32,
    pub max_hp: u32,
    pub elapsed_secs: u64,
    pub remaining_secs: u64,
    /// Rendered battle log lines, oldest first.
    pub battle_log: Vec<String>,
    pub milestones: MilestoneFlags,
    pub is_active: bool,
}
