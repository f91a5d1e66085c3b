use clap::Subcommand;
use serde::Serialize;

use chronofocus_core::battle::xp;
use chronofocus_core::clock::{Clock, SystemClock};
use chronofocus_core::stats::SessionHistoryEntry;
use chronofocus_core::{Config, Database, UserStats};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Print cumulative statistics, level and title as JSON
    Show,
}

#[derive(Serialize)]
struct StatsReport {
    stats: UserStats,
    level: u32,
    title: String,
    xp_into_level: u64,
    xp_for_next_level: u64,
    today_pomodoros: u32,
    recent_sessions: Vec<SessionHistoryEntry>,
}

pub fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    // Read-only bootstrap view; all writes stay inside the engine.
    let db = Database::open()?;
    let config = Config::load()?;

    match action {
        StatsAction::Show => {
            let stats = db.load_stats()?.unwrap_or_default();
            let level = xp::level_for_xp(stats.current_xp, &config.xp);
            let report = StatsReport {
                level,
                title: xp::title_for_level(level, &config.xp),
                xp_into_level: xp::xp_into_level(stats.current_xp, &config.xp),
                xp_for_next_level: xp::xp_required_for_level(level + 1, &config.xp)
                    - xp::xp_required_for_level(level, &config.xp),
                today_pomodoros: db.pomodoros_on(SystemClock.today())?,
                recent_sessions: db.history()?,
                stats,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}
