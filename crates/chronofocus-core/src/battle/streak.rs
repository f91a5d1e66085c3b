//! Daily streak bookkeeping.

use chrono::NaiveDate;

use crate::stats::UserStats;

/// Apply a victory to the daily streak. At most one increment is granted
/// per calendar day; a gap of more than one day restarts the streak at 1.
///
/// Call only on victory. Defeats and abandons reset the streak elsewhere.
pub fn apply_daily_streak(stats: &mut UserStats, today: NaiveDate) {
    if stats.last_active_date == Some(today) {
        return; // Already counted today.
    }

    match stats.last_active_date {
        Some(last) if (today - last).num_days() == 1 => stats.current_streak += 1,
        Some(_) => stats.current_streak = 1,
        None => stats.current_streak = 1,
    }

    stats.last_active_date = Some(today);
}
