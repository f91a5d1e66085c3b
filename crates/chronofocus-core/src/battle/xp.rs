//! XP and leveling math.
//!
//! Pure functions; the one non-deterministic input (the focus crit roll)
//! is taken as an argument so callers own the RNG.

use rand::Rng;

use crate::catalog::Monster;
use crate::config::XpConfig;
use crate::stats::{BonusKind, XpBonus, XpBreakdown};

/// Fallback title when the configured table is empty.
const DEFAULT_TITLE: &str = "Focus Warrior";

/// Base XP for defeating a monster:
/// `floor(max(hp * xp_per_hp, min_xp) * difficulty_multiplier)`.
pub fn monster_base_xp(monster: &Monster, cfg: &XpConfig) -> u64 {
    let mut base = (f64::from(monster.hp) * cfg.base.xp_per_hp).max(cfg.base.min_xp as f64);
    if let Some(multiplier) = cfg.difficulty_multipliers.get(&monster.id) {
        base *= multiplier;
    }
    base.floor() as u64
}

/// Total XP required to hold `level`. Level 1 requires nothing.
pub fn xp_required_for_level(level: u32, cfg: &XpConfig) -> u64 {
    if level <= 1 {
        return 0;
    }
    (cfg.level_curve.base_xp as f64 * f64::from(level).powf(cfg.level_curve.exponent)).floor()
        as u64
}

/// Largest level whose requirement fits within `total_xp`.
pub fn level_for_xp(total_xp: u64, cfg: &XpConfig) -> u32 {
    if cfg.level_curve.base_xp == 0 {
        return 1;
    }
    let mut level = 1;
    while xp_required_for_level(level + 1, cfg) <= total_xp {
        level += 1;
    }
    level
}

/// XP accumulated past the current level's requirement.
pub fn xp_into_level(total_xp: u64, cfg: &XpConfig) -> u64 {
    total_xp - xp_required_for_level(level_for_xp(total_xp, cfg), cfg)
}

/// Highest-threshold title whose required level is at or below `level`.
/// Gaps between thresholds inherit the previous tier.
pub fn title_for_level(level: u32, cfg: &XpConfig) -> String {
    let mut thresholds: Vec<(u32, &str)> = cfg
        .titles
        .iter()
        .filter_map(|(req, title)| req.parse::<u32>().ok().map(|req| (req, title.as_str())))
        .collect();
    thresholds.sort_unstable_by_key(|(req, _)| *req);

    thresholds
        .iter()
        .take_while(|(req, _)| *req <= level)
        .last()
        .map(|(_, title)| title.to_string())
        .unwrap_or_else(|| {
            thresholds
                .first()
                .map(|(_, title)| title.to_string())
                .unwrap_or_else(|| DEFAULT_TITLE.to_string())
        })
}

/// Streak multiplier: `min(1 + streak_days * per_day, max_multiplier)`.
pub fn streak_multiplier(streak_days: u32, cfg: &XpConfig) -> f64 {
    (1.0 + f64::from(streak_days) * cfg.streak_multiplier.per_day)
        .min(cfg.streak_multiplier.max_multiplier)
}

/// Roll the focus crit multiplier, uniform in
/// `[min_focus_crit, max_focus_crit]`.
pub fn roll_focus_crit<R: Rng + ?Sized>(rng: &mut R, cfg: &XpConfig) -> f64 {
    let min = cfg.modifiers.min_focus_crit;
    let max = cfg.modifiers.max_focus_crit;
    if max <= min {
        return min;
    }
    rng.gen_range(min..=max)
}

/// Inputs to a session's XP award that the engine gathers before calling
/// into the calculator.
#[derive(Debug, Clone, Copy)]
pub struct SessionXpInputs {
    pub base_xp: u64,
    pub had_distractions: bool,
    /// Completed pomodoros today, counted before crediting this session.
    pub prior_today_pomodoros: u32,
    /// Streak as it stood before this victory.
    pub current_streak: u32,
    /// Focus crit multiplier, already rolled.
    pub crit_multiplier: f64,
}

/// Itemize a victorious session's XP. Bonuses are applied additively to a
/// running total, in a fixed order.
pub fn session_breakdown(inputs: SessionXpInputs, cfg: &XpConfig) -> XpBreakdown {
    let mut running = inputs.base_xp;
    let mut bonuses = Vec::new();

    if !inputs.had_distractions {
        let amount = (running as f64 * cfg.modifiers.no_distractions).floor() as u64;
        running += amount;
        bonuses.push(XpBonus {
            kind: BonusKind::NoDistractions,
            amount,
            message: format!("Flawless focus! +{amount} XP"),
        });
    }

    if inputs.prior_today_pomodoros >= 1 {
        let amount = (running as f64 * cfg.modifiers.second_session).floor() as u64;
        running += amount;
        bonuses.push(XpBonus {
            kind: BonusKind::SecondSession,
            amount,
            message: format!("Back for more today! +{amount} XP"),
        });
    }

    if inputs.current_streak > 0 {
        let multiplier = streak_multiplier(inputs.current_streak, cfg);
        let amount = (running as f64 * (multiplier - 1.0)).floor() as u64;
        running += amount;
        bonuses.push(XpBonus {
            kind: BonusKind::StreakBonus,
            amount,
            message: format!("{}-day streak! +{amount} XP", inputs.current_streak),
        });
    }

    if inputs.crit_multiplier > 1.0 {
        let boosted = (running as f64 * inputs.crit_multiplier).floor() as u64;
        let amount = boosted - running;
        running = boosted;
        bonuses.push(XpBonus {
            kind: BonusKind::FocusCrit,
            amount,
            message: format!("Focus crit x{:.2}! +{amount} XP", inputs.crit_multiplier),
        });
    }

    XpBreakdown {
        base_xp: inputs.base_xp,
        bonuses,
        final_xp: running,
    }
}
