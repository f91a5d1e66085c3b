//! Battle session engine.
//!
//! The engine is a wall-clock-based state machine. It does not use
//! internal threads - the host arms a roughly once-per-second clock and
//! calls `tick()`; the engine re-derives elapsed time from the session's
//! start instant on every tick, so missed ticks (host suspension) are
//! reconciled instead of lost.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Active -> Resolved -> Idle
//! ```
//!
//! Every operation takes `&mut self` and runs to completion, persisting
//! before returning its notification event. That single-writer shape is
//! what keeps read-modify-write cycles from interleaving.

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, warn};

use super::session::{Session, EARLY_END_REASON};
use super::{streak, xp};
use crate::catalog::{MonsterCatalog, TriggerEvent};
use crate::clock::{Clock, SystemClock};
use crate::config::XpConfig;
use crate::error::{CommandError, Result};
use crate::events::Event;
use crate::observer::{matching_trigger_site, ActivityObserver, NullObserver};
use crate::stats::{SessionHistoryEntry, SessionOutcome, SessionResult, UserStats};
use crate::storage::Database;

/// How long a terminal session stays readable before it is cleared.
const RESOLVED_GRACE_MS: u64 = 500;

/// Wall-clock seconds between site-triggered heals.
const HEAL_COOLDOWN_SECS: u64 = 3;

/// HP restored by one site-triggered heal.
const SITE_HEAL_HP: u32 = 1;

/// HP restored by one tab switch. Switching tabs is more disruptive than
/// parking on a site, so it feeds the monster harder.
const TAB_SWITCH_HEAL_HP: u32 = 2;

/// Slack allowed when judging whether the full duration genuinely
/// elapsed before a timeout defeat.
const FULL_DURATION_TOLERANCE_SECS: u64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Active,
    /// Terminal state computed; the session record survives a short grace
    /// window so a mid-render consumer can still read it.
    Resolved { since_ms: u64 },
}

/// Engine state as reported to consumers.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EngineState {
    Active { session: super::BattleSnapshot },
    Resolved { outcome: SessionOutcome },
    Idle,
}

/// Core battle session engine. Owns the session lifecycle and is the only
/// writer of session, outcome and stats records.
pub struct BattleEngine {
    db: Database,
    catalog: MonsterCatalog,
    config: XpConfig,
    observer: Box<dyn ActivityObserver>,
    clock: Box<dyn Clock>,
    rng: StdRng,
    phase: Phase,
    clock_armed: bool,
}

impl BattleEngine {
    pub fn new(db: Database, catalog: MonsterCatalog, config: XpConfig) -> Self {
        Self {
            db,
            catalog,
            config,
            observer: Box::new(NullObserver),
            clock: Box::new(SystemClock),
            rng: StdRng::from_entropy(),
            phase: Phase::Idle,
            clock_armed: false,
        }
    }

    pub fn with_observer(mut self, observer: Box<dyn ActivityObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Whether the host should keep its tick source firing.
    pub fn clock_armed(&self) -> bool {
        self.clock_armed
    }

    /// Read access to the underlying store. The presentation layer may
    /// read records directly for bootstrap; all writes go through the
    /// engine's commands.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Current state: active snapshot, pending outcome, or idle.
    pub fn state(&mut self) -> Result<EngineState> {
        self.sweep_resolved()?;
        if let Some(outcome) = self.db.load_outcome()? {
            return Ok(EngineState::Resolved { outcome });
        }
        if let Some(session) = self.load_session_lenient() {
            if session.is_active {
                return Ok(EngineState::Active {
                    session: session.snapshot(self.clock.now_ms()),
                });
            }
        }
        Ok(EngineState::Idle)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start a session against `monster_id`.
    ///
    /// Any session already active is force-terminated first: its clock is
    /// cancelled and its state discarded without producing an outcome.
    /// That keeps duplicate start commands from a flaky UI harmless.
    pub fn start_session(
        &mut self,
        monster_id: &str,
        duration_override: Option<u64>,
    ) -> Result<Event> {
        if self.catalog.is_empty() {
            return Err(CommandError::MonstersNotLoaded.into());
        }
        let monster = self
            .catalog
            .get(monster_id)
            .ok_or_else(|| CommandError::InvalidMonster(monster_id.to_string()))?
            .clone();

        if self.phase == Phase::Active {
            warn!(monster_id, "start while active; discarding previous session");
        }
        self.disarm_clock();
        self.db.clear_session()?;
        self.db.clear_outcome()?;

        let now = self.clock.now_ms();
        let session = Session::new(&monster, duration_override, now);
        self.db.save_session(&session)?;

        self.phase = Phase::Active;
        self.clock_armed = true;
        debug!(monster_id, duration_secs = session.duration_secs, "session started");
        Ok(Event::SessionStarted {
            session: session.snapshot(now),
            at: self.clock.now(),
        })
    }

    /// Apply one clock tick.
    ///
    /// Safe to call with no active session: that is a desynchronized
    /// timer, answered with a warning and a disarmed clock rather than an
    /// error.
    pub fn tick(&mut self) -> Result<Option<Event>> {
        self.sweep_resolved()?;
        let mut session = match self.load_session_lenient() {
            Some(session) if session.is_active => session,
            _ => {
                if self.clock_armed {
                    warn!("tick with no active session; disarming clock");
                }
                self.disarm_clock();
                if !matches!(self.phase, Phase::Resolved { .. }) {
                    self.phase = Phase::Idle;
                }
                return Ok(None);
            }
        };

        let now = self.clock.now_ms();
        let elapsed = session.elapsed_secs(now);
        let remaining = session.remaining_secs(now);

        let hostname = self.observer.foreground_hostname();
        let tab = self.observer.active_tab();

        // Milestone micro-awards, idempotent via the session flags.
        let mut micro_xp = 0;
        if elapsed >= 1 && !session.milestones.started {
            session.milestones.started = true;
            micro_xp += self.config.base.xp_for_starting;
            session.push_log(format!(
                "The battle is joined! +{} XP",
                self.config.base.xp_for_starting
            ));
        }
        if elapsed >= session.duration_secs / 2 && !session.milestones.halfway {
            session.milestones.halfway = true;
            micro_xp += self.config.base.xp_for_halfway;
            session.push_log(format!(
                "Halfway there! +{} XP",
                self.config.base.xp_for_halfway
            ));
        }

        // Work out what is feeding the monster this second.
        let monster = self.catalog.get(&session.monster_id).cloned();
        let trigger_sites = monster
            .as_ref()
            .map(|m| m.trigger_sites.as_slice())
            .unwrap_or_default();
        let on_trigger_site = hostname
            .as_deref()
            .and_then(|host| matching_trigger_site(host, trigger_sites))
            .map(String::from);
        let watches_tabs = monster
            .as_ref()
            .is_some_and(|m| m.trigger_event == Some(TriggerEvent::TabSwitch));
        let tab_switched = watches_tabs
            && matches!((session.last_tab, tab), (Some(prev), Some(curr)) if prev != curr);

        // Damage: one HP per elapsed second not yet reconciled. The
        // current second deals nothing while the user feeds the monster.
        let pending = elapsed.saturating_sub(session.damage_applied_secs);
        if pending > 0 {
            let damage = if on_trigger_site.is_some() || tab_switched {
                pending - 1
            } else {
                pending
            };
            session.apply_damage(damage);
            session.damage_applied_secs = elapsed;
        }

        // Site-triggered healing, rate-limited per wall clock.
        if let (Some(site), Some(monster)) = (&on_trigger_site, &monster) {
            if session.current_hp < session.max_hp {
                let now_s = now / 1000;
                let off_cooldown = session
                    .last_heal_epoch_s
                    .map_or(true, |last| now_s.saturating_sub(last) >= HEAL_COOLDOWN_SECS);
                if off_cooldown {
                    session.heal(SITE_HEAL_HP);
                    session.last_heal_epoch_s = Some(now_s);
                    session.record_heal(
                        &format!("{} feeds on {site}!", monster.name),
                        SITE_HEAL_HP,
                    );
                    debug!(site = %site, hp = session.current_hp, "monster healed");
                }
            }
        }

        // Tab-switch healing: edge-triggered on the tab id changing, and
        // exempt from the cooldown since switches are inherently rare.
        if watches_tabs {
            if let Some(tab) = tab {
                if tab_switched && session.current_hp < session.max_hp {
                    if let Some(monster) = &monster {
                        session.heal(TAB_SWITCH_HEAL_HP);
                        session.record_heal(
                            &format!("{} feeds on tab switching!", monster.name),
                            TAB_SWITCH_HEAL_HP,
                        );
                        debug!(tab, hp = session.current_hp, "tab switch healed monster");
                    }
                }
                session.last_tab = Some(tab);
            }
        }

        // Terminal checks, HP first.
        if session.current_hp == 0 {
            session.push_log("Victory! Monster defeated!");
            return self.resolve(session, SessionResult::Victory, micro_xp).map(Some);
        }
        if remaining <= 0 {
            session.push_log("Time's up! Monster survived.");
            return self.resolve(session, SessionResult::Defeat, micro_xp).map(Some);
        }

        self.credit_micro_xp(micro_xp)?;
        self.db.save_session(&session)?;
        Ok(Some(Event::BattleStateUpdated {
            session: session.snapshot(now),
            at: self.clock.now(),
        }))
    }

    /// User-initiated abort. Resolves as [`SessionResult::Abandoned`]:
    /// zero XP, streak reset, no pomodoro credit.
    pub fn end_session_early(&mut self) -> Result<Event> {
        self.sweep_resolved()?;
        let mut session = match self.load_session_lenient() {
            Some(session) if session.is_active => session,
            _ => return Err(CommandError::NoActiveSession.into()),
        };
        self.disarm_clock();
        session.push_log(EARLY_END_REASON);
        self.resolve(session, SessionResult::Abandoned, 0)
    }

    /// Consumer acknowledgement that the pending outcome has been read.
    pub fn clear_outcome(&mut self) -> Result<()> {
        self.db.clear_outcome()?;
        Ok(())
    }

    /// Clear any stuck state. Always succeeds.
    pub fn force_cleanup(&mut self) -> Result<Event> {
        self.disarm_clock();
        self.db.clear_session()?;
        self.db.clear_outcome()?;
        self.phase = Phase::Idle;
        Ok(Event::SessionCleared {
            at: self.clock.now(),
        })
    }

    /// Reconcile persisted state after a host restart.
    ///
    /// A session whose clock ran out while the engine was unloaded is
    /// resolved immediately from its last-known HP - never silently
    /// dropped. A session still inside its window is re-armed; milestone
    /// flags re-derive on the next tick since the award checks are
    /// idempotent.
    pub fn recover_on_startup(&mut self) -> Result<Option<Event>> {
        let session = match self.db.load_session() {
            Ok(Some(session)) => session,
            Ok(None) => {
                self.phase = Phase::Idle;
                return Ok(None);
            }
            Err(e) => {
                warn!("corrupt session record on startup: {e}; clearing");
                self.db.clear_session()?;
                self.phase = Phase::Idle;
                return Ok(None);
            }
        };

        if !session.is_active {
            // Crashed inside the post-resolution grace window; finish the
            // cleanup on the next sweep.
            self.phase = Phase::Resolved { since_ms: 0 };
            return Ok(None);
        }

        let now = self.clock.now_ms();
        if session.remaining_secs(now) <= 0 {
            debug!(
                elapsed = session.elapsed_secs(now),
                hp = session.current_hp,
                "session expired while engine was unloaded"
            );
            let mut session = session;
            let result = if session.current_hp == 0 {
                session.push_log("Victory! Monster defeated!");
                SessionResult::Victory
            } else {
                session.push_log("Time's up! Monster survived.");
                SessionResult::Defeat
            };
            return self.resolve(session, result, 0).map(Some);
        }

        self.phase = Phase::Active;
        self.clock_armed = true;
        debug!(remaining = session.remaining_secs(now), "session recovered");
        Ok(None)
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Shared terminal logic. Cancels the clock before any mutation,
    /// applies rewards, and persists stats and outcome before the
    /// notification event is returned.
    fn resolve(
        &mut self,
        mut session: Session,
        result: SessionResult,
        micro_xp: u64,
    ) -> Result<Event> {
        self.disarm_clock();
        let now = self.clock.now_ms();
        let today = self.clock.today();

        let mut stats = self.load_stats_or_default();
        stats.current_xp += micro_xp;
        let previous_xp = stats.current_xp;

        let mut xp_earned = 0;
        let mut xp_breakdown = None;
        let mut pomodoro_completed = false;

        match result {
            SessionResult::Victory => {
                let base_xp = self
                    .catalog
                    .get(&session.monster_id)
                    .map(|m| xp::monster_base_xp(m, &self.config))
                    .unwrap_or(self.config.base.xp_per_session);
                let prior_today = self.db.pomodoros_on(today)?;
                let crit = xp::roll_focus_crit(&mut self.rng, &self.config);
                let breakdown = xp::session_breakdown(
                    xp::SessionXpInputs {
                        base_xp,
                        had_distractions: session.had_distractions(),
                        prior_today_pomodoros: prior_today,
                        current_streak: stats.current_streak,
                        crit_multiplier: crit,
                    },
                    &self.config,
                );
                xp_earned = breakdown.final_xp;
                stats.current_xp += xp_earned;
                stats.total_pomodoros += 1;
                self.db.add_pomodoro(today)?;
                streak::apply_daily_streak(&mut stats, today);
                *stats
                    .monsters_defeated
                    .entry(session.monster_id.clone())
                    .or_insert(0) += 1;
                pomodoro_completed = true;
                xp_breakdown = Some(breakdown);
            }
            SessionResult::Defeat => {
                stats.current_streak = 0;
                // The user focused the whole window and the monster only
                // survived on healed HP: credit the pomodoro, without XP.
                let elapsed = session.elapsed_secs(now);
                if elapsed + FULL_DURATION_TOLERANCE_SECS >= session.duration_secs
                    && session.current_hp > 0
                    && !session.ended_early()
                {
                    stats.total_pomodoros += 1;
                    self.db.add_pomodoro(today)?;
                    pomodoro_completed = true;
                }
            }
            SessionResult::Abandoned => {
                stats.current_streak = 0;
            }
        }

        self.db.push_history(SessionHistoryEntry {
            success: result == SessionResult::Victory,
            date: self.clock.now(),
        })?;

        let outcome = SessionOutcome {
            result,
            xp_earned,
            xp_breakdown,
            previous_xp,
            current_xp: stats.current_xp,
            pomodoro_completed,
            total_pomodoros: stats.total_pomodoros,
            current_streak: stats.current_streak,
            monster_defeated_name: (result == SessionResult::Victory)
                .then(|| session.monster_name.clone()),
        };

        session.is_active = false;
        self.db.save_stats(&stats)?;
        self.db.save_outcome(&outcome)?;
        self.db.save_session(&session)?;

        self.phase = Phase::Resolved { since_ms: now };
        debug!(?result, xp_earned, "session resolved");
        Ok(Event::SessionResolved {
            outcome,
            at: self.clock.now(),
        })
    }

    /// Clear the terminal session record once the grace window has
    /// passed, letting a mid-render consumer finish reading it first.
    fn sweep_resolved(&mut self) -> Result<()> {
        if let Phase::Resolved { since_ms } = self.phase {
            if self.clock.now_ms().saturating_sub(since_ms) >= RESOLVED_GRACE_MS {
                self.db.clear_session()?;
                self.phase = Phase::Idle;
            }
        }
        Ok(())
    }

    fn disarm_clock(&mut self) {
        self.clock_armed = false;
    }

    /// Missing stats default to zeroes; a corrupt record is logged and
    /// defaulted rather than wedging every resolution.
    fn load_stats_or_default(&self) -> UserStats {
        match self.db.load_stats() {
            Ok(Some(stats)) => stats,
            Ok(None) => UserStats::default(),
            Err(e) => {
                warn!("corrupt user stats: {e}; starting from defaults");
                UserStats::default()
            }
        }
    }

    /// A corrupt session record is treated as no session.
    fn load_session_lenient(&self) -> Option<Session> {
        match self.db.load_session() {
            Ok(session) => session,
            Err(e) => {
                warn!("corrupt session record: {e}");
                None
            }
        }
    }

    fn credit_micro_xp(&mut self, micro_xp: u64) -> Result<()> {
        if micro_xp == 0 {
            return Ok(());
        }
        let mut stats = self.load_stats_or_default();
        stats.current_xp += micro_xp;
        self.db.save_stats(&stats)?;
        Ok(())
    }
}
