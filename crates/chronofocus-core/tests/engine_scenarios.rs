//! End-to-end battle engine scenarios.
//!
//! Time is driven by a `ManualClock`, activity by a `ManualObserver`, and
//! the focus crit is pinned to 1.0 so reward math is exact.

use chronofocus_core::battle::xp;
use chronofocus_core::{
    BattleEngine, CommandError, CoreError, Database, EngineState, Event, ManualClock,
    ManualObserver, Monster, MonsterCatalog, SessionResult, XpConfig,
};

/// 2023-11-14T22:13:20Z. Any fixed instant works; tests only move forward.
const T0: u64 = 1_700_000_000_000;

fn pinned_config() -> XpConfig {
    let mut cfg = XpConfig::default();
    cfg.modifiers.min_focus_crit = 1.0;
    cfg.modifiers.max_focus_crit = 1.0;
    cfg
}

fn custom_monster(id: &str, hp: u32, trigger_sites: &[&str]) -> Monster {
    Monster {
        id: id.into(),
        name: format!("The {id}"),
        icon: format!("{id}.png"),
        description: String::new(),
        hp,
        trigger_sites: trigger_sites.iter().map(|s| s.to_string()).collect(),
        trigger_event: None,
    }
}

fn engine_with_catalog(catalog: MonsterCatalog) -> (BattleEngine, ManualClock, ManualObserver) {
    let clock = ManualClock::new(T0);
    let observer = ManualObserver::default();
    let engine = BattleEngine::new(Database::open_memory().unwrap(), catalog, pinned_config())
        .with_clock(Box::new(clock.clone()))
        .with_observer(Box::new(observer.clone()))
        .with_rng_seed(7);
    (engine, clock, observer)
}

fn engine() -> (BattleEngine, ManualClock, ManualObserver) {
    engine_with_catalog(MonsterCatalog::builtin())
}

fn tick_seconds(engine: &mut BattleEngine, clock: &ManualClock, seconds: u64) -> Option<Event> {
    let mut last = None;
    for _ in 0..seconds {
        clock.advance_secs(1);
        last = engine.tick().unwrap();
    }
    last
}

fn resolved_outcome(event: Option<Event>) -> chronofocus_core::SessionOutcome {
    match event {
        Some(Event::SessionResolved { outcome, .. }) => outcome,
        other => panic!("expected SessionResolved, got {other:?}"),
    }
}

#[test]
fn clean_victory_awards_everything() {
    let (mut engine, clock, _observer) = engine();
    engine.start_session("testgremlin", None).unwrap();

    // Ticks 1..=9 keep the battle running; the 10th drains the last HP.
    let last = tick_seconds(&mut engine, &clock, 10);
    let outcome = resolved_outcome(last);

    assert_eq!(outcome.result, SessionResult::Victory);
    assert_eq!(outcome.monster_defeated_name.as_deref(), Some("Testgremlin"));
    assert!(outcome.pomodoro_completed);
    assert_eq!(outcome.total_pomodoros, 1);
    assert_eq!(outcome.current_streak, 1);

    // Base 50 (min XP floor) + 25% no-distractions bonus, crit pinned.
    assert_eq!(outcome.xp_earned, 62);
    let breakdown = outcome.xp_breakdown.unwrap();
    assert_eq!(breakdown.base_xp, 50);
    assert_eq!(breakdown.bonuses.len(), 1);

    // Start (+5) and halfway (+10) micro-awards were credited mid-session.
    assert_eq!(outcome.previous_xp, 15);
    assert_eq!(outcome.current_xp, 77);

    assert!(!engine.clock_armed());
}

#[test]
fn parked_on_trigger_site_times_out_into_defeat_with_pomodoro_credit() {
    let (mut engine, clock, observer) = engine();
    observer.set_hostname(Some("www.example.com"));
    engine.start_session("testgremlin", None).unwrap();

    let last = tick_seconds(&mut engine, &clock, 10);
    let outcome = resolved_outcome(last);

    // Damage was suppressed every tick, so the clock ran out first.
    assert_eq!(outcome.result, SessionResult::Defeat);
    assert_eq!(outcome.xp_earned, 0);
    assert!(outcome.xp_breakdown.is_none());
    assert_eq!(outcome.current_streak, 0);
    // Full duration elapsed with HP left: pomodoro credited without XP.
    assert!(outcome.pomodoro_completed);
    assert_eq!(outcome.total_pomodoros, 1);
}

#[test]
fn early_abandon_forfeits_all_rewards() {
    let (mut engine, clock, _observer) = engine();
    engine.start_session("testgremlin", None).unwrap();
    tick_seconds(&mut engine, &clock, 3);

    let outcome = match engine.end_session_early().unwrap() {
        Event::SessionResolved { outcome, .. } => outcome,
        other => panic!("expected SessionResolved, got {other:?}"),
    };

    assert_eq!(outcome.result, SessionResult::Abandoned);
    assert_eq!(outcome.xp_earned, 0);
    assert!(!outcome.pomodoro_completed);
    assert_eq!(outcome.total_pomodoros, 0);
    assert_eq!(outcome.current_streak, 0);
    assert!(!engine.clock_armed());
}

#[test]
fn end_session_early_without_a_session_is_rejected() {
    let (mut engine, _clock, _observer) = engine();
    let err = engine.end_session_early().unwrap_err();
    assert!(matches!(
        err,
        CoreError::Command(CommandError::NoActiveSession)
    ));
}

#[test]
fn unknown_monster_is_rejected_without_state_changes() {
    let (mut engine, _clock, _observer) = engine();
    let err = engine.start_session("grue", None).unwrap_err();
    assert!(matches!(
        err,
        CoreError::Command(CommandError::InvalidMonster(_))
    ));
    assert!(matches!(engine.state().unwrap(), EngineState::Idle));
}

#[test]
fn empty_catalog_blocks_session_start() {
    let (mut engine, _clock, _observer) =
        engine_with_catalog(MonsterCatalog::from_monsters(Vec::<Monster>::new()).unwrap());
    let err = engine.start_session("testgremlin", None).unwrap_err();
    assert!(matches!(
        err,
        CoreError::Command(CommandError::MonstersNotLoaded)
    ));
}

#[test]
fn stray_tick_with_no_session_disarms_the_clock() {
    let (mut engine, clock, _observer) = engine();
    clock.advance_secs(1);
    assert!(engine.tick().unwrap().is_none());
    assert!(!engine.clock_armed());
}

#[test]
fn skipped_ticks_reconcile_against_wall_clock() {
    let catalog =
        MonsterCatalog::from_monsters(vec![custom_monster("wyrm", 100, &[])]).unwrap();
    let (mut engine, clock, _observer) = engine_with_catalog(catalog);
    engine.start_session("wyrm", None).unwrap();

    // The host slept for 30 seconds; one tick catches the session up.
    clock.advance_secs(30);
    let event = engine.tick().unwrap().unwrap();
    match event {
        Event::BattleStateUpdated { session, .. } => {
            assert_eq!(session.current_hp, 70);
            assert_eq!(session.remaining_secs, 70);
        }
        other => panic!("expected BattleStateUpdated, got {other:?}"),
    }
}

#[test]
fn starting_twice_keeps_only_the_second_session() {
    let (mut engine, clock, _observer) = engine();
    engine.start_session("testgremlin", None).unwrap();
    tick_seconds(&mut engine, &clock, 2);

    // Duplicate start: the first session is discarded with no outcome.
    engine.start_session("tubewyrm", Some(60)).unwrap();
    assert!(engine.database().load_outcome().unwrap().is_none());

    tick_seconds(&mut engine, &clock, 1);
    match engine.state().unwrap() {
        EngineState::Active { session: snapshot } => {
            assert_eq!(snapshot.monster_id, "tubewyrm");
            assert_eq!(snapshot.remaining_secs, 59);
            assert_eq!(snapshot.current_hp, 1499);
        }
        other => panic!("expected an active session, got {other:?}"),
    }

    let stored = engine.database().load_session().unwrap().unwrap();
    assert_eq!(stored.monster_id, "tubewyrm");
}

#[test]
fn site_healing_is_rate_limited_and_coalesced() {
    let catalog =
        MonsterCatalog::from_monsters(vec![custom_monster("imp", 10, &["example.com"])]).unwrap();
    let (mut engine, clock, observer) = engine_with_catalog(catalog);
    // A long window keeps the halfway milestone out of this test's way.
    engine.start_session("imp", Some(120)).unwrap();

    // Three focused seconds: 10 -> 7.
    tick_seconds(&mut engine, &clock, 3);

    // Park on the trigger site: damage stops, healing is capped to one
    // HP per three seconds of wall clock.
    observer.set_hostname(Some("example.com"));
    let last = tick_seconds(&mut engine, &clock, 4);

    let snapshot = match last {
        Some(Event::BattleStateUpdated { session, .. }) => session,
        other => panic!("expected BattleStateUpdated, got {other:?}"),
    };
    // Heals landed at +4s and +7s only.
    assert_eq!(snapshot.current_hp, 9);
    let healing_lines: Vec<&String> = snapshot
        .battle_log
        .iter()
        .filter(|line| line.contains("feeds on"))
        .collect();
    assert_eq!(healing_lines.len(), 1);
    assert_eq!(*healing_lines[0], "The imp feeds on example.com! +2 HP.");
}

#[test]
fn hp_never_leaves_its_bounds() {
    let catalog =
        MonsterCatalog::from_monsters(vec![custom_monster("imp", 5, &["example.com"])]).unwrap();
    let (mut engine, clock, observer) = engine_with_catalog(catalog);
    engine.start_session("imp", None).unwrap();

    tick_seconds(&mut engine, &clock, 1);
    observer.set_hostname(Some("example.com"));
    for _ in 0..3 {
        if let Some(Event::BattleStateUpdated { session, .. }) =
            tick_seconds(&mut engine, &clock, 1)
        {
            assert!(session.current_hp <= session.max_hp);
        }
    }

    // Back at full HP, further trigger-site ticks must not overheal.
    match engine.state().unwrap() {
        EngineState::Active { session: snapshot } => assert_eq!(snapshot.current_hp, 5),
        other => panic!("expected an active session, got {other:?}"),
    }
}

#[test]
fn tab_switches_heal_edge_triggered_only() {
    let mut monster = custom_monster("tabber", 20, &[]);
    monster.trigger_event = Some(chronofocus_core::TriggerEvent::TabSwitch);
    let catalog = MonsterCatalog::from_monsters(vec![monster]).unwrap();
    let (mut engine, clock, observer) = engine_with_catalog(catalog);
    engine.start_session("tabber", None).unwrap();

    observer.set_tab(Some(1));
    tick_seconds(&mut engine, &clock, 2); // 20 -> 18, tab 1 observed

    observer.set_tab(Some(2));
    // The switch second deals no damage and feeds the monster +2.
    tick_seconds(&mut engine, &clock, 1);

    let after_switch = match engine.state().unwrap() {
        EngineState::Active { session: snapshot } => snapshot,
        other => panic!("expected an active session, got {other:?}"),
    };
    assert_eq!(after_switch.current_hp, 20);
    assert!(after_switch
        .battle_log
        .iter()
        .any(|line| line == "The tabber feeds on tab switching! +2 HP."));

    // Staying on the same tab must not re-heal.
    tick_seconds(&mut engine, &clock, 2);
    match engine.state().unwrap() {
        EngineState::Active { session: snapshot } => assert_eq!(snapshot.current_hp, 18),
        other => panic!("expected an active session, got {other:?}"),
    }
}

#[test]
fn milestones_fire_exactly_once() {
    let (mut engine, clock, _observer) = engine();
    engine.start_session("testgremlin", None).unwrap();

    // Jump straight past the halfway mark, then keep ticking.
    clock.advance_secs(5);
    engine.tick().unwrap();
    tick_seconds(&mut engine, &clock, 2);

    match engine.state().unwrap() {
        EngineState::Active { session: snapshot } => {
            assert!(snapshot.milestones.started);
            assert!(snapshot.milestones.halfway);
            let halfway_lines = snapshot
                .battle_log
                .iter()
                .filter(|line| line.starts_with("Halfway there!"))
                .count();
            let start_lines = snapshot
                .battle_log
                .iter()
                .filter(|line| line.starts_with("The battle is joined!"))
                .count();
            assert_eq!(halfway_lines, 1);
            assert_eq!(start_lines, 1);
        }
        other => panic!("expected an active session, got {other:?}"),
    }
}

#[test]
fn same_day_victories_cap_the_streak_and_grant_second_session_bonus() {
    let (mut engine, clock, _observer) = engine();

    engine.start_session("testgremlin", None).unwrap();
    let first = resolved_outcome(tick_seconds(&mut engine, &clock, 10));
    assert_eq!(first.current_streak, 1);

    engine.start_session("testgremlin", None).unwrap();
    let second = resolved_outcome(tick_seconds(&mut engine, &clock, 10));

    // Same calendar day: the streak does not increment again.
    assert_eq!(second.current_streak, 1);
    assert_eq!(second.total_pomodoros, 2);

    // One prior completion today: the second-session bonus applies, and
    // a 1-day streak multiplies on top.
    let breakdown = second.xp_breakdown.unwrap();
    let kinds: Vec<String> = breakdown
        .bonuses
        .iter()
        .map(|b| format!("{:?}", b.kind))
        .collect();
    assert!(kinds.contains(&"SecondSession".to_string()));
    assert!(kinds.contains(&"StreakBonus".to_string()));

    // XP only ever grows.
    assert!(second.current_xp >= second.previous_xp);
    assert!(second.previous_xp >= first.current_xp);
}

#[test]
fn resolved_session_clears_after_grace_but_outcome_persists() {
    let (mut engine, clock, _observer) = engine();
    engine.start_session("testgremlin", None).unwrap();
    resolved_outcome(tick_seconds(&mut engine, &clock, 10));

    // Inside the grace window the terminal session is still readable.
    assert!(engine.database().load_session().unwrap().is_some());
    assert!(matches!(engine.state().unwrap(), EngineState::Resolved { .. }));

    clock.advance_ms(600);
    assert!(matches!(engine.state().unwrap(), EngineState::Resolved { .. }));
    assert!(engine.database().load_session().unwrap().is_none());

    // The outcome stays until a consumer acknowledges it.
    engine.clear_outcome().unwrap();
    assert!(matches!(engine.state().unwrap(), EngineState::Idle));
}

#[test]
fn recovery_resumes_a_live_session_and_reconciles_damage() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chronofocus.db");
    let catalog = || MonsterCatalog::from_monsters(vec![custom_monster("wyrm", 100, &[])]).unwrap();

    {
        let clock = ManualClock::new(T0);
        let mut engine =
            BattleEngine::new(Database::open_at(&path).unwrap(), catalog(), pinned_config())
                .with_clock(Box::new(clock.clone()));
        engine.start_session("wyrm", None).unwrap();
        tick_seconds(&mut engine, &clock, 10);
    }

    // Restart 30 seconds in: the session is still inside its window.
    let clock = ManualClock::new(T0 + 30_000);
    let mut engine =
        BattleEngine::new(Database::open_at(&path).unwrap(), catalog(), pinned_config())
            .with_clock(Box::new(clock.clone()));
    assert!(engine.recover_on_startup().unwrap().is_none());
    assert!(engine.clock_armed());

    clock.advance_secs(1);
    match engine.tick().unwrap().unwrap() {
        Event::BattleStateUpdated { session, .. } => {
            // 31 elapsed seconds of damage, applied as if ticked each second.
            assert_eq!(session.current_hp, 69);
        }
        other => panic!("expected BattleStateUpdated, got {other:?}"),
    }
}

#[test]
fn recovery_after_full_elapse_resolves_immediately_as_defeat() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chronofocus.db");
    let catalog = || MonsterCatalog::from_monsters(vec![custom_monster("wyrm", 100, &[])]).unwrap();

    {
        let clock = ManualClock::new(T0);
        let mut engine =
            BattleEngine::new(Database::open_at(&path).unwrap(), catalog(), pinned_config())
                .with_clock(Box::new(clock.clone()));
        engine.start_session("wyrm", None).unwrap();
        // 60 focused seconds: HP 100 -> 40, clock 40 seconds from expiry.
        tick_seconds(&mut engine, &clock, 60);
    }

    // The engine comes back 200 seconds after the start: the window is
    // long gone and HP never reached zero.
    let clock = ManualClock::new(T0 + 200_000);
    let mut engine =
        BattleEngine::new(Database::open_at(&path).unwrap(), catalog(), pinned_config())
            .with_clock(Box::new(clock.clone()));
    let outcome = resolved_outcome(engine.recover_on_startup().unwrap());

    assert_eq!(outcome.result, SessionResult::Defeat);
    assert_eq!(outcome.xp_earned, 0);
    assert_eq!(outcome.current_streak, 0);
    // The user focused the whole window; the credit still applies.
    assert!(outcome.pomodoro_completed);
    assert!(!engine.clock_armed());
    assert!(matches!(engine.state().unwrap(), EngineState::Resolved { .. }));
}

#[test]
fn force_cleanup_always_returns_to_idle() {
    let (mut engine, clock, _observer) = engine();
    engine.start_session("testgremlin", None).unwrap();
    tick_seconds(&mut engine, &clock, 2);

    engine.force_cleanup().unwrap();
    assert!(!engine.clock_armed());
    assert!(matches!(engine.state().unwrap(), EngineState::Idle));
    assert!(engine.database().load_session().unwrap().is_none());
    assert!(engine.database().load_outcome().unwrap().is_none());
}

#[test]
fn level_and_title_derive_from_earned_xp() {
    let cfg = pinned_config();
    // A few victories' worth of XP lands mid-curve.
    let level = xp::level_for_xp(1_000, &cfg);
    assert!(level >= 2);
    let title = xp::title_for_level(level, &cfg);
    assert!(!title.is_empty());
}
