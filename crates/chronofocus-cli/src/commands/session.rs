use clap::Subcommand;

use chronofocus_core::{
    BattleEngine, Config, Database, Event, ManualObserver, MonsterCatalog,
};

#[derive(Subcommand)]
pub enum SessionAction {
    /// Start a battle against a monster
    Start {
        /// Monster id from the catalog
        monster_id: String,
        /// Session length in seconds (defaults to the monster's HP)
        #[arg(long)]
        duration: Option<u64>,
    },
    /// Apply one clock tick
    Tick {
        /// Hostname currently foregrounded
        #[arg(long)]
        host: Option<String>,
        /// Id of the currently foregrounded tab
        #[arg(long)]
        tab: Option<u64>,
    },
    /// Print engine state as JSON
    Status,
    /// End the active session early (abandons it, zero reward)
    End,
    /// Acknowledge the pending outcome so the result screen stops showing
    Ack,
    /// Clear any stuck session state
    Cleanup,
}

fn build_engine(action: &SessionAction) -> Result<BattleEngine, Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let catalog = MonsterCatalog::load()?;
    let config = Config::load()?;
    let mut engine = BattleEngine::new(db, catalog, config.xp);
    if let SessionAction::Tick { host, tab } = action {
        engine = engine.with_observer(Box::new(ManualObserver::new(host.clone(), *tab)));
    }
    Ok(engine)
}

fn print_event(event: &Event) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(event)?);
    Ok(())
}

pub fn run(action: SessionAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut engine = build_engine(&action)?;

    // The CLI process is the host: every invocation starts with a fresh
    // engine that must reconcile whatever the last invocation left behind.
    if let Some(event) = engine.recover_on_startup()? {
        print_event(&event)?;
    }

    match action {
        SessionAction::Start {
            monster_id,
            duration,
        } => {
            let event = engine.start_session(&monster_id, duration)?;
            print_event(&event)?;
        }
        SessionAction::Tick { .. } => match engine.tick()? {
            Some(event) => print_event(&event)?,
            None => eprintln!("no active session"),
        },
        SessionAction::Status => {
            let state = engine.state()?;
            println!("{}", serde_json::to_string_pretty(&state)?);
        }
        SessionAction::End => {
            let event = engine.end_session_early()?;
            print_event(&event)?;
        }
        SessionAction::Ack => {
            engine.clear_outcome()?;
            eprintln!("outcome cleared");
        }
        SessionAction::Cleanup => {
            let event = engine.force_cleanup()?;
            print_event(&event)?;
        }
    }
    Ok(())
}
