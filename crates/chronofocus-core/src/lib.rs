//! # ChronoFocus Core Library
//!
//! Core business logic for ChronoFocus, a gamified focus timer: a focus
//! session is a battle against a monster whose HP drains while the user
//! stays on task and refills when they drift to distracting sites or
//! switch tabs.
//!
//! ## Architecture
//!
//! - **Battle Engine**: A wall-clock-based state machine that requires the
//!   host to periodically invoke `tick()`. Elapsed time is always
//!   re-derived from the session's start instant, so missed ticks during
//!   host suspension reconcile instead of drifting.
//! - **Storage**: SQLite-backed key-value store for the session, the last
//!   outcome, cumulative stats, day-keyed counters and recent history;
//!   TOML-based configuration and monster catalog
//! - **XP System**: Pure calculator for base XP, bonuses, level curve and
//!   titles
//! - **Activity Observer**: Trait seam through which the host reports the
//!   foregrounded site/tab each tick
//!
//! ## Concurrency
//!
//! The engine is single-writer by construction: every command takes
//! `&mut self` and persists its full effect before returning the
//! notification event. Hosts deliver clock ticks, user commands and
//! activity updates as discrete, serialized calls.
//!
//! ## Key Components
//!
//! - [`BattleEngine`]: Session lifecycle state machine
//! - [`Database`]: Durable state store
//! - [`MonsterCatalog`] / [`Config`]: Static configuration
//! - [`ActivityObserver`]: Foreground-activity seam

pub mod battle;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod observer;
pub mod stats;
pub mod storage;

pub use battle::{BattleEngine, BattleSnapshot, EngineState, Session};
pub use catalog::{Monster, MonsterCatalog, TriggerEvent};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Config, XpConfig};
pub use error::{CommandError, ConfigError, CoreError, Result, StorageError};
pub use events::Event;
pub use observer::{ActivityObserver, ManualObserver, NullObserver};
pub use stats::{SessionOutcome, SessionResult, UserStats, XpBreakdown};
pub use storage::Database;
