use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::battle::BattleSnapshot;
use crate::stats::SessionOutcome;

/// Every externally visible state change produces an Event.
/// Hosts forward them to whatever presentation layer is listening;
/// a missing listener is not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    SessionStarted {
        session: BattleSnapshot,
        at: DateTime<Utc>,
    },
    /// Emitted every tick while a session is active.
    BattleStateUpdated {
        session: BattleSnapshot,
        at: DateTime<Utc>,
    },
    /// Emitted exactly once per session.
    SessionResolved {
        outcome: SessionOutcome,
        at: DateTime<Utc>,
    },
    SessionCleared {
        at: DateTime<Utc>,
    },
}
