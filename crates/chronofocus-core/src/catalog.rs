//! Monster catalog.
//!
//! Static configuration, read-only at runtime. The built-in catalog ships
//! the stock monsters; a `monsters.toml` in the data directory replaces it
//! wholesale. A missing file means the shipped catalog; a file that fails
//! to parse is an error the caller must surface, never papered over.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::storage::data_dir;

/// Event-driven distraction trigger, as opposed to site-based triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerEvent {
    TabSwitch,
}

/// A monster definition.
///
/// `hp` doubles as the default session duration in seconds, so 1 HP is
/// roughly one second of undisturbed focus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Monster {
    pub id: String,
    pub name: String,
    pub icon: String,
    #[serde(default)]
    pub description: String,
    pub hp: u32,
    /// Hostname substrings that feed (heal) this monster.
    #[serde(default)]
    pub trigger_sites: Vec<String>,
    #[serde(default)]
    pub trigger_event: Option<TriggerEvent>,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    monster: Vec<Monster>,
}

/// The monster catalog, keyed by monster id.
#[derive(Debug, Clone, Default)]
pub struct MonsterCatalog {
    monsters: BTreeMap<String, Monster>,
}

impl MonsterCatalog {
    /// Path of the optional catalog override file.
    pub fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("monsters.toml"),
            message: e.to_string(),
        })?;
        Ok(dir.join("monsters.toml"))
    }

    /// Load the catalog: `monsters.toml` if present, the built-in catalog
    /// otherwise.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        if !path.exists() {
            return Ok(Self::builtin());
        }
        let raw = std::fs::read_to_string(&path).map_err(|e| ConfigError::LoadFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        let file: CatalogFile = toml::from_str(&raw).map_err(|e| ConfigError::LoadFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        Self::from_monsters(file.monster)
    }

    /// Build a catalog from explicit definitions, rejecting duplicates and
    /// zero-HP monsters.
    pub fn from_monsters(
        monsters: impl IntoIterator<Item = Monster>,
    ) -> Result<Self, ConfigError> {
        let mut map = BTreeMap::new();
        for monster in monsters {
            if monster.hp == 0 {
                return Err(ConfigError::InvalidValue {
                    key: format!("monster.{}.hp", monster.id),
                    message: "hp must be greater than 0".into(),
                });
            }
            let id = monster.id.clone();
            if map.insert(id.clone(), monster).is_some() {
                return Err(ConfigError::InvalidValue {
                    key: format!("monster.{id}"),
                    message: "duplicate monster id".into(),
                });
            }
        }
        Ok(Self { monsters: map })
    }

    /// The catalog shipped with the application.
    pub fn builtin() -> Self {
        let monsters = vec![
            Monster {
                id: "scrollfiend".into(),
                name: "Scrollfiend".into(),
                icon: "scrollfiend.png".into(),
                description: "Grows fat on endless social feeds.".into(),
                hp: 1500,
                trigger_sites: [
                    "twitter.com",
                    "x.com",
                    "reddit.com",
                    "instagram.com",
                    "facebook.com",
                    "tiktok.com",
                ]
                .map(String::from)
                .to_vec(),
                trigger_event: None,
            },
            Monster {
                id: "tubewyrm".into(),
                name: "Tubewyrm".into(),
                icon: "tubewyrm.png".into(),
                description: "Coils around autoplaying video queues.".into(),
                hp: 1500,
                trigger_sites: ["youtube.com", "twitch.tv", "netflix.com"]
                    .map(String::from)
                    .to_vec(),
                trigger_event: None,
            },
            Monster {
                id: "tabberwock".into(),
                name: "Tabberwock".into(),
                icon: "tabberwock.png".into(),
                description: "Snaps at every tab you open.".into(),
                hp: 900,
                trigger_sites: Vec::new(),
                trigger_event: Some(TriggerEvent::TabSwitch),
            },
            Monster {
                id: "testgremlin".into(),
                name: "Testgremlin".into(),
                icon: "testgremlin.png".into(),
                description: "A tiny sparring partner.".into(),
                hp: 10,
                trigger_sites: vec!["example.com".into()],
                trigger_event: None,
            },
        ];
        // The built-in definitions are statically valid.
        Self::from_monsters(monsters).unwrap_or_default()
    }

    pub fn get(&self, id: &str) -> Option<&Monster> {
        self.monsters.get(id)
    }

    pub fn all(&self) -> impl Iterator<Item = &Monster> {
        self.monsters.values()
    }

    pub fn is_empty(&self) -> bool {
        self.monsters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.monsters.len()
    }
}
