//! Activity observation seam.
//!
//! The engine needs a single fact per tick: what site/tab is foregrounded
//! right now. Hosts supply it by implementing [`ActivityObserver`]; the
//! engine never talks to tab APIs itself.

use std::sync::{Arc, Mutex};

/// Supplies the engine with the current foreground activity.
pub trait ActivityObserver: Send {
    /// Hostname of the foregrounded site, if one is known.
    fn foreground_hostname(&mut self) -> Option<String>;

    /// Identifier of the currently foregrounded tab, if one is known.
    fn active_tab(&mut self) -> Option<u64>;
}

/// Observer that reports nothing. Used by headless hosts.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl ActivityObserver for NullObserver {
    fn foreground_hostname(&mut self) -> Option<String> {
        None
    }

    fn active_tab(&mut self) -> Option<u64> {
        None
    }
}

#[derive(Debug, Default)]
struct Sample {
    hostname: Option<String>,
    tab: Option<u64>,
}

/// Hand-driven observer.
///
/// Clones share the same sample, so the host (or a test) can keep a handle
/// and update what the engine will observe on its next tick.
#[derive(Debug, Default, Clone)]
pub struct ManualObserver(Arc<Mutex<Sample>>);

impl ManualObserver {
    pub fn new(hostname: Option<String>, tab: Option<u64>) -> Self {
        Self(Arc::new(Mutex::new(Sample { hostname, tab })))
    }

    pub fn set_hostname(&self, hostname: Option<&str>) {
        if let Ok(mut sample) = self.0.lock() {
            sample.hostname = hostname.map(String::from);
        }
    }

    pub fn set_tab(&self, tab: Option<u64>) {
        if let Ok(mut sample) = self.0.lock() {
            sample.tab = tab;
        }
    }
}

impl ActivityObserver for ManualObserver {
    fn foreground_hostname(&mut self) -> Option<String> {
        self.0.lock().ok().and_then(|s| s.hostname.clone())
    }

    fn active_tab(&mut self) -> Option<u64> {
        self.0.lock().ok().and_then(|s| s.tab)
    }
}

/// Case-insensitive substring match of `hostname` against trigger sites.
/// Returns the matched site so callers can name it in the battle log.
pub fn matching_trigger_site<'a>(hostname: &str, sites: &'a [String]) -> Option<&'a str> {
    let host = hostname.to_ascii_lowercase();
    sites
        .iter()
        .find(|site| host.contains(&site.to_ascii_lowercase()))
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sites(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn matches_are_case_insensitive_substrings() {
        let sites = sites(&["reddit.com", "x.com"]);
        assert_eq!(matching_trigger_site("www.Reddit.com", &sites), Some("reddit.com"));
        assert_eq!(matching_trigger_site("old.reddit.com", &sites), Some("reddit.com"));
        assert_eq!(matching_trigger_site("docs.rs", &sites), None);
    }

    #[test]
    fn manual_observer_clones_share_state() {
        let observer = ManualObserver::default();
        let mut engine_side = observer.clone();
        assert_eq!(engine_side.foreground_hostname(), None);

        observer.set_hostname(Some("youtube.com"));
        observer.set_tab(Some(7));
        assert_eq!(engine_side.foreground_hostname().as_deref(), Some("youtube.com"));
        assert_eq!(engine_side.active_tab(), Some(7));
    }
}
