//! Known world instances and the single active one

use crate::error::{DashboardError, Result};
use chrono::{DateTime, Duration, TimeZone, Utc};
use log::debug;
use shared::{WorldKind, WorldSummary};

/// One world known to the dashboard
#[derive(Debug, Clone, PartialEq)]
pub struct WorldRecord {
    pub name: String,
    pub kind: WorldKind,
    /// Size on disk in megabytes
    pub size_mb: f32,
    pub last_played: Option<DateTime<Utc>>,
    pub active: bool,
}

impl WorldRecord {
    /// Converts a world summary from the wire.
    ///
    /// `last_played` arrives as Unix milliseconds; values chrono cannot
    /// represent are treated as never played.
    pub fn from_summary(summary: &WorldSummary) -> Self {
        Self {
            name: summary.name.clone(),
            kind: summary.kind,
            size_mb: summary.size_mb,
            last_played: summary
                .last_played
                .and_then(|ms| Utc.timestamp_millis_opt(ms as i64).single()),
            active: summary.active,
        }
    }

    /// Human readable age of the last session, e.g. "2 hours ago"
    pub fn last_played_label(&self, now: DateTime<Utc>) -> String {
        let Some(last) = self.last_played else {
            return "never".to_string();
        };
        let elapsed = now.signed_duration_since(last);
        if elapsed.num_days() > 0 {
            plural(elapsed.num_days(), "day")
        } else if elapsed.num_hours() > 0 {
            plural(elapsed.num_hours(), "hour")
        } else if elapsed.num_minutes() > 0 {
            plural(elapsed.num_minutes(), "minute")
        } else {
            "just now".to_string()
        }
    }
}

fn plural(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("1 {} ago", unit)
    } else {
        format!("{} {}s ago", count, unit)
    }
}

/// Settings for a new world
#[derive(Debug, Clone, PartialEq)]
pub struct WorldConfig {
    pub name: String,
    pub kind: WorldKind,
    /// Free-form seed, `None` lets the server pick one
    pub seed: Option<String>,
    pub generate_structures: bool,
}

impl WorldConfig {
    /// Unseeded world with structures enabled
    pub fn new(name: impl Into<String>, kind: WorldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            seed: None,
            generate_structures: true,
        }
    }
}

/// At most one world is active before and after every operation
#[derive(Debug, Clone)]
pub struct WorldRegistry {
    worlds: Vec<WorldRecord>,
}

impl Default for WorldRegistry {
    fn default() -> Self {
        let now = Utc::now();
        let world = |name: &str, kind, size_mb, age: Duration, active| WorldRecord {
            name: name.to_string(),
            kind,
            size_mb,
            last_played: Some(now - age),
            active,
        };

        Self {
            worlds: vec![
                world("world", WorldKind::Normal, 125.0, Duration::hours(2), true),
                world("creative_world", WorldKind::Flat, 45.0, Duration::days(1), false),
                world("adventure_map", WorldKind::Normal, 89.0, Duration::days(3), false),
            ],
        }
    }
}

impl WorldRegistry {
    /// Empty registry; `default()` provides the sample worlds shown before
    /// a server connects
    pub fn new() -> Self {
        Self { worlds: Vec::new() }
    }

    /// Worlds in the order the server reported them
    pub fn list(&self) -> &[WorldRecord] {
        &self.worlds
    }

    /// The world currently loaded, if any
    pub fn active(&self) -> Option<&WorldRecord> {
        self.worlds.iter().find(|w| w.active)
    }

    pub fn get(&self, name: &str) -> Option<&WorldRecord> {
        self.worlds.iter().find(|w| w.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Makes `name` the only active world.
    ///
    /// A missing target fails before anything changes, so the previous world
    /// stays active.
    pub fn activate(&mut self, name: &str) -> Result<()> {
        let target = self
            .worlds
            .iter()
            .position(|w| w.name == name)
            .ok_or_else(|| {
                DashboardError::WorldConflict(format!("world '{}' does not exist", name))
            })?;

        if self.worlds[target].active {
            debug!("World {} is already active", name);
            return Ok(());
        }

        for world in &mut self.worlds {
            world.active = false;
        }
        let world = &mut self.worlds[target];
        world.active = true;
        world.last_played = Some(Utc::now());
        Ok(())
    }

    /// Registers a new, inactive world with a unique non-empty name
    pub fn create(&mut self, config: &WorldConfig) -> Result<WorldRecord> {
        let name = config.name.trim();
        if name.is_empty() {
            return Err(DashboardError::WorldConflict(
                "world name must not be empty".to_string(),
            ));
        }
        if self.contains(name) {
            return Err(DashboardError::WorldConflict(format!(
                "world '{}' already exists",
                name
            )));
        }

        let record = WorldRecord {
            name: name.to_string(),
            kind: config.kind,
            size_mb: 0.0,
            last_played: None,
            active: false,
        };
        self.worlds.push(record.clone());
        Ok(record)
    }

    /// Drops an inactive world, used to undo a create the server refused
    pub fn remove(&mut self, name: &str) -> Option<WorldRecord> {
        let index = self
            .worlds
            .iter()
            .position(|w| w.name == name && !w.active)?;
        Some(self.worlds.remove(index))
    }

    /// Adopts the server's view of its worlds
    pub fn replace_all(&mut self, summaries: &[WorldSummary]) {
        self.worlds = summaries.iter().map(WorldRecord::from_summary).collect();

        // Keep only the first active flag if the server reported several
        let mut seen_active = false;
        for world in &mut self.worlds {
            if world.active {
                world.active = !seen_active;
                seen_active = true;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.worlds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.worlds.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn active_count(registry: &WorldRegistry) -> usize {
        registry.list().iter().filter(|w| w.active).count()
    }

    #[test]
    fn test_default_worlds() {
        let registry = WorldRegistry::default();
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.active().unwrap().name, "world");
        assert_approx_eq!(registry.get("creative_world").unwrap().size_mb, 45.0);
    }

    #[test]
    fn test_activate_is_exclusive() {
        let mut registry = WorldRegistry::default();
        registry.activate("adventure_map").unwrap();

        assert_eq!(active_count(&registry), 1);
        assert_eq!(registry.active().unwrap().name, "adventure_map");
        assert!(!registry.get("world").unwrap().active);
    }

    #[test]
    fn test_activate_missing_keeps_previous() {
        let mut registry = WorldRegistry::default();
        let result = registry.activate("nowhere");

        assert!(matches!(result, Err(DashboardError::WorldConflict(_))));
        assert_eq!(registry.active().unwrap().name, "world");
        assert_eq!(active_count(&registry), 1);
    }

    #[test]
    fn test_activate_missing_in_registry_without_active() {
        let mut registry = WorldRegistry::new();
        registry
            .create(&WorldConfig::new("lobby", WorldKind::Flat))
            .unwrap();

        assert!(registry.activate("nowhere").is_err());
        assert_eq!(active_count(&registry), 0);
    }

    #[test]
    fn test_activate_active_world_is_noop() {
        let mut registry = WorldRegistry::default();
        let before = registry.get("world").unwrap().last_played;
        registry.activate("world").unwrap();
        assert_eq!(registry.get("world").unwrap().last_played, before);
    }

    #[test]
    fn test_create_duplicate_is_conflict() {
        let mut registry = WorldRegistry::default();
        let size = registry.len();

        let result = registry.create(&WorldConfig::new("world", WorldKind::Nether));
        assert!(matches!(result, Err(DashboardError::WorldConflict(_))));
        assert_eq!(registry.len(), size);
        assert_eq!(registry.get("world").unwrap().kind, WorldKind::Normal);
    }

    #[test]
    fn test_create_requires_name() {
        let mut registry = WorldRegistry::default();
        assert!(registry.create(&WorldConfig::new("   ", WorldKind::End)).is_err());
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_create_adds_inactive_world() {
        let mut registry = WorldRegistry::default();
        let record = registry
            .create(&WorldConfig::new(" skyblock ", WorldKind::End))
            .unwrap();

        assert_eq!(record.name, "skyblock");
        assert!(!record.active);
        assert_eq!(registry.len(), 4);
        assert_eq!(registry.active().unwrap().name, "world");
    }

    #[test]
    fn test_remove_only_inactive() {
        let mut registry = WorldRegistry::default();
        assert!(registry.remove("world").is_none());
        assert!(registry.remove("adventure_map").is_some());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_replace_all_keeps_single_active() {
        let mut registry = WorldRegistry::default();
        let summary = |name: &str, active| WorldSummary {
            name: name.to_string(),
            kind: WorldKind::Normal,
            size_mb: 1.5,
            last_played: Some(1_700_000_000_000),
            active,
        };
        registry.replace_all(&[summary("a", true), summary("b", true)]);

        assert_eq!(registry.len(), 2);
        assert_eq!(active_count(&registry), 1);
        assert_eq!(registry.active().unwrap().name, "a");
        assert_approx_eq!(registry.get("b").unwrap().size_mb, 1.5);
        assert!(registry.get("a").unwrap().last_played.is_some());
    }

    #[test]
    fn test_last_played_label() {
        let now = Utc::now();
        let mut record = WorldRecord {
            name: "w".to_string(),
            kind: WorldKind::Normal,
            size_mb: 1.0,
            last_played: Some(now - Duration::hours(2)),
            active: false,
        };
        assert_eq!(record.last_played_label(now), "2 hours ago");

        record.last_played = Some(now - Duration::days(1));
        assert_eq!(record.last_played_label(now), "1 day ago");

        record.last_played = None;
        assert_eq!(record.last_played_label(now), "never");
    }
}
