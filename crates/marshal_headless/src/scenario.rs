//! Scenario definitions for headless runs.
//!
//! A scenario describes the starting world: map dimensions, declared
//! start locations, each side's opening units, and the resource
//! fields. Scenarios load from RON files; the default is a small
//! 1v1 skirmish.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors loading a scenario file.
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// The file could not be read.
    #[error("failed to read scenario file: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid scenario RON.
    #[error("failed to parse scenario: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

/// Starting-world description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    /// Scenario name, echoed in the run summary.
    pub name: String,
    /// Map width in tiles.
    pub map_width: i32,
    /// Map height in tiles.
    pub map_height: i32,
    /// Declared start locations as (x, y) tiles; every entry is a
    /// potential base site the scout must rule out.
    pub start_locations: Vec<(i32, i32)>,
    /// Index into `start_locations` for our base.
    pub our_start: usize,
    /// Index into `start_locations` for the enemy base.
    pub enemy_start: usize,
    /// Workers each side begins with.
    pub starting_workers: u32,
    /// Raiders defending the enemy base.
    pub enemy_raiders: u32,
    /// Our starting minerals.
    pub starting_minerals: u32,
    /// Our starting gas.
    pub starting_gas: u32,
    /// Mineral nodes near each start location.
    pub mineral_nodes_per_base: u32,
    /// Frames to simulate before the run is declared over.
    pub max_frames: u64,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            name: "skirmish_1v1".to_string(),
            map_width: 64,
            map_height: 64,
            start_locations: vec![(6, 6), (58, 6), (6, 58), (58, 58)],
            our_start: 0,
            enemy_start: 3,
            starting_workers: 4,
            enemy_raiders: 3,
            starting_minerals: 400,
            starting_gas: 0,
            mineral_nodes_per_base: 2,
            max_frames: 20_000,
        }
    }
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let text = std::fs::read_to_string(path)?;
        Ok(ron::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scenario_is_consistent() {
        let scenario = Scenario::default();
        assert!(scenario.our_start < scenario.start_locations.len());
        assert!(scenario.enemy_start < scenario.start_locations.len());
        assert_ne!(scenario.our_start, scenario.enemy_start);
    }

    #[test]
    fn test_scenario_round_trips_through_ron() {
        let scenario = Scenario::default();
        let text = ron::to_string(&scenario).unwrap();
        let parsed: Scenario = ron::from_str(&text).unwrap();
        assert_eq!(parsed, scenario);
    }
}
