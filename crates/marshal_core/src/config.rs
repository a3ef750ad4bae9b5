//! Tunables and doctrine bindings.
//!
//! [`BotConfig`] holds the numeric knobs; compile-time defaults match
//! the values the bot ships with. [`Doctrine`] binds the controllers to
//! concrete catalog types - which unit is the worker, which structure
//! garrisons infantry - so the decision logic itself stays data-driven.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::catalog::{FactionId, StructureTypeId, TypeCatalog, UnitTypeId};
use crate::engine::Tick;
use crate::goals::GoalTarget;

/// Numeric tunables for the decision layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Frames between decision ticks; orders issued on one tick need
    /// this long to take observable effect.
    pub decision_interval: Tick,
    /// Maximum workers to train.
    pub worker_cap: u32,
    /// Minimum workers before gas extraction is worthwhile.
    pub gas_worker_threshold: u32,
    /// Minimum workers before one can be spared for scouting.
    pub scout_worker_threshold: u32,
    /// Harvesters maintained per extractor.
    pub extractor_harvesters: usize,
    /// Gathering quorum numerator.
    pub quorum_num: u32,
    /// Gathering quorum denominator.
    pub quorum_den: u32,
    /// Radius in tiles within which a unit counts as gathered at the
    /// rally point.
    pub gather_radius: i32,
    /// Slack in tiles when deciding a unit is already en route to the
    /// rally point.
    pub rally_slack: i32,
    /// Radius in tiles within which a unit is close enough to the
    /// rally point to leave alone.
    pub rally_near: i32,
    /// Radius in tiles scanned for hostiles around the depot while
    /// defending.
    pub defend_radius: i32,
    /// Radius in tiles scanned for ground threats near the depot.
    pub threat_radius: i32,
    /// Radius in tiles scanned for workers around an extractor.
    pub extractor_scan_radius: i32,
    /// Ticks an attack may spend gathering before committing anyway.
    pub gathering_timeout: Tick,
    /// Cooldown after committing against a mobile target.
    pub cooldown_short: Tick,
    /// Cooldown after committing against a structure, long enough for
    /// a base assault to play out.
    pub cooldown_long: Tick,
    /// Grace period granted to freshly started goals.
    pub goal_grace: Tick,
    /// Minimum ticks between any two structure orders.
    pub structure_order_spacing: Tick,
    /// Additional spacing before goal-driven structure orders.
    pub goal_order_spacing: Tick,
    /// Ticks between extractor-opportunity checks at the depot.
    pub refinery_check_interval: Tick,
    /// Ticks between per-extractor harvester reconciliations.
    pub extractor_recheck: Tick,
    /// Ticks between threat scans around the depot.
    pub threat_scan_interval: Tick,
    /// Unallocated minerals above which the surplus valve opens.
    pub surplus_threshold: u32,
    /// Siege-capable units required before attacking.
    pub siege_threshold: u32,
    /// Sighted enemy combat units that constitute an early rush.
    pub rush_threshold: usize,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            decision_interval: 8,
            worker_cap: 21,
            gas_worker_threshold: 12,
            scout_worker_threshold: 14,
            extractor_harvesters: 3,
            quorum_num: 3,
            quorum_den: 4,
            gather_radius: 10,
            rally_slack: 4,
            rally_near: 5,
            defend_radius: 32,
            threat_radius: 8,
            extractor_scan_radius: 16,
            gathering_timeout: 24 * 60,
            cooldown_short: 24 * 10,
            cooldown_long: 24 * 30,
            goal_grace: 48,
            structure_order_spacing: 24,
            goal_order_spacing: 24,
            refinery_check_interval: 120,
            extractor_recheck: 24,
            threat_scan_interval: 48,
            surplus_threshold: 600,
            siege_threshold: 4,
            rush_threshold: 4,
        }
    }
}

/// Concrete type bindings the controllers act on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Doctrine {
    /// The faction we control.
    pub faction: FactionId,
    /// Worker-class unit.
    pub worker: UnitTypeId,
    /// Supply-provider structure.
    pub supply_structure: StructureTypeId,
    /// Gas-extraction structure.
    pub extractor: StructureTypeId,
    /// Bunker-class garrison structure.
    pub garrison_structure: StructureTypeId,
    /// Unit type eligible for garrison duty.
    pub garrison_unit: UnitTypeId,
    /// Siege-capable unit the readiness evaluator counts.
    pub siege_unit: UnitTypeId,
    /// Structure synthesized when income outruns the goal queue.
    pub surplus_structure: StructureTypeId,
    /// Structure front-inserted (twice) when an early rush is read
    /// from scouting.
    pub rush_response: StructureTypeId,
    /// Sighting this enemy structure front-inserts two of the paired
    /// counter structure.
    pub cloak_tell: Option<(StructureTypeId, StructureTypeId)>,
    /// Opening goals appended against any opponent.
    pub opening_common: Vec<GoalTarget>,
    /// Opening goals appended against specific opponent factions.
    pub opening_vs: HashMap<FactionId, Vec<GoalTarget>>,
}

/// Borrowed per-tick context shared by the controllers.
pub struct TickCtx<'a> {
    /// Type definitions.
    pub catalog: &'a TypeCatalog,
    /// Type bindings.
    pub doctrine: &'a Doctrine,
    /// Tunables.
    pub cfg: &'a BotConfig,
    /// Current tick.
    pub now: Tick,
}
