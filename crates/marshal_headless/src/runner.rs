//! Frame loop and run summary.

use serde::{Deserialize, Serialize};

use marshal_core::bot::Bot;
use marshal_core::config::BotConfig;
use marshal_core::engine::Tick;

use crate::faction;
use crate::scenario::Scenario;
use crate::sim::SimWorld;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Every hostile entity was destroyed.
    EnemyEliminated,
    /// We lost every entity.
    Eliminated,
    /// The frame budget ran out first.
    TimeLimit,
}

/// Machine-readable result of one scenario run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Scenario name.
    pub scenario: String,
    /// Frames simulated.
    pub frames: Tick,
    /// How the run ended.
    pub outcome: Outcome,
    /// Units we finished training.
    pub units_trained: u32,
    /// Structures we finished raising.
    pub structures_completed: u32,
    /// Techs we finished researching.
    pub techs_completed: u32,
    /// Enemy entities destroyed.
    pub enemy_losses: u32,
    /// Own entities lost.
    pub own_losses: u32,
    /// Goals still waiting at the end.
    pub goals_pending: usize,
    /// Goals still under construction at the end.
    pub goals_building: usize,
    /// Tactic in force on the final frame.
    pub final_tactic: String,
}

/// Run one scenario to completion.
#[must_use]
pub fn run(scenario: &Scenario, cfg: BotConfig) -> RunSummary {
    let mut bot = Bot::new(faction::catalog(), faction::doctrine(), cfg);
    let mut world = SimWorld::from_scenario(scenario);

    let mut frames = 0;
    let outcome = loop {
        if frames >= scenario.max_frames {
            break Outcome::TimeLimit;
        }
        world.tick();
        let ledger = world.ledger();
        bot.on_frame(&mut world, &ledger);
        frames += 1;

        if world.enemy_eliminated() {
            break Outcome::EnemyEliminated;
        }
        if world.we_are_eliminated() {
            break Outcome::Eliminated;
        }
    };

    let stats = world.stats;
    tracing::info!(
        ?outcome,
        frames,
        units = stats.units_trained,
        structures = stats.structures_completed,
        "run finished"
    );

    RunSummary {
        scenario: scenario.name.clone(),
        frames,
        outcome,
        units_trained: stats.units_trained,
        structures_completed: stats.structures_completed,
        techs_completed: stats.techs_completed,
        enemy_losses: stats.enemy_losses,
        own_losses: stats.own_losses,
        goals_pending: bot.goals().pending().len(),
        goals_building: bot.goals().building().len(),
        final_tactic: format!("{:?}", bot.military().tactic()),
    }
}

/// Convenience predicate for smoke assertions.
#[must_use]
pub fn made_progress(summary: &RunSummary) -> bool {
    summary.units_trained > 0 || summary.structures_completed > 0
}
