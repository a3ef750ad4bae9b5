//! The bot context: all decision-layer state, advanced one frame at a
//! time.
//!
//! [`Bot`] owns the goal queue, the military and scouting controllers,
//! and the dispatcher state; nothing lives in globals. Each decision
//! tick runs the fixed pipeline: ledger snapshot, goal reconciliation,
//! military pass, scouting pass, then per-entity dispatch - all
//! against one running balance so no two entities spend the same
//! surplus.

use crate::catalog::TypeCatalog;
use crate::config::{BotConfig, Doctrine, TickCtx};
use crate::dispatch::{self, Census, DispatchState};
use crate::engine::{Engine, EntityType, Order, Placer};
use crate::goals::{GoalQueue, ReconcileCtx};
use crate::ledger::{Ledger, RunningBalance};
use crate::military::MilitaryController;
use crate::scout::ScoutController;

/// Top-level decision-layer state for one controlled faction.
#[derive(Debug)]
pub struct Bot {
    catalog: TypeCatalog,
    doctrine: Doctrine,
    cfg: BotConfig,
    goals: GoalQueue,
    military: MilitaryController,
    scout: ScoutController,
    dispatch: DispatchState,
}

impl Bot {
    /// Create a bot for the given catalog and doctrine.
    #[must_use]
    pub fn new(catalog: TypeCatalog, doctrine: Doctrine, cfg: BotConfig) -> Self {
        Self {
            catalog,
            doctrine,
            cfg,
            goals: GoalQueue::new(),
            military: MilitaryController::new(),
            scout: ScoutController::new(),
            dispatch: DispatchState::new(),
        }
    }

    /// The goal queue.
    #[must_use]
    pub fn goals(&self) -> &GoalQueue {
        &self.goals
    }

    /// Mutable goal queue, for seeding build orders at startup.
    pub fn goals_mut(&mut self) -> &mut GoalQueue {
        &mut self.goals
    }

    /// The military controller.
    #[must_use]
    pub fn military(&self) -> &MilitaryController {
        &self.military
    }

    /// The scouting controller.
    #[must_use]
    pub fn scout(&self) -> &ScoutController {
        &self.scout
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &BotConfig {
        &self.cfg
    }

    /// The active doctrine.
    #[must_use]
    pub fn doctrine(&self) -> &Doctrine {
        &self.doctrine
    }

    /// Advance the decision layer by one engine frame.
    ///
    /// Self-throttles to one decision tick per configured interval so
    /// orders issued on the previous tick have taken observable effect
    /// before logic is re-evaluated.
    pub fn on_frame<E: Engine + Placer, L: Ledger>(&mut self, engine: &mut E, ledger: &L) {
        let now = engine.now();
        if now % self.cfg.decision_interval != 0 {
            return;
        }

        let Self {
            ref catalog,
            ref doctrine,
            ref cfg,
            ref mut goals,
            ref mut military,
            ref mut scout,
            ref mut dispatch,
        } = *self;

        dispatch.prune(engine);

        // Data pass: population facts gathered before any orders go
        // out.
        let owned = engine.owned();
        let mut workers = 0u32;
        let mut supply_enqueued = 0u32;
        for &id in &owned {
            let Some(view) = engine.view(id) else {
                continue;
            };
            if view.entity_type != EntityType::Unit(doctrine.worker) {
                continue;
            }
            workers += 1;
            if matches!(view.order, Order::Construct { structure, .. } if structure == doctrine.supply_structure)
            {
                supply_enqueued += 1;
            }
        }
        let census = Census {
            workers,
            supply_needed: ledger.supply_providers_needed(supply_enqueued),
        };

        // One snapshot per tick; every affordability decision below
        // debits this balance.
        let mut balance = RunningBalance::new(ledger.unallocated());

        let rctx = ReconcileCtx {
            catalog,
            faction: doctrine.faction,
            now,
            grace_period: cfg.goal_grace,
            surplus_threshold: cfg.surplus_threshold,
            surplus_structure: doctrine.surplus_structure,
        };
        goals.evaluate(&rctx, engine, &mut balance);

        let ctx = TickCtx {
            catalog,
            doctrine,
            cfg,
            now,
        };
        military.tick(&ctx, engine, goals);
        scout.update(&ctx, engine, military, goals, workers);

        // Order pass: one evaluation per controlled entity.
        for id in owned {
            let Some(view) = engine.view(id) else {
                continue;
            };
            if !view.is_operable() {
                continue;
            }
            // Scout duty outranks every worker priority.
            if scout.scout() == Some(id) {
                continue;
            }
            match view.entity_type {
                EntityType::Unit(ut) if ut == doctrine.worker => {
                    dispatch::evaluate_worker(
                        &ctx,
                        &census,
                        dispatch,
                        goals,
                        engine,
                        &mut balance,
                        &view,
                    );
                }
                // Combat units take orders from the military pass.
                EntityType::Unit(_) => {}
                EntityType::Structure(st) => {
                    let Some(spec) = catalog.structure(st) else {
                        continue;
                    };
                    if spec.is_depot {
                        dispatch::evaluate_depot(
                            &ctx,
                            &census,
                            dispatch,
                            engine,
                            &mut balance,
                            &view,
                        );
                    } else if spec.is_extractor {
                        dispatch::evaluate_extractor(&ctx, &census, dispatch, engine, &view);
                    } else if !spec.trains.is_empty() {
                        dispatch::evaluate_war_structure(&ctx, engine, &mut balance, &view);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marshal_test_utils::fake_engine::{FakeEngine, FakeUnit, IssuedCommand};
    use marshal_test_utils::fixtures::{
        demo_bot, COMMAND_POST, FABRICATOR, MUSTER_YARD, TROOPER,
    };

    use crate::goals::GoalTarget;
    use crate::ledger::Resources;

    #[test]
    fn test_off_interval_frames_are_skipped() {
        let mut bot = demo_bot();
        let mut engine = FakeEngine::new();
        engine.spawn(FakeUnit::structure(COMMAND_POST).at(2, 2));
        engine.set_resources(Resources::minerals(500));

        let ledger = engine.ledger();
        engine.set_now(3); // not a decision tick
        bot.on_frame(&mut engine, &ledger);
        assert!(engine.commands().is_empty());

        engine.set_now(8);
        bot.on_frame(&mut engine, &ledger);
        // The depot trains a worker on the decision tick.
        assert!(matches!(
            engine.commands().last(),
            Some(IssuedCommand::Train { .. })
        ));
    }

    #[test]
    fn test_scout_exempt_from_worker_dispatch() {
        let mut bot = demo_bot();
        let mut engine = FakeEngine::new();
        engine.spawn(FakeUnit::structure(COMMAND_POST).at(5, 5));
        engine.mark_explored(crate::math::TilePos::new(5, 5));
        let worker = engine.spawn(FakeUnit::unit(FABRICATOR).at(6, 5));
        engine.spawn_mineral_node(8, 5);
        // Enough workers on paper to trigger scouting.
        for i in 0..14 {
            engine.spawn(FakeUnit::unit(FABRICATOR).at(10 + i, 20));
        }

        let ledger = engine.ledger();
        engine.set_now(8);
        bot.on_frame(&mut engine, &ledger);

        let scout = bot.scout().scout().expect("scout assigned");
        assert_eq!(scout, worker);
        // The scout was sent to a start location, not to the mineral
        // line.
        let gathered_by_scout = engine
            .commands()
            .iter()
            .any(|c| matches!(c, IssuedCommand::Gather { unit, .. } if *unit == scout));
        assert!(!gathered_by_scout);
    }

    #[test]
    fn test_frame_pipeline_starts_seeded_goal() {
        let mut bot = demo_bot();
        let mut engine = FakeEngine::new();
        engine.spawn(FakeUnit::structure(COMMAND_POST).at(2, 2));
        engine.spawn(FakeUnit::unit(FABRICATOR).at(5, 5));
        engine.set_resources(Resources::new(1000, 0));

        let catalog = marshal_test_utils::fixtures::demo_catalog();
        bot.goals_mut()
            .add_goal(
                &catalog,
                marshal_test_utils::fixtures::FACTION,
                GoalTarget::Structure(MUSTER_YARD),
                false,
                1,
            )
            .unwrap();

        let ledger = engine.ledger();
        engine.set_now(64);
        bot.on_frame(&mut engine, &ledger);

        assert!(bot.goals().pending().is_empty());
        assert_eq!(bot.goals().building().len(), 1);
        assert!(engine
            .commands()
            .iter()
            .any(|c| matches!(c, IssuedCommand::Build { structure, .. } if *structure == MUSTER_YARD)));
    }

    #[test]
    fn test_combat_units_left_to_military() {
        let mut bot = demo_bot();
        let mut engine = FakeEngine::new();
        engine.spawn(FakeUnit::structure(COMMAND_POST).at(2, 2));
        engine.spawn(FakeUnit::unit(TROOPER).at(5, 5));
        engine.spawn_mineral_node(8, 5);

        let ledger = engine.ledger();
        engine.set_now(8);
        bot.on_frame(&mut engine, &ledger);

        // The trooper was never ordered to gather.
        assert!(!engine
            .commands()
            .iter()
            .any(|c| matches!(c, IssuedCommand::Gather { .. })));
    }
}
