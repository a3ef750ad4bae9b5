//! Scouting controller.
//!
//! While the opponent's base is unknown and the worker count allows
//! it, exactly one worker is drafted as scout and driven through the
//! unexplored start locations. The role ends when a hostile depot
//! becomes visible (the location is reported to the military
//! controller) or when every start location has been explored; either
//! way the scout is released exactly once and returns to the depot.

use crate::config::TickCtx;
use crate::engine::{Engine, EntityId, EntityType, Order};
use crate::goals::GoalQueue;
use crate::military::MilitaryController;

/// Drives one worker through the unexplored start locations.
#[derive(Debug, Clone, Default)]
pub struct ScoutController {
    scout: Option<EntityId>,
    visited: Vec<bool>,
    exhausted: bool,
}

impl ScoutController {
    /// Create an inactive controller.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently assigned scout, if any.
    #[must_use]
    pub const fn scout(&self) -> Option<EntityId> {
        self.scout
    }

    /// True once every declared start location has been explored
    /// without ever sighting a hostile depot.
    #[must_use]
    pub const fn explored_all_start_locations(&self) -> bool {
        self.exhausted
    }

    /// One scouting pass for this decision tick.
    pub fn update<E: Engine>(
        &mut self,
        ctx: &TickCtx<'_>,
        engine: &mut E,
        military: &mut MilitaryController,
        goals: &mut GoalQueue,
        worker_count: u32,
    ) {
        let start_locations = engine.map().start_locations.clone();
        if self.visited.len() != start_locations.len() {
            self.visited.resize(start_locations.len(), false);
        }

        // A dead scout frees the role for reassignment.
        if self.scout.is_some_and(|s| engine.view(s).is_none()) {
            self.scout = None;
        }

        if military.enemy_base().is_some() {
            self.release(ctx, engine);
            return;
        }

        // Opponent located: report for immediate threat assessment,
        // then stand down.
        let hostile_depot = engine.visible_enemies().into_iter().find_map(|id| {
            engine.view(id).filter(|v| {
                v.entity_type
                    .as_structure()
                    .and_then(|st| ctx.catalog.structure(st))
                    .is_some_and(|s| s.is_depot)
            })
        });
        if let Some(depot) = hostile_depot {
            military.evaluate_scouting_report(ctx, goals, depot.position);
            self.release(ctx, engine);
            return;
        }

        if self.exhausted {
            return;
        }

        for (i, loc) in start_locations.iter().enumerate() {
            if engine.is_explored(*loc) {
                self.visited[i] = true;
            }
        }
        if !self.visited.is_empty() && self.visited.iter().all(|v| *v) {
            self.exhausted = true;
            tracing::info!("all start locations explored, enemy base not sighted");
            self.release(ctx, engine);
            return;
        }

        if worker_count < ctx.cfg.scout_worker_threshold {
            return;
        }

        // Draft one worker; an existing scout is never preempted.
        if self.scout.is_none() {
            self.scout = engine.owned().into_iter().find(|&id| {
                engine.view(id).is_some_and(|v| {
                    v.entity_type == EntityType::Unit(ctx.doctrine.worker)
                        && v.is_operable()
                        && v.is_interruptible()
                })
            });
            if let Some(scout) = self.scout {
                tracing::info!(scout = scout.0, "scout assigned");
            }
        }
        let Some(scout) = self.scout else {
            return;
        };
        let Some(view) = engine.view(scout) else {
            return;
        };

        // Next objective: the nearest unvisited start location, ties
        // broken by lowest index.
        let objective = start_locations
            .iter()
            .enumerate()
            .filter(|(i, _)| !self.visited[*i])
            .min_by_key(|(i, loc)| (view.position.distance_squared(loc.center()), *i))
            .map(|(_, loc)| loc.center());
        if let Some(dest) = objective {
            // Re-issue only when not already en route.
            let en_route = matches!(view.order, Order::Move(p) if p == dest);
            if !en_route {
                if let Err(err) = engine.order_move(scout, dest) {
                    tracing::debug!(scout = scout.0, %err, "scout move rejected");
                }
            }
        }
    }

    /// Free the scout from the role, sending it back toward the
    /// primary depot. Taking the handle makes this a one-shot.
    fn release<E: Engine>(&mut self, ctx: &TickCtx<'_>, engine: &mut E) {
        let Some(scout) = self.scout.take() else {
            return;
        };
        let home = engine.owned().into_iter().find_map(|id| {
            engine.view(id).filter(|v| {
                v.entity_type
                    .as_structure()
                    .and_then(|st| ctx.catalog.structure(st))
                    .is_some_and(|s| s.is_depot)
            })
        });
        if let Some(depot) = home {
            if let Err(err) = engine.order_move(scout, depot.position) {
                tracing::debug!(scout = scout.0, %err, "scout recall rejected");
            }
        }
        tracing::info!(scout = scout.0, "scout released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marshal_test_utils::fake_engine::{FakeEngine, FakeUnit, IssuedCommand};
    use marshal_test_utils::fixtures::{
        demo_catalog, demo_config, demo_doctrine, COMMAND_POST, ENEMY_HQ, FABRICATOR,
    };

    use crate::catalog::TypeCatalog;
    use crate::config::{BotConfig, Doctrine};
    use crate::engine::Tick;
    use crate::math::TilePos;

    struct Fixture {
        catalog: TypeCatalog,
        doctrine: Doctrine,
        cfg: BotConfig,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                catalog: demo_catalog(),
                doctrine: demo_doctrine(),
                cfg: demo_config(),
            }
        }

        fn ctx(&self, now: Tick) -> TickCtx<'_> {
            TickCtx {
                catalog: &self.catalog,
                doctrine: &self.doctrine,
                cfg: &self.cfg,
                now,
            }
        }
    }

    /// Map with four declared start locations; ours is the first.
    fn scouting_engine() -> FakeEngine {
        let mut engine = FakeEngine::with_start_locations(vec![
            TilePos::new(5, 5),
            TilePos::new(55, 5),
            TilePos::new(5, 55),
            TilePos::new(55, 55),
        ]);
        engine.mark_explored(TilePos::new(5, 5));
        engine.spawn(FakeUnit::structure(COMMAND_POST).at(5, 5));
        engine
    }

    #[test]
    fn test_no_scout_below_worker_threshold() {
        let fx = Fixture::new();
        let mut engine = scouting_engine();
        engine.spawn(FakeUnit::unit(FABRICATOR).at(6, 5));

        let mut scout = ScoutController::new();
        let mut military = MilitaryController::new();
        let mut goals = GoalQueue::new();
        scout.update(&fx.ctx(10), &mut engine, &mut military, &mut goals, 5);
        assert!(scout.scout().is_none());
    }

    #[test]
    fn test_scout_assigned_and_sent_to_nearest_unexplored() {
        let fx = Fixture::new();
        let mut engine = scouting_engine();
        let worker = engine.spawn(FakeUnit::unit(FABRICATOR).at(6, 5));

        let mut scout = ScoutController::new();
        let mut military = MilitaryController::new();
        let mut goals = GoalQueue::new();
        scout.update(&fx.ctx(10), &mut engine, &mut military, &mut goals, 14);

        assert_eq!(scout.scout(), Some(worker));
        // Nearest unexplored location to (6,5) is (55,5).
        assert!(matches!(
            engine.commands().last(),
            Some(IssuedCommand::Move { to, .. }) if to.to_tile() == TilePos::new(55, 5)
        ));
    }

    #[test]
    fn test_move_order_not_reissued_en_route() {
        let fx = Fixture::new();
        let mut engine = scouting_engine();
        engine.spawn(FakeUnit::unit(FABRICATOR).at(6, 5));

        let mut scout = ScoutController::new();
        let mut military = MilitaryController::new();
        let mut goals = GoalQueue::new();
        scout.update(&fx.ctx(10), &mut engine, &mut military, &mut goals, 14);
        let issued = engine.commands().len();
        scout.update(&fx.ctx(18), &mut engine, &mut military, &mut goals, 14);
        assert_eq!(engine.commands().len(), issued);
    }

    #[test]
    fn test_existing_scout_not_preempted() {
        let fx = Fixture::new();
        let mut engine = scouting_engine();
        let first = engine.spawn(FakeUnit::unit(FABRICATOR).at(6, 5));
        engine.spawn(FakeUnit::unit(FABRICATOR).at(7, 5));

        let mut scout = ScoutController::new();
        let mut military = MilitaryController::new();
        let mut goals = GoalQueue::new();
        scout.update(&fx.ctx(10), &mut engine, &mut military, &mut goals, 14);
        scout.update(&fx.ctx(18), &mut engine, &mut military, &mut goals, 14);
        assert_eq!(scout.scout(), Some(first));
    }

    #[test]
    fn test_dead_scout_replaced() {
        let fx = Fixture::new();
        let mut engine = scouting_engine();
        let first = engine.spawn(FakeUnit::unit(FABRICATOR).at(6, 5));
        let second = engine.spawn(FakeUnit::unit(FABRICATOR).at(7, 5));

        let mut scout = ScoutController::new();
        let mut military = MilitaryController::new();
        let mut goals = GoalQueue::new();
        scout.update(&fx.ctx(10), &mut engine, &mut military, &mut goals, 14);
        assert_eq!(scout.scout(), Some(first));

        engine.kill(first);
        scout.update(&fx.ctx(18), &mut engine, &mut military, &mut goals, 14);
        assert_eq!(scout.scout(), Some(second));
    }

    #[test]
    fn test_exploration_exhausted_releases_exactly_once() {
        let fx = Fixture::new();
        let mut engine = scouting_engine();
        engine.spawn(FakeUnit::unit(FABRICATOR).at(6, 5));

        let mut scout = ScoutController::new();
        let mut military = MilitaryController::new();
        let mut goals = GoalQueue::new();
        scout.update(&fx.ctx(10), &mut engine, &mut military, &mut goals, 14);
        assert!(scout.scout().is_some());

        // All four locations become explored; no hostile depot ever
        // seen.
        for loc in engine.map().start_locations.clone() {
            engine.mark_explored(loc);
        }
        engine.clear_commands();
        scout.update(&fx.ctx(18), &mut engine, &mut military, &mut goals, 14);

        assert!(scout.explored_all_start_locations());
        assert!(scout.scout().is_none());
        // Released exactly once: one recall order, none on repeat
        // passes.
        let recalls = engine
            .commands()
            .iter()
            .filter(|c| matches!(c, IssuedCommand::Move { .. }))
            .count();
        assert_eq!(recalls, 1);

        scout.update(&fx.ctx(26), &mut engine, &mut military, &mut goals, 14);
        let recalls = engine
            .commands()
            .iter()
            .filter(|c| matches!(c, IssuedCommand::Move { .. }))
            .count();
        assert_eq!(recalls, 1);
    }

    #[test]
    fn test_hostile_depot_sighting_reports_and_releases() {
        let fx = Fixture::new();
        let mut engine = scouting_engine();
        engine.spawn(FakeUnit::unit(FABRICATOR).at(6, 5));

        let mut scout = ScoutController::new();
        let mut military = MilitaryController::new();
        let mut goals = GoalQueue::new();
        scout.update(&fx.ctx(10), &mut engine, &mut military, &mut goals, 14);
        assert!(scout.scout().is_some());

        engine.spawn(FakeUnit::structure(ENEMY_HQ).at(55, 5).hostile());
        scout.update(&fx.ctx(18), &mut engine, &mut military, &mut goals, 14);

        assert_eq!(
            military.enemy_base(),
            Some(crate::math::Vec2Fixed::from_tiles(55, 5))
        );
        assert!(scout.scout().is_none());
        // With the base known the controller stays inactive.
        scout.update(&fx.ctx(26), &mut engine, &mut military, &mut goals, 14);
        assert!(scout.scout().is_none());
    }
}
