//! Military controller: roster, tactic selection, and the attack
//! sub-state machine.
//!
//! The controller re-selects its tactic every tick from army
//! composition; there is no transition table, whichever the evaluator
//! last computed wins the tick. Inside the Attack tactic an explicit
//! sub-state machine walks Searching, Gathering, Committed, and
//! Cooldown, each with one handler.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::TickCtx;
use crate::engine::{Engine, EntityId, EntityType, Order, Tick, UnitView};
use crate::goals::{GoalQueue, GoalTarget};
use crate::math::{centroid, Vec2Fixed};

/// One combat-capable entity under military control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    /// The tracked entity.
    pub unit: EntityId,
    /// Exempt from rally-point orders while allocated to a sub-task.
    pub reserved: bool,
    /// Garrison or transport this entry is assigned to enter.
    pub loader: Option<EntityId>,
}

impl RosterEntry {
    fn new(unit: EntityId) -> Self {
        Self {
            unit,
            reserved: false,
            loader: None,
        }
    }
}

/// Overall military posture, re-selected every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Tactic {
    /// No military activity.
    #[default]
    DoNothing,
    /// Hold the depot, keep garrisons full.
    Defend,
    /// Gather-then-commit attack protocol.
    Attack,
}

/// Sub-state of the Attack tactic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AttackState {
    /// No target known; idle entries hunt at scatter positions.
    #[default]
    Searching,
    /// Target acquired; the army converges on the rally point until
    /// quorum or the deadline.
    Gathering {
        /// Remembered target location.
        target: Vec2Fixed,
        /// Whether the target was a structure when acquired.
        target_is_structure: bool,
        /// Tick at which gathering commits regardless of quorum.
        deadline: Tick,
    },
    /// Quorum reached or deadline expired; the next evaluation orders
    /// the assault.
    Committed {
        /// Remembered target location.
        target: Vec2Fixed,
        /// Whether the target was a structure when acquired.
        target_is_structure: bool,
    },
    /// Assault under way; re-acquisition is suppressed until the
    /// deadline.
    Cooldown {
        /// Tick at which target re-acquisition is permitted again.
        until: Tick,
    },
}

/// Two-mode military state machine over the combat roster.
#[derive(Debug, Clone, Default)]
pub struct MilitaryController {
    roster: Vec<RosterEntry>,
    rally: Vec2Fixed,
    obey_rally: bool,
    tactic: Tactic,
    attack: AttackState,
    enemy_base: Option<Vec2Fixed>,
    /// Hostiles we have ever seen, remembered with the type they were
    /// sighted as; survives the entity leaving vision.
    sighted: HashMap<EntityId, EntityType>,
    opening_done: bool,
}

impl MilitaryController {
    /// Create an idle controller.
    #[must_use]
    pub fn new() -> Self {
        Self {
            obey_rally: true,
            ..Self::default()
        }
    }

    /// Current rally point.
    #[must_use]
    pub const fn rally(&self) -> Vec2Fixed {
        self.rally
    }

    /// Current tactic.
    #[must_use]
    pub const fn tactic(&self) -> Tactic {
        self.tactic
    }

    /// Current attack sub-state.
    #[must_use]
    pub const fn attack_state(&self) -> AttackState {
        self.attack
    }

    /// Located enemy base, if any.
    #[must_use]
    pub const fn enemy_base(&self) -> Option<Vec2Fixed> {
        self.enemy_base
    }

    /// Tracked combat entries.
    #[must_use]
    pub fn roster(&self) -> &[RosterEntry] {
        &self.roster
    }

    /// Full military pass for one decision tick: roster upkeep,
    /// readiness, tactic execution, rally movement, then strategy
    /// refinement.
    pub fn tick<E: Engine>(&mut self, ctx: &TickCtx<'_>, engine: &mut E, goals: &mut GoalQueue) {
        self.sync_roster(ctx, engine);
        self.index_sightings(engine);
        self.evaluate_readiness(ctx, engine);
        self.execute_tactic(ctx, engine);
        self.move_to_rally(ctx, engine);
        self.refine_strategy(ctx, engine, goals);
    }

    /// Garbage-collect dead entries, release reservations whose loader
    /// vanished, and admit newly completed combat units.
    fn sync_roster<E: Engine>(&mut self, ctx: &TickCtx<'_>, engine: &E) {
        self.roster.retain(|e| engine.view(e.unit).is_some());
        for entry in &mut self.roster {
            if let Some(loader) = entry.loader {
                if engine.view(loader).is_none() {
                    entry.loader = None;
                    entry.reserved = false;
                }
            }
        }

        for id in engine.owned() {
            let Some(view) = engine.view(id) else {
                continue;
            };
            let EntityType::Unit(unit_type) = view.entity_type else {
                continue;
            };
            let combat = ctx
                .catalog
                .unit(unit_type)
                .is_some_and(|spec| spec.is_combat);
            if !combat || !view.completed {
                continue;
            }
            if !self.roster.iter().any(|e| e.unit == id) {
                self.roster.push(RosterEntry::new(id));
            }
        }
    }

    fn index_sightings<E: Engine>(&mut self, engine: &E) {
        for id in engine.visible_enemies() {
            if let Some(view) = engine.view(id) {
                self.sighted.insert(id, view.entity_type);
            }
        }
    }

    /// Attack once enough siege-capable units exist, or while an
    /// attack is already in progress (no flapping back to Defend
    /// mid-execution); otherwise Defend.
    fn evaluate_readiness<E: Engine>(&mut self, ctx: &TickCtx<'_>, engine: &E) {
        let attack_in_progress = matches!(
            self.attack,
            AttackState::Committed { .. } | AttackState::Cooldown { .. }
        );
        let siege_count = engine
            .owned()
            .into_iter()
            .filter(|&id| {
                engine.view(id).is_some_and(|v| {
                    v.entity_type == EntityType::Unit(ctx.doctrine.siege_unit) && v.completed
                })
            })
            .count() as u32;

        self.tactic = if siege_count >= ctx.cfg.siege_threshold || attack_in_progress {
            Tactic::Attack
        } else {
            Tactic::Defend
        };
    }

    fn execute_tactic<E: Engine>(&mut self, ctx: &TickCtx<'_>, engine: &mut E) {
        match self.tactic {
            Tactic::DoNothing => {}
            Tactic::Defend => self.execute_defend(ctx, engine),
            Tactic::Attack => self.execute_attack(ctx, engine),
        }
    }

    /// Pin the rally to the primary depot, keep garrisons topped up,
    /// and snap the rally onto hostiles threatening the base.
    fn execute_defend<E: Engine>(&mut self, ctx: &TickCtx<'_>, engine: &mut E) {
        let depot = engine.owned().into_iter().find_map(|id| {
            engine.view(id).filter(|v| {
                v.completed
                    && v.entity_type
                        .as_structure()
                        .and_then(|st| ctx.catalog.structure(st))
                        .is_some_and(|s| s.is_depot)
            })
        });
        let Some(depot) = depot else {
            return;
        };
        self.rally = depot.position;
        self.obey_rally = true;

        self.garrison_pass(ctx, engine);

        // Reactive defense: hostiles near the depot pull the rally
        // onto them.
        let threats: Vec<Vec2Fixed> = engine
            .enemies_near(depot.position, ctx.cfg.defend_radius)
            .into_iter()
            .filter_map(|id| engine.view(id).map(|v| v.position))
            .collect();
        if !threats.is_empty() {
            self.rally = centroid(&threats);
        }
    }

    /// Top every completed garrison structure up to its capacity.
    ///
    /// The per-structure allocation count is checked before each new
    /// assignment, so reservations can never exceed capacity.
    fn garrison_pass<E: Engine>(&mut self, ctx: &TickCtx<'_>, engine: &mut E) {
        let garrisons: Vec<(EntityId, usize, u32)> = engine
            .owned()
            .into_iter()
            .filter_map(|id| {
                let view = engine.view(id)?;
                let st = view.entity_type.as_structure()?;
                let capacity = ctx.catalog.structure(st)?.garrison_capacity?;
                if view.completed {
                    Some((id, view.loaded.len(), capacity))
                } else {
                    None
                }
            })
            .collect();

        for (garrison, loaded, capacity) in garrisons {
            if loaded >= capacity as usize {
                continue;
            }
            let mut allocated = self
                .roster
                .iter()
                .filter(|e| e.loader == Some(garrison))
                .count() as u32;
            for entry in &mut self.roster {
                if allocated >= capacity {
                    break;
                }
                if entry.reserved {
                    continue;
                }
                let eligible = engine.view(entry.unit).is_some_and(|v| {
                    v.entity_type == EntityType::Unit(ctx.doctrine.garrison_unit)
                });
                if !eligible {
                    continue;
                }
                entry.reserved = true;
                entry.loader = Some(garrison);
                allocated += 1;
                if let Err(err) = engine.order_load(garrison, entry.unit) {
                    tracing::debug!(unit = entry.unit.0, %err, "load order rejected");
                }
            }

            // Re-issue for assigned entries that drifted off the load
            // order.
            for entry in &self.roster {
                if entry.loader != Some(garrison) {
                    continue;
                }
                let Some(view) = engine.view(entry.unit) else {
                    continue;
                };
                if !view.is_loaded && view.order != Order::EnterTransport(garrison) {
                    if let Err(err) = engine.order_load(garrison, entry.unit) {
                        tracing::debug!(unit = entry.unit.0, %err, "load re-issue rejected");
                    }
                }
            }
        }
    }

    /// One step of the attack sub-state machine, followed by the
    /// unconditional garrison cleanup.
    fn execute_attack<E: Engine>(&mut self, ctx: &TickCtx<'_>, engine: &mut E) {
        match self.attack {
            AttackState::Cooldown { until } => {
                if ctx.now >= until {
                    // Let the assault resolve: keep pressure on any
                    // hostile still standing, otherwise go hunting.
                    if let Some(target) = self.acquire_target(ctx, engine) {
                        self.rally = target.position;
                        self.obey_rally = true;
                    } else {
                        self.attack = AttackState::Searching;
                    }
                }
            }
            AttackState::Searching => {
                if let Some(target) = self.acquire_target(ctx, engine) {
                    let positions: Vec<Vec2Fixed> = self
                        .roster
                        .iter()
                        .filter_map(|e| engine.view(e.unit).map(|v| v.position))
                        .collect();
                    // Gather on the army's own centroid. The midpoint
                    // between centroid and target is the tunable
                    // alternative.
                    self.rally = centroid(&positions);
                    self.obey_rally = true;
                    self.attack = AttackState::Gathering {
                        target: target.position,
                        target_is_structure: target.is_structure(),
                        deadline: ctx.now + ctx.cfg.gathering_timeout,
                    };
                    tracing::info!(
                        structure = target.is_structure(),
                        "preparing attack against enemy"
                    );
                } else {
                    // Spread out and hunt; the rally point is not
                    // obeyed while searching.
                    self.obey_rally = false;
                    let hunters: Vec<EntityId> = self
                        .roster
                        .iter()
                        .filter(|e| !e.reserved)
                        .filter(|e| engine.view(e.unit).is_some_and(|v| v.idle))
                        .map(|e| e.unit)
                        .collect();
                    for unit in hunters {
                        let dest = engine.scatter_position();
                        if let Err(err) = engine.order_attack_move(unit, dest) {
                            tracing::debug!(unit = unit.0, %err, "hunt order rejected");
                        }
                    }
                }
            }
            AttackState::Gathering {
                target,
                target_is_structure,
                deadline,
            } => {
                // Commit on quorum or on timeout, whichever first; a
                // stalled gathering is tolerated, not an error.
                if self.quorum_met(ctx, engine) || ctx.now >= deadline {
                    self.attack = AttackState::Committed {
                        target,
                        target_is_structure,
                    };
                }
            }
            AttackState::Committed {
                target,
                target_is_structure,
            } => {
                for entry in &self.roster {
                    if let Err(err) = engine.order_attack_move(entry.unit, target) {
                        tracing::debug!(unit = entry.unit.0, %err, "attack order rejected");
                    }
                }
                self.rally = target;
                self.obey_rally = true;
                let cooldown = if target_is_structure {
                    ctx.cfg.cooldown_long
                } else {
                    ctx.cfg.cooldown_short
                };
                self.attack = AttackState::Cooldown {
                    until: ctx.now + cooldown,
                };
                tracing::info!(army = self.roster.len(), "attack launched");
            }
        }

        // Garrisoned entries fight in the open during an attack:
        // unload and release every bunker assignment, whatever
        // sub-state we are in.
        for entry in &mut self.roster {
            let Some(loader) = entry.loader else {
                continue;
            };
            let garrison_type = engine
                .view(loader)
                .and_then(|v| v.entity_type.as_structure())
                .and_then(|st| ctx.catalog.structure(st))
                .is_some_and(|s| s.garrison_capacity.is_some());
            if !garrison_type {
                continue;
            }
            let loaded = engine.view(entry.unit).is_some_and(|v| v.is_loaded);
            if loaded {
                if let Err(err) = engine.order_unload(loader, entry.unit) {
                    tracing::debug!(unit = entry.unit.0, %err, "unload rejected");
                }
            }
            entry.loader = None;
            entry.reserved = false;
        }
    }

    /// Scan visible hostiles in priority order: resource depot, then
    /// any other structure, then anything at all.
    fn acquire_target<E: Engine>(&self, ctx: &TickCtx<'_>, engine: &E) -> Option<UnitView> {
        let views: Vec<UnitView> = engine
            .visible_enemies()
            .into_iter()
            .filter_map(|id| engine.view(id))
            .collect();

        let is_depot = |v: &UnitView| {
            v.entity_type
                .as_structure()
                .and_then(|st| ctx.catalog.structure(st))
                .is_some_and(|s| s.is_depot)
        };
        views
            .iter()
            .find(|v| is_depot(v))
            .or_else(|| views.iter().find(|v| v.is_structure()))
            .or_else(|| views.first())
            .cloned()
    }

    /// Gathered when the entries within the gather radius of the rally
    /// reach the configured fraction of the roster; the boundary case
    /// counts as gathered.
    fn quorum_met<E: Engine>(&self, ctx: &TickCtx<'_>, engine: &E) -> bool {
        let total = self.roster.len() as u32;
        if total == 0 {
            return false;
        }
        let near = self
            .roster
            .iter()
            .filter(|e| {
                engine
                    .view(e.unit)
                    .is_some_and(|v| v.position.within(self.rally, ctx.cfg.gather_radius))
            })
            .count() as u32;
        let gathered = near * ctx.cfg.quorum_den >= total * ctx.cfg.quorum_num;
        if gathered {
            tracing::debug!(near, total, "army gathered at rally point");
        }
        gathered
    }

    /// Order unreserved entries that are neither en route to nor near
    /// the rally point to attack-move there.
    fn move_to_rally<E: Engine>(&self, ctx: &TickCtx<'_>, engine: &mut E) {
        if !self.obey_rally {
            return;
        }
        for entry in &self.roster {
            if entry.reserved {
                continue;
            }
            let Some(view) = engine.view(entry.unit) else {
                continue;
            };
            let en_route = match view.order {
                Order::Move(dest) | Order::AttackMove(dest) => {
                    dest.within(self.rally, ctx.cfg.rally_slack)
                }
                _ => false,
            };
            if en_route {
                continue;
            }
            if !view.position.within(self.rally, ctx.cfg.rally_near) || view.is_attacking() {
                if let Err(err) = engine.order_attack_move(entry.unit, self.rally) {
                    tracing::debug!(unit = entry.unit.0, %err, "rally order rejected");
                }
            }
        }
    }

    /// One-shot opening executed when the opponent's faction becomes
    /// known: append the doctrine's book for that faction plus the
    /// common tail.
    fn refine_strategy<E: Engine>(
        &mut self,
        ctx: &TickCtx<'_>,
        engine: &E,
        goals: &mut GoalQueue,
    ) {
        if self.opening_done {
            return;
        }
        let Some(opponent) = engine.opponent_faction() else {
            return;
        };
        self.opening_done = true;
        tracing::info!(opponent = opponent.0, "opponent faction identified");

        let book = ctx
            .doctrine
            .opening_vs
            .get(&opponent)
            .cloned()
            .unwrap_or_default();
        for target in book.iter().chain(ctx.doctrine.opening_common.iter()) {
            if let Err(err) =
                goals.add_goal(ctx.catalog, ctx.doctrine.faction, *target, false, 1)
            {
                tracing::debug!(goal = ?target, %err, "opening goal rejected");
            }
        }
    }

    /// Digest a scouting report: remember the enemy base, and read the
    /// sighting index for an early rush or a cloak tell, front-
    /// inserting the doctrine's responses.
    pub fn evaluate_scouting_report(
        &mut self,
        ctx: &TickCtx<'_>,
        goals: &mut GoalQueue,
        location: Vec2Fixed,
    ) {
        self.enemy_base = Some(location);
        tracing::info!("enemy base located");

        let combat_sighted = self
            .sighted
            .values()
            .filter(|t| match t {
                EntityType::Unit(ut) => {
                    ctx.catalog.unit(*ut).is_some_and(|spec| spec.is_combat)
                }
                EntityType::Structure(_) => false,
            })
            .count();
        if combat_sighted >= ctx.cfg.rush_threshold {
            tracing::warn!(combat_sighted, "early rush detected, hardening the base");
            let target = GoalTarget::Structure(ctx.doctrine.rush_response);
            if let Err(err) = goals.add_goal(ctx.catalog, ctx.doctrine.faction, target, true, 2) {
                tracing::debug!(%err, "rush response rejected");
            }
        }

        if let Some((tell, counter)) = ctx.doctrine.cloak_tell {
            let tell_seen = self
                .sighted
                .values()
                .any(|t| *t == EntityType::Structure(tell));
            if tell_seen {
                tracing::warn!("cloak tell sighted, adding detection");
                let target = GoalTarget::Structure(counter);
                if let Err(err) =
                    goals.add_goal(ctx.catalog, ctx.doctrine.faction, target, true, 2)
                {
                    tracing::debug!(%err, "detection response rejected");
                }
            }
        }
    }

    #[cfg(test)]
    fn set_attack_state(&mut self, state: AttackState) {
        self.attack = state;
    }

    #[cfg(test)]
    fn set_rally(&mut self, rally: Vec2Fixed) {
        self.rally = rally;
    }
}
