//! Per-entity production dispatch.
//!
//! Stateless mappings from one observation to one command, evaluated
//! once per controlled entity per tick against the shared goal queue
//! and the tick's running balance. Workers follow a fixed priority
//! order; depots, extractors, and war structures each have a single
//! standing concern.

use std::collections::HashMap;

use crate::config::TickCtx;
use crate::engine::{Engine, EntityId, EntityType, Order, Placer, Tick, UnitView};
use crate::error::{CommandError, CommandResult};
use crate::goals::{GoalQueue, GoalTarget};
use crate::ledger::RunningBalance;
use crate::math::TilePos;

/// Per-tick population facts shared by the dispatchers.
#[derive(Debug, Clone, Copy, Default)]
pub struct Census {
    /// Owned worker-class units.
    pub workers: u32,
    /// Supply providers the ledger wants started immediately.
    pub supply_needed: u32,
}

/// Harvesters tracked against one extractor.
#[derive(Debug, Clone, Default)]
struct ExtractorBook {
    workers: Vec<EntityId>,
    next_check: Tick,
}

/// Mutable dispatcher state that survives across ticks.
#[derive(Debug, Clone, Default)]
pub struct DispatchState {
    /// Tick of the most recent accepted structure order; spaces out
    /// build orders so one queued structure is not doubled by the next
    /// worker evaluated.
    pub last_structure_order: Tick,
    /// Next tick the depot checks for an open geyser.
    pub refinery_check_at: Tick,
    /// Next tick the depot scans for ground threats.
    pub threat_scan_at: Tick,
    extractors: HashMap<EntityId, ExtractorBook>,
}

impl DispatchState {
    /// Create fresh dispatcher state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop books whose extractor no longer exists.
    pub fn prune<E: Engine>(&mut self, engine: &E) {
        self.extractors.retain(|id, _| engine.view(*id).is_some());
    }
}

/// Resolve a build site and issue the build order.
fn try_build<E: Engine + Placer>(
    engine: &mut E,
    worker: EntityId,
    structure: crate::catalog::StructureTypeId,
    near: TilePos,
) -> CommandResult {
    let Some(site) = engine.build_location_near(near, structure) else {
        return Err(CommandError::InvalidPlacement);
    };
    engine.order_build(worker, structure, site)
}

/// Issue the highest-priority order available for one worker.
///
/// Priorities, from highest to lowest:
/// - build a supply provider when the ledger says one is needed
/// - service an under-construction goal that lost its builder
/// - start the front pending structure goal
/// - harvest
///
/// Scout duty outranks all of these but is handled by the scouting
/// controller before dispatch runs; the active scout never reaches
/// this function. Returns true when an order was issued.
pub fn evaluate_worker<E: Engine + Placer>(
    ctx: &TickCtx<'_>,
    census: &Census,
    state: &mut DispatchState,
    goals: &mut GoalQueue,
    engine: &mut E,
    balance: &mut RunningBalance,
    worker: &UnitView,
) -> bool {
    if supply_provider_wanted(ctx, census, state, engine, balance, worker) {
        return true;
    }
    if service_stalled_goal(ctx, goals, engine, worker) {
        return true;
    }
    if start_front_goal(ctx, state, goals, engine, balance, worker) {
        return true;
    }
    harvest(engine, worker)
}

fn supply_provider_wanted<E: Engine + Placer>(
    ctx: &TickCtx<'_>,
    census: &Census,
    state: &mut DispatchState,
    engine: &mut E,
    balance: &mut RunningBalance,
    worker: &UnitView,
) -> bool {
    if census.supply_needed == 0 {
        return false;
    }
    // One structure order per spacing window, or every worker
    // evaluated this tick queues its own depot.
    if ctx.now <= state.last_structure_order + ctx.cfg.structure_order_spacing {
        return false;
    }
    if worker.is_attacking() || !worker.is_interruptible() {
        return false;
    }
    let Some(spec) = ctx.catalog.structure(ctx.doctrine.supply_structure) else {
        return false;
    };
    if !balance.covers(spec.cost) {
        return false;
    }
    match try_build(
        engine,
        worker.id,
        ctx.doctrine.supply_structure,
        worker.position.to_tile(),
    ) {
        Ok(()) => {
            balance.debit(spec.cost);
            state.last_structure_order = ctx.now;
            tracing::info!(worker = worker.id.0, "building supply provider");
            true
        }
        Err(err) => {
            tracing::debug!(worker = worker.id.0, %err, "supply provider order rejected");
            false
        }
    }
}

/// Reassign this worker to an under-construction goal whose builder
/// vanished while the physical structure survived.
fn service_stalled_goal<E: Engine>(
    ctx: &TickCtx<'_>,
    goals: &mut GoalQueue,
    engine: &mut E,
    worker: &UnitView,
) -> bool {
    if !worker.is_interruptible() {
        return false;
    }
    for goal in goals.building_mut() {
        if goal.assignee.is_some() {
            continue;
        }
        let Some(structure) = goal.structure else {
            continue;
        };
        let Some(site) = engine.view(structure) else {
            continue;
        };
        if site.completed {
            continue;
        }
        match engine.order_resume_build(worker.id, structure) {
            Ok(()) => {
                goal.assignee = Some(worker.id);
                goal.grace_until = ctx.now + ctx.cfg.goal_grace;
                tracing::info!(
                    worker = worker.id.0,
                    structure = structure.0,
                    "replacement builder assigned"
                );
                return true;
            }
            Err(err) => {
                tracing::debug!(worker = worker.id.0, %err, "resume order rejected");
            }
        }
    }
    false
}

/// Start the front pending goal when it is a worker-built structure
/// this worker can afford and place.
fn start_front_goal<E: Engine + Placer>(
    ctx: &TickCtx<'_>,
    state: &mut DispatchState,
    goals: &mut GoalQueue,
    engine: &mut E,
    balance: &mut RunningBalance,
    worker: &UnitView,
) -> bool {
    let spacing = ctx.cfg.structure_order_spacing + ctx.cfg.goal_order_spacing;
    if ctx.now <= state.last_structure_order + spacing {
        return false;
    }
    if !worker.is_interruptible() {
        return false;
    }
    let Some(front) = goals.front() else {
        return false;
    };
    let GoalTarget::Structure(st) = front.target else {
        return false;
    };
    let Some(spec) = ctx.catalog.structure(st) else {
        return false;
    };
    // Attachments are raised by their parent, not by workers.
    if spec.attached_to.is_some() {
        return false;
    }
    if !balance.covers(spec.cost) {
        return false;
    }
    match try_build(engine, worker.id, st, worker.position.to_tile()) {
        Ok(()) => {
            balance.debit(spec.cost);
            state.last_structure_order = ctx.now;
            goals.commit_front(worker.id, ctx.now + ctx.cfg.goal_grace);
            tracing::info!(worker = worker.id.0, structure = ?st, "goal construction started");
            true
        }
        Err(err) => {
            // Left at the front for retry next tick.
            tracing::debug!(worker = worker.id.0, structure = ?st, %err, "goal build rejected");
            false
        }
    }
}

fn harvest<E: Engine>(engine: &mut E, worker: &UnitView) -> bool {
    if !worker.idle {
        return false;
    }
    if worker.carrying {
        if let Err(err) = engine.order_return_cargo(worker.id) {
            tracing::debug!(worker = worker.id.0, %err, "cannot return cargo");
            return false;
        }
        return true;
    }
    let Some(node) = engine.closest_mineral_node(worker.id) else {
        return false;
    };
    match engine.order_gather(worker.id, node) {
        Ok(()) => true,
        Err(err) => {
            tracing::debug!(worker = worker.id.0, %err, "worker cannot harvest");
            false
        }
    }
}

/// Standing depot concerns: extractor opportunism, threat repel, and
/// worker training up to the cap.
pub fn evaluate_depot<E: Engine>(
    ctx: &TickCtx<'_>,
    census: &Census,
    state: &mut DispatchState,
    engine: &mut E,
    balance: &mut RunningBalance,
    depot: &UnitView,
) -> bool {
    maybe_start_extractor(ctx, census, state, engine, balance, depot);
    maybe_repel_threats(ctx, state, engine, depot);

    if census.workers < ctx.cfg.worker_cap && depot.idle {
        if let Some(spec) = ctx.catalog.unit(ctx.doctrine.worker) {
            if balance.covers(spec.cost) {
                match engine.order_train(depot.id, ctx.doctrine.worker) {
                    Ok(()) => {
                        balance.debit(spec.cost);
                        return true;
                    }
                    Err(err) => {
                        tracing::debug!(depot = depot.id.0, %err, "cannot train worker");
                    }
                }
            }
        }
    }
    false
}

/// Claim a nearby open geyser once the worker count justifies gas.
fn maybe_start_extractor<E: Engine>(
    ctx: &TickCtx<'_>,
    census: &Census,
    state: &mut DispatchState,
    engine: &mut E,
    balance: &mut RunningBalance,
    depot: &UnitView,
) {
    if ctx.now < state.refinery_check_at || census.workers <= ctx.cfg.gas_worker_threshold {
        return;
    }
    let Some(geyser) = engine.closest_geyser(depot.id) else {
        return;
    };
    let Some(geyser_view) = engine.view(geyser) else {
        return;
    };
    // An open geyser in proximity means the nearest geyser is closer
    // than the nearest extractor we own (or we own none).
    let geyser_dist = depot.position.distance_squared(geyser_view.position);
    let extractor_closer = engine
        .closest_own_extractor(depot.id)
        .and_then(|id| engine.view(id))
        .is_some_and(|r| depot.position.distance_squared(r.position) <= geyser_dist);
    if extractor_closer {
        return;
    }
    let Some(spec) = ctx.catalog.structure(ctx.doctrine.extractor) else {
        return;
    };
    if !balance.covers(spec.cost) {
        return;
    }
    let Some(builder) = engine.owned().into_iter().find(|&id| {
        engine.view(id).is_some_and(|v| {
            v.entity_type == EntityType::Unit(ctx.doctrine.worker)
                && v.is_operable()
                && v.is_interruptible()
        })
    }) else {
        return;
    };
    // Give construction time to start before checking this geyser
    // again, whether or not the order goes through.
    state.refinery_check_at = ctx.now + ctx.cfg.refinery_check_interval;
    match engine.order_build(builder, ctx.doctrine.extractor, geyser_view.position.to_tile()) {
        Ok(()) => {
            balance.debit(spec.cost);
            tracing::info!(worker = builder.0, "claiming geyser");
        }
        Err(err) => {
            tracing::debug!(worker = builder.0, %err, "extractor order rejected");
        }
    }
}

/// Periodically throw nearby idle or harvesting workers at ground
/// threats close to the depot.
fn maybe_repel_threats<E: Engine>(
    ctx: &TickCtx<'_>,
    state: &mut DispatchState,
    engine: &mut E,
    depot: &UnitView,
) {
    if ctx.now < state.threat_scan_at {
        return;
    }
    state.threat_scan_at = ctx.now + ctx.cfg.threat_scan_interval;
    let threats = engine.enemies_near(depot.position, ctx.cfg.threat_radius);
    let Some(&threat) = threats.first() else {
        return;
    };
    let defenders: Vec<EntityId> = engine
        .owned_near(depot.position, ctx.cfg.threat_radius)
        .into_iter()
        .filter(|&id| {
            engine.view(id).is_some_and(|v| {
                v.entity_type == EntityType::Unit(ctx.doctrine.worker)
                    && v.is_operable()
                    && v.is_interruptible()
            })
        })
        .collect();
    if defenders.is_empty() {
        return;
    }
    tracing::warn!(count = defenders.len(), "workers repelling threat at depot");
    for id in defenders {
        if let Err(err) = engine.order_attack(id, threat) {
            tracing::debug!(worker = id.0, %err, "repel order rejected");
        }
    }
}

/// Keep an extractor staffed with up to the configured number of
/// harvesters, reconciling the tracked list against live gathering
/// state once per its own deadline.
pub fn evaluate_extractor<E: Engine>(
    ctx: &TickCtx<'_>,
    census: &Census,
    state: &mut DispatchState,
    engine: &mut E,
    extractor: &UnitView,
) -> bool {
    let book = state.extractors.entry(extractor.id).or_default();
    if ctx.now < book.next_check {
        return false;
    }

    // Drop harvesters observed no longer gathering from us.
    let extractor_id = extractor.id;
    book.workers.retain(|&w| {
        engine
            .view(w)
            .is_some_and(|v| v.gathering_gas && v.order == Order::Gather(extractor_id))
    });

    for id in engine.owned_near(extractor.position, ctx.cfg.extractor_scan_radius) {
        let Some(view) = engine.view(id) else {
            continue;
        };
        if view.entity_type != EntityType::Unit(ctx.doctrine.worker) {
            continue;
        }

        let gathering_here = view.gathering_gas && view.order == Order::Gather(extractor_id);
        if gathering_here && !book.workers.contains(&id) {
            if book.workers.len() < ctx.cfg.extractor_harvesters {
                // Rebuilt from live observation (e.g. after restart).
                book.workers.push(id);
            } else if let Err(err) = engine.order_stop(id) {
                tracing::debug!(worker = id.0, %err, "cannot stop surplus harvester");
            }
            continue;
        }

        if book.workers.len() < ctx.cfg.extractor_harvesters
            && (view.idle || view.gathering_minerals)
            && census.workers > ctx.cfg.gas_worker_threshold
        {
            match engine.order_gather(id, extractor_id) {
                Ok(()) => book.workers.push(id),
                Err(err) => {
                    tracing::debug!(worker = id.0, %err, "gas assignment rejected");
                }
            }
        }
    }

    // Let the new orders settle before reevaluating; also avoids
    // ordering all three harvesters in simultaneously.
    book.next_check = ctx.now + ctx.cfg.extractor_recheck;
    true
}

/// Train from an idle war structure: first unit in its catalog list
/// that is affordable and whose attachment requirement is met.
pub fn evaluate_war_structure<E: Engine>(
    ctx: &TickCtx<'_>,
    engine: &mut E,
    balance: &mut RunningBalance,
    structure: &UnitView,
) -> bool {
    if !structure.idle {
        return false;
    }
    let EntityType::Structure(st) = structure.entity_type else {
        return false;
    };
    let Some(spec) = ctx.catalog.structure(st) else {
        return false;
    };
    for &unit_type in &spec.trains {
        let Some(unit_spec) = ctx.catalog.unit(unit_type) else {
            continue;
        };
        if unit_spec.requires_attachment {
            let attached = structure
                .attachment
                .and_then(|a| engine.view(a))
                .is_some_and(|a| a.completed);
            if !attached {
                continue;
            }
        }
        if !balance.covers(unit_spec.cost) {
            continue;
        }
        match engine.order_train(structure.id, unit_type) {
            Ok(()) => {
                balance.debit(unit_spec.cost);
                return true;
            }
            Err(err) => {
                tracing::debug!(structure = structure.id.0, %err, "cannot train unit");
                return false;
            }
        }
    }
    false
}
