//! Production and research goal scheduling.
//!
//! A goal is a structure or tech we want when resources allow. Pending
//! goals form a FIFO queue with priority insertion at the front, used
//! for prerequisite injection and failure recovery. Goals whose action
//! has been issued move to the under-construction set, where each is
//! re-validated once its grace period elapses; a commitment whose
//! assignee and physical result are both gone is re-queued at the
//! front, never dropped.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::catalog::{FactionId, Requirement, StructureTypeId, TechId, TypeCatalog};
use crate::engine::{Engine, EntityId, EntityType, Order, Tick, UnitView};
use crate::error::GoalError;
use crate::ledger::RunningBalance;

/// What a goal asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GoalTarget {
    /// Build a structure of this type.
    Structure(StructureTypeId),
    /// Research this tech.
    Research(TechId),
}

/// A requested production or research objective.
///
/// `assignee` and `structure` are borrowed handles into the world;
/// every read re-validates them through [`Engine::view`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    /// What this goal produces.
    pub target: GoalTarget,
    /// Entity currently executing the goal, if any.
    pub assignee: Option<EntityId>,
    /// Physical result once construction has begun, if any.
    pub structure: Option<EntityId>,
    /// Tick before which this goal is exempt from re-validation.
    pub grace_until: Tick,
}

impl Goal {
    /// Create a fresh, unassigned goal.
    #[must_use]
    pub const fn new(target: GoalTarget) -> Self {
        Self {
            target,
            assignee: None,
            structure: None,
            grace_until: 0,
        }
    }
}

/// Per-tick inputs for goal reconciliation.
pub struct ReconcileCtx<'a> {
    /// Type definitions.
    pub catalog: &'a TypeCatalog,
    /// The faction we control.
    pub faction: FactionId,
    /// Current tick.
    pub now: Tick,
    /// Grace period granted to newly started goals.
    pub grace_period: Tick,
    /// Mineral surplus above which the valve goal is synthesized.
    pub surplus_threshold: u32,
    /// Structure synthesized when income outruns the queue.
    pub surplus_structure: StructureTypeId,
}

/// Outcome of validating one under-construction goal.
enum Resolution {
    /// Nothing is amiss.
    Keep,
    /// Pick up links the world now exposes (spawned structure or a
    /// builder we did not assign).
    Adopt {
        assignee: Option<EntityId>,
        structure: Option<EntityId>,
    },
    /// The objective is confirmed complete.
    Complete,
    /// The commitment stalled but its structure survives; a
    /// replacement builder is wanted.
    NeedsBuilder,
    /// Complete failure; re-queue at the front.
    Requeue,
}

/// Bound on prerequisite-chain depth, against malformed catalogs with
/// requirement cycles.
const MAX_PREREQ_DEPTH: usize = 32;

/// Ordered backlog of unstarted goals plus the set believed in
/// progress.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GoalQueue {
    pending: VecDeque<Goal>,
    building: Vec<Goal>,
}

impl GoalQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `count` independent goal instances, appended at the back or,
    /// for prerequisite injection and failure recovery, prepended at
    /// the front.
    ///
    /// Rejects targets the catalog does not know or that belong to a
    /// faction we do not control; rejection leaves the queue untouched.
    pub fn add_goal(
        &mut self,
        catalog: &TypeCatalog,
        faction: FactionId,
        target: GoalTarget,
        front: bool,
        count: u32,
    ) -> Result<(), GoalError> {
        let owner = match target {
            GoalTarget::Structure(st) => {
                catalog.structure(st).ok_or(GoalError::UnknownType)?.faction
            }
            GoalTarget::Research(t) => catalog.tech(t).ok_or(GoalError::UnknownType)?.faction,
        };
        if owner != faction {
            return Err(GoalError::WrongFaction);
        }
        for _ in 0..count {
            if front {
                self.pending.push_front(Goal::new(target));
            } else {
                self.pending.push_back(Goal::new(target));
            }
        }
        tracing::debug!(goal = ?target, front, count, "goal added");
        Ok(())
    }

    /// The goal next in line to be started, if any.
    #[must_use]
    pub fn front(&self) -> Option<&Goal> {
        self.pending.front()
    }

    /// Unstarted goals, front first.
    #[must_use]
    pub fn pending(&self) -> &VecDeque<Goal> {
        &self.pending
    }

    /// Goals believed in progress.
    #[must_use]
    pub fn building(&self) -> &[Goal] {
        &self.building
    }

    /// Mutable access to in-progress goals, for the replacement-builder
    /// path in the worker dispatcher.
    pub fn building_mut(&mut self) -> &mut [Goal] {
        &mut self.building
    }

    /// Move the front pending goal to the under-construction set with a
    /// recorded assignee and a fresh grace period.
    ///
    /// Callers invoke this only after the engine accepted the
    /// corresponding order.
    pub fn commit_front(&mut self, assignee: EntityId, grace_until: Tick) -> Option<Goal> {
        let mut goal = self.pending.pop_front()?;
        goal.assignee = Some(assignee);
        goal.grace_until = grace_until;
        self.building.push(goal);
        self.building.last().copied()
    }

    /// True when a structure goal of type `st` is already committed.
    #[must_use]
    pub fn structure_in_flight(&self, st: StructureTypeId) -> bool {
        self.building
            .iter()
            .any(|g| g.target == GoalTarget::Structure(st))
    }

    /// True when a research goal for `tech` is already committed.
    #[must_use]
    pub fn research_in_flight(&self, tech: TechId) -> bool {
        self.building
            .iter()
            .any(|g| g.target == GoalTarget::Research(tech))
    }

    /// Once-per-tick reconciliation, in fixed order: surplus valve,
    /// under-construction validation, prerequisite injection for the
    /// front goal, then direct start of research/attachment goals.
    ///
    /// With no intervening world change this is a fixed point: running
    /// it a second time in the same tick mutates nothing further.
    pub fn evaluate<E: Engine>(
        &mut self,
        ctx: &ReconcileCtx<'_>,
        engine: &mut E,
        balance: &mut RunningBalance,
    ) {
        self.surplus_valve(ctx, balance);
        self.validate_building(ctx, engine);
        if self.inject_prerequisites(ctx, engine) {
            // The front changed this tick; the corrective goals start
            // from the next tick on.
            return;
        }
        self.start_front(ctx, engine, balance);
    }

    /// Step 1: if the backlog is empty and unallocated income has piled
    /// up, synthesize a production-structure goal so the surplus is
    /// never idle.
    fn surplus_valve(&mut self, ctx: &ReconcileCtx<'_>, balance: &RunningBalance) {
        if !self.pending.is_empty() {
            return;
        }
        if balance.remaining().minerals <= ctx.surplus_threshold {
            return;
        }
        let target = GoalTarget::Structure(ctx.surplus_structure);
        if self
            .add_goal(ctx.catalog, ctx.faction, target, false, 1)
            .is_ok()
        {
            tracing::info!(
                minerals = balance.remaining().minerals,
                "surplus valve opened, queued production structure"
            );
        }
    }

    /// Step 2: re-validate every under-construction goal whose grace
    /// period has elapsed.
    fn validate_building<E: Engine>(&mut self, ctx: &ReconcileCtx<'_>, engine: &E) {
        let mut i = 0;
        while i < self.building.len() {
            match Self::validate_one(&self.building[i], ctx, engine) {
                Resolution::Keep => i += 1,
                Resolution::Adopt {
                    assignee,
                    structure,
                } => {
                    let goal = &mut self.building[i];
                    if assignee.is_some() {
                        goal.assignee = assignee;
                    }
                    if structure.is_some() {
                        goal.structure = structure;
                    }
                    i += 1;
                }
                Resolution::Complete => {
                    let goal = self.building.swap_remove(i);
                    tracing::info!(goal = ?goal.target, "goal complete");
                }
                Resolution::NeedsBuilder => {
                    // Leaving the assignee empty while the structure
                    // link is live marks this goal for the worker
                    // dispatcher's replacement-builder path.
                    self.building[i].assignee = None;
                    i += 1;
                }
                Resolution::Requeue => {
                    let mut goal = self.building.swap_remove(i);
                    tracing::warn!(goal = ?goal.target, "goal lost, re-queued at front");
                    goal.assignee = None;
                    goal.structure = None;
                    goal.grace_until = 0;
                    self.pending.push_front(goal);
                }
            }
        }
    }

    fn validate_one<E: Engine>(goal: &Goal, ctx: &ReconcileCtx<'_>, engine: &E) -> Resolution {
        match goal.target {
            GoalTarget::Research(tech) => Self::validate_research(goal, tech, ctx, engine),
            GoalTarget::Structure(st) => {
                let is_attachment = ctx
                    .catalog
                    .structure(st)
                    .is_some_and(|s| s.attached_to.is_some());
                if is_attachment {
                    Self::validate_attachment(goal, ctx, engine)
                } else {
                    Self::validate_structure(goal, ctx, engine)
                }
            }
        }
    }

    fn validate_research<E: Engine>(
        goal: &Goal,
        tech: TechId,
        ctx: &ReconcileCtx<'_>,
        engine: &E,
    ) -> Resolution {
        if engine.has_tech(tech) {
            return Resolution::Complete;
        }
        if ctx.now < goal.grace_until {
            return Resolution::Keep;
        }
        match goal.assignee.and_then(|id| engine.view(id)) {
            Some(lab) if lab.researching == Some(tech) => Resolution::Keep,
            // The structure abandoned the research, or is gone.
            _ => Resolution::Requeue,
        }
    }

    fn validate_structure<E: Engine>(
        goal: &Goal,
        ctx: &ReconcileCtx<'_>,
        engine: &E,
    ) -> Resolution {
        let structure = goal.structure.and_then(|id| engine.view(id));
        if structure.as_ref().is_some_and(|s| s.completed) {
            return Resolution::Complete;
        }
        if ctx.now < goal.grace_until {
            return Resolution::Keep;
        }

        let assignee = goal.assignee.and_then(|id| engine.view(id));
        match (assignee, structure) {
            (Some(worker), _) if worker.constructing => {
                // If the physical structure has appeared, record it.
                match (goal.structure, worker.build_target) {
                    (None, Some(spawned)) => Resolution::Adopt {
                        assignee: None,
                        structure: Some(spawned),
                    },
                    _ => Resolution::Keep,
                }
            }
            // Assignee wandered off but the structure stands; want a
            // replacement builder.
            (Some(_), Some(_)) => Resolution::NeedsBuilder,
            (Some(_), None) => Resolution::Requeue,
            (None, Some(site)) => {
                match site.builder.filter(|b| engine.view(*b).is_some()) {
                    // Our recorded assignee was lost, but some live
                    // worker is raising the structure anyway; adopt it.
                    Some(builder) => Resolution::Adopt {
                        assignee: Some(builder),
                        structure: None,
                    },
                    None => Resolution::NeedsBuilder,
                }
            }
            (None, None) => Resolution::Requeue,
        }
    }

    fn validate_attachment<E: Engine>(
        goal: &Goal,
        ctx: &ReconcileCtx<'_>,
        engine: &E,
    ) -> Resolution {
        let attachment = goal.structure.and_then(|id| engine.view(id));
        if attachment.as_ref().is_some_and(|a| a.completed) {
            return Resolution::Complete;
        }
        if ctx.now < goal.grace_until {
            return Resolution::Keep;
        }
        match goal.assignee.and_then(|id| engine.view(id)) {
            Some(parent) => match parent.attachment {
                Some(spawned) if goal.structure.is_none() => Resolution::Adopt {
                    assignee: None,
                    structure: Some(spawned),
                },
                Some(_) => Resolution::Keep,
                // Parent went idle without ever spawning the
                // attachment.
                None if parent.idle => Resolution::Requeue,
                None => Resolution::Keep,
            },
            None => Resolution::Requeue,
        }
    }

    /// Step 3: front-insert corrective goals for every unsatisfied,
    /// not-in-flight prerequisite of the front goal, then repeat for
    /// the new front until the chain bottoms out. Missing prerequisites
    /// always overtake the goal that needs them, across arbitrarily
    /// nested chains, and the whole closure is reached in one pass.
    ///
    /// Returns true when anything was inserted.
    fn inject_prerequisites<E: Engine>(&mut self, ctx: &ReconcileCtx<'_>, engine: &E) -> bool {
        let mut inserted_any = false;
        for _ in 0..MAX_PREREQ_DEPTH {
            let Some(front) = self.pending.front() else {
                break;
            };
            let requires: Vec<Requirement> = match front.target {
                GoalTarget::Structure(st) => ctx
                    .catalog
                    .structure(st)
                    .map(|s| s.requires.clone())
                    .unwrap_or_default(),
                GoalTarget::Research(t) => ctx
                    .catalog
                    .tech(t)
                    .map(|t| t.requires.clone())
                    .unwrap_or_default(),
            };

            let missing: Vec<Requirement> = requires
                .into_iter()
                .filter(|req| !self.requirement_satisfied(*req, engine))
                .collect();
            if missing.is_empty() {
                break;
            }
            for req in missing {
                let corrective = match req {
                    Requirement::Structure(st) => GoalTarget::Structure(st),
                    Requirement::Tech(t) => GoalTarget::Research(t),
                };
                if self
                    .add_goal(ctx.catalog, ctx.faction, corrective, true, 1)
                    .is_ok()
                {
                    tracing::info!(?corrective, "front goal blocked, injected prerequisite");
                    inserted_any = true;
                }
            }
        }
        inserted_any
    }

    /// A prerequisite counts as satisfied when it is owned, physically
    /// in progress, or already committed in the under-construction set.
    /// "Already building" and "already built" are equally satisfying.
    fn requirement_satisfied<E: Engine>(&self, req: Requirement, engine: &E) -> bool {
        match req {
            Requirement::Structure(st) => {
                if self.structure_in_flight(st) {
                    return true;
                }
                engine.owned().into_iter().any(|id| {
                    engine.view(id).is_some_and(|v| {
                        v.entity_type == EntityType::Structure(st)
                            || matches!(v.order, Order::Construct { structure, .. } if structure == st)
                    })
                })
            }
            Requirement::Tech(t) => {
                if engine.has_tech(t) || self.research_in_flight(t) {
                    return true;
                }
                engine
                    .owned()
                    .into_iter()
                    .any(|id| engine.view(id).is_some_and(|v| v.researching == Some(t)))
            }
        }
    }

    /// Step 4: start the front goal when a structure, not a worker,
    /// executes it - research and attachment goals. Worker-built
    /// structure goals are started by the worker dispatcher.
    fn start_front<E: Engine>(
        &mut self,
        ctx: &ReconcileCtx<'_>,
        engine: &mut E,
        balance: &mut RunningBalance,
    ) {
        let Some(front) = self.pending.front() else {
            return;
        };

        match front.target {
            GoalTarget::Research(tech) => {
                let Some(spec) = ctx.catalog.tech(tech) else {
                    return;
                };
                let cost = spec.cost;
                let host_type = spec.researched_at;
                if !balance.covers(cost) {
                    return;
                }
                let Some(lab) =
                    Self::find_idle_structure(engine, host_type, |v| v.researching.is_none())
                else {
                    return;
                };
                match engine.order_research(lab, tech) {
                    Ok(()) => {
                        balance.debit(cost);
                        self.commit_front(lab, ctx.now + ctx.grace_period);
                        tracing::info!(?tech, "research started");
                    }
                    Err(err) => {
                        // Left at the front for retry next tick.
                        tracing::warn!(?tech, %err, "research order rejected");
                    }
                }
            }
            GoalTarget::Structure(st) => {
                let Some(spec) = ctx.catalog.structure(st) else {
                    return;
                };
                let Some(parent_type) = spec.attached_to else {
                    return;
                };
                let cost = spec.cost;
                if !balance.covers(cost) {
                    return;
                }
                let Some(parent) =
                    Self::find_idle_structure(engine, parent_type, |v| v.attachment.is_none())
                else {
                    return;
                };
                match engine.order_build_attachment(parent, st) {
                    Ok(()) => {
                        balance.debit(cost);
                        self.commit_front(parent, ctx.now + ctx.grace_period);
                        tracing::info!(structure = ?st, "attachment started");
                    }
                    Err(err) => {
                        tracing::warn!(structure = ?st, %err, "attachment order rejected");
                    }
                }
            }
        }
    }

    /// First-found idle, operable owned structure of the given type;
    /// no load balancing across competing candidates.
    fn find_idle_structure<E: Engine>(
        engine: &E,
        structure_type: StructureTypeId,
        extra: impl Fn(&UnitView) -> bool,
    ) -> Option<EntityId> {
        engine.owned().into_iter().find(|&id| {
            engine.view(id).is_some_and(|v| {
                v.entity_type == EntityType::Structure(structure_type)
                    && v.is_operable()
                    && v.idle
                    && extra(&v)
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marshal_test_utils::fake_engine::{FakeEngine, FakeUnit};
    use marshal_test_utils::fixtures::{
        demo_catalog, BUNKER, COMMAND_POST, ENEMY_FACTION, FABRICATOR, FACTION, MACHINE_BAY,
        MUSTER_YARD, SIEGE_PROTOCOL, SUPPLY_CACHE, VEHICLE_PLANT,
    };
    use proptest::prelude::*;

    use crate::ledger::Resources;

    fn ctx<'a>(catalog: &'a TypeCatalog, now: Tick) -> ReconcileCtx<'a> {
        ReconcileCtx {
            catalog,
            faction: FACTION,
            now,
            grace_period: 48,
            surplus_threshold: 600,
            surplus_structure: MUSTER_YARD,
        }
    }

    #[test]
    fn test_add_goal_rejects_unknown_type() {
        let catalog = demo_catalog();
        let mut queue = GoalQueue::new();
        let err = queue.add_goal(
            &catalog,
            FACTION,
            GoalTarget::Structure(StructureTypeId(999)),
            false,
            1,
        );
        assert_eq!(err, Err(GoalError::UnknownType));
        assert!(queue.pending().is_empty());
    }

    #[test]
    fn test_add_goal_rejects_wrong_faction() {
        let catalog = demo_catalog();
        let mut queue = GoalQueue::new();
        let err = queue.add_goal(
            &catalog,
            ENEMY_FACTION,
            GoalTarget::Structure(MUSTER_YARD),
            false,
            1,
        );
        assert_eq!(err, Err(GoalError::WrongFaction));
        assert!(queue.pending().is_empty());
    }

    #[test]
    fn test_back_insertion_preserves_order() {
        let catalog = demo_catalog();
        let mut queue = GoalQueue::new();
        queue
            .add_goal(&catalog, FACTION, GoalTarget::Structure(MUSTER_YARD), false, 1)
            .unwrap();
        queue
            .add_goal(&catalog, FACTION, GoalTarget::Structure(BUNKER), false, 2)
            .unwrap();
        queue
            .add_goal(&catalog, FACTION, GoalTarget::Structure(SUPPLY_CACHE), false, 1)
            .unwrap();

        let order: Vec<GoalTarget> = queue.pending().iter().map(|g| g.target).collect();
        assert_eq!(
            order,
            vec![
                GoalTarget::Structure(MUSTER_YARD),
                GoalTarget::Structure(BUNKER),
                GoalTarget::Structure(BUNKER),
                GoalTarget::Structure(SUPPLY_CACHE),
            ]
        );
    }

    #[test]
    fn test_front_insertion_precedes() {
        let catalog = demo_catalog();
        let mut queue = GoalQueue::new();
        queue
            .add_goal(&catalog, FACTION, GoalTarget::Structure(BUNKER), false, 1)
            .unwrap();
        queue
            .add_goal(&catalog, FACTION, GoalTarget::Structure(MUSTER_YARD), true, 1)
            .unwrap();

        assert_eq!(
            queue.front().map(|g| g.target),
            Some(GoalTarget::Structure(MUSTER_YARD))
        );
    }

    proptest! {
        /// Relative order of back-inserted goals survives any
        /// interleaving of front insertions.
        #[test]
        fn prop_back_order_preserved(ops in proptest::collection::vec(any::<bool>(), 1..40)) {
            let catalog = demo_catalog();
            let mut queue = GoalQueue::new();
            let mut backs = Vec::new();
            // Alternate the back-inserted type so order is observable.
            for (i, front) in ops.iter().enumerate() {
                let target = if i % 2 == 0 {
                    GoalTarget::Structure(MUSTER_YARD)
                } else {
                    GoalTarget::Structure(BUNKER)
                };
                if *front {
                    queue.add_goal(&catalog, FACTION, GoalTarget::Structure(SUPPLY_CACHE), true, 1).unwrap();
                } else {
                    queue.add_goal(&catalog, FACTION, target, false, 1).unwrap();
                    backs.push(target);
                }
            }
            let observed: Vec<GoalTarget> = queue
                .pending()
                .iter()
                .map(|g| g.target)
                .filter(|t| *t != GoalTarget::Structure(SUPPLY_CACHE))
                .collect();
            prop_assert_eq!(observed, backs);
        }
    }

    #[test]
    fn test_prerequisite_chain_injected_ahead_of_blocked_goal() {
        let catalog = demo_catalog();
        let mut engine = FakeEngine::new();
        let mut queue = GoalQueue::new();
        // Vehicle plant requires a muster yard, which in turn requires
        // a command post; we own neither.
        queue
            .add_goal(&catalog, FACTION, GoalTarget::Structure(VEHICLE_PLANT), false, 1)
            .unwrap();

        let c = ctx(&catalog, 100);
        let mut balance = RunningBalance::new(Resources::new(1000, 1000));
        queue.evaluate(&c, &mut engine, &mut balance);

        // One pass reaches the whole closure, dependencies first.
        let order: Vec<GoalTarget> = queue.pending().iter().map(|g| g.target).collect();
        assert_eq!(
            order,
            vec![
                GoalTarget::Structure(COMMAND_POST),
                GoalTarget::Structure(MUSTER_YARD),
                GoalTarget::Structure(VEHICLE_PLANT),
            ]
        );
    }

    #[test]
    fn test_nested_prerequisites_resolve_front_first() {
        let catalog = demo_catalog();
        let mut engine = FakeEngine::new();
        engine.spawn(FakeUnit::structure(COMMAND_POST).at(2, 2));
        let mut queue = GoalQueue::new();
        // Siege protocol needs a machine bay; the machine bay is an
        // attachment of the vehicle plant, which needs a muster yard.
        queue
            .add_goal(&catalog, FACTION, GoalTarget::Research(SIEGE_PROTOCOL), false, 1)
            .unwrap();

        let c = ctx(&catalog, 100);
        let mut balance = RunningBalance::new(Resources::new(5000, 5000));
        queue.evaluate(&c, &mut engine, &mut balance);

        let order: Vec<GoalTarget> = queue.pending().iter().map(|g| g.target).collect();
        assert_eq!(
            order,
            vec![
                GoalTarget::Structure(MUSTER_YARD),
                GoalTarget::Structure(VEHICLE_PLANT),
                GoalTarget::Structure(MACHINE_BAY),
                GoalTarget::Research(SIEGE_PROTOCOL),
            ]
        );
    }

    #[test]
    fn test_in_flight_prerequisite_not_duplicated() {
        let catalog = demo_catalog();
        let mut engine = FakeEngine::new();
        // A muster yard is already being raised out in the world.
        let worker = engine.spawn(FakeUnit::unit(FABRICATOR).at(5, 5));
        engine
            .order_build(worker, MUSTER_YARD, crate::math::TilePos::new(6, 5))
            .unwrap();

        let mut queue = GoalQueue::new();
        queue
            .add_goal(&catalog, FACTION, GoalTarget::Structure(VEHICLE_PLANT), false, 1)
            .unwrap();

        let c = ctx(&catalog, 100);
        let mut balance = RunningBalance::new(Resources::new(1000, 1000));
        queue.evaluate(&c, &mut engine, &mut balance);

        // "Already building" satisfies the requirement; no corrective
        // goal is inserted.
        assert_eq!(
            queue.front().map(|g| g.target),
            Some(GoalTarget::Structure(VEHICLE_PLANT))
        );
        assert_eq!(queue.pending().len(), 1);
    }

    #[test]
    fn test_lost_goal_requeued_at_front() {
        let catalog = demo_catalog();
        let mut engine = FakeEngine::new();
        engine.spawn(FakeUnit::structure(COMMAND_POST).at(2, 2));
        let worker = engine.spawn(FakeUnit::unit(FABRICATOR).at(5, 5));

        let mut queue = GoalQueue::new();
        queue
            .add_goal(&catalog, FACTION, GoalTarget::Structure(MUSTER_YARD), false, 1)
            .unwrap();
        queue
            .add_goal(&catalog, FACTION, GoalTarget::Structure(BUNKER), false, 1)
            .unwrap();
        queue.commit_front(worker, 50);
        assert_eq!(queue.building().len(), 1);

        // Assignee dies before anything was raised; grace elapses.
        engine.kill(worker);
        engine.set_now(60);
        let c = ctx(&catalog, 60);
        let mut balance = RunningBalance::new(Resources::ZERO);
        queue.evaluate(&c, &mut engine, &mut balance);

        // Recovery preempts normal flow: the lost goal re-enters ahead
        // of the bunker, with its links cleared.
        assert!(queue.building().is_empty());
        let front = queue.front().copied().unwrap();
        assert_eq!(front.target, GoalTarget::Structure(MUSTER_YARD));
        assert_eq!(front.assignee, None);
        assert_eq!(front.structure, None);
    }

    #[test]
    fn test_lost_assignee_with_surviving_structure_wants_builder() {
        let catalog = demo_catalog();
        let mut engine = FakeEngine::new();
        let worker = engine.spawn(FakeUnit::unit(FABRICATOR).at(5, 5));
        let site = engine.spawn(FakeUnit::structure(MUSTER_YARD).at(6, 5).incomplete());

        let mut queue = GoalQueue::new();
        queue
            .add_goal(&catalog, FACTION, GoalTarget::Structure(MUSTER_YARD), false, 1)
            .unwrap();
        queue.commit_front(worker, 50);
        queue.building_mut()[0].structure = Some(site);

        engine.kill(worker);
        engine.set_now(60);
        let c = ctx(&catalog, 60);
        let mut balance = RunningBalance::new(Resources::ZERO);
        queue.evaluate(&c, &mut engine, &mut balance);

        // Still committed, but flagged for a replacement builder.
        assert_eq!(queue.building().len(), 1);
        assert_eq!(queue.building()[0].assignee, None);
        assert_eq!(queue.building()[0].structure, Some(site));
    }

    #[test]
    fn test_grace_period_defers_validation() {
        let catalog = demo_catalog();
        let mut engine = FakeEngine::new();
        engine.spawn(FakeUnit::structure(COMMAND_POST).at(2, 2));
        let worker = engine.spawn(FakeUnit::unit(FABRICATOR).at(5, 5));

        let mut queue = GoalQueue::new();
        queue
            .add_goal(&catalog, FACTION, GoalTarget::Structure(MUSTER_YARD), false, 1)
            .unwrap();
        queue.commit_front(worker, 200);
        engine.kill(worker);

        // Before the grace deadline the commitment is exempt.
        engine.set_now(100);
        let c = ctx(&catalog, 100);
        let mut balance = RunningBalance::new(Resources::ZERO);
        queue.evaluate(&c, &mut engine, &mut balance);
        assert_eq!(queue.building().len(), 1);

        // After it, the loss is detected.
        engine.set_now(201);
        let c = ctx(&catalog, 201);
        queue.evaluate(&c, &mut engine, &mut balance);
        assert!(queue.building().is_empty());
        assert_eq!(queue.pending().len(), 1);
    }

    #[test]
    fn test_completed_structure_retires_goal() {
        let catalog = demo_catalog();
        let mut engine = FakeEngine::new();
        let worker = engine.spawn(FakeUnit::unit(FABRICATOR).at(5, 5));
        let done = engine.spawn(FakeUnit::structure(MUSTER_YARD).at(6, 5));

        let mut queue = GoalQueue::new();
        queue
            .add_goal(&catalog, FACTION, GoalTarget::Structure(MUSTER_YARD), false, 1)
            .unwrap();
        queue.commit_front(worker, 50);
        queue.building_mut()[0].structure = Some(done);

        engine.set_now(10);
        let c = ctx(&catalog, 10);
        let mut balance = RunningBalance::new(Resources::ZERO);
        queue.evaluate(&c, &mut engine, &mut balance);

        assert!(queue.building().is_empty());
        assert!(queue.pending().is_empty());
    }

    #[test]
    fn test_research_started_on_idle_lab() {
        let catalog = demo_catalog();
        let mut engine = FakeEngine::new();
        let plant = engine.spawn(FakeUnit::structure(VEHICLE_PLANT).at(4, 4));
        let bay = engine.spawn(FakeUnit::structure(MACHINE_BAY).at(5, 4));
        engine.unit_mut(plant).attachment = Some(bay);

        let mut queue = GoalQueue::new();
        queue
            .add_goal(&catalog, FACTION, GoalTarget::Research(SIEGE_PROTOCOL), false, 1)
            .unwrap();

        let c = ctx(&catalog, 100);
        let mut balance = RunningBalance::new(Resources::new(1000, 1000));
        queue.evaluate(&c, &mut engine, &mut balance);

        assert!(queue.pending().is_empty());
        assert_eq!(queue.building().len(), 1);
        assert_eq!(queue.building()[0].assignee, Some(bay));
        assert_eq!(engine.view(bay).unwrap().researching, Some(SIEGE_PROTOCOL));
    }

    #[test]
    fn test_reconciliation_is_fixed_point_within_tick() {
        let catalog = demo_catalog();
        let mut engine = FakeEngine::new();
        let worker = engine.spawn(FakeUnit::unit(FABRICATOR).at(5, 5));

        let mut queue = GoalQueue::new();
        queue
            .add_goal(&catalog, FACTION, GoalTarget::Structure(VEHICLE_PLANT), false, 1)
            .unwrap();
        queue.commit_front(worker, 50);
        engine.kill(worker);
        engine.set_now(60);

        // First run requeues the lost goal and injects its whole
        // prerequisite chain.
        let c = ctx(&catalog, 60);
        let mut balance = RunningBalance::new(Resources::ZERO);
        queue.evaluate(&c, &mut engine, &mut balance);
        let after_first: (Vec<Goal>, Vec<Goal>) = (
            queue.pending().iter().copied().collect(),
            queue.building().to_vec(),
        );

        // Re-running with no intervening world change mutates nothing.
        queue.evaluate(&c, &mut engine, &mut balance);
        let after_second: (Vec<Goal>, Vec<Goal>) = (
            queue.pending().iter().copied().collect(),
            queue.building().to_vec(),
        );
        assert_eq!(after_first, after_second);
    }

    #[test]
    fn test_surplus_valve_fires_only_on_empty_queue() {
        let catalog = demo_catalog();
        let mut engine = FakeEngine::new();
        engine.spawn(FakeUnit::structure(COMMAND_POST).at(2, 2));
        let mut queue = GoalQueue::new();

        let c = ctx(&catalog, 10);
        let mut balance = RunningBalance::new(Resources::minerals(800));
        queue.evaluate(&c, &mut engine, &mut balance);
        assert_eq!(
            queue.front().map(|g| g.target),
            Some(GoalTarget::Structure(MUSTER_YARD))
        );

        // With a backlog present the valve stays closed.
        let mut queue = GoalQueue::new();
        queue
            .add_goal(&catalog, FACTION, GoalTarget::Structure(SUPPLY_CACHE), false, 1)
            .unwrap();
        let mut balance = RunningBalance::new(Resources::minerals(800));
        queue.evaluate(&c, &mut engine, &mut balance);
        let valves = queue
            .pending()
            .iter()
            .filter(|g| g.target == GoalTarget::Structure(MUSTER_YARD))
            .count();
        assert_eq!(valves, 0);
    }
}
