//! Scripted world double for decision-layer tests.
//!
//! [`FakeEngine`] implements the [`Engine`], [`Placer`], and (through
//! [`FakeLedger`]) `Ledger` boundaries over a hand-built world. Tests
//! spawn units, mutate their state directly, and assert on the exact
//! commands the decision layer issued. Commands mutate the world just
//! enough for reconciliation logic to observe its own effects;
//! progression helpers ([`FakeEngine::materialize_build`],
//! [`FakeEngine::complete_structure`], ...) stand in for the passage
//! of game time.

use std::collections::{BTreeMap, HashSet};

use marshal_core::catalog::{FactionId, StructureTypeId, TechId, UnitTypeId};
use marshal_core::engine::{
    Engine, EntityId, EntityType, MapInfo, Order, Placer, Tick, UnitView,
};
use marshal_core::error::{CommandError, CommandResult};
use marshal_core::ledger::{Ledger, Resources};
use marshal_core::math::{TilePos, Vec2Fixed};

/// Pseudo-type for mineral nodes; never registered in a catalog.
pub const MINERAL_NODE_TYPE: StructureTypeId = StructureTypeId::new(9001);
/// Pseudo-type for vespene geysers; never registered in a catalog.
pub const GEYSER_TYPE: StructureTypeId = StructureTypeId::new(9002);

/// A command the decision layer issued, recorded for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssuedCommand {
    /// Plain move order.
    Move {
        /// Ordered unit.
        unit: EntityId,
        /// Destination.
        to: Vec2Fixed,
    },
    /// Attack-move order.
    AttackMove {
        /// Ordered unit.
        unit: EntityId,
        /// Destination.
        to: Vec2Fixed,
    },
    /// Direct attack order.
    Attack {
        /// Ordered unit.
        unit: EntityId,
        /// Target entity.
        target: EntityId,
    },
    /// Gather order.
    Gather {
        /// Ordered unit.
        unit: EntityId,
        /// Node or extractor gathered from.
        node: EntityId,
    },
    /// Return-cargo order.
    ReturnCargo {
        /// Ordered unit.
        unit: EntityId,
    },
    /// Stop order.
    Stop {
        /// Ordered unit.
        unit: EntityId,
    },
    /// Build order.
    Build {
        /// Ordered worker.
        worker: EntityId,
        /// Structure type to build.
        structure: StructureTypeId,
        /// Chosen site.
        site: TilePos,
    },
    /// Resume-construction order.
    ResumeBuild {
        /// Ordered worker.
        worker: EntityId,
        /// Structure being resumed.
        structure: EntityId,
    },
    /// Train order.
    Train {
        /// Producing structure.
        structure: EntityId,
        /// Unit type queued.
        unit_type: UnitTypeId,
    },
    /// Cancel-training order.
    CancelTrain {
        /// Producing structure.
        structure: EntityId,
    },
    /// Research order.
    Research {
        /// Researching structure.
        structure: EntityId,
        /// Tech queued.
        tech: TechId,
    },
    /// Build-attachment order.
    BuildAttachment {
        /// Parent structure.
        structure: EntityId,
        /// Attachment type.
        attachment: StructureTypeId,
    },
    /// Load order.
    Load {
        /// Garrison or transport.
        carrier: EntityId,
        /// Unit to load.
        passenger: EntityId,
    },
    /// Unload order.
    Unload {
        /// Garrison or transport.
        carrier: EntityId,
        /// Unit to unload.
        passenger: EntityId,
    },
}

/// One scripted entity. Fields mirror [`UnitView`]; tests mutate them
/// freely through [`FakeEngine::unit_mut`].
#[derive(Debug, Clone)]
pub struct FakeUnit {
    /// Unit or structure type.
    pub entity_type: EntityType,
    /// Owned by the opponent.
    pub hostile: bool,
    /// Neutral resource entity (mineral node, geyser).
    pub neutral: bool,
    /// World position.
    pub position: Vec2Fixed,
    /// Finished training or construction.
    pub completed: bool,
    /// Currently executing a build order / being raised.
    pub constructing: bool,
    /// Unable to act.
    pub disabled: bool,
    /// No current order.
    pub idle: bool,
    /// Current order.
    pub order: Order,
    /// Structure this worker is raising.
    pub build_target: Option<EntityId>,
    /// Worker raising this structure.
    pub builder: Option<EntityId>,
    /// Attachment on this structure.
    pub attachment: Option<EntityId>,
    /// Training queue.
    pub training: Vec<UnitTypeId>,
    /// Tech under research.
    pub researching: Option<TechId>,
    /// Garrisoned entities.
    pub loaded: Vec<EntityId>,
    /// Sitting inside a garrison or transport.
    pub is_loaded: bool,
    /// Carrying harvested resources.
    pub carrying: bool,
    /// Actively gathering minerals.
    pub gathering_minerals: bool,
    /// Actively gathering gas.
    pub gathering_gas: bool,
}

impl FakeUnit {
    fn bare(entity_type: EntityType) -> Self {
        Self {
            entity_type,
            hostile: false,
            neutral: false,
            position: Vec2Fixed::ZERO,
            completed: true,
            constructing: false,
            disabled: false,
            idle: true,
            order: Order::Idle,
            build_target: None,
            builder: None,
            attachment: None,
            training: Vec::new(),
            researching: None,
            loaded: Vec::new(),
            is_loaded: false,
            carrying: false,
            gathering_minerals: false,
            gathering_gas: false,
        }
    }

    /// A completed, idle unit of the given type.
    #[must_use]
    pub fn unit(unit_type: UnitTypeId) -> Self {
        Self::bare(EntityType::Unit(unit_type))
    }

    /// A completed, idle structure of the given type.
    #[must_use]
    pub fn structure(structure_type: StructureTypeId) -> Self {
        Self::bare(EntityType::Structure(structure_type))
    }

    /// Place at tile coordinates.
    #[must_use]
    pub fn at(mut self, x: i32, y: i32) -> Self {
        self.position = Vec2Fixed::from_tiles(x, y);
        self
    }

    /// Mark as owned by the opponent.
    #[must_use]
    pub fn hostile(mut self) -> Self {
        self.hostile = true;
        self
    }

    /// Mark as still under construction.
    #[must_use]
    pub fn incomplete(mut self) -> Self {
        self.completed = false;
        self.constructing = true;
        self.idle = false;
        self
    }
}

/// Snapshot ledger handed to the bot alongside the fake engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct FakeLedger {
    /// Unallocated resources reported for the tick.
    pub resources: Resources,
    /// Supply providers wanted before netting out enqueued ones.
    pub supply_needed: u32,
}

impl Ledger for FakeLedger {
    fn unallocated(&self) -> Resources {
        self.resources
    }

    fn supply_providers_needed(&self, enqueued: u32) -> u32 {
        self.supply_needed.saturating_sub(enqueued)
    }
}

/// Programmable world implementing the decision layer's boundary
/// traits.
#[derive(Debug, Clone)]
pub struct FakeEngine {
    now: Tick,
    map: MapInfo,
    next_id: u64,
    units: BTreeMap<EntityId, FakeUnit>,
    explored: HashSet<TilePos>,
    techs: HashSet<TechId>,
    opponent: Option<FactionId>,
    resources: Resources,
    supply_needed: u32,
    extractor_type: Option<StructureTypeId>,
    scatter: Vec<Vec2Fixed>,
    scatter_index: usize,
    place_fail: bool,
    fail_next: Option<CommandError>,
    commands: Vec<IssuedCommand>,
}

impl Default for FakeEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeEngine {
    /// A 64x64 world with two declared start locations.
    #[must_use]
    pub fn new() -> Self {
        Self::with_start_locations(vec![TilePos::new(5, 5), TilePos::new(55, 55)])
    }

    /// A 64x64 world with the given start locations.
    #[must_use]
    pub fn with_start_locations(start_locations: Vec<TilePos>) -> Self {
        Self {
            now: 0,
            map: MapInfo {
                width: 64,
                height: 64,
                start_locations,
            },
            next_id: 1,
            units: BTreeMap::new(),
            explored: HashSet::new(),
            techs: HashSet::new(),
            opponent: None,
            resources: Resources::ZERO,
            supply_needed: 0,
            extractor_type: None,
            scatter: vec![
                Vec2Fixed::from_tiles(16, 16),
                Vec2Fixed::from_tiles(48, 16),
                Vec2Fixed::from_tiles(16, 48),
                Vec2Fixed::from_tiles(48, 48),
            ],
            scatter_index: 0,
            place_fail: false,
            fail_next: None,
            commands: Vec::new(),
        }
    }

    /// Add an entity to the world.
    pub fn spawn(&mut self, unit: FakeUnit) -> EntityId {
        let id = EntityId::new(self.next_id);
        self.next_id += 1;
        self.units.insert(id, unit);
        id
    }

    /// Add a mineral node.
    pub fn spawn_mineral_node(&mut self, x: i32, y: i32) -> EntityId {
        let mut node = FakeUnit::structure(MINERAL_NODE_TYPE).at(x, y);
        node.neutral = true;
        self.spawn(node)
    }

    /// Add a vespene geyser.
    pub fn spawn_geyser(&mut self, x: i32, y: i32) -> EntityId {
        let mut geyser = FakeUnit::structure(GEYSER_TYPE).at(x, y);
        geyser.neutral = true;
        self.spawn(geyser)
    }

    /// Remove an entity from the world.
    pub fn kill(&mut self, id: EntityId) {
        self.units.remove(&id);
    }

    /// Direct mutable access to an entity.
    ///
    /// # Panics
    ///
    /// Panics if the entity does not exist.
    pub fn unit_mut(&mut self, id: EntityId) -> &mut FakeUnit {
        self.units.get_mut(&id).expect("entity exists")
    }

    /// Set the frame counter.
    pub fn set_now(&mut self, now: Tick) {
        self.now = now;
    }

    /// Advance the frame counter.
    pub fn advance(&mut self, frames: Tick) {
        self.now += frames;
    }

    /// Set the resources the ledger snapshot reports.
    pub fn set_resources(&mut self, resources: Resources) {
        self.resources = resources;
    }

    /// Set the supply-provider requirement the ledger reports.
    pub fn set_supply_needed(&mut self, needed: u32) {
        self.supply_needed = needed;
    }

    /// Snapshot ledger for the current scripted values.
    #[must_use]
    pub fn ledger(&self) -> FakeLedger {
        FakeLedger {
            resources: self.resources,
            supply_needed: self.supply_needed,
        }
    }

    /// Mark a tile as explored.
    pub fn mark_explored(&mut self, tile: TilePos) {
        self.explored.insert(tile);
    }

    /// Reveal the opponent's faction.
    pub fn set_opponent(&mut self, faction: FactionId) {
        self.opponent = Some(faction);
    }

    /// Grant a completed tech, clearing any lab researching it.
    pub fn grant_tech(&mut self, tech: TechId) {
        self.techs.insert(tech);
        for unit in self.units.values_mut() {
            if unit.researching == Some(tech) {
                unit.researching = None;
                unit.idle = true;
                unit.order = Order::Idle;
            }
        }
    }

    /// Which structure type counts as an owned extractor for spatial
    /// queries.
    pub fn set_extractor_type(&mut self, extractor: StructureTypeId) {
        self.extractor_type = Some(extractor);
    }

    /// Make the placer refuse all sites.
    pub fn set_place_fail(&mut self, fail: bool) {
        self.place_fail = fail;
    }

    /// Reject the next command with the given reason.
    pub fn fail_next_command(&mut self, err: CommandError) {
        self.fail_next = Some(err);
    }

    /// Commands issued so far.
    #[must_use]
    pub fn commands(&self) -> &[IssuedCommand] {
        &self.commands
    }

    /// Forget recorded commands.
    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    /// Progression helper: the structure a worker was ordered to build
    /// physically appears.
    ///
    /// # Panics
    ///
    /// Panics if the worker has no build order.
    pub fn materialize_build(&mut self, worker: EntityId) -> EntityId {
        let Order::Construct { structure, site } = self.units[&worker].order else {
            panic!("worker has no build order")
        };
        let mut building = FakeUnit::structure(structure)
            .at(site.x, site.y)
            .incomplete();
        building.builder = Some(worker);
        let id = self.spawn(building);
        let w = self.unit_mut(worker);
        w.build_target = Some(id);
        id
    }

    /// Progression helper: construction finishes and the builder goes
    /// idle.
    pub fn complete_structure(&mut self, id: EntityId) {
        let builder = {
            let s = self.unit_mut(id);
            s.completed = true;
            s.constructing = false;
            s.idle = true;
            s.order = Order::Idle;
            s.builder.take()
        };
        if let Some(worker) = builder {
            if let Some(w) = self.units.get_mut(&worker) {
                w.constructing = false;
                w.build_target = None;
                w.idle = true;
                w.order = Order::Idle;
            }
        }
    }

    /// Progression helper: the front of a training queue pops out as a
    /// fresh unit next to the producer.
    pub fn complete_training(&mut self, structure: EntityId) -> Option<EntityId> {
        let (unit_type, position) = {
            let s = self.units.get_mut(&structure)?;
            if s.training.is_empty() {
                return None;
            }
            let unit_type = s.training.remove(0);
            if s.training.is_empty() {
                s.idle = true;
                s.order = Order::Idle;
            }
            (unit_type, s.position)
        };
        let spawned = FakeUnit::unit(unit_type).at(0, 0);
        let id = self.spawn(spawned);
        self.unit_mut(id).position = position;
        Some(id)
    }

    /// Progression helper: a load order completes.
    pub fn complete_load(&mut self, carrier: EntityId, passenger: EntityId) {
        let p = self.unit_mut(passenger);
        p.is_loaded = true;
        p.idle = false;
        p.order = Order::Other;
        self.unit_mut(carrier).loaded.push(passenger);
    }

    fn check_fail(&mut self) -> CommandResult {
        match self.fail_next.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn require(&self, id: EntityId) -> Result<(), CommandError> {
        if self.units.contains_key(&id) {
            Ok(())
        } else {
            Err(CommandError::EntityNotFound(id.0))
        }
    }

    fn is_mineral(&self, id: EntityId) -> bool {
        self.units
            .get(&id)
            .is_some_and(|u| u.entity_type == EntityType::Structure(MINERAL_NODE_TYPE))
    }

    fn is_gas_source(&self, id: EntityId) -> bool {
        self.units.get(&id).is_some_and(|u| {
            u.entity_type == EntityType::Structure(GEYSER_TYPE)
                || self
                    .extractor_type
                    .is_some_and(|t| u.entity_type == EntityType::Structure(t) && !u.hostile)
        })
    }

    fn view_of(&self, id: EntityId, unit: &FakeUnit) -> UnitView {
        UnitView {
            id,
            entity_type: unit.entity_type,
            hostile: unit.hostile,
            position: unit.position,
            completed: unit.completed,
            constructing: unit.constructing,
            disabled: unit.disabled,
            idle: unit.idle,
            order: unit.order,
            build_target: unit.build_target,
            builder: unit.builder,
            attachment: unit.attachment,
            training: unit.training.clone(),
            researching: unit.researching,
            loaded: unit.loaded.clone(),
            is_loaded: unit.is_loaded,
            carrying: unit.carrying,
            gathering_minerals: unit.gathering_minerals,
            gathering_gas: unit.gathering_gas,
        }
    }

    fn closest_matching<F>(&self, near: EntityId, pred: F) -> Option<EntityId>
    where
        F: Fn(&FakeUnit) -> bool,
    {
        let origin = self.units.get(&near)?.position;
        self.units
            .iter()
            .filter(|(_, u)| pred(u))
            .min_by_key(|(_, u)| origin.distance_squared(u.position))
            .map(|(id, _)| *id)
    }
}

impl Engine for FakeEngine {
    fn now(&self) -> Tick {
        self.now
    }

    fn map(&self) -> &MapInfo {
        &self.map
    }

    fn is_explored(&self, tile: TilePos) -> bool {
        self.explored.contains(&tile)
    }

    fn owned(&self) -> Vec<EntityId> {
        self.units
            .iter()
            .filter(|(_, u)| !u.hostile && !u.neutral)
            .map(|(id, _)| *id)
            .collect()
    }

    fn visible_enemies(&self) -> Vec<EntityId> {
        self.units
            .iter()
            .filter(|(_, u)| u.hostile)
            .map(|(id, _)| *id)
            .collect()
    }

    fn view(&self, id: EntityId) -> Option<UnitView> {
        self.units.get(&id).map(|u| self.view_of(id, u))
    }

    fn opponent_faction(&self) -> Option<FactionId> {
        self.opponent
    }

    fn has_tech(&self, tech: TechId) -> bool {
        self.techs.contains(&tech)
    }

    fn enemies_near(&self, center: Vec2Fixed, radius_tiles: i32) -> Vec<EntityId> {
        self.units
            .iter()
            .filter(|(_, u)| u.hostile && u.position.within(center, radius_tiles))
            .map(|(id, _)| *id)
            .collect()
    }

    fn owned_near(&self, center: Vec2Fixed, radius_tiles: i32) -> Vec<EntityId> {
        self.units
            .iter()
            .filter(|(_, u)| !u.hostile && !u.neutral && u.position.within(center, radius_tiles))
            .map(|(id, _)| *id)
            .collect()
    }

    fn closest_mineral_node(&self, near: EntityId) -> Option<EntityId> {
        self.closest_matching(near, |u| {
            u.entity_type == EntityType::Structure(MINERAL_NODE_TYPE)
        })
    }

    fn closest_geyser(&self, near: EntityId) -> Option<EntityId> {
        self.closest_matching(near, |u| {
            u.entity_type == EntityType::Structure(GEYSER_TYPE)
        })
    }

    fn closest_own_extractor(&self, near: EntityId) -> Option<EntityId> {
        let Some(extractor) = self.extractor_type else {
            return None;
        };
        self.closest_matching(near, |u| {
            !u.hostile && u.entity_type == EntityType::Structure(extractor)
        })
    }

    fn scatter_position(&mut self) -> Vec2Fixed {
        let pos = self.scatter[self.scatter_index % self.scatter.len()];
        self.scatter_index += 1;
        pos
    }

    fn order_move(&mut self, unit: EntityId, to: Vec2Fixed) -> CommandResult {
        self.check_fail()?;
        self.require(unit)?;
        let u = self.unit_mut(unit);
        u.order = Order::Move(to);
        u.idle = false;
        u.gathering_minerals = false;
        u.gathering_gas = false;
        self.commands.push(IssuedCommand::Move { unit, to });
        Ok(())
    }

    fn order_attack_move(&mut self, unit: EntityId, to: Vec2Fixed) -> CommandResult {
        self.check_fail()?;
        self.require(unit)?;
        let u = self.unit_mut(unit);
        u.order = Order::AttackMove(to);
        u.idle = false;
        self.commands.push(IssuedCommand::AttackMove { unit, to });
        Ok(())
    }

    fn order_attack(&mut self, unit: EntityId, target: EntityId) -> CommandResult {
        self.check_fail()?;
        self.require(unit)?;
        self.require(target)?;
        let u = self.unit_mut(unit);
        u.order = Order::AttackUnit(target);
        u.idle = false;
        u.gathering_minerals = false;
        u.gathering_gas = false;
        self.commands.push(IssuedCommand::Attack { unit, target });
        Ok(())
    }

    fn order_gather(&mut self, unit: EntityId, node: EntityId) -> CommandResult {
        self.check_fail()?;
        self.require(unit)?;
        self.require(node)?;
        let minerals = self.is_mineral(node);
        let gas = self.is_gas_source(node);
        let u = self.unit_mut(unit);
        u.order = Order::Gather(node);
        u.idle = false;
        u.gathering_minerals = minerals;
        u.gathering_gas = gas;
        self.commands.push(IssuedCommand::Gather { unit, node });
        Ok(())
    }

    fn order_return_cargo(&mut self, unit: EntityId) -> CommandResult {
        self.check_fail()?;
        self.require(unit)?;
        let u = self.unit_mut(unit);
        u.order = Order::ReturnCargo;
        u.idle = false;
        self.commands.push(IssuedCommand::ReturnCargo { unit });
        Ok(())
    }

    fn order_stop(&mut self, unit: EntityId) -> CommandResult {
        self.check_fail()?;
        self.require(unit)?;
        let u = self.unit_mut(unit);
        u.order = Order::Idle;
        u.idle = true;
        u.gathering_minerals = false;
        u.gathering_gas = false;
        self.commands.push(IssuedCommand::Stop { unit });
        Ok(())
    }

    fn order_build(
        &mut self,
        worker: EntityId,
        structure: StructureTypeId,
        site: TilePos,
    ) -> CommandResult {
        self.check_fail()?;
        self.require(worker)?;
        let u = self.unit_mut(worker);
        u.order = Order::Construct { structure, site };
        u.constructing = true;
        u.idle = false;
        u.gathering_minerals = false;
        u.gathering_gas = false;
        self.commands.push(IssuedCommand::Build {
            worker,
            structure,
            site,
        });
        Ok(())
    }

    fn order_resume_build(&mut self, worker: EntityId, structure: EntityId) -> CommandResult {
        self.check_fail()?;
        self.require(worker)?;
        self.require(structure)?;
        {
            let u = self.unit_mut(worker);
            u.constructing = true;
            u.idle = false;
            u.build_target = Some(structure);
            u.gathering_minerals = false;
            u.gathering_gas = false;
        }
        self.unit_mut(structure).builder = Some(worker);
        self.commands
            .push(IssuedCommand::ResumeBuild { worker, structure });
        Ok(())
    }

    fn order_train(&mut self, structure: EntityId, unit: UnitTypeId) -> CommandResult {
        self.check_fail()?;
        self.require(structure)?;
        let s = self.unit_mut(structure);
        s.training.push(unit);
        s.idle = false;
        s.order = Order::Train;
        self.commands.push(IssuedCommand::Train {
            structure,
            unit_type: unit,
        });
        Ok(())
    }

    fn order_cancel_train(&mut self, structure: EntityId) -> CommandResult {
        self.check_fail()?;
        self.require(structure)?;
        let s = self.unit_mut(structure);
        if s.training.is_empty() {
            return Err(CommandError::Unsupported);
        }
        s.training.remove(0);
        if s.training.is_empty() {
            s.idle = true;
            s.order = Order::Idle;
        }
        self.commands.push(IssuedCommand::CancelTrain { structure });
        Ok(())
    }

    fn order_research(&mut self, structure: EntityId, tech: TechId) -> CommandResult {
        self.check_fail()?;
        self.require(structure)?;
        let s = self.unit_mut(structure);
        if s.researching.is_some() {
            return Err(CommandError::UnitBusy);
        }
        s.researching = Some(tech);
        s.idle = false;
        s.order = Order::Research(tech);
        self.commands.push(IssuedCommand::Research { structure, tech });
        Ok(())
    }

    fn order_build_attachment(
        &mut self,
        structure: EntityId,
        attachment: StructureTypeId,
    ) -> CommandResult {
        self.check_fail()?;
        self.require(structure)?;
        if self.units[&structure].attachment.is_some() {
            return Err(CommandError::UnitBusy);
        }
        let position = self.units[&structure].position;
        let spawned = self.spawn(
            FakeUnit::structure(attachment)
                .at(position.x.to_num::<i32>() + 2, position.y.to_num())
                .incomplete(),
        );
        let s = self.unit_mut(structure);
        s.attachment = Some(spawned);
        s.idle = false;
        s.order = Order::Other;
        self.commands.push(IssuedCommand::BuildAttachment {
            structure,
            attachment,
        });
        Ok(())
    }

    fn order_load(&mut self, carrier: EntityId, passenger: EntityId) -> CommandResult {
        self.check_fail()?;
        self.require(carrier)?;
        self.require(passenger)?;
        let p = self.unit_mut(passenger);
        p.order = Order::EnterTransport(carrier);
        p.idle = false;
        self.commands.push(IssuedCommand::Load { carrier, passenger });
        Ok(())
    }

    fn order_unload(&mut self, carrier: EntityId, passenger: EntityId) -> CommandResult {
        self.check_fail()?;
        self.require(carrier)?;
        self.require(passenger)?;
        {
            let p = self.unit_mut(passenger);
            p.is_loaded = false;
            p.idle = true;
            p.order = Order::Idle;
        }
        self.unit_mut(carrier).loaded.retain(|&u| u != passenger);
        self.commands
            .push(IssuedCommand::Unload { carrier, passenger });
        Ok(())
    }
}

impl Placer for FakeEngine {
    fn build_location_near(&self, near: TilePos, _structure: StructureTypeId) -> Option<TilePos> {
        if self.place_fail {
            None
        } else {
            Some(near)
        }
    }
}
