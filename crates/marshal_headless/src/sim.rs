//! Deterministic world simulation behind the engine boundary.
//!
//! Just enough game to exercise every decision path: workers walk,
//! gather, and raise structures over real build times; structures
//! train and research on timers; combat is attritional; fog of war is
//! a sight radius around owned entities. No floating point, no system
//! randomness - scatter positions come from a seeded LCG.

use std::collections::{BTreeMap, HashSet};

use marshal_core::catalog::{FactionId, StructureTypeId, TechId, TypeCatalog, UnitTypeId};
use marshal_core::engine::{
    Engine, EntityId, EntityType, MapInfo, Order, Placer, Tick, UnitView,
};
use marshal_core::error::{CommandError, CommandResult};
use marshal_core::ledger::{Ledger, Resources};
use marshal_core::math::{Fixed, TilePos, Vec2Fixed};

use crate::faction;
use crate::scenario::Scenario;

/// Sight radius around owned entities, in tiles.
const SIGHT_RADIUS: i32 = 6;
/// Tiles moved per frame, as 1/MOVE_DIVISOR.
const MOVE_DIVISOR: i32 = 4;
/// Range at which combat units deal damage, in tiles.
const ATTACK_RANGE: i32 = 2;
/// Damage dealt per frame in range.
const ATTACK_DAMAGE: i32 = 2;
/// Frames of gathering that yield one load.
const GATHER_CYCLE: u32 = 40;
/// Resources delivered per completed gather cycle.
const GATHER_YIELD: u32 = 8;
/// Hit points for units.
const UNIT_HP: i32 = 80;
/// Hit points for structures.
const STRUCTURE_HP: i32 = 600;
/// Tiles within which a raider aggros onto our entities.
const RAIDER_AGGRO: i32 = 12;

/// Tallies the run summary is built from.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimStats {
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
}

#[derive(Debug, Clone)]
struct SimEntity {
    entity_type: EntityType,
    hostile: bool,
    neutral: bool,
    pos: Vec2Fixed,
    hp: i32,
    completed: bool,
    constructing: bool,
    idle: bool,
    order: Order,
    build_target: Option<EntityId>,
    builder: Option<EntityId>,
    attachment: Option<EntityId>,
    training: Vec<UnitTypeId>,
    train_done_at: Option<Tick>,
    build_done_at: Option<Tick>,
    researching: Option<TechId>,
    research_done_at: Option<Tick>,
    loaded: Vec<EntityId>,
    is_loaded: bool,
    carrying: bool,
    gathering_minerals: bool,
    gathering_gas: bool,
    gather_progress: u32,
}

impl SimEntity {
    fn new(entity_type: EntityType, pos: Vec2Fixed, hp: i32) -> Self {
        Self {
            entity_type,
            hostile: false,
            neutral: false,
            pos,
            hp,
            completed: true,
            constructing: false,
            idle: true,
            order: Order::Idle,
            build_target: None,
            builder: None,
            attachment: None,
            training: Vec::new(),
            train_done_at: None,
            build_done_at: None,
            researching: None,
            research_done_at: None,
            loaded: Vec::new(),
            is_loaded: false,
            carrying: false,
            gathering_minerals: false,
            gathering_gas: false,
            gather_progress: 0,
        }
    }
}

/// Ledger snapshot taken once per decision tick.
#[derive(Debug, Clone, Copy)]
pub struct SimLedger {
    unallocated: Resources,
    supply_used: u32,
    supply_total: u32,
    front_training_supply: u32,
    provider_supply: u32,
}

impl Ledger for SimLedger {
    fn unallocated(&self) -> Resources {
        self.unallocated
    }

    fn supply_providers_needed(&self, enqueued: u32) -> u32 {
        // Project a little ahead of current usage, plus whatever the
        // training queues are about to add.
        let projected =
            self.supply_used + 2 + self.supply_used / 10 + self.front_training_supply;
        let deficit = projected.saturating_sub(self.supply_total);
        let providers = deficit.div_ceil(self.provider_supply.max(1));
        providers.saturating_sub(enqueued)
    }
}

/// The simulated world.
#[derive(Debug, Clone)]
pub struct SimWorld {
    now: Tick,
    map: MapInfo,
    catalog: TypeCatalog,
    next_id: u64,
    entities: BTreeMap<EntityId, SimEntity>,
    explored: HashSet<TilePos>,
    techs: HashSet<TechId>,
    opponent_seen: bool,
    minerals: u32,
    gas: u32,
    rng_state: u64,
    /// Run tallies.
    pub stats: SimStats,
}

impl SimWorld {
    /// Build the starting world from a scenario.
    #[must_use]
    pub fn from_scenario(scenario: &Scenario) -> Self {
        let start_locations: Vec<TilePos> = scenario
            .start_locations
            .iter()
            .map(|&(x, y)| TilePos::new(x, y))
            .collect();
        let mut world = Self {
            now: 0,
            map: MapInfo {
                width: scenario.map_width,
                height: scenario.map_height,
                start_locations: start_locations.clone(),
            },
            catalog: faction::catalog(),
            next_id: 1,
            entities: BTreeMap::new(),
            explored: HashSet::new(),
            techs: HashSet::new(),
            opponent_seen: false,
            minerals: scenario.starting_minerals,
            gas: scenario.starting_gas,
            rng_state: 0x5eed_1234_abcd_0001,
            stats: SimStats::default(),
        };

        let ours = start_locations[scenario.our_start];
        let theirs = start_locations[scenario.enemy_start];

        world.spawn_structure(faction::COMMAND_POST, ours, false);
        for i in 0..scenario.starting_workers {
            world.spawn_unit(
                faction::FABRICATOR,
                TilePos::new(ours.x + 1 + i as i32, ours.y + 2),
                false,
            );
        }
        world.spawn_structure(faction::ENEMY_HQ, theirs, true);
        for i in 0..scenario.enemy_raiders {
            world.spawn_unit(
                faction::ENEMY_RAIDER,
                TilePos::new(theirs.x + 1 + i as i32, theirs.y + 2),
                true,
            );
        }

        for &loc in &start_locations {
            for i in 0..scenario.mineral_nodes_per_base {
                world.spawn_neutral(
                    faction::MINERAL_NODE,
                    TilePos::new(loc.x - 2 - i as i32, loc.y),
                );
            }
        }
        world.spawn_neutral(faction::GEYSER, TilePos::new(ours.x, ours.y - 3));

        world
    }

    fn alloc_id(&mut self) -> EntityId {
        let id = EntityId::new(self.next_id);
        self.next_id += 1;
        id
    }

    fn spawn_unit(&mut self, unit_type: UnitTypeId, tile: TilePos, hostile: bool) -> EntityId {
        let id = self.alloc_id();
        let mut entity = SimEntity::new(EntityType::Unit(unit_type), tile.center(), UNIT_HP);
        entity.hostile = hostile;
        self.entities.insert(id, entity);
        id
    }

    fn spawn_structure(
        &mut self,
        structure_type: StructureTypeId,
        tile: TilePos,
        hostile: bool,
    ) -> EntityId {
        let id = self.alloc_id();
        let mut entity =
            SimEntity::new(EntityType::Structure(structure_type), tile.center(), STRUCTURE_HP);
        entity.hostile = hostile;
        self.entities.insert(id, entity);
        id
    }

    fn spawn_neutral(&mut self, structure_type: StructureTypeId, tile: TilePos) -> EntityId {
        let id = self.alloc_id();
        let mut entity =
            SimEntity::new(EntityType::Structure(structure_type), tile.center(), STRUCTURE_HP);
        entity.neutral = true;
        self.entities.insert(id, entity);
        id
    }

    /// Ledger snapshot for the current frame.
    #[must_use]
    pub fn ledger(&self) -> SimLedger {
        let mut supply_used = 0;
        let mut supply_total = 0;
        let mut front_training_supply = 0;
        for entity in self.entities.values() {
            if entity.hostile || entity.neutral {
                continue;
            }
            match entity.entity_type {
                EntityType::Unit(ut) => {
                    if let Some(spec) = self.catalog.unit(ut) {
                        supply_used += spec.supply_cost;
                    }
                }
                EntityType::Structure(st) => {
                    if entity.completed {
                        if let Some(spec) = self.catalog.structure(st) {
                            supply_total += spec.supply_provided;
                        }
                    }
                    if let Some(&front) = entity.training.first() {
                        if let Some(spec) = self.catalog.unit(front) {
                            supply_used += spec.supply_cost;
                            front_training_supply += spec.supply_cost;
                        }
                    }
                }
            }
        }
        let provider_supply = self
            .catalog
            .structure(faction::SUPPLY_CACHE)
            .map_or(8, |s| s.supply_provided);
        SimLedger {
            unallocated: Resources::new(self.minerals, self.gas),
            supply_used,
            supply_total,
            front_training_supply,
            provider_supply,
        }
    }

    /// True once no hostile entity remains.
    #[must_use]
    pub fn enemy_eliminated(&self) -> bool {
        !self.entities.values().any(|e| e.hostile)
    }

    /// True once we have no depot and no workers left.
    #[must_use]
    pub fn we_are_eliminated(&self) -> bool {
        !self.entities.values().any(|e| !e.hostile && !e.neutral)
    }

    /// Advance the world one frame.
    pub fn tick(&mut self) {
        self.now += 1;
        if self.now % 4 == 0 {
            self.update_exploration();
        }
        self.update_visibility_flag();
        self.raider_ai();

        let ids: Vec<EntityId> = self.entities.keys().copied().collect();
        let mut damage: Vec<(EntityId, i32)> = Vec::new();
        for id in ids {
            self.advance_timers(id);
            self.advance_order(id, &mut damage);
        }
        for (target, amount) in damage {
            if let Some(entity) = self.entities.get_mut(&target) {
                entity.hp -= amount;
            }
        }
        self.reap();
    }

    fn update_exploration(&mut self) {
        let centers: Vec<TilePos> = self
            .entities
            .values()
            .filter(|e| !e.hostile && !e.neutral)
            .map(|e| e.pos.to_tile())
            .collect();
        for center in centers {
            for dx in -SIGHT_RADIUS..=SIGHT_RADIUS {
                for dy in -SIGHT_RADIUS..=SIGHT_RADIUS {
                    let tile = TilePos::new(center.x + dx, center.y + dy);
                    if tile.x >= 0
                        && tile.y >= 0
                        && tile.x < self.map.width
                        && tile.y < self.map.height
                    {
                        self.explored.insert(tile);
                    }
                }
            }
        }
    }

    fn update_visibility_flag(&mut self) {
        if self.opponent_seen {
            return;
        }
        self.opponent_seen = self
            .entities
            .values()
            .any(|e| e.hostile && self.in_sight(e.pos));
    }

    fn in_sight(&self, pos: Vec2Fixed) -> bool {
        self.entities
            .values()
            .filter(|e| !e.hostile && !e.neutral)
            .any(|e| e.pos.within(pos, SIGHT_RADIUS + 2))
    }

    /// Raiders hold their base but punish anything that wanders close.
    fn raider_ai(&mut self) {
        let targets: Vec<(EntityId, Vec2Fixed)> = self
            .entities
            .iter()
            .filter(|(_, e)| !e.hostile && !e.neutral)
            .map(|(id, e)| (*id, e.pos))
            .collect();
        let raiders: Vec<EntityId> = self
            .entities
            .iter()
            .filter(|(_, e)| e.hostile && e.idle && matches!(e.entity_type, EntityType::Unit(_)))
            .map(|(id, _)| *id)
            .collect();
        for raider in raiders {
            let pos = self.entities[&raider].pos;
            let victim = targets
                .iter()
                .filter(|(_, p)| p.within(pos, RAIDER_AGGRO))
                .min_by_key(|(_, p)| pos.distance_squared(*p));
            if let Some(&(victim, _)) = victim {
                let raider_entity = self.entities.get_mut(&raider).expect("raider exists");
                raider_entity.order = Order::AttackUnit(victim);
                raider_entity.idle = false;
            }
        }
    }

    fn advance_timers(&mut self, id: EntityId) {
        let now = self.now;
        // Construction completion.
        let (finished, builder, hostile) = {
            let Some(entity) = self.entities.get_mut(&id) else {
                return;
            };
            if entity.completed {
                (false, None, entity.hostile)
            } else if entity.build_done_at.is_some_and(|t| now >= t) {
                entity.completed = true;
                entity.constructing = false;
                entity.idle = true;
                entity.order = Order::Idle;
                entity.build_done_at = None;
                (true, entity.builder.take(), entity.hostile)
            } else {
                return;
            }
        };
        if finished {
            if !hostile {
                self.stats.structures_completed += 1;
            }
            if let Some(worker) = builder {
                if let Some(w) = self.entities.get_mut(&worker) {
                    w.constructing = false;
                    w.build_target = None;
                    w.idle = true;
                    w.order = Order::Idle;
                }
            }
            return;
        }

        // Training progression.
        let spawn = {
            let Some(entity) = self.entities.get_mut(&id) else {
                return;
            };
            if entity.training.is_empty() {
                None
            } else if let Some(done) = entity.train_done_at {
                if now >= done {
                    let unit_type = entity.training.remove(0);
                    entity.train_done_at = None;
                    if entity.training.is_empty() {
                        entity.idle = true;
                        entity.order = Order::Idle;
                    }
                    Some((unit_type, entity.pos.to_tile(), entity.hostile))
                } else {
                    None
                }
            } else {
                let front = entity.training[0];
                entity.train_done_at = self
                    .catalog
                    .unit(front)
                    .map(|spec| now + Tick::from(spec.build_time));
                None
            }
        };
        if let Some((unit_type, tile, hostile)) = spawn {
            self.spawn_unit(unit_type, TilePos::new(tile.x + 1, tile.y + 2), hostile);
            if !hostile {
                self.stats.units_trained += 1;
            }
            return;
        }

        // Research progression.
        let researched = {
            let Some(entity) = self.entities.get_mut(&id) else {
                return;
            };
            if entity.research_done_at.is_some_and(|t| now >= t) {
                let tech = entity.researching.take();
                entity.research_done_at = None;
                entity.idle = true;
                entity.order = Order::Idle;
                tech
            } else {
                None
            }
        };
        if let Some(tech) = researched {
            self.techs.insert(tech);
            self.stats.techs_completed += 1;
        }
    }

    fn advance_order(&mut self, id: EntityId, damage: &mut Vec<(EntityId, i32)>) {
        let Some(entity) = self.entities.get(&id) else {
            return;
        };
        if entity.is_loaded {
            return;
        }
        let order = entity.order;
        let pos = entity.pos;
        match order {
            Order::Move(dest) => {
                if self.arrive(id, pos, dest) {
                    let entity = self.entities.get_mut(&id).expect("entity exists");
                    entity.order = Order::Idle;
                    entity.idle = true;
                }
            }
            Order::AttackMove(dest) => {
                if let Some((victim, vpos)) = self.nearest_opposed(id) {
                    if pos.within(vpos, ATTACK_RANGE) {
                        damage.push((victim, ATTACK_DAMAGE));
                    } else {
                        self.step(id, pos, vpos);
                    }
                } else if self.arrive(id, pos, dest) {
                    let entity = self.entities.get_mut(&id).expect("entity exists");
                    entity.order = Order::Idle;
                    entity.idle = true;
                }
            }
            Order::AttackUnit(target) => match self.entities.get(&target).map(|t| t.pos) {
                Some(tpos) if pos.within(tpos, ATTACK_RANGE) => {
                    damage.push((target, ATTACK_DAMAGE));
                }
                Some(tpos) => {
                    self.step(id, pos, tpos);
                }
                None => {
                    let entity = self.entities.get_mut(&id).expect("entity exists");
                    entity.order = Order::Idle;
                    entity.idle = true;
                }
            },
            Order::Gather(node) => {
                let node_alive = self.entities.contains_key(&node);
                if !node_alive {
                    let entity = self.entities.get_mut(&id).expect("entity exists");
                    entity.order = Order::Idle;
                    entity.idle = true;
                    entity.gathering_minerals = false;
                    entity.gathering_gas = false;
                    return;
                }
                let npos = self.entities[&node].pos;
                if !pos.within(npos, ATTACK_RANGE) {
                    self.step(id, pos, npos);
                    return;
                }
                let (minerals, gas) = {
                    let entity = self.entities.get_mut(&id).expect("entity exists");
                    entity.gather_progress += 1;
                    if entity.gather_progress >= GATHER_CYCLE {
                        entity.gather_progress = 0;
                        (entity.gathering_minerals, entity.gathering_gas)
                    } else {
                        (false, false)
                    }
                };
                if minerals {
                    self.minerals += GATHER_YIELD;
                }
                if gas {
                    self.gas += GATHER_YIELD;
                }
            }
            Order::ReturnCargo => {
                let entity = self.entities.get_mut(&id).expect("entity exists");
                entity.carrying = false;
                entity.order = Order::Idle;
                entity.idle = true;
            }
            Order::Construct { structure, site } => {
                let dest = site.center();
                if self.entities[&id].build_target.is_some() {
                    // Stay on site while the timer runs.
                    return;
                }
                if self.arrive(id, pos, dest) {
                    let build_time = self
                        .catalog
                        .structure(structure)
                        .map_or(100, |s| s.build_time);
                    let spawned = self.alloc_id();
                    let mut building =
                        SimEntity::new(EntityType::Structure(structure), dest, STRUCTURE_HP);
                    building.completed = false;
                    building.constructing = true;
                    building.idle = false;
                    building.builder = Some(id);
                    building.build_done_at = Some(self.now + Tick::from(build_time));
                    self.entities.insert(spawned, building);
                    let worker = self.entities.get_mut(&id).expect("entity exists");
                    worker.build_target = Some(spawned);
                }
            }
            Order::EnterTransport(carrier) => {
                match self.entities.get(&carrier).map(|c| c.pos) {
                    Some(cpos) if pos.within(cpos, ATTACK_RANGE) => {
                        let entity = self.entities.get_mut(&id).expect("entity exists");
                        entity.is_loaded = true;
                        entity.order = Order::Other;
                        let c = self.entities.get_mut(&carrier).expect("carrier exists");
                        c.loaded.push(id);
                    }
                    Some(cpos) => self.step(id, pos, cpos),
                    None => {
                        let entity = self.entities.get_mut(&id).expect("entity exists");
                        entity.order = Order::Idle;
                        entity.idle = true;
                    }
                }
            }
            Order::Idle | Order::Research(_) | Order::Train | Order::Other => {}
        }
    }

    /// Nearest living entity on the other side, for attack-moves.
    fn nearest_opposed(&self, id: EntityId) -> Option<(EntityId, Vec2Fixed)> {
        let me = self.entities.get(&id)?;
        let pos = me.pos;
        let hostile = me.hostile;
        self.entities
            .iter()
            .filter(|(_, e)| !e.neutral && e.hostile != hostile)
            .filter(|(_, e)| e.pos.within(pos, SIGHT_RADIUS + 2))
            .min_by_key(|(_, e)| pos.distance_squared(e.pos))
            .map(|(id, e)| (*id, e.pos))
    }

    fn step(&mut self, id: EntityId, pos: Vec2Fixed, dest: Vec2Fixed) {
        let speed = Fixed::from_num(1) / Fixed::from_num(MOVE_DIVISOR);
        let mut next = pos;
        let dx = dest.x - pos.x;
        let step_x = if dx.abs() < speed { dx.abs() } else { speed };
        next.x += if dx >= 0 { step_x } else { -step_x };
        let dy = dest.y - pos.y;
        let step_y = if dy.abs() < speed { dy.abs() } else { speed };
        next.y += if dy >= 0 { step_y } else { -step_y };
        if let Some(entity) = self.entities.get_mut(&id) {
            entity.pos = next;
        }
    }

    /// Step toward `dest`; true once standing on it.
    fn arrive(&mut self, id: EntityId, pos: Vec2Fixed, dest: Vec2Fixed) -> bool {
        if pos == dest {
            return true;
        }
        self.step(id, pos, dest);
        self.entities.get(&id).is_some_and(|e| e.pos == dest)
    }

    /// Remove the fallen, dropping garrisoned passengers at the wreck.
    fn reap(&mut self) {
        let dead: Vec<EntityId> = self
            .entities
            .iter()
            .filter(|(_, e)| e.hp <= 0)
            .map(|(id, _)| *id)
            .collect();
        for id in dead {
            let Some(entity) = self.entities.remove(&id) else {
                continue;
            };
            if entity.hostile {
                self.stats.enemy_losses += 1;
            } else if !entity.neutral {
                self.stats.own_losses += 1;
            }
            for passenger in entity.loaded {
                if let Some(p) = self.entities.get_mut(&passenger) {
                    p.is_loaded = false;
                    p.idle = true;
                    p.order = Order::Idle;
                    p.pos = entity.pos;
                }
            }
        }
    }

    fn charge(&mut self, cost: Resources) -> CommandResult {
        if self.minerals < cost.minerals || self.gas < cost.gas {
            return Err(CommandError::InsufficientResources);
        }
        self.minerals -= cost.minerals;
        self.gas -= cost.gas;
        Ok(())
    }

    fn require_owned(&self, id: EntityId) -> Result<(), CommandError> {
        match self.entities.get(&id) {
            Some(e) if !e.hostile && !e.neutral => Ok(()),
            Some(_) => Err(CommandError::Unsupported),
            None => Err(CommandError::EntityNotFound(id.0)),
        }
    }

    fn view_of(&self, id: EntityId, entity: &SimEntity) -> UnitView {
        UnitView {
            id,
            entity_type: entity.entity_type,
            hostile: entity.hostile,
            position: entity.pos,
            completed: entity.completed,
            constructing: entity.constructing,
            disabled: false,
            idle: entity.idle,
            order: entity.order,
            build_target: entity.build_target,
            builder: entity.builder,
            attachment: entity.attachment,
            training: entity.training.clone(),
            researching: entity.researching,
            loaded: entity.loaded.clone(),
            is_loaded: entity.is_loaded,
            carrying: entity.carrying,
            gathering_minerals: entity.gathering_minerals,
            gathering_gas: entity.gathering_gas,
        }
    }

    fn closest_entity<F>(&self, near: EntityId, pred: F) -> Option<EntityId>
    where
        F: Fn(&SimEntity) -> bool,
    {
        let origin = self.entities.get(&near)?.pos;
        self.entities
            .iter()
            .filter(|(_, e)| pred(e))
            .min_by_key(|(_, e)| origin.distance_squared(e.pos))
            .map(|(id, _)| *id)
    }

    fn is_extractor_structure(&self, entity: &SimEntity) -> bool {
        match entity.entity_type {
            EntityType::Structure(st) => self
                .catalog
                .structure(st)
                .is_some_and(|spec| spec.is_extractor),
            EntityType::Unit(_) => false,
        }
    }
}

impl Engine for SimWorld {
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
        self.entities
            .iter()
            .filter(|(_, e)| !e.hostile && !e.neutral)
            .map(|(id, _)| *id)
            .collect()
    }

    fn visible_enemies(&self) -> Vec<EntityId> {
        self.entities
            .iter()
            .filter(|(_, e)| e.hostile && self.in_sight(e.pos))
            .map(|(id, _)| *id)
            .collect()
    }

    fn view(&self, id: EntityId) -> Option<UnitView> {
        self.entities.get(&id).map(|e| self.view_of(id, e))
    }

    fn opponent_faction(&self) -> Option<FactionId> {
        self.opponent_seen.then_some(faction::ENEMY_FACTION)
    }

    fn has_tech(&self, tech: TechId) -> bool {
        self.techs.contains(&tech)
    }

    fn enemies_near(&self, center: Vec2Fixed, radius_tiles: i32) -> Vec<EntityId> {
        self.entities
            .iter()
            .filter(|(_, e)| e.hostile && e.pos.within(center, radius_tiles))
            .map(|(id, _)| *id)
            .collect()
    }

    fn owned_near(&self, center: Vec2Fixed, radius_tiles: i32) -> Vec<EntityId> {
        self.entities
            .iter()
            .filter(|(_, e)| !e.hostile && !e.neutral && e.pos.within(center, radius_tiles))
            .map(|(id, _)| *id)
            .collect()
    }

    fn closest_mineral_node(&self, near: EntityId) -> Option<EntityId> {
        self.closest_entity(near, |e| {
            e.neutral && e.entity_type == EntityType::Structure(faction::MINERAL_NODE)
        })
    }

    fn closest_geyser(&self, near: EntityId) -> Option<EntityId> {
        // Only geysers nobody has built on yet.
        let claimed: Vec<TilePos> = self
            .entities
            .values()
            .filter(|e| !e.neutral && self.is_extractor_structure(e))
            .map(|e| e.pos.to_tile())
            .collect();
        self.closest_entity(near, |e| {
            e.neutral
                && e.entity_type == EntityType::Structure(faction::GEYSER)
                && !claimed.contains(&e.pos.to_tile())
        })
    }

    fn closest_own_extractor(&self, near: EntityId) -> Option<EntityId> {
        self.closest_entity(near, |e| {
            !e.hostile && !e.neutral && self.is_extractor_structure(e)
        })
    }

    fn scatter_position(&mut self) -> Vec2Fixed {
        // Seeded LCG keeps runs reproducible.
        self.rng_state = self
            .rng_state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        let x = ((self.rng_state >> 33) % self.map.width as u64) as i32;
        let y = ((self.rng_state >> 17) % self.map.height as u64) as i32;
        Vec2Fixed::from_tiles(x, y)
    }

    fn order_move(&mut self, unit: EntityId, to: Vec2Fixed) -> CommandResult {
        self.require_owned(unit)?;
        let entity = self.entities.get_mut(&unit).expect("entity exists");
        entity.order = Order::Move(to);
        entity.idle = false;
        entity.gathering_minerals = false;
        entity.gathering_gas = false;
        Ok(())
    }

    fn order_attack_move(&mut self, unit: EntityId, to: Vec2Fixed) -> CommandResult {
        self.require_owned(unit)?;
        let entity = self.entities.get_mut(&unit).expect("entity exists");
        entity.order = Order::AttackMove(to);
        entity.idle = false;
        Ok(())
    }

    fn order_attack(&mut self, unit: EntityId, target: EntityId) -> CommandResult {
        self.require_owned(unit)?;
        if !self.entities.contains_key(&target) {
            return Err(CommandError::EntityNotFound(target.0));
        }
        let entity = self.entities.get_mut(&unit).expect("entity exists");
        entity.order = Order::AttackUnit(target);
        entity.idle = false;
        entity.gathering_minerals = false;
        entity.gathering_gas = false;
        Ok(())
    }

    fn order_gather(&mut self, unit: EntityId, node: EntityId) -> CommandResult {
        self.require_owned(unit)?;
        let Some(target) = self.entities.get(&node) else {
            return Err(CommandError::EntityNotFound(node.0));
        };
        let minerals = target.entity_type == EntityType::Structure(faction::MINERAL_NODE);
        let gas = self.is_extractor_structure(target);
        if !minerals && !gas {
            return Err(CommandError::Unsupported);
        }
        let entity = self.entities.get_mut(&unit).expect("entity exists");
        entity.order = Order::Gather(node);
        entity.idle = false;
        entity.gathering_minerals = minerals;
        entity.gathering_gas = gas;
        entity.gather_progress = 0;
        Ok(())
    }

    fn order_return_cargo(&mut self, unit: EntityId) -> CommandResult {
        self.require_owned(unit)?;
        let entity = self.entities.get_mut(&unit).expect("entity exists");
        entity.order = Order::ReturnCargo;
        entity.idle = false;
        Ok(())
    }

    fn order_stop(&mut self, unit: EntityId) -> CommandResult {
        self.require_owned(unit)?;
        let entity = self.entities.get_mut(&unit).expect("entity exists");
        entity.order = Order::Idle;
        entity.idle = true;
        entity.gathering_minerals = false;
        entity.gathering_gas = false;
        Ok(())
    }

    fn order_build(
        &mut self,
        worker: EntityId,
        structure: StructureTypeId,
        site: TilePos,
    ) -> CommandResult {
        self.require_owned(worker)?;
        let cost = self
            .catalog
            .structure(structure)
            .ok_or(CommandError::Unsupported)?
            .cost;
        self.charge(cost)?;
        let entity = self.entities.get_mut(&worker).expect("entity exists");
        entity.order = Order::Construct { structure, site };
        entity.constructing = true;
        entity.idle = false;
        entity.gathering_minerals = false;
        entity.gathering_gas = false;
        Ok(())
    }

    fn order_resume_build(&mut self, worker: EntityId, structure: EntityId) -> CommandResult {
        self.require_owned(worker)?;
        let (structure_type, site) = match self.entities.get(&structure) {
            Some(e) => match e.entity_type {
                EntityType::Structure(st) => (st, e.pos.to_tile()),
                EntityType::Unit(_) => return Err(CommandError::Unsupported),
            },
            None => return Err(CommandError::EntityNotFound(structure.0)),
        };
        {
            let entity = self.entities.get_mut(&worker).expect("entity exists");
            entity.order = Order::Construct {
                structure: structure_type,
                site,
            };
            entity.constructing = true;
            entity.idle = false;
            entity.build_target = Some(structure);
            entity.gathering_minerals = false;
            entity.gathering_gas = false;
        }
        self.entities
            .get_mut(&structure)
            .expect("structure exists")
            .builder = Some(worker);
        Ok(())
    }

    fn order_train(&mut self, structure: EntityId, unit: UnitTypeId) -> CommandResult {
        self.require_owned(structure)?;
        let spec = self.catalog.unit(unit).ok_or(CommandError::Unsupported)?;
        let cost = spec.cost;
        let supply_cost = spec.supply_cost;
        let ledger = self.ledger();
        if ledger.supply_used + supply_cost > ledger.supply_total {
            return Err(CommandError::InsufficientResources);
        }
        self.charge(cost)?;
        let entity = self.entities.get_mut(&structure).expect("entity exists");
        entity.training.push(unit);
        entity.idle = false;
        entity.order = Order::Train;
        Ok(())
    }

    fn order_cancel_train(&mut self, structure: EntityId) -> CommandResult {
        self.require_owned(structure)?;
        let refund = {
            let entity = self.entities.get_mut(&structure).expect("entity exists");
            if entity.training.is_empty() {
                return Err(CommandError::Unsupported);
            }
            let unit = entity.training.remove(0);
            entity.train_done_at = None;
            if entity.training.is_empty() {
                entity.idle = true;
                entity.order = Order::Idle;
            }
            self.catalog.unit(unit).map(|s| s.cost)
        };
        if let Some(cost) = refund {
            self.minerals += cost.minerals;
            self.gas += cost.gas;
        }
        Ok(())
    }

    fn order_research(&mut self, structure: EntityId, tech: TechId) -> CommandResult {
        self.require_owned(structure)?;
        let spec = self.catalog.tech(tech).ok_or(CommandError::Unsupported)?;
        let cost = spec.cost;
        let duration = Tick::from(spec.build_time);
        {
            let entity = self.entities.get(&structure).expect("entity exists");
            if entity.researching.is_some() {
                return Err(CommandError::UnitBusy);
            }
        }
        self.charge(cost)?;
        let now = self.now;
        let entity = self.entities.get_mut(&structure).expect("entity exists");
        entity.researching = Some(tech);
        entity.research_done_at = Some(now + duration);
        entity.idle = false;
        entity.order = Order::Research(tech);
        Ok(())
    }

    fn order_build_attachment(
        &mut self,
        structure: EntityId,
        attachment: StructureTypeId,
    ) -> CommandResult {
        self.require_owned(structure)?;
        let spec = self
            .catalog
            .structure(attachment)
            .ok_or(CommandError::Unsupported)?;
        let cost = spec.cost;
        let build_time = Tick::from(spec.build_time);
        let parent_tile = {
            let entity = self.entities.get(&structure).expect("entity exists");
            if entity.attachment.is_some() {
                return Err(CommandError::UnitBusy);
            }
            entity.pos.to_tile()
        };
        self.charge(cost)?;
        let spawned = self.alloc_id();
        let mut addon = SimEntity::new(
            EntityType::Structure(attachment),
            TilePos::new(parent_tile.x + 2, parent_tile.y).center(),
            STRUCTURE_HP,
        );
        addon.completed = false;
        addon.constructing = true;
        addon.idle = false;
        addon.build_done_at = Some(self.now + build_time);
        self.entities.insert(spawned, addon);
        let entity = self.entities.get_mut(&structure).expect("entity exists");
        entity.attachment = Some(spawned);
        entity.idle = false;
        entity.order = Order::Other;
        Ok(())
    }

    fn order_load(&mut self, carrier: EntityId, passenger: EntityId) -> CommandResult {
        self.require_owned(carrier)?;
        self.require_owned(passenger)?;
        let entity = self.entities.get_mut(&passenger).expect("entity exists");
        entity.order = Order::EnterTransport(carrier);
        entity.idle = false;
        Ok(())
    }

    fn order_unload(&mut self, carrier: EntityId, passenger: EntityId) -> CommandResult {
        self.require_owned(carrier)?;
        let carrier_pos = {
            let c = self.entities.get_mut(&carrier).expect("carrier exists");
            c.loaded.retain(|&u| u != passenger);
            c.pos
        };
        if let Some(p) = self.entities.get_mut(&passenger) {
            p.is_loaded = false;
            p.idle = true;
            p.order = Order::Idle;
            p.pos = carrier_pos;
        }
        Ok(())
    }
}

impl Placer for SimWorld {
    /// Spiral outward from the requested tile to the first free spot.
    fn build_location_near(&self, near: TilePos, _structure: StructureTypeId) -> Option<TilePos> {
        let occupied: HashSet<TilePos> = self
            .entities
            .values()
            .filter(|e| matches!(e.entity_type, EntityType::Structure(_)))
            .map(|e| e.pos.to_tile())
            .collect();
        for radius in 1..=8 {
            for dx in -radius..=radius {
                for dy in -radius..=radius {
                    let tile = TilePos::new(near.x + dx, near.y + dy);
                    if tile.x < 1
                        || tile.y < 1
                        || tile.x >= self.map.width - 1
                        || tile.y >= self.map.height - 1
                    {
                        continue;
                    }
                    if !occupied.contains(&tile) {
                        return Some(tile);
                    }
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> SimWorld {
        SimWorld::from_scenario(&Scenario::default())
    }

    #[test]
    fn test_scenario_spawns_both_sides() {
        let world = world();
        assert!(!world.owned().is_empty());
        assert!(!world.enemy_eliminated());
    }

    #[test]
    fn test_worker_walks_and_builds_over_time() {
        let mut world = world();
        let worker = world
            .owned()
            .into_iter()
            .find(|&id| {
                world
                    .view(id)
                    .is_some_and(|v| v.entity_type == EntityType::Unit(faction::FABRICATOR))
            })
            .expect("worker");
        let site = world
            .build_location_near(world.view(worker).unwrap().position.to_tile(), faction::SUPPLY_CACHE)
            .expect("site");
        world
            .order_build(worker, faction::SUPPLY_CACHE, site)
            .unwrap();

        // Walk, raise, complete.
        for _ in 0..1000 {
            world.tick();
            if world.stats.structures_completed > 0 {
                break;
            }
        }
        assert_eq!(world.stats.structures_completed, 1);
        // The builder is free again.
        assert!(world.view(worker).unwrap().idle);
    }

    #[test]
    fn test_training_consumes_resources_and_spawns() {
        let mut world = world();
        let depot = world
            .owned()
            .into_iter()
            .find(|&id| {
                world
                    .view(id)
                    .is_some_and(|v| v.entity_type == EntityType::Structure(faction::COMMAND_POST))
            })
            .expect("depot");
        let before = world.ledger().unallocated().minerals;
        world.order_train(depot, faction::FABRICATOR).unwrap();
        assert!(world.ledger().unallocated().minerals < before);

        for _ in 0..200 {
            world.tick();
        }
        assert_eq!(world.stats.units_trained, 1);
    }

    #[test]
    fn test_supply_projection_demands_providers() {
        let mut world = world();
        // An army large enough to push projected usage past the depot's
        // supply.
        for i in 0..5 {
            world.spawn_unit(faction::TROOPER, TilePos::new(8 + i, 8), false);
        }
        let ledger = world.ledger();
        assert!(ledger.supply_providers_needed(0) > 0);
        // Enqueued providers net out of the requirement.
        assert_eq!(ledger.supply_providers_needed(3), 0);
    }

    #[test]
    fn test_fog_hides_enemy_until_scouted() {
        let mut world = world();
        assert!(world.visible_enemies().is_empty());
        assert!(world.opponent_faction().is_none());

        // March a worker to the enemy base.
        let worker = world
            .owned()
            .into_iter()
            .find(|&id| {
                world
                    .view(id)
                    .is_some_and(|v| v.entity_type == EntityType::Unit(faction::FABRICATOR))
            })
            .expect("worker");
        world
            .order_move(worker, Vec2Fixed::from_tiles(56, 56))
            .unwrap();
        for _ in 0..2000 {
            world.tick();
            if !world.visible_enemies().is_empty() {
                break;
            }
        }
        assert!(!world.visible_enemies().is_empty());
        assert_eq!(world.opponent_faction(), Some(faction::ENEMY_FACTION));
    }
}
