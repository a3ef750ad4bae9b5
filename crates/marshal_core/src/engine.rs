//! Engine boundary: world observation and order issuance.
//!
//! The decision layer runs against any implementation of [`Engine`] and
//! [`Placer`]. Entity references are plain handles; they confer no
//! ownership and may go stale at any time. Every read goes through
//! [`Engine::view`], which fuses the liveness check with the snapshot -
//! a dead handle yields `None`, never garbage.

use serde::{Deserialize, Serialize};

use crate::catalog::{FactionId, StructureTypeId, TechId, UnitTypeId};
use crate::error::CommandResult;
use crate::math::{TilePos, Vec2Fixed};

/// Monotonically increasing engine frame counter.
///
/// All deadlines in the decision layer are plain comparisons against
/// this value.
pub type Tick = u64;

/// Opaque handle to a world entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl EntityId {
    /// Create a new entity handle.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

/// What kind of thing an entity is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityType {
    /// A mobile unit.
    Unit(UnitTypeId),
    /// A structure.
    Structure(StructureTypeId),
}

impl EntityType {
    /// The unit type, if this is a unit.
    #[must_use]
    pub const fn as_unit(self) -> Option<UnitTypeId> {
        match self {
            Self::Unit(id) => Some(id),
            Self::Structure(_) => None,
        }
    }

    /// The structure type, if this is a structure.
    #[must_use]
    pub const fn as_structure(self) -> Option<StructureTypeId> {
        match self {
            Self::Structure(id) => Some(id),
            Self::Unit(_) => None,
        }
    }
}

/// The order an entity is currently executing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Order {
    /// No current order.
    #[default]
    Idle,
    /// Moving to a position.
    Move(Vec2Fixed),
    /// Attack-moving to a position.
    AttackMove(Vec2Fixed),
    /// Attacking a specific entity.
    AttackUnit(EntityId),
    /// Gathering from a resource node or extractor.
    Gather(EntityId),
    /// Returning carried resources to a depot.
    ReturnCargo,
    /// En route to or placing a structure.
    Construct {
        /// Structure type being built.
        structure: StructureTypeId,
        /// Chosen build site.
        site: TilePos,
    },
    /// Researching a tech (structures only).
    Research(TechId),
    /// Training a unit (structures only).
    Train,
    /// Entering a transport or garrison structure.
    EnterTransport(EntityId),
    /// Anything the decision layer does not reason about.
    Other,
}

/// One-read snapshot of a live entity.
///
/// Obtained from [`Engine::view`]; valid only for the current tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitView {
    /// The entity this snapshot describes.
    pub id: EntityId,
    /// Unit or structure type.
    pub entity_type: EntityType,
    /// True for entities owned by an opponent.
    pub hostile: bool,
    /// World position.
    pub position: Vec2Fixed,
    /// Finished training or construction.
    pub completed: bool,
    /// A worker currently executing a build order, or a structure
    /// still being raised.
    pub constructing: bool,
    /// Unable to act: disabled, unpowered, stuck, or held in a
    /// transport.
    pub disabled: bool,
    /// No current order.
    pub idle: bool,
    /// Current order.
    pub order: Order,
    /// Structure this worker is raising, once physically started.
    pub build_target: Option<EntityId>,
    /// Worker currently raising this structure.
    pub builder: Option<EntityId>,
    /// Completed or in-progress attachment on this structure.
    pub attachment: Option<EntityId>,
    /// Training queue (front entry is in progress).
    pub training: Vec<UnitTypeId>,
    /// Tech being researched, if any.
    pub researching: Option<TechId>,
    /// Entities garrisoned inside this structure or transport.
    pub loaded: Vec<EntityId>,
    /// True while this unit sits inside a transport or garrison.
    pub is_loaded: bool,
    /// Carrying harvested resources.
    pub carrying: bool,
    /// Actively gathering minerals.
    pub gathering_minerals: bool,
    /// Actively gathering gas.
    pub gathering_gas: bool,
}

impl UnitView {
    /// True when the entity can accept orders this tick.
    #[must_use]
    pub fn is_operable(&self) -> bool {
        self.completed && !self.constructing && !self.disabled
    }

    /// True for workers that can be pulled for a new job without
    /// wasting anything already committed: idle or merely harvesting.
    #[must_use]
    pub fn is_interruptible(&self) -> bool {
        self.idle || self.gathering_minerals || self.gathering_gas
    }

    /// True while executing any form of attack order.
    #[must_use]
    pub const fn is_attacking(&self) -> bool {
        matches!(self.order, Order::AttackMove(_) | Order::AttackUnit(_))
    }

    /// True for structure entities.
    #[must_use]
    pub const fn is_structure(&self) -> bool {
        matches!(self.entity_type, EntityType::Structure(_))
    }
}

/// Static map facts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapInfo {
    /// Map width in tiles.
    pub width: i32,
    /// Map height in tiles.
    pub height: i32,
    /// Declared start locations, including our own.
    pub start_locations: Vec<TilePos>,
}

/// World observation and command issuance.
///
/// Observation methods are snapshots of the current tick; command
/// methods may fail with an engine-reported reason and are safe to
/// retry on a later tick.
pub trait Engine {
    /// Current frame counter.
    fn now(&self) -> Tick;

    /// Static map facts.
    fn map(&self) -> &MapInfo;

    /// Whether a tile has been seen at least once.
    fn is_explored(&self, tile: TilePos) -> bool;

    /// Handles of all entities we own.
    fn owned(&self) -> Vec<EntityId>;

    /// Handles of all currently visible hostile entities.
    fn visible_enemies(&self) -> Vec<EntityId>;

    /// Liveness check fused with a state read. `None` means the handle
    /// is stale.
    fn view(&self, id: EntityId) -> Option<UnitView>;

    /// The opponent's faction, once identified.
    fn opponent_faction(&self) -> Option<FactionId>;

    /// Whether we own a completed research of `tech`.
    fn has_tech(&self, tech: TechId) -> bool;

    /// Visible hostile entities within `radius_tiles` of `center`.
    fn enemies_near(&self, center: Vec2Fixed, radius_tiles: i32) -> Vec<EntityId>;

    /// Owned entities within `radius_tiles` of `center`.
    fn owned_near(&self, center: Vec2Fixed, radius_tiles: i32) -> Vec<EntityId>;

    /// Nearest harvestable mineral node to `near`.
    fn closest_mineral_node(&self, near: EntityId) -> Option<EntityId>;

    /// Nearest unclaimed geyser to `near`.
    fn closest_geyser(&self, near: EntityId) -> Option<EntityId>;

    /// Nearest owned extractor to `near`.
    fn closest_own_extractor(&self, near: EntityId) -> Option<EntityId>;

    /// A scatter destination for blind searching. Implementations may
    /// randomize; deterministic engines cycle preset positions.
    fn scatter_position(&mut self) -> Vec2Fixed;

    /// Order a plain move.
    fn order_move(&mut self, unit: EntityId, to: Vec2Fixed) -> CommandResult;

    /// Order an attack-move: engage anything encountered on the way.
    fn order_attack_move(&mut self, unit: EntityId, to: Vec2Fixed) -> CommandResult;

    /// Order an attack on a specific entity.
    fn order_attack(&mut self, unit: EntityId, target: EntityId) -> CommandResult;

    /// Order gathering from a node or extractor.
    fn order_gather(&mut self, unit: EntityId, node: EntityId) -> CommandResult;

    /// Order carried resources returned to the nearest depot.
    fn order_return_cargo(&mut self, unit: EntityId) -> CommandResult;

    /// Cancel the unit's current activity.
    fn order_stop(&mut self, unit: EntityId) -> CommandResult;

    /// Order a worker to build `structure` at `site`.
    fn order_build(
        &mut self,
        worker: EntityId,
        structure: StructureTypeId,
        site: TilePos,
    ) -> CommandResult;

    /// Order a worker to resume raising an abandoned structure.
    fn order_resume_build(&mut self, worker: EntityId, structure: EntityId) -> CommandResult;

    /// Order a structure to train a unit.
    fn order_train(&mut self, structure: EntityId, unit: UnitTypeId) -> CommandResult;

    /// Cancel the front entry of a structure's training queue.
    fn order_cancel_train(&mut self, structure: EntityId) -> CommandResult;

    /// Order a structure to research a tech.
    fn order_research(&mut self, structure: EntityId, tech: TechId) -> CommandResult;

    /// Order a structure to raise an attachment on itself.
    fn order_build_attachment(
        &mut self,
        structure: EntityId,
        attachment: StructureTypeId,
    ) -> CommandResult;

    /// Order a garrison or transport to load a unit.
    fn order_load(&mut self, carrier: EntityId, passenger: EntityId) -> CommandResult;

    /// Order a garrison or transport to unload a unit.
    fn order_unload(&mut self, carrier: EntityId, passenger: EntityId) -> CommandResult;
}

/// Build-site resolution collaborator.
pub trait Placer {
    /// A legal build coordinate for `structure` near `near`, or `None`
    /// when no legal placement exists.
    fn build_location_near(&self, near: TilePos, structure: StructureTypeId) -> Option<TilePos>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StructureTypeId;

    fn bare_view(id: u64) -> UnitView {
        UnitView {
            id: EntityId::new(id),
            entity_type: EntityType::Unit(UnitTypeId(1)),
            hostile: false,
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

    #[test]
    fn test_operable_requires_completion() {
        let mut view = bare_view(1);
        assert!(view.is_operable());
        view.completed = false;
        assert!(!view.is_operable());
    }

    #[test]
    fn test_interruptible_covers_harvesting() {
        let mut view = bare_view(1);
        view.idle = false;
        assert!(!view.is_interruptible());
        view.gathering_minerals = true;
        assert!(view.is_interruptible());
    }

    #[test]
    fn test_entity_type_accessors() {
        let unit = EntityType::Unit(UnitTypeId(3));
        let structure = EntityType::Structure(StructureTypeId(10));
        assert_eq!(unit.as_unit(), Some(UnitTypeId(3)));
        assert_eq!(unit.as_structure(), None);
        assert_eq!(structure.as_structure(), Some(StructureTypeId(10)));
    }
}
