//! Type catalog: data-driven unit, structure, and tech definitions.
//!
//! The decision layer never hard-codes game content. Everything it
//! needs to know about a producible type - cost, faction, what trains
//! it, what it requires - lives in a [`TypeCatalog`] supplied by the
//! embedding application.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ledger::Resources;

/// Unique identifier for unit types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitTypeId(pub u32);

impl UnitTypeId {
    /// Create a new unit type ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }
}

/// Unique identifier for structure types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StructureTypeId(pub u32);

impl StructureTypeId {
    /// Create a new structure type ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }
}

/// Unique identifier for researchable technologies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TechId(pub u32);

impl TechId {
    /// Create a new tech ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }
}

/// Identifier for a playable faction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FactionId(pub u8);

impl FactionId {
    /// Create a new faction ID.
    #[must_use]
    pub const fn new(id: u8) -> Self {
        Self(id)
    }
}

/// A prerequisite for producing a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Requirement {
    /// An owned structure of this type must exist or be in flight.
    Structure(StructureTypeId),
    /// This tech must be owned or in flight.
    Tech(TechId),
}

/// Definition of a mobile unit type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitSpec {
    /// Unique identifier for this unit type.
    pub id: UnitTypeId,
    /// Display name.
    pub name: String,
    /// Resource cost to train.
    pub cost: Resources,
    /// Time in ticks to train this unit.
    pub build_time: u32,
    /// Supply consumed by one unit.
    pub supply_cost: u32,
    /// Faction this type belongs to.
    pub faction: FactionId,
    /// True for worker-class units (harvest, build, scout).
    pub is_worker: bool,
    /// True for combat-capable units tracked by the military roster.
    pub is_combat: bool,
    /// The producing structure must carry a completed attachment.
    pub requires_attachment: bool,
}

impl UnitSpec {
    /// Create a new unit spec.
    #[must_use]
    pub fn new(id: UnitTypeId, name: impl Into<String>, cost: Resources, faction: FactionId) -> Self {
        Self {
            id,
            name: name.into(),
            cost,
            build_time: 60,
            supply_cost: 1,
            faction,
            is_worker: false,
            is_combat: false,
            requires_attachment: false,
        }
    }

    /// Set the training time.
    #[must_use]
    pub fn with_build_time(mut self, ticks: u32) -> Self {
        self.build_time = ticks;
        self
    }

    /// Set the supply cost.
    #[must_use]
    pub fn with_supply(mut self, supply: u32) -> Self {
        self.supply_cost = supply;
        self
    }

    /// Mark this type as a worker.
    #[must_use]
    pub fn worker(mut self) -> Self {
        self.is_worker = true;
        self
    }

    /// Mark this type as combat-capable.
    #[must_use]
    pub fn combat(mut self) -> Self {
        self.is_combat = true;
        self
    }

    /// Require the producing structure to carry a completed attachment.
    #[must_use]
    pub fn needs_attachment(mut self) -> Self {
        self.requires_attachment = true;
        self
    }
}

/// Definition of a structure type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructureSpec {
    /// Unique identifier for this structure type.
    pub id: StructureTypeId,
    /// Display name.
    pub name: String,
    /// Resource cost to build.
    pub cost: Resources,
    /// Time in ticks to raise this structure.
    pub build_time: u32,
    /// Faction this type belongs to.
    pub faction: FactionId,
    /// True for the primary resource depot (town-hall class).
    pub is_depot: bool,
    /// Supply granted when completed (0 for non-providers).
    pub supply_provided: u32,
    /// True for gas-extraction structures built on geysers.
    pub is_extractor: bool,
    /// Garrison capacity for bunker-class structures.
    pub garrison_capacity: Option<u32>,
    /// Parent type for attachment structures; the parent builds them.
    pub attached_to: Option<StructureTypeId>,
    /// Unit types this structure can train, in training priority order.
    pub trains: Vec<UnitTypeId>,
    /// Techs this structure can research.
    pub researches: Vec<TechId>,
    /// Prerequisites that must be satisfied before building this type.
    pub requires: Vec<Requirement>,
}

impl StructureSpec {
    /// Create a new structure spec.
    #[must_use]
    pub fn new(
        id: StructureTypeId,
        name: impl Into<String>,
        cost: Resources,
        faction: FactionId,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            cost,
            build_time: 100,
            faction,
            is_depot: false,
            supply_provided: 0,
            is_extractor: false,
            garrison_capacity: None,
            attached_to: None,
            trains: Vec::new(),
            researches: Vec::new(),
            requires: Vec::new(),
        }
    }

    /// Set the construction time.
    #[must_use]
    pub fn with_build_time(mut self, ticks: u32) -> Self {
        self.build_time = ticks;
        self
    }

    /// Mark this type as a resource depot.
    #[must_use]
    pub fn depot(mut self) -> Self {
        self.is_depot = true;
        self
    }

    /// Set the supply this structure provides.
    #[must_use]
    pub fn provides_supply(mut self, supply: u32) -> Self {
        self.supply_provided = supply;
        self
    }

    /// Mark this type as a gas extractor.
    #[must_use]
    pub fn extractor(mut self) -> Self {
        self.is_extractor = true;
        self
    }

    /// Give this type a garrison with the given capacity.
    #[must_use]
    pub fn garrison(mut self, capacity: u32) -> Self {
        self.garrison_capacity = Some(capacity);
        self
    }

    /// Make this type an attachment built by `parent`.
    #[must_use]
    pub fn attachment_of(mut self, parent: StructureTypeId) -> Self {
        self.attached_to = Some(parent);
        self
    }

    /// Set the unit types this structure trains.
    #[must_use]
    pub fn with_trains(mut self, units: Vec<UnitTypeId>) -> Self {
        self.trains = units;
        self
    }

    /// Set the techs this structure researches.
    #[must_use]
    pub fn with_researches(mut self, techs: Vec<TechId>) -> Self {
        self.researches = techs;
        self
    }

    /// Set the prerequisites for building this type.
    #[must_use]
    pub fn with_requires(mut self, requires: Vec<Requirement>) -> Self {
        self.requires = requires;
        self
    }

    /// True when this structure is built by its parent, not by a worker.
    #[must_use]
    pub const fn is_attachment(&self) -> bool {
        self.attached_to.is_some()
    }
}

/// Definition of a researchable technology.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechSpec {
    /// Unique identifier for this tech.
    pub id: TechId,
    /// Display name.
    pub name: String,
    /// Resource cost to research.
    pub cost: Resources,
    /// Time in ticks to complete the research.
    pub build_time: u32,
    /// Faction this tech belongs to.
    pub faction: FactionId,
    /// Structure type that performs the research.
    pub researched_at: StructureTypeId,
    /// Prerequisites that must be satisfied before researching.
    pub requires: Vec<Requirement>,
}

impl TechSpec {
    /// Create a new tech spec.
    #[must_use]
    pub fn new(
        id: TechId,
        name: impl Into<String>,
        cost: Resources,
        faction: FactionId,
        researched_at: StructureTypeId,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            cost,
            build_time: 100,
            faction,
            researched_at,
            requires: Vec::new(),
        }
    }

    /// Set the research time.
    #[must_use]
    pub fn with_build_time(mut self, ticks: u32) -> Self {
        self.build_time = ticks;
        self
    }

    /// Set the prerequisites for this tech.
    #[must_use]
    pub fn with_requires(mut self, requires: Vec<Requirement>) -> Self {
        self.requires = requires;
        self
    }
}

/// Registry of all unit, structure, and tech definitions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeCatalog {
    units: HashMap<UnitTypeId, UnitSpec>,
    structures: HashMap<StructureTypeId, StructureSpec>,
    techs: HashMap<TechId, TechSpec>,
}

impl TypeCatalog {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a unit spec.
    pub fn register_unit(&mut self, spec: UnitSpec) {
        self.units.insert(spec.id, spec);
    }

    /// Register a structure spec.
    pub fn register_structure(&mut self, spec: StructureSpec) {
        self.structures.insert(spec.id, spec);
    }

    /// Register a tech spec.
    pub fn register_tech(&mut self, spec: TechSpec) {
        self.techs.insert(spec.id, spec);
    }

    /// Look up a unit spec.
    #[must_use]
    pub fn unit(&self, id: UnitTypeId) -> Option<&UnitSpec> {
        self.units.get(&id)
    }

    /// Look up a structure spec.
    #[must_use]
    pub fn structure(&self, id: StructureTypeId) -> Option<&StructureSpec> {
        self.structures.get(&id)
    }

    /// Look up a tech spec.
    #[must_use]
    pub fn tech(&self, id: TechId) -> Option<&TechSpec> {
        self.techs.get(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structure_spec_builders() {
        let faction = FactionId::new(0);
        let spec = StructureSpec::new(
            StructureTypeId(13),
            "Bunker",
            Resources::minerals(100),
            faction,
        )
        .garrison(4)
        .with_requires(vec![Requirement::Structure(StructureTypeId(14))]);

        assert_eq!(spec.garrison_capacity, Some(4));
        assert_eq!(spec.requires.len(), 1);
        assert!(!spec.is_attachment());
    }

    #[test]
    fn test_attachment_flag() {
        let faction = FactionId::new(0);
        let spec = StructureSpec::new(
            StructureTypeId(16),
            "Machine Bay",
            Resources::new(50, 50),
            faction,
        )
        .attachment_of(StructureTypeId(15));

        assert!(spec.is_attachment());
        assert_eq!(spec.attached_to, Some(StructureTypeId(15)));
    }

    #[test]
    fn test_catalog_lookup() {
        let faction = FactionId::new(0);
        let mut catalog = TypeCatalog::new();
        catalog.register_unit(
            UnitSpec::new(UnitTypeId(1), "Fabricator", Resources::minerals(50), faction).worker(),
        );

        assert!(catalog.unit(UnitTypeId(1)).is_some());
        assert!(catalog.unit(UnitTypeId(99)).is_none());
        assert!(catalog.unit(UnitTypeId(1)).is_some_and(|u| u.is_worker));
    }
}
