//! Demo faction data for headless runs.
//!
//! The same tech tree the decision layer is tested against: one
//! worker line, an infantry branch behind the muster yard, and a
//! siege branch behind the vehicle plant and its machine bay.

use std::collections::HashMap;

use marshal_core::catalog::{
    FactionId, Requirement, StructureSpec, StructureTypeId, TechId, TechSpec, TypeCatalog,
    UnitSpec, UnitTypeId,
};
use marshal_core::config::Doctrine;
use marshal_core::goals::GoalTarget;
use marshal_core::ledger::Resources;

/// The faction the bot plays.
pub const FACTION: FactionId = FactionId::new(0);
/// The scripted opposition.
pub const ENEMY_FACTION: FactionId = FactionId::new(1);

/// Worker unit.
pub const FABRICATOR: UnitTypeId = UnitTypeId::new(1);
/// Basic infantry.
pub const TROOPER: UnitTypeId = UnitTypeId::new(2);
/// Siege unit.
pub const CRUSHER: UnitTypeId = UnitTypeId::new(3);

/// Resource depot.
pub const COMMAND_POST: StructureTypeId = StructureTypeId::new(10);
/// Supply provider.
pub const SUPPLY_CACHE: StructureTypeId = StructureTypeId::new(11);
/// Gas extractor.
pub const EXTRACTOR: StructureTypeId = StructureTypeId::new(12);
/// Garrison structure.
pub const BUNKER: StructureTypeId = StructureTypeId::new(13);
/// Infantry production.
pub const MUSTER_YARD: StructureTypeId = StructureTypeId::new(14);
/// Vehicle production.
pub const VEHICLE_PLANT: StructureTypeId = StructureTypeId::new(15);
/// Vehicle plant attachment.
pub const MACHINE_BAY: StructureTypeId = StructureTypeId::new(16);
/// Static detection.
pub const SENSOR_TOWER: StructureTypeId = StructureTypeId::new(17);
/// Enemy depot.
pub const ENEMY_HQ: StructureTypeId = StructureTypeId::new(30);
/// Enemy combat unit.
pub const ENEMY_RAIDER: UnitTypeId = UnitTypeId::new(32);

/// Siege tech.
pub const SIEGE_PROTOCOL: TechId = TechId::new(1);

/// Neutral mineral node; never registered in the catalog.
pub const MINERAL_NODE: StructureTypeId = StructureTypeId::new(90);
/// Neutral vespene geyser; never registered in the catalog.
pub const GEYSER: StructureTypeId = StructureTypeId::new(91);

/// Catalog for the demo faction plus the scripted opposition.
#[must_use]
pub fn catalog() -> TypeCatalog {
    let mut catalog = TypeCatalog::new();

    catalog.register_unit(
        UnitSpec::new(FABRICATOR, "Fabricator", Resources::minerals(50), FACTION)
            .with_build_time(80)
            .worker(),
    );
    catalog.register_unit(
        UnitSpec::new(TROOPER, "Trooper", Resources::minerals(50), FACTION)
            .with_build_time(100)
            .combat(),
    );
    catalog.register_unit(
        UnitSpec::new(CRUSHER, "Crusher", Resources::new(150, 100), FACTION)
            .with_build_time(200)
            .with_supply(2)
            .combat()
            .needs_attachment(),
    );

    catalog.register_structure(
        StructureSpec::new(COMMAND_POST, "Command Post", Resources::minerals(400), FACTION)
            .with_build_time(600)
            .depot()
            .provides_supply(10)
            .with_trains(vec![FABRICATOR]),
    );
    catalog.register_structure(
        StructureSpec::new(SUPPLY_CACHE, "Supply Cache", Resources::minerals(100), FACTION)
            .with_build_time(200)
            .provides_supply(8),
    );
    catalog.register_structure(
        StructureSpec::new(EXTRACTOR, "Extractor", Resources::minerals(75), FACTION)
            .with_build_time(150)
            .extractor(),
    );
    catalog.register_structure(
        StructureSpec::new(BUNKER, "Bunker", Resources::minerals(100), FACTION)
            .with_build_time(150)
            .garrison(4)
            .with_requires(vec![Requirement::Structure(MUSTER_YARD)]),
    );
    catalog.register_structure(
        StructureSpec::new(MUSTER_YARD, "Muster Yard", Resources::minerals(150), FACTION)
            .with_build_time(300)
            .with_trains(vec![TROOPER])
            .with_requires(vec![Requirement::Structure(COMMAND_POST)]),
    );
    catalog.register_structure(
        StructureSpec::new(VEHICLE_PLANT, "Vehicle Plant", Resources::new(200, 100), FACTION)
            .with_build_time(400)
            .with_trains(vec![CRUSHER])
            .with_requires(vec![Requirement::Structure(MUSTER_YARD)]),
    );
    catalog.register_structure(
        StructureSpec::new(MACHINE_BAY, "Machine Bay", Resources::new(50, 50), FACTION)
            .with_build_time(150)
            .attachment_of(VEHICLE_PLANT)
            .with_researches(vec![SIEGE_PROTOCOL])
            .with_requires(vec![Requirement::Structure(VEHICLE_PLANT)]),
    );
    catalog.register_structure(
        StructureSpec::new(SENSOR_TOWER, "Sensor Tower", Resources::minerals(75), FACTION)
            .with_build_time(120),
    );

    catalog.register_structure(
        StructureSpec::new(ENEMY_HQ, "Headquarters", Resources::minerals(400), ENEMY_FACTION)
            .depot(),
    );
    catalog.register_unit(
        UnitSpec::new(ENEMY_RAIDER, "Raider", Resources::minerals(50), ENEMY_FACTION).combat(),
    );

    catalog.register_tech(
        TechSpec::new(
            SIEGE_PROTOCOL,
            "Siege Protocol",
            Resources::new(150, 150),
            FACTION,
            MACHINE_BAY,
        )
        .with_build_time(250)
        .with_requires(vec![Requirement::Structure(MACHINE_BAY)]),
    );

    catalog
}

/// Doctrine for the demo faction.
#[must_use]
pub fn doctrine() -> Doctrine {
    let mut opening_vs = HashMap::new();
    opening_vs.insert(
        ENEMY_FACTION,
        vec![
            GoalTarget::Structure(VEHICLE_PLANT),
            GoalTarget::Structure(MACHINE_BAY),
            GoalTarget::Research(SIEGE_PROTOCOL),
        ],
    );
    Doctrine {
        faction: FACTION,
        worker: FABRICATOR,
        supply_structure: SUPPLY_CACHE,
        extractor: EXTRACTOR,
        garrison_structure: BUNKER,
        garrison_unit: TROOPER,
        siege_unit: CRUSHER,
        surplus_structure: MUSTER_YARD,
        rush_response: BUNKER,
        cloak_tell: None,
        opening_common: vec![GoalTarget::Structure(MUSTER_YARD)],
        opening_vs,
    }
}
