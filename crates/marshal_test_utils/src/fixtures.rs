//! Test fixtures and helpers.
//!
//! A demo faction with a small but complete tech tree, plus the
//! doctrine and configuration the bot is exercised with in tests.

use std::collections::HashMap;

use fixed::types::I32F32;

use marshal_core::bot::Bot;
use marshal_core::catalog::{
    FactionId, Requirement, StructureSpec, StructureTypeId, TechId, TechSpec, TypeCatalog,
    UnitSpec, UnitTypeId,
};
use marshal_core::config::{BotConfig, Doctrine};
use marshal_core::goals::GoalTarget;
use marshal_core::ledger::Resources;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real decision code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// The faction under our control.
pub const FACTION: FactionId = FactionId::new(0);
/// The opposing faction.
pub const ENEMY_FACTION: FactionId = FactionId::new(1);

/// Worker unit.
pub const FABRICATOR: UnitTypeId = UnitTypeId::new(1);
/// Basic infantry, garrison-eligible.
pub const TROOPER: UnitTypeId = UnitTypeId::new(2);
/// Siege unit; training requires the machine bay attachment.
pub const CRUSHER: UnitTypeId = UnitTypeId::new(3);

/// Resource depot; trains fabricators.
pub const COMMAND_POST: StructureTypeId = StructureTypeId::new(10);
/// Supply provider.
pub const SUPPLY_CACHE: StructureTypeId = StructureTypeId::new(11);
/// Gas extractor, built on geysers.
pub const EXTRACTOR: StructureTypeId = StructureTypeId::new(12);
/// Garrison structure holding four troopers.
pub const BUNKER: StructureTypeId = StructureTypeId::new(13);
/// Infantry production structure.
pub const MUSTER_YARD: StructureTypeId = StructureTypeId::new(14);
/// Vehicle production structure.
pub const VEHICLE_PLANT: StructureTypeId = StructureTypeId::new(15);
/// Attachment of the vehicle plant; researches siege protocol.
pub const MACHINE_BAY: StructureTypeId = StructureTypeId::new(16);
/// Static detection.
pub const SENSOR_TOWER: StructureTypeId = StructureTypeId::new(17);

/// Enemy resource depot.
pub const ENEMY_HQ: StructureTypeId = StructureTypeId::new(30);
/// Enemy structure signaling cloak tech.
pub const ENEMY_SHRINE: StructureTypeId = StructureTypeId::new(31);
/// Basic enemy combat unit.
pub const ENEMY_RAIDER: UnitTypeId = UnitTypeId::new(32);

/// Tech enabling siege mode; researched at the machine bay.
pub const SIEGE_PROTOCOL: TechId = TechId::new(1);

/// Demo faction catalog covering every structure class the decision
/// layer distinguishes.
#[must_use]
pub fn demo_catalog() -> TypeCatalog {
    let mut catalog = TypeCatalog::new();

    catalog.register_unit(
        UnitSpec::new(FABRICATOR, "Fabricator", Resources::minerals(50), FACTION).worker(),
    );
    catalog.register_unit(
        UnitSpec::new(TROOPER, "Trooper", Resources::minerals(50), FACTION).combat(),
    );
    catalog.register_unit(
        UnitSpec::new(CRUSHER, "Crusher", Resources::new(150, 100), FACTION)
            .with_supply(2)
            .combat()
            .needs_attachment(),
    );

    catalog.register_structure(
        StructureSpec::new(COMMAND_POST, "Command Post", Resources::minerals(400), FACTION)
            .depot()
            .provides_supply(10)
            .with_trains(vec![FABRICATOR]),
    );
    catalog.register_structure(
        StructureSpec::new(SUPPLY_CACHE, "Supply Cache", Resources::minerals(100), FACTION)
            .provides_supply(8),
    );
    catalog.register_structure(
        StructureSpec::new(EXTRACTOR, "Extractor", Resources::minerals(75), FACTION).extractor(),
    );
    catalog.register_structure(
        StructureSpec::new(BUNKER, "Bunker", Resources::minerals(100), FACTION)
            .garrison(4)
            .with_requires(vec![Requirement::Structure(MUSTER_YARD)]),
    );
    catalog.register_structure(
        StructureSpec::new(MUSTER_YARD, "Muster Yard", Resources::minerals(150), FACTION)
            .with_trains(vec![TROOPER])
            .with_requires(vec![Requirement::Structure(COMMAND_POST)]),
    );
    catalog.register_structure(
        StructureSpec::new(VEHICLE_PLANT, "Vehicle Plant", Resources::new(200, 100), FACTION)
            .with_trains(vec![CRUSHER])
            .with_requires(vec![Requirement::Structure(MUSTER_YARD)]),
    );
    catalog.register_structure(
        StructureSpec::new(MACHINE_BAY, "Machine Bay", Resources::new(50, 50), FACTION)
            .attachment_of(VEHICLE_PLANT)
            .with_researches(vec![SIEGE_PROTOCOL])
            .with_requires(vec![Requirement::Structure(VEHICLE_PLANT)]),
    );
    catalog.register_structure(
        StructureSpec::new(SENSOR_TOWER, "Sensor Tower", Resources::minerals(75), FACTION),
    );

    catalog.register_structure(
        StructureSpec::new(ENEMY_HQ, "Headquarters", Resources::minerals(400), ENEMY_FACTION)
            .depot(),
    );
    catalog.register_structure(StructureSpec::new(
        ENEMY_SHRINE,
        "Shrine",
        Resources::minerals(150),
        ENEMY_FACTION,
    ));
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
        .with_requires(vec![Requirement::Structure(MACHINE_BAY)]),
    );

    catalog
}

/// Doctrine binding the demo catalog to the controllers.
#[must_use]
pub fn demo_doctrine() -> Doctrine {
    let mut opening_vs = HashMap::new();
    opening_vs.insert(
        ENEMY_FACTION,
        vec![
            GoalTarget::Structure(VEHICLE_PLANT),
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
        cloak_tell: Some((ENEMY_SHRINE, SENSOR_TOWER)),
        opening_common: vec![GoalTarget::Structure(MUSTER_YARD)],
        opening_vs,
    }
}

/// Default configuration used across tests.
#[must_use]
pub fn demo_config() -> BotConfig {
    BotConfig::default()
}

/// A bot wired to the demo catalog, doctrine, and configuration.
#[must_use]
pub fn demo_bot() -> Bot {
    Bot::new(demo_catalog(), demo_doctrine(), demo_config())
}
