//! End-to-end decision loop tests against the scripted engine.
//!
//! Each test drives `Bot::on_frame` across several decision ticks,
//! standing in for game time with the fake engine's progression
//! helpers, and asserts on the orders that actually went out.

use marshal_core::military::AttackState;
use marshal_core::prelude::*;
use marshal_test_utils::fake_engine::{FakeEngine, FakeUnit, IssuedCommand};
use marshal_test_utils::fixtures::{
    demo_bot, BUNKER, COMMAND_POST, CRUSHER, ENEMY_HQ, FABRICATOR, MUSTER_YARD, SUPPLY_CACHE,
};

fn count_builds(engine: &FakeEngine, structure: StructureTypeId) -> usize {
    engine
        .commands()
        .iter()
        .filter(|c| matches!(c, IssuedCommand::Build { structure: s, .. } if *s == structure))
        .count()
}

#[test]
fn bootstrap_tick_trains_worker_and_sends_idle_workers_mining() {
    let mut bot = demo_bot();
    let mut engine = FakeEngine::new();
    let depot = engine.spawn(FakeUnit::structure(COMMAND_POST).at(2, 2));
    for i in 0..4 {
        engine.spawn(FakeUnit::unit(FABRICATOR).at(5 + i, 5));
    }
    engine.spawn_mineral_node(10, 5);
    engine.set_resources(Resources::minerals(500));

    let ledger = engine.ledger();
    engine.set_now(8);
    bot.on_frame(&mut engine, &ledger);

    assert!(engine
        .commands()
        .iter()
        .any(|c| matches!(c, IssuedCommand::Train { structure, .. } if *structure == depot)));
    let gathers = engine
        .commands()
        .iter()
        .filter(|c| matches!(c, IssuedCommand::Gather { .. }))
        .count();
    assert_eq!(gathers, 4);
}

#[test]
fn supply_pressure_queues_exactly_one_provider() {
    let mut bot = demo_bot();
    let mut engine = FakeEngine::new();
    engine.spawn(FakeUnit::structure(COMMAND_POST).at(2, 2));
    for i in 0..4 {
        engine.spawn(FakeUnit::unit(FABRICATOR).at(5 + i, 5));
    }
    engine.spawn_mineral_node(10, 5);
    engine.set_resources(Resources::minerals(500));
    engine.set_supply_needed(1);

    let ledger = engine.ledger();
    engine.set_now(32);
    bot.on_frame(&mut engine, &ledger);
    // One worker picked up the job; the spacing gate held the rest
    // back.
    assert_eq!(count_builds(&engine, SUPPLY_CACHE), 1);

    // Next tick the in-flight construction is counted against the
    // requirement, so no second provider is enqueued.
    let ledger = engine.ledger();
    engine.set_now(40);
    bot.on_frame(&mut engine, &ledger);
    assert_eq!(count_builds(&engine, SUPPLY_CACHE), 1);
}

#[test]
fn goal_lifecycle_survives_losing_its_builder() {
    let mut bot = demo_bot();
    let mut engine = FakeEngine::new();
    engine.spawn(FakeUnit::structure(COMMAND_POST).at(2, 2));
    let w1 = engine.spawn(FakeUnit::unit(FABRICATOR).at(5, 5));
    let w2 = engine.spawn(FakeUnit::unit(FABRICATOR).at(6, 5));
    engine.spawn_mineral_node(10, 5);
    engine.set_resources(Resources::minerals(500));

    let catalog = marshal_test_utils::fixtures::demo_catalog();
    bot.goals_mut()
        .add_goal(
            &catalog,
            marshal_test_utils::fixtures::FACTION,
            GoalTarget::Structure(BUNKER),
            false,
            1,
        )
        .unwrap();

    // The bunker needs a muster yard; reconciliation injects it ahead
    // and the first worker starts it.
    let ledger = engine.ledger();
    engine.set_now(64);
    bot.on_frame(&mut engine, &ledger);
    assert_eq!(count_builds(&engine, MUSTER_YARD), 1);
    assert_eq!(bot.goals().building().len(), 1);
    assert_eq!(bot.goals().building()[0].assignee, Some(w1));

    // Construction physically starts; after the grace period the
    // reconciler records the structure link. Income dries up so the
    // bunker stays parked at the front meanwhile.
    let site = engine.materialize_build(w1);
    engine.set_resources(Resources::ZERO);
    let ledger = engine.ledger();
    engine.set_now(120);
    bot.on_frame(&mut engine, &ledger);
    assert_eq!(bot.goals().building()[0].structure, Some(site));

    // The builder dies mid-construction. The surviving structure gets
    // a replacement builder instead of a full re-queue.
    engine.kill(w1);
    let ledger = engine.ledger();
    engine.set_now(128);
    bot.on_frame(&mut engine, &ledger);
    assert_eq!(bot.goals().building()[0].assignee, Some(w2));
    assert!(engine
        .commands()
        .iter()
        .any(|c| matches!(c, IssuedCommand::ResumeBuild { worker, structure }
            if *worker == w2 && *structure == site)));

    // Completion retires the goal; with income back, the bunker then
    // starts normally.
    engine.complete_structure(site);
    engine.set_resources(Resources::minerals(500));
    let ledger = engine.ledger();
    engine.set_now(200);
    bot.on_frame(&mut engine, &ledger);
    assert_eq!(count_builds(&engine, BUNKER), 1);
    assert_eq!(bot.goals().building().len(), 1);
    assert!(matches!(
        bot.goals().building()[0].target,
        GoalTarget::Structure(st) if st == BUNKER
    ));
}

#[test]
fn transient_rejection_is_retried_next_tick() {
    let mut bot = demo_bot();
    let mut engine = FakeEngine::new();
    let depot = engine.spawn(FakeUnit::structure(COMMAND_POST).at(2, 2));
    // Keep the depot busy so the worker's build order is the only
    // command attempted.
    engine.unit_mut(depot).idle = false;
    engine.unit_mut(depot).order = Order::Train;
    engine.spawn(FakeUnit::unit(FABRICATOR).at(5, 5));
    engine.set_resources(Resources::minerals(500));

    let catalog = marshal_test_utils::fixtures::demo_catalog();
    bot.goals_mut()
        .add_goal(
            &catalog,
            marshal_test_utils::fixtures::FACTION,
            GoalTarget::Structure(MUSTER_YARD),
            false,
            1,
        )
        .unwrap();

    engine.fail_next_command(CommandError::InsufficientResources);
    let ledger = engine.ledger();
    engine.set_now(64);
    bot.on_frame(&mut engine, &ledger);
    // The rejection left the goal at the front, untouched.
    assert_eq!(count_builds(&engine, MUSTER_YARD), 0);
    assert_eq!(bot.goals().pending().len(), 1);
    assert!(bot.goals().building().is_empty());

    let ledger = engine.ledger();
    engine.set_now(72);
    bot.on_frame(&mut engine, &ledger);
    assert_eq!(count_builds(&engine, MUSTER_YARD), 1);
    assert_eq!(bot.goals().building().len(), 1);
}

#[test]
fn siege_army_walks_the_attack_protocol_end_to_end() {
    let mut bot = demo_bot();
    let mut engine = FakeEngine::new();
    engine.spawn(FakeUnit::structure(COMMAND_POST).at(10, 10));
    for i in 0..4 {
        engine.spawn(FakeUnit::unit(CRUSHER).at(12 + i, 10));
    }
    let hq = engine.spawn(FakeUnit::structure(ENEMY_HQ).at(50, 50).hostile());
    let target = engine.view(hq).unwrap().position;

    // Tick 1: readiness flips to Attack, the enemy depot is acquired,
    // and the army starts gathering on its own centroid.
    let ledger = engine.ledger();
    engine.set_now(8);
    bot.on_frame(&mut engine, &ledger);
    assert_eq!(bot.military().tactic(), Tactic::Attack);
    assert!(matches!(
        bot.military().attack_state(),
        AttackState::Gathering { target: t, target_is_structure: true, .. } if t == target
    ));

    // Tick 2: the whole army is already inside the gather radius, so
    // quorum commits.
    let ledger = engine.ledger();
    engine.set_now(16);
    bot.on_frame(&mut engine, &ledger);
    assert!(matches!(
        bot.military().attack_state(),
        AttackState::Committed { .. }
    ));

    // Tick 3: the assault launches - every roster entry is thrown at
    // the remembered location and the long cooldown starts.
    engine.clear_commands();
    let ledger = engine.ledger();
    engine.set_now(24);
    bot.on_frame(&mut engine, &ledger);
    let assaults = engine
        .commands()
        .iter()
        .filter(|c| matches!(c, IssuedCommand::AttackMove { to, .. } if *to == target))
        .count();
    assert_eq!(assaults, 4);
    assert_eq!(bot.military().rally(), target);
    let expected_until = 24 + bot.config().cooldown_long;
    assert_eq!(
        bot.military().attack_state(),
        AttackState::Cooldown {
            until: expected_until
        }
    );

    // During cooldown the executor is a no-op.
    engine.clear_commands();
    let ledger = engine.ledger();
    engine.set_now(32);
    bot.on_frame(&mut engine, &ledger);
    assert!(!engine
        .commands()
        .iter()
        .any(|c| matches!(c, IssuedCommand::AttackMove { .. })));
}
