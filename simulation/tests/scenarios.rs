//! Multi-node scenarios run through the discrete-event world
//!
//! Covers direct delivery, relaying through a carrier, link failure during
//! a contact, and reproducibility of randomized runs.

use std::time::Duration;

use ferry_dtn::ProphetConfig;
use ferry_simulation::{
    ContactPlan, RingParams, SimError, SimTime, SimulationIdentity, World, WorldConfig, scenarios,
};

fn id(c: char) -> SimulationIdentity {
    SimulationIdentity::new(c).unwrap()
}

fn world(horizon: u64) -> World {
    World::new(WorldConfig {
        horizon: SimTime::from_secs(horizon),
        ..WorldConfig::default()
    })
}

// ============================================================================
// Canned scenarios
// ============================================================================

#[test]
fn test_direct_scenario_delivers() {
    let world = scenarios::direct(WorldConfig::default()).unwrap();
    let stats = world.stats();

    assert_eq!(stats.created, 1);
    assert_eq!(stats.delivered, 1);
    assert_eq!(stats.relayed, 0);

    // Contact opens at 10 s, the transfer takes 0.512 s
    assert_eq!(stats.average_latency(), Some(Duration::from_millis(10_512)));

    let a = world.node(id('A')).unwrap().router();
    assert!(a.store().is_empty(), "Final delivery removes the source copy");
}

#[test]
fn test_relay_scenario_uses_carrier() {
    let world = scenarios::relay(WorldConfig::default()).unwrap();
    let stats = world.stats();

    assert_eq!(stats.created, 1);
    assert_eq!(stats.delivered, 1);
    assert_eq!(stats.relayed, 1);

    let latency = stats.average_latency().unwrap();
    assert!(latency >= Duration::from_secs(45), "Delivered on the second B-C contact");
    assert!(latency < Duration::from_secs(50));

    let b = world.node(id('B')).unwrap().router();
    assert!(b.store().is_empty());
    assert_eq!(b.known_delivered().len(), 1);
}

#[test]
fn test_relay_needs_predictability() {
    // Without the first B-C contact, B looks no better than A for C
    let mut w = world(120);
    w.add_nodes(SimulationIdentity::range_to('C')).unwrap();
    let plan = ContactPlan::new()
        .with_window(20, 40, 'A', 'B')
        .unwrap()
        .with_window(60, 80, 'B', 'C')
        .unwrap();
    w.load_plan(&plan).unwrap();
    w.schedule_bundle(SimTime::from_secs(15), id('A'), id('C'), 512, Duration::from_secs(600))
        .unwrap();
    w.run();

    assert_eq!(w.stats().relayed, 0);
    assert_eq!(w.stats().delivered, 0);
    assert_eq!(w.node(id('A')).unwrap().router().store().len(), 1);
}

// ============================================================================
// Contact behavior
// ============================================================================

#[test]
fn test_bundle_expires_before_contact() {
    let mut w = world(60);
    w.add_nodes([id('A'), id('B')]).unwrap();
    w.load_plan(&ContactPlan::new().with_window(30, 40, 'A', 'B').unwrap())
        .unwrap();
    w.schedule_bundle(SimTime::ZERO, id('A'), id('B'), 100, Duration::from_secs(20))
        .unwrap();
    w.run();

    assert_eq!(w.stats().expired, 1);
    assert_eq!(w.stats().delivered, 0);
}

#[test]
fn test_interrupted_transfer_retried_on_next_contact() {
    let mut w = world(120);
    w.add_nodes([id('A'), id('B')]).unwrap();
    // 4000 bytes need 4 s; the first contact only lasts 2 s
    let plan = ContactPlan::new()
        .with_window(5, 7, 'A', 'B')
        .unwrap()
        .with_window(50, 70, 'A', 'B')
        .unwrap();
    w.load_plan(&plan).unwrap();
    w.schedule_bundle(SimTime::ZERO, id('A'), id('B'), 4000, Duration::from_secs(600))
        .unwrap();
    w.run();

    assert_eq!(w.stats().links_paused, 1);
    assert_eq!(w.stats().delivered, 1);
    assert_eq!(w.stats().average_latency(), Some(Duration::from_secs(54)));
}

#[test]
fn test_small_store_evicts_oldest() {
    let mut w = World::new(WorldConfig {
        router: ProphetConfig {
            max_bytes: 1000,
            ..ProphetConfig::default()
        },
        horizon: SimTime::from_secs(30),
        ..WorldConfig::default()
    });
    w.add_nodes([id('A'), id('B')]).unwrap();
    for second in 0..3 {
        w.schedule_bundle(
            SimTime::from_secs(second),
            id('A'),
            id('B'),
            400,
            Duration::from_secs(600),
        )
        .unwrap();
    }
    w.run();

    assert_eq!(w.stats().created, 3);
    assert_eq!(w.stats().evicted, 1);
    assert_eq!(w.node(id('A')).unwrap().router().store().len(), 2);
}

#[test]
fn test_local_destination_delivers_immediately() {
    let mut w = world(10);
    w.add_node(id('A')).unwrap();
    w.schedule_bundle(SimTime::from_secs(1), id('A'), id('A'), 10, Duration::from_secs(60))
        .unwrap();
    w.run();

    assert_eq!(w.stats().delivered, 1);
    assert_eq!(w.stats().average_latency(), Some(Duration::ZERO));
}

// ============================================================================
// Randomized runs
// ============================================================================

#[test]
fn test_ring_is_reproducible() {
    let params = RingParams {
        nodes: 5,
        bundles: 10,
        seed: 9,
        horizon: SimTime::from_secs(900),
        ..RingParams::default()
    };

    let first = scenarios::ring(WorldConfig::default(), &params).unwrap();
    let second = scenarios::ring(WorldConfig::default(), &params).unwrap();

    assert_eq!(first.stats(), second.stats());
    assert_eq!(first.stats().created, 10);
    assert!(first.stats().delivered <= first.stats().created);
}

#[test]
fn test_ring_rejects_too_many_nodes() {
    let params = RingParams {
        nodes: 27,
        ..RingParams::default()
    };
    assert!(matches!(
        scenarios::ring(WorldConfig::default(), &params),
        Err(SimError::TooManyNodes(27))
    ));
}
