//! Pre-defined simulation scenarios
//!
//! Each scenario builds a [`World`], runs it to its horizon and hands it
//! back for inspection.

use std::time::Duration;

use ferry_core::{SimTime, SimulationIdentity};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::contact::ContactPlan;
use crate::error::SimError;
use crate::world::{World, WorldConfig};

/// Two nodes; A holds a bundle for B before they ever meet
///
/// ```text
/// t=0   A creates a 512-byte bundle for B
/// t=10  A and B come into contact; A delivers directly
/// t=60  contact ends
/// ```
pub fn direct(config: WorldConfig) -> Result<World, SimError> {
    info!("=== Running direct delivery scenario ===");
    let (a, b) = (SimulationIdentity('A'), SimulationIdentity('B'));

    let mut world = World::new(WorldConfig {
        horizon: SimTime::from_secs(120),
        ..config
    });
    world.add_nodes([a, b])?;
    world.load_plan(&ContactPlan::new().with_window(10, 60, 'A', 'B')?)?;
    world.schedule_bundle(SimTime::ZERO, a, b, 512, Duration::from_secs(600))?;
    world.run();
    Ok(world)
}

/// Three nodes; B carries A's bundle to C
///
/// ```text
/// t=0   B meets C and learns a high predictability for C
/// t=15  A creates a bundle for C; A has never met C
/// t=20  A meets B; B's beacon makes B the best next hop for C
/// t=60  B meets C again and delivers
/// ```
pub fn relay(config: WorldConfig) -> Result<World, SimError> {
    info!("=== Running relay scenario ===");
    let (a, c) = (SimulationIdentity('A'), SimulationIdentity('C'));

    let mut world = World::new(WorldConfig {
        horizon: SimTime::from_secs(120),
        ..config
    });
    world.add_nodes(SimulationIdentity::range_to('C'))?;
    let plan = ContactPlan::new()
        .with_window(0, 10, 'B', 'C')?
        .with_window(20, 40, 'A', 'B')?
        .with_window(60, 80, 'B', 'C')?;
    world.load_plan(&plan)?;
    world.schedule_bundle(SimTime::from_secs(15), a, c, 512, Duration::from_secs(600))?;
    world.run();
    Ok(world)
}

/// Parameters of the randomized ring scenario
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RingParams {
    pub nodes: usize,
    pub bundles: usize,
    pub seed: u64,
    pub horizon: SimTime,
    pub bundle_size: usize,
    pub lifetime: Duration,
}

impl Default for RingParams {
    fn default() -> Self {
        Self {
            nodes: 6,
            bundles: 20,
            seed: 42,
            horizon: SimTime::from_secs(1800),
            bundle_size: 512,
            lifetime: Duration::from_secs(1200),
        }
    }
}

/// Nodes on a ring meeting their neighbors at random
///
/// Bundles between random pairs are created during the first half of the
/// run. The same seed always produces the same run.
pub fn ring(config: WorldConfig, params: &RingParams) -> Result<World, SimError> {
    info!(
        nodes = params.nodes,
        bundles = params.bundles,
        seed = params.seed,
        "=== Running ring scenario ==="
    );
    if params.nodes > 26 {
        return Err(SimError::TooManyNodes(params.nodes));
    }
    let ids: Vec<SimulationIdentity> = ('A'..='Z')
        .take(params.nodes)
        .map(SimulationIdentity)
        .collect();

    let mut rng = StdRng::seed_from_u64(params.seed);
    let plan = ContactPlan::random_ring(&ids, params.horizon, &mut rng)?;

    let mut world = World::new(WorldConfig {
        horizon: params.horizon,
        ..config
    });
    world.add_nodes(ids.iter().copied())?;
    world.load_plan(&plan)?;

    if ids.len() >= 2 {
        let window = (params.horizon.since_start().as_secs() / 2).max(1);
        for _ in 0..params.bundles {
            let from = ids[rng.random_range(0..ids.len())];
            let to = loop {
                let candidate = ids[rng.random_range(0..ids.len())];
                if candidate != from {
                    break candidate;
                }
            };
            let at = SimTime::from_secs(rng.random_range(0..window));
            world.schedule_bundle(at, from, to, params.bundle_size, params.lifetime)?;
        }
    }

    world.run();
    Ok(world)
}
