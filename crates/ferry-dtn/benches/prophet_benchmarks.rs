//! PRoPHET performance benchmarks
//!
//! Benchmarks for the hot paths of the router:
//! - Predictability updates and aging
//! - Best-candidate selection
//! - A full send cycle over many links and bundles
//! - Beacon encoding
//!
//! Run with: cargo bench -p ferry-dtn

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use std::time::Duration;

use ferry_core::{SimTime, SimulationIdentity};
use ferry_dtn::{
    Bundle, BundleId, HelloMessage, MockConvergenceLayer, PredictabilityTable, ProphetConfig,
    ProphetRouter,
};

// ============================================================================
// Helper Functions
// ============================================================================

fn make_id(c: char) -> SimulationIdentity {
    SimulationIdentity::new(c).unwrap()
}

fn peers(count: usize) -> Vec<SimulationIdentity> {
    (0..count)
        .map(|i| make_id((b'B' + (i % 24) as u8) as char))
        .collect()
}

fn make_bundle(dest: char, seq: u32) -> Bundle<SimulationIdentity> {
    Bundle::new(
        BundleId::new(make_id('A'), SimTime::ZERO, seq),
        make_id(dest),
        vec![0u8; 512],
        Duration::from_secs(3600),
    )
}

fn populated_table(peer_count: usize) -> PredictabilityTable<SimulationIdentity> {
    let mut table = PredictabilityTable::new(make_id('A'));
    let peers = peers(peer_count);
    let reports: Vec<(SimulationIdentity, f64)> =
        peers.iter().map(|p| (*p, 0.5)).collect();
    for peer in &peers {
        table.update_direct(peer, SimTime::ZERO);
        table.update_transitive(peer, &reports, SimTime::ZERO);
    }
    table
}

// ============================================================================
// Predictability Benchmarks
// ============================================================================

fn bench_predictability(c: &mut Criterion) {
    let mut group = c.benchmark_group("predictability");

    group.bench_function("update_direct", |b| {
        let mut table = PredictabilityTable::new(make_id('A'));
        let peer = make_id('B');
        b.iter(|| table.update_direct(black_box(&peer), SimTime::ZERO))
    });

    let reports: Vec<(SimulationIdentity, f64)> =
        peers(24).into_iter().map(|p| (p, 0.4)).collect();
    group.bench_function("update_transitive_24_reports", |b| {
        let mut table = populated_table(24);
        let peer = make_id('B');
        b.iter(|| table.update_transitive(black_box(&peer), black_box(&reports), SimTime::ZERO))
    });

    group.bench_function("age_24_neighbors", |b| {
        let mut table = populated_table(24);
        let mut now = SimTime::ZERO;
        b.iter(|| {
            now += Duration::from_secs(10);
            table.age(black_box(now))
        })
    });

    let table = populated_table(24);
    let neighbors = peers(24);
    group.bench_function("best_candidate_24_neighbors", |b| {
        let dest = make_id('Z');
        b.iter(|| table.best_candidate(black_box(&neighbors), black_box(&dest)))
    });

    group.finish();
}

// ============================================================================
// Send Cycle Benchmarks
// ============================================================================

fn bench_send_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("send_cycle");

    for (links, bundles) in [(4usize, 50u32), (16, 200)] {
        group.bench_function(format!("select_{}_links_{}_bundles", links, bundles), |b| {
            b.iter_with_setup(
                || {
                    let mut router = ProphetRouter::new(
                        make_id('A'),
                        ProphetConfig::default(),
                        MockConvergenceLayer::new(),
                    );
                    for peer in peers(links) {
                        let address = router.transport_mut().add_link(peer);
                        router.on_link_discovered(address, SimTime::ZERO);
                        router.on_hello(
                            &HelloMessage {
                                sender: peer,
                                predictabilities: vec![(make_id('Z'), 0.5)],
                            },
                            SimTime::ZERO,
                        );
                    }
                    for seq in 0..bundles {
                        let _ = router.originate(make_bundle('Z', seq), SimTime::ZERO);
                    }
                    router
                },
                |mut router| {
                    router.try_to_send(black_box(SimTime::ZERO));
                    router
                },
            )
        });
    }

    group.finish();
}

// ============================================================================
// Beacon Benchmarks
// ============================================================================

fn bench_hello_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("hello_codec");

    let hello = HelloMessage {
        sender: make_id('A'),
        predictabilities: peers(24).into_iter().map(|p| (p, 0.3)).collect(),
    };
    let bytes = hello.to_bytes().unwrap();

    group.bench_function("encode_24_entries", |b| b.iter(|| black_box(&hello).to_bytes()));
    group.bench_function("decode_24_entries", |b| {
        b.iter(|| HelloMessage::<SimulationIdentity>::from_bytes(black_box(&bytes)))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_predictability,
    bench_send_cycle,
    bench_hello_codec
);
criterion_main!(benches);
