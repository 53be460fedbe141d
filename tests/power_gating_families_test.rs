//! One end-to-end smoke test per power-gating family (spec.md section 8
//! scenarios 2 and 3): a seeded mesh with a fraction of routers parked
//! must keep delivering traffic without the simulation returning an
//! invariant error, regardless of which family is driving the parking.

use pgnet_sim::{Config, Network, SimLogger};

fn mesh_config(k: usize, powergate_type: &str, percentile: usize, seed: u64) -> Config {
    SimLogger::init();
    let mut cfg = Config::new();
    cfg.set("k", k)
        .set("n", 2usize)
        .set("vc", 2usize)
        .set("classes", 1usize)
        .set("injection_rate", 0.3)
        .set("powergate_type", powergate_type)
        .set("powergate_percentile", percentile)
        .set("powergate_seed", seed as usize)
        .set("idle_threshold", 20usize)
        .set("drain_threshold", 50usize)
        .set("bet_threshold", 20usize);
    cfg
}

/// Scenario 2: 8x8 mesh, 20% parked, FLOV fly-over keeps packets moving
/// through parked routers instead of stalling behind them.
#[test]
fn flov_8x8_with_parked_routers_delivers_traffic() {
    let cfg = mesh_config(8, "flov", 20, 42);
    let mut net = Network::from_config(&cfg).unwrap();
    net.run(400).unwrap();
    assert!(net.report().total_accepted > 0);
}

/// Scenario 3: 8x8 mesh, 30% parked, Router Parking aggressive mode falls
/// back to the escape table when the shortest path is disconnected.
#[test]
fn rp_aggressive_8x8_with_parked_routers_delivers_traffic() {
    let cfg = mesh_config(8, "rpa", 30, 7);
    let mut net = Network::from_config(&cfg).unwrap();
    net.run(400).unwrap();
    assert!(net.report().total_accepted > 0);
}

#[test]
fn rp_conservative_8x8_with_parked_routers_delivers_traffic() {
    let cfg = mesh_config(8, "rpc", 30, 7);
    let mut net = Network::from_config(&cfg).unwrap();
    net.run(400).unwrap();
    assert!(net.report().total_accepted > 0);
}

/// NoRD diverts packets whose dimension-order path crosses a parked
/// router onto the bypass ring instead of through the mesh pipeline.
#[test]
fn nord_8x8_with_parked_routers_delivers_traffic() {
    let cfg = mesh_config(8, "nord", 20, 3);
    let mut net = Network::from_config(&cfg).unwrap();
    net.run(400).unwrap();
    assert!(net.report().total_accepted > 0);
}

#[test]
fn rflov_and_gflov_variants_also_run_to_completion() {
    // noflov (fly-over forbidden) is excluded here: it has no surviving
    // datapath through a parked router, so it is only meaningful at
    // powergate_percentile 0, not alongside other parked-router scenarios.
    for kind in ["rflov", "gflov"] {
        let cfg = mesh_config(6, kind, 20, 11);
        let mut net = Network::from_config(&cfg).unwrap();
        net.run(200).unwrap();
        assert_eq!(net.cycle(), 200, "{kind} stalled before reaching the requested cycle count");
    }
}

/// no_flov disables the fly-over datapath entirely; it only makes sense to
/// exercise at percentile 0, where power-gating never routes through an
/// off router in the first place.
#[test]
fn noflov_with_nothing_parked_completes_traffic() {
    let cfg = mesh_config(6, "noflov", 0, 11);
    let mut net = Network::from_config(&cfg).unwrap();
    net.run(200).unwrap();
    assert_eq!(net.cycle(), 200);
}
