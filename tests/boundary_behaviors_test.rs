//! Boundary behaviors named in spec.md section 8, exercised through the
//! public `Network`/`Config` surface the way a caller assembling a
//! simulation would.

use pgnet_sim::{Config, Network, SimLogger};

fn base_config(k: usize) -> Config {
    SimLogger::init();
    let mut cfg = Config::new();
    cfg.set("k", k).set("n", 2usize).set("vc", 2usize).set("classes", 1usize).set("injection_rate", 1.0);
    cfg
}

#[test]
fn powergate_percentile_zero_behaves_as_a_standard_mesh() {
    let mut cfg = base_config(4);
    cfg.set("powergate_type", "rpa").set("powergate_percentile", 0usize);
    let mut net = Network::from_config(&cfg).unwrap();
    net.run(100).unwrap();
    assert!(net.report().total_accepted > 0);
}

#[test]
fn one_by_one_mesh_self_loops_instead_of_hanging() {
    let mut cfg = base_config(1);
    cfg.set("k", 1usize);
    let mut net = Network::from_config(&cfg).unwrap();
    net.run(20).unwrap();
    assert!(net.report().total_accepted > 0, "a 1x1 mesh must still deliver packets to itself");
}

#[test]
fn four_by_four_no_power_gating_completes_traffic() {
    let cfg = base_config(4);
    let mut net = Network::from_config(&cfg).unwrap();
    net.run(150).unwrap();
    let report = net.report();
    assert_eq!(report.cycles, 150);
    assert!(report.total_accepted > 0);
    assert!(report.average_latency_by_class[0] > 0.0);
}
