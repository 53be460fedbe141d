//! Scenario 6 (spec.md section 8): a congested network trips the
//! deadlock watchdog's warning timer, but the simulation keeps running
//! to completion instead of aborting.

use pgnet_sim::{Config, Network, SimLogger};

#[test]
fn congested_network_runs_to_completion_past_the_watchdog_timeout() {
    SimLogger::init();
    let mut cfg = Config::new();
    cfg.set("k", 4usize)
        .set("n", 2usize)
        .set("vc", 2usize)
        .set("classes", 1usize)
        .set("vc_buf_size", 2usize)
        .set("injection_rate", 1.0)
        .set("deadlock_warn_timeout", 5usize);
    let mut net = Network::from_config(&cfg).unwrap();
    net.run(300).unwrap();
    assert_eq!(net.cycle(), 300);
}

/// Even a network that never quiesces (saturating injection on every
/// node) must not panic or return an error: the watchdog only logs.
#[test]
fn saturated_all_to_all_traffic_does_not_abort_the_simulation() {
    SimLogger::init();
    let mut cfg = Config::new();
    cfg.set("k", 3usize)
        .set("n", 2usize)
        .set("vc", 2usize)
        .set("classes", 2usize)
        .set("vc_buf_size", 2usize)
        .set("injection_rate", 1.0)
        .set("deadlock_warn_timeout", 10usize);
    let mut net = Network::from_config(&cfg).unwrap();
    for _ in 0..500 {
        net.step().unwrap();
    }
    assert_eq!(net.cycle(), 500);
}
