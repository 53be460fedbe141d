/*!
Aggregate statistics (spec.md section 6: "aggregate statistics" emitted at
end of simulation). Grounded on `caminos-lib::measures::Statistics`'
accumulate-then-report shape, simplified to this specification's named
outputs: flits accepted, per-class average latency, per-link activity, and
an energy total computed from accumulated event counts times configured
coefficients — consuming, not reimplementing, DSENT.
*/

use std::fmt;

/// Per-event energy coefficients named in spec.md section 6.
#[derive(Debug, Clone, Copy)]
pub struct EnergyCoefficients {
    pub energy_per_buffer_write: f64,
    pub energy_per_crossbar_traversal: f64,
    pub energy_per_link_traversal: f64,
    pub leakage_per_cycle_on: f64,
    pub leakage_per_cycle_off: f64,
}

impl Default for EnergyCoefficients {
    fn default() -> Self {
        EnergyCoefficients {
            energy_per_buffer_write: 1.0,
            energy_per_crossbar_traversal: 1.0,
            energy_per_link_traversal: 1.0,
            leakage_per_cycle_on: 1.0,
            leakage_per_cycle_off: 0.1,
        }
    }
}

/// Running accumulators, one instance per simulation.
#[derive(Debug, Default)]
pub struct Stats {
    pub accepted_packets: Vec<Vec<usize>>, // [src][dst]
    pub latency_sum: Vec<u64>,             // per class
    pub latency_count: Vec<u64>,           // per class
    pub link_activity: Vec<u64>,           // per router, flits sent on any mesh port
    pub buffer_writes: u64,
    pub crossbar_traversals: u64,
    pub cycles_on: u64,
    pub cycles_off: u64,
}

impl Stats {
    pub fn new(num_nodes: usize, num_classes: usize) -> Self {
        Stats {
            accepted_packets: vec![vec![0; num_nodes]; num_nodes],
            latency_sum: vec![0; num_classes],
            latency_count: vec![0; num_classes],
            link_activity: vec![0; num_nodes],
            buffer_writes: 0,
            crossbar_traversals: 0,
            cycles_on: 0,
            cycles_off: 0,
        }
    }

    pub fn record_completed(&mut self, completed: &crate::traffic_manager::CompletedPacket) {
        self.accepted_packets[completed.source][completed.destination] += 1;
        let latency = (completed.tail_arrival_cycle.saturating_sub(completed.creation_cycle)) as u64;
        self.latency_sum[completed.class] += latency;
        self.latency_count[completed.class] += 1;
    }

    pub fn record_link_activity(&mut self, router: usize) {
        self.link_activity[router] += 1;
        self.buffer_writes += 1;
        self.crossbar_traversals += 1;
    }

    pub fn record_power_cycle(&mut self, router_off: bool) {
        if router_off {
            self.cycles_off += 1;
        } else {
            self.cycles_on += 1;
        }
    }

    pub fn average_latency(&self, class: usize) -> f64 {
        if self.latency_count[class] == 0 {
            0.0
        } else {
            self.latency_sum[class] as f64 / self.latency_count[class] as f64
        }
    }

    pub fn total_accepted(&self) -> usize {
        self.accepted_packets.iter().map(|row| row.iter().sum::<usize>()).sum()
    }

    pub fn energy_total(&self, coeff: &EnergyCoefficients) -> f64 {
        self.buffer_writes as f64 * coeff.energy_per_buffer_write
            + self.crossbar_traversals as f64 * coeff.energy_per_crossbar_traversal
            + self.link_activity.iter().sum::<u64>() as f64 * coeff.energy_per_link_traversal
            + self.cycles_on as f64 * coeff.leakage_per_cycle_on
            + self.cycles_off as f64 * coeff.leakage_per_cycle_off
    }
}

/// The typed end-of-simulation report (spec.md section 6 "Exit status /
/// outputs"). A `Display` impl renders the line-oriented text report; the
/// struct itself is for callers that want the numbers directly.
#[derive(Debug, Clone)]
pub struct SimReport {
    pub cycles: usize,
    pub total_accepted: usize,
    pub average_latency_by_class: Vec<f64>,
    pub link_activity: Vec<u64>,
    pub energy_total: f64,
}

impl fmt::Display for SimReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "simulation ran {} cycles", self.cycles)?;
        writeln!(f, "accepted packets: {}", self.total_accepted)?;
        for (class, avg) in self.average_latency_by_class.iter().enumerate() {
            writeln!(f, "class {class} average latency: {avg:.2}")?;
        }
        writeln!(f, "energy total: {:.2}", self.energy_total)?;
        Ok(())
    }
}
