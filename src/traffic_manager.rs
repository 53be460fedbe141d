/*!
Per-node packet generation, injection pacing, ejection and the deadlock
watchdog (spec.md section 4.5). Grounded on
`original_source/src/trafficmanager.cpp`'s `_GeneratePacket`/
`_Inject`/`_RetireFlit` cycle and, for the bypass-ring bookkeeping,
`nordtrafficmanager.cpp`'s `_bypass_partial_packets`.

Traffic-pattern generation is named out of scope by the specification (an
external collaborator supplies destination + issue predicate), but a
packet cannot be exercised end to end without *some* pattern, so a
minimal [`Pattern`] trait with uniform and tornado implementations lives
here, grounded on `caminos-lib::pattern::{Uniform, Tornado}`.
*/

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::Rng;

use crate::message::{EndpointId, Flit, FlitType};
use crate::router::nord::rewrite_destination;

/// Supplies a destination for a freshly issued packet from `source`, and
/// whether the scheme's tornado-specific destination-rewrite rule applies
/// (spec.md section 4.3 "destination rewrite").
pub trait Pattern {
    fn destination(&self, source: EndpointId, num_nodes: usize, rng: &mut StdRng) -> EndpointId;
    fn is_tornado(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Uniform;

impl Pattern for Uniform {
    fn destination(&self, source: EndpointId, num_nodes: usize, rng: &mut StdRng) -> EndpointId {
        // A 1-node network has nowhere else to send to; the boundary case
        // named in spec.md section 8 is a self-loop, not a hang.
        if num_nodes == 1 {
            return source;
        }
        loop {
            let d = rng.gen_range(0..num_nodes);
            if d != source {
                return d;
            }
        }
    }
}

/// `dest = num_nodes - 1 - source`, the canonical worst-case DOR pattern
/// (`caminos-lib::pattern::Tornado` for a 1-D ring generalizes the same
/// way over a linearized mesh index).
#[derive(Debug, Clone, Copy, Default)]
pub struct Tornado;

impl Pattern for Tornado {
    fn destination(&self, source: EndpointId, num_nodes: usize, _rng: &mut StdRng) -> EndpointId {
        num_nodes - 1 - source
    }
    fn is_tornado(&self) -> bool {
        true
    }
}

/// A fully formed packet still waiting to be drip-fed into the network
/// one flit per cycle (spec.md: `partial_packets[node][class]`).
#[derive(Debug, Default)]
struct PartialPacket {
    flits: VecDeque<Flit>,
    /// The local input virtual channel chosen for the head; body/tail
    /// flits of the same packet must keep using it (spec P2).
    vc: Option<usize>,
}

/// One packet that has fully arrived, reported for statistics.
#[derive(Debug, Clone)]
pub struct CompletedPacket {
    pub packet_id: u64,
    pub class: usize,
    pub source: EndpointId,
    pub destination: EndpointId,
    pub creation_cycle: usize,
    pub head_arrival_cycle: usize,
    pub tail_arrival_cycle: usize,
}

/// Tunables named in spec.md section 6 that belong to the traffic manager
/// rather than to any one router.
#[derive(Debug, Clone)]
pub struct TrafficParams {
    pub num_nodes: usize,
    pub num_classes: usize,
    pub num_vcs: usize,
    pub packet_size: usize,
    pub injection_rate: f64,
    pub deadlock_warn_timeout: usize,
    pub use_read_write: bool,
}

/// Owns per-node injection queues, packet generation/ejection, and the
/// deadlock watchdog. The wake-up monitor itself lives on
/// [`crate::router::power::PowerController`], since it drives an
/// individual router's own state rather than traffic-manager state.
pub struct TrafficManager {
    params: TrafficParams,
    pattern: Box<dyn Pattern>,
    off_cores: Vec<bool>,
    partial_packets: Vec<Vec<PartialPacket>>,
    qtime: Vec<Vec<usize>>,
    next_packet_id: u64,
    next_flit_id: u64,
    deadlock_timer: usize,
    completed: Vec<CompletedPacket>,
}

impl TrafficManager {
    pub fn new(params: TrafficParams, pattern: Box<dyn Pattern>, off_cores: Vec<bool>) -> Self {
        let num_nodes = params.num_nodes;
        let num_classes = params.num_classes;
        TrafficManager {
            partial_packets: (0..num_nodes).map(|_| (0..num_classes).map(|_| PartialPacket::default()).collect()).collect(),
            qtime: vec![vec![0; num_classes]; num_nodes],
            next_packet_id: 0,
            next_flit_id: 0,
            deadlock_timer: 0,
            completed: Vec::new(),
            params,
            pattern,
            off_cores,
        }
    }

    /// Build a full packet's flits for `(source, class)` at `cycle`,
    /// picking a destination via the pattern and applying the off-core
    /// destination rewrite (spec.md section 4.3).
    pub fn generate_packet(&mut self, source: EndpointId, class: usize, cycle: usize, rng: &mut StdRng) {
        let num_nodes = self.params.num_nodes;
        let is_tornado = self.pattern.is_tornado();
        let drawn = self.pattern.destination(source, num_nodes, rng);
        let destination = {
            let pattern = &self.pattern;
            let off_cores = &self.off_cores;
            rewrite_destination(source, drawn, is_tornado, off_cores, || pattern.destination(source, num_nodes, rng))
        };
        let packet_id = self.next_packet_id;
        self.next_packet_id += 1;
        let size = self.params.packet_size;
        let flit_type = if self.params.use_read_write { FlitType::ReadRequest } else { FlitType::Any };
        let mut flits = VecDeque::with_capacity(size);
        for i in 0..size {
            flits.push_back(Flit {
                flit_id: self.next_flit_id,
                packet_id,
                class,
                subnetwork: 0,
                source,
                destination,
                creation_cycle: cycle,
                injection_cycle: None,
                routing_cycle: None,
                arrival_cycle: None,
                priority: 0,
                head: i == 0,
                tail: i == size - 1,
                virtual_channel: None,
                bypass_vc: None,
                flit_type,
                lookahead_route: vec![],
                watch: false,
            });
            self.next_flit_id += 1;
        }
        self.partial_packets[source][class].flits = flits;
        self.partial_packets[source][class].vc = None;
    }

    /// Inject-selection: for nodes whose core is on and whose queue time
    /// has elapsed, decide whether to issue a new packet this cycle.
    pub fn inject_selection(&mut self, core_states: &[bool], cycle: usize, rng: &mut StdRng) {
        for node in 0..self.params.num_nodes {
            if self.off_cores[node] || !core_states[node] {
                continue;
            }
            for class in 0..self.params.num_classes {
                if !self.partial_packets[node][class].flits.is_empty() {
                    continue;
                }
                if self.qtime[node][class] > cycle {
                    continue;
                }
                if rng.gen::<f64>() < self.params.injection_rate {
                    self.generate_packet(node, class, cycle, rng);
                }
                self.qtime[node][class] = cycle + 1;
            }
        }
    }

    pub fn num_classes(&self) -> usize {
        self.params.num_classes
    }

    /// The destination of the next queued flit for `(node, class)` without
    /// consuming anything, used by NoRD to decide ring vs. mesh before
    /// injection.
    pub fn peeked_destination(&self, node: EndpointId, class: usize) -> Option<EndpointId> {
        self.partial_packets[node][class].flits.front().map(|f| f.destination)
    }

    /// The local input virtual channel the next flit of `(node, class)`
    /// would use, choosing and remembering one (per packet, spec P2) if
    /// this is a fresh head. `None` means nothing is queued.
    pub fn peek_vc(&mut self, node: EndpointId, class: usize) -> Option<usize> {
        let pp = &mut self.partial_packets[node][class];
        if pp.flits.is_empty() {
            return None;
        }
        if pp.vc.is_none() {
            pp.vc = Some(class % self.params.num_vcs);
        }
        pp.vc
    }

    /// Pop the next flit for `(node, class)`, assuming the caller already
    /// confirmed the VC from [`Self::peek_vc`] is free to accept it.
    pub fn pop_injectable(&mut self, node: EndpointId, class: usize, cycle: usize) -> Option<Flit> {
        let pp = &mut self.partial_packets[node][class];
        let vc = pp.vc?;
        let mut flit = pp.flits.pop_front()?;
        flit.injection_cycle.get_or_insert(cycle);
        flit.virtual_channel = Some(vc);
        if flit.tail {
            pp.vc = None;
        }
        Some(flit)
    }

    /// Ejection: record a delivered flit; once the tail arrives, retire
    /// the whole packet into the completed list for statistics.
    pub fn eject(&mut self, flit: &Flit) {
        if flit.tail {
            self.completed.push(CompletedPacket {
                packet_id: flit.packet_id,
                class: flit.class,
                source: flit.source,
                destination: flit.destination,
                creation_cycle: flit.creation_cycle,
                head_arrival_cycle: flit.arrival_cycle.unwrap_or(flit.creation_cycle),
                tail_arrival_cycle: flit.arrival_cycle.unwrap_or(flit.creation_cycle),
            });
        }
    }

    pub fn take_completed(&mut self) -> Vec<CompletedPacket> {
        std::mem::take(&mut self.completed)
    }

    /// Drain deadlock watchdog (spec.md section 4.5 item 1): `any_in_flight`
    /// reflects whether any class still has packets in the network.
    /// Returns `true` exactly once per stall episode, the cycle the
    /// watchdog fires; the caller logs a router/buffer dump and keeps going.
    pub fn deadlock_watchdog(&mut self, any_in_flight: bool) -> bool {
        if !any_in_flight {
            self.deadlock_timer = 0;
            return false;
        }
        self.deadlock_timer += 1;
        if self.deadlock_timer >= self.params.deadlock_warn_timeout {
            self.deadlock_timer = 0;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn generated_packet_never_targets_an_off_core_under_tornado() {
        let mut off = vec![false; 4];
        off[3] = true; // tornado(0) would draw node 3.
        let params = TrafficParams {
            num_nodes: 4,
            num_classes: 1,
            num_vcs: 2,
            packet_size: 2,
            injection_rate: 1.0,
            deadlock_warn_timeout: 1000,
            use_read_write: false,
        };
        let mut tm = TrafficManager::new(params, Box::new(Tornado), off);
        let mut rng = StdRng::seed_from_u64(7);
        tm.generate_packet(0, 0, 0, &mut rng);
        let dest = tm.partial_packets[0][0].flits.front().unwrap().destination;
        assert_eq!(dest, 0, "tornado redirects an off destination to the source");
    }

    #[test]
    fn packet_flits_share_one_virtual_channel_until_tail() {
        let params = TrafficParams {
            num_nodes: 4,
            num_classes: 1,
            num_vcs: 2,
            packet_size: 3,
            injection_rate: 1.0,
            deadlock_warn_timeout: 1000,
            use_read_write: false,
        };
        let mut tm = TrafficManager::new(params, Box::new(Uniform), vec![false; 4]);
        let mut rng = StdRng::seed_from_u64(1);
        tm.generate_packet(1, 0, 0, &mut rng);
        let mut vcs = Vec::new();
        while tm.peek_vc(1, 0).is_some() {
            let flit = tm.pop_injectable(1, 0, 0).unwrap();
            vcs.push(flit.virtual_channel.unwrap());
        }
        assert_eq!(vcs.len(), 3);
        assert!(vcs.iter().all(|&v| v == vcs[0]));
    }

    #[test]
    fn deadlock_watchdog_fires_once_per_stalled_episode() {
        let params = TrafficParams {
            num_nodes: 1,
            num_classes: 1,
            num_vcs: 1,
            packet_size: 1,
            injection_rate: 0.0,
            deadlock_warn_timeout: 3,
            use_read_write: false,
        };
        let mut tm = TrafficManager::new(params, Box::new(Uniform), vec![false; 1]);
        assert!(!tm.deadlock_watchdog(true));
        assert!(!tm.deadlock_watchdog(true));
        assert!(tm.deadlock_watchdog(true));
        assert!(!tm.deadlock_watchdog(true));
    }
}
