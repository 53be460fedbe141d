/*!
[`Buffer`]: a router's per-input flit storage, partitioned into virtual
channels; each VC carries the small state machine of spec.md section 3
(`idle -> routing -> vc_alloc -> active -> idle`).
*/

use std::collections::VecDeque;

use crate::message::Flit;

/// One virtual channel's state (spec.md section 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VcState {
    Idle,
    Routing,
    VcAlloc,
    Active,
}

/// A single virtual channel queue at one input port.
#[derive(Debug)]
pub struct VirtualChannel {
    pub state: VcState,
    queue: VecDeque<Flit>,
    /// Granted `(output_port, output_vc)` once VA succeeds; retained until
    /// the tail flit departs (spec P2).
    pub output: Option<(usize, usize)>,
    /// Cycles since the head has been sitting in `VcAlloc`, for the
    /// `routing_deadlock_timeout` watchdog (spec.md section 4.2).
    pub vc_alloc_wait: usize,
    /// Cycles left before route computation completes for the current head
    /// (honors `routing_delay`).
    pub routing_remaining: usize,
    /// Set by the `routing_deadlock_timeout` watchdog under Router Parking
    /// to force the next route computation to consult the escape table
    /// instead of the normal shortest-path table.
    pub use_escape: bool,
    capacity: usize,
}

impl VirtualChannel {
    fn new(capacity: usize) -> Self {
        VirtualChannel {
            state: VcState::Idle,
            queue: VecDeque::new(),
            output: None,
            vc_alloc_wait: 0,
            routing_remaining: 0,
            use_escape: false,
            capacity,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.queue.len() >= self.capacity
    }

    pub fn front(&self) -> Option<&Flit> {
        self.queue.front()
    }

    pub fn front_mut(&mut self) -> Option<&mut Flit> {
        self.queue.front_mut()
    }

    pub fn push(&mut self, flit: Flit) {
        debug_assert!(!self.is_full(), "pushed into a full virtual channel");
        self.queue.push_back(flit);
    }

    pub fn pop(&mut self) -> Option<Flit> {
        self.queue.pop_front()
    }

    /// Drive the idle -> routing -> vc_alloc -> active -> idle state
    /// machine forward given `routing_delay` and whether this cycle
    /// granted a VA for the head.
    pub fn on_head_arrival(&mut self, routing_delay: usize) {
        if self.state == VcState::Idle {
            self.state = VcState::Routing;
            self.routing_remaining = routing_delay;
            self.vc_alloc_wait = 0;
        }
    }

    pub fn advance_routing(&mut self) {
        if self.state == VcState::Routing {
            if self.routing_remaining == 0 {
                self.state = VcState::VcAlloc;
            } else {
                self.routing_remaining -= 1;
            }
        }
    }

    pub fn grant(&mut self, output: (usize, usize)) {
        self.state = VcState::Active;
        self.output = Some(output);
        self.vc_alloc_wait = 0;
    }

    /// Return the head to `Routing` after the allocation watchdog fires;
    /// any speculative SA entry for it must be dropped by the caller.
    pub fn reroute(&mut self) {
        self.state = VcState::Routing;
        self.vc_alloc_wait = 0;
    }

    /// Same as [`Self::reroute`], but also marks the next route
    /// computation to consult the Router Parking escape table.
    pub fn reroute_to_escape(&mut self) {
        self.reroute();
        self.use_escape = true;
    }

    /// Transition back to idle once the tail has been forwarded and the
    /// buffer has emptied.
    pub fn maybe_retire(&mut self) {
        if self.state == VcState::Active && self.queue.is_empty() {
            self.state = VcState::Idle;
            self.output = None;
        }
    }
}

/// All virtual channels of one input port.
#[derive(Debug)]
pub struct Buffer {
    pub vcs: Vec<VirtualChannel>,
}

impl Buffer {
    pub fn new(num_vcs: usize, vc_buf_size: usize) -> Self {
        Buffer {
            vcs: (0..num_vcs).map(|_| VirtualChannel::new(vc_buf_size)).collect(),
        }
    }

    pub fn num_vcs(&self) -> usize {
        self.vcs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::FlitType;

    fn sample_flit(head: bool, tail: bool) -> Flit {
        Flit {
            flit_id: 0,
            packet_id: 0,
            class: 0,
            subnetwork: 0,
            source: 0,
            destination: 1,
            creation_cycle: 0,
            injection_cycle: None,
            routing_cycle: None,
            arrival_cycle: None,
            priority: 0,
            head,
            tail,
            virtual_channel: None,
            bypass_vc: None,
            flit_type: FlitType::Any,
            lookahead_route: vec![],
            watch: false,
        }
    }

    #[test]
    fn vc_state_machine_transitions_in_order() {
        let mut vc = VirtualChannel::new(4);
        vc.push(sample_flit(true, true));
        assert_eq!(vc.state, VcState::Idle);
        vc.on_head_arrival(2);
        assert_eq!(vc.state, VcState::Routing);
        vc.advance_routing();
        vc.advance_routing();
        assert_eq!(vc.state, VcState::VcAlloc);
        vc.grant((2, 1));
        assert_eq!(vc.state, VcState::Active);
        assert_eq!(vc.output, Some((2, 1)));
        vc.pop();
        vc.maybe_retire();
        assert_eq!(vc.state, VcState::Idle);
        assert_eq!(vc.output, None);
    }

    #[test]
    fn watchdog_reroute_resets_to_routing() {
        let mut vc = VirtualChannel::new(4);
        vc.push(sample_flit(true, false));
        vc.on_head_arrival(0);
        vc.advance_routing();
        assert_eq!(vc.state, VcState::VcAlloc);
        vc.vc_alloc_wait = 301;
        vc.reroute();
        assert_eq!(vc.state, VcState::Routing);
        assert_eq!(vc.vc_alloc_wait, 0);
    }
}
