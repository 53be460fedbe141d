/*!
The three message kinds that traverse channels (spec.md section 3):
`Flit`, `Credit` and `Handshake`.
*/

use std::collections::HashSet;

/// Opaque identifier for a router in the mesh.
pub type RouterId = usize;
/// Opaque identifier for a traffic endpoint (compute tile).
pub type EndpointId = usize;

/// The four packet kinds distinguished by `use_read_write` traffic.
/// Restored from `original_source` (booksim2's flit type enum); the
/// distilled spec.md only lists the enum but never uses it without this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlitType {
    Any,
    ReadRequest,
    WriteRequest,
    ReadReply,
    WriteReply,
}

/// One output candidate produced by route computation: a port, a virtual
/// channel range `[vc_start, vc_end)`, and a priority (lower is served
/// first by the allocator's tie-break).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookaheadRoute {
    pub output_port: usize,
    pub vc_start: usize,
    pub vc_end: usize,
    pub priority: i32,
}

/// A unit of transfer. Packets are contiguous sequences of flits sharing a
/// `packet_id`; the first carries `head = true`, the last `tail = true`.
#[derive(Debug, Clone)]
pub struct Flit {
    pub flit_id: u64,
    pub packet_id: u64,
    pub class: usize,
    pub subnetwork: usize,
    pub source: EndpointId,
    pub destination: EndpointId,
    pub creation_cycle: usize,
    pub injection_cycle: Option<usize>,
    pub routing_cycle: Option<usize>,
    pub arrival_cycle: Option<usize>,
    pub priority: i32,
    pub head: bool,
    pub tail: bool,
    /// Assigned downstream virtual channel; unset until the head's VA
    /// grant. All flits of the packet then reuse this value (spec P2).
    pub virtual_channel: Option<usize>,
    /// Set only while the flit traverses a powered-off router's fly-over
    /// datapath (spec.md section 4.3).
    pub bypass_vc: Option<usize>,
    pub flit_type: FlitType,
    pub lookahead_route: Vec<LookaheadRoute>,
    pub watch: bool,
}

impl Flit {
    pub fn is_head(&self) -> bool {
        self.head
    }
    pub fn is_tail(&self) -> bool {
        self.tail
    }
}

/// Carries the set of VC indices whose downstream buffer slot has just
/// been freed. A VC index never appears in two outstanding credits
/// simultaneously (spec.md section 3 invariant).
#[derive(Debug, Clone, Default)]
pub struct Credit {
    pub freed_vcs: HashSet<usize>,
}

impl Credit {
    pub fn single(vc: usize) -> Self {
        let mut freed_vcs = HashSet::new();
        freed_vcs.insert(vc);
        Credit { freed_vcs }
    }
}

/// One of the four power states a router cycles through (spec.md 4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PowerState {
    PowerOn,
    Draining,
    PowerOff,
    Wakeup,
}

/// Neighbour-to-neighbour control message for power-gating coordination
/// (spec.md section 4.4). Field presence, not a discriminant, classifies
/// the message: state advertisement (`src_state` alone), drain
/// request/response (`new_state`/`drain_done`), wake-up request
/// (`wakeup`), or FLOV's logical-neighbour update.
#[derive(Debug, Clone, Default)]
pub struct Handshake {
    pub handshake_id: u64,
    pub origin_router: RouterId,
    pub src_state: Option<PowerState>,
    pub new_state: Option<PowerState>,
    pub drain_done: bool,
    pub wakeup: bool,
    pub logical_neighbor: Option<RouterId>,
}

impl Handshake {
    pub fn reset(&mut self) {
        *self = Handshake {
            handshake_id: self.handshake_id,
            ..Default::default()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credit_indices_never_repeat_within_one_credit() {
        let mut c = Credit::default();
        c.freed_vcs.insert(2);
        c.freed_vcs.insert(2);
        assert_eq!(c.freed_vcs.len(), 1);
    }

    #[test]
    fn handshake_reset_clears_everything_but_its_id() {
        let mut h = Handshake {
            handshake_id: 5,
            wakeup: true,
            drain_done: true,
            ..Default::default()
        };
        h.reset();
        assert_eq!(h.handshake_id, 5);
        assert!(!h.wakeup);
        assert!(!h.drain_done);
    }
}
