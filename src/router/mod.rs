/*!
The input-queued router (spec.md section 4): five ports (the four mesh
directions plus a local port facing the traffic manager), each with
[`Buffer`]s of virtual channels, driven each cycle through RC, VA, SA and
ST. Grounded on `caminos-lib::router::input_output::InputOutput`'s
port/class/vc layout, restructured around the specification's strict
four-phase cycle instead of that router's event-driven advance.

Power-gating is layered on top via [`PowerGatingPolicy`]: a plain router
runs the pipeline above unconditionally; a FLOV-family router substitutes
the fly-over datapath ([`flov`]) while `power_off`; a Router-Parking
router consults [`rp::RpRouting`] instead of the mesh's static routing
function. NoRD's bypass ring is an overlay external to any one router
(it rewrites destinations at injection time and carries tokens on a
separate ring channel), so it is not represented here; see
[`crate::router::nord`] and `crate::traffic_manager`.
*/

pub mod flov;
pub mod nord;
pub mod pipeline;
pub mod power;
pub mod rp;

use std::collections::{HashMap, HashSet};

use rand::rngs::StdRng;

use crate::allocator::{Request, SeparableAllocator};
use crate::buffer::{Buffer, VcState};
use crate::buffer_state::BufferState;
use crate::error::{PgNetError, Result};
use crate::message::{Credit, EndpointId, Flit, Handshake, RouterId};
use crate::routing_function::{Dor, RoutingFunction};
use crate::routing_table::{RouteDirection, RoutingTable};
use crate::topology::{Direction, Mesh};

use flov::{FlyOverLatch, FlyOverPolicy};
use pipeline::{flatten, StallKind};
use power::{PowerController, PowerGateParams};
use rp::{RpMode, RpRouting};

/// Port 4 is the local port facing the traffic manager; ports 0..4 are
/// `Direction::as_port()`'s East/West/South/North.
pub const LOCAL_PORT: usize = 4;
pub const NUM_PORTS: usize = 5;

fn mesh_ports() -> [(usize, Direction); 4] {
    [
        (Direction::East.as_port(), Direction::East),
        (Direction::West.as_port(), Direction::West),
        (Direction::South.as_port(), Direction::South),
        (Direction::North.as_port(), Direction::North),
    ]
}

/// Which power-gating family a router belongs to (spec.md section 4.3).
/// `None` is a plain always-on router.
#[derive(Debug, Clone)]
pub enum PowerGatingPolicy {
    None,
    Flov(FlyOverPolicy),
    RouterParking(RpMode),
    NoRd,
}

/// Everything a [`Router`] needs at construction that does not change
/// cycle to cycle.
#[derive(Debug, Clone)]
pub struct RouterParams {
    pub num_vcs: usize,
    pub num_classes: usize,
    pub vc_buf_size: usize,
    pub local_buf_size: usize,
    pub routing_delay: usize,
    pub crossbar_delay: usize,
    pub routing_deadlock_timeout: usize,
    pub sa_iterations: usize,
}

/// One router's state: five input [`Buffer`]s, five output
/// [`BufferState`]s mirroring the downstream neighbours' occupancy, the
/// allocators, the routing function, and the power-gating controller.
pub struct Router {
    pub id: RouterId,
    params: RouterParams,
    inputs: Vec<Buffer>,
    outputs: Vec<BufferState>,
    va_allocators: Vec<SeparableAllocator>,
    sa_allocator: SeparableAllocator,
    routing: Dor,
    pub power: PowerController,
    policy: PowerGatingPolicy,
    flyover: Vec<FlyOverLatch>,
    rp: Option<RpRouting>,
    pending_output: Vec<Option<Flit>>,
    pending_credit: Vec<Option<Credit>>,
    pending_handshake: Vec<(usize, Handshake)>,
    pending_ejected: Vec<Flit>,
    had_allocation_activity: bool,
    switched_this_cycle: usize,
    /// FLOV's logical-neighbour update (spec.md section 4.4): for each
    /// mesh port, the nearest on-router reachable by walking that
    /// direction through any run of parked routers, or `None` if the
    /// mesh edge is reached first. Maintained by [`crate::network::Network`],
    /// which alone has the topology and on/off vector to compute it.
    logical_neighbor: Vec<Option<RouterId>>,
}

impl Router {
    pub fn new(
        id: RouterId,
        params: RouterParams,
        policy: PowerGatingPolicy,
        power_params: PowerGateParams,
        gating_allowed: bool,
        rp_table: Option<RoutingTable>,
    ) -> Self {
        let num_vcs = params.num_vcs;
        let inputs: Vec<Buffer> = (0..NUM_PORTS)
            .map(|p| {
                let cap = if p == LOCAL_PORT { params.local_buf_size } else { params.vc_buf_size };
                Buffer::new(num_vcs, cap)
            })
            .collect();
        let outputs: Vec<BufferState> = (0..NUM_PORTS)
            .map(|p| {
                let cap = if p == LOCAL_PORT { params.local_buf_size } else { params.vc_buf_size };
                BufferState::new(num_vcs, cap)
            })
            .collect();
        let va_allocators = (0..params.num_classes)
            .map(|_| SeparableAllocator::new(NUM_PORTS * num_vcs, NUM_PORTS * num_vcs, 1))
            .collect();
        let sa_allocator = SeparableAllocator::new(NUM_PORTS * num_vcs, NUM_PORTS, params.sa_iterations);
        let flyover = mesh_ports().iter().map(|&(_, dir)| FlyOverLatch::new(dir)).collect();
        let rp = rp_table.map(|table| {
            let mode = match policy {
                PowerGatingPolicy::RouterParking(m) => m,
                _ => RpMode::Aggressive,
            };
            RpRouting::new(mode, table)
        });
        Router {
            id,
            power: PowerController::new(id, 4, params.num_classes, power_params, gating_allowed),
            inputs,
            outputs,
            va_allocators,
            sa_allocator,
            routing: Dor,
            policy,
            flyover,
            rp,
            pending_output: (0..NUM_PORTS).map(|_| None).collect(),
            pending_credit: (0..NUM_PORTS).map(|_| None).collect(),
            pending_handshake: Vec::new(),
            pending_ejected: Vec::new(),
            had_allocation_activity: false,
            switched_this_cycle: 0,
            logical_neighbor: vec![None; NUM_PORTS],
            params,
        }
    }

    pub fn is_off(&self) -> bool {
        self.power.is_off()
    }

    /// Record which on-router lies beyond `port`'s run of parked routers
    /// (spec.md section 4.4's FLOV-only logical-neighbour update).
    pub fn set_logical_neighbor(&mut self, port: usize, neighbor: Option<RouterId>) {
        self.logical_neighbor[port] = neighbor;
    }

    /// Rebuild this router's Router-Parking tables after the network's
    /// on/off vector changes. No-op for non-RP routers.
    pub fn rebuild_rp(&mut self, mesh: &Mesh, on_routers: &[bool], fabric_manager: RouterId) -> Result<()> {
        if let Some(rp) = &mut self.rp {
            rp.rebuild(mesh, on_routers, fabric_manager)?;
        }
        Ok(())
    }

    /// Mirror the downstream neighbour's buffer capacity shrinking to a
    /// single bypass-latch slot while it is parked (spec.md section 3),
    /// or restoring to the configured capacity once it wakes.
    pub fn set_downstream_capacity(&mut self, port: usize, capacity: usize) {
        for vc in 0..self.params.num_vcs {
            self.outputs[port].set_bypass_capacity(vc, capacity);
        }
    }

    // ---- ReadInputs -----------------------------------------------------

    /// Admit a flit that just arrived on `port`. While this router is
    /// powered off, only a FLOV-family policy that allows fly-over on this
    /// port's axis accepts it; everything else is a caller error, since
    /// Network must not have routed traffic here otherwise.
    pub fn receive_flit(&mut self, port: usize, flit: Flit, cycle: usize) -> Result<()> {
        if self.power.is_off() {
            if let PowerGatingPolicy::Flov(fp) = self.policy {
                if port != LOCAL_PORT {
                    let dir = Direction::ALL.into_iter().find(|d| d.as_port() == port).unwrap();
                    if fp.allows(*dir) {
                        let entry_vc = flit.virtual_channel.unwrap_or(0);
                        log::debug!(
                            "{cycle} | node{} | Bypassing flit {} (packet {}) on vc {entry_vc}",
                            self.id,
                            flit.flit_id,
                            flit.packet_id
                        );
                        if flit.class < self.power.vc_alloc_retries.len() {
                            self.power.vc_alloc_retries[flit.class] += 1;
                        }
                        self.power.bypass_flit_count += 1;
                        self.flyover[port].admit(flit, entry_vc);
                        return Ok(());
                    }
                }
            }
            return Err(PgNetError::invariant(
                cycle,
                self.id,
                format!("flit routed to powered-off router {} on port {port} with no fly-over path", self.id),
            ));
        }
        let vc = flit.virtual_channel.ok_or_else(|| {
            PgNetError::invariant(cycle, self.id, "arriving flit carries no assigned virtual channel")
        })?;
        let head = flit.head;
        self.inputs[port].vcs[vc].push(flit);
        if head {
            self.inputs[port].vcs[vc].on_head_arrival(self.params.routing_delay);
        }
        Ok(())
    }

    pub fn receive_credit(&mut self, port: usize, credit: &Credit, cycle: usize) -> Result<()> {
        if self.power.is_off() {
            log::debug!("{cycle} | node{} | receives credit for bypass VCs {:?} on port {port}", self.id, credit.freed_vcs);
        }
        for &vc in &credit.freed_vcs {
            self.outputs[port].apply_credit(vc, cycle, self.id)?;
        }
        Ok(())
    }

    /// Process an inbound handshake, replying immediately if warranted.
    /// `no_in_flight_through_sender` tells the power controller whether a
    /// drain request can be acknowledged right away.
    pub fn receive_handshake(&mut self, port: usize, hs: &Handshake) {
        let no_in_flight = self.outputs[port].occupancy(0) == 0
            && (0..self.params.num_vcs).all(|vc| self.outputs[port].occupancy(vc) == 0);
        if let Some(reply) = self.power.on_handshake(port, hs, no_in_flight) {
            self.pending_handshake.push((port, reply));
        }
    }

    // ---- PowerStateEvaluate ----------------------------------------------

    pub fn power_state_evaluate(&mut self, cycle: usize) {
        let local_vcs_idle = self
            .inputs
            .iter()
            .all(|buf| buf.vcs.iter().all(|vc| vc.state == VcState::Idle && vc.is_empty()));
        let outstanding_credits: usize = self
            .outputs
            .iter()
            .map(|bs| (0..self.params.num_vcs).map(|vc| bs.occupancy(vc)).sum::<usize>())
            .sum();
        let handshakes = self.power.evaluate(cycle, self.had_allocation_activity, local_vcs_idle, outstanding_credits);
        self.pending_handshake.extend(handshakes);
        self.had_allocation_activity = false;
    }

    // ---- Evaluate ---------------------------------------------------------

    /// Run one cycle of the pipeline: fly-over passthrough while off,
    /// otherwise RC/VA/SA/ST over the input buffers. `destination_router`
    /// maps a flit's endpoint destination to a router id (identity under
    /// this crate's 1:1 endpoint-to-router mapping, kept as a closure so
    /// the mapping stays explicit at the call site).
    pub fn evaluate(
        &mut self,
        cycle: usize,
        mesh: &Mesh,
        destination_router: impl Fn(EndpointId) -> RouterId,
        rng: &mut StdRng,
    ) -> Result<()> {
        if self.power.is_off() {
            self.step_flyover();
            return Ok(());
        }
        self.route_compute(cycle, mesh, &destination_router)?;
        self.virtual_channel_allocate(cycle, rng)?;
        self.switch_allocate(cycle, rng)?;
        Ok(())
    }

    fn step_flyover(&mut self) {
        for (port, _) in mesh_ports() {
            if let Some((exit_dir, flit)) = self.flyover[port].drain() {
                self.pending_output[exit_dir.as_port()] = Some(flit);
            }
        }
    }

    fn route_candidates(
        &self,
        mesh: &Mesh,
        destination: RouterId,
        use_escape: bool,
    ) -> Vec<crate::message::LookaheadRoute> {
        use crate::message::LookaheadRoute;
        if self.id == destination {
            return vec![LookaheadRoute {
                output_port: LOCAL_PORT,
                vc_start: 0,
                vc_end: self.params.num_vcs,
                priority: 0,
            }];
        }
        if let Some(rp) = &self.rp {
            let dir = if use_escape { rp.escape_route(destination) } else { rp.normal_route(destination) };
            return match dir {
                RouteDirection::Step(d) => vec![LookaheadRoute {
                    output_port: d.as_port(),
                    vc_start: 0,
                    vc_end: self.params.num_vcs,
                    priority: 0,
                }],
                RouteDirection::Arrived => vec![LookaheadRoute {
                    output_port: LOCAL_PORT,
                    vc_start: 0,
                    vc_end: self.params.num_vcs,
                    priority: 0,
                }],
                RouteDirection::Invalid => Vec::new(),
            };
        }
        let candidates = self.routing.route(mesh, self.id, destination, self.params.num_vcs);
        if let PowerGatingPolicy::Flov(fp) = self.policy {
            if !matches!(fp, FlyOverPolicy::NoFlyOver) {
                // A fly-over-capable candidate heading into a parked stretch
                // with no on-router beyond it (logical_neighbor is None) has
                // nowhere to land; don't offer it so the caller surfaces a
                // clear no-admissible-route error instead of bypassing off
                // the mesh edge. NoFlyOver offers no bypass at all, so it is
                // left to the existing off-router invariant check instead.
                return candidates
                    .into_iter()
                    .filter(|c| c.output_port == LOCAL_PORT || self.logical_neighbor[c.output_port].is_some())
                    .collect();
            }
        }
        candidates
    }

    fn route_compute(&mut self, cycle: usize, mesh: &Mesh, destination_router: &impl Fn(EndpointId) -> RouterId) -> Result<()> {
        for port in 0..NUM_PORTS {
            for vc in 0..self.params.num_vcs {
                let ready = {
                    let v = &self.inputs[port].vcs[vc];
                    v.state == VcState::Routing && v.routing_remaining == 0
                };
                if !ready {
                    continue;
                }
                let use_escape = self.inputs[port].vcs[vc].use_escape;
                let destination = destination_router(self.inputs[port].vcs[vc].front().unwrap().destination);
                let candidates = self.route_candidates(mesh, destination, use_escape);
                if candidates.is_empty() {
                    return Err(PgNetError::invariant(
                        cycle,
                        self.id,
                        format!("no admissible route from router {} to router {destination}", self.id),
                    ));
                }
                let flit = self.inputs[port].vcs[vc].front_mut().unwrap();
                flit.lookahead_route = candidates;
                flit.routing_cycle.get_or_insert(cycle);
                self.inputs[port].vcs[vc].use_escape = false;
                self.inputs[port].vcs[vc].advance_routing();
            }
        }
        Ok(())
    }

    fn virtual_channel_allocate(&mut self, cycle: usize, rng: &mut StdRng) -> Result<()> {
        let num_vcs = self.params.num_vcs;
        let mut requests_by_class: HashMap<usize, Vec<Request>> = HashMap::new();
        for port in 0..NUM_PORTS {
            for vc in 0..num_vcs {
                let v = &self.inputs[port].vcs[vc];
                if v.state != VcState::VcAlloc {
                    continue;
                }
                let flit = v.front().unwrap();
                let client = flatten(port, vc, num_vcs);
                for candidate in &flit.lookahead_route {
                    for out_vc in candidate.vc_start..candidate.vc_end {
                        if !self.outputs[candidate.output_port].is_available_for(out_vc) {
                            continue;
                        }
                        let resource = flatten(candidate.output_port, out_vc, num_vcs);
                        requests_by_class.entry(flit.class).or_default().push(Request::new(client, resource, candidate.priority));
                    }
                }
            }
        }
        for (class, requests) in requests_by_class {
            let granted = self.va_allocators[class].allocate(&requests, rng);
            for grant in granted.grants {
                let (in_port, in_vc) = pipeline::unflatten(grant.client, num_vcs);
                let (out_port, out_vc) = pipeline::unflatten(grant.resource, num_vcs);
                self.outputs[out_port].reserve(out_vc, (in_port, in_vc), cycle, self.id)?;
                self.inputs[in_port].vcs[in_vc].grant((out_port, out_vc));
                log::debug!("{cycle} | node{} | Selected output VC {out_vc} on port {out_port}", self.id);
                self.had_allocation_activity = true;
            }
        }
        for port in 0..NUM_PORTS {
            for vc in 0..num_vcs {
                let v = &mut self.inputs[port].vcs[vc];
                if v.state == VcState::VcAlloc {
                    v.vc_alloc_wait += 1;
                    if v.vc_alloc_wait > self.params.routing_deadlock_timeout {
                        if self.rp.is_some() {
                            v.reroute_to_escape();
                        } else {
                            v.reroute();
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Classify why a switch-allocation request did not win this cycle
    /// (spec.md section 4.2 "stall kinds are classified") and log it.
    /// `buffer_busy`/`buffer_reserved` do not arise here: an `Active` VC
    /// already holds the exclusive reservation VA granted it, so the only
    /// stalls this stage can observe are the downstream buffer being full
    /// and losing the crossbar arbitration to another input.
    fn log_stall(&self, cycle: usize, port: usize, vc: usize, kind: StallKind) {
        log::debug!("{cycle} | node{} | SA stall on port {port} vc {vc}: {kind:?}", self.id);
    }

    fn switch_allocate(&mut self, cycle: usize, rng: &mut StdRng) -> Result<()> {
        let num_vcs = self.params.num_vcs;
        let mut requests = Vec::new();
        for port in 0..NUM_PORTS {
            for vc in 0..num_vcs {
                let v = &self.inputs[port].vcs[vc];
                if v.state != VcState::Active || v.is_empty() {
                    continue;
                }
                let (out_port, out_vc) = v.output.unwrap();
                if self.outputs[out_port].is_full_for(out_vc) {
                    self.log_stall(cycle, port, vc, StallKind::BufferFull);
                    continue;
                }
                let client = flatten(port, vc, num_vcs);
                let priority = v.front().map(|f| f.priority).unwrap_or(0);
                requests.push(Request::new(client, out_port, priority));
                let _ = out_vc;
            }
        }
        let granted = self.sa_allocator.allocate(&requests, rng);
        let granted_clients: HashSet<usize> = granted.grants.iter().map(|g| g.client).collect();
        for req in &requests {
            if !granted_clients.contains(&req.client) {
                let (port, vc) = pipeline::unflatten(req.client, num_vcs);
                self.log_stall(cycle, port, vc, StallKind::CrossbarConflict);
            }
        }
        for grant in granted.grants {
            let (in_port, in_vc) = pipeline::unflatten(grant.client, num_vcs);
            let out_port = grant.resource;
            let (granted_out_port, out_vc) = self.inputs[in_port].vcs[in_vc].output.unwrap();
            debug_assert_eq!(granted_out_port, out_port);
            let mut flit = self.inputs[in_port].vcs[in_vc].pop().expect("switch allocation granted an empty vc");
            self.outputs[out_port].send_flit(out_vc, cycle, self.id)?;
            flit.virtual_channel = Some(out_vc);
            flit.arrival_cycle.get_or_insert(cycle);
            let tail = flit.tail;
            if out_port == LOCAL_PORT {
                // The traffic manager drains the local port instantly, so its
                // BufferState occupancy is freed the same cycle it is taken.
                self.outputs[LOCAL_PORT].apply_credit(out_vc, cycle, self.id)?;
                self.pending_ejected.push(flit);
            } else {
                self.pending_output[out_port] = Some(flit);
            }
            self.pending_credit[in_port] = Some(match self.pending_credit[in_port].take() {
                Some(mut c) => {
                    c.freed_vcs.insert(in_vc);
                    c
                }
                None => Credit::single(in_vc),
            });
            if tail {
                self.outputs[out_port].release(out_vc);
            }
            self.inputs[in_port].vcs[in_vc].maybe_retire();
            self.had_allocation_activity = true;
            self.switched_this_cycle += 1;
        }
        Ok(())
    }

    /// Number of flits this router pushed through its crossbar this cycle
    /// (local ejections and mesh forwards alike), reset on read.
    pub fn take_switch_count(&mut self) -> usize {
        std::mem::take(&mut self.switched_this_cycle)
    }

    // ---- injection / ejection ----------------------------------------------

    /// Admit a freshly generated flit at the local port, honoring the
    /// chosen input virtual channel's availability. Returns `false` if the
    /// buffer has no room, in which case the traffic manager must retry.
    pub fn try_inject(&mut self, vc: usize, flit: Flit) -> bool {
        let buf = &mut self.inputs[LOCAL_PORT];
        if buf.vcs[vc].is_full() {
            return false;
        }
        let head = flit.head;
        buf.vcs[vc].push(flit);
        if head {
            buf.vcs[vc].on_head_arrival(self.params.routing_delay);
        }
        true
    }

    pub fn can_inject(&self, vc: usize) -> bool {
        !self.inputs[LOCAL_PORT].vcs[vc].is_full()
    }

    pub fn take_ejected(&mut self) -> Vec<Flit> {
        std::mem::take(&mut self.pending_ejected)
    }

    // ---- WriteOutputs -------------------------------------------------------

    pub fn take_output_flit(&mut self, port: usize) -> Option<Flit> {
        self.pending_output[port].take()
    }

    pub fn take_output_credit(&mut self, port: usize) -> Option<Credit> {
        self.pending_credit[port].take()
    }

    pub fn drain_handshakes(&mut self) -> Vec<(usize, Handshake)> {
        std::mem::take(&mut self.pending_handshake)
    }

    pub fn total_buffer_occupancy(&self) -> usize {
        self.inputs.iter().map(|b| b.vcs.iter().map(|v| v.len()).sum::<usize>()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::FlitType;

    fn params() -> RouterParams {
        RouterParams {
            num_vcs: 2,
            num_classes: 1,
            vc_buf_size: 4,
            local_buf_size: 16,
            routing_delay: 0,
            crossbar_delay: 0,
            routing_deadlock_timeout: 300,
            sa_iterations: 1,
        }
    }

    fn sample_flit(packet_id: u64, source: usize, destination: usize, head: bool, tail: bool) -> Flit {
        Flit {
            flit_id: packet_id,
            packet_id,
            class: 0,
            subnetwork: 0,
            source,
            destination,
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
    fn single_flit_packet_crosses_one_hop_within_a_handful_of_cycles() {
        let mesh = Mesh::new_2d(2, 1);
        let mut r0 = Router::new(0, params(), PowerGatingPolicy::None, PowerGateParams::default(), true, None);
        let mut r1 = Router::new(1, params(), PowerGatingPolicy::None, PowerGateParams::default(), true, None);
        let mut rng = rand::SeedableRng::seed_from_u64(1);
        assert!(r0.try_inject(0, sample_flit(1, 0, 1, true, true)));

        let mut delivered = false;
        for cycle in 0..10 {
            r0.evaluate(cycle, &mesh, |e| e, &mut rng).unwrap();
            r1.evaluate(cycle, &mesh, |e| e, &mut rng).unwrap();
            if let Some(flit) = r0.take_output_flit(Direction::East.as_port()) {
                r1.receive_flit(Direction::West.as_port(), flit, cycle).unwrap();
            }
            if !r1.take_ejected().is_empty() {
                delivered = true;
                break;
            }
        }
        assert!(delivered, "flit never reached router 1's local port");
    }

    /// Scenario 2: a flit bypassing a parked FLOV router sets `bypass_vc`
    /// once and credits the wake-up monitor's retry counter once, not per
    /// cycle it sits in the latch.
    #[test]
    fn flov_bypass_sets_bypass_vc_and_credits_wakeup_monitor_once() {
        use crate::message::PowerState;
        let mut r1 = Router::new(
            1,
            params(),
            PowerGatingPolicy::Flov(FlyOverPolicy::BothDimensions),
            PowerGateParams::default(),
            true,
            None,
        );
        r1.power.state = PowerState::PowerOff;
        let mut flit = sample_flit(1, 0, 2, true, true);
        flit.virtual_channel = Some(1);
        r1.receive_flit(Direction::West.as_port(), flit, 0).unwrap();
        assert_eq!(r1.power.vc_alloc_retries[0], 1);
        let (exit_dir, drained) = r1.flyover[Direction::West.as_port()].drain().unwrap();
        assert_eq!(exit_dir, Direction::East);
        assert_eq!(drained.bypass_vc, Some(1));
    }

    /// spec.md section 4.4's logical-neighbour update: a fly-over-capable
    /// router offers a route toward a port once it knows an on-router lies
    /// somewhere beyond it, and withholds that candidate while it doesn't.
    #[test]
    fn route_candidates_withholds_a_direction_with_no_known_logical_neighbor() {
        let mesh = Mesh::new_2d(4, 1);
        let mut r = Router::new(1, params(), PowerGatingPolicy::Flov(FlyOverPolicy::BothDimensions), PowerGateParams::default(), true, None);
        // Router 1 -> destination 3 would normally route East.
        let candidates = r.route_candidates(&mesh, 3, false);
        assert!(candidates.is_empty(), "no logical neighbour has been learned yet, so East must not be offered");

        r.set_logical_neighbor(Direction::East.as_port(), Some(3));
        let candidates = r.route_candidates(&mesh, 3, false);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].output_port, Direction::East.as_port());
    }

    /// NoFlyOver never offers a bypass, so its candidates are unaffected by
    /// the logical-neighbour gate above.
    #[test]
    fn no_flyover_routes_normally_without_any_logical_neighbor_set() {
        let mesh = Mesh::new_2d(4, 1);
        let r = Router::new(1, params(), PowerGatingPolicy::Flov(FlyOverPolicy::NoFlyOver), PowerGateParams::default(), true, None);
        let candidates = r.route_candidates(&mesh, 3, false);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].output_port, Direction::East.as_port());
    }
}
