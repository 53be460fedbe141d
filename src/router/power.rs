/*!
The power-gating state machine shared by every [`crate::router::Router`]
regardless of family (spec.md section 4.3): `power_on -> draining ->
power_off -> wakeup -> power_on`. Parameters and transition names are
grounded on `original_source/booksim2/src/routers/rp_router.cpp` and
`flov_router.hpp`, which drive the same four states through neighbour
handshakes.
*/

use crate::message::{Handshake, PowerState, RouterId};

/// Tunables named verbatim in spec.md section 6.
#[derive(Debug, Clone, Copy)]
pub struct PowerGateParams {
    pub idle_threshold: usize,
    pub drain_threshold: usize,
    pub bet_threshold: usize,
    pub wakeup_threshold: usize,
    /// Wake-up monitor threshold (spec.md section 4.5 item 2): once a
    /// parked router's accumulated VC-allocation-retry count for any class
    /// exceeds this, it wakes itself regardless of any external signal.
    pub performance_centric_wakeup_threshold: usize,
}

impl Default for PowerGateParams {
    fn default() -> Self {
        PowerGateParams {
            idle_threshold: 1000,
            drain_threshold: 500,
            bet_threshold: 200,
            wakeup_threshold: 50,
            performance_centric_wakeup_threshold: 16,
        }
    }
}

/// Per-router power-gating controller: tracks the current state, the
/// idle/drain/off/wakeup timers, and which neighbours have acknowledged a
/// drain request.
#[derive(Debug, Clone)]
pub struct PowerController {
    router: RouterId,
    params: PowerGateParams,
    pub state: PowerState,
    idle_timer: usize,
    drain_timer: usize,
    off_timer: usize,
    wakeup_timer: usize,
    /// One flag per neighbour port; `true` once that neighbour has sent
    /// back `drain_done = true` for the current drain round.
    neighbour_drain_done: Vec<bool>,
    next_handshake_id: u64,
    /// Whether this router is allowed to gate at all (spec.md: "local
    /// policy allows gating"); false for the fabric manager.
    pub gating_allowed: bool,
    /// VC-allocation retry counters used by the wake-up monitor (spec.md
    /// section 4.5 item 2), one per class.
    pub vc_alloc_retries: Vec<usize>,
    /// Count of flits this router has fly-overed while parked (spec.md
    /// section 4.3's power_off -> wakeup trigger), independent of the
    /// per-class retry counters above.
    pub bypass_flit_count: usize,
}

impl PowerController {
    pub fn new(router: RouterId, num_neighbours: usize, num_classes: usize, params: PowerGateParams, gating_allowed: bool) -> Self {
        PowerController {
            router,
            params,
            state: PowerState::PowerOn,
            idle_timer: 0,
            drain_timer: 0,
            off_timer: 0,
            wakeup_timer: 0,
            neighbour_drain_done: vec![false; num_neighbours],
            next_handshake_id: 0,
            gating_allowed,
            vc_alloc_retries: vec![0; num_classes],
            bypass_flit_count: 0,
        }
    }

    fn new_handshake_id(&mut self) -> u64 {
        let id = self.next_handshake_id;
        self.next_handshake_id += 1;
        id
    }

    /// Called once per cycle from `PowerStateEvaluate`. `had_allocation_activity`
    /// reflects whether any local VC made progress this cycle; `local_vcs_idle`
    /// and `outstanding_credits` gate the draining -> power_off transition.
    /// Returns handshakes this router originates this cycle, one per neighbour
    /// port that needs one.
    pub fn evaluate(
        &mut self,
        cycle: usize,
        had_allocation_activity: bool,
        local_vcs_idle: bool,
        outstanding_credits: usize,
    ) -> Vec<(usize, Handshake)> {
        let mut out = Vec::new();
        match self.state {
            PowerState::PowerOn => {
                if had_allocation_activity {
                    self.idle_timer = 0;
                } else {
                    self.idle_timer += 1;
                }
                if self.gating_allowed && self.idle_timer >= self.params.idle_threshold {
                    self.transition(cycle, PowerState::Draining);
                    self.drain_timer = 0;
                    self.neighbour_drain_done.iter_mut().for_each(|d| *d = false);
                    for port in 0..self.neighbour_drain_done.len() {
                        out.push((
                            port,
                            Handshake {
                                handshake_id: self.new_handshake_id(),
                                origin_router: self.router,
                                new_state: Some(PowerState::Draining),
                                ..Default::default()
                            },
                        ));
                    }
                }
            }
            PowerState::Draining => {
                self.drain_timer += 1;
                let all_acked = self.neighbour_drain_done.iter().all(|&d| d);
                if all_acked && local_vcs_idle && outstanding_credits == 0 {
                    self.transition(cycle, PowerState::PowerOff);
                    self.off_timer = 0;
                } else if self.drain_timer > self.params.drain_threshold {
                    log::warn!("{cycle} | router{} | drain timeout, aborting to PowerOn", self.router);
                    self.transition(cycle, PowerState::PowerOn);
                    self.idle_timer = 0;
                }
            }
            PowerState::PowerOff => {
                self.off_timer += 1;
                if self.bypass_flit_count >= self.params.wakeup_threshold {
                    log::info!("{cycle} | router{} | bypassed flit count reached wakeup_threshold, waking up", self.router);
                    self.wake_up();
                    self.bypass_flit_count = 0;
                    for port in 0..self.neighbour_drain_done.len() {
                        out.push((
                            port,
                            Handshake {
                                handshake_id: self.new_handshake_id(),
                                origin_router: self.router,
                                wakeup: true,
                                ..Default::default()
                            },
                        ));
                    }
                } else if self.vc_alloc_retries.iter().any(|&r| r > self.params.performance_centric_wakeup_threshold) {
                    log::info!("{cycle} | router{} | wake-up monitor threshold exceeded, self-waking", self.router);
                    self.wake_up();
                    self.vc_alloc_retries.iter_mut().for_each(|r| *r = 0);
                }
            }
            PowerState::Wakeup => {
                self.wakeup_timer += 1;
                if self.wakeup_timer >= self.params.bet_threshold {
                    self.transition(cycle, PowerState::PowerOn);
                    self.idle_timer = 0;
                    for port in 0..self.neighbour_drain_done.len() {
                        out.push((
                            port,
                            Handshake {
                                handshake_id: self.new_handshake_id(),
                                origin_router: self.router,
                                src_state: Some(PowerState::PowerOn),
                                ..Default::default()
                            },
                        ));
                    }
                }
            }
        }
        out
    }

    fn transition(&mut self, cycle: usize, new_state: PowerState) {
        log::info!("{cycle} | router{} | {:?}->{:?}", self.router, self.state, new_state);
        self.state = new_state;
    }

    /// Process an incoming handshake from `port`. Returns a reply
    /// handshake when one is warranted (a drain request gets a
    /// `drain_done` response once the caller confirms no in-flight flit
    /// remains destined through the sender).
    pub fn on_handshake(&mut self, port: usize, hs: &Handshake, no_in_flight_through_sender: bool) -> Option<Handshake> {
        if hs.new_state == Some(PowerState::Draining) {
            if no_in_flight_through_sender {
                return Some(Handshake {
                    handshake_id: self.new_handshake_id(),
                    origin_router: self.router,
                    drain_done: true,
                    ..Default::default()
                });
            }
            return None;
        }
        if hs.drain_done {
            if port < self.neighbour_drain_done.len() {
                self.neighbour_drain_done[port] = true;
            }
        }
        if hs.wakeup && self.state == PowerState::PowerOff {
            self.wake_up();
        }
        if self.state == PowerState::Draining && hs.wakeup {
            // an incoming wake-up request aborts an in-progress drain.
            self.state = PowerState::PowerOn;
            self.idle_timer = 0;
        }
        None
    }

    /// Local or externally signalled wake-up (spec.md: `WakeUp()` or an
    /// incoming `wakeup=true` handshake).
    pub fn wake_up(&mut self) {
        if self.state == PowerState::PowerOff {
            self.state = PowerState::Wakeup;
            self.wakeup_timer = 0;
        }
    }

    pub fn is_off(&self) -> bool {
        self.state == PowerState::PowerOff
    }

    pub fn is_on(&self) -> bool {
        self.state == PowerState::PowerOn
    }
}
