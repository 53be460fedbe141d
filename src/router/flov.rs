/*!
The FLOV family's fly-over datapath (spec.md section 4.3): while a router
is `power_off`, it still clocks a minimal path forwarding any flit
arriving at input port `p` to output port `opp(p)` with one cycle of
latency. Grounded on `original_source/flov_src/routers/router.hpp` and
`booksim2/src/routers/{flov_router,rflov_router}.hpp`.
*/

use crate::message::Flit;
use crate::topology::Direction;

/// Which axes a parked router keeps a fly-over path alive on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlyOverPolicy {
    /// FLOV: fly-over forbidden, fully off (source calls this No-FLOV).
    NoFlyOver,
    /// R-FLOV: fly-over permitted on one ring dimension only.
    OneDimension(FlyOverAxis),
    /// G-FLOV: fly-over permitted on both dimensions.
    BothDimensions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlyOverAxis {
    Horizontal,
    Vertical,
}

fn axis_of(dir: Direction) -> FlyOverAxis {
    match dir {
        Direction::East | Direction::West => FlyOverAxis::Horizontal,
        Direction::South | Direction::North => FlyOverAxis::Vertical,
    }
}

impl FlyOverPolicy {
    pub fn allows(&self, entry_port: Direction) -> bool {
        match self {
            FlyOverPolicy::NoFlyOver => false,
            FlyOverPolicy::BothDimensions => true,
            FlyOverPolicy::OneDimension(axis) => axis_of(entry_port) == *axis,
        }
    }
}

/// One in-flight flit occupying the fly-over latch on a given input port.
/// It departs the opposite port after one cycle (spec.md: "one-cycle
/// latency"), using `bypass_vc` as temporary storage identity so the next
/// on-router can return a credit for it once freed.
#[derive(Debug)]
pub struct FlyOverLatch {
    entry_port: Direction,
    flit: Option<Flit>,
}

impl FlyOverLatch {
    pub fn new(entry_port: Direction) -> Self {
        FlyOverLatch { entry_port, flit: None }
    }

    pub fn is_busy(&self) -> bool {
        self.flit.is_some()
    }

    /// Latch an arriving flit, recording the bypass VC it used at entry.
    pub fn admit(&mut self, mut flit: Flit, entry_vc: usize) {
        flit.bypass_vc = Some(entry_vc);
        self.flit = Some(flit);
    }

    /// After one cycle, release the flit toward the opposite port.
    pub fn drain(&mut self) -> Option<(Direction, Flit)> {
        self.flit.take().map(|f| (self.entry_port.opposite(), f))
    }
}
