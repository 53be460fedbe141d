/*!
[`BufferState`]: the upstream-held view of a downstream input buffer's
occupancy and reservation, per output virtual channel (spec.md section
3/4.2). One `BufferState` sits at every router output port, mirroring the
downstream router's buffer, so switch/VC allocation can be decided locally
without a round trip.
*/

use crate::error::{PgNetError, Result};

/// Per-output-VC downstream view: who reserved it, how full it is, and its
/// capacity (which bypass-latch semantics may shrink to 1 while the
/// downstream router is off; spec.md section 3).
#[derive(Debug, Clone)]
struct VcEntry {
    capacity: usize,
    occupancy: usize,
    /// `(input_port, input_vc)` of the upstream holder, if reserved.
    reserved_by: Option<(usize, usize)>,
}

impl VcEntry {
    fn new(capacity: usize) -> Self {
        VcEntry {
            capacity,
            occupancy: 0,
            reserved_by: None,
        }
    }
}

/// `BufferState[output_vc]` for one output port.
#[derive(Debug, Clone)]
pub struct BufferState {
    vcs: Vec<VcEntry>,
}

impl BufferState {
    pub fn new(num_vcs: usize, capacity: usize) -> Self {
        BufferState {
            vcs: (0..num_vcs).map(|_| VcEntry::new(capacity)).collect(),
        }
    }

    pub fn num_vcs(&self) -> usize {
        self.vcs.len()
    }

    /// True only when no input currently owns `vc` (spec.md invariant).
    pub fn is_available_for(&self, vc: usize) -> bool {
        self.vcs[vc].reserved_by.is_none()
    }

    pub fn is_full_for(&self, vc: usize) -> bool {
        let e = &self.vcs[vc];
        e.occupancy >= e.capacity
    }

    pub fn occupancy(&self, vc: usize) -> usize {
        self.vcs[vc].occupancy
    }

    pub fn capacity(&self, vc: usize) -> usize {
        self.vcs[vc].capacity
    }

    /// Shrink a VC's capacity to 1, used when the downstream router powers
    /// off and only offers bypass-latch storage.
    pub fn set_bypass_capacity(&mut self, vc: usize, capacity: usize) {
        self.vcs[vc].capacity = capacity;
    }

    /// Reserve `vc` for `(input_port, input_vc)`. Fails as an invariant
    /// violation if it is already reserved by someone else (spec P3).
    pub fn reserve(&mut self, vc: usize, holder: (usize, usize), cycle: usize, router: usize) -> Result<()> {
        let e = &mut self.vcs[vc];
        if let Some(existing) = e.reserved_by {
            if existing != holder {
                return Err(PgNetError::invariant(
                    cycle,
                    router,
                    format!("output vc {vc} already reserved by {existing:?}, cannot grant to {holder:?}"),
                ));
            }
            return Ok(());
        }
        e.reserved_by = Some(holder);
        Ok(())
    }

    pub fn reserved_by(&self, vc: usize) -> Option<(usize, usize)> {
        self.vcs[vc].reserved_by
    }

    /// Release the reservation, e.g. when the tail flit is sent and the
    /// upstream VC returns to idle.
    pub fn release(&mut self, vc: usize) {
        self.vcs[vc].reserved_by = None;
    }

    /// Record a flit being sent into this VC (increments occupancy).
    pub fn send_flit(&mut self, vc: usize, cycle: usize, router: usize) -> Result<()> {
        let e = &mut self.vcs[vc];
        if e.occupancy >= e.capacity {
            return Err(PgNetError::invariant(
                cycle,
                router,
                format!("sent a flit into full output vc {vc}"),
            ));
        }
        e.occupancy += 1;
        Ok(())
    }

    /// Apply a credit: one buffer slot downstream has been freed.
    pub fn apply_credit(&mut self, vc: usize, cycle: usize, router: usize) -> Result<()> {
        let e = &mut self.vcs[vc];
        if e.occupancy == 0 {
            return Err(PgNetError::invariant(
                cycle,
                router,
                format!("received a credit for output vc {vc} with zero occupancy"),
            ));
        }
        e.occupancy -= 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reservation_is_exclusive() {
        let mut bs = BufferState::new(2, 4);
        bs.reserve(0, (1, 0), 0, 0).unwrap();
        assert!(bs.reserve(0, (2, 0), 0, 0).is_err());
        assert!(!bs.is_available_for(0));
        bs.release(0);
        assert!(bs.is_available_for(0));
    }

    #[test]
    fn occupancy_tracks_sends_and_credits() {
        let mut bs = BufferState::new(1, 2);
        bs.send_flit(0, 0, 0).unwrap();
        assert!(!bs.is_full_for(0));
        bs.send_flit(0, 0, 0).unwrap();
        assert!(bs.is_full_for(0));
        assert!(bs.send_flit(0, 0, 0).is_err());
        bs.apply_credit(0, 0, 0).unwrap();
        assert!(!bs.is_full_for(0));
    }

    #[test]
    fn bypass_capacity_can_shrink_to_one() {
        let mut bs = BufferState::new(1, 8);
        bs.set_bypass_capacity(0, 1);
        bs.send_flit(0, 0, 0).unwrap();
        assert!(bs.is_full_for(0));
    }
}
