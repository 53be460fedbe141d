/*!
Small, router-struct-independent pieces of the IQ pipeline (spec.md
section 4.2): the switch-allocation stall taxonomy, and the
input-VC-to-request conversion used by both VA and SA. Kept free of
`Router`'s private fields so the vocabulary can be unit tested in
isolation.
*/

/// Why a switch-allocation request did not win this cycle (spec.md section
/// 4.2: "Stall kinds are classified").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StallKind {
    /// The downstream VC is currently receiving from a different input.
    BufferBusy,
    /// Two inputs in the same cycle want the same (port,vc) with equal
    /// priority and lost the tie-break.
    BufferConflict,
    /// The downstream buffer has no free slot.
    BufferFull,
    /// The downstream VC is reserved by a different packet's input.
    BufferReserved,
    /// Another input already won this output port's crossbar slot.
    CrossbarConflict,
}

/// Flattens an `(port, vc)` pair into a single allocator client/resource
/// index, the same convention `caminos-lib::allocator::VCARequest` uses
/// (`entry_port * num_vcs + entry_vc`).
pub fn flatten(port: usize, vc: usize, num_vcs: usize) -> usize {
    port * num_vcs + vc
}

pub fn unflatten(index: usize, num_vcs: usize) -> (usize, usize) {
    (index / num_vcs, index % num_vcs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flatten_unflatten_round_trip() {
        for port in 0..5 {
            for vc in 0..4 {
                let flat = flatten(port, vc, 4);
                assert_eq!(unflatten(flat, 4), (port, vc));
            }
        }
    }
}
