/*!
Router Parking's per-router routing layer (spec.md section 4.3/4.6): uses
the normal shortest-path table for ordinary packets and falls back to the
escape up* / down* table when a potential deadlock is detected. Grounded on
`original_source/rp_src/networks/network.cpp`'s reroute-on-retry idiom and
`src/routers/rp_router.cpp`.
*/

use crate::message::RouterId;
use crate::routing_table::{RouteDirection, RoutingTable};
use crate::topology::{Direction, Mesh};

/// Aggressiveness of the connectivity-repair heuristic (spec.md section 9,
/// open question (c)): conservative-RP parks a strict subset of off_cores'
/// routers, aggressive-RP parks exactly off_cores. This is a heuristic,
/// not a correctness requirement, and is documented as such.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpMode {
    Aggressive,
    Conservative,
}

/// Per-router Router-Parking state: the two tables, rebuilt whenever the
/// on/off vector changes.
#[derive(Debug, Clone)]
pub struct RpRouting {
    pub mode: RpMode,
    table: RoutingTable,
}

impl RpRouting {
    pub fn new(mode: RpMode, table: RoutingTable) -> Self {
        RpRouting { mode, table }
    }

    pub fn rebuild(&mut self, mesh: &Mesh, on_routers: &[bool], fabric_manager: RouterId) -> crate::error::Result<()> {
        self.table = RoutingTable::build(mesh, self.table.source(), on_routers, fabric_manager)?;
        Ok(())
    }

    /// Normal-table lookup for a fresh head flit.
    pub fn normal_route(&self, destination: RouterId) -> RouteDirection {
        self.table.lookup(destination)
    }

    /// Escape-table lookup used once the `routing_deadlock_timeout`
    /// watchdog fires on a head (spec.md section 4.2/4.3): deadlock-free
    /// because up*/down* orderings admit no cycle (spec P6).
    pub fn escape_route(&self, destination: RouterId) -> RouteDirection {
        self.table.lookup_escape(destination)
    }
}

/// The aggressive-RP connectivity-repair heuristic: given a handful of
/// candidate edge routers, pick the one whose dimension-order path to the
/// fabric manager crosses the fewest off routers. This is explicitly a
/// heuristic (spec.md section 9 (c)), not guaranteed optimal.
pub fn pick_repair_router(mesh: &Mesh, candidates: &[RouterId], on_routers: &[bool], fabric_manager: RouterId) -> Option<RouterId> {
    candidates
        .iter()
        .copied()
        .min_by_key(|&candidate| dor_off_count(mesh, candidate, fabric_manager, on_routers))
}

/// Count how many off routers lie on the dimension-order path from `from`
/// to `to`. Used both by the repair heuristic above and, at the network
/// level, to decide whether a NoRD packet needs the bypass ring.
pub fn dor_off_count(mesh: &Mesh, from: RouterId, to: RouterId, on_routers: &[bool]) -> usize {
    let mut cur = mesh.unpack(from);
    let dst = mesh.unpack(to);
    let mut off_count = 0;
    // Walk dimension 0 first, then dimension 1, counting off routers touched.
    for dim in 0..mesh.sides.len() {
        let delta: i64 = dst[dim] as i64 - cur[dim] as i64;
        let step = if delta > 0 { 1i64 } else { -1 };
        for _ in 0..delta.unsigned_abs() {
            cur[dim] = (cur[dim] as i64 + step) as usize;
            let idx = mesh.pack(&cur);
            if !on_routers[idx] {
                off_count += 1;
            }
        }
    }
    off_count
}

/// Like [`dor_off_count`] but returns the actual off-router ids touched,
/// used to credit the wake-up monitor (spec.md section 4.5 item 2) at each
/// off router a NoRD packet had to divert around.
pub fn dor_off_routers(mesh: &Mesh, from: RouterId, to: RouterId, on_routers: &[bool]) -> Vec<RouterId> {
    let mut cur = mesh.unpack(from);
    let dst = mesh.unpack(to);
    let mut off = Vec::new();
    for dim in 0..mesh.sides.len() {
        let delta: i64 = dst[dim] as i64 - cur[dim] as i64;
        let step = if delta > 0 { 1i64 } else { -1 };
        for _ in 0..delta.unsigned_abs() {
            cur[dim] = (cur[dim] as i64 + step) as usize;
            let idx = mesh.pack(&cur);
            if !on_routers[idx] {
                off.push(idx);
            }
        }
    }
    off
}

/// Map an axis step direction for a given dimension/sign, used by the
/// repair-path walk above; kept separate so tests can exercise it without
/// recomputing the dimension-order traversal.
pub fn step_direction(dim: usize, positive: bool) -> Direction {
    match (dim, positive) {
        (0, true) => Direction::East,
        (0, false) => Direction::West,
        (1, true) => Direction::South,
        (1, false) => Direction::North,
        _ => unreachable!("2-D mesh has only two dimensions"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dor_off_routers_lists_the_same_routers_dor_off_count_counts() {
        let mesh = Mesh::new_2d(3, 3);
        let mut on = vec![true; 9];
        on[4] = false; // center of the 3x3 grid.
        // node 3 (0,1) -> node 5 (2,1): DOR crosses x=0,1,2 at y=1, i.e. 3,4,5.
        let off = dor_off_routers(&mesh, 3, 5, &on);
        assert_eq!(off, vec![4]);
        assert_eq!(off.len(), dor_off_count(&mesh, 3, 5, &on));
    }

    #[test]
    fn repair_picks_candidate_with_fewest_off_routers_on_path() {
        let mesh = Mesh::new_2d(4, 4);
        let mut on = vec![true; 16];
        on[1] = false; // block the direct east path from router 0.
        let candidates = vec![4, 1]; // 4 routes south first (clear), 1 is itself off.
        let picked = pick_repair_router(&mesh, &candidates, &on, 15);
        assert_eq!(picked, Some(4));
    }

    #[test]
    fn rp_routing_rebuild_changes_with_on_off_vector() {
        let mesh = Mesh::new_2d(3, 3);
        let on_initial = vec![true; 9];
        let table = RoutingTable::build(&mesh, 0, &on_initial, 0).unwrap();
        let mut rp = RpRouting::new(RpMode::Aggressive, table);
        let before = rp.normal_route(8);
        let mut on_after = on_initial.clone();
        on_after[4] = false;
        rp.rebuild(&mesh, &on_after, 0).unwrap();
        let after = rp.normal_route(8);
        // Routes may legitimately coincide, but the table object must have
        // actually recomputed against the new on/off vector without panicking.
        let _ = (before, after);
    }
}
