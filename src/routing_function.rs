/*!
The pluggable routing function used by route computation (spec.md section
4.2 "RC"). Grounded on `caminos-lib::routing::basic::DOR` (dimension-order
routing over `CartesianData`): `Dor` is the default, canonical routing
function for a 2-D mesh, generalized here to emit the
`(output_port, vc_start, vc_end, priority)` tuples spec.md's data model
requires rather than a single candidate.
*/

use crate::message::{LookaheadRoute, RouterId};
use crate::topology::{Direction, Mesh};

/// An output set for a head flit at `(current, destination)`, one tuple
/// per admissible `(port, vc range)` candidate.
pub trait RoutingFunction {
    fn route(&self, mesh: &Mesh, current: RouterId, destination: RouterId, num_vcs: usize) -> Vec<LookaheadRoute>;
}

/// Dimension-order (XY) routing: exhaust the first dimension's offset,
/// then the second. Deadlock-free on its own only for cycle-free VC
/// assignment; Router Parking additionally overlays an escape table for
/// when off routers break the minimal path (spec.md section 4.3).
#[derive(Debug, Clone, Default)]
pub struct Dor;

impl RoutingFunction for Dor {
    fn route(&self, mesh: &Mesh, current: RouterId, destination: RouterId, num_vcs: usize) -> Vec<LookaheadRoute> {
        if current == destination {
            return Vec::new();
        }
        let cur = mesh.unpack(current);
        let dst = mesh.unpack(destination);
        let dir = if cur[0] != dst[0] {
            if dst[0] as i64 > cur[0] as i64 { Direction::East } else { Direction::West }
        } else {
            if dst[1] as i64 > cur[1] as i64 { Direction::South } else { Direction::North }
        };
        vec![LookaheadRoute {
            output_port: dir.as_port(),
            vc_start: 0,
            vc_end: num_vcs,
            priority: 0,
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dor_exhausts_x_before_y() {
        let mesh = Mesh::new_2d(4, 4);
        let dor = Dor;
        // 0 -> 15: (0,0) to (3,3): first move east.
        let candidates = dor.route(&mesh, 0, 15, 2);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].output_port, Direction::East.as_port());
    }

    #[test]
    fn dor_returns_empty_at_destination() {
        let mesh = Mesh::new_2d(4, 4);
        let dor = Dor;
        assert!(dor.route(&mesh, 5, 5, 2).is_empty());
    }
}
