/*!
The 2-D mesh substrate. Per spec.md section 1, topology builders beyond a
2-D mesh are out of scope external collaborators; this module still needs
to produce the mesh's own channel wiring, since without it there is no
network to drive. Grounded on the coordinate-stepping idiom of
`caminos-lib`'s `topology::cartesian::Mesh` (`neighbour()` walking
`(dimension, delta)` over `CartesianData`), simplified to exactly the
`k`-ary `n`-mesh the spec names in its configuration keys (`k` and `n`).
*/

use crate::message::RouterId;

/// A cardinal direction on the mesh, also used as a router port index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    East,
    West,
    South,
    North,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Direction::East, Direction::West, Direction::South, Direction::North];

    pub fn opposite(self) -> Direction {
        match self {
            Direction::East => Direction::West,
            Direction::West => Direction::East,
            Direction::South => Direction::North,
            Direction::North => Direction::South,
        }
    }

    pub fn as_port(self) -> usize {
        match self {
            Direction::East => 0,
            Direction::West => 1,
            Direction::South => 2,
            Direction::North => 3,
        }
    }
}

/// A `k`-ary `n`-mesh: `k` routers per dimension, `n` dimensions. The
/// specification's worked examples are all 2-D (`n=2`), but the geometry
/// generalizes the same way `caminos-lib::CartesianData` does.
#[derive(Debug, Clone)]
pub struct Mesh {
    pub sides: Vec<usize>,
}

impl Mesh {
    pub fn new_2d(k: usize, n_cols: usize) -> Self {
        Mesh { sides: vec![k, n_cols] }
    }

    pub fn num_routers(&self) -> usize {
        self.sides.iter().product()
    }

    pub fn unpack(&self, index: RouterId) -> Vec<usize> {
        let mut coords = vec![0; self.sides.len()];
        let mut rem = index;
        for (d, &side) in self.sides.iter().enumerate() {
            coords[d] = rem % side;
            rem /= side;
        }
        coords
    }

    pub fn pack(&self, coords: &[usize]) -> RouterId {
        let mut index = 0;
        let mut mul = 1;
        for (d, &side) in self.sides.iter().enumerate() {
            index += coords[d] * mul;
            mul *= side;
        }
        index
    }

    /// `None` when `router` has no neighbour in `dir` (mesh edge).
    pub fn neighbour(&self, router: RouterId, dir: Direction) -> Option<RouterId> {
        let mut coords = self.unpack(router);
        let (dim, delta): (usize, i64) = match dir {
            Direction::East => (0, 1),
            Direction::West => (0, -1),
            Direction::South => (1, 1),
            Direction::North => (1, -1),
        };
        let side = self.sides[dim] as i64;
        let new_coord = coords[dim] as i64 + delta;
        if new_coord < 0 || new_coord >= side {
            return None;
        }
        coords[dim] = new_coord as usize;
        Some(self.pack(&coords))
    }

    pub fn manhattan_distance(&self, a: RouterId, b: RouterId) -> usize {
        let ca = self.unpack(a);
        let cb = self.unpack(b);
        ca.iter().zip(cb.iter()).map(|(&x, &y)| (x as i64 - y as i64).unsigned_abs() as usize).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_unpack_round_trip() {
        let mesh = Mesh::new_2d(4, 4);
        for i in 0..mesh.num_routers() {
            let c = mesh.unpack(i);
            assert_eq!(mesh.pack(&c), i);
        }
    }

    #[test]
    fn edge_routers_have_no_neighbour_off_mesh() {
        let mesh = Mesh::new_2d(4, 4);
        assert_eq!(mesh.neighbour(0, Direction::West), None);
        assert_eq!(mesh.neighbour(0, Direction::North), None);
        assert_eq!(mesh.neighbour(0, Direction::East), Some(1));
        assert_eq!(mesh.neighbour(0, Direction::South), Some(4));
    }

    #[test]
    fn single_router_mesh_is_isolated() {
        let mesh = Mesh::new_2d(1, 1);
        for dir in Direction::ALL {
            assert_eq!(mesh.neighbour(0, dir), None);
        }
    }
}
