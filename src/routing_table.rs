/*!
Router Parking's [`RoutingTable`] (spec.md section 4.6), grounded directly
on `original_source/rp_src/routing_table.{hpp,cpp}`: a Dijkstra
shortest-path table over the on-router subgraph, and a BFS spanning tree
rooted at the fabric manager whose levels induce an up* / down* escape table
that is provably acyclic.
*/

use std::collections::VecDeque;

use crate::error::{PgNetError, Result};
use crate::message::RouterId;
use crate::topology::{Direction, Mesh};

/// Codomain of both tables: the next hop to take, or a terminal marker.
/// Named after `original_source`'s `DIR_{EAST,WEST,SOUTH,NORTH,ARRIVED}`
/// and `DIR_INVALID`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDirection {
    Invalid,
    Step(Direction),
    Arrived,
}

/// The two tables an on-router holds under Router Parking: a normal
/// shortest-path table for ordinary packets, and an escape table routed
/// up*/down* over a BFS spanning tree rooted at the fabric manager.
#[derive(Debug, Clone)]
pub struct RoutingTable {
    source: RouterId,
    rt_tbl: Vec<RouteDirection>,
    esc_rt_tbl: Vec<RouteDirection>,
}

impl RoutingTable {
    /// Build both tables for router `source` given which routers are on
    /// (`on_routers[i] == true`) and the root of the escape tree (the
    /// fabric manager).
    pub fn build(mesh: &Mesh, source: RouterId, on_routers: &[bool], fabric_manager: RouterId) -> Result<Self> {
        let rt_tbl = Self::build_route(mesh, source, on_routers);
        let esc_rt_tbl = Self::build_esc_route(mesh, source, on_routers, fabric_manager)?;
        Ok(RoutingTable { source, rt_tbl, esc_rt_tbl })
    }

    pub fn source(&self) -> RouterId {
        self.source
    }

    pub fn lookup(&self, destination: RouterId) -> RouteDirection {
        self.rt_tbl[destination]
    }

    pub fn lookup_escape(&self, destination: RouterId) -> RouteDirection {
        self.esc_rt_tbl[destination]
    }

    fn neighbours_on(mesh: &Mesh, router: RouterId, on_routers: &[bool]) -> Vec<(Direction, RouterId)> {
        Direction::ALL
            .into_iter()
            .filter_map(|dir| mesh.neighbour(router, *dir).map(|n| (*dir, n)))
            .filter(|&(_, n)| on_routers[n])
            .collect()
    }

    /// Dijkstra single-source shortest path over the on-router subgraph
    /// (`original_source/rp_src/routing_table.cpp::BuildRoute`).
    fn build_route(mesh: &Mesh, source: RouterId, on_routers: &[bool]) -> Vec<RouteDirection> {
        let n = mesh.num_routers();
        let mut dist = vec![usize::MAX; n];
        let mut first_hop: Vec<Option<Direction>> = vec![None; n];
        let mut visited = vec![false; n];
        if !on_routers[source] {
            return vec![RouteDirection::Invalid; n];
        }
        dist[source] = 0;
        loop {
            let u = (0..n)
                .filter(|&i| !visited[i] && dist[i] != usize::MAX)
                .min_by_key(|&i| dist[i]);
            let Some(u) = u else { break };
            visited[u] = true;
            for (dir, v) in Self::neighbours_on(mesh, u, on_routers) {
                let nd = dist[u] + 1;
                if nd < dist[v] {
                    dist[v] = nd;
                    first_hop[v] = if u == source { Some(dir) } else { first_hop[u] };
                }
            }
        }
        (0..n)
            .map(|d| {
                if d == source {
                    RouteDirection::Arrived
                } else {
                    match first_hop[d] {
                        Some(dir) => RouteDirection::Step(dir),
                        None => RouteDirection::Invalid,
                    }
                }
            })
            .collect()
    }

    /// BFS spanning tree rooted at `root`, then for each destination walk
    /// toward the root-direction successor at `source`'s tree level
    /// (`BuildEscRoute`). BFS level order makes the tree up*/down*: no
    /// down-then-up transition is possible because each router's only tree
    /// parent is at a strictly lower level, so following parent pointers
    /// from any two on-routers meets at their least common ancestor
    /// without revisiting a router (spec P6).
    fn build_esc_route(mesh: &Mesh, source: RouterId, on_routers: &[bool], root: RouterId) -> Result<Vec<RouteDirection>> {
        let n = mesh.num_routers();
        if !on_routers[root] {
            return Err(PgNetError::Routing(format!("fabric manager {root} is off")));
        }
        let mut parent: Vec<Option<RouterId>> = vec![None; n];
        let mut parent_dir: Vec<Option<Direction>> = vec![None; n];
        let mut visited = vec![false; n];
        let mut queue = VecDeque::new();
        visited[root] = true;
        queue.push_back(root);
        while let Some(u) = queue.pop_front() {
            for (dir, v) in Self::neighbours_on(mesh, u, on_routers) {
                if !visited[v] {
                    visited[v] = true;
                    parent[v] = Some(u);
                    parent_dir[v] = Some(dir.opposite());
                    queue.push_back(v);
                }
            }
        }
        let num_on: usize = on_routers.iter().filter(|&&b| b).count();
        if on_routers.iter().enumerate().any(|(i, &on)| on && !visited[i]) {
            return Err(PgNetError::Routing(
                "on-router subgraph is disconnected: escape tree cannot reach every on-router".into(),
            ));
        }
        if !on_routers[source] {
            return Ok(vec![RouteDirection::Invalid; n]);
        }
        // Distance from source to each ancestor along the tree, so we can
        // find the first edge of the path source -> destination within
        // the tree (walking both chains to their root/LCA).
        let mut ancestors_of_source = vec![source];
        let mut cur = source;
        while let Some(p) = parent[cur] {
            ancestors_of_source.push(p);
            cur = p;
        }
        let mut table = vec![RouteDirection::Invalid; n];
        for dest in 0..n {
            if !on_routers[dest] {
                continue;
            }
            if dest == source {
                table[dest] = RouteDirection::Arrived;
                continue;
            }
            // Walk dest up to the tree root, recording the path; find where
            // it first touches ancestors_of_source.
            let mut path_from_dest = vec![dest];
            let mut c = dest;
            while let Some(p) = parent[c] {
                path_from_dest.push(p);
                c = p;
            }
            let lca_index_in_source = ancestors_of_source
                .iter()
                .position(|a| path_from_dest.contains(a))
                .expect("root is common ancestor of every on-router");
            let lca = ancestors_of_source[lca_index_in_source];
            if lca_index_in_source > 0 {
                // first step is up, toward parent[source]; parent_dir[source]
                // already names the direction from source to its parent.
                table[dest] = parent_dir[source].map(RouteDirection::Step).unwrap_or(RouteDirection::Invalid);
            } else {
                // source is an ancestor of dest (or source == lca): first step is down.
                let idx = path_from_dest.iter().position(|&x| x == lca).unwrap();
                let next = path_from_dest[idx - 1];
                let dir = Direction::ALL.into_iter().find(|&d| mesh.neighbour(lca, *d) == Some(next)).copied();
                table[dest] = dir.map(RouteDirection::Step).unwrap_or(RouteDirection::Invalid);
            }
        }
        let _ = num_on;
        Ok(table)
    }
}
