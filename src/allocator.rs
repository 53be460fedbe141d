/*!
Allocators for virtual-channel and switch allocation (spec.md section 4.1):
a round-robin arbiter and a separable (input-first then output-first)
matrix allocator over the same `Request`/`GrantedRequests` shape used by
`caminos-lib`'s `allocator` module, generalized to run both SA passes
described in spec.md section 4.2.
*/

use std::collections::HashMap;

use rand::rngs::StdRng;

/// A client (crossbar input or VA requester) wants a resource (crossbar
/// output or downstream VC), optionally with a priority where lower wins
/// ties.
#[derive(Clone, Copy, Debug)]
pub struct Request {
    pub client: usize,
    pub resource: usize,
    pub priority: i32,
}

impl Request {
    pub fn new(client: usize, resource: usize, priority: i32) -> Self {
        Request { client, resource, priority }
    }
}

#[derive(Default, Debug)]
pub struct GrantedRequests {
    pub grants: Vec<Request>,
}

/// Round-robin arbiter over `num_clients` indices for a single resource.
/// Each call to `arbitrate` returns the winning client (if any requested)
/// and advances the pointer past it, matching the per-(output,class)
/// round-robin offset spec.md section 4.2 requires for VA tie-breaking.
#[derive(Debug, Clone)]
pub struct RoundRobinArbiter {
    pointer: usize,
    num_clients: usize,
}

impl RoundRobinArbiter {
    pub fn new(num_clients: usize) -> Self {
        RoundRobinArbiter { pointer: 0, num_clients }
    }

    /// `requesters` need not be sorted; returns the winner (highest
    /// priority, ties broken by round-robin position starting at the
    /// pointer) and advances the pointer to just after the winner.
    pub fn arbitrate(&mut self, requesters: &[usize]) -> Option<usize> {
        if requesters.is_empty() || self.num_clients == 0 {
            return None;
        }
        let mut best: Option<usize> = None;
        let mut best_rank = usize::MAX;
        for &client in requesters {
            let rank = (client + self.num_clients - self.pointer) % self.num_clients;
            if rank < best_rank {
                best_rank = rank;
                best = Some(client);
            }
        }
        if let Some(winner) = best {
            self.pointer = (winner + 1) % self.num_clients;
        }
        best
    }
}

/// A separable allocator: runs an input-first then output-first matching
/// pass (or a single pass when `iterations == 1`), each arm driven by a
/// [`RoundRobinArbiter`] per client/resource. This is the "separable
/// input-first and output-first passes" of spec.md section 4.1/4.2,
/// generalized from `caminos-lib::allocator::islip::ISLIPAllocator`'s
/// iterative-matching idiom.
pub struct SeparableAllocator {
    num_clients: usize,
    num_resources: usize,
    client_arbiters: Vec<RoundRobinArbiter>,
    resource_arbiters: Vec<RoundRobinArbiter>,
    iterations: usize,
}

impl SeparableAllocator {
    pub fn new(num_clients: usize, num_resources: usize, iterations: usize) -> Self {
        SeparableAllocator {
            num_clients,
            num_resources,
            client_arbiters: (0..num_clients).map(|_| RoundRobinArbiter::new(num_resources)).collect(),
            resource_arbiters: (0..num_resources).map(|_| RoundRobinArbiter::new(num_clients)).collect(),
            iterations: iterations.max(1),
        }
    }

    /// Perform one allocation round over `requests`. Each client may
    /// appear multiple times (several candidate resources); at most one
    /// grant per client and per resource is produced.
    pub fn allocate(&mut self, requests: &[Request], _rng: &mut StdRng) -> GrantedRequests {
        let mut by_client: HashMap<usize, Vec<Request>> = HashMap::new();
        for &r in requests {
            by_client.entry(r.client).or_default().push(r);
        }
        let mut granted_clients = vec![false; self.num_clients];
        let mut granted_resources = vec![false; self.num_resources];
        let mut grants = Vec::new();

        for _ in 0..self.iterations {
            // Stage 1: each unmatched resource picks among unmatched clients requesting it.
            let mut resource_requests: HashMap<usize, Vec<Request>> = HashMap::new();
            for (&client, reqs) in by_client.iter() {
                if granted_clients[client] {
                    continue;
                }
                for &r in reqs {
                    if !granted_resources[r.resource] {
                        resource_requests.entry(r.resource).or_default().push(r);
                    }
                }
            }
            let mut stage1_winners: HashMap<usize, usize> = HashMap::new(); // resource -> client
            for (&resource, reqs) in resource_requests.iter() {
                let mut reqs_sorted = reqs.clone();
                reqs_sorted.sort_by_key(|r| r.priority);
                let best_priority = reqs_sorted[0].priority;
                let candidates: Vec<usize> = reqs_sorted
                    .iter()
                    .filter(|r| r.priority == best_priority)
                    .map(|r| r.client)
                    .collect();
                if let Some(winner) = self.resource_arbiters[resource].arbitrate(&candidates) {
                    stage1_winners.insert(resource, winner);
                }
            }
            // Stage 2: each client picks among the resources that picked it.
            let mut client_candidates: HashMap<usize, Vec<usize>> = HashMap::new();
            for (&resource, &client) in stage1_winners.iter() {
                client_candidates.entry(client).or_default().push(resource);
            }
            let mut any_grant = false;
            for (&client, resources) in client_candidates.iter() {
                if let Some(resource) = self.client_arbiters[client].arbitrate(resources) {
                    granted_clients[client] = true;
                    granted_resources[resource] = true;
                    grants.push(Request::new(client, resource, 0));
                    any_grant = true;
                }
            }
            if !any_grant {
                break;
            }
        }
        GrantedRequests { grants }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn round_robin_advances_pointer_past_winner() {
        let mut arb = RoundRobinArbiter::new(4);
        assert_eq!(arb.arbitrate(&[2, 0]), Some(0));
        assert_eq!(arb.arbitrate(&[2, 0]), Some(2));
    }

    #[test]
    fn separable_allocator_grants_disjoint_matching() {
        let mut alloc = SeparableAllocator::new(2, 2, 2);
        let mut rng = StdRng::seed_from_u64(1);
        let requests = vec![
            Request::new(0, 0, 0),
            Request::new(1, 0, 0),
            Request::new(1, 1, 0),
        ];
        let granted = alloc.allocate(&requests, &mut rng);
        let clients: Vec<usize> = granted.grants.iter().map(|g| g.client).collect();
        let resources: Vec<usize> = granted.grants.iter().map(|g| g.resource).collect();
        let mut clients_sorted = clients.clone();
        clients_sorted.sort();
        clients_sorted.dedup();
        assert_eq!(clients_sorted.len(), clients.len(), "no client granted twice");
        let mut resources_sorted = resources.clone();
        resources_sorted.sort();
        resources_sorted.dedup();
        assert_eq!(resources_sorted.len(), resources.len(), "no resource granted twice");
    }
}
