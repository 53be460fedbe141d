/*!
A cycle-accurate simulator for power-gated on-chip mesh interconnection
networks. Implements a shared input-queued router substrate with
credit-based virtual-channel flow control (spec.md section 4.1/4.2),
layered with three power-gating families — NoRD's bypass ring, the
FLOV/R-FLOV/G-FLOV fly-over datapath, and Router Parking's up* / down*
escape routing — over a 2-D mesh.

Grounded throughout on `caminos-lib`'s router/allocator/topology
structure, with the power-gating layer and its parameters restored from
`original_source` where the distilled specification named a behavior
without its exact mechanics.
*/

pub mod allocator;
pub mod buffer;
pub mod buffer_state;
pub mod channel;
pub mod config;
pub mod error;
pub mod logging;
pub mod message;
pub mod network;
pub mod router;
pub mod routing_function;
pub mod routing_table;
pub mod stats;
pub mod topology;
pub mod traffic_manager;

pub use config::Config;
pub use error::{PgNetError, Result};
pub use logging::SimLogger;
pub use network::Network;
pub use stats::SimReport;
