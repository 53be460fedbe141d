/*!
Error kinds for the simulator, matching the propagation policy of the
specification: configuration and routing failures abort at initialization,
invariant violations abort mid-simulation with a precise diagnostic, and
everything else (deadlock timers, drain timeouts) is a logged warning, not
an `Err`.
*/

use thiserror::Error;

/// The three abort-worthy error kinds of the simulator.
#[derive(Debug, Error, Clone)]
pub enum PgNetError {
    /// Unknown power-gating type, an inconsistent topology parameter, or a
    /// percentile that would park every router in a row. Surfaced at
    /// initialization.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A violated implementation invariant: destination out of range,
    /// double-reservation of a virtual channel, a credit for an unknown VC.
    /// Always carries the cycle and router at which it was detected.
    #[error("invariant violation at cycle {cycle}, router {router}: {message}")]
    Invariant {
        cycle: usize,
        router: usize,
        message: String,
    },

    /// The on-router subgraph is disconnected so Router Parking's escape
    /// tree cannot reach every on-router from every other.
    #[error("routing failure: {0}")]
    Routing(String),
}

impl PgNetError {
    pub fn invariant(cycle: usize, router: usize, message: impl Into<String>) -> Self {
        PgNetError::Invariant {
            cycle,
            router,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PgNetError>;
