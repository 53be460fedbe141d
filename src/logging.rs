/*!
Thin wrapper installing the `log` backend (spec.md section 2's ambient
logging stack) when this crate is driven as a standalone run rather than
embedded behind someone else's logger. Grounded on `caminos-lib`'s own
binary entry point, which installs its logger once before building the
`Simulation`.
*/

use std::sync::Once;

static INIT: Once = Once::new();

/// Installs `pretty_env_logger` as the global logger, honoring `RUST_LOG`
/// the way a standalone run or test binary expects. Safe to call more than
/// once (and from more than one test in the same binary): only the first
/// call takes effect.
pub struct SimLogger;

impl SimLogger {
    pub fn init() {
        INIT.call_once(|| {
            let _ = pretty_env_logger::try_init();
        });
    }
}
