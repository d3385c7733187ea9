//! Process-wide, initialize-once runtime configuration.
//!
//! The configuration is written at most once (`init_runtime`) and read by
//! every pipeline invocation afterwards. The first read freezes the defaults
//! if nobody initialized it, so concurrent invocations never observe a change.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Use the optimized thinning primitive. When off, the tracer always
    /// takes the iterative morphological skeleton path.
    pub optimized: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self { optimized: true }
    }
}

static RUNTIME: OnceLock<RuntimeConfig> = OnceLock::new();

/// Install the process-wide configuration.
///
/// Returns the configuration that is actually in effect: `config` on the
/// first call, the previously frozen value on any later call.
pub fn init_runtime(config: RuntimeConfig) -> RuntimeConfig {
    *RUNTIME.get_or_init(|| config)
}

/// Read the process-wide configuration, freezing the defaults on first use.
pub fn runtime() -> RuntimeConfig {
    *RUNTIME.get_or_init(RuntimeConfig::default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_init_does_not_override() {
        let first = runtime();
        let second = init_runtime(RuntimeConfig {
            optimized: !first.optimized,
        });
        assert_eq!(first, second);
        assert_eq!(runtime(), first);
    }
}
