//! Runtime configuration that downstream crates can serialize/deserialize.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Run debug-time plan verification before executing a request.
    /// Cheap relative to execution; catches hand-assembled plan bugs early.
    pub verify_plans: bool,

    /// Capacity of the diagnostic event channel. Emission is best-effort:
    /// when the channel is full, events are dropped rather than blocking
    /// the executor.
    pub event_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            verify_plans: true,
            event_capacity: 1024,
        }
    }
}

impl RuntimeConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `TRELLIS_VERIFY_PLANS`: "0"/"false" to disable plan verification
    /// - `TRELLIS_EVENT_CAPACITY`: event channel capacity
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(s) = std::env::var("TRELLIS_VERIFY_PLANS") {
            cfg.verify_plans = !matches!(s.as_str(), "0" | "false" | "off");
        }

        if let Ok(s) = std::env::var("TRELLIS_EVENT_CAPACITY") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.event_capacity = v.max(1);
            }
        }

        cfg
    }
}
