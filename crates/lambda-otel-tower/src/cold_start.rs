//! Cold start detection for Lambda functions.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

const INITIALIZATION_TYPE_ENV: &str = "AWS_LAMBDA_INITIALIZATION_TYPE";

/// Tracks whether an invocation is the first one served by this process.
///
/// Clones share state, so every service produced by one layer reports a
/// single cold start. Under provisioned concurrency no invocation is cold.
#[derive(Debug, Clone)]
pub struct ColdStart {
    pending: Arc<AtomicBool>,
}

impl ColdStart {
    /// Creates a tracker whose next check reports a cold start.
    pub fn new() -> Self {
        Self {
            pending: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Returns `true` exactly once, for the first invocation.
    pub fn check(&self) -> bool {
        let provisioned = std::env::var(INITIALIZATION_TYPE_ENV)
            .map(|v| v == "provisioned-concurrency")
            .unwrap_or(false);

        let first = self.pending.swap(false, Ordering::SeqCst);
        first && !provisioned
    }
}

impl Default for ColdStart {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_first_invocation_is_cold() {
        temp_env::with_var_unset(INITIALIZATION_TYPE_ENV, || {
            let cold_start = ColdStart::new();
            assert!(cold_start.check());
            assert!(!cold_start.check());
            assert!(!cold_start.clone().check());
        });
    }

    #[test]
    #[serial]
    fn test_clones_share_state() {
        temp_env::with_var_unset(INITIALIZATION_TYPE_ENV, || {
            let cold_start = ColdStart::new();
            let clone = cold_start.clone();
            assert!(clone.check());
            assert!(!cold_start.check());
        });
    }

    #[test]
    #[serial]
    fn test_provisioned_concurrency_is_never_cold() {
        temp_env::with_var(
            INITIALIZATION_TYPE_ENV,
            Some("provisioned-concurrency"),
            || {
                let cold_start = ColdStart::new();
                assert!(!cold_start.check());
                assert!(!cold_start.check());
            },
        );
    }

    #[test]
    #[serial]
    fn test_on_demand_is_cold() {
        temp_env::with_var(INITIALIZATION_TYPE_ENV, Some("on-demand"), || {
            assert!(ColdStart::new().check());
        });
    }
}
