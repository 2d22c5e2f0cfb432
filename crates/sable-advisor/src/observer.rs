//! Observation side-channel for advisor emissions.
//!
//! The advisor never logs through the global subscriber directly; it takes an
//! [`Observer`] at construction. The default forwards to `tracing`, which
//! keeps silent operation and test capture a constructor argument away.

use std::sync::Mutex;

use tracing::{info, warn};

/// Sink for the advisor's informational and warning emissions.
pub trait Observer: Send + Sync {
    fn inform(&self, message: &str);
    fn warning(&self, message: &str);
}

/// Forwards emissions to the `tracing` macros. The default observer.
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn inform(&self, message: &str) {
        info!("{message}");
    }

    fn warning(&self, message: &str) {
        warn!("{message}");
    }
}

/// Records emissions for inspection in tests.
#[derive(Default)]
pub struct CapturingObserver {
    infos: Mutex<Vec<String>>,
    warnings: Mutex<Vec<String>>,
}

impl CapturingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn infos(&self) -> Vec<String> {
        self.infos.lock().expect("observer lock poisoned").clone()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.warnings.lock().expect("observer lock poisoned").clone()
    }
}

impl Observer for CapturingObserver {
    fn inform(&self, message: &str) {
        self.infos
            .lock()
            .expect("observer lock poisoned")
            .push(message.to_string());
    }

    fn warning(&self, message: &str) {
        self.warnings
            .lock()
            .expect("observer lock poisoned")
            .push(message.to_string());
    }
}
