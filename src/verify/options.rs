use std::time::Duration;

use crate::probe::{CatchAllFallback, ProbeOptions};
use crate::validator::ValidationMode;

/// Controls how [`verify_with_options`](crate::verify_with_options) checks an
/// address.
#[derive(Debug, Clone, Default)]
pub struct VerifyOptions {
    pub validation_mode: ValidationMode,
    pub probe: ProbeOptions,
    pub catch_all_fallback: CatchAllFallback,
}

impl VerifyOptions {
    pub fn with_port(mut self, port: u16) -> Self {
        self.probe.port = port;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.probe = self.probe.with_timeout(timeout);
        self
    }

    /// Treat an undeterminable catch-all check as a catch-all domain.
    pub fn fail_closed(mut self) -> Self {
        self.catch_all_fallback = CatchAllFallback::AssumeCatchAll;
        self
    }
}
