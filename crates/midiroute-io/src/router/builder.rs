//! OutputRouter builder.

use super::OutputRouter;
use crate::config::{InFlightPolicy, RouterConfig};
use crate::endpoint::OutputEndpoint;
use crate::error::Result;

#[derive(Debug, Default)]
pub struct OutputRouterBuilder {
    pub(super) config: RouterConfig,
}

impl OutputRouterBuilder {
    pub fn config(mut self, config: RouterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn ignores_timestamps(mut self, value: bool) -> Self {
        self.config.ignores_timestamps = value;
        self
    }

    /// `build` fails if the endpoint cannot send sysex asynchronously.
    pub fn sends_sysex_asynchronously(mut self, value: bool) -> Self {
        self.config.sends_sysex_asynchronously = value;
        self
    }

    pub fn in_flight_policy(mut self, policy: InFlightPolicy) -> Self {
        self.config.in_flight_policy = policy;
        self
    }

    pub fn build(self, endpoint: impl Into<OutputEndpoint>) -> Result<OutputRouter> {
        OutputRouter::from_parts(endpoint.into(), self.config)
    }
}
