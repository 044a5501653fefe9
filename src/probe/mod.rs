//! Protocol probes.
//!
//! Every probe returns a [`ValidationResult`] and never fails: transport
//! problems land in the result's error field. [`ProbeRouter`] dispatches an
//! endpoint to the probe for its scheme and enforces the time budget.

mod http;
mod udp;
pub mod wire;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error_handling::{InitializationError, ProbeErrorKind};
use crate::interface::{InterfaceBinder, InterfaceSelection};
use crate::models::{Endpoint, ProtocolKind, ValidationResult};

pub use http::HttpProbe;
pub use udp::UdpProbe;

/// Per-batch probe settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOptions {
    /// Upper bound on one probe, retries included
    pub timeout_budget: Duration,
    /// Wait for a single UDP reply
    pub socket_timeout: Duration,
    pub interface: Option<InterfaceSelection>,
}

/// A liveness check for one endpoint.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn check(&self, endpoint: &Endpoint, opts: &ProbeOptions) -> ValidationResult;
}

/// Dispatches endpoints to the probe matching their scheme.
pub struct ProbeRouter {
    http: HttpProbe,
    udp: UdpProbe,
}

impl ProbeRouter {
    pub fn new(
        user_agent: &str,
        default_udp_port: u16,
        binder: Arc<dyn InterfaceBinder>,
    ) -> Result<Self, InitializationError> {
        Ok(Self {
            http: HttpProbe::new(user_agent, Arc::clone(&binder))?,
            udp: UdpProbe::new(binder, default_udp_port),
        })
    }
}

#[async_trait]
impl Probe for ProbeRouter {
    async fn check(&self, endpoint: &Endpoint, opts: &ProbeOptions) -> ValidationResult {
        let probe: &dyn Probe = match endpoint.kind() {
            ProtocolKind::Http | ProtocolKind::Https => &self.http,
            ProtocolKind::Udp => &self.udp,
            ProtocolKind::Magnet | ProtocolKind::Unknown => {
                return ValidationResult::failed(
                    endpoint.clone(),
                    ProbeErrorKind::UnsupportedScheme,
                    format!("no probe for {} endpoints", endpoint.kind()),
                );
            }
        };

        match tokio::time::timeout(opts.timeout_budget, probe.check(endpoint, opts)).await {
            Ok(result) => result,
            Err(_) => ValidationResult::failed(
                endpoint.clone(),
                ProbeErrorKind::Timeout,
                format!(
                    "no usable reply within {:.1}s",
                    opts.timeout_budget.as_secs_f64()
                ),
            ),
        }
    }
}
