//! HTTP/HTTPS tracker probe.
//!
//! Any HTTP response within the budget counts as alive, including error
//! statuses and tracker failure bodies: the probe measures reachability, not
//! announce success.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use async_trait::async_trait;
use log::{debug, warn};

use crate::error_handling::{categorize_reqwest_error, InitializationError, ProbeErrorKind};
use crate::initialization::{client_builder, init_client};
use crate::interface::{InterfaceBinder, InterfaceSelection};
use crate::models::{Endpoint, ValidationResult};

use super::{Probe, ProbeOptions};

/// Issues one GET against the announce URL.
pub struct HttpProbe {
    client: reqwest::Client,
    user_agent: String,
    binder: Arc<dyn InterfaceBinder>,
    /// Bound clients by interface name
    bound_clients: Mutex<HashMap<String, reqwest::Client>>,
}

impl HttpProbe {
    pub fn new(
        user_agent: &str,
        binder: Arc<dyn InterfaceBinder>,
    ) -> Result<Self, InitializationError> {
        Ok(Self {
            client: init_client(user_agent)?,
            user_agent: user_agent.to_string(),
            binder,
            bound_clients: Mutex::new(HashMap::new()),
        })
    }

    /// Picks the client for this probe, binding it to the selected interface.
    ///
    /// Falls back to the unbound client unless binding is required.
    fn client_for(
        &self,
        interface: Option<&InterfaceSelection>,
    ) -> Result<reqwest::Client, (ProbeErrorKind, String)> {
        let Some(selection) = interface else {
            return Ok(self.client.clone());
        };

        let mut bound = self
            .bound_clients
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(client) = bound.get(&selection.name) {
            return Ok(client.clone());
        }

        let built = self
            .binder
            .bind_http(client_builder(&self.user_agent), &selection.name)
            .map_err(|e| e.to_string())
            .and_then(|builder| builder.build().map_err(|e| e.to_string()));
        match built {
            Ok(client) => {
                bound.insert(selection.name.clone(), client.clone());
                Ok(client)
            }
            Err(e) if selection.required => Err((ProbeErrorKind::BindFailure, e)),
            Err(e) => {
                warn!(
                    "Could not bind HTTP probe to {}, using default route: {e}",
                    selection.name
                );
                Ok(self.client.clone())
            }
        }
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn check(&self, endpoint: &Endpoint, opts: &ProbeOptions) -> ValidationResult {
        let client = match self.client_for(opts.interface.as_ref()) {
            Ok(client) => client,
            Err((kind, detail)) => return ValidationResult::failed(endpoint.clone(), kind, detail),
        };

        let started = Instant::now();
        match client
            .get(endpoint.raw().trim())
            .timeout(opts.timeout_budget)
            .send()
            .await
        {
            Ok(response) => {
                let elapsed = started.elapsed();
                debug!(
                    "HTTP probe of {} answered {} in {:.3}s",
                    endpoint.raw(),
                    response.status(),
                    elapsed.as_secs_f64()
                );
                ValidationResult::alive(endpoint.clone(), elapsed)
            }
            Err(e) => {
                let kind = categorize_reqwest_error(&e);
                debug!("HTTP probe of {} failed: {kind}: {e}", endpoint.raw());
                ValidationResult::failed(endpoint.clone(), kind, e.to_string())
            }
        }
    }
}
