//! HTTP client initialization.
//!
//! Probe clients share one configuration: the user agent, a bounded redirect
//! policy and no global timeout (each request carries its own budget).

use reqwest::{redirect, ClientBuilder};

/// Redirect hops followed before a probe gives up.
const MAX_REDIRECTS: usize = 5;

/// Returns a builder preconfigured for tracker probes.
///
/// Interface binding is applied on top of this by the caller when needed.
pub fn client_builder(user_agent: &str) -> ClientBuilder {
    ClientBuilder::new()
        .user_agent(user_agent.to_string())
        .redirect(redirect::Policy::limited(MAX_REDIRECTS))
        .pool_max_idle_per_host(1)
}

/// Initializes the unbound HTTP client used by probes.
///
/// # Errors
///
/// Returns a `reqwest::Error` if client creation fails.
pub fn init_client(user_agent: &str) -> Result<reqwest::Client, reqwest::Error> {
    client_builder(user_agent).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_USER_AGENT;

    #[test]
    fn test_init_client() {
        assert!(init_client(DEFAULT_USER_AGENT).is_ok());
    }
}
