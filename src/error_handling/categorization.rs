//! Error categorization and retry strategy.
//!
//! This module maps transport errors onto the probe failure taxonomy and
//! configures the UDP connect retry schedule.

use std::error::Error as StdError;
use std::io;
use std::time::Duration;

use tokio_retry::strategy::FixedInterval;

use super::types::ProbeErrorKind;
use crate::config::UDP_MAX_RETRIES;

/// Creates the retry schedule for UDP connect attempts.
///
/// Retries follow immediately: the wait for a reply already spaced them out by
/// the socket timeout. Limited to `UDP_MAX_RETRIES` additional attempts.
pub fn get_retry_strategy() -> impl Iterator<Item = Duration> {
    FixedInterval::from_millis(0).take(UDP_MAX_RETRIES)
}

/// Categorizes a `reqwest::Error` into a `ProbeErrorKind`.
///
/// DNS failures are reported by the connector as generic connect errors, so
/// the error chain is inspected for resolver messages and refused connections.
pub fn categorize_reqwest_error(error: &reqwest::Error) -> ProbeErrorKind {
    if error.is_timeout() {
        return ProbeErrorKind::Timeout;
    }

    if let Some(kind) = categorize_error_chain(error) {
        return kind;
    }

    if error.is_connect() {
        ProbeErrorKind::Unknown
    } else if error.is_decode() || error.is_body() || error.is_redirect() {
        ProbeErrorKind::ProtocolMismatch
    } else {
        ProbeErrorKind::Unknown
    }
}

/// Categorizes an I/O error raised by a socket operation.
pub fn categorize_io_error(error: &io::Error) -> ProbeErrorKind {
    match error.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => ProbeErrorKind::Timeout,
        io::ErrorKind::ConnectionRefused | io::ErrorKind::ConnectionReset => {
            ProbeErrorKind::ConnectionRefused
        }
        _ if is_dns_message(&error.to_string()) => ProbeErrorKind::DnsResolutionFailed,
        _ => ProbeErrorKind::Unknown,
    }
}

fn categorize_error_chain(error: &(dyn StdError + 'static)) -> Option<ProbeErrorKind> {
    let mut current: Option<&(dyn StdError + 'static)> = Some(error);
    while let Some(cause) = current {
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            match io_err.kind() {
                io::ErrorKind::ConnectionRefused => return Some(ProbeErrorKind::ConnectionRefused),
                io::ErrorKind::TimedOut => return Some(ProbeErrorKind::Timeout),
                _ => {}
            }
        }
        if is_dns_message(&cause.to_string()) {
            return Some(ProbeErrorKind::DnsResolutionFailed);
        }
        current = cause.source();
    }
    None
}

fn is_dns_message(message: &str) -> bool {
    let msg = message.to_lowercase();
    msg.contains("dns error")
        || msg.contains("failed to lookup address")
        || msg.contains("name or service not known")
        || msg.contains("no such host")
        || msg.contains("nodename nor servname")
        || msg.contains("name resolution")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_strategy_is_bounded() {
        let delays: Vec<Duration> = get_retry_strategy().collect();
        assert_eq!(delays.len(), UDP_MAX_RETRIES);
        assert!(delays.iter().all(|d| d.is_zero()));
    }

    #[test]
    fn test_categorize_io_error_kinds() {
        assert_eq!(
            categorize_io_error(&io::Error::from(io::ErrorKind::TimedOut)),
            ProbeErrorKind::Timeout
        );
        assert_eq!(
            categorize_io_error(&io::Error::from(io::ErrorKind::ConnectionRefused)),
            ProbeErrorKind::ConnectionRefused
        );
        assert_eq!(
            categorize_io_error(&io::Error::from(io::ErrorKind::PermissionDenied)),
            ProbeErrorKind::Unknown
        );
    }

    #[test]
    fn test_categorize_io_error_dns_message() {
        let err = io::Error::new(
            io::ErrorKind::Other,
            "failed to lookup address information: Name or service not known",
        );
        assert_eq!(categorize_io_error(&err), ProbeErrorKind::DnsResolutionFailed);
    }

    #[test]
    fn test_error_chain_finds_nested_refusal() {
        #[derive(Debug)]
        struct Wrapper(io::Error);
        impl std::fmt::Display for Wrapper {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("client error (Connect)")
            }
        }
        impl StdError for Wrapper {
            fn source(&self) -> Option<&(dyn StdError + 'static)> {
                Some(&self.0)
            }
        }

        let err = Wrapper(io::Error::from(io::ErrorKind::ConnectionRefused));
        assert_eq!(
            categorize_error_chain(&err),
            Some(ProbeErrorKind::ConnectionRefused)
        );
    }

    #[tokio::test]
    async fn test_categorize_reqwest_refused_connection() {
        // Bind then drop a listener so the port is known to be closed
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let client = reqwest::Client::new();
        let err = client
            .get(format!("http://127.0.0.1:{port}/announce"))
            .send()
            .await
            .unwrap_err();
        assert_eq!(
            categorize_reqwest_error(&err),
            ProbeErrorKind::ConnectionRefused
        );
    }
}
