//! UDP tracker probe: the BEP 15 connect handshake as a liveness signal.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use log::{debug, warn};
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio::time::timeout_at;
use tokio_retry::RetryIf;

use crate::config::UDP_RECV_BUFFER_LEN;
use crate::error_handling::{categorize_io_error, get_retry_strategy, ProbeErrorKind};
use crate::interface::{InterfaceBinder, InterfaceSelection};
use crate::models::{Endpoint, ValidationResult};

use super::wire::{ConnectRequest, WireError};
use super::{Probe, ProbeOptions};

type Failure = (ProbeErrorKind, String);

/// Sends connect requests and validates the replies.
pub struct UdpProbe {
    binder: Arc<dyn InterfaceBinder>,
    default_port: u16,
}

impl UdpProbe {
    /// `default_port` is used for URLs that carry no port.
    pub fn new(binder: Arc<dyn InterfaceBinder>, default_port: u16) -> Self {
        Self {
            binder,
            default_port,
        }
    }

    async fn handshake(
        &self,
        endpoint: &Endpoint,
        opts: &ProbeOptions,
        started: Instant,
    ) -> Result<Duration, Failure> {
        let deadline = tokio::time::Instant::from_std(started + opts.timeout_budget);
        let (host, port) = self.host_port(endpoint)?;

        let addr = timeout_at(deadline, resolve(&host, port))
            .await
            .map_err(|_| (ProbeErrorKind::Timeout, format!("resolving {host} timed out")))??;

        let socket = self.open_socket(addr, opts.interface.as_ref())?;
        socket
            .connect(addr)
            .await
            .map_err(|e| (categorize_io_error(&e), e.to_string()))?;

        let socket = &socket;
        let sent = &Mutex::new(Vec::new());
        RetryIf::spawn(
            get_retry_strategy(),
            move || connect_attempt(socket, opts, deadline, sent),
            |failure: &Failure| {
                failure.0 == ProbeErrorKind::Timeout && tokio::time::Instant::now() < deadline
            },
        )
        .await
    }

    fn host_port(&self, endpoint: &Endpoint) -> Result<(String, u16), Failure> {
        let url = url::Url::parse(endpoint.raw().trim())
            .map_err(|e| (ProbeErrorKind::Unknown, format!("invalid tracker URL: {e}")))?;
        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| (ProbeErrorKind::Unknown, "tracker URL has no host".to_string()))?;
        // IPv6 literals come back bracketed
        let host = host.trim_start_matches('[').trim_end_matches(']').to_string();
        Ok((host, url.port().unwrap_or(self.default_port)))
    }

    fn open_socket(
        &self,
        addr: SocketAddr,
        interface: Option<&InterfaceSelection>,
    ) -> Result<UdpSocket, Failure> {
        let io_failure = |e: std::io::Error| (categorize_io_error(&e), e.to_string());

        let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))
            .map_err(io_failure)?;

        if let Some(selection) = interface {
            if let Err(e) = self.binder.bind_socket(&socket, &selection.name) {
                if selection.required {
                    return Err((ProbeErrorKind::BindFailure, e.to_string()));
                }
                warn!(
                    "Could not bind UDP probe to {}, using default route: {e}",
                    selection.name
                );
            }
        }

        let local: SocketAddr = if addr.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };
        socket.set_nonblocking(true).map_err(io_failure)?;
        socket.bind(&local.into()).map_err(io_failure)?;
        UdpSocket::from_std(socket.into()).map_err(io_failure)
    }
}

#[async_trait]
impl Probe for UdpProbe {
    async fn check(&self, endpoint: &Endpoint, opts: &ProbeOptions) -> ValidationResult {
        match self.handshake(endpoint, opts, Instant::now()).await {
            Ok(round_trip) => ValidationResult::alive(endpoint.clone(), round_trip),
            Err((kind, detail)) => {
                debug!("UDP probe of {} failed: {kind}: {detail}", endpoint.raw());
                ValidationResult::failed(endpoint.clone(), kind, detail)
            }
        }
    }
}

async fn resolve(host: &str, port: u16) -> Result<SocketAddr, Failure> {
    let mut addrs = tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| (ProbeErrorKind::DnsResolutionFailed, e.to_string()))?;
    addrs
        .next()
        .ok_or_else(|| (ProbeErrorKind::DnsResolutionFailed, format!("no addresses for {host}")))
}

/// One request/reply exchange with a fresh transaction id.
///
/// Waits for at most the socket timeout, cut short by the overall deadline, and
/// returns the round trip of this exchange alone. Late replies carrying a
/// transaction id from an earlier attempt (listed in `sent`) are skipped.
async fn connect_attempt(
    socket: &UdpSocket,
    opts: &ProbeOptions,
    deadline: tokio::time::Instant,
    sent: &Mutex<Vec<u32>>,
) -> Result<Duration, Failure> {
    let now = tokio::time::Instant::now();
    if now >= deadline {
        return Err((ProbeErrorKind::Timeout, "time budget exhausted".to_string()));
    }
    let attempt_deadline = (now + opts.socket_timeout).min(deadline);

    let request = ConnectRequest::random();
    let sent_at = Instant::now();
    socket
        .send(&request.encode())
        .await
        .map_err(|e| (categorize_io_error(&e), e.to_string()))?;

    let earlier: Vec<u32> = {
        let mut ids = sent.lock().unwrap_or_else(PoisonError::into_inner);
        let earlier = ids.clone();
        ids.push(request.transaction_id);
        earlier
    };

    let mut buf = vec![0u8; UDP_RECV_BUFFER_LEN];
    loop {
        let len = match timeout_at(attempt_deadline, socket.recv(&mut buf)).await {
            Ok(Ok(len)) => len,
            Ok(Err(e)) => return Err((categorize_io_error(&e), e.to_string())),
            Err(_) => {
                debug!(
                    "No connect reply for transaction {:#010x}",
                    request.transaction_id
                );
                return Err((ProbeErrorKind::Timeout, "no reply to connect request".to_string()));
            }
        };

        match request.check_reply(&buf[..len]) {
            Ok(_) => return Ok(sent_at.elapsed()),
            Err(WireError::TransactionMismatch { actual, .. }) if earlier.contains(&actual) => {
                debug!("Ignoring late reply to transaction {actual:#010x}");
            }
            Err(e) => return Err((ProbeErrorKind::ProtocolMismatch, e.to_string())),
        }
    }
}
