// Shared test helpers: in-memory databases, probe options and a fake UDP tracker.
//
// Included by the integration test files with `#[path = "helpers.rs"] mod helpers;`.

#![allow(dead_code)] // Each test file uses a different subset

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sqlx::sqlite::SqlitePoolOptions;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;

use tracker_status::interface::{BindError, InterfaceBinder};
use tracker_status::probe::wire::ConnectResponse;
use tracker_status::probe::ProbeOptions;
use tracker_status::storage::{run_migrations, DbPool};

/// Creates an in-memory database with migrations applied.
///
/// Limited to one connection: every `sqlite::memory:` connection is its own database.
pub async fn create_test_pool() -> DbPool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create test database pool");
    run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    Arc::new(pool)
}

/// Probe options with short timeouts.
pub fn probe_options(timeout_budget_ms: u64, socket_timeout_ms: u64) -> ProbeOptions {
    ProbeOptions {
        timeout_budget: Duration::from_millis(timeout_budget_ms),
        socket_timeout: Duration::from_millis(socket_timeout_ms),
        interface: None,
    }
}

/// How the fake tracker answers connect requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerBehavior {
    /// Echo the transaction id with a connection id
    Answer,
    /// Answer with a different transaction id
    WrongTransaction,
    /// Never answer
    Silent,
    /// Stay silent for the first `n` requests, then answer
    AnswerAfter(usize),
    /// Answer every request, the first after `first_ms` and the rest after `rest_ms`
    Delayed { first_ms: u64, rest_ms: u64 },
}

/// A UDP tracker on 127.0.0.1 that implements the connect step only.
pub struct FakeUdpTracker {
    pub addr: SocketAddr,
    requests: Arc<AtomicUsize>,
    task: JoinHandle<()>,
}

impl FakeUdpTracker {
    pub async fn start(behavior: TrackerBehavior) -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake tracker");
        let addr = socket.local_addr().expect("fake tracker address");
        let socket = Arc::new(socket);
        let requests = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&requests);

        let task = tokio::spawn(async move {
            let mut buf = [0u8; 64];
            loop {
                let Ok((len, peer)) = socket.recv_from(&mut buf).await else {
                    return;
                };
                let seen = counter.fetch_add(1, Ordering::SeqCst);
                if len < 16 {
                    continue;
                }
                let transaction_id = u32::from_be_bytes([buf[12], buf[13], buf[14], buf[15]]);
                let (transaction_id, delay_ms) = match behavior {
                    TrackerBehavior::Answer => (transaction_id, 0),
                    TrackerBehavior::WrongTransaction => (transaction_id.wrapping_add(1), 0),
                    TrackerBehavior::Silent => continue,
                    TrackerBehavior::AnswerAfter(n) if seen < n => continue,
                    TrackerBehavior::AnswerAfter(_) => (transaction_id, 0),
                    TrackerBehavior::Delayed { first_ms, .. } if seen == 0 => {
                        (transaction_id, first_ms)
                    }
                    TrackerBehavior::Delayed { rest_ms, .. } => (transaction_id, rest_ms),
                };
                let reply = ConnectResponse {
                    transaction_id,
                    connection_id: 0x0102_0304_0506_0708,
                };
                if delay_ms == 0 {
                    let _ = socket.send_to(&reply.encode(), peer).await;
                } else {
                    let socket = Arc::clone(&socket);
                    tokio::spawn(async move {
                        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                        let _ = socket.send_to(&reply.encode(), peer).await;
                    });
                }
            }
        });

        Self {
            addr,
            requests,
            task,
        }
    }

    /// Announce URL pointing at this tracker.
    pub fn url(&self) -> String {
        format!("udp://{}/announce", self.addr)
    }

    /// Connect requests received so far.
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl Drop for FakeUdpTracker {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Binder whose every bind attempt fails.
pub struct FailingBinder;

impl InterfaceBinder for FailingBinder {
    fn bind_socket(&self, _socket: &socket2::Socket, name: &str) -> Result<(), BindError> {
        Err(BindError::UnknownInterface(name.to_string()))
    }

    fn bind_http(
        &self,
        _builder: reqwest::ClientBuilder,
        name: &str,
    ) -> Result<reqwest::ClientBuilder, BindError> {
        Err(BindError::UnknownInterface(name.to_string()))
    }
}

/// Binder that leaves sockets and clients unbound.
pub struct NoopBinder;

impl InterfaceBinder for NoopBinder {
    fn bind_socket(&self, _socket: &socket2::Socket, _name: &str) -> Result<(), BindError> {
        Ok(())
    }

    fn bind_http(
        &self,
        builder: reqwest::ClientBuilder,
        _name: &str,
    ) -> Result<reqwest::ClientBuilder, BindError> {
        Ok(builder)
    }
}
