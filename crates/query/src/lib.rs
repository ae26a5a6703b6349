//! UDP status queries against Quake III / OpenArena servers.
//!
//! Every host gets its own socket and is queried concurrently. A host that
//! does not answer, or answers with garbage, is left out of the result.

pub mod status;

use async_trait::async_trait;
use futures::future::join_all;
use ratstalker_core::{ServerInfo, ServerQuery};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;
use tokio::net::UdpSocket;
use tracing::{debug, warn};

pub use status::{parse_status, GETSTATUS};

/// Large enough for a full 64-player status reply
const MAX_DATAGRAM: usize = 16 * 1024;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no answer after {attempts} attempt(s)")]
    Timeout { attempts: u32 },
    #[error("not a statusResponse packet")]
    BadHeader,
    #[error("statusResponse without server info")]
    MissingInfo,
    #[error("malformed player line: {0:?}")]
    MalformedPlayer(String),
}

/// Query one host, resending `getstatus` up to `retries` more times.
pub async fn query_host(
    address: SocketAddr,
    timeout: Duration,
    retries: u32,
) -> Result<ServerInfo, QueryError> {
    let bind: SocketAddr = if address.is_ipv4() {
        SocketAddr::from(([0, 0, 0, 0], 0))
    } else {
        SocketAddr::from(([0u16; 8], 0))
    };
    let socket = UdpSocket::bind(bind).await?;
    socket.connect(address).await?;

    let mut buffer = vec![0u8; MAX_DATAGRAM];
    let attempts = retries.saturating_add(1);
    for attempt in 1..=attempts {
        socket.send(GETSTATUS).await?;
        match tokio::time::timeout(timeout, socket.recv(&mut buffer)).await {
            Ok(Ok(len)) => return parse_status(address, &buffer[..len]),
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => debug!(server = %address, attempt, "No answer yet"),
        }
    }
    Err(QueryError::Timeout { attempts })
}

/// [`ServerQuery`] over UDP `getstatus`.
#[derive(Debug, Clone, Default)]
pub struct UdpStatusQuery;

impl UdpStatusQuery {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ServerQuery for UdpStatusQuery {
    async fn query_all(
        &self,
        hosts: &[SocketAddr],
        timeout: Duration,
        retries: u32,
    ) -> Vec<ServerInfo> {
        let results = join_all(
            hosts
                .iter()
                .map(|&address| async move { (address, query_host(address, timeout, retries).await) }),
        )
        .await;

        results
            .into_iter()
            .filter_map(|(address, result)| match result {
                Ok(info) => Some(info),
                Err(QueryError::Timeout { attempts }) => {
                    debug!(server = %address, attempts, "Server unreachable");
                    None
                }
                Err(e) => {
                    warn!(server = %address, error = %e, "Server query failed");
                    None
                }
            })
            .collect()
    }
}
