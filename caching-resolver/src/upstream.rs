use async_trait::async_trait;
use bytes::BytesMut;
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};
use std::time::Duration;
use thiserror::Error;
use tokio::net::UdpSocket;

pub const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(1);

// https://datatracker.ietf.org/doc/html/rfc1035#section-4.2.1
//
// Messages carried by UDP are restricted to 512 bytes, but forwarders
// answering EDNS clients may send more. Anything beyond the buffer is cut off
// by the socket and then fails to decode.
const MAX_RESPONSE_SIZE: usize = 4096;

#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("no reply from {0} within {1:?}")]
    Timeout(SocketAddr, Duration),

    #[error("exchange with {server} failed: {source}")]
    ConnectionFailure {
        server: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("reply from {server} is not a DNS message: {source}")]
    MalformedReply {
        server: SocketAddr,
        #[source]
        source: dns::Error,
    },

    #[error("query cannot be encoded: {0}")]
    InvalidQuery(#[source] dns::Error),

    #[error("resolver state is unavailable")]
    StateUnavailable,
}

/// One request/reply exchange with a forwarder.
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn exchange(&self, server: SocketAddr, query: &[u8]) -> Result<Vec<u8>, ForwardError>;
}

/// Sends each query from a fresh ephemeral socket and waits for one reply.
pub struct UdpUpstream {
    timeout: Duration,
}

impl UdpUpstream {
    pub fn new() -> Self {
        Self::with_timeout(UPSTREAM_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn send_and_receive(server: SocketAddr, query: &[u8]) -> io::Result<Vec<u8>> {
        let local_addr: SocketAddr = match server {
            SocketAddr::V4(_) => SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => SocketAddrV6::new(Ipv6Addr::UNSPECIFIED, 0, 0, 0).into(),
        };
        let sock = UdpSocket::bind(local_addr).await?;
        // only datagrams from the forwarder are received on a connected socket
        sock.connect(server).await?;

        let _send_size = sock.send(query).await?;

        let mut resp_buf = BytesMut::with_capacity(MAX_RESPONSE_SIZE);
        let response_size = sock.recv_buf(&mut resp_buf).await?;
        tracing::debug!("received udp response from {}, length: {}", server, response_size);

        Ok(resp_buf[0..response_size].to_vec())
    }
}

impl Default for UdpUpstream {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Upstream for UdpUpstream {
    async fn exchange(&self, server: SocketAddr, query: &[u8]) -> Result<Vec<u8>, ForwardError> {
        match tokio::time::timeout(self.timeout, Self::send_and_receive(server, query)).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(source)) => Err(ForwardError::ConnectionFailure { server, source }),
            Err(_) => Err(ForwardError::Timeout(server, self.timeout)),
        }
    }
}
