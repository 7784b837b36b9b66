use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use caching_resolver::{persist, ActorHandle, Resolver, UdpUpstream};
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

mod cli_args;

use cli_args::CliArgs;

// Larger than any query a client sends without EDNS.
const MAX_QUERY_SIZE: usize = 4096;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: CliArgs = argh::from_env();
    let conf = configuration::load_configuration(args.config.as_deref(), args.overrides())?;

    let cache = persist::load_or_empty(&conf.dns.cache_file);
    info!(entries = cache.len(), "cache loaded from {}", conf.dns.cache_file.display());

    let cache_ttl = Duration::from_secs(conf.dns.cache_ttl);
    let state = ActorHandle::new(cache, cache_ttl, conf.dns.forwarder);
    let resolver = Arc::new(Resolver::with_forwarder_port(
        state.clone(),
        UdpUpstream::new(),
        conf.dns.forwarder_port,
    ));

    let address = conf.server.bind_address();
    let socket = Arc::new(UdpSocket::bind(address).await?);
    info!(
        "Listening on: {}, forwarding to {}, pid: {}",
        address,
        conf.dns.forwarder,
        std::process::id()
    );

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut buf = vec![0u8; MAX_QUERY_SIZE];
    loop {
        tokio::select! {
            received = socket.recv_from(&mut buf) => {
                match received {
                    Ok((n, peer)) => {
                        let query = buf[..n].to_vec();
                        tokio::spawn(serve(resolver.clone(), socket.clone(), query, peer));
                    }
                    Err(e) => {
                        warn!("UDP receive error, err: {}", e);
                    }
                }
            }
            _ = &mut shutdown => {
                info!("interrupted, saving cache");
                break;
            }
        }
    }

    let cache = state.snapshot().await?;
    persist::save(&conf.dns.cache_file, &cache)?;
    info!(entries = cache.len(), "cache saved to {}", conf.dns.cache_file.display());

    Ok(())
}

async fn serve(
    resolver: Arc<Resolver<UdpUpstream>>,
    socket: Arc<UdpSocket>,
    query: Vec<u8>,
    peer: SocketAddr,
) {
    debug!("datagram received from {}, length: {}", peer, query.len());

    // A dropped query gets no answer at all; the client will retry.
    let Some(answer) = resolver.handle(&query).await else {
        return;
    };

    if let Err(e) = socket.send_to(&answer, peer).await {
        warn!("failed to answer {}, err: {}", peer, e);
    }
}
