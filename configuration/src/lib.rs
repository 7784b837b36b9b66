use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use config::{Config, ConfigError};
use serde::Deserialize;

pub const DEFAULT_LISTEN_ADDRESS: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 53;
pub const DEFAULT_FORWARDER: &str = "8.8.4.4";
pub const DEFAULT_CACHE_TTL: u32 = 3600;
pub const DEFAULT_CACHE_FILE: &str = "./dns_cache.json";

/// Values given on the command line. Each one that is set wins over the
/// config file and the defaults.
#[derive(Debug, Default)]
pub struct Overrides {
    pub forwarder: Option<IpAddr>,
    pub port: Option<u16>,
    pub cache_ttl: Option<u32>,
    pub cache_file: Option<PathBuf>,
}

/// Builds the forwarder configuration from defaults, an optional TOML file
/// and command line overrides, in that order.
pub fn load_configuration(
    config_path: Option<&Path>,
    overrides: Overrides,
) -> Result<ForwarderConfiguration, ConfigError> {
    let mut builder = Config::builder()
        .set_default("server.ip_address", DEFAULT_LISTEN_ADDRESS)?
        .set_default("server.port", i64::from(DEFAULT_PORT))?
        .set_default("dns.forwarder", DEFAULT_FORWARDER)?
        .set_default("dns.forwarder_port", i64::from(DEFAULT_PORT))?
        .set_default("dns.cache_ttl", i64::from(DEFAULT_CACHE_TTL))?
        .set_default("dns.cache_file", DEFAULT_CACHE_FILE)?;

    if let Some(path) = config_path {
        builder = builder.add_source(config::File::from(path));
    }

    let config = builder
        .set_override_option("dns.forwarder", overrides.forwarder.map(|a| a.to_string()))?
        .set_override_option("server.port", overrides.port.map(i64::from))?
        .set_override_option("dns.cache_ttl", overrides.cache_ttl.map(i64::from))?
        .set_override_option(
            "dns.cache_file",
            overrides.cache_file.map(|p| p.to_string_lossy().into_owned()),
        )?
        .build()?;

    config.try_deserialize::<ForwarderConfiguration>()
}

#[derive(Debug, Deserialize)]
pub struct ForwarderConfiguration {
    pub server: ServerConfiguration,
    pub dns: DnsConfiguration,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfiguration {
    ip_address: IpAddr,
    port: u16,
}

impl ServerConfiguration {
    pub fn bind_address(&self) -> SocketAddr {
        SocketAddr::new(self.ip_address, self.port)
    }
}

#[derive(Debug, Deserialize)]
pub struct DnsConfiguration {
    pub forwarder: IpAddr,
    pub forwarder_port: u16,
    /// Seconds a cached answer may be served before it is fetched again.
    pub cache_ttl: u64,
    pub cache_file: PathBuf,
}
