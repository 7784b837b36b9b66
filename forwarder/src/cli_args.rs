use std::net::IpAddr;
use std::path::PathBuf;
use argh::FromArgs;
use configuration::Overrides;

#[derive(Debug, FromArgs)]
#[argh(description = "caching DNS forwarder: answers from its cache, asks the forwarder otherwise")]
pub struct CliArgs {
    #[argh(positional, description = "forwarder IP address, default: 8.8.4.4")]
    pub forwarder: Option<IpAddr>,

    #[argh(option, description = "port to listen on, default: 53")]
    pub port: Option<u16>,

    #[argh(option, description = "seconds a cached answer is served, default: 3600")]
    pub ttl: Option<u32>,

    #[argh(option, description = "config file path (TOML)")]
    pub config: Option<PathBuf>,

    #[argh(
        option,
        description = "where the cache is kept between runs, default: './dns_cache.json'"
    )]
    pub cache_file: Option<PathBuf>,
}

impl CliArgs {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            forwarder: self.forwarder,
            port: self.port,
            cache_ttl: self.ttl,
            cache_file: self.cache_file.clone(),
        }
    }
}
