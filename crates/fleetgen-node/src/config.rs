//! Command-line and environment configuration for the node binaries.
//!
//! Each binary parses a `clap` argument struct (with environment variable
//! fallbacks, after loading `.env`) and converts it into a validated runtime
//! config through `TryFrom`.

use anyhow::bail;
use clap::Parser;
use core::time::Duration;
use fleetgen::GeneratorConfig;
use fleetgen_stream::{ClientConfig, DEFAULT_MAX_FRAME_LENGTH, ServerConfig};

/// Arguments for the `fleetgen-server` binary.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "fleetgen-server",
    version,
    about = "Hosts record servers on consecutive ports"
)]
pub struct ServerArgs {
    /// Interface every instance binds to.
    ///
    /// Environment variable: `BIND_ADDR`
    #[arg(long, env = "BIND_ADDR", default_value_t = String::from("127.0.0.1"))]
    pub bind_addr: String,

    /// Port of the first instance. Instance `i` listens on `base_port + i`.
    ///
    /// Environment variable: `BASE_PORT`
    #[arg(long, env = "BASE_PORT", default_value_t = 8080)]
    pub base_port: u16,

    /// Number of server instances to host.
    ///
    /// Environment variable: `INSTANCES`
    #[arg(long, env = "INSTANCES", default_value_t = 5)]
    pub instances: u16,

    /// How long shutdown waits for open connections to drain.
    ///
    /// Environment variable: `SHUTDOWN_TIMEOUT_MS`
    #[arg(long, env = "SHUTDOWN_TIMEOUT_MS", default_value_t = 3_000)]
    pub shutdown_timeout_ms: u64,

    /// Largest frame an instance will write.
    ///
    /// Environment variable: `MAX_FRAME_LENGTH`
    #[arg(long, env = "MAX_FRAME_LENGTH", default_value_t = DEFAULT_MAX_FRAME_LENGTH)]
    pub max_frame_length: usize,
}

/// Validated settings for `fleetgen-server`.
#[derive(Debug, Clone)]
pub struct HostConfig {
    pub bind_addr: String,
    pub ports: Vec<u16>,
    pub server: ServerConfig,
}

impl TryFrom<ServerArgs> for HostConfig {
    type Error = anyhow::Error;

    fn try_from(args: ServerArgs) -> Result<Self, Self::Error> {
        if args.instances == 0 {
            bail!("INSTANCES must be greater than 0");
        }
        if args.max_frame_length == 0 {
            bail!("MAX_FRAME_LENGTH must be greater than 0");
        }

        let last = args.base_port.checked_add(args.instances - 1);
        let Some(last) = last else {
            bail!(
                "BASE_PORT ({}) + INSTANCES ({}) exceeds the port range",
                args.base_port,
                args.instances
            );
        };

        Ok(Self {
            bind_addr: args.bind_addr,
            ports: (args.base_port..=last).collect(),
            server: ServerConfig {
                max_frame_length: args.max_frame_length,
                shutdown_timeout: Duration::from_millis(args.shutdown_timeout_ms),
                ..ServerConfig::default()
            },
        })
    }
}

/// Arguments for the `fleetgen-client` binary.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "fleetgen-client",
    version,
    about = "Consumes records from a server and generates children for each"
)]
pub struct ClientArgs {
    /// Server host to connect to.
    ///
    /// Environment variable: `SERVER_HOST`
    #[arg(long, env = "SERVER_HOST", default_value_t = String::from("127.0.0.1"))]
    pub host: String,

    /// Server port to connect to.
    ///
    /// Environment variable: `SERVER_PORT`
    #[arg(long, env = "SERVER_PORT", default_value_t = 8080)]
    pub port: u16,

    /// How long the initial connect may take.
    ///
    /// Environment variable: `CONNECT_TIMEOUT_MS`
    #[arg(long, env = "CONNECT_TIMEOUT_MS", default_value_t = 10_000)]
    pub connect_timeout_ms: u64,

    /// Interval between automatic record requests.
    ///
    /// Environment variable: `REQUEST_INTERVAL_MS`
    #[arg(long, env = "REQUEST_INTERVAL_MS", default_value_t = 2_000)]
    pub request_interval_ms: u64,

    /// Stop after this many records. `0` runs until interrupted.
    ///
    /// Environment variable: `RECORDS`
    #[arg(long, env = "RECORDS", default_value_t = 0)]
    pub records: usize,

    /// Upper bound of the simulated per-child generation delay.
    ///
    /// Environment variable: `MAX_ITEM_DELAY_MS`
    #[arg(long, env = "MAX_ITEM_DELAY_MS", default_value_t = 500)]
    pub max_item_delay_ms: u64,
}

/// Validated settings for `fleetgen-client`.
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    pub host: String,
    pub port: u16,
    pub request_interval: Duration,
    pub records: Option<usize>,
    pub client: ClientConfig,
    pub generator: GeneratorConfig,
}

impl TryFrom<ClientArgs> for ConsumerConfig {
    type Error = anyhow::Error;

    fn try_from(args: ClientArgs) -> Result<Self, Self::Error> {
        if args.connect_timeout_ms == 0 {
            bail!("CONNECT_TIMEOUT_MS must be greater than 0");
        }
        if args.request_interval_ms == 0 {
            bail!("REQUEST_INTERVAL_MS must be greater than 0");
        }

        Ok(Self {
            host: args.host,
            port: args.port,
            request_interval: Duration::from_millis(args.request_interval_ms),
            records: (args.records > 0).then_some(args.records),
            client: ClientConfig {
                connect_timeout: Duration::from_millis(args.connect_timeout_ms),
                ..ClientConfig::default()
            },
            generator: GeneratorConfig::default()
                .with_max_item_delay(Duration::from_millis(args.max_item_delay_ms)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server_args(extra: &[&str]) -> ServerArgs {
        let mut argv = vec!["fleetgen-server"];
        argv.extend_from_slice(extra);
        ServerArgs::try_parse_from(argv).unwrap()
    }

    fn client_args(extra: &[&str]) -> ClientArgs {
        let mut argv = vec!["fleetgen-client"];
        argv.extend_from_slice(extra);
        ClientArgs::try_parse_from(argv).unwrap()
    }

    #[test]
    fn default_host_covers_five_ports() {
        let config = HostConfig::try_from(server_args(&[])).unwrap();
        assert_eq!(config.ports, vec![8080, 8081, 8082, 8083, 8084]);
        assert_eq!(config.server.shutdown_timeout, Duration::from_secs(3));
    }

    #[test]
    fn host_rejects_bad_values() {
        assert!(HostConfig::try_from(server_args(&["--instances", "0"])).is_err());
        assert!(HostConfig::try_from(server_args(&["--max-frame-length", "0"])).is_err());
        assert!(
            HostConfig::try_from(server_args(&["--base-port", "65535", "--instances", "2"]))
                .is_err()
        );
        let edge =
            HostConfig::try_from(server_args(&["--base-port", "65535", "--instances", "1"]))
                .unwrap();
        assert_eq!(edge.ports, vec![65535]);
    }

    #[test]
    fn consumer_maps_zero_records_to_unbounded() {
        let config = ConsumerConfig::try_from(client_args(&[])).unwrap();
        assert_eq!(config.records, None);
        assert_eq!(config.request_interval, Duration::from_secs(2));
        assert_eq!(config.client.connect_timeout, Duration::from_secs(10));

        let config = ConsumerConfig::try_from(client_args(&["--records", "3"])).unwrap();
        assert_eq!(config.records, Some(3));
    }

    #[test]
    fn consumer_rejects_zero_intervals() {
        assert!(ConsumerConfig::try_from(client_args(&["--request-interval-ms", "0"])).is_err());
        assert!(ConsumerConfig::try_from(client_args(&["--connect-timeout-ms", "0"])).is_err());
    }

    #[test]
    fn consumer_forwards_item_delay() {
        let config =
            ConsumerConfig::try_from(client_args(&["--max-item-delay-ms", "25"])).unwrap();
        assert_eq!(config.generator.max_item_delay(), Duration::from_millis(25));
    }
}
