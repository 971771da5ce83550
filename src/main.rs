use std::sync::Arc;
use std::time::Duration;
use anyhow::bail;
use clap::Parser;
use clap_derive::Parser;
use tracing::{info, Level};
use udpprobe::bandwidth::parse_bytes;
use udpprobe::collector::{bind_receive_socket, Collector, Verdict};
use udpprobe::config::{CollectorConfig, EmitterConfig, DEFAULT_BANDWIDTH, DEFAULT_DATAGRAM_LEN, DEFAULT_PORT};
use udpprobe::emitter::{connect_send_socket, Emitter};

const RULE: &str = "-----------------------------------------------------------";

#[derive(Parser)]
#[clap(about = "UDP throughput probe: sends sequence numbered datagrams at a fixed rate, and reports gaps on the receiving side")]
struct Args {
    /// run as server, i.e. receive datagrams and report lost packets
    #[clap(short = 's', default_value_t = false, conflicts_with = "client")]
    server: bool,

    /// run as client, sending datagrams to this address
    #[clap(short = 'c')]
    client: Option<String>,

    #[clap(short = 'p', default_value_t = DEFAULT_PORT)]
    port: u16,

    /// time in seconds
    #[clap(short = 't', default_value_t = 10)]
    seconds: u64,

    /// UDP payload size
    #[clap(short = 'l', default_value_t = DEFAULT_DATAGRAM_LEN)]
    packet_size: usize,

    /// bandwidth in bytes per second, with an optional suffix k, m or g (powers of 1024)
    #[clap(short = 'b', default_value = DEFAULT_BANDWIDTH)]
    bandwidth: String,

    #[clap(short, long, default_value_t = false)]
    verbose: bool,

    #[clap(long, default_value_t = false)]
    very_verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
pub async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = match (args.verbose, args.very_verbose) {
        (_, true) => Level::TRACE,
        (true, _) => Level::DEBUG,
        (false, false) => Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .try_init()
        .ok();

    let bandwidth = parse_bytes(&args.bandwidth)
        .map_err(|e| e.context("Invalid bandwidth"))?;

    match role(&args)? {
        Role::Server => run_server(args.port).await,
        Role::Client(peer_host) => {
            let mut config = EmitterConfig::new(peer_host, bandwidth);
            config.port = args.port;
            config.duration = Duration::from_secs(args.seconds);
            config.datagram_len = args.packet_size;
            run_client(config).await
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Role {
    Server,
    Client(String),
}

/// clap rejects `-s` together with `-c`, but not the absence of both
fn role(args: &Args) -> anyhow::Result<Role> {
    match (args.server, &args.client) {
        (true, _) => Ok(Role::Server),
        (false, Some(peer_host)) => Ok(Role::Client(peer_host.clone())),
        (false, None) => bail!("either -s or -c <address> is required"),
    }
}

async fn run_server(port: u16) -> anyhow::Result<()> {
    let config = CollectorConfig::new(port);
    config.validate()?;

    let socket = bind_receive_socket(config.port).await?;

    println!("{}", RULE);
    println!("Server listening on {}", port);
    println!("{}", RULE);

    let collector = Collector::new(Arc::new(socket), &config)?;
    collector.run(|_, verdict| {
        if let Verdict::AfterGap(report) = verdict {
            println!("{}", report);
        }
    }).await
}

async fn run_client(config: EmitterConfig) -> anyhow::Result<()> {
    config.validate()?;

    println!("Connecting to host {}, port {}", config.peer_host, config.port);
    println!("Sending {} packets ({} bytes) per second", config.packets_per_second(), config.datagram_len);

    let socket = connect_send_socket(&config.peer_host, config.port).await?;
    let emitter = Emitter::new(Arc::new(socket), &config)?;

    let num_sent = emitter.run(|report| println!("{}", report)).await?;
    info!("done after sending {} datagrams", num_sent);
    Ok(())
}
