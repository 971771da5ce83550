use std::fmt::{Display, Formatter};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use anyhow::{anyhow, Context};
use async_trait::async_trait;
#[cfg(test)] use mockall::automock;
use tokio::net::{lookup_host, UdpSocket};
use tokio::select;
use tokio::time::{interval, interval_at, sleep, Instant, MissedTickBehavior};
use tracing::{debug, info, trace};
use crate::bandwidth::{humanize_bits, humanize_bytes};
use crate::config::EmitterConfig;
use crate::sequence::{DatagramBuffer, SequenceNumber};

/// This is an abstraction for sending a datagram to the (fixed) peer, introduced to facilitate
///  mocking the I/O part away for testing
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SendSocket: Send + Sync + 'static {
    async fn send_datagram(&self, datagram: &[u8]) -> anyhow::Result<()>;
}

#[async_trait]
impl SendSocket for UdpSocket {
    async fn send_datagram(&self, datagram: &[u8]) -> anyhow::Result<()> {
        self.send(datagram).await?;
        Ok(())
    }
}

/// Resolves the peer address once and returns a socket that is bound to an ephemeral local port
///  and connected to the peer.
pub async fn connect_send_socket(peer_host: &str, port: u16) -> anyhow::Result<UdpSocket> {
    let peer_addr = lookup_host((peer_host, port)).await
        .with_context(|| format!("resolving {}", peer_host))?
        .next()
        .ok_or_else(|| anyhow!("no address found for {}", peer_host))?;

    let local_addr: SocketAddr = if peer_addr.is_ipv6() {
        "[::]:0".parse()?
    }
    else {
        "0.0.0.0:0".parse()?
    };

    let socket = UdpSocket::bind(local_addr).await
        .with_context(|| format!("binding send socket to {:?}", local_addr))?;
    socket.connect(peer_addr).await
        .with_context(|| format!("connecting send socket to {:?}", peer_addr))?;

    info!("bound send socket to {:?}, sending to {:?}", socket.local_addr()?, peer_addr);
    Ok(socket)
}

/// Throughput of one report interval
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ThroughputReport {
    pub num_packets: u64,
    pub num_bytes: u64,
}

impl Display for ThroughputReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "\tSent {} packets ({}, {}).",
               self.num_packets,
               humanize_bytes(self.num_bytes),
               humanize_bits(self.num_bytes.saturating_mul(8)),
        )
    }
}

/// The Emitter sends sequence numbered datagrams of a fixed size to a single peer at a fixed
///  rate, until the configured duration is over.
///
/// There is no compensation for delayed pacing ticks: if the runtime wakes up late, the
///  following datagrams are sent one interval apart from the late one rather than in a burst
///  to catch up.
pub struct Emitter {
    socket: Arc<dyn SendSocket>,
    datagram_len: usize,
    pace_interval: Duration,
    report_interval: Duration,
    duration: Duration,
}

impl Emitter {
    pub fn new(socket: Arc<dyn SendSocket>, config: &EmitterConfig) -> anyhow::Result<Emitter> {
        config.validate()?;

        Ok(Emitter {
            socket,
            datagram_len: config.datagram_len,
            pace_interval: config.pace_interval(),
            report_interval: config.report_interval,
            duration: config.duration,
        })
    }

    /// Runs the send loop, calling `on_report` once per report interval with the throughput
    ///  since the previous report. Returns the total number of datagrams sent, or the first
    ///  send error.
    pub async fn run(&self, mut on_report: impl FnMut(&ThroughputReport)) -> anyhow::Result<u64> {
        let mut buf = DatagramBuffer::new(self.datagram_len)?;

        let start = Instant::now();

        // the first pace tick fires immediately
        let mut pace = interval(self.pace_interval);
        pace.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut report = interval_at(start + self.report_interval, self.report_interval);
        report.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let deadline = sleep(self.duration);
        tokio::pin!(deadline);

        info!("sending {} byte datagrams every {:?} for {:?}", self.datagram_len, self.pace_interval, self.duration);

        let mut sequence_number = SequenceNumber::ZERO;
        let mut reported_sequence_number = SequenceNumber::ZERO;

        loop {
            select! {
                biased;
                _ = report.tick() => {
                    let num_packets = sequence_number.to_raw() - reported_sequence_number.to_raw();
                    on_report(&ThroughputReport {
                        num_packets,
                        num_bytes: num_packets.saturating_mul(self.datagram_len as u64),
                    });
                    reported_sequence_number = sequence_number;
                }
                _ = &mut deadline => {
                    debug!("deadline reached after {:?}", start.elapsed());
                    break;
                }
                _ = pace.tick() => {
                    sequence_number = sequence_number.checked_next()
                        .ok_or_else(|| anyhow!("sequence numbers exhausted"))?;
                    buf.set_sequence_number(sequence_number);

                    trace!("sending datagram #{}", sequence_number);
                    self.socket.send_datagram(buf.as_slice()).await
                        .with_context(|| format!("sending datagram #{}", sequence_number))?;
                }
            }
        }

        info!("sent {} datagrams", sequence_number);
        Ok(sequence_number.to_raw())
    }
}
