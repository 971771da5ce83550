use std::fmt::{Display, Formatter};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use anyhow::Context;
use async_trait::async_trait;
use tokio::net::UdpSocket;
use tracing::{debug, info, trace};
use crate::config::CollectorConfig;
use crate::sequence::SequenceNumber;

/// This is an abstraction for receiving datagrams, introduced to facilitate replacing the
///  I/O part for testing
#[async_trait]
pub trait ReceiveSocket: Send + Sync + 'static {
    /// Waits for the next datagram and copies it into `buf`, returning the number of bytes
    ///  received
    async fn recv_datagram(&self, buf: &mut [u8]) -> anyhow::Result<usize>;
}

#[async_trait]
impl ReceiveSocket for UdpSocket {
    async fn recv_datagram(&self, buf: &mut [u8]) -> anyhow::Result<usize> {
        let (num_read, from) = self.recv_from(buf).await?;
        trace!("received {} bytes from {:?}", num_read, from);
        Ok(num_read)
    }
}

/// binds a socket to the given port on all IPV4 interfaces
pub async fn bind_receive_socket(port: u16) -> anyhow::Result<UdpSocket> {
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    let socket = UdpSocket::bind(addr).await
        .with_context(|| format!("binding receive socket to {:?}", addr))?;
    info!("bound receive socket to {:?}", socket.local_addr()?);
    Ok(socket)
}

/// A contiguous range of sequence numbers that were skipped by an accepted datagram. Whether
///  they were really lost or are only delayed is not known at the time of reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LossReport {
    Single(SequenceNumber),
    /// both bounds inclusive
    Range { first: SequenceNumber, last: SequenceNumber },
}

impl LossReport {
    pub fn num_lost(&self) -> u64 {
        match self {
            LossReport::Single(_) => 1,
            LossReport::Range { first, last } => last.to_raw() - first.to_raw() + 1,
        }
    }
}

impl Display for LossReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LossReport::Single(n) => write!(f, "Lost packet {}", n),
            LossReport::Range { first, last } => write!(f, "Lost packets between {} and {}", first, last),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// at or below the high water mark: a duplicate, reordered or replayed datagram
    Stale,
    InSequence,
    AfterGap(LossReport),
}

/// Tracks the highest sequence number seen so far and classifies incoming sequence numbers
///  relative to it. It only ever looks forward: anything at or below the high water mark is
///  ignored, so a late datagram never retracts a loss that was reported before.
#[derive(Debug, Default)]
pub struct LossDetector {
    high_water_mark: SequenceNumber,
}

impl LossDetector {
    pub fn new() -> LossDetector {
        LossDetector::default()
    }

    pub fn high_water_mark(&self) -> SequenceNumber {
        self.high_water_mark
    }

    pub fn on_sequence_number(&mut self, sequence_number: SequenceNumber) -> Verdict {
        if sequence_number <= self.high_water_mark {
            return Verdict::Stale;
        }

        let verdict = match sequence_number.to_raw() - self.high_water_mark.to_raw() {
            1 => Verdict::InSequence,
            2 => Verdict::AfterGap(LossReport::Single(SequenceNumber::from_raw(self.high_water_mark.to_raw() + 1))),
            _ => Verdict::AfterGap(LossReport::Range {
                first: SequenceNumber::from_raw(self.high_water_mark.to_raw() + 1),
                last: SequenceNumber::from_raw(sequence_number.to_raw() - 1),
            }),
        };

        self.high_water_mark = sequence_number;
        verdict
    }
}

/// The Collector passively receives datagrams and runs them through a [LossDetector]. It has no
///  stop condition of its own: it runs until the socket fails or the process is terminated.
pub struct Collector {
    socket: Arc<dyn ReceiveSocket>,
    receive_buffer_len: usize,
}

impl Collector {
    pub fn new(socket: Arc<dyn ReceiveSocket>, config: &CollectorConfig) -> anyhow::Result<Collector> {
        config.validate()?;

        Ok(Collector {
            socket,
            receive_buffer_len: config.receive_buffer_len,
        })
    }

    /// Runs the receive loop, calling `on_datagram` with the sequence number and verdict of
    ///  every datagram that carries a sequence number. This returns only on a receive error.
    pub async fn run(&self, mut on_datagram: impl FnMut(SequenceNumber, &Verdict)) -> anyhow::Result<()> {
        info!("starting receive loop");

        let mut detector = LossDetector::new();
        let mut buf = vec![0u8; self.receive_buffer_len];
        loop {
            let num_read = self.socket.recv_datagram(&mut buf).await
                .context("receiving datagram")?;

            let mut parse_buf = &buf[..num_read];
            let sequence_number = match SequenceNumber::deser(&mut parse_buf) {
                Ok(n) => n,
                Err(e) => {
                    debug!("dropping datagram: {}", e);
                    continue;
                }
            };

            let verdict = detector.on_sequence_number(sequence_number);
            match &verdict {
                Verdict::Stale => debug!("ignoring stale datagram #{} - high water mark is {}", sequence_number, detector.high_water_mark()),
                Verdict::InSequence => trace!("datagram #{}", sequence_number),
                Verdict::AfterGap(report) => debug!("datagram #{} after a gap of {}", sequence_number, report.num_lost()),
            }
            on_datagram(sequence_number, &verdict);
        }
    }
}
