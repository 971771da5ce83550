use std::time::Duration;
use anyhow::bail;
use crate::sequence::SequenceNumber;

pub const DEFAULT_PORT: u16 = 5201;
pub const DEFAULT_DURATION: Duration = Duration::from_secs(10);
pub const DEFAULT_DATAGRAM_LEN: usize = 1250;
pub const DEFAULT_BANDWIDTH: &str = "1m";

/// The largest payload a single UDP datagram can carry over IPV4 (65535 - 20 - 8)
pub const MAX_DATAGRAM_LEN: usize = 65507;

pub struct EmitterConfig {
    /// host name or IP address of the collector
    pub peer_host: String,
    pub port: u16,
    pub duration: Duration,

    /// This is the UDP payload size of every datagram, including the leading sequence number.
    ///  All datagrams of a run have the same size.
    pub datagram_len: usize,

    /// target bandwidth in bytes per second
    pub bandwidth: u64,

    pub report_interval: Duration,
}

impl EmitterConfig {
    pub fn new(peer_host: impl Into<String>, bandwidth: u64) -> EmitterConfig {
        EmitterConfig {
            peer_host: peer_host.into(),
            port: DEFAULT_PORT,
            duration: DEFAULT_DURATION,
            datagram_len: DEFAULT_DATAGRAM_LEN,
            bandwidth,
            report_interval: Duration::from_secs(1),
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.peer_host.is_empty() {
            bail!("no peer address");
        }
        if self.datagram_len < SequenceNumber::SERIALIZED_LEN {
            bail!("datagram length {} is too small, it must be at least {} bytes", self.datagram_len, SequenceNumber::SERIALIZED_LEN);
        }
        if self.datagram_len > MAX_DATAGRAM_LEN {
            bail!("datagram length {} exceeds the maximum UDP payload of {} bytes", self.datagram_len, MAX_DATAGRAM_LEN);
        }
        if self.packets_per_second() == 0 {
            bail!("bandwidth of {} bytes per second is less than a single {} byte datagram per second", self.bandwidth, self.datagram_len);
        }
        if self.pace_interval().is_zero() {
            bail!("bandwidth of {} bytes per second requires sending datagrams faster than once per nanosecond", self.bandwidth);
        }
        if self.report_interval.is_zero() {
            bail!("report interval must not be zero");
        }
        Ok(())
    }

    pub fn packets_per_second(&self) -> u64 {
        match self.datagram_len {
            0 => 0,
            len => self.bandwidth / len as u64,
        }
    }

    /// The time between two consecutive datagrams, truncated to whole nanoseconds. This is
    ///  only meaningful for a validated config.
    pub fn pace_interval(&self) -> Duration {
        match self.packets_per_second() {
            0 => Duration::ZERO,
            pps => Duration::from_nanos(1_000_000_000 / pps),
        }
    }
}

pub struct CollectorConfig {
    pub port: u16,

    /// Datagrams longer than this are truncated on receipt, which is harmless since only the
    ///  leading sequence number is evaluated
    pub receive_buffer_len: usize,
}

impl CollectorConfig {
    pub fn new(port: u16) -> CollectorConfig {
        CollectorConfig {
            port,
            receive_buffer_len: 64 * 1024,
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.receive_buffer_len < SequenceNumber::SERIALIZED_LEN {
            bail!("receive buffer of {} bytes cannot hold a sequence number", self.receive_buffer_len);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn emitter_config(datagram_len: usize, bandwidth: u64) -> EmitterConfig {
        let mut config = EmitterConfig::new("localhost", bandwidth);
        config.datagram_len = datagram_len;
        config
    }

    #[rstest]
    #[case::defaults(1250, 1 << 20, 838)]
    #[case::exact(1000, 100_000, 100)]
    #[case::truncated(1000, 100_999, 100)]
    #[case::one(8, 8, 1)]
    #[case::too_low(1250, 1249, 0)]
    fn test_packets_per_second(#[case] datagram_len: usize, #[case] bandwidth: u64, #[case] expected: u64) {
        assert_eq!(emitter_config(datagram_len, bandwidth).packets_per_second(), expected);
    }

    #[rstest]
    #[case::hundred(1000, 100_000, Duration::from_millis(10))]
    #[case::one(1000, 1000, Duration::from_secs(1))]
    #[case::truncated_nanos(1, 3, Duration::from_nanos(333_333_333))]
    #[case::zero_rate(1000, 999, Duration::ZERO)]
    fn test_pace_interval(#[case] datagram_len: usize, #[case] bandwidth: u64, #[case] expected: Duration) {
        assert_eq!(emitter_config(datagram_len, bandwidth).pace_interval(), expected);
    }

    #[rstest]
    #[case::defaults(1250, 1 << 20, true)]
    #[case::minimal_datagram(8, 8, true)]
    #[case::max_datagram(MAX_DATAGRAM_LEN, 1 << 30, true)]
    #[case::datagram_too_short(7, 1 << 20, false)]
    #[case::datagram_too_long(MAX_DATAGRAM_LEN + 1, 1 << 30, false)]
    #[case::rate_zero(1250, 1000, false)]
    #[case::rate_too_high(8, 3 << 40, false)]
    fn test_validate_emitter(#[case] datagram_len: usize, #[case] bandwidth: u64, #[case] expected_ok: bool) {
        assert_eq!(emitter_config(datagram_len, bandwidth).validate().is_ok(), expected_ok);
    }

    #[test]
    fn test_validate_emitter_without_peer() {
        let config = EmitterConfig::new("", 1 << 20);
        assert!(config.validate().is_err());
    }

    #[rstest]
    #[case(64 * 1024, true)]
    #[case(8, true)]
    #[case(7, false)]
    fn test_validate_collector(#[case] receive_buffer_len: usize, #[case] expected_ok: bool) {
        let mut config = CollectorConfig::new(DEFAULT_PORT);
        config.receive_buffer_len = receive_buffer_len;
        assert_eq!(config.validate().is_ok(), expected_ok);
    }
}
