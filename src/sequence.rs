use std::fmt::{Display, Formatter};
use anyhow::bail;
use bytes::{Buf, BufMut};

/// Sequence number of a probe datagram. An emitter run numbers its datagrams 1, 2, 3, ...;
///  `ZERO` is never sent and serves as the collector's initial high water mark.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct SequenceNumber(u64);

impl Display for SequenceNumber {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl SequenceNumber {
    pub const ZERO: SequenceNumber = SequenceNumber(0);

    /// number of bytes the sequence number occupies at the start of every datagram
    pub const SERIALIZED_LEN: usize = size_of::<u64>();

    pub fn from_raw(value: u64) -> Self {
        Self(value)
    }

    pub fn to_raw(&self) -> u64 {
        self.0
    }

    pub fn checked_next(&self) -> Option<SequenceNumber> {
        self.0.checked_add(1).map(SequenceNumber)
    }

    pub fn ser(&self, buf: &mut impl BufMut) {
        buf.put_u64(self.0);
    }

    pub fn deser(buf: &mut impl Buf) -> anyhow::Result<Self> {
        if buf.remaining() < Self::SERIALIZED_LEN {
            bail!("datagram too short for a sequence number: {} bytes", buf.remaining());
        }
        Ok(SequenceNumber(buf.get_u64()))
    }
}

/// Reusable send buffer of the configured datagram length. Only the leading sequence number
///  is ever rewritten; the padding after it stays zeroed.
pub struct DatagramBuffer {
    buf: Vec<u8>,
}

impl DatagramBuffer {
    pub fn new(datagram_len: usize) -> anyhow::Result<DatagramBuffer> {
        if datagram_len < SequenceNumber::SERIALIZED_LEN {
            bail!("datagram length {} is too small, it must be at least {} bytes", datagram_len, SequenceNumber::SERIALIZED_LEN);
        }
        Ok(DatagramBuffer {
            buf: vec![0; datagram_len],
        })
    }

    pub fn set_sequence_number(&mut self, sequence_number: SequenceNumber) {
        let mut header: &mut [u8] = &mut self.buf[..SequenceNumber::SERIALIZED_LEN];
        sequence_number.ser(&mut header);
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }
}
