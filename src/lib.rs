//! A minimal UDP throughput probe.
//!
//! An [emitter::Emitter] sends fixed size datagrams at a configured rate for a fixed duration,
//!  and a [collector::Collector] on the other side receives them and reports gaps in their
//!  sequence numbers as packet loss.
//!
//! ## Wire format
//!
//! Every datagram has the same configured length `L` (at least 8 bytes):
//!
//! ```ascii
//! 0: sequence number (u64 BE), starting at 1 and incremented by 1 per datagram
//! 8: padding (L - 8 bytes), zeroed by the emitter and never evaluated by the collector
//! ```
//!
//! There is no back channel: the collector does not acknowledge anything, and the emitter does
//!  not adapt its rate. Datagrams arriving out of order are not buffered - anything at or below
//!  the highest sequence number seen so far is ignored.

pub mod bandwidth;
pub mod collector;
pub mod config;
pub mod emitter;
pub mod sequence;
