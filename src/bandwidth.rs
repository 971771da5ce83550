//! Conversions between the human-facing representation of data volumes and plain byte counts.
//!
//! NB: Parsing uses binary multipliers (`1k` is 1024 bytes), while the humanized output uses
//!  decimal units (`1 kB` is 1000 bytes). The two conventions are deliberately not unified.

use anyhow::{anyhow, bail, Context};

/// Parses a byte count with an optional trailing unit suffix: `k`, `m` and `g` multiply by 1024,
///  1024^2 and 1024^3 respectively. Without a suffix, the string is a plain decimal byte count.
pub fn parse_bytes(s: &str) -> anyhow::Result<u64> {
    let (digits, multiplier) = match s.as_bytes().last() {
        None => bail!("empty byte count"),
        Some(b'k') => (&s[..s.len()-1], 1u64 << 10),
        Some(b'm') => (&s[..s.len()-1], 1u64 << 20),
        Some(b'g') => (&s[..s.len()-1], 1u64 << 30),
        Some(_) => (s, 1),
    };

    let num: u64 = digits.parse()
        .with_context(|| format!("invalid byte count {:?}", s))?;
    num.checked_mul(multiplier)
        .ok_or_else(|| anyhow!("byte count {:?} is out of range", s))
}

const BYTE_UNITS: [&str; 7] = ["B", "kB", "MB", "GB", "TB", "PB", "EB"];
const BIT_UNITS: [&str; 7] = ["Bits", "kBits", "MBits", "GBits", "TBits", "PBits", "EBits"];

pub fn humanize_bytes(num_bytes: u64) -> String {
    humanize(num_bytes, &BYTE_UNITS)
}

pub fn humanize_bits(num_bits: u64) -> String {
    humanize(num_bits, &BIT_UNITS)
}

/// decimal (base 1000) scaling, rounded to one decimal place
fn humanize(value: u64, units: &[&str; 7]) -> String {
    const BASE: u64 = 1000;

    if value < 10 {
        return format!("{} {}", value, units[0]);
    }

    let mut exponent = 0;
    let mut divisor = 1u64;
    while exponent < units.len() - 1 && value / divisor >= BASE {
        divisor *= BASE;
        exponent += 1;
    }

    let scaled = ((value as f64 / divisor as f64) * 10.0 + 0.5).floor() / 10.0;
    format!("{:.2} {}", scaled, units[exponent])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::plain("500", 500)]
    #[case::zero("0", 0)]
    #[case::kilo("1k", 1024)]
    #[case::mega("2m", 2097152)]
    #[case::giga("3g", 3221225472)]
    #[case::default_bandwidth("1m", 1 << 20)]
    #[case::large_giga("1024g", 1 << 40)]
    fn test_parse_bytes(#[case] s: &str, #[case] expected: u64) {
        assert_eq!(parse_bytes(s).unwrap(), expected);
    }

    #[rstest]
    #[case::empty("")]
    #[case::suffix_only("k")]
    #[case::non_numeric_prefix("xm")]
    #[case::unknown_suffix("10x")]
    #[case::upper_case_suffix("10K")]
    #[case::negative("-5")]
    #[case::fraction("1.5m")]
    #[case::overflow("99999999999999g")]
    fn test_parse_bytes_invalid(#[case] s: &str) {
        assert!(parse_bytes(s).is_err());
    }

    #[rstest]
    #[case::zero(0, "0 B")]
    #[case::single_digit(9, "9 B")]
    #[case::two_digits(10, "10.00 B")]
    #[case::below_kilo(999, "999.00 B")]
    #[case::kilo(1000, "1.00 kB")]
    #[case::rounded_up(1_250_000, "1.30 MB")]
    #[case::rounded_down(1_240_000, "1.20 MB")]
    #[case::giga(3_000_000_000, "3.00 GB")]
    #[case::max(u64::MAX, "18.40 EB")]
    fn test_humanize_bytes(#[case] value: u64, #[case] expected: &str) {
        assert_eq!(humanize_bytes(value), expected);
    }

    #[rstest]
    #[case(5, "5 Bits")]
    #[case(8_000_000, "8.00 MBits")]
    #[case(10_000, "10.00 kBits")]
    fn test_humanize_bits(#[case] value: u64, #[case] expected: &str) {
        assert_eq!(humanize_bits(value), expected);
    }
}
