//! Fixed-point 8-decimal Dingo amounts.
//!
//! All bridge arithmetic is performed on nonnegative integer satoshis. The
//! daemon's decimal representation is only ever produced or consumed at the
//! RPC boundary, and conversion to/from decimal strings is exact.

use std::fmt;
use std::str::FromStr;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Number of satoshis in one whole coin.
pub const COIN: u64 = 100_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("cannot parse amount '{0}'")]
    Parse(String),

    #[error("amount {0} below the flat fee {1}")]
    AmountTooSmall(Sats, Sats),

    #[error("amount arithmetic overflow")]
    Overflow,
}

/// A nonnegative Dingo amount in satoshis (8 decimals).
///
/// Serializes on the wire and in the store as a base-10 satoshi string, the
/// same representation used for the `approvedTax`/`approvedAmount` columns.
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    BorshSerialize,
    BorshDeserialize,
)]
pub struct Sats(u64);

impl Sats {
    pub const ZERO: Sats = Sats(0);

    pub const fn from_sat(sat: u64) -> Self {
        Self(sat)
    }

    pub const fn to_sat(self) -> u64 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, rhs: Sats) -> Result<Sats, AmountError> {
        self.0
            .checked_add(rhs.0)
            .map(Sats)
            .ok_or(AmountError::Overflow)
    }

    pub fn checked_sub(self, rhs: Sats) -> Result<Sats, AmountError> {
        self.0
            .checked_sub(rhs.0)
            .map(Sats)
            .ok_or(AmountError::Overflow)
    }

    pub fn saturating_sub(self, rhs: Sats) -> Sats {
        Sats(self.0.saturating_sub(rhs.0))
    }

    /// Sums an iterator of amounts, failing on overflow.
    pub fn checked_sum<I: IntoIterator<Item = Sats>>(iter: I) -> Result<Sats, AmountError> {
        iter.into_iter()
            .try_fold(Sats::ZERO, |acc, x| acc.checked_add(x))
    }

    /// Parses an exact decimal coin string, e.g. `"12.5"` -> 1_250_000_000.
    ///
    /// Rejects signs, exponents, and more than 8 fractional digits.
    pub fn from_decimal_str(s: &str) -> Result<Sats, AmountError> {
        let err = || AmountError::Parse(s.to_owned());

        let (int_part, frac_part) = match s.split_once('.') {
            Some((i, f)) => (i, f),
            None => (s, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(err());
        }
        if frac_part.len() > 8 {
            return Err(err());
        }
        if !int_part.chars().all(|c| c.is_ascii_digit())
            || !frac_part.chars().all(|c| c.is_ascii_digit())
        {
            return Err(err());
        }

        let whole: u64 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| err())?
        };
        let mut frac: u64 = if frac_part.is_empty() {
            0
        } else {
            frac_part.parse().map_err(|_| err())?
        };
        for _ in frac_part.len()..8 {
            frac *= 10;
        }

        whole
            .checked_mul(COIN)
            .and_then(|w| w.checked_add(frac))
            .map(Sats)
            .ok_or(AmountError::Overflow)
    }

    /// Renders the amount as a fixed 8-decimal coin string, e.g.
    /// `"10.00000000"`. This is the form handed to the daemon for vouts.
    pub fn to_decimal_string(self) -> String {
        format!("{}.{:08}", self.0 / COIN, self.0 % COIN)
    }

    /// Converts a daemon-reported floating point coin value.
    ///
    /// The daemon serializes amounts as JSON numbers; rounding to the nearest
    /// satoshi recovers the exact value for any amount the daemon can report.
    pub fn from_coin_f64(value: f64) -> Result<Sats, AmountError> {
        if !value.is_finite() || value < 0.0 {
            return Err(AmountError::Parse(value.to_string()));
        }
        let sats = (value * COIN as f64).round();
        if sats > u64::MAX as f64 {
            return Err(AmountError::Overflow);
        }
        Ok(Sats(sats as u64))
    }

    pub fn to_coin_f64(self) -> f64 {
        self.0 as f64 / COIN as f64
    }
}

impl fmt::Display for Sats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal_string())
    }
}

impl FromStr for Sats {
    type Err = AmountError;

    /// Parses a satoshi count, the store/wire representation.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>()
            .map(Sats)
            .map_err(|_| AmountError::Parse(s.to_owned()))
    }
}

impl Serialize for Sats {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Sats {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SatsVisitor;

        impl de::Visitor<'_> for SatsVisitor {
            type Value = Sats;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a satoshi count as a string or integer")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Sats, E> {
                v.parse().map_err(|_| E::custom("invalid satoshi string"))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Sats, E> {
                Ok(Sats(v))
            }
        }

        deserializer.deserialize_any(SatsVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_round_trip() {
        for (s, sat) in [
            ("0.00000001", 1),
            ("1", COIN),
            ("12.5", 1_250_000_000),
            ("10.00000000", 10 * COIN),
            ("0.1", 10_000_000),
        ] {
            assert_eq!(Sats::from_decimal_str(s).unwrap(), Sats::from_sat(sat), "{s}");
        }
        assert_eq!(Sats::from_sat(10 * COIN).to_decimal_string(), "10.00000000");
        assert_eq!(Sats::from_sat(1).to_decimal_string(), "0.00000001");
    }

    #[test]
    fn decimal_rejects_garbage() {
        for s in ["", ".", "-1", "+1", "1e8", "1.000000001", "1.2.3", "abc"] {
            assert!(Sats::from_decimal_str(s).is_err(), "{s}");
        }
    }

    #[test]
    fn coin_f64_round_trip() {
        for sat in [0u64, 1, 12_345_678, 5_000_000_000, 2_100_000_000_000_000] {
            let s = Sats::from_sat(sat);
            assert_eq!(Sats::from_coin_f64(s.to_coin_f64()).unwrap(), s);
        }
        assert!(Sats::from_coin_f64(-0.5).is_err());
        assert!(Sats::from_coin_f64(f64::NAN).is_err());
    }

    #[test]
    fn serde_uses_satoshi_strings() {
        let s = Sats::from_sat(1_000_000_000);
        assert_eq!(serde_json::to_string(&s).unwrap(), "\"1000000000\"");
        let back: Sats = serde_json::from_str("\"1000000000\"").unwrap();
        assert_eq!(back, s);
        let from_num: Sats = serde_json::from_str("7").unwrap();
        assert_eq!(from_num, Sats::from_sat(7));
    }

    #[test]
    fn checked_arithmetic() {
        let a = Sats::from_sat(u64::MAX);
        assert_eq!(a.checked_add(Sats::from_sat(1)), Err(AmountError::Overflow));
        assert_eq!(
            Sats::ZERO.checked_sub(Sats::from_sat(1)),
            Err(AmountError::Overflow)
        );
        assert_eq!(Sats::ZERO.saturating_sub(Sats::from_sat(1)), Sats::ZERO);
    }
}
