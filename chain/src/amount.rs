//! Fixed-point coin amounts.
//!
//! The source format represents `amount` as a floating point number on the
//! wire, which makes the canonical hash language- and platform-dependent
//! (IEEE-754 rounding differs subtly across serializers). `Amount` instead
//! stores an integer count of sub-units and renders to JSON as the minimal
//! decimal number for that value, never going through an `f64`.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Number of sub-units per whole coin (6 decimal places).
pub const SUBUNIT_SCALE: u64 = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount {
    sub_units: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountError {
    NonPositive,
    Malformed,
    TooManyFractionalDigits,
}

impl fmt::Display for AmountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AmountError::NonPositive => write!(f, "amount must be positive"),
            AmountError::Malformed => write!(f, "amount is not a valid decimal number"),
            AmountError::TooManyFractionalDigits => {
                write!(f, "amount has more than 6 fractional digits")
            }
        }
    }
}

impl std::error::Error for AmountError {}

impl Amount {
    pub const ZERO: Amount = Amount { sub_units: 0 };

    /// Constructs an amount from a whole-coin integer count (e.g. the mining reward).
    pub fn from_coins(coins: u64) -> Self {
        Amount { sub_units: coins * SUBUNIT_SCALE }
    }

    /// Constructs an amount from a raw sub-unit count.
    pub fn from_sub_units(sub_units: u64) -> Self {
        Amount { sub_units }
    }

    /// Raw sub-unit count, for balance arithmetic that needs to go negative
    /// transiently (e.g. mempool admission checks) before being rejected.
    pub fn sub_units(self) -> u64 {
        self.sub_units
    }

    /// Parses a decimal string with at most `SUBUNIT_SCALE`'s worth of fractional digits.
    /// Rejects non-positive amounts per the `non_positive_amount` failure kind.
    pub fn parse_positive(s: &str) -> Result<Self, AmountError> {
        let amount = Self::parse(s)?;
        if amount.sub_units == 0 {
            return Err(AmountError::NonPositive);
        }
        Ok(amount)
    }

    fn parse(s: &str) -> Result<Self, AmountError> {
        let s = s.trim();
        if s.starts_with('-') {
            return Err(AmountError::NonPositive);
        }
        let (int_part, frac_part) = match s.split_once('.') {
            Some((i, f)) => (i, f),
            None => (s, ""),
        };
        if int_part.is_empty() || !int_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AmountError::Malformed);
        }
        if !frac_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AmountError::Malformed);
        }
        if frac_part.len() > 6 {
            return Err(AmountError::TooManyFractionalDigits);
        }
        let whole: u64 = int_part.parse().map_err(|_| AmountError::Malformed)?;
        let mut frac_digits = frac_part.to_string();
        while frac_digits.len() < 6 {
            frac_digits.push('0');
        }
        let frac: u64 = frac_digits.parse().map_err(|_| AmountError::Malformed)?;
        Ok(Amount { sub_units: whole * SUBUNIT_SCALE + frac })
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.sub_units.checked_add(other.sub_units).map(|sub_units| Amount { sub_units })
    }

    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.sub_units.checked_sub(other.sub_units).map(|sub_units| Amount { sub_units })
    }

    pub fn is_zero(self) -> bool {
        self.sub_units == 0
    }

    /// Minimal decimal representation: integral amounts render with no
    /// fractional part, others trim trailing zero fractional digits.
    fn to_decimal_string(self) -> String {
        let whole = self.sub_units / SUBUNIT_SCALE;
        let frac = self.sub_units % SUBUNIT_SCALE;
        if frac == 0 {
            whole.to_string()
        } else {
            let mut frac_str = format!("{:06}", frac);
            while frac_str.ends_with('0') {
                frac_str.pop();
            }
            format!("{whole}.{frac_str}")
        }
    }
}

impl FromStr for Amount {
    type Err = AmountError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal_string())
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let decimal = self.to_decimal_string();
        // `arbitrary_precision` backs `serde_json::Number` with the exact
        // source string instead of an f64, so this round-trips the digits
        // we computed without introducing float rounding into the hash.
        let number: serde_json::Number = decimal.parse().map_err(serde::ser::Error::custom)?;
        number.serialize(serializer)
    }
}

struct AmountVisitor;

impl<'de> Visitor<'de> for AmountVisitor {
    type Value = Amount;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a positive decimal number with at most 6 fractional digits")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
        Ok(Amount::from_coins(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Amount, E> {
        if v < 0 {
            return Err(E::custom(AmountError::NonPositive));
        }
        Ok(Amount::from_coins(v as u64))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Amount, E> {
        Amount::parse(&format!("{v}")).map_err(E::custom)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
        Amount::parse(v).map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(AmountVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_amounts_render_without_fraction() {
        assert_eq!(Amount::from_coins(50).to_string(), "50");
    }

    #[test]
    fn fractional_amounts_trim_trailing_zeros() {
        let a = Amount::parse_positive("25.500000").unwrap();
        assert_eq!(a.to_string(), "25.5");
    }

    #[test]
    fn rejects_non_positive() {
        assert_eq!(Amount::parse_positive("0").unwrap_err(), AmountError::NonPositive);
        assert_eq!(Amount::parse_positive("-1").unwrap_err(), AmountError::NonPositive);
    }

    #[test]
    fn rejects_too_many_fractional_digits() {
        assert_eq!(
            Amount::parse_positive("1.1234567").unwrap_err(),
            AmountError::TooManyFractionalDigits
        );
    }

    #[test]
    fn json_round_trip_preserves_value() {
        let a = Amount::parse_positive("12.34").unwrap();
        let json = serde_json::to_string(&a).unwrap();
        assert_eq!(json, "12.34");
        let back: Amount = serde_json::from_str(&json).unwrap();
        assert_eq!(a, back);
    }

    #[test]
    fn checked_sub_detects_underflow() {
        let a = Amount::from_coins(5);
        let b = Amount::from_coins(10);
        assert!(a.checked_sub(b).is_none());
    }
}
