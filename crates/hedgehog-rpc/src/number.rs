/*!
# Lossless RPC Numbers

The ledger reports balances, slots and rent epochs as bare JSON number
literals. Several of them (e.g. the `u64::MAX` rent epoch of rent-exempt
accounts) do not survive a round trip through `f64`, so every number that
reaches a caller is kept as either an exact integer or an exact decimal.
*/

use crate::{RpcError, RpcResult};
use rust_decimal::prelude::*;
use serde::{de, Deserialize, Deserializer};
use std::fmt;

/// A JSON number decoded without precision loss
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RpcNumber {
    /// Integral literal (including integral decimals such as `1.0` or `1e3`)
    Integer(i128),
    /// Literal with a fractional part
    Decimal(Decimal),
}

impl RpcNumber {
    /// Parse a JSON number literal.
    pub fn parse(literal: &str) -> RpcResult<Self> {
        let literal = literal.trim();
        let is_plain_integer = !literal.is_empty()
            && literal
                .trim_start_matches('-')
                .bytes()
                .all(|b| b.is_ascii_digit());

        if is_plain_integer {
            if let Ok(value) = literal.parse::<i128>() {
                return Ok(RpcNumber::Integer(value));
            }
            return Err(RpcError::InvalidNumber(literal.to_string()));
        }

        let decimal = if literal.contains(['e', 'E']) {
            Decimal::from_scientific(literal)
        } else {
            Decimal::from_str(literal)
        }
        .map_err(|_| RpcError::InvalidNumber(literal.to_string()))?;

        if decimal.fract().is_zero() {
            if let Some(value) = decimal.trunc().to_i128() {
                return Ok(RpcNumber::Integer(value));
            }
        }

        Ok(RpcNumber::Decimal(decimal.normalize()))
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, RpcNumber::Integer(_))
    }

    /// Exact `u64` value, if the number is a non-negative integer in range.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            RpcNumber::Integer(value) => u64::try_from(*value).ok(),
            RpcNumber::Decimal(_) => None,
        }
    }

    pub fn as_i128(&self) -> Option<i128> {
        match self {
            RpcNumber::Integer(value) => Some(*value),
            RpcNumber::Decimal(_) => None,
        }
    }

    /// Decimal view of the number, if it fits in 96 bits of mantissa.
    pub fn to_decimal(&self) -> Option<Decimal> {
        match self {
            RpcNumber::Integer(value) => Decimal::from_i128(*value),
            RpcNumber::Decimal(value) => Some(*value),
        }
    }
}

impl FromStr for RpcNumber {
    type Err = RpcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RpcNumber::parse(s)
    }
}

impl From<u64> for RpcNumber {
    fn from(value: u64) -> Self {
        RpcNumber::Integer(value.into())
    }
}

impl fmt::Display for RpcNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RpcNumber::Integer(value) => write!(f, "{}", value),
            RpcNumber::Decimal(value) => write!(f, "{}", value),
        }
    }
}

impl<'de> Deserialize<'de> for RpcNumber {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let number = serde_json::Number::deserialize(deserializer)?;
        RpcNumber::parse(&number.to_string()).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::dec;

    #[test]
    fn test_integers_beyond_f64_precision() {
        let n = RpcNumber::parse("18446744073709551615").unwrap();
        assert_eq!(n, RpcNumber::Integer(u64::MAX as i128));
        assert_eq!(n.as_u64(), Some(u64::MAX));

        // 2^53 + 1 is the first integer an f64 cannot represent
        let n = RpcNumber::parse("9007199254740993").unwrap();
        assert_eq!(n.as_u64(), Some(9_007_199_254_740_993));
    }

    #[test]
    fn test_decimals_and_integral_decimals() {
        assert_eq!(
            RpcNumber::parse("0.000000001").unwrap(),
            RpcNumber::Decimal(dec!(0.000000001))
        );
        assert_eq!(RpcNumber::parse("1.0").unwrap(), RpcNumber::Integer(1));
        assert_eq!(RpcNumber::parse("1e3").unwrap(), RpcNumber::Integer(1000));
        assert_eq!(
            RpcNumber::parse("2.5E-1").unwrap(),
            RpcNumber::Decimal(dec!(0.25))
        );
        assert_eq!(RpcNumber::parse("-42").unwrap(), RpcNumber::Integer(-42));
        assert_eq!(RpcNumber::parse("-42").unwrap().as_u64(), None);
    }

    #[test]
    fn test_invalid_literals() {
        assert!(RpcNumber::parse("").is_err());
        assert!(RpcNumber::parse("abc").is_err());
        assert!(RpcNumber::parse("1".repeat(60).as_str()).is_err());
    }

    #[test]
    fn test_deserialize_from_json_keeps_exact_literal() {
        #[derive(Deserialize)]
        struct Account {
            lamports: RpcNumber,
            #[serde(rename = "rentEpoch")]
            rent_epoch: RpcNumber,
        }

        let account: Account =
            serde_json::from_str(r#"{"lamports": 0.5, "rentEpoch": 18446744073709551615}"#)
                .unwrap();
        assert_eq!(account.lamports, RpcNumber::Decimal(dec!(0.5)));
        assert_eq!(account.rent_epoch.as_u64(), Some(u64::MAX));
        assert_eq!(account.rent_epoch.to_string(), "18446744073709551615");
    }
}
