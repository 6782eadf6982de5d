use std::{fmt, ops, str};

pub use num_traits::Zero;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::coin::Coin;

/// A total miner fee, as declared by the transactions of a set.
#[derive(Copy, Clone, Debug, Deserialize, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct AbsoluteFee(Coin);

impl AbsoluteFee {
    #[inline]
    pub fn as_motes(&self) -> u64 {
        self.0.motes()
    }

    #[inline]
    pub fn into_inner(self) -> Coin {
        self.0
    }

    /// Checked addition, `None` on overflow
    #[inline]
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }
}

impl From<Coin> for AbsoluteFee {
    #[inline]
    fn from(coin: Coin) -> Self {
        Self(coin)
    }
}

impl fmt::Display for AbsoluteFee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl str::FromStr for AbsoluteFee {
    type Err = <u64 as str::FromStr>::Err;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        u64::from_str(s).map(Coin::from_motes).map(Self)
    }
}

impl ops::Add for AbsoluteFee {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Zero for AbsoluteFee {
    #[inline]
    fn zero() -> Self {
        Self(Coin::zero())
    }

    #[inline]
    fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

/// A fee rate in motes (or fractional amounts) per serialized byte.
///
/// The transaction pool prices admission in this unit: candidates pay
/// relative to their canonical encoded size.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct RelativeFee(OrderedFloat<f64>);

impl<'de> Deserialize<'de> for RelativeFee {
    fn deserialize<D>(deserializer: D) -> Result<Self, <D as Deserializer<'de>>::Error>
    where
        D: Deserializer<'de>,
    {
        f64::deserialize(deserializer).map(Self::from)
    }
}

impl Serialize for RelativeFee {
    fn serialize<S>(&self, serializer: S) -> Result<<S as Serializer>::Ok, <S as Serializer>::Error>
    where
        S: Serializer,
    {
        Serialize::serialize(&self.0.into_inner(), serializer)
    }
}

impl RelativeFee {
    #[inline]
    pub fn as_f64(&self) -> f64 {
        self.0.into_inner()
    }

    /// Derive the absolute fee required for a payload of `encoded_size`
    /// bytes. Rounded up: fractional motes are charged whole.
    #[allow(clippy::cast_possible_truncation)]
    #[allow(clippy::cast_sign_loss)]
    #[inline]
    pub fn into_absolute(self, encoded_size: u64) -> AbsoluteFee {
        #[allow(clippy::cast_precision_loss)]
        let motes = (self.0.into_inner() * encoded_size as f64).ceil() as u64;

        AbsoluteFee(Coin::from_motes(motes))
    }
}

impl From<f64> for RelativeFee {
    #[inline]
    fn from(input: f64) -> Self {
        Self(OrderedFloat(input))
    }
}

impl fmt::Display for RelativeFee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} motes/B", self.0)
    }
}

impl str::FromStr for RelativeFee {
    type Err = <f64 as str::FromStr>::Err;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        f64::from_str(s).map(Self::from)
    }
}

impl ops::Add for RelativeFee {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Zero for RelativeFee {
    #[inline]
    fn zero() -> Self {
        Self(OrderedFloat(0.0))
    }

    #[inline]
    fn is_zero(&self) -> bool {
        self.0.into_inner() == 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_fee_rounds_up() {
        let fee = RelativeFee::from(0.5);
        assert_eq!(fee.into_absolute(3).as_motes(), 2);
        assert_eq!(fee.into_absolute(4).as_motes(), 2);
    }

    #[test]
    fn zero_relative_fee_is_free() {
        assert_eq!(RelativeFee::zero().into_absolute(1_000_000).as_motes(), 0);
    }

    #[test]
    fn absolute_fee_checked_add() {
        let max = AbsoluteFee::from(Coin::from_motes(u64::MAX));
        assert_eq!(max.checked_add(AbsoluteFee::from(Coin::from_motes(1))), None);
    }
}
