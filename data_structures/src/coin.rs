use std::fmt;

use serde::{Deserialize, Serialize};

/// 1 mote is the minimal unit of value
/// 1 coin = 10^9 motes
pub const MOTES_PER_COIN: u64 = 1_000_000_000;
// 10 ^ COIN_DECIMAL_PLACES
/// Number of decimal places used in the string representation of a coin value.
pub const COIN_DECIMAL_PLACES: u8 = 9;

/// Unit of value
#[derive(
    Clone, Copy, Debug, Deserialize, Default, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize,
)]
pub struct Coin(u64);

impl Coin {
    /// Create from whole coins
    #[inline]
    pub fn from_coins(coins: u64) -> Self {
        Self(coins.checked_mul(MOTES_PER_COIN).expect("overflow"))
    }

    /// Create from motes
    #[inline]
    pub fn from_motes(motes: u64) -> Self {
        Self(motes)
    }

    /// Retrieve the motes value within.
    #[inline]
    pub fn motes(self) -> u64 {
        self.0
    }

    /// Checked addition, `None` on overflow
    #[inline]
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    /// Checked subtraction, `None` on underflow
    #[inline]
    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Self)
    }

    /// Return integer and fractional part, useful for pretty printing
    pub fn coins_and_motes(self) -> (u64, u64) {
        let motes = self.0;
        let amount_coins = motes / MOTES_PER_COIN;
        let amount_motes = motes % MOTES_PER_COIN;

        (amount_coins, amount_motes)
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (amount_coins, amount_motes) = self.coins_and_motes();
        let width = usize::from(COIN_DECIMAL_PLACES);

        write!(
            f,
            "{}.{:0width$}",
            amount_coins,
            amount_motes,
            width = width
        )
    }
}

impl std::ops::Add for Coin {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.motes() + rhs.motes())
    }
}

impl std::ops::Sub for Coin {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.motes() - rhs.motes())
    }
}

impl num_traits::Zero for Coin {
    #[inline]
    fn zero() -> Self {
        Coin(0)
    }

    #[inline]
    fn is_zero(&self) -> bool {
        matches!(self, &Coin(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coin_decimal_places() {
        // 10 ^ COIN_DECIMAL_PLACES == MOTES_PER_COIN
        assert_eq!(10u64.pow(u32::from(COIN_DECIMAL_PLACES)), MOTES_PER_COIN);
    }

    #[test]
    fn coin_pretty_print() {
        assert_eq!(Coin::from_motes(0).to_string(), "0.000000000");
        assert_eq!(Coin::from_motes(1).to_string(), "0.000000001");
        assert_eq!(Coin::from_motes(7_890).to_string(), "0.000007890");
        assert_eq!(Coin::from_motes(234_567_890).to_string(), "0.234567890");
        assert_eq!(Coin::from_motes(1_234_567_890).to_string(), "1.234567890");
        assert_eq!(
            Coin::from_motes(321_234_567_890).to_string(),
            "321.234567890"
        );
    }

    #[test]
    fn coin_checked_arithmetic() {
        let max = Coin::from_motes(u64::MAX);
        assert_eq!(max.checked_add(Coin::from_motes(1)), None);
        assert_eq!(
            Coin::from_motes(2).checked_sub(Coin::from_motes(1)),
            Some(Coin::from_motes(1))
        );
        assert_eq!(Coin::from_motes(1).checked_sub(Coin::from_motes(2)), None);
    }
}
