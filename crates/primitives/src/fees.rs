//! Deposit/withdrawal tax and payout fee formulas.
//!
//! These are consensus-critical: every authority evaluates them over the
//! same chain state and must produce identical results, so everything is
//! plain integer arithmetic on [`Sats`].

use serde::{Deserialize, Serialize};

use crate::amount::{AmountError, Sats};

/// The fee constants of a deployment.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeSchedule {
    /// Minimum amount and flat service fee on each deposit/withdrawal.
    pub flat_fee: Sats,

    /// Network-fee contribution per deposit and per withdrawal included in a
    /// payout batch. Withdrawal *tax* payouts do not count towards this.
    pub payout_network_fee_per_tx: Sats,

    /// Vouts below this are dropped from settlement transactions.
    pub dust_threshold: Sats,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            flat_fee: Sats::from_sat(10 * crate::amount::COIN),
            payout_network_fee_per_tx: Sats::from_sat(20 * crate::amount::COIN),
            dust_threshold: Sats::from_sat(crate::amount::COIN),
        }
    }
}

impl FeeSchedule {
    /// Whether `x` is large enough to carry the flat fee.
    pub fn meets_tax(&self, x: Sats) -> bool {
        x >= self.flat_fee
    }

    /// `tax(x) = flat_fee + (x - flat_fee) / 100`, integer division.
    pub fn tax(&self, x: Sats) -> Result<Sats, AmountError> {
        if !self.meets_tax(x) {
            return Err(AmountError::AmountTooSmall(x, self.flat_fee));
        }
        let above = x.to_sat() - self.flat_fee.to_sat();
        self.flat_fee.checked_add(Sats::from_sat(above / 100))
    }

    /// `x - tax(x)`.
    pub fn amount_after_tax(&self, x: Sats) -> Result<Sats, AmountError> {
        let tax = self.tax(x)?;
        x.checked_sub(tax)
    }

    /// Network fee for a payout batch covering `payout_count` deposits plus
    /// withdrawals.
    pub fn network_fee(&self, payout_count: usize) -> Result<Sats, AmountError> {
        let count = payout_count as u64;
        count
            .checked_mul(self.payout_network_fee_per_tx.to_sat())
            .map(Sats::from_sat)
            .ok_or(AmountError::Overflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amount::COIN;

    fn fees() -> FeeSchedule {
        FeeSchedule::default()
    }

    #[test]
    fn tax_at_flat_fee_boundary() {
        let flat = fees().flat_fee;
        assert!(fees().meets_tax(flat));
        assert_eq!(fees().tax(flat).unwrap(), flat);
        assert_eq!(fees().amount_after_tax(flat).unwrap(), Sats::ZERO);

        let below = Sats::from_sat(flat.to_sat() - 1);
        assert!(!fees().meets_tax(below));
        assert!(matches!(
            fees().tax(below),
            Err(AmountError::AmountTooSmall(..))
        ));
    }

    #[test]
    fn tax_round_trips() {
        // tax(x) + amount_after_tax(x) == x for all x >= flat_fee
        for sat in [
            10 * COIN,
            10 * COIN + 1,
            50 * COIN,
            80 * COIN,
            200 * COIN,
            123_456_789_012,
        ] {
            let x = Sats::from_sat(sat);
            let tax = fees().tax(x).unwrap();
            let net = fees().amount_after_tax(x).unwrap();
            assert_eq!(tax.checked_add(net).unwrap(), x, "x = {sat}");
        }
    }

    #[test]
    fn deposit_of_fifty_coins() {
        // 50 coins: tax = 10 + (50 - 10)/100 coins = 10.4 coins.
        let x = Sats::from_sat(50 * COIN);
        assert_eq!(fees().tax(x).unwrap(), Sats::from_sat(1_040_000_000));
        assert_eq!(
            fees().amount_after_tax(x).unwrap(),
            Sats::from_sat(3_960_000_000)
        );
    }

    #[test]
    fn burn_of_eighty_coins() {
        let x = Sats::from_sat(80 * COIN);
        assert_eq!(fees().tax(x).unwrap(), Sats::from_sat(1_070_000_000));
        assert_eq!(
            fees().amount_after_tax(x).unwrap(),
            Sats::from_sat(6_930_000_000)
        );
    }

    #[test]
    fn network_fee_counts_only_principal_payouts() {
        let fee = fees().network_fee(2).unwrap();
        assert_eq!(fee, Sats::from_sat(40 * COIN));
        assert_eq!(fees().network_fee(0).unwrap(), Sats::ZERO);
    }
}
