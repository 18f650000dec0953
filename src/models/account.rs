//! Trader account — the ledger's unit of storage.
//!
//! spec.md §3: two non-negative monetary scalars, `available` and
//! `locked`. Both are `Decimal`, never `f64` (see SPEC_FULL.md §3) so the
//! monetary-conservation invariant in spec.md §8 holds exactly.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub available: Decimal,
    pub locked: Decimal,
}

impl Default for Account {
    fn default() -> Self {
        Self { available: Decimal::ZERO, locked: Decimal::ZERO }
    }
}

impl Account {
    pub fn total(&self) -> Decimal {
        self.available + self.locked
    }
}

/// Which partition of an account an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Available,
    Locked,
}

/// Snapshot of every known trader's balance, as returned by `GET /balances`.
#[derive(Debug, Clone, Serialize)]
pub struct BalanceSnapshot {
    pub available: Decimal,
    pub locked: Decimal,
}

impl From<Account> for BalanceSnapshot {
    fn from(acc: Account) -> Self {
        Self { available: acc.available, locked: acc.locked }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_sums_both_partitions() {
        let acc = Account { available: Decimal::new(100, 0), locked: Decimal::new(50, 0) };
        assert_eq!(acc.total(), Decimal::new(150, 0));
    }
}
