//! Escrow ledger (spec.md §4.1).
//!
//! One `parking_lot::Mutex<Account>` per trader inside a `DashMap`, the
//! same per-key concurrent-access shape as the teacher's
//! `Orderbook::order_index`. Every mutating operation locks only the
//! account(s) it touches; `transfer` locks both accounts in a fixed
//! order (by trader id) to avoid lock-order deadlocks between concurrent
//! transfers that share a counterparty.

use dashmap::DashMap;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::error::LedgerError;
use crate::models::account::{Account, BalanceSnapshot, Field};

pub struct Ledger {
    accounts: DashMap<String, Mutex<Account>>,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    pub fn new() -> Self {
        Self { accounts: DashMap::new() }
    }

    fn entry(&self, trader: &str) -> dashmap::mapref::one::Ref<'_, String, Mutex<Account>> {
        self.accounts
            .entry(trader.to_string())
            .or_insert_with(|| Mutex::new(Account::default()));
        self.accounts.get(trader).expect("just inserted")
    }

    /// Read snapshot; auto-initializes missing accounts to zero (spec.md §4.1).
    pub fn balance(&self, trader: &str) -> BalanceSnapshot {
        let entry = self.entry(trader);
        let acc = *entry.lock();
        acc.into()
    }

    /// Snapshot of every known trader, for `GET /balances`.
    pub fn all_balances(&self) -> std::collections::BTreeMap<String, BalanceSnapshot> {
        self.accounts
            .iter()
            .map(|r| (r.key().clone(), (*r.value().lock()).into()))
            .collect()
    }

    pub fn credit(&self, trader: &str, amount: Decimal, field: Field) {
        let entry = self.entry(trader);
        let mut acc = entry.lock();
        match field {
            Field::Available => acc.available += amount,
            Field::Locked => acc.locked += amount,
        }
        debug!(trader, ?field, %amount, "ledger credit");
    }

    pub fn debit(&self, trader: &str, amount: Decimal, field: Field) -> Result<(), LedgerError> {
        let entry = self.entry(trader);
        let mut acc = entry.lock();
        let current = match field {
            Field::Available => acc.available,
            Field::Locked => acc.locked,
        };
        if current < amount {
            return Err(LedgerError::InsufficientFunds {
                trader: trader.to_string(),
                field: field_name(field),
                requested: amount,
                available: current,
            });
        }
        match field {
            Field::Available => acc.available -= amount,
            Field::Locked => acc.locked -= amount,
        }
        debug!(trader, ?field, %amount, "ledger debit");
        Ok(())
    }

    /// `available -= amount; locked += amount`, atomic under the account's
    /// own lock (spec.md §4.1).
    pub fn lock(&self, trader: &str, amount: Decimal) -> Result<(), LedgerError> {
        let entry = self.entry(trader);
        let mut acc = entry.lock();
        if acc.available < amount {
            return Err(LedgerError::InsufficientFunds {
                trader: trader.to_string(),
                field: "available",
                requested: amount,
                available: acc.available,
            });
        }
        acc.available -= amount;
        acc.locked += amount;
        debug!(trader, %amount, "ledger lock");
        Ok(())
    }

    /// Reverse of `lock`. If `amount` exceeds `locked`, releases only what
    /// is locked and logs the shortfall as a soft anomaly rather than an
    /// error (spec.md §4.1).
    pub fn release(&self, trader: &str, amount: Decimal, reason: &str) {
        if amount <= Decimal::ZERO {
            return;
        }
        let entry = self.entry(trader);
        let mut acc = entry.lock();
        let to_release = amount.min(acc.locked);
        if to_release < amount {
            warn!(
                trader,
                requested = %amount,
                locked = %acc.locked,
                reason,
                "release exceeded locked funds; releasing only what is locked"
            );
        }
        acc.locked -= to_release;
        acc.available += to_release;
    }

    /// Debit then credit, both required to succeed (spec.md §4.1). On
    /// failure the debit is never applied — `Mutex::lock` on the `from`
    /// account is held across the check, so no partial mutation is
    /// observable.
    pub fn transfer(
        &self,
        from: &str,
        to: &str,
        amount: Decimal,
        from_field: Field,
        to_field: Field,
    ) -> Result<(), LedgerError> {
        // Fixed lock order by trader id avoids deadlock when two transfers
        // share a counterparty in opposite directions.
        let (first, second) = if from <= to { (from, to) } else { (to, from) };
        self.entry(first);
        self.entry(second);

        let first_ref = self.accounts.get(first).expect("initialized above");
        let second_ref = self.accounts.get(second).expect("initialized above");

        if first == from {
            let mut from_acc = first_ref.lock();
            let mut to_acc = second_ref.lock();
            Self::apply_transfer(&mut from_acc, &mut to_acc, from, amount, from_field, to_field)
        } else {
            let mut to_acc = first_ref.lock();
            let mut from_acc = second_ref.lock();
            Self::apply_transfer(&mut from_acc, &mut to_acc, from, amount, from_field, to_field)
        }
    }

    fn apply_transfer(
        from_acc: &mut Account,
        to_acc: &mut Account,
        from: &str,
        amount: Decimal,
        from_field: Field,
        to_field: Field,
    ) -> Result<(), LedgerError> {
        let current = match from_field {
            Field::Available => from_acc.available,
            Field::Locked => from_acc.locked,
        };
        if current < amount {
            return Err(LedgerError::InsufficientFunds {
                trader: from.to_string(),
                field: field_name(from_field),
                requested: amount,
                available: current,
            });
        }
        match from_field {
            Field::Available => from_acc.available -= amount,
            Field::Locked => from_acc.locked -= amount,
        }
        match to_field {
            Field::Available => to_acc.available += amount,
            Field::Locked => to_acc.locked += amount,
        }
        Ok(())
    }
}

fn field_name(field: Field) -> &'static str {
    match field {
        Field::Available => "available",
        Field::Locked => "locked",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn lock_then_release_is_a_no_op() {
        let ledger = Ledger::new();
        ledger.credit("T1", dec!(1000), Field::Available);
        ledger.lock("T1", dec!(100)).unwrap();
        ledger.release("T1", dec!(100), "test");
        let bal = ledger.balance("T1");
        assert_eq!(bal.available, dec!(1000));
        assert_eq!(bal.locked, dec!(0));
    }

    #[test]
    fn lock_fails_on_insufficient_available() {
        let ledger = Ledger::new();
        ledger.credit("T1", dec!(50), Field::Available);
        let err = ledger.lock("T1", dec!(100)).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
    }

    #[test]
    fn release_beyond_locked_is_a_soft_anomaly_not_an_error() {
        let ledger = Ledger::new();
        ledger.credit("T1", dec!(100), Field::Available);
        ledger.lock("T1", dec!(100)).unwrap();
        ledger.release("T1", dec!(500), "over-release");
        let bal = ledger.balance("T1");
        assert_eq!(bal.locked, dec!(0));
        assert_eq!(bal.available, dec!(100));
    }

    #[test]
    fn transfer_requires_both_legs_to_succeed() {
        let ledger = Ledger::new();
        ledger.credit("T1", dec!(100), Field::Locked);
        let err = ledger
            .transfer("T1", "T2", dec!(1000), Field::Locked, Field::Available)
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
        // Nothing should have moved.
        assert_eq!(ledger.balance("T1").locked, dec!(100));
        assert_eq!(ledger.balance("T2").available, dec!(0));
    }

    #[test]
    fn balance_auto_initializes_missing_account_to_zero() {
        let ledger = Ledger::new();
        let bal = ledger.balance("NeverSeen");
        assert_eq!(bal.available, dec!(0));
        assert_eq!(bal.locked, dec!(0));
    }
}
