//! Per-user wallet slots.
//!
//! The transaction log is the only stored state; the balance is always
//! derived as the sum of signed amounts, so the two cannot drift apart.
//! Credits are stored positive, debits negative.

use chrono::Utc;
use rand::RngCore;
use uuid::Uuid;

use crate::bus::Domain;
use crate::error::WalletError;
use crate::models::{Order, TxKind, TxStatus, WalletTransaction};
use crate::store::{wallet_slot, Store};

/// How a withdrawal leaves the wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WithdrawMethod {
    MobileMoney,
    /// Not wired up to any provider; selecting it is a permanent,
    /// non-retryable notice, not a transient failure.
    BankTransfer,
}

impl Store {
    /// Credit the wallet.
    pub fn deposit(
        &self,
        user_id: &str,
        amount: f64,
        description: &str,
    ) -> Result<WalletTransaction, WalletError> {
        validate_amount(amount)?;
        Ok(self.append_tx(
            user_id,
            WalletTransaction {
                id: Uuid::new_v4(),
                kind: TxKind::Deposit,
                amount,
                description: description.to_string(),
                date: Utc::now(),
                status: TxStatus::Completed,
                reference: new_reference(),
                recipient: None,
                sender: None,
            },
        ))
    }

    /// Debit the wallet towards a payout method.
    pub fn withdraw(
        &self,
        user_id: &str,
        amount: f64,
        method: WithdrawMethod,
    ) -> Result<WalletTransaction, WalletError> {
        validate_amount(amount)?;
        if method == WithdrawMethod::BankTransfer {
            return Err(WalletError::MethodUnavailable(
                "bank transfers are not available in your region".into(),
            ));
        }

        self.append_debit(
            user_id,
            amount,
            WalletTransaction {
                id: Uuid::new_v4(),
                kind: TxKind::Withdrawal,
                amount: -amount,
                description: "Mobile money withdrawal".to_string(),
                date: Utc::now(),
                status: TxStatus::Processing,
                reference: new_reference(),
                recipient: None,
                sender: None,
            },
        )
    }

    /// Send funds to another user (recorded on the sender's log only; the
    /// wallet is device-local).
    pub fn transfer(
        &self,
        user_id: &str,
        recipient: &str,
        amount: f64,
    ) -> Result<WalletTransaction, WalletError> {
        validate_amount(amount)?;
        if recipient.trim().is_empty() {
            return Err(WalletError::Validation("recipient is required".into()));
        }

        self.append_debit(
            user_id,
            amount,
            WalletTransaction {
                id: Uuid::new_v4(),
                kind: TxKind::Transfer,
                amount: -amount,
                description: format!("Transfer to {recipient}"),
                date: Utc::now(),
                status: TxStatus::Completed,
                reference: new_reference(),
                recipient: Some(recipient.to_string()),
                sender: Some(user_id.to_string()),
            },
        )
    }

    /// Credit a refund back to the wallet.
    pub fn refund(
        &self,
        user_id: &str,
        amount: f64,
        description: &str,
    ) -> Result<WalletTransaction, WalletError> {
        validate_amount(amount)?;
        Ok(self.append_tx(
            user_id,
            WalletTransaction {
                id: Uuid::new_v4(),
                kind: TxKind::Refund,
                amount,
                description: description.to_string(),
                date: Utc::now(),
                status: TxStatus::Completed,
                reference: new_reference(),
                recipient: None,
                sender: None,
            },
        ))
    }

    /// Debit the wallet for an order.
    pub fn pay_for_order(
        &self,
        user_id: &str,
        order: &Order,
    ) -> Result<WalletTransaction, WalletError> {
        validate_amount(order.total)?;
        self.append_debit(
            user_id,
            order.total,
            WalletTransaction {
                id: Uuid::new_v4(),
                kind: TxKind::Purchase,
                amount: -order.total,
                description: format!("Order #{}", order.id),
                date: Utc::now(),
                status: TxStatus::Completed,
                reference: format!("ORD-{}", order.id),
                recipient: None,
                sender: None,
            },
        )
    }

    /// The user's transaction log, oldest first.
    pub fn wallet_transactions(&self, user_id: &str) -> Vec<WalletTransaction> {
        self.load_slot(&wallet_slot(user_id))
    }

    /// Derived balance: the sum of signed amounts.  There is no stored
    /// balance to reconcile against.
    pub fn wallet_balance(&self, user_id: &str) -> f64 {
        self.wallet_transactions(user_id)
            .iter()
            .map(|t| t.amount)
            .sum()
    }

    /// Append a credit unconditionally.
    fn append_tx(&self, user_id: &str, tx: WalletTransaction) -> WalletTransaction {
        let key = wallet_slot(user_id);
        self.mutate_slot(Domain::Wallet, &key, |mut txs: Vec<WalletTransaction>| {
            txs.push(tx.clone());
            txs
        });
        tx
    }

    /// Append a debit, checking the derived balance inside the mutation so a
    /// competing debit cannot slip past the funds check.
    fn append_debit(
        &self,
        user_id: &str,
        requested: f64,
        tx: WalletTransaction,
    ) -> Result<WalletTransaction, WalletError> {
        let key = wallet_slot(user_id);
        let mut outcome = Err(WalletError::InsufficientFunds {
            available: 0.0,
            requested,
        });
        self.mutate_slot(Domain::Wallet, &key, |mut txs: Vec<WalletTransaction>| {
            let available: f64 = txs.iter().map(|t| t.amount).sum();
            if available < requested {
                outcome = Err(WalletError::InsufficientFunds {
                    available,
                    requested,
                });
                return txs;
            }
            txs.push(tx.clone());
            outcome = Ok(tx.clone());
            txs
        });
        outcome
    }
}

/// Payment reference shown to the user, e.g. `LR-9F3A61D2`.
fn new_reference() -> String {
    let mut bytes = [0u8; 4];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("LR-{}", hex::encode_upper(bytes))
}

fn validate_amount(amount: f64) -> Result<(), WalletError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(WalletError::Validation(
            "amount must be a positive number".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn balance_matches_log(store: &Store, user: &str) {
        let sum: f64 = store
            .wallet_transactions(user)
            .iter()
            .map(|t| t.amount)
            .sum();
        assert_eq!(store.wallet_balance(user), sum);
    }

    #[test]
    fn balance_is_always_the_sum_of_the_log() {
        let store = Store::open_in_memory().unwrap();

        store.deposit("user-1", 10_000.0, "Top-up").unwrap();
        balance_matches_log(&store, "user-1");

        store
            .withdraw("user-1", 2_500.0, WithdrawMethod::MobileMoney)
            .unwrap();
        balance_matches_log(&store, "user-1");

        store.transfer("user-1", "user-2", 1_000.0).unwrap();
        balance_matches_log(&store, "user-1");

        store.refund("user-1", 500.0, "Order #3 refund").unwrap();
        balance_matches_log(&store, "user-1");

        assert_eq!(store.wallet_balance("user-1"), 7_000.0);
        assert_eq!(store.wallet_transactions("user-1").len(), 4);
    }

    #[test]
    fn debits_respect_the_derived_balance() {
        let store = Store::open_in_memory().unwrap();
        store.deposit("user-1", 1_000.0, "Top-up").unwrap();

        let err = store
            .withdraw("user-1", 1_500.0, WithdrawMethod::MobileMoney)
            .unwrap_err();
        assert_eq!(
            err,
            WalletError::InsufficientFunds {
                available: 1_000.0,
                requested: 1_500.0
            }
        );

        // The refused debit left no trace.
        assert_eq!(store.wallet_transactions("user-1").len(), 1);
        assert_eq!(store.wallet_balance("user-1"), 1_000.0);
    }

    #[test]
    fn bank_transfer_is_a_permanent_notice() {
        let store = Store::open_in_memory().unwrap();
        store.deposit("user-1", 10_000.0, "Top-up").unwrap();

        assert!(matches!(
            store.withdraw("user-1", 100.0, WithdrawMethod::BankTransfer),
            Err(WalletError::MethodUnavailable(_))
        ));
        assert_eq!(store.wallet_balance("user-1"), 10_000.0);
    }

    #[test]
    fn wallets_are_scoped_per_user() {
        let store = Store::open_in_memory().unwrap();
        store.deposit("user-1", 5_000.0, "Top-up").unwrap();

        assert_eq!(store.wallet_balance("user-2"), 0.0);
        assert!(store.wallet_transactions("user-2").is_empty());
    }

    #[test]
    fn paying_an_order_references_it() {
        let store = Store::open_in_memory().unwrap();
        store.deposit("user-1", 20_000.0, "Top-up").unwrap();

        let order = Order {
            id: 7,
            buyer_id: "user-1".to_string(),
            buyer_name: "Ayuk".to_string(),
            items: vec![],
            total: 13_000.0,
            status: crate::models::OrderStatus::Pending,
            created_at: Utc::now(),
        };

        let tx = store.pay_for_order("user-1", &order).unwrap();
        assert_eq!(tx.kind, TxKind::Purchase);
        assert_eq!(tx.reference, "ORD-7");
        assert_eq!(store.wallet_balance("user-1"), 7_000.0);
    }
}
