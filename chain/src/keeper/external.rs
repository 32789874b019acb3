//! External collaborator interfaces.
//!
//! The auction module touches accounts, balances, and the validator set
//! only through these narrow traits. The in-memory implementations are
//! first-class: tests and the demo node use them directly, and a real node
//! wires in its own bank and staking modules instead.

use std::collections::HashMap;

use thiserror::Error;

use crate::types::{address, Coin};

/// Errors produced by bank operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BankError {
    #[error("insufficient funds: {addr} has {have}{denom}, needs {need}{denom}")]
    InsufficientFunds {
        addr: String,
        denom: String,
        have: u128,
        need: u128,
    },
}

/// The slice of the bank module the auction module depends on.
pub trait BankKeeper {
    /// The spendable balance of `addr` in `denom`.
    fn spendable_balance(&self, addr: &str, denom: &str) -> u128;

    /// Every non-zero spendable balance of `addr`, in denom order.
    fn spendable_coins(&self, addr: &str) -> Vec<Coin>;

    /// Moves `amount` from `from` to `to`, atomically across all coins.
    fn send_coins(&mut self, from: &str, to: &str, amount: &[Coin]) -> Result<(), BankError>;
}

/// A validator as seen by the auction module.
#[derive(Clone, Debug, PartialEq)]
pub struct Validator {
    pub operator_address: String,
    pub bonded: bool,
    pub jailed: bool,
}

/// The slice of the staking module the auction module depends on.
pub trait StakingKeeper {
    /// Returns the validator registered under `operator_address`, if any.
    fn validator(&self, operator_address: &str) -> Option<Validator>;
}

/// The slice of the account module the auction module depends on.
///
/// Only module-account resolution is needed: payments flow into the
/// auction module's account and out of it at end of block.
pub trait AccountKeeper: Send + Sync {
    /// Account address of the named module.
    fn module_address(&self, module_name: &str) -> String;
}

/// Default [`AccountKeeper`]: module accounts derived from the module
/// name, with no backing account store.
#[derive(Default)]
pub struct ModuleAccounts;

impl AccountKeeper for ModuleAccounts {
    fn module_address(&self, module_name: &str) -> String {
        address::module_address(module_name)
    }
}

/// In-memory bank, balances keyed by `(address, denom)`.
#[derive(Default)]
pub struct MemBank {
    balances: HashMap<(String, String), u128>,
}

impl MemBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an account's balance in one denom, replacing any previous one.
    pub fn set_balance(&mut self, addr: &str, coin: Coin) {
        self.balances
            .insert((addr.to_string(), coin.denom), coin.amount);
    }
}

impl BankKeeper for MemBank {
    fn spendable_balance(&self, addr: &str, denom: &str) -> u128 {
        self.balances
            .get(&(addr.to_string(), denom.to_string()))
            .copied()
            .unwrap_or(0)
    }

    fn spendable_coins(&self, addr: &str) -> Vec<Coin> {
        let mut coins: Vec<Coin> = self
            .balances
            .iter()
            .filter(|((a, _), amount)| a == addr && **amount > 0)
            .map(|((_, denom), amount)| Coin::new(*amount, denom.clone()))
            .collect();
        coins.sort_by(|a, b| a.denom.cmp(&b.denom));
        coins
    }

    fn send_coins(&mut self, from: &str, to: &str, amount: &[Coin]) -> Result<(), BankError> {
        // Check all balances before mutating anything.
        for coin in amount {
            let have = self.spendable_balance(from, &coin.denom);
            if have < coin.amount {
                return Err(BankError::InsufficientFunds {
                    addr: from.to_string(),
                    denom: coin.denom.clone(),
                    have,
                    need: coin.amount,
                });
            }
        }

        for coin in amount {
            *self
                .balances
                .entry((from.to_string(), coin.denom.clone()))
                .or_insert(0) -= coin.amount;
            *self
                .balances
                .entry((to.to_string(), coin.denom.clone()))
                .or_insert(0) += coin.amount;
        }

        Ok(())
    }
}

/// In-memory validator set.
#[derive(Default)]
pub struct MemStaking {
    validators: HashMap<String, Validator>,
}

impl MemStaking {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a validator.
    pub fn add_validator(&mut self, validator: Validator) {
        self.validators
            .insert(validator.operator_address.clone(), validator);
    }
}

impl StakingKeeper for MemStaking {
    fn validator(&self, operator_address: &str) -> Option<Validator> {
        self.validators.get(operator_address).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_coins_moves_balance() {
        let mut bank = MemBank::new();
        bank.set_balance("auc1from", Coin::new(100, "stake"));

        bank.send_coins("auc1from", "auc1to", &[Coin::new(40, "stake")])
            .expect("transfer should succeed");

        assert_eq!(bank.spendable_balance("auc1from", "stake"), 60);
        assert_eq!(bank.spendable_balance("auc1to", "stake"), 40);
    }

    #[test]
    fn send_coins_rejects_insolvency_without_partial_transfer() {
        let mut bank = MemBank::new();
        bank.set_balance("auc1from", Coin::new(100, "stake"));

        let result = bank.send_coins(
            "auc1from",
            "auc1to",
            &[Coin::new(50, "stake"), Coin::new(1, "atom")],
        );
        assert!(matches!(result, Err(BankError::InsufficientFunds { .. })));

        // Nothing moved.
        assert_eq!(bank.spendable_balance("auc1from", "stake"), 100);
        assert_eq!(bank.spendable_balance("auc1to", "stake"), 0);
    }

    #[test]
    fn module_accounts_resolve_stable_addresses() {
        let accounts = ModuleAccounts;
        assert_eq!(
            accounts.module_address("auction"),
            accounts.module_address("auction")
        );
        assert_ne!(
            accounts.module_address("auction"),
            accounts.module_address("distribution")
        );
        assert!(address::validate_account_address(&accounts.module_address("auction")).is_ok());
    }

    #[test]
    fn staking_lookup() {
        let mut staking = MemStaking::new();
        staking.add_validator(Validator {
            operator_address: "aucval1op".to_string(),
            bonded: true,
            jailed: false,
        });

        assert!(staking.validator("aucval1op").is_some());
        assert!(staking.validator("aucval1other").is_none());
    }
}
