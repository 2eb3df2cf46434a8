//! Territory treasury as an immutable value object.
//!
//! Mutation replaces the whole component, so a concurrent reader
//! observes either the pre- or post-mutation balance, never a torn
//! value. The balance may go negative through upkeep debt; negative
//! *amounts* are caller errors.

use crate::error::DomainError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Treasury {
    balance: f64,
}

impl Treasury {
    pub fn new(balance: f64) -> Self {
        Self { balance }
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub fn has_sufficient_funds(&self, amount: f64) -> bool {
        self.balance >= amount
    }

    /// Missing amount to cover `amount`, zero when already covered.
    pub fn deficit(&self, amount: f64) -> f64 {
        (amount - self.balance).max(0.0)
    }

    /// Add `amount`; rejects negative amounts.
    pub fn deposit(&self, amount: f64) -> Result<Treasury, DomainError> {
        if amount < 0.0 {
            return Err(DomainError::NegativeAmount { amount });
        }
        Ok(Treasury::new(self.balance + amount))
    }

    /// Remove `amount`; rejects negative amounts. The result may be
    /// negative (debt is allowed).
    pub fn withdraw(&self, amount: f64) -> Result<Treasury, DomainError> {
        if amount < 0.0 {
            return Err(DomainError::NegativeAmount { amount });
        }
        Ok(Treasury::new(self.balance - amount))
    }

    pub fn with_balance(&self, balance: f64) -> Treasury {
        Treasury::new(balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_withdraw_allows_debt() {
        let treasury = Treasury::new(10.0).withdraw(25.0).unwrap();
        assert_eq!(treasury.balance(), -15.0);
    }

    #[test]
    fn test_negative_amounts_rejected() {
        let treasury = Treasury::new(10.0);
        assert!(treasury.deposit(-1.0).is_err());
        assert!(treasury.withdraw(-1.0).is_err());
        // Original untouched either way.
        assert_eq!(treasury.balance(), 10.0);
    }

    #[test]
    fn test_deficit() {
        let treasury = Treasury::new(40.0);
        assert_eq!(treasury.deficit(100.0), 60.0);
        assert_eq!(treasury.deficit(10.0), 0.0);
    }
}
