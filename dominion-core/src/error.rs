//! Domain error types with stable error codes.
//!
//! Three failure classes exist in the engine:
//!
//! - **Validation denials** (claim refused, permission absent,
//!   insufficient claim funds) are expected outcomes on player-driven
//!   paths. They are plain enums ([`crate::claims::ClaimDenial`]) and
//!   never allocate or unwind.
//! - **Domain errors** ([`DomainError`]) signal caller misuse or
//!   cross-cutting failures on explicit APIs. Each variant carries a
//!   stable [`ErrorCode`] and enough context to build a precise message
//!   without re-reading state.
//! - **Infrastructure failures** surface as
//!   [`crate::storage::StorageError`] from the async boundary.

use crate::state::{PlayerId, TerritoryId};
use thiserror::Error;

/// Stable machine-readable codes attached to [`DomainError`] variants.
///
/// Codes are part of the logging contract and must not be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    InsufficientFunds,
    InsufficientPlayerFunds,
    NegativeAmount,
    TerritoryNotFound,
    PlayerNotFound,
    RankNotFound,
    NotAMember,
    AlreadyHasOverlord,
    NoSuchProposal,
    WarStateConflict,
}

impl ErrorCode {
    /// Stable wire representation, e.g. `DOM_030`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InsufficientFunds => "DOM_030",
            ErrorCode::InsufficientPlayerFunds => "DOM_031",
            ErrorCode::NegativeAmount => "DOM_021",
            ErrorCode::TerritoryNotFound => "DOM_034",
            ErrorCode::PlayerNotFound => "DOM_035",
            ErrorCode::RankNotFound => "DOM_036",
            ErrorCode::NotAMember => "DOM_042",
            ErrorCode::AlreadyHasOverlord => "DOM_050",
            ErrorCode::NoSuchProposal => "DOM_051",
            ErrorCode::WarStateConflict => "DOM_052",
        }
    }
}

/// Errors raised by explicit engine APIs on caller misuse.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("insufficient funds for {territory}: required {required}, available {available}")]
    InsufficientFunds {
        territory: TerritoryId,
        required: f64,
        available: f64,
    },

    #[error("player {player} lacks funds: required {required}, available {available}")]
    InsufficientPlayerFunds {
        player: PlayerId,
        required: f64,
        available: f64,
    },

    #[error("amount must be non-negative, got {amount}")]
    NegativeAmount { amount: f64 },

    #[error("territory not found: {0}")]
    TerritoryNotFound(TerritoryId),

    #[error("player not found: {0}")]
    PlayerNotFound(PlayerId),

    #[error("rank {rank_id} not found in territory {territory}")]
    RankNotFound { territory: TerritoryId, rank_id: u32 },

    #[error("player {player} is not a member of {territory}")]
    NotAMember {
        territory: TerritoryId,
        player: PlayerId,
    },

    #[error("territory {0} already has an overlord")]
    AlreadyHasOverlord(TerritoryId),

    #[error("no pending proposal from {proposer} to {target}")]
    NoSuchProposal {
        proposer: TerritoryId,
        target: TerritoryId,
    },

    #[error("war state conflict for {territory}: {detail}")]
    WarStateConflict {
        territory: TerritoryId,
        detail: String,
    },
}

impl DomainError {
    /// The stable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            DomainError::InsufficientFunds { .. } => ErrorCode::InsufficientFunds,
            DomainError::InsufficientPlayerFunds { .. } => ErrorCode::InsufficientPlayerFunds,
            DomainError::NegativeAmount { .. } => ErrorCode::NegativeAmount,
            DomainError::TerritoryNotFound(_) => ErrorCode::TerritoryNotFound,
            DomainError::PlayerNotFound(_) => ErrorCode::PlayerNotFound,
            DomainError::RankNotFound { .. } => ErrorCode::RankNotFound,
            DomainError::NotAMember { .. } => ErrorCode::NotAMember,
            DomainError::AlreadyHasOverlord(_) => ErrorCode::AlreadyHasOverlord,
            DomainError::NoSuchProposal { .. } => ErrorCode::NoSuchProposal,
            DomainError::WarStateConflict { .. } => ErrorCode::WarStateConflict,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_stable() {
        let err = DomainError::InsufficientFunds {
            territory: TerritoryId::new("t1"),
            required: 100.0,
            available: 25.0,
        };
        assert_eq!(err.code().as_str(), "DOM_030");
        assert!(err.to_string().contains("required 100"));
        assert!(err.to_string().contains("available 25"));
    }
}
