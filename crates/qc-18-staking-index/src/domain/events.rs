//! # Contract Events
//!
//! The closed set of staking contract events the index understands, produced
//! by an [`EventDecoder`](crate::ports::outbound::EventDecoder).
//!
//! Token ids and durations are narrowed to `u64` at decode time; amounts stay
//! 256-bit.

use super::entities::{Address, Candidate, Hash, U256};

/// A decoded staking contract event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractEvent {
    BucketTypeActivated {
        amount: U256,
        duration: u64,
    },
    BucketTypeDeactivated {
        amount: U256,
        duration: u64,
    },
    Staked {
        token_id: u64,
        delegate: Candidate,
        amount: U256,
        duration: u64,
    },
    Locked {
        token_id: u64,
        duration: u64,
    },
    Unlocked {
        token_id: u64,
    },
    Unstaked {
        token_id: u64,
    },
    /// All listed buckets merged into the first one.
    Merged {
        token_ids: Vec<u64>,
        amount: U256,
        duration: u64,
    },
    DurationExtended {
        token_id: u64,
        duration: u64,
    },
    AmountIncreased {
        token_id: u64,
        amount: U256,
    },
    DelegateChanged {
        token_id: u64,
        new_delegate: Candidate,
    },
    Withdrawal {
        token_id: u64,
        recipient: Address,
    },
    /// ERC-721 ownership transfer of a bucket NFT.
    Transfer {
        from: Address,
        to: Address,
        token_id: u64,
    },
    /// A log from the contract whose signature this index does not know,
    /// or an anonymous log without topics.
    Unrecognized {
        topic: Option<Hash>,
    },
}

impl ContractEvent {
    /// Event name as it appears in the contract ABI.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::BucketTypeActivated { .. } => "BucketTypeActivated",
            Self::BucketTypeDeactivated { .. } => "BucketTypeDeactivated",
            Self::Staked { .. } => "Staked",
            Self::Locked { .. } => "Locked",
            Self::Unlocked { .. } => "Unlocked",
            Self::Unstaked { .. } => "Unstaked",
            Self::Merged { .. } => "Merged",
            Self::DurationExtended { .. } => "DurationExtended",
            Self::AmountIncreased { .. } => "AmountIncreased",
            Self::DelegateChanged { .. } => "DelegateChanged",
            Self::Withdrawal { .. } => "Withdrawal",
            Self::Transfer { .. } => "Transfer",
            Self::Unrecognized { .. } => "Unrecognized",
        }
    }
}
