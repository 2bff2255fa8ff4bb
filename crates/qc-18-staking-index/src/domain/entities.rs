//! # Core Domain Entities
//!
//! Bucket types, bucket instances and the primitives they are built from.
//!
//! Timestamps are optional here. The `u64::MAX` "max block number" sentinel
//! that the contract encoding uses for "still locked" only exists in
//! [`codec`](super::codec).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

pub use primitive_types::U256;

/// 32-byte hash (event topics).
pub type Hash = [u8; 32];

/// Unix timestamp in seconds since epoch.
pub type Timestamp = u64;

// =============================================================================
// ADDRESS (20 bytes)
// =============================================================================

/// A 20-byte contract or account address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The zero address (0x0000...0000).
    pub const ZERO: Self = Self([0u8; 20]);

    #[must_use]
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Creates an address from a slice. Returns None if wrong length.
    #[must_use]
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        <[u8; 20]>::try_from(slice).ok().map(Self)
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

// =============================================================================
// CANDIDATE (12 bytes)
// =============================================================================

/// The delegate a bucket votes for, as the contract's `bytes12` value.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Candidate(pub [u8; 12]);

impl Candidate {
    #[must_use]
    pub const fn new(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    /// Builds a candidate from a short name, right-padded with zero bytes.
    ///
    /// `None` if the name does not fit in 12 bytes.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let raw = name.as_bytes();
        if raw.len() > 12 {
            return None;
        }
        let mut bytes = [0u8; 12];
        bytes[..raw.len()].copy_from_slice(raw);
        Some(Self(bytes))
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 12] {
        &self.0
    }

    /// The name with trailing zero padding removed, if it is valid UTF-8.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        let end = self.0.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
        std::str::from_utf8(&self.0[..end]).ok()
    }
}

impl fmt::Debug for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Candidate({self})")
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) if !name.is_empty() && name.chars().all(|c| c.is_ascii_graphic()) => {
                f.write_str(name)
            }
            _ => write!(f, "0x{}", hex::encode(self.0)),
        }
    }
}

// =============================================================================
// BUCKET TYPE
// =============================================================================

/// Unique key of a bucket type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BucketTypeKey {
    pub amount: U256,
    /// Duration in blocks.
    pub duration: u64,
}

impl BucketTypeKey {
    #[must_use]
    pub fn new(amount: U256, duration: u64) -> Self {
        Self { amount, duration }
    }
}

/// A deduplicated (amount, duration) stake offering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketType {
    pub amount: U256,
    /// Duration in blocks.
    pub duration: u64,
    /// Activation time; `None` once deactivated.
    pub activated_at: Option<Timestamp>,
}

impl BucketType {
    #[must_use]
    pub fn new(amount: U256, duration: u64, activated_at: Option<Timestamp>) -> Self {
        Self {
            amount,
            duration,
            activated_at,
        }
    }

    #[must_use]
    pub fn key(&self) -> BucketTypeKey {
        BucketTypeKey::new(self.amount, self.duration)
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.activated_at.is_some()
    }
}

// =============================================================================
// BUCKET
// =============================================================================

/// A single stake position, keyed externally by its token id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    /// Id of the bucket type this bucket currently uses.
    pub type_index: u64,
    pub candidate: Candidate,
    /// Current NFT holder, once a `Transfer` has been seen.
    pub owner: Option<Address>,
    /// Block height of the `Staked` event.
    pub created_at: u64,
    /// `None` while locked (auto-staking).
    pub unlocked_at: Option<Timestamp>,
    /// Set once the bucket is fully unstaked.
    pub unstaked_at: Option<Timestamp>,
}

impl Bucket {
    /// A freshly staked, locked bucket.
    #[must_use]
    pub fn new(type_index: u64, candidate: Candidate, created_at: u64) -> Self {
        Self {
            type_index,
            candidate,
            owner: None,
            created_at,
            unlocked_at: None,
            unstaked_at: None,
        }
    }

    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.unlocked_at.is_none()
    }

    #[must_use]
    pub fn is_unstaked(&self) -> bool {
        self.unstaked_at.is_some()
    }
}

// =============================================================================
// VOTE BUCKET (assembled view)
// =============================================================================

/// A bucket joined with its type, in the shape vote counting consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteBucket {
    pub index: u64,
    pub staked_amount: U256,
    pub staked_duration: Duration,
    pub staked_duration_blocks: u64,
    pub create_block_height: u64,
    /// True while the bucket is locked.
    pub auto_stake: bool,
    pub unlocked_at: Option<Timestamp>,
    pub unstaked_at: Option<Timestamp>,
    pub candidate: Candidate,
    pub owner: Option<Address>,
    pub contract_address: Address,
}

impl VoteBucket {
    /// Assembles a vote bucket from a bucket and the type it references.
    #[must_use]
    pub fn assemble(
        index: u64,
        bucket: &Bucket,
        bucket_type: &BucketType,
        contract_address: Address,
        block_interval: Duration,
    ) -> Self {
        let blocks = u32::try_from(bucket_type.duration).unwrap_or(u32::MAX);
        Self {
            index,
            staked_amount: bucket_type.amount,
            staked_duration: block_interval.saturating_mul(blocks),
            staked_duration_blocks: bucket_type.duration,
            create_block_height: bucket.created_at,
            auto_stake: bucket.is_locked(),
            unlocked_at: bucket.unlocked_at,
            unstaked_at: bucket.unstaked_at,
            candidate: bucket.candidate,
            owner: bucket.owner,
            contract_address,
        }
    }
}
