//! # Record Codec
//!
//! Byte encoding of persisted bucket types, buckets and checkpoint values.
//!
//! Every record is a one-byte version tag followed by a bincode body. Inside
//! the body, an absent timestamp is stored as `u64::MAX` (the contract's
//! "max block number" sentinel) and amounts as 32 big-endian bytes.

use super::entities::{Address, Bucket, BucketType, Candidate, Timestamp, U256};
use super::errors::SerializationError;
use serde::{Deserialize, Serialize};

/// Version tag of the current record layout.
pub const RECORD_VERSION_V1: u8 = 1;

/// Sentinel for "no timestamp" in persisted records.
pub const MAX_BLOCK_NUMBER: u64 = u64::MAX;

#[derive(Serialize, Deserialize)]
struct BucketTypeRecordV1 {
    amount: [u8; 32],
    duration: u64,
    activated_at: u64,
}

#[derive(Serialize, Deserialize)]
struct BucketRecordV1 {
    type_index: u64,
    candidate: [u8; 12],
    owner: Option<[u8; 20]>,
    created_at: u64,
    unlocked_at: u64,
    unstaked_at: u64,
}

fn to_sentinel(ts: Option<Timestamp>) -> u64 {
    ts.unwrap_or(MAX_BLOCK_NUMBER)
}

fn from_sentinel(raw: u64) -> Option<Timestamp> {
    (raw != MAX_BLOCK_NUMBER).then_some(raw)
}

fn versioned<T: Serialize>(body: &T) -> Result<Vec<u8>, SerializationError> {
    let mut out = vec![RECORD_VERSION_V1];
    bincode::serialize_into(&mut out, body).map_err(|e| SerializationError::new(e.to_string()))?;
    Ok(out)
}

fn unversioned<'a, T: Deserialize<'a>>(
    data: &'a [u8],
    what: &str,
) -> Result<T, SerializationError> {
    match data.split_first() {
        Some((&RECORD_VERSION_V1, body)) => bincode::deserialize(body)
            .map_err(|e| SerializationError::new(format!("{what}: {e}"))),
        Some((version, _)) => Err(SerializationError::new(format!(
            "{what}: unsupported record version {version}"
        ))),
        None => Err(SerializationError::new(format!("{what}: empty record"))),
    }
}

/// Encode a bucket type record.
pub fn encode_bucket_type(bucket_type: &BucketType) -> Result<Vec<u8>, SerializationError> {
    let mut amount = [0u8; 32];
    bucket_type.amount.to_big_endian(&mut amount);
    versioned(&BucketTypeRecordV1 {
        amount,
        duration: bucket_type.duration,
        activated_at: to_sentinel(bucket_type.activated_at),
    })
}

/// Decode a bucket type record.
pub fn decode_bucket_type(data: &[u8]) -> Result<BucketType, SerializationError> {
    let record: BucketTypeRecordV1 = unversioned(data, "bucket type")?;
    Ok(BucketType {
        amount: U256::from_big_endian(&record.amount),
        duration: record.duration,
        activated_at: from_sentinel(record.activated_at),
    })
}

/// Encode a bucket record.
pub fn encode_bucket(bucket: &Bucket) -> Result<Vec<u8>, SerializationError> {
    versioned(&BucketRecordV1 {
        type_index: bucket.type_index,
        candidate: bucket.candidate.0,
        owner: bucket.owner.map(|a| a.0),
        created_at: bucket.created_at,
        unlocked_at: to_sentinel(bucket.unlocked_at),
        unstaked_at: to_sentinel(bucket.unstaked_at),
    })
}

/// Decode a bucket record.
pub fn decode_bucket(data: &[u8]) -> Result<Bucket, SerializationError> {
    let record: BucketRecordV1 = unversioned(data, "bucket")?;
    Ok(Bucket {
        type_index: record.type_index,
        candidate: Candidate(record.candidate),
        owner: record.owner.map(Address),
        created_at: record.created_at,
        unlocked_at: from_sentinel(record.unlocked_at),
        unstaked_at: from_sentinel(record.unstaked_at),
    })
}

/// Encode a checkpoint counter.
pub fn encode_u64(value: u64) -> Vec<u8> {
    value.to_be_bytes().to_vec()
}

/// Decode a checkpoint counter or an id key.
pub fn decode_u64(data: &[u8]) -> Result<u64, SerializationError> {
    <[u8; 8]>::try_from(data)
        .map(u64::from_be_bytes)
        .map_err(|_| SerializationError::new(format!("expected 8 bytes, got {}", data.len())))
}

/// Decode a persisted contract address.
pub fn decode_address(data: &[u8]) -> Result<Address, SerializationError> {
    Address::from_slice(data)
        .ok_or_else(|| SerializationError::new(format!("expected 20 bytes, got {}", data.len())))
}
