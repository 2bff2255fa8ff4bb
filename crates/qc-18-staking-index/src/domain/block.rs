//! # Block Feed Types
//!
//! The slice of a block the staking index consumes: height, timestamp and
//! receipts with their logs, in execution order.

use super::entities::{Address, Hash, Timestamp};

/// Outcome of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptStatus {
    Success,
    Failure,
}

/// A log emitted by a contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptLog {
    /// Contract address that emitted the log.
    pub address: Address,
    /// Indexed topics; `topics[0]` is the event signature hash.
    pub topics: Vec<Hash>,
    /// ABI-encoded non-indexed data.
    pub data: Vec<u8>,
}

impl ReceiptLog {
    #[must_use]
    pub fn new(address: Address, topics: Vec<Hash>, data: Vec<u8>) -> Self {
        Self {
            address,
            topics,
            data,
        }
    }
}

/// A transaction receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub status: ReceiptStatus,
    pub logs: Vec<ReceiptLog>,
}

impl Receipt {
    #[must_use]
    pub fn success(logs: Vec<ReceiptLog>) -> Self {
        Self {
            status: ReceiptStatus::Success,
            logs,
        }
    }

    #[must_use]
    pub fn failure(logs: Vec<ReceiptLog>) -> Self {
        Self {
            status: ReceiptStatus::Failure,
            logs,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == ReceiptStatus::Success
    }
}

/// A block as delivered by the block feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedBlock {
    pub height: u64,
    pub timestamp: Timestamp,
    pub receipts: Vec<Receipt>,
}

impl IndexedBlock {
    #[must_use]
    pub fn new(height: u64, timestamp: Timestamp, receipts: Vec<Receipt>) -> Self {
        Self {
            height,
            timestamp,
            receipts,
        }
    }

    /// Logs of successful receipts emitted by `contract`, in block order.
    pub fn contract_logs<'a>(
        &'a self,
        contract: &'a Address,
    ) -> impl Iterator<Item = &'a ReceiptLog> + 'a {
        self.receipts
            .iter()
            .filter(|receipt| receipt.is_success())
            .flat_map(|receipt| receipt.logs.iter())
            .filter(move |log| log.address == *contract)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_logs_filters_status_and_address() {
        let contract = Address::new([0x11; 20]);
        let other = Address::new([0x22; 20]);
        let log = |addr: Address, tag: u8| ReceiptLog::new(addr, vec![[tag; 32]], vec![]);

        let block = IndexedBlock::new(
            1,
            1000,
            vec![
                Receipt::success(vec![log(contract, 1), log(other, 2)]),
                Receipt::failure(vec![log(contract, 3)]),
                Receipt::success(vec![log(contract, 4)]),
            ],
        );

        let tags: Vec<u8> = block
            .contract_logs(&contract)
            .map(|l| l.topics[0][0])
            .collect();
        assert_eq!(tags, vec![1, 4]);
    }
}
