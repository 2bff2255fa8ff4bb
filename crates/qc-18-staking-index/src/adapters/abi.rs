//! # Staking Contract ABI Decoder
//!
//! The contract's events are declared with `sol!`. A log's `topics[0]` picks
//! the generated event type, which decodes the indexed topics and the data
//! section; the result is then mapped onto [`ContractEvent`].
//!
//! Token ids and durations are narrowed to `u64` here. Amounts stay 256-bit.

use crate::domain::block::ReceiptLog;
use crate::domain::entities::{Address, Candidate, U256};
use crate::domain::errors::DecodeError;
use crate::domain::events::ContractEvent;
use crate::ports::outbound::EventDecoder;
use alloy_primitives::B256;
use alloy_sol_types::{sol, SolEvent, TopicList};

sol! {
    event BucketTypeActivated(uint256 amount, uint256 duration);
    event BucketTypeDeactivated(uint256 amount, uint256 duration);
    event Staked(uint256 indexed tokenId, bytes12 delegate, uint256 amount, uint256 duration);
    event Locked(uint256 indexed tokenId, uint256 duration);
    event Unlocked(uint256 indexed tokenId);
    event Unstaked(uint256 indexed tokenId);
    event Merged(uint256[] tokenIds, uint256 amount, uint256 duration);
    event DurationExtended(uint256 indexed tokenId, uint256 duration);
    event AmountIncreased(uint256 indexed tokenId, uint256 amount);
    event DelegateChanged(uint256 indexed tokenId, bytes12 newDelegate);
    event Withdrawal(uint256 indexed tokenId, address indexed recipient);
    event Transfer(address indexed from, address indexed to, uint256 indexed tokenId);
}

/// Built-in decoder for the staking contract ABI.
#[derive(Debug, Clone, Copy, Default)]
pub struct StakingAbiDecoder;

impl StakingAbiDecoder {
    pub fn new() -> Self {
        Self
    }
}

/// Event name without its parameter list, e.g. `Staked`.
fn event_name<E: SolEvent>() -> &'static str {
    E::SIGNATURE.split('(').next().unwrap_or(E::SIGNATURE)
}

fn invalid_data(event: &'static str, err: alloy_sol_types::Error) -> DecodeError {
    DecodeError::InvalidData {
        event,
        reason: err.to_string(),
    }
}

/// Decode a log whose `topics[0]` already matched `E::SIGNATURE_HASH`.
fn decode_log<E: SolEvent>(log: &ReceiptLog) -> Result<E, DecodeError> {
    let event = event_name::<E>();
    let expected = <E::TopicList as TopicList>::COUNT;
    if log.topics.len() != expected {
        return Err(DecodeError::TopicCountMismatch {
            event,
            expected,
            actual: log.topics.len(),
        });
    }

    let topics = E::decode_topics(log.topics.iter().map(|t| B256::from(*t)))
        .map_err(|e| invalid_data(event, e))?;
    let data = E::abi_decode_data(&log.data, true).map_err(|e| invalid_data(event, e))?;
    Ok(E::new(topics, data))
}

fn amount(value: alloy_primitives::U256) -> U256 {
    U256::from_big_endian(&value.to_be_bytes::<32>())
}

/// A uint256 field that must fit in `u64` (token ids, durations).
fn narrow(field: &'static str, value: alloy_primitives::U256) -> Result<u64, DecodeError> {
    u64::try_from(value).map_err(|_| DecodeError::InvalidField {
        field,
        reason: format!("{value} does not fit in u64"),
    })
}

fn address(value: alloy_primitives::Address) -> Address {
    Address::new(value.0 .0)
}

impl EventDecoder for StakingAbiDecoder {
    fn decode(&self, log: &ReceiptLog) -> Result<ContractEvent, DecodeError> {
        let Some(topic) = log.topics.first() else {
            return Ok(ContractEvent::Unrecognized { topic: None });
        };

        let event = match B256::from(*topic) {
            BucketTypeActivated::SIGNATURE_HASH => {
                let e = decode_log::<BucketTypeActivated>(log)?;
                ContractEvent::BucketTypeActivated {
                    amount: amount(e.amount),
                    duration: narrow("duration", e.duration)?,
                }
            }
            BucketTypeDeactivated::SIGNATURE_HASH => {
                let e = decode_log::<BucketTypeDeactivated>(log)?;
                ContractEvent::BucketTypeDeactivated {
                    amount: amount(e.amount),
                    duration: narrow("duration", e.duration)?,
                }
            }
            Staked::SIGNATURE_HASH => {
                let e = decode_log::<Staked>(log)?;
                ContractEvent::Staked {
                    token_id: narrow("tokenId", e.tokenId)?,
                    delegate: Candidate::new(e.delegate.0),
                    amount: amount(e.amount),
                    duration: narrow("duration", e.duration)?,
                }
            }
            Locked::SIGNATURE_HASH => {
                let e = decode_log::<Locked>(log)?;
                ContractEvent::Locked {
                    token_id: narrow("tokenId", e.tokenId)?,
                    duration: narrow("duration", e.duration)?,
                }
            }
            Unlocked::SIGNATURE_HASH => {
                let e = decode_log::<Unlocked>(log)?;
                ContractEvent::Unlocked {
                    token_id: narrow("tokenId", e.tokenId)?,
                }
            }
            Unstaked::SIGNATURE_HASH => {
                let e = decode_log::<Unstaked>(log)?;
                ContractEvent::Unstaked {
                    token_id: narrow("tokenId", e.tokenId)?,
                }
            }
            Merged::SIGNATURE_HASH => {
                let e = decode_log::<Merged>(log)?;
                if e.tokenIds.is_empty() {
                    return Err(DecodeError::InvalidField {
                        field: "tokenIds",
                        reason: "empty merge list".to_string(),
                    });
                }
                ContractEvent::Merged {
                    token_ids: e
                        .tokenIds
                        .into_iter()
                        .map(|id| narrow("tokenIds", id))
                        .collect::<Result<_, _>>()?,
                    amount: amount(e.amount),
                    duration: narrow("duration", e.duration)?,
                }
            }
            DurationExtended::SIGNATURE_HASH => {
                let e = decode_log::<DurationExtended>(log)?;
                ContractEvent::DurationExtended {
                    token_id: narrow("tokenId", e.tokenId)?,
                    duration: narrow("duration", e.duration)?,
                }
            }
            AmountIncreased::SIGNATURE_HASH => {
                let e = decode_log::<AmountIncreased>(log)?;
                ContractEvent::AmountIncreased {
                    token_id: narrow("tokenId", e.tokenId)?,
                    amount: amount(e.amount),
                }
            }
            DelegateChanged::SIGNATURE_HASH => {
                let e = decode_log::<DelegateChanged>(log)?;
                ContractEvent::DelegateChanged {
                    token_id: narrow("tokenId", e.tokenId)?,
                    new_delegate: Candidate::new(e.newDelegate.0),
                }
            }
            Withdrawal::SIGNATURE_HASH => {
                let e = decode_log::<Withdrawal>(log)?;
                ContractEvent::Withdrawal {
                    token_id: narrow("tokenId", e.tokenId)?,
                    recipient: address(e.recipient),
                }
            }
            Transfer::SIGNATURE_HASH => {
                let e = decode_log::<Transfer>(log)?;
                ContractEvent::Transfer {
                    from: address(e.from),
                    to: address(e.to),
                    token_id: narrow("tokenId", e.tokenId)?,
                }
            }
            _ => {
                return Ok(ContractEvent::Unrecognized {
                    topic: Some(*topic),
                });
            }
        };
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Hash;

    fn uint_word(v: u64) -> [u8; 32] {
        let mut w = [0u8; 32];
        w[24..].copy_from_slice(&v.to_be_bytes());
        w
    }

    fn log(topics: Vec<Hash>, data: Vec<u8>) -> ReceiptLog {
        ReceiptLog::new(Address::new([0x11; 20]), topics, data)
    }

    #[test]
    fn test_transfer_topic_matches_erc721() {
        assert_eq!(
            hex::encode(Transfer::SIGNATURE_HASH),
            "ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
        );
        assert_eq!(event_name::<Transfer>(), "Transfer");
    }

    #[test]
    fn test_decode_staked() {
        let mut delegate = [0u8; 32];
        delegate[..6].copy_from_slice(b"cand-A");
        let data = [delegate, uint_word(1000), uint_word(100)].concat();

        let event = StakingAbiDecoder::new()
            .decode(&log(vec![Staked::SIGNATURE_HASH.0, uint_word(7)], data))
            .unwrap();
        assert_eq!(
            event,
            ContractEvent::Staked {
                token_id: 7,
                delegate: Candidate::from_name("cand-A").unwrap(),
                amount: U256::from(1000u64),
                duration: 100,
            }
        );
    }

    #[test]
    fn test_decode_merged_array() {
        let data = [
            uint_word(96),
            uint_word(500),
            uint_word(10),
            uint_word(3),
            uint_word(4),
            uint_word(5),
            uint_word(6),
        ]
        .concat();
        let event = StakingAbiDecoder::new()
            .decode(&log(vec![Merged::SIGNATURE_HASH.0], data))
            .unwrap();
        assert_eq!(
            event,
            ContractEvent::Merged {
                token_ids: vec![4, 5, 6],
                amount: U256::from(500u64),
                duration: 10,
            }
        );
    }

    #[test]
    fn test_decode_withdrawal_topics() {
        let mut recipient = [0u8; 32];
        recipient[12..].copy_from_slice(&[9; 20]);
        let event = StakingAbiDecoder::new()
            .decode(&log(
                vec![Withdrawal::SIGNATURE_HASH.0, uint_word(3), recipient],
                vec![],
            ))
            .unwrap();
        assert_eq!(
            event,
            ContractEvent::Withdrawal {
                token_id: 3,
                recipient: Address::new([9; 20]),
            }
        );
    }

    #[test]
    fn test_unknown_and_anonymous_logs_are_unrecognized() {
        let decoder = StakingAbiDecoder::new();
        assert_eq!(
            decoder.decode(&log(vec![[0xEE; 32]], vec![])).unwrap(),
            ContractEvent::Unrecognized {
                topic: Some([0xEE; 32])
            }
        );
        assert_eq!(
            decoder.decode(&log(vec![], vec![1, 2, 3])).unwrap(),
            ContractEvent::Unrecognized { topic: None }
        );
    }

    #[test]
    fn test_malformed_logs_fail() {
        let decoder = StakingAbiDecoder::new();

        let short = decoder.decode(&log(
            vec![Locked::SIGNATURE_HASH.0, uint_word(1)],
            vec![0; 10],
        ));
        assert!(matches!(
            short,
            Err(DecodeError::InvalidData { event: "Locked", .. })
        ));

        let topics = decoder.decode(&log(vec![Unlocked::SIGNATURE_HASH.0], vec![]));
        assert_eq!(
            topics,
            Err(DecodeError::TopicCountMismatch {
                event: "Unlocked",
                expected: 2,
                actual: 1,
            })
        );

        let mut huge = [0xFFu8; 32];
        huge[0] = 0x01;
        let wide = decoder.decode(&log(vec![Unstaked::SIGNATURE_HASH.0, huge], vec![]));
        assert!(matches!(
            wide,
            Err(DecodeError::InvalidField { field: "tokenId", .. })
        ));
    }

    #[test]
    fn test_bytes12_padding_checked() {
        let decoder = StakingAbiDecoder::new();
        let mut delegate = [0u8; 32];
        delegate[..1].copy_from_slice(b"b");
        let topics = vec![DelegateChanged::SIGNATURE_HASH.0, uint_word(2)];

        let ok = decoder
            .decode(&log(topics.clone(), delegate.to_vec()))
            .unwrap();
        assert_eq!(
            ok,
            ContractEvent::DelegateChanged {
                token_id: 2,
                new_delegate: Candidate::from_name("b").unwrap(),
            }
        );

        delegate[31] = 1;
        assert!(matches!(
            decoder.decode(&log(topics, delegate.to_vec())),
            Err(DecodeError::InvalidData { .. })
        ));
    }

    #[test]
    fn test_empty_merge_rejected() {
        let data = [uint_word(96), uint_word(1), uint_word(1), uint_word(0)].concat();
        let err = StakingAbiDecoder::new()
            .decode(&log(vec![Merged::SIGNATURE_HASH.0], data))
            .unwrap_err();
        assert!(matches!(err, DecodeError::InvalidField { field: "tokenIds", .. }));
    }
}
