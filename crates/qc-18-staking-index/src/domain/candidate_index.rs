//! # Candidate Index
//!
//! Multimap from candidate to the ids of the live buckets delegated to it.
//!
//! The index is derived from the bucket map and must agree with it after
//! every mutation: each live bucket id appears in exactly one set (its
//! candidate's), and no set is ever left empty.

use super::entities::{Bucket, Candidate};
use super::errors::IndexInconsistency;
use std::collections::{BTreeMap, BTreeSet};

/// Candidate -> bucket ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateIndex {
    sets: BTreeMap<Candidate, BTreeSet<u64>>,
}

impl CandidateIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `id` is delegated to `candidate`.
    pub fn insert(&mut self, candidate: Candidate, id: u64) {
        self.sets.entry(candidate).or_default().insert(id);
    }

    /// Remove `id` from `candidate`'s set, dropping the set once empty.
    pub fn remove(&mut self, candidate: &Candidate, id: u64) -> bool {
        let Some(set) = self.sets.get_mut(candidate) else {
            return false;
        };
        let removed = set.remove(&id);
        if set.is_empty() {
            self.sets.remove(candidate);
        }
        removed
    }

    /// Move `id` from one candidate to another.
    pub fn reassign(&mut self, from: &Candidate, to: Candidate, id: u64) {
        if *from != to {
            self.remove(from, id);
        }
        self.insert(to, id);
    }

    /// Ids delegated to `candidate`, ascending.
    pub fn ids(&self, candidate: &Candidate) -> impl Iterator<Item = u64> + '_ {
        self.sets.get(candidate).into_iter().flatten().copied()
    }

    /// Number of candidates with at least one bucket.
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Check the index against the primary bucket map.
    pub fn check_against(
        &self,
        buckets: &BTreeMap<u64, Bucket>,
    ) -> Result<(), IndexInconsistency> {
        let mut indexed = 0usize;
        for (candidate, ids) in &self.sets {
            if ids.is_empty() {
                return Err(IndexInconsistency::EmptyCandidateSet);
            }
            for id in ids {
                match buckets.get(id) {
                    Some(bucket) if bucket.candidate == *candidate => indexed += 1,
                    _ => return Err(IndexInconsistency::StaleIndexEntry { token_id: *id }),
                }
            }
        }
        if indexed != buckets.len() {
            let missing = buckets
                .iter()
                .find(|(id, b)| !self.sets.get(&b.candidate).is_some_and(|s| s.contains(id)))
                .map_or(0, |(id, _)| *id);
            return Err(IndexInconsistency::MissingFromIndex { token_id: missing });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cand(name: &str) -> Candidate {
        Candidate::from_name(name).unwrap()
    }

    #[test]
    fn test_insert_and_remove_drops_empty_sets() {
        let mut index = CandidateIndex::new();
        index.insert(cand("a"), 1);
        index.insert(cand("a"), 2);
        assert_eq!(index.ids(&cand("a")).collect::<Vec<_>>(), vec![1, 2]);

        assert!(index.remove(&cand("a"), 1));
        assert!(index.remove(&cand("a"), 2));
        assert!(index.is_empty());
        assert!(!index.remove(&cand("a"), 2));
    }

    #[test]
    fn test_reassign_moves_id() {
        let mut index = CandidateIndex::new();
        index.insert(cand("a"), 7);
        index.reassign(&cand("a"), cand("b"), 7);

        assert_eq!(index.ids(&cand("a")).count(), 0);
        assert_eq!(index.ids(&cand("b")).collect::<Vec<_>>(), vec![7]);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_check_against_detects_drift() {
        let mut buckets = BTreeMap::new();
        buckets.insert(1, Bucket::new(0, cand("a"), 0));
        buckets.insert(2, Bucket::new(0, cand("b"), 0));

        let mut index = CandidateIndex::new();
        index.insert(cand("a"), 1);
        assert_eq!(
            index.check_against(&buckets),
            Err(IndexInconsistency::MissingFromIndex { token_id: 2 })
        );

        index.insert(cand("b"), 2);
        assert_eq!(index.check_against(&buckets), Ok(()));

        index.insert(cand("a"), 2);
        assert_eq!(
            index.check_against(&buckets),
            Err(IndexInconsistency::StaleIndexEntry { token_id: 2 })
        );
    }
}
