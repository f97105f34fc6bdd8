//! Checkpoint entity
//!
//! A checkpoint is the last block of an epoch, or, while the epoch is still
//! being built, the current tip of that epoch.
//!
//! State progression: Growing → Unjustified → Justified → Finalized

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use shared_types::{Hash, PublicKey};

use crate::config::CasperConfig;

/// Checkpoint finality status. Never regresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum CheckpointStatus {
    /// Epoch still being built; `hash` follows the epoch's tip.
    #[default]
    Growing,
    /// Complete epoch boundary without a supermajority link.
    Unjustified,
    /// Target of a supermajority link from a justified source.
    Justified,
    /// Justified with a justified direct child.
    Finalized,
}

/// Votes from one source checkpoint to the checkpoint holding this link.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupLink {
    pub source_height: u64,
    pub source_hash: Hash,
    pub signatures: BTreeMap<PublicKey, Vec<u8>>,
}

impl SupLink {
    pub fn new(source_height: u64, source_hash: Hash) -> Self {
        Self {
            source_height,
            source_hash,
            signatures: BTreeMap::new(),
        }
    }

    /// More than two thirds of `validators`' stake signed this link.
    pub fn is_majority(&self, validators: &[Validator]) -> bool {
        let total: u128 = validators.iter().map(|v| u128::from(v.vote_num)).sum();
        let signed: u128 = validators
            .iter()
            .filter(|v| self.signatures.contains_key(&v.pub_key))
            .map(|v| u128::from(v.vote_num))
            .sum();
        total > 0 && signed * 3 > total * 2
    }
}

/// A validator and its weight for one epoch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validator {
    pub pub_key: PublicKey,
    pub vote_num: u64,
    /// Position in the effective set, used for proposer rotation.
    pub order: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub height: u64,
    pub hash: Hash,
    /// Hash of the previous epoch's checkpoint.
    pub parent_hash: Hash,
    /// Timestamp (ms) of the block at `hash`.
    pub timestamp: u64,
    pub status: CheckpointStatus,
    /// Native stake per validator key as of `hash`.
    pub votes: BTreeMap<PublicKey, u64>,
    pub sup_links: Vec<SupLink>,
}

impl Checkpoint {
    /// The checkpoint of a genesis block, justified by definition.
    pub fn genesis(hash: Hash, timestamp: u64) -> Self {
        Self {
            height: 0,
            hash,
            parent_hash: [0u8; 32],
            timestamp,
            status: CheckpointStatus::Justified,
            votes: BTreeMap::new(),
            sup_links: Vec::new(),
        }
    }

    /// A fresh growing child carrying this checkpoint's stake.
    pub fn child(&self) -> Self {
        Self {
            height: self.height,
            hash: self.hash,
            parent_hash: self.hash,
            timestamp: self.timestamp,
            status: CheckpointStatus::Growing,
            votes: self.votes.clone(),
            sup_links: Vec::new(),
        }
    }

    pub fn is_justified(&self) -> bool {
        self.status >= CheckpointStatus::Justified
    }

    /// Raise the status. Lower statuses are ignored.
    pub fn promote(&mut self, status: CheckpointStatus) {
        if status > self.status {
            self.status = status;
        }
    }

    pub fn add_vote(&mut self, pub_key: PublicKey, amount: u64) {
        let stake = self.votes.entry(pub_key).or_insert(0);
        *stake = stake.saturating_add(amount);
    }

    pub fn remove_vote(&mut self, pub_key: &PublicKey, amount: u64) {
        if let Some(stake) = self.votes.get_mut(pub_key) {
            *stake = stake.saturating_sub(amount);
            if *stake == 0 {
                self.votes.remove(pub_key);
            }
        }
    }

    /// Record a signature on the link from `source`. Returns the link index.
    pub fn add_verification(
        &mut self,
        source_hash: Hash,
        source_height: u64,
        pub_key: PublicKey,
        signature: Vec<u8>,
    ) -> usize {
        let index = match self
            .sup_links
            .iter()
            .position(|link| link.source_hash == source_hash)
        {
            Some(index) => index,
            None => {
                self.sup_links.push(SupLink::new(source_height, source_hash));
                self.sup_links.len() - 1
            }
        };
        self.sup_links[index].signatures.insert(pub_key, signature);
        index
    }

    /// Whether `pub_key` signed any link into this checkpoint.
    pub fn contains_verification(&self, pub_key: &PublicKey) -> bool {
        self.sup_links
            .iter()
            .any(|link| link.signatures.contains_key(pub_key))
    }

    /// Top stakers at or above the minimum, or the federation when none
    /// qualify.
    pub fn effective_validators(&self, config: &CasperConfig) -> Vec<Validator> {
        let mut staked: Vec<(&PublicKey, &u64)> = self
            .votes
            .iter()
            .filter(|(_, stake)| **stake >= config.min_validator_vote)
            .collect();
        staked.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

        if staked.is_empty() {
            return config
                .federation
                .iter()
                .enumerate()
                .map(|(order, pub_key)| Validator {
                    pub_key: *pub_key,
                    vote_num: 1,
                    order,
                })
                .collect();
        }

        staked
            .into_iter()
            .take(config.max_validators)
            .enumerate()
            .map(|(order, (pub_key, stake))| Validator {
                pub_key: *pub_key,
                vote_num: *stake,
                order,
            })
            .collect()
    }
}
