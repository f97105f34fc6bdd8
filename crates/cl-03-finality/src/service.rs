//! # Casper Service
//!
//! Owns the checkpoint tree and applies blocks and votes to it.
//!
//! ```text
//! apply_block ──► node for prev hash ──► extend (hash, stake votes)
//!                   │                       │
//!                   ├─ boundary: new child  └─ epoch boundary? ──► Unjustified
//!                   ├─ growing tip: extend        ├─ drain cached votes
//!                   └─ otherwise: replay          └─ sign local vote
//!
//! auth_verification ──► checks ──► slashing ──► sup-link ──► justify/finalize
//!                                                              └─ RollbackMsg
//! ```
//!
//! Readers (`last_finalized`, `last_justified`, validator lookups) take the
//! read side of the state lock and never wait on the chain worker.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

use cl_01_entry_graph::{program::is_unspendable, Block};
use lru::LruCache;
use parking_lot::{Mutex, RwLock};
use shared_bus::{EventPublisher, LedgerEvent};
use shared_crypto::Ed25519KeyPair;
use shared_types::{hash_hex, Hash, PublicKey, TxInput};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::CasperConfig;
use crate::domain::slashing::{find_same_height_vote, find_span_vote};
use crate::domain::{
    Checkpoint, CheckpointStatus, CheckpointTree, NodeId, Validator, Verification,
};
use crate::error::{FinalityError, FinalityResult};
use crate::ports::CheckpointStore;

/// Asks the chain to switch its best block to `best_hash`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollbackMsg {
    pub best_hash: Hash,
}

/// Result of applying a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyBlockReply {
    /// Tip of the preferred chain after the block.
    pub best_hash: Hash,
    /// The local validator's vote, to be broadcast.
    pub verification: Option<Verification>,
}

type VerificationKey = (Hash, PublicKey);

struct CasperState {
    tree: CheckpointTree,
    /// Votes whose target has not been seen yet.
    verification_cache: LruCache<VerificationKey, Verification>,
    evil_validators: HashMap<PublicKey, Vec<Verification>>,
}

pub struct Casper<S: CheckpointStore> {
    config: CasperConfig,
    store: Arc<S>,
    state: RwLock<CasperState>,
    /// previous block hash -> governing checkpoint hash
    prev_checkpoint_cache: Mutex<LruCache<Hash, Hash>>,
    rollback_tx: mpsc::UnboundedSender<RollbackMsg>,
    signer: Option<Ed25519KeyPair>,
    events: Option<Arc<dyn EventPublisher>>,
}

impl<S: CheckpointStore> Casper<S> {
    /// Build the gadget from persisted checkpoints.
    ///
    /// The first checkpoint must be genesis or finalized; the rest must be
    /// its successors. Anything else is a startup misconfiguration.
    pub fn new(
        config: CasperConfig,
        store: Arc<S>,
        mut checkpoints: Vec<Checkpoint>,
        rollback_tx: mpsc::UnboundedSender<RollbackMsg>,
        signer: Option<Ed25519KeyPair>,
    ) -> FinalityResult<Self> {
        if checkpoints.is_empty() {
            return Err(FinalityError::NoCheckpoints);
        }
        let root = checkpoints.remove(0);
        if root.height != 0 && root.status != CheckpointStatus::Finalized {
            return Err(FinalityError::InvalidInitialCheckpoint {
                height: root.height,
                status: root.status,
            });
        }

        let (tree, orphaned) = CheckpointTree::from_checkpoints(root, checkpoints);
        for checkpoint in orphaned {
            warn!(
                height = checkpoint.height,
                hash = %hash_hex(&checkpoint.hash),
                "Dropping checkpoint with unknown parent"
            );
        }

        let cache_size = NonZeroUsize::new(config.cache_size).unwrap_or(NonZeroUsize::MIN);
        info!(
            root_height = tree.root().height,
            checkpoints = tree.iter().count(),
            validator = signer.is_some(),
            "Casper initialised"
        );
        Ok(Self {
            config,
            store,
            state: RwLock::new(CasperState {
                tree,
                verification_cache: LruCache::new(cache_size),
                evil_validators: HashMap::new(),
            }),
            prev_checkpoint_cache: Mutex::new(LruCache::new(cache_size)),
            rollback_tx,
            signer,
            events: None,
        })
    }

    /// Publish finalization events on `events`.
    pub fn with_event_publisher(mut self, events: Arc<dyn EventPublisher>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn config(&self) -> &CasperConfig {
        &self.config
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    pub fn last_finalized(&self) -> (u64, Hash) {
        let state = self.state.read();
        let root = state.tree.root();
        (root.height, root.hash)
    }

    pub fn last_justified(&self) -> (u64, Hash) {
        let state = self.state.read();
        let cp = state.tree.last_justified();
        (cp.height, cp.hash)
    }

    /// Tip of the preferred chain.
    pub fn best_chain(&self) -> Hash {
        best_hash(&self.state.read().tree)
    }

    /// Status of the checkpoint currently keyed by `hash`, if it is live.
    pub fn checkpoint_status(&self, hash: &Hash) -> Option<CheckpointStatus> {
        self.state
            .read()
            .tree
            .checkpoint_by_hash(hash)
            .map(|c| c.status)
    }

    /// Conflicting vote pairs seen per validator.
    pub fn evil_validators(&self) -> HashMap<PublicKey, Vec<Verification>> {
        self.state.read().evil_validators.clone()
    }

    pub fn effective_validators(&self, checkpoint: &Checkpoint) -> Vec<Validator> {
        checkpoint.effective_validators(&self.config)
    }

    /// Validators that must sign blocks after `block_hash`'s parent.
    pub fn validators(&self, block_hash: &Hash) -> FinalityResult<Vec<Validator>> {
        Ok(self
            .parent_checkpoint(block_hash)?
            .effective_validators(&self.config))
    }

    /// Checkpoint governing the epoch that contains `block_hash`.
    pub fn parent_checkpoint(&self, block_hash: &Hash) -> FinalityResult<Checkpoint> {
        let header = self.store.get_block_header(block_hash)?;
        self.parent_checkpoint_by_prev_hash(&header.previous_block_hash)
    }

    /// Checkpoint governing a block whose parent is `prev_hash`: the nearest
    /// epoch boundary at or below `prev_hash`.
    pub fn parent_checkpoint_by_prev_hash(&self, prev_hash: &Hash) -> FinalityResult<Checkpoint> {
        let hash = self.parent_checkpoint_hash_by_prev_hash(prev_hash)?;
        let live = self.state.read().tree.checkpoint_by_hash(&hash).cloned();
        match live {
            Some(cp) => Ok(cp),
            None => Ok(self.store.get_checkpoint(&hash)?),
        }
    }

    fn parent_checkpoint_hash_by_prev_hash(&self, prev_hash: &Hash) -> FinalityResult<Hash> {
        if let Some(hash) = self.prev_checkpoint_cache.lock().get(prev_hash) {
            return Ok(*hash);
        }

        let mut cursor = *prev_hash;
        loop {
            let header = self.store.get_block_header(&cursor)?;
            if self.config.is_boundary(header.height) {
                self.prev_checkpoint_cache.lock().put(*prev_hash, cursor);
                return Ok(cursor);
            }
            let cached = self.prev_checkpoint_cache.lock().get(&cursor).copied();
            if let Some(hash) = cached {
                self.prev_checkpoint_cache.lock().put(*prev_hash, hash);
                return Ok(hash);
            }
            cursor = header.previous_block_hash;
        }
    }

    // =========================================================================
    // BLOCKS
    // =========================================================================

    /// Apply a block to the checkpoint tree.
    pub fn apply_block(&self, block: &Block) -> FinalityResult<ApplyBlockReply> {
        let mut state = self.state.write();
        let hash = block.hash();
        if state.tree.contains_block(&hash) {
            return Ok(ApplyBlockReply {
                best_hash: best_hash(&state.tree),
                verification: None,
            });
        }

        let id = self.node_for_block(&mut state.tree, block)?;
        self.extend(&mut state.tree, id, block);

        let mut verification = None;
        if self.config.is_boundary(block.height()) {
            let checkpoint = match state.tree.checkpoint_mut(id) {
                Some(cp) => {
                    cp.promote(CheckpointStatus::Unjustified);
                    cp.clone()
                }
                None => return Err(FinalityError::CheckpointNotFound(hash_hex(&hash))),
            };
            self.store.save_checkpoints(std::slice::from_ref(&checkpoint))?;
            info!(
                height = checkpoint.height,
                hash = %hash_hex(&checkpoint.hash),
                stakers = checkpoint.votes.len(),
                "Epoch checkpoint reached"
            );

            self.drain_cached_verifications(&mut state, &hash);
            verification = self.my_verification(&mut state, id)?;
        }

        Ok(ApplyBlockReply {
            best_hash: best_hash(&state.tree),
            verification,
        })
    }

    /// Node whose tip is `block`'s parent, creating or replaying one if
    /// needed.
    fn node_for_block(&self, tree: &mut CheckpointTree, block: &Block) -> FinalityResult<NodeId> {
        let prev = block.previous_hash();
        if let Some(id) = tree.node_by_hash(&prev) {
            if let Some(cp) = tree.checkpoint(id) {
                if cp.status == CheckpointStatus::Growing {
                    return Ok(id);
                }
                let child = cp.child();
                return Ok(tree.add_child(id, child));
            }
        }
        self.replay(tree, prev)
    }

    /// Rebuild the growing node for a fork (or a restart) by replaying the
    /// blocks between the nearest checkpoint and `prev`.
    fn replay(&self, tree: &mut CheckpointTree, prev: Hash) -> FinalityResult<NodeId> {
        let mut blocks = Vec::new();
        let mut cursor = prev;
        loop {
            if let Some(id) = tree.node_by_hash(&cursor) {
                if let Some(cp) = tree
                    .checkpoint(id)
                    .filter(|cp| cp.status >= CheckpointStatus::Unjustified)
                {
                    let child = cp.child();
                    let child = tree.add_child(id, child);
                    debug!(
                        from_height = tree.checkpoint(id).map(|c| c.height),
                        blocks = blocks.len(),
                        "Replaying blocks into checkpoint tree"
                    );
                    for block in blocks.iter().rev() {
                        self.extend(tree, child, block);
                    }
                    return Ok(child);
                }
            }

            let block = self.store.get_block(&cursor)?;
            if self.config.is_boundary(block.height()) || block.height() <= tree.root().height {
                return Err(FinalityError::CheckpointNotFound(hash_hex(&cursor)));
            }
            cursor = block.previous_hash();
            blocks.push(block);
        }
    }

    fn extend(&self, tree: &mut CheckpointTree, id: NodeId, block: &Block) {
        tree.advance(id, block.hash(), block.height(), block.header.timestamp);
        if let Some(cp) = tree.checkpoint_mut(id) {
            apply_stake_votes(cp, block);
        }
    }

    fn drain_cached_verifications(&self, state: &mut CasperState, target_hash: &Hash) {
        let keys: Vec<VerificationKey> = state
            .verification_cache
            .iter()
            .filter(|(key, _)| key.0 == *target_hash)
            .map(|(key, _)| *key)
            .collect();

        for key in keys {
            let Some(v) = state.verification_cache.pop(&key) else {
                continue;
            };
            if let Err(err) = self.process_verification(state, &v) {
                warn!(
                    target = %hash_hex(target_hash),
                    pub_key = %hash_hex(&v.pub_key),
                    error = %err,
                    "Dropping cached verification"
                );
            }
        }
    }

    /// Sign a vote for the checkpoint at `id` if the local key is one of its
    /// validators and voting would not be slashable.
    fn my_verification(
        &self,
        state: &mut CasperState,
        id: NodeId,
    ) -> FinalityResult<Option<Verification>> {
        let Some(signer) = &self.signer else {
            return Ok(None);
        };
        let pub_key = signer.public_key().to_bytes();
        let Some(target) = state.tree.checkpoint(id).cloned() else {
            return Ok(None);
        };

        let validators = self.validators_of_node(&state.tree, id)?;
        if !validators.iter().any(|v| v.pub_key == pub_key) || target.contains_verification(&pub_key)
        {
            return Ok(None);
        }
        let Some(source) = state
            .tree
            .last_justified_on_branch(id)
            .and_then(|sid| state.tree.checkpoint(sid))
        else {
            return Ok(None);
        };

        let mut v = Verification::new(
            (source.height, source.hash),
            (target.height, target.hash),
            pub_key,
        );
        v.sign(signer);
        if find_same_height_vote(&state.tree, &v).is_some()
            || find_span_vote(&state.tree, &v).is_some()
        {
            warn!(height = target.height, "Refusing to sign a slashable vote");
            return Ok(None);
        }

        self.add_verification(state, id, &v, &validators)?;
        debug!(
            source_height = v.source_height,
            target_height = v.target_height,
            "Signed local verification"
        );
        Ok(Some(v))
    }

    // =========================================================================
    // VOTES
    // =========================================================================

    /// Validate and record a vote from the network.
    ///
    /// A vote whose target is unknown is cached until the target block is
    /// applied. If the vote changes the preferred chain a [`RollbackMsg`]
    /// is sent.
    pub fn auth_verification(&self, v: &Verification) -> FinalityResult<()> {
        let mut state = self.state.write();
        let old_best = best_hash(&state.tree);
        let result = self.process_verification(&mut state, v);
        let new_best = best_hash(&state.tree);
        drop(state);

        if old_best != new_best {
            info!(best_hash = %hash_hex(&new_best), "Casper best chain changed");
            if self
                .rollback_tx
                .send(RollbackMsg {
                    best_hash: new_best,
                })
                .is_err()
            {
                warn!("Rollback receiver dropped");
            }
        }
        result
    }

    fn process_verification(&self, state: &mut CasperState, v: &Verification) -> FinalityResult<()> {
        if !self.config.is_boundary(v.source_height) || !self.config.is_boundary(v.target_height) {
            return Err(FinalityError::VoteToGrowingCheckpoint);
        }
        if v.source_height >= v.target_height {
            return Err(FinalityError::VoteToSameCheckpoint {
                source_height: v.source_height,
                target_height: v.target_height,
            });
        }
        if v.target_height < state.tree.root().height {
            debug!(target_height = v.target_height, "Ignoring vote below finalized root");
            return Ok(());
        }

        let Some(target_id) = state.tree.node_by_hash(&v.target_hash) else {
            debug!(target = %hash_hex(&v.target_hash), "Caching vote for unknown target");
            state
                .verification_cache
                .put((v.target_hash, v.pub_key), v.clone());
            return Ok(());
        };

        let validators = self.validators_of_node(&state.tree, target_id)?;
        if !validators.iter().any(|val| val.pub_key == v.pub_key) {
            return Err(FinalityError::NotValidator(hash_hex(&v.pub_key)));
        }
        if state
            .tree
            .checkpoint(target_id)
            .is_some_and(|cp| cp.status == CheckpointStatus::Growing)
        {
            return Err(FinalityError::VoteToGrowingCheckpoint);
        }
        v.verify_signature()?;

        if let Some(earlier) = find_same_height_vote(&state.tree, v) {
            state
                .evil_validators
                .insert(v.pub_key, vec![v.clone(), earlier]);
            return Err(FinalityError::SameHeightInVerification(hash_hex(&v.pub_key)));
        }
        if let Some(earlier) = find_span_vote(&state.tree, v) {
            state
                .evil_validators
                .insert(v.pub_key, vec![v.clone(), earlier]);
            return Err(FinalityError::SpanHeightInVerification(hash_hex(&v.pub_key)));
        }

        self.add_verification(state, target_id, v, &validators)
    }

    fn add_verification(
        &self,
        state: &mut CasperState,
        target_id: NodeId,
        v: &Verification,
        validators: &[Validator],
    ) -> FinalityResult<()> {
        let source_status = self.status_of(&state.tree, &v.source_hash)?;
        let Some(target) = state.tree.checkpoint_mut(target_id) else {
            return Err(FinalityError::CheckpointNotFound(hash_hex(&v.target_hash)));
        };
        let link = target.add_verification(v.source_hash, v.source_height, v.pub_key, v.signature.clone());
        let justify = target.status == CheckpointStatus::Unjustified
            && source_status == CheckpointStatus::Justified
            && target.sup_links[link].is_majority(validators);

        let mut affected = vec![target_id];
        if justify {
            affected.extend(self.set_justified(&mut state.tree, target_id, v.source_hash));
        }
        affected.extend(self.reevaluate_sup_links(&mut state.tree)?);

        let checkpoints: Vec<Checkpoint> = dedup(affected)
            .into_iter()
            .filter_map(|id| state.tree.checkpoint(id).cloned())
            .collect();
        self.store.save_checkpoints(&checkpoints)?;
        Ok(())
    }

    /// Justify `target_id`; finalize and re-root at the source when it is
    /// the target's direct parent. Returns the nodes that changed.
    fn set_justified(&self, tree: &mut CheckpointTree, target_id: NodeId, source_hash: Hash) -> Vec<NodeId> {
        let mut changed = Vec::new();
        let Some(target) = tree.checkpoint_mut(target_id) else {
            return changed;
        };
        target.promote(CheckpointStatus::Justified);
        let (height, hash, parent_hash) = (target.height, target.hash, target.parent_hash);
        info!(height, hash = %hash_hex(&hash), "Checkpoint justified");
        changed.push(target_id);

        if parent_hash != source_hash {
            return changed;
        }
        let Some(source_id) = tree.node_by_hash(&source_hash) else {
            return changed;
        };
        if let Some(source) = tree.checkpoint_mut(source_id) {
            source.promote(CheckpointStatus::Finalized);
            let (height, hash) = (source.height, source.hash);
            info!(height, hash = %hash_hex(&hash), "Checkpoint finalized");
            if let Some(events) = &self.events {
                events.publish(LedgerEvent::CheckpointFinalized { height, hash });
            }
        }
        tree.prune_to(source_id);
        changed.push(source_id);
        changed
    }

    /// Justify unjustified checkpoints whose links became sufficient after
    /// their source was justified.
    fn reevaluate_sup_links(&self, tree: &mut CheckpointTree) -> FinalityResult<Vec<NodeId>> {
        let mut changed = Vec::new();
        loop {
            let mut next = None;
            for (id, cp) in tree.iter() {
                if cp.status != CheckpointStatus::Unjustified {
                    continue;
                }
                let validators = self.validators_of_node(tree, id)?;
                let link = cp.sup_links.iter().find(|link| {
                    tree.checkpoint_by_hash(&link.source_hash)
                        .is_some_and(|s| s.status == CheckpointStatus::Justified)
                        && link.is_majority(&validators)
                });
                if let Some(link) = link {
                    next = Some((id, link.source_hash));
                    break;
                }
            }
            match next {
                Some((id, source_hash)) => changed.extend(self.set_justified(tree, id, source_hash)),
                None => return Ok(changed),
            }
        }
    }

    /// Effective validators of the checkpoint preceding node `id`.
    fn validators_of_node(&self, tree: &CheckpointTree, id: NodeId) -> FinalityResult<Vec<Validator>> {
        let parent = tree.parent(id).and_then(|pid| tree.checkpoint(pid)).cloned();
        let parent = match parent {
            Some(cp) => cp,
            None => match tree.checkpoint(id) {
                Some(cp) if cp.height == 0 => cp.clone(),
                Some(cp) => self.store.get_checkpoint(&cp.parent_hash)?,
                None => return Ok(Vec::new()),
            },
        };
        Ok(parent.effective_validators(&self.config))
    }

    fn status_of(&self, tree: &CheckpointTree, hash: &Hash) -> FinalityResult<CheckpointStatus> {
        if let Some(cp) = tree.checkpoint_by_hash(hash) {
            return Ok(cp.status);
        }
        match self.store.get_checkpoint(hash) {
            Ok(cp) => Ok(cp.status),
            Err(err) if err.is_not_found() => {
                Err(FinalityError::CheckpointNotFound(hash_hex(hash)))
            }
            Err(err) => Err(err.into()),
        }
    }
}

fn best_hash(tree: &CheckpointTree) -> Hash {
    let id = tree.best_node();
    tree.checkpoint(id)
        .map(|cp| cp.hash)
        .unwrap_or_else(|| tree.root().hash)
}

/// Native stake moves: vote outputs add stake, spending a vote removes it.
fn apply_stake_votes(checkpoint: &mut Checkpoint, block: &Block) {
    for tx in &block.transactions {
        for input in &tx.data().inputs {
            if let TxInput::Spend(spend) = input {
                if let (Some(key), true) = (spend.vote, spend.asset_amount.is_native()) {
                    checkpoint.remove_vote(&key, spend.asset_amount.amount);
                }
            }
        }
        for output in &tx.data().outputs {
            if let (Some(key), true) = (output.vote, output.asset_amount.is_native()) {
                if !is_unspendable(&output.control_program) {
                    checkpoint.add_vote(key, output.asset_amount.amount);
                }
            }
        }
    }
}

fn dedup(mut ids: Vec<NodeId>) -> Vec<NodeId> {
    ids.sort_unstable();
    ids.dedup();
    ids
}
