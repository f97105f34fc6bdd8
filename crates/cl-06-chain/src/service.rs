//! # Chain Service
//!
//! Block processing is serialized through one worker task. The [`Chain`]
//! handle enqueues a request and awaits the reply; queries read the store
//! and the best header directly.
//!
//! ```text
//! Chain::process_block ──mpsc──► worker ──► process_block
//!                                  ▲          ├─ known        ──► is orphan?
//! Casper RollbackMsg ──────────────┤          ├─ no parent    ──► orphan pool
//! orphan expiry tick ──────────────┘          └─ save ─► save_sub_block
//!                                                        ├─ extends best ──► connect_block
//!                                                        └─ otherwise ─────► apply_fork_chain_to_casper
//!                                                                              └─ rollback ──► reorganize_chain
//! ```
//!
//! A block or reorg is committed by a single `save_chain_status` call, so a
//! failure before it leaves the previous best state untouched.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use cl_01_entry_graph::{Block, Tx};
use cl_02_state_viewpoints::{ContractViewpoint, UtxoViewpoint};
use cl_03_finality::{Casper, CasperConfig, RollbackMsg, Validator, Verification};
use cl_05_mempool::{TxDesc, TxPool};
use parking_lot::{Mutex, RwLock};
use shared_bus::{EventPublisher, LedgerEvent};
use shared_crypto::{verify_signature, Ed25519KeyPair};
use shared_types::{hash_hex, BlockHeader, Hash};
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::ChainConfig;
use crate::domain::{proposer_order, OrphanManage};
use crate::error::{ChainError, ChainResult};
use crate::ports::{BlockValidator, ChainQueries, ChainStore};

const ORPHAN_EXPIRY_INTERVAL: Duration = Duration::from_secs(60);

enum ChainRequest {
    ProcessBlock {
        block: Block,
        reply: oneshot::Sender<ChainResult<bool>>,
    },
}

/// Handle to a running chain. Cloning shares the worker.
pub struct Chain<S: ChainStore, V: BlockValidator> {
    core: Arc<ChainCore<S, V>>,
    requests: mpsc::Sender<ChainRequest>,
}

impl<S: ChainStore, V: BlockValidator> Clone for Chain<S, V> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
            requests: self.requests.clone(),
        }
    }
}

impl<S, V> Chain<S, V>
where
    S: ChainStore + 'static,
    V: BlockValidator + 'static,
{
    /// Load the best block and checkpoints from `store`, build the finality
    /// gadget and spawn the worker. Must be called inside a Tokio runtime.
    ///
    /// ## Errors
    ///
    /// - `NotInitialized`: the store has no chain status
    /// - `Finality`: the persisted checkpoints cannot seed Casper
    pub fn start(
        config: ChainConfig,
        casper_config: CasperConfig,
        store: Arc<S>,
        tx_pool: Arc<TxPool>,
        validator: V,
        signer: Option<Ed25519KeyPair>,
        events: Arc<dyn EventPublisher>,
    ) -> ChainResult<Self> {
        let status = store
            .get_chain_status()?
            .ok_or(ChainError::NotInitialized)?;
        let best = store.get_block_header(&status.hash)?;
        let checkpoints = store.load_checkpoints()?;

        let (rollback_tx, rollback_rx) = mpsc::unbounded_channel();
        let casper = Casper::new(
            casper_config,
            Arc::clone(&store),
            checkpoints,
            rollback_tx,
            signer,
        )?
        .with_event_publisher(Arc::clone(&events));

        let core = Arc::new(ChainCore {
            orphans: Mutex::new(OrphanManage::new(
                config.max_orphan_blocks,
                config.orphan_ttl,
            )),
            store,
            casper: Arc::new(casper),
            tx_pool,
            validator,
            events,
            best: RwLock::new(best),
            config,
        });

        let (requests, request_rx) = mpsc::channel(core.config.request_queue_capacity.max(1));
        let worker = ChainWorker {
            core: Arc::clone(&core),
            requests: request_rx,
            rollbacks: rollback_rx,
        };
        tokio::spawn(worker.run());

        info!(
            height = status.height,
            hash = %hash_hex(&status.hash),
            "Chain started"
        );
        Ok(Self { core, requests })
    }

    /// Submit a block. Returns whether it was buffered as an orphan.
    pub async fn process_block(&self, block: Block) -> ChainResult<bool> {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(ChainRequest::ProcessBlock { block, reply })
            .await
            .map_err(|_| ChainError::WorkerStopped)?;
        response.await.map_err(|_| ChainError::WorkerStopped)?
    }
}

impl<S: ChainStore, V: BlockValidator> Chain<S, V> {
    /// Validate a loose transaction and admit it to the pool.
    pub fn validate_tx(&self, tx: Tx) -> ChainResult<Arc<TxDesc>> {
        self.core.validate_tx(tx)
    }

    /// Proposer expected for a block after `prev_hash` at `timestamp`.
    pub fn get_validator(&self, prev_hash: &Hash, timestamp: u64) -> ChainResult<Validator> {
        self.core.get_validator(prev_hash, timestamp)
    }

    /// Hand a peer's finality vote to Casper.
    pub fn auth_verification(&self, verification: &Verification) -> ChainResult<()> {
        Ok(self.core.casper.auth_verification(verification)?)
    }

    pub fn casper(&self) -> &Arc<Casper<S>> {
        &self.core.casper
    }

    pub fn tx_pool(&self) -> &Arc<TxPool> {
        &self.core.tx_pool
    }

    pub fn orphan_count(&self) -> usize {
        self.core.orphans.lock().len()
    }
}

impl<S: ChainStore, V: BlockValidator> ChainQueries for Chain<S, V> {
    fn block_exist(&self, hash: &Hash) -> bool {
        self.core.block_exist(hash)
    }

    fn get_block_by_hash(&self, hash: &Hash) -> ChainResult<Block> {
        Ok(self.core.store.get_block(hash)?)
    }

    fn get_block_by_height(&self, height: u64) -> ChainResult<Block> {
        let hash = self.core.store.get_main_chain_hash(height)?;
        Ok(self.core.store.get_block(&hash)?)
    }

    fn get_header_by_hash(&self, hash: &Hash) -> ChainResult<BlockHeader> {
        Ok(self.core.store.get_block_header(hash)?)
    }

    fn get_header_by_height(&self, height: u64) -> ChainResult<BlockHeader> {
        let hash = self.core.store.get_main_chain_hash(height)?;
        Ok(self.core.store.get_block_header(&hash)?)
    }

    fn best_block_header(&self) -> BlockHeader {
        self.core.best.read().clone()
    }

    fn best_block_height(&self) -> u64 {
        self.core.best.read().height
    }

    fn best_block_hash(&self) -> Hash {
        self.core.best.read().hash()
    }

    fn in_main_chain(&self, hash: &Hash) -> bool {
        let Ok(header) = self.core.store.get_block_header(hash) else {
            return false;
        };
        self.core
            .store
            .get_main_chain_hash(header.height)
            .is_ok_and(|main| main == *hash)
    }
}

// =============================================================================
// WORKER
// =============================================================================

struct ChainWorker<S: ChainStore, V: BlockValidator> {
    core: Arc<ChainCore<S, V>>,
    requests: mpsc::Receiver<ChainRequest>,
    rollbacks: mpsc::UnboundedReceiver<RollbackMsg>,
}

impl<S: ChainStore, V: BlockValidator> ChainWorker<S, V> {
    async fn run(mut self) {
        let mut expiry = tokio::time::interval(ORPHAN_EXPIRY_INTERVAL);
        expiry.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                request = self.requests.recv() => {
                    let Some(ChainRequest::ProcessBlock { block, reply }) = request else {
                        break;
                    };
                    let result = self.core.process_block(block);
                    if let Err(err) = &result {
                        warn!(error = %err, "Block rejected");
                    }
                    // The caller may have stopped waiting.
                    let _ = reply.send(result);
                }
                Some(msg) = self.rollbacks.recv() => {
                    if let Err(err) = self.core.rollback(&msg.best_hash) {
                        warn!(
                            best_hash = %hash_hex(&msg.best_hash),
                            error = %err,
                            "Rollback failed"
                        );
                    }
                }
                _ = expiry.tick() => {
                    self.core.orphans.lock().expire(Instant::now());
                }
            }
        }
        debug!("Chain worker stopped");
    }
}

// =============================================================================
// CORE
// =============================================================================

struct ChainCore<S: ChainStore, V: BlockValidator> {
    config: ChainConfig,
    store: Arc<S>,
    casper: Arc<Casper<S>>,
    tx_pool: Arc<TxPool>,
    validator: V,
    events: Arc<dyn EventPublisher>,
    /// Written only by the worker.
    best: RwLock<BlockHeader>,
    orphans: Mutex<OrphanManage>,
}

impl<S: ChainStore, V: BlockValidator> ChainCore<S, V> {
    fn best_header(&self) -> BlockHeader {
        self.best.read().clone()
    }

    fn block_exist(&self, hash: &Hash) -> bool {
        self.store.block_exist(hash).unwrap_or(false) || self.orphans.lock().block_exist(hash)
    }

    fn process_block(&self, block: Block) -> ChainResult<bool> {
        let hash = block.hash();
        if self.block_exist(&hash) && self.best.read().height >= block.height() {
            return Ok(self.orphans.lock().block_exist(&hash));
        }

        if !self.store.block_exist(&block.previous_hash())? {
            debug!(
                hash = %hash_hex(&hash),
                height = block.height(),
                "Parent unknown, holding block as orphan"
            );
            self.orphans.lock().add(block);
            return Ok(true);
        }

        self.save_block(&block)?;
        let descendant = self.save_sub_block(&block);
        self.extend_or_fork(&descendant)?;
        self.retry_orphans()?;
        Ok(false)
    }

    fn extend_or_fork(&self, block: &Block) -> ChainResult<()> {
        if block.previous_hash() == self.best.read().hash() {
            self.connect_block(block)
        } else {
            self.apply_fork_chain_to_casper(&block.header)
        }
    }

    /// Orphans whose checkpoint only exists once their parent is committed
    /// get another chance after each commit.
    fn retry_orphans(&self) -> ChainResult<()> {
        loop {
            let best_hash = self.best.read().hash();
            if self.orphans.lock().get_prev_orphans(&best_hash).is_empty() {
                return Ok(());
            }
            let best_block = self.store.get_block(&best_hash)?;
            let descendant = self.save_sub_block(&best_block);
            if descendant.hash() == best_hash {
                return Ok(());
            }
            self.extend_or_fork(&descendant)?;
            if self.best.read().hash() == best_hash {
                return Ok(());
            }
        }
    }

    fn save_block(&self, block: &Block) -> ChainResult<()> {
        self.verify_block_signature(&block.header)?;

        let prev_hash = block.previous_hash();
        let parent = self.store.get_block_header(&prev_hash)?;
        let checkpoint = self.casper.parent_checkpoint_by_prev_hash(&prev_hash)?;
        self.validator
            .validate_block(block, &parent, &checkpoint)?;

        self.store.save_block(block)?;
        self.orphans.lock().delete(&block.hash());
        debug!(
            hash = %hash_hex(&block.hash()),
            height = block.height(),
            "Block saved"
        );
        Ok(())
    }

    /// Save buffered descendants of `block`; returns the highest one saved.
    fn save_sub_block(&self, block: &Block) -> Block {
        let children = self.orphans.lock().get_prev_orphans(&block.hash());
        let mut best = block.clone();
        for child_hash in children {
            let Some(child) = self.orphans.lock().get(&child_hash).cloned() else {
                continue;
            };
            if let Err(err) = self.save_block(&child) {
                warn!(
                    hash = %hash_hex(&child_hash),
                    height = child.height(),
                    error = %err,
                    "Failed to save orphan block"
                );
                continue;
            }
            let sub_best = self.save_sub_block(&child);
            if sub_best.height() > best.height() {
                best = sub_best;
            }
        }
        best
    }

    fn verify_block_signature(&self, header: &BlockHeader) -> ChainResult<()> {
        let validator = self.get_validator(&header.previous_block_hash, header.timestamp)?;
        verify_signature(&validator.pub_key, &header.hash(), &header.block_witness)?;
        Ok(())
    }

    fn get_validator(&self, prev_hash: &Hash, timestamp: u64) -> ChainResult<Validator> {
        let checkpoint = self.casper.parent_checkpoint_by_prev_hash(prev_hash)?;
        let validators = self.casper.effective_validators(&checkpoint);
        if validators.is_empty() {
            return Err(ChainError::NoValidators(hash_hex(&checkpoint.hash)));
        }

        let order = proposer_order(
            checkpoint.timestamp,
            timestamp,
            validators.len(),
            self.config.block_time_interval_ms,
            self.config.block_num_each_node,
        )
        .ok_or(ChainError::TimestampBeforeSlot {
            timestamp,
            start: checkpoint
                .timestamp
                .saturating_add(self.config.block_time_interval_ms),
        })?;

        validators
            .into_iter()
            .find(|v| v.order == order)
            .ok_or_else(|| ChainError::NoValidators(hash_hex(&checkpoint.hash)))
    }

    // =========================================================================
    // MAIN CHAIN
    // =========================================================================

    fn connect_block(&self, block: &Block) -> ChainResult<()> {
        let mut utxo_view = UtxoViewpoint::new();
        self.store
            .get_transactions_utxo(&mut utxo_view, &block.transactions)?;
        utxo_view.apply_block(block)?;

        let reply = self.casper.apply_block(block)?;
        if let Some(verification) = reply.verification {
            self.broadcast_verification(verification);
        }

        let mut contract_view = ContractViewpoint::new();
        contract_view.apply_block(block);

        self.store
            .save_chain_status(&block.header, &utxo_view, &contract_view)?;
        *self.best.write() = block.header.clone();

        for tx in &block.transactions {
            self.tx_pool.remove_transaction(&tx.id());
        }

        let hash = block.hash();
        info!(
            height = block.height(),
            hash = %hash_hex(&hash),
            txs = block.transactions.len(),
            "Block connected"
        );
        self.events.publish(LedgerEvent::BlockConnected {
            height: block.height(),
            hash,
        });
        Ok(())
    }

    /// Feed the branch ending at `begin_attach` to Casper and follow its
    /// fork choice.
    fn apply_fork_chain_to_casper(&self, begin_attach: &BlockHeader) -> ChainResult<()> {
        let best = self.best_header();
        let (attach, _) = self.calc_reorganize_chain(begin_attach, &best)?;
        if attach.is_empty() {
            return Err(ChainError::EmptyForkChain);
        }

        let mut preferred = best.hash();
        for header in &attach {
            let block = self.store.get_block(&header.hash())?;
            let reply = self.casper.apply_block(&block)?;
            if let Some(verification) = reply.verification {
                self.broadcast_verification(verification);
            }
            preferred = reply.best_hash;
        }

        debug!(
            fork_tip = %hash_hex(&begin_attach.hash()),
            preferred = %hash_hex(&preferred),
            "Applied fork chain to casper"
        );
        if preferred != best.hash() {
            self.rollback(&preferred)?;
        }
        Ok(())
    }

    fn rollback(&self, best_hash: &Hash) -> ChainResult<()> {
        if self.best.read().hash() == *best_hash {
            return Ok(());
        }
        let header = self.store.get_block_header(best_hash)?;
        self.reorganize_chain(&header)
    }

    /// Headers to attach (ascending) and detach (descending) to move the
    /// best block from `begin_detach` to `begin_attach`.
    fn calc_reorganize_chain(
        &self,
        begin_attach: &BlockHeader,
        begin_detach: &BlockHeader,
    ) -> ChainResult<(Vec<BlockHeader>, Vec<BlockHeader>)> {
        let mut attach = Vec::new();
        let mut detach = Vec::new();
        let mut attach_cursor = begin_attach.clone();
        let mut detach_cursor = begin_detach.clone();

        while attach_cursor.hash() != detach_cursor.hash() {
            let step_attach = attach_cursor.height >= detach_cursor.height;
            let step_detach = attach_cursor.height <= detach_cursor.height;
            if step_attach {
                let prev = attach_cursor.previous_block_hash;
                attach.push(attach_cursor);
                attach_cursor = self.store.get_block_header(&prev)?;
            }
            if step_detach {
                let prev = detach_cursor.previous_block_hash;
                detach.push(detach_cursor);
                detach_cursor = self.store.get_block_header(&prev)?;
            }
        }

        attach.reverse();
        Ok((attach, detach))
    }

    fn reorganize_chain(&self, header: &BlockHeader) -> ChainResult<()> {
        let best = self.best_header();
        let (attach, detach) = self.calc_reorganize_chain(header, &best)?;

        let mut utxo_view = UtxoViewpoint::new();
        let mut contract_view = ContractViewpoint::new();

        let mut detached = Vec::with_capacity(detach.len());
        for detach_header in &detach {
            let hash = detach_header.hash();
            let block = self.store.get_block(&hash)?;
            self.store
                .get_transactions_utxo(&mut utxo_view, &block.transactions)?;
            utxo_view.detach_block(&block)?;
            contract_view.detach_block(&block);
            info!(
                height = block.height(),
                hash = %hash_hex(&hash),
                "Detached block"
            );
            detached.push(block);
        }

        // Oldest first, so a restored spend follows the transaction it spends.
        let mut txs_to_restore = Vec::new();
        let mut restore_ids = HashSet::new();
        for block in detached.iter().rev() {
            for tx in &block.transactions {
                if !tx.is_coinbase() && restore_ids.insert(tx.id()) {
                    txs_to_restore.push(tx.clone());
                }
            }
        }

        let mut txs_to_remove = Vec::new();
        for attach_header in &attach {
            let hash = attach_header.hash();
            let block = self.store.get_block(&hash)?;
            self.store
                .get_transactions_utxo(&mut utxo_view, &block.transactions)?;
            utxo_view.apply_block(&block)?;
            contract_view.apply_block(&block);
            for tx in &block.transactions {
                let id = tx.id();
                if !restore_ids.remove(&id) {
                    txs_to_remove.push(id);
                }
            }
            info!(
                height = block.height(),
                hash = %hash_hex(&hash),
                "Attached block"
            );
        }

        self.store
            .save_chain_status(header, &utxo_view, &contract_view)?;
        *self.best.write() = header.clone();

        for id in &txs_to_remove {
            self.tx_pool.remove_transaction(id);
        }
        for tx in txs_to_restore {
            let id = tx.id();
            if !restore_ids.contains(&id) {
                continue;
            }
            if let Err(err) = self.validate_tx(tx) {
                warn!(tx_id = %hash_hex(&id), error = %err, "Failed to restore transaction");
            }
        }

        let fork_height = attach
            .first()
            .or(detach.last())
            .map_or(header.height, |h| h.height.saturating_sub(1));
        let new_best = header.hash();
        info!(
            fork_height,
            height = header.height,
            best_hash = %hash_hex(&new_best),
            attached = attach.len(),
            detached = detach.len(),
            "Chain reorganized"
        );
        self.events.publish(LedgerEvent::ChainReorganized {
            fork_height,
            new_best,
        });
        Ok(())
    }

    fn broadcast_verification(&self, v: Verification) {
        debug!(
            target_height = v.target_height,
            target_hash = %hash_hex(&v.target_hash),
            "Broadcasting verification"
        );
        self.events.publish(LedgerEvent::BlockVerification {
            source_height: v.source_height,
            source_hash: v.source_hash,
            target_height: v.target_height,
            target_hash: v.target_hash,
            pub_key: v.pub_key,
            signature: v.signature,
        });
    }

    // =========================================================================
    // TRANSACTIONS
    // =========================================================================

    fn validate_tx(&self, tx: Tx) -> ChainResult<Arc<TxDesc>> {
        let id = tx.id();
        if let Some(desc) = self.tx_pool.get_transaction(&id) {
            return Ok(desc);
        }
        if self.tx_pool.is_transaction_in_err_cache(&id) {
            return Err(ChainError::TxInErrCache(hash_hex(&id)));
        }

        let best = self.best_header();
        let validation = match self.validator.validate_tx(&tx, &best) {
            Ok(validation) => validation,
            Err(err) => {
                self.tx_pool.add_err_cache(id);
                debug!(tx_id = %hash_hex(&id), error = %err, "Transaction rejected");
                return Err(ChainError::InvalidTransaction(err));
            }
        };

        let mut utxo_view = UtxoViewpoint::new();
        self.store
            .get_transactions_utxo(&mut utxo_view, std::slice::from_ref(&tx))?;
        utxo_view.apply_transaction(best.height + 1, &tx, validation.gas_only)?;

        let weight = (tx.data().serialized_size / 1000).max(1);
        Ok(self.tx_pool.add_transaction_with_status(
            tx,
            validation.gas_only,
            best.height,
            weight,
            validation.fee,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{Sha3Pow, StructuralValidator};
    use crate::genesis::init_chain_status;
    use cl_01_entry_graph::program::OP_TRUE;
    use cl_03_finality::CheckpointStore;
    use cl_04_block_storage::{InMemoryKVStore, LedgerStore, StorageConfig};
    use cl_05_mempool::MempoolConfig;
    use shared_bus::{EventFilter, EventTopic, InMemoryEventBus, Subscription};
    use shared_types::{AssetAmount, CoinbaseInput, PublicKey, TxData, TxInput, TxOutput};

    type Store = LedgerStore<InMemoryKVStore>;
    type TestChain = Chain<Store, StructuralValidator<Sha3Pow>>;

    const INTERVAL: u64 = 6000;
    /// Saturates to the maximum target.
    const EASY_BITS: u64 = (0x22 << 56) | 0xffff;

    fn key(seed: u8) -> Ed25519KeyPair {
        Ed25519KeyPair::from_seed([seed; 32])
    }

    fn pk(seed: u8) -> PublicKey {
        key(seed).public_key().to_bytes()
    }

    fn coinbase(tag: u8, height: u64) -> Tx {
        Tx::new(TxData {
            version: 1,
            inputs: vec![TxInput::Coinbase(CoinbaseInput {
                arbitrary: vec![tag, height as u8],
            })],
            outputs: vec![
                TxOutput::new(AssetAmount::native(1000), vec![OP_TRUE]),
                TxOutput::new(AssetAmount::native(1000), vec![OP_TRUE]),
            ],
            ..TxData::default()
        })
    }

    fn sign(block: &mut Block, signer: &Ed25519KeyPair) {
        block.header.block_witness = signer.sign(&block.header.hash()).to_vec();
    }

    fn child(prev: &BlockHeader, tag: u8, txs: Vec<Tx>) -> Block {
        let height = prev.height + 1;
        let mut transactions = vec![coinbase(tag, height)];
        transactions.extend(txs);
        let mut block = Block::new(
            BlockHeader {
                version: 1,
                height,
                previous_block_hash: prev.hash(),
                timestamp: prev.timestamp + INTERVAL,
                bits: EASY_BITS,
                ..BlockHeader::default()
            },
            transactions,
        );
        block.commit_transactions();
        sign(&mut block, &key(1));
        block
    }

    fn branch(from: &BlockHeader, count: usize, tag: u8) -> Vec<Block> {
        let mut prev = from.clone();
        let mut blocks = Vec::new();
        for _ in 0..count {
            let block = child(&prev, tag, Vec::new());
            prev = block.header.clone();
            blocks.push(block);
        }
        blocks
    }

    /// Spends output `position` of `source` into `out` native units.
    fn spend(source: &Tx, position: usize, out: u64) -> Tx {
        let output_id = source.mapped().header.result_ids[position];
        let input = source.mapped().spend_input(&output_id).unwrap();
        Tx::new(TxData {
            version: 1,
            serialized_size: 2500,
            inputs: vec![TxInput::Spend(input)],
            outputs: vec![TxOutput::new(AssetAmount::native(out), vec![OP_TRUE])],
            ..TxData::default()
        })
    }

    struct Harness {
        chain: TestChain,
        store: Arc<Store>,
        genesis: Block,
        events: Subscription,
    }

    fn genesis_block() -> Block {
        let mut block = Block::new(
            BlockHeader {
                version: 1,
                bits: EASY_BITS,
                ..BlockHeader::default()
            },
            vec![coinbase(0, 0)],
        );
        block.commit_transactions();
        block
    }

    fn casper_config() -> CasperConfig {
        CasperConfig {
            blocks_of_epoch: 5,
            federation: vec![pk(1)],
            cache_size: 64,
            ..CasperConfig::default()
        }
    }

    fn harness() -> Harness {
        let store = Arc::new(LedgerStore::new(InMemoryKVStore::new(), StorageConfig::default()));
        let genesis = genesis_block();
        init_chain_status(store.as_ref(), &genesis).unwrap();

        let bus = Arc::new(InMemoryEventBus::new());
        let events = bus.subscribe(EventFilter::topics(vec![EventTopic::Chain]));
        let chain = Chain::start(
            ChainConfig::default(),
            casper_config(),
            Arc::clone(&store),
            Arc::new(TxPool::new(MempoolConfig::default())),
            StructuralValidator::new(Sha3Pow),
            None,
            bus,
        )
        .unwrap();
        Harness {
            chain,
            store,
            genesis,
            events,
        }
    }

    async fn submit_all(chain: &TestChain, blocks: &[Block]) {
        for block in blocks {
            assert!(!chain.process_block(block.clone()).await.unwrap());
        }
    }

    // =========================================================================
    // STARTUP
    // =========================================================================

    #[tokio::test]
    async fn test_start_requires_chain_status() {
        let store = Arc::new(LedgerStore::new(InMemoryKVStore::new(), StorageConfig::default()));
        let result: ChainResult<TestChain> = Chain::start(
            ChainConfig::default(),
            casper_config(),
            store,
            Arc::new(TxPool::default()),
            StructuralValidator::new(Sha3Pow),
            None,
            Arc::new(InMemoryEventBus::new()),
        );
        assert!(matches!(result, Err(ChainError::NotInitialized)));
    }

    #[tokio::test]
    async fn test_genesis_is_best_and_main_chain() {
        let h = harness();
        assert_eq!(h.chain.best_block_hash(), h.genesis.hash());
        assert_eq!(h.chain.best_block_height(), 0);
        assert!(h.chain.in_main_chain(&h.genesis.hash()));
        assert_eq!(h.chain.get_block_by_height(0).unwrap(), h.genesis);
        let cp = h.store.get_checkpoint(&h.genesis.hash()).unwrap();
        assert!(cp.is_justified());
    }

    // =========================================================================
    // PROCESS BLOCK
    // =========================================================================

    #[tokio::test]
    async fn test_connect_extends_best_chain() {
        let mut h = harness();
        let blocks = branch(&h.genesis.header, 3, 1);
        submit_all(&h.chain, &blocks).await;

        assert_eq!(h.chain.best_block_hash(), blocks[2].hash());
        assert_eq!(h.chain.get_header_by_height(2).unwrap(), blocks[1].header);
        assert!(blocks.iter().all(|b| h.chain.in_main_chain(&b.hash())));

        let connected: Vec<u64> = h
            .events
            .drain()
            .into_iter()
            .filter_map(|e| match e {
                LedgerEvent::BlockConnected { height, .. } => Some(height),
                _ => None,
            })
            .collect();
        assert_eq!(connected, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_known_block_is_not_reprocessed() {
        let h = harness();
        let blocks = branch(&h.genesis.header, 2, 1);
        submit_all(&h.chain, &blocks).await;

        assert!(!h.chain.process_block(blocks[0].clone()).await.unwrap());
        assert_eq!(h.chain.best_block_hash(), blocks[1].hash());
    }

    #[tokio::test]
    async fn test_orphan_resolved_when_parent_arrives() {
        let h = harness();
        let blocks = branch(&h.genesis.header, 3, 1);

        assert!(h.chain.process_block(blocks[2].clone()).await.unwrap());
        assert!(h.chain.process_block(blocks[1].clone()).await.unwrap());
        assert_eq!(h.chain.orphan_count(), 2);
        assert!(h.chain.block_exist(&blocks[2].hash()));
        assert_eq!(h.chain.best_block_height(), 0);

        assert!(!h.chain.process_block(blocks[0].clone()).await.unwrap());
        assert_eq!(h.chain.orphan_count(), 0);
        assert_eq!(h.chain.best_block_hash(), blocks[2].hash());
    }

    #[tokio::test]
    async fn test_orphans_across_epoch_boundary() {
        let h = harness();
        let blocks = branch(&h.genesis.header, 8, 1);

        for block in blocks[1..].iter().rev() {
            assert!(h.chain.process_block(block.clone()).await.unwrap());
        }
        assert!(!h.chain.process_block(blocks[0].clone()).await.unwrap());

        // Block 6 needs the checkpoint at 5, which exists only once 5 is
        // committed.
        assert_eq!(h.chain.best_block_hash(), blocks[7].hash());
        assert_eq!(h.chain.orphan_count(), 0);
    }

    #[tokio::test]
    async fn test_bad_signature_rejected() {
        let h = harness();
        let mut block = child(&h.genesis.header, 1, Vec::new());
        sign(&mut block, &key(2));

        let result = h.chain.process_block(block.clone()).await;
        assert!(matches!(result, Err(ChainError::InvalidBlockSignature(_))));
        assert!(!h.chain.block_exist(&block.hash()));
        assert_eq!(h.chain.best_block_hash(), h.genesis.hash());
    }

    #[tokio::test]
    async fn test_timestamp_before_first_slot_rejected() {
        let h = harness();
        let mut block = child(&h.genesis.header, 1, Vec::new());
        block.header.timestamp = INTERVAL - 1;
        sign(&mut block, &key(1));

        let result = h.chain.process_block(block).await;
        assert!(matches!(result, Err(ChainError::TimestampBeforeSlot { .. })));
    }

    #[tokio::test]
    async fn test_invalid_block_keeps_worker_running() {
        let h = harness();
        let mut bad = child(&h.genesis.header, 1, Vec::new());
        bad.header.transactions_root = [9u8; 32];
        sign(&mut bad, &key(1));

        let result = h.chain.process_block(bad).await;
        assert!(matches!(
            result,
            Err(ChainError::BadBlock(crate::error::ValidationError::MismatchedMerkleRoot))
        ));

        let good = child(&h.genesis.header, 1, Vec::new());
        assert!(!h.chain.process_block(good.clone()).await.unwrap());
        assert_eq!(h.chain.best_block_hash(), good.hash());
    }

    fn reorgs(events: Vec<LedgerEvent>) -> Vec<(u64, Hash)> {
        events
            .into_iter()
            .filter_map(|e| match e {
                LedgerEvent::ChainReorganized {
                    fork_height,
                    new_best,
                } => Some((fork_height, new_best)),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_longer_fork_reorganizes() {
        let mut h = harness();
        let main = branch(&h.genesis.header, 2, 1);
        submit_all(&h.chain, &main).await;
        h.events.drain();

        // Delivered tip first, so the whole branch lands in one switch.
        let fork = branch(&h.genesis.header, 3, 2);
        for block in fork[1..].iter().rev() {
            assert!(h.chain.process_block(block.clone()).await.unwrap());
        }
        assert!(!h.chain.process_block(fork[0].clone()).await.unwrap());

        assert_eq!(h.chain.best_block_hash(), fork[2].hash());
        assert!(fork.iter().all(|b| h.chain.in_main_chain(&b.hash())));
        assert!(!h.chain.in_main_chain(&main[1].hash()));
        assert_eq!(h.chain.get_block_by_height(1).unwrap(), fork[0]);
        assert_eq!(reorgs(h.events.drain()), vec![(0, fork[2].hash())]);
    }

    #[tokio::test]
    async fn test_fork_from_epoch_boundary_wins() {
        let mut h = harness();
        let main = branch(&h.genesis.header, 7, 1);
        submit_all(&h.chain, &main).await;
        h.events.drain();

        let boundary = &main[4];
        assert_eq!(boundary.height(), 5);
        let fork = branch(&boundary.header, 3, 2);
        submit_all(&h.chain, &fork).await;

        assert_eq!(h.chain.best_block_hash(), fork[2].hash());
        assert_eq!(h.chain.best_block_height(), 8);
        assert!(h.chain.in_main_chain(&boundary.hash()));
        assert!(!h.chain.in_main_chain(&main[6].hash()));
        assert_eq!(h.chain.get_block_by_height(6).unwrap(), fork[0]);

        // Equal heights may switch early on the hash tie-break; every switch
        // forks at the boundary and the last one lands on the tip.
        let switches = reorgs(h.events.drain());
        assert!(switches.iter().all(|(fork_height, _)| *fork_height == 5));
        assert_eq!(
            switches.iter().map(|(_, hash)| *hash).last(),
            Some(fork[2].hash())
        );
    }

    #[tokio::test]
    async fn test_calc_reorganize_chain_orders_headers() {
        let h = harness();
        let main = branch(&h.genesis.header, 3, 1);
        submit_all(&h.chain, &main).await;
        let fork = branch(&main[0].header, 3, 2);
        for block in &fork {
            h.store.save_block(block).unwrap();
        }

        let (attach, detach) = h
            .chain
            .core
            .calc_reorganize_chain(&fork[2].header, &main[2].header)
            .unwrap();
        let heights = |headers: &[BlockHeader]| headers.iter().map(|h| h.height).collect::<Vec<_>>();
        assert_eq!(heights(&attach), vec![2, 3, 4]);
        assert_eq!(heights(&detach), vec![3, 2]);
        assert_eq!(attach[0].previous_block_hash, main[0].hash());
    }

    // =========================================================================
    // TRANSACTIONS
    // =========================================================================

    /// Chain long enough for genesis coinbase outputs to mature.
    async fn matured(h: &Harness) -> Vec<Block> {
        let blocks = branch(&h.genesis.header, 6, 1);
        submit_all(&h.chain, &blocks).await;
        blocks
    }

    #[tokio::test]
    async fn test_validate_tx_admits_with_fee_and_weight() {
        let h = harness();
        matured(&h).await;
        let tx = spend(&h.genesis.transactions[0], 0, 900);

        let desc = h.chain.validate_tx(tx.clone()).unwrap();
        assert_eq!(desc.fee, 100);
        assert_eq!(desc.weight, 2);
        assert_eq!(desc.fee_per_kb, 50);
        assert_eq!(desc.height, 6);
        assert!(h.chain.tx_pool().is_transaction_in_pool(&tx.id()));

        // Already pooled: no-op.
        assert_eq!(h.chain.validate_tx(tx).unwrap().id(), desc.id());
    }

    #[tokio::test]
    async fn test_validate_tx_rejects_immature_coinbase_spend() {
        let h = harness();
        let tx = spend(&h.genesis.transactions[0], 0, 900);
        assert!(matches!(
            h.chain.validate_tx(tx.clone()),
            Err(ChainError::State(_))
        ));
        assert!(!h.chain.tx_pool().is_transaction_in_err_cache(&tx.id()));
    }

    #[tokio::test]
    async fn test_invalid_tx_goes_to_err_cache() {
        let h = harness();
        matured(&h).await;
        let tx = spend(&h.genesis.transactions[0], 0, 1500);

        assert!(matches!(
            h.chain.validate_tx(tx.clone()),
            Err(ChainError::InvalidTransaction(_))
        ));
        assert!(matches!(
            h.chain.validate_tx(tx),
            Err(ChainError::TxInErrCache(_))
        ));
    }

    #[tokio::test]
    async fn test_confirmed_tx_leaves_pool() {
        let h = harness();
        let blocks = matured(&h).await;
        let tx = spend(&h.genesis.transactions[0], 0, 900);
        h.chain.validate_tx(tx.clone()).unwrap();

        let block = child(&blocks[5].header, 1, vec![tx.clone()]);
        submit_all(&h.chain, &[block]).await;
        assert!(!h.chain.tx_pool().is_transaction_in_pool(&tx.id()));

        // Spent in the persisted set now.
        assert!(matches!(
            h.chain.validate_tx(spend(&h.genesis.transactions[0], 0, 800)),
            Err(ChainError::State(_))
        ));
    }

    #[tokio::test]
    async fn test_get_validator_single_federation_key() {
        let h = harness();
        let validator = h
            .chain
            .get_validator(&h.genesis.hash(), INTERVAL * 40)
            .unwrap();
        assert_eq!(validator.pub_key, pk(1));
        assert!(matches!(
            h.chain.get_validator(&h.genesis.hash(), 0),
            Err(ChainError::TimestampBeforeSlot { start: INTERVAL, .. })
        ));
    }
}
