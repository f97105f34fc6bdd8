//! # Node Harness
//!
//! One in-memory node: storage initialised with a genesis block, a chain
//! worker, a transaction pool and an event bus, plus builders for signed
//! blocks and spends.

use std::sync::Arc;
use std::time::Duration;

use cl_01_entry_graph::program::OP_TRUE;
use cl_01_entry_graph::{Block, Tx};
use cl_03_finality::{CasperConfig, Verification};
use cl_04_block_storage::{InMemoryKVStore, LedgerStore, StorageConfig};
use cl_05_mempool::{MempoolConfig, TxPool};
use cl_06_chain::{init_chain_status, Chain, ChainConfig, ChainQueries, Sha3Pow, StructuralValidator};
use shared_bus::{EventFilter, EventTopic, InMemoryEventBus, Subscription};
use shared_crypto::Ed25519KeyPair;
use shared_types::{AssetAmount, BlockHeader, CoinbaseInput, Hash, PublicKey, TxData, TxInput, TxOutput};

pub type Store = LedgerStore<InMemoryKVStore>;
pub type NodeChain = Chain<Store, StructuralValidator<Sha3Pow>>;

/// Milliseconds between consecutive blocks.
pub const INTERVAL: u64 = 6000;

/// Compact target that saturates to the maximum, so every hash passes.
pub const EASY_BITS: u64 = (0x22 << 56) | 0xffff;

pub const BLOCKS_OF_EPOCH: u64 = 5;

/// Value of each genesis and block coinbase output.
pub const COINBASE_VALUE: u64 = 1000;

pub fn key(seed: u8) -> Ed25519KeyPair {
    Ed25519KeyPair::from_seed([seed; 32])
}

pub fn pk(seed: u8) -> PublicKey {
    key(seed).public_key().to_bytes()
}

pub fn short(hash: &Hash) -> String {
    hex::encode(&hash[..4])
}

/// Coinbase with two spendable native outputs.
pub fn coinbase(tag: u8, height: u64) -> Tx {
    Tx::new(TxData {
        version: 1,
        inputs: vec![TxInput::Coinbase(CoinbaseInput {
            arbitrary: vec![tag, height as u8, (height >> 8) as u8],
        })],
        outputs: vec![
            TxOutput::new(AssetAmount::native(COINBASE_VALUE), vec![OP_TRUE]),
            TxOutput::new(AssetAmount::native(COINBASE_VALUE), vec![OP_TRUE]),
        ],
        ..TxData::default()
    })
}

/// Spend output `position` of `source` into a single output of `out`.
pub fn spend(source: &Tx, position: usize, out: u64) -> Tx {
    let output_id = source.mapped().header.result_ids[position];
    let input = source
        .mapped()
        .spend_input(&output_id)
        .expect("output belongs to source");
    Tx::new(TxData {
        version: 1,
        serialized_size: 1500,
        inputs: vec![TxInput::Spend(input)],
        outputs: vec![TxOutput::new(AssetAmount::native(out), vec![OP_TRUE])],
        ..TxData::default()
    })
}

/// A signed vote from `signer` linking two blocks.
pub fn vote(signer: u8, source: &Block, target: &Block) -> Verification {
    let mut v = Verification::new(
        (source.height(), source.hash()),
        (target.height(), target.hash()),
        pk(signer),
    );
    v.sign(&key(signer));
    v
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

pub struct Node {
    pub chain: NodeChain,
    pub store: Arc<Store>,
    pub bus: Arc<InMemoryEventBus>,
    pub genesis: Block,
    federation: Vec<u8>,
}

impl Node {
    /// Start a node whose federation is the keys seeded by `federation`;
    /// `local` signs finality votes when set.
    pub fn start(federation: &[u8], local: Option<u8>) -> Self {
        ledger_telemetry::try_init_for_tests();

        let store = Arc::new(LedgerStore::new(InMemoryKVStore::new(), StorageConfig::default()));
        let genesis = genesis_block();
        init_chain_status(store.as_ref(), &genesis).expect("fresh store");

        let bus = Arc::new(InMemoryEventBus::new());
        let tx_pool = TxPool::new(MempoolConfig::default()).with_event_publisher(bus.clone());
        let casper_config = CasperConfig {
            blocks_of_epoch: BLOCKS_OF_EPOCH,
            federation: federation.iter().map(|seed| pk(*seed)).collect(),
            cache_size: 64,
            ..CasperConfig::default()
        };
        let chain = Chain::start(
            ChainConfig::default(),
            casper_config,
            Arc::clone(&store),
            Arc::new(tx_pool),
            StructuralValidator::new(Sha3Pow),
            local.map(key),
            bus.clone(),
        )
        .expect("chain status initialised");

        Self {
            chain,
            store,
            bus,
            genesis,
            federation: federation.to_vec(),
        }
    }

    pub fn subscribe(&self, topics: Vec<EventTopic>) -> Subscription {
        self.bus.subscribe(EventFilter::topics(topics))
    }

    /// Build a signed block on top of `prev`. The proposer is looked up
    /// through the chain, so `prev` must be stored unless the federation
    /// has a single member.
    pub fn child(&self, prev: &BlockHeader, tag: u8, txs: Vec<Tx>) -> Block {
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

        let signer = match self.federation.as_slice() {
            [only] => *only,
            _ => {
                let proposer = self
                    .chain
                    .get_validator(&prev.hash(), block.header.timestamp)
                    .expect("proposer slot");
                *self
                    .federation
                    .iter()
                    .find(|seed| pk(**seed) == proposer.pub_key)
                    .expect("proposer is a federation member")
            }
        };
        block.header.block_witness = key(signer).sign(&block.header.hash()).to_vec();
        block
    }

    /// Build `count` unsubmitted blocks on top of `from`.
    pub fn branch(&self, from: &BlockHeader, count: usize, tag: u8) -> Vec<Block> {
        let mut prev = from.clone();
        let mut blocks = Vec::with_capacity(count);
        for _ in 0..count {
            let block = self.child(&prev, tag, Vec::new());
            prev = block.header.clone();
            blocks.push(block);
        }
        blocks
    }

    /// Build and submit `count` blocks on top of `from`, one at a time.
    pub async fn extend(&self, from: &BlockHeader, count: usize, tag: u8) -> Vec<Block> {
        let mut prev = from.clone();
        let mut blocks = Vec::with_capacity(count);
        for _ in 0..count {
            let block = self.child(&prev, tag, Vec::new());
            self.submit(&block).await;
            prev = block.header.clone();
            blocks.push(block);
        }
        blocks
    }

    /// Submit a block whose parent is known.
    pub async fn submit(&self, block: &Block) {
        let is_orphan = self
            .chain
            .process_block(block.clone())
            .await
            .unwrap_or_else(|err| panic!("block {} rejected: {err}", short(&block.hash())));
        assert!(!is_orphan, "block {} held as orphan", short(&block.hash()));
    }

    /// Wait for the worker to make `hash` the best block.
    pub async fn wait_for_best(&self, hash: &Hash) {
        for _ in 0..200 {
            if self.chain.best_block_hash() == *hash {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!(
            "best block is {}, expected {}",
            short(&self.chain.best_block_hash()),
            short(hash)
        );
    }
}
