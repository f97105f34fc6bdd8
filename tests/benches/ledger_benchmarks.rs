//! # Ledger Core Benchmarks
//!
//! | Group | Hot path |
//! |-------|----------|
//! | entry-graph | Mapping a transaction to its entry graph and ids |
//! | utxo-view | Applying a funding block and a block spending it |
//! | pow | Compact target expansion and hash comparison |

use cl_01_entry_graph::program::OP_TRUE;
use cl_01_entry_graph::{map_tx, merkle_root, Block, Tx};
use cl_02_state_viewpoints::UtxoViewpoint;
use cl_06_chain::domain::{check_proof_of_work, compact_to_big};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::Rng;
use shared_types::{AssetAmount, BlockHeader, CoinbaseInput, Hash, TxData, TxInput, TxOutput};

fn coinbase_with_outputs(count: usize) -> TxData {
    let mut rng = rand::thread_rng();
    TxData {
        version: 1,
        inputs: vec![TxInput::Coinbase(CoinbaseInput {
            arbitrary: (0..8).map(|_| rng.gen()).collect(),
        })],
        outputs: (0..count)
            .map(|_| TxOutput::new(AssetAmount::native(rng.gen_range(1..1_000_000)), vec![OP_TRUE]))
            .collect(),
        ..TxData::default()
    }
}

fn block_at(height: u64, transactions: Vec<Tx>) -> Block {
    let mut block = Block::new(
        BlockHeader {
            version: 1,
            height,
            ..BlockHeader::default()
        },
        transactions,
    );
    block.commit_transactions();
    block
}

// ============================================================================
// Entry graph
// ============================================================================

fn bench_map_tx(c: &mut Criterion) {
    let mut group = c.benchmark_group("entry-graph");
    for outputs in [1usize, 16, 128] {
        let data = coinbase_with_outputs(outputs);
        group.throughput(Throughput::Elements(outputs as u64));
        group.bench_with_input(BenchmarkId::new("map_tx", outputs), &data, |b, data| {
            b.iter(|| black_box(map_tx(data)))
        });
    }

    let leaves: Vec<Hash> = (0..1024u32)
        .map(|i| {
            let mut leaf = [0u8; 32];
            leaf[..4].copy_from_slice(&i.to_le_bytes());
            leaf
        })
        .collect();
    group.bench_function("merkle_root_1024", |b| b.iter(|| black_box(merkle_root(&leaves))));
    group.finish();
}

// ============================================================================
// UTXO viewpoint
// ============================================================================

fn bench_utxo_apply(c: &mut Criterion) {
    let mut group = c.benchmark_group("utxo-view");
    for spends in [10usize, 100] {
        let funding_tx = Tx::new(coinbase_with_outputs(spends));
        let spend_txs: Vec<Tx> = funding_tx
            .mapped()
            .header
            .result_ids
            .iter()
            .filter_map(|id| {
                let input = funding_tx.mapped().spend_input(id).ok()?;
                let value = input.asset_amount.amount;
                Some(Tx::new(TxData {
                    version: 1,
                    inputs: vec![TxInput::Spend(input)],
                    outputs: vec![TxOutput::new(AssetAmount::native(value), vec![OP_TRUE])],
                    ..TxData::default()
                }))
            })
            .collect();

        let funding = block_at(0, vec![funding_tx]);
        let mut txs = vec![Tx::new(coinbase_with_outputs(1))];
        txs.extend(spend_txs);
        let spending = block_at(100, txs);

        group.throughput(Throughput::Elements(spends as u64));
        group.bench_function(BenchmarkId::new("apply_block", spends), |b| {
            b.iter(|| {
                let mut view = UtxoViewpoint::new();
                view.apply_block(&funding).ok();
                view.apply_block(black_box(&spending)).ok();
                black_box(view)
            })
        });
    }
    group.finish();
}

// ============================================================================
// Proof of work
// ============================================================================

fn bench_pow(c: &mut Criterion) {
    let mut group = c.benchmark_group("pow");
    let bits = (0x20u64 << 56) | 0x00ff_ffff;
    group.bench_function("compact_to_big", |b| b.iter(|| black_box(compact_to_big(black_box(bits)))));

    let hash: Hash = rand::thread_rng().gen();
    group.bench_function("check_proof_of_work", |b| {
        b.iter(|| black_box(check_proof_of_work(black_box(&hash), bits)))
    });
    group.finish();
}

criterion_group!(benches, bench_map_tx, bench_utxo_apply, bench_pow);
criterion_main!(benches);
