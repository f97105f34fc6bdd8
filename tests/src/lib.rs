//! # Casper-Ledger Test Suite
//!
//! Scenarios that run the whole ledger core together: entry mapping,
//! state viewpoints, block storage, the transaction pool, Casper and the
//! chain worker.
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/
//! │   └── ledger_benchmarks.rs  # Mapping, UTXO and PoW hot paths
//! └── src/integration/
//!     ├── support.rs            # Node harness and block builders
//!     ├── orphans.rs            # Out-of-order delivery
//!     ├── reorg_pool.rs         # Reorganization and pool restore
//!     ├── finality.rs           # Votes, justification, slashing
//!     └── mempool.rs            # Admission through the chain
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p cl-tests
//! cargo test -p cl-tests integration::finality
//!
//! # Benchmarks
//! cargo bench -p cl-tests
//! ```

pub mod integration;
