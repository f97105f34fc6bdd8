//! # Transaction Pool Service
//!
//! Shared between network ingestion (admission) and the chain worker
//! (removal on confirmation, restore on reorg). The pool and the error cache
//! have independent locks and no call holds both.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use cl_01_entry_graph::Tx;
use lru::LruCache;
use parking_lot::{Mutex, RwLock};
use shared_bus::{EventPublisher, LedgerEvent};
use shared_types::{hash_hex, Hash};
use tracing::debug;

use crate::domain::{MempoolConfig, MempoolError, MempoolResult, PoolIndex, TxDesc};
use crate::ports::{SystemTimeSource, TimeSource};

pub struct TxPool {
    config: MempoolConfig,
    pool: RwLock<PoolIndex>,
    err_cache: Mutex<LruCache<Hash, ()>>,
    time: Arc<dyn TimeSource>,
    events: Option<Arc<dyn EventPublisher>>,
}

impl TxPool {
    pub fn new(config: MempoolConfig) -> Self {
        let err_cap = NonZeroUsize::new(config.max_err_cache).unwrap_or(NonZeroUsize::MIN);
        Self {
            config,
            pool: RwLock::new(PoolIndex::new()),
            err_cache: Mutex::new(LruCache::new(err_cap)),
            time: Arc::new(SystemTimeSource),
            events: None,
        }
    }

    pub fn with_time_source(mut self, time: Arc<dyn TimeSource>) -> Self {
        self.time = time;
        self
    }

    /// Announce admissions as [`LedgerEvent::NewTransaction`].
    pub fn with_event_publisher(mut self, events: Arc<dyn EventPublisher>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn config(&self) -> &MempoolConfig {
        &self.config
    }

    // =========================================================================
    // ADMISSION
    // =========================================================================

    pub fn add_transaction(
        &self,
        tx: Tx,
        height: u64,
        weight: u64,
        fee: u64,
    ) -> MempoolResult<Arc<TxDesc>> {
        self.add_transaction_with_status(tx, false, height, weight, fee)
    }

    pub fn add_transaction_with_status(
        &self,
        tx: Tx,
        status_fail: bool,
        height: u64,
        weight: u64,
        fee: u64,
    ) -> MempoolResult<Arc<TxDesc>> {
        let desc = Arc::new(TxDesc::new(
            tx,
            self.time.now(),
            status_fail,
            height,
            weight,
            fee,
        ));
        let id = desc.id();
        {
            let mut pool = self.pool.write();
            if let Some(existing) = pool.get(&id) {
                return Ok(existing.clone());
            }
            if pool.len() >= self.config.max_transactions {
                match pool.lowest() {
                    Some((lowest_fee, lowest_id)) if lowest_fee < desc.fee_per_kb => {
                        pool.remove(&lowest_id);
                        debug!(
                            tx_id = %hash_hex(&lowest_id),
                            fee_per_kb = lowest_fee,
                            "Evicted cheapest transaction"
                        );
                    }
                    _ => {
                        return Err(MempoolError::PoolFull {
                            capacity: self.config.max_transactions,
                            fee_per_kb: desc.fee_per_kb,
                        })
                    }
                }
            }
            pool.insert(desc.clone());
        }

        debug!(
            tx_id = %hash_hex(&id),
            height,
            fee_per_kb = desc.fee_per_kb,
            status_fail,
            "Transaction added to pool"
        );
        if let Some(events) = &self.events {
            events.publish(LedgerEvent::NewTransaction {
                tx_id: id,
                fee_per_kb: desc.fee_per_kb,
            });
        }
        Ok(desc)
    }

    /// Idempotent.
    pub fn remove_transaction(&self, id: &Hash) {
        if self.pool.write().remove(id).is_some() {
            debug!(tx_id = %hash_hex(id), "Transaction removed from pool");
        }
    }

    /// Drop entries admitted more than `max_age` ago. Returns how many.
    pub fn expire_transactions(&self, max_age: Duration) -> usize {
        let max_age_ms = u64::try_from(max_age.as_millis()).unwrap_or(u64::MAX);
        let cutoff = self.time.now().saturating_sub(max_age_ms);
        let mut pool = self.pool.write();
        let expired = pool.added_before(cutoff);
        for id in &expired {
            pool.remove(id);
        }
        if !expired.is_empty() {
            debug!(count = expired.len(), "Expired pooled transactions");
        }
        expired.len()
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    pub fn get_transaction(&self, id: &Hash) -> Option<Arc<TxDesc>> {
        self.pool.read().get(id).cloned()
    }

    pub fn get_transactions(&self) -> Vec<Arc<TxDesc>> {
        self.pool.read().values().cloned().collect()
    }

    pub fn is_transaction_in_pool(&self, id: &Hash) -> bool {
        self.pool.read().contains(id)
    }

    pub fn count(&self) -> usize {
        self.pool.read().len()
    }

    // =========================================================================
    // ERROR CACHE
    // =========================================================================

    /// Remember `id` as invalid. The oldest id is forgotten at capacity.
    pub fn add_err_cache(&self, id: Hash) {
        self.err_cache.lock().put(id, ());
    }

    pub fn is_transaction_in_err_cache(&self, id: &Hash) -> bool {
        self.err_cache.lock().contains(id)
    }

    /// In the pool or known invalid.
    pub fn have_transaction(&self, id: &Hash) -> bool {
        self.is_transaction_in_pool(id) || self.is_transaction_in_err_cache(id)
    }
}

impl Default for TxPool {
    fn default() -> Self {
        Self::new(MempoolConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_bus::{EventFilter, InMemoryEventBus};
    use shared_types::TxData;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct ManualClock(AtomicU64);

    impl TimeSource for ManualClock {
        fn now(&self) -> u64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    fn tx(version: u64) -> Tx {
        Tx::new(TxData {
            version,
            ..TxData::default()
        })
    }

    fn small_pool(max_transactions: usize) -> TxPool {
        TxPool::new(MempoolConfig {
            max_transactions,
            max_err_cache: 2,
            ..MempoolConfig::default()
        })
    }

    // =========================================================================
    // ADMISSION
    // =========================================================================

    #[test]
    fn test_add_get_remove_scenario() {
        let pool = TxPool::default();
        let tx_a = tx(1);
        let id = tx_a.id();

        pool.add_transaction(tx_a, 1000, 1, 5_000_000_000).unwrap();
        assert!(pool.is_transaction_in_pool(&id));
        assert_eq!(pool.get_transaction(&id).unwrap().fee_per_kb, 5_000_000_000);

        pool.remove_transaction(&id);
        assert!(!pool.is_transaction_in_pool(&id));
        // Removing again is a no-op.
        pool.remove_transaction(&id);
        assert_eq!(pool.count(), 0);
    }

    #[test]
    fn test_duplicate_returns_existing() {
        let pool = TxPool::default();
        let first = pool.add_transaction(tx(1), 10, 1, 100).unwrap();
        let second = pool.add_transaction(tx(1), 20, 1, 900).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(pool.count(), 1);
    }

    #[test]
    fn test_status_fail_is_kept() {
        let pool = TxPool::default();
        let desc = pool.add_transaction_with_status(tx(1), true, 5, 2, 100).unwrap();
        assert!(desc.status_fail);
        assert_eq!(desc.fee_per_kb, 50);
    }

    #[test]
    fn test_full_pool_evicts_cheapest() {
        let pool = small_pool(2);
        let cheap = pool.add_transaction(tx(1), 1, 1, 10).unwrap();
        pool.add_transaction(tx(2), 1, 1, 20).unwrap();

        pool.add_transaction(tx(3), 1, 1, 30).unwrap();
        assert_eq!(pool.count(), 2);
        assert!(!pool.is_transaction_in_pool(&cheap.id()));
    }

    #[test]
    fn test_full_pool_rejects_lower_fee() {
        let pool = small_pool(1);
        pool.add_transaction(tx(1), 1, 1, 10).unwrap();
        let err = pool.add_transaction(tx(2), 1, 1, 10).unwrap_err();
        assert_eq!(
            err,
            MempoolError::PoolFull {
                capacity: 1,
                fee_per_kb: 10
            }
        );
    }

    #[test]
    fn test_admission_publishes_event() {
        let bus = Arc::new(InMemoryEventBus::new());
        let mut sub = bus.subscribe(EventFilter::all());
        let pool = TxPool::default().with_event_publisher(bus.clone());

        let desc = pool.add_transaction(tx(1), 1, 2, 100).unwrap();
        assert_eq!(
            sub.drain(),
            vec![LedgerEvent::NewTransaction {
                tx_id: desc.id(),
                fee_per_kb: 50
            }]
        );

        // Re-admission is silent.
        pool.add_transaction(tx(1), 1, 2, 100).unwrap();
        assert!(sub.drain().is_empty());
    }

    #[test]
    fn test_expire_transactions() {
        let clock = Arc::new(ManualClock(AtomicU64::new(1_000)));
        let pool = TxPool::default().with_time_source(clock.clone());
        let old = pool.add_transaction(tx(1), 1, 1, 1).unwrap();
        clock.0.store(5_000, Ordering::SeqCst);
        let fresh = pool.add_transaction(tx(2), 1, 1, 1).unwrap();

        assert_eq!(pool.expire_transactions(Duration::from_millis(2_000)), 1);
        assert!(!pool.is_transaction_in_pool(&old.id()));
        assert!(pool.is_transaction_in_pool(&fresh.id()));
    }

    // =========================================================================
    // ERROR CACHE
    // =========================================================================

    #[test]
    fn test_err_cache_is_bounded() {
        let pool = small_pool(10);
        pool.add_err_cache([1u8; 32]);
        pool.add_err_cache([2u8; 32]);
        pool.add_err_cache([3u8; 32]);

        assert!(!pool.is_transaction_in_err_cache(&[1u8; 32]));
        assert!(pool.is_transaction_in_err_cache(&[3u8; 32]));
    }

    #[test]
    fn test_have_transaction_covers_both_sets() {
        let pool = TxPool::default();
        let pooled = pool.add_transaction(tx(1), 1, 1, 1).unwrap();
        pool.add_err_cache([9u8; 32]);

        assert!(pool.have_transaction(&pooled.id()));
        assert!(pool.have_transaction(&[9u8; 32]));
        assert!(!pool.have_transaction(&[8u8; 32]));
    }
}
