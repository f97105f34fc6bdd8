//! # Admission Through the Chain
//!
//! Transactions validated against the best state enter the pool with
//! their fee rate, are announced on the bus and leave once confirmed.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use cl_01_entry_graph::Tx;
    use cl_05_mempool::{MempoolConfig, MempoolError, TxPool};
    use cl_06_chain::ChainError;
    use shared_bus::{EventFilter, EventTopic, InMemoryEventBus, LedgerEvent};
    use shared_types::TxData;

    use crate::integration::support::{spend, Node};

    #[tokio::test]
    async fn test_admitted_transaction_is_announced() {
        let node = Node::start(&[1], None);
        let mut events = node.subscribe(vec![EventTopic::Mempool]);
        node.extend(&node.genesis.header, 6, 1).await;

        let tx = spend(&node.genesis.transactions[0], 0, 750);
        let desc = node.chain.validate_tx(tx.clone()).unwrap();
        assert_eq!((desc.fee, desc.weight, desc.fee_per_kb), (250, 1, 250));
        assert_eq!(desc.height, 6);
        assert!(!desc.status_fail);

        assert_eq!(
            events.drain(),
            vec![LedgerEvent::NewTransaction {
                tx_id: tx.id(),
                fee_per_kb: 250
            }]
        );
    }

    #[tokio::test]
    async fn test_conflicting_spends_both_pooled_until_one_confirms() {
        let node = Node::start(&[1], None);
        let main = node.extend(&node.genesis.header, 6, 1).await;
        let first = spend(&node.genesis.transactions[0], 0, 900);
        let second = spend(&node.genesis.transactions[0], 0, 800);

        node.chain.validate_tx(first.clone()).unwrap();
        node.chain.validate_tx(second.clone()).unwrap();
        assert_eq!(node.chain.tx_pool().count(), 2);

        let block = node.child(&main[5].header, 1, vec![first.clone()]);
        node.submit(&block).await;
        assert!(!node.chain.tx_pool().is_transaction_in_pool(&first.id()));
        // The loser stays until something evicts it; re-validation fails.
        assert!(node.chain.tx_pool().is_transaction_in_pool(&second.id()));
        node.chain.tx_pool().remove_transaction(&second.id());
        assert!(matches!(
            node.chain.validate_tx(second),
            Err(ChainError::State(_))
        ));
    }

    #[test]
    fn test_pool_scenario_fee_rate_and_removal() {
        let bus = Arc::new(InMemoryEventBus::new());
        let mut events = bus.subscribe(EventFilter::topics(vec![EventTopic::Mempool]));
        let pool = TxPool::new(MempoolConfig::default()).with_event_publisher(bus.clone());
        let tx = Tx::new(TxData {
            version: 1,
            min_time: 7,
            ..TxData::default()
        });

        let desc = pool.add_transaction(tx.clone(), 1000, 1, 5_000_000_000).unwrap();
        assert_eq!(desc.fee_per_kb, 5_000_000_000);
        assert_eq!(desc.height, 1000);
        assert!(pool.is_transaction_in_pool(&tx.id()));
        assert_eq!(events.drain().len(), 1);

        pool.remove_transaction(&tx.id());
        assert!(!pool.is_transaction_in_pool(&tx.id()));
        assert!(pool.get_transaction(&tx.id()).is_none());
    }

    #[test]
    fn test_full_pool_keeps_higher_fee_rate() {
        let pool = TxPool::new(MempoolConfig {
            max_transactions: 2,
            ..MempoolConfig::default()
        });
        let tx = |n: u64| {
            Tx::new(TxData {
                version: 1,
                min_time: n,
                ..TxData::default()
            })
        };

        pool.add_transaction(tx(1), 1, 1, 10).unwrap();
        pool.add_transaction(tx(2), 1, 1, 20).unwrap();
        assert!(matches!(
            pool.add_transaction(tx(3), 1, 1, 5),
            Err(MempoolError::PoolFull { capacity: 2, .. })
        ));

        pool.add_transaction(tx(4), 1, 1, 30).unwrap();
        assert!(!pool.is_transaction_in_pool(&tx(1).id()));
        assert!(pool.is_transaction_in_pool(&tx(4).id()));
        assert_eq!(pool.count(), 2);
    }
}
