//! # Reorganization and the Transaction Pool
//!
//! When the main chain switches branches, transactions confirmed only on
//! the abandoned branch return to the pool, transactions confirmed on the
//! new branch leave it, and spends that no longer have a source are
//! dropped.

#[cfg(test)]
mod tests {
    use cl_06_chain::{ChainError, ChainQueries};
    use shared_bus::{EventTopic, LedgerEvent};

    use crate::integration::support::{spend, Node};

    #[tokio::test]
    async fn test_fork_switch_moves_transactions_between_pool_and_chain() {
        let node = Node::start(&[1], None);
        let mut events = node.subscribe(vec![EventTopic::Chain]);
        let main = node.extend(&node.genesis.header, 6, 1).await;
        let genesis_cb = &node.genesis.transactions[0];

        let a = spend(genesis_cb, 0, 900);
        let b = spend(genesis_cb, 1, 900);
        let c = spend(&main[0].transactions[0], 0, 900);
        node.chain.validate_tx(c.clone()).unwrap();

        let main7 = node.child(&main[5].header, 1, vec![a.clone(), b.clone()]);
        node.submit(&main7).await;
        assert_eq!(node.chain.best_block_hash(), main7.hash());
        assert!(node.chain.tx_pool().is_transaction_in_pool(&c.id()));

        let fork7 = node.child(&main[5].header, 2, vec![b.clone(), c.clone()]);
        node.submit(&fork7).await;
        let fork8 = node.child(&fork7.header, 2, Vec::new());
        node.submit(&fork8).await;

        assert_eq!(node.chain.best_block_hash(), fork8.hash());
        assert!(!node.chain.in_main_chain(&main7.hash()));
        assert_eq!(node.chain.get_block_by_height(7).unwrap(), fork7);

        let pool = node.chain.tx_pool();
        assert!(pool.is_transaction_in_pool(&a.id()));
        assert!(!pool.is_transaction_in_pool(&b.id()));
        assert!(!pool.is_transaction_in_pool(&c.id()));
        assert_eq!(pool.count(), 1);
        assert_eq!(pool.get_transaction(&a.id()).unwrap().fee, 100);

        // B is spent on the new branch.
        assert!(matches!(
            node.chain.validate_tx(spend(genesis_cb, 1, 800)),
            Err(ChainError::State(_))
        ));

        let fork_heights: Vec<u64> = events
            .drain()
            .into_iter()
            .filter_map(|e| match e {
                LedgerEvent::ChainReorganized { fork_height, .. } => Some(fork_height),
                _ => None,
            })
            .collect();
        assert_eq!(fork_heights.last(), Some(&6));
    }

    #[tokio::test]
    async fn test_spend_of_abandoned_output_is_not_restored() {
        let node = Node::start(&[1], None);
        let main = node.extend(&node.genesis.header, 6, 1).await;
        let parent_tx = spend(&node.genesis.transactions[0], 0, 900);
        let child_tx = spend(&parent_tx, 0, 800);

        let main7 = node.child(&main[5].header, 1, vec![parent_tx.clone()]);
        node.submit(&main7).await;
        let main8 = node.child(&main7.header, 1, vec![child_tx.clone()]);
        node.submit(&main8).await;

        let fork = node.extend(&main[5].header, 3, 2).await;
        assert_eq!(node.chain.best_block_hash(), fork[2].hash());

        let pool = node.chain.tx_pool();
        assert!(pool.is_transaction_in_pool(&parent_tx.id()));
        // Its input only exists once the parent confirms again.
        assert!(!pool.is_transaction_in_pool(&child_tx.id()));
        assert!(!pool.is_transaction_in_err_cache(&child_tx.id()));
    }

    #[tokio::test]
    async fn test_coinbase_of_detached_block_is_not_restored() {
        let node = Node::start(&[1], None);
        let main = node.extend(&node.genesis.header, 2, 1).await;
        let fork = node.extend(&node.genesis.header, 3, 2).await;

        assert_eq!(node.chain.best_block_hash(), fork[2].hash());
        let pool = node.chain.tx_pool();
        assert_eq!(pool.count(), 0);
        assert!(!pool.is_transaction_in_pool(&main[1].transactions[0].id()));
    }
}
