//! # Out-of-Order Delivery
//!
//! Blocks that arrive before their parents are buffered and connected as
//! soon as the gap closes, without being submitted again.

#[cfg(test)]
mod tests {
    use cl_06_chain::ChainQueries;
    use shared_bus::{EventTopic, LedgerEvent};

    use crate::integration::support::Node;

    fn last_reorg(events: Vec<LedgerEvent>) -> Option<shared_types::Hash> {
        events
            .into_iter()
            .filter_map(|e| match e {
                LedgerEvent::ChainReorganized { new_best, .. } => Some(new_best),
                _ => None,
            })
            .last()
    }

    #[tokio::test]
    async fn test_reverse_delivery_connects_whole_chain() {
        let node = Node::start(&[1], None);
        let mut events = node.subscribe(vec![EventTopic::Chain]);
        let blocks = node.branch(&node.genesis.header, 12, 1);

        for block in blocks[1..].iter().rev() {
            assert!(node.chain.process_block(block.clone()).await.unwrap());
        }
        assert_eq!(node.chain.orphan_count(), 11);
        assert_eq!(node.chain.best_block_height(), 0);
        assert!(events.drain().is_empty());

        node.submit(&blocks[0]).await;

        assert_eq!(node.chain.orphan_count(), 0);
        assert_eq!(node.chain.best_block_hash(), blocks[11].hash());
        assert!(blocks.iter().all(|b| node.chain.in_main_chain(&b.hash())));
        // The buffered descendants join as a branch, not one block at a time.
        assert_eq!(last_reorg(events.drain()), Some(blocks[11].hash()));
    }

    #[tokio::test]
    async fn test_siblings_waiting_on_same_parent() {
        let node = Node::start(&[1], None);
        let parent = node.child(&node.genesis.header, 1, Vec::new());
        let left = node.branch(&parent.header, 2, 2);
        let right = node.branch(&parent.header, 3, 3);

        for block in left.iter().chain(right.iter()) {
            assert!(node.chain.process_block(block.clone()).await.unwrap());
        }
        assert_eq!(node.chain.orphan_count(), 5);

        node.submit(&parent).await;

        assert_eq!(node.chain.orphan_count(), 0);
        assert!(left.iter().chain(right.iter()).all(|b| node.chain.block_exist(&b.hash())));
        assert_eq!(node.chain.best_block_hash(), right[2].hash());
        assert!(!node.chain.in_main_chain(&left[1].hash()));
    }

    #[tokio::test]
    async fn test_duplicate_orphan_is_reported_once_buffered() {
        let node = Node::start(&[1], None);
        let blocks = node.branch(&node.genesis.header, 2, 1);

        assert!(node.chain.process_block(blocks[1].clone()).await.unwrap());
        assert!(node.chain.process_block(blocks[1].clone()).await.unwrap());
        assert_eq!(node.chain.orphan_count(), 1);

        node.submit(&blocks[0]).await;
        assert_eq!(node.chain.best_block_hash(), blocks[1].hash());
    }
}
