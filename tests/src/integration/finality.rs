//! # Finality Through the Chain
//!
//! Votes produced by the local validator or delivered from peers justify
//! and finalize checkpoints, steer fork choice, and expose equivocating
//! validators.

#[cfg(test)]
mod tests {
    use cl_03_finality::{CheckpointStatus, FinalityError, Verification};
    use cl_06_chain::{ChainError, ChainQueries};
    use shared_bus::{EventTopic, LedgerEvent};
    use shared_crypto::verify_signature;

    use crate::integration::support::{pk, vote, Node};

    #[tokio::test]
    async fn test_local_validator_finalizes_each_epoch() {
        let node = Node::start(&[1], Some(1));
        let mut events = node.subscribe(vec![EventTopic::Finality]);
        let blocks = node.extend(&node.genesis.header, 10, 1).await;

        let casper = node.chain.casper();
        assert_eq!(casper.last_finalized(), (5, blocks[4].hash()));
        assert_eq!(casper.last_justified(), (10, blocks[9].hash()));

        let mut targets = Vec::new();
        let mut finalized = Vec::new();
        for event in events.drain() {
            match event {
                LedgerEvent::BlockVerification {
                    source_height,
                    source_hash,
                    target_height,
                    target_hash,
                    pub_key,
                    signature,
                } => {
                    assert_eq!(pub_key, pk(1));
                    let message = Verification::new(
                        (source_height, source_hash),
                        (target_height, target_hash),
                        pub_key,
                    )
                    .message();
                    verify_signature(&pub_key, &message, &signature).unwrap();
                    targets.push(target_height);
                }
                LedgerEvent::CheckpointFinalized { height, .. } => finalized.push(height),
                other => panic!("unexpected event {other:?}"),
            }
        }
        assert_eq!(targets, vec![5, 10]);
        assert_eq!(finalized, vec![0, 5]);
    }

    #[tokio::test]
    async fn test_remote_vote_completes_supermajority() {
        let node = Node::start(&[1, 2], Some(1));
        let mut events = node.subscribe(vec![EventTopic::Finality]);
        let blocks = node.extend(&node.genesis.header, 5, 1).await;
        let target = &blocks[4];

        let casper = node.chain.casper();
        assert_eq!(
            casper.checkpoint_status(&target.hash()),
            Some(CheckpointStatus::Unjustified)
        );
        assert_eq!(casper.last_justified(), (0, node.genesis.hash()));

        node.chain
            .auth_verification(&vote(2, &node.genesis, target))
            .unwrap();

        assert_eq!(
            casper.checkpoint_status(&target.hash()),
            Some(CheckpointStatus::Justified)
        );
        assert_eq!(casper.last_finalized(), (0, node.genesis.hash()));
        assert!(events
            .drain()
            .contains(&LedgerEvent::CheckpointFinalized {
                height: 0,
                hash: node.genesis.hash()
            }));
    }

    #[tokio::test]
    async fn test_justified_branch_beats_longer_branch() {
        let node = Node::start(&[1], None);
        let main = node.extend(&node.genesis.header, 7, 1).await;
        let fork = node.extend(&node.genesis.header, 5, 2).await;
        assert_eq!(node.chain.best_block_hash(), main[6].hash());

        node.chain
            .auth_verification(&vote(1, &node.genesis, &fork[4]))
            .unwrap();
        node.wait_for_best(&fork[4].hash()).await;

        assert!(fork.iter().all(|b| node.chain.in_main_chain(&b.hash())));
        assert!(!node.chain.in_main_chain(&main[6].hash()));
        assert_eq!(node.chain.casper().last_justified(), (5, fork[4].hash()));

        // Growing the unjustified branch no longer moves the best block.
        let main8 = node.child(&main[6].header, 1, Vec::new());
        node.submit(&main8).await;
        assert_eq!(node.chain.best_block_hash(), fork[4].hash());
        assert!(node.chain.block_exist(&main8.hash()));
    }

    #[tokio::test]
    async fn test_same_height_double_vote_recorded_as_evidence() {
        let node = Node::start(&[1, 2, 3], None);
        let main = node.extend(&node.genesis.header, 5, 1).await;
        let fork = node.extend(&node.genesis.header, 5, 2).await;

        node.chain
            .auth_verification(&vote(1, &node.genesis, &main[4]))
            .unwrap();
        let result = node
            .chain
            .auth_verification(&vote(1, &node.genesis, &fork[4]));
        assert!(matches!(
            result,
            Err(ChainError::Finality(FinalityError::SameHeightInVerification(_)))
        ));

        let evil = node.chain.casper().evil_validators();
        assert_eq!(evil[&pk(1)].len(), 2);
        assert!(!evil.contains_key(&pk(2)));
    }

    #[tokio::test]
    async fn test_vote_from_outside_federation_rejected() {
        let node = Node::start(&[1], None);
        let blocks = node.extend(&node.genesis.header, 5, 1).await;

        let result = node
            .chain
            .auth_verification(&vote(9, &node.genesis, &blocks[4]));
        assert!(matches!(result, Err(ChainError::Finality(_))));
        assert_eq!(
            node.chain.casper().checkpoint_status(&blocks[4].hash()),
            Some(CheckpointStatus::Unjustified)
        );
    }
}
