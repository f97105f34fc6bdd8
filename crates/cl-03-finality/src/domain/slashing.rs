//! # Slashing Conditions
//!
//! 1. No double vote: two distinct targets at the same height.
//! 2. No surround vote: a span `[source, target]` strictly inside or around
//!    another span by the same key.
//!
//! Both checks return the earlier conflicting vote as evidence.

use super::checkpoint::{Checkpoint, SupLink};
use super::tree::CheckpointTree;
use super::verification::Verification;

pub fn find_same_height_vote(tree: &CheckpointTree, v: &Verification) -> Option<Verification> {
    tree.iter()
        .filter(|(_, cp)| cp.height == v.target_height && cp.hash != v.target_hash)
        .find_map(|(_, cp)| signed_link(cp, v).map(|link| evidence(cp, link, v)))
}

pub fn find_span_vote(tree: &CheckpointTree, v: &Verification) -> Option<Verification> {
    tree.iter()
        .filter(|(_, cp)| cp.height != v.target_height)
        .find_map(|(_, cp)| {
            cp.sup_links
                .iter()
                .filter(|link| link.signatures.contains_key(&v.pub_key))
                .find(|link| {
                    let inside = cp.height < v.target_height && link.source_height > v.source_height;
                    let around = cp.height > v.target_height && link.source_height < v.source_height;
                    inside || around
                })
                .map(|link| evidence(cp, link, v))
        })
}

fn signed_link<'a>(cp: &'a Checkpoint, v: &Verification) -> Option<&'a SupLink> {
    cp.sup_links
        .iter()
        .find(|link| link.signatures.contains_key(&v.pub_key))
}

fn evidence(cp: &Checkpoint, link: &SupLink, v: &Verification) -> Verification {
    Verification {
        source_height: link.source_height,
        source_hash: link.source_hash,
        target_height: cp.height,
        target_hash: cp.hash,
        pub_key: v.pub_key,
        signature: link.signatures.get(&v.pub_key).cloned().unwrap_or_default(),
    }
}
