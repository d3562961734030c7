//! Example driving three validators through a few DPoS slots
//!
//! Run with `RUST_LOG=debug cargo run --example dpos_demo` to see the
//! consensus core's tracing output.

use anyhow::Context;
use chain_consensus::{quorum_size, ConsensusConfig, Dpos, EndorsementTracker};
use chain_core::{Block, BlockHeader, Keypair, SignedBlock};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    println!("🦀 DPoS Consensus Demo");
    println!("======================");

    let keys: Vec<Keypair> = (1..=3u8)
        .map(|seed| Keypair::from_secret_bytes(&[seed; 32]))
        .collect::<Result<_, _>>()
        .context("deriving validator keys")?;

    let config = ConsensusConfig::new(keys.iter().map(|k| k.public_key().to_hex()).collect());
    let nodes: Vec<Dpos> = keys
        .iter()
        .map(|k| Dpos::from_config(&config, k.public_key()))
        .collect::<Result<_, _>>()?;
    let quorum = quorum_size(keys.len());

    println!("\n1. Roster of {} validators, quorum {}", keys.len(), quorum);
    for (i, key) in keys.iter().enumerate() {
        println!("   V{}: {}", i + 1, key.public_key());
    }

    let tracker = EndorsementTracker::new();
    let epoch_start = config.epoch_length * 100;
    let mut head = BlockHeader {
        timestamp: epoch_start - config.block_interval,
        ..BlockHeader::genesis()
    };

    println!("\n2. Producing blocks...");
    for slot in 0..6 {
        let slot_time = epoch_start + slot * config.block_interval;
        let now = slot_time + 1;

        // Exactly one node is the leader for the slot preceding `now`
        let Some(leader) = nodes.iter().position(|n| n.check_validator(&head, now).is_ok())
        else {
            println!("   slot {}: no leader, skipping", slot_time);
            continue;
        };

        let block = Block::new(&head, slot_time, format!("slot {}", slot).into_bytes(), 0)?;
        let signed = SignedBlock::sign(block, &keys[leader])?;
        let hash = tracker.add_signed_block(signed.clone())?;

        for (i, node) in nodes.iter().enumerate() {
            if i == leader {
                continue;
            }
            // Peers endorse only blocks produced by the scheduled leader
            if node
                .check_block_producer(&head, now, &signed.signer()?)
                .is_ok()
            {
                tracker.add_validator(&hash, keys[i].public_key())?;
            }
        }

        let endorsements = tracker.validator_number(&hash)?;
        if endorsements >= quorum {
            let proposal = tracker.delete_hash(&hash)?;
            head = proposal.into_block().block.header;
            info!(%hash, endorsements, "Block committed");
            println!(
                "   slot {}: V{} produced block #{} ({} endorsements)",
                slot_time,
                leader + 1,
                head.number,
                endorsements
            );
        }
    }

    println!("\n3. Pending proposals left: {}", tracker.len());
    println!("\n✅ Demo completed");
    Ok(())
}
