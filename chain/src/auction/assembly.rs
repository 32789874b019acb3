//! Block assembly under size and gas limits.
//!
//! Assembles the final transaction list from four inputs: the prefix
//! region, the winning segment, the segment commitment transaction, and
//! the mempool. Prefix and segment transactions are mandatory; running out
//! of room there fails the whole assembly. The mempool then fills whatever
//! room is left, skipping duplicates of already-included transactions.
//!
//! A transaction's size is its canonical byte length; its gas is the
//! declared gas limit of the decoded transaction.

use std::collections::HashSet;

use thiserror::Error;

use crate::types::{sha256, Tx, HASH_LEN};

/// Errors produced during block assembly.
#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("{region}: decode transaction: {err}")]
    Decode { region: &'static str, err: String },
    #[error("{region}: transaction would exceed block size limit ({limit})")]
    SizeExceeded { region: &'static str, limit: i64 },
    #[error("{region}: transaction would exceed block gas limit ({limit})")]
    GasExceeded { region: &'static str, limit: i64 },
}

struct BlockFill {
    max_size: i64,
    max_gas: i64,
    txs: Vec<Vec<u8>>,
    size: i64,
    gas: i64,
    seen: HashSet<[u8; HASH_LEN]>,
}

enum Include {
    Added,
    SizeFull,
    GasFull,
}

impl BlockFill {
    fn new(max_size: i64, max_gas: i64) -> Self {
        Self {
            max_size,
            max_gas,
            txs: Vec::new(),
            size: 0,
            gas: 0,
            seen: HashSet::new(),
        }
    }

    /// Records a transaction's identity; returns `true` if already seen.
    fn observe(&mut self, tx_bytes: &[u8]) -> bool {
        !self.seen.insert(sha256(tx_bytes))
    }

    fn include(&mut self, region: &'static str, tx_bytes: &[u8]) -> Result<Include, AssemblyError> {
        let tx = Tx::decode(tx_bytes).map_err(|e| AssemblyError::Decode {
            region,
            err: e.to_string(),
        })?;

        let size = tx_bytes.len() as i64;
        let gas = tx.gas();

        if self.max_size > 0 && self.size + size > self.max_size {
            return Ok(Include::SizeFull);
        }
        if self.max_gas > 0 && self.gas + gas > self.max_gas {
            return Ok(Include::GasFull);
        }

        self.txs.push(tx_bytes.to_vec());
        self.size += size;
        self.gas += gas;
        Ok(Include::Added)
    }

    fn include_required(
        &mut self,
        region: &'static str,
        tx_bytes: &[u8],
    ) -> Result<(), AssemblyError> {
        match self.include(region, tx_bytes)? {
            Include::Added => Ok(()),
            Include::SizeFull => Err(AssemblyError::SizeExceeded {
                region,
                limit: self.max_size,
            }),
            Include::GasFull => Err(AssemblyError::GasExceeded {
                region,
                limit: self.max_gas,
            }),
        }
    }
}

/// Builds the block transaction list.
///
/// On success, the segment commitment transaction sits at index
/// `prefix_txs.len() + segment_txs.len()`, and every returned byte slice
/// is unique.
pub fn block_transactions(
    max_size: i64,
    max_gas: i64,
    prefix_txs: &[Vec<u8>],
    segment_txs: &[Vec<u8>],
    segment_commitment_tx: &[u8],
    mempool_txs: &[Vec<u8>],
) -> Result<Vec<Vec<u8>>, AssemblyError> {
    let mut fill = BlockFill::new(max_size, max_gas);

    for tx_bytes in prefix_txs {
        fill.observe(tx_bytes);
        fill.include_required("prefix", tx_bytes)?;
    }

    tracing::debug!(size = fill.size, gas = fill.gas, "filled prefix txs");

    for tx_bytes in segment_txs.iter().map(Vec::as_slice).chain([segment_commitment_tx]) {
        fill.observe(tx_bytes);
        fill.include_required("segment", tx_bytes)?;
    }

    tracing::debug!(size = fill.size, gas = fill.gas, "filled segment txs");

    for tx_bytes in mempool_txs {
        if fill.observe(tx_bytes) {
            continue; // don't include transactions we already have
        }

        match fill.include("mempool", tx_bytes)? {
            Include::Added => {}
            Include::SizeFull | Include::GasFull => break, // block is full
        }
    }

    tracing::debug!(size = fill.size, gas = fill.gas, "filled mempool txs");

    Ok(fill.txs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Coin, Key, Msg, MsgEditBuilder, TxBody};

    /// Builds a signed tx with the given gas limit; `tag` makes the bytes
    /// unique across calls.
    fn tx_with_gas(key: &Key, gas: u64, tag: &str) -> Vec<u8> {
        let body = TxBody {
            messages: vec![Msg::EditBuilder(MsgEditBuilder {
                address: key.address.clone(),
                moniker: tag.to_string(),
                builder_api_version: "v0".to_string(),
                builder_api_url: "http://b".to_string(),
                security_contact: "s@b".to_string(),
            })],
            memo: String::new(),
        };

        Tx::sign(key, "auction-99", body, 0, 0, gas, vec![Coin::new(1, "stake")])
            .expect("sign")
            .to_bytes()
            .expect("encode")
    }

    fn total_size(txs: &[&[u8]]) -> i64 {
        txs.iter().map(|t| t.len() as i64).sum()
    }

    #[test]
    fn mempool_fill_stops_at_gas_limit_without_error() {
        let key = Key::generate();

        // Segment + commitment total 6000 gas; each mempool tx declares
        // 3000 gas under a 10000-gas budget, so exactly one mempool tx
        // fits (9000 gas; the next would cross the limit).
        let segment = vec![tx_with_gas(&key, 2000, "s1"), tx_with_gas(&key, 2000, "s2")];
        let commitment_tx = tx_with_gas(&key, 2000, "commit");
        let mempool = vec![
            tx_with_gas(&key, 3000, "m1"),
            tx_with_gas(&key, 3000, "m2"),
            tx_with_gas(&key, 3000, "m3"),
        ];

        let block = block_transactions(0, 10_000, &[], &segment, &commitment_tx, &mempool)
            .expect("assembly succeeds");

        assert_eq!(block.len(), 4);
        assert_eq!(block[2], commitment_tx);
        assert_eq!(block[3], mempool[0]);
    }

    #[test]
    fn mempool_fill_stops_at_size_limit_without_error() {
        let key = Key::generate();

        let segment = vec![tx_with_gas(&key, 100, "s1")];
        let commitment_tx = tx_with_gas(&key, 100, "commit");
        let mempool = vec![tx_with_gas(&key, 100, "m1"), tx_with_gas(&key, 100, "m2")];

        // Budget fits segment, commitment, and exactly one mempool tx.
        let max_size = total_size(&[&segment[0], &commitment_tx, &mempool[0]]);

        let block = block_transactions(max_size, 0, &[], &segment, &commitment_tx, &mempool)
            .expect("assembly succeeds");

        assert_eq!(block.len(), 3);
        assert_eq!(block[2], mempool[0]);
    }

    #[test]
    fn commitment_tx_lands_right_after_segment() {
        let key = Key::generate();
        let prefix = vec![tx_with_gas(&key, 100, "p1")];
        let segment = vec![tx_with_gas(&key, 100, "s1"), tx_with_gas(&key, 100, "s2")];
        let commitment_tx = tx_with_gas(&key, 100, "commit");

        let block = block_transactions(0, 0, &prefix, &segment, &commitment_tx, &[])
            .expect("assembly succeeds");

        assert_eq!(block.len(), 4);
        assert_eq!(block[prefix.len() + segment.len()], commitment_tx);
    }

    #[test]
    fn oversized_segment_is_fatal() {
        let key = Key::generate();
        let segment = vec![tx_with_gas(&key, 100, "s1"), tx_with_gas(&key, 100, "s2")];
        let commitment_tx = tx_with_gas(&key, 100, "commit");

        // Room for the segment but not the commitment transaction.
        let max_size = total_size(&[&segment[0], &segment[1]]);

        let err =
            block_transactions(max_size, 0, &[], &segment, &commitment_tx, &[]).unwrap_err();
        assert!(matches!(err, AssemblyError::SizeExceeded { region: "segment", .. }));
    }

    #[test]
    fn oversized_prefix_is_fatal() {
        let key = Key::generate();
        let prefix = vec![tx_with_gas(&key, 100, "p1")];
        let commitment_tx = tx_with_gas(&key, 100, "commit");

        let err = block_transactions(10, 0, &prefix, &[], &commitment_tx, &[]).unwrap_err();
        assert!(matches!(err, AssemblyError::SizeExceeded { region: "prefix", .. }));
    }

    #[test]
    fn gas_exhaustion_in_segment_is_fatal() {
        let key = Key::generate();
        let segment = vec![tx_with_gas(&key, 6000, "s1")];
        let commitment_tx = tx_with_gas(&key, 6000, "commit");

        let err = block_transactions(0, 10_000, &[], &segment, &commitment_tx, &[]).unwrap_err();
        assert!(matches!(err, AssemblyError::GasExceeded { region: "segment", .. }));
    }

    #[test]
    fn mempool_duplicates_are_skipped() {
        let key = Key::generate();
        let segment = vec![tx_with_gas(&key, 100, "s1")];
        let commitment_tx = tx_with_gas(&key, 100, "commit");
        let mempool = vec![segment[0].clone(), tx_with_gas(&key, 100, "m1")];

        let block = block_transactions(0, 0, &[], &segment, &commitment_tx, &mempool)
            .expect("assembly succeeds");

        assert_eq!(block.len(), 3);

        // Every byte slice in the result is unique.
        let mut seen = std::collections::HashSet::new();
        for tx in &block {
            assert!(seen.insert(tx.clone()), "duplicate tx in assembled block");
        }
    }

    #[test]
    fn undecodable_mempool_tx_is_fatal() {
        let key = Key::generate();
        let commitment_tx = tx_with_gas(&key, 100, "commit");
        let mempool = vec![b"garbage".to_vec()];

        let err = block_transactions(0, 0, &[], &[], &commitment_tx, &mempool).unwrap_err();
        assert!(matches!(err, AssemblyError::Decode { region: "mempool", .. }));
    }
}
