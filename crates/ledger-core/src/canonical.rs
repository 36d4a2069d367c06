//! Canonical digest input for blocks.
//!
//! Peers hash the JSON object `{hash, index, previous_hash, proof, timestamp,
//! transactions}` with sorted keys, `", "`/`": "` separators and ASCII-only
//! string escapes, with `hash` fixed at `null`. Producing the same bytes here
//! keeps digests comparable across every node in the network.

use crate::error::CanonicalError;
use crate::{Block, PreviousHash, Transaction};
use serde::Serialize;
use serde_json::ser::Formatter;
use sha2::{Digest, Sha256};
use std::io;

// Field order is the sorted key order.
#[derive(Serialize)]
struct BlockView<'a> {
    hash: Option<&'a str>,
    index: u64,
    previous_hash: &'a PreviousHash,
    proof: u64,
    timestamp: f64,
    transactions: Vec<TransactionView<'a>>,
}

#[derive(Serialize)]
struct TransactionView<'a> {
    amount: i64,
    destination: &'a str,
    origin: &'a str,
    time: f64,
}

impl<'a> From<&'a Transaction> for TransactionView<'a> {
    fn from(tx: &'a Transaction) -> Self {
        Self {
            amount: tx.amount,
            destination: &tx.destination,
            origin: &tx.origin,
            time: tx.time,
        }
    }
}

/// Separators and string escaping of a sorted-key, ASCII-only JSON dump.
struct SpacedAsciiFormatter;

impl Formatter for SpacedAsciiFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }

    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut start = 0;
        for (pos, ch) in fragment.char_indices() {
            if (' '..='~').contains(&ch) {
                continue;
            }
            writer.write_all(&fragment.as_bytes()[start..pos])?;
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                write!(writer, "\\u{unit:04x}")?;
            }
            start = pos + ch.len_utf8();
        }
        writer.write_all(&fragment.as_bytes()[start..])
    }
}

fn ensure_finite(value: f64, field: &'static str) -> Result<(), CanonicalError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(CanonicalError::NonFinite { field })
    }
}

/// Bytes hashed to produce the digest of `block` at the given `proof`.
pub fn digest_input(block: &Block, proof: u64) -> Result<Vec<u8>, CanonicalError> {
    ensure_finite(block.timestamp, "timestamp")?;
    for tx in &block.transactions {
        ensure_finite(tx.time, "time")?;
    }

    let view = BlockView {
        hash: None,
        index: block.index,
        previous_hash: &block.previous_hash,
        proof,
        timestamp: block.timestamp,
        transactions: block.transactions.iter().map(TransactionView::from).collect(),
    };

    let mut out = Vec::with_capacity(128 + 96 * block.transactions.len());
    let mut ser = serde_json::Serializer::with_formatter(&mut out, SpacedAsciiFormatter);
    view.serialize(&mut ser)
        .map_err(|e| CanonicalError::Encode(e.to_string()))?;
    Ok(out)
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
