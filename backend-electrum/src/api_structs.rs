//! Serde models for the Electrum JSON-RPC replies we consume.

use serde::Deserialize;
use sweep_core::bitcoin::{Amount, OutPoint, Txid};
use sweep_core::{HistoryEntry, UnspentEntry};

/// One entry of a `blockchain.scripthash.get_history` reply.
#[derive(Debug, Clone, Deserialize)]
pub struct GetHistoryResult {
    pub tx_hash: Txid,
    pub height: i32,
}

impl From<GetHistoryResult> for HistoryEntry {
    fn from(result: GetHistoryResult) -> Self {
        HistoryEntry {
            txid: result.tx_hash,
            height: result.height,
        }
    }
}

/// One entry of a `blockchain.scripthash.listunspent` reply.
#[derive(Debug, Clone, Deserialize)]
pub struct ListUnspentResult {
    pub tx_hash: Txid,
    pub tx_pos: u32,
    pub height: u32,
    pub value: u64,
}

impl From<ListUnspentResult> for UnspentEntry {
    fn from(result: ListUnspentResult) -> Self {
        UnspentEntry {
            outpoint: OutPoint {
                txid: result.tx_hash,
                vout: result.tx_pos,
            },
            value: Amount::from_sat(result.value),
            height: result.height,
        }
    }
}
