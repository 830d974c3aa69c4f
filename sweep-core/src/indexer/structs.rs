use bitcoin::{Amount, OutPoint, Txid};
use serde::{Deserialize, Serialize};

/// One transaction touching a script, confirmed or not.
///
/// Height follows the Electrum convention: positive for confirmed, zero
/// for mempool, negative for mempool with unconfirmed parents. Any entry
/// at all counts as history for the gap-limit policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub txid: Txid,
    pub height: i32,
}

/// One unspent output locked to a script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnspentEntry {
    pub outpoint: OutPoint,
    #[serde(with = "bitcoin::amount::serde::as_sat")]
    pub value: Amount,
    pub height: u32,
}
