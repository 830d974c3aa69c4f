use bitcoin::{Script, ScriptBuf};

use super::{HistoryEntry, UnspentEntry};
use crate::error::Result;

/// Remote chain-index connection, keyed by output script.
///
/// The batched variants are array-in/array-out and order-preserving: the
/// n-th reply answers the n-th script. Batching groups round trips and
/// must never change any individual result relative to the single-script
/// calls.
#[async_trait::async_trait]
pub trait ChainIndexer: Send + Sync {
    /// Transaction history of one script.
    async fn script_history(&self, script: &Script) -> Result<Vec<HistoryEntry>>;

    /// Transaction histories of several scripts in one round trip.
    async fn script_history_batch(&self, scripts: &[ScriptBuf]) -> Result<Vec<Vec<HistoryEntry>>>;

    /// Unspent outputs locked to one script.
    async fn script_unspent(&self, script: &Script) -> Result<Vec<UnspentEntry>>;

    /// Unspent outputs of several scripts in one round trip.
    async fn script_unspent_batch(&self, scripts: &[ScriptBuf]) -> Result<Vec<Vec<UnspentEntry>>>;
}
