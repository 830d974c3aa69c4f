use bitcoin::{Amount, ScriptBuf};
use log::{debug, info};

use super::{ScanParams, Utxo};
use crate::derive::{CandidateScript, ScriptIterator};
use crate::error::Result;
use crate::indexer::{ChainIndexer, UnspentEntry};
use crate::keys::MasterKey;

/// Upper bound on scripts grouped into one batched round trip.
const BATCH_WIDTH: usize = 100;

/// Gap-limit scan of one master key over every supported address family.
///
/// The batched and sequential paths return the same result set for the
/// same chain state; batching only changes how probes are grouped into
/// round trips.
pub struct KeyScanner<'a, C: ChainIndexer + ?Sized> {
    indexer: &'a C,
    master: &'a MasterKey,
    params: ScanParams,
}

impl<'a, C: ChainIndexer + ?Sized> KeyScanner<'a, C> {
    pub fn new(indexer: &'a C, master: &'a MasterKey, params: ScanParams) -> Self {
        Self {
            indexer,
            master,
            params,
        }
    }

    /// Probe candidate scripts until every descriptor runs past its gap
    /// limit, collecting the unspent outputs of the funded ones.
    ///
    /// Any indexer failure aborts the whole scan; partial results are
    /// never returned.
    pub async fn scan(&self) -> Result<Vec<Utxo>> {
        info!(
            "scan start: address gap {}, account gap {}, batching {}",
            self.params.address_gap, self.params.account_gap, self.params.should_batch
        );
        let mut iterator =
            ScriptIterator::new(self.master, self.params.address_gap, self.params.account_gap);

        let utxos = if self.params.should_batch {
            self.scan_batched(&mut iterator).await?
        } else {
            self.scan_sequential(&mut iterator).await?
        };

        let balance: Amount = utxos.iter().map(|utxo| utxo.amount).sum();
        info!(
            "scan finished: {} scripts probed, {} utxos, balance {}",
            iterator.total_scripts(),
            utxos.len(),
            balance
        );
        Ok(utxos)
    }

    async fn scan_sequential(&self, iterator: &mut ScriptIterator<'_>) -> Result<Vec<Utxo>> {
        let mut utxos = Vec::new();
        while let Some(candidate) = iterator.next_script()? {
            let history = self.indexer.script_history(&candidate.script).await?;
            let funded = !history.is_empty();
            iterator.record_outcome(candidate.descriptor, funded);
            if funded {
                debug!("history at {} ({:?})", candidate.address, candidate.script_type);
                let unspent = self.indexer.script_unspent(&candidate.script).await?;
                collect_utxos(&mut utxos, &candidate, unspent);
            }
        }
        Ok(utxos)
    }

    async fn scan_batched(&self, iterator: &mut ScriptIterator<'_>) -> Result<Vec<Utxo>> {
        let mut utxos = Vec::new();
        loop {
            // drain candidates without blocking on the network
            let mut pending = Vec::with_capacity(BATCH_WIDTH);
            while pending.len() < BATCH_WIDTH {
                match iterator.next_script()? {
                    Some(candidate) => pending.push(candidate),
                    None => break,
                }
            }
            if pending.is_empty() {
                break;
            }

            let scripts: Vec<ScriptBuf> =
                pending.iter().map(|candidate| candidate.script.clone()).collect();
            let histories = self.indexer.script_history_batch(&scripts).await?;

            // replies answer requests in order; feed each descriptor its
            // outcomes in that same order
            let mut funded: Vec<&CandidateScript> = Vec::new();
            for (candidate, history) in pending.iter().zip(&histories) {
                let has_history = !history.is_empty();
                if iterator.record_outcome(candidate.descriptor, has_history) && has_history {
                    funded.push(candidate);
                }
            }

            if funded.is_empty() {
                continue;
            }
            let funded_scripts: Vec<ScriptBuf> =
                funded.iter().map(|candidate| candidate.script.clone()).collect();
            let unspent_lists = self.indexer.script_unspent_batch(&funded_scripts).await?;
            for (candidate, unspent) in funded.iter().copied().zip(unspent_lists) {
                debug!("history at {} ({:?})", candidate.address, candidate.script_type);
                collect_utxos(&mut utxos, candidate, unspent);
            }
        }
        Ok(utxos)
    }
}

fn collect_utxos(utxos: &mut Vec<Utxo>, candidate: &CandidateScript, unspent: Vec<UnspentEntry>) {
    for entry in unspent {
        utxos.push(Utxo {
            outpoint: entry.outpoint,
            amount: entry.value,
            script_type: candidate.script_type,
            path: candidate.path.clone(),
            address: candidate.address.clone(),
        });
    }
}
