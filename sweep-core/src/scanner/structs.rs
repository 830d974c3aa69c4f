use bitcoin::bip32::DerivationPath;
use bitcoin::{Amount, OutPoint};
use serde::{Deserialize, Serialize};

use crate::scripts::ScriptType;

/// Scan context, passed by value into the engine. No process-wide knobs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScanParams {
    /// Consecutive empty addresses tolerated before a descriptor stops.
    pub address_gap: u32,
    /// Consecutive empty accounts tolerated before account expansion stops.
    pub account_gap: u32,
    /// Group script probes into batched round trips.
    pub should_batch: bool,
}

impl Default for ScanParams {
    fn default() -> Self {
        Self {
            address_gap: 20,
            account_gap: 0,
            should_batch: true,
        }
    }
}

/// Discovered unspent output, annotated with how it was derived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    pub outpoint: OutPoint,
    #[serde(with = "bitcoin::amount::serde::as_sat")]
    pub amount: Amount,
    pub script_type: ScriptType,
    pub path: DerivationPath,
    pub address: String,
}
