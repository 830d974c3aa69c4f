//! Gap-limit scanning engine.
//!
//! Turns a master key into candidate scripts (via [`crate::ScriptIterator`]),
//! probes them against a [`crate::ChainIndexer`] and accumulates the unspent
//! outputs of every funded script.

mod scanner;
mod structs;

pub use scanner::KeyScanner;
pub use structs::{ScanParams, Utxo};
