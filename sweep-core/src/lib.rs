mod derive;
mod error;
mod indexer;
mod keys;
mod scanner;
mod scripts;
mod sweep;

pub use bitcoin;

pub use derive::{CandidateScript, Descriptor, ScriptIterator};
pub use error::{Error, Result};
pub use indexer::{ChainIndexer, HistoryEntry, UnspentEntry};
pub use keys::{parse_key, MasterKey};
pub use scanner::{KeyScanner, ScanParams, Utxo};
pub use scripts::{output_script_for_address, ScriptType};
pub use sweep::{build_sweep, SweepInput, SweepPlan, DUST_FLOOR, MAX_ADDRESSES};
