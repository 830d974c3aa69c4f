//! Candidate script derivation.
//!
//! One [`Descriptor`] per address family and account, each with its own
//! cursor and gap counters; the [`ScriptIterator`] round-robins over them
//! and owns them for the lifetime of a single scan.

mod descriptor;
mod iterator;

pub use descriptor::{CandidateScript, Descriptor};
pub use iterator::ScriptIterator;
