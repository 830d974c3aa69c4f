//! Chain-indexer protocol seam.
//!
//! The scan engine is written against the [`ChainIndexer`] trait; concrete
//! protocol clients (an Electrum connection in `backend-electrum`) live in
//! their own crates and convert their wire types into the structs here.

mod indexer;
mod structs;

pub use indexer::ChainIndexer;
pub use structs::*;
