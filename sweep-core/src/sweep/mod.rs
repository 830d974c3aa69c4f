//! Sweep transaction assembly and signing.

mod builder;

pub use builder::{build_sweep, SweepInput, SweepPlan, DUST_FLOOR, MAX_ADDRESSES};
