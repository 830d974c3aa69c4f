use std::collections::HashMap;

use bitcoin::secp256k1::{All, Secp256k1};

use super::{CandidateScript, Descriptor};
use crate::error::Result;
use crate::keys::MasterKey;
use crate::scripts::ScriptType;

/// Round-robin source of candidate scripts over a set of descriptors.
///
/// Owns its descriptors outright; one iterator serves exactly one scan and
/// is discarded with it. Serving order is round-robin with one bias: a
/// descriptor that just reported history is served again before rotating,
/// since nearby indices are likelier to also hold funds.
pub struct ScriptIterator<'a> {
    master: &'a MasterKey,
    secp: Secp256k1<All>,
    descriptors: Vec<Descriptor>,
    cursor: usize,
    last_served: Option<usize>,
    address_gap: u32,
    account_gap: u32,
    account_empty_streak: HashMap<ScriptType, u32>,
}

impl<'a> ScriptIterator<'a> {
    /// One descriptor per address family, all at account 0.
    pub fn new(master: &'a MasterKey, address_gap: u32, account_gap: u32) -> Self {
        let descriptors = ScriptType::ALL
            .iter()
            .map(|&script_type| Descriptor::new(script_type, 0, address_gap))
            .collect();
        Self {
            master,
            secp: Secp256k1::new(),
            descriptors,
            cursor: 0,
            last_served: None,
            address_gap,
            account_gap,
            account_empty_streak: HashMap::new(),
        }
    }

    /// Next candidate script, or `None` once every descriptor is exhausted.
    pub fn next_script(&mut self) -> Result<Option<CandidateScript>> {
        let mut skipped = 0;
        while skipped < self.descriptors.len() {
            match self.next_descriptor_script()? {
                Some(candidate) => return Ok(Some(candidate)),
                None => skipped += 1,
            }
        }
        Ok(None)
    }

    /// Scan-engine feedback for a candidate previously served.
    ///
    /// Returns whether the outcome was accepted. A batched probe can outrun
    /// the gap limit; outcomes arriving for an already-exhausted descriptor
    /// are dropped, so batching can never change the result set.
    pub fn record_outcome(&mut self, descriptor: usize, has_history: bool) -> bool {
        if self.descriptors[descriptor].is_exhausted() {
            return false;
        }
        self.descriptors[descriptor].record_outcome(has_history);
        if self.descriptors[descriptor].is_exhausted() {
            self.expand_account(descriptor);
        }
        true
    }

    /// Total scripts generated so far, for progress reporting only.
    pub fn total_scripts(&self) -> u32 {
        self.descriptors.iter().map(Descriptor::total_scripts).sum()
    }

    fn next_descriptor_script(&mut self) -> Result<Option<CandidateScript>> {
        // continuation bias: stay on the descriptor that just found history
        if let Some(last) = self.last_served {
            if self.descriptors[last].has_priority_scripts() {
                if let Some(candidate) = self.descriptor_script(last)? {
                    return Ok(Some(candidate));
                }
            }
        }

        let index = self.cursor;
        self.last_served = Some(index);
        let candidate = self.descriptor_script(index)?;
        self.cursor += 1;
        if self.cursor >= self.descriptors.len() {
            self.cursor = 0;
        }
        Ok(candidate)
    }

    fn descriptor_script(&mut self, index: usize) -> Result<Option<CandidateScript>> {
        match self.descriptors[index].next_script(self.master, &self.secp)? {
            Some(mut candidate) => {
                candidate.descriptor = index;
                Ok(Some(candidate))
            }
            None => Ok(None),
        }
    }

    // Mirror of the address gap one level up: exhausting an account with no
    // funds lengthens the account empty streak, finding funds resets it, and
    // the next account is opened only while the streak is short of the gap.
    fn expand_account(&mut self, descriptor: usize) {
        let script_type = self.descriptors[descriptor].script_type();
        let account = self.descriptors[descriptor].account_index();
        let streak = self.account_empty_streak.entry(script_type).or_insert(0);
        if self.descriptors[descriptor].found_funds() {
            *streak = 0;
        } else {
            *streak += 1;
        }
        if *streak < self.account_gap {
            self.descriptors
                .push(Descriptor::new(script_type, account + 1, self.address_gap));
        }
    }
}
