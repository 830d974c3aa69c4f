use bitcoin::bip32::{ChildNumber, DerivationPath};
use bitcoin::secp256k1::{All, PublicKey, Secp256k1};
use bitcoin::{Address, CompressedPublicKey, Network, ScriptBuf};

use crate::error::Result;
use crate::keys::MasterKey;
use crate::scripts::ScriptType;

/// Candidate receiving script, with everything the scan engine needs to
/// build a [`crate::Utxo`] once the script turns out funded.
#[derive(Debug, Clone)]
pub struct CandidateScript {
    pub script: ScriptBuf,
    pub path: DerivationPath,
    pub script_type: ScriptType,
    pub address: String,
    /// Identifier of the owning descriptor, fed back through
    /// [`crate::ScriptIterator::record_outcome`].
    pub descriptor: usize,
}

/// One address-family × account derivation stream.
///
/// The cursor and gap counters are owned here; only the scan engine's
/// feedback (via the iterator) mutates them.
#[derive(Debug)]
pub struct Descriptor {
    script_type: ScriptType,
    account_index: u32,
    address_index: u32,
    consecutive_empty: u32,
    has_priority_scripts: bool,
    found_funds: bool,
    total_scripts: u32,
    address_gap: u32,
}

impl Descriptor {
    pub fn new(script_type: ScriptType, account_index: u32, address_gap: u32) -> Self {
        Self {
            script_type,
            account_index,
            address_index: 0,
            consecutive_empty: 0,
            has_priority_scripts: false,
            found_funds: false,
            total_scripts: 0,
            address_gap,
        }
    }

    pub fn script_type(&self) -> ScriptType {
        self.script_type
    }

    pub fn account_index(&self) -> u32 {
        self.account_index
    }

    pub fn total_scripts(&self) -> u32 {
        self.total_scripts
    }

    pub fn has_priority_scripts(&self) -> bool {
        self.has_priority_scripts
    }

    /// Whether any probed script of this stream ever showed history.
    pub fn found_funds(&self) -> bool {
        self.found_funds
    }

    /// A descriptor is exhausted once it has seen `address_gap`
    /// consecutive empty addresses.
    pub fn is_exhausted(&self) -> bool {
        self.consecutive_empty >= self.address_gap
    }

    /// Derive the next candidate script, advancing the address cursor.
    ///
    /// Returns `Ok(None)` once the stream is exhausted.
    pub fn next_script(
        &mut self,
        master: &MasterKey,
        secp: &Secp256k1<All>,
    ) -> Result<Option<CandidateScript>> {
        if self.is_exhausted() {
            return Ok(None);
        }
        let path = self.path_at(self.address_index);
        let pubkey = master.public_key_at(secp, &path)?;
        let candidate = CandidateScript {
            script: self.script_type.build_output_script(&pubkey),
            path,
            script_type: self.script_type,
            address: render_address(self.script_type, &pubkey),
            descriptor: 0,
        };
        self.address_index += 1;
        self.total_scripts += 1;
        Ok(Some(candidate))
    }

    /// Scan outcome for the oldest probed-but-unanswered script.
    pub(crate) fn record_outcome(&mut self, has_history: bool) {
        if has_history {
            self.has_priority_scripts = true;
            self.found_funds = true;
            self.consecutive_empty = 0;
        } else {
            self.has_priority_scripts = false;
            self.consecutive_empty += 1;
        }
    }

    // purpose'/coin'/account'/change/index per BIP 44/49/84
    fn path_at(&self, index: u32) -> DerivationPath {
        DerivationPath::from(vec![
            ChildNumber::from_hardened_idx(purpose(self.script_type)).expect("purpose"),
            ChildNumber::from_hardened_idx(0).expect("coin type"),
            ChildNumber::from_hardened_idx(self.account_index).expect("account"),
            ChildNumber::from_normal_idx(0).expect("external branch"),
            ChildNumber::from_normal_idx(index).expect("address index"),
        ])
    }
}

fn purpose(script_type: ScriptType) -> u32 {
    match script_type {
        ScriptType::Legacy => 44,
        ScriptType::Compat => 49,
        ScriptType::Segwit => 84,
    }
}

fn render_address(script_type: ScriptType, pubkey: &PublicKey) -> String {
    let compressed = CompressedPublicKey(*pubkey);
    let address = match script_type {
        ScriptType::Legacy => Address::p2pkh(compressed, Network::Bitcoin),
        ScriptType::Compat => Address::p2shwpkh(&compressed, Network::Bitcoin),
        ScriptType::Segwit => Address::p2wpkh(&compressed, Network::Bitcoin),
    };
    address.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::parse_key;
    use std::str::FromStr;

    const MNEMONIC: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[test]
    fn derives_purpose_paths_in_order() {
        let master = parse_key(MNEMONIC, "").unwrap();
        let secp = Secp256k1::new();
        let mut descriptor = Descriptor::new(ScriptType::Segwit, 0, 3);

        let first = descriptor.next_script(&master, &secp).unwrap().unwrap();
        assert_eq!(first.path, DerivationPath::from_str("m/84'/0'/0'/0/0").unwrap());
        let second = descriptor.next_script(&master, &secp).unwrap().unwrap();
        assert_eq!(second.path, DerivationPath::from_str("m/84'/0'/0'/0/1").unwrap());
        assert_ne!(first.script, second.script);
        assert_eq!(descriptor.total_scripts(), 2);
    }

    #[test]
    fn candidate_address_matches_script() {
        let master = parse_key(MNEMONIC, "").unwrap();
        let secp = Secp256k1::new();
        for script_type in ScriptType::ALL {
            let mut descriptor = Descriptor::new(script_type, 0, 1);
            let candidate = descriptor.next_script(&master, &secp).unwrap().unwrap();
            let address = Address::from_str(&candidate.address)
                .unwrap()
                .require_network(Network::Bitcoin)
                .unwrap();
            assert_eq!(address.script_pubkey(), candidate.script);
        }
    }

    #[test]
    fn gap_feedback_drives_exhaustion() {
        let master = parse_key(MNEMONIC, "").unwrap();
        let secp = Secp256k1::new();
        let mut descriptor = Descriptor::new(ScriptType::Legacy, 0, 2);

        descriptor.next_script(&master, &secp).unwrap().unwrap();
        descriptor.record_outcome(false);
        assert!(!descriptor.is_exhausted());

        descriptor.next_script(&master, &secp).unwrap().unwrap();
        descriptor.record_outcome(true);
        assert!(descriptor.has_priority_scripts());
        assert!(descriptor.found_funds());

        descriptor.record_outcome(false);
        descriptor.record_outcome(false);
        assert!(descriptor.is_exhausted());
        assert!(descriptor.next_script(&master, &secp).unwrap().is_none());
    }

    #[test]
    fn zero_gap_is_exhausted_from_the_start() {
        let master = parse_key(MNEMONIC, "").unwrap();
        let secp = Secp256k1::new();
        let mut descriptor = Descriptor::new(ScriptType::Compat, 0, 0);
        assert!(descriptor.is_exhausted());
        assert!(descriptor.next_script(&master, &secp).unwrap().is_none());
        assert_eq!(descriptor.total_scripts(), 0);
    }
}
