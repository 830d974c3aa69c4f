//! Standard script construction for the three supported address families.
//!
//! Everything here is a pure function of its inputs; descriptors and the
//! scan engine decide *which* scripts to build, this module decides *how*.

mod address;

pub use address::output_script_for_address;

use bitcoin::hashes::{hash160, Hash};
use bitcoin::opcodes::all::{OP_CHECKSIG, OP_DUP, OP_EQUAL, OP_EQUALVERIFY, OP_HASH160};
use bitcoin::script::{Builder, PushBytesBuf, ScriptBuf};
use bitcoin::secp256k1::PublicKey;
use bitcoin::Witness;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Address family of a derived script.
///
/// The family determines the output script shape, the input script shape
/// and the witness shape. The set is closed: adding a fourth family is a
/// compile-time change in every `match` below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScriptType {
    /// P2PKH
    Legacy,
    /// P2SH-wrapped P2WPKH
    Compat,
    /// Native P2WPKH
    Segwit,
}

impl ScriptType {
    /// Every supported family, in scan order.
    pub const ALL: [ScriptType; 3] = [ScriptType::Legacy, ScriptType::Compat, ScriptType::Segwit];

    /// Output script locking funds to `pubkey` under this family.
    pub fn build_output_script(&self, pubkey: &PublicKey) -> ScriptBuf {
        let pubkey_hash = hash160::Hash::hash(&pubkey.serialize()).to_byte_array();
        match self {
            ScriptType::Legacy => build_p2pkh_output_script(pubkey_hash),
            ScriptType::Compat => {
                let redeem = build_segwit_output_script(pubkey_hash);
                let redeem_hash = hash160::Hash::hash(redeem.as_bytes()).to_byte_array();
                build_p2sh_output_script(redeem_hash)
            }
            ScriptType::Segwit => build_segwit_output_script(pubkey_hash),
        }
    }

    /// Input script (scriptSig) spending an output of this family.
    ///
    /// Native segwit spends carry everything in the witness, so the input
    /// script is empty; the wrapped form pushes only the redeem script.
    pub fn build_input_script(&self, pubkey: &PublicKey, signature: &[u8]) -> Result<ScriptBuf> {
        match self {
            ScriptType::Legacy => {
                let signature = PushBytesBuf::try_from(signature.to_vec())?;
                Ok(Builder::new()
                    .push_slice(signature)
                    .push_slice(pubkey.serialize())
                    .into_script())
            }
            ScriptType::Compat => {
                let pubkey_hash = hash160::Hash::hash(&pubkey.serialize()).to_byte_array();
                let redeem = build_segwit_output_script(pubkey_hash);
                let redeem = PushBytesBuf::try_from(redeem.into_bytes())?;
                Ok(Builder::new().push_slice(redeem).into_script())
            }
            ScriptType::Segwit => Ok(ScriptBuf::new()),
        }
    }

    /// Witness spending an output of this family.
    pub fn build_witness(&self, pubkey: &PublicKey, signature: &[u8]) -> Witness {
        match self {
            ScriptType::Legacy => Witness::new(),
            ScriptType::Compat | ScriptType::Segwit => {
                let mut witness = Witness::new();
                witness.push(signature);
                witness.push(pubkey.serialize());
                witness
            }
        }
    }
}

fn build_p2pkh_output_script(pubkey_hash: [u8; 20]) -> ScriptBuf {
    Builder::new()
        .push_opcode(OP_DUP)
        .push_opcode(OP_HASH160)
        .push_slice(pubkey_hash)
        .push_opcode(OP_EQUALVERIFY)
        .push_opcode(OP_CHECKSIG)
        .into_script()
}

fn build_p2sh_output_script(script_hash: [u8; 20]) -> ScriptBuf {
    Builder::new()
        .push_opcode(OP_HASH160)
        .push_slice(script_hash)
        .push_opcode(OP_EQUAL)
        .into_script()
}

fn build_segwit_output_script(hash: [u8; 20]) -> ScriptBuf {
    Builder::new().push_int(0).push_slice(hash).into_script()
}
