use bitcoin::hashes::{sha256d, Hash};
use bitcoin::secp256k1::{Message, Secp256k1};
use bitcoin::{Amount, ScriptBuf, Witness};

use crate::error::{Error, Result};
use crate::keys::MasterKey;
use crate::scanner::Utxo;
use crate::scripts::output_script_for_address;

/// Hard cap on destination addresses in one sweep.
pub const MAX_ADDRESSES: usize = 40;
/// Smallest payout accepted per destination.
pub const DUST_FLOOR: Amount = Amount::from_sat(546);

const SIGHASH_ALL: u8 = 0x01;

/// Fully signed sweep: every discovered output spent, the requested total
/// split evenly over the destinations.
///
/// Construction is atomic; a plan is either complete or not built at all.
/// Wire serialization and broadcast are the caller's concern.
#[derive(Debug, Clone)]
pub struct SweepPlan {
    pub outputs: Vec<(Amount, ScriptBuf)>,
    pub inputs: Vec<SweepInput>,
}

/// One signed input of a [`SweepPlan`].
#[derive(Debug, Clone)]
pub struct SweepInput {
    pub utxo: Utxo,
    pub script_sig: ScriptBuf,
    pub witness: Witness,
}

/// Craft and sign a transaction spending all `utxos`, paying
/// `total_amount` split evenly over `addresses`.
///
/// Integer division floors the per-address amount; the remainder is not
/// assigned to any output. The signature preimage is the double-SHA256 of
/// the spent script itself rather than a transaction sighash, so the plan
/// is not broadcastable as-is.
pub fn build_sweep(
    master: &MasterKey,
    utxos: &[Utxo],
    addresses: &[String],
    total_amount: Amount,
) -> Result<SweepPlan> {
    if addresses.is_empty() {
        return Err(Error::NoAddresses);
    }
    if addresses.len() > MAX_ADDRESSES {
        return Err(Error::AddressLimitExceeded(MAX_ADDRESSES));
    }

    let amount_per_address = total_amount / addresses.len() as u64;
    if amount_per_address < DUST_FLOOR {
        return Err(Error::InsufficientFunds);
    }

    let mut outputs = Vec::with_capacity(addresses.len());
    for address in addresses {
        let script = output_script_for_address(address)
            .ok_or_else(|| Error::UnrecognizedAddress(address.clone()))?;
        outputs.push((amount_per_address, script));
    }

    let secp = Secp256k1::new();
    let mut inputs = Vec::with_capacity(utxos.len());
    for utxo in utxos {
        let pubkey = master.public_key_at(&secp, &utxo.path)?;
        let secret = master.secret_key_at(&secp, &utxo.path)?;

        // the spent script itself is the preimage, double hashed; the
        // message is already a digest so no further hashing happens
        let script = utxo.script_type.build_output_script(&pubkey);
        let sighash = sha256d::Hash::hash(script.as_bytes());
        let message = Message::from_digest(sighash.to_byte_array());
        let signature = secp.sign_ecdsa(&message, &secret);

        let mut extended_signature = signature.serialize_der().to_vec();
        extended_signature.push(SIGHASH_ALL);

        let script_sig = utxo
            .script_type
            .build_input_script(&pubkey, &extended_signature)?;
        let witness = utxo.script_type.build_witness(&pubkey, &extended_signature);
        inputs.push(SweepInput {
            utxo: utxo.clone(),
            script_sig,
            witness,
        });
    }

    Ok(SweepPlan { outputs, inputs })
}
