use bitcoin::base58;
use bitcoin::script::{Builder, PushBytesBuf, ScriptBuf};

use super::{build_p2pkh_output_script, build_p2sh_output_script};

const P2PKH_ADDRESS_VERSION: u8 = 0x00;
const P2SH_ADDRESS_VERSION: u8 = 0x05;
const BECH32_HRP: &str = "bc";

/// Build the output script paying to `address`.
///
/// Tries Base58Check first (P2PKH and P2SH version bytes), then bech32
/// restricted to witness version 0. Returns `None` for anything else,
/// including higher witness versions.
pub fn output_script_for_address(address: &str) -> Option<ScriptBuf> {
    if let Some(script) = decode_base58(address) {
        return Some(script);
    }
    decode_bech32(address)
}

fn decode_base58(address: &str) -> Option<ScriptBuf> {
    let decoded = base58::decode_check(address).ok()?;
    let (version, hash) = decoded.split_first()?;
    let hash: [u8; 20] = hash.try_into().ok()?;
    match *version {
        P2PKH_ADDRESS_VERSION => Some(build_p2pkh_output_script(hash)),
        P2SH_ADDRESS_VERSION => Some(build_p2sh_output_script(hash)),
        _ => None,
    }
}

fn decode_bech32(address: &str) -> Option<ScriptBuf> {
    let (hrp, data, variant) = bech32::decode(address).ok()?;
    if hrp != BECH32_HRP || variant != bech32::Variant::Bech32 {
        return None;
    }
    let (version, program) = data.split_first()?;
    if version.to_u8() != 0 {
        return None;
    }
    let program = bech32::convert_bits(program, 5, 8, false).ok()?;
    if program.len() != 20 && program.len() != 32 {
        return None;
    }
    let program = PushBytesBuf::try_from(program).ok()?;
    Some(Builder::new().push_int(0).push_slice(program).into_script())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::key::UntweakedPublicKey;
    use bitcoin::secp256k1::{Secp256k1, SecretKey};
    use bitcoin::{Address, CompressedPublicKey, Network};

    fn test_compressed() -> CompressedPublicKey {
        let secp = Secp256k1::new();
        let sk = SecretKey::from_slice(&[0x22; 32]).unwrap();
        CompressedPublicKey(sk.public_key(&secp))
    }

    #[test]
    fn decodes_base58_p2pkh() {
        let address = Address::p2pkh(test_compressed(), Network::Bitcoin);
        let script = output_script_for_address(&address.to_string()).unwrap();
        assert_eq!(script, address.script_pubkey());
    }

    #[test]
    fn decodes_base58_p2sh() {
        let address = Address::p2shwpkh(&test_compressed(), Network::Bitcoin);
        let script = output_script_for_address(&address.to_string()).unwrap();
        assert_eq!(script, address.script_pubkey());
    }

    #[test]
    fn decodes_bech32_v0() {
        let address = Address::p2wpkh(&test_compressed(), Network::Bitcoin);
        let script = output_script_for_address(&address.to_string()).unwrap();
        assert_eq!(script, address.script_pubkey());
    }

    #[test]
    fn rejects_higher_witness_versions() {
        let secp = Secp256k1::new();
        let internal = UntweakedPublicKey::from(test_compressed().0);
        let taproot = Address::p2tr(&secp, internal, None, Network::Bitcoin);
        assert!(output_script_for_address(&taproot.to_string()).is_none());
    }

    #[test]
    fn rejects_foreign_and_malformed_addresses() {
        // testnet hrp
        let address = Address::p2wpkh(&test_compressed(), Network::Testnet);
        assert!(output_script_for_address(&address.to_string()).is_none());
        assert!(output_script_for_address("not an address").is_none());
        assert!(output_script_for_address("").is_none());
    }
}
