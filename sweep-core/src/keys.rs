//! Master key resolution and path derivation.

use std::str::FromStr;

use bitcoin::bip32::{DerivationPath, Xpriv, Xpub};
use bitcoin::secp256k1::{All, PublicKey, Secp256k1, SecretKey};
use bitcoin::Network;

use crate::error::{Error, Result};

/// Root key recovered from a wallet secret.
///
/// Extended public keys scan fine over unhardened paths but can never
/// sign; every signing call on a watch-only master fails with
/// [`Error::MissingSecretKey`].
#[derive(Debug, Clone)]
pub enum MasterKey {
    Private(Xpriv),
    Public(Xpub),
}

impl MasterKey {
    /// Public key at `path`.
    pub fn public_key_at(&self, secp: &Secp256k1<All>, path: &DerivationPath) -> Result<PublicKey> {
        match self {
            MasterKey::Private(xprv) => {
                Ok(xprv.derive_priv(secp, path)?.private_key.public_key(secp))
            }
            MasterKey::Public(xpub) => Ok(xpub.derive_pub(secp, path)?.public_key),
        }
    }

    /// Secret key at `path`.
    pub fn secret_key_at(&self, secp: &Secp256k1<All>, path: &DerivationPath) -> Result<SecretKey> {
        match self {
            MasterKey::Private(xprv) => Ok(xprv.derive_priv(secp, path)?.private_key),
            MasterKey::Public(_) => Err(Error::MissingSecretKey),
        }
    }
}

/// Resolve a wallet secret into a master key.
///
/// Tries, in order: extended private key, extended public key, mnemonic
/// phrase combined with `passphrase`. The first parser that accepts the
/// secret wins; if none does the secret is unusable.
pub fn parse_key(secret: &str, passphrase: &str) -> Result<MasterKey> {
    if let Ok(xprv) = Xpriv::from_str(secret) {
        return Ok(MasterKey::Private(xprv));
    }
    if let Ok(xpub) = Xpub::from_str(secret) {
        return Ok(MasterKey::Public(xpub));
    }
    if let Ok(mnemonic) = bip39::Mnemonic::parse(secret) {
        let seed = mnemonic.to_seed(passphrase);
        let xprv = Xpriv::new_master(Network::Bitcoin, &seed).map_err(|_| Error::KeyFormat)?;
        return Ok(MasterKey::Private(xprv));
    }
    Err(Error::KeyFormat)
}
