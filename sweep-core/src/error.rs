use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    // Key resolution
    #[error("the key is invalid or the format isn't recognized; expected a mnemonic, xpriv or xpub")]
    KeyFormat,
    #[error("master key is watch-only and cannot produce a secret key")]
    MissingSecretKey,

    // Sweep construction
    #[error("too many addresses, maximum is {0}")]
    AddressLimitExceeded(usize),
    #[error("at least one destination address is required")]
    NoAddresses,
    #[error("not enough funds to pay every address above the dust floor")]
    InsufficientFunds,
    #[error("the address {0} is invalid or the format isn't recognized")]
    UnrecognizedAddress(String),

    // Wrapped external errors
    #[error(transparent)]
    Bip32(#[from] bitcoin::bip32::Error),
    #[error(transparent)]
    Secp256k1(#[from] bitcoin::secp256k1::Error),
    #[error(transparent)]
    PushBytes(#[from] bitcoin::script::PushBytesError),

    // Indexer pass-through for backend crates
    #[error(transparent)]
    Indexer(Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T> = std::result::Result<T, Error>;
