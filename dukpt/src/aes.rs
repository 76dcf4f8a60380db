//! AES DUKPT as specified in ANSI X9.24-3.
//!
//! Every key is derived from its parent key by AES-encrypting one or two 16-byte blocks of
//! derivation data:
//! ```plain
//! | 01 | block counter | key usage (2) | algorithm (2) | key length in bits (2) | context (8) |
//! ```
//! The context is the Initial Key ID when deriving the initial key from the BDK, and otherwise
//! the derivation ID followed by the (partial) transaction counter.
//!
//! The initial key is derived from the BDK. Walking the set bits of the transaction counter from
//! the most to the least significant one yields the intermediate derivation key, from which the
//! working key for the desired usage and algorithm is derived.


use tracing::{debug, instrument, trace};
use zeroize::Zeroizing;

use crate::crypt::block::AesBlock;
use crate::error::{Error, KeyRole};
use crate::ksn::{AES_MAX_SET_BITS, AesKsn};


/// What a derived key is used for.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum KeyUsage {
    KeyEncryptionKey,
    PinEncryption,
    MacGeneration,
    MacVerification,
    MacBothWays,
    DataEncryptionEncrypt,
    DataEncryptionDecrypt,
    DataEncryptionBothWays,
    KeyDerivation,
    KeyDerivationInitialKey,
}
impl KeyUsage {
    pub fn indicator(&self) -> u16 {
        match self {
            Self::KeyEncryptionKey => 0x0002,
            Self::PinEncryption => 0x1000,
            Self::MacGeneration => 0x2000,
            Self::MacVerification => 0x2001,
            Self::MacBothWays => 0x2002,
            Self::DataEncryptionEncrypt => 0x3000,
            Self::DataEncryptionDecrypt => 0x3001,
            Self::DataEncryptionBothWays => 0x3002,
            Self::KeyDerivation => 0x8000,
            Self::KeyDerivationInitialKey => 0x8001,
        }
    }
}


/// The algorithm (and therefore length) of a derived key.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum KeyType {
    Tdes2,
    Tdes3,
    Aes128,
    Aes192,
    Aes256,
}
impl KeyType {
    pub fn algorithm_indicator(&self) -> u16 {
        match self {
            Self::Tdes2 => 0x0000,
            Self::Tdes3 => 0x0001,
            Self::Aes128 => 0x0002,
            Self::Aes192 => 0x0003,
            Self::Aes256 => 0x0004,
        }
    }

    pub fn key_bits(&self) -> u16 {
        match self {
            Self::Tdes2 => 128,
            Self::Tdes3 => 192,
            Self::Aes128 => 128,
            Self::Aes192 => 192,
            Self::Aes256 => 256,
        }
    }

    pub fn key_len(&self) -> usize {
        usize::from(self.key_bits() / 8)
    }

    /// The type of an AES base derivation key (or initial key) of the given length.
    pub fn aes_by_key_len(key_len: usize) -> Option<Self> {
        match key_len {
            16 => Some(Self::Aes128),
            24 => Some(Self::Aes192),
            32 => Some(Self::Aes256),
            _ => None,
        }
    }
}


fn key_type_of(key: &[u8], role: KeyRole) -> Result<KeyType, Error> {
    KeyType::aes_by_key_len(key.len())
        .ok_or_else(|| {
            debug!(obtained_length = key.len(), "rejecting {}", role);
            Error::InvalidKeyLength {
                role,
                obtained_length: key.len(),
                expected_lengths: &[16, 24, 32],
            }
        })
}

fn check_counter(counter: u32) -> Result<(), Error> {
    let set_bits = counter.count_ones();
    if set_bits > AES_MAX_SET_BITS {
        debug!(set_bits, "rejecting transaction counter");
        return Err(Error::InvalidCounter {
            counter,
            set_bits,
            max_set_bits: AES_MAX_SET_BITS,
        });
    }
    Ok(())
}

/// Derives a key of the given usage and type from `derivation_key`.
fn derive_key(
    derivation_key: &[u8],
    usage: KeyUsage,
    key_type: KeyType,
    context: &[u8; 8],
) -> Result<Zeroizing<Vec<u8>>, Error> {
    let aes = AesBlock::new(derivation_key)?;
    let key_len = key_type.key_len();
    let block_count = (key_len + 15) / 16;

    let mut key = Zeroizing::new(Vec::with_capacity(block_count * 16));
    for block_counter in 1..=block_count {
        let mut block = Zeroizing::new([0u8; 16]);
        block[0] = 0x01;
        block[1] = block_counter as u8;
        block[2..4].copy_from_slice(&usage.indicator().to_be_bytes());
        block[4..6].copy_from_slice(&key_type.algorithm_indicator().to_be_bytes());
        block[6..8].copy_from_slice(&key_type.key_bits().to_be_bytes());
        block[8..16].copy_from_slice(context);
        aes.encrypt_block(&mut block);
        key.extend_from_slice(&*block);
    }
    key.truncate(key_len);
    Ok(key)
}

fn counter_context(ksn: &AesKsn, counter: u32) -> [u8; 8] {
    let mut context = [0u8; 8];
    context[0..4].copy_from_slice(&ksn.derivation_id());
    context[4..8].copy_from_slice(&counter.to_be_bytes());
    context
}


/// Derives the initial key from an AES BDK and a KSN, ignoring the KSN's transaction counter.
///
/// The initial key has the same type as the BDK.
#[instrument(skip_all)]
pub fn initial_key(bdk: &[u8], ksn: &[u8]) -> Result<Zeroizing<Vec<u8>>, Error> {
    let key_type = key_type_of(bdk, KeyRole::BaseDerivationKey)?;
    let ksn = AesKsn::from_bytes(ksn)?;
    derive_key(bdk, KeyUsage::KeyDerivationInitialKey, key_type, &ksn.initial_key_id())
}


/// Derives the intermediate derivation key for the KSN's transaction counter from the initial key.
///
/// A counter of zero returns the initial key unchanged.
#[instrument(skip_all)]
pub fn intermediate_key(initial_key: &[u8], ksn: &[u8]) -> Result<Zeroizing<Vec<u8>>, Error> {
    let key_type = key_type_of(initial_key, KeyRole::InitialKey)?;
    let ksn = AesKsn::from_bytes(ksn)?;
    let counter = ksn.counter();
    check_counter(counter)?;

    let mut key = Zeroizing::new(initial_key.to_vec());
    let mut working_counter = 0u32;
    for position in (0..32).rev() {
        let bit = 1u32 << position;
        if counter & bit == 0 {
            continue;
        }
        trace!(position, "key derivation round");
        working_counter |= bit;
        key = derive_key(&key, KeyUsage::KeyDerivation, key_type, &counter_context(&ksn, working_counter))?;
    }
    Ok(key)
}


/// An AES DUKPT working key configuration: which usage and key type to derive.
///
/// The default derives AES-128 PIN encryption keys.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct AesDukpt {
    usage: KeyUsage,
    key_type: KeyType,
}
impl AesDukpt {
    pub fn new(usage: KeyUsage, key_type: KeyType) -> Result<Self, Error> {
        if usage == KeyUsage::KeyDerivationInitialKey {
            return Err(Error::UnsupportedVariant { reason: "initial key usage is reserved for deriving the initial key" });
        }
        Ok(Self {
            usage,
            key_type,
        })
    }

    pub fn usage(&self) -> KeyUsage { self.usage }
    pub fn key_type(&self) -> KeyType { self.key_type }

    /// Derives the working key from an AES BDK and a KSN.
    pub fn working_key(&self, bdk: &[u8], ksn: &[u8]) -> Result<Zeroizing<Vec<u8>>, Error> {
        let initial_key = initial_key(bdk, ksn)?;
        self.working_key_from_initial_key(&initial_key, ksn)
    }

    /// Derives the working key from a previously derived initial key and a KSN.
    #[instrument(skip_all)]
    pub fn working_key_from_initial_key(&self, initial_key: &[u8], ksn: &[u8]) -> Result<Zeroizing<Vec<u8>>, Error> {
        let initial_key_type = key_type_of(initial_key, KeyRole::InitialKey)?;
        if self.key_type.key_bits() > initial_key_type.key_bits() {
            debug!(
                working_key_bits = self.key_type.key_bits(),
                initial_key_bits = initial_key_type.key_bits(),
                "working key would be stronger than its derivation key",
            );
            return Err(Error::UnsupportedVariant { reason: "working key is longer than the base derivation key" });
        }

        let derivation_key = intermediate_key(initial_key, ksn)?;
        let ksn = AesKsn::from_bytes(ksn)?;
        let context = counter_context(&ksn, ksn.counter());
        derive_key(&derivation_key, self.usage, self.key_type, &context)
    }
}
impl Default for AesDukpt {
    fn default() -> Self {
        Self {
            usage: KeyUsage::PinEncryption,
            key_type: KeyType::Aes128,
        }
    }
}
