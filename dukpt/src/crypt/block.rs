//! Single-block primitives used as the one-way function during key derivation.


use aes::{Aes128, Aes192, Aes256};
use cipher::{BlockCipherEncrypt, KeyInit};
use des::{Des, TdesEde2, TdesEde3};

use crate::error::{Error, KeyRole};


/// Single DES, as used by each half of the legacy key transformation.
pub(crate) struct DesBlock(Des);
impl DesBlock {
    pub fn new(key: &[u8]) -> Result<Self, Error> {
        Des::new_from_slice(key)
            .map(Self)
            .map_err(|_| Error::InvalidKeyLength {
                role: KeyRole::CipherKey,
                obtained_length: key.len(),
                expected_lengths: &[8],
            })
    }

    pub fn encrypt_block(&self, block: &mut [u8; 8]) {
        self.0.encrypt_block(block.into());
    }
}


/// Triple DES in EDE mode, keyed with either two or three DES keys.
pub(crate) enum TdesBlock {
    TwoKey(TdesEde2),
    ThreeKey(TdesEde3),
}
impl TdesBlock {
    pub fn new(key: &[u8]) -> Result<Self, Error> {
        let invalid_length = |_| Error::InvalidKeyLength {
            role: KeyRole::CipherKey,
            obtained_length: key.len(),
            expected_lengths: &[16, 24],
        };
        match key.len() {
            16 => TdesEde2::new_from_slice(key).map(Self::TwoKey).map_err(invalid_length),
            24 => TdesEde3::new_from_slice(key).map(Self::ThreeKey).map_err(invalid_length),
            other => Err(Error::InvalidKeyLength {
                role: KeyRole::CipherKey,
                obtained_length: other,
                expected_lengths: &[16, 24],
            }),
        }
    }

    pub fn encrypt_block(&self, block: &mut [u8; 8]) {
        match self {
            Self::TwoKey(c) => c.encrypt_block(block.into()),
            Self::ThreeKey(c) => c.encrypt_block(block.into()),
        }
    }
}


/// AES with the key size chosen by the length of the key.
pub(crate) enum AesBlock {
    Aes128(Aes128),
    Aes192(Aes192),
    Aes256(Aes256),
}
impl AesBlock {
    pub fn new(key: &[u8]) -> Result<Self, Error> {
        let invalid_length = |_| Error::InvalidKeyLength {
            role: KeyRole::CipherKey,
            obtained_length: key.len(),
            expected_lengths: &[16, 24, 32],
        };
        match key.len() {
            16 => Aes128::new_from_slice(key).map(Self::Aes128).map_err(invalid_length),
            24 => Aes192::new_from_slice(key).map(Self::Aes192).map_err(invalid_length),
            32 => Aes256::new_from_slice(key).map(Self::Aes256).map_err(invalid_length),
            other => Err(Error::InvalidKeyLength {
                role: KeyRole::CipherKey,
                obtained_length: other,
                expected_lengths: &[16, 24, 32],
            }),
        }
    }

    pub fn encrypt_block(&self, block: &mut [u8; 16]) {
        match self {
            Self::Aes128(c) => c.encrypt_block(block.into()),
            Self::Aes192(c) => c.encrypt_block(block.into()),
            Self::Aes256(c) => c.encrypt_block(block.into()),
        }
    }
}
