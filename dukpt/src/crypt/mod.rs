//! Cryptographic functionality.
//!
//! The payload functions here encrypt and decrypt data under a derived (or use-specific) key. All
//! of them use Cipher Block Chaining with an all-zeroes IV, which is what payment terminals
//! implementing DUKPT produce. No key material is retained between calls.


pub(crate) mod block;
pub mod mac;
pub mod payload;


use zeroize::Zeroizing;

use crate::crypt::payload::{Cipher3Des, CipherAes128, CipherAes192, CipherAes256, PayloadCipher};
use crate::error::Error;


/// Encrypts a payload using Triple DES.
///
/// If `pad` is set, the plaintext is padded with NUL bytes to the next multiple of 8 bytes.
/// Otherwise, its length must already be a multiple of 8 bytes.
pub fn encrypt_triple_des(key: &[u8], plaintext: &[u8], pad: bool) -> Result<Vec<u8>, Error> {
    Cipher3Des.encrypt(key, plaintext, pad)
}

/// Decrypts a payload using Triple DES.
///
/// Padding is never stripped; callers trim trailing NUL bytes themselves.
pub fn decrypt_triple_des(key: &[u8], ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>, Error> {
    Cipher3Des.decrypt(key, ciphertext, false)
}

/// Encrypts a payload using AES-128, optionally applying PKCS#7 padding.
pub fn encrypt_aes(key: &[u8], plaintext: &[u8], pad: bool) -> Result<Vec<u8>, Error> {
    CipherAes128.encrypt(key, plaintext, pad)
}

/// Decrypts a payload using AES-128, optionally removing PKCS#7 padding.
pub fn decrypt_aes(key: &[u8], ciphertext: &[u8], unpad: bool) -> Result<Zeroizing<Vec<u8>>, Error> {
    CipherAes128.decrypt(key, ciphertext, unpad)
}

/// Encrypts a payload using AES-192, optionally applying PKCS#7 padding.
///
/// A 16-byte key is extended to 24 bytes by repeating its first 8 bytes.
pub fn encrypt_aes192(key: &[u8], plaintext: &[u8], pad: bool) -> Result<Vec<u8>, Error> {
    CipherAes192.encrypt(key, plaintext, pad)
}

/// Decrypts a payload using AES-192, optionally removing PKCS#7 padding.
pub fn decrypt_aes192(key: &[u8], ciphertext: &[u8], unpad: bool) -> Result<Zeroizing<Vec<u8>>, Error> {
    CipherAes192.decrypt(key, ciphertext, unpad)
}

/// Encrypts a payload using AES-256, optionally applying PKCS#7 padding.
///
/// A 16-byte key is extended to 32 bytes by repeating it.
pub fn encrypt_aes256(key: &[u8], plaintext: &[u8], pad: bool) -> Result<Vec<u8>, Error> {
    CipherAes256.encrypt(key, plaintext, pad)
}

/// Decrypts a payload using AES-256, optionally removing PKCS#7 padding.
pub fn decrypt_aes256(key: &[u8], ciphertext: &[u8], unpad: bool) -> Result<Zeroizing<Vec<u8>>, Error> {
    CipherAes256.decrypt(key, ciphertext, unpad)
}
