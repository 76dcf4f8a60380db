//! Message authentication codes computed with DUKPT MAC keys.


use aes::{Aes128, Aes192, Aes256};
use cmac::Cmac;
use des::Des;
use digest::{KeyInit, Mac};
use retail_mac::RetailMac;
use subtle::ConstantTimeEq;

use crate::error::{Error, KeyRole};


type RetailMacDes = RetailMac<Des>;


/// Computes an ANSI X9.19 retail MAC (ISO/IEC 9797-1 algorithm 3 with padding method 1).
///
/// The data is padded with zero bytes to a multiple of 8 bytes (an empty message becomes a single
/// zero block), then:
/// ```plain
/// state = DES-CBC(K1, zero IV, data)[last block]
/// mac = encrypt(K1, decrypt(K2, state))
/// ```
/// The key must be a double-length key `K1 || K2`, such as a legacy MAC request or response key.
pub fn retail_mac(key: &[u8], data: &[u8]) -> Result<[u8; 8], Error> {
    let invalid_length = || Error::InvalidKeyLength {
        role: KeyRole::MacKey,
        obtained_length: key.len(),
        expected_lengths: &[16],
    };
    if key.len() != 16 {
        return Err(invalid_length());
    }
    let mut mac = RetailMacDes::new_from_slice(key)
        .map_err(|_| invalid_length())?;
    if data.is_empty() {
        mac.update(&[0u8; 8]);
    } else {
        // a short final block is padded with zero bytes
        mac.update(data);
    }
    let tag = mac.finalize().into_bytes();

    let mut ret = [0u8; 8];
    ret.copy_from_slice(&tag);
    Ok(ret)
}


/// Verifies an ANSI X9.19 retail MAC in constant time.
///
/// `expected_mac` may be truncated (e.g. to the customary 4 bytes); only that many leading bytes
/// are compared.
pub fn verify_retail_mac(key: &[u8], data: &[u8], expected_mac: &[u8]) -> Result<bool, Error> {
    let computed_mac = retail_mac(key, data)?;
    if expected_mac.is_empty() || expected_mac.len() > computed_mac.len() {
        return Ok(false);
    }
    Ok(computed_mac[..expected_mac.len()].ct_eq(expected_mac).into())
}


/// Computes an AES-CMAC, choosing AES-128, AES-192 or AES-256 by the length of the key.
pub fn cmac_aes(key: &[u8], data: &[u8]) -> Result<[u8; 16], Error> {
    let invalid_length = || Error::InvalidKeyLength {
        role: KeyRole::MacKey,
        obtained_length: key.len(),
        expected_lengths: &[16, 24, 32],
    };
    let tag = match key.len() {
        16 => {
            let mut mac = Cmac::<Aes128>::new_from_slice(key)
                .map_err(|_| invalid_length())?;
            mac.update(data);
            mac.finalize().into_bytes()
        },
        24 => {
            let mut mac = Cmac::<Aes192>::new_from_slice(key)
                .map_err(|_| invalid_length())?;
            mac.update(data);
            mac.finalize().into_bytes()
        },
        32 => {
            let mut mac = Cmac::<Aes256>::new_from_slice(key)
                .map_err(|_| invalid_length())?;
            mac.update(data);
            mac.finalize().into_bytes()
        },
        _ => return Err(invalid_length()),
    };

    let mut ret = [0u8; 16];
    ret.copy_from_slice(&tag);
    Ok(ret)
}


/// Verifies an AES-CMAC in constant time.
///
/// `expected_mac` may be truncated; only that many leading bytes are compared.
pub fn verify_cmac_aes(key: &[u8], data: &[u8], expected_mac: &[u8]) -> Result<bool, Error> {
    let computed_mac = cmac_aes(key, data)?;
    if expected_mac.is_empty() || expected_mac.len() > computed_mac.len() {
        return Ok(false);
    }
    Ok(computed_mac[..expected_mac.len()].ct_eq(expected_mac).into())
}
