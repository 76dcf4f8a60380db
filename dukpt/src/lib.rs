//! Derived Unique Key Per Transaction (DUKPT) key management, as specified in ANSI X9.24.
//!
//! The legacy Triple DES scheme (X9.24-1) lives in [`tdes`], the AES scheme (X9.24-3) in
//! [`aes`]. Payload encryption and MACs using the derived keys are in [`crypt`].
//!
//! The functions at the crate root use the default legacy variant, i.e. they derive PIN
//! encryption keys:
//! ```
//! let bdk = dukpt::from_hex("0123456789ABCDEFFEDCBA9876543210").unwrap();
//! let ksn = dukpt::from_hex("FFFF9876543210E00008").unwrap();
//! let key = dukpt::compute_key(&bdk, &ksn).unwrap();
//! assert_eq!(dukpt::to_hex(&key), "27F66D5244FF621EAA6F6120EDEB427F");
//! ```


pub mod aes;
pub mod crypt;
pub mod error;
pub mod ksn;
pub mod register;
pub mod scheme;
pub mod tdes;


use zeroize::Zeroizing;

pub use crate::crypt::{
    decrypt_aes, decrypt_aes192, decrypt_aes256, decrypt_triple_des, encrypt_aes, encrypt_aes192,
    encrypt_aes256, encrypt_triple_des,
};
pub use crate::error::Error;
pub use crate::register::BitRegister;
pub use crate::tdes::{DukptVariant, to_data_key};


/// Computes the IPEK from a 16-byte BDK and a 10-byte KSN.
pub fn compute_ipek(bdk: &[u8], ksn: &[u8]) -> Result<Zeroizing<Vec<u8>>, Error> {
    DukptVariant::default().compute_ipek(bdk, ksn)
}

/// Computes the PIN encryption key for a transaction from a 16-byte BDK and a 10-byte KSN.
pub fn compute_key(bdk: &[u8], ksn: &[u8]) -> Result<Zeroizing<Vec<u8>>, Error> {
    DukptVariant::default().compute_key(bdk, ksn)
}

/// Computes the PIN encryption key for a transaction from a 16-byte IPEK and a 10-byte KSN.
pub fn compute_key_from_ipek(ipek: &[u8], ksn: &[u8]) -> Result<Zeroizing<Vec<u8>>, Error> {
    DukptVariant::default().compute_key_from_ipek(ipek, ksn)
}


/// Formats bytes as uppercase hexadecimal.
pub fn to_hex(bytes: &[u8]) -> String {
    hex::encode_upper(bytes)
}

/// Parses hexadecimal in either case.
pub fn from_hex(hex_string: &str) -> Result<Vec<u8>, Error> {
    Ok(hex::decode(hex_string)?)
}


#[cfg(test)]
mod tests {
    use super::{from_hex, to_hex};
    use crate::error::Error;

    #[test]
    fn test_hex_conversion() {
        assert_eq!(from_hex("0a0B").unwrap(), vec![0x0A, 0x0B]);
        assert_eq!(to_hex(&[0x0A, 0x0B]), "0A0B");
        assert_eq!(from_hex("ABC"), Err(Error::InvalidHex));
        assert_eq!(from_hex("GG"), Err(Error::InvalidHex));
    }
}
