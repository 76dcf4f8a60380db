//! Block ciphers for encrypting and decrypting transaction payloads.


use aes::{Aes128, Aes192, Aes256};
use block_padding::{NoPadding, Padding, Pkcs7, ZeroPadding};
use cipher::{BlockModeDecrypt, BlockModeEncrypt, KeyIvInit};
use des::{TdesEde2, TdesEde3};
use zeroize::Zeroizing;

use crate::error::{Error, KeyRole};


/// How a payload is padded when the caller asks for padding.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum PayloadPadding {
    /// NUL bytes up to the next block boundary; block-aligned input is left alone.
    Nul,

    /// PKCS#7; always adds between 1 and a full block of padding.
    Pkcs7,
}
impl PayloadPadding {
    /// Returns a padded copy of `data`.
    pub fn pad(&self, data: &[u8], block_size: usize) -> Zeroizing<Vec<u8>> {
        let mut padded = Zeroizing::new(data.to_vec());
        let pos = data.len() % block_size;
        if pos == 0 && *self == Self::Nul {
            return padded;
        }

        let last_block_start = data.len() - pos;
        padded.resize(last_block_start + block_size, 0x00);
        let last_block = &mut padded[last_block_start..];
        match self {
            Self::Nul => ZeroPadding::raw_pad(last_block, pos),
            Self::Pkcs7 => Pkcs7::raw_pad(last_block, pos),
        }
        padded
    }

    /// Returns the length of `data` once padding has been removed from its final block.
    pub fn unpadded_len(&self, data: &[u8], block_size: usize) -> Result<usize, Error> {
        if data.len() < block_size {
            return Err(Error::InvalidPadding);
        }
        let last_block_start = data.len() - block_size;
        let last_block = &data[last_block_start..];
        let kept = match self {
            Self::Nul => ZeroPadding::raw_unpad(last_block),
            Self::Pkcs7 => Pkcs7::raw_unpad(last_block),
        }.map_err(|_| Error::InvalidPadding)?;
        Ok(last_block_start + kept.len())
    }
}


/// A block cipher used to protect payloads with a derived key.
///
/// All modes of operation are Cipher Block Chaining (CBC). The payload functions in
/// [`crate::crypt`] always use an all-zeroes IV; for a single block, this is equivalent to ECB.
pub trait PayloadCipher {
    /// The key sizes in bytes that this cipher accepts.
    fn cipher_key_sizes(&self) -> &'static [usize];

    /// Block size of the cipher in bytes.
    fn cipher_block_size(&self) -> usize;

    /// The padding applied when padding is requested.
    fn padding(&self) -> PayloadPadding;

    /// Validates the key and extends it to the native key size of the cipher, if necessary.
    fn prepare_key(&self, key: &[u8]) -> Result<Zeroizing<Vec<u8>>, Error> {
        if !self.cipher_key_sizes().contains(&key.len()) {
            return Err(Error::InvalidKeyLength {
                role: KeyRole::CipherKey,
                obtained_length: key.len(),
                expected_lengths: self.cipher_key_sizes(),
            });
        }
        Ok(Zeroizing::new(key.to_vec()))
    }

    /// Decrypts block-aligned data in-place using the given (prepared) key and CBC IV.
    ///
    /// Does not strip padding.
    fn decrypt_padded_data(&self, data: &mut [u8], key: &[u8], iv: &[u8]) -> Result<(), Error>;

    /// Encrypts pre-padded data in-place using the given (prepared) key and CBC IV.
    fn encrypt_padded_data(&self, data: &mut [u8], key: &[u8], iv: &[u8]) -> Result<(), Error>;

    /// Encrypts a payload with an all-zeroes IV, optionally padding it first.
    fn encrypt(&self, key: &[u8], plaintext: &[u8], pad: bool) -> Result<Vec<u8>, Error> {
        let key = self.prepare_key(key)?;
        let block_size = self.cipher_block_size();

        let mut data = if pad {
            self.padding().pad(plaintext, block_size)
        } else {
            Zeroizing::new(plaintext.to_vec())
        };
        if data.len() % block_size != 0 {
            return Err(Error::InvalidBlockAlignment { data_length: data.len(), block_size });
        }

        let zero_iv = vec![0u8; block_size];
        self.encrypt_padded_data(&mut data, &key, &zero_iv)?;
        Ok(data.to_vec())
    }

    /// Decrypts a payload with an all-zeroes IV, optionally removing padding afterwards.
    fn decrypt(&self, key: &[u8], ciphertext: &[u8], unpad: bool) -> Result<Zeroizing<Vec<u8>>, Error> {
        let key = self.prepare_key(key)?;
        let block_size = self.cipher_block_size();
        if ciphertext.len() % block_size != 0 {
            return Err(Error::InvalidBlockAlignment { data_length: ciphertext.len(), block_size });
        }

        let mut data = Zeroizing::new(ciphertext.to_vec());
        let zero_iv = vec![0u8; block_size];
        self.decrypt_padded_data(&mut data, &key, &zero_iv)?;

        if unpad {
            let unpadded_len = self.padding().unpadded_len(&data, block_size)?;
            data.truncate(unpadded_len);
        }
        Ok(data)
    }
}


fn invalid_cipher_key(key: &[u8], expected_lengths: &'static [usize]) -> Error {
    Error::InvalidKeyLength {
        role: KeyRole::CipherKey,
        obtained_length: key.len(),
        expected_lengths,
    }
}

fn misaligned(data_length: usize, block_size: usize) -> Error {
    Error::InvalidBlockAlignment { data_length, block_size }
}


/// 3DES-based payload cipher.
///
/// A 16-byte key selects EDE two-key mode:
/// ```plain
/// encrypt((K1, K2), D) = encrypt(K1, decrypt(K2, encrypt(K1, D)))
/// ```
/// and a 24-byte key selects EDE three-key mode. Requested padding appends NUL bytes.
pub struct Cipher3Des;
impl PayloadCipher for Cipher3Des {
    fn cipher_key_sizes(&self) -> &'static [usize] { &[16, 24] }
    fn cipher_block_size(&self) -> usize { 8 }
    fn padding(&self) -> PayloadPadding { PayloadPadding::Nul }

    fn decrypt_padded_data(&self, data: &mut [u8], key: &[u8], iv: &[u8]) -> Result<(), Error> {
        let data_len = data.len();
        if key.len() == 16 {
            let decryptor: cbc::Decryptor<TdesEde2> = cbc::Decryptor::new_from_slices(key, iv)
                .map_err(|_| invalid_cipher_key(key, self.cipher_key_sizes()))?;
            decryptor.decrypt_padded::<NoPadding>(data)
                .map_err(|_| misaligned(data_len, 8))?;
        } else {
            let decryptor: cbc::Decryptor<TdesEde3> = cbc::Decryptor::new_from_slices(key, iv)
                .map_err(|_| invalid_cipher_key(key, self.cipher_key_sizes()))?;
            decryptor.decrypt_padded::<NoPadding>(data)
                .map_err(|_| misaligned(data_len, 8))?;
        }
        Ok(())
    }

    fn encrypt_padded_data(&self, data: &mut [u8], key: &[u8], iv: &[u8]) -> Result<(), Error> {
        let data_len = data.len();
        if key.len() == 16 {
            let encryptor: cbc::Encryptor<TdesEde2> = cbc::Encryptor::new_from_slices(key, iv)
                .map_err(|_| invalid_cipher_key(key, self.cipher_key_sizes()))?;
            encryptor.encrypt_padded::<NoPadding>(data, data_len)
                .map_err(|_| misaligned(data_len, 8))?;
        } else {
            let encryptor: cbc::Encryptor<TdesEde3> = cbc::Encryptor::new_from_slices(key, iv)
                .map_err(|_| invalid_cipher_key(key, self.cipher_key_sizes()))?;
            encryptor.encrypt_padded::<NoPadding>(data, data_len)
                .map_err(|_| misaligned(data_len, 8))?;
        }
        Ok(())
    }
}


/// AES-128-based payload cipher.
///
/// Requested padding is PKCS#7.
pub struct CipherAes128;
impl PayloadCipher for CipherAes128 {
    fn cipher_key_sizes(&self) -> &'static [usize] { &[16] }
    fn cipher_block_size(&self) -> usize { 16 }
    fn padding(&self) -> PayloadPadding { PayloadPadding::Pkcs7 }

    fn decrypt_padded_data(&self, data: &mut [u8], key: &[u8], iv: &[u8]) -> Result<(), Error> {
        let data_len = data.len();
        let decryptor: cbc::Decryptor<Aes128> = cbc::Decryptor::new_from_slices(key, iv)
            .map_err(|_| invalid_cipher_key(key, &[16]))?;
        decryptor.decrypt_padded::<NoPadding>(data)
            .map_err(|_| misaligned(data_len, 16))?;
        Ok(())
    }

    fn encrypt_padded_data(&self, data: &mut [u8], key: &[u8], iv: &[u8]) -> Result<(), Error> {
        let data_len = data.len();
        let encryptor: cbc::Encryptor<Aes128> = cbc::Encryptor::new_from_slices(key, iv)
            .map_err(|_| invalid_cipher_key(key, &[16]))?;
        encryptor.encrypt_padded::<NoPadding>(data, data_len)
            .map_err(|_| misaligned(data_len, 16))?;
        Ok(())
    }
}


/// AES-192-based payload cipher.
///
/// Besides native 24-byte keys, a 16-byte derived key is accepted and extended as:
/// ```plain
/// key192 = key || key[0..8]
/// ```
/// Requested padding is PKCS#7.
pub struct CipherAes192;
impl PayloadCipher for CipherAes192 {
    fn cipher_key_sizes(&self) -> &'static [usize] { &[16, 24] }
    fn cipher_block_size(&self) -> usize { 16 }
    fn padding(&self) -> PayloadPadding { PayloadPadding::Pkcs7 }

    fn prepare_key(&self, key: &[u8]) -> Result<Zeroizing<Vec<u8>>, Error> {
        match key.len() {
            16 => {
                let mut extended = Zeroizing::new(Vec::with_capacity(24));
                extended.extend_from_slice(key);
                extended.extend_from_slice(&key[0..8]);
                Ok(extended)
            },
            24 => Ok(Zeroizing::new(key.to_vec())),
            _ => Err(invalid_cipher_key(key, self.cipher_key_sizes())),
        }
    }

    fn decrypt_padded_data(&self, data: &mut [u8], key: &[u8], iv: &[u8]) -> Result<(), Error> {
        let data_len = data.len();
        let decryptor: cbc::Decryptor<Aes192> = cbc::Decryptor::new_from_slices(key, iv)
            .map_err(|_| invalid_cipher_key(key, &[24]))?;
        decryptor.decrypt_padded::<NoPadding>(data)
            .map_err(|_| misaligned(data_len, 16))?;
        Ok(())
    }

    fn encrypt_padded_data(&self, data: &mut [u8], key: &[u8], iv: &[u8]) -> Result<(), Error> {
        let data_len = data.len();
        let encryptor: cbc::Encryptor<Aes192> = cbc::Encryptor::new_from_slices(key, iv)
            .map_err(|_| invalid_cipher_key(key, &[24]))?;
        encryptor.encrypt_padded::<NoPadding>(data, data_len)
            .map_err(|_| misaligned(data_len, 16))?;
        Ok(())
    }
}


/// AES-256-based payload cipher.
///
/// Besides native 32-byte keys, a 16-byte derived key is accepted and extended as:
/// ```plain
/// key256 = key || key
/// ```
/// Requested padding is PKCS#7.
pub struct CipherAes256;
impl PayloadCipher for CipherAes256 {
    fn cipher_key_sizes(&self) -> &'static [usize] { &[16, 32] }
    fn cipher_block_size(&self) -> usize { 16 }
    fn padding(&self) -> PayloadPadding { PayloadPadding::Pkcs7 }

    fn prepare_key(&self, key: &[u8]) -> Result<Zeroizing<Vec<u8>>, Error> {
        match key.len() {
            16 => {
                let mut extended = Zeroizing::new(Vec::with_capacity(32));
                extended.extend_from_slice(key);
                extended.extend_from_slice(key);
                Ok(extended)
            },
            32 => Ok(Zeroizing::new(key.to_vec())),
            _ => Err(invalid_cipher_key(key, self.cipher_key_sizes())),
        }
    }

    fn decrypt_padded_data(&self, data: &mut [u8], key: &[u8], iv: &[u8]) -> Result<(), Error> {
        let data_len = data.len();
        let decryptor: cbc::Decryptor<Aes256> = cbc::Decryptor::new_from_slices(key, iv)
            .map_err(|_| invalid_cipher_key(key, &[32]))?;
        decryptor.decrypt_padded::<NoPadding>(data)
            .map_err(|_| misaligned(data_len, 16))?;
        Ok(())
    }

    fn encrypt_padded_data(&self, data: &mut [u8], key: &[u8], iv: &[u8]) -> Result<(), Error> {
        let data_len = data.len();
        let encryptor: cbc::Encryptor<Aes256> = cbc::Encryptor::new_from_slices(key, iv)
            .map_err(|_| invalid_cipher_key(key, &[32]))?;
        encryptor.encrypt_padded::<NoPadding>(data, data_len)
            .map_err(|_| misaligned(data_len, 16))?;
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::{Cipher3Des, CipherAes128, CipherAes192, CipherAes256, PayloadCipher, PayloadPadding};
    use crate::error::Error;
    use hex_literal::hex;

    #[test]
    fn test_nul_padding_only_when_unaligned() {
        let padded = PayloadPadding::Nul.pad(b"abc", 8);
        assert_eq!(padded.as_slice(), b"abc\0\0\0\0\0");
        let aligned = PayloadPadding::Nul.pad(b"abcdefgh", 8);
        assert_eq!(aligned.as_slice(), b"abcdefgh");
    }

    #[test]
    fn test_pkcs7_padding_always_added() {
        let padded = PayloadPadding::Pkcs7.pad(b"abc", 8);
        assert_eq!(padded.as_slice(), &hex!("6162630505050505"));
        let aligned = PayloadPadding::Pkcs7.pad(b"abcdefgh", 8);
        assert_eq!(aligned.len(), 16);
        assert_eq!(&aligned[8..], &[0x08; 8]);
        assert_eq!(PayloadPadding::Pkcs7.unpadded_len(&aligned, 8), Ok(8));
    }

    #[test]
    fn test_pkcs7_unpad_rejects_garbage() {
        let bogus = hex!("6162636465666700");
        assert_eq!(PayloadPadding::Pkcs7.unpadded_len(&bogus, 8), Err(Error::InvalidPadding));
        let bogus = hex!("6162636465660302");
        assert_eq!(PayloadPadding::Pkcs7.unpadded_len(&bogus, 8), Err(Error::InvalidPadding));
    }

    #[test]
    fn test_key_extension() {
        let key = hex!("27F66D5244FF621EAA6F6120EDEB427F");
        let extended = CipherAes192.prepare_key(&key).unwrap();
        assert_eq!(extended.as_slice(), &hex!("27F66D5244FF621EAA6F6120EDEB427F27F66D5244FF621E"));
        let extended = CipherAes256.prepare_key(&key).unwrap();
        assert_eq!(&extended[..16], &key);
        assert_eq!(&extended[16..], &key);
        assert!(CipherAes128.prepare_key(&extended).is_err());
    }

    #[test]
    fn test_unpadded_misaligned_input_rejected() {
        let key = [0x11u8; 16];
        assert_eq!(
            Cipher3Des.encrypt(&key, b"seven b", false),
            Err(Error::InvalidBlockAlignment { data_length: 7, block_size: 8 }),
        );
        assert_eq!(
            CipherAes128.decrypt(&key, &[0u8; 17], false),
            Err(Error::InvalidBlockAlignment { data_length: 17, block_size: 16 }),
        );
    }

    #[test]
    fn test_three_key_round_trip() {
        let key = hex!("0123456789ABCDEFFEDCBA987654321089ABCDEF01234567");
        let plaintext = b"sixteen byte msg";
        let ciphertext = Cipher3Des.encrypt(&key, plaintext, false).unwrap();
        assert_ne!(ciphertext.as_slice(), plaintext);
        let decrypted = Cipher3Des.decrypt(&key, &ciphertext, false).unwrap();
        assert_eq!(decrypted.as_slice(), plaintext);
    }
}
