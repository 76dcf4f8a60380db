//! Legacy (Triple DES) DUKPT as specified in ANSI X9.24-1.
//!
//! The initial PIN encryption key (IPEK) is derived from the base derivation key (BDK) and the
//! KSN with its 21-bit transaction counter cleared. The key for a specific transaction is then
//! obtained by walking the set bits of the counter from the most to the least significant one,
//! running the non-reversible key generation process once per set bit:
//! ```plain
//! R2 = DES(K_left, R ^ K_right) ^ K_right
//! K' = K ^ key_register_bitmask
//! R1 = DES(K'_left, R ^ K'_right) ^ K'_right
//! K  = R1 || R2
//! ```
//! where `R` is the rightmost 64 bits of the KSN with the counter bits processed so far.
//!
//! The resulting (future) key is turned into a use-specific key by XORing a variant mask into it.


use tracing::{debug, instrument, trace};
use zeroize::Zeroizing;

use crate::crypt::block::{DesBlock, TdesBlock};
use crate::error::{Error, KeyRole};
use crate::register::BitRegister;


/// Length of a BDK, IPEK or derived key in bytes.
pub const KEY_LEN: usize = 16;

/// Length of a KSN in bytes.
pub const KSN_LEN: usize = 10;

const KSN_BITS: usize = KSN_LEN * 8;
const COUNTER_BITS: usize = 21;
const COUNTER_START: usize = KSN_BITS - COUNTER_BITS;


pub const KEY_REGISTER_BITMASK: [u8; KEY_LEN] = [
    0xC0, 0xC0, 0xC0, 0xC0, 0x00, 0x00, 0x00, 0x00,
    0xC0, 0xC0, 0xC0, 0xC0, 0x00, 0x00, 0x00, 0x00,
];
pub const PIN_VARIANT_BITMASK: [u8; KEY_LEN] = [
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xFF,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xFF,
];
pub const MAC_REQUEST_VARIANT_BITMASK: [u8; KEY_LEN] = [
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xFF, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xFF, 0x00,
];
pub const MAC_RESPONSE_VARIANT_BITMASK: [u8; KEY_LEN] = [
    0x00, 0x00, 0x00, 0x00, 0xFF, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0xFF, 0x00, 0x00, 0x00,
];
pub const DATA_REQUEST_VARIANT_BITMASK: [u8; KEY_LEN] = [
    0x00, 0x00, 0x00, 0x00, 0x00, 0xFF, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0xFF, 0x00, 0x00,
];
pub const DATA_RESPONSE_VARIANT_BITMASK: [u8; KEY_LEN] = [
    0x00, 0x00, 0x00, 0xFF, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0xFF, 0x00, 0x00, 0x00, 0x00,
];


fn check_key_len(key: &[u8], role: KeyRole) -> Result<(), Error> {
    if key.len() != KEY_LEN {
        debug!(obtained_length = key.len(), "rejecting {}", role);
        return Err(Error::InvalidKeyLength {
            role,
            obtained_length: key.len(),
            expected_lengths: &[KEY_LEN],
        });
    }
    Ok(())
}

fn check_ksn_len(ksn: &[u8]) -> Result<(), Error> {
    if ksn.len() != KSN_LEN {
        debug!(obtained_length = ksn.len(), "rejecting key serial number");
        return Err(Error::InvalidKsnLength {
            obtained_length: ksn.len(),
            expected_length: KSN_LEN,
        });
    }
    Ok(())
}

fn block_of(data: &BitRegister) -> Result<Zeroizing<[u8; 8]>, Error> {
    <[u8; 8]>::try_from(data.as_bytes())
        .map(Zeroizing::new)
        .map_err(|_| Error::LengthMismatch {
            left_bits: data.bit_len(),
            right_bits: 64,
        })
}

fn des_encrypt(key: &BitRegister, data: &BitRegister) -> Result<BitRegister, Error> {
    let des = DesBlock::new(key.as_bytes())?;
    let mut block = block_of(data)?;
    des.encrypt_block(&mut block);
    Ok(BitRegister::from_bytes(&*block))
}

fn tdes_encrypt(key: &BitRegister, data: &BitRegister) -> Result<BitRegister, Error> {
    let tdes = TdesBlock::new(key.as_bytes())?;
    let mut block = block_of(data)?;
    tdes.encrypt_block(&mut block);
    Ok(BitRegister::from_bytes(&*block))
}


/// A legacy DUKPT variant, described by its key register bitmask and its variant bitmask.
///
/// The default is the ANSI X9.24-1 key register bitmask with the PIN encryption variant.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DukptVariant {
    key_register_bitmask: BitRegister,
    variant_bitmask: BitRegister,
}
impl DukptVariant {
    /// Creates a variant from custom bitmasks. Both must be 128 bits long.
    pub fn new(key_register_bitmask: BitRegister, variant_bitmask: BitRegister) -> Result<Self, Error> {
        if key_register_bitmask.byte_len() != KEY_LEN {
            return Err(Error::UnsupportedVariant { reason: "key register bitmask must be 128 bits long" });
        }
        if variant_bitmask.byte_len() != KEY_LEN {
            return Err(Error::UnsupportedVariant { reason: "variant bitmask must be 128 bits long" });
        }
        Ok(Self {
            key_register_bitmask,
            variant_bitmask,
        })
    }

    fn standard(variant_bitmask: &[u8; KEY_LEN]) -> Self {
        Self {
            key_register_bitmask: BitRegister::from_bytes(&KEY_REGISTER_BITMASK),
            variant_bitmask: BitRegister::from_bytes(variant_bitmask),
        }
    }

    pub fn pin() -> Self { Self::standard(&PIN_VARIANT_BITMASK) }
    pub fn mac_request() -> Self { Self::standard(&MAC_REQUEST_VARIANT_BITMASK) }
    pub fn mac_response() -> Self { Self::standard(&MAC_RESPONSE_VARIANT_BITMASK) }
    pub fn data_request() -> Self { Self::standard(&DATA_REQUEST_VARIANT_BITMASK) }
    pub fn data_response() -> Self { Self::standard(&DATA_RESPONSE_VARIANT_BITMASK) }

    pub fn key_register_bitmask(&self) -> &BitRegister {
        &self.key_register_bitmask
    }

    pub fn variant_bitmask(&self) -> &BitRegister {
        &self.variant_bitmask
    }

    /// Runs one round of the non-reversible key generation process.
    fn generate_key(&self, key: &BitRegister, data: &BitRegister) -> Result<BitRegister, Error> {
        let (key_left, key_right) = key.halves()?;
        let right = des_encrypt(&key_left, &data.xor(&key_right)?)?
            .xor(&key_right)?;

        let masked_key = key.xor(&self.key_register_bitmask)?;
        let (masked_left, masked_right) = masked_key.halves()?;
        let left = des_encrypt(&masked_left, &data.xor(&masked_right)?)?
            .xor(&masked_right)?;

        Ok(left.concat(&right))
    }

    /// Derives the IPEK from a BDK and a KSN, ignoring the KSN's transaction counter.
    #[instrument(skip_all)]
    pub fn derive_ipek(&self, bdk: &BitRegister, ksn: &BitRegister) -> Result<BitRegister, Error> {
        check_key_len(bdk.as_bytes(), KeyRole::BaseDerivationKey)?;
        check_ksn_len(ksn.as_bytes())?;

        let base_ksn = ksn
            .with_bits_cleared(COUNTER_START..KSN_BITS)?
            .slice(0..64)?;
        let left = tdes_encrypt(bdk, &base_ksn)?;
        let right = tdes_encrypt(&bdk.xor(&self.key_register_bitmask)?, &base_ksn)?;
        Ok(left.concat(&right))
    }

    /// Derives the future key for the KSN's transaction counter, without applying the variant.
    ///
    /// A counter of zero returns the IPEK unchanged.
    #[instrument(skip_all)]
    pub fn derive_future_key(&self, ipek: &BitRegister, ksn: &BitRegister) -> Result<BitRegister, Error> {
        check_key_len(ipek.as_bytes(), KeyRole::InitialKey)?;
        check_ksn_len(ksn.as_bytes())?;

        let mut counter = ksn.with_bits_cleared(COUNTER_START..KSN_BITS)?;
        let mut key = ipek.clone();
        for position in COUNTER_START..KSN_BITS {
            if !ksn.bit(position)? {
                continue;
            }
            trace!(position, "key generation round");
            counter = counter.with_bit(position, true)?;
            let data = counter.slice(16..KSN_BITS)?;
            key = self.generate_key(&key, &data)?;
        }
        Ok(key)
    }

    /// Derives the transaction key for the KSN and applies this variant's mask.
    pub fn derive_current_key(&self, ipek: &BitRegister, ksn: &BitRegister) -> Result<BitRegister, Error> {
        let future_key = self.derive_future_key(ipek, ksn)?;
        self.mask(&future_key)
    }

    /// XORs the variant bitmask into the given key.
    pub fn mask(&self, key: &BitRegister) -> Result<BitRegister, Error> {
        key.xor(&self.variant_bitmask)
    }

    /// Computes the IPEK from a 16-byte BDK and a 10-byte KSN.
    pub fn compute_ipek(&self, bdk: &[u8], ksn: &[u8]) -> Result<Zeroizing<Vec<u8>>, Error> {
        let ipek = self.derive_ipek(&BitRegister::from_bytes(bdk), &BitRegister::from_bytes(ksn))?;
        Ok(ipek.to_bytes())
    }

    /// Computes the variant-masked transaction key from a 16-byte BDK and a 10-byte KSN.
    pub fn compute_key(&self, bdk: &[u8], ksn: &[u8]) -> Result<Zeroizing<Vec<u8>>, Error> {
        let ipek = self.compute_ipek(bdk, ksn)?;
        self.compute_key_from_ipek(&ipek, ksn)
    }

    /// Computes the variant-masked transaction key from a previously derived IPEK.
    pub fn compute_key_from_ipek(&self, ipek: &[u8], ksn: &[u8]) -> Result<Zeroizing<Vec<u8>>, Error> {
        let key = self.derive_current_key(&BitRegister::from_bytes(ipek), &BitRegister::from_bytes(ksn))?;
        Ok(key.to_bytes())
    }

    /// Computes the unmasked future key from a 16-byte BDK and a 10-byte KSN.
    ///
    /// The `to_*_key` functions turn the result into use-specific keys.
    pub fn compute_future_key(&self, bdk: &[u8], ksn: &[u8]) -> Result<Zeroizing<Vec<u8>>, Error> {
        let ksn = BitRegister::from_bytes(ksn);
        let ipek = self.derive_ipek(&BitRegister::from_bytes(bdk), &ksn)?;
        Ok(self.derive_future_key(&ipek, &ksn)?.to_bytes())
    }

    /// XORs the variant bitmask into a 16-byte key.
    ///
    /// Applying the same variant twice restores the original key.
    pub fn apply_variant(&self, key: &[u8]) -> Result<Zeroizing<Vec<u8>>, Error> {
        check_key_len(key, KeyRole::DerivedKey)?;
        Ok(self.mask(&BitRegister::from_bytes(key))?.to_bytes())
    }
}
impl Default for DukptVariant {
    fn default() -> Self { Self::pin() }
}


/// Turns a data-variant key into a data encryption key.
///
/// Each half of the key is encrypted with two-key Triple DES under the key itself. Unlike variant
/// masking, this step cannot be undone.
pub fn to_data_key(derived_key: &[u8]) -> Result<Zeroizing<Vec<u8>>, Error> {
    check_key_len(derived_key, KeyRole::DerivedKey)?;
    let tdes = TdesBlock::new(derived_key)?;

    let mut data_key = Zeroizing::new(vec![0u8; KEY_LEN]);
    for (source, target) in derived_key.chunks_exact(8).zip(data_key.chunks_exact_mut(8)) {
        let mut block = Zeroizing::new([0u8; 8]);
        block.copy_from_slice(source);
        tdes.encrypt_block(&mut block);
        target.copy_from_slice(&*block);
    }
    Ok(data_key)
}

/// Derives the PIN encryption key from an unmasked future key.
pub fn to_pin_key(future_key: &[u8]) -> Result<Zeroizing<Vec<u8>>, Error> {
    DukptVariant::pin().apply_variant(future_key)
}

/// Derives the request MAC key from an unmasked future key.
pub fn to_mac_request_key(future_key: &[u8]) -> Result<Zeroizing<Vec<u8>>, Error> {
    DukptVariant::mac_request().apply_variant(future_key)
}

/// Derives the response MAC key from an unmasked future key.
pub fn to_mac_response_key(future_key: &[u8]) -> Result<Zeroizing<Vec<u8>>, Error> {
    DukptVariant::mac_response().apply_variant(future_key)
}

/// Derives the request data encryption key from an unmasked future key.
pub fn to_data_request_key(future_key: &[u8]) -> Result<Zeroizing<Vec<u8>>, Error> {
    let variant_key = DukptVariant::data_request().apply_variant(future_key)?;
    to_data_key(&variant_key)
}

/// Derives the response data encryption key from an unmasked future key.
pub fn to_data_response_key(future_key: &[u8]) -> Result<Zeroizing<Vec<u8>>, Error> {
    let variant_key = DukptVariant::data_response().apply_variant(future_key)?;
    to_data_key(&variant_key)
}


#[cfg(test)]
mod tests {
    use super::{
        DukptVariant, block_of, des_encrypt, to_data_key, to_data_request_key, to_mac_request_key,
        to_pin_key,
    };
    use crate::error::{Error, KeyRole};
    use crate::register::BitRegister;
    use hex_literal::hex;

    const BDK: [u8; 16] = hex!("0123456789ABCDEFFEDCBA9876543210");
    const KSN: [u8; 10] = hex!("FFFF9876543210E00008");
    const IPEK: [u8; 16] = hex!("6AC292FAA1315B4D858AB3A3D7D5933A");
    const FUTURE_KEY: [u8; 16] = hex!("27F66D5244FF62E1AA6F6120EDEB4280");

    #[test]
    fn test_ipek() {
        let ipek = DukptVariant::default().compute_ipek(&BDK, &KSN).unwrap();
        assert_eq!(ipek.as_slice(), &IPEK);
    }

    #[test]
    fn test_future_and_current_key() {
        let variant = DukptVariant::default();
        let future_key = variant.compute_future_key(&BDK, &KSN).unwrap();
        assert_eq!(future_key.as_slice(), &FUTURE_KEY);
        let pin_key = variant.compute_key(&BDK, &KSN).unwrap();
        assert_eq!(pin_key.as_slice(), &hex!("27F66D5244FF621EAA6F6120EDEB427F"));
    }

    #[test]
    fn test_counter_zero_yields_ipek() {
        let variant = DukptVariant::default();
        let base_ksn = hex!("FFFF9876543210E00000");
        let future_key = variant.derive_future_key(
            &BitRegister::from_bytes(&IPEK),
            &BitRegister::from_bytes(&base_ksn),
        ).unwrap();
        assert_eq!(future_key.as_bytes(), &IPEK);
    }

    #[test]
    fn test_use_specific_keys() {
        assert_eq!(to_pin_key(&FUTURE_KEY).unwrap().as_slice(), &hex!("27F66D5244FF621EAA6F6120EDEB427F"));
        assert_eq!(to_mac_request_key(&FUTURE_KEY).unwrap().as_slice(), &hex!("27F66D5244FF9DE1AA6F6120EDEBBD80"));
        assert_eq!(to_data_request_key(&FUTURE_KEY).unwrap().as_slice(), &hex!("C39B2778B058AC376FB18DC906F75CBA"));

        let data_variant_key = DukptVariant::data_request().compute_key(&BDK, &KSN).unwrap();
        assert_eq!(to_data_key(&data_variant_key).unwrap().as_slice(), &hex!("C39B2778B058AC376FB18DC906F75CBA"));
    }

    #[test]
    fn test_apply_variant_is_involutive() {
        let variant = DukptVariant::mac_response();
        let masked = variant.apply_variant(&FUTURE_KEY).unwrap();
        assert_ne!(masked.as_slice(), &FUTURE_KEY);
        assert_eq!(variant.apply_variant(&masked).unwrap().as_slice(), &FUTURE_KEY);
    }

    #[test]
    fn test_invalid_lengths() {
        let variant = DukptVariant::default();
        assert_eq!(
            variant.compute_ipek(&BDK[..8], &KSN),
            Err(Error::InvalidKeyLength {
                role: KeyRole::BaseDerivationKey,
                obtained_length: 8,
                expected_lengths: &[16],
            }),
        );
        assert_eq!(
            variant.compute_key_from_ipek(&IPEK, &KSN[..8]),
            Err(Error::InvalidKsnLength { obtained_length: 8, expected_length: 10 }),
        );
        assert!(to_data_key(&[0u8; 24]).is_err());
    }

    #[test]
    fn test_custom_variant_must_be_128_bits() {
        let short = BitRegister::zeroed(8);
        let full = BitRegister::zeroed(16);
        assert!(matches!(
            DukptVariant::new(short.clone(), full.clone()),
            Err(Error::UnsupportedVariant { .. }),
        ));
        assert!(matches!(
            DukptVariant::new(full.clone(), short),
            Err(Error::UnsupportedVariant { .. }),
        ));

        // a zero variant bitmask exposes the future key itself
        let bare = DukptVariant::new(BitRegister::from_hex("C0C0C0C000000000C0C0C0C000000000").unwrap(), full).unwrap();
        assert_eq!(bare.compute_key(&BDK, &KSN).unwrap().as_slice(), &FUTURE_KEY);
    }

    #[test]
    fn test_des_block_must_be_64_bits() {
        let block = block_of(&BitRegister::from_hex("4E6F772069732074").unwrap()).unwrap();
        assert_eq!(*block, hex!("4E6F772069732074"));
        assert_eq!(
            block_of(&BitRegister::zeroed(16)).map(|_| ()),
            Err(Error::LengthMismatch { left_bits: 128, right_bits: 64 }),
        );

        let key = BitRegister::from_hex("0123456789ABCDEF").unwrap();
        assert!(des_encrypt(&key, &BitRegister::zeroed(7)).is_err());
    }
}
