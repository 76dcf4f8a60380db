//! Key Serial Numbers.
//!
//! A legacy (ANSI X9.24-1) KSN is 80 bits long:
//! ```plain
//! | key set ID (40 bits) | TRSM ID (19 bits) | transaction counter (21 bits) |
//! ```
//! An AES (ANSI X9.24-3) KSN is 96 bits long:
//! ```plain
//! | BDK ID (32 bits) | derivation ID (32 bits) | transaction counter (32 bits) |
//! ```
//! where the BDK ID and derivation ID together form the Initial Key ID.
//!
//! The originating device increments the counter after each transaction, skipping every value
//! whose binary representation has more set bits than the receiving side is willing to process.


use std::fmt;

use crate::error::Error;


pub const LEGACY_KSN_LEN: usize = 10;
pub const LEGACY_COUNTER_BITS: usize = 21;
pub const LEGACY_COUNTER_MASK: u32 = (1 << LEGACY_COUNTER_BITS) - 1;
pub const LEGACY_MAX_SET_BITS: u32 = 10;

pub const AES_KSN_LEN: usize = 12;
pub const AES_MAX_SET_BITS: u32 = 16;


fn next_counter(counter: u32, max_counter: u32, max_set_bits: u32) -> Result<u32, Error> {
    let mut next = counter.checked_add(1)
        .ok_or(Error::CounterExhausted)?;
    while next.count_ones() > max_set_bits {
        // adding the lowest set bit carries into the higher bits, reducing the population
        next = next.checked_add(next & next.wrapping_neg())
            .ok_or(Error::CounterExhausted)?;
    }
    if next > max_counter {
        return Err(Error::CounterExhausted);
    }
    Ok(next)
}


/// A legacy 80-bit key serial number.
#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct LegacyKsn {
    bytes: [u8; LEGACY_KSN_LEN],
}
impl LegacyKsn {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let bytes = bytes.try_into()
            .map_err(|_| Error::InvalidKsnLength {
                obtained_length: bytes.len(),
                expected_length: LEGACY_KSN_LEN,
            })?;
        Ok(Self { bytes })
    }

    pub fn from_hex(hex_string: &str) -> Result<Self, Error> {
        Self::from_bytes(&hex::decode(hex_string)?)
    }

    pub fn as_bytes(&self) -> &[u8; LEGACY_KSN_LEN] {
        &self.bytes
    }

    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.bytes)
    }

    /// The key set identifier, i.e. the leftmost 40 bits.
    pub fn key_set_id(&self) -> [u8; 5] {
        let mut ret = [0u8; 5];
        ret.copy_from_slice(&self.bytes[0..5]);
        ret
    }

    /// The 19-bit identifier of the tamper-resistant security module.
    pub fn trsm_id(&self) -> u32 {
        (u32::from(self.bytes[5]) << 11)
            | (u32::from(self.bytes[6]) << 3)
            | (u32::from(self.bytes[7]) >> 5)
    }

    /// The 21-bit transaction counter.
    pub fn counter(&self) -> u32 {
        let low = u32::from_be_bytes([0, self.bytes[7], self.bytes[8], self.bytes[9]]);
        low & LEGACY_COUNTER_MASK
    }

    /// Returns a copy of this KSN with the transaction counter replaced.
    pub fn with_counter(&self, counter: u32) -> Result<Self, Error> {
        if counter > LEGACY_COUNTER_MASK {
            return Err(Error::CounterExhausted);
        }
        let mut bytes = self.bytes;
        let counter_bytes = counter.to_be_bytes();
        bytes[7] = (bytes[7] & 0b1110_0000) | counter_bytes[1];
        bytes[8] = counter_bytes[2];
        bytes[9] = counter_bytes[3];
        Ok(Self { bytes })
    }

    /// Returns a copy of this KSN with the transaction counter set to zero.
    ///
    /// This is the KSN from which the initial key is derived.
    pub fn base(&self) -> Self {
        let mut bytes = self.bytes;
        bytes[7] &= 0b1110_0000;
        bytes[8] = 0x00;
        bytes[9] = 0x00;
        Self { bytes }
    }

    /// Returns the KSN of the next transaction, skipping counter values with more than ten set
    /// bits.
    pub fn next(&self) -> Result<Self, Error> {
        let counter = next_counter(self.counter(), LEGACY_COUNTER_MASK, LEGACY_MAX_SET_BITS)?;
        self.with_counter(counter)
    }
}
impl fmt::Debug for LegacyKsn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LegacyKsn({})", self.to_hex())
    }
}


/// An AES DUKPT 96-bit key serial number.
#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct AesKsn {
    bytes: [u8; AES_KSN_LEN],
}
impl AesKsn {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let bytes = bytes.try_into()
            .map_err(|_| Error::InvalidKsnLength {
                obtained_length: bytes.len(),
                expected_length: AES_KSN_LEN,
            })?;
        Ok(Self { bytes })
    }

    pub fn from_hex(hex_string: &str) -> Result<Self, Error> {
        Self::from_bytes(&hex::decode(hex_string)?)
    }

    pub fn as_bytes(&self) -> &[u8; AES_KSN_LEN] {
        &self.bytes
    }

    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.bytes)
    }

    /// The Initial Key ID, i.e. the BDK ID followed by the derivation ID.
    pub fn initial_key_id(&self) -> [u8; 8] {
        let mut ret = [0u8; 8];
        ret.copy_from_slice(&self.bytes[0..8]);
        ret
    }

    pub fn bdk_id(&self) -> [u8; 4] {
        let mut ret = [0u8; 4];
        ret.copy_from_slice(&self.bytes[0..4]);
        ret
    }

    pub fn derivation_id(&self) -> [u8; 4] {
        let mut ret = [0u8; 4];
        ret.copy_from_slice(&self.bytes[4..8]);
        ret
    }

    /// The 32-bit transaction counter.
    pub fn counter(&self) -> u32 {
        u32::from_be_bytes([self.bytes[8], self.bytes[9], self.bytes[10], self.bytes[11]])
    }

    /// Returns a copy of this KSN with the transaction counter replaced.
    pub fn with_counter(&self, counter: u32) -> Self {
        let mut bytes = self.bytes;
        bytes[8..12].copy_from_slice(&counter.to_be_bytes());
        Self { bytes }
    }

    /// Returns a copy of this KSN with the transaction counter set to zero.
    pub fn base(&self) -> Self {
        self.with_counter(0)
    }

    /// Returns the KSN of the next transaction, skipping counter values with more than sixteen set
    /// bits.
    pub fn next(&self) -> Result<Self, Error> {
        let counter = next_counter(self.counter(), u32::MAX, AES_MAX_SET_BITS)?;
        Ok(self.with_counter(counter))
    }
}
impl fmt::Debug for AesKsn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AesKsn({})", self.to_hex())
    }
}
