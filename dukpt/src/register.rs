//! Fixed-length bit registers.
//!
//! A [`BitRegister`] is an immutable, big-endian sequence of bits whose length is always a
//! multiple of 8. Bit 0 is the most significant bit of the first byte, which matches the order in
//! which the bits appear in the byte and hexadecimal representations. Every operation returns a
//! new register; the storage of each register is wiped when it is dropped.


use std::fmt;
use std::ops::Range;

use subtle::ConstantTimeEq;
use zeroize::Zeroizing;
use zeroize_derive::{Zeroize, ZeroizeOnDrop};

use crate::error::Error;


/// A fixed-length big-endian bit string, zeroized when dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct BitRegister {
    bytes: Vec<u8>,
}
impl BitRegister {
    /// Creates a register holding a copy of the given bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            bytes: bytes.to_vec(),
        }
    }

    /// Creates a register of `byte_len` bytes with all bits cleared.
    pub fn zeroed(byte_len: usize) -> Self {
        Self {
            bytes: vec![0u8; byte_len],
        }
    }

    /// Parses a register from a hexadecimal string (either case).
    pub fn from_hex(hex_string: &str) -> Result<Self, Error> {
        let bytes = Zeroizing::new(hex::decode(hex_string)?);
        Ok(Self::from_bytes(&bytes))
    }

    /// Formats the register as an uppercase hexadecimal string.
    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode_upper(&self.bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Copies the register's contents into a buffer that is wiped when dropped.
    pub fn to_bytes(&self) -> Zeroizing<Vec<u8>> {
        Zeroizing::new(self.bytes.clone())
    }

    pub fn bit_len(&self) -> usize {
        self.bytes.len() * 8
    }

    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    fn check_index(&self, index: usize) -> Result<(), Error> {
        if index >= self.bit_len() {
            return Err(Error::BitIndexOutOfRange { index, bit_len: self.bit_len() });
        }
        Ok(())
    }

    fn check_range(&self, range: &Range<usize>) -> Result<(), Error> {
        if range.start > range.end {
            return Err(Error::BitIndexOutOfRange { index: range.start, bit_len: self.bit_len() });
        }
        if range.end > self.bit_len() {
            return Err(Error::BitIndexOutOfRange { index: range.end, bit_len: self.bit_len() });
        }
        Ok(())
    }

    fn raw_bit(&self, index: usize) -> bool {
        self.bytes[index / 8] & (0x80 >> (index % 8)) != 0
    }

    fn raw_set(&mut self, index: usize, value: bool) {
        let mask = 0x80 >> (index % 8);
        if value {
            self.bytes[index / 8] |= mask;
        } else {
            self.bytes[index / 8] &= !mask;
        }
    }

    /// Returns the value of the bit at the given index.
    pub fn bit(&self, index: usize) -> Result<bool, Error> {
        self.check_index(index)?;
        Ok(self.raw_bit(index))
    }

    /// Returns a copy of this register with the bit at the given index set to `value`.
    pub fn with_bit(&self, index: usize, value: bool) -> Result<Self, Error> {
        self.check_index(index)?;
        let mut ret = self.clone();
        ret.raw_set(index, value);
        Ok(ret)
    }

    /// Returns a copy of this register with every bit in the given range cleared.
    pub fn with_bits_cleared(&self, range: Range<usize>) -> Result<Self, Error> {
        self.check_range(&range)?;
        let mut ret = self.clone();
        for index in range {
            ret.raw_set(index, false);
        }
        Ok(ret)
    }

    /// Returns the bits in the given range as a new register.
    ///
    /// The range may start at any bit, but its length must be a multiple of 8.
    pub fn slice(&self, range: Range<usize>) -> Result<Self, Error> {
        self.check_range(&range)?;
        let bit_count = range.end - range.start;
        if bit_count % 8 != 0 {
            return Err(Error::BitIndexOutOfRange { index: range.end, bit_len: self.bit_len() });
        }

        if range.start % 8 == 0 {
            // byte-aligned; just copy
            return Ok(Self::from_bytes(&self.bytes[range.start/8..range.end/8]));
        }

        let mut ret = Self::zeroed(bit_count / 8);
        for (target, source) in range.enumerate() {
            ret.raw_set(target, self.raw_bit(source));
        }
        Ok(ret)
    }

    /// Splits the register into its left and right halves.
    pub fn halves(&self) -> Result<(Self, Self), Error> {
        if self.bytes.len() % 2 != 0 {
            return Err(Error::LengthMismatch {
                left_bits: self.bit_len() / 2,
                right_bits: self.bit_len() - self.bit_len() / 2,
            });
        }
        let middle = self.bytes.len() / 2;
        Ok((
            Self::from_bytes(&self.bytes[..middle]),
            Self::from_bytes(&self.bytes[middle..]),
        ))
    }

    /// Appends `other` to this register, returning the combined register.
    pub fn concat(&self, other: &BitRegister) -> Self {
        let mut bytes = Vec::with_capacity(self.bytes.len() + other.bytes.len());
        bytes.extend_from_slice(&self.bytes);
        bytes.extend_from_slice(&other.bytes);
        Self { bytes }
    }

    fn combine(&self, other: &BitRegister, op: impl Fn(u8, u8) -> u8) -> Result<Self, Error> {
        if self.bytes.len() != other.bytes.len() {
            return Err(Error::LengthMismatch {
                left_bits: self.bit_len(),
                right_bits: other.bit_len(),
            });
        }
        let bytes = self.bytes.iter()
            .zip(other.bytes.iter())
            .map(|(l, r)| op(*l, *r))
            .collect();
        Ok(Self { bytes })
    }

    /// Bitwise exclusive OR of two registers of equal length.
    pub fn xor(&self, other: &BitRegister) -> Result<Self, Error> {
        self.combine(other, |l, r| l ^ r)
    }

    /// Bitwise AND of this register and a mask of equal length.
    pub fn and(&self, mask: &BitRegister) -> Result<Self, Error> {
        self.combine(mask, |l, r| l & r)
    }
}
impl AsRef<[u8]> for BitRegister {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}
impl From<&[u8]> for BitRegister {
    fn from(value: &[u8]) -> Self { Self::from_bytes(value) }
}
impl PartialEq for BitRegister {
    fn eq(&self, other: &Self) -> bool {
        self.bytes.ct_eq(&other.bytes).into()
    }
}
impl Eq for BitRegister {}
impl fmt::Debug for BitRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // never show the contents; registers usually hold key material
        write!(f, "BitRegister({} bits)", self.bit_len())
    }
}
