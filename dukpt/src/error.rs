//! Errors reported by key derivation and payload encryption.


use std::fmt;


/// The kind of value whose length was rejected.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum KeyRole {
    BaseDerivationKey,
    InitialKey,
    DerivedKey,
    CipherKey,
    MacKey,
}
impl fmt::Display for KeyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BaseDerivationKey => write!(f, "base derivation key"),
            Self::InitialKey => write!(f, "initial key"),
            Self::DerivedKey => write!(f, "derived key"),
            Self::CipherKey => write!(f, "cipher key"),
            Self::MacKey => write!(f, "MAC key"),
        }
    }
}


/// An error during key derivation, payload encryption or MAC computation.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Error {
    InvalidKeyLength {
        role: KeyRole,
        obtained_length: usize,
        expected_lengths: &'static [usize],
    },
    InvalidKsnLength {
        obtained_length: usize,
        expected_length: usize,
    },
    LengthMismatch {
        left_bits: usize,
        right_bits: usize,
    },
    InvalidBlockAlignment {
        data_length: usize,
        block_size: usize,
    },
    UnsupportedVariant { reason: &'static str },
    BitIndexOutOfRange {
        index: usize,
        bit_len: usize,
    },
    InvalidHex,
    InvalidPadding,
    InvalidCounter {
        counter: u32,
        set_bits: u32,
        max_set_bits: u32,
    },
    CounterExhausted,
}
impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            Self::InvalidKeyLength { role, obtained_length, expected_lengths }
                => write!(f, "{} has length {}, expected one of {:?}", role, obtained_length, expected_lengths),
            Self::InvalidKsnLength { obtained_length, expected_length }
                => write!(f, "key serial number has length {}, expected {}", obtained_length, expected_length),
            Self::LengthMismatch { left_bits, right_bits }
                => write!(f, "bit register lengths differ ({} vs. {} bits)", left_bits, right_bits),
            Self::InvalidBlockAlignment { data_length, block_size }
                => write!(f, "data length {} is not a multiple of the block size {}", data_length, block_size),
            Self::UnsupportedVariant { reason }
                => write!(f, "unsupported DUKPT variant: {}", reason),
            Self::BitIndexOutOfRange { index, bit_len }
                => write!(f, "bit index {} out of range for a register of {} bits", index, bit_len),
            Self::InvalidHex
                => write!(f, "invalid hexadecimal string"),
            Self::InvalidPadding
                => write!(f, "decrypted payload has invalid padding"),
            Self::InvalidCounter { counter, set_bits, max_set_bits }
                => write!(f, "transaction counter 0x{:08X} has {} bits set, at most {} allowed", counter, set_bits, max_set_bits),
            Self::CounterExhausted
                => write!(f, "transaction counter exhausted"),
        }
    }
}
impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidKeyLength { .. } => None,
            Self::InvalidKsnLength { .. } => None,
            Self::LengthMismatch { .. } => None,
            Self::InvalidBlockAlignment { .. } => None,
            Self::UnsupportedVariant { .. } => None,
            Self::BitIndexOutOfRange { .. } => None,
            Self::InvalidHex => None,
            Self::InvalidPadding => None,
            Self::InvalidCounter { .. } => None,
            Self::CounterExhausted => None,
        }
    }
}
impl From<hex::FromHexError> for Error {
    fn from(_value: hex::FromHexError) -> Self { Self::InvalidHex }
}
