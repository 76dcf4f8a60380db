//! Operations common to the legacy and AES derivation schemes.


use zeroize::Zeroizing;

use crate::aes::{self, AesDukpt};
use crate::error::Error;
use crate::ksn::{AES_KSN_LEN, LEGACY_KSN_LEN};
use crate::tdes::DukptVariant;


/// A DUKPT key derivation scheme.
///
/// Both schemes derive a per-device initial key from the BDK once; the key for each transaction
/// is then derived from the initial key alone.
pub trait DerivationScheme {
    /// Length of the key serial numbers this scheme processes, in bytes.
    fn ksn_len(&self) -> usize;

    /// Derives the initial key (IPEK for the legacy scheme) from the BDK and KSN.
    fn initial_key(&self, bdk: &[u8], ksn: &[u8]) -> Result<Zeroizing<Vec<u8>>, Error>;

    /// Derives the use-specific transaction key from the initial key and KSN.
    fn transaction_key(&self, initial_key: &[u8], ksn: &[u8]) -> Result<Zeroizing<Vec<u8>>, Error>;

    /// Derives the use-specific transaction key from the BDK and KSN.
    fn derive_key(&self, bdk: &[u8], ksn: &[u8]) -> Result<Zeroizing<Vec<u8>>, Error> {
        let initial_key = self.initial_key(bdk, ksn)?;
        self.transaction_key(&initial_key, ksn)
    }
}


impl DerivationScheme for DukptVariant {
    fn ksn_len(&self) -> usize { LEGACY_KSN_LEN }

    fn initial_key(&self, bdk: &[u8], ksn: &[u8]) -> Result<Zeroizing<Vec<u8>>, Error> {
        self.compute_ipek(bdk, ksn)
    }

    fn transaction_key(&self, initial_key: &[u8], ksn: &[u8]) -> Result<Zeroizing<Vec<u8>>, Error> {
        self.compute_key_from_ipek(initial_key, ksn)
    }
}


impl DerivationScheme for AesDukpt {
    fn ksn_len(&self) -> usize { AES_KSN_LEN }

    fn initial_key(&self, bdk: &[u8], ksn: &[u8]) -> Result<Zeroizing<Vec<u8>>, Error> {
        aes::initial_key(bdk, ksn)
    }

    fn transaction_key(&self, initial_key: &[u8], ksn: &[u8]) -> Result<Zeroizing<Vec<u8>>, Error> {
        self.working_key_from_initial_key(initial_key, ksn)
    }
}


#[cfg(test)]
mod tests {
    use super::DerivationScheme;
    use crate::aes::AesDukpt;
    use crate::tdes::DukptVariant;
    use hex_literal::hex;

    fn derive_both_ways(scheme: &dyn DerivationScheme, bdk: &[u8], ksn: &[u8]) -> Vec<u8> {
        assert_eq!(ksn.len(), scheme.ksn_len());
        let direct = scheme.derive_key(bdk, ksn).unwrap();
        let initial_key = scheme.initial_key(bdk, ksn).unwrap();
        let via_initial_key = scheme.transaction_key(&initial_key, ksn).unwrap();
        assert_eq!(direct, via_initial_key);
        direct.to_vec()
    }

    #[test]
    fn test_schemes_behind_trait_objects() {
        let legacy = derive_both_ways(
            &DukptVariant::default(),
            &hex!("0123456789ABCDEFFEDCBA9876543210"),
            &hex!("FFFF9876543210E00008"),
        );
        assert_eq!(legacy, hex!("27F66D5244FF621EAA6F6120EDEB427F"));

        let aes = derive_both_ways(
            &AesDukpt::default(),
            &hex!("FEDCBA9876543210F1F1F1F1F1F1F1F1"),
            &hex!("123456789012345600000002"),
        );
        assert_eq!(aes, hex!("D30BDC73EC9714B000BEC66BDB7B6D09"));
    }
}
