use dukpt::aes::{self, AesDukpt, KeyType, KeyUsage};
use dukpt::crypt::mac::{cmac_aes, verify_cmac_aes};
use dukpt::error::Error;
use dukpt::ksn::AesKsn;
use hex_literal::hex;


const BDK_128: [u8; 16] = hex!("FEDCBA9876543210F1F1F1F1F1F1F1F1");
const BDK_192: [u8; 24] = hex!("FEDCBA9876543210F1F1F1F1F1F1F1F1FEDCBA9876543210");
const BDK_256: [u8; 32] = hex!("FEDCBA9876543210F1F1F1F1F1F1F1F1FEDCBA9876543210F1F1F1F1F1F1F1F1");
const INITIAL_KEY_ID: [u8; 8] = hex!("1234567890123456");


fn ksn(counter: u32) -> [u8; 12] {
    let mut ret = [0u8; 12];
    ret[0..8].copy_from_slice(&INITIAL_KEY_ID);
    ret[8..12].copy_from_slice(&counter.to_be_bytes());
    ret
}

fn working_key(bdk: &[u8], counter: u32, usage: KeyUsage, key_type: KeyType) -> Vec<u8> {
    AesDukpt::new(usage, key_type).unwrap()
        .working_key(bdk, &ksn(counter))
        .unwrap()
        .to_vec()
}


#[test]
fn test_aes128_transaction_keys() {
    let initial_key = aes::initial_key(&BDK_128, &ksn(0)).unwrap();
    assert_eq!(initial_key.as_slice(), &hex!("1273671EA26AC29AFA4D1084127652A1"));

    // (counter, intermediate derivation key, PIN key)
    let expected = [
        (0x0000_0000, hex!("1273671EA26AC29AFA4D1084127652A1"), hex!("34BDB65CC226DC0C4097D0982FF606EA")),
        (0x0000_0001, hex!("4F21B565BAD9835E112B6465635EAE44"), hex!("AF8CB133A78F8DC2D1359F18527593FB")),
        (0x0000_0002, hex!("2F34D68DE10F68D38091A73B9E7C437C"), hex!("D30BDC73EC9714B000BEC66BDB7B6D09")),
        (0x0000_0003, hex!("031504E530365CF81264238540518318"), hex!("7D69F01F3B45449F62C7816ECE723268")),
        (0xFFFF_0000, hex!("F6BA59389BD14A9855BE9727E7C52E3C"), hex!("27EFAC1D158632588F4AC69E45C247C4")),
    ];
    for (counter, intermediate, pin_key) in expected {
        let ksn = ksn(counter);
        assert_eq!(aes::intermediate_key(&initial_key, &ksn).unwrap().as_slice(), &intermediate);
        assert_eq!(AesDukpt::default().working_key(&BDK_128, &ksn).unwrap().as_slice(), &pin_key);
        assert_eq!(
            AesDukpt::default().working_key_from_initial_key(&initial_key, &ksn).unwrap().as_slice(),
            &pin_key,
        );
    }
}

#[test]
fn test_aes128_usages() {
    assert_eq!(
        working_key(&BDK_128, 1, KeyUsage::DataEncryptionEncrypt, KeyType::Aes128),
        hex!("A35C412EFD41FDB98B69797C02DCD08F"),
    );
    assert_eq!(
        working_key(&BDK_128, 8, KeyUsage::DataEncryptionEncrypt, KeyType::Aes128),
        hex!("650F34204ABD4E57764D61AC3D266FB1"),
    );
    assert_eq!(
        working_key(&BDK_128, 8, KeyUsage::MacGeneration, KeyType::Aes128),
        hex!("6FD572E5D59E618875F193484F9178FB"),
    );
}

#[test]
fn test_cmac_with_mac_generation_key() {
    let mac_key = working_key(&BDK_128, 8, KeyUsage::MacGeneration, KeyType::Aes128);
    let tag = cmac_aes(&mac_key, b"4012345678909").unwrap();
    assert_eq!(tag, hex!("7E283E0FB567F4CDC3D749A4DF169221"));
    assert!(verify_cmac_aes(&mac_key, b"4012345678909", &tag[..8]).unwrap());
}

#[test]
fn test_aes192_bdk() {
    let initial_key = aes::initial_key(&BDK_192, &ksn(1)).unwrap();
    assert_eq!(initial_key.as_slice(), &hex!("5B6DEE2B5B7FABFFA32591F35BF8F23DD9329AE85131E584"));

    assert_eq!(
        working_key(&BDK_192, 1, KeyUsage::PinEncryption, KeyType::Aes128),
        hex!("3C318CDBF08322279557201E98DBB3F3"),
    );
    assert_eq!(
        working_key(&BDK_192, 1, KeyUsage::MacGeneration, KeyType::Aes128),
        hex!("3E7009C74E8166BC9059D3D92D36B487"),
    );
    assert_eq!(
        working_key(&BDK_192, 1, KeyUsage::PinEncryption, KeyType::Tdes2),
        hex!("9EF1031B002F92F5C5C8801BC832A4B3"),
    );
    assert_eq!(
        working_key(&BDK_192, 1, KeyUsage::DataEncryptionBothWays, KeyType::Aes192),
        hex!("2641180D4947F7BC4D2C4CD6409CC48D74B6AF25C51150E6"),
    );

    let too_long = AesDukpt::new(KeyUsage::DataEncryptionEncrypt, KeyType::Aes256).unwrap();
    assert!(matches!(
        too_long.working_key(&BDK_192, &ksn(1)),
        Err(Error::UnsupportedVariant { .. }),
    ));
}

#[test]
fn test_aes256_bdk() {
    let initial_key = aes::initial_key(&BDK_256, &ksn(1)).unwrap();
    assert_eq!(
        initial_key.as_slice(),
        &hex!("CE9CE0C101D1138F97FB6CAD4DF045A7083D4EAE2D35A31789D01CCF0949550F"),
    );

    assert_eq!(
        working_key(&BDK_256, 1, KeyUsage::PinEncryption, KeyType::Aes128),
        hex!("09C9C432966811D6B2C3336BAC1B1202"),
    );
    assert_eq!(
        working_key(&BDK_256, 1, KeyUsage::DataEncryptionEncrypt, KeyType::Aes256),
        hex!("71EB36C9A6B7F801D1D1700C29741FC5A5C4E9B45D742DA7AF6992B8AA29AF58"),
    );
    assert_eq!(
        working_key(&BDK_256, 1, KeyUsage::MacGeneration, KeyType::Aes128),
        hex!("F04A1FABD4176E15490CEC82E217A96D"),
    );
    assert_eq!(
        working_key(&BDK_256, 1, KeyUsage::PinEncryption, KeyType::Tdes2),
        hex!("B0E134502325F26B9466225A043B62EF"),
    );
    assert_eq!(
        working_key(&BDK_256, 1, KeyUsage::DataEncryptionBothWays, KeyType::Aes192),
        hex!("01B52DD8E3CC9B7B0D1A43020095799706CB7B3951D07EDB"),
    );
}

#[test]
fn test_originator_counter_sequence() {
    let mut ksn = AesKsn::from_bytes(&ksn(0)).unwrap();
    let mut pin_keys = Vec::new();
    for _ in 0..3 {
        ksn = ksn.next().unwrap();
        pin_keys.push(AesDukpt::default().working_key(&BDK_128, ksn.as_bytes()).unwrap());
    }
    assert_eq!(ksn.counter(), 3);
    assert_eq!(pin_keys[0].as_slice(), &hex!("AF8CB133A78F8DC2D1359F18527593FB"));
    assert_eq!(pin_keys[1].as_slice(), &hex!("D30BDC73EC9714B000BEC66BDB7B6D09"));
    assert_eq!(pin_keys[2].as_slice(), &hex!("7D69F01F3B45449F62C7816ECE723268"));
}
