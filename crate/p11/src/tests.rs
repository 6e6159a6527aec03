//! These tests require a Luna partition and are gated behind the `luna` feature.
//! ```sh
//! P11_LIB=/usr/safenet/lunaclient/lib/libCryptoki2_64.so \
//! HSM_SLOT_ID=0 HSM_USER_PASSWORD=userpin \
//! cargo test -p luna_p11 --features luna -- --ignored
//! ```
#![allow(clippy::unwrap_used, clippy::panic)]

use pkcs11_sys::{
    CK_ULONG, CKA_CLASS, CKA_DECRYPT, CKA_DERIVE, CKA_EC_PARAMS, CKA_ENCRYPT, CKA_EXTRACTABLE,
    CKA_LABEL, CKA_MODULUS_BITS, CKA_PRIVATE, CKA_PUBLIC_EXPONENT, CKA_SENSITIVE, CKA_SIGN,
    CKA_TOKEN, CKA_UNWRAP, CKA_VALUE_LEN, CKA_VERIFY, CKA_WRAP, CKK_AES, CKK_DES3,
    CKK_GENERIC_SECRET, CKO_SECRET_KEY, CKR_CRYPTOKI_ALREADY_INITIALIZED,
};

use crate::{
    EcCurve, HashSignContext, KeyStatusFlag, LmotsType, LmsType, Mechanism, MlDsaParameterSet,
    MlKemParameterSet, OaepParams, P11Lib, P11Result, PrfKdfParams, Session, SignContext,
    Template,
    test_helpers::{get_hsm_slot_id, load_lib, open_session},
    vendor::{
        CKA_AUTH_DATA, CKA_DECAPSULATE, CKA_ENCAPSULATE, CKA_HSS_KEYS_REMAINING, CKA_HSS_LEVELS,
        CKA_HSS_LMOTS_TYPES, CKA_HSS_LMS_TYPES, CKA_PARAMETER_SET, CKR_KEY_EXHAUSTED,
        CKR_KEY_NOT_AUTHORIZED,
    },
};

fn session_aes_key(label: &str) -> Template {
    Template::new()
        .class(CKO_SECRET_KEY)
        .key_type(CKK_AES)
        .bool(CKA_TOKEN, false)
        .bool(CKA_SENSITIVE, true)
        .bool(CKA_ENCRYPT, true)
        .bool(CKA_DECRYPT, true)
        .ulong(CKA_VALUE_LEN, 32)
        .label(label)
}

#[test]
#[ignore = "Requires a Luna HSM"]
fn test_luna_library_info() -> P11Result<()> {
    let lib = load_lib()?;
    let info = lib.info()?;
    assert!(info.cryptoki_version.major >= 2);
    assert!(!lib.slot_list(true)?.is_empty());
    Ok(())
}

#[test]
#[ignore = "Requires a Luna HSM"]
fn test_luna_aes_cbc_pad_round_trip() -> P11Result<()> {
    let session = open_session()?;
    let key = session.generate_key(&Mechanism::AesKeyGen, &session_aes_key("test-aes"))?;
    let iv: [u8; 16] = session.generate_random(16)?.try_into().unwrap();
    let mechanism = Mechanism::AesCbcPad { iv };
    let ciphertext = session.encrypt(&mechanism, key, b"Earth is the third planet")?;
    assert_eq!(ciphertext.len() % 16, 0);
    let plaintext = session.decrypt(&mechanism, key, &ciphertext)?;
    assert_eq!(plaintext.as_slice(), b"Earth is the third planet");
    assert_eq!(session.get_string_attribute(key, CKA_LABEL)?, "test-aes");
    session.destroy_object(key)?;
    Ok(())
}

#[test]
#[ignore = "Requires a Luna HSM"]
fn test_luna_rsa_oaep_and_pss() -> P11Result<()> {
    let session = open_session()?;
    let pair = session.generate_key_pair(
        &Mechanism::RsaPkcsKeyPairGen,
        &Template::new()
            .bool(CKA_TOKEN, false)
            .bool(CKA_ENCRYPT, true)
            .bool(CKA_VERIFY, true)
            .ulong(CKA_MODULUS_BITS, 2048)
            .bytes(CKA_PUBLIC_EXPONENT, [0x01, 0x00, 0x01]),
        &Template::new()
            .bool(CKA_TOKEN, false)
            .bool(CKA_PRIVATE, true)
            .bool(CKA_DECRYPT, true)
            .bool(CKA_SIGN, true),
    )?;
    let oaep = Mechanism::RsaPkcsOaep(OaepParams::sha256(b"HelloWorld."));
    let ciphertext = session.encrypt(&oaep, pair.public, b"plaintext")?;
    assert_eq!(ciphertext.len(), 256);
    assert_eq!(
        session.decrypt(&oaep, pair.private, &ciphertext)?.as_slice(),
        b"plaintext"
    );

    let signature = session.sign(&Mechanism::Sha256RsaPkcsPss, pair.private, b"data")?;
    assert!(session.verify(&Mechanism::Sha256RsaPkcsPss, pair.public, b"data", &signature)?);
    assert!(!session.verify(&Mechanism::Sha256RsaPkcsPss, pair.public, b"other", &signature)?);
    Ok(())
}

#[test]
#[ignore = "Requires a Luna HSM"]
fn test_luna_ecdsa_sign_verify() -> P11Result<()> {
    let session = open_session()?;
    let pair = session.generate_key_pair(
        &Mechanism::EcKeyPairGen,
        &Template::new()
            .bool(CKA_TOKEN, false)
            .bool(CKA_VERIFY, true)
            .bytes(CKA_EC_PARAMS, EcCurve::Secp384r1.ec_params()),
        &Template::new()
            .bool(CKA_TOKEN, false)
            .bool(CKA_PRIVATE, true)
            .bool(CKA_SIGN, true),
    )?;
    let signature = session.sign(&Mechanism::EcdsaSha256, pair.private, b"message")?;
    assert!(session.verify(&Mechanism::EcdsaSha256, pair.public, b"message", &signature)?);
    Ok(())
}

#[test]
#[ignore = "Requires a Luna HSM with post-quantum support"]
fn test_luna_hash_ml_dsa() -> P11Result<()> {
    let session = open_session()?;
    let set = MlDsaParameterSet::MlDsa65;
    let pair = session.generate_key_pair(
        &Mechanism::MlDsaKeyPairGen,
        &Template::new()
            .bool(CKA_TOKEN, false)
            .bool(CKA_VERIFY, true)
            .ulong(CKA_PARAMETER_SET, set.value()),
        &Template::new()
            .bool(CKA_TOKEN, false)
            .bool(CKA_PRIVATE, true)
            .bool(CKA_SIGN, true),
    )?;
    let digest = session.digest(&Mechanism::Sha256, b"Hello World")?;
    assert_eq!(digest.len(), 32);
    let mechanism = Mechanism::HashMlDsa(HashSignContext::default());
    let signature = session.sign(&mechanism, pair.private, &digest)?;
    assert!(session.verify(&mechanism, pair.public, &digest, &signature)?);
    Ok(())
}

#[test]
#[ignore = "Requires a Luna HSM with post-quantum support"]
fn test_luna_ml_kem_encapsulation() -> P11Result<()> {
    let session = open_session()?;
    let set = MlKemParameterSet::MlKem768;
    let pair = session.generate_key_pair(
        &Mechanism::MlKemKeyPairGen,
        &Template::new()
            .bool(CKA_TOKEN, false)
            .bool(CKA_ENCAPSULATE, true)
            .ulong(CKA_PARAMETER_SET, set.value()),
        &Template::new()
            .bool(CKA_TOKEN, false)
            .ulong(CKA_PARAMETER_SET, set.value())
            .bool(CKA_DECAPSULATE, true),
    )?;
    let secret = Template::new()
        .class(CKO_SECRET_KEY)
        .key_type(CKK_AES)
        .bool(CKA_ENCRYPT, true)
        .bool(CKA_DECRYPT, true)
        .ulong(CKA_VALUE_LEN, 32);
    let (ciphertext, encapsulated) =
        session.encapsulate_key(&Mechanism::MlKem, pair.public, &secret, set.ciphertext_len())?;
    assert_eq!(ciphertext.len(), set.ciphertext_len());
    let decapsulated =
        session.decapsulate_key(&Mechanism::MlKem, pair.private, &secret, &ciphertext)?;
    assert_ne!(encapsulated, decapsulated);
    Ok(())
}

#[test]
#[ignore = "Requires a Luna HSM"]
fn test_luna_wrap_unwrap_and_find() -> P11Result<()> {
    let session = open_session()?;
    let wrapping = session.generate_key(
        &Mechanism::AesKeyGen,
        &session_aes_key("test-wrapping")
            .bool(CKA_WRAP, true)
            .bool(CKA_UNWRAP, true),
    )?;
    let key = session.generate_key(
        &Mechanism::AesKeyGen,
        &session_aes_key("test-wrapped").bool(CKA_EXTRACTABLE, true),
    )?;
    let kwp = Mechanism::AesKwp { iv: vec![1, 2, 3, 4] };
    let wrapped = session.wrap_key(&kwp, wrapping, key)?;
    assert_eq!(wrapped.len(), 40);
    let unwrapped = session.unwrap_key(
        &kwp,
        wrapping,
        &wrapped,
        &Template::new()
            .class(CKO_SECRET_KEY)
            .key_type(CKK_AES)
            .bool(CKA_TOKEN, false)
            .label("test-unwrapped"),
    )?;
    let found = session.find_first(&Template::new().label("test-unwrapped"))?;
    assert_eq!(found, Some(unwrapped));
    assert_eq!(session.get_ulong_attribute(unwrapped, CKA_VALUE_LEN)?, 32);
    Ok(())
}

#[test]
#[ignore = "Requires a Luna HSM"]
fn test_luna_find_first_closes_its_search() -> P11Result<()> {
    let session = open_session()?;
    let first = session.generate_key(&Mechanism::AesKeyGen, &session_aes_key("test-twin"))?;
    let second = session.generate_key(&Mechanism::AesKeyGen, &session_aes_key("test-twin"))?;
    let twins = Template::new().label("test-twin");
    let found = session.find_first(&twins)?.unwrap();
    assert!(found == first || found == second);
    // a search left open would make this fail with CKR_OPERATION_ACTIVE
    assert_eq!(session.count_objects(&twins, 1)?, 2);
    assert_eq!(session.find_first(&Template::new().label("test-no-such-key"))?, None);
    Ok(())
}

#[test]
#[ignore = "Requires a Luna HSM"]
fn test_luna_failed_initialize_keeps_library_usable() -> P11Result<()> {
    let lib = load_lib()?;
    let Err(err) = P11Lib::instantiate(lib.path()) else {
        panic!("a second C_Initialize should fail");
    };
    assert_eq!(err.rv(), Some(CKR_CRYPTOKI_ALREADY_INITIALIZED));
    assert!(!lib.slot_list(true)?.is_empty());
    Ok(())
}

#[test]
#[ignore = "Requires a Luna HSM"]
fn test_luna_aes_ecb_and_key_wrap() -> P11Result<()> {
    let session = open_session()?;
    let key = session.generate_key(&Mechanism::AesKeyGen, &session_aes_key("test-ecb"))?;
    let block = [0x42_u8; 32];
    let encrypted = session.encrypt(&Mechanism::AesEcb, key, &block)?;
    assert_eq!(encrypted.len(), 32);
    assert_eq!(session.decrypt(&Mechanism::AesEcb, key, &encrypted)?.as_slice(), &block);

    let wrapping = session.generate_key(
        &Mechanism::AesKeyGen,
        &session_aes_key("test-kek").bool(CKA_WRAP, true).bool(CKA_UNWRAP, true),
    )?;
    let secret = session.generate_key(
        &Mechanism::AesKeyGen,
        &session_aes_key("test-secret").bool(CKA_EXTRACTABLE, true),
    )?;
    let wrapped = session.wrap_key(&Mechanism::AesKeyWrap, wrapping, secret)?;
    assert_eq!(wrapped.len(), 40);
    let unwrapped = session.unwrap_key(
        &Mechanism::AesKeyWrap,
        wrapping,
        &wrapped,
        &session_aes_key("test-unwrapped-3394"),
    )?;
    assert_eq!(session.get_ulong_attribute(unwrapped, CKA_VALUE_LEN)?, 32);
    Ok(())
}

#[test]
#[ignore = "Requires a Luna HSM"]
fn test_luna_rsa_pkcs1_and_sha256() -> P11Result<()> {
    let session = open_session()?;
    let pair = session.generate_key_pair(
        &Mechanism::RsaPkcsKeyPairGen,
        &Template::new()
            .bool(CKA_TOKEN, false)
            .bool(CKA_ENCRYPT, true)
            .bool(CKA_VERIFY, true)
            .ulong(CKA_MODULUS_BITS, 2048)
            .bytes(CKA_PUBLIC_EXPONENT, [0x01, 0x00, 0x01]),
        &Template::new()
            .bool(CKA_TOKEN, false)
            .bool(CKA_DECRYPT, true)
            .bool(CKA_SIGN, true),
    )?;
    let ciphertext = session.encrypt(&Mechanism::RsaPkcs, pair.public, b"plaintext")?;
    assert_eq!(
        session.decrypt(&Mechanism::RsaPkcs, pair.private, &ciphertext)?.as_slice(),
        b"plaintext"
    );
    let signature = session.sign(&Mechanism::Sha256RsaPkcs, pair.private, b"data")?;
    assert!(session.verify(&Mechanism::Sha256RsaPkcs, pair.public, b"data", &signature)?);
    Ok(())
}

#[test]
#[ignore = "Requires a Luna HSM"]
fn test_luna_des3_cmac_and_hmac_sha1() -> P11Result<()> {
    let session = open_session()?;
    let des3 = session.generate_key(
        &Mechanism::Des3KeyGen,
        &Template::new()
            .class(CKO_SECRET_KEY)
            .key_type(CKK_DES3)
            .bool(CKA_TOKEN, false)
            .bool(CKA_SIGN, true)
            .bool(CKA_VERIFY, true),
    )?;
    let cmac = session.sign(&Mechanism::Des3Cmac, des3, b"message")?;
    assert_eq!(cmac.len(), 8);

    let secret = session.generate_key(
        &Mechanism::GenericSecretKeyGen,
        &Template::new()
            .class(CKO_SECRET_KEY)
            .key_type(CKK_GENERIC_SECRET)
            .bool(CKA_TOKEN, false)
            .bool(CKA_SIGN, true)
            .bool(CKA_VERIFY, true)
            .ulong(CKA_VALUE_LEN, 32),
    )?;
    let hmac = session.sign(&Mechanism::Sha1Hmac, secret, b"message")?;
    assert_eq!(hmac.len(), 20);
    assert!(session.verify(&Mechanism::Sha1Hmac, secret, b"message", &hmac)?);
    Ok(())
}

#[test]
#[ignore = "Requires a Luna HSM with post-quantum support"]
fn test_luna_pure_sha3_and_extmu_ml_dsa() -> P11Result<()> {
    let session = open_session()?;
    let pair = session.generate_key_pair(
        &Mechanism::MlDsaKeyPairGen,
        &Template::new()
            .bool(CKA_TOKEN, false)
            .bool(CKA_VERIFY, true)
            .ulong(CKA_PARAMETER_SET, MlDsaParameterSet::MlDsa65.value()),
        &Template::new()
            .bool(CKA_TOKEN, false)
            .bool(CKA_PRIVATE, true)
            .bool(CKA_SIGN, true),
    )?;
    let message = b"Earth is the third planet of our Solar System.";
    for mechanism in [
        Mechanism::MlDsa(SignContext::default()),
        Mechanism::HashMlDsaSha3_256(SignContext::default()),
    ] {
        let signature = session.sign(&mechanism, pair.private, message)?;
        assert!(session.verify(&mechanism, pair.public, message, &signature)?);
    }
    let mu = [0x5a_u8; 64];
    let signature = session.sign(&Mechanism::ExtMuMlDsa, pair.private, &mu)?;
    assert!(session.verify(&Mechanism::ExtMuMlDsa, pair.public, &mu, &signature)?);
    Ok(())
}

#[test]
#[ignore = "Requires a Luna HSM"]
fn test_luna_nist_prf_kdf() -> P11Result<()> {
    let session = open_session()?;
    let base = session.generate_key(
        &Mechanism::AesKeyGen,
        &session_aes_key("test-kdf-base").bool(CKA_DERIVE, true),
    )?;
    let mechanism = Mechanism::NistPrfKdf(PrfKdfParams::aes_cmac(b"12345678", b"12345678", 1));
    let derived = session.derive_key(
        &mechanism,
        base,
        &Template::new()
            .class(CKO_SECRET_KEY)
            .key_type(CKK_AES)
            .bool(CKA_TOKEN, false)
            .bool(CKA_ENCRYPT, true)
            .bool(CKA_DECRYPT, true)
            .ulong(CKA_VALUE_LEN, 32)
            .label("test-kdf-derived"),
    )?;
    assert_ne!(derived, base);
    assert_eq!(session.get_ulong_attribute(derived, CKA_VALUE_LEN)?, 32);
    let iv = [0_u8; 16];
    let ciphertext = session.encrypt(&Mechanism::AesCbcPad { iv }, derived, b"derived")?;
    assert_eq!(ciphertext.len(), 16);
    Ok(())
}

#[test]
#[ignore = "Requires a Luna HSM with HSS support"]
fn test_luna_hss_signatures_run_out() -> P11Result<()> {
    let session = open_session()?;
    // one H5 tree: 32 one-time keys
    let lms: [CK_ULONG; 1] = [LmsType::LmsSha256M32H5.value()];
    let lmots: [CK_ULONG; 1] = [LmotsType::LmotsSha256N32W8.value()];
    let pair = session.generate_key_pair(
        &Mechanism::HssKeyPairGen,
        &Template::new()
            .bool(CKA_TOKEN, false)
            .bool(CKA_VERIFY, true),
        &Template::new()
            .bool(CKA_TOKEN, false)
            .bool(CKA_PRIVATE, true)
            .bool(CKA_SIGN, true)
            .ulong(CKA_HSS_LEVELS, 1)
            .ulongs(CKA_HSS_LMS_TYPES, &lms)
            .ulongs(CKA_HSS_LMOTS_TYPES, &lmots),
    )?;
    assert_eq!(session.get_ulong_attribute(pair.private, CKA_HSS_KEYS_REMAINING)?, 32);

    let signature = session.sign(&Mechanism::Hss, pair.private, b"first")?;
    assert!(session.verify(&Mechanism::Hss, pair.public, b"first", &signature)?);
    assert!(!session.verify(&Mechanism::Hss, pair.public, b"other", &signature)?);
    assert_eq!(session.get_ulong_attribute(pair.private, CKA_HSS_KEYS_REMAINING)?, 31);

    for _ in 0..31 {
        session.sign(&Mechanism::Hss, pair.private, b"more")?;
    }
    assert_eq!(session.get_ulong_attribute(pair.private, CKA_HSS_KEYS_REMAINING)?, 0);
    let Err(err) = session.sign(&Mechanism::Hss, pair.private, b"one too many") else {
        panic!("an exhausted key should not sign");
    };
    assert_eq!(err.rv(), Some(CKR_KEY_EXHAUSTED));
    Ok(())
}

#[test]
#[ignore = "Requires a Luna HSM partition with per-key authorization"]
fn test_luna_per_key_authorization() -> P11Result<()> {
    let session = open_session()?;
    let key = session.generate_key(
        &Mechanism::AesKeyGen,
        &Template::new()
            .class(CKO_SECRET_KEY)
            .key_type(CKK_AES)
            .bool(CKA_TOKEN, true)
            .bool(CKA_PRIVATE, true)
            .bool(CKA_ENCRYPT, true)
            .bool(CKA_DECRYPT, true)
            .ulong(CKA_VALUE_LEN, 16)
            .bytes(CKA_AUTH_DATA, b"correct-horse".as_slice())
            .label("test-pka"),
    )?;
    let mechanism = Mechanism::AesCbcPad { iv: [7; 16] };
    let (status, failed) = session.key_status(key)?;
    assert_eq!(status.flag, KeyStatusFlag::AuthDataSet);
    assert_eq!(failed, 0);

    let encrypting = Session::open(session.lib(), get_hsm_slot_id()?, true)?;
    let Err(err) = encrypting.encrypt(&mechanism, key, b"data") else {
        panic!("an unauthorized session should not encrypt");
    };
    assert_eq!(err.rv(), Some(CKR_KEY_NOT_AUTHORIZED));

    assert!(encrypting.authorize_key(key, b"wrong").is_err());
    assert_eq!(session.key_status(key)?.1, 1);
    encrypting.authorize_key(key, b"correct-horse")?;
    assert_eq!(encrypting.encrypt(&mechanism, key, b"data")?.len(), 16);

    // a fresh session is not authorized: this is how the samples revoke
    let revoked = Session::open(session.lib(), get_hsm_slot_id()?, true)?;
    drop(encrypting);
    assert!(revoked.encrypt(&mechanism, key, b"data").is_err());

    session.reset_authorization_data(key, b"battery-staple")?;
    let (status, failed) = session.key_status(key)?;
    assert_eq!(status.flag, KeyStatusFlag::AuthDataSet);
    assert_eq!(failed, 0);
    revoked.authorize_key(key, b"battery-staple")?;
    assert_eq!(revoked.encrypt(&mechanism, key, b"data")?.len(), 16);
    session.destroy_object(key)?;
    Ok(())
}

#[test]
#[ignore = "Requires a Luna HSM"]
fn test_luna_sim_insert() -> P11Result<()> {
    let session = open_session()?;
    let Err(err) = session.sim_insert(b"not a SIM blob") else {
        panic!("a malformed blob should be refused");
    };
    assert!(err.to_string().contains("CA_SIMInsert"));

    // A blob exported with CA_SIMExtract, when one is provided
    if let Ok(path) = std::env::var("HSM_SIM_BLOB") {
        let blob = std::fs::read(path).unwrap();
        let handles = session.sim_insert(&blob)?;
        assert!(!handles.is_empty());
        for handle in handles {
            assert!(session.get_ulong_attribute(handle, CKA_CLASS).is_ok());
        }
    }
    Ok(())
}
