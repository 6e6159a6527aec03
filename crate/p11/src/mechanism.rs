//! Mechanisms used by the samples, with their parameter blocks.

use std::{ffi::c_void, mem::size_of, ptr};

use pkcs11_sys::{
    CK_MECHANISM, CK_MECHANISM_TYPE, CK_RSA_PKCS_MGF_TYPE, CK_RSA_PKCS_OAEP_PARAMS,
    CK_RSA_PKCS_PSS_PARAMS, CK_ULONG, CKG_MGF1_SHA256, CKM_AES_CBC_PAD, CKM_AES_ECB,
    CKM_AES_KEY_GEN, CKM_AES_KEY_WRAP, CKM_DES3_CMAC, CKM_DES3_KEY_GEN, CKM_DSA_KEY_PAIR_GEN,
    CKM_DSA_PARAMETER_GEN, CKM_DSA_SHA256, CKM_EC_KEY_PAIR_GEN, CKM_ECDSA_SHA256,
    CKM_GENERIC_SECRET_KEY_GEN, CKM_RSA_PKCS, CKM_RSA_PKCS_KEY_PAIR_GEN, CKM_RSA_PKCS_OAEP,
    CKM_SHA_1_HMAC, CKM_SHA256, CKM_SHA256_RSA_PKCS, CKM_SHA256_RSA_PKCS_PSS,
    CKZ_DATA_SPECIFIED,
};

use crate::{
    P11Result,
    vendor::{
        CK_HASH_SIGN_ADDITIONAL_CONTEXT, CK_NIST_PRF_KDF_AES_CMAC, CK_PRF_KDF_PARAMS,
        CK_SIGN_ADDITIONAL_CONTEXT, CKH_DETERMINISTIC_REQUIRED, CKH_HEDGE_PREFERRED, CKM_AES_KWP,
        CKM_EXTMU_ML_DSA, CKM_HASH_ML_DSA, CKM_HASH_ML_DSA_SHA3_256, CKM_HSS,
        CKM_HSS_KEY_PAIR_GEN, CKM_ML_DSA, CKM_ML_DSA_KEY_PAIR_GEN, CKM_ML_KEM,
        CKM_ML_KEM_KEY_PAIR_GEN, CKM_NIST_PRF_KDF, LUNA_PRF_KDF_ENCODING_SCHEME_1,
    },
};

/// Length of the SHA-256 digest, used as the PSS salt length.
const SHA256_LEN: CK_ULONG = 32;

/// RSA-OAEP parameters; `source` is the optional label (`CKZ_DATA_SPECIFIED`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OaepParams {
    pub hash: CK_MECHANISM_TYPE,
    pub mgf: CK_RSA_PKCS_MGF_TYPE,
    pub source: Vec<u8>,
}

impl OaepParams {
    /// SHA-256 with MGF1-SHA-256.
    #[must_use]
    pub fn sha256(source: &[u8]) -> Self {
        Self {
            hash: CKM_SHA256,
            mgf: CKG_MGF1_SHA256,
            source: source.to_vec(),
        }
    }
}

/// `CKM_NIST_PRF_KDF` counter mode parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrfKdfParams {
    pub prf_type: CK_ULONG,
    pub label: Vec<u8>,
    pub context: Vec<u8>,
    pub counter: CK_ULONG,
    pub encoding_scheme: CK_ULONG,
}

impl PrfKdfParams {
    /// AES-CMAC based derivation with the first Luna encoding scheme.
    #[must_use]
    pub fn aes_cmac(label: &[u8], context: &[u8], counter: CK_ULONG) -> Self {
        Self {
            prf_type: CK_NIST_PRF_KDF_AES_CMAC,
            label: label.to_vec(),
            context: context.to_vec(),
            counter,
            encoding_scheme: LUNA_PRF_KDF_ENCODING_SCHEME_1,
        }
    }
}

/// Additional context of the pre-hash ML-DSA signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashSignContext {
    pub hedge_variant: CK_ULONG,
    pub context: Vec<u8>,
    pub hash: CK_MECHANISM_TYPE,
}

impl Default for HashSignContext {
    fn default() -> Self {
        Self {
            hedge_variant: CKH_DETERMINISTIC_REQUIRED,
            context: Vec::new(),
            hash: CKM_SHA256,
        }
    }
}

/// Hedging and context string of a pure ML-DSA signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignContext {
    pub hedge_variant: CK_ULONG,
    pub context: Vec<u8>,
}

impl Default for SignContext {
    fn default() -> Self {
        Self {
            hedge_variant: CKH_HEDGE_PREFERRED,
            context: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mechanism {
    AesKeyGen,
    RsaPkcsKeyPairGen,
    EcKeyPairGen,
    MlDsaKeyPairGen,
    MlKemKeyPairGen,
    HssKeyPairGen,
    Des3KeyGen,
    GenericSecretKeyGen,
    DsaParameterGen,
    DsaKeyPairGen,
    AesEcb,
    AesCbcPad { iv: [u8; 16] },
    /// RFC 3394 key wrap with the default IV.
    AesKeyWrap,
    AesKwp { iv: Vec<u8> },
    RsaPkcs,
    RsaPkcsOaep(OaepParams),
    Sha256RsaPkcs,
    Sha256RsaPkcsPss,
    EcdsaSha256,
    DsaSha256,
    Sha256,
    Des3Cmac,
    Sha1Hmac,
    NistPrfKdf(PrfKdfParams),
    MlDsa(SignContext),
    HashMlDsa(HashSignContext),
    HashMlDsaSha3_256(SignContext),
    ExtMuMlDsa,
    MlKem,
    Hss,
}

/// Pointer to a byte buffer, null when empty.
fn byte_ptr(bytes: &[u8]) -> *mut u8 {
    if bytes.is_empty() {
        ptr::null_mut()
    } else {
        bytes.as_ptr().cast_mut()
    }
}

impl Mechanism {
    #[must_use]
    pub const fn mechanism_type(&self) -> CK_MECHANISM_TYPE {
        match self {
            Self::AesKeyGen => CKM_AES_KEY_GEN,
            Self::RsaPkcsKeyPairGen => CKM_RSA_PKCS_KEY_PAIR_GEN,
            Self::EcKeyPairGen => CKM_EC_KEY_PAIR_GEN,
            Self::MlDsaKeyPairGen => CKM_ML_DSA_KEY_PAIR_GEN,
            Self::MlKemKeyPairGen => CKM_ML_KEM_KEY_PAIR_GEN,
            Self::HssKeyPairGen => CKM_HSS_KEY_PAIR_GEN,
            Self::Des3KeyGen => CKM_DES3_KEY_GEN,
            Self::GenericSecretKeyGen => CKM_GENERIC_SECRET_KEY_GEN,
            Self::DsaParameterGen => CKM_DSA_PARAMETER_GEN,
            Self::DsaKeyPairGen => CKM_DSA_KEY_PAIR_GEN,
            Self::AesEcb => CKM_AES_ECB,
            Self::AesCbcPad { .. } => CKM_AES_CBC_PAD,
            Self::AesKeyWrap => CKM_AES_KEY_WRAP,
            Self::AesKwp { .. } => CKM_AES_KWP,
            Self::RsaPkcs => CKM_RSA_PKCS,
            Self::RsaPkcsOaep(_) => CKM_RSA_PKCS_OAEP,
            Self::Sha256RsaPkcs => CKM_SHA256_RSA_PKCS,
            Self::Sha256RsaPkcsPss => CKM_SHA256_RSA_PKCS_PSS,
            Self::EcdsaSha256 => CKM_ECDSA_SHA256,
            Self::DsaSha256 => CKM_DSA_SHA256,
            Self::Sha256 => CKM_SHA256,
            Self::Des3Cmac => CKM_DES3_CMAC,
            Self::Sha1Hmac => CKM_SHA_1_HMAC,
            Self::NistPrfKdf(_) => CKM_NIST_PRF_KDF,
            Self::MlDsa(_) => CKM_ML_DSA,
            Self::HashMlDsa(_) => CKM_HASH_ML_DSA,
            Self::HashMlDsaSha3_256(_) => CKM_HASH_ML_DSA_SHA3_256,
            Self::ExtMuMlDsa => CKM_EXTMU_ML_DSA,
            Self::MlKem => CKM_ML_KEM,
            Self::Hss => CKM_HSS,
        }
    }

    /// Call `f` with the raw mechanism.
    ///
    /// Parameter blocks are built on this stack frame and borrow from `self`,
    /// so the pointer is only valid inside `f`.
    pub(crate) fn with_raw<R>(
        &self,
        f: impl FnOnce(&mut CK_MECHANISM) -> P11Result<R>,
    ) -> P11Result<R> {
        let mechanism = self.mechanism_type();
        match self {
            Self::AesCbcPad { iv } => {
                let mut raw = CK_MECHANISM {
                    mechanism,
                    pParameter: iv.as_ptr().cast_mut().cast::<c_void>(),
                    ulParameterLen: CK_ULONG::try_from(iv.len())?,
                };
                f(&mut raw)
            }
            Self::AesKwp { iv } => {
                let mut raw = CK_MECHANISM {
                    mechanism,
                    pParameter: byte_ptr(iv).cast::<c_void>(),
                    ulParameterLen: CK_ULONG::try_from(iv.len())?,
                };
                f(&mut raw)
            }
            Self::RsaPkcsOaep(params) => {
                let mut oaep = CK_RSA_PKCS_OAEP_PARAMS {
                    hashAlg: params.hash,
                    mgf: params.mgf,
                    source: CKZ_DATA_SPECIFIED,
                    pSourceData: byte_ptr(&params.source).cast::<c_void>(),
                    ulSourceDataLen: CK_ULONG::try_from(params.source.len())?,
                };
                Self::with_params(mechanism, &mut oaep, f)
            }
            Self::Sha256RsaPkcsPss => {
                let mut pss = CK_RSA_PKCS_PSS_PARAMS {
                    hashAlg: CKM_SHA256,
                    mgf: CKG_MGF1_SHA256,
                    sLen: SHA256_LEN,
                };
                Self::with_params(mechanism, &mut pss, f)
            }
            Self::NistPrfKdf(params) => {
                let mut kdf = CK_PRF_KDF_PARAMS {
                    prfType: params.prf_type,
                    pLabel: byte_ptr(&params.label),
                    ulLabelLen: CK_ULONG::try_from(params.label.len())?,
                    pContext: byte_ptr(&params.context),
                    ulContextLen: CK_ULONG::try_from(params.context.len())?,
                    ulCounter: params.counter,
                    ulEncodingScheme: params.encoding_scheme,
                };
                Self::with_params(mechanism, &mut kdf, f)
            }
            Self::HashMlDsa(context) => {
                let mut additional = CK_HASH_SIGN_ADDITIONAL_CONTEXT {
                    hedgeVariant: context.hedge_variant,
                    pContext: byte_ptr(&context.context),
                    ulContextLen: CK_ULONG::try_from(context.context.len())?,
                    hash: context.hash,
                };
                Self::with_params(mechanism, &mut additional, f)
            }
            Self::MlDsa(context) | Self::HashMlDsaSha3_256(context) => {
                let mut additional = CK_SIGN_ADDITIONAL_CONTEXT {
                    hedgeVariant: context.hedge_variant,
                    pContext: byte_ptr(&context.context),
                    ulContextLen: CK_ULONG::try_from(context.context.len())?,
                };
                Self::with_params(mechanism, &mut additional, f)
            }
            _ => {
                let mut raw = CK_MECHANISM {
                    mechanism,
                    pParameter: ptr::null_mut(),
                    ulParameterLen: 0,
                };
                f(&mut raw)
            }
        }
    }

    fn with_params<P, R>(
        mechanism: CK_MECHANISM_TYPE,
        params: &mut P,
        f: impl FnOnce(&mut CK_MECHANISM) -> P11Result<R>,
    ) -> P11Result<R> {
        let mut raw = CK_MECHANISM {
            mechanism,
            pParameter: ptr::from_mut(params).cast::<c_void>(),
            ulParameterLen: CK_ULONG::try_from(size_of::<P>())?,
        };
        f(&mut raw)
    }
}

#[cfg(test)]
mod tests {
    use std::mem::size_of;

    use pkcs11_sys::{
        CK_RSA_PKCS_OAEP_PARAMS, CKM_AES_CBC_PAD, CKM_AES_ECB, CKM_AES_KEY_WRAP, CKM_DES3_CMAC,
        CKM_RSA_PKCS, CKM_RSA_PKCS_OAEP, CKM_SHA_1_HMAC, CKM_SHA256, CKZ_DATA_SPECIFIED,
    };

    use super::{HashSignContext, Mechanism, OaepParams, PrfKdfParams, SignContext};
    use crate::vendor::{
        CK_HASH_SIGN_ADDITIONAL_CONTEXT, CK_PRF_KDF_PARAMS, CK_SIGN_ADDITIONAL_CONTEXT,
        CKH_DETERMINISTIC_REQUIRED, CKH_HEDGE_PREFERRED, CKM_AES_KWP, CKM_EXTMU_ML_DSA,
        CKM_HASH_ML_DSA_SHA3_256, CKM_ML_DSA, CKM_ML_KEM, CKM_NIST_PRF_KDF,
    };

    #[test]
    fn parameterless_mechanisms_have_null_parameter() {
        for (mechanism, expected) in [
            (Mechanism::MlKem, CKM_ML_KEM),
            (Mechanism::AesEcb, CKM_AES_ECB),
            (Mechanism::AesKeyWrap, CKM_AES_KEY_WRAP),
            (Mechanism::RsaPkcs, CKM_RSA_PKCS),
            (Mechanism::Des3Cmac, CKM_DES3_CMAC),
            (Mechanism::Sha1Hmac, CKM_SHA_1_HMAC),
            (Mechanism::ExtMuMlDsa, CKM_EXTMU_ML_DSA),
        ] {
            mechanism
                .with_raw(|raw| {
                    assert_eq!(raw.mechanism, expected);
                    assert!(raw.pParameter.is_null());
                    assert_eq!(raw.ulParameterLen, 0);
                    Ok(())
                })
                .unwrap();
        }
    }

    #[test]
    fn pure_and_sha3_ml_dsa_carry_the_sign_context() {
        for (mechanism, expected) in [
            (Mechanism::MlDsa(SignContext::default()), CKM_ML_DSA),
            (
                Mechanism::HashMlDsaSha3_256(SignContext {
                    hedge_variant: CKH_DETERMINISTIC_REQUIRED,
                    context: b"ctx".to_vec(),
                }),
                CKM_HASH_ML_DSA_SHA3_256,
            ),
        ] {
            mechanism
                .with_raw(|raw| {
                    assert_eq!(raw.mechanism, expected);
                    assert_eq!(
                        raw.ulParameterLen as usize,
                        size_of::<CK_SIGN_ADDITIONAL_CONTEXT>()
                    );
                    let params = unsafe { &*raw.pParameter.cast::<CK_SIGN_ADDITIONAL_CONTEXT>() };
                    if expected == CKM_ML_DSA {
                        assert_eq!(params.hedgeVariant, CKH_HEDGE_PREFERRED);
                        assert!(params.pContext.is_null());
                    } else {
                        assert_eq!(params.hedgeVariant, CKH_DETERMINISTIC_REQUIRED);
                        assert_eq!(params.ulContextLen, 3);
                    }
                    Ok(())
                })
                .unwrap();
        }
    }

    #[test]
    fn iv_mechanisms_point_at_the_iv() {
        let iv = [7_u8; 16];
        Mechanism::AesCbcPad { iv }
            .with_raw(|raw| {
                assert_eq!(raw.mechanism, CKM_AES_CBC_PAD);
                assert_eq!(raw.ulParameterLen, 16);
                let seen =
                    unsafe { std::slice::from_raw_parts(raw.pParameter.cast::<u8>(), 16) };
                assert_eq!(seen, &iv);
                Ok(())
            })
            .unwrap();

        Mechanism::AesKwp {
            iv: vec![1, 2, 3, 4],
        }
        .with_raw(|raw| {
            assert_eq!(raw.mechanism, CKM_AES_KWP);
            assert_eq!(raw.ulParameterLen, 4);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn oaep_parameters_carry_the_label() {
        let mechanism = Mechanism::RsaPkcsOaep(OaepParams::sha256(b"HelloWorld."));
        mechanism
            .with_raw(|raw| {
                assert_eq!(raw.mechanism, CKM_RSA_PKCS_OAEP);
                assert_eq!(
                    raw.ulParameterLen as usize,
                    size_of::<CK_RSA_PKCS_OAEP_PARAMS>()
                );
                let params = unsafe { &*raw.pParameter.cast::<CK_RSA_PKCS_OAEP_PARAMS>() };
                assert_eq!(params.hashAlg, CKM_SHA256);
                assert_eq!(params.source, CKZ_DATA_SPECIFIED);
                assert_eq!(params.ulSourceDataLen, 11);
                let label = unsafe {
                    std::slice::from_raw_parts(params.pSourceData.cast::<u8>(), 11)
                };
                assert_eq!(label, b"HelloWorld.");
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn kdf_and_hash_sign_parameters() {
        let kdf = Mechanism::NistPrfKdf(PrfKdfParams::aes_cmac(b"12345678", b"12345678", 1));
        kdf.with_raw(|raw| {
            assert_eq!(raw.mechanism, CKM_NIST_PRF_KDF);
            assert_eq!(raw.ulParameterLen as usize, size_of::<CK_PRF_KDF_PARAMS>());
            let params = unsafe { &*raw.pParameter.cast::<CK_PRF_KDF_PARAMS>() };
            assert_eq!(params.ulLabelLen, 8);
            assert_eq!(params.ulContextLen, 8);
            assert_eq!(params.ulCounter, 1);
            Ok(())
        })
        .unwrap();

        let sign = Mechanism::HashMlDsa(HashSignContext::default());
        sign.with_raw(|raw| {
            let params = unsafe { &*raw.pParameter.cast::<CK_HASH_SIGN_ADDITIONAL_CONTEXT>() };
            assert_eq!(params.hedgeVariant, CKH_DETERMINISTIC_REQUIRED);
            assert!(params.pContext.is_null());
            assert_eq!(params.ulContextLen, 0);
            assert_eq!(params.hash, CKM_SHA256);
            Ok(())
        })
        .unwrap();
    }
}
