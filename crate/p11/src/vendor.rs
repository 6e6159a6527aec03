//! Luna vendor and PKCS#11 3.x definitions missing from the v2.40 bindings.
//!
//! The post-quantum values follow the PKCS#11 3.2 headers shipped with Luna
//! Client 10.9; the `CKA_*`/`CKR_*` vendor values follow `cryptoki_v2.h`.
#![allow(non_camel_case_types, non_snake_case)]

use pkcs11_sys::{
    CK_ATTRIBUTE_TYPE, CK_BYTE, CK_BYTE_PTR, CK_KEY_TYPE, CK_MECHANISM_TYPE, CK_RV, CK_ULONG,
    CKA_VENDOR_DEFINED, CKM_VENDOR_DEFINED, CKR_ARGUMENTS_BAD, CKR_ATTRIBUTE_READ_ONLY,
    CKR_ATTRIBUTE_SENSITIVE, CKR_ATTRIBUTE_TYPE_INVALID, CKR_ATTRIBUTE_VALUE_INVALID,
    CKR_BUFFER_TOO_SMALL, CKR_CRYPTOKI_ALREADY_INITIALIZED, CKR_CRYPTOKI_NOT_INITIALIZED,
    CKR_DATA_LEN_RANGE, CKR_DEVICE_ERROR, CKR_ENCRYPTED_DATA_INVALID, CKR_FUNCTION_FAILED,
    CKR_GENERAL_ERROR, CKR_HOST_MEMORY, CKR_KEY_HANDLE_INVALID, CKR_KEY_SIZE_RANGE,
    CKR_KEY_TYPE_INCONSISTENT, CKR_KEY_UNEXTRACTABLE, CKR_MECHANISM_INVALID,
    CKR_MECHANISM_PARAM_INVALID, CKR_OBJECT_HANDLE_INVALID, CKR_OK, CKR_OPERATION_ACTIVE,
    CKR_OPERATION_NOT_INITIALIZED, CKR_PIN_INCORRECT, CKR_PIN_LOCKED,
    CKR_SESSION_HANDLE_INVALID, CKR_SIGNATURE_INVALID, CKR_SIGNATURE_LEN_RANGE,
    CKR_SLOT_ID_INVALID, CKR_TEMPLATE_INCOMPLETE, CKR_TEMPLATE_INCONSISTENT,
    CKR_TOKEN_NOT_PRESENT, CKR_USER_ALREADY_LOGGED_IN, CKR_USER_NOT_LOGGED_IN,
    CKR_USER_TYPE_INVALID, CKR_VENDOR_DEFINED, CKR_WRAPPED_KEY_INVALID,
    CKR_WRAPPING_KEY_HANDLE_INVALID,
};

// ML-KEM / ML-DSA (PKCS#11 3.2)
pub const CKK_ML_KEM: CK_KEY_TYPE = 0x49;
pub const CKK_ML_DSA: CK_KEY_TYPE = 0x4a;
pub const CKM_ML_KEM_KEY_PAIR_GEN: CK_MECHANISM_TYPE = 0x0f;
pub const CKM_ML_KEM: CK_MECHANISM_TYPE = 0x17;
pub const CKM_ML_DSA_KEY_PAIR_GEN: CK_MECHANISM_TYPE = 0x1c;
pub const CKM_ML_DSA: CK_MECHANISM_TYPE = 0x1d;
pub const CKM_HASH_ML_DSA: CK_MECHANISM_TYPE = 0x1f;
pub const CKM_HASH_ML_DSA_SHA3_256: CK_MECHANISM_TYPE = 0x28;
pub const CKA_PARAMETER_SET: CK_ATTRIBUTE_TYPE = 0x61d;
pub const CKA_ENCAPSULATE: CK_ATTRIBUTE_TYPE = 0x633;
pub const CKA_DECAPSULATE: CK_ATTRIBUTE_TYPE = 0x634;

pub const CKP_ML_KEM_512: CK_ULONG = 0x1;
pub const CKP_ML_KEM_768: CK_ULONG = 0x2;
pub const CKP_ML_KEM_1024: CK_ULONG = 0x3;
pub const CKP_ML_DSA_44: CK_ULONG = 0x1;
pub const CKP_ML_DSA_65: CK_ULONG = 0x2;
pub const CKP_ML_DSA_87: CK_ULONG = 0x3;

pub const CKH_HEDGE_PREFERRED: CK_ULONG = 0x0;
pub const CKH_HEDGE_REQUIRED: CK_ULONG = 0x1;
pub const CKH_DETERMINISTIC_REQUIRED: CK_ULONG = 0x2;

// HSS / LMS (PKCS#11 3.1)
pub const CKK_HSS: CK_KEY_TYPE = 0x46;
pub const CKM_HSS_KEY_PAIR_GEN: CK_MECHANISM_TYPE = 0x4032;
pub const CKM_HSS: CK_MECHANISM_TYPE = 0x4033;
pub const CKA_HSS_LEVELS: CK_ATTRIBUTE_TYPE = 0x617;
pub const CKA_HSS_LMS_TYPES: CK_ATTRIBUTE_TYPE = 0x61a;
pub const CKA_HSS_LMOTS_TYPES: CK_ATTRIBUTE_TYPE = 0x61b;
pub const CKA_HSS_KEYS_REMAINING: CK_ATTRIBUTE_TYPE = 0x61c;
/// All one-time keys of a stateful signature key have been used.
pub const CKR_KEY_EXHAUSTED: CK_RV = 0x203;

// Luna mechanisms
pub const CKM_AES_KWP: CK_MECHANISM_TYPE = CKM_VENDOR_DEFINED + 0x171;
pub const CKM_NIST_PRF_KDF: CK_MECHANISM_TYPE = CKM_VENDOR_DEFINED + 0xA02;
/// ML-DSA over an externally computed message representative (mu).
pub const CKM_EXTMU_ML_DSA: CK_MECHANISM_TYPE = CKM_VENDOR_DEFINED + 0x1D;
pub const CK_NIST_PRF_KDF_AES_CMAC: CK_ULONG = 0x02;
pub const LUNA_PRF_KDF_ENCODING_SCHEME_1: CK_ULONG = 0x0;

// Luna per-key authorization
pub const CKA_AUTH_DATA: CK_ATTRIBUTE_TYPE = CKA_VENDOR_DEFINED + 0x180;
pub const CKA_KEY_STATUS: CK_ATTRIBUTE_TYPE = CKA_VENDOR_DEFINED + 0x181;
pub const CKA_FAILED_KEY_AUTH_COUNT: CK_ATTRIBUTE_TYPE = CKA_VENDOR_DEFINED + 0x182;
pub const CKR_KEY_NOT_AUTHORIZED: CK_RV = CKR_VENDOR_DEFINED + 0x1AB;
pub const CKR_KEY_NOT_ACTIVE: CK_RV = CKR_VENDOR_DEFINED + 0x1AC;

pub const CK_KEY_STATUS_F_AUTH_DATA_SET: CK_BYTE = 0x01;
pub const CK_KEY_STATUS_F_LOCKED_DUE_TO_FAILED_AUTH: CK_BYTE = 0x02;
pub const CK_KEY_STATUS_F_LOCKED_DUE_TO_DATE: CK_BYTE = 0x03;
pub const CK_KEY_STATUS_F_LOCKED_DUE_TO_DES3_BLOCK_COUNTER: CK_BYTE = 0x04;
pub const CK_KEY_STATUS_F_LOCKED_DUE_TO_USAGE_COUNTER: CK_BYTE = 0x05;

/// Parameters of `CKM_NIST_PRF_KDF`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CK_PRF_KDF_PARAMS {
    pub prfType: CK_ULONG,
    pub pLabel: CK_BYTE_PTR,
    pub ulLabelLen: CK_ULONG,
    pub pContext: CK_BYTE_PTR,
    pub ulContextLen: CK_ULONG,
    pub ulCounter: CK_ULONG,
    pub ulEncodingScheme: CK_ULONG,
}

/// Parameters of `CKM_ML_DSA` and of the pre-hash mechanisms bound to one
/// hash, such as `CKM_HASH_ML_DSA_SHA3_256`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CK_SIGN_ADDITIONAL_CONTEXT {
    pub hedgeVariant: CK_ULONG,
    pub pContext: CK_BYTE_PTR,
    pub ulContextLen: CK_ULONG,
}

/// Parameters of `CKM_HASH_ML_DSA`, which names its hash.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CK_HASH_SIGN_ADDITIONAL_CONTEXT {
    pub hedgeVariant: CK_ULONG,
    pub pContext: CK_BYTE_PTR,
    pub ulContextLen: CK_ULONG,
    pub hash: CK_MECHANISM_TYPE,
}

/// Value of `CKA_KEY_STATUS`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CK_KEY_STATUS {
    pub flags: CK_BYTE,
    pub failedAuthCountLimit: CK_BYTE,
    pub reserved1: CK_BYTE,
    pub reserved2: CK_BYTE,
}

/// Symbolic name of a return value, `"unknown"` when not listed.
#[must_use]
pub const fn rv_name(rv: CK_RV) -> &'static str {
    match rv {
        CKR_OK => "CKR_OK",
        CKR_HOST_MEMORY => "CKR_HOST_MEMORY",
        CKR_SLOT_ID_INVALID => "CKR_SLOT_ID_INVALID",
        CKR_GENERAL_ERROR => "CKR_GENERAL_ERROR",
        CKR_FUNCTION_FAILED => "CKR_FUNCTION_FAILED",
        CKR_ARGUMENTS_BAD => "CKR_ARGUMENTS_BAD",
        CKR_ATTRIBUTE_READ_ONLY => "CKR_ATTRIBUTE_READ_ONLY",
        CKR_ATTRIBUTE_SENSITIVE => "CKR_ATTRIBUTE_SENSITIVE",
        CKR_ATTRIBUTE_TYPE_INVALID => "CKR_ATTRIBUTE_TYPE_INVALID",
        CKR_ATTRIBUTE_VALUE_INVALID => "CKR_ATTRIBUTE_VALUE_INVALID",
        CKR_DATA_LEN_RANGE => "CKR_DATA_LEN_RANGE",
        CKR_DEVICE_ERROR => "CKR_DEVICE_ERROR",
        CKR_ENCRYPTED_DATA_INVALID => "CKR_ENCRYPTED_DATA_INVALID",
        CKR_KEY_HANDLE_INVALID => "CKR_KEY_HANDLE_INVALID",
        CKR_KEY_SIZE_RANGE => "CKR_KEY_SIZE_RANGE",
        CKR_KEY_TYPE_INCONSISTENT => "CKR_KEY_TYPE_INCONSISTENT",
        CKR_KEY_UNEXTRACTABLE => "CKR_KEY_UNEXTRACTABLE",
        CKR_MECHANISM_INVALID => "CKR_MECHANISM_INVALID",
        CKR_MECHANISM_PARAM_INVALID => "CKR_MECHANISM_PARAM_INVALID",
        CKR_OBJECT_HANDLE_INVALID => "CKR_OBJECT_HANDLE_INVALID",
        CKR_OPERATION_ACTIVE => "CKR_OPERATION_ACTIVE",
        CKR_OPERATION_NOT_INITIALIZED => "CKR_OPERATION_NOT_INITIALIZED",
        CKR_PIN_INCORRECT => "CKR_PIN_INCORRECT",
        CKR_PIN_LOCKED => "CKR_PIN_LOCKED",
        CKR_SESSION_HANDLE_INVALID => "CKR_SESSION_HANDLE_INVALID",
        CKR_SIGNATURE_INVALID => "CKR_SIGNATURE_INVALID",
        CKR_SIGNATURE_LEN_RANGE => "CKR_SIGNATURE_LEN_RANGE",
        CKR_TEMPLATE_INCOMPLETE => "CKR_TEMPLATE_INCOMPLETE",
        CKR_TEMPLATE_INCONSISTENT => "CKR_TEMPLATE_INCONSISTENT",
        CKR_TOKEN_NOT_PRESENT => "CKR_TOKEN_NOT_PRESENT",
        CKR_USER_ALREADY_LOGGED_IN => "CKR_USER_ALREADY_LOGGED_IN",
        CKR_USER_NOT_LOGGED_IN => "CKR_USER_NOT_LOGGED_IN",
        CKR_USER_TYPE_INVALID => "CKR_USER_TYPE_INVALID",
        CKR_WRAPPED_KEY_INVALID => "CKR_WRAPPED_KEY_INVALID",
        CKR_WRAPPING_KEY_HANDLE_INVALID => "CKR_WRAPPING_KEY_HANDLE_INVALID",
        CKR_BUFFER_TOO_SMALL => "CKR_BUFFER_TOO_SMALL",
        CKR_CRYPTOKI_NOT_INITIALIZED => "CKR_CRYPTOKI_NOT_INITIALIZED",
        CKR_CRYPTOKI_ALREADY_INITIALIZED => "CKR_CRYPTOKI_ALREADY_INITIALIZED",
        CKR_KEY_NOT_AUTHORIZED => "CKR_KEY_NOT_AUTHORIZED",
        CKR_KEY_NOT_ACTIVE => "CKR_KEY_NOT_ACTIVE",
        CKR_KEY_EXHAUSTED => "CKR_KEY_EXHAUSTED",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use std::mem::size_of;

    use pkcs11_sys::{CK_ULONG, CKR_OK, CKR_SIGNATURE_INVALID};

    use super::{
        CK_HASH_SIGN_ADDITIONAL_CONTEXT, CK_KEY_STATUS, CK_PRF_KDF_PARAMS,
        CK_SIGN_ADDITIONAL_CONTEXT, CKM_AES_KWP, CKM_EXTMU_ML_DSA, CKM_NIST_PRF_KDF, rv_name,
    };

    #[test]
    fn parameter_blocks_have_c_layout() {
        let ulong = size_of::<CK_ULONG>();
        let ptr = size_of::<*mut u8>();
        assert_eq!(size_of::<CK_PRF_KDF_PARAMS>(), 5 * ulong + 2 * ptr);
        assert_eq!(size_of::<CK_HASH_SIGN_ADDITIONAL_CONTEXT>(), 3 * ulong + ptr);
        assert_eq!(size_of::<CK_SIGN_ADDITIONAL_CONTEXT>(), 2 * ulong + ptr);
        assert_eq!(size_of::<CK_KEY_STATUS>(), 4);
    }

    #[test]
    fn vendor_mechanisms_live_in_vendor_range() {
        assert_eq!(CKM_AES_KWP, 0x8000_0171);
        assert_eq!(CKM_NIST_PRF_KDF, 0x8000_0A02);
        assert_eq!(CKM_EXTMU_ML_DSA, 0x8000_001D);
    }

    #[test]
    fn return_value_names() {
        assert_eq!(rv_name(CKR_OK), "CKR_OK");
        assert_eq!(rv_name(CKR_SIGNATURE_INVALID), "CKR_SIGNATURE_INVALID");
        assert_eq!(rv_name(0xDEAD), "unknown");
    }
}
