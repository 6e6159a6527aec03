//! Typed choices offered by the samples, mapped to their PKCS#11 values.

use std::fmt::{self, Display, Formatter};

use pkcs11_sys::{
    CK_BYTE, CK_KEY_TYPE, CK_OBJECT_CLASS, CK_ULONG, CKO_CERTIFICATE, CKO_PRIVATE_KEY,
    CKO_PUBLIC_KEY, CKO_SECRET_KEY,
};
use strum::{Display as StrumDisplay, EnumIter, EnumString, IntoEnumIterator};

use crate::{
    P11Error, P11Result,
    vendor::{
        CK_KEY_STATUS, CK_KEY_STATUS_F_AUTH_DATA_SET, CK_KEY_STATUS_F_LOCKED_DUE_TO_DATE,
        CK_KEY_STATUS_F_LOCKED_DUE_TO_DES3_BLOCK_COUNTER,
        CK_KEY_STATUS_F_LOCKED_DUE_TO_FAILED_AUTH, CK_KEY_STATUS_F_LOCKED_DUE_TO_USAGE_COUNTER,
        CKK_ML_DSA, CKK_ML_KEM, CKP_ML_DSA_44, CKP_ML_DSA_65, CKP_ML_DSA_87, CKP_ML_KEM_512,
        CKP_ML_KEM_768, CKP_ML_KEM_1024,
    },
};

/// Pick the `index`-th (1-based) variant of a menu enum.
fn from_menu_index<T: IntoEnumIterator>(index: usize, what: &str) -> P11Result<T> {
    index
        .checked_sub(1)
        .and_then(|i| T::iter().nth(i))
        .ok_or_else(|| P11Error::Default(format!("Invalid {what} choice: {index}")))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, EnumString, StrumDisplay)]
pub enum MlDsaParameterSet {
    #[strum(serialize = "ML-DSA-44")]
    MlDsa44,
    #[strum(serialize = "ML-DSA-65")]
    MlDsa65,
    #[strum(serialize = "ML-DSA-87")]
    MlDsa87,
}

impl MlDsaParameterSet {
    /// Menu choices are numbered from 1.
    pub fn from_choice(choice: usize) -> P11Result<Self> {
        from_menu_index(choice, "ML-DSA parameter")
    }

    #[must_use]
    pub const fn value(self) -> CK_ULONG {
        match self {
            Self::MlDsa44 => CKP_ML_DSA_44,
            Self::MlDsa65 => CKP_ML_DSA_65,
            Self::MlDsa87 => CKP_ML_DSA_87,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, EnumString, StrumDisplay)]
pub enum MlKemParameterSet {
    #[strum(serialize = "ML-KEM-512")]
    MlKem512,
    #[strum(serialize = "ML-KEM-768")]
    MlKem768,
    #[strum(serialize = "ML-KEM-1024")]
    MlKem1024,
}

impl MlKemParameterSet {
    pub fn from_choice(choice: usize) -> P11Result<Self> {
        from_menu_index(choice, "ML-KEM parameter")
    }

    #[must_use]
    pub const fn value(self) -> CK_ULONG {
        match self {
            Self::MlKem512 => CKP_ML_KEM_512,
            Self::MlKem768 => CKP_ML_KEM_768,
            Self::MlKem1024 => CKP_ML_KEM_1024,
        }
    }

    /// Size in bytes of the encapsulation ciphertext.
    #[must_use]
    pub const fn ciphertext_len(self) -> usize {
        match self {
            Self::MlKem512 => 768,
            Self::MlKem768 => 1088,
            Self::MlKem1024 => 1568,
        }
    }
}

/// LMS tree types accepted by Luna for HSS keys.
///
/// The H20 and H25 variants are left out: H25 is not supported by the HSM and
/// H20 key generation takes too long for a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, StrumDisplay)]
pub enum LmsType {
    #[strum(serialize = "LMS_SHA256_M32_H5")]
    LmsSha256M32H5,
    #[strum(serialize = "LMS_SHA256_M32_H10")]
    LmsSha256M32H10,
    #[strum(serialize = "LMS_SHA256_M32_H15")]
    LmsSha256M32H15,
    #[strum(serialize = "LMS_SHA256_M24_H5")]
    LmsSha256M24H5,
    #[strum(serialize = "LMS_SHA256_M24_H10")]
    LmsSha256M24H10,
    #[strum(serialize = "LMS_SHA256_M24_H15")]
    LmsSha256M24H15,
}

impl LmsType {
    pub fn from_choice(choice: usize) -> P11Result<Self> {
        from_menu_index(choice, "LMS type")
    }

    /// Registry value (RFC 8554, SP 800-208).
    #[must_use]
    pub const fn value(self) -> CK_ULONG {
        match self {
            Self::LmsSha256M32H5 => 0x05,
            Self::LmsSha256M32H10 => 0x06,
            Self::LmsSha256M32H15 => 0x07,
            Self::LmsSha256M24H5 => 0x0A,
            Self::LmsSha256M24H10 => 0x0B,
            Self::LmsSha256M24H15 => 0x0C,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, StrumDisplay)]
pub enum LmotsType {
    #[strum(serialize = "LMOTS_SHA256_N32_W1")]
    LmotsSha256N32W1,
    #[strum(serialize = "LMOTS_SHA256_N32_W2")]
    LmotsSha256N32W2,
    #[strum(serialize = "LMOTS_SHA256_N32_W4")]
    LmotsSha256N32W4,
    #[strum(serialize = "LMOTS_SHA256_N32_W8")]
    LmotsSha256N32W8,
    #[strum(serialize = "LMOTS_SHA256_N24_W1")]
    LmotsSha256N24W1,
    #[strum(serialize = "LMOTS_SHA256_N24_W2")]
    LmotsSha256N24W2,
    #[strum(serialize = "LMOTS_SHA256_N24_W4")]
    LmotsSha256N24W4,
    #[strum(serialize = "LMOTS_SHA256_N24_W8")]
    LmotsSha256N24W8,
}

impl LmotsType {
    pub fn from_choice(choice: usize) -> P11Result<Self> {
        from_menu_index(choice, "LM-OTS type")
    }

    #[must_use]
    pub const fn value(self) -> CK_ULONG {
        match self {
            Self::LmotsSha256N32W1 => 0x01,
            Self::LmotsSha256N32W2 => 0x02,
            Self::LmotsSha256N32W4 => 0x03,
            Self::LmotsSha256N32W8 => 0x04,
            Self::LmotsSha256N24W1 => 0x05,
            Self::LmotsSha256N24W2 => 0x06,
            Self::LmotsSha256N24W4 => 0x07,
            Self::LmotsSha256N24W8 => 0x08,
        }
    }
}

/// Number of HSS levels a Luna key may have.
pub const HSS_MAX_LEVELS: usize = 8;

/// Post-quantum private key families that can be wrapped with `CKM_AES_KWP`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, StrumDisplay)]
pub enum PqcKeyType {
    #[strum(serialize = "ML-DSA")]
    MlDsa,
    #[strum(serialize = "ML-KEM")]
    MlKem,
}

impl PqcKeyType {
    pub fn from_choice(choice: usize) -> P11Result<Self> {
        from_menu_index(choice, "key type")
    }

    #[must_use]
    pub const fn key_type(self) -> CK_KEY_TYPE {
        match self {
            Self::MlDsa => CKK_ML_DSA,
            Self::MlKem => CKK_ML_KEM,
        }
    }
}

/// Object classes `list-objects` can filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, EnumString, StrumDisplay)]
#[strum(serialize_all = "lowercase")]
pub enum ObjectClassFilter {
    Secret,
    Private,
    Public,
    Certificate,
    All,
}

impl ObjectClassFilter {
    /// `None` means every object class.
    #[must_use]
    pub const fn class(self) -> Option<CK_OBJECT_CLASS> {
        match self {
            Self::Secret => Some(CKO_SECRET_KEY),
            Self::Private => Some(CKO_PRIVATE_KEY),
            Self::Public => Some(CKO_PUBLIC_KEY),
            Self::Certificate => Some(CKO_CERTIFICATE),
            Self::All => None,
        }
    }
}

/// Named curves for EC key generation, with their DER encoded OIDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, EnumString, StrumDisplay)]
#[strum(serialize_all = "lowercase")]
pub enum EcCurve {
    Secp256r1,
    Secp384r1,
    Secp521r1,
}

impl EcCurve {
    /// Value of `CKA_EC_PARAMS`.
    #[must_use]
    pub const fn ec_params(self) -> &'static [u8] {
        match self {
            // 1.2.840.10045.3.1.7
            Self::Secp256r1 => &[
                0x06, 0x08, 0x2a, 0x86, 0x48, 0xce, 0x3d, 0x03, 0x01, 0x07,
            ],
            // 1.3.132.0.34
            Self::Secp384r1 => &[0x06, 0x05, 0x2b, 0x81, 0x04, 0x00, 0x22],
            // 1.3.132.0.35
            Self::Secp521r1 => &[0x06, 0x05, 0x2b, 0x81, 0x04, 0x00, 0x23],
        }
    }
}

/// Decoded `CKA_KEY_STATUS` of a key protected by per-key authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyStatus {
    pub flag: KeyStatusFlag,
    pub failed_auth_count_limit: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStatusFlag {
    AuthDataSet,
    LockedDueToFailedAuth,
    LockedDueToDate,
    LockedDueToDes3BlockCounter,
    LockedDueToUsageCounter,
    Other(CK_BYTE),
}

impl From<CK_KEY_STATUS> for KeyStatus {
    fn from(status: CK_KEY_STATUS) -> Self {
        let flag = match status.flags {
            CK_KEY_STATUS_F_AUTH_DATA_SET => KeyStatusFlag::AuthDataSet,
            CK_KEY_STATUS_F_LOCKED_DUE_TO_FAILED_AUTH => KeyStatusFlag::LockedDueToFailedAuth,
            CK_KEY_STATUS_F_LOCKED_DUE_TO_DATE => KeyStatusFlag::LockedDueToDate,
            CK_KEY_STATUS_F_LOCKED_DUE_TO_DES3_BLOCK_COUNTER => {
                KeyStatusFlag::LockedDueToDes3BlockCounter
            }
            CK_KEY_STATUS_F_LOCKED_DUE_TO_USAGE_COUNTER => KeyStatusFlag::LockedDueToUsageCounter,
            other => KeyStatusFlag::Other(other),
        };
        Self {
            flag,
            failed_auth_count_limit: status.failedAuthCountLimit,
        }
    }
}

impl Display for KeyStatusFlag {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::AuthDataSet => write!(f, "CK_KEY_STATUS_F_AUTH_DATA_SET"),
            Self::LockedDueToFailedAuth => write!(f, "CK_KEY_STATUS_F_LOCKED_DUE_TO_FAILED_AUTH"),
            Self::LockedDueToDate => write!(f, "CK_KEY_STATUS_F_LOCKED_DUE_TO_DATE"),
            Self::LockedDueToDes3BlockCounter => {
                write!(f, "CK_KEY_STATUS_F_LOCKED_DUE_TO_DES3_BLOCK_COUNTER")
            }
            Self::LockedDueToUsageCounter => {
                write!(f, "CK_KEY_STATUS_F_LOCKED_DUE_TO_USAGE_COUNTER")
            }
            Self::Other(flags) => write!(f, "0x{flags:02X}"),
        }
    }
}
