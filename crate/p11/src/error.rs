use std::num::TryFromIntError;

use pkcs11_sys::CK_RV;
use thiserror::Error;

use crate::vendor::rv_name;

pub type P11Result<T> = Result<T, P11Error>;

#[derive(Error, Debug)]
pub enum P11Error {
    #[error("{0}")]
    Default(String),

    #[error("Error loading the library: {0}")]
    LibLoading(#[from] libloading::Error),

    #[error("{context}: {function} failed with 0x{rv:08X} ({})", rv_name(*.rv))]
    Pkcs11 {
        context: String,
        function: &'static str,
        rv: CK_RV,
    },

    #[error(transparent)]
    TryFromIntError(#[from] TryFromIntError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl P11Error {
    /// The PKCS#11 return value carried by this error, if any.
    #[must_use]
    pub const fn rv(&self) -> Option<CK_RV> {
        match self {
            Self::Pkcs11 { rv, .. } => Some(*rv),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use pkcs11_sys::{CKR_PIN_INCORRECT, CKR_SLOT_ID_INVALID};

    use super::P11Error;
    use crate::vendor::CKR_KEY_NOT_AUTHORIZED;

    #[test]
    fn pkcs11_error_shows_context_and_code_name() {
        let err = P11Error::Pkcs11 {
            context: "Failed logging in".to_owned(),
            function: "C_Login",
            rv: CKR_PIN_INCORRECT,
        };
        assert_eq!(
            err.to_string(),
            "Failed logging in: C_Login failed with 0x000000A0 (CKR_PIN_INCORRECT)"
        );
        assert_eq!(err.rv(), Some(CKR_PIN_INCORRECT));
    }

    #[test]
    fn unknown_and_vendor_codes() {
        let err = P11Error::Pkcs11 {
            context: "Opening session".to_owned(),
            function: "C_OpenSession",
            rv: CKR_SLOT_ID_INVALID,
        };
        assert!(err.to_string().ends_with("(CKR_SLOT_ID_INVALID)"));

        let err = P11Error::Pkcs11 {
            context: "Encrypting".to_owned(),
            function: "C_Encrypt",
            rv: CKR_KEY_NOT_AUTHORIZED,
        };
        assert!(err.to_string().ends_with("(CKR_KEY_NOT_AUTHORIZED)"));

        let err = P11Error::Pkcs11 {
            context: "x".to_owned(),
            function: "C_Sign",
            rv: 0x7777,
        };
        assert!(err.to_string().ends_with("(unknown)"));
        assert_eq!(P11Error::Default("boom".to_owned()).rv(), None);
    }
}
