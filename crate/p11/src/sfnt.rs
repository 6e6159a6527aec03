//! Luna vendor extensions (`CA_*` functions).
//!
//! The extension table layout changes between Luna client releases, so each
//! function is looked up by name. Functions missing from older clients stay
//! `None` and fail when called.
#![allow(non_camel_case_types, non_snake_case)]

use libloading::Library;
use luna_logger::debug;
use pkcs11_sys::{
    CK_ATTRIBUTE_PTR, CK_BYTE_PTR, CK_MECHANISM_PTR, CK_OBJECT_HANDLE, CK_OBJECT_HANDLE_PTR,
    CK_RV, CK_SESSION_HANDLE, CK_ULONG, CK_ULONG_PTR,
};

pub type CA_AuthorizeKey = Option<
    unsafe extern "C" fn(CK_SESSION_HANDLE, CK_OBJECT_HANDLE, CK_BYTE_PTR, CK_ULONG) -> CK_RV,
>;
pub type CA_ResetAuthorizationData = CA_AuthorizeKey;
pub type CA_SIMInsert = Option<
    unsafe extern "C" fn(
        CK_SESSION_HANDLE,
        CK_ULONG,
        CK_ULONG,
        CK_ULONG_PTR,
        *mut CK_BYTE_PTR,
        CK_ULONG,
        CK_BYTE_PTR,
        CK_ULONG_PTR,
        CK_OBJECT_HANDLE_PTR,
    ) -> CK_RV,
>;
pub type CA_EncapsulateKey = Option<
    unsafe extern "C" fn(
        CK_SESSION_HANDLE,
        CK_MECHANISM_PTR,
        CK_OBJECT_HANDLE,
        CK_ATTRIBUTE_PTR,
        CK_ULONG,
        CK_BYTE_PTR,
        CK_ULONG_PTR,
        CK_OBJECT_HANDLE_PTR,
    ) -> CK_RV,
>;
pub type CA_DecapsulateKey = Option<
    unsafe extern "C" fn(
        CK_SESSION_HANDLE,
        CK_MECHANISM_PTR,
        CK_OBJECT_HANDLE,
        CK_ATTRIBUTE_PTR,
        CK_ULONG,
        CK_BYTE_PTR,
        CK_ULONG,
        CK_OBJECT_HANDLE_PTR,
    ) -> CK_RV,
>;

/// `CKA_SIM_AUTH_FORM` value for blobs exported without authorization secrets.
pub const CKA_SIM_NO_AUTHORIZATION: CK_ULONG = 0;

#[derive(Debug, Clone, Copy, Default)]
pub struct SfntFunctions {
    pub(crate) CA_AuthorizeKey: CA_AuthorizeKey,
    pub(crate) CA_ResetAuthorizationData: CA_ResetAuthorizationData,
    pub(crate) CA_SIMInsert: CA_SIMInsert,
    pub(crate) CA_EncapsulateKey: CA_EncapsulateKey,
    pub(crate) CA_DecapsulateKey: CA_DecapsulateKey,
}

macro_rules! resolve {
    ($library:expr, $name:ident) => {{
        // SAFETY: the symbol type matches the Luna cryptoki_v2.h prototype
        let symbol = unsafe { $library.get(concat!(stringify!($name), "\0").as_bytes()) };
        match symbol {
            Ok(symbol) => Some(*symbol),
            Err(e) => {
                debug!("{} not exported: {e}", stringify!($name));
                None
            }
        }
    }};
}

impl SfntFunctions {
    pub(crate) fn resolve(library: &Library) -> Self {
        Self {
            CA_AuthorizeKey: resolve!(library, CA_AuthorizeKey),
            CA_ResetAuthorizationData: resolve!(library, CA_ResetAuthorizationData),
            CA_SIMInsert: resolve!(library, CA_SIMInsert),
            CA_EncapsulateKey: resolve!(library, CA_EncapsulateKey),
            CA_DecapsulateKey: resolve!(library, CA_DecapsulateKey),
        }
    }

    /// Names of the extensions this library exports.
    #[must_use]
    pub fn available(&self) -> Vec<&'static str> {
        [
            ("CA_AuthorizeKey", self.CA_AuthorizeKey.is_some()),
            (
                "CA_ResetAuthorizationData",
                self.CA_ResetAuthorizationData.is_some(),
            ),
            ("CA_SIMInsert", self.CA_SIMInsert.is_some()),
            ("CA_EncapsulateKey", self.CA_EncapsulateKey.is_some()),
            ("CA_DecapsulateKey", self.CA_DecapsulateKey.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, present)| present.then_some(name))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::SfntFunctions;

    #[test]
    fn missing_extensions_are_reported_absent() {
        let functions = SfntFunctions::default();
        assert!(functions.available().is_empty());
    }
}
