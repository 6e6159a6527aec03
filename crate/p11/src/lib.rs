//! Runtime PKCS#11 client for Luna HSMs.
//!
//! [`P11Lib`] loads the vendor library named by the caller, [`Session`] wraps
//! one authenticated session on a slot and exposes the operations the samples
//! need. Attribute templates and mechanism parameters are owned Rust values
//! ([`Template`], [`Mechanism`]) turned into raw structures only for the
//! duration of a call.

pub use error::{P11Error, P11Result};
pub use mechanism::{HashSignContext, Mechanism, OaepParams, PrfKdfParams, SignContext};
pub use p11_lib::{LibraryInfo, P11Lib, Version};
pub use params::{
    EcCurve, HSS_MAX_LEVELS, KeyStatus, KeyStatusFlag, LmotsType, LmsType, MlDsaParameterSet,
    MlKemParameterSet, ObjectClassFilter, PqcKeyType,
};
pub use pkcs11_sys as sys;
pub use session::{KeyPair, Session};
pub use sfnt::SfntFunctions;
pub use slots::{SlotInfo, SlotSelector, TokenInfo};
pub use template::Template;

mod error;
mod mechanism;
mod p11_lib;
mod params;
mod session;
mod sfnt;
mod slots;
mod template;
pub mod vendor;

#[cfg(all(test, feature = "luna"))]
mod test_helpers;
#[cfg(all(test, feature = "luna"))]
mod tests;

/// Call a library function and return its raw `CK_RV`.
///
/// Fails only when the function is absent from the library.
#[macro_export]
macro_rules! hsm_call_rv {
    ($lib:expr, $function:ident $(, $arg:expr)* $(,)?) => {{
        let function = $lib.$function.ok_or_else(|| {
            $crate::P11Error::Default(format!(
                "{} not available on library",
                stringify!($function)
            ))
        })?;
        #[allow(unsafe_code)]
        unsafe {
            function($($arg),*)
        }
    }};
}

/// Call a library function and return early with [`P11Error::Pkcs11`] when it
/// does not return `CKR_OK`.
#[macro_export]
macro_rules! hsm_call {
    ($lib:expr, $context:expr, $function:ident $(, $arg:expr)* $(,)?) => {{
        let rv = $crate::hsm_call_rv!($lib, $function $(, $arg)*);
        if rv != $crate::sys::CKR_OK {
            return Err($crate::P11Error::Pkcs11 {
                context: ($context).to_string(),
                function: stringify!($function),
                rv,
            });
        }
    }};
}
