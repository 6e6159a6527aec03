use std::{
    ffi::OsStr,
    fmt::{self, Display, Formatter},
    path::{Path, PathBuf},
    ptr,
};

use libloading::Library;
use luna_logger::debug;
use pkcs11_sys::{
    CK_C_CloseSession, CK_C_Decrypt, CK_C_DecryptInit, CK_C_DeriveKey, CK_C_DestroyObject,
    CK_C_Digest, CK_C_DigestInit, CK_C_Encrypt, CK_C_EncryptInit, CK_C_Finalize,
    CK_C_FindObjects, CK_C_FindObjectsFinal, CK_C_FindObjectsInit, CK_C_GenerateKey,
    CK_C_GenerateKeyPair, CK_C_GenerateRandom, CK_C_GetAttributeValue, CK_C_GetInfo,
    CK_C_GetSlotInfo, CK_C_GetSlotList, CK_C_GetTokenInfo, CK_C_INITIALIZE_ARGS,
    CK_C_Initialize, CK_C_Login, CK_C_Logout, CK_C_OpenSession, CK_C_Sign, CK_C_SignInit,
    CK_C_UnwrapKey, CK_C_Verify, CK_C_VerifyInit, CK_C_WrapKey, CK_FUNCTION_LIST_PTR,
    CK_FUNCTION_LIST_PTR_PTR, CK_INFO, CK_RV, CK_VERSION, CKF_OS_LOCKING_OK, CKR_OK,
};

use crate::{P11Error, P11Result, hsm_call, sfnt::SfntFunctions};

/// A PKCS#11 library loaded at runtime.
///
/// The library is initialised with OS locking when loaded and finalised
/// when dropped, unless `C_Initialize` failed. Function pointers are copied
/// out of the table returned by `C_GetFunctionList`; the vendor `CA_*`
/// extensions are resolved by symbol name, see [`SfntFunctions`].
#[allow(non_snake_case)]
pub struct P11Lib {
    _library: Library,
    path: PathBuf,
    initialized: bool,
    pub(crate) C_Initialize: CK_C_Initialize,
    pub(crate) C_Finalize: CK_C_Finalize,
    pub(crate) C_GetInfo: CK_C_GetInfo,

    pub(crate) C_GetSlotList: CK_C_GetSlotList,
    pub(crate) C_GetSlotInfo: CK_C_GetSlotInfo,
    pub(crate) C_GetTokenInfo: CK_C_GetTokenInfo,

    pub(crate) C_OpenSession: CK_C_OpenSession,
    pub(crate) C_CloseSession: CK_C_CloseSession,
    pub(crate) C_Login: CK_C_Login,
    pub(crate) C_Logout: CK_C_Logout,

    pub(crate) C_GetAttributeValue: CK_C_GetAttributeValue,
    pub(crate) C_DestroyObject: CK_C_DestroyObject,
    pub(crate) C_FindObjectsInit: CK_C_FindObjectsInit,
    pub(crate) C_FindObjects: CK_C_FindObjects,
    pub(crate) C_FindObjectsFinal: CK_C_FindObjectsFinal,

    pub(crate) C_EncryptInit: CK_C_EncryptInit,
    pub(crate) C_Encrypt: CK_C_Encrypt,
    pub(crate) C_DecryptInit: CK_C_DecryptInit,
    pub(crate) C_Decrypt: CK_C_Decrypt,
    pub(crate) C_DigestInit: CK_C_DigestInit,
    pub(crate) C_Digest: CK_C_Digest,
    pub(crate) C_SignInit: CK_C_SignInit,
    pub(crate) C_Sign: CK_C_Sign,
    pub(crate) C_VerifyInit: CK_C_VerifyInit,
    pub(crate) C_Verify: CK_C_Verify,

    pub(crate) C_GenerateKey: CK_C_GenerateKey,
    pub(crate) C_GenerateKeyPair: CK_C_GenerateKeyPair,
    pub(crate) C_WrapKey: CK_C_WrapKey,
    pub(crate) C_UnwrapKey: CK_C_UnwrapKey,
    pub(crate) C_DeriveKey: CK_C_DeriveKey,
    pub(crate) C_GenerateRandom: CK_C_GenerateRandom,

    pub(crate) sfnt: SfntFunctions,
}

impl P11Lib {
    /// Load the library at `path`, resolve its function table and initialise it.
    ///
    /// # Errors
    /// - the library cannot be loaded or does not export `C_GetFunctionList`
    /// - `C_GetFunctionList` or `C_Initialize` fails
    pub fn instantiate<P: AsRef<OsStr>>(path: P) -> P11Result<Self> {
        let path = PathBuf::from(path.as_ref());
        debug!("Loading PKCS#11 library {}", path.display());
        // SAFETY: loading a library runs its initialisers; the caller chose it
        let library = unsafe { Library::new(&path)? };
        let get_function_list = unsafe {
            *library.get::<unsafe extern "C" fn(CK_FUNCTION_LIST_PTR_PTR) -> CK_RV>(
                b"C_GetFunctionList",
            )?
        };
        let mut list: CK_FUNCTION_LIST_PTR = ptr::null_mut();
        let rv = unsafe { get_function_list(&raw mut list) };
        if rv != CKR_OK || list.is_null() {
            return Err(P11Error::Pkcs11 {
                context: format!("Resolving the function list of {}", path.display()),
                function: "C_GetFunctionList",
                rv,
            });
        }
        // SAFETY: non null, owned by the library which outlives this borrow
        let list = unsafe { &*list };
        let sfnt = SfntFunctions::resolve(&library);

        let mut p11 = Self {
            C_Initialize: list.C_Initialize,
            C_Finalize: list.C_Finalize,
            C_GetInfo: list.C_GetInfo,
            C_GetSlotList: list.C_GetSlotList,
            C_GetSlotInfo: list.C_GetSlotInfo,
            C_GetTokenInfo: list.C_GetTokenInfo,
            C_OpenSession: list.C_OpenSession,
            C_CloseSession: list.C_CloseSession,
            C_Login: list.C_Login,
            C_Logout: list.C_Logout,
            C_GetAttributeValue: list.C_GetAttributeValue,
            C_DestroyObject: list.C_DestroyObject,
            C_FindObjectsInit: list.C_FindObjectsInit,
            C_FindObjects: list.C_FindObjects,
            C_FindObjectsFinal: list.C_FindObjectsFinal,
            C_EncryptInit: list.C_EncryptInit,
            C_Encrypt: list.C_Encrypt,
            C_DecryptInit: list.C_DecryptInit,
            C_Decrypt: list.C_Decrypt,
            C_DigestInit: list.C_DigestInit,
            C_Digest: list.C_Digest,
            C_SignInit: list.C_SignInit,
            C_Sign: list.C_Sign,
            C_VerifyInit: list.C_VerifyInit,
            C_Verify: list.C_Verify,
            C_GenerateKey: list.C_GenerateKey,
            C_GenerateKeyPair: list.C_GenerateKeyPair,
            C_WrapKey: list.C_WrapKey,
            C_UnwrapKey: list.C_UnwrapKey,
            C_DeriveKey: list.C_DeriveKey,
            C_GenerateRandom: list.C_GenerateRandom,
            sfnt,
            path,
            initialized: false,
            _library: library,
        };
        p11.initialize()?;
        p11.initialized = true;
        Ok(p11)
    }

    /// Path the library was loaded from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Vendor extension functions resolved from the library.
    #[must_use]
    pub const fn sfnt(&self) -> &SfntFunctions {
        &self.sfnt
    }

    fn initialize(&self) -> P11Result<()> {
        let mut args = CK_C_INITIALIZE_ARGS {
            CreateMutex: None,
            DestroyMutex: None,
            LockMutex: None,
            UnlockMutex: None,
            flags: CKF_OS_LOCKING_OK,
            pReserved: ptr::null_mut(),
        };
        hsm_call!(
            self,
            "Failed initializing the library",
            C_Initialize,
            (&raw mut args).cast()
        );
        Ok(())
    }

    fn finalize(&self) -> P11Result<()> {
        hsm_call!(
            self,
            "Failed finalizing the library",
            C_Finalize,
            ptr::null_mut()
        );
        Ok(())
    }

    /// General information about the library.
    pub fn info(&self) -> P11Result<LibraryInfo> {
        let mut info = CK_INFO::default();
        hsm_call!(self, "Failed getting library info", C_GetInfo, &raw mut info);
        Ok(LibraryInfo::from(info))
    }
}

impl Drop for P11Lib {
    fn drop(&mut self) {
        if !self.initialized {
            return;
        }
        if let Err(e) = self.finalize() {
            luna_logger::warn!("{e}");
        }
    }
}

/// Decode a fixed size, blank padded PKCS#11 string.
pub(crate) fn padded_string(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).trim_end().to_owned()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
}

impl From<CK_VERSION> for Version {
    fn from(version: CK_VERSION) -> Self {
        Self {
            major: version.major,
            minor: version.minor,
        }
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryInfo {
    pub cryptoki_version: Version,
    pub manufacturer_id: String,
    pub library_description: String,
    pub library_version: Version,
}

impl From<CK_INFO> for LibraryInfo {
    fn from(info: CK_INFO) -> Self {
        Self {
            cryptoki_version: info.cryptokiVersion.into(),
            manufacturer_id: padded_string(&info.manufacturerID),
            library_description: padded_string(&info.libraryDescription),
            library_version: info.libraryVersion.into(),
        }
    }
}

impl Display for LibraryInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "Cryptoki version    : {}", self.cryptoki_version)?;
        writeln!(f, "Manufacturer        : {}", self.manufacturer_id)?;
        writeln!(f, "Library description : {}", self.library_description)?;
        write!(f, "Library version     : {}", self.library_version)
    }
}
