//! Operations backed by the Luna `CA_*` extensions.

use std::ptr;

use luna_logger::debug;
use pkcs11_sys::{CK_ATTRIBUTE, CK_OBJECT_HANDLE, CK_ULONG};
use zeroize::Zeroizing;

use crate::{
    KeyStatus, Mechanism, P11Result, Session, Template, hsm_call,
    sfnt::CKA_SIM_NO_AUTHORIZATION,
    vendor::{CK_KEY_STATUS, CKA_FAILED_KEY_AUTH_COUNT, CKA_KEY_STATUS},
};

impl Session {
    /// Encapsulate a new secret under `public_key`.
    ///
    /// Returns the ciphertext, at most `ciphertext_capacity` bytes, and the
    /// handle of the secret created from `template`.
    pub fn encapsulate_key(
        &self,
        mechanism: &Mechanism,
        public_key: CK_OBJECT_HANDLE,
        template: &Template,
        ciphertext_capacity: usize,
    ) -> P11Result<(Vec<u8>, CK_OBJECT_HANDLE)> {
        let mut raw = template.as_raw()?;
        let mut ciphertext = vec![0_u8; ciphertext_capacity];
        let mut len = CK_ULONG::try_from(ciphertext.len())?;
        let mut handle: CK_OBJECT_HANDLE = 0;
        mechanism.with_raw(|mech| {
            hsm_call!(
                self.lib.sfnt,
                "Failed encapsulating key",
                CA_EncapsulateKey,
                self.handle,
                mech,
                public_key,
                raw.as_mut_ptr(),
                CK_ULONG::try_from(raw.len())?,
                ciphertext.as_mut_ptr(),
                &raw mut len,
                &raw mut handle
            );
            Ok(())
        })?;
        ciphertext.truncate(usize::try_from(len)?);
        debug!("Encapsulated secret {handle} in {len} bytes");
        Ok((ciphertext, handle))
    }

    /// Recover the secret of `ciphertext` with `private_key` as a new object.
    pub fn decapsulate_key(
        &self,
        mechanism: &Mechanism,
        private_key: CK_OBJECT_HANDLE,
        template: &Template,
        ciphertext: &[u8],
    ) -> P11Result<CK_OBJECT_HANDLE> {
        let mut raw = template.as_raw()?;
        let mut handle: CK_OBJECT_HANDLE = 0;
        mechanism.with_raw(|mech| {
            hsm_call!(
                self.lib.sfnt,
                "Failed decapsulating key",
                CA_DecapsulateKey,
                self.handle,
                mech,
                private_key,
                raw.as_mut_ptr(),
                CK_ULONG::try_from(raw.len())?,
                ciphertext.as_ptr().cast_mut(),
                CK_ULONG::try_from(ciphertext.len())?,
                &raw mut handle
            );
            Ok(())
        })?;
        Ok(handle)
    }

    /// Authorize this session to use `key` with its authorization data.
    pub fn authorize_key(&self, key: CK_OBJECT_HANDLE, auth_data: &[u8]) -> P11Result<()> {
        let auth_data = Zeroizing::new(auth_data.to_vec());
        hsm_call!(
            self.lib.sfnt,
            format!("Failed to authorize key {key}"),
            CA_AuthorizeKey,
            self.handle,
            key,
            auth_data.as_ptr().cast_mut(),
            CK_ULONG::try_from(auth_data.len())?
        );
        Ok(())
    }

    /// Replace the authorization data of `key`, clearing its failure count.
    pub fn reset_authorization_data(
        &self,
        key: CK_OBJECT_HANDLE,
        auth_data: &[u8],
    ) -> P11Result<()> {
        let auth_data = Zeroizing::new(auth_data.to_vec());
        hsm_call!(
            self.lib.sfnt,
            format!("Failed resetting authorization data of key {key}"),
            CA_ResetAuthorizationData,
            self.handle,
            key,
            auth_data.as_ptr().cast_mut(),
            CK_ULONG::try_from(auth_data.len())?
        );
        Ok(())
    }

    /// Status and failed attempts of a key under per-key authorization.
    pub fn key_status(&self, key: CK_OBJECT_HANDLE) -> P11Result<(KeyStatus, CK_ULONG)> {
        let mut status = CK_KEY_STATUS::default();
        let mut failed: CK_ULONG = 0;
        let mut attributes = [
            CK_ATTRIBUTE {
                type_: CKA_KEY_STATUS,
                pValue: (&raw mut status).cast(),
                ulValueLen: CK_ULONG::try_from(size_of::<CK_KEY_STATUS>())?,
            },
            CK_ATTRIBUTE {
                type_: CKA_FAILED_KEY_AUTH_COUNT,
                pValue: (&raw mut failed).cast(),
                ulValueLen: CK_ULONG::try_from(size_of::<CK_ULONG>())?,
            },
        ];
        hsm_call!(
            self.lib,
            format!("Failed reading the status of key {key}"),
            C_GetAttributeValue,
            self.handle,
            key,
            attributes.as_mut_ptr(),
            CK_ULONG::try_from(attributes.len())?
        );
        Ok((KeyStatus::from(status), failed))
    }

    /// Import the objects of a SIM blob exported without authorization.
    ///
    /// The first call counts the objects, the second receives their handles.
    pub fn sim_insert(&self, blob: &[u8]) -> P11Result<Vec<CK_OBJECT_HANDLE>> {
        let blob_len = CK_ULONG::try_from(blob.len())?;
        let mut count: CK_ULONG = 0;
        hsm_call!(
            self.lib.sfnt,
            "Failed counting the objects of the SIM blob",
            CA_SIMInsert,
            self.handle,
            0,
            CKA_SIM_NO_AUTHORIZATION,
            ptr::null_mut(),
            ptr::null_mut(),
            blob_len,
            blob.as_ptr().cast_mut(),
            &raw mut count,
            ptr::null_mut()
        );
        let mut handles = vec![0 as CK_OBJECT_HANDLE; usize::try_from(count)?];
        hsm_call!(
            self.lib.sfnt,
            "Failed inserting the SIM blob",
            CA_SIMInsert,
            self.handle,
            0,
            CKA_SIM_NO_AUTHORIZATION,
            ptr::null_mut(),
            ptr::null_mut(),
            blob_len,
            blob.as_ptr().cast_mut(),
            &raw mut count,
            handles.as_mut_ptr()
        );
        handles.truncate(usize::try_from(count)?);
        debug!("SIM blob inserted {} object(s)", handles.len());
        Ok(handles)
    }
}
