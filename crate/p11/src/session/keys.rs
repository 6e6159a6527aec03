use std::ptr;

use luna_logger::debug;
use pkcs11_sys::{CK_OBJECT_HANDLE, CK_ULONG};

use crate::{Mechanism, P11Result, Session, Template, hsm_call};

/// Handles of a freshly generated key pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPair {
    pub public: CK_OBJECT_HANDLE,
    pub private: CK_OBJECT_HANDLE,
}

impl Session {
    pub fn generate_key(
        &self,
        mechanism: &Mechanism,
        template: &Template,
    ) -> P11Result<CK_OBJECT_HANDLE> {
        let mut raw = template.as_raw()?;
        let mut handle: CK_OBJECT_HANDLE = 0;
        mechanism.with_raw(|mech| {
            hsm_call!(
                self.lib,
                "Failed generating key",
                C_GenerateKey,
                self.handle,
                mech,
                raw.as_mut_ptr(),
                CK_ULONG::try_from(raw.len())?,
                &raw mut handle
            );
            Ok(())
        })?;
        debug!("Generated key {handle}");
        Ok(handle)
    }

    pub fn generate_key_pair(
        &self,
        mechanism: &Mechanism,
        public_template: &Template,
        private_template: &Template,
    ) -> P11Result<KeyPair> {
        let mut public_raw = public_template.as_raw()?;
        let mut private_raw = private_template.as_raw()?;
        let mut pair = KeyPair {
            public: 0,
            private: 0,
        };
        mechanism.with_raw(|mech| {
            hsm_call!(
                self.lib,
                "Failed generating key pair",
                C_GenerateKeyPair,
                self.handle,
                mech,
                public_raw.as_mut_ptr(),
                CK_ULONG::try_from(public_raw.len())?,
                private_raw.as_mut_ptr(),
                CK_ULONG::try_from(private_raw.len())?,
                &raw mut pair.public,
                &raw mut pair.private
            );
            Ok(())
        })?;
        debug!(
            "Generated key pair, public {} private {}",
            pair.public, pair.private
        );
        Ok(pair)
    }

    pub fn derive_key(
        &self,
        mechanism: &Mechanism,
        base_key: CK_OBJECT_HANDLE,
        template: &Template,
    ) -> P11Result<CK_OBJECT_HANDLE> {
        let mut raw = template.as_raw()?;
        let mut handle: CK_OBJECT_HANDLE = 0;
        mechanism.with_raw(|mech| {
            hsm_call!(
                self.lib,
                format!("Failed deriving a key from {base_key}"),
                C_DeriveKey,
                self.handle,
                mech,
                base_key,
                raw.as_mut_ptr(),
                CK_ULONG::try_from(raw.len())?,
                &raw mut handle
            );
            Ok(())
        })?;
        Ok(handle)
    }

    /// Wrap `key` with `wrapping_key`; the output is sized by a first call.
    pub fn wrap_key(
        &self,
        mechanism: &Mechanism,
        wrapping_key: CK_OBJECT_HANDLE,
        key: CK_OBJECT_HANDLE,
    ) -> P11Result<Vec<u8>> {
        mechanism.with_raw(|mech| {
            let mut len: CK_ULONG = 0;
            hsm_call!(
                self.lib,
                format!("Failed sizing the wrapped form of {key}"),
                C_WrapKey,
                self.handle,
                &raw mut *mech,
                wrapping_key,
                key,
                ptr::null_mut(),
                &raw mut len
            );
            let mut wrapped = vec![0_u8; usize::try_from(len)?];
            hsm_call!(
                self.lib,
                format!("Failed wrapping key {key}"),
                C_WrapKey,
                self.handle,
                mech,
                wrapping_key,
                key,
                wrapped.as_mut_ptr(),
                &raw mut len
            );
            wrapped.truncate(usize::try_from(len)?);
            Ok(wrapped)
        })
    }

    pub fn unwrap_key(
        &self,
        mechanism: &Mechanism,
        unwrapping_key: CK_OBJECT_HANDLE,
        wrapped: &[u8],
        template: &Template,
    ) -> P11Result<CK_OBJECT_HANDLE> {
        let mut raw = template.as_raw()?;
        let mut handle: CK_OBJECT_HANDLE = 0;
        mechanism.with_raw(|mech| {
            hsm_call!(
                self.lib,
                "Failed unwrapping key",
                C_UnwrapKey,
                self.handle,
                mech,
                unwrapping_key,
                wrapped.as_ptr().cast_mut(),
                CK_ULONG::try_from(wrapped.len())?,
                raw.as_mut_ptr(),
                CK_ULONG::try_from(raw.len())?,
                &raw mut handle
            );
            Ok(())
        })?;
        debug!("Unwrapped key {handle}");
        Ok(handle)
    }
}
