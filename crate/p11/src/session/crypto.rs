use std::ptr;

use pkcs11_sys::{CK_OBJECT_HANDLE, CK_ULONG, CKR_OK, CKR_SIGNATURE_INVALID};
use zeroize::Zeroizing;

use crate::{Mechanism, P11Error, P11Result, Session, hsm_call, hsm_call_rv};

/// Run a single-part operation twice: once to learn the output length, then
/// into a buffer of that length.
macro_rules! two_call {
    ($session:expr, $context:expr, $function:ident, $input:expr) => {{
        let input: &[u8] = $input;
        let input_len = CK_ULONG::try_from(input.len())?;
        let mut len: CK_ULONG = 0;
        hsm_call!(
            $session.lib,
            $context,
            $function,
            $session.handle,
            input.as_ptr().cast_mut(),
            input_len,
            ptr::null_mut(),
            &raw mut len
        );
        let mut output = vec![0_u8; usize::try_from(len)?];
        hsm_call!(
            $session.lib,
            $context,
            $function,
            $session.handle,
            input.as_ptr().cast_mut(),
            input_len,
            output.as_mut_ptr(),
            &raw mut len
        );
        output.truncate(usize::try_from(len)?);
        output
    }};
}

impl Session {
    /// Single-part encryption.
    ///
    /// The error of the length query carries the return code, which is how
    /// per-key authorization failures such as `CKR_KEY_NOT_AUTHORIZED`
    /// surface.
    pub fn encrypt(
        &self,
        mechanism: &Mechanism,
        key: CK_OBJECT_HANDLE,
        plaintext: &[u8],
    ) -> P11Result<Vec<u8>> {
        mechanism.with_raw(|mech| {
            hsm_call!(
                self.lib,
                format!("Failed initializing encryption with key {key}"),
                C_EncryptInit,
                self.handle,
                mech,
                key
            );
            Ok(two_call!(self, "Failed encrypting", C_Encrypt, plaintext))
        })
    }

    pub fn decrypt(
        &self,
        mechanism: &Mechanism,
        key: CK_OBJECT_HANDLE,
        ciphertext: &[u8],
    ) -> P11Result<Zeroizing<Vec<u8>>> {
        mechanism.with_raw(|mech| {
            hsm_call!(
                self.lib,
                format!("Failed initializing decryption with key {key}"),
                C_DecryptInit,
                self.handle,
                mech,
                key
            );
            Ok(Zeroizing::new(two_call!(
                self,
                "Failed decrypting",
                C_Decrypt,
                ciphertext
            )))
        })
    }

    pub fn digest(&self, mechanism: &Mechanism, data: &[u8]) -> P11Result<Vec<u8>> {
        mechanism.with_raw(|mech| {
            hsm_call!(
                self.lib,
                "Failed initializing digest",
                C_DigestInit,
                self.handle,
                mech
            );
            Ok(two_call!(self, "Failed digesting", C_Digest, data))
        })
    }

    pub fn sign(
        &self,
        mechanism: &Mechanism,
        key: CK_OBJECT_HANDLE,
        data: &[u8],
    ) -> P11Result<Vec<u8>> {
        mechanism.with_raw(|mech| {
            hsm_call!(
                self.lib,
                format!("Failed initializing signature with key {key}"),
                C_SignInit,
                self.handle,
                mech,
                key
            );
            Ok(two_call!(self, "Failed signing", C_Sign, data))
        })
    }

    /// `Ok(false)` when the library reports `CKR_SIGNATURE_INVALID`.
    pub fn verify(
        &self,
        mechanism: &Mechanism,
        key: CK_OBJECT_HANDLE,
        data: &[u8],
        signature: &[u8],
    ) -> P11Result<bool> {
        mechanism.with_raw(|mech| {
            hsm_call!(
                self.lib,
                format!("Failed initializing verification with key {key}"),
                C_VerifyInit,
                self.handle,
                mech,
                key
            );
            let rv = hsm_call_rv!(
                self.lib,
                C_Verify,
                self.handle,
                data.as_ptr().cast_mut(),
                CK_ULONG::try_from(data.len())?,
                signature.as_ptr().cast_mut(),
                CK_ULONG::try_from(signature.len())?
            );
            match rv {
                CKR_OK => Ok(true),
                CKR_SIGNATURE_INVALID => Ok(false),
                rv => Err(P11Error::Pkcs11 {
                    context: "Failed verifying".to_owned(),
                    function: "C_Verify",
                    rv,
                }),
            }
        })
    }

    pub fn generate_random(&self, len: usize) -> P11Result<Vec<u8>> {
        let mut bytes = vec![0_u8; len];
        hsm_call!(
            self.lib,
            format!("Failed generating {len} random bytes"),
            C_GenerateRandom,
            self.handle,
            bytes.as_mut_ptr(),
            CK_ULONG::try_from(len)?
        );
        Ok(bytes)
    }
}
