//! Session lifecycle.
//!
//! A [`Session`] is opened on one slot and owns its handle: dropping it logs
//! out (when this session logged in) and closes it. The operations are
//! spread over the sibling modules by theme.

use std::{ptr, sync::Arc};

use luna_logger::{debug, warn};
use pkcs11_sys::{
    CK_FLAGS, CK_SESSION_HANDLE, CK_SLOT_ID, CK_ULONG, CKF_RW_SESSION, CKF_SERIAL_SESSION,
    CKR_OK, CKR_USER_ALREADY_LOGGED_IN, CKU_USER,
};
use zeroize::Zeroizing;

use crate::{P11Error, P11Lib, P11Result, hsm_call, hsm_call_rv};

pub struct Session {
    pub(super) lib: Arc<P11Lib>,
    pub(super) handle: CK_SESSION_HANDLE,
    slot_id: CK_SLOT_ID,
    logged_in: bool,
}

impl Session {
    /// Open a serial session on `slot_id`, read/write when asked.
    pub fn open(lib: &Arc<P11Lib>, slot_id: CK_SLOT_ID, read_write: bool) -> P11Result<Self> {
        let mut flags: CK_FLAGS = CKF_SERIAL_SESSION;
        if read_write {
            flags |= CKF_RW_SESSION;
        }
        let mut handle: CK_SESSION_HANDLE = 0;
        hsm_call!(
            lib,
            format!("Failed opening a session on slot {slot_id}"),
            C_OpenSession,
            slot_id,
            flags,
            ptr::null_mut(),
            None,
            &raw mut handle
        );
        debug!("Opened session {handle} on slot {slot_id}");
        Ok(Self {
            lib: lib.clone(),
            handle,
            slot_id,
            logged_in: false,
        })
    }

    /// Log in as the Crypto Officer (`CKU_USER`).
    ///
    /// A token already logged in by another session of this application is
    /// not an error.
    pub fn login(&mut self, pin: &str) -> P11Result<()> {
        let pin = Zeroizing::new(pin.as_bytes().to_vec());
        let rv = hsm_call_rv!(
            self.lib,
            C_Login,
            self.handle,
            CKU_USER,
            pin.as_ptr().cast_mut(),
            CK_ULONG::try_from(pin.len())?
        );
        match rv {
            CKR_OK => {
                self.logged_in = true;
                debug!("Session {} logged in", self.handle);
                Ok(())
            }
            CKR_USER_ALREADY_LOGGED_IN => {
                warn!("Slot {} is already logged in", self.slot_id);
                Ok(())
            }
            rv => Err(P11Error::Pkcs11 {
                context: format!("Failed logging in to slot {}", self.slot_id),
                function: "C_Login",
                rv,
            }),
        }
    }

    pub fn logout(&mut self) -> P11Result<()> {
        if !self.logged_in {
            return Ok(());
        }
        self.logged_in = false;
        hsm_call!(self.lib, "Failed logging out", C_Logout, self.handle);
        Ok(())
    }

    #[must_use]
    pub const fn handle(&self) -> CK_SESSION_HANDLE {
        self.handle
    }

    #[must_use]
    pub const fn slot_id(&self) -> CK_SLOT_ID {
        self.slot_id
    }

    #[must_use]
    pub const fn is_logged_in(&self) -> bool {
        self.logged_in
    }

    #[must_use]
    pub fn lib(&self) -> &Arc<P11Lib> {
        &self.lib
    }

    fn close(&mut self) -> P11Result<()> {
        if let Err(e) = self.logout() {
            warn!("{e}");
        }
        hsm_call!(
            self.lib,
            format!("Failed closing session {}", self.handle),
            C_CloseSession,
            self.handle
        );
        debug!("Closed session {}", self.handle);
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("{e}");
        }
    }
}
