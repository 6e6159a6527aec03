//! Host side: the Message Dispatch (`MD_*`) API of the Luna client, loaded at
//! runtime.
#![allow(non_camel_case_types, non_snake_case)]

use std::{
    ffi::{CStr, OsStr, c_char, c_ulong},
    path::PathBuf,
    ptr,
};

use libloading::Library;
use luna_logger::{debug, warn};

use crate::{
    CaesarRequest, FmError, FmResult, Operation, decode_reply, encode_request, error::FM_OK,
};

type MD_RV = u32;
const MDR_OK: MD_RV = 0;

/// Milliseconds `MD_SendReceive` waits for the module.
pub const SEND_RECEIVE_TIMEOUT: u32 = 10_000;

#[repr(C)]
struct MdBuffer {
    p_data: *mut u8,
    length: u32,
}

impl MdBuffer {
    const fn terminator() -> Self {
        Self {
            p_data: ptr::null_mut(),
            length: 0,
        }
    }
}

type MdInitialize = unsafe extern "C" fn() -> MD_RV;
type MdFinalize = unsafe extern "C" fn();
type MdGetHsmIndexForSlot = unsafe extern "C" fn(u32, *mut u32) -> MD_RV;
type MdGetEmbeddedSlotId = unsafe extern "C" fn(u32, *mut c_ulong) -> MD_RV;
type MdGetFmIdFromName = unsafe extern "C" fn(u32, *const c_char, u32, *mut u32) -> MD_RV;
type MdSendReceive = unsafe extern "C" fn(
    u32,
    u32,
    u16,
    *mut MdBuffer,
    u32,
    *mut MdBuffer,
    *mut u32,
    *mut u32,
) -> MD_RV;
type MdRvAsString = unsafe extern "C" fn(MD_RV) -> *const c_char;

/// The Message Dispatch library, initialised while this value lives.
pub struct MdLib {
    _library: Library,
    MD_Finalize: MdFinalize,
    MD_GetHsmIndexForSlot: MdGetHsmIndexForSlot,
    MD_GetEmbeddedSlotID: MdGetEmbeddedSlotId,
    MD_GetFmIdFromName: MdGetFmIdFromName,
    MD_SendReceive: MdSendReceive,
    MD_RvAsString: MdRvAsString,
}

macro_rules! symbol {
    ($library:expr, $name:literal) => {
        // SAFETY: the pointer types follow the prototypes of md.h
        unsafe { *$library.get(concat!($name, "\0").as_bytes())? }
    };
}

impl MdLib {
    /// Load the library at `path` and call `MD_Initialize`.
    ///
    /// # Errors
    /// - the library cannot be loaded or misses one of the `MD_*` functions
    /// - `MD_Initialize` fails
    pub fn load<P: AsRef<OsStr>>(path: P) -> FmResult<Self> {
        let path = PathBuf::from(path.as_ref());
        debug!("Loading Message Dispatch library {}", path.display());
        // SAFETY: loading a library runs its initialisers; the caller chose it
        let library = unsafe { Library::new(&path)? };
        let initialize: MdInitialize = symbol!(library, "MD_Initialize");
        let md = Self {
            MD_Finalize: symbol!(library, "MD_Finalize"),
            MD_GetHsmIndexForSlot: symbol!(library, "MD_GetHsmIndexForSlot"),
            MD_GetEmbeddedSlotID: symbol!(library, "MD_GetEmbeddedSlotID"),
            MD_GetFmIdFromName: symbol!(library, "MD_GetFmIdFromName"),
            MD_SendReceive: symbol!(library, "MD_SendReceive"),
            MD_RvAsString: symbol!(library, "MD_RvAsString"),
            _library: library,
        };
        // a failed initialisation is still finalised, by `Drop`
        md.check("MD_Initialize", unsafe { initialize() })?;
        Ok(md)
    }

    fn rv_as_string(&self, rv: MD_RV) -> String {
        // SAFETY: returns a static string or null
        let name = unsafe { (self.MD_RvAsString)(rv) };
        if name.is_null() {
            return format!("0x{rv:08X}");
        }
        unsafe { CStr::from_ptr(name) }
            .to_string_lossy()
            .into_owned()
    }

    fn check(&self, function: &'static str, rv: MD_RV) -> FmResult<()> {
        if rv == MDR_OK {
            return Ok(());
        }
        Err(FmError::MessageDispatch {
            function,
            rv,
            message: self.rv_as_string(rv),
        })
    }

    /// Index of the adapter serving `slot`.
    pub fn hsm_index_for_slot(&self, slot: u32) -> FmResult<u32> {
        let mut index = 0;
        let rv = unsafe { (self.MD_GetHsmIndexForSlot)(slot, &raw mut index) };
        self.check("MD_GetHsmIndexForSlot", rv)?;
        Ok(index)
    }

    /// Slot number as seen from inside the HSM.
    pub fn embedded_slot_id(&self, slot: u32) -> FmResult<c_ulong> {
        let mut embedded = 0;
        let rv = unsafe { (self.MD_GetEmbeddedSlotID)(slot, &raw mut embedded) };
        self.check("MD_GetEmbeddedSlotID", rv)?;
        Ok(embedded)
    }

    pub fn fm_id_from_name(&self, hsm_index: u32, name: &str) -> FmResult<u32> {
        let mut fm_id = 0;
        let rv = unsafe {
            (self.MD_GetFmIdFromName)(
                hsm_index,
                name.as_ptr().cast(),
                u32::try_from(name.len())?,
                &raw mut fm_id,
            )
        };
        self.check("MD_GetFmIdFromName", rv)?;
        Ok(fm_id)
    }

    /// Send `request` to module `fm_id` and wait for its reply in `response`.
    ///
    /// Returns the number of bytes received. A status other than `FM_OK`
    /// from the module is an [`FmError::Status`].
    pub fn send_receive(
        &self,
        hsm_index: u32,
        fm_id: u16,
        request: &[u8],
        response: &mut [u8],
    ) -> FmResult<usize> {
        let mut request_buffers = [
            MdBuffer {
                p_data: request.as_ptr().cast_mut(),
                length: u32::try_from(request.len())?,
            },
            MdBuffer::terminator(),
        ];
        let mut response_buffers = [
            MdBuffer {
                p_data: response.as_mut_ptr(),
                length: u32::try_from(response.len())?,
            },
            MdBuffer::terminator(),
        ];
        let mut received = 0;
        let mut fm_status = FM_OK;
        // SAFETY: the library only reads the request and writes within the
        // announced response length
        let rv = unsafe {
            (self.MD_SendReceive)(
                hsm_index,
                0,
                fm_id,
                request_buffers.as_mut_ptr(),
                SEND_RECEIVE_TIMEOUT,
                response_buffers.as_mut_ptr(),
                &raw mut received,
                &raw mut fm_status,
            )
        };
        self.check("MD_SendReceive", rv)?;
        if fm_status != FM_OK {
            return Err(FmError::Status(fm_status));
        }
        Ok(usize::try_from(received)?.min(response.len()))
    }
}

impl Drop for MdLib {
    fn drop(&mut self) {
        debug!("Finalizing Message Dispatch");
        unsafe { (self.MD_Finalize)() };
    }
}

/// Ask the Caesar module on `hsm_index` to apply `operation` to `message`.
pub fn exchange(
    md: &MdLib,
    hsm_index: u32,
    fm_id: u32,
    embedded_slot: c_ulong,
    operation: Operation,
    message: &[u8],
) -> FmResult<Vec<u8>> {
    let request = encode_request(&CaesarRequest {
        slot: u32::try_from(embedded_slot)?,
        operation,
        message: message.to_vec(),
    })?;
    let mut response = vec![0_u8; 4 + message.len()];
    let received = md.send_receive(hsm_index, u16::try_from(fm_id)?, &request, &mut response)?;
    let reply = decode_reply(&response[..received])?;
    if reply.len() != message.len() {
        warn!(
            "sent {} bytes, module replied with {}",
            message.len(),
            reply.len()
        );
    }
    Ok(reply)
}
