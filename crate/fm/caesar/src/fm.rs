//! Entry point run by the HSM when the module is loaded.
#![allow(non_camel_case_types, non_snake_case)]

use std::ffi::c_void;

use crate::{
    error::{FM_ERR_OUT_OF_MEMORY, FM_OK},
    handle_request,
};

type FmMsgHandle = *mut c_void;
type FM_RV = u32;

type DispatchFn = unsafe extern "C" fn(FmMsgHandle, *mut c_void, u32);

unsafe extern "C" {
    fn GetFMID() -> u16;
    fn FMSW_RegisterRandomDispatch(fm_id: u16, dispatch: DispatchFn) -> FM_RV;
    fn SVC_GetReplyBuffer(token: FmMsgHandle, len: u32) -> *mut c_void;
    fn SVC_SendReply(token: FmMsgHandle, status: u32);
}

unsafe extern "C" fn dispatch_message(token: FmMsgHandle, request: *mut c_void, len: u32) {
    let request: &[u8] = match usize::try_from(len) {
        // SAFETY: the runtime hands over `len` readable bytes
        Ok(len) if len > 0 && !request.is_null() => unsafe {
            std::slice::from_raw_parts(request.cast::<u8>(), len)
        },
        _ => &[],
    };
    let status = match handle_request(request) {
        Ok(reply) => send(token, &reply),
        Err(e) => e.status(),
    };
    unsafe { SVC_SendReply(token, status) };
}

fn send(token: FmMsgHandle, reply: &[u8]) -> u32 {
    let Ok(len) = u32::try_from(reply.len()) else {
        return FM_ERR_OUT_OF_MEMORY;
    };
    let buffer = unsafe { SVC_GetReplyBuffer(token, len) };
    if buffer.is_null() {
        return FM_ERR_OUT_OF_MEMORY;
    }
    // SAFETY: the reply buffer holds `len` bytes
    unsafe { std::ptr::copy_nonoverlapping(reply.as_ptr(), buffer.cast::<u8>(), reply.len()) };
    FM_OK
}

#[unsafe(no_mangle)]
pub extern "C" fn Startup() -> FM_RV {
    println!("Caesar FM loaded.");
    unsafe { FMSW_RegisterRandomDispatch(GetFMID(), dispatch_message) }
}
