//! A toy Functionality Module applying a Caesar shift to text sent by a host.
//!
//! The request and reply layouts are shared by both sides.
//! [`handle_request`] is what the module runs for each message and [`MdLib`]
//! drives the host side through the Message Dispatch library. The in-HSM
//! entry point lives behind the `fm` feature.

pub use cipher::{Operation, caesar_shift};
pub use codec::{
    BUFFER_SIZE, CaesarRequest, decode_reply, decode_request, encode_reply, encode_request,
};
pub use dispatch::handle_request;
pub use error::{FM_ERR_INVALID_LENGTH, FM_ERR_OUT_OF_MEMORY, FM_OK, FmError, FmResult};
pub use md::{MdLib, SEND_RECEIVE_TIMEOUT, exchange};

mod cipher;
mod codec;
mod dispatch;
mod error;
#[cfg(feature = "fm")]
mod fm;
mod md;

/// Name the module registers under.
pub const CAESAR_FM_NAME: &str = "Caesar";
