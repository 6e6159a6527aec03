//! Wire layout of the messages exchanged with the module.
//!
//! Request: big-endian `u32` embedded slot, `u32` operation, `u32` length,
//! then the message. Reply: big-endian `u32` length, then the message.

use crate::{FmError, FmResult, Operation};

/// Largest message the module accepts.
pub const BUFFER_SIZE: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaesarRequest {
    pub slot: u32,
    pub operation: Operation,
    pub message: Vec<u8>,
}

fn read_u32(input: &mut &[u8]) -> FmResult<u32> {
    let (head, rest) = input
        .split_first_chunk::<4>()
        .ok_or(FmError::InvalidLength)?;
    *input = rest;
    Ok(u32::from_be_bytes(*head))
}

fn length_prefix(message: &[u8]) -> FmResult<[u8; 4]> {
    Ok(u32::try_from(message.len())?.to_be_bytes())
}

pub fn encode_request(request: &CaesarRequest) -> FmResult<Vec<u8>> {
    let mut out = Vec::with_capacity(12 + request.message.len());
    out.extend_from_slice(&request.slot.to_be_bytes());
    out.extend_from_slice(&request.operation.to_wire().to_be_bytes());
    out.extend_from_slice(&length_prefix(&request.message)?);
    out.extend_from_slice(&request.message);
    Ok(out)
}

/// Parse a request as the module receives it.
///
/// The announced length must match the remaining bytes exactly and fit in
/// [`BUFFER_SIZE`].
pub fn decode_request(mut input: &[u8]) -> FmResult<CaesarRequest> {
    let slot = read_u32(&mut input)?;
    let operation = Operation::from_wire(read_u32(&mut input)?);
    let len = usize::try_from(read_u32(&mut input)?)?;
    if len > BUFFER_SIZE || input.len() != len {
        return Err(FmError::InvalidLength);
    }
    Ok(CaesarRequest {
        slot,
        operation,
        message: input.to_vec(),
    })
}

pub fn encode_reply(message: &[u8]) -> FmResult<Vec<u8>> {
    let mut out = Vec::with_capacity(4 + message.len());
    out.extend_from_slice(&length_prefix(message)?);
    out.extend_from_slice(message);
    Ok(out)
}

/// Extract the message from a reply. Trailing bytes past the announced
/// length are ignored.
pub fn decode_reply(mut input: &[u8]) -> FmResult<Vec<u8>> {
    let len = usize::try_from(read_u32(&mut input)?)?;
    input
        .get(..len)
        .map(<[u8]>::to_vec)
        .ok_or(FmError::InvalidLength)
}
