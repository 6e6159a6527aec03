use luna_logger::trace;

use crate::{FmResult, caesar_shift, decode_request, encode_reply};

/// Handle one request sent to the module and build its reply.
///
/// # Errors
/// [`crate::FmError::InvalidLength`] when the request is malformed.
pub fn handle_request(request: &[u8]) -> FmResult<Vec<u8>> {
    let request = decode_request(request)?;
    trace!(
        "slot {}, {:?} of {} bytes",
        request.slot,
        request.operation,
        request.message.len()
    );
    encode_reply(&caesar_shift(&request.message, request.operation))
}

#[cfg(test)]
mod tests {
    use super::handle_request;
    use crate::{CaesarRequest, FmError, Operation, decode_reply, encode_request};

    fn exchange(operation: Operation, message: &[u8]) -> Vec<u8> {
        let request = encode_request(&CaesarRequest {
            slot: 0,
            operation,
            message: message.to_vec(),
        })
        .unwrap();
        decode_reply(&handle_request(&request).unwrap()).unwrap()
    }

    #[test]
    fn encrypt_then_decrypt() {
        let cipher_text = exchange(Operation::Encrypt, b"Hello World.");
        assert_eq!(cipher_text, b"KHOOR ZRUOG.");
        assert_eq!(exchange(Operation::Decrypt, &cipher_text), b"HELLO WORLD.");
    }

    #[test]
    fn malformed_requests_report_invalid_length() {
        let err = handle_request(&[0, 0, 0, 1]).unwrap_err();
        assert!(matches!(err, FmError::InvalidLength));
        assert_eq!(err.status(), crate::error::FM_ERR_INVALID_LENGTH);
    }
}
