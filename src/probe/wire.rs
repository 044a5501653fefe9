//! UDP tracker connect handshake encoding (BEP 15).
//!
//! Request, 16 bytes big-endian:
//! `protocol_id: u64 = 0x41727101980 | action: u32 = 0 | transaction_id: u32`
//!
//! Response, at least 16 bytes:
//! `action: u32 = 0 | transaction_id: u32 | connection_id: u64`

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

use crate::config::{
    UDP_ACTION_CONNECT, UDP_ACTION_ERROR, UDP_CONNECT_REQUEST_LEN, UDP_CONNECT_RESPONSE_MIN_LEN,
    UDP_PROTOCOL_ID,
};

/// A reply that does not answer our connect request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    #[error("reply too short: {len} bytes")]
    TooShort { len: usize },

    #[error("unexpected action {0} in reply")]
    UnexpectedAction(u32),

    #[error("tracker returned error: {0}")]
    TrackerError(String),

    #[error("transaction id mismatch: sent {expected:#010x}, got {actual:#010x}")]
    TransactionMismatch { expected: u32, actual: u32 },
}

/// Connect request with its transaction id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectRequest {
    pub transaction_id: u32,
}

impl ConnectRequest {
    pub fn new(transaction_id: u32) -> Self {
        Self { transaction_id }
    }

    /// A request with a fresh random transaction id.
    pub fn random() -> Self {
        Self::new(rand::random())
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(UDP_CONNECT_REQUEST_LEN);
        buf.put_u64(UDP_PROTOCOL_ID);
        buf.put_u32(UDP_ACTION_CONNECT);
        buf.put_u32(self.transaction_id);
        buf.freeze()
    }

    /// Decodes and validates a reply to this request.
    ///
    /// Anything other than a connect reply carrying our transaction id is an error.
    pub fn check_reply(&self, reply: &[u8]) -> Result<ConnectResponse, WireError> {
        let response = ConnectResponse::decode(reply)?;
        if response.transaction_id != self.transaction_id {
            return Err(WireError::TransactionMismatch {
                expected: self.transaction_id,
                actual: response.transaction_id,
            });
        }
        Ok(response)
    }
}

/// Decoded connect reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectResponse {
    pub transaction_id: u32,
    pub connection_id: u64,
}

impl ConnectResponse {
    pub fn decode(mut reply: &[u8]) -> Result<Self, WireError> {
        // Error replies may be shorter than a connect reply: action, txid, message
        if reply.len() >= 8 && (&reply[..4]).get_u32() == UDP_ACTION_ERROR {
            let message = String::from_utf8_lossy(&reply[8..]).trim().to_string();
            return Err(WireError::TrackerError(message));
        }
        if reply.len() < UDP_CONNECT_RESPONSE_MIN_LEN {
            return Err(WireError::TooShort { len: reply.len() });
        }

        let action = reply.get_u32();
        if action != UDP_ACTION_CONNECT {
            return Err(WireError::UnexpectedAction(action));
        }
        let transaction_id = reply.get_u32();
        let connection_id = reply.get_u64();
        Ok(Self {
            transaction_id,
            connection_id,
        })
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(UDP_CONNECT_RESPONSE_MIN_LEN);
        buf.put_u32(UDP_ACTION_CONNECT);
        buf.put_u32(self.transaction_id);
        buf.put_u64(self.connection_id);
        buf.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_layout() {
        let bytes = ConnectRequest::new(0xDEADBEEF).encode();
        assert_eq!(
            bytes.as_ref(),
            &[
                0x00, 0x00, 0x04, 0x17, 0x27, 0x10, 0x19, 0x80, // protocol id
                0x00, 0x00, 0x00, 0x00, // connect
                0xDE, 0xAD, 0xBE, 0xEF, // transaction id
            ]
        );
    }

    #[test]
    fn test_random_requests_differ() {
        // 2^-32 chance of a false failure per pair; three draws make it negligible
        let ids: Vec<u32> = (0..3).map(|_| ConnectRequest::random().transaction_id).collect();
        assert!(ids[0] != ids[1] || ids[1] != ids[2]);
    }

    #[test]
    fn test_valid_reply() {
        let request = ConnectRequest::new(7);
        let mut reply = ConnectResponse {
            transaction_id: 7,
            connection_id: 0x0102030405060708,
        }
        .encode()
        .to_vec();
        reply.extend_from_slice(b"trailing");

        let response = request.check_reply(&reply).unwrap();
        assert_eq!(response.connection_id, 0x0102030405060708);
    }

    #[test]
    fn test_mismatched_transaction_id() {
        let request = ConnectRequest::new(7);
        let reply = ConnectResponse {
            transaction_id: 8,
            connection_id: 1,
        }
        .encode();
        assert_eq!(
            request.check_reply(&reply),
            Err(WireError::TransactionMismatch {
                expected: 7,
                actual: 8
            })
        );
    }

    #[test]
    fn test_short_reply() {
        let request = ConnectRequest::new(7);
        assert_eq!(
            request.check_reply(&[0, 0, 0, 0, 0, 0, 0, 7, 1, 2]),
            Err(WireError::TooShort { len: 10 })
        );
    }

    #[test]
    fn test_wrong_action() {
        let mut reply = BytesMut::new();
        reply.put_u32(1); // announce
        reply.put_u32(7);
        reply.put_u64(0);
        assert_eq!(
            ConnectRequest::new(7).check_reply(&reply),
            Err(WireError::UnexpectedAction(1))
        );
    }

    #[test]
    fn test_error_reply() {
        let mut reply = BytesMut::new();
        reply.put_u32(UDP_ACTION_ERROR);
        reply.put_u32(7);
        reply.put_slice(b"overloaded");
        assert_eq!(
            ConnectRequest::new(7).check_reply(&reply),
            Err(WireError::TrackerError("overloaded".into()))
        );
    }
}
