//! Session error type

use std::io;

use thiserror::Error;

use dropwire_common::link::LinkError;

use crate::channel::ChannelError;
use crate::chunk::SizeMismatch;
use crate::crypto::CryptoError;
use crate::negotiation::NegotiationError;

/// Everything that can end a transfer session early
#[derive(Debug, Error)]
pub enum SessionError {
    /// The relay rejected a request or went away before the channel opened
    #[error("relay error: {0}")]
    Room(String),

    #[error("negotiation failed: {0}")]
    Negotiation(#[from] NegotiationError),

    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error(transparent)]
    SizeMismatch(#[from] SizeMismatch),

    #[error("encryption failed")]
    Encryption,

    #[error("decryption failed (wrong key or corrupted data)")]
    Decryption,

    #[error("invalid link: {0}")]
    InvalidLink(#[from] LinkError),

    /// Local or remote cancel
    #[error("transfer cancelled")]
    UserCancelled,

    #[error("invalid state transition: {from} -> {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl SessionError {
    /// Whether this error is a cancellation rather than a failure
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::UserCancelled)
    }
}

impl From<CryptoError> for SessionError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::EncryptionFailed => Self::Encryption,
            CryptoError::DecryptionFailed => Self::Decryption,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_cancellation() {
        assert!(SessionError::UserCancelled.is_cancellation());
        assert!(!SessionError::Decryption.is_cancellation());
        assert!(!SessionError::Room("gone".to_string()).is_cancellation());
    }

    #[test]
    fn test_crypto_error_mapping() {
        assert!(matches!(
            SessionError::from(CryptoError::DecryptionFailed),
            SessionError::Decryption
        ));
        assert!(matches!(
            SessionError::from(CryptoError::EncryptionFailed),
            SessionError::Encryption
        ));
    }

    #[test]
    fn test_size_mismatch_message() {
        let err = SessionError::from(SizeMismatch {
            expected: 10,
            actual: 4,
        });
        assert_eq!(
            err.to_string(),
            "size mismatch: expected 10 bytes, received 4"
        );
    }
}
