use shared_types::DocumentStreamKey;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrokerError {
    /// The broker was closed; nothing more is accepted.
    #[error("Document stream {key} is closed")]
    Closed { key: DocumentStreamKey },

    /// No broker is configured for this key.
    #[error("Unknown document stream {key}")]
    UnknownStream { key: DocumentStreamKey },

    /// An envelope was published into the broker of another key.
    #[error("Envelope for {actual} published to {expected}")]
    WrongStream {
        expected: DocumentStreamKey,
        actual: DocumentStreamKey,
    },
}

/// A producer failed to build one envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Failed to produce document: {message}")]
pub struct ProduceError {
    pub message: String,
}

impl ProduceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
