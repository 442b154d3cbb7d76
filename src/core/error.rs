use thiserror::Error;

/// Error types for the model common layer
#[derive(Error, Debug)]
pub enum Error {
    #[error("Null binding: timer has no callback bound")]
    NullBinding,

    #[error("Invalid duration: {ticks} ticks is below the hardware minimum of {min}")]
    InvalidDuration {
        /// Requested timeout
        ticks: u64,
        /// Smallest timeout the hardware accepts
        min: u32,
    },

    #[error("Invalid persisted data: stored metadata does not match the running configuration")]
    InvalidPersistedData,

    #[error("Hardware timer error: {0}")]
    Hardware(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),
}

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Creates a new invalid duration error
    pub fn invalid_duration(ticks: u64, min: u32) -> Self {
        Error::InvalidDuration { ticks, min }
    }

    /// Creates a new hardware timer error
    pub fn hardware(msg: impl Into<String>) -> Self {
        Error::Hardware(msg.into())
    }

    /// Creates a new storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Error::Storage(msg.into())
    }

    /// Creates a new protocol error
    pub fn protocol(msg: impl Into<String>) -> Self {
        Error::Protocol(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = Error::protocol("short trailer");
        assert!(matches!(err, Error::Protocol(_)));
        assert_eq!(err.to_string(), "Protocol error: short trailer");

        let err = Error::invalid_duration(2, 5);
        assert_eq!(
            err.to_string(),
            "Invalid duration: 2 ticks is below the hardware minimum of 5"
        );
    }

    #[test]
    fn test_error_conversion() {
        let bin_err = bincode::deserialize::<u32>(&[0u8; 2]).unwrap_err();
        let err: Error = bin_err.into();
        assert!(matches!(err, Error::Serialization(_)));
    }
}
