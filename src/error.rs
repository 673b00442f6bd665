use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a single outbound call. Always contained in the attempt that
/// produced it; nothing upstream of a worker ever sees one.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("rejected with status {status}")]
    Rejected { status: StatusCode },

    #[error("failed to encode request body: {0}")]
    Encode(#[from] sonic_rs::Error),
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("--num-bots must be > 0")]
    NoBots,

    #[error("--duration must be > 0")]
    ZeroDuration,

    #[error("--request-timeout must be > 0")]
    ZeroTimeout,

    #[error("quantity range [{min}, {max}) must be positive and non-empty")]
    QuantityRange { min: f64, max: f64 },

    #[error("cooldown range [{min}ms, {max}ms) is inverted")]
    CooldownRange { min: u64, max: u64 },
}

/// Why a bot was excluded from the stress phase.
#[derive(Debug, Error)]
pub enum SignupError {
    #[error(transparent)]
    Request(#[from] RequestError),

    #[error("signup response carried no usable credential")]
    NoCredential,
}
