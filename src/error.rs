use thiserror::Error;

/// Errors that can occur while turning a food photo into recipes
#[derive(Error, Debug)]
pub enum DishcoveryError {
    /// The uploaded bytes are not a supported raster image
    #[error("Failed to decode image: {0}")]
    Decode(String),

    /// Re-encoding the normalized image failed
    #[error("Failed to encode image: {0}")]
    Encode(String),

    /// The external model call failed, returned a non-2xx status,
    /// or answered with a body we could not read
    #[error("Model call failed: {0}")]
    ModelCall(String),

    /// Reading the image source failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Builder or provider setup error
    #[error("Builder error: {0}")]
    Builder(String),

    /// Caller supplied an argument we cannot act on
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<reqwest::Error> for DishcoveryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DishcoveryError::ModelCall(format!("request timed out: {}", err))
        } else {
            DishcoveryError::ModelCall(err.to_string())
        }
    }
}
