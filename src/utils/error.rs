use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrderChatError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("{collaborator} failed: {message}")]
    CollaboratorError {
        collaborator: String,
        message: String,
    },

    #[error("{collaborator} did not answer within {after_ms}ms")]
    Timeout { collaborator: String, after_ms: u64 },
}

impl OrderChatError {
    pub fn collaborator(collaborator: &str, message: impl Into<String>) -> Self {
        Self::CollaboratorError {
            collaborator: collaborator.to_string(),
            message: message.into(),
        }
    }

    /// Failures of an external call that may succeed when the customer retries.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ApiError(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            Self::CollaboratorError { .. } | Self::Timeout { .. } => true,
            _ => false,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => {
                format!("Configuration problem: {}", self)
            }
            Self::IoError(e) => format!("Could not read a required file: {}", e),
            Self::CsvError(e) => format!("Catalog file is malformed: {}", e),
            Self::Timeout { collaborator, .. } => {
                format!("The {} service is too slow right now, please retry", collaborator)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, OrderChatError>;

/// Why an extracted item may not enter the cart. `Display` is the reply text.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CartRejection {
    #[error("Món '{name}' hiện đang hết hàng ạ.")]
    Unavailable { name: String },

    #[error("Số lượng phải lớn hơn 0.")]
    NonPositiveQuantity { name: String },
}
