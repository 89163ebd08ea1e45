use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Timestamp parsing error: {0}")]
    TimestampError(#[from] chrono::ParseError),

    #[cfg(feature = "postgres")]
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value for {field} ('{value}'): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Storage error: {message}")]
    StorageError { message: String },

    #[error("Checkpoint error: {message}")]
    CheckpointError { message: String },

    #[error("Source database error: {message}")]
    SourceError { message: String },

    #[error("Warehouse request failed ({status}): {message}")]
    WarehouseError { status: u16, message: String },

    #[error("Invalid trigger event: {message}")]
    EventError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Network,
    Data,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::ConfigError { .. }
            | EtlError::MissingConfigError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::TomlError(_) => ErrorCategory::Configuration,
            EtlError::ApiError(_) | EtlError::WarehouseError { .. } => ErrorCategory::Network,
            #[cfg(feature = "postgres")]
            EtlError::DatabaseError(_) => ErrorCategory::Network,
            EtlError::SourceError { .. } => ErrorCategory::Network,
            EtlError::CsvError(_)
            | EtlError::SerializationError(_)
            | EtlError::TimestampError(_)
            | EtlError::ValidationError { .. }
            | EtlError::EventError { .. } => ErrorCategory::Data,
            EtlError::IoError(_) | EtlError::StorageError { .. } | EtlError::CheckpointError { .. } => {
                ErrorCategory::System
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            // 網路錯誤通常重試即可
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Data => ErrorSeverity::High,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            EtlError::MissingConfigError { field } => {
                format!("Required setting '{}' is not configured", field)
            }
            EtlError::WarehouseError { status, .. } => {
                format!("The warehouse rejected the statement (HTTP {})", status)
            }
            EtlError::CheckpointError { .. } => {
                "Could not read or write the incremental checkpoint".to_string()
            }
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Configuration => "Check the configuration file and environment variables",
            ErrorCategory::Network => "Check connectivity and credentials, then re-run",
            ErrorCategory::Data => "Inspect the source rows or the trigger event",
            ErrorCategory::System => "Check local disk and bucket permissions",
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_follows_category() {
        let err = EtlError::WarehouseError {
            status: 503,
            message: "busy".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Network);
        assert_eq!(err.severity(), ErrorSeverity::Medium);

        let err = EtlError::MissingConfigError {
            field: "S3_BUCKET".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert!(err.user_friendly_message().contains("S3_BUCKET"));
    }
}
