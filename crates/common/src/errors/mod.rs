//! Error types for astrolit
//!
//! Provides a single error enum with:
//! - Distinct variants for configuration, upstream and parsing failures
//! - Machine-readable error codes
//! - Classification into fatal (configuration) and recoverable (upstream) errors

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Configuration errors (1xxx)
    ConfigurationError,
    CorpusHeaders,
    CorpusFormat,
    InvalidIdentifier,

    // External source errors (8xxx)
    UpstreamError,
    UpstreamStatus,
    MalformedDocument,

    // Internal errors (9xxx)
    InternalError,
    SerializationError,
    ReportError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            ErrorCode::ConfigurationError => 1001,
            ErrorCode::CorpusHeaders => 1002,
            ErrorCode::CorpusFormat => 1003,
            ErrorCode::InvalidIdentifier => 1004,

            ErrorCode::UpstreamError => 8001,
            ErrorCode::UpstreamStatus => 8002,
            ErrorCode::MalformedDocument => 8003,

            ErrorCode::InternalError => 9001,
            ErrorCode::SerializationError => 9002,
            ErrorCode::ReportError => 9003,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Corpus must have 'Title' and 'Link' headers. Found: {found:?}")]
    CorpusHeaders { found: Vec<String> },

    #[error("Corpus read error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Could not extract PMCID from URL: {url}")]
    InvalidIdentifier { url: String },

    // External source errors
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("{service} responded with status {status}")]
    UpstreamStatus { service: String, status: u16 },

    #[error("Malformed XML document: {message}")]
    Xml { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Internal errors
    #[error("Report error: {message}")]
    Report { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::CorpusHeaders { .. } => ErrorCode::CorpusHeaders,
            AppError::Csv(_) => ErrorCode::CorpusFormat,
            AppError::InvalidIdentifier { .. } => ErrorCode::InvalidIdentifier,
            AppError::HttpClient(_) => ErrorCode::UpstreamError,
            AppError::UpstreamStatus { .. } => ErrorCode::UpstreamStatus,
            AppError::Xml { .. } => ErrorCode::MalformedDocument,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::Report { .. } => ErrorCode::ReportError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Configuration errors are fatal and never retried
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            AppError::Configuration { .. }
                | AppError::CorpusHeaders { .. }
                | AppError::Csv(_)
                | AppError::InvalidIdentifier { .. }
        )
    }

    /// Failures of an external source, recovered locally as empty results
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            AppError::HttpClient(_)
                | AppError::UpstreamStatus { .. }
                | AppError::Xml { .. }
                | AppError::Serialization(_)
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration {
            message: err.to_string(),
        }
    }
}

impl From<quick_xml::Error> for AppError {
    fn from(err: quick_xml::Error) -> Self {
        AppError::Xml {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::InvalidIdentifier {
            url: "https://example.org/paper".into(),
        };
        assert_eq!(err.code(), ErrorCode::InvalidIdentifier);
        assert_eq!(err.code().as_code(), 1004);
        assert!(err.is_configuration());
        assert!(!err.is_upstream());
    }

    #[test]
    fn test_corpus_header_message() {
        let err = AppError::CorpusHeaders {
            found: vec!["Name".into(), "Url".into()],
        };
        assert!(err.to_string().contains("'Title' and 'Link'"));
        assert!(err.to_string().contains("Name"));
    }

    #[test]
    fn test_upstream_error() {
        let err = AppError::UpstreamStatus {
            service: "study_index".into(),
            status: 503,
        };
        assert_eq!(err.code(), ErrorCode::UpstreamStatus);
        assert!(err.is_upstream());
        assert!(!err.is_configuration());
    }
}
