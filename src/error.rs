//! Error types for product image operations

use std::time::Duration;
use thiserror::Error;

/// Result type alias for product image operations
pub type Result<T> = std::result::Result<T, ImagingError>;

/// Error taxonomy shared by the transform gateway, the removal providers and the batch pipeline
#[derive(Error, Debug)]
pub enum ImagingError {
    /// A required upload field was absent from the request
    #[error("Missing input: no file uploaded in field '{field}'")]
    MissingInput { field: String },

    /// Operation parameters were missing, non-numeric or out of range
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// The batch request could not be accepted (no images, bad operations list)
    #[error("Invalid batch request: {0}")]
    InvalidBatchRequest(String),

    /// An uploaded file exceeded the configured size limit
    #[error("File '{file_name}' exceeds the maximum upload size of {limit} bytes")]
    PayloadTooLarge { file_name: String, limit: usize },

    /// The underlying image library failed to decode, transform or encode
    #[error("Image transform failed: {0}")]
    TransformFailure(String),

    /// The external removal process did not finish before the cutoff
    #[error("Provider '{provider}' timed out after {}ms", .timeout.as_millis())]
    ProviderTimeout { provider: String, timeout: Duration },

    /// The external removal process could not be started or exited unsuccessfully
    #[error("Provider '{provider}' failed{}: {stderr}", .exit_code.map(|c| format!(" with exit code {c}")).unwrap_or_default())]
    ProviderExecutionError {
        provider: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    /// A cloud provider answered with a non-success status or an unexpected payload
    #[error("Provider '{provider}' responded with status {status}: {body}")]
    ProviderResponseError {
        provider: String,
        status: u16,
        body: String,
    },

    /// The external tool reported success but produced no output file
    #[error("Provider output missing: expected '{path}'")]
    OutputMissing { path: String },

    /// A cloud provider was selected without credentials configured
    #[error("Provider '{0}' is not configured")]
    ProviderNotConfigured(String),

    /// Service configuration is inconsistent or incomplete
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Input/output errors while persisting artifacts
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<image::ImageError> for ImagingError {
    fn from(err: image::ImageError) -> Self {
        Self::TransformFailure(err.to_string())
    }
}

impl ImagingError {
    /// Create a new missing input error for the given form field
    pub fn missing_input<S: Into<String>>(field: S) -> Self {
        Self::MissingInput {
            field: field.into(),
        }
    }

    /// Create a new invalid parameters error
    pub fn invalid_parameters<S: Into<String>>(msg: S) -> Self {
        Self::InvalidParameters(msg.into())
    }

    /// Create a new invalid batch request error
    pub fn invalid_batch<S: Into<String>>(msg: S) -> Self {
        Self::InvalidBatchRequest(msg.into())
    }

    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new transform failure
    pub fn transform<S: Into<String>>(msg: S) -> Self {
        Self::TransformFailure(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Create a provider response error carrying the upstream status and body
    pub fn provider_response<P: Into<String>, B: Into<String>>(
        provider: P,
        status: u16,
        body: B,
    ) -> Self {
        Self::ProviderResponseError {
            provider: provider.into(),
            status,
            body: body.into(),
        }
    }

    /// Create parameter error with the accepted range, mirroring config validation messages
    pub fn parameter_range_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
    ) -> Self {
        Self::InvalidParameters(format!(
            "Invalid {}: {} (valid range: {})",
            parameter, value, valid_range
        ))
    }

    /// Whether this error was detected before any external call was made
    ///
    /// Client errors are answered with a 4xx status and never leave files behind.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::MissingInput { .. }
                | Self::InvalidParameters(_)
                | Self::InvalidBatchRequest(_)
                | Self::PayloadTooLarge { .. }
        )
    }

    /// HTTP status code this error maps to at the API boundary
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MissingInput { .. }
            | Self::InvalidParameters(_)
            | Self::InvalidBatchRequest(_) => 400,
            Self::PayloadTooLarge { .. } => 413,
            Self::ProviderNotConfigured(_) => 503,
            Self::TransformFailure(_)
            | Self::ProviderTimeout { .. }
            | Self::ProviderExecutionError { .. }
            | Self::ProviderResponseError { .. }
            | Self::OutputMissing { .. }
            | Self::InvalidConfig(_)
            | Self::Io(_)
            | Self::Internal(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = ImagingError::invalid_parameters("width must be numeric");
        assert!(matches!(err, ImagingError::InvalidParameters(_)));

        let err = ImagingError::missing_input("image");
        assert!(matches!(err, ImagingError::MissingInput { .. }));
    }

    #[test]
    fn test_error_display() {
        let err = ImagingError::missing_input("image");
        assert_eq!(
            err.to_string(),
            "Missing input: no file uploaded in field 'image'"
        );

        let err = ImagingError::ProviderTimeout {
            provider: "local".to_string(),
            timeout: Duration::from_secs(30),
        };
        assert_eq!(err.to_string(), "Provider 'local' timed out after 30000ms");

        let err = ImagingError::ProviderExecutionError {
            provider: "local".to_string(),
            exit_code: Some(2),
            stderr: "boom".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Provider 'local' failed with exit code 2: boom"
        );

        let err = ImagingError::ProviderExecutionError {
            provider: "local".to_string(),
            exit_code: None,
            stderr: "not found".to_string(),
        };
        assert_eq!(err.to_string(), "Provider 'local' failed: not found");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(ImagingError::missing_input("image").status_code(), 400);
        assert_eq!(ImagingError::invalid_batch("empty").status_code(), 400);
        assert_eq!(
            ImagingError::PayloadTooLarge {
                file_name: "a.png".to_string(),
                limit: 10
            }
            .status_code(),
            413
        );
        assert_eq!(ImagingError::transform("decode").status_code(), 500);
        assert_eq!(
            ImagingError::provider_response("azure", 401, "denied").status_code(),
            500
        );
        assert_eq!(
            ImagingError::ProviderNotConfigured("azure".to_string()).status_code(),
            503
        );
    }

    #[test]
    fn test_client_error_classification() {
        assert!(ImagingError::invalid_parameters("x").is_client_error());
        assert!(!ImagingError::OutputMissing {
            path: "out.png".to_string()
        }
        .is_client_error());
    }

    #[test]
    fn test_parameter_range_error() {
        let err = ImagingError::parameter_range_error("quality", 150, "0-100");
        let message = err.to_string();
        assert!(message.contains("quality"));
        assert!(message.contains("150"));
        assert!(message.contains("0-100"));
    }

    #[test]
    fn test_image_error_becomes_transform_failure() {
        let image_err = image::load_from_memory(b"not an image").unwrap_err();
        let err: ImagingError = image_err.into();
        assert!(matches!(err, ImagingError::TransformFailure(_)));
    }
}
