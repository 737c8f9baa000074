//! Configuration types for the product image service

use crate::error::{ImagingError, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Default per-file upload limit (10 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Default number of images accepted by one batch request
pub const DEFAULT_MAX_BATCH_IMAGES: usize = 10;

/// Local command-line removal tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalProviderConfig {
    /// Executable, resolved through `PATH` unless absolute
    pub program: String,

    /// Arguments; `{input}` and `{output}` are replaced with the temp file paths
    pub args: Vec<String>,

    /// Wall-clock cutoff for one invocation
    pub timeout: Duration,

    /// Directory for the intermediate files (`None` = uploads directory)
    pub work_dir: Option<PathBuf>,
}

impl Default for LocalProviderConfig {
    fn default() -> Self {
        Self {
            program: "rembg".to_string(),
            args: vec!["i".to_string(), "{input}".to_string(), "{output}".to_string()],
            timeout: Duration::from_secs(30),
            work_dir: None,
        }
    }
}

/// Azure Computer Vision segmentation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AzureConfig {
    /// Resource endpoint, e.g. `https://<name>.cognitiveservices.azure.com`
    pub endpoint: Option<String>,

    /// Subscription key sent as `Ocp-Apim-Subscription-Key`
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    pub api_version: String,

    pub request_timeout: Duration,
}

impl Default for AzureConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            api_version: "2023-02-01-preview".to_string(),
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl AzureConfig {
    /// Whether both endpoint and key are present
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.endpoint.as_deref().is_some_and(|e| !e.trim().is_empty())
            && self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

/// PhotoRoom image editing API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoRoomConfig {
    pub endpoint: String,

    #[serde(skip_serializing)]
    pub sandbox_api_key: Option<String>,

    #[serde(skip_serializing)]
    pub production_api_key: Option<String>,

    /// Value of the `pr-background-removal-model-version` header
    pub model_version: String,

    pub request_timeout: Duration,
}

impl Default for PhotoRoomConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://image-api.photoroom.com/v2/edit".to_string(),
            sandbox_api_key: None,
            production_api_key: None,
            model_version: "2024-09-26".to_string(),
            request_timeout: Duration::from_secs(60),
        }
    }
}

/// Configuration for the HTTP service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,

    pub port: u16,

    /// Directory holding raw uploads (`/uploads/...`)
    pub uploads_dir: PathBuf,

    /// Directory holding processed artifacts (`/processed/...`)
    pub processed_dir: PathBuf,

    /// Per-file upload limit in bytes
    pub max_upload_bytes: usize,

    /// Maximum number of images in one batch request
    pub max_batch_images: usize,

    pub local: LocalProviderConfig,

    pub azure: AzureConfig,

    pub photoroom: PhotoRoomConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            uploads_dir: PathBuf::from("uploads"),
            processed_dir: PathBuf::from("processed"),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            max_batch_images: DEFAULT_MAX_BATCH_IMAGES,
            local: LocalProviderConfig::default(),
            azure: AzureConfig::default(),
            photoroom: PhotoRoomConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Create a new configuration builder
    ///
    /// # Examples
    /// ```rust
    /// use product_studio::ServerConfig;
    /// use std::time::Duration;
    ///
    /// let config = ServerConfig::builder()
    ///     .port(8080)
    ///     .local_timeout(Duration::from_secs(10))
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.port, 8080);
    /// ```
    #[must_use]
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// Validate all configuration parameters
    ///
    /// # Errors
    /// - Port 0, zero upload limit or zero batch size
    /// - Empty local program or zero local timeout
    /// - Local arguments that never reference `{input}`
    /// - Cloud endpoints that are not http(s) URLs
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(ImagingError::invalid_config("port must be non-zero"));
        }
        if self.max_upload_bytes == 0 {
            return Err(ImagingError::invalid_config(
                "max_upload_bytes must be greater than zero",
            ));
        }
        if self.max_batch_images == 0 {
            return Err(ImagingError::invalid_config(
                "max_batch_images must be greater than zero",
            ));
        }
        if self.local.program.trim().is_empty() {
            return Err(ImagingError::invalid_config(
                "local provider program must not be empty",
            ));
        }
        if self.local.timeout.is_zero() {
            return Err(ImagingError::invalid_config(
                "local provider timeout must be greater than zero",
            ));
        }
        if !self.local.args.iter().any(|arg| arg.contains("{input}")) {
            return Err(ImagingError::invalid_config(
                "local provider arguments must reference {input}",
            ));
        }
        if let Some(endpoint) = &self.azure.endpoint {
            validate_url("Azure endpoint", endpoint)?;
        }
        validate_url("PhotoRoom endpoint", &self.photoroom.endpoint)?;

        Ok(())
    }

    /// Address to bind
    ///
    /// # Errors
    /// - Host and port do not form a valid socket address
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| {
                ImagingError::invalid_config(format!(
                    "Invalid bind address '{}:{}': {}",
                    self.host, self.port, e
                ))
            })
    }

    /// Directory for the local provider's intermediate files
    #[must_use]
    pub fn local_work_dir(&self) -> PathBuf {
        self.local
            .work_dir
            .clone()
            .unwrap_or_else(|| self.uploads_dir.clone())
    }

    /// Request body limit for the HTTP layer, sized for a full batch plus form overhead
    #[must_use]
    pub fn body_limit(&self) -> usize {
        self.max_upload_bytes
            .saturating_mul(self.max_batch_images.max(2))
            .saturating_add(1024 * 1024)
    }
}

fn validate_url(name: &str, url: &str) -> Result<()> {
    let url = url.trim();
    if url.starts_with("https://") || url.starts_with("http://") {
        Ok(())
    } else {
        Err(ImagingError::invalid_config(format!(
            "{name} must be an http(s) URL, got '{url}'"
        )))
    }
}

/// Builder for `ServerConfig`
#[derive(Debug, Default)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    #[must_use]
    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.config.host = host.into();
        self
    }

    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    #[must_use]
    pub fn uploads_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.config.uploads_dir = dir.into();
        self
    }

    #[must_use]
    pub fn processed_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.config.processed_dir = dir.into();
        self
    }

    /// Set the per-file upload limit (at least 1 byte)
    #[must_use]
    pub fn max_upload_bytes(mut self, bytes: usize) -> Self {
        self.config.max_upload_bytes = bytes.max(1);
        self
    }

    /// Set the batch image limit (at least 1)
    #[must_use]
    pub fn max_batch_images(mut self, images: usize) -> Self {
        self.config.max_batch_images = images.max(1);
        self
    }

    /// Set the local removal program
    #[must_use]
    pub fn local_program<S: Into<String>>(mut self, program: S) -> Self {
        self.config.local.program = program.into();
        self
    }

    /// Set the local removal arguments (`{input}` / `{output}` placeholders)
    #[must_use]
    pub fn local_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.local.args = args.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn local_timeout(mut self, timeout: Duration) -> Self {
        self.config.local.timeout = timeout;
        self
    }

    #[must_use]
    pub fn local_work_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.config.local.work_dir = Some(dir.into());
        self
    }

    /// Set Azure endpoint and key; blank values count as unset
    #[must_use]
    pub fn azure(mut self, endpoint: Option<String>, api_key: Option<String>) -> Self {
        self.config.azure.endpoint = non_blank(endpoint).map(|e| e.trim_end_matches('/').to_string());
        self.config.azure.api_key = non_blank(api_key);
        self
    }

    #[must_use]
    pub fn azure_api_version<S: Into<String>>(mut self, version: S) -> Self {
        self.config.azure.api_version = version.into();
        self
    }

    #[must_use]
    pub fn photoroom_endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.config.photoroom.endpoint = endpoint.into();
        self
    }

    /// Set the PhotoRoom keys; blank values count as unset
    #[must_use]
    pub fn photoroom_keys(mut self, sandbox: Option<String>, production: Option<String>) -> Self {
        self.config.photoroom.sandbox_api_key = non_blank(sandbox);
        self.config.photoroom.production_api_key = non_blank(production);
        self
    }

    #[must_use]
    pub fn photoroom_model_version<S: Into<String>>(mut self, version: S) -> Self {
        self.config.photoroom.model_version = version.into();
        self
    }

    /// Request timeout for both cloud providers
    #[must_use]
    pub fn cloud_timeout(mut self, timeout: Duration) -> Self {
        self.config.azure.request_timeout = timeout;
        self.config.photoroom.request_timeout = timeout;
        self
    }

    /// Build and validate the configuration
    ///
    /// # Errors
    /// - Any rule checked by [`ServerConfig::validate`]
    pub fn build(self) -> Result<ServerConfig> {
        let config = self.config;
        config.validate()?;
        Ok(config)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.max_batch_images, 10);
        assert_eq!(config.local.program, "rembg");
        assert_eq!(config.local.args, vec!["i", "{input}", "{output}"]);
        assert_eq!(config.local.timeout, Duration::from_secs(30));
        assert_eq!(config.photoroom.model_version, "2024-09-26");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = ServerConfig::builder()
            .port(8080)
            .max_batch_images(0)
            .local_program("/usr/local/bin/rembg")
            .azure(
                Some("https://vision.example.com/".to_string()),
                Some("key".to_string()),
            )
            .photoroom_keys(Some("  ".to_string()), Some("prod".to_string()))
            .build()
            .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.max_batch_images, 1);
        assert_eq!(config.local.program, "/usr/local/bin/rembg");
        assert_eq!(
            config.azure.endpoint.as_deref(),
            Some("https://vision.example.com")
        );
        assert!(config.azure.is_configured());
        assert_eq!(config.photoroom.sandbox_api_key, None);
        assert_eq!(config.photoroom.production_api_key.as_deref(), Some("prod"));
    }

    #[test]
    fn test_config_validation() {
        let mut config = ServerConfig::default();
        config.local.timeout = Duration::ZERO;
        assert!(matches!(
            config.validate(),
            Err(ImagingError::InvalidConfig(_))
        ));

        let mut config = ServerConfig::default();
        config.local.args = vec!["--help".to_string()];
        assert!(config.validate().is_err());

        let mut config = ServerConfig::default();
        config.azure.endpoint = Some("ftp://vision".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_azure_not_configured_by_default() {
        assert!(!AzureConfig::default().is_configured());
    }

    #[test]
    fn test_local_work_dir_falls_back_to_uploads() {
        let config = ServerConfig::builder().uploads_dir("/tmp/up").build().unwrap();
        assert_eq!(config.local_work_dir(), PathBuf::from("/tmp/up"));

        let config = ServerConfig::builder()
            .local_work_dir("/tmp/work")
            .build()
            .unwrap();
        assert_eq!(config.local_work_dir(), PathBuf::from("/tmp/work"));
    }

    #[test]
    fn test_socket_addr() {
        let config = ServerConfig::builder().host("127.0.0.1").port(4000).build().unwrap();
        assert_eq!(config.socket_addr().unwrap().port(), 4000);

        let config = ServerConfig::builder().host("not a host").build().unwrap();
        assert!(config.socket_addr().is_err());
    }

    #[test]
    fn test_secrets_not_serialized() {
        let config = ServerConfig::builder()
            .azure(Some("https://a.example.com".to_string()), Some("secret".to_string()))
            .build()
            .unwrap();
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
    }
}
