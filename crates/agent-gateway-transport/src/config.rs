//! Gateway configuration.

use std::{
    io::ErrorKind,
    net::{IpAddr, SocketAddr},
    path::Path,
};

use axum::http::HeaderValue;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config file: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid listen address: {0}")]
    InvalidAddress(String),
}

/// HTTP/WebSocket gateway configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Interface to listen on.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Allowed CORS origins; `"*"` allows any.
    pub cors_origins: Vec<String>,
    /// Serve the `/ws` streaming endpoint.
    pub enable_websocket: bool,
    /// Prefix for every route, e.g. `/api`.
    pub api_prefix: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["*".to_string()],
            enable_websocket: true,
            api_prefix: String::new(),
        }
    }
}

impl GatewayConfig {
    /// Load from a TOML file. A missing file gives the defaults.
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path.as_ref()) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(ConfigError::Io(e)),
        };
        Self::from_toml(&contents)
    }

    /// Parse from TOML text.
    ///
    /// # Errors
    /// Returns error if the text is not valid config TOML.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Address to bind.
    ///
    /// # Errors
    /// Returns error if `host` is not an IP address.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|_| ConfigError::InvalidAddress(self.host.clone()))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    /// Route prefix normalized to `/segment` form, or empty.
    #[must_use]
    pub fn route_prefix(&self) -> String {
        let trimmed = self.api_prefix.trim_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{trimmed}")
        }
    }

    /// CORS layer for the configured origins.
    #[must_use]
    pub fn cors_layer(&self) -> CorsLayer {
        if self.cors_origins.iter().any(|o| o == "*") {
            return CorsLayer::permissive();
        }

        let origins: Vec<HeaderValue> = self
            .cors_origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!(origin, error = %e, "ignoring invalid CORS origin");
                    None
                }
            })
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.port, 8000);
        assert!(config.enable_websocket);
        assert_eq!(config.route_prefix(), "");
        assert_eq!(
            config.socket_addr().unwrap(),
            "0.0.0.0:8000".parse().unwrap()
        );
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = GatewayConfig::from_toml(
            r#"
            port = 9090
            api_prefix = "api/"
            cors_origins = ["http://localhost:3000"]
            "#,
        )
        .unwrap();
        assert_eq!(config.port, 9090);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.route_prefix(), "/api");
        assert_eq!(config.cors_origins, vec!["http://localhost:3000"]);
    }

    #[test]
    fn test_missing_file_is_default() {
        let config = GatewayConfig::load("/definitely/not/here/gateway.toml").unwrap();
        assert_eq!(config, GatewayConfig::default());
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            GatewayConfig::from_toml("port = \"eighty\""),
            Err(ConfigError::Toml(_))
        ));

        let config = GatewayConfig {
            host: "localhost:80".to_string(),
            ..GatewayConfig::default()
        };
        assert!(matches!(
            config.socket_addr(),
            Err(ConfigError::InvalidAddress(_))
        ));
    }
}
