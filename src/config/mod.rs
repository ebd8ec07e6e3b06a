use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub identity: IdentityConfig,
    pub catalogue: CatalogueConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    /// Empty means permissive CORS
    pub cors_origins: Vec<String>,
}

/// Which store implementation backs the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Identity provider tenant domain, e.g. `kestrel.us.auth0.com`
    pub domain: Option<String>,
    pub audience: Option<String>,
    pub algorithm: String,
    /// Static signing key; when set the provider JWKS is not fetched
    pub public_key_pem: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogueConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub api_url: String,
    pub token_url: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing configuration: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Some(v) = env::var("KESTREL_API_PORT").ok().or_else(|| env::var("PORT").ok()) {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.server.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // Storage overrides
        if let Ok(v) = env::var("STORAGE_BACKEND") {
            self.storage.backend = match v.to_ascii_lowercase().as_str() {
                "memory" | "mock" => StorageBackend::Memory,
                "postgres" | "postgresql" => StorageBackend::Postgres,
                _ => self.storage.backend,
            };
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            self.storage.database_url = Some(v);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.storage.max_connections = v.parse().unwrap_or(self.storage.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.storage.connection_timeout_secs =
                v.parse().unwrap_or(self.storage.connection_timeout_secs);
        }

        // Identity overrides
        if let Ok(v) = env::var("AUTH0_DOMAIN") {
            self.identity.domain = Some(v);
        }
        if let Ok(v) = env::var("API_AUDIENCE") {
            self.identity.audience = Some(v);
        }
        if let Ok(v) = env::var("ALGORITHMS") {
            self.identity.algorithm = v.trim().to_string();
        }
        if let Ok(v) = env::var("AUTH_PUBLIC_KEY_PEM") {
            self.identity.public_key_pem = Some(v.replace("\\n", "\n"));
        }

        // Catalogue overrides
        if let Ok(v) = env::var("IGDB_CLIENT_ID") {
            self.catalogue.client_id = Some(v);
        }
        if let Ok(v) = env::var("IGDB_ACCESS_TOKEN") {
            self.catalogue.client_secret = Some(v);
        }
        if let Ok(v) = env::var("IGDB_API_URL") {
            self.catalogue.api_url = v.trim_end_matches('/').to_string();
        }
        if let Ok(v) = env::var("IGDB_TOKEN_URL") {
            self.catalogue.token_url = v;
        }
        if let Ok(v) = env::var("IGDB_REQUEST_TIMEOUT") {
            self.catalogue.request_timeout_secs =
                v.parse().unwrap_or(self.catalogue.request_timeout_secs);
        }

        self
    }

    /// Checks that everything the selected backends need is present.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.backend == StorageBackend::Postgres && self.storage.database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }
        if self.identity.public_key_pem.is_none() && self.identity.domain.is_none() {
            return Err(ConfigError::Missing("AUTH0_DOMAIN"));
        }
        let asymmetric = ["RS", "PS", "ES"]
            .iter()
            .any(|family| self.identity.algorithm.starts_with(family))
            || self.identity.algorithm == "EdDSA";
        if !asymmetric {
            return Err(ConfigError::Invalid {
                key: "ALGORITHMS",
                value: self.identity.algorithm.clone(),
            });
        }
        Ok(())
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                port: 5000,
                cors_origins: Vec::new(),
            },
            storage: StorageConfig {
                backend: StorageBackend::Postgres,
                database_url: None,
                max_connections: 10,
                connection_timeout_secs: 30,
            },
            identity: IdentityConfig::default(),
            catalogue: CatalogueConfig {
                request_timeout_secs: 30,
                ..CatalogueConfig::default()
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                port: 5000,
                cors_origins: vec!["https://staging.kestrel.example.com".to_string()],
            },
            storage: StorageConfig {
                backend: StorageBackend::Postgres,
                database_url: None,
                max_connections: 20,
                connection_timeout_secs: 10,
            },
            identity: IdentityConfig::default(),
            catalogue: CatalogueConfig::default(),
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                port: 5000,
                cors_origins: vec!["https://kestrel.example.com".to_string()],
            },
            storage: StorageConfig {
                backend: StorageBackend::Postgres,
                database_url: None,
                max_connections: 50,
                connection_timeout_secs: 5,
            },
            identity: IdentityConfig::default(),
            catalogue: CatalogueConfig {
                request_timeout_secs: 5,
                ..CatalogueConfig::default()
            },
        }
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            domain: None,
            audience: None,
            algorithm: "RS256".to_string(),
            public_key_pem: None,
        }
    }
}

impl Default for CatalogueConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            api_url: "https://api.igdb.com/v4".to_string(),
            token_url: "https://id.twitch.tv/oauth2/token".to_string(),
            request_timeout_secs: 10,
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
