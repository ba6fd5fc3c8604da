//! Service configuration.
//!
//! Loaded once at startup and handed to components at construction. Nothing
//! below the binary reads the environment.

use std::path::{Path, PathBuf};

use chrono::Duration;
use passport_auth::{Algorithm, SigningKey, TokenSigner, TokenVerifier};
use serde::{Deserialize, Serialize};

use crate::error::{PassportError, Result};

/// Environment variable consulted when the config file carries no secret.
pub const SECRET_ENV: &str = "PASSPORT_TOKEN_SECRET";

/// Longest lifetime accepted for issued tokens.
pub const MAX_TTL_SECS: u64 = 366 * 24 * 60 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassportConfig {
    /// Max log level for the fmt subscriber
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Storage backend
    pub store: StoreConfig,

    /// Token signing and verification
    pub token: TokenConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,

    /// Database file, used by the sqlite backend
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    #[serde(default)]
    pub algorithm: Algorithm,

    /// Lifetime of tokens issued by sponsor login
    pub ttl_secs: u64,

    /// HMAC secret, or hex Ed25519 seed. Falls back to `PASSPORT_TOKEN_SECRET`
    /// when the file leaves it out; never written back.
    #[serde(default, skip_serializing)]
    pub secret: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_store_path() -> PathBuf {
    PathBuf::from("passport.db")
}

impl Default for PassportConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            store: StoreConfig {
                backend: StoreBackend::Sqlite,
                path: default_store_path(),
            },
            token: TokenConfig {
                algorithm: Algorithm::Hs256,
                ttl_secs: 12 * 60 * 60,
                secret: None,
            },
        }
    }
}

impl PassportConfig {
    /// Parse configuration from TOML text. Does not consult the environment.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| PassportError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| PassportError::Config(format!("{}: {e}", path.display())))?;
        let mut config = Self::from_toml_str(&contents)?;

        // Load the secret from the environment if not set
        if config.token.secret.is_none() {
            config.token.secret = std::env::var(SECRET_ENV).ok();
        }

        Ok(config)
    }

    /// Save configuration to a TOML file. The secret is never written.
    pub fn to_file(&self, path: &Path) -> Result<()> {
        let contents =
            toml::to_string_pretty(self).map_err(|e| PassportError::Config(e.to_string()))?;
        std::fs::write(path, contents)
            .map_err(|e| PassportError::Config(format!("{}: {e}", path.display())))?;
        Ok(())
    }

    /// `host:port` to listen on.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Token verifier, signer and lifetime derived from one key.
#[derive(Debug, Clone)]
pub struct TokenKeys {
    pub verifier: TokenVerifier,
    pub signer: TokenSigner,
    pub ttl: Duration,
}

impl TokenKeys {
    pub fn new(key: SigningKey, ttl: Duration) -> Self {
        Self {
            verifier: TokenVerifier::new(key.verifier_key()),
            signer: TokenSigner::new(key),
            ttl,
        }
    }
}

impl TokenConfig {
    /// Build the key set. A missing or empty secret is an error.
    pub fn build_keys(&self) -> Result<TokenKeys> {
        let secret = self
            .secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                PassportError::Config(format!("token secret missing; set {SECRET_ENV}"))
            })?;

        let key = match self.algorithm {
            Algorithm::Hs256 => SigningKey::hs256(secret.as_bytes().to_vec()),
            Algorithm::Ed25519 => SigningKey::ed25519_from_hex(secret)
                .map_err(|e| PassportError::Config(e.to_string()))?,
        };

        if self.ttl_secs == 0 || self.ttl_secs > MAX_TTL_SECS {
            return Err(PassportError::Config(format!(
                "ttl_secs must be between 1 and {MAX_TTL_SECS}, got {}",
                self.ttl_secs
            )));
        }
        let ttl = i64::try_from(self.ttl_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .ok_or_else(|| PassportError::Config(format!("ttl_secs out of range: {}", self.ttl_secs)))?;

        Ok(TokenKeys::new(key, ttl))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use passport_core::SponsorId;

    const SAMPLE: &str = r#"
        log_level = "debug"

        [server]
        host = "0.0.0.0"
        port = 9000

        [store]
        backend = "memory"

        [token]
        algorithm = "ed25519"
        ttl_secs = 3600
    "#;

    #[test]
    fn test_parse_sample() {
        let config = PassportConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.bind_address(), "0.0.0.0:9000");
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.store.path, PathBuf::from("passport.db"));
        assert_eq!(config.token.algorithm, Algorithm::Ed25519);
        assert_eq!(config.token.secret, None);
    }

    #[test]
    fn test_secret_never_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("passport.toml");

        let mut config = PassportConfig::default();
        config.token.secret = Some("hunter2".into());
        config.to_file(&path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(!written.contains("hunter2"));

        let reloaded = PassportConfig::from_toml_str(&written).unwrap();
        assert_eq!(reloaded.token.ttl_secs, config.token.ttl_secs);
        assert_eq!(reloaded.store.backend, StoreBackend::Sqlite);
    }

    #[test]
    fn test_secret_read_from_file() {
        let config = PassportConfig::from_toml_str(&format!(
            "{SAMPLE}\nsecret = \"{}\"\n",
            "07".repeat(32)
        ))
        .unwrap();
        assert_eq!(config.token.secret, Some("07".repeat(32)));
        assert!(config.token.build_keys().is_ok());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("passport.toml");
        std::fs::write(
            &path,
            r#"
                [server]
                host = "127.0.0.1"
                port = 8080

                [store]
                backend = "memory"

                [token]
                ttl_secs = 60
                secret = "from-file"
            "#,
        )
        .unwrap();
        let loaded = PassportConfig::from_file(&path).unwrap();
        assert_eq!(loaded.token.secret.as_deref(), Some("from-file"));
    }

    #[test]
    fn test_ttl_out_of_range() {
        let mut token = PassportConfig::default().token;
        token.secret = Some("booth-secret".into());

        for ttl_secs in [0, MAX_TTL_SECS + 1, 9_000_000_000_000, u64::MAX] {
            token.ttl_secs = ttl_secs;
            assert!(
                matches!(token.build_keys(), Err(PassportError::Config(_))),
                "{ttl_secs}"
            );
        }

        token.ttl_secs = MAX_TTL_SECS;
        let keys = token.build_keys().unwrap();
        assert!(keys
            .signer
            .issue(SponsorId::new("5").unwrap(), Utc::now(), keys.ttl)
            .is_ok());
    }

    #[test]
    fn test_build_keys_requires_secret() {
        let config = PassportConfig::default();
        assert!(matches!(
            config.token.build_keys(),
            Err(PassportError::Config(_))
        ));
    }

    #[test]
    fn test_build_hs256_keys() {
        let mut token = PassportConfig::default().token;
        token.secret = Some("booth-secret".into());
        let keys = token.build_keys().unwrap();
        assert_eq!(keys.ttl, Duration::hours(12));

        let now = Utc::now();
        let issued = keys
            .signer
            .issue(SponsorId::new("5").unwrap(), now, keys.ttl)
            .unwrap();
        let claims = keys.verifier.verify(&issued.token, now).unwrap();
        assert_eq!(claims.sponsor_id.as_str(), "5");
    }

    #[test]
    fn test_build_ed25519_keys_from_hex_seed() {
        let mut token = PassportConfig::from_toml_str(SAMPLE).unwrap().token;
        token.secret = Some("07".repeat(32));
        let keys = token.build_keys().unwrap();
        assert_eq!(keys.signer.algorithm(), Algorithm::Ed25519);

        token.secret = Some("not-hex".into());
        assert!(matches!(token.build_keys(), Err(PassportError::Config(_))));
    }
}
