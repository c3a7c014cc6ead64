use std::path::PathBuf;

use anyhow::{Result, bail};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryBackend {
    Sqlite,
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub directory: DirectoryBackend,
    /// When set, fan-out goes through this connection-management endpoint
    /// instead of the sockets held by this process.
    pub push_endpoint: Option<String>,
    /// Mount `/events` and `/@connections/{id}` on the public listener.
    pub expose_management: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let jwt_secret = get("RELAY_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("RELAY_JWT_SECRET is unset or still a placeholder; it must match the user service's signing key");
        }

        let port = match get("RELAY_PORT") {
            Some(p) => p.parse()?,
            None => 3000,
        };

        let directory = match get("RELAY_DIRECTORY").as_deref() {
            None | Some("sqlite") => DirectoryBackend::Sqlite,
            Some("memory") => DirectoryBackend::Memory,
            Some(other) => bail!("RELAY_DIRECTORY must be 'sqlite' or 'memory', got '{}'", other),
        };

        let expose_management = matches!(
            get("RELAY_EXPOSE_MANAGEMENT").as_deref(),
            Some("1" | "true" | "yes")
        );

        Ok(Self {
            host: get("RELAY_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            db_path: get("RELAY_DB_PATH")
                .unwrap_or_else(|| "support-relay.db".into())
                .into(),
            jwt_secret,
            directory,
            push_endpoint: get("RELAY_PUSH_ENDPOINT").filter(|s| !s.is_empty()),
            expose_management,
        })
    }
}
