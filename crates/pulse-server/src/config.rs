use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use uuid::Uuid;

/// Placeholder secrets that must never reach a running server.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub addr: SocketAddr,
    /// Admin account to provision at startup, if any.
    pub bootstrap_admin: Option<Uuid>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let jwt_secret = var("PULSE_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("PULSE_JWT_SECRET is unset or still a placeholder");
        }

        let db_path = var("PULSE_DB_PATH").unwrap_or_else(|| "pulse.db".into()).into();
        let host = var("PULSE_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = var("PULSE_PORT")
            .unwrap_or_else(|| "3000".into())
            .parse()
            .context("PULSE_PORT is not a valid port")?;
        let addr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid bind address {}:{}", host, port))?;

        let bootstrap_admin = var("PULSE_BOOTSTRAP_ADMIN")
            .filter(|v| !v.is_empty())
            .map(|v| v.parse::<Uuid>())
            .transpose()
            .context("PULSE_BOOTSTRAP_ADMIN is not a UUID")?;

        Ok(Self {
            jwt_secret,
            db_path,
            addr,
            bootstrap_admin,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(pairs: &[(&str, &str)]) -> Result<ServerConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_only_secret_is_set() {
        let cfg = config(&[("PULSE_JWT_SECRET", "s3cr3t-value")]).unwrap();
        assert_eq!(cfg.db_path, PathBuf::from("pulse.db"));
        assert_eq!(cfg.addr, "0.0.0.0:3000".parse().unwrap());
        assert!(cfg.bootstrap_admin.is_none());
    }

    #[test]
    fn placeholder_secret_is_refused() {
        assert!(config(&[]).is_err());
        assert!(config(&[("PULSE_JWT_SECRET", "dev-secret-change-me")]).is_err());
    }

    #[test]
    fn bootstrap_admin_must_be_uuid() {
        let id = Uuid::new_v4();
        let cfg = config(&[
            ("PULSE_JWT_SECRET", "s3cr3t-value"),
            ("PULSE_BOOTSTRAP_ADMIN", &id.to_string()),
            ("PULSE_PORT", "8080"),
        ])
        .unwrap();
        assert_eq!(cfg.bootstrap_admin, Some(id));
        assert_eq!(cfg.addr.port(), 8080);

        assert!(config(&[("PULSE_JWT_SECRET", "s3cr3t-value"), ("PULSE_BOOTSTRAP_ADMIN", "root")]).is_err());
        assert!(config(&[("PULSE_JWT_SECRET", "s3cr3t-value"), ("PULSE_PORT", "http")]).is_err());
    }
}
