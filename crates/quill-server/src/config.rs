use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};

use quill_api::password::DEFAULT_MIN_LENGTH;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub password_min_length: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let host = get("QUILL_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = get("QUILL_PORT")
            .map(|v| v.parse().with_context(|| format!("QUILL_PORT is not a port: {v}")))
            .transpose()?
            .unwrap_or(8000);
        let db_path = get("QUILL_DB_PATH").unwrap_or_else(|| "quill.db".into()).into();
        let password_min_length = get("QUILL_PASSWORD_MIN_LENGTH")
            .map(|v| {
                v.parse()
                    .with_context(|| format!("QUILL_PASSWORD_MIN_LENGTH is not a number: {v}"))
            })
            .transpose()?
            .unwrap_or(DEFAULT_MIN_LENGTH);

        Ok(Self {
            host,
            port,
            db_path,
            password_min_length,
        })
    }

    pub fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}
