//! Server configuration from environment variables.

use anyhow::{Context, Result};

const DEFAULT_PORT: u16 = 4084;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP listen port. The only externally configurable value.
    pub port: u16,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| DEFAULT_PORT.to_string())
                .parse()
                .context("Invalid PORT")?,
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Serialize env-mutating tests to avoid races.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn from_env_default_port() {
        let _lock = ENV_LOCK.lock().unwrap();
        unsafe { std::env::remove_var("PORT") };

        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.port, 4084);
        assert_eq!(config.listen_addr(), "0.0.0.0:4084");
    }

    #[test]
    fn from_env_explicit_port() {
        let _lock = ENV_LOCK.lock().unwrap();
        unsafe { std::env::set_var("PORT", "8123") };

        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.port, 8123);

        unsafe { std::env::remove_var("PORT") };
    }

    #[test]
    fn from_env_invalid_port() {
        let _lock = ENV_LOCK.lock().unwrap();
        unsafe { std::env::set_var("PORT", "not-a-number") };

        assert!(ServerConfig::from_env().is_err());

        unsafe { std::env::remove_var("PORT") };
    }
}
