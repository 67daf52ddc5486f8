//! Connection configuration for a remote Flight SQL server.

/// Default Flight SQL port used when the request omits one.
pub const DEFAULT_PORT: u16 = 31337;

/// Everything needed to open one connection.
#[derive(Debug, Clone)]
pub struct ConnectConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub use_tls: bool,
    /// Accept any server certificate. Only consulted when `use_tls` is true.
    pub skip_tls_verify: bool,
}

impl ConnectConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            username: None,
            password: None,
            use_tls: true,
            skip_tls_verify: false,
        }
    }

    /// `host:port`, for log lines and user-facing messages.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
