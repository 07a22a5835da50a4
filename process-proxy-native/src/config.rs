//! Boot-time configuration read from the environment (§6).

use crate::error::NativeError;

/// Name of the environment variable carrying the TCP port to dial.
pub const PORT_VAR: &str = "PROCESS_PROXY_PORT";

/// Name of the environment variable carrying the handshake token, if any.
pub const TOKEN_VAR: &str = "PROCESS_PROXY_TOKEN";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub token: Vec<u8>,
}

impl Config {
    /// Reads [`PORT_VAR`] and [`TOKEN_VAR`]. A missing or unparsable port is
    /// a boot error; a missing token is not — it means an all-zero token
    /// field (§4.3 step 3).
    pub fn from_env() -> Result<Config, NativeError> {
        let raw_port =
            std::env::var(PORT_VAR).map_err(|_| NativeError::MissingPort(PORT_VAR))?;

        let port: u16 = raw_port
            .trim()
            .parse()
            .ok()
            .filter(|&p: &u16| p >= 1)
            .ok_or_else(|| NativeError::InvalidPort {
                var: PORT_VAR,
                value: raw_port.clone(),
            })?;

        let token = std::env::var(TOKEN_VAR).unwrap_or_default().into_bytes();

        Ok(Config { port, token })
    }
}
