//! Process-wide configuration.
//!
//! Built once in `main` from environment variables and passed by reference
//! into the components that need it (token codec, session resolver, server
//! bootstrap). There is no ambient/global lookup, so tests construct configs
//! with distinct secrets per case.

use anyhow::{bail, Context, Result};

pub const DEFAULT_TOKEN_TTL_SECS: i64 = 86_400; // 1 day
pub const DEFAULT_HTTP_PORT: u16 = 7878;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Shared HMAC secret for session tokens. Required: both issuance and
    /// verification fail closed without it, so an unset secret can never
    /// degrade into accepting unsigned tokens.
    pub token_secret: String,
    /// Default session-token lifetime in seconds. Individual issuance calls
    /// may override it.
    pub token_ttl_secs: i64,
    /// HTTP bind port.
    pub http_port: u16,
}

impl AppConfig {
    /// Read configuration from the environment.
    ///
    /// `VETDESK_TOKEN_SECRET` is mandatory; `VETDESK_TOKEN_TTL_SECS` and
    /// `VETDESK_HTTP_PORT` fall back to defaults.
    pub fn from_env() -> Result<Self> {
        let token_secret = match std::env::var("VETDESK_TOKEN_SECRET") {
            Ok(s) if !s.trim().is_empty() => s,
            _ => bail!("VETDESK_TOKEN_SECRET is not set; refusing to start without a signing secret"),
        };

        let token_ttl_secs = match std::env::var("VETDESK_TOKEN_TTL_SECS") {
            Ok(s) => s
                .parse::<i64>()
                .with_context(|| format!("invalid VETDESK_TOKEN_TTL_SECS: {s}"))?,
            Err(_) => DEFAULT_TOKEN_TTL_SECS,
        };
        if token_ttl_secs <= 0 {
            bail!("VETDESK_TOKEN_TTL_SECS must be positive, got {token_ttl_secs}");
        }

        let http_port = match std::env::var("VETDESK_HTTP_PORT") {
            Ok(s) => s
                .parse::<u16>()
                .with_context(|| format!("invalid VETDESK_HTTP_PORT: {s}"))?,
            Err(_) => DEFAULT_HTTP_PORT,
        };

        Ok(Self {
            token_secret,
            token_ttl_secs,
            http_port,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Env mutation is process-global, so the positive and negative paths
    // share one test instead of racing in parallel.
    #[test]
    fn from_env_fails_closed_without_secret() {
        std::env::remove_var("VETDESK_TOKEN_SECRET");
        assert!(AppConfig::from_env().is_err());

        std::env::set_var("VETDESK_TOKEN_SECRET", "   ");
        assert!(AppConfig::from_env().is_err(), "blank secret must not count");

        std::env::set_var("VETDESK_TOKEN_SECRET", "unit-test-secret");
        std::env::remove_var("VETDESK_TOKEN_TTL_SECS");
        std::env::remove_var("VETDESK_HTTP_PORT");
        let cfg = AppConfig::from_env().expect("secret set");
        assert_eq!(cfg.token_ttl_secs, DEFAULT_TOKEN_TTL_SECS);
        assert_eq!(cfg.http_port, DEFAULT_HTTP_PORT);
        std::env::remove_var("VETDESK_TOKEN_SECRET");
    }
}
