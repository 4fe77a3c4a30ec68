//! Relay configuration parsed from environment variables.

/// Bound of each peer's outbound frame channel.
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 256;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    MissingSecret(&'static str),
}

#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Server-side secret for accept-key derivation. Supplied out-of-band,
    /// never sent on the wire.
    pub secret: String,
    /// Capacity of each connection's outbound channel.
    pub outbound_capacity: usize,
}

impl RelayConfig {
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self { secret: secret.into(), outbound_capacity: DEFAULT_OUTBOUND_CAPACITY }
    }

    /// Build config from environment variables.
    ///
    /// Required:
    /// - `WEBSOCKETS_SECRET_KEY`
    ///
    /// Optional:
    /// - `RELAY_OUTBOUND_CAPACITY`: default 256
    ///
    /// # Errors
    ///
    /// `MissingSecret` when `WEBSOCKETS_SECRET_KEY` is absent.
    pub fn from_env() -> Result<Self, ConfigError> {
        build(
            std::env::var("WEBSOCKETS_SECRET_KEY").ok(),
            std::env::var("RELAY_OUTBOUND_CAPACITY").ok().as_deref(),
        )
    }
}

fn build(secret: Option<String>, capacity: Option<&str>) -> Result<RelayConfig, ConfigError> {
    let Some(secret) = secret else {
        return Err(ConfigError::MissingSecret("WEBSOCKETS_SECRET_KEY"));
    };
    let outbound_capacity = capacity
        .and_then(|raw| raw.parse::<usize>().ok())
        .filter(|cap| *cap > 0)
        .unwrap_or(DEFAULT_OUTBOUND_CAPACITY);
    Ok(RelayConfig { secret, outbound_capacity })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_is_required() {
        assert!(matches!(build(None, None), Err(ConfigError::MissingSecret(_))));
    }

    #[test]
    fn capacity_defaults_and_parses() {
        let config = build(Some("s".into()), None).expect("config");
        assert_eq!(config.outbound_capacity, DEFAULT_OUTBOUND_CAPACITY);

        let config = build(Some("s".into()), Some("32")).expect("config");
        assert_eq!(config.outbound_capacity, 32);
    }

    #[test]
    fn invalid_capacity_falls_back_to_default() {
        for raw in ["zero", "-1", "0", ""] {
            let config = build(Some("s".into()), Some(raw)).expect("config");
            assert_eq!(config.outbound_capacity, DEFAULT_OUTBOUND_CAPACITY, "raw {raw:?}");
        }
    }

    #[test]
    fn new_uses_default_capacity() {
        let config = RelayConfig::new("hunter2");
        assert_eq!(config.secret, "hunter2");
        assert_eq!(config.outbound_capacity, DEFAULT_OUTBOUND_CAPACITY);
    }
}
