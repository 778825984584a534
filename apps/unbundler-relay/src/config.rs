use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct RelayConfig {
    pub listen_addr: String,
    pub target_addr: String,
    pub relay_pattern: String,
    #[serde(with = "humantime_serde")]
    pub tick_interval: Duration,
    #[serde(with = "humantime_serde")]
    pub recv_timeout: Duration,
    pub max_datagram_size: usize,
}

impl RelayConfig {
    pub fn new(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("listen_addr", "127.0.0.1:10001")?
            .set_default("target_addr", "192.168.1.10:10000")?
            .set_default("relay_pattern", "/ardosc*")?
            .set_default("tick_interval", "2ms")?
            .set_default("recv_timeout", "100ms")?
            .set_default("max_datagram_size", 65_536)?;

        if let Some(path) = config_path {
            if path.extension().and_then(|ext| ext.to_str()) == Some("env") {
                // Loaded into the process environment so the prefixed
                // Environment source below picks the values up.
                match dotenvy::from_path(&path) {
                    Ok(_) => tracing::info!("loaded environment from {}", path.display()),
                    Err(err) => {
                        tracing::warn!("failed to load .env from {}: {}", path.display(), err)
                    }
                }
            } else {
                builder = builder.add_source(File::from(path));
            }
        }

        builder = builder.add_source(Environment::with_prefix("UNBUNDLER").try_parsing(true));

        builder.build()?.try_deserialize()
    }
}
