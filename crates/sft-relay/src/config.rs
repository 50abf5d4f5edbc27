//! Configuration management

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sft_transport::DEFAULT_MAX_FRAME_SIZE;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    pub max_peers: usize,
    pub max_frame_size: usize,
    /// Frames a slow peer may fall behind before it starts losing them.
    pub broadcast_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 5000)),
            max_peers: 64,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            broadcast_capacity: 16,
        }
    }
}

/// Values a TOML file may set. Anything absent keeps its earlier value.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileOverrides {
    listen_addr: Option<SocketAddr>,
    max_peers: Option<usize>,
    max_frame_size: Option<usize>,
    broadcast_capacity: Option<usize>,
}

impl ServerConfig {
    /// Load configuration: defaults, then `SFT_RELAY_*` environment
    /// variables, then the TOML file named by `SFT_RELAY_CONFIG` or
    /// `--config`, then command line flags.
    pub fn load() -> Result<Self, ConfigError> {
        let args: Vec<String> = std::env::args().skip(1).collect();
        Self::load_from(&args, |key| std::env::var(key).ok())
    }

    /// [`load`](Self::load) with explicit arguments and environment.
    pub fn load_from(
        args: &[String],
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env(&env)?;

        let flags = Flags::parse(args)?;
        if let Some(path) = flags.config.clone().or_else(|| env("SFT_RELAY_CONFIG").map(PathBuf::from)) {
            config.apply_toml_file(&path)?;
        }
        flags.apply(&mut config);

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_peers < 2 {
            return Err(ConfigError::Invalid(
                "max_peers must be at least 2 for anything to be relayed".to_string(),
            ));
        }
        if self.max_frame_size == 0 || self.max_frame_size > u32::MAX as usize {
            return Err(ConfigError::Invalid(format!(
                "max_frame_size must be between 1 and {}",
                u32::MAX
            )));
        }
        if self.broadcast_capacity == 0 {
            return Err(ConfigError::Invalid("broadcast_capacity must be > 0".to_string()));
        }
        Ok(())
    }

    fn apply_env(&mut self, env: &impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(addr) = env("SFT_RELAY_LISTEN_ADDR") {
            self.listen_addr = parse_value("SFT_RELAY_LISTEN_ADDR", &addr)?;
        }
        if let Some(max) = env("SFT_RELAY_MAX_PEERS") {
            self.max_peers = parse_value("SFT_RELAY_MAX_PEERS", &max)?;
        }
        if let Some(max) = env("SFT_RELAY_MAX_FRAME_SIZE") {
            self.max_frame_size = parse_value("SFT_RELAY_MAX_FRAME_SIZE", &max)?;
        }
        if let Some(capacity) = env("SFT_RELAY_BROADCAST_CAPACITY") {
            self.broadcast_capacity = parse_value("SFT_RELAY_BROADCAST_CAPACITY", &capacity)?;
        }
        Ok(())
    }

    fn apply_toml_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let content = std::fs::read_to_string(path)?;
        self.apply_toml(&content)
    }

    fn apply_toml(&mut self, content: &str) -> Result<(), ConfigError> {
        let file: FileOverrides = toml::from_str(content)?;
        if let Some(addr) = file.listen_addr {
            self.listen_addr = addr;
        }
        if let Some(max) = file.max_peers {
            self.max_peers = max;
        }
        if let Some(max) = file.max_frame_size {
            self.max_frame_size = max;
        }
        if let Some(capacity) = file.broadcast_capacity {
            self.broadcast_capacity = capacity;
        }
        Ok(())
    }
}

/// Command line flags. Parsed by hand, the relay takes only a few.
#[derive(Debug, Default)]
struct Flags {
    config: Option<PathBuf>,
    listen_addr: Option<SocketAddr>,
    max_peers: Option<usize>,
    max_frame_size: Option<usize>,
}

impl Flags {
    fn parse(args: &[String]) -> Result<Self, ConfigError> {
        let mut flags = Self::default();
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            let mut value = |name: &str| {
                iter.next()
                    .cloned()
                    .ok_or_else(|| ConfigError::Invalid(format!("{name} requires a value")))
            };
            match arg.as_str() {
                "--config" | "-f" => flags.config = Some(PathBuf::from(value("--config")?)),
                "--listen-addr" | "-l" => {
                    flags.listen_addr = Some(parse_value("--listen-addr", &value("--listen-addr")?)?)
                }
                "--max-peers" => flags.max_peers = Some(parse_value("--max-peers", &value("--max-peers")?)?),
                "--max-frame-size" => {
                    flags.max_frame_size = Some(parse_value("--max-frame-size", &value("--max-frame-size")?)?)
                }
                other => return Err(ConfigError::Invalid(format!("unknown argument: {other}"))),
            }
        }
        Ok(flags)
    }

    fn apply(&self, config: &mut ServerConfig) {
        if let Some(addr) = self.listen_addr {
            config.listen_addr = addr;
        }
        if let Some(max) = self.max_peers {
            config.max_peers = max;
        }
        if let Some(max) = self.max_frame_size {
            config.max_frame_size = max;
        }
    }
}

fn parse_value<T>(name: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse()
        .map_err(|e| ConfigError::Invalid(format!("Invalid {name} {raw:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::load_from(&[], env_of(&[])).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.listen_addr.to_string(), "127.0.0.1:5000");
    }

    #[test]
    fn test_env_overrides_defaults() {
        let config = ServerConfig::load_from(
            &[],
            env_of(&[("SFT_RELAY_LISTEN_ADDR", "0.0.0.0:6000"), ("SFT_RELAY_MAX_PEERS", "3")]),
        )
        .unwrap();
        assert_eq!(config.listen_addr.port(), 6000);
        assert_eq!(config.max_peers, 3);
    }

    #[test]
    fn test_layering_order() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "listen_addr = \"127.0.0.1:7000\"\nmax_peers = 10").unwrap();
        let path = file.path().to_string_lossy().to_string();

        // File beats env, flags beat file.
        let config = ServerConfig::load_from(
            &args(&["--max-peers", "20"]),
            env_of(&[
                ("SFT_RELAY_CONFIG", path.as_str()),
                ("SFT_RELAY_LISTEN_ADDR", "127.0.0.1:6000"),
                ("SFT_RELAY_BROADCAST_CAPACITY", "4"),
            ]),
        )
        .unwrap();
        assert_eq!(config.listen_addr.port(), 7000);
        assert_eq!(config.max_peers, 20);
        assert_eq!(config.broadcast_capacity, 4);
    }

    #[test]
    fn test_config_flag() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_frame_size = 1024").unwrap();
        let path = file.path().to_string_lossy().to_string();

        let config = ServerConfig::load_from(&args(&["-f", &path]), env_of(&[])).unwrap();
        assert_eq!(config.max_frame_size, 1024);
    }

    #[test]
    fn test_invalid_values() {
        let err = ServerConfig::load_from(&args(&["--max-peers", "1"]), env_of(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = ServerConfig::load_from(&[], env_of(&[("SFT_RELAY_LISTEN_ADDR", "nope")])).unwrap_err();
        assert!(err.to_string().contains("SFT_RELAY_LISTEN_ADDR"));

        let err = ServerConfig::load_from(&args(&["--listen-addr"]), env_of(&[])).unwrap_err();
        assert!(err.to_string().contains("requires a value"));

        let err = ServerConfig::load_from(&args(&["--bogus"]), env_of(&[])).unwrap_err();
        assert!(err.to_string().contains("unknown argument"));
    }

    #[test]
    fn test_unknown_toml_key_rejected() {
        let mut config = ServerConfig::default();
        assert!(matches!(
            config.apply_toml("max_peer = 3"),
            Err(ConfigError::Toml(_))
        ));
    }
}
