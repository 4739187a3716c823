//! Client configuration.
//!
//! Layered, lowest priority first:
//! - built-in defaults
//! - a TOML file (`--config` or `FACEGATE_CONFIG`)
//! - `FACEGATE_*` environment variables
//!
//! Command-line flags are applied on top by the binary.

use std::path::{Path, PathBuf};
use std::time::Duration;

use facegate_core::liveness::DEFAULT_EAR_THRESHOLD;
use facegate_core::MeshStyle;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the landmark and auth endpoints.
    pub server_url: String,
    /// Timeout in seconds for any single HTTP request.
    pub request_timeout_secs: u64,
    /// Delay between tracking ticks, in milliseconds (~10 ticks/s).
    pub tick_interval_ms: u64,
    /// Averaged EAR below which the eyes count as closed.
    pub ear_threshold: f32,
    /// Maximum distance (source pixels) for a mesh edge.
    pub mesh_proximity: f32,
    /// How long login popups stay up, in milliseconds.
    pub login_notice_ms: u64,
    /// How long registration popups stay up, in milliseconds.
    pub register_notice_ms: u64,
    /// Pause before navigating away after success, in milliseconds.
    pub navigate_delay_ms: u64,
    /// Where a successful login goes.
    pub login_redirect: String,
    /// Where a successful registration goes.
    pub register_redirect: String,
    /// Playback rate of the replay camera.
    pub replay_fps: f32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:5000".to_string(),
            request_timeout_secs: 10,
            tick_interval_ms: 100,
            ear_threshold: DEFAULT_EAR_THRESHOLD,
            mesh_proximity: 70.0,
            login_notice_ms: 3000,
            register_notice_ms: 2000,
            navigate_delay_ms: 1200,
            login_redirect: "/dashboard".to_string(),
            register_redirect: "/".to_string(),
            replay_fps: facegate_hw::DEFAULT_REPLAY_FPS,
        }
    }
}

impl ClientConfig {
    /// Load defaults, then the config file (explicit path, else
    /// `FACEGATE_CONFIG`), then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var("FACEGATE_CONFIG").ok().map(PathBuf::from));

        let mut config = match file {
            Some(path) => {
                let contents = std::fs::read_to_string(&path).map_err(|source| {
                    ConfigError::Read {
                        path: path.clone(),
                        source,
                    }
                })?;
                tracing::debug!(path = %path.display(), "loading config file");
                toml::from_str(&contents).map_err(|source| ConfigError::Parse { path, source })?
            }
            None => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply `FACEGATE_*` overrides from `lookup`. Unparseable values are
    /// ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("FACEGATE_SERVER_URL") {
            self.server_url = v;
        }
        env_parse(&lookup, "FACEGATE_REQUEST_TIMEOUT_SECS", &mut self.request_timeout_secs);
        env_parse(&lookup, "FACEGATE_TICK_INTERVAL_MS", &mut self.tick_interval_ms);
        env_parse(&lookup, "FACEGATE_EAR_THRESHOLD", &mut self.ear_threshold);
        env_parse(&lookup, "FACEGATE_MESH_PROXIMITY", &mut self.mesh_proximity);
        env_parse(&lookup, "FACEGATE_NAVIGATE_DELAY_MS", &mut self.navigate_delay_ms);
        env_parse(&lookup, "FACEGATE_REPLAY_FPS", &mut self.replay_fps);
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn navigate_delay(&self) -> Duration {
        Duration::from_millis(self.navigate_delay_ms)
    }

    pub fn login_notice(&self) -> Duration {
        Duration::from_millis(self.login_notice_ms)
    }

    pub fn register_notice(&self) -> Duration {
        Duration::from_millis(self.register_notice_ms)
    }

    pub fn mesh_style(&self) -> MeshStyle {
        MeshStyle {
            proximity: self.mesh_proximity,
            ..MeshStyle::default()
        }
    }
}

fn env_parse<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    slot: &mut T,
) {
    if let Some(value) = lookup(key).and_then(|v| v.parse().ok()) {
        *slot = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let c = ClientConfig::default();
        assert_eq!(c.tick_interval(), Duration::from_millis(100));
        assert_eq!(c.navigate_delay(), Duration::from_millis(1200));
        assert!((c.ear_threshold - 0.20).abs() < 1e-6);
        assert_eq!(c.mesh_style().proximity, 70.0);
        assert_eq!(c.login_redirect, "/dashboard");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let c: ClientConfig = toml::from_str(
            r#"
            server_url = "https://faces.example.org"
            ear_threshold = 0.22
            "#,
        )
        .unwrap();
        assert_eq!(c.server_url, "https://faces.example.org");
        assert!((c.ear_threshold - 0.22).abs() < 1e-6);
        assert_eq!(c.tick_interval_ms, 100);
    }

    #[test]
    fn test_env_overrides_file() {
        let mut c: ClientConfig = toml::from_str("tick_interval_ms = 250").unwrap();
        let env: HashMap<&str, &str> = HashMap::from([
            ("FACEGATE_TICK_INTERVAL_MS", "50"),
            ("FACEGATE_SERVER_URL", "http://10.0.0.2:8080"),
            ("FACEGATE_EAR_THRESHOLD", "not-a-number"),
        ]);
        c.apply_env(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(c.tick_interval_ms, 50);
        assert_eq!(c.server_url, "http://10.0.0.2:8080");
        assert!((c.ear_threshold - 0.20).abs() < 1e-6);
    }

    #[test]
    fn test_load_missing_file() {
        let err = ClientConfig::load(Some(Path::new("/nonexistent/facegate.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_load_rejects_bad_toml() {
        let path = std::env::temp_dir().join(format!(
            "facegate-config-test-{}.toml",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        std::fs::write(&path, "tick_interval_ms = \"fast\"").unwrap();
        let err = ClientConfig::load(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        let _ = std::fs::remove_file(&path);
    }
}
