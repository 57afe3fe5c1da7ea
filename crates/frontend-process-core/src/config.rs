use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Settings shared with the subordinate process and used by its runtime loop
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeConfig {
    /// Longest wait for a single packet fetch (in milliseconds)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// How long the subordinate waits to reach the supervisor's sockets (in milliseconds)
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl RuntimeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration and return errors if invalid
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(anyhow::anyhow!(
                "poll_interval_ms must be non-zero, a zero interval busy-loops"
            ));
        }

        if self.poll_interval_ms > 1_000 {
            return Err(anyhow::anyhow!(
                "poll_interval_ms should not exceed 1 second"
            ));
        }

        if self.connect_timeout_ms == 0 || self.connect_timeout_ms > 60_000 {
            return Err(anyhow::anyhow!(
                "connect_timeout_ms must be between 1 ms and 60 seconds"
            ));
        }

        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// Supervisor configuration: how the subordinate process is launched
#[derive(Debug, Clone, PartialEq, Builder)]
#[builder(setter(into, strip_option))]
pub struct SupervisorConfig {
    /// Executable to launch; the current executable when unset
    #[builder(default)]
    pub program: Option<PathBuf>,
    #[builder(default)]
    #[builder(setter(custom))]
    pub args: Vec<String>,
    #[builder(default)]
    #[builder(setter(custom))]
    pub env: HashMap<String, String>,
    #[builder(default)]
    pub working_directory: Option<PathBuf>,
    #[builder(default = "default_socket_prefix()")]
    pub socket_prefix: String,
    #[builder(default)]
    pub runtime: RuntimeConfig,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            program: None,
            args: Vec::new(),
            env: HashMap::new(),
            working_directory: None,
            socket_prefix: default_socket_prefix(),
            runtime: RuntimeConfig::default(),
        }
    }
}

impl SupervisorConfig {
    pub fn builder() -> SupervisorConfigBuilder {
        SupervisorConfigBuilder::default()
    }

    /// Resolve the program to launch, falling back to the running executable
    pub fn resolve_program(&self) -> std::io::Result<PathBuf> {
        match &self.program {
            Some(program) => Ok(program.clone()),
            None => std::env::current_exe(),
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.socket_prefix.is_empty() {
            return Err(anyhow::anyhow!("socket_prefix must not be empty"));
        }
        self.runtime.validate()
    }
}

impl SupervisorConfigBuilder {
    pub fn args<S: ToString, I: IntoIterator<Item = S>>(&mut self, iter: I) -> &mut Self {
        let args: Vec<String> = iter.into_iter().map(|s| s.to_string()).collect();
        self.args = Some(args);
        self
    }

    pub fn env<T: ToString>(&mut self, key: T, value: T) -> &mut Self {
        let map = self.env.get_or_insert_with(HashMap::new);
        map.insert(key.to_string(), value.to_string());

        self
    }

    pub fn env_multi<T: ToString, I: IntoIterator<Item = (T, T)>>(&mut self, iter: I) -> &mut Self {
        let env = self.env.get_or_insert_with(HashMap::new);
        for (key, value) in iter {
            env.insert(key.to_string(), value.to_string());
        }
        self
    }
}

// Default value functions for serde
fn default_poll_interval_ms() -> u64 {
    10
}
fn default_connect_timeout_ms() -> u64 {
    5_000
}
fn default_socket_prefix() -> String {
    "frontend-process".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_runtime_config() {
        let config = RuntimeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.poll_interval(), Duration::from_millis(10));
        assert_eq!(config.connect_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_runtime_config() {
        let mut config = RuntimeConfig {
            poll_interval_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.poll_interval_ms = 10;
        config.connect_timeout_ms = 0;
        assert!(config.validate().is_err());

        config.connect_timeout_ms = 120_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_runtime_config_missing_fields_use_defaults() {
        let config: RuntimeConfig = serde_json::from_str(r#"{"pollIntervalMs": 25}"#).unwrap();
        assert_eq!(config.poll_interval_ms, 25);
        assert_eq!(config.connect_timeout_ms, 5_000);
    }

    #[test]
    fn test_supervisor_builder() {
        let config = SupervisorConfig::builder()
            .program("/usr/bin/display")
            .args(["--fullscreen"])
            .env("DISPLAY_THEME", "dark")
            .build()
            .unwrap();

        assert_eq!(config.program, Some(PathBuf::from("/usr/bin/display")));
        assert_eq!(config.args, vec!["--fullscreen".to_string()]);
        assert_eq!(config.env.get("DISPLAY_THEME").map(String::as_str), Some("dark"));
        assert_eq!(config.socket_prefix, "frontend-process");
        assert_eq!(config.runtime, RuntimeConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_program_falls_back_to_current_exe() {
        let config = SupervisorConfig::builder().build().unwrap();
        assert!(config.program.is_none());
        assert_eq!(
            config.resolve_program().unwrap(),
            std::env::current_exe().unwrap()
        );
    }

    #[test]
    fn test_empty_socket_prefix_rejected() {
        let config = SupervisorConfig::builder().socket_prefix("").build().unwrap();
        assert!(config.validate().is_err());
    }
}
