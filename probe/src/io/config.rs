//! Probe configuration stored in `probe.toml`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;

use crate::core::messages::Locale;
use crate::core::normalize::{DEFAULT_INDENT, DEFAULT_MAX_DEPTH};

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "probe.toml";

/// Probe configuration (TOML).
///
/// Missing fields default to values that work with a bridge script named
/// `fg-bridge.mjs` next to the working directory.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProbeConfig {
    /// Language for labels and fixed messages.
    pub locale: Locale,

    pub engine: EngineConfig,

    pub render: RenderConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    /// Command that speaks the JSON bridge protocol on stdin/stdout
    /// (e.g. `["node","fg-bridge.mjs"]`).
    pub command: Vec<String>,

    /// Wall-clock limit for one engine call, in seconds.
    pub timeout_secs: u64,

    /// Discard bridge stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RenderConfig {
    /// Nesting limit when serializing structured values.
    pub max_depth: usize,

    /// Spaces per indent level in structured output.
    pub indent: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            command: vec!["node".to_string(), "fg-bridge.mjs".to_string()],
            timeout_secs: 30,
            output_limit_bytes: 8 * 1024 * 1024,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            indent: DEFAULT_INDENT,
        }
    }
}

impl ProbeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.engine.command.is_empty() || self.engine.command[0].trim().is_empty() {
            return Err(anyhow!("engine.command must be a non-empty array"));
        }
        if self.engine.timeout_secs == 0 {
            return Err(anyhow!("engine.timeout_secs must be > 0"));
        }
        if self.engine.output_limit_bytes == 0 {
            return Err(anyhow!("engine.output_limit_bytes must be > 0"));
        }
        if self.render.max_depth == 0 {
            return Err(anyhow!("render.max_depth must be > 0"));
        }
        if self.render.indent > 16 {
            return Err(anyhow!("render.indent must be <= 16"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `ProbeConfig::default()`.
pub fn load_config(path: &Path) -> Result<ProbeConfig> {
    if !path.exists() {
        let cfg = ProbeConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: ProbeConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, ProbeConfig::default());
    }

    #[test]
    fn full_file_loads_every_section() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("probe.toml");
        fs::write(
            &path,
            r#"locale = "zh-tw"

[engine]
command = ["node", "bridge/fg-bridge.mjs"]
timeout_secs = 10
output_limit_bytes = 4096

[render]
max_depth = 4
indent = 4
"#,
        )
        .expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(
            loaded,
            ProbeConfig {
                locale: Locale::ZhTw,
                engine: EngineConfig {
                    command: vec!["node".to_string(), "bridge/fg-bridge.mjs".to_string()],
                    timeout_secs: 10,
                    output_limit_bytes: 4096,
                },
                render: RenderConfig {
                    max_depth: 4,
                    indent: 4,
                },
            }
        );
    }

    #[test]
    fn partial_file_fills_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("probe.toml");
        fs::write(&path, "locale = \"zh-tw\"\n[engine]\ntimeout_secs = 5\n").expect("write");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.locale, Locale::ZhTw);
        assert_eq!(cfg.engine.timeout_secs, 5);
        assert_eq!(cfg.engine.command, EngineConfig::default().command);
        assert_eq!(cfg.render, RenderConfig::default());
    }

    #[test]
    fn empty_command_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("probe.toml");
        fs::write(&path, "[engine]\ncommand = []\n").expect("write");
        let err = load_config(&path).expect_err("invalid");
        assert!(err.to_string().contains("engine.command"));
    }
}
