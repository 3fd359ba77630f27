//! Builder configuration: optional TOML file plus environment overrides.

use crate::codegen::{CodeGenFormat, CodeGenOptions};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Looked up in the working directory when no `--config` is given.
pub const DEFAULT_FILE: &str = "gooey-builder.toml";

pub const ENV_COMPILER: &str = "GOOEY_CC";
pub const ENV_COMPILE_TIMEOUT: &str = "GOOEY_COMPILE_TIMEOUT";
pub const ENV_RUN_TIMEOUT: &str = "GOOEY_RUN_TIMEOUT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration in {}: {source}", path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("environment variable {key}={value:?} is not valid")]
    InvalidEnv { key: &'static str, value: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuilderConfig {
    pub compiler: String,
    pub compile_flags: Vec<String>,
    pub compile_timeout_secs: u64,
    /// `None` lets the program run until it exits or is cancelled.
    pub run_timeout_secs: Option<u64>,
    pub codegen: CodegenConfig,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CodegenConfig {
    pub comments: bool,
    pub format: CodeGenFormat,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            compiler: "gcc".into(),
            compile_flags: [
                "-lGooeyGUI-1",
                "-lGLPS",
                "-I/usr/local/include/Gooey",
                "-I/usr/local/include/GLPS",
                "-L/usr/local/lib",
            ]
            .map(String::from)
            .to_vec(),
            compile_timeout_secs: 30,
            run_timeout_secs: None,
            codegen: CodegenConfig::default(),
        }
    }
}

impl Default for CodegenConfig {
    fn default() -> Self {
        let options = CodeGenOptions::default();
        Self {
            comments: options.comments,
            format: options.format,
        }
    }
}

impl From<CodegenConfig> for CodeGenOptions {
    fn from(cfg: CodegenConfig) -> Self {
        Self {
            format: cfg.format,
            comments: cfg.comments,
        }
    }
}

impl BuilderConfig {
    pub fn parse(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Toml {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Applies overrides from `lookup`, normally the process environment.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(cc) = lookup(ENV_COMPILER).filter(|s| !s.trim().is_empty()) {
            self.compiler = cc.trim().to_string();
        }
        if let Some(value) = lookup(ENV_COMPILE_TIMEOUT) {
            self.compile_timeout_secs = parse_secs(ENV_COMPILE_TIMEOUT, &value)?;
        }
        if let Some(value) = lookup(ENV_RUN_TIMEOUT) {
            // 0 or empty disables the run timeout.
            self.run_timeout_secs = match value.trim() {
                "" => None,
                _ => Some(parse_secs(ENV_RUN_TIMEOUT, &value)?).filter(|&n| n > 0),
            };
        }
        Ok(())
    }
}

fn parse_secs(key: &'static str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|_| ConfigError::InvalidEnv {
            key,
            value: value.to_string(),
        })
}

/// Loads the configuration. An explicit `path` must exist; otherwise
/// [`DEFAULT_FILE`] in `dir` is read when present.
pub fn load(path: Option<&Path>, dir: &Path) -> Result<BuilderConfig, ConfigError> {
    let file = match path {
        Some(path) => Some(path.to_path_buf()),
        None => Some(dir.join(DEFAULT_FILE)).filter(|p| p.is_file()),
    };

    let mut cfg = match &file {
        Some(file) => {
            let text = std::fs::read_to_string(file).map_err(|source| ConfigError::Io {
                path: file.clone(),
                source,
            })?;
            BuilderConfig::parse(&text, file)?
        }
        None => BuilderConfig::default(),
    };
    cfg.apply_env(|key| std::env::var(key).ok())?;

    debug!(
        file = ?file,
        compiler = %cfg.compiler,
        compile_timeout = cfg.compile_timeout_secs,
        run_timeout = ?cfg.run_timeout_secs,
        "loaded configuration"
    );
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let cfg = BuilderConfig::default();
        assert_eq!(cfg.compiler, "gcc");
        assert_eq!(cfg.compile_flags.len(), 5);
        assert_eq!(cfg.compile_flags[0], "-lGooeyGUI-1");
        assert_eq!(cfg.compile_timeout_secs, 30);
        assert_eq!(cfg.run_timeout_secs, None);
        assert_eq!(CodeGenOptions::from(cfg.codegen), CodeGenOptions::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let cfg = BuilderConfig::parse(
            "compiler = \"clang\"\nrun_timeout_secs = 5\n\n[codegen]\nformat = \"init-only\"\n",
            Path::new("test.toml"),
        )
        .unwrap();
        assert_eq!(cfg.compiler, "clang");
        assert_eq!(cfg.run_timeout_secs, Some(5));
        assert_eq!(cfg.compile_timeout_secs, 30);
        assert_eq!(cfg.codegen.format, CodeGenFormat::InitOnly);
        assert!(cfg.codegen.comments);
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let err = BuilderConfig::parse("compiler_path = \"cc\"\n", Path::new("bad.toml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Toml { .. }));
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn test_env_overrides() {
        let mut cfg = BuilderConfig::default();
        cfg.apply_env(env(&[
            (ENV_COMPILER, " clang "),
            (ENV_COMPILE_TIMEOUT, "10"),
            (ENV_RUN_TIMEOUT, "3"),
        ]))
        .unwrap();
        assert_eq!(cfg.compiler, "clang");
        assert_eq!(cfg.compile_timeout_secs, 10);
        assert_eq!(cfg.run_timeout_secs, Some(3));

        cfg.apply_env(env(&[(ENV_RUN_TIMEOUT, "0")])).unwrap();
        assert_eq!(cfg.run_timeout_secs, None);

        let err = cfg
            .apply_env(env(&[(ENV_COMPILE_TIMEOUT, "soon")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidEnv { key: ENV_COMPILE_TIMEOUT, .. }
        ));
    }

    #[test]
    fn test_load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(DEFAULT_FILE),
            "compile_timeout_secs = 12\n[codegen]\ncomments = false\n",
        )
        .unwrap();
        let cfg = load(None, dir.path()).unwrap();
        assert!(!cfg.codegen.comments);
        assert_eq!(cfg.codegen.format, CodeGenFormat::Full);

        let empty = tempfile::tempdir().unwrap();
        assert!(load(None, empty.path()).unwrap().codegen.comments);
    }

    #[test]
    fn test_explicit_path_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(
            load(Some(&missing), dir.path()),
            Err(ConfigError::Io { .. })
        ));
    }
}
