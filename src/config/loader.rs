/// Configuration loading from managed-boot.json
use crate::config::types::{BootError, BootstrapConfig, Result};
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "MANAGED_BOOT_CONFIG";

/// File picked up from the working directory when no override is given
pub const DEFAULT_CONFIG_FILE: &str = "managed-boot.json";

impl BootstrapConfig {
    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let config_content = std::fs::read_to_string(path).map_err(|e| {
            BootError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        serde_json::from_str(&config_content).map_err(|e| {
            BootError::Config(format!(
                "Failed to parse config JSON {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Resolve configuration for a process start.
    ///
    /// `MANAGED_BOOT_CONFIG` wins; otherwise `./managed-boot.json` is used when
    /// present; otherwise built-in defaults.
    pub fn load() -> Result<Self> {
        match Self::resolve_path(std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from))? {
            Some(path) => {
                log::debug!("Loading bootstrap config from {}", path.display());
                Self::load_from_file(path)
            }
            None => {
                log::debug!("No bootstrap config found, using defaults");
                Ok(Self::default())
            }
        }
    }

    fn resolve_path(explicit: Option<PathBuf>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            // An explicit path that does not exist is a broken configuration.
            return Ok(Some(path));
        }

        let candidate = std::env::current_dir()?.join(DEFAULT_CONFIG_FILE);
        Ok(candidate.exists().then_some(candidate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"diagnostics": {{"alloc_results": true}}, "profiling": {{"enabled": true, "cpu": 2}}}}"#
        )
        .unwrap();

        let config = BootstrapConfig::load_from_file(file.path()).unwrap();
        assert!(config.diagnostics.alloc_results);
        assert!(!config.diagnostics.malloc_counters);
        assert!(config.profiling.enabled);
        assert_eq!(config.profiling.cpu, 2);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = BootstrapConfig::load_from_file("/nonexistent/managed-boot.json").unwrap_err();
        match err {
            BootError::Config(msg) => assert!(msg.contains("/nonexistent/managed-boot.json")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_malformed_json_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        let err = BootstrapConfig::load_from_file(file.path()).unwrap_err();
        assert!(matches!(err, BootError::Config(_)));
        assert!(err.to_string().contains("Failed to parse config JSON"));
    }

    #[test]
    fn test_explicit_path_is_kept_even_if_missing() {
        let explicit = PathBuf::from("/nonexistent/override.json");
        let resolved = BootstrapConfig::resolve_path(Some(explicit.clone())).unwrap();
        assert_eq!(resolved, Some(explicit));
    }
}
