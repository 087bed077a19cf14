use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::Serialize;
use std::path::Path;

use super::{types::Config, ConfigError};

/// Prefix for environment overrides, e.g. `SONICSYNC_SERVER__URL`.
const ENV_PREFIX: &str = "SONICSYNC_";

/// Load configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    base_figment(Some(path))?
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Load configuration from defaults, an optional file, the environment,
/// and finally `overrides` (typically CLI flags; unset fields should be
/// skipped when serializing).
pub fn load_layered_config<T: Serialize>(
    path: Option<&Path>,
    overrides: T,
) -> Result<Config, ConfigError> {
    base_figment(path)?
        .merge(Serialized::defaults(overrides))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Defaults, then the file if any, then the environment.
fn base_figment(path: Option<&Path>) -> Result<Figment, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(Config::default()));

    if let Some(path) = path {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
        figment = figment.merge(Toml::file(path));
    }

    Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[derive(Serialize, Default)]
    struct Overrides {
        sync: SyncOverrides,
    }

    #[derive(Serialize, Default)]
    struct SyncOverrides {
        #[serde(skip_serializing_if = "Option::is_none")]
        concurrency: Option<usize>,
        #[serde(skip_serializing_if = "Option::is_none")]
        flat: Option<bool>,
    }

    #[test]
    fn test_load_config_from_str_valid() {
        let toml = r#"
[server]
url = "http://localhost:4533"
user = "bob"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.server.url, "http://localhost:4533");
        assert_eq!(config.sync.concurrency, 5);
    }

    #[test]
    fn test_load_config_from_str_bad_type() {
        let toml = r#"
[sync]
concurrency = "many"
"#;
        let result = load_config_from_str(toml);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[server]
url = "https://music.example.com"
user = "carol"

[sync]
cover_size = 300
"#
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.server.user, "carol");
        assert_eq!(config.sync.cover_size, 300);
        assert_eq!(config.sync.quality, 2);
    }

    #[test]
    fn test_layered_overrides_win_over_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[sync]
concurrency = 2
flat = false
cover_size = 200
"#
        )
        .unwrap();

        let overrides = Overrides {
            sync: SyncOverrides {
                concurrency: Some(9),
                flat: Some(true),
            },
        };
        let config = load_layered_config(Some(temp_file.path()), overrides).unwrap();
        assert_eq!(config.sync.concurrency, 9);
        assert!(config.sync.flat);
        // untouched by overrides
        assert_eq!(config.sync.cover_size, 200);
    }

    #[test]
    fn test_layered_without_file_uses_defaults() {
        let config = load_layered_config(None, Overrides::default()).unwrap();
        assert_eq!(config.sync.concurrency, 5);
        assert_eq!(config.sync.cover_size, 150);
    }
}
