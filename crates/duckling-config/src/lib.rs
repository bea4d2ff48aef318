//! Configuration for the duckling migrator.
//!
//! Looks for `.config/duckling.styx` in the current directory or any parent
//! directory. Every field is optional:
//!
//! ```text
//! inline_indexes true
//! schema analytics
//! table_options "WITH (compression = 'zstd')"
//! ```

use facet::Facet;
use std::path::{Path, PathBuf};

/// Location of the config file, relative to a project directory.
pub const CONFIG_FILE: &str = ".config/duckling.styx";

/// Migrator configuration.
///
/// The defaults are what DuckDB accepts without surprises: indexes are
/// created after their table, and foreign keys are emitted.
#[derive(Debug, Clone, Default, PartialEq, Facet)]
pub struct Config {
    /// Declare indexes inside `CREATE TABLE` instead of creating them after.
    #[facet(default)]
    pub inline_indexes: bool,

    /// Leave FOREIGN KEY constraints out of `CREATE TABLE`.
    #[facet(default)]
    pub disable_foreign_keys: bool,

    /// Treat models as unrelated: no FOREIGN KEY constraints, no reordering.
    #[facet(default)]
    pub ignore_relationships: bool,

    /// Text appended after the closing parenthesis of `CREATE TABLE`.
    #[facet(default)]
    pub table_options: Option<String>,

    /// Schema used for unqualified table names (default: `CURRENT_SCHEMA()`).
    #[facet(default)]
    pub schema: Option<String>,
}

impl Config {
    /// Parse a config from Styx source.
    pub fn from_styx_str(source: &str) -> Result<Self, ConfigError> {
        facet_styx::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Whether `CREATE TABLE` should carry FOREIGN KEY constraints.
    pub fn emit_foreign_keys(&self) -> bool {
        !self.disable_foreign_keys && !self.ignore_relationships
    }
}

/// Load configuration from `.config/duckling.styx`, searching up the directory tree.
pub fn load() -> Result<(Config, PathBuf), ConfigError> {
    let cwd = std::env::current_dir().map_err(|e| ConfigError::Io(e.to_string()))?;
    load_from(&cwd)
}

/// Load configuration starting from a specific directory.
pub fn load_from(start: &Path) -> Result<(Config, PathBuf), ConfigError> {
    let config_path = find_config_file(start)?;
    let content =
        std::fs::read_to_string(&config_path).map_err(|e| ConfigError::Io(e.to_string()))?;
    let config = Config::from_styx_str(&content)?;
    Ok((config, config_path))
}

/// Like [`load`], but a missing file yields the default config.
pub fn load_or_default() -> Result<Config, ConfigError> {
    match load() {
        Ok((config, _)) => Ok(config),
        Err(ConfigError::NotFound) => Ok(Config::default()),
        Err(e) => Err(e),
    }
}

/// Find `.config/duckling.styx` by searching up the directory tree.
fn find_config_file(start: &Path) -> Result<PathBuf, ConfigError> {
    let mut current = start.to_path_buf();

    loop {
        let config_path = current.join(CONFIG_FILE);
        if config_path.exists() {
            return Ok(config_path);
        }

        if !current.pop() {
            return Err(ConfigError::NotFound);
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no .config/duckling.styx found in current directory or any parent")]
    NotFound,

    #[error("failed to read .config/duckling.styx: {0}")]
    Io(String),

    #[error("failed to parse .config/duckling.styx: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(!config.inline_indexes);
        assert!(config.emit_foreign_keys());
        assert_eq!(config.schema, None);
        assert_eq!(config.table_options, None);
    }

    #[test]
    fn test_ignore_relationships_disables_foreign_keys() {
        let config = Config {
            ignore_relationships: true,
            ..Config::default()
        };
        assert!(!config.emit_foreign_keys());
    }

    #[test]
    fn test_parse_partial_config() {
        let config = Config::from_styx_str("inline_indexes true\nschema analytics\n").unwrap();
        assert!(config.inline_indexes);
        assert!(!config.disable_foreign_keys);
        assert_eq!(config.schema.as_deref(), Some("analytics"));
    }

    #[test]
    fn test_find_config_walks_up() {
        let root = std::env::temp_dir().join(format!("duckling-config-{}", std::process::id()));
        let nested = root.join("a/b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::create_dir_all(root.join(".config")).unwrap();
        std::fs::write(root.join(CONFIG_FILE), "disable_foreign_keys true\n").unwrap();

        let (config, path) = load_from(&nested).unwrap();
        assert!(config.disable_foreign_keys);
        assert_eq!(path, root.join(CONFIG_FILE));

        std::fs::remove_dir_all(&root).unwrap();
    }
}
