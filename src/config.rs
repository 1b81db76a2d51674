use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Optional `socialkg.toml`. CLI flags override anything set here.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ServiceConfig {
    /// Path to the SQLite database file
    pub database: Option<String>,
    /// Listen address for `serve`
    pub host: Option<String>,
    pub port: Option<u16>,
}

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8769;

pub fn default_config_path() -> PathBuf {
    PathBuf::from("socialkg.toml")
}

pub fn default_database_path() -> PathBuf {
    PathBuf::from("data").join("socialkg.db")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<ServiceConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: ServiceConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &ServiceConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "config already exists at {} (use --force to overwrite)",
            path.display()
        );
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("socialkg.toml");

        let config = ServiceConfig {
            database: Some("data/kg.db".to_string()),
            host: None,
            port: Some(9000),
        };
        write_config(&path, &config, false).unwrap();

        let loaded = load_config(Some(&path)).unwrap().unwrap();
        assert_eq!(loaded.database.as_deref(), Some("data/kg.db"));
        assert_eq!(loaded.port, Some(9000));
        assert!(loaded.host.is_none());
    }

    #[test]
    fn test_write_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("socialkg.toml");

        write_config(&path, &ServiceConfig::default(), false).unwrap();
        assert!(write_config(&path, &ServiceConfig::default(), false).is_err());
        write_config(&path, &ServiceConfig::default(), true).unwrap();
    }

    #[test]
    fn test_missing_config_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(load_config(Some(&path)).unwrap().is_none());
    }

    #[test]
    fn test_ensure_db_dir_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("nested").join("deep").join("kg.db");
        ensure_db_dir(&db).unwrap();
        assert!(db.parent().unwrap().exists());
    }
}
