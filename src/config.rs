use crate::store::StoreOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Contents of `egcgraph.toml`; every field can be overridden on the command line
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct EgcConfig {
    pub data_file: Option<String>,
    pub backup: Option<bool>,
    pub autosave: Option<bool>,
}

impl EgcConfig {
    /// Store options; `--backup` forces backups on, `--dry-run` turns saving off
    pub fn store_options(&self, backup: bool, dry_run: bool) -> StoreOptions {
        StoreOptions {
            backup: backup || self.backup.unwrap_or(false),
            autosave: !dry_run && self.autosave.unwrap_or(true),
        }
    }

    /// Data file: the command line argument, else the configured one
    pub fn data_file(&self, cli: Option<&Path>) -> Option<PathBuf> {
        cli.map(Path::to_path_buf)
            .or_else(|| self.data_file.as_ref().map(PathBuf::from))
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("egcgraph.toml")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<EgcConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: EgcConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &EgcConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("egcgraph.toml");
        let config = EgcConfig {
            data_file: Some("data/egc.tsv".into()),
            backup: Some(true),
            autosave: None,
        };
        write_config(&path, &config, false).unwrap();
        assert!(write_config(&path, &config, false).is_err());
        assert_eq!(load_config(Some(&path)).unwrap(), Some(config));
        assert_eq!(load_config(Some(&dir.path().join("absent.toml"))).unwrap(), None);
    }

    #[test]
    fn test_cli_overrides() {
        let config: EgcConfig = toml::from_str("data_file = \"a.egc\"\nautosave = false\n").unwrap();
        assert_eq!(config.data_file(None), Some(PathBuf::from("a.egc")));
        assert_eq!(config.data_file(Some(Path::new("b.egc"))), Some(PathBuf::from("b.egc")));

        let options = config.store_options(false, false);
        assert!(!options.autosave);
        assert!(!options.backup);
        assert!(config.store_options(true, false).backup);

        let defaults = EgcConfig::default();
        assert!(defaults.store_options(false, false).autosave);
        assert!(!defaults.store_options(false, true).autosave);
    }
}
