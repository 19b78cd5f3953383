//! Configuration loaded from `~/.config/pkgsum/config.toml`.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Global configuration. Every field has a working default so a missing or
/// empty file is fine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PkgsumConfig {
    /// Root directory of package manifests scanned by the filesystem
    /// inventory. `--root` on the CLI overrides this.
    #[serde(default)]
    pub manifest_root: Option<PathBuf>,
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("pkgsum")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<PkgsumConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = PkgsumConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: PkgsumConfig = toml::from_str(&data)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_no_manifest_root() {
        assert!(PkgsumConfig::default().manifest_root.is_none());
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = PkgsumConfig {
            manifest_root: Some(PathBuf::from("/var/lib/pkgsum/manifests")),
        };
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: PkgsumConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.manifest_root, cfg.manifest_root);
    }

    #[test]
    fn empty_config_parses_to_defaults() {
        let cfg: PkgsumConfig = toml::from_str("").unwrap();
        assert!(cfg.manifest_root.is_none());
    }
}
