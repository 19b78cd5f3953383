//! Platform inventory: which packages are installed and where their
//! installer files live.
//!
//! The inventory is an external collaborator, injected into the registry
//! behind [`InventorySource`]. The shipped implementation, [`FsInventory`],
//! reads a directory of per-package TOML manifests: one `<package-id>.toml`
//! per installed package, e.g.
//!
//! ```toml
//! package = "org.example.editor"
//! name = "Example Editor"
//! version = "1.2.3"
//! installer = "pool/example-editor_1.2.3.deb"
//! ```
//!
//! Relative `installer` paths resolve against the manifest root. The
//! installed set can change while we are reading it, so per-package failures
//! during enumeration are skipped, not fatal; only a failed directory read
//! aborts the whole listing.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// One installed package as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageMeta {
    pub package_id: String,
    pub display_name: String,
    pub version_name: String,
    /// Current location of the installer file; used only to compute checksums.
    pub install_path: PathBuf,
}

/// Source of truth for what is installed right now.
pub trait InventorySource: Send + Sync {
    /// Enumerate installed packages. Entries that cannot be resolved are
    /// omitted; a total query failure is `Error::Enumeration`.
    fn list_installed_packages(&self) -> Result<Vec<PackageMeta>>;

    /// Resolve the current installer path for one package. `NotFound` if the
    /// package has since been uninstalled.
    fn resolve_install_path(&self, package_id: &str) -> Result<PathBuf>;
}

#[derive(Debug, Deserialize)]
struct Manifest {
    package: String,
    name: String,
    version: String,
    installer: PathBuf,
}

/// Inventory backed by a directory of package manifests.
#[derive(Debug, Clone)]
pub struct FsInventory {
    root: PathBuf,
}

impl FsInventory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn manifest_path(&self, package_id: &str) -> PathBuf {
        self.root.join(format!("{package_id}.toml"))
    }

    fn read_manifest(&self, path: &Path) -> Result<Manifest> {
        let data = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::NotFound(path.display().to_string())
            } else {
                Error::Io {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })?;
        toml::from_str(&data).map_err(|e| {
            // A corrupt manifest means the package cannot be resolved.
            tracing::warn!(manifest = %path.display(), error = %e, "unparsable package manifest");
            Error::NotFound(path.display().to_string())
        })
    }

    fn meta_from_manifest(&self, manifest: Manifest) -> PackageMeta {
        let install_path = if manifest.installer.is_absolute() {
            manifest.installer
        } else {
            self.root.join(manifest.installer)
        };
        PackageMeta {
            package_id: manifest.package,
            display_name: manifest.name,
            version_name: manifest.version,
            install_path,
        }
    }
}

impl InventorySource for FsInventory {
    fn list_installed_packages(&self) -> Result<Vec<PackageMeta>> {
        let entries = fs::read_dir(&self.root)
            .map_err(|e| Error::Enumeration(format!("read {}: {e}", self.root.display())))?;

        let mut packages = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(root = %self.root.display(), error = %e, "skipping unreadable directory entry");
                    continue;
                }
            };
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("toml") {
                continue;
            }
            let manifest = match self.read_manifest(&path) {
                Ok(manifest) => manifest,
                Err(e) => {
                    tracing::warn!(manifest = %path.display(), error = %e, "skipping package manifest");
                    continue;
                }
            };
            // The file name is how resolve_install_path finds the manifest
            // again; a mismatched `package` field would make the entry
            // unresolvable, so skip it up front.
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
            if stem != manifest.package {
                tracing::warn!(
                    manifest = %path.display(),
                    package = %manifest.package,
                    "manifest file name does not match its package id, skipping"
                );
                continue;
            }
            packages.push(self.meta_from_manifest(manifest));
        }
        tracing::debug!(root = %self.root.display(), count = packages.len(), "enumerated packages");
        Ok(packages)
    }

    fn resolve_install_path(&self, package_id: &str) -> Result<PathBuf> {
        let path = self.manifest_path(package_id);
        let manifest = self.read_manifest(&path).map_err(|e| match e {
            // Report the package, not the manifest file, as missing.
            Error::NotFound(_) => Error::NotFound(package_id.to_owned()),
            other => other,
        })?;
        Ok(self.meta_from_manifest(manifest).install_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_manifest(dir: &Path, id: &str, body: &str) {
        let mut f = fs::File::create(dir.join(format!("{id}.toml"))).unwrap();
        f.write_all(body.as_bytes()).unwrap();
    }

    fn manifest_body(id: &str, name: &str, installer: &str) -> String {
        format!(
            "package = \"{id}\"\nname = \"{name}\"\nversion = \"1.0.0\"\ninstaller = \"{installer}\"\n"
        )
    }

    #[test]
    fn lists_packages_and_resolves_relative_installer_paths() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(
            dir.path(),
            "org.example.editor",
            &manifest_body("org.example.editor", "Editor", "pool/editor.deb"),
        );
        let inv = FsInventory::new(dir.path());
        let packages = inv.list_installed_packages().unwrap();
        assert_eq!(packages.len(), 1);
        assert_eq!(packages[0].package_id, "org.example.editor");
        assert_eq!(packages[0].display_name, "Editor");
        assert_eq!(packages[0].install_path, dir.path().join("pool/editor.deb"));
    }

    #[test]
    fn corrupt_manifest_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(
            dir.path(),
            "good.app",
            &manifest_body("good.app", "Good", "good.deb"),
        );
        write_manifest(dir.path(), "bad.app", "package = 42\nnot toml at all {{{");
        let inv = FsInventory::new(dir.path());
        let packages = inv.list_installed_packages().unwrap();
        assert_eq!(packages.len(), 1);
        assert_eq!(packages[0].package_id, "good.app");
    }

    #[test]
    fn mismatched_file_name_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(
            dir.path(),
            "wrong.name",
            &manifest_body("actual.id", "Mismatch", "x.deb"),
        );
        let inv = FsInventory::new(dir.path());
        assert!(inv.list_installed_packages().unwrap().is_empty());
    }

    #[test]
    fn missing_root_is_enumeration_error() {
        let dir = tempfile::tempdir().unwrap();
        let inv = FsInventory::new(dir.path().join("gone"));
        let err = inv.list_installed_packages().unwrap_err();
        assert!(matches!(err, Error::Enumeration(_)), "got {err:?}");
    }

    #[test]
    fn resolve_install_path_missing_package_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let inv = FsInventory::new(dir.path());
        let err = inv.resolve_install_path("com.gone.app").unwrap_err();
        match err {
            Error::NotFound(id) => assert_eq!(id, "com.gone.app"),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn resolve_install_path_finds_existing_package() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(
            dir.path(),
            "org.example.editor",
            &manifest_body("org.example.editor", "Editor", "/opt/pkgs/editor.deb"),
        );
        let inv = FsInventory::new(dir.path());
        let path = inv.resolve_install_path("org.example.editor").unwrap();
        assert_eq!(path, PathBuf::from("/opt/pkgs/editor.deb"));
    }
}
