//! Read-only view of the package directories
//!
//! Nothing here copies, deletes or loads anything. It answers "what is
//! staged and what would the next pass pick up" for a host that is not
//! running.

use super::error::StagingError;
use super::package::{self, PackageInfo};
use super::staging::{self, ModuleLayout, StagingOptions};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// A package in the managed directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedPackage {
    #[serde(flatten)]
    pub info: PackageInfo,
    /// Why the package would fail to load, if it would
    pub problem: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    /// Managed packages sorted by file name
    pub managed: Vec<ManagedPackage>,
    /// Inbound candidates not present in the managed directory yet
    pub pending: Vec<String>,
}

/// Describe the managed directory and the inbound candidates still to be
/// staged. Pending packages are only listed when `auto_copy` is on.
pub fn inventory(
    layout: &ModuleLayout,
    options: &StagingOptions,
) -> Result<Inventory, StagingError> {
    let managed: Vec<ManagedPackage> =
        list_if_present(&layout.managed_dir, &layout.package_extension)?
            .iter()
            .map(|path| match package::describe(path) {
                Ok(info) => ManagedPackage {
                    info,
                    problem: None,
                },
                Err(e) => ManagedPackage {
                    info: placeholder(path),
                    problem: Some(e.to_string()),
                },
            })
            .collect();

    let mut pending = Vec::new();
    if options.auto_copy {
        let staged: HashSet<&str> = managed.iter().map(|p| p.info.identity.as_str()).collect();
        for path in list_if_present(&layout.inbound_dir, &layout.package_extension)? {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if staged.contains(name) {
                continue;
            }
            if let Ok(true) = staging::is_candidate(&path, layout, options.allow_foreign_modules) {
                pending.push(name.to_string());
            }
        }
    }

    Ok(Inventory { managed, pending })
}

/// A directory that does not exist yet holds no packages
fn list_if_present(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, StagingError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    staging::list_packages(dir, extension)
}

fn placeholder(path: &Path) -> PackageInfo {
    let parsed = path
        .file_name()
        .map(|name| package::PackageName::parse(&name.to_string_lossy()));
    match parsed {
        Some(parsed) => PackageInfo {
            display_name: parsed.base,
            version: parsed
                .version
                .unwrap_or_else(|| package::UNKNOWN_VERSION.to_string()),
            description: None,
            identity: parsed.file_name,
        },
        None => PackageInfo {
            identity: path.display().to_string(),
            display_name: path.display().to_string(),
            version: package::UNKNOWN_VERSION.to_string(),
            description: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn module_package(path: &std::path::Path, name: &str, version: &str) {
        let file = fs::File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        zip.start_file(package::MANIFEST_ENTRY, SimpleFileOptions::default())
            .unwrap();
        write!(zip, "name = \"{}\"\nversion = \"{}\"\n", name, version).unwrap();
        zip.finish().unwrap();
    }

    fn file_names(dir: &std::path::Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_inventory_leaves_directories_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ModuleLayout::new(dir.path().join("plugins"), dir.path().join("modules"));
        fs::create_dir_all(&layout.inbound_dir).unwrap();
        fs::create_dir_all(&layout.managed_dir).unwrap();
        module_package(&layout.managed_dir.join("Foo-1.0.jar"), "Foo", "1.0");
        fs::write(layout.managed_dir.join("Broken-2.0.jar"), b"not a zip").unwrap();
        module_package(&layout.inbound_dir.join("Foo-1.1.jar"), "Foo", "1.1");
        module_package(&layout.inbound_dir.join("Foo-1.0.jar"), "Foo", "1.0");

        let options = StagingOptions {
            auto_copy: true,
            delete_old_versions: true,
            ..Default::default()
        };
        let inventory = inventory(&layout, &options).unwrap();

        assert_eq!(file_names(&layout.managed_dir), vec!["Broken-2.0.jar", "Foo-1.0.jar"]);
        assert_eq!(inventory.pending, vec!["Foo-1.1.jar"]);

        let broken = &inventory.managed[0];
        assert_eq!(broken.info.identity, "Broken-2.0.jar");
        assert_eq!(broken.info.version, "2.0");
        assert!(broken.problem.is_some());

        let foo = &inventory.managed[1];
        assert_eq!(foo.info.display_name, "Foo");
        assert!(foo.problem.is_none());
    }

    #[test]
    fn test_pending_requires_auto_copy() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ModuleLayout::new(dir.path().join("plugins"), dir.path().join("modules"));
        fs::create_dir_all(&layout.inbound_dir).unwrap();
        fs::create_dir_all(&layout.managed_dir).unwrap();
        module_package(&layout.inbound_dir.join("Foo-1.1.jar"), "Foo", "1.1");

        let inventory = inventory(&layout, &StagingOptions::default()).unwrap();
        assert!(inventory.pending.is_empty());
        assert!(inventory.managed.is_empty());
    }

    #[test]
    fn test_missing_directories_are_empty() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ModuleLayout::new(dir.path().join("plugins"), dir.path().join("modules"));
        let options = StagingOptions {
            auto_copy: true,
            ..Default::default()
        };

        assert_eq!(inventory(&layout, &options).unwrap(), Inventory::default());
        assert!(!layout.managed_dir.exists());
    }
}
