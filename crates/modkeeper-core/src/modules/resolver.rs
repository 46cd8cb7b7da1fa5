//! Lookup of additional modules in the host's component index

use super::package::{self, PackageName};
use super::staging;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Maps a component name to the package file that provides it
pub trait ComponentResolver: Send + Sync {
    fn resolve(&self, name: &str) -> Option<PathBuf>;
}

/// Fixed name -> package mapping
#[derive(Debug, Clone, Default)]
pub struct StaticComponentIndex {
    entries: HashMap<String, PathBuf>,
}

impl StaticComponentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_component(mut self, name: impl Into<String>, package: impl Into<PathBuf>) -> Self {
        self.entries.insert(name.into(), package.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, package: impl Into<PathBuf>) {
        self.entries.insert(name.into(), package.into());
    }
}

impl ComponentResolver for StaticComponentIndex {
    fn resolve(&self, name: &str) -> Option<PathBuf> {
        self.entries.get(name).cloned()
    }
}

/// Resolves components by scanning a directory of packages.
///
/// A package matches when its base name or manifest name equals the
/// requested name (ASCII case-insensitive). The newest version wins.
#[derive(Debug, Clone)]
pub struct DirectoryComponentIndex {
    dir: PathBuf,
    extension: String,
}

impl DirectoryComponentIndex {
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            extension: extension.into(),
        }
    }

    fn matches(path: &Path, parsed: &PackageName, name: &str) -> bool {
        if parsed.base.eq_ignore_ascii_case(name) {
            return true;
        }
        matches!(
            package::read_manifest(path),
            Ok(Some(manifest)) if manifest.name.as_deref().is_some_and(|n| n.eq_ignore_ascii_case(name))
        )
    }
}

impl ComponentResolver for DirectoryComponentIndex {
    fn resolve(&self, name: &str) -> Option<PathBuf> {
        let packages = match staging::list_packages(&self.dir, &self.extension) {
            Ok(packages) => packages,
            Err(e) => {
                debug!("Component index unavailable: {}", e);
                return None;
            }
        };

        packages
            .into_iter()
            .filter_map(|path| PackageName::from_path(&path).map(|parsed| (path, parsed)))
            .filter(|(path, parsed)| Self::matches(path, parsed, name))
            .max_by(|(_, a), (_, b)| a.cmp_version(b))
            .map(|(path, _)| path)
    }
}
