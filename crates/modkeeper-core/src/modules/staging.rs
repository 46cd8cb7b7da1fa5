//! Filesystem staging
//!
//! Copies packages from the inbound directory into the managed directory,
//! pruning stale versions first. Everything here is blocking `std::fs` work
//! and is driven from `spawn_blocking` by the manager.

use super::error::StagingError;
use super::package::{self, PackageName};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Directories and naming used by the module manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleLayout {
    /// Where operators drop new packages
    pub inbound_dir: PathBuf,
    /// Packages the manager loads from
    pub managed_dir: PathBuf,
    pub package_extension: String,
    /// File name of the host's own package, never treated as a foreign module
    pub host_package: Option<String>,
}

impl ModuleLayout {
    pub fn new(inbound_dir: impl Into<PathBuf>, managed_dir: impl Into<PathBuf>) -> Self {
        Self {
            inbound_dir: inbound_dir.into(),
            managed_dir: managed_dir.into(),
            package_extension: "jar".to_string(),
            host_package: None,
        }
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.package_extension = extension.into();
        self
    }

    pub fn with_host_package(mut self, file_name: impl Into<String>) -> Self {
        self.host_package = Some(file_name.into());
        self
    }
}

/// Switches controlling a staging pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagingOptions {
    pub auto_copy: bool,
    pub delete_old_versions: bool,
    pub allow_foreign_modules: bool,
    pub additional_modules: Vec<String>,
}

/// What a staging pass did
#[derive(Debug, Default)]
pub struct StagingReport {
    /// Packages copied into the managed directory
    pub copied: Vec<String>,
    /// Candidates already present in the managed directory
    pub already_present: Vec<String>,
    /// Stale versions deleted from the managed directory
    pub pruned: Vec<String>,
    /// Inbound packages that are not modules
    pub rejected: Vec<String>,
    /// Older inbound versions skipped in favour of a newer one
    pub superseded: Vec<String>,
    pub errors: Vec<StagingError>,
}

impl StagingReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Package files with `extension` in `dir`, sorted by file name
pub fn list_packages(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, StagingError> {
    let entries = fs::read_dir(dir).map_err(|source| StagingError::ReadDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut packages: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && has_extension(path, extension))
        .collect();
    packages.sort();
    Ok(packages)
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}

/// Whether an inbound package should be staged. An archive that cannot be
/// read is never a candidate.
pub fn is_candidate(
    path: &Path,
    layout: &ModuleLayout,
    allow_foreign: bool,
) -> Result<bool, StagingError> {
    let has_manifest =
        package::contains_manifest(path).map_err(|e| StagingError::Inspect {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    if has_manifest {
        return Ok(true);
    }
    if !allow_foreign {
        return Ok(false);
    }

    let file_name = path.file_name().and_then(|n| n.to_str());
    Ok(!matches!((&layout.host_package, file_name), (Some(host), Some(name)) if host == name))
}

/// Delete every managed package sharing `keep`'s base name except `keep`
pub fn prune_stale(
    managed_dir: &Path,
    extension: &str,
    keep: &PackageName,
    report: &mut StagingReport,
) {
    let packages = match list_packages(managed_dir, extension) {
        Ok(packages) => packages,
        Err(e) => {
            warn!("Skipping prune for {}: {}", keep.base, e);
            report.errors.push(e);
            return;
        }
    };

    for path in packages {
        let Some(existing) = PackageName::from_path(&path) else {
            continue;
        };
        if existing.base != keep.base || existing.file_name == keep.file_name {
            continue;
        }

        match fs::remove_file(&path) {
            Ok(()) => {
                info!("Deleted old module version: {}", existing.file_name);
                report.pruned.push(existing.file_name);
            }
            Err(source) => {
                warn!("Failed to delete old module version {}: {}", existing.file_name, source);
                report.errors.push(StagingError::Delete { path, source });
            }
        }
    }
}

/// Copy `source` into `managed_dir` unless a file with the same name exists
pub fn copy_if_absent(source: &Path, managed_dir: &Path, report: &mut StagingReport) -> bool {
    let Some(file_name) = source.file_name() else {
        return false;
    };
    let name = file_name.to_string_lossy().to_string();
    let target = managed_dir.join(file_name);

    if target.exists() {
        debug!("Module {} already staged", name);
        report.already_present.push(name);
        return false;
    }

    match fs::copy(source, &target) {
        Ok(_) => {
            info!("Copied module {} to {:?}", name, managed_dir);
            report.copied.push(name);
            true
        }
        Err(e) => {
            warn!("Failed to copy module {}: {}", name, e);
            report.errors.push(StagingError::Copy {
                from: source.to_path_buf(),
                to: target,
                source: e,
            });
            false
        }
    }
}

fn stage_one(path: &Path, layout: &ModuleLayout, options: &StagingOptions, report: &mut StagingReport) {
    let Some(parsed) = PackageName::from_path(path) else {
        return;
    };
    if options.delete_old_versions {
        prune_stale(&layout.managed_dir, &layout.package_extension, &parsed, report);
    }
    copy_if_absent(path, &layout.managed_dir, report);
}

/// Newest package per base name among everything offered in one pass
#[derive(Default)]
struct Selection {
    newest: HashMap<String, (PathBuf, PackageName)>,
}

impl Selection {
    fn offer(&mut self, path: PathBuf, report: &mut StagingReport) {
        let Some(parsed) = PackageName::from_path(&path) else {
            return;
        };

        match self.newest.remove(&parsed.base) {
            Some((current_path, current)) if current.cmp_version(&parsed).is_ge() => {
                if current.file_name != parsed.file_name {
                    report.superseded.push(parsed.file_name);
                }
                self.newest
                    .insert(current.base.clone(), (current_path, current));
            }
            Some((_, current)) => {
                report.superseded.push(current.file_name);
                self.newest.insert(parsed.base.clone(), (path, parsed));
            }
            None => {
                self.newest.insert(parsed.base.clone(), (path, parsed));
            }
        }
    }

    fn into_sorted(self) -> Vec<PathBuf> {
        let mut selected: Vec<PathBuf> = self.newest.into_values().map(|(path, _)| path).collect();
        selected.sort();
        selected
    }
}

/// Run a full staging pass.
///
/// `additional` holds the configured additional modules with the package
/// the component index resolved for each (`None` when unresolvable).
/// Inbound and additional packages compete for the same base name, and only
/// the newest of them is staged.
pub fn stage(
    layout: &ModuleLayout,
    options: &StagingOptions,
    additional: &[(String, Option<PathBuf>)],
) -> StagingReport {
    let mut report = StagingReport::default();
    let mut selection = Selection::default();

    if options.auto_copy {
        match list_packages(&layout.inbound_dir, &layout.package_extension) {
            Ok(inbound) => {
                for path in inbound {
                    match is_candidate(&path, layout, options.allow_foreign_modules) {
                        Ok(true) => selection.offer(path, &mut report),
                        Ok(false) => {
                            debug!("Ignoring non-module package {:?}", path);
                            if let Some(name) = path.file_name() {
                                report.rejected.push(name.to_string_lossy().to_string());
                            }
                        }
                        Err(e) => {
                            warn!("{}", e);
                            if let Some(name) = path.file_name() {
                                report.rejected.push(name.to_string_lossy().to_string());
                            }
                            report.errors.push(e);
                        }
                    }
                }
            }
            Err(e) => {
                warn!("Cannot scan inbound directory: {}", e);
                report.errors.push(e);
            }
        }
    }

    for (name, resolved) in additional {
        match resolved {
            Some(path) if path.is_file() => {
                debug!("Offering additional module {} from {:?}", name, path);
                selection.offer(path.clone(), &mut report);
            }
            _ => {
                warn!("Additional module not found: {}", name);
                report.errors.push(StagingError::Unresolved(name.clone()));
            }
        }
    }

    for path in selection.into_sorted() {
        stage_one(&path, layout, options, &mut report);
    }

    report
}
