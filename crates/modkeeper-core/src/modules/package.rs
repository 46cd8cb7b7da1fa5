//! Package files: naming contract and manifest access
//!
//! A package is a zip archive named `<base>-<version>.<ext>`. The version is
//! the segment after the last hyphen and must start with an ASCII digit;
//! otherwise the whole stem is the base name.

use super::error::{ModuleError, ModuleResult};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Archive entry marking a package as a managed module
pub const MANIFEST_ENTRY: &str = "module.toml";

/// Version used when neither manifest nor file name carries one
pub const UNKNOWN_VERSION: &str = "unknown";

/// Contents of `module.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleManifest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// File name split into base name and version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageName {
    pub file_name: String,
    pub base: String,
    pub version: Option<String>,
}

impl PackageName {
    pub fn parse(file_name: &str) -> Self {
        let stem = match file_name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => file_name,
        };

        let (base, version) = match stem.rsplit_once('-') {
            Some((base, version))
                if !base.is_empty()
                    && version.chars().next().is_some_and(|c| c.is_ascii_digit()) =>
            {
                (base.to_string(), Some(version.to_string()))
            }
            _ => (stem.to_string(), None),
        };

        Self {
            file_name: file_name.to_string(),
            base,
            version,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.file_name()
            .and_then(|name| name.to_str())
            .map(Self::parse)
    }

    /// Ordering used to pick the newest of several candidates
    pub fn cmp_version(&self, other: &Self) -> Ordering {
        match (&self.version, &other.version) {
            (Some(a), Some(b)) => compare_versions(a, b),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => Ordering::Equal,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum VersionPart {
    Num(u64),
    Text(String),
}

fn version_parts(version: &str) -> Vec<VersionPart> {
    version
        .split(['.', '-', '_', '+'])
        .filter(|part| !part.is_empty())
        .map(|part| match part.parse::<u64>() {
            Ok(n) => VersionPart::Num(n),
            Err(_) => VersionPart::Text(part.to_ascii_lowercase()),
        })
        .collect()
}

/// Numbers beat qualifiers, and a missing part beats a qualifier, so
/// `2.0-SNAPSHOT < 2.0 < 2.0.1`.
fn compare_parts(a: Option<&VersionPart>, b: Option<&VersionPart>) -> Ordering {
    use VersionPart::{Num, Text};

    match (a, b) {
        (None, None) => Ordering::Equal,
        (Some(Num(x)), Some(Num(y))) => x.cmp(y),
        (Some(Text(x)), Some(Text(y))) => x.cmp(y),
        (Some(Num(_)), _) => Ordering::Greater,
        (_, Some(Num(_))) => Ordering::Less,
        (Some(Text(_)), None) => Ordering::Less,
        (None, Some(Text(_))) => Ordering::Greater,
    }
}

/// Compare dotted versions numerically where possible (`1.10 > 1.9`)
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let left = version_parts(a);
    let right = version_parts(b);

    (0..left.len().max(right.len()))
        .map(|i| compare_parts(left.get(i), right.get(i)))
        .find(|ordering| ordering.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// Names and version of a package, from its manifest with file-name
/// placeholders
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInfo {
    /// Package file name
    pub identity: String,
    pub display_name: String,
    pub version: String,
    pub description: Option<String>,
}

/// Read the manifest of `path`, falling back to the base name and the file
/// name version (or [`UNKNOWN_VERSION`]) where it is silent
pub fn describe(path: &Path) -> ModuleResult<PackageInfo> {
    let parsed = PackageName::from_path(path).ok_or_else(|| ModuleError::InvalidPackage {
        path: path.to_path_buf(),
        reason: "file name is not valid UTF-8".to_string(),
    })?;
    let manifest = read_manifest(path)?.unwrap_or_default();

    Ok(PackageInfo {
        display_name: manifest.name.unwrap_or_else(|| parsed.base.clone()),
        version: manifest
            .version
            .or(parsed.version)
            .unwrap_or_else(|| UNKNOWN_VERSION.to_string()),
        description: manifest.description,
        identity: parsed.file_name,
    })
}

/// Whether the archive at `path` carries a `module.toml` entry
pub fn contains_manifest(path: &Path) -> ModuleResult<bool> {
    let mut archive = open_archive(path)?;
    let found = archive.by_name(MANIFEST_ENTRY).is_ok();
    Ok(found)
}

/// Read and parse `module.toml`, `None` when the archive has no manifest
pub fn read_manifest(path: &Path) -> ModuleResult<Option<ModuleManifest>> {
    let mut archive = open_archive(path)?;
    let mut entry = match archive.by_name(MANIFEST_ENTRY) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => {
            return Err(ModuleError::InvalidPackage {
                path: path.to_path_buf(),
                reason: e.to_string(),
            });
        }
    };

    let mut content = String::new();
    entry.read_to_string(&mut content)?;

    toml::from_str::<ModuleManifest>(&content)
        .map(Some)
        .map_err(|e| ModuleError::Manifest {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

fn open_archive(path: &Path) -> ModuleResult<zip::ZipArchive<File>> {
    if !path.is_file() {
        return Err(ModuleError::NotFound(path.to_path_buf()));
    }
    let file = File::open(path)?;
    zip::ZipArchive::new(file).map_err(|e| ModuleError::InvalidPackage {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn write_zip(path: &Path, entries: &[(&str, &str)]) {
        let file = File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        for (name, content) in entries {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn test_parse_versioned_name() {
        let name = PackageName::parse("Foo-1.1.jar");
        assert_eq!(name.base, "Foo");
        assert_eq!(name.version.as_deref(), Some("1.1"));
    }

    #[test]
    fn test_parse_hyphenated_base() {
        let name = PackageName::parse("Foo-Bar-1.0.jar");
        assert_eq!(name.base, "Foo-Bar");
        assert_eq!(name.version.as_deref(), Some("1.0"));

        let unversioned = PackageName::parse("Foo-Bar.jar");
        assert_eq!(unversioned.base, "Foo-Bar");
        assert!(unversioned.version.is_none());
    }

    #[test]
    fn test_parse_without_version() {
        let name = PackageName::parse("Standalone.jar");
        assert_eq!(name.base, "Standalone");
        assert!(name.version.is_none());

        let no_ext = PackageName::parse("Tool-2");
        assert_eq!(no_ext.base, "Tool");
        assert_eq!(no_ext.version.as_deref(), Some("2"));
    }

    #[test]
    fn test_version_ordering() {
        assert_eq!(compare_versions("1.10", "1.9"), Ordering::Greater);
        assert_eq!(compare_versions("1.0", "1.0"), Ordering::Equal);
        assert_eq!(compare_versions("1.0.1", "1.0"), Ordering::Greater);

        let old = PackageName::parse("Foo-1.0.jar");
        let new = PackageName::parse("Foo-1.1.jar");
        assert_eq!(new.cmp_version(&old), Ordering::Greater);
    }

    #[test]
    fn test_prerelease_sorts_below_release() {
        assert_eq!(compare_versions("2.0-SNAPSHOT", "2.0"), Ordering::Less);
        assert_eq!(compare_versions("2.0", "2.0-rc1"), Ordering::Greater);
        assert_eq!(compare_versions("2.0-rc1", "2.0-rc2"), Ordering::Less);
        assert_eq!(compare_versions("2.0.1", "2.0-SNAPSHOT"), Ordering::Greater);
        assert_eq!(compare_versions("2.0-SNAPSHOT", "1.9"), Ordering::Greater);

        let release = PackageName::parse("Foo-2.0.jar");
        let candidate = PackageName::parse("Foo-2.0.rc1.jar");
        assert_eq!(candidate.version.as_deref(), Some("2.0.rc1"));
        assert_eq!(release.cmp_version(&candidate), Ordering::Greater);
    }

    #[test]
    fn test_manifest_detection() {
        let dir = tempfile::tempdir().unwrap();
        let managed = dir.path().join("Economy-1.0.jar");
        let foreign = dir.path().join("Other-1.0.jar");
        write_zip(
            &managed,
            &[(MANIFEST_ENTRY, "name = \"Economy\"\nversion = \"1.0.3\"\n")],
        );
        write_zip(&foreign, &[("plugin.yml", "name: Other\n")]);

        assert!(contains_manifest(&managed).unwrap());
        assert!(!contains_manifest(&foreign).unwrap());

        let manifest = read_manifest(&managed).unwrap().unwrap();
        assert_eq!(manifest.name.as_deref(), Some("Economy"));
        assert_eq!(manifest.version.as_deref(), Some("1.0.3"));
        assert!(read_manifest(&foreign).unwrap().is_none());
    }

    #[test]
    fn test_not_a_zip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Broken-1.0.jar");
        std::fs::write(&path, b"not a zip").unwrap();
        assert!(matches!(
            contains_manifest(&path),
            Err(ModuleError::InvalidPackage { .. })
        ));
    }
}
