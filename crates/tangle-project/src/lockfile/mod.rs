//! Lock file (`obj/project.assets.json`) parsing
//!
//! The lock file is written by a restore. Per target framework it lists
//! every resolved library under an `Id/Version` key; runtime-specific
//! sections (`net8.0/win-x64`) are ignored.

use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;
use tracing::debug;

use tangle_core::error::TangleError;
use tangle_core::types::{Dependency, PackageId, TargetFramework, Version, VersionRange};
use tangle_core::utils::normalize_path;

use crate::snapshot::{LibraryKind, LockLibrary};
use crate::ProjectResult;

/// File name of the lock file inside the intermediate output folder
pub const LOCK_FILE_NAME: &str = "project.assets.json";

/// Parsed lock file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LockFile {
    pub version: u32,
    targets: IndexMap<String, IndexMap<String, TargetLibrary>>,
    libraries: IndexMap<String, LibraryEntry>,
    project: ProjectSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct TargetLibrary {
    #[serde(rename = "type")]
    kind: Option<String>,
    dependencies: IndexMap<String, String>,
    #[serde(rename = "frameworkAssemblies")]
    framework_assemblies: Vec<String>,
    runtime: IndexMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct LibraryEntry {
    #[serde(rename = "type")]
    kind: Option<String>,
    path: Option<String>,
    #[serde(rename = "msbuildProject")]
    msbuild_project: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ProjectSection {
    frameworks: IndexMap<String, ProjectFramework>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ProjectFramework {
    dependencies: IndexMap<String, DirectDependency>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum DirectDependency {
    Range(String),
    Detailed { version: Option<String> },
}

/// Parse lock file content
pub fn parse_lock_file(content: &str) -> ProjectResult<LockFile> {
    serde_json::from_str(content).map_err(|e| TangleError::ProjectLoad {
        path: LOCK_FILE_NAME.to_string(),
        reason: format!("Invalid lock file: {}", e),
    })
}

impl LockFile {
    /// Frameworks the lock file has target sections for, in file order
    pub fn frameworks(&self) -> Vec<TargetFramework> {
        let declared = self.project.frameworks.keys();
        let targets = self.targets.keys().filter(|key| !key.contains('/'));
        declared
            .chain(targets)
            .filter_map(|key| TargetFramework::parse(key).ok())
            .fold(Vec::new(), |mut frameworks, framework| {
                if !frameworks.iter().any(|known: &TargetFramework| known.same_target(&framework)) {
                    frameworks.push(framework);
                }
                frameworks
            })
    }

    /// Target section for `framework`, an exact key before one that only
    /// differs by a platform version the restore filled in
    fn target(&self, framework: &TargetFramework) -> Option<&IndexMap<String, TargetLibrary>> {
        find_section(
            self.targets.iter().filter(|(key, _)| !key.contains('/')),
            framework,
        )
    }

    pub fn has_target(&self, framework: &TargetFramework) -> bool {
        self.target(framework).is_some()
    }

    /// Libraries resolved for `framework`
    ///
    /// Project library paths are resolved against `project_dir`.
    pub fn libraries_for(&self, framework: &TargetFramework, project_dir: &Path) -> ProjectResult<Vec<LockLibrary>> {
        let target = self.target(framework).ok_or_else(|| TangleError::ProjectLoad {
            path: LOCK_FILE_NAME.to_string(),
            reason: format!("Lock file has no target for {}", framework),
        })?;

        target
            .iter()
            .map(|(key, entry)| self.convert_library(key, entry, project_dir))
            .collect()
    }

    fn convert_library(&self, key: &str, entry: &TargetLibrary, project_dir: &Path) -> ProjectResult<LockLibrary> {
        let (id, version) = key.rsplit_once('/').ok_or_else(|| TangleError::ProjectLoad {
            path: LOCK_FILE_NAME.to_string(),
            reason: format!("Library key '{}' is not of the form Id/Version", key),
        })?;
        let version: Version = version.parse()?;
        let library = self.libraries.get(key);

        let kind_text = entry
            .kind
            .as_deref()
            .or_else(|| library.and_then(|library| library.kind.as_deref()));
        let kind = match kind_text {
            Some(text) if text.eq_ignore_ascii_case("project") => LibraryKind::Project,
            _ => LibraryKind::Package,
        };

        let path = match kind {
            LibraryKind::Project => library
                .and_then(|library| library.msbuild_project.as_deref().or(library.path.as_deref()))
                .map(|relative| normalize_path(&project_dir.join(relative.replace('\\', "/")))),
            LibraryKind::Package => None,
        };

        let dependencies = entry
            .dependencies
            .iter()
            .map(|(id, range)| Dependency::parse(id, range))
            .collect::<ProjectResult<Vec<_>>>()?;

        Ok(LockLibrary {
            id: PackageId::new(id),
            version,
            kind,
            path,
            framework_assemblies: entry.framework_assemblies.clone(),
            runtime_assemblies: entry.runtime.keys().cloned().collect(),
            dependencies,
        })
    }

    /// Packages the project itself references for `framework`
    pub fn direct_dependencies(&self, framework: &TargetFramework) -> ProjectResult<Vec<Dependency>> {
        let section = find_section(self.project.frameworks.iter(), framework);

        let Some(section) = section else {
            debug!("Lock file declares no direct dependencies for {}", framework);
            return Ok(Vec::new());
        };

        section
            .dependencies
            .iter()
            .map(|(id, dependency)| {
                let range = match dependency {
                    DirectDependency::Range(text) => VersionRange::parse(text)?,
                    DirectDependency::Detailed { version: Some(text) } => VersionRange::parse(text)?,
                    DirectDependency::Detailed { version: None } => VersionRange::all(),
                };
                Ok(Dependency::new(id.as_str(), range))
            })
            .collect()
    }
}

fn find_section<'a, T, I>(sections: I, framework: &TargetFramework) -> Option<&'a T>
where
    I: Iterator<Item = (&'a String, &'a T)> + Clone,
{
    let parsed = |(key, section): (&'a String, &'a T)| {
        TargetFramework::parse(key).ok().map(|tfm| (tfm, section))
    };
    sections
        .clone()
        .filter_map(parsed)
        .find(|(tfm, _)| tfm == framework)
        .or_else(|| sections.filter_map(parsed).find(|(tfm, _)| tfm.same_target(framework)))
        .map(|(_, section)| section)
}
