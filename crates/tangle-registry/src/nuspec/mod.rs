//! Package manifest (`.nuspec`) parsing
//!
//! Only the parts the resolver needs are read: identity, dependency groups
//! and framework assembly references. Everything else in the manifest is
//! ignored.

use serde::Deserialize;
use tracing::debug;

use tangle_core::error::TangleError;
use tangle_core::types::{Dependency, PackageId, TargetFramework, Version, VersionRange};

use crate::api::FrameworkItems;
use crate::RegistryResult;

/// Dependencies a package declares for one framework
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyGroup {
    pub framework: TargetFramework,
    pub dependencies: Vec<Dependency>,
}

/// Parsed package manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageManifest {
    pub id: PackageId,
    pub version: Version,
    pub dependency_groups: Vec<DependencyGroup>,
    pub framework_assemblies: Vec<FrameworkItems>,
}

impl PackageManifest {
    /// Dependencies of the group nearest to `framework`; empty when no group
    /// is compatible
    pub fn dependencies_for(&self, framework: &TargetFramework) -> Vec<Dependency> {
        framework
            .nearest_index(self.dependency_groups.iter().map(|group| &group.framework))
            .map(|index| self.dependency_groups[index].dependencies.clone())
            .unwrap_or_default()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NuspecDocument {
    metadata: NuspecMetadata,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NuspecMetadata {
    id: String,
    version: String,
    dependencies: Option<NuspecDependencies>,
    #[serde(rename = "frameworkAssemblies")]
    framework_assemblies: Option<NuspecFrameworkAssemblies>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NuspecDependencies {
    #[serde(rename = "group")]
    groups: Vec<NuspecGroup>,
    #[serde(rename = "dependency")]
    dependencies: Vec<NuspecDependency>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NuspecGroup {
    #[serde(rename = "@targetFramework")]
    target_framework: Option<String>,
    #[serde(rename = "dependency")]
    dependencies: Vec<NuspecDependency>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NuspecDependency {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@version")]
    version: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NuspecFrameworkAssemblies {
    #[serde(rename = "frameworkAssembly")]
    assemblies: Vec<NuspecFrameworkAssembly>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NuspecFrameworkAssembly {
    #[serde(rename = "@assemblyName")]
    assembly_name: String,
    #[serde(rename = "@targetFramework")]
    target_framework: Option<String>,
}

/// Parse a manifest document
pub fn parse_manifest(xml: &str) -> RegistryResult<PackageManifest> {
    let document: NuspecDocument = quick_xml::de::from_str(xml).map_err(|e| TangleError::Archive {
        message: format!("Failed to parse package manifest: {}", e),
    })?;
    let metadata = document.metadata;

    if metadata.id.trim().is_empty() {
        return Err(TangleError::Archive {
            message: "Package manifest has no id".to_string(),
        });
    }
    let version: Version = metadata.version.parse()?;

    let mut dependency_groups = Vec::new();
    if let Some(dependencies) = metadata.dependencies {
        if !dependencies.dependencies.is_empty() {
            dependency_groups.push(DependencyGroup {
                framework: TargetFramework::any(),
                dependencies: convert_dependencies(dependencies.dependencies)?,
            });
        }
        for group in dependencies.groups {
            let framework = match group.target_framework.as_deref() {
                None => TargetFramework::any(),
                Some(text) => match TargetFramework::parse(text) {
                    Ok(framework) => framework,
                    Err(_) => {
                        debug!("Skipping dependency group for unsupported framework '{}'", text);
                        continue;
                    },
                },
            };
            dependency_groups.push(DependencyGroup {
                framework,
                dependencies: convert_dependencies(group.dependencies)?,
            });
        }
    }

    let mut framework_assemblies: Vec<FrameworkItems> = Vec::new();
    if let Some(assemblies) = metadata.framework_assemblies {
        for assembly in assemblies.assemblies {
            let frameworks = match assembly.target_framework.as_deref() {
                None => vec![TargetFramework::any()],
                Some(text) => text
                    .split(',')
                    .filter(|part| !part.trim().is_empty())
                    .filter_map(|part| TargetFramework::parse(part).ok())
                    .collect(),
            };
            let names: Vec<String> = assembly
                .assembly_name
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect();

            for framework in frameworks {
                match framework_assemblies.iter_mut().find(|group| group.framework == framework) {
                    Some(group) => group.items.extend(names.iter().cloned()),
                    None => framework_assemblies.push(FrameworkItems::new(framework, names.clone())),
                }
            }
        }
    }

    Ok(PackageManifest {
        id: PackageId::new(metadata.id.trim()),
        version,
        dependency_groups,
        framework_assemblies,
    })
}

fn convert_dependencies(raw: Vec<NuspecDependency>) -> RegistryResult<Vec<Dependency>> {
    raw.into_iter()
        .filter(|dependency| !dependency.id.trim().is_empty())
        .map(|dependency| {
            let range = match dependency.version.as_deref() {
                Some(text) => VersionRange::parse(text)?,
                None => VersionRange::all(),
            };
            Ok(Dependency::new(dependency.id.trim(), range))
        })
        .collect()
}
