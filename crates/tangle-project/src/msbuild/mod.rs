//! Project file parsing
//!
//! Reads the target framework properties and the direct assembly
//! references of an MSBuild project. Conditions and imports are not
//! evaluated.

use std::path::Path;

use serde::Deserialize;

use tangle_core::error::TangleError;
use tangle_core::utils::item_file_name;

use crate::ProjectResult;

/// Project file extensions that can carry PackageReference items
pub const SUPPORTED_EXTENSIONS: &[&str] = &["csproj", "fsproj", "vbproj"];

/// Legacy package list that marks a project as not PackageReference-based
pub const PACKAGES_CONFIG: &str = "packages.config";

/// The parts of a project file the loader needs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectFile {
    pub target_framework: Option<String>,
    pub target_frameworks: Vec<String>,
    /// Direct assembly references by file name
    pub file_references: Vec<String>,
}

impl ProjectFile {
    /// The framework the project builds for when none is requested
    pub fn default_framework(&self) -> Option<&str> {
        self.target_framework
            .as_deref()
            .or_else(|| self.target_frameworks.first().map(String::as_str))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawProject {
    #[serde(rename = "PropertyGroup")]
    property_groups: Vec<RawPropertyGroup>,
    #[serde(rename = "ItemGroup")]
    item_groups: Vec<RawItemGroup>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPropertyGroup {
    #[serde(rename = "TargetFramework")]
    target_framework: Option<String>,
    #[serde(rename = "TargetFrameworks")]
    target_frameworks: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawItemGroup {
    #[serde(rename = "Reference")]
    references: Vec<RawReference>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawReference {
    #[serde(rename = "@Include")]
    include: String,
    #[serde(rename = "HintPath")]
    hint_path: Option<String>,
}

/// Parse project file content
pub fn parse_project_file(xml: &str) -> ProjectResult<ProjectFile> {
    let raw: RawProject = quick_xml::de::from_str(xml).map_err(|e| TangleError::ProjectLoad {
        path: "project file".to_string(),
        reason: format!("Invalid project XML: {}", e),
    })?;

    let mut project = ProjectFile::default();
    for group in raw.property_groups {
        if let Some(framework) = non_empty(group.target_framework) {
            project.target_framework.get_or_insert(framework);
        }
        if let Some(frameworks) = non_empty(group.target_frameworks) {
            if project.target_frameworks.is_empty() {
                project.target_frameworks = frameworks
                    .split(';')
                    .map(str::trim)
                    .filter(|framework| !framework.is_empty())
                    .map(str::to_string)
                    .collect();
            }
        }
    }

    project.file_references = raw
        .item_groups
        .into_iter()
        .flat_map(|group| group.references)
        .filter_map(reference_file_name)
        .collect();

    Ok(project)
}

/// Whether `path` has a supported project file extension
pub fn is_supported_project(path: &Path) -> bool {
    tangle_core::utils::get_extension(path)
        .map_or(false, |extension| SUPPORTED_EXTENSIONS.contains(&extension.as_str()))
}

/// `HintPath` file name, else the simple assembly name plus `.dll`
fn reference_file_name(reference: RawReference) -> Option<String> {
    if let Some(hint) = non_empty(reference.hint_path) {
        return Some(item_file_name(&hint).to_string());
    }
    // "System.Xml, Version=4.0.0.0, Culture=neutral"
    let name = reference.include.split(',').next().unwrap_or_default().trim();
    if name.is_empty() {
        None
    } else {
        Some(format!("{}.dll", name))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|text| text.trim().to_string()).filter(|text| !text.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sdk_style_project() {
        let xml = r#"
<Project Sdk="Microsoft.NET.Sdk">
  <PropertyGroup>
    <OutputType>Exe</OutputType>
    <TargetFramework>net48</TargetFramework>
  </PropertyGroup>
  <ItemGroup>
    <PackageReference Include="Serilog" Version="2.10.0" />
    <Reference Include="Vendor.Sdk">
      <HintPath>..\lib\Vendor.Sdk.dll</HintPath>
    </Reference>
    <Compile Include="Program.cs" />
    <Reference Include="System.Xml, Version=4.0.0.0, Culture=neutral" />
  </ItemGroup>
</Project>
"#;
        let project = parse_project_file(xml).unwrap();
        assert_eq!(project.default_framework(), Some("net48"));
        assert_eq!(project.file_references, vec!["Vendor.Sdk.dll", "System.Xml.dll"]);
    }

    #[test]
    fn test_multi_targeting() {
        let xml = r#"
<Project Sdk="Microsoft.NET.Sdk">
  <PropertyGroup>
    <TargetFrameworks> net8.0;netstandard2.0 </TargetFrameworks>
  </PropertyGroup>
  <PropertyGroup Condition="'$(Configuration)' == 'Release'">
    <Optimize>true</Optimize>
  </PropertyGroup>
</Project>
"#;
        let project = parse_project_file(xml).unwrap();
        assert!(project.target_framework.is_none());
        assert_eq!(project.target_frameworks, vec!["net8.0", "netstandard2.0"]);
        assert_eq!(project.default_framework(), Some("net8.0"));
        assert!(project.file_references.is_empty());
    }

    #[test]
    fn test_invalid_xml() {
        let result = parse_project_file("<Project><PropertyGroup></Project>");
        assert!(matches!(result, Err(TangleError::ProjectLoad { .. })));
    }

    #[test]
    fn test_supported_extensions() {
        assert!(is_supported_project(Path::new("App.csproj")));
        assert!(is_supported_project(Path::new("Lib.FSPROJ")));
        assert!(is_supported_project(Path::new("Legacy.vbproj")));
        assert!(!is_supported_project(Path::new("Native.vcxproj")));
        assert!(!is_supported_project(Path::new("App.sln")));
    }
}
