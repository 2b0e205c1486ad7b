//! Framework-aware asset selection
//!
//! For each asset category a package publishes, only the items of the
//! nearest compatible framework are used. A category with no compatible
//! framework contributes nothing.

use std::collections::HashSet;
use std::path::Path;

use serde::Serialize;

use tangle_core::types::TargetFramework;
use tangle_core::utils::{get_extension, item_file_name};
use tangle_registry::{FrameworkItems, PackageContents};

/// Library file extensions treated as binaries
const BINARY_EXTENSIONS: &[&str] = &["dll", "exe", "winmd"];

/// Marker file packages use to publish an empty folder
const EMPTY_FOLDER_MARKER: &str = "_._";

/// Items chosen for one package, by file or assembly name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SelectedAssets {
    pub libraries: Vec<String>,
    pub framework_assemblies: Vec<String>,
}

impl SelectedAssets {
    pub fn is_empty(&self) -> bool {
        self.libraries.is_empty() && self.framework_assemblies.is_empty()
    }

    /// Library names followed by framework assembly names
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.libraries
            .iter()
            .chain(self.framework_assemblies.iter())
            .map(String::as_str)
    }
}

/// Picks package items for a target framework
#[derive(Debug, Clone)]
pub struct AssetSelector {
    framework: TargetFramework,
}

impl AssetSelector {
    pub fn new(framework: TargetFramework) -> Self {
        Self { framework }
    }

    pub fn framework(&self) -> &TargetFramework {
        &self.framework
    }

    pub fn select(&self, contents: &PackageContents) -> SelectedAssets {
        SelectedAssets {
            libraries: self.select_libraries(&contents.library_items),
            framework_assemblies: self.select_framework_assemblies(&contents.framework_items),
        }
    }

    /// Binary file names from the nearest library folder
    pub fn select_libraries(&self, groups: &[FrameworkItems]) -> Vec<String> {
        let items = self.nearest_items(groups).filter(|item| {
            get_extension(Path::new(item))
                .map_or(false, |extension| BINARY_EXTENSIONS.contains(&extension.as_str()))
        });
        dedup_file_names(items)
    }

    /// Assembly names from the nearest framework assembly group
    pub fn select_framework_assemblies(&self, groups: &[FrameworkItems]) -> Vec<String> {
        let items = self
            .nearest_items(groups)
            .filter(|item| !item.trim().is_empty() && item_file_name(item) != EMPTY_FOLDER_MARKER);
        dedup_file_names(items)
    }

    /// Items of every group published for the nearest framework
    fn nearest_items<'a>(&self, groups: &'a [FrameworkItems]) -> impl Iterator<Item = &'a str> + 'a {
        let nearest = self
            .framework
            .nearest_index(groups.iter().map(|group| &group.framework))
            .map(|index| &groups[index].framework);

        groups
            .iter()
            .filter(move |group| Some(&group.framework) == nearest)
            .flat_map(|group| group.items.iter().map(String::as_str))
    }
}

fn dedup_file_names<'a>(items: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .map(item_file_name)
        .filter(|name| seen.insert(name.to_lowercase()))
        .map(str::to_string)
        .collect()
}
