//! Package archive (`.nupkg`) reading
//!
//! A package is a zip file. Library files live under `lib/<tfm>/`, files
//! directly under `lib/` apply to any framework, and the manifest sits at the
//! archive root.

use std::io::{Cursor, Read};

use tracing::debug;
use zip::ZipArchive;

use tangle_core::error::TangleError;
use tangle_core::types::TargetFramework;

use crate::api::{FrameworkItems, PackageContents};
use crate::nuspec::{parse_manifest, PackageManifest};
use crate::RegistryResult;

/// Contents read out of a package archive
#[derive(Debug, Clone)]
pub struct PackageArchive {
    /// Root manifest, when the archive carries one
    pub manifest: Option<PackageManifest>,
    /// Library entries grouped by the framework folder they sit in, in
    /// archive order
    pub library_items: Vec<FrameworkItems>,
}

impl PackageArchive {
    /// Convert into the contents shape repositories hand out
    pub fn into_contents(self) -> PackageContents {
        PackageContents {
            library_items: self.library_items,
            framework_items: self
                .manifest
                .map(|manifest| manifest.framework_assemblies)
                .unwrap_or_default(),
        }
    }
}

/// Read a package archive from memory
pub fn read_package(bytes: &[u8]) -> RegistryResult<PackageArchive> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(|e| TangleError::Archive {
        message: format!("Failed to open package archive: {}", e),
    })?;

    let names: Vec<String> = archive.file_names().map(str::to_string).collect();

    let mut library_items: Vec<FrameworkItems> = Vec::new();
    let mut manifest_name = None;

    for name in &names {
        if name.ends_with('/') {
            continue;
        }
        if !name.contains('/') && name.to_lowercase().ends_with(".nuspec") {
            manifest_name.get_or_insert_with(|| name.clone());
            continue;
        }

        let Some(rest) = strip_prefix_ignore_case(name, "lib/") else {
            continue;
        };
        let framework = match rest.split_once('/') {
            None => TargetFramework::any(),
            Some((folder, _)) => match TargetFramework::parse(folder) {
                Ok(framework) => framework,
                Err(_) => {
                    debug!("Ignoring '{}': unsupported framework folder", name);
                    continue;
                },
            },
        };

        match library_items.iter_mut().find(|group| group.framework == framework) {
            Some(group) => group.items.push(name.clone()),
            None => library_items.push(FrameworkItems::new(framework, vec![name.clone()])),
        }
    }

    let manifest = match manifest_name {
        Some(name) => {
            let mut file = archive.by_name(&name).map_err(|e| TangleError::Archive {
                message: format!("Failed to open '{}': {}", name, e),
            })?;
            let mut xml = String::new();
            file.read_to_string(&mut xml).map_err(|e| TangleError::Archive {
                message: format!("Failed to read '{}': {}", name, e),
            })?;
            Some(parse_manifest(&xml)?)
        },
        None => None,
    };

    Ok(PackageArchive {
        manifest,
        library_items,
    })
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &text[prefix.len()..])
}
