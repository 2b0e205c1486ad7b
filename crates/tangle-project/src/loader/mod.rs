//! Loading a restored project from disk

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use tangle_core::error::TangleError;
use tangle_core::types::TargetFramework;
use tangle_core::utils::normalize_path;

use crate::lockfile::{parse_lock_file, LockFile, LOCK_FILE_NAME};
use crate::msbuild::{is_supported_project, parse_project_file, PACKAGES_CONFIG, SUPPORTED_EXTENSIONS};
use crate::snapshot::{ProjectLoader, ProjectSnapshot};
use crate::ProjectResult;

/// Intermediate output folder a restore writes the lock file into
pub const INTERMEDIATE_DIR: &str = "obj";

/// Loads projects from their project file and restore lock file
#[derive(Debug, Clone, Default)]
pub struct AssetsFileLoader;

impl AssetsFileLoader {
    pub fn new() -> Self {
        Self
    }

    /// Where the lock file of `project` is expected
    pub fn lock_file_path(project: &Path) -> PathBuf {
        project_dir(project).join(INTERMEDIATE_DIR).join(LOCK_FILE_NAME)
    }

    fn check_supported(project: &Path) -> ProjectResult<()> {
        if !is_supported_project(project) {
            return Err(TangleError::UnsupportedProject {
                path: project.display().to_string(),
                reason: format!("expected one of .{}", SUPPORTED_EXTENSIONS.join(", .")),
            });
        }
        if project_dir(project).join(PACKAGES_CONFIG).is_file() {
            return Err(TangleError::UnsupportedProject {
                path: project.display().to_string(),
                reason: format!("projects using {} cannot be resolved", PACKAGES_CONFIG),
            });
        }
        Ok(())
    }

    fn read_lock_file(project: &Path) -> ProjectResult<LockFile> {
        let path = Self::lock_file_path(project);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(TangleError::MissingRestore {
                    path: project.display().to_string(),
                });
            },
            Err(e) => return Err(TangleError::io(format!("Failed to read {}", path.display()), e)),
        };

        parse_lock_file(&content).map_err(|e| located(e, &path))
    }

    /// Override, else the project's own framework, else the lock file's first
    fn effective_framework(
        requested: Option<&TargetFramework>,
        declared: Option<&str>,
        lock: &LockFile,
        project: &Path,
    ) -> ProjectResult<TargetFramework> {
        if let Some(framework) = requested {
            return Ok(framework.clone());
        }
        if let Some(text) = declared {
            return TargetFramework::parse(text);
        }
        lock.frameworks().into_iter().next().ok_or_else(|| TangleError::ProjectLoad {
            path: project.display().to_string(),
            reason: "No target framework declared by the project or its lock file".to_string(),
        })
    }
}

impl ProjectLoader for AssetsFileLoader {
    fn load(&self, project: &Path, framework: Option<&TargetFramework>) -> ProjectResult<ProjectSnapshot> {
        let project = normalize_path(project);
        Self::check_supported(&project)?;

        let xml = fs::read_to_string(&project).map_err(|e| TangleError::ProjectLoad {
            path: project.display().to_string(),
            reason: e.to_string(),
        })?;
        let project_file = parse_project_file(&xml).map_err(|e| located(e, &project))?;

        let lock = Self::read_lock_file(&project)?;
        let target_framework =
            Self::effective_framework(framework, project_file.default_framework(), &lock, &project)?;
        debug!("Loading {} for {}", project.display(), target_framework);

        let libraries = lock
            .libraries_for(&target_framework, project_dir(&project))
            .map_err(|e| located(e, &project))?;
        let package_references = lock.direct_dependencies(&target_framework)?;

        info!(
            "Loaded {} with {} libraries for {}",
            project.display(),
            libraries.len(),
            target_framework
        );
        Ok(ProjectSnapshot {
            project_path: project,
            target_framework,
            libraries,
            package_references,
            file_references: project_file.file_references,
        })
    }
}

/// Point a load failure at the file it came from
fn located(error: TangleError, path: &Path) -> TangleError {
    match error {
        TangleError::ProjectLoad { reason, .. } => TangleError::ProjectLoad {
            path: path.display().to_string(),
            reason,
        },
        other => other,
    }
}

fn project_dir(project: &Path) -> &Path {
    project.parent().unwrap_or_else(|| Path::new("."))
}
