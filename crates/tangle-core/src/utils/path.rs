//! Path utilities.
//!
//! Project nodes are keyed by normalized paths, and package items arrive as
//! archive-relative paths that may use either separator.

use std::path::{Component, Path, PathBuf};

/// Normalize a path by resolving . and .. components lexically
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {},
            Component::ParentDir => {
                // Keep a leading ".." that cannot be resolved
                match components.last() {
                    Some(Component::Normal(_)) => {
                        components.pop();
                    },
                    Some(Component::RootDir) | Some(Component::Prefix(_)) => {},
                    _ => components.push(component),
                }
            },
            other => {
                components.push(other);
            },
        }
    }

    components.iter().collect()
}

/// Get the file extension as a lowercase string
pub fn get_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

/// Last segment of an archive or lock-file item path (`lib/net45/Foo.dll`
/// or `..\lib\Foo.dll`)
pub fn item_file_name(item: &str) -> &str {
    item.rsplit(['/', '\\']).next().unwrap_or(item)
}
