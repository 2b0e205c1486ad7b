//! tangle.toml configuration parsing and serialization

use serde::{Deserialize, Serialize};
use tangle_core::error::TangleError;
use tangle_core::types::TargetFramework;
use url::Url;

use crate::ConfigResult;

/// Name of the project configuration file
pub const CONFIG_FILE_NAME: &str = "tangle.toml";

/// Complete tangle.toml configuration
///
/// Every field is optional so a file only states what it overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TangleToml {
    /// Package repositories, tried in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub repositories: Vec<RepositoryEntry>,

    /// Resolution tuning
    #[serde(default)]
    pub resolver: ResolverSection,

    /// Metadata cache tuning
    #[serde(default)]
    pub cache: CacheSection,

    /// Framework used when a command does not name one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_framework: Option<String>,
}

/// One package repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryEntry {
    /// Display name used in logs
    pub name: String,

    /// Package base address
    pub url: String,

    /// Bearer token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Basic authentication user
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Basic authentication password
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// `[resolver]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ResolverSection {
    /// Also seed the newest satisfying version of each range
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_newest: Option<bool>,

    /// Maximum concurrent package downloads
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_concurrency: Option<usize>,
}

/// `[cache]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CacheSection {
    /// Seconds a cached package manifest stays fresh
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl_secs: Option<u64>,
}

impl RepositoryEntry {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            token: None,
            username: None,
            password: None,
        }
    }
}

/// Parse TOML string to TangleToml configuration
pub fn parse_tangle_toml(content: &str) -> ConfigResult<TangleToml> {
    let config: TangleToml = toml::from_str(content).map_err(|e| TangleError::TomlParse {
        message: format!("TOML parsing error: {}", e),
    })?;

    validate_config(&config)?;

    Ok(config)
}

/// Serialize TangleToml to TOML string
pub fn serialize_tangle_toml(config: &TangleToml) -> ConfigResult<String> {
    toml::to_string_pretty(config).map_err(|e| TangleError::TomlParse {
        message: format!("TOML serialization error: {}", e),
    })
}

/// Validate field values
pub fn validate_config(config: &TangleToml) -> ConfigResult<()> {
    for (position, repository) in config.repositories.iter().enumerate() {
        validate_repository(repository)?;
        if config.repositories[..position]
            .iter()
            .any(|other| other.name.eq_ignore_ascii_case(&repository.name))
        {
            return Err(TangleError::ConfigValidation {
                field: "repositories.name".to_string(),
                reason: format!("Repository '{}' is declared twice", repository.name),
            });
        }
    }

    if config.resolver.download_concurrency == Some(0) {
        return Err(TangleError::ConfigValidation {
            field: "resolver.download-concurrency".to_string(),
            reason: "Download concurrency must be at least 1".to_string(),
        });
    }

    if let Some(framework) = &config.default_framework {
        validate_framework("default-framework", framework)?;
    }

    Ok(())
}

/// Check a repository entry's name, URL and credentials
pub fn validate_repository(repository: &RepositoryEntry) -> ConfigResult<()> {
    if repository.name.trim().is_empty() {
        return Err(TangleError::ConfigValidation {
            field: "repositories.name".to_string(),
            reason: "Repository name is required".to_string(),
        });
    }

    let url = Url::parse(&repository.url).map_err(|e| TangleError::ConfigValidation {
        field: "repositories.url".to_string(),
        reason: format!("Invalid URL '{}' for repository '{}': {}", repository.url, repository.name, e),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(TangleError::ConfigValidation {
            field: "repositories.url".to_string(),
            reason: format!("Repository '{}' must use http or https", repository.name),
        });
    }

    if repository.password.is_some() && repository.username.is_none() {
        return Err(TangleError::ConfigValidation {
            field: "repositories.username".to_string(),
            reason: format!("Repository '{}' has a password but no username", repository.name),
        });
    }

    Ok(())
}

/// Check that a framework moniker parses
pub fn validate_framework(field: &str, text: &str) -> ConfigResult<TargetFramework> {
    TargetFramework::parse(text).map_err(|e| TangleError::ConfigValidation {
        field: field.to_string(),
        reason: e.to_string(),
    })
}

/// Load and parse tangle.toml from file path
pub async fn load_from_file(path: &camino::Utf8Path) -> ConfigResult<TangleToml> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| TangleError::io(format!("Failed to read {}", path), e))?;

    parse_tangle_toml(&content).map_err(|e| match e {
        TangleError::TomlParse { message } => TangleError::TomlParse {
            message: format!("In file {}: {}", path, message),
        },
        TangleError::ConfigValidation { field, reason } => TangleError::ConfigValidation {
            field,
            reason: format!("In file {}: {}", path, reason),
        },
        other => other,
    })
}
