//! Configuration layering, fallback logic, and environment overrides
//!
//! Precedence, lowest first: built-in defaults, `~/.tangle/config.toml`,
//! the nearest `tangle.toml`, `TANGLE_*` variables, command line flags.

use std::collections::HashMap;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;

use tangle_core::error::TangleError;
use tangle_core::types::TargetFramework;

use crate::toml::{validate_framework, validate_repository, RepositoryEntry, TangleToml, CONFIG_FILE_NAME};
use crate::ConfigResult;

/// Public feed used when no repository is configured
pub const DEFAULT_REPOSITORY_URL: &str = "https://api.nuget.org/v3-flatcontainer";
pub const DEFAULT_REPOSITORY_NAME: &str = "nuget.org";

pub const DEFAULT_DOWNLOAD_CONCURRENCY: usize = 8;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;

const ENV_PREFIX: &str = "TANGLE_";

/// Main configuration loading interface
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Current working directory
    cwd: Utf8PathBuf,
    /// Global config file, when a home directory is known
    global_path: Option<Utf8PathBuf>,
}

/// Configuration layering and merging
#[derive(Debug, Default)]
pub struct ConfigLayering;

/// Where a setting came from
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    /// Global config file
    Global(Utf8PathBuf),
    /// Project tangle.toml file
    Project(Utf8PathBuf),
    /// Environment variable
    Environment(String),
    /// CLI flag
    CommandLine,
}

/// Values given on the command line
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliOverrides {
    pub framework: Option<String>,
    /// Repository URLs replacing every configured repository
    pub sources: Vec<String>,
    pub include_newest: Option<bool>,
    pub download_concurrency: Option<usize>,
}

/// Effective configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub repositories: Vec<RepositoryEntry>,
    pub include_newest: bool,
    pub download_concurrency: usize,
    pub cache_ttl: Duration,
    pub default_framework: Option<TargetFramework>,
    /// Layers that contributed, lowest precedence first
    pub sources: Vec<ConfigSource>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            repositories: Vec::new(),
            include_newest: true,
            download_concurrency: DEFAULT_DOWNLOAD_CONCURRENCY,
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            default_framework: None,
            sources: Vec::new(),
        }
    }
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new(cwd: Utf8PathBuf) -> Self {
        Self {
            cwd,
            global_path: default_global_path(),
        }
    }

    /// Use `path` instead of `~/.tangle/config.toml`
    pub fn with_global_path(mut self, path: Option<Utf8PathBuf>) -> Self {
        self.global_path = path;
        self
    }

    /// Find configuration file in project (walks up directory tree)
    pub fn resolve_config_path(&self, filename: &str) -> Option<Utf8PathBuf> {
        let mut current = Some(self.cwd.as_path());

        while let Some(directory) = current {
            let config_path = directory.join(filename);
            if config_path.is_file() {
                return Some(config_path);
            }
            current = directory.parent();
        }

        None
    }

    /// Load the nearest project configuration, if any
    pub async fn load_project_config(&self) -> ConfigResult<Option<(TangleToml, Utf8PathBuf)>> {
        match self.resolve_config_path(CONFIG_FILE_NAME) {
            Some(path) => {
                let config = crate::toml::load_from_file(&path).await?;
                Ok(Some((config, path)))
            },
            None => Ok(None),
        }
    }

    /// Load global configuration
    pub async fn load_global_config(&self) -> ConfigResult<Option<(TangleToml, Utf8PathBuf)>> {
        let Some(path) = &self.global_path else {
            debug!("No home directory, skipping global configuration");
            return Ok(None);
        };

        if path.is_file() {
            let config = crate::toml::load_from_file(path).await?;
            Ok(Some((config, path.clone())))
        } else {
            Ok(None)
        }
    }

    /// Load every layer and merge them
    pub async fn load(&self, env_overrides: &HashMap<String, String>, cli: &CliOverrides) -> ConfigResult<Settings> {
        let global = self.load_global_config().await?;
        let project = self.load_project_config().await?;
        ConfigLayering::merge_configs(global, project, env_overrides, cli)
    }
}

impl ConfigLayering {
    /// Merge multiple configuration layers
    pub fn merge_configs(
        global_config: Option<(TangleToml, Utf8PathBuf)>,
        project_config: Option<(TangleToml, Utf8PathBuf)>,
        env_overrides: &HashMap<String, String>,
        cli_overrides: &CliOverrides,
    ) -> ConfigResult<Settings> {
        let mut settings = Settings::default();
        let mut project_repositories = Vec::new();
        let mut global_repositories = Vec::new();

        if let Some((global, path)) = global_config {
            global_repositories = global.repositories.clone();
            Self::apply_file(&mut settings, global)?;
            settings.sources.push(ConfigSource::Global(path));
        }

        if let Some((project, path)) = project_config {
            project_repositories = project.repositories.clone();
            Self::apply_file(&mut settings, project)?;
            settings.sources.push(ConfigSource::Project(path));
        }

        // Project repositories are tried before global ones
        settings.repositories = project_repositories;
        for repository in global_repositories {
            let shadowed = settings
                .repositories
                .iter()
                .any(|existing| existing.name.eq_ignore_ascii_case(&repository.name));
            if !shadowed {
                settings.repositories.push(repository);
            }
        }

        // Apply environment variable overrides
        Self::apply_env_overrides(&mut settings, env_overrides)?;

        // Apply CLI flag overrides (highest priority)
        Self::apply_cli_overrides(&mut settings, cli_overrides)?;

        if settings.repositories.is_empty() {
            settings
                .repositories
                .push(RepositoryEntry::new(DEFAULT_REPOSITORY_NAME, DEFAULT_REPOSITORY_URL));
        }

        Ok(settings)
    }

    /// Apply the scalar values a file sets
    fn apply_file(settings: &mut Settings, config: TangleToml) -> ConfigResult<()> {
        if let Some(include_newest) = config.resolver.include_newest {
            settings.include_newest = include_newest;
        }
        if let Some(concurrency) = config.resolver.download_concurrency {
            settings.download_concurrency = concurrency;
        }
        if let Some(ttl) = config.cache.ttl_secs {
            settings.cache_ttl = Duration::from_secs(ttl);
        }
        if let Some(framework) = &config.default_framework {
            settings.default_framework = Some(validate_framework("default-framework", framework)?);
        }
        Ok(())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(settings: &mut Settings, overrides: &HashMap<String, String>) -> ConfigResult<()> {
        for (key, value) in overrides {
            match key.as_str() {
                "TANGLE_DEFAULT_FRAMEWORK" => {
                    settings.default_framework = Some(validate_framework(key, value)?);
                },
                "TANGLE_INCLUDE_NEWEST" => {
                    settings.include_newest = parse_bool(key, value)?;
                },
                "TANGLE_DOWNLOAD_CONCURRENCY" => {
                    settings.download_concurrency = parse_concurrency(key, value)?;
                },
                "TANGLE_CACHE_TTL_SECS" => {
                    let secs = value.trim().parse().map_err(|e| TangleError::ConfigValidation {
                        field: key.clone(),
                        reason: format!("Invalid number of seconds '{}': {}", value, e),
                    })?;
                    settings.cache_ttl = Duration::from_secs(secs);
                },
                _ => {
                    // Unknown environment variable, ignore
                    continue;
                },
            }
            settings.sources.push(ConfigSource::Environment(key.clone()));
        }

        Ok(())
    }

    /// Apply CLI flag overrides
    fn apply_cli_overrides(settings: &mut Settings, overrides: &CliOverrides) -> ConfigResult<()> {
        if overrides == &CliOverrides::default() {
            return Ok(());
        }

        if let Some(framework) = &overrides.framework {
            settings.default_framework = Some(validate_framework("framework", framework)?);
        }
        if !overrides.sources.is_empty() {
            settings.repositories = overrides
                .sources
                .iter()
                .map(|url| {
                    let entry = RepositoryEntry::new(url.as_str(), url.as_str());
                    validate_repository(&entry).map(|_| entry)
                })
                .collect::<ConfigResult<Vec<_>>>()?;
        }
        if let Some(include_newest) = overrides.include_newest {
            settings.include_newest = include_newest;
        }
        if let Some(concurrency) = overrides.download_concurrency {
            settings.download_concurrency = parse_concurrency("download-concurrency", &concurrency.to_string())?;
        }

        settings.sources.push(ConfigSource::CommandLine);
        Ok(())
    }

    /// Collect environment variable overrides
    pub fn collect_env_overrides() -> HashMap<String, String> {
        std::env::vars().filter(|(key, _)| key.starts_with(ENV_PREFIX)).collect()
    }
}

fn default_global_path() -> Option<Utf8PathBuf> {
    let home = dirs::home_dir()?;
    let home = Utf8PathBuf::try_from(home).ok()?;
    Some(global_config_path(&home))
}

/// `<home>/.tangle/config.toml`
pub fn global_config_path(home: &Utf8Path) -> Utf8PathBuf {
    home.join(".tangle").join("config.toml")
}

fn parse_bool(field: &str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(TangleError::ConfigValidation {
            field: field.to_string(),
            reason: format!("Expected true or false, got '{}'", value),
        }),
    }
}

fn parse_concurrency(field: &str, value: &str) -> ConfigResult<usize> {
    match value.trim().parse::<usize>() {
        Ok(concurrency) if concurrency > 0 => Ok(concurrency),
        _ => Err(TangleError::ConfigValidation {
            field: field.to_string(),
            reason: format!("Expected a positive number, got '{}'", value),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toml::{CacheSection, ResolverSection};
    use tempfile::TempDir;

    fn utf8_dir(dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap()
    }

    fn config(repositories: &[(&str, &str)], concurrency: Option<usize>) -> TangleToml {
        TangleToml {
            repositories: repositories
                .iter()
                .map(|(name, url)| RepositoryEntry::new(*name, *url))
                .collect(),
            resolver: ResolverSection {
                include_newest: None,
                download_concurrency: concurrency,
            },
            cache: CacheSection::default(),
            default_framework: None,
        }
    }

    #[test]
    fn test_defaults() {
        let settings =
            ConfigLayering::merge_configs(None, None, &HashMap::new(), &CliOverrides::default()).unwrap();

        assert!(settings.include_newest);
        assert_eq!(settings.download_concurrency, DEFAULT_DOWNLOAD_CONCURRENCY);
        assert_eq!(settings.cache_ttl, Duration::from_secs(DEFAULT_CACHE_TTL_SECS));
        assert_eq!(settings.repositories, vec![RepositoryEntry::new(DEFAULT_REPOSITORY_NAME, DEFAULT_REPOSITORY_URL)]);
        assert!(settings.sources.is_empty());
    }

    #[test]
    fn test_merge_configs() {
        let global = config(
            &[("shared", "https://global.example.com"), ("mirror", "https://mirror.example.com")],
            Some(2),
        );
        let project = config(&[("shared", "https://project.example.com")], Some(4));

        let env_overrides = HashMap::from([
            ("TANGLE_CACHE_TTL_SECS".to_string(), "60".to_string()),
            ("TANGLE_UNRELATED".to_string(), "ignored".to_string()),
        ]);
        let cli_overrides = CliOverrides {
            framework: Some("net8.0".to_string()),
            ..CliOverrides::default()
        };

        let merged = ConfigLayering::merge_configs(
            Some((global, Utf8PathBuf::from("/home/me/.tangle/config.toml"))),
            Some((project, Utf8PathBuf::from("/work/tangle.toml"))),
            &env_overrides,
            &cli_overrides,
        )
        .unwrap();

        // Project config should take precedence over global
        assert_eq!(merged.download_concurrency, 4);
        let urls: Vec<&str> = merged.repositories.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, vec!["https://project.example.com", "https://mirror.example.com"]);

        // Environment override should be applied
        assert_eq!(merged.cache_ttl, Duration::from_secs(60));

        // CLI override should be applied (highest priority)
        assert_eq!(merged.default_framework.unwrap().short_name(), "net8.0");
        assert_eq!(merged.sources.len(), 4);
        assert_eq!(merged.sources.last(), Some(&ConfigSource::CommandLine));
    }

    #[test]
    fn test_cli_sources_replace_repositories() {
        let project = config(&[("feed", "https://feed.example.com")], None);
        let cli = CliOverrides {
            sources: vec!["https://other.example.com/v3".to_string()],
            include_newest: Some(false),
            ..CliOverrides::default()
        };

        let merged = ConfigLayering::merge_configs(
            None,
            Some((project, Utf8PathBuf::from("tangle.toml"))),
            &HashMap::new(),
            &cli,
        )
        .unwrap();

        assert_eq!(merged.repositories.len(), 1);
        assert_eq!(merged.repositories[0].url, "https://other.example.com/v3");
        assert!(!merged.include_newest);

        let bad = CliOverrides {
            sources: vec!["not a url".to_string()],
            ..CliOverrides::default()
        };
        assert!(ConfigLayering::merge_configs(None, None, &HashMap::new(), &bad).is_err());
    }

    #[test]
    fn test_invalid_env_values() {
        for (key, value) in [
            ("TANGLE_INCLUDE_NEWEST", "maybe"),
            ("TANGLE_DOWNLOAD_CONCURRENCY", "0"),
            ("TANGLE_CACHE_TTL_SECS", "-5"),
            ("TANGLE_DEFAULT_FRAMEWORK", "java8"),
        ] {
            let env = HashMap::from([(key.to_string(), value.to_string())]);
            match ConfigLayering::merge_configs(None, None, &env, &CliOverrides::default()) {
                Err(TangleError::ConfigValidation { field, .. }) => assert_eq!(field, key),
                other => panic!("Expected ConfigValidation for {}, got {:?}", key, other),
            }
        }

        let env = HashMap::from([("TANGLE_INCLUDE_NEWEST".to_string(), "off".to_string())]);
        let settings = ConfigLayering::merge_configs(None, None, &env, &CliOverrides::default()).unwrap();
        assert!(!settings.include_newest);
    }

    #[tokio::test]
    async fn test_resolve_config_path_walks_up() {
        let temp_dir = TempDir::new().unwrap();
        let root = utf8_dir(&temp_dir);
        let nested = root.join("src").join("App");
        tokio::fs::create_dir_all(&nested).await.unwrap();
        tokio::fs::write(root.join(CONFIG_FILE_NAME), "[resolver]\ninclude-newest = false")
            .await
            .unwrap();

        let loader = ConfigLoader::new(nested).with_global_path(None);
        assert_eq!(loader.resolve_config_path(CONFIG_FILE_NAME), Some(root.join(CONFIG_FILE_NAME)));

        let settings = loader.load(&HashMap::new(), &CliOverrides::default()).await.unwrap();
        assert!(!settings.include_newest);
        assert_eq!(settings.sources, vec![ConfigSource::Project(root.join(CONFIG_FILE_NAME))]);
    }

    #[tokio::test]
    async fn test_global_config() {
        let temp_dir = TempDir::new().unwrap();
        let home = utf8_dir(&temp_dir);
        let global = global_config_path(&home);
        tokio::fs::create_dir_all(global.parent().unwrap()).await.unwrap();
        tokio::fs::write(&global, "default-framework = \"netstandard2.0\"").await.unwrap();

        let project_dir = home.join("work");
        tokio::fs::create_dir_all(&project_dir).await.unwrap();

        let loader = ConfigLoader::new(project_dir).with_global_path(Some(global.clone()));
        let settings = loader.load(&HashMap::new(), &CliOverrides::default()).await.unwrap();

        assert_eq!(settings.default_framework.unwrap().short_name(), "netstandard2.0");
        assert_eq!(settings.sources, vec![ConfigSource::Global(global)]);
    }

    #[tokio::test]
    async fn test_broken_project_file_names_the_file() {
        let temp_dir = TempDir::new().unwrap();
        let root = utf8_dir(&temp_dir);
        tokio::fs::write(root.join(CONFIG_FILE_NAME), "[resolver").await.unwrap();

        let loader = ConfigLoader::new(root.clone()).with_global_path(None);
        match loader.load_project_config().await {
            Err(TangleError::TomlParse { message }) => assert!(message.contains(CONFIG_FILE_NAME)),
            other => panic!("Expected TomlParse, got {:?}", other),
        }
    }

    #[test]
    fn test_collect_env_overrides() {
        std::env::set_var("TANGLE_TEST_COLLECT_MARKER", "1");
        std::env::set_var("NOT_TANGLE_TEST_COLLECT_MARKER", "1");

        let overrides = ConfigLayering::collect_env_overrides();

        assert!(overrides.contains_key("TANGLE_TEST_COLLECT_MARKER"));
        assert!(!overrides.contains_key("NOT_TANGLE_TEST_COLLECT_MARKER"));

        std::env::remove_var("TANGLE_TEST_COLLECT_MARKER");
        std::env::remove_var("NOT_TANGLE_TEST_COLLECT_MARKER");
    }
}
