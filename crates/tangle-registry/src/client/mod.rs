//! HTTP repository with connection pooling, retry logic and manifest caching
//!
//! Talks to package-base-address feeds:
//! - `{base}/{id}/index.json` lists published versions
//! - `{base}/{id}/{version}/{id}.nuspec` is the package manifest
//! - `{base}/{id}/{version}/{id}.{version}.nupkg` is the package archive
//!
//! Ids and versions are lowercased in every URL.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, StatusCode};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use tangle_core::error::TangleError;
use tangle_core::types::{PackageId, PackageIdentity, TargetFramework, Version};

use crate::api::{PackageContents, PackageDependencyInfo, Repository};
use crate::archive::read_package;
use crate::cache::MetadataCache;
use crate::nuspec::{parse_manifest, PackageManifest};
use crate::RegistryResult;

/// Configuration for exponential backoff retry logic
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Initial delay before first retry
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

/// Authentication configuration for repository access
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    /// Bearer token for authentication
    pub token: Option<String>,
    /// Basic auth username
    pub username: Option<String>,
    /// Basic auth password
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VersionIndex {
    #[serde(default)]
    versions: Vec<String>,
}

/// Repository backed by an HTTP package feed
#[derive(Debug, Clone)]
pub struct HttpRepository {
    name: String,
    /// Underlying HTTP client with connection pooling
    client: Client,
    retry_config: RetryConfig,
    /// Feed base address, without a trailing slash
    base_url: String,
    cache: Arc<MetadataCache>,
}

impl HttpRepository {
    /// Create an anonymous repository for `base_url`
    pub fn new(name: impl Into<String>, base_url: &str) -> RegistryResult<Self> {
        Self::with_config(name, base_url, None, RetryConfig::default())
    }

    /// Create a repository that authenticates every request
    pub fn with_auth(name: impl Into<String>, base_url: &str, auth: AuthConfig) -> RegistryResult<Self> {
        Self::with_config(name, base_url, Some(auth), RetryConfig::default())
    }

    /// Create a repository with custom configuration
    pub fn with_config(
        name: impl Into<String>,
        base_url: &str,
        auth: Option<AuthConfig>,
        retry_config: RetryConfig,
    ) -> RegistryResult<Self> {
        let base_url = validate_base_url(base_url)?;

        let mut builder = ClientBuilder::new()
            // Connection pooling configuration
            .pool_max_idle_per_host(50)
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(Duration::from_secs(30))
            .gzip(true)
            .user_agent(concat!("tangle/", env!("CARGO_PKG_VERSION")));

        if let Some(header) = auth.map(authorization_header).transpose()?.flatten() {
            let mut headers = reqwest::header::HeaderMap::new();
            headers.insert(reqwest::header::AUTHORIZATION, header);
            builder = builder.default_headers(headers);
        }

        let client = builder
            .build()
            .map_err(|e| TangleError::network(format!("Failed to create HTTP client: {}", e), e))?;

        Ok(Self {
            name: name.into(),
            client,
            retry_config,
            base_url,
            cache: Arc::new(MetadataCache::new()),
        })
    }

    /// Share a manifest cache with other repositories
    pub fn with_cache(mut self, cache: Arc<MetadataCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Execute HTTP request with exponential backoff retry logic
    async fn with_retry<F, Fut, T>(&self, operation: F) -> RegistryResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = RegistryResult<T>>,
    {
        let mut delay = self.retry_config.initial_delay;
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                // Only transport failures are worth another attempt
                Err(error @ TangleError::Network { .. }) if attempt < self.retry_config.max_retries => {
                    attempt += 1;
                    debug!("Retrying after error (attempt {}): {}", attempt, error);
                    tokio::time::sleep(delay).await;
                    delay = std::cmp::min(
                        Duration::from_millis((delay.as_millis() as f64 * self.retry_config.multiplier) as u64),
                        self.retry_config.max_delay,
                    );
                },
                Err(error) => return Err(error),
            }
        }
    }

    /// GET a URL, mapping 404 to `None`
    async fn get_optional(&self, url: &str) -> RegistryResult<Option<reqwest::Response>> {
        self.with_retry(move || async move {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| TangleError::network(format!("Failed to fetch {}: {}", url, e), e))?;

            match response.status() {
                status if status.is_success() => Ok(Some(response)),
                StatusCode::NOT_FOUND => Ok(None),
                status => Err(TangleError::Network {
                    message: format!("Repository returned status {} for {}", status, url),
                    source: None,
                }),
            }
        })
        .await
    }

    /// Fetch the manifest for an identity, consulting the cache first
    pub async fn fetch_manifest(&self, identity: &PackageIdentity) -> RegistryResult<Option<PackageManifest>> {
        if let Some(manifest) = self.cache.get(&self.base_url, identity) {
            debug!("Manifest cache hit for {}", identity);
            return Ok(Some(manifest));
        }

        let url = self.manifest_url(identity);
        let Some(response) = self.get_optional(&url).await? else {
            return Ok(None);
        };
        let body = response
            .text()
            .await
            .map_err(|e| TangleError::network(format!("Failed to read manifest: {}", e), e))?;

        let manifest = parse_manifest(&body)?;
        self.cache.insert(&self.base_url, identity, manifest.clone());
        Ok(Some(manifest))
    }

    /// Download the raw package archive
    pub async fn fetch_archive(&self, identity: &PackageIdentity) -> RegistryResult<Vec<u8>> {
        let url = self.archive_url(identity);
        let response = self
            .get_optional(&url)
            .await?
            .ok_or_else(|| TangleError::PackageNotFound {
                identity: identity.to_string(),
            })?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| TangleError::network(format!("Failed to read package archive: {}", e), e))?;
        Ok(bytes.to_vec())
    }

    fn index_url(&self, id: &PackageId) -> String {
        format!("{}/{}/index.json", self.base_url, id.folded())
    }

    fn manifest_url(&self, identity: &PackageIdentity) -> String {
        format!(
            "{}/{}/{}/{}.nuspec",
            self.base_url,
            identity.id.folded(),
            identity.version.to_normalized_lowercase(),
            identity.id.folded()
        )
    }

    fn archive_url(&self, identity: &PackageIdentity) -> String {
        let id = identity.id.folded();
        let version = identity.version.to_normalized_lowercase();
        format!("{}/{}/{}/{}.{}.nupkg", self.base_url, id, version, id, version)
    }
}

#[async_trait]
impl Repository for HttpRepository {
    fn name(&self) -> &str {
        &self.name
    }

    async fn lookup_dependency_info(
        &self,
        identity: &PackageIdentity,
        framework: &TargetFramework,
    ) -> RegistryResult<Option<PackageDependencyInfo>> {
        let Some(manifest) = self.fetch_manifest(identity).await? else {
            return Ok(None);
        };
        Ok(Some(PackageDependencyInfo {
            identity: PackageIdentity::new(manifest.id.clone(), manifest.version.clone()),
            dependencies: manifest.dependencies_for(framework),
        }))
    }

    async fn list_versions(&self, id: &PackageId) -> RegistryResult<Vec<Version>> {
        let url = self.index_url(id);
        let Some(response) = self.get_optional(&url).await? else {
            return Ok(Vec::new());
        };
        let index: VersionIndex = response
            .json()
            .await
            .map_err(|e| TangleError::network(format!("Failed to parse version index: {}", e), e))?;

        let versions = index
            .versions
            .iter()
            .filter_map(|text| match text.parse::<Version>() {
                Ok(version) => Some(version),
                Err(_) => {
                    debug!("Ignoring unparseable version '{}' of {}", text, id);
                    None
                },
            })
            .collect();
        Ok(versions)
    }

    async fn download(&self, identity: &PackageIdentity) -> RegistryResult<PackageContents> {
        let bytes = self.fetch_archive(identity).await?;
        let package = read_package(&bytes)?;
        if let Some(ref manifest) = package.manifest {
            self.cache.insert(&self.base_url, identity, manifest.clone());
        }
        Ok(package.into_contents())
    }
}

fn validate_base_url(base_url: &str) -> RegistryResult<String> {
    let parsed = Url::parse(base_url).map_err(|e| TangleError::ConfigValidation {
        field: "url".to_string(),
        reason: format!("'{}' is not a valid URL: {}", base_url, e),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(base_url.trim_end_matches('/').to_string()),
        scheme => Err(TangleError::ConfigValidation {
            field: "url".to_string(),
            reason: format!("unsupported scheme '{}' in '{}'", scheme, base_url),
        }),
    }
}

fn authorization_header(auth: AuthConfig) -> RegistryResult<Option<reqwest::header::HeaderValue>> {
    let value = if let Some(token) = auth.token {
        format!("Bearer {}", token)
    } else if let (Some(username), Some(password)) = (auth.username, auth.password) {
        use base64::{engine::general_purpose, Engine as _};
        format!("Basic {}", general_purpose::STANDARD.encode(format!("{}:{}", username, password)))
    } else {
        return Ok(None);
    };

    value
        .parse()
        .map(Some)
        .map_err(|e| TangleError::network(format!("Invalid authorization header: {}", e), e))
}
