//! Species image resolution
//!
//! Lookups go cache → provider → upsert. Only successful lookups are cached;
//! a miss or provider failure leaves the cache untouched so the next request
//! retries the provider. Blacklisting deletes the cached row.

pub mod cache;
pub mod flickr;
pub mod wikipedia;

use async_trait::async_trait;
use bnp_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

pub use cache::ImageCache;
pub use flickr::FlickrProvider;
pub use wikipedia::WikipediaProvider;

const USER_AGENT: &str = concat!("bnp-api/", env!("CARGO_PKG_VERSION"));

/// Per-request timeout for provider calls
pub const PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

/// External image source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Flickr,
    Wikipedia,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::Flickr => "flickr",
            ProviderKind::Wikipedia => "wikipedia",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "flickr" => Ok(ProviderKind::Flickr),
            "wikipedia" => Ok(ProviderKind::Wikipedia),
            other => Err(Error::InvalidInput(format!(
                "Unknown image provider '{}', expected flickr or wikipedia",
                other
            ))),
        }
    }
}

/// A representative image for a species
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BirdImage {
    pub url: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub author_url: Option<String>,
    pub license: Option<String>,
    pub license_url: Option<String>,
    /// Provider-side identifier (e.g. Flickr photo id)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    pub source: ProviderKind,
}

/// Provider call failures
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// One external image lookup service
#[async_trait]
pub trait ImageProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Look up an image for `sci_name`; `Ok(None)` when the provider has none
    async fn fetch(&self, sci_name: &str) -> std::result::Result<Option<BirdImage>, ProviderError>;
}

/// Shared HTTP client for provider adapters
pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(PROVIDER_TIMEOUT)
        .build()
        .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {}", e)))
}

/// Cache-fronted image lookup across providers
pub struct ImageResolver {
    cache: ImageCache,
    providers: HashMap<ProviderKind, Arc<dyn ImageProvider>>,
}

impl ImageResolver {
    pub fn new(cache: ImageCache) -> Self {
        Self {
            cache,
            providers: HashMap::new(),
        }
    }

    /// Register a provider, replacing any previous one of the same kind
    pub fn with_provider(mut self, provider: Arc<dyn ImageProvider>) -> Self {
        self.providers.insert(provider.kind(), provider);
        self
    }

    pub fn cache(&self) -> &ImageCache {
        &self.cache
    }

    /// Resolve an image for `sci_name` through `provider`
    ///
    /// Returns `NotFound` when the provider has no image or fails.
    pub async fn resolve(
        &self,
        sci_name: &str,
        provider: ProviderKind,
        force_refresh: bool,
    ) -> Result<BirdImage> {
        let sci_name = sci_name.trim();
        if sci_name.is_empty() {
            return Err(Error::InvalidInput("Scientific name must not be empty".to_string()));
        }

        if !force_refresh {
            match self.cache.get(provider, sci_name).await {
                Ok(Some(image)) if !image.url.is_empty() => {
                    debug!(sci_name = %sci_name, provider = %provider, "Image cache hit");
                    return Ok(image);
                }
                Ok(_) => {}
                Err(e) => warn!(sci_name = %sci_name, error = %e, "Image cache read failed, treating as miss"),
            }
        }

        let adapter = self.providers.get(&provider).ok_or_else(|| {
            Error::InvalidInput(format!("Image provider not configured: {}", provider))
        })?;

        match adapter.fetch(sci_name).await {
            Ok(Some(image)) => {
                if let Err(e) = self.cache.upsert(provider, sci_name, &image).await {
                    warn!(sci_name = %sci_name, error = %e, "Failed to cache image");
                }
                info!(sci_name = %sci_name, provider = %provider, "Resolved species image");
                Ok(image)
            }
            Ok(None) => Err(Error::NotFound(format!("No image found for {}", sci_name))),
            Err(e) => {
                warn!(sci_name = %sci_name, provider = %provider, error = %e, "Image provider failed");
                Err(Error::NotFound(format!("No image found for {}", sci_name)))
            }
        }
    }

    /// Drop the cached image so the next lookup goes back to the provider
    pub async fn blacklist(&self, sci_name: &str, provider: ProviderKind) -> Result<bool> {
        let removed = self.cache.remove(provider, sci_name).await?;
        info!(sci_name = %sci_name, provider = %provider, removed, "Blacklisted cached image");
        Ok(removed)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::CountingProvider;
    use super::*;

    async fn resolver_with(provider: Arc<CountingProvider>) -> ImageResolver {
        let cache = ImageCache::in_memory().await.unwrap();
        ImageResolver::new(cache).with_provider(provider)
    }

    #[test]
    fn test_provider_kind_parse() {
        assert_eq!("Flickr".parse::<ProviderKind>().unwrap(), ProviderKind::Flickr);
        assert_eq!("wikipedia".parse::<ProviderKind>().unwrap(), ProviderKind::Wikipedia);
        assert!(matches!("gravatar".parse::<ProviderKind>(), Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_second_resolve_hits_cache() {
        let provider = Arc::new(CountingProvider::found(ProviderKind::Flickr, "https://img/1.jpg"));
        let resolver = resolver_with(provider.clone()).await;

        let first = resolver.resolve("Turdus migratorius", ProviderKind::Flickr, false).await.unwrap();
        let second = resolver.resolve("Turdus migratorius", ProviderKind::Flickr, false).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_force_refresh_and_blacklist_call_provider_again() {
        let provider = Arc::new(CountingProvider::found(ProviderKind::Flickr, "https://img/1.jpg"));
        let resolver = resolver_with(provider.clone()).await;

        resolver.resolve("Turdus migratorius", ProviderKind::Flickr, false).await.unwrap();
        resolver.resolve("Turdus migratorius", ProviderKind::Flickr, true).await.unwrap();
        assert_eq!(provider.calls(), 2);

        assert!(resolver.blacklist("Turdus migratorius", ProviderKind::Flickr).await.unwrap());
        assert!(!resolver.blacklist("Turdus migratorius", ProviderKind::Flickr).await.unwrap());

        resolver.resolve("Turdus migratorius", ProviderKind::Flickr, false).await.unwrap();
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let provider = Arc::new(CountingProvider {
            fail: true,
            ..CountingProvider::found(ProviderKind::Wikipedia, "unused")
        });
        let resolver = resolver_with(provider.clone()).await;

        for _ in 0..2 {
            assert!(matches!(
                resolver.resolve("Turdus migratorius", ProviderKind::Wikipedia, false).await,
                Err(Error::NotFound(_))
            ));
        }
        assert_eq!(provider.calls(), 2);
        assert!(resolver
            .cache()
            .get(ProviderKind::Wikipedia, "Turdus migratorius")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_no_result_is_not_found() {
        let provider = Arc::new(CountingProvider {
            answer: None,
            ..CountingProvider::found(ProviderKind::Flickr, "unused")
        });
        let resolver = resolver_with(provider.clone()).await;
        assert!(matches!(
            resolver.resolve("Turdus migratorius", ProviderKind::Flickr, false).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_unregistered_provider_rejected() {
        let provider = Arc::new(CountingProvider::found(ProviderKind::Flickr, "https://img/1.jpg"));
        let resolver = resolver_with(provider).await;
        assert!(matches!(
            resolver.resolve("Turdus migratorius", ProviderKind::Wikipedia, false).await,
            Err(Error::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_providers_cached_independently() {
        let flickr = Arc::new(CountingProvider::found(ProviderKind::Flickr, "https://flickr/1.jpg"));
        let wiki = Arc::new(CountingProvider::found(ProviderKind::Wikipedia, "https://wiki/1.jpg"));
        let cache = ImageCache::in_memory().await.unwrap();
        let resolver = ImageResolver::new(cache)
            .with_provider(flickr.clone())
            .with_provider(wiki.clone());

        let a = resolver.resolve("Turdus migratorius", ProviderKind::Flickr, false).await.unwrap();
        let b = resolver.resolve("Turdus migratorius", ProviderKind::Wikipedia, false).await.unwrap();
        assert_eq!(a.url, "https://flickr/1.jpg");
        assert_eq!(b.url, "https://wiki/1.jpg");
        assert_eq!((flickr.calls(), wiki.calls()), (1, 1));
    }
}
