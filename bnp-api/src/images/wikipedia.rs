//! Wikipedia REST summary adapter

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tracing::debug;

use super::{BirdImage, ImageProvider, ProviderError, ProviderKind};

pub const WIKIPEDIA_BASE_URL: &str = "https://en.wikipedia.org";

#[derive(Debug, Deserialize)]
struct Summary {
    title: Option<String>,
    originalimage: Option<ImageRef>,
    thumbnail: Option<ImageRef>,
}

#[derive(Debug, Deserialize)]
struct ImageRef {
    source: String,
}

/// Article title for a scientific name (`Turdus migratorius` → `Turdus_migratorius`)
fn article_title(sci_name: &str) -> String {
    sci_name.trim().replace(' ', "_")
}

fn parse_summary(body: &str, sci_name: &str) -> Result<Option<BirdImage>, ProviderError> {
    let summary: Summary =
        serde_json::from_str(body).map_err(|e| ProviderError::Parse(e.to_string()))?;

    let Some(image) = summary.originalimage.or(summary.thumbnail) else {
        return Ok(None);
    };

    Ok(Some(BirdImage {
        url: image.source,
        title: Some(summary.title.unwrap_or_else(|| sci_name.to_string())),
        author: None,
        author_url: None,
        license: None,
        license_url: None,
        external_id: None,
        source: ProviderKind::Wikipedia,
    }))
}

/// Wikipedia-backed image provider
pub struct WikipediaProvider {
    client: reqwest::Client,
    base_url: String,
}

impl WikipediaProvider {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_base_url(client, WIKIPEDIA_BASE_URL)
    }

    pub fn with_base_url(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn summary_url(&self, sci_name: &str) -> Result<Url, ProviderError> {
        let title = article_title(sci_name);
        let mut url = Url::parse(&self.base_url).map_err(|e| ProviderError::Parse(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| ProviderError::Parse(format!("Cannot use {} as a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(["api", "rest_v1", "page", "summary", title.as_str()]);
        Ok(url)
    }
}

#[async_trait]
impl ImageProvider for WikipediaProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Wikipedia
    }

    async fn fetch(&self, sci_name: &str) -> Result<Option<BirdImage>, ProviderError> {
        let url = self.summary_url(sci_name)?;
        debug!(sci_name = %sci_name, url = %url, "Fetching Wikipedia summary");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if response.status() != StatusCode::OK {
            debug!(sci_name = %sci_name, status = %response.status(), "No Wikipedia summary");
            return Ok(None);
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;
        parse_summary(&body, sci_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_url_encodes_title() {
        let provider = WikipediaProvider::new(reqwest::Client::new());
        assert_eq!(
            provider.summary_url("Turdus migratorius").unwrap().as_str(),
            "https://en.wikipedia.org/api/rest_v1/page/summary/Turdus_migratorius"
        );
        assert_eq!(
            provider.summary_url("A/B").unwrap().as_str(),
            "https://en.wikipedia.org/api/rest_v1/page/summary/A%2FB"
        );
    }

    #[test]
    fn test_prefers_original_image() {
        let body = r#"{
            "title": "American robin",
            "thumbnail": {"source": "https://upload.wikimedia.org/thumb.jpg", "width": 320, "height": 240},
            "originalimage": {"source": "https://upload.wikimedia.org/original.jpg", "width": 3000, "height": 2000},
            "content_urls": {"desktop": {"page": "https://en.wikipedia.org/wiki/American_robin"}}
        }"#;
        let image = parse_summary(body, "Turdus migratorius").unwrap().unwrap();
        assert_eq!(image.url, "https://upload.wikimedia.org/original.jpg");
        assert_eq!(image.title.as_deref(), Some("American robin"));
        assert!(image.author.is_none());
        assert!(image.author_url.is_none());
        assert!(image.license_url.is_none());
        assert_eq!(image.source, ProviderKind::Wikipedia);
    }

    #[test]
    fn test_falls_back_to_thumbnail() {
        let body = r#"{"thumbnail": {"source": "https://upload.wikimedia.org/thumb.jpg"}}"#;
        let image = parse_summary(body, "Turdus migratorius").unwrap().unwrap();
        assert_eq!(image.url, "https://upload.wikimedia.org/thumb.jpg");
        assert_eq!(image.title.as_deref(), Some("Turdus migratorius"));
    }

    #[test]
    fn test_no_image_is_none() {
        let body = r#"{"title": "Nonexistens", "extract": "..."}"#;
        assert!(parse_summary(body, "Nonexistens").unwrap().is_none());
    }

    #[test]
    fn test_malformed_body_is_parse_error() {
        assert!(matches!(
            parse_summary("<html>", "Turdus migratorius"),
            Err(ProviderError::Parse(_))
        ));
    }
}
