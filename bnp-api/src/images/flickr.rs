//! Flickr photo search adapter
//!
//! Two calls per lookup: `flickr.photos.search` picks the most relevant
//! Creative Commons photo, `flickr.photos.getInfo` supplies attribution.

use async_trait::async_trait;
use bnp_common::config::SettingsHandle;
use serde::Deserialize;
use tracing::debug;

use super::{BirdImage, ImageProvider, ProviderError, ProviderKind};

pub const FLICKR_REST_URL: &str = "https://api.flickr.com/services/rest/";

/// Creative Commons licenses accepted for species photos
const ALLOWED_LICENSES: &str = "1,2,3,4,5,6,9,10";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    stat: String,
    photos: Option<PhotoPage>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PhotoPage {
    #[serde(default)]
    photo: Vec<PhotoSummary>,
}

#[derive(Debug, Clone, Deserialize)]
struct PhotoSummary {
    id: String,
    server: String,
    secret: String,
}

#[derive(Debug, Deserialize)]
struct InfoResponse {
    stat: String,
    photo: Option<PhotoInfo>,
}

#[derive(Debug, Default, Deserialize)]
struct PhotoInfo {
    title: Option<TextContent>,
    owner: Option<Owner>,
    license: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct TextContent {
    #[serde(rename = "_content", default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct Owner {
    #[serde(default)]
    nsid: String,
    #[serde(default)]
    username: String,
}

/// Name and deed URL for a Flickr license id
fn license_for(id: &str) -> Option<(&'static str, &'static str)> {
    Some(match id {
        "1" => ("CC BY-NC-SA 2.0", "https://creativecommons.org/licenses/by-nc-sa/2.0/"),
        "2" => ("CC BY-NC 2.0", "https://creativecommons.org/licenses/by-nc/2.0/"),
        "3" => ("CC BY-NC-ND 2.0", "https://creativecommons.org/licenses/by-nc-nd/2.0/"),
        "4" => ("CC BY 2.0", "https://creativecommons.org/licenses/by/2.0/"),
        "5" => ("CC BY-SA 2.0", "https://creativecommons.org/licenses/by-sa/2.0/"),
        "6" => ("CC BY-ND 2.0", "https://creativecommons.org/licenses/by-nd/2.0/"),
        "9" => ("CC0 1.0", "https://creativecommons.org/publicdomain/zero/1.0/"),
        "10" => ("Public Domain Mark 1.0", "https://creativecommons.org/publicdomain/mark/1.0/"),
        _ => return None,
    })
}

/// Pick the first photo of a search response
fn first_photo(body: &str) -> Result<Option<PhotoSummary>, ProviderError> {
    let response: SearchResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::Parse(e.to_string()))?;
    if response.stat != "ok" {
        return Err(ProviderError::Api(
            200,
            response.message.unwrap_or_else(|| format!("stat={}", response.stat)),
        ));
    }
    Ok(response
        .photos
        .and_then(|page| page.photo.into_iter().next()))
}

fn parse_info(body: &str) -> Result<PhotoInfo, ProviderError> {
    let response: InfoResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::Parse(e.to_string()))?;
    if response.stat != "ok" {
        return Ok(PhotoInfo::default());
    }
    Ok(response.photo.unwrap_or_default())
}

fn build_image(photo: PhotoSummary, info: PhotoInfo) -> BirdImage {
    let license_id = info.license.map(|value| match value {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    });
    let (license, license_url) = match license_id.as_deref().and_then(license_for) {
        Some((name, url)) => (Some(name.to_string()), Some(url.to_string())),
        None => (license_id, None),
    };

    let (author, author_url) = match info.owner {
        Some(owner) if !owner.nsid.is_empty() => (
            Some(owner.username).filter(|u| !u.is_empty()),
            Some(format!("https://www.flickr.com/photos/{}", owner.nsid)),
        ),
        Some(owner) => (Some(owner.username).filter(|u| !u.is_empty()), None),
        None => (None, None),
    };

    BirdImage {
        url: format!(
            "https://live.staticflickr.com/{}/{}_{}_b.jpg",
            photo.server, photo.id, photo.secret
        ),
        title: info.title.map(|t| t.content).filter(|t| !t.is_empty()),
        author,
        author_url,
        license,
        license_url,
        external_id: Some(photo.id),
        source: ProviderKind::Flickr,
    }
}

/// Flickr-backed image provider
///
/// The API key is read from the station settings on every lookup so a
/// settings reload takes effect without restarting.
pub struct FlickrProvider {
    client: reqwest::Client,
    settings: SettingsHandle,
    endpoint: String,
}

impl FlickrProvider {
    pub fn new(client: reqwest::Client, settings: SettingsHandle) -> Self {
        Self {
            client,
            settings,
            endpoint: FLICKR_REST_URL.to_string(),
        }
    }

    async fn call(&self, params: &[(&str, &str)]) -> Result<String, ProviderError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(params)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api(status.as_u16(), text));
        }

        response
            .text()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))
    }
}

#[async_trait]
impl ImageProvider for FlickrProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Flickr
    }

    async fn fetch(&self, sci_name: &str) -> Result<Option<BirdImage>, ProviderError> {
        let api_key = self.settings.current().flickr_api_key.clone();
        if api_key.is_empty() {
            debug!("No Flickr API key configured");
            return Ok(None);
        }

        debug!(sci_name = %sci_name, "Searching Flickr");
        let body = self
            .call(&[
                ("method", "flickr.photos.search"),
                ("api_key", api_key.as_str()),
                ("text", sci_name),
                ("sort", "relevance"),
                ("media", "photos"),
                ("content_type", "1"),
                ("license", ALLOWED_LICENSES),
                ("per_page", "1"),
                ("format", "json"),
                ("nojsoncallback", "1"),
            ])
            .await?;

        let Some(photo) = first_photo(&body)? else {
            return Ok(None);
        };

        let body = self
            .call(&[
                ("method", "flickr.photos.getInfo"),
                ("api_key", api_key.as_str()),
                ("photo_id", photo.id.as_str()),
                ("format", "json"),
                ("nojsoncallback", "1"),
            ])
            .await?;
        let info = parse_info(&body)?;

        Ok(Some(build_image(photo, info)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEARCH: &str = r#"{
        "photos": {"page": 1, "pages": 120, "perpage": 1, "total": 120,
            "photo": [{"id": "53123", "owner": "1234@N05", "secret": "abcdef",
                       "server": "65535", "farm": 66, "title": "Robin",
                       "ispublic": 1, "isfriend": 0, "isfamily": 0}]},
        "stat": "ok"
    }"#;

    const INFO: &str = r#"{
        "photo": {"id": "53123", "license": "4",
            "owner": {"nsid": "1234@N05", "username": "birder", "realname": ""},
            "title": {"_content": "American Robin on a fence"}},
        "stat": "ok"
    }"#;

    #[test]
    fn test_builds_image_from_search_and_info() {
        let photo = first_photo(SEARCH).unwrap().unwrap();
        let info = parse_info(INFO).unwrap();
        let image = build_image(photo, info);

        assert_eq!(image.url, "https://live.staticflickr.com/65535/53123_abcdef_b.jpg");
        assert_eq!(image.title.as_deref(), Some("American Robin on a fence"));
        assert_eq!(image.author.as_deref(), Some("birder"));
        assert_eq!(image.author_url.as_deref(), Some("https://www.flickr.com/photos/1234@N05"));
        assert_eq!(image.license.as_deref(), Some("CC BY 2.0"));
        assert_eq!(
            image.license_url.as_deref(),
            Some("https://creativecommons.org/licenses/by/2.0/")
        );
        assert_eq!(image.external_id.as_deref(), Some("53123"));
        assert_eq!(image.source, ProviderKind::Flickr);
    }

    #[test]
    fn test_empty_search_has_no_photo() {
        let body = r#"{"photos": {"page": 1, "pages": 0, "perpage": 1, "total": 0, "photo": []}, "stat": "ok"}"#;
        assert!(first_photo(body).unwrap().is_none());
    }

    #[test]
    fn test_failed_search_is_api_error() {
        let body = r#"{"stat": "fail", "code": 100, "message": "Invalid API Key (Key has invalid format)"}"#;
        assert!(matches!(first_photo(body), Err(ProviderError::Api(_, msg)) if msg.contains("Invalid API Key")));
    }

    #[test]
    fn test_missing_info_keeps_url() {
        let photo = first_photo(SEARCH).unwrap().unwrap();
        let info = parse_info(r#"{"stat": "fail", "code": 1, "message": "Photo not found"}"#).unwrap();
        let image = build_image(photo, info);
        assert!(image.url.ends_with("53123_abcdef_b.jpg"));
        assert!(image.title.is_none());
        assert!(image.author_url.is_none());
    }

    #[test]
    fn test_numeric_license_id() {
        let photo = first_photo(SEARCH).unwrap().unwrap();
        let info = parse_info(r#"{"photo": {"license": 9}, "stat": "ok"}"#).unwrap();
        assert_eq!(build_image(photo, info).license.as_deref(), Some("CC0 1.0"));
    }

    #[tokio::test]
    async fn test_no_api_key_means_no_result() {
        let settings = SettingsHandle::fixed(bnp_common::config::Settings::default());
        let provider = FlickrProvider::new(reqwest::Client::new(), settings);
        assert!(provider.fetch("Turdus migratorius").await.unwrap().is_none());
    }
}
