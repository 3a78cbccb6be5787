//! Remote pack manifest retrieval.
//!
//! Manifests are packwiz-style `pack.toml` documents. Only `version` drives
//! update decisions; the other fields are exposed for display and for the
//! content-sync collaborator.

use chrono::Utc;
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::error::SyncError;
use crate::http::HttpClient;

/// Parsed remote manifest.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PackManifest {
    /// Pack name, if published.
    pub name: Option<String>,
    /// Pack author, if published.
    pub author: Option<String>,
    /// Published content version, trimmed and non-empty.
    pub version: String,
    /// Manifest format identifier.
    pub pack_format: Option<String>,
    /// Runtime and loader versions, for example `minecraft = "1.20.1"`.
    pub versions: BTreeMap<String, String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawManifest {
    name: Option<String>,
    author: Option<String>,
    version: Option<String>,
    pack_format: Option<String>,
    #[serde(default)]
    versions: BTreeMap<String, String>,
}

/// Parses manifest `text` fetched from `url`.
///
/// # Errors
///
/// Returns [`SyncError::ManifestFetchFailed`] when the text is not valid
/// TOML or the `version` field is missing or blank.
///
/// # Examples
///
/// ```
/// use lodestone_updater::content::manifest::parse_manifest;
///
/// let manifest = parse_manifest(
///     "https://example.test/pack.toml",
///     "name = \"The Boys\"\nversion = \"3.2.27\"\n",
/// )
/// .expect("valid manifest");
/// assert_eq!(manifest.version, "3.2.27");
/// ```
pub fn parse_manifest(url: &str, text: &str) -> Result<PackManifest, SyncError> {
    let raw: RawManifest = toml::from_str(text).map_err(|err| SyncError::ManifestFetchFailed {
        url: url.to_owned(),
        reason: format!("invalid manifest: {}", err.message()),
    })?;
    let version = raw
        .version
        .map(|version| version.trim().to_owned())
        .filter(|version| !version.is_empty())
        .ok_or_else(|| SyncError::ManifestFetchFailed {
            url: url.to_owned(),
            reason: "manifest has no version".to_owned(),
        })?;
    Ok(PackManifest {
        name: raw.name,
        author: raw.author,
        version,
        pack_format: raw.pack_format,
        versions: raw.versions,
    })
}

/// Appends `cb=<unix_secs>` to `url`, using `&` if a query already exists.
///
/// # Examples
///
/// ```
/// use lodestone_updater::content::cache_busted_url;
///
/// assert_eq!(cache_busted_url("https://x.test/pack.toml", 7), "https://x.test/pack.toml?cb=7");
/// assert_eq!(cache_busted_url("https://x.test/p?ref=main", 7), "https://x.test/p?ref=main&cb=7");
/// ```
#[must_use]
pub fn cache_busted_url(url: &str, unix_secs: i64) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}cb={unix_secs}")
}

/// Fetches remote manifests.
#[cfg_attr(test, mockall::automock)]
pub trait ManifestFetcher {
    /// Fetches and parses the manifest at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::ManifestFetchFailed`] on any network or parse
    /// failure. There is no fallback to a cached copy.
    fn fetch(&self, url: &str) -> Result<PackManifest, SyncError>;
}

/// Fetches manifests over HTTP with caching disabled.
#[derive(Debug)]
pub struct HttpManifestFetcher {
    client: HttpClient,
    cache_bust: bool,
}

impl HttpManifestFetcher {
    /// Creates a fetcher; `cache_bust` adds a `cb=` query parameter.
    #[must_use]
    pub fn new(client: HttpClient, cache_bust: bool) -> Self {
        Self { client, cache_bust }
    }
}

impl ManifestFetcher for HttpManifestFetcher {
    fn fetch(&self, url: &str) -> Result<PackManifest, SyncError> {
        let request_url = if self.cache_bust {
            cache_busted_url(url, Utc::now().timestamp())
        } else {
            url.to_owned()
        };
        log::debug!("fetching manifest {request_url}");
        let text = self
            .client
            .get_text(
                &request_url,
                &[("Cache-Control", "no-cache"), ("Pragma", "no-cache")],
            )
            .map_err(|err| SyncError::ManifestFetchFailed {
                url: url.to_owned(),
                reason: err.to_string(),
            })?;
        parse_manifest(url, &text)
    }
}
