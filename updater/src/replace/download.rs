//! Asset download abstraction.

use std::path::Path;

use crate::error::DownloadError;
use crate::http::HttpClient;

/// Downloads a release asset to a local file.
#[cfg_attr(test, mockall::automock)]
pub trait AssetDownloader {
    /// Writes the body of `url` to `dest`, returning the number of bytes.
    ///
    /// # Errors
    ///
    /// Returns a [`DownloadError`] when the transfer or the write fails.
    fn download(&self, url: &str, dest: &Path) -> Result<u64, DownloadError>;
}

/// Downloads assets over HTTP.
#[derive(Debug)]
pub struct HttpDownloader {
    client: HttpClient,
}

impl HttpDownloader {
    /// Creates a downloader; `client` should carry the download timeout.
    #[must_use]
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }
}

impl AssetDownloader for HttpDownloader {
    fn download(&self, url: &str, dest: &Path) -> Result<u64, DownloadError> {
        self.client.download_to(url, dest)
    }
}
