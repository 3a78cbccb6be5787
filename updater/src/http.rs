//! Blocking HTTP transport shared by discovery, manifests and downloads.
//!
//! Each [`HttpClient`] owns a `ureq` agent configured with a single global
//! timeout. Discovery and manifests use the short listing timeout; asset
//! downloads get their own client with the longer download timeout.

use std::fs::File;
use std::io;
use std::path::Path;
use std::time::Duration;

use crate::error::DownloadError;

/// Builds the `User-Agent` value for a component, for example
/// `Lodestone-updater/0.3.0`.
#[must_use]
pub fn user_agent(component: &str) -> String {
    format!("Lodestone-{component}/{}", crate::current_version())
}

/// A `ureq` agent plus the headers sent with every request.
#[derive(Clone, Debug)]
pub struct HttpClient {
    agent: ureq::Agent,
    user_agent: String,
}

impl HttpClient {
    /// Creates a client whose requests fail after `timeout`.
    #[must_use]
    pub fn new(timeout: Duration, user_agent: impl Into<String>) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
            user_agent: user_agent.into(),
        }
    }

    /// Fetches `url` and returns the body as text.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::NotFound`] for 404 responses and
    /// [`DownloadError::HttpError`] for any other failure.
    pub fn get_text(&self, url: &str, headers: &[(&str, &str)]) -> Result<String, DownloadError> {
        let mut request = self.agent.get(url).header("User-Agent", &self.user_agent);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        let response = request.call().map_err(|e| map_ureq_error(url, &e))?;
        response
            .into_body()
            .read_to_string()
            .map_err(|e| DownloadError::HttpError {
                url: url.to_owned(),
                reason: e.to_string(),
            })
    }

    /// Issues a HEAD request and returns the status code.
    ///
    /// Non-success statuses are returned rather than treated as errors so
    /// callers can distinguish "absent" from "unreachable".
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::HttpError`] when no response was received.
    pub fn head_status(&self, url: &str) -> Result<u16, DownloadError> {
        match self
            .agent
            .head(url)
            .header("User-Agent", &self.user_agent)
            .call()
        {
            Ok(response) => Ok(response.status().as_u16()),
            Err(ureq::Error::StatusCode(status)) => Ok(status),
            Err(other) => Err(map_ureq_error(url, &other)),
        }
    }

    /// Streams the body of `url` into `dest`, returning the bytes written.
    ///
    /// # Errors
    ///
    /// Returns a [`DownloadError`] when the request or the write fails.
    pub fn download_to(&self, url: &str, dest: &Path) -> Result<u64, DownloadError> {
        let response = self
            .agent
            .get(url)
            .header("User-Agent", &self.user_agent)
            .call()
            .map_err(|e| map_ureq_error(url, &e))?;
        let mut file = File::create(dest)?;
        let written = io::copy(&mut response.into_body().as_reader(), &mut file)?;
        file.sync_all()?;
        log::debug!("downloaded {written} bytes from {url} to {}", dest.display());
        Ok(written)
    }
}

/// Maps a `ureq` error to a [`DownloadError`].
pub(crate) fn map_ureq_error(url: &str, err: &ureq::Error) -> DownloadError {
    match err {
        ureq::Error::StatusCode(404) => DownloadError::NotFound {
            url: url.to_owned(),
        },
        other => DownloadError::HttpError {
            url: url.to_owned(),
            reason: other.to_string(),
        },
    }
}
