//! Remote content sources.
//!
//! A [`ContentService`] wraps one public API endpoint and knows how to turn
//! its response into a piece of digest [`Content`]. There are two kinds,
//! modelled as the [`ServiceKind`] tagged union:
//!
//! | Kind | Result | Side effects |
//! |------|--------|--------------|
//! | Text | a formatted string | none |
//! | Image | path of the downloaded file | writes `local_path` |
//!
//! # Failure Policy
//!
//! [`ContentService::fetch`] never fails. Transport errors, non-200 statuses
//! and malformed payloads are logged and reported as `None` ("no content"),
//! and the caller simply leaves that item out of the digest. An image
//! service that fails also removes whatever file was at its `local_path`, so
//! a failed fetch never leaves a stale picture behind.

pub mod registry;

pub use registry::ServiceRegistry;

use crate::error::FetchError;
use crate::http::HttpClient;
use crate::models::Content;
use crate::utils::truncate_for_log;
use serde_json::Value;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// How a text service pulls its string out of a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extract {
    /// The whole body, trimmed.
    Raw,
    /// A JSON pointer (RFC 6901) to a string field, e.g. `/data/0`.
    JsonPointer(&'static str),
}

/// How an image service finds the URL of the actual image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolve {
    /// The service URL serves the image bytes directly.
    Direct,
    /// The service URL returns JSON; the pointer names the image URL.
    JsonPointer(&'static str),
    /// The service URL returns a bare file name or path, joined onto `base`.
    RelativePath { base: &'static str },
}

/// The two service variants. Only images carry a local path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceKind {
    Text {
        extract: Extract,
        /// Appended as ` - <attribution>` when set.
        attribution: Option<&'static str>,
    },
    Image {
        resolve: Resolve,
        local_path: PathBuf,
    },
}

/// One configured remote content source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentService {
    name: String,
    url: String,
    kind: ServiceKind,
}

impl ContentService {
    /// A text service. The name is stored lowercased.
    pub fn text(name: &str, url: &str, extract: Extract) -> Self {
        Self {
            name: name.trim().to_lowercase(),
            url: url.to_string(),
            kind: ServiceKind::Text {
                extract,
                attribution: None,
            },
        }
    }

    /// An image service writing to `local_path`. The name is stored lowercased.
    pub fn image(name: &str, url: &str, resolve: Resolve, local_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.trim().to_lowercase(),
            url: url.to_string(),
            kind: ServiceKind::Image {
                resolve,
                local_path: local_path.into(),
            },
        }
    }

    /// Set the attribution of a text service. No effect on image services.
    pub fn with_attribution(mut self, who: &'static str) -> Self {
        if let ServiceKind::Text { attribution, .. } = &mut self.kind {
            *attribution = Some(who);
        }
        self
    }

    /// The lowercase name recipients use to refer to this service.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The endpoint queried first on every fetch.
    ///
    /// For two-step image services this is the lookup endpoint, not the image.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Whether this is a text or an image service, with its strategy.
    pub fn kind(&self) -> &ServiceKind {
        &self.kind
    }

    /// Where downloaded bytes go; `None` for text services.
    ///
    /// The extension is a default: when the resolved image URL names a known
    /// image extension, the file is saved with that extension instead (see
    /// [`image_path_for`]).
    pub fn local_path(&self) -> Option<&Path> {
        match &self.kind {
            ServiceKind::Image { local_path, .. } => Some(local_path),
            ServiceKind::Text { .. } => None,
        }
    }

    /// Fetch one item of content, or `None` if anything went wrong.
    #[instrument(level = "info", skip_all, fields(service = %self.name))]
    pub async fn fetch(&self, http: &impl HttpClient) -> Option<Content> {
        let result = match &self.kind {
            ServiceKind::Text {
                extract,
                attribution,
            } => self
                .fetch_text(http, *extract, *attribution)
                .await
                .map(Content::Text),
            ServiceKind::Image {
                resolve,
                local_path,
            } => self
                .fetch_image(http, *resolve, local_path)
                .await
                .map(Content::Image),
        };

        match result {
            Ok(content) => {
                match &content {
                    Content::Text(text) => {
                        info!(text = %truncate_for_log(text, 80), "Fetched text")
                    }
                    Content::Image(path) => info!(path = %path.display(), "Fetched image"),
                }
                Some(content)
            }
            Err(e) => {
                warn!(url = %self.url, error = %e, "Fetch failed; no content");
                None
            }
        }
    }

    async fn fetch_text(
        &self,
        http: &impl HttpClient,
        extract: Extract,
        attribution: Option<&str>,
    ) -> Result<String, FetchError> {
        let res = http.get(&self.url).await?.require_ok(&self.url)?;
        let raw = match extract {
            Extract::Raw => res.text(),
            Extract::JsonPointer(pointer) => string_at(&res.json()?, pointer)?,
        };

        let text = raw.trim();
        if text.is_empty() {
            return Err(FetchError::Payload("empty text".to_string()));
        }

        Ok(match attribution {
            Some(who) => format!("{text} - {who}"),
            None => text.to_string(),
        })
    }

    async fn fetch_image(
        &self,
        http: &impl HttpClient,
        resolve: Resolve,
        local_path: &Path,
    ) -> Result<PathBuf, FetchError> {
        let outcome = self.download_image(http, resolve, local_path).await;
        if outcome.is_err() {
            if let Err(e) = remove_variants(local_path) {
                warn!(path = %local_path.display(), error = %e, "Could not remove stale image");
            }
        }
        outcome
    }

    async fn download_image(
        &self,
        http: &impl HttpClient,
        resolve: Resolve,
        local_path: &Path,
    ) -> Result<PathBuf, FetchError> {
        let image_url = self.resolve_image_url(http, resolve).await?;
        debug!(%image_url, "Resolved image URL");

        let res = http.get(&image_url).await?.require_ok(&image_url)?;
        if res.body.is_empty() {
            return Err(FetchError::Payload("empty image body".to_string()));
        }

        if let Some(parent) = local_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        // A previous run may have left the same picture under another extension.
        remove_variants(local_path)?;
        let dest = image_path_for(local_path, &image_url);
        fs::write(&dest, &res.body).await?;
        Ok(dest)
    }

    async fn resolve_image_url(
        &self,
        http: &impl HttpClient,
        resolve: Resolve,
    ) -> Result<String, FetchError> {
        match resolve {
            Resolve::Direct => Ok(self.url.clone()),
            Resolve::JsonPointer(pointer) => {
                let res = http.get(&self.url).await?.require_ok(&self.url)?;
                string_at(&res.json()?, pointer)
            }
            Resolve::RelativePath { base } => {
                let res = http.get(&self.url).await?.require_ok(&self.url)?;
                let text = res.text();
                let relative = text.trim();
                if relative.is_empty() {
                    return Err(FetchError::Payload("empty image path".to_string()));
                }
                Ok(Url::parse(base)?.join(relative)?.to_string())
            }
        }
    }

    /// Delete the downloaded file, if any.
    ///
    /// Removes the file under every known image extension, so it also catches
    /// files saved with an extension taken from the image URL. Safe to call any
    /// number of times; a missing file and text services are both no-ops.
    pub fn cleanup(&self) -> io::Result<()> {
        match self.local_path() {
            Some(path) => remove_variants(path),
            None => Ok(()),
        }
    }
}

fn string_at(value: &Value, pointer: &str) -> Result<String, FetchError> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| FetchError::Payload(format!("no string at {pointer}")))
}

/// Extensions an image may be saved under.
const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];

/// Pick the file an image downloaded from `image_url` is written to.
///
/// # Arguments
///
/// * `local_path` - The service's configured destination
/// * `image_url` - The resolved URL the bytes came from
///
/// # Returns
///
/// `local_path` with its extension replaced by the URL's, when the URL's last
/// path segment ends in a known image extension; otherwise `local_path`
/// unchanged.
pub fn image_path_for(local_path: &Path, image_url: &str) -> PathBuf {
    let ext = Url::parse(image_url).ok().and_then(|url| {
        let segment = url.path_segments()?.next_back()?.to_string();
        let ext = Path::new(&segment).extension()?.to_str()?.to_ascii_lowercase();
        IMAGE_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
    });
    match ext {
        Some(ext) => local_path.with_extension(ext),
        None => local_path.to_path_buf(),
    }
}

fn remove_variants(local_path: &Path) -> io::Result<()> {
    remove_if_present(local_path)?;
    for ext in IMAGE_EXTENSIONS {
        remove_if_present(&local_path.with_extension(ext))?;
    }
    Ok(())
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
