//! The download module saves the image of every dataset item into a local
//! directory, looking placeholders up on Wikipedia first.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use base64::{Engine, engine::general_purpose::STANDARD};
use log::{info, warn};
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use url::Url;

use crate::constants::{BROWSER_USER_AGENT, DEFAULT_DOWNLOAD_DELAY_MS, DEFAULT_IMAGES_DIR};
use crate::model::{DrugDataset, DrugItem};
use crate::placeholder::is_placeholder;
use crate::search::{ImageSearch, WikipediaImageSearch};
use crate::text::file_slug;

/// Settings of a `download` run.
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    pub dataset_path: PathBuf,
    pub output_dir: PathBuf,
    /// Only download items with these brand names.
    pub names: Option<HashSet<String>>,
    /// Stop after this many saved images.
    pub limit: Option<usize>,
    /// Pause after every saved image.
    pub delay: Duration,
}

impl DownloadOptions {
    pub fn new(dataset_path: impl Into<PathBuf>) -> Self {
        Self {
            dataset_path: dataset_path.into(),
            output_dir: PathBuf::from(DEFAULT_IMAGES_DIR),
            names: None,
            limit: None,
            delay: Duration::from_millis(DEFAULT_DOWNLOAD_DELAY_MS),
        }
    }
}

/// Counters reported at the end of a download run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DownloadReport {
    pub saved: usize,
    pub skipped: usize,
}

/// Where an image candidate comes from, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageOrigin {
    Dataset,
    Search,
    Placeholder,
}

/// Looks for an external image of an item, trying each query on every search
/// service in turn.
pub async fn find_external_image(
    searches: &[&dyn ImageSearch],
    brand_name: &str,
    generic_name: &str,
) -> Option<String> {
    let queries = [
        brand_name.to_string(),
        generic_name.to_string(),
        format!("{brand_name} 药品 包装"),
        format!("{generic_name} 药品 包装"),
    ];
    let mut tried = HashSet::new();

    for query in &queries {
        let query = query.trim();
        if query.is_empty() || !tried.insert(query.to_string()) {
            continue;
        }

        for search in searches {
            match search.search(query).await {
                Ok(Some(url)) => return Some(url),
                Ok(None) => {}
                Err(err) => warn!("Image search failed for {query}: {err:#}"),
            }
        }
    }

    None
}

/// Orders the image candidates of an item: the best source first, then the
/// placeholder as a fallback.
pub async fn resolve_candidates(
    item: &DrugItem,
    searches: &[&dyn ImageSearch],
) -> Vec<(String, ImageOrigin)> {
    let image = item.image.as_str();
    let mut candidates = Vec::new();

    if !image.is_empty() && !is_placeholder(image) {
        candidates.push((image.to_string(), ImageOrigin::Dataset));
    } else if let Some(url) =
        find_external_image(searches, &item.brand_name, &item.generic_name).await
    {
        candidates.push((url, ImageOrigin::Search));
    }

    if is_placeholder(image) && candidates.iter().all(|(source, _)| source != image) {
        candidates.push((image.to_string(), ImageOrigin::Placeholder));
    }

    candidates
}

/// Decodes a base64 `data:` URI into its bytes and a file extension.
///
/// # Errors
///
/// Returns an error if the URI has no base64 MIME header or the payload is not
/// valid base64.
pub fn decode_data_uri(uri: &str) -> Result<(Vec<u8>, String)> {
    let (header, payload) = uri.split_once(',').context("Data URI has no payload")?;
    let mime = header
        .strip_prefix("data:")
        .and_then(|rest| rest.strip_suffix(";base64"))
        .filter(|mime| !mime.is_empty())
        .context("Unable to parse the MIME type of the data URI")?;

    let bytes = STANDARD
        .decode(payload)
        .context("Invalid base64 payload in data URI")?;
    Ok((bytes, extension_for_mime(mime).unwrap_or(".bin").to_string()))
}

/// File extension commonly used for an image MIME type.
pub fn extension_for_mime(mime: &str) -> Option<&'static str> {
    match mime {
        "image/svg+xml" => Some(".svg"),
        "image/png" => Some(".png"),
        "image/jpeg" | "image/jpg" => Some(".jpg"),
        "image/gif" => Some(".gif"),
        "image/webp" => Some(".webp"),
        "image/bmp" => Some(".bmp"),
        "image/x-icon" | "image/vnd.microsoft.icon" => Some(".ico"),
        "image/tiff" => Some(".tiff"),
        "image/avif" => Some(".avif"),
        _ => None,
    }
}

fn extension_from_url(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|url| {
            Path::new(url.path())
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| format!(".{ext}"))
        })
        .unwrap_or_else(|| ".bin".to_string())
}

async fn download_http(client: &Client, url: &str) -> Result<(Vec<u8>, String)> {
    let response = client
        .get(url)
        .header(USER_AGENT, BROWSER_USER_AGENT)
        .timeout(Duration::from_secs(20))
        .send()
        .await?
        .error_for_status()?;

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(|value| value.trim().to_string())
        .unwrap_or_default();

    if !content_type.is_empty() && !content_type.starts_with("image/") {
        anyhow::bail!("Content-Type {content_type} is not an image");
    }

    let ext = extension_for_mime(&content_type)
        .map(str::to_string)
        .unwrap_or_else(|| extension_from_url(url));
    let bytes = response.bytes().await?;

    Ok((bytes.to_vec(), ext))
}

async fn load_image(client: &Client, source: &str) -> Result<(Vec<u8>, String)> {
    if source.starts_with("data:image") {
        decode_data_uri(source)
    } else if source.starts_with("http") {
        download_http(client, source).await
    } else {
        let preview: String = source.chars().take(30).collect();
        anyhow::bail!("Unsupported image source: {preview}...")
    }
}

async fn save_image(client: &Client, source: &str, dir: &Path, stem: &str) -> Result<PathBuf> {
    let (bytes, ext) = load_image(client, source).await?;
    let file_path = dir.join(format!("{stem}{ext}"));
    fs::write(&file_path, bytes)
        .with_context(|| format!("Failed to write {}", file_path.display()))?;
    Ok(file_path)
}

/// Reads a dataset file written by `generate`.
///
/// # Errors
///
/// Returns an error if the file is missing or is not a dataset.
pub fn read_dataset(path: &Path) -> Result<DrugDataset> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Dataset file not found: {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid dataset file {}", path.display()))
}

/// Saves one image per dataset item into the output directory.
///
/// Per-item failures are logged and counted as skipped.
///
/// # Errors
///
/// Returns an error if the dataset can't be read or the output directory can't
/// be created.
pub async fn download_images(options: &DownloadOptions) -> Result<DownloadReport> {
    let (zh, en) = (WikipediaImageSearch::new("zh"), WikipediaImageSearch::new("en"));
    let searches: [&dyn ImageSearch; 2] = [&zh, &en];
    download_images_with(options, &searches).await
}

/// Same as [`download_images`], looking placeholders up with `searches`.
///
/// # Errors
///
/// Returns an error if the dataset can't be read or the output directory can't
/// be created.
pub async fn download_images_with(
    options: &DownloadOptions,
    searches: &[&dyn ImageSearch],
) -> Result<DownloadReport> {
    let dataset = read_dataset(&options.dataset_path)?;
    fs::create_dir_all(&options.output_dir)
        .with_context(|| format!("Failed to create {}", options.output_dir.display()))?;

    let client = Client::new();
    let mut report = DownloadReport::default();

    let items = dataset.items().filter(|item| {
        options
            .names
            .as_ref()
            .is_none_or(|names| names.contains(&item.brand_name))
    });

    for item in items {
        if options.limit.is_some_and(|limit| report.saved >= limit) {
            break;
        }

        let brand = item.brand_name.as_str();
        let candidates = resolve_candidates(item, searches).await;
        if candidates.is_empty() {
            info!("Skipping {brand}, no image source available");
            report.skipped += 1;
            continue;
        }

        let stem = file_slug(&format!("{brand}-{}", item.generic_name));

        let mut saved = false;
        for (source, origin) in &candidates {
            match save_image(&client, source, &options.output_dir, &stem).await {
                Ok(file_path) => {
                    info!("Saved {brand} [{origin:?}] to {}", file_path.display());
                    report.saved += 1;
                    saved = true;
                    tokio::time::sleep(options.delay).await;
                    break;
                }
                Err(err) => warn!("Failed to save image for {brand} ({origin:?}): {err:#}"),
            }
        }

        if !saved {
            warn!("No image saved for {brand}");
            report.skipped += 1;
        }
    }

    info!(
        "Saved {} images, skipped {}, output directory {}",
        report.saved,
        report.skipped,
        options.output_dir.display()
    );
    Ok(report)
}
