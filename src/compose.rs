//! The compose module runs the whole pipeline: it fetches the markdown list,
//! builds the categories, attaches an image to every item and writes the
//! dataset and image cache to disk.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use log::{info, warn};
use reqwest::Client;

use crate::constants::{DEFAULT_CACHE_PATH, DEFAULT_DATASET_PATH, SOURCE_URL};
use crate::model::{DrugCategory, DrugDataset};
use crate::parse::{build_categories, extract_category_counts, extract_summary, parse_title};
use crate::placeholder::placeholder_image;
use crate::search::{SearchContext, fetch_real_image};
use crate::storage::ImageCache;

/// Locations used by a `generate` run.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// URL of the markdown document.
    pub source_url: String,
    /// Where the dataset JSON is written.
    pub output_path: PathBuf,
    /// Where the image cache lives between runs.
    pub cache_path: PathBuf,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            source_url: SOURCE_URL.to_string(),
            output_path: PathBuf::from(DEFAULT_DATASET_PATH),
            cache_path: PathBuf::from(DEFAULT_CACHE_PATH),
        }
    }
}

/// Downloads the source markdown document.
///
/// # Errors
///
/// Returns an error if the request fails or the server answers with a
/// non-success status.
pub async fn fetch_source(client: &Client, url: &str) -> Result<String> {
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to fetch {url}"))?;

    let status = response.status();
    if !status.is_success() {
        anyhow::bail!("Failed to fetch {url}: {status}");
    }

    response
        .text()
        .await
        .with_context(|| format!("Failed to read {url}"))
}

/// Parses the markdown document into a dataset. Items have no image yet.
pub fn build_dataset(markdown: &str, source_url: &str, generated_at: DateTime<Utc>) -> DrugDataset {
    let lines: Vec<&str> = markdown.split('\n').collect();

    let summary = extract_summary(&lines);
    let counts = extract_category_counts(&lines);
    let categories = build_categories(markdown, &counts);

    DrugDataset {
        title: parse_title(&lines),
        summary,
        total_categories: categories.len(),
        categories,
        generated_at: generated_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        source_url: source_url.to_string(),
    }
}

/// Gives every item an image, one item at a time.
///
/// Items without a real photo get the deterministic placeholder, so no image
/// is ever left empty.
pub async fn enrich_images(
    categories: &mut [DrugCategory],
    cache: &mut ImageCache,
    ctx: &SearchContext<'_>,
) {
    let mut real_images = 0;
    let mut placeholders = 0;

    for category in categories.iter_mut() {
        for item in category.items.iter_mut() {
            let image_url = fetch_real_image(
                &item.brand_name,
                &item.generic_name,
                cache,
                ctx,
                Utc::now(),
            )
            .await;

            item.image = match image_url {
                Some(url) => {
                    real_images += 1;
                    url
                }
                None => {
                    placeholders += 1;
                    placeholder_image(&item.brand_name, &item.generic_name)
                }
            };
        }
    }

    info!("Attached {real_images} real images and {placeholders} placeholders");
}

/// Writes the dataset as pretty-printed JSON, creating parent directories.
///
/// # Errors
///
/// Returns an error if the directory or the file can't be written.
pub fn write_dataset(path: &Path, dataset: &DrugDataset) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let json = serde_json::to_string_pretty(dataset)?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;

    Ok(())
}

/// Runs the pipeline on an already fetched document: parse, enrich, write the
/// dataset and save the cache when it changed.
///
/// # Errors
///
/// Returns an error if the dataset or the cache can't be written.
pub async fn compose(
    markdown: &str,
    options: &GenerateOptions,
    ctx: &SearchContext<'_>,
) -> Result<DrugDataset> {
    let mut dataset = build_dataset(markdown, &options.source_url, Utc::now());
    info!(
        "Parsed {} categories with {} items",
        dataset.total_categories,
        dataset.items().count()
    );

    let mut cache = ImageCache::load(&options.cache_path);
    enrich_images(&mut dataset.categories, &mut cache, ctx).await;

    write_dataset(&options.output_path, &dataset)?;
    if cache.is_dirty() {
        cache.save(&options.cache_path)?;
        info!("Saved image cache to {}", options.cache_path.display());
    }

    info!("Dataset written to {}", options.output_path.display());
    Ok(dataset)
}

/// Fetches the source document and runs [`compose`] on it.
///
/// # Errors
///
/// Returns an error if the source document can't be fetched, or the outputs
/// can't be written.
pub async fn generate(options: &GenerateOptions, ctx: &SearchContext<'_>) -> Result<DrugDataset> {
    if !ctx.is_enabled() {
        warn!("No image search API key configured, using placeholder images");
    }

    info!("Fetching {}", options.source_url);
    let markdown = fetch_source(&Client::new(), &options.source_url).await?;

    compose(markdown.as_str(), options, ctx).await
}
