//! Best-effort retrieval of registered stylesheets and images.
//!
//! The actual HTTP work lives outside this crate behind the [`Fetcher`]
//! seam. Collection is resumable: files already on disk are kept, and a
//! failed fetch is logged and skipped rather than aborting the book — a
//! half-downloaded book is still useful for resuming.

use std::fs;
use std::path::Path;

use log::{info, warn};

use crate::error::Result;

use super::registry::AssetRegistry;

/// Retrieves raw bytes for a URL. Implemented by the surrounding
/// application's HTTP layer; expected to return
/// [`Error::AssetUnavailable`](crate::Error::AssetUnavailable) (or any
/// other error) on failure.
pub trait Fetcher {
    fn fetch(&mut self, url: &str) -> Result<Vec<u8>>;
}

/// Download every registered stylesheet into `styles_dir` as
/// `StyleNN.css`, keyed by registry index. Returns the file names present
/// afterwards, in index order.
pub fn collect_stylesheets<F: Fetcher>(
    fetcher: &mut F,
    registry: &AssetRegistry,
    styles_dir: &Path,
) -> Result<Vec<String>> {
    fs::create_dir_all(styles_dir)?;

    let mut present = Vec::new();
    for (index, url) in registry.stylesheet_urls().iter().enumerate() {
        let file_name = AssetRegistry::stylesheet_file_name(index);
        let target = styles_dir.join(&file_name);
        if target.is_file() {
            info!("stylesheet {file_name} already present, keeping it");
            present.push(file_name);
            continue;
        }
        match fetcher.fetch(url) {
            Ok(bytes) => {
                fs::write(&target, bytes)?;
                present.push(file_name);
            }
            Err(err) => warn!("could not retrieve stylesheet {url}: {err}"),
        }
    }
    Ok(present)
}

/// Download every registered image into `images_dir`, named by the URL's
/// last path segment. Returns the file names present afterwards.
pub fn collect_images<F: Fetcher>(
    fetcher: &mut F,
    registry: &AssetRegistry,
    images_dir: &Path,
) -> Result<Vec<String>> {
    fs::create_dir_all(images_dir)?;

    let mut present = Vec::new();
    for url in registry.image_urls() {
        let file_name = url.rsplit('/').next().unwrap_or(url).to_string();
        let target = images_dir.join(&file_name);
        if target.is_file() {
            info!("image {file_name} already present, keeping it");
            if !present.contains(&file_name) {
                present.push(file_name);
            }
            continue;
        }
        match fetcher.fetch(url) {
            Ok(bytes) => {
                fs::write(&target, bytes)?;
                if !present.contains(&file_name) {
                    present.push(file_name);
                }
            }
            Err(err) => warn!("could not retrieve image {url}: {err}"),
        }
    }
    Ok(present)
}
