//! Download one archive URL and materialize its files on disk.

use anyhow::{Context, Result};
use reqwest::Client;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use url::Url;
use zip::ZipArchive;

/// Outcome of materializing one URL.
#[derive(Debug)]
pub enum Fetched {
    /// Destination directory already holds files (or the URL points at an
    /// unsupported file type); nothing to process.
    Skipped,
    /// Freshly downloaded: the per-URL directory and every file in it.
    Files {
        save_dir: PathBuf,
        files: Vec<PathBuf>,
    },
}

/// Download `url` into `<data_dir>/<archive stem>/`, extracting ZIPs in
/// place and deleting the archive afterwards.
///
/// A destination directory that already exists *and contains files* means
/// the URL was processed by an earlier run and is skipped; an empty
/// directory left behind by an aborted download is retried.
pub async fn download_and_materialize(
    client: &Client,
    url_str: &str,
    data_dir: &Path,
) -> Result<Fetched> {
    let url = Url::parse(url_str).with_context(|| format!("parsing URL {url_str:?}"))?;
    let file_name = url
        .path_segments()
        .and_then(|segments| segments.last())
        .filter(|name| !name.is_empty())
        .with_context(|| format!("URL {url_str:?} has no file name"))?
        .to_string();
    let stem = file_name.split('.').next().unwrap_or(&file_name);
    let extension = file_name.rsplit('.').next().unwrap_or_default().to_lowercase();
    let save_dir = data_dir.join(stem);

    if dir_has_files(&save_dir) {
        info!(dir = %save_dir.display(), "directory already exists, skipping");
        return Ok(Fetched::Skipped);
    }
    if extension != "zip" && extension != "csv" {
        info!(file = %file_name, "skip unsupported extension");
        return Ok(Fetched::Skipped);
    }

    fs::create_dir_all(&save_dir)
        .with_context(|| format!("creating {}", save_dir.display()))?;
    let bytes = client
        .get(url.as_str())
        .send()
        .await?
        .error_for_status()?
        .bytes()
        .await
        .with_context(|| format!("downloading {url_str}"))?;
    let file_path = save_dir.join(&file_name);
    tokio::fs::write(&file_path, &bytes)
        .await
        .with_context(|| format!("writing {}", file_path.display()))?;
    info!(file = %file_path.display(), bytes = bytes.len(), "downloaded");

    if extension == "zip" {
        // Extraction is blocking work; keep it off the async runtime.
        let archive_path = file_path.clone();
        let extract_dir = save_dir.clone();
        tokio::task::spawn_blocking(move || extract_zip(&archive_path, &extract_dir))
            .await
            .context("zip extraction task")??;
        fs::remove_file(&file_path)
            .with_context(|| format!("removing archive {}", file_path.display()))?;
    }

    let mut files = Vec::new();
    walk_dir(&save_dir, &mut files)?;
    files.sort();
    Ok(Fetched::Files { save_dir, files })
}

fn extract_zip(archive_path: &Path, dest: &Path) -> Result<()> {
    let file = fs::File::open(archive_path)
        .with_context(|| format!("opening archive {}", archive_path.display()))?;
    let mut archive = ZipArchive::new(file)
        .with_context(|| format!("reading archive {}", archive_path.display()))?;
    archive
        .extract(dest)
        .with_context(|| format!("extracting into {}", dest.display()))?;
    Ok(())
}

fn dir_has_files(dir: &Path) -> bool {
    match fs::read_dir(dir) {
        Ok(mut entries) => entries.next().is_some(),
        Err(_) => false,
    }
}

/// Recursively list all files under `dir`.
fn walk_dir(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))? {
        let path = entry?.path();
        if path.is_dir() {
            walk_dir(&path, files)?;
        } else {
            files.push(path);
        }
    }
    Ok(())
}
