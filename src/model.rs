//! Model bundle acquisition: downloads and extracts the classifier archive
//! into the model directory when it is not already present.

use std::{
    fs,
    io::{Read, Write},
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result, bail};
use flate2::read::GzDecoder;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client;
use tar::Archive;

pub const MODEL_FILENAME: &str = "classify_image_graph_def.onnx";
pub const LABEL_MAP_FILENAME: &str = "imagenet_2012_challenge_label_map_proto.pbtxt";
pub const SYNSET_MAP_FILENAME: &str = "imagenet_synset_to_human_label_map.txt";

pub fn model_path(model_dir: &Path) -> PathBuf {
    model_dir.join(MODEL_FILENAME)
}

pub fn label_map_path(model_dir: &Path) -> PathBuf {
    model_dir.join(LABEL_MAP_FILENAME)
}

pub fn synset_map_path(model_dir: &Path) -> PathBuf {
    model_dir.join(SYNSET_MAP_FILENAME)
}

/// Makes sure the model file and its label maps exist under `model_dir`.
///
/// When the model file is missing, the archive at `archive_url` is
/// downloaded (kept under `model_dir`, so a later run skips the transfer)
/// and unpacked in place. With no archive URL to fall back on, a missing
/// model is an error.
pub fn ensure_bundle_ready(model_dir: &Path, archive_url: Option<&str>) -> Result<()> {
    let model = model_path(model_dir);
    if model.exists() {
        log::info!("model already present at {}", model.display());
        return Ok(());
    }

    let Some(archive_url) = archive_url else {
        bail!(
            "model file {} does not exist and no archive URL was given",
            model.display()
        );
    };

    fs::create_dir_all(model_dir)
        .with_context(|| format!("failed to create model directory {}", model_dir.display()))?;

    let archive_name = archive_url
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or("model_bundle.tar.gz");
    let archive_path = model_dir.join(archive_name);
    if !archive_path.exists() {
        download_to_path(archive_url, &archive_path)?;
    } else {
        log::info!("archive already downloaded at {}", archive_path.display());
    }

    extract_archive(&archive_path, model_dir)?;

    if !model.exists() {
        bail!(
            "archive {} did not contain {}",
            archive_path.display(),
            MODEL_FILENAME
        );
    }
    Ok(())
}

fn download_to_path(url: &str, dest: &Path) -> Result<()> {
    log::info!("downloading model bundle from {url} to {}", dest.display());

    let client = Client::new();
    let mut response = client
        .get(url)
        .send()
        .context("failed to start model bundle download")?
        .error_for_status()
        .context("model bundle download returned error status")?;

    let total_size = response.content_length();
    let progress = create_progress_bar(total_size);

    let tmp_path = dest.with_extension("download");
    let mut file = fs::File::create(&tmp_path)
        .with_context(|| format!("failed to create {}", tmp_path.display()))?;

    let mut downloaded: u64 = 0;
    let mut buffer = [0u8; 16 * 1024];
    loop {
        let bytes_read = response
            .read(&mut buffer)
            .context("failed while reading model bundle bytes")?;
        if bytes_read == 0 {
            break;
        }

        file.write_all(&buffer[..bytes_read])
            .context("failed while writing model bundle to disk")?;
        downloaded += bytes_read as u64;
        progress.set_position(downloaded);
    }

    file.sync_all()
        .context("failed to flush downloaded model bundle to disk")?;
    fs::rename(&tmp_path, dest).with_context(|| {
        format!(
            "failed to move temp archive {} into place at {}",
            tmp_path.display(),
            dest.display()
        )
    })?;

    progress.finish_with_message("model bundle ready");
    Ok(())
}

fn extract_archive(archive_path: &Path, dest: &Path) -> Result<()> {
    log::info!(
        "extracting {} into {}",
        archive_path.display(),
        dest.display()
    );
    let file = fs::File::open(archive_path)
        .with_context(|| format!("failed to open {}", archive_path.display()))?;
    Archive::new(GzDecoder::new(file))
        .unpack(dest)
        .with_context(|| format!("failed to extract {}", archive_path.display()))?;
    Ok(())
}

fn create_progress_bar(total_size: Option<u64>) -> ProgressBar {
    match total_size {
        Some(total) if total > 0 => {
            let pb = ProgressBar::new(total);
            let style = ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({eta})",
            )
            .unwrap()
            .progress_chars("=>-");
            pb.set_style(style);
            pb
        }
        _ => {
            let pb = ProgressBar::new_spinner();
            let style =
                ProgressStyle::with_template("{spinner:.green} downloading model bundle").unwrap();
            pb.set_style(style);
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        }
    }
}
