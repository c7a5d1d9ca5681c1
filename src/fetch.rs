//! Image acquisition: turns a user-supplied reference (local path or URL)
//! into a local JPEG file, caching downloads by a hash of the URL.

use std::{
    fs,
    path::PathBuf,
    time::Duration,
};

use anyhow::{Context, Result};
use image::ImageFormat;
use reqwest::blocking::Client;
use sha2::{Digest, Sha256};

const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_12_5) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/59.0.3071.115 Safari/537.36";

/// Host whose image service serves WebP variants that must be rewritten to
/// request a JPEG representation instead.
const WEBP_COERCION_HOST: &str = "jiemosrc";

#[derive(Clone, Debug)]
pub struct FetchConfig {
    pub cache_dir: PathBuf,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            cache_dir: std::env::temp_dir().join("image-classify"),
            timeout: Duration::from_secs(10),
            user_agent: DESKTOP_USER_AGENT.to_string(),
        }
    }
}

/// Resolves an image reference to a local path. URLs are downloaded into the
/// cache directory and coerced to JPEG; anything else is treated as a local
/// path and returned as-is (the caller checks existence).
pub fn resolve_image(reference: &str, config: &FetchConfig) -> Result<PathBuf> {
    if reference.starts_with("http://") || reference.starts_with("https://") {
        download_cached(reference, config)
    } else {
        Ok(PathBuf::from(reference))
    }
}

/// Rewrites WebP variants served by the known host into JPEG requests.
/// A trailing `,webp` format selector becomes `,jpeg`; a bare `.webp` path
/// gets a format-conversion query parameter appended. Other URLs pass
/// through untouched.
pub fn rewrite_webp_url(url: &str) -> String {
    if url.contains(WEBP_COERCION_HOST) {
        if url.ends_with(",webp") {
            return format!("{}jpeg", &url[..url.len() - 4]);
        }
        if url.ends_with(".webp") {
            return format!("{url}?x-oss-process=image/format,jpeg");
        }
    }
    url.to_string()
}

/// Deterministic cache key: SHA-256 hex digest of the URL string.
fn cache_key(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}

/// File extension derived from a Content-Type header: the substring after
/// the first `/`, with any media-type parameters stripped. Empty when the
/// header is absent or carries no subtype.
fn extension_from_content_type(content_type: Option<&str>) -> String {
    let Some(content_type) = content_type else {
        return String::new();
    };
    match content_type.split_once('/') {
        Some((_, subtype)) => {
            let subtype = subtype.split(';').next().unwrap_or(subtype).trim();
            if subtype.is_empty() {
                String::new()
            } else {
                format!(".{subtype}")
            }
        }
        None => String::new(),
    }
}

fn download_cached(url: &str, config: &FetchConfig) -> Result<PathBuf> {
    let url = rewrite_webp_url(url);
    let key = cache_key(&url);
    let cached = config.cache_dir.join(format!("{key}.jpg"));
    if cached.exists() {
        log::info!("image already cached, skipping download of {url}");
        return Ok(cached);
    }

    fs::create_dir_all(&config.cache_dir).with_context(|| {
        format!(
            "failed to create image cache directory {}",
            config.cache_dir.display()
        )
    })?;

    log::info!("downloading image from {url}");
    let client = Client::builder()
        .user_agent(&config.user_agent)
        .timeout(config.timeout)
        .build()
        .context("failed to build HTTP client")?;
    let response = client
        .get(&url)
        .send()
        .with_context(|| format!("failed to fetch image from {url}"))?
        .error_for_status()
        .context("image download returned error status")?;

    let ext = extension_from_content_type(
        response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok()),
    );
    log::debug!("image content type extension: {ext:?}");

    let bytes = response
        .bytes()
        .context("failed while reading image bytes")?;

    let raw_path = config.cache_dir.join(format!("{key}{ext}"));
    fs::write(&raw_path, &bytes)
        .with_context(|| format!("failed to write {}", raw_path.display()))?;

    // Decode whatever came back and re-encode as JPEG so the cached file is
    // always in the format the rest of the pipeline expects.
    let decoded = image::load_from_memory(&bytes)
        .with_context(|| format!("failed to decode image downloaded from {url}"))?;
    let tmp_path = cached.with_extension("download");
    decoded
        .to_rgb8()
        .save_with_format(&tmp_path, ImageFormat::Jpeg)
        .with_context(|| format!("failed to encode {}", tmp_path.display()))?;
    fs::rename(&tmp_path, &cached).with_context(|| {
        format!(
            "failed to move temp image {} into place at {}",
            tmp_path.display(),
            cached.display()
        )
    })?;

    Ok(cached)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comma_webp_suffix_becomes_jpeg() {
        assert_eq!(
            rewrite_webp_url("http://img.jiemosrc.com/a/1.jpg@100w,webp"),
            "http://img.jiemosrc.com/a/1.jpg@100w,jpeg"
        );
    }

    #[test]
    fn dot_webp_suffix_gets_format_query() {
        assert_eq!(
            rewrite_webp_url("http://img.jiemosrc.com/a/1.webp"),
            "http://img.jiemosrc.com/a/1.webp?x-oss-process=image/format,jpeg"
        );
    }

    #[test]
    fn other_hosts_are_left_alone() {
        let url = "http://example.com/a/1.webp";
        assert_eq!(rewrite_webp_url(url), url);
    }

    #[test]
    fn non_webp_urls_on_special_host_are_left_alone() {
        let url = "http://img.jiemosrc.com/a/1.jpg";
        assert_eq!(rewrite_webp_url(url), url);
    }

    #[test]
    fn cache_key_is_stable_hex() {
        let key = cache_key("http://example.com/1.jpg");
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(key, cache_key("http://example.com/1.jpg"));
        assert_ne!(key, cache_key("http://example.com/2.jpg"));
    }

    #[test]
    fn extension_comes_from_content_type_subtype() {
        assert_eq!(extension_from_content_type(Some("image/jpeg")), ".jpeg");
        assert_eq!(
            extension_from_content_type(Some("image/png; charset=binary")),
            ".png"
        );
        assert_eq!(extension_from_content_type(Some("weird")), "");
        assert_eq!(extension_from_content_type(None), "");
    }

    #[test]
    fn local_paths_pass_through() {
        let config = FetchConfig::default();
        let resolved = resolve_image("/some/local/image.jpg", &config).unwrap();
        assert_eq!(resolved, PathBuf::from("/some/local/image.jpg"));
    }
}
