//! Build output upload
//!
//! Walks the output directory and puts every file into the bucket with a
//! content type and a cache directive derived from its path.

use crate::error::{CloudError, Result};
use crate::provider::{ObjectStorage, UploadObject};
use std::path::Path;

pub const NO_CACHE: &str = "no-cache";
pub const IMMUTABLE: &str = "public, max-age=31536000, immutable";

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Content type and cache directive for an object key
pub fn object_headers(key: &str) -> (String, Option<String>) {
    let content_type = mime_guess::from_path(key)
        .first_raw()
        .unwrap_or(FALLBACK_CONTENT_TYPE)
        .to_string();

    let cache_control = if key.ends_with(".html") {
        Some(NO_CACHE.to_string())
    } else if key.split('/').any(|segment| segment == "assets") {
        Some(IMMUTABLE.to_string())
    } else {
        None
    };

    (content_type, cache_control)
}

/// Every regular file under `dir`, keyed relative to it
pub fn collect_objects(dir: &Path) -> Result<Vec<UploadObject>> {
    let root = dir.to_str().ok_or_else(|| {
        CloudError::InvalidConfig(format!("Output path is not valid UTF-8: {}", dir.display()))
    })?;
    let pattern = format!("{}/**/*", glob::Pattern::escape(root));

    let entries = glob::glob(&pattern)
        .map_err(|e| CloudError::InvalidConfig(format!("Bad output path {}: {}", root, e)))?;

    let mut objects = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| CloudError::Io(e.into_error()))?;
        if !path.is_file() {
            continue;
        }
        let Ok(relative) = path.strip_prefix(dir) else {
            continue;
        };
        let key = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        let (content_type, cache_control) = object_headers(&key);
        objects.push(UploadObject {
            key,
            path,
            content_type,
            cache_control,
        });
    }

    objects.sort_by(|a, b| a.key.cmp(&b.key));
    Ok(objects)
}

/// Upload the whole output directory, returning the number of files
pub async fn upload_dir(storage: &dyn ObjectStorage, bucket: &str, dir: &Path) -> Result<usize> {
    if !dir.is_dir() {
        return Err(CloudError::OutputDirNotFound(dir.display().to_string()));
    }

    let objects = collect_objects(dir)?;
    tracing::info!("Uploading {} files to {}", objects.len(), bucket);

    for object in &objects {
        tracing::debug!("Uploading {} ({})", object.key, object.content_type);
        storage.put_object(bucket, object).await?;
    }

    Ok(objects.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_html_is_never_cached() {
        let (content_type, cache) = object_headers("index.html");
        assert_eq!(content_type, "text/html");
        assert_eq!(cache.as_deref(), Some(NO_CACHE));

        // .html wins over the assets rule
        let (_, cache) = object_headers("assets/partial.html");
        assert_eq!(cache.as_deref(), Some(NO_CACHE));
    }

    #[test]
    fn test_assets_are_immutable() {
        let (content_type, cache) = object_headers("assets/index-3f2a.css");
        assert_eq!(content_type, "text/css");
        assert_eq!(cache.as_deref(), Some(IMMUTABLE));

        let (_, cache) = object_headers("static/assets/logo.svg");
        assert_eq!(cache.as_deref(), Some(IMMUTABLE));

        let (_, cache) = object_headers("my-assets/logo.svg");
        assert_eq!(cache, None);
    }

    #[test]
    fn test_other_files_get_guessed_type_only() {
        let (content_type, cache) = object_headers("favicon.png");
        assert_eq!(content_type, "image/png");
        assert_eq!(cache, None);

        let (content_type, _) = object_headers("LICENSE");
        assert_eq!(content_type, FALLBACK_CONTENT_TYPE);
    }

    #[test]
    fn test_collect_objects_uses_slash_keys() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("assets/img")).unwrap();
        fs::write(dir.path().join("index.html"), "<html></html>").unwrap();
        fs::write(dir.path().join("assets/app.js"), "console.log(1)").unwrap();
        fs::write(dir.path().join("assets/img/logo.png"), [0u8; 4]).unwrap();

        let objects = collect_objects(dir.path()).unwrap();
        let keys: Vec<&str> = objects.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["assets/app.js", "assets/img/logo.png", "index.html"]);
        assert!(objects.iter().all(|o| o.path.is_file()));
    }
}
