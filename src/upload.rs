//! Input acceptance: which files each tool takes, and loading them.
//!
//! Every tool has an [`UploadConfiguration`]: the MIME types it accepts, a
//! one-line description, whether it takes several files, and a size cap.
//! MIME types are derived from the file extension.

use crate::imaging::SourceFile;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

/// Default per-file size cap: 50 MiB.
pub const DEFAULT_MAX_FILE_BYTES: u64 = 50 * 1024 * 1024;

const RASTER_TYPES: &[&str] = &["image/png", "image/jpeg", "image/gif", "image/webp"];

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("{name}: unsupported file type {mime}")]
    UnsupportedType { name: String, mime: String },
    #[error("{name}: unrecognized file extension")]
    UnknownType { name: String },
    #[error("{name}: {size} bytes exceeds the {limit} byte limit")]
    TooLarge { name: String, size: u64, limit: u64 },
    #[error("{name}: file is empty")]
    EmptyFile { name: String },
    #[error("{tool} takes a single file, got {count}")]
    TooManyFiles { tool: Tool, count: usize },
    #[error("no input files")]
    NoFiles,
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tool {
    Resize,
    Convert,
    Compress,
    Crop,
    Merge,
    Bulk,
    Dpi,
    Enhance,
}

impl std::fmt::Display for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Resize => "resize",
            Self::Convert => "convert",
            Self::Compress => "compress",
            Self::Crop => "crop",
            Self::Merge => "merge",
            Self::Bulk => "bulk",
            Self::Dpi => "dpi",
            Self::Enhance => "enhance",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadConfiguration {
    pub accept: Vec<&'static str>,
    pub description: &'static str,
    pub multiple: bool,
    pub max_file_bytes: u64,
}

impl UploadConfiguration {
    pub fn for_tool(tool: Tool, max_file_bytes: u64) -> Self {
        let mut accept = RASTER_TYPES.to_vec();
        if matches!(tool, Tool::Compress | Tool::Convert) {
            accept.push("application/pdf");
        }
        let (description, multiple) = match tool {
            Tool::Resize => ("Resize an image to exact dimensions or a preset", false),
            Tool::Convert => ("Convert an image to JPEG, PNG, WebP, GIF or PDF", false),
            Tool::Compress => ("Shrink an image or PDF page as JPEG", false),
            Tool::Crop => ("Cut a rectangular region out of an image", false),
            Tool::Merge => ("Join two or more images side by side or stacked", true),
            Tool::Bulk => ("Convert or resize many images into one ZIP", true),
            Tool::Dpi => ("Get a print resolution recommendation", false),
            Tool::Enhance => ("Generate a related image from a photo", false),
        };
        Self {
            accept,
            description,
            multiple,
            max_file_bytes,
        }
    }

    pub fn accepts(&self, mime: &str) -> bool {
        self.accept.iter().any(|a| a.eq_ignore_ascii_case(mime))
    }

    /// Check one file's name, size and type against this configuration.
    pub fn validate(&self, name: &str, size: u64, mime: Option<&str>) -> Result<(), UploadError> {
        let Some(mime) = mime else {
            return Err(UploadError::UnknownType {
                name: name.to_string(),
            });
        };
        if !self.accepts(mime) {
            return Err(UploadError::UnsupportedType {
                name: name.to_string(),
                mime: mime.to_string(),
            });
        }
        if size == 0 {
            return Err(UploadError::EmptyFile {
                name: name.to_string(),
            });
        }
        if size > self.max_file_bytes {
            return Err(UploadError::TooLarge {
                name: name.to_string(),
                size,
                limit: self.max_file_bytes,
            });
        }
        Ok(())
    }
}

/// MIME type for a path, from its extension.
pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" | "jpe" | "jfif" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "pdf" => Some("application/pdf"),
        _ => None,
    }
}

/// Read one file from disk after checking it against `config`.
pub fn load_source_file(
    path: &Path,
    config: &UploadConfiguration,
) -> Result<SourceFile, UploadError> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let io_err = |source| UploadError::Io {
        path: path.to_path_buf(),
        source,
    };
    let size = std::fs::metadata(path).map_err(io_err)?.len();
    let mime = mime_for_path(path);
    config.validate(&name, size, mime)?;

    let bytes = std::fs::read(path).map_err(io_err)?;
    debug!(path = %path.display(), size, "loaded input");
    Ok(SourceFile::new(name, bytes, mime))
}

/// Expand directories into the image files beneath them, sorted by path.
///
/// Files given explicitly are kept as-is (and rejected later if unsupported);
/// files found inside directories are kept only if `config` accepts their type.
pub fn expand_inputs(
    paths: &[PathBuf],
    config: &UploadConfiguration,
) -> Result<Vec<PathBuf>, UploadError> {
    let mut files = Vec::new();
    for path in paths {
        if !path.is_dir() {
            files.push(path.clone());
            continue;
        }
        for entry in WalkDir::new(path).sort_by_file_name() {
            let entry = entry?;
            if entry.file_type().is_file()
                && mime_for_path(entry.path()).is_some_and(|m| config.accepts(m))
            {
                files.push(entry.into_path());
            }
        }
    }
    Ok(files)
}

/// Load every input of a tool, enforcing its single/multiple-file rule.
pub fn load_inputs(
    tool: Tool,
    paths: &[PathBuf],
    max_file_bytes: u64,
) -> Result<Vec<SourceFile>, UploadError> {
    let config = UploadConfiguration::for_tool(tool, max_file_bytes);
    let paths = expand_inputs(paths, &config)?;
    if paths.is_empty() {
        return Err(UploadError::NoFiles);
    }
    if !config.multiple && paths.len() > 1 {
        return Err(UploadError::TooManyFiles {
            tool,
            count: paths.len(),
        });
    }
    paths
        .iter()
        .map(|path| load_source_file(path, &config))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn pdf_only_for_compress_and_convert() {
        let accepts_pdf = |tool| {
            UploadConfiguration::for_tool(tool, DEFAULT_MAX_FILE_BYTES).accepts("application/pdf")
        };
        for tool in [Tool::Compress, Tool::Convert] {
            assert!(accepts_pdf(tool));
        }
        for tool in [Tool::Resize, Tool::Crop, Tool::Merge, Tool::Bulk] {
            assert!(!accepts_pdf(tool));
        }
    }

    #[test]
    fn validate_rejects_oversized() {
        let config = UploadConfiguration::for_tool(Tool::Resize, 10);
        assert!(matches!(
            config.validate("big.png", 11, Some("image/png")),
            Err(UploadError::TooLarge { size: 11, limit: 10, .. })
        ));
        assert!(config.validate("ok.png", 10, Some("image/png")).is_ok());
    }

    #[test]
    fn validate_rejects_unknown_and_unsupported() {
        let config = UploadConfiguration::for_tool(Tool::Crop, DEFAULT_MAX_FILE_BYTES);
        assert!(matches!(
            config.validate("x.bmp", 5, None),
            Err(UploadError::UnknownType { .. })
        ));
        assert!(matches!(
            config.validate("x.pdf", 5, Some("application/pdf")),
            Err(UploadError::UnsupportedType { .. })
        ));
    }

    #[test]
    fn mime_from_extension_is_case_insensitive() {
        assert_eq!(mime_for_path(Path::new("a/B.JPG")), Some("image/jpeg"));
        assert_eq!(mime_for_path(Path::new("scan.pdf")), Some("application/pdf"));
        assert_eq!(mime_for_path(Path::new("notes.txt")), None);
        assert_eq!(mime_for_path(Path::new("README")), None);
    }

    #[test]
    fn directories_expand_to_accepted_images() {
        let tmp = TempDir::new().unwrap();
        let nested = tmp.path().join("nested");
        fs::create_dir(&nested).unwrap();
        fs::write(tmp.path().join("b.png"), b"x").unwrap();
        fs::write(tmp.path().join("a.jpg"), b"x").unwrap();
        fs::write(tmp.path().join("notes.txt"), b"x").unwrap();
        fs::write(tmp.path().join("scan.pdf"), b"x").unwrap();
        fs::write(nested.join("c.webp"), b"x").unwrap();

        let config = UploadConfiguration::for_tool(Tool::Bulk, DEFAULT_MAX_FILE_BYTES);
        let files = expand_inputs(&[tmp.path().to_path_buf()], &config).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(tmp.path()).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(names, vec!["a.jpg", "b.png", "nested/c.webp"]);
    }

    #[test]
    fn single_file_tools_reject_several() {
        let tmp = TempDir::new().unwrap();
        let a = tmp.path().join("a.png");
        let b = tmp.path().join("b.png");
        fs::write(&a, b"x").unwrap();
        fs::write(&b, b"x").unwrap();
        assert!(matches!(
            load_inputs(Tool::Resize, &[a.clone(), b.clone()], DEFAULT_MAX_FILE_BYTES),
            Err(UploadError::TooManyFiles { count: 2, .. })
        ));
        let files = load_inputs(Tool::Merge, &[a, b], DEFAULT_MAX_FILE_BYTES).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].name, "a.png");
        assert_eq!(files[0].mime.as_deref(), Some("image/png"));
    }

    #[test]
    fn load_empty_file_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let empty = tmp.path().join("empty.png");
        fs::write(&empty, b"").unwrap();
        let config = UploadConfiguration::for_tool(Tool::Resize, DEFAULT_MAX_FILE_BYTES);
        assert!(matches!(
            load_source_file(&empty, &config),
            Err(UploadError::EmptyFile { .. })
        ));
    }
}
