//! Corpus file I/O: JSON arrays of records in, pretty JSON documents out.

use anyhow::{Context, Result};
use memmap2::Mmap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::core::record::Record;

const MMAP_THRESHOLD: u64 = 1024 * 1024; // 1 MiB

/// Problems with the shape of an input document
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("input file not found: {0}")]
    MissingFile(PathBuf),

    #[error("{path} is not valid UTF-8")]
    NotUtf8 { path: PathBuf },

    #[error("{path} is not valid JSON: {source}")]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{path} must contain a JSON array of records, found {found}")]
    NotAnArray { path: PathBuf, found: &'static str },

    #[error("{path} is not a similarity summary: {reason}")]
    MalformedSummary { path: PathBuf, reason: String },
}

pub enum FileContent {
    Mapped(Mmap),
    Buffered(String),
}

impl FileContent {
    /// Borrow the text; mapped bytes are checked for UTF-8 here
    pub fn as_str(&self) -> Result<&str, std::str::Utf8Error> {
        match self {
            FileContent::Mapped(mmap) => std::str::from_utf8(mmap),
            FileContent::Buffered(s) => Ok(s.as_str()),
        }
    }
}

pub fn read_file_smart<P: AsRef<Path>>(path: P) -> Result<FileContent> {
    let path = path.as_ref();
    let metadata = std::fs::metadata(path)
        .with_context(|| format!("Failed to read metadata for {}", path.display()))?;

    if metadata.len() > MMAP_THRESHOLD {
        // Use memory mapping for large corpora
        let file =
            File::open(path).with_context(|| format!("Failed to open file {}", path.display()))?;

        // Safety: read-only map; the file is not modified while mapped
        let mmap = unsafe { Mmap::map(&file) }
            .with_context(|| format!("Failed to memory-map {}", path.display()))?;

        Ok(FileContent::Mapped(mmap))
    } else {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read file {}", path.display()))?;

        Ok(FileContent::Buffered(content))
    }
}

/// Parse any JSON document from disk
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let value = read_value(path)?;
    let parsed = serde_json::from_value(value).map_err(|source| InputError::InvalidJson {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parsed)
}

/// Load one corpus file; the top level must be an array of record objects
pub fn load_records(path: &Path) -> Result<Vec<Record>> {
    let value = read_value(path)?;

    if !value.is_array() {
        return Err(InputError::NotAnArray {
            path: path.to_path_buf(),
            found: json_kind(&value),
        }
        .into());
    }

    let records: Vec<Record> =
        serde_json::from_value(value).map_err(|source| InputError::InvalidJson {
            path: path.to_path_buf(),
            source,
        })?;

    debug!(path = %path.display(), records = records.len(), "loaded corpus file");
    Ok(records)
}

/// Load and concatenate corpus files in argument order
pub fn load_corpus(paths: &[PathBuf]) -> Result<Vec<Record>> {
    let mut all = Vec::new();
    for path in paths {
        let mut records = load_records(path)?;
        all.append(&mut records);
    }

    info!(files = paths.len(), records = all.len(), "corpus loaded");
    Ok(all)
}

/// Write `value` as pretty JSON, creating parent directories
pub fn save_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let text = serde_json::to_string_pretty(value)
        .with_context(|| format!("Failed to serialize {}", path.display()))?;
    std::fs::write(path, text)
        .with_context(|| format!("Failed to write to {}", path.display()))?;

    debug!(path = %path.display(), "wrote json");
    Ok(())
}

fn read_value(path: &Path) -> Result<Value> {
    if !path.exists() {
        return Err(InputError::MissingFile(path.to_path_buf()).into());
    }

    let content = read_file_smart(path)?;
    let text = content.as_str().map_err(|_| InputError::NotUtf8 {
        path: path.to_path_buf(),
    })?;

    let value = serde_json::from_str(text).map_err(|source| InputError::InvalidJson {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(value)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
