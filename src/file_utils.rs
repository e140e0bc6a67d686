use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

// @module: File and directory utilities

/// Segment files are named `segment_<N>.txt`, N being the sequence number
static SEGMENT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^segment_(\d+)\.txt$").expect("segment pattern is valid")
});

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_dir()
    }

    // @checks: File exists and holds at least one byte
    pub fn has_content<P: AsRef<Path>>(path: P) -> bool {
        fs::metadata(path.as_ref())
            .map(|meta| meta.is_file() && meta.len() > 0)
            .unwrap_or(false)
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)?;
        }
        Ok(())
    }

    /// Read a file to a string, replacing invalid UTF-8 instead of failing
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        let bytes = fs::read(&path)
            .with_context(|| format!("Failed to read file: {:?}", path.as_ref()))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Write a string to a file
    pub fn write_to_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        // Ensure the parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        fs::write(&path, content)
            .with_context(|| format!("Failed to write to file: {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Sequence number embedded in a segment file name, if it is one
    pub fn segment_number(file_name: &str) -> Option<u64> {
        SEGMENT_PATTERN
            .captures(file_name)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }

    /// List the segment files directly inside `dir`, ascending by sequence number
    pub fn find_segment_files<P: AsRef<Path>>(dir: P) -> Result<Vec<(u64, PathBuf)>> {
        let mut result = Vec::new();

        for entry in WalkDir::new(dir.as_ref()).min_depth(1).max_depth(1) {
            let entry = entry.context("Failed to read directory entry")?;
            if !entry.file_type().is_file() {
                continue;
            }

            let name = entry.file_name().to_string_lossy();
            if let Some(seq) = Self::segment_number(&name) {
                result.push((seq, entry.path().to_path_buf()));
            }
        }

        result.sort_by_key(|(seq, _)| *seq);
        Ok(result)
    }
}
