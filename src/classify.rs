//! File Classification: the pre-scan short-circuit for file types the
//! scanner has no business looking inside.

use std::fs;
use std::path::Path;

use crate::result::{FileResult, Labels};

pub enum Classification {
    /// Not a regular file worth scanning; the caller should emit
    /// `result` (if any) and skip the scan/hash pipeline entirely.
    ShortCircuit(Option<FileResult>),
    /// A regular, non-empty file: proceed to hashing and scanning.
    Regular,
}

/// Inspects `path`'s metadata and decides whether scanning should proceed.
/// `labels` carries the task's inherited labels (e.g. `root`) and is
/// consumed into the short-circuit result when one is produced.
pub fn classify(path: &Path, mut labels: Labels, staging_root: &Path) -> std::io::Result<Classification> {
    let metadata = fs::symlink_metadata(path)?;
    let file_type = metadata.file_type();

    if file_type.is_dir() {
        return Ok(Classification::ShortCircuit(None));
    }

    if file_type.is_symlink() {
        labels.insert("symbolic link".to_string());
        return Ok(Classification::ShortCircuit(Some(minimal_result(
            path,
            staging_root,
            labels,
        ))));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::FileTypeExt;
        if file_type.is_socket() {
            labels.insert("socket".to_string());
            return Ok(Classification::ShortCircuit(Some(minimal_result(
                path,
                staging_root,
                labels,
            ))));
        }
        if file_type.is_fifo() {
            labels.insert("fifo".to_string());
            return Ok(Classification::ShortCircuit(Some(minimal_result(
                path,
                staging_root,
                labels,
            ))));
        }
        if file_type.is_block_device() {
            labels.insert("block device".to_string());
            return Ok(Classification::ShortCircuit(Some(minimal_result(
                path,
                staging_root,
                labels,
            ))));
        }
        if file_type.is_char_device() {
            labels.insert("character device".to_string());
            return Ok(Classification::ShortCircuit(Some(minimal_result(
                path,
                staging_root,
                labels,
            ))));
        }
    }

    if metadata.len() == 0 {
        labels.insert("empty".to_string());
        let mut result = minimal_result(path, staging_root, labels);
        result.filesize = Some(0);
        return Ok(Classification::ShortCircuit(Some(result)));
    }

    Ok(Classification::Regular)
}

fn minimal_result(path: &Path, staging_root: &Path, labels: Labels) -> FileResult {
    let (fullfilename, filename) = names(path, staging_root);
    FileResult::minimal(fullfilename, filename, labels)
}

/// The full staged path and the path relative to the staging root, used
/// to populate `FileResult::fullfilename`/`filename`.
pub fn names(path: &Path, staging_root: &Path) -> (String, String) {
    let fullfilename = path.to_string_lossy().to_string();
    let filename = path
        .strip_prefix(staging_root)
        .unwrap_or(path)
        .to_string_lossy()
        .to_string();
    (fullfilename, filename)
}
