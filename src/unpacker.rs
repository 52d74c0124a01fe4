//! The Unpacker Interface: the contract every format handler satisfies.
//!
//! Unpackers are format-specific collaborators. The engine only ever talks
//! to them through [`Unpacker::try_unpack`]; it never inspects format
//! internals.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// A file produced by a successful unpack, relative to the handler's
/// `target_dir`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducedFile {
    pub path: PathBuf,
    pub labels: BTreeSet<String>,
}

impl ProducedFile {
    pub fn new(path: impl Into<PathBuf>, labels: impl IntoIterator<Item = String>) -> Self {
        Self {
            path: path.into(),
            labels: labels.into_iter().collect(),
        }
    }
}

/// What a handler claims about the bytes it consumed and produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnpackSuccess {
    pub consumed_length: u64,
    pub produced: Vec<ProducedFile>,
    pub new_labels: BTreeSet<String>,
}

/// Why a handler declined a candidate offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnpackFailure {
    pub offset: u64,
    pub reason: String,
    pub fatal: bool,
}

impl UnpackFailure {
    pub fn new(offset: u64, reason: impl Into<String>) -> Self {
        Self {
            offset,
            reason: reason.into(),
            fatal: false,
        }
    }
}

pub type UnpackVerdict = Result<UnpackSuccess, UnpackFailure>;

/// Format-specific parser satisfying the Unpacker Interface.
///
/// Implementations MUST NOT modify `input_path`. On success every file in
/// `produced` must actually exist under `target_dir`. On failure, partial
/// output may be left in `target_dir` for the dispatcher to clean up.
pub trait Unpacker: Send + Sync {
    fn try_unpack(
        &self,
        input_path: &Path,
        offset: u64,
        target_dir: &Path,
        temp_dir: Option<&Path>,
    ) -> UnpackVerdict;
}
