//! The per-file manifest: `FileResult` and `UnpackReport`, plus the result
//! channel workers use to hand finished reports back to the driver.

use std::collections::BTreeSet;
use std::path::PathBuf;

use crossbeam_channel::{Receiver, Sender};
use serde::Serialize;

/// An unordered set of short label strings. `BTreeSet` gives deterministic
/// JSON output ordering for free, which keeps scenario 5's property test
/// ("two runs produce equal FileResults") honest.
pub type Labels = BTreeSet<String>;

#[derive(Debug, Clone, Serialize)]
pub struct UnpackReport {
    pub offset: u64,
    pub signature: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub size: u64,
    pub files: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unpackdirectory: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub fullfilename: String,
    pub filename: String,
    pub labels: Labels,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filesize: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub md5: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    pub unpackedfiles: Vec<UnpackReport>,
}

impl FileResult {
    /// A minimal result for early-exit classifications (symlink, socket,
    /// fifo, device, directory-skip never reaches here).
    pub fn minimal(fullfilename: String, filename: String, labels: Labels) -> Self {
        Self {
            fullfilename,
            filename,
            labels,
            filesize: None,
            md5: None,
            sha1: None,
            sha256: None,
            unpackedfiles: Vec::new(),
        }
    }
}

/// In-process fan-in for finished results: alongside the JSON line each
/// worker prints to stdout, every `FileResult` is placed here so a run's
/// results can be accumulated without re-parsing stdout. Mirrors the
/// teacher's `meta_tx`/`meta_rx` metadata channel.
pub struct ResultChannel {
    sender: Sender<FileResult>,
    receiver: Receiver<FileResult>,
}

impl ResultChannel {
    pub fn new() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self { sender, receiver }
    }

    /// A cloneable sender handle for worker threads.
    pub fn sender(&self) -> Sender<FileResult> {
        self.sender.clone()
    }

    /// Drains every result placed on the channel so far, without
    /// blocking. Workers are never explicitly joined (§4.5) and hold
    /// their own sender clone forever, so the channel never closes on
    /// its own; callers drain what has arrived instead of waiting for
    /// that close.
    pub fn drain(&self) -> Vec<FileResult> {
        self.receiver.try_iter().collect()
    }
}

impl Default for ResultChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializes one [`FileResult`] as a single JSON line to stdout, then
/// forwards it on `results_tx` so the driver can accumulate it.
pub fn emit(result: FileResult, results_tx: &Sender<FileResult>) {
    match serde_json::to_string(&result) {
        Ok(line) => println!("{line}"),
        Err(err) => tracing::warn!("failed to serialize file result: {err}"),
    }
    let _ = results_tx.send(result);
}
