//! Staging Bootstrap: creates `bang-scan-<random>/{unpack,results,logs}`
//! under `baseunpackdirectory` and copies the input file into `unpack/`
//! as the root task, per §4.9.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

pub struct StagingRoot {
    pub root: PathBuf,
    pub unpack_dir: PathBuf,
    pub results_dir: PathBuf,
    pub logs_dir: PathBuf,
}

impl StagingRoot {
    /// Creates the staging tree under `base` and copies `input` into
    /// `unpack/` by basename, returning the staged path of the root file.
    pub fn bootstrap(base: &Path, input: &Path) -> std::io::Result<(Self, PathBuf)> {
        let root = base.join(format!("bang-scan-{}", random_suffix()));
        let unpack_dir = root.join("unpack");
        let results_dir = root.join("results");
        let logs_dir = root.join("logs");

        std::fs::create_dir_all(&unpack_dir)?;
        std::fs::create_dir_all(&results_dir)?;
        std::fs::create_dir_all(&logs_dir)?;

        let file_name = input
            .file_name()
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidInput, "input has no file name"))?;
        let staged_path = unpack_dir.join(file_name);
        std::fs::copy(input, &staged_path)?;

        Ok((
            Self {
                root,
                unpack_dir,
                results_dir,
                logs_dir,
            },
            staged_path,
        ))
    }
}

/// A 16-hex-digit suffix derived from process start time and PID. Not a
/// cryptographic token: it only needs to avoid collisions between runs on
/// the same host, the way the teacher's `rand_suffix` derives a run id
/// from nanosecond timestamps.
fn random_suffix() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let pid = std::process::id() as u128;
    format!("{:016x}", (nanos ^ (pid << 32)) & 0xFFFF_FFFF_FFFF_FFFF)
}
